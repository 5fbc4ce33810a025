//! AWS releases

use cluster_operator_common::Provider;

use crate::{ChangelogKind, VersionBundle};

/// All AWS releases
pub fn all() -> Vec<VersionBundle> {
    vec![v0_1_0(), v0_2_0(), v0_3_0(), v0_4_0()]
}

/// Initial release: encryption key and kubeconfig secrets
pub fn v0_1_0() -> VersionBundle {
    VersionBundle::new(Provider::Aws, "0.1.0", 2018, 5, 2)
        .component("cluster-operator", "0.1.0")
        .changelog(
            "cluster-operator",
            ChangelogKind::Added,
            "Manage the encryption key secret of tenant clusters.",
        )
        .deprecated()
}

/// Tenant cluster namespace and chart operator
pub fn v0_2_0() -> VersionBundle {
    VersionBundle::new(Provider::Aws, "0.2.0", 2018, 6, 12)
        .component("cluster-operator", "0.2.0")
        .component("chart-operator", "0.3.0")
        .component("node-exporter", "0.15.1")
        .changelog(
            "cluster-operator",
            ChangelogKind::Added,
            "Create the giantswarm namespace in tenant clusters.",
        )
        .changelog(
            "node-exporter",
            ChangelogKind::Added,
            "Manage node-exporter as a chart.",
        )
        .deprecated()
}

/// Managed coredns and kube-state-metrics charts
pub fn v0_3_0() -> VersionBundle {
    VersionBundle::new(Provider::Aws, "0.3.0", 2018, 8, 14)
        .component("cluster-operator", "0.3.0")
        .component("chart-operator", "0.4.0")
        .component("coredns", "1.1.3")
        .component("kube-state-metrics", "1.3.1")
        .component("node-exporter", "0.15.1")
        .changelog(
            "coredns",
            ChangelogKind::Added,
            "Manage coredns as a chart.",
        )
        .changelog(
            "kube-state-metrics",
            ChangelogKind::Added,
            "Manage kube-state-metrics as a chart.",
        )
}

/// Ingress controller and exporters
pub fn v0_4_0() -> VersionBundle {
    VersionBundle::new(Provider::Aws, "0.4.0", 2018, 10, 9)
        .component("cluster-operator", "0.4.0")
        .component("chart-operator", "0.5.0")
        .component("cert-exporter", "0.1.0")
        .component("coredns", "1.2.2")
        .component("kube-state-metrics", "1.3.1")
        .component("net-exporter", "0.1.0")
        .component("nginx-ingress-controller", "0.19.0")
        .component("node-exporter", "0.16.0")
        .changelog(
            "nginx-ingress-controller",
            ChangelogKind::Added,
            "Manage nginx-ingress-controller as a chart.",
        )
        .changelog(
            "cert-exporter",
            ChangelogKind::Added,
            "Manage cert-exporter as a chart.",
        )
        .changelog(
            "net-exporter",
            ChangelogKind::Added,
            "Manage net-exporter as a chart.",
        )
        .changelog(
            "coredns",
            ChangelogKind::Changed,
            "Update coredns to 1.2.2.",
        )
}
