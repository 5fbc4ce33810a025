//! Azure releases

use cluster_operator_common::Provider;

use crate::{ChangelogKind, VersionBundle};

/// All Azure releases
pub fn all() -> Vec<VersionBundle> {
    vec![v0_1_0(), v0_2_0(), v0_3_0()]
}

/// Initial release
pub fn v0_1_0() -> VersionBundle {
    VersionBundle::new(Provider::Azure, "0.1.0", 2018, 5, 2)
        .component("cluster-operator", "0.1.0")
        .changelog(
            "cluster-operator",
            ChangelogKind::Added,
            "Manage the encryption key secret of tenant clusters.",
        )
        .deprecated()
}

/// Managed coredns chart
pub fn v0_2_0() -> VersionBundle {
    VersionBundle::new(Provider::Azure, "0.2.0", 2018, 8, 14)
        .component("cluster-operator", "0.2.0")
        .component("chart-operator", "0.4.0")
        .component("coredns", "1.1.3")
        .component("node-exporter", "0.15.1")
        .changelog(
            "coredns",
            ChangelogKind::Added,
            "Manage coredns as a chart.",
        )
        .changelog(
            "cluster-operator",
            ChangelogKind::Fixed,
            "Do not fail reconciliation while the tenant API is still coming up.",
        )
}

/// Ingress controller, still in progress
pub fn v0_3_0() -> VersionBundle {
    VersionBundle::new(Provider::Azure, "0.3.0", 2018, 10, 9)
        .component("cluster-operator", "0.3.0")
        .component("chart-operator", "0.5.0")
        .component("coredns", "1.2.2")
        .component("kube-state-metrics", "1.3.1")
        .component("nginx-ingress-controller", "0.19.0")
        .component("node-exporter", "0.16.0")
        .changelog(
            "nginx-ingress-controller",
            ChangelogKind::Added,
            "Manage nginx-ingress-controller as a chart.",
        )
        .changelog(
            "kube-state-metrics",
            ChangelogKind::Added,
            "Manage kube-state-metrics as a chart.",
        )
        .wip()
}
