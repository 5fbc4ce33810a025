//! KVM releases

use cluster_operator_common::Provider;

use crate::{ChangelogKind, VersionBundle};

/// All KVM releases
pub fn all() -> Vec<VersionBundle> {
    vec![v0_1_0(), v0_2_0()]
}

/// Initial release
pub fn v0_1_0() -> VersionBundle {
    VersionBundle::new(Provider::Kvm, "0.1.0", 2018, 5, 2)
        .component("cluster-operator", "0.1.0")
        .component("chart-operator", "0.3.0")
        .component("node-exporter", "0.15.1")
        .changelog(
            "cluster-operator",
            ChangelogKind::Added,
            "Manage encryption key and kubeconfig secrets of tenant clusters.",
        )
}

/// Managed coredns and ingress controller charts
pub fn v0_2_0() -> VersionBundle {
    VersionBundle::new(Provider::Kvm, "0.2.0", 2018, 9, 20)
        .component("cluster-operator", "0.2.0")
        .component("chart-operator", "0.4.0")
        .component("coredns", "1.1.3")
        .component("nginx-ingress-controller", "0.19.0")
        .component("node-exporter", "0.16.0")
        .changelog(
            "coredns",
            ChangelogKind::Added,
            "Manage coredns as a chart.",
        )
        .changelog(
            "nginx-ingress-controller",
            ChangelogKind::Added,
            "Manage nginx-ingress-controller as a chart.",
        )
        .changelog(
            "node-exporter",
            ChangelogKind::Changed,
            "Update node-exporter to 0.16.0.",
        )
}
