//! Cluster API releases

use cluster_operator_common::Provider;

use crate::{ChangelogKind, VersionBundle};

/// All Cluster API releases
pub fn all() -> Vec<VersionBundle> {
    vec![v0_1_0()]
}

/// Initial Cluster API support
pub fn v0_1_0() -> VersionBundle {
    VersionBundle::new(Provider::ClusterApi, "0.1.0", 2019, 1, 15)
        .component("cluster-operator", "0.1.0")
        .component("chart-operator", "0.5.0")
        .component("coredns", "1.2.2")
        .component("kube-state-metrics", "1.3.1")
        .component("node-exporter", "0.16.0")
        .changelog(
            "cluster-operator",
            ChangelogKind::Added,
            "Reconcile Cluster API clusters.",
        )
        .changelog(
            "cluster-operator",
            ChangelogKind::Removed,
            "Drop the per provider cluster config lookup for Cluster API clusters.",
        )
}
