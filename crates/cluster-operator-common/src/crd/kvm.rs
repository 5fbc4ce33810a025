use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::guest::{ClusterGuestConfig, VersionBundleRef};

/// Tenant cluster running on KVM (on-premises)
#[derive(CustomResource, Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[kube(
    group = "core.giantswarm.io",
    version = "v1alpha1",
    kind = "KVMClusterConfig",
    plural = "kvmclusterconfigs",
    namespaced,
    printcolumn = r#"{"name":"Cluster","type":"string","jsonPath":".spec.guest.id"}"#,
    printcolumn = r#"{"name":"Version","type":"string","jsonPath":".spec.versionBundle.version"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct KVMClusterConfigSpec {
    /// Tenant cluster configuration
    pub guest: KVMClusterGuestConfig,
    /// cluster-operator version bundle this cluster is reconciled with
    pub version_bundle: VersionBundleRef,
}

/// KVM tenant cluster configuration
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct KVMClusterGuestConfig {
    /// Cluster identity
    #[serde(flatten)]
    pub cluster: ClusterGuestConfig,
    /// Worker nodes
    #[serde(default)]
    pub workers: Vec<KVMWorker>,
}

/// KVM worker node
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct KVMWorker {
    /// Number of virtual CPUs
    #[serde(default)]
    pub cpus: u32,
    /// Memory in GB
    #[serde(default, rename = "memorySizeGB")]
    pub memory_size_gb: f64,
    /// Root volume size in GB
    #[serde(default, rename = "storageSizeGB")]
    pub storage_size_gb: f64,
}
