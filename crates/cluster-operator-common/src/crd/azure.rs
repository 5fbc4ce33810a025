use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::guest::{ClusterGuestConfig, VersionBundleRef};

/// Tenant cluster running on Azure
#[derive(CustomResource, Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[kube(
    group = "core.giantswarm.io",
    version = "v1alpha1",
    kind = "AzureClusterConfig",
    plural = "azureclusterconfigs",
    namespaced,
    printcolumn = r#"{"name":"Cluster","type":"string","jsonPath":".spec.guest.id"}"#,
    printcolumn = r#"{"name":"Version","type":"string","jsonPath":".spec.versionBundle.version"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct AzureClusterConfigSpec {
    /// Tenant cluster configuration
    pub guest: AzureClusterGuestConfig,
    /// cluster-operator version bundle this cluster is reconciled with
    pub version_bundle: VersionBundleRef,
}

/// Azure tenant cluster configuration
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AzureClusterGuestConfig {
    /// Cluster identity
    #[serde(flatten)]
    pub cluster: ClusterGuestConfig,
    /// Worker nodes
    #[serde(default)]
    pub workers: Vec<AzureWorker>,
}

/// Azure worker node
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AzureWorker {
    /// VM size (e.g. "Standard_D2s_v3")
    #[serde(default)]
    pub vm_size: String,
}
