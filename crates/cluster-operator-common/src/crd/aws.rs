use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::guest::{ClusterGuestConfig, VersionBundleRef};

/// Tenant cluster running on AWS
#[derive(CustomResource, Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[kube(
    group = "core.giantswarm.io",
    version = "v1alpha1",
    kind = "AWSClusterConfig",
    plural = "awsclusterconfigs",
    namespaced,
    printcolumn = r#"{"name":"Cluster","type":"string","jsonPath":".spec.guest.id"}"#,
    printcolumn = r#"{"name":"Version","type":"string","jsonPath":".spec.versionBundle.version"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct AWSClusterConfigSpec {
    /// Tenant cluster configuration
    pub guest: AWSClusterGuestConfig,
    /// cluster-operator version bundle this cluster is reconciled with
    pub version_bundle: VersionBundleRef,
}

/// AWS tenant cluster configuration
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AWSClusterGuestConfig {
    /// Cluster identity
    #[serde(flatten)]
    pub cluster: ClusterGuestConfig,
    /// Worker nodes
    #[serde(default)]
    pub workers: Vec<AWSWorker>,
}

/// AWS worker node
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AWSWorker {
    /// EC2 instance type (e.g. "m5.xlarge")
    #[serde(default)]
    pub instance_type: String,
}
