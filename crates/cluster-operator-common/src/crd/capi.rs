use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Cluster API `Cluster` (v1alpha1), as far as cluster-operator reads it
///
/// The tenant identity lives in labels; the DNS zone and workers live in
/// the opaque `providerSpec.value` blob.
#[derive(CustomResource, Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[kube(
    group = "cluster.x-k8s.io",
    version = "v1alpha1",
    kind = "Cluster",
    plural = "clusters",
    namespaced
)]
#[serde(rename_all = "camelCase")]
pub struct ClusterSpec {
    /// Provider specific configuration
    #[serde(default)]
    pub provider_spec: ProviderSpec,
}

/// Opaque provider specific configuration of a Cluster API cluster
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
pub struct ProviderSpec {
    /// Raw provider spec; `None` when the provider has not filled it in yet
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<serde_json::Value>,
}

/// Typed view of `providerSpec.value`
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ClusterApiProviderValue {
    /// Cluster level settings
    #[serde(default)]
    pub cluster: ProviderCluster,
    /// Worker machine definitions; only their count matters here
    #[serde(default)]
    pub workers: Vec<serde_json::Value>,
}

/// Cluster level provider settings
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
pub struct ProviderCluster {
    /// DNS settings
    #[serde(default)]
    pub dns: ProviderDns,
}

/// DNS provider settings
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
pub struct ProviderDns {
    /// Base domain of the installation
    #[serde(default)]
    pub domain: String,
}
