use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Identity of a tenant cluster, shared by every provider cluster config
///
/// Owned by the CRD; read-only to the operator.
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ClusterGuestConfig {
    /// Tenant cluster ID (e.g. "al9qy")
    #[serde(default)]
    pub id: String,

    /// Organization owning the cluster
    #[serde(default)]
    pub owner: String,

    /// Base DNS zone of the installation (e.g. "gauss.eu-central-1.aws.example.com")
    #[serde(default)]
    pub dns_zone: String,

    /// Human readable cluster name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Release the cluster was created with
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub release_version: Option<String>,
}

/// Reference to the version bundle a cluster config is pinned to
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct VersionBundleRef {
    /// Exact cluster-operator version bundle version (e.g. "0.3.0")
    #[serde(default)]
    pub version: String,
}
