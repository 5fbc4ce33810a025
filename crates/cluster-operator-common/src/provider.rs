//! Provider identifiers

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::Error;

/// Infrastructure provider a tenant cluster CRD belongs to
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    /// AWSClusterConfig
    Aws,
    /// AzureClusterConfig
    Azure,
    /// KVMClusterConfig
    Kvm,
    /// Cluster API Cluster
    ClusterApi,
}

impl Provider {
    /// All providers, in the order controllers are started
    pub const ALL: [Provider; 4] = [
        Provider::Aws,
        Provider::Azure,
        Provider::Kvm,
        Provider::ClusterApi,
    ];

    /// Lowercase identifier used in flags and logs
    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::Aws => "aws",
            Provider::Azure => "azure",
            Provider::Kvm => "kvm",
            Provider::ClusterApi => "clusterapi",
        }
    }

    /// Kind of the CRD watched for this provider
    pub fn kind(&self) -> &'static str {
        match self {
            Provider::Aws => "AWSClusterConfig",
            Provider::Azure => "AzureClusterConfig",
            Provider::Kvm => "KVMClusterConfig",
            Provider::ClusterApi => "Cluster",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Provider {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "aws" => Ok(Provider::Aws),
            "azure" => Ok(Provider::Azure),
            "kvm" => Ok(Provider::Kvm),
            "clusterapi" | "capi" => Ok(Provider::ClusterApi),
            other => Err(Error::invalid_config(format!("unknown provider '{}'", other))),
        }
    }
}
