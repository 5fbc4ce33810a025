//! Custom Resource Definitions consumed and produced by cluster-operator
//!
//! Provider cluster configs (AWS, Azure, KVM) and the Cluster API `Cluster`
//! are watched; `ChartConfig` is written into tenant clusters.

mod aws;
mod azure;
mod capi;
mod chartconfig;
mod guest;
mod kvm;

pub use aws::{AWSClusterConfig, AWSClusterConfigSpec, AWSClusterGuestConfig, AWSWorker};
pub use azure::{AzureClusterConfig, AzureClusterConfigSpec, AzureClusterGuestConfig, AzureWorker};
pub use capi::{
    Cluster, ClusterApiProviderValue, ClusterSpec, ProviderCluster, ProviderDns, ProviderSpec,
};
pub use chartconfig::{
    ChartConfig, ChartConfigChart, ChartConfigConfigMap, ChartConfigSpec,
    ChartConfigVersionBundle,
};
pub use guest::{ClusterGuestConfig, VersionBundleRef};
pub use kvm::{KVMClusterConfig, KVMClusterConfigSpec, KVMClusterGuestConfig, KVMWorker};

/// API group of the provider cluster configs and ChartConfig
pub const GROUP: &str = "core.giantswarm.io";

/// API group of Cluster API types
pub const CAPI_GROUP: &str = "cluster.x-k8s.io";
