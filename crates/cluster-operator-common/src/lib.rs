//! Common types for cluster-operator: CRDs, key extractors, errors and utilities

#![deny(missing_docs)]

pub mod cache;
pub mod crd;
pub mod error;
pub mod key;
pub mod kube_utils;
pub mod provider;
pub mod telemetry;
pub mod template;

pub use error::{is_already_exists, is_not_found, Error};
pub use provider::Provider;

/// Result type alias using our custom Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Name under which the operator identifies itself (field manager, labels)
pub const OPERATOR_NAME: &str = "cluster-operator";

/// Label carrying the tenant cluster ID
pub const LABEL_CLUSTER: &str = "giantswarm.io/cluster";

/// Label carrying the owning organization
pub const LABEL_ORGANIZATION: &str = "giantswarm.io/organization";

/// Label marking resources managed by this operator
pub const LABEL_MANAGED_BY: &str = "giantswarm.io/managed-by";

/// Label on Cluster API clusters carrying the cluster-operator bundle version
pub const LABEL_CLUSTER_OPERATOR_VERSION: &str = "cluster-operator.giantswarm.io/version";

/// Label selector matching everything managed by this operator
pub const MANAGED_BY_SELECTOR: &str = "giantswarm.io/managed-by=cluster-operator";

/// Finalizer guarding cleanup of tenant add-ons and host secrets
pub const CLUSTER_FINALIZER: &str = "operator.giantswarm.io/cluster-operator";
