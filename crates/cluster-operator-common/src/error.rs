//! Error types for cluster-operator
//!
//! Errors carry the cluster ID or resource name where one is known so that
//! reconciliation failures can be traced back to a tenant cluster from the
//! controller logs alone.

use thiserror::Error;

/// Default context value when no specific context is available
pub const UNKNOWN_CONTEXT: &str = "unknown";

/// Main error type for cluster-operator
#[derive(Debug, Error)]
pub enum Error {
    /// Kubernetes API error
    #[error("kubernetes error: {source}")]
    Kube {
        /// The underlying kube-rs error
        #[from]
        source: kube::Error,
    },

    /// A required construction dependency was missing or invalid
    #[error("invalid config: {message}")]
    InvalidConfig {
        /// What is missing or invalid
        message: String,
    },

    /// An object was not of the expected kind
    #[error("wrong type: expected {expected}, got {actual}")]
    WrongType {
        /// The kind the caller asked for
        expected: String,
        /// The kind that was found
        actual: String,
    },

    /// An object of the right kind carried no content
    #[error("empty value: {message}")]
    EmptyValue {
        /// Which value was empty
        message: String,
    },

    /// The tenant cluster API could not be reached
    #[error("tenant cluster {cluster} unavailable: {message}")]
    TenantUnavailable {
        /// Tenant cluster ID
        cluster: String,
        /// Underlying transport failure
        message: String,
    },

    /// Certificates for a tenant cluster have not been issued yet
    #[error("certificate {cert} for cluster {cluster} not found")]
    CertificatesNotFound {
        /// Tenant cluster ID
        cluster: String,
        /// Certificate name (e.g. "cluster-operator-api")
        cert: String,
    },

    /// Serialization/deserialization error
    #[error("serialization error: {message}")]
    Serialization {
        /// Description of what failed
        message: String,
        /// The resource kind being serialized (if known)
        kind: Option<String>,
    },

    /// A chart values template could not be expanded
    #[error("template error: {message}")]
    Template {
        /// Description of what failed
        message: String,
    },

    /// The reconciliation was cancelled before all changes were applied
    #[error("reconciliation canceled: {message}")]
    Canceled {
        /// Where the cancellation was observed
        message: String,
    },

    /// Finalizer handling failed
    #[error("finalizer error: {message}")]
    Finalizer {
        /// Description of what failed
        message: String,
    },

    /// Internal/operational error
    #[error("internal error [{context}]: {message}")]
    Internal {
        /// Description of what failed
        message: String,
        /// Context where the error occurred (e.g., "reconciler", "controller")
        context: String,
    },
}

impl Error {
    /// Create an invalid config error
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: msg.into(),
        }
    }

    /// Create a wrong type error
    pub fn wrong_type(expected: impl Into<String>, actual: impl Into<String>) -> Self {
        Self::WrongType {
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    /// Create an empty value error
    pub fn empty_value(msg: impl Into<String>) -> Self {
        Self::EmptyValue {
            message: msg.into(),
        }
    }

    /// Create a tenant unavailable error for the given cluster
    pub fn tenant_unavailable(cluster: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::TenantUnavailable {
            cluster: cluster.into(),
            message: msg.into(),
        }
    }

    /// Create a certificates-not-found error
    pub fn certificates_not_found(cluster: impl Into<String>, cert: impl Into<String>) -> Self {
        Self::CertificatesNotFound {
            cluster: cluster.into(),
            cert: cert.into(),
        }
    }

    /// Create a serialization error with the given message
    pub fn serialization(msg: impl Into<String>) -> Self {
        Self::Serialization {
            message: msg.into(),
            kind: None,
        }
    }

    /// Create a serialization error with resource kind context
    pub fn serialization_for_kind(kind: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Serialization {
            message: msg.into(),
            kind: Some(kind.into()),
        }
    }

    /// Create a template error
    pub fn template(msg: impl Into<String>) -> Self {
        Self::Template {
            message: msg.into(),
        }
    }

    /// Create a canceled error
    pub fn canceled(msg: impl Into<String>) -> Self {
        Self::Canceled {
            message: msg.into(),
        }
    }

    /// Create a finalizer error
    pub fn finalizer(msg: impl Into<String>) -> Self {
        Self::Finalizer {
            message: msg.into(),
        }
    }

    /// Create an internal error with the given message
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal {
            message: msg.into(),
            context: UNKNOWN_CONTEXT.to_string(),
        }
    }

    /// Create an internal error with context
    pub fn internal_with_context(context: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Internal {
            message: msg.into(),
            context: context.into(),
        }
    }

    /// Check if this error is retryable
    ///
    /// Wiring and configuration defects are not retryable: retrying them
    /// with the same object cannot succeed. Client errors (4xx) are not
    /// retryable either, except write conflicts and throttling.
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Kube { source } => match source {
                // Optimistic concurrency conflicts and throttling clear up on their own
                kube::Error::Api(ae) if ae.code == 409 && ae.reason == "Conflict" => true,
                kube::Error::Api(ae) if ae.code == 429 => true,
                kube::Error::Api(ae) => !(400..500).contains(&ae.code),
                _ => true,
            },
            Error::InvalidConfig { .. } => false,
            Error::WrongType { .. } => false,
            Error::EmptyValue { .. } => false,
            Error::TenantUnavailable { .. } => true,
            Error::CertificatesNotFound { .. } => true,
            Error::Serialization { .. } => false,
            Error::Template { .. } => false,
            Error::Canceled { .. } => true,
            Error::Finalizer { .. } => true,
            Error::Internal { .. } => true,
        }
    }

    /// Check if this error only means "try again later"
    ///
    /// Deferrable errors cancel the current resource instead of failing
    /// the reconciliation.
    pub fn is_deferrable(&self) -> bool {
        matches!(
            self,
            Error::TenantUnavailable { .. } | Error::CertificatesNotFound { .. }
        )
    }

    /// Get the cluster ID if this error is associated with a tenant cluster
    pub fn cluster(&self) -> Option<&str> {
        match self {
            Error::TenantUnavailable { cluster, .. } => Some(cluster),
            Error::CertificatesNotFound { cluster, .. } => Some(cluster),
            _ => None,
        }
    }
}

/// Check whether an error is a Kubernetes "not found" (404) response
pub fn is_not_found(err: &Error) -> bool {
    matches!(err, Error::Kube { source: kube::Error::Api(ae) } if ae.code == 404)
}

/// Check whether an error is a Kubernetes "already exists" (409) response
pub fn is_already_exists(err: &Error) -> bool {
    matches!(
        err,
        Error::Kube { source: kube::Error::Api(ae) } if ae.code == 409 && ae.reason == "AlreadyExists"
    )
}

/// Build a kube API error response, as returned by the API server
///
/// Used by client implementations and tests to produce status errors that
/// [`is_not_found`] and [`is_already_exists`] recognise.
pub fn api_error(code: u16, reason: &str, message: impl Into<String>) -> Error {
    Error::Kube {
        source: kube::Error::Api(kube::error::ErrorResponse {
            status: "Failure".to_string(),
            message: message.into(),
            reason: reason.to_string(),
            code,
        }),
    }
}
