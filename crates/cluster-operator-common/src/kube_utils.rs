//! Shared Kubernetes client utilities

use std::path::Path;
use std::time::Duration;

use kube::api::PatchParams;
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::{Client, Config};
use tracing::debug;

use crate::{Error, OPERATOR_NAME};

/// Default connection timeout for kube clients
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
/// Default read timeout for kube clients
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(30);

/// Server-side apply parameters using the operator as field manager
pub fn apply_params() -> PatchParams {
    PatchParams::apply(OPERATOR_NAME).force()
}

/// Create a kube client from an optional kubeconfig path with default timeouts
///
/// Without a path the in-cluster or local default configuration is inferred.
pub async fn create_client(kubeconfig: Option<&Path>) -> Result<Client, Error> {
    let mut config = match kubeconfig {
        Some(path) => {
            debug!(path = %path.display(), "loading host kubeconfig");
            let kubeconfig = Kubeconfig::read_from(path).map_err(|e| {
                Error::internal_with_context(
                    "create_client",
                    format!("failed to read kubeconfig: {}", e),
                )
            })?;
            Config::from_custom_kubeconfig(kubeconfig, &KubeConfigOptions::default())
                .await
                .map_err(|e| {
                    Error::internal_with_context(
                        "create_client",
                        format!("failed to load kubeconfig: {}", e),
                    )
                })?
        }
        None => {
            debug!("inferring host cluster config");
            Config::infer().await.map_err(|e| {
                Error::internal_with_context(
                    "create_client",
                    format!("failed to infer config: {}", e),
                )
            })?
        }
    };
    config.connect_timeout = Some(DEFAULT_CONNECT_TIMEOUT);
    config.read_timeout = Some(DEFAULT_READ_TIMEOUT);
    client_from_config(config)
}

/// Create a kube client from an in-memory kubeconfig document
pub async fn client_from_kubeconfig_yaml(yaml: &str) -> Result<Client, Error> {
    let kubeconfig = Kubeconfig::from_yaml(yaml)
        .map_err(|e| Error::serialization_for_kind("Kubeconfig", e.to_string()))?;
    let mut config = Config::from_custom_kubeconfig(kubeconfig, &KubeConfigOptions::default())
        .await
        .map_err(|e| {
            Error::internal_with_context(
                "client_from_kubeconfig",
                format!("failed to load kubeconfig: {}", e),
            )
        })?;
    config.connect_timeout = Some(DEFAULT_CONNECT_TIMEOUT);
    config.read_timeout = Some(DEFAULT_READ_TIMEOUT);
    client_from_config(config)
}

fn client_from_config(config: Config) -> Result<Client, Error> {
    Client::try_from(config).map_err(|e| {
        Error::internal_with_context("create_client", format!("failed to create client: {}", e))
    })
}

/// Whether a kube error means the API server could not be reached at all
///
/// Transport failures and 503 responses count; any other API status means
/// the server answered and the error is about the request.
pub fn is_unreachable(err: &kube::Error) -> bool {
    match err {
        kube::Error::Api(ae) => ae.code == 503,
        kube::Error::HyperError(_) | kube::Error::Service(_) => true,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn api(code: u16) -> kube::Error {
        kube::Error::Api(kube::error::ErrorResponse {
            status: "Failure".to_string(),
            message: "test".to_string(),
            reason: "Test".to_string(),
            code,
        })
    }

    #[test]
    fn api_responses_are_reachable_except_unavailable() {
        assert!(!is_unreachable(&api(404)));
        assert!(!is_unreachable(&api(409)));
        assert!(!is_unreachable(&api(500)));
        assert!(is_unreachable(&api(503)));
    }

    #[test]
    fn service_errors_are_unreachable() {
        let err = kube::Error::Service("connection refused".into());
        assert!(is_unreachable(&err));
    }

    #[tokio::test]
    async fn malformed_kubeconfig_is_not_deferrable() {
        let err = client_from_kubeconfig_yaml("clusters: [unterminated")
            .await
            .err().expect("expected malformed kubeconfig to fail");
        assert!(matches!(err, Error::Serialization { .. }));
        assert!(!err.is_deferrable());
        assert!(!err.is_retryable());
    }

    #[test]
    fn apply_params_use_operator_field_manager() {
        let params = apply_params();
        assert_eq!(params.field_manager.as_deref(), Some(OPERATOR_NAME));
        assert!(params.force);
    }
}
