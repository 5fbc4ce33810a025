//! Certificates the operator uses to reach tenant cluster APIs
//!
//! The certificates are issued out of band and stored in the host cluster as
//! Secret `<clusterID>-cluster-operator-api` with PEM data under `ca`, `crt`
//! and `key`. Until they exist the tenant cluster cannot be reached and
//! lookups report [`Error::CertificatesNotFound`].

use std::sync::Arc;

use async_trait::async_trait;
use k8s_openapi::api::core::v1::Secret;
use tracing::debug;

#[cfg(test)]
use mockall::automock;

use cluster_operator_common::cache::Cache;
use cluster_operator_common::key::certificate_secret_name;
use cluster_operator_common::{is_not_found, Error, Result};

use crate::clients::HostClient;

/// Certificate name of the operator's tenant API client certificate
pub const CLUSTER_OPERATOR_API_CERT: &str = "cluster-operator-api";

/// PEM encoded client certificate material
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CertificateBundle {
    /// CA certificate of the tenant API
    pub ca: String,
    /// Client certificate
    pub crt: String,
    /// Client private key
    pub key: String,
}

/// Looks up issued certificates for a tenant cluster
#[cfg_attr(test, automock)]
#[async_trait]
pub trait CertificateSource: Send + Sync {
    /// Certificates of `cluster_id`
    async fn search(&self, cluster_id: &str) -> Result<CertificateBundle>;
}

/// Reads certificates from host cluster Secrets
pub struct HostCertificateSource {
    host: Arc<dyn HostClient>,
    namespace: String,
}

impl HostCertificateSource {
    /// Read certificate Secrets from `namespace` of the host cluster
    pub fn new(host: Arc<dyn HostClient>, namespace: impl Into<String>) -> Self {
        Self {
            host,
            namespace: namespace.into(),
        }
    }
}

fn secret_value(secret: &Secret, key: &str) -> Option<String> {
    let bytes = secret.data.as_ref()?.get(key)?;
    String::from_utf8(bytes.0.clone())
        .ok()
        .filter(|value| !value.is_empty())
}

#[async_trait]
impl CertificateSource for HostCertificateSource {
    async fn search(&self, cluster_id: &str) -> Result<CertificateBundle> {
        let name = certificate_secret_name(cluster_id, CLUSTER_OPERATOR_API_CERT);
        let secret = match self.host.get_secret(&self.namespace, &name).await {
            Ok(secret) => secret,
            Err(e) if is_not_found(&e) => {
                return Err(Error::certificates_not_found(
                    cluster_id,
                    CLUSTER_OPERATOR_API_CERT,
                ))
            }
            Err(e) => return Err(e),
        };

        let field = |key: &str| {
            secret_value(&secret, key).ok_or_else(|| {
                Error::certificates_not_found(
                    cluster_id,
                    format!("{} ({} missing)", CLUSTER_OPERATOR_API_CERT, key),
                )
            })
        };
        Ok(CertificateBundle {
            ca: field("ca")?,
            crt: field("crt")?,
            key: field("key")?,
        })
    }
}

/// Certificate source consulting a cache first
///
/// Misses fall through to the inner source and the result is stored back.
/// With a [`cluster_operator_common::cache::NoopCache`] every lookup reaches
/// the inner source and results are identical.
pub struct CachedCertificateSource {
    inner: Arc<dyn CertificateSource>,
    cache: Arc<dyn Cache<CertificateBundle>>,
}

impl CachedCertificateSource {
    /// Wrap `inner` with `cache`
    pub fn new(inner: Arc<dyn CertificateSource>, cache: Arc<dyn Cache<CertificateBundle>>) -> Self {
        Self { inner, cache }
    }
}

#[async_trait]
impl CertificateSource for CachedCertificateSource {
    async fn search(&self, cluster_id: &str) -> Result<CertificateBundle> {
        if let Some(bundle) = self.cache.get(cluster_id) {
            debug!(cluster = cluster_id, "certificate cache hit");
            return Ok(bundle);
        }
        let bundle = self.inner.search(cluster_id).await?;
        self.cache.put(cluster_id, bundle.clone());
        Ok(bundle)
    }
}
