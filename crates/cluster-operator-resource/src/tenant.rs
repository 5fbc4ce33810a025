//! Tenant cluster client construction

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

#[cfg(test)]
use mockall::automock;

use cluster_operator_common::cache::Cache;
use cluster_operator_common::crd::ClusterGuestConfig;
use cluster_operator_common::key::api_domain;
use cluster_operator_common::kube_utils::client_from_kubeconfig_yaml;
use cluster_operator_common::Result;

use crate::certs::CertificateSource;
use crate::clients::{KubeTenantClient, TenantClient};
use crate::kubeconfig::render_kubeconfig;

/// How long a built tenant client is reused across resources and passes
pub const TENANT_CLIENT_TTL: Duration = Duration::from_secs(60);

/// Builds clients for tenant cluster APIs
#[cfg_attr(test, automock)]
#[async_trait]
pub trait TenantClusterFactory: Send + Sync {
    /// Client for the tenant cluster identified by `guest`
    async fn tenant_client(&self, guest: &ClusterGuestConfig) -> Result<Arc<dyn TenantClient>>;
}

/// Factory authenticating with the operator's issued client certificates
pub struct KubeTenantClusterFactory {
    certs: Arc<dyn CertificateSource>,
}

impl KubeTenantClusterFactory {
    /// Create a factory using certificates from `certs`
    pub fn new(certs: Arc<dyn CertificateSource>) -> Self {
        Self { certs }
    }
}

#[async_trait]
impl TenantClusterFactory for KubeTenantClusterFactory {
    async fn tenant_client(&self, guest: &ClusterGuestConfig) -> Result<Arc<dyn TenantClient>> {
        let certs = self.certs.search(&guest.id).await?;
        let domain = api_domain(guest);
        let kubeconfig = render_kubeconfig(&guest.id, &domain, &certs)?;
        // Building a client does not connect, so failures here are never deferrable
        let client = client_from_kubeconfig_yaml(&kubeconfig).await?;
        debug!(cluster = %guest.id, api = %domain, "tenant client created");
        Ok(Arc::new(KubeTenantClient::new(client, &guest.id)))
    }
}

/// [`TenantClusterFactory`] reusing clients per cluster ID
///
/// Every tenant resource asks for a client on each step; without reuse each
/// ask repeats the certificate lookup and builds a fresh connection pool.
/// Failures are never stored.
pub struct CachedTenantClusterFactory {
    inner: Arc<dyn TenantClusterFactory>,
    cache: Arc<dyn Cache<Arc<dyn TenantClient>>>,
}

impl CachedTenantClusterFactory {
    /// Reuse clients built by `inner` through `cache`
    pub fn new(
        inner: Arc<dyn TenantClusterFactory>,
        cache: Arc<dyn Cache<Arc<dyn TenantClient>>>,
    ) -> Self {
        Self { inner, cache }
    }
}

#[async_trait]
impl TenantClusterFactory for CachedTenantClusterFactory {
    async fn tenant_client(&self, guest: &ClusterGuestConfig) -> Result<Arc<dyn TenantClient>> {
        if let Some(client) = self.cache.get(&guest.id) {
            return Ok(client);
        }
        let client = self.inner.tenant_client(guest).await?;
        self.cache.put(&guest.id, client.clone());
        Ok(client)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cluster_operator_common::cache::TtlCache;
    use cluster_operator_common::Error;

    use crate::certs::MockCertificateSource;
    use crate::clients::MockTenantClient;

    fn guest(id: &str) -> ClusterGuestConfig {
        ClusterGuestConfig {
            id: id.into(),
            dns_zone: "example.com".into(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn missing_certificates_stop_client_creation() {
        let mut certs = MockCertificateSource::new();
        certs
            .expect_search()
            .returning(|id| Err(Error::certificates_not_found(id, "cluster-operator-api")));

        let factory = KubeTenantClusterFactory::new(Arc::new(certs));
        let err = match factory.tenant_client(&guest("al9qy")).await {
            Ok(_) => panic!("expected certificates error"),
            Err(e) => e,
        };
        assert!(matches!(err, Error::CertificatesNotFound { .. }));
        assert!(err.is_deferrable());
    }

    /// Story: one client serves every resource of a cluster until it expires
    #[tokio::test]
    async fn story_tenant_clients_are_reused_per_cluster() {
        let mut inner = MockTenantClusterFactory::new();
        inner
            .expect_tenant_client()
            .withf(|guest| guest.id == "al9qy")
            .times(1)
            .returning(|_| Ok(Arc::new(MockTenantClient::new()) as Arc<dyn TenantClient>));
        inner
            .expect_tenant_client()
            .withf(|guest| guest.id == "b7r2k")
            .times(1)
            .returning(|_| Ok(Arc::new(MockTenantClient::new()) as Arc<dyn TenantClient>));

        let factory = CachedTenantClusterFactory::new(
            Arc::new(inner),
            Arc::new(TtlCache::new(TENANT_CLIENT_TTL)),
        );
        let first = factory.tenant_client(&guest("al9qy")).await.unwrap();
        let second = factory.tenant_client(&guest("al9qy")).await.unwrap();
        assert!(Arc::ptr_eq(&first, &second));

        factory.tenant_client(&guest("b7r2k")).await.unwrap();
    }

    #[tokio::test]
    async fn failed_client_builds_are_not_reused() {
        let mut inner = MockTenantClusterFactory::new();
        inner
            .expect_tenant_client()
            .times(2)
            .returning(|g| Err(Error::certificates_not_found(&g.id, "cluster-operator-api")));

        let factory = CachedTenantClusterFactory::new(
            Arc::new(inner),
            Arc::new(TtlCache::new(TENANT_CLIENT_TTL)),
        );
        assert!(factory.tenant_client(&guest("al9qy")).await.is_err());
        assert!(factory.tenant_client(&guest("al9qy")).await.is_err());
    }
}
