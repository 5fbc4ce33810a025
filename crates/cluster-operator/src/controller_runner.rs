//! Controller runner - builds the resource set and one controller per provider
//!
//! Controller construction is kept free of side effects: callers get boxed
//! futures and decide how to drive them.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use kube::runtime::watcher::Config as WatcherConfig;
use kube::runtime::Controller;
use kube::{Api, Client};
use serde::de::DeserializeOwned;
use tracing::info;

use cluster_operator_common::cache::{Cache, NoopCache, TtlCache};
use cluster_operator_common::crd::{AWSClusterConfig, AzureClusterConfig, Cluster, KVMClusterConfig};
use cluster_operator_common::key::ClusterObject;
use cluster_operator_common::{Provider, Result};
use cluster_operator_resource::certs::{
    CachedCertificateSource, CertificateBundle, CertificateSource, HostCertificateSource,
};
use cluster_operator_resource::clients::{HostClient, KubeHostClient, TenantClient};
use cluster_operator_resource::resources::{default_resource_set, RandomKeyGenerator, ResourceDeps};
use cluster_operator_resource::tenant::{
    CachedTenantClusterFactory, KubeTenantClusterFactory, TENANT_CLIENT_TTL,
};
use cluster_operator_resource::ResourceSet;

use crate::config::OperatorConfig;
use crate::controller::{error_policy, reconcile, Context};

/// Watcher timeout (seconds) - must be less than client read_timeout (30s)
const WATCH_TIMEOUT_SECS: u32 = 25;

/// Controller future driven by the caller
pub type ControllerFuture = Pin<Box<dyn Future<Output = ()> + Send>>;

/// Certificate cache for `ttl`; a zero TTL disables caching
pub fn certificate_cache(ttl: Duration) -> Arc<dyn Cache<CertificateBundle>> {
    if ttl.is_zero() {
        info!("certificate cache disabled");
        Arc::new(NoopCache)
    } else {
        info!(ttl_secs = ttl.as_secs(), "certificate cache enabled");
        Arc::new(TtlCache::new(ttl))
    }
}

/// Wire the managed resources against the host cluster
pub fn build_resource_set(client: Client, config: &OperatorConfig) -> Result<ResourceSet> {
    let host: Arc<dyn HostClient> = Arc::new(KubeHostClient::new(client));
    let certs: Arc<dyn CertificateSource> = Arc::new(CachedCertificateSource::new(
        Arc::new(HostCertificateSource::new(
            host.clone(),
            config.secret_namespace.clone(),
        )),
        certificate_cache(config.cert_cache_ttl),
    ));
    let tenant_clients: Arc<dyn Cache<Arc<dyn TenantClient>>> =
        Arc::new(TtlCache::new(TENANT_CLIENT_TTL));
    let tenants = Arc::new(CachedTenantClusterFactory::new(
        Arc::new(KubeTenantClusterFactory::new(certs.clone())),
        tenant_clients,
    ));

    default_resource_set(ResourceDeps {
        host,
        secret_namespace: config.secret_namespace.clone(),
        certs,
        tenants,
        keys: Arc::new(RandomKeyGenerator),
        chart_values: config.chart_values.clone(),
    })
}

/// Build one controller future per enabled provider
pub fn build_controllers(
    client: Client,
    ctx: Arc<Context>,
    providers: &[Provider],
) -> Vec<ControllerFuture> {
    providers
        .iter()
        .map(|provider| {
            let name = provider.kind();
            info!("- {} controller", name);
            match provider {
                Provider::Aws => controller_for::<AWSClusterConfig>(client.clone(), ctx.clone(), name),
                Provider::Azure => {
                    controller_for::<AzureClusterConfig>(client.clone(), ctx.clone(), name)
                }
                Provider::Kvm => controller_for::<KVMClusterConfig>(client.clone(), ctx.clone(), name),
                Provider::ClusterApi => controller_for::<Cluster>(client.clone(), ctx.clone(), name),
            }
        })
        .collect()
}

fn controller_for<K>(client: Client, ctx: Arc<Context>, name: &'static str) -> ControllerFuture
where
    K: kube::Resource<DynamicType = ()>
        + Clone
        + std::fmt::Debug
        + DeserializeOwned
        + Send
        + Sync
        + 'static,
    Arc<K>: Into<ClusterObject>,
{
    let api: Api<K> = Api::all(client);
    Box::pin(
        Controller::new(api, WatcherConfig::default().timeout(WATCH_TIMEOUT_SECS))
            .shutdown_on_signal()
            .run(reconcile::<K>, error_policy::<K>, ctx)
            .for_each(log_reconcile_result(name)),
    )
}

fn log_reconcile_result<T: std::fmt::Debug, E: std::fmt::Debug>(
    controller_name: &'static str,
) -> impl Fn(std::result::Result<T, E>) -> std::future::Ready<()> {
    move |result| {
        match result {
            Ok(action) => tracing::debug!(?action, "{} reconciliation completed", controller_name),
            Err(e) => tracing::error!(error = ?e, "{} reconciliation error", controller_name),
        }
        std::future::ready(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_ttl_disables_the_certificate_cache() {
        let bundle = CertificateBundle {
            ca: "CA".into(),
            crt: "CRT".into(),
            key: "KEY".into(),
        };

        let cache = certificate_cache(Duration::ZERO);
        cache.put("al9qy", bundle.clone());
        assert_eq!(cache.get("al9qy"), None);

        let cache = certificate_cache(Duration::from_secs(60));
        cache.put("al9qy", bundle.clone());
        assert_eq!(cache.get("al9qy"), Some(bundle));
    }
}
