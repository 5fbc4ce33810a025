//! Operator kubeconfig Secret in the host cluster
//!
//! Secret `<clusterID>-kubeconfig` holds a kubeconfig for the tenant API,
//! rendered from the operator's issued certificates, under `kubeConfig`.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use k8s_openapi::api::core::v1::Secret;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use k8s_openapi::ByteString;
use kube::ResourceExt;
use tracing::info;

use cluster_operator_common::key::{
    api_domain, cluster_guest_config, cluster_labels, kubeconfig_secret_name, ClusterObject,
};
use cluster_operator_common::Result;

use crate::certs::CertificateSource;
use crate::clients::HostClient;
use crate::diff::{single_delete_patch, single_update_patch};
use crate::kubeconfig::render_kubeconfig;
use crate::resource::{CrudResource, Patch, ReconcileContext};
use crate::resources::{created, deleted, found, missing};

/// Resource name
pub const NAME: &str = "kubeconfig";

/// Data key holding the kubeconfig
pub const KUBECONFIG_DATA: &str = "kubeConfig";

/// Manages the kubeconfig Secret of a tenant cluster
pub struct KubeconfigResource {
    host: Arc<dyn HostClient>,
    namespace: String,
    certs: Arc<dyn CertificateSource>,
}

impl KubeconfigResource {
    /// Start building the resource
    pub fn builder() -> KubeconfigResourceBuilder {
        KubeconfigResourceBuilder::default()
    }
}

/// Builder for [`KubeconfigResource`]
#[derive(Default)]
pub struct KubeconfigResourceBuilder {
    host: Option<Arc<dyn HostClient>>,
    namespace: Option<String>,
    certs: Option<Arc<dyn CertificateSource>>,
}

impl KubeconfigResourceBuilder {
    /// Host cluster client
    pub fn host_client(mut self, host: Arc<dyn HostClient>) -> Self {
        self.host = Some(host);
        self
    }

    /// Namespace of the Secret
    pub fn namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    /// Source of the certificates embedded in the kubeconfig
    pub fn certificate_source(mut self, certs: Arc<dyn CertificateSource>) -> Self {
        self.certs = Some(certs);
        self
    }

    /// Build the resource; every collaborator is required
    pub fn build(self) -> Result<KubeconfigResource> {
        let host = self.host.ok_or_else(|| missing(NAME, "a host client"))?;
        let namespace = self
            .namespace
            .filter(|ns| !ns.is_empty())
            .ok_or_else(|| missing(NAME, "a namespace"))?;
        let certs = self
            .certs
            .ok_or_else(|| missing(NAME, "a certificate source"))?;
        Ok(KubeconfigResource {
            host,
            namespace,
            certs,
        })
    }
}

#[async_trait]
impl CrudResource for KubeconfigResource {
    type State = Option<Secret>;

    fn name(&self) -> &str {
        NAME
    }

    async fn get_current_state(
        &self,
        _ctx: &ReconcileContext,
        obj: &ClusterObject,
    ) -> Result<Option<Secret>> {
        let guest = cluster_guest_config(obj)?;
        let name = kubeconfig_secret_name(&guest);
        found(self.host.get_secret(&self.namespace, &name).await)
    }

    async fn get_desired_state(
        &self,
        _ctx: &ReconcileContext,
        obj: &ClusterObject,
    ) -> Result<Option<Secret>> {
        let guest = cluster_guest_config(obj)?;
        let mut secret = Secret {
            metadata: ObjectMeta {
                name: Some(kubeconfig_secret_name(&guest)),
                namespace: Some(self.namespace.clone()),
                labels: Some(cluster_labels(&guest)),
                ..Default::default()
            },
            ..Default::default()
        };
        // Deletion only needs the name; the certificates may already be gone.
        if obj.is_deleting() {
            return Ok(Some(secret));
        }

        let certs = self.certs.search(&guest.id).await?;
        let kubeconfig = render_kubeconfig(&guest.id, &api_domain(&guest), &certs)?;
        secret.data = Some(BTreeMap::from([(
            KUBECONFIG_DATA.to_string(),
            ByteString(kubeconfig.into_bytes()),
        )]));
        Ok(Some(secret))
    }

    fn new_update_patch(
        &self,
        _obj: &ClusterObject,
        current: &Option<Secret>,
        desired: &Option<Secret>,
    ) -> Result<Patch<Option<Secret>>> {
        Ok(single_update_patch(current, desired, |have, want| {
            have.data != want.data
        }))
    }

    fn new_delete_patch(
        &self,
        _obj: &ClusterObject,
        current: &Option<Secret>,
        desired: &Option<Secret>,
    ) -> Result<Patch<Option<Secret>>> {
        Ok(single_delete_patch(current, desired))
    }

    async fn apply_create_change(
        &self,
        _ctx: &ReconcileContext,
        _obj: &ClusterObject,
        create: &Option<Secret>,
    ) -> Result<()> {
        let Some(secret) = create else {
            return Ok(());
        };
        let name = secret.name_any();
        info!(secret = %name, "creating kubeconfig secret");
        created(
            self.host.create_secret(&self.namespace, secret).await,
            "Secret",
            &name,
        )
    }

    async fn apply_update_change(
        &self,
        _ctx: &ReconcileContext,
        _obj: &ClusterObject,
        update: &Option<Secret>,
    ) -> Result<()> {
        let Some(secret) = update else {
            return Ok(());
        };
        info!(secret = %secret.name_any(), "updating kubeconfig secret");
        self.host.update_secret(&self.namespace, secret).await
    }

    async fn apply_delete_change(
        &self,
        _ctx: &ReconcileContext,
        _obj: &ClusterObject,
        delete: &Option<Secret>,
    ) -> Result<()> {
        let Some(secret) = delete else {
            return Ok(());
        };
        let name = secret.name_any();
        info!(secret = %name, "deleting kubeconfig secret");
        deleted(
            self.host.delete_secret(&self.namespace, &name).await,
            "Secret",
            &name,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::certs::{CachedCertificateSource, MockCertificateSource};
    use crate::clients::MockHostClient;
    use crate::resources::testing::{aws_object, capi_object, certs, context, deleting};
    use crate::wrapper::CrudResourceWrapper;
    use crate::{Resource, ResourceOutcome};
    use cluster_operator_common::cache::{NoopCache, TtlCache};
    use cluster_operator_common::error::api_error;
    use cluster_operator_common::Error;
    use std::time::Duration;

    fn cert_source(times: usize) -> Arc<dyn CertificateSource> {
        let mut source = MockCertificateSource::new();
        source.expect_search().times(times).returning(|_| Ok(certs()));
        Arc::new(source)
    }

    fn resource(host: MockHostClient, certs: Arc<dyn CertificateSource>) -> KubeconfigResource {
        KubeconfigResource::builder()
            .host_client(Arc::new(host))
            .namespace("default")
            .certificate_source(certs)
            .build()
            .unwrap()
    }

    #[test]
    fn builder_requires_certificate_source() {
        let result = KubeconfigResource::builder()
            .host_client(Arc::new(MockHostClient::new()))
            .namespace("default")
            .build();
        assert!(matches!(result, Err(Error::InvalidConfig { .. })));
    }

    #[tokio::test]
    async fn desired_secret_holds_rendered_kubeconfig() {
        let r = resource(MockHostClient::new(), cert_source(1));
        let secret = r
            .get_desired_state(&context(), &aws_object("al9qy"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(secret.name_any(), "al9qy-kubeconfig");
        let kubeconfig =
            String::from_utf8(secret.data.unwrap()[KUBECONFIG_DATA].0.clone()).unwrap();
        assert!(kubeconfig.contains("server: https://api.al9qy.k8s.example.com"));
    }

    #[tokio::test]
    async fn missing_certificates_cancel_the_resource() {
        let mut host = MockHostClient::new();
        host.expect_get_secret()
            .returning(|_, _| Err(api_error(404, "NotFound", "secrets not found")));
        host.expect_create_secret().never();
        let mut source = MockCertificateSource::new();
        source
            .expect_search()
            .returning(|id| Err(Error::certificates_not_found(id, "cluster-operator-api")));

        let outcome = CrudResourceWrapper::new(resource(host, Arc::new(source)))
            .ensure_created(&context(), &aws_object("al9qy"))
            .await
            .unwrap();
        assert!(matches!(outcome, ResourceOutcome::Canceled { .. }));
    }

    #[tokio::test]
    async fn deleting_object_needs_no_certificates() {
        let mut host = MockHostClient::new();
        host.expect_get_secret().returning(|_, name| {
            Ok(Secret {
                metadata: ObjectMeta {
                    name: Some(name.to_string()),
                    ..Default::default()
                },
                ..Default::default()
            })
        });
        host.expect_delete_secret()
            .withf(|_, name| name == "al9qy-kubeconfig")
            .times(1)
            .returning(|_, _| Ok(()));

        let obj = deleting(&aws_object("al9qy"));
        let outcome = CrudResourceWrapper::new(resource(host, cert_source(0)))
            .ensure_deleted(&context(), &obj)
            .await
            .unwrap();
        assert_eq!(outcome, ResourceOutcome::Reconciled);
    }

    #[tokio::test]
    async fn identical_kubeconfig_produces_empty_patch() {
        let r = resource(MockHostClient::new(), cert_source(1));
        let obj = capi_object("x7k2p");
        let desired = r.get_desired_state(&context(), &obj).await.unwrap();
        assert!(r.new_update_patch(&obj, &desired, &desired).unwrap().is_empty());

        let mut stale = desired.clone();
        if let Some(secret) = stale.as_mut() {
            secret.data = None;
        }
        let patch = r.new_update_patch(&obj, &stale, &desired).unwrap();
        assert_eq!(patch.update, Some(desired));
    }

    /// Story: enabling the certificate cache changes lookup counts, not state
    #[tokio::test]
    async fn story_cache_does_not_change_desired_state() {
        let obj = aws_object("al9qy");

        let cached = resource(
            MockHostClient::new(),
            Arc::new(CachedCertificateSource::new(
                cert_source(1),
                Arc::new(TtlCache::new(Duration::from_secs(300))),
            )),
        );
        let uncached = resource(
            MockHostClient::new(),
            Arc::new(CachedCertificateSource::new(
                cert_source(3),
                Arc::new(NoopCache),
            )),
        );

        for _ in 0..3 {
            let a = cached.get_desired_state(&context(), &obj).await.unwrap();
            let b = uncached.get_desired_state(&context(), &obj).await.unwrap();
            assert_eq!(a, b);
        }
    }
}
