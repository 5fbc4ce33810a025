//! Concrete resources managed for every tenant cluster
//!
//! Host side: the etcd encryption key and the operator kubeconfig Secrets.
//! Tenant side: the managed namespace, chart values ConfigMaps and
//! ChartConfigs. [`default_resource_set`] wires them in reconcile order.

pub mod chartconfig;
pub mod configmap;
pub mod encryption_key;
pub mod kubeconfig;
pub mod namespace;

use std::sync::Arc;

use tracing::debug;

use cluster_operator_common::{is_already_exists, is_not_found, Error, Result};

use crate::certs::CertificateSource;
use crate::charts::ChartValuesConfig;
use crate::clients::HostClient;
use crate::set::ResourceSet;
use crate::tenant::TenantClusterFactory;
use crate::wrapper::CrudResourceWrapper;

pub use chartconfig::ChartConfigResource;
pub use configmap::ConfigMapResource;
pub use encryption_key::{EncryptionKeyResource, KeyGenerator, RandomKeyGenerator};
pub use kubeconfig::KubeconfigResource;
pub use namespace::NamespaceResource;

/// Collaborators shared by the default resources
#[derive(Clone)]
pub struct ResourceDeps {
    /// Host cluster client
    pub host: Arc<dyn HostClient>,
    /// Namespace of host side Secrets
    pub secret_namespace: String,
    /// Certificate lookups
    pub certs: Arc<dyn CertificateSource>,
    /// Tenant client factory
    pub tenants: Arc<dyn TenantClusterFactory>,
    /// Encryption key generator
    pub keys: Arc<dyn KeyGenerator>,
    /// Chart value template inputs
    pub chart_values: ChartValuesConfig,
}

/// Every resource in reconcile order
pub fn default_resource_set(deps: ResourceDeps) -> Result<ResourceSet> {
    let encryption_key = EncryptionKeyResource::builder()
        .host_client(deps.host.clone())
        .namespace(deps.secret_namespace.clone())
        .key_generator(deps.keys)
        .build()?;
    let kubeconfig = KubeconfigResource::builder()
        .host_client(deps.host)
        .namespace(deps.secret_namespace)
        .certificate_source(deps.certs)
        .build()?;
    let namespace = NamespaceResource::builder()
        .tenant_factory(deps.tenants.clone())
        .build()?;
    let configmap = ConfigMapResource::builder()
        .tenant_factory(deps.tenants.clone())
        .chart_values(deps.chart_values)
        .build()?;
    let chartconfig = ChartConfigResource::builder()
        .tenant_factory(deps.tenants)
        .build()?;

    ResourceSet::new(vec![
        Box::new(CrudResourceWrapper::new(encryption_key)),
        Box::new(CrudResourceWrapper::new(kubeconfig)),
        Box::new(CrudResourceWrapper::new(namespace)),
        Box::new(CrudResourceWrapper::new(configmap)),
        Box::new(CrudResourceWrapper::new(chartconfig)),
    ])
}

/// Absent objects read as `None`
pub(crate) fn found<T>(result: Result<T>) -> Result<Option<T>> {
    match result {
        Ok(obj) => Ok(Some(obj)),
        Err(e) if is_not_found(&e) => Ok(None),
        Err(e) => Err(e),
    }
}

/// Creating an object that already exists succeeds
pub(crate) fn created(result: Result<()>, kind: &str, name: &str) -> Result<()> {
    match result {
        Err(e) if is_already_exists(&e) => {
            debug!(kind, name, "already exists");
            Ok(())
        }
        other => other,
    }
}

/// Deleting an object that is already gone succeeds
pub(crate) fn deleted(result: Result<()>, kind: &str, name: &str) -> Result<()> {
    match result {
        Err(e) if is_not_found(&e) => {
            debug!(kind, name, "already deleted");
            Ok(())
        }
        other => other,
    }
}

pub(crate) fn missing(resource: &str, what: &str) -> Error {
    Error::invalid_config(format!("{} resource requires {}", resource, what))
}

#[cfg(test)]
pub(crate) mod testing {
    use std::collections::BTreeMap;
    use std::sync::Arc;

    use tokio_util::sync::CancellationToken;

    use cluster_operator_common::crd::{
        AWSClusterConfig, AWSClusterConfigSpec, AWSClusterGuestConfig, AWSWorker, Cluster,
        ClusterGuestConfig, ClusterSpec, ProviderSpec, VersionBundleRef,
    };
    use cluster_operator_common::key::ClusterObject;
    use cluster_operator_common::{
        Provider, LABEL_CLUSTER, LABEL_CLUSTER_OPERATOR_VERSION, LABEL_ORGANIZATION,
    };
    use cluster_operator_versionbundle::VersionBundle;

    use crate::certs::CertificateBundle;
    use crate::charts::ChartValuesConfig;
    use crate::resource::ReconcileContext;

    pub fn aws_object(id: &str) -> ClusterObject {
        let spec = AWSClusterConfigSpec {
            guest: AWSClusterGuestConfig {
                cluster: ClusterGuestConfig {
                    id: id.to_string(),
                    owner: "acme".to_string(),
                    dns_zone: "example.com".to_string(),
                    ..Default::default()
                },
                workers: vec![AWSWorker::default(); 3],
            },
            version_bundle: VersionBundleRef {
                version: "0.4.0".to_string(),
            },
        };
        ClusterObject::Aws(Arc::new(AWSClusterConfig::new(id, spec)))
    }

    pub fn capi_object(id: &str) -> ClusterObject {
        let mut cluster = Cluster::new(
            id,
            ClusterSpec {
                provider_spec: ProviderSpec {
                    value: Some(serde_json::json!({
                        "cluster": {"dns": {"domain": "example.com"}},
                        "workers": [{}, {}]
                    })),
                },
            },
        );
        cluster.metadata.labels = Some(BTreeMap::from([
            (LABEL_CLUSTER.to_string(), id.to_string()),
            (LABEL_ORGANIZATION.to_string(), "acme".to_string()),
            (LABEL_CLUSTER_OPERATOR_VERSION.to_string(), "0.1.0".to_string()),
        ]));
        ClusterObject::ClusterApi(Arc::new(cluster))
    }

    /// The same object with a deletion timestamp set
    pub fn deleting(obj: &ClusterObject) -> ClusterObject {
        let set_timestamp = |mut value: serde_json::Value| {
            value["metadata"]["deletionTimestamp"] =
                serde_json::Value::String("2024-01-01T00:00:00Z".to_string());
            value
        };
        match obj {
            ClusterObject::Aws(o) => ClusterObject::Aws(Arc::new(
                serde_json::from_value(set_timestamp(serde_json::to_value(o.as_ref()).unwrap()))
                    .unwrap(),
            )),
            ClusterObject::ClusterApi(o) => ClusterObject::ClusterApi(Arc::new(
                serde_json::from_value(set_timestamp(serde_json::to_value(o.as_ref()).unwrap()))
                    .unwrap(),
            )),
            other => panic!("unsupported test object {}", other.kind()),
        }
    }

    pub fn bundle() -> VersionBundle {
        VersionBundle::new(Provider::Aws, "0.4.0", 2018, 10, 9)
            .component("cluster-operator", "0.4.0")
            .component("chart-operator", "0.5.0")
            .component("coredns", "1.2.2")
            .component("nginx-ingress-controller", "0.19.0")
            .component("node-exporter", "0.16.0")
    }

    pub fn context() -> ReconcileContext {
        ReconcileContext::new(bundle(), CancellationToken::new())
    }

    pub fn certs() -> CertificateBundle {
        CertificateBundle {
            ca: "CA".into(),
            crt: "CRT".into(),
            key: "KEY".into(),
        }
    }

    pub fn chart_values() -> ChartValuesConfig {
        ChartValuesConfig {
            cluster_ip_range: "172.31.0.0/16".into(),
            cluster_dns_ip: "172.31.0.10".into(),
            cluster_domain: "cluster.local".into(),
            registry_domain: "quay.io".into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cluster_operator_common::error::api_error;

    use crate::certs::MockCertificateSource;
    use crate::clients::MockHostClient;
    use crate::tenant::MockTenantClusterFactory;

    #[test]
    fn not_found_reads_as_absent() {
        assert_eq!(found(Ok(1)).unwrap(), Some(1));
        assert_eq!(
            found::<i32>(Err(api_error(404, "NotFound", "gone"))).unwrap(),
            None
        );
        assert!(found::<i32>(Err(api_error(500, "InternalError", "boom"))).is_err());
    }

    #[test]
    fn create_and_delete_tolerate_their_idempotent_conflicts() {
        assert!(created(Err(api_error(409, "AlreadyExists", "exists")), "Secret", "a").is_ok());
        assert!(created(Err(api_error(409, "Conflict", "conflict")), "Secret", "a").is_err());
        assert!(deleted(Err(api_error(404, "NotFound", "gone")), "Secret", "a").is_ok());
        assert!(deleted(Err(api_error(403, "Forbidden", "no")), "Secret", "a").is_err());
    }

    #[test]
    fn default_set_runs_host_resources_first() {
        let set = default_resource_set(ResourceDeps {
            host: Arc::new(MockHostClient::new()),
            secret_namespace: "default".into(),
            certs: Arc::new(MockCertificateSource::new()),
            tenants: Arc::new(MockTenantClusterFactory::new()),
            keys: Arc::new(RandomKeyGenerator),
            chart_values: testing::chart_values(),
        })
        .unwrap();
        assert_eq!(
            set.names(),
            vec!["encryptionkey", "kubeconfig", "namespace", "configmap", "chartconfig"]
        );
    }

    #[test]
    fn default_set_rejects_incomplete_configuration() {
        let result = default_resource_set(ResourceDeps {
            host: Arc::new(MockHostClient::new()),
            secret_namespace: String::new(),
            certs: Arc::new(MockCertificateSource::new()),
            tenants: Arc::new(MockTenantClusterFactory::new()),
            keys: Arc::new(RandomKeyGenerator),
            chart_values: testing::chart_values(),
        });
        assert!(matches!(result, Err(Error::InvalidConfig { .. })));
    }
}
