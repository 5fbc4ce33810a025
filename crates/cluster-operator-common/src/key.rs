//! Key extraction over the supported cluster CRD kinds
//!
//! Every reconciliation works on a [`ClusterObject`], a closed set of the
//! CRD kinds this operator watches. The functions here pull typed views and
//! guest cluster fields out of it and derive the deterministic names of the
//! sub-resources the operator manages. Names are part of the on-cluster
//! contract and must not change.

use std::collections::BTreeMap;
use std::sync::Arc;

use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::api::DynamicObject;
use kube::Resource;

use crate::crd::{
    AWSClusterConfig, AzureClusterConfig, Cluster, ClusterApiProviderValue, ClusterGuestConfig,
    KVMClusterConfig, CAPI_GROUP, GROUP,
};
use crate::{
    Error, Provider, Result, LABEL_CLUSTER, LABEL_CLUSTER_OPERATOR_VERSION, LABEL_MANAGED_BY,
    LABEL_ORGANIZATION, OPERATOR_NAME,
};

/// Suffix of the host Secret holding the etcd encryption key
pub const ENCRYPTION_KEY_SUFFIX: &str = "encryption";

/// Suffix of the host Secret holding the operator kubeconfig
pub const KUBECONFIG_SUFFIX: &str = "kubeconfig";

/// A tenant cluster custom resource of any supported kind
#[derive(Clone, Debug)]
pub enum ClusterObject {
    /// AWSClusterConfig
    Aws(Arc<AWSClusterConfig>),
    /// AzureClusterConfig
    Azure(Arc<AzureClusterConfig>),
    /// KVMClusterConfig
    Kvm(Arc<KVMClusterConfig>),
    /// Cluster API Cluster
    ClusterApi(Arc<Cluster>),
}

impl ClusterObject {
    /// Provider the object belongs to
    pub fn provider(&self) -> Provider {
        match self {
            ClusterObject::Aws(_) => Provider::Aws,
            ClusterObject::Azure(_) => Provider::Azure,
            ClusterObject::Kvm(_) => Provider::Kvm,
            ClusterObject::ClusterApi(_) => Provider::ClusterApi,
        }
    }

    /// Kind of the wrapped CRD
    pub fn kind(&self) -> &'static str {
        self.provider().kind()
    }

    /// Object metadata
    pub fn meta(&self) -> &ObjectMeta {
        match self {
            ClusterObject::Aws(o) => o.meta(),
            ClusterObject::Azure(o) => o.meta(),
            ClusterObject::Kvm(o) => o.meta(),
            ClusterObject::ClusterApi(o) => o.meta(),
        }
    }

    /// Object name, empty when unset
    pub fn name(&self) -> &str {
        self.meta().name.as_deref().unwrap_or_default()
    }

    /// Whether the object is being deleted
    pub fn is_deleting(&self) -> bool {
        self.meta().deletion_timestamp.is_some()
    }

    /// Convert an untyped object into a [`ClusterObject`]
    ///
    /// Fails with `WrongType` for any group/kind this operator does not
    /// watch and with `EmptyValue` when the object is of a supported kind
    /// but carries no spec at all.
    pub fn from_dynamic(obj: &DynamicObject) -> Result<Self> {
        let types = obj
            .types
            .as_ref()
            .ok_or_else(|| Error::wrong_type("cluster custom resource", "untyped object"))?;
        let group = types
            .api_version
            .split_once('/')
            .map(|(group, _)| group)
            .unwrap_or_default();

        let provider = match (group, types.kind.as_str()) {
            (GROUP, "AWSClusterConfig") => Provider::Aws,
            (GROUP, "AzureClusterConfig") => Provider::Azure,
            (GROUP, "KVMClusterConfig") => Provider::Kvm,
            (CAPI_GROUP, "Cluster") => Provider::ClusterApi,
            _ => {
                return Err(Error::wrong_type(
                    "cluster custom resource",
                    format!("{}/{}", types.api_version, types.kind),
                ))
            }
        };

        if obj.data.get("spec").map_or(true, |spec| spec.is_null()) {
            return Err(Error::empty_value(format!(
                "{} {} has no spec",
                provider.kind(),
                obj.metadata.name.as_deref().unwrap_or_default()
            )));
        }

        let value = serde_json::to_value(obj)
            .map_err(|e| Error::serialization_for_kind(provider.kind(), e.to_string()))?;
        let parse_err =
            |e: serde_json::Error| Error::serialization_for_kind(provider.kind(), e.to_string());

        Ok(match provider {
            Provider::Aws => ClusterObject::Aws(Arc::new(
                serde_json::from_value(value).map_err(parse_err)?,
            )),
            Provider::Azure => ClusterObject::Azure(Arc::new(
                serde_json::from_value(value).map_err(parse_err)?,
            )),
            Provider::Kvm => ClusterObject::Kvm(Arc::new(
                serde_json::from_value(value).map_err(parse_err)?,
            )),
            Provider::ClusterApi => ClusterObject::ClusterApi(Arc::new(
                serde_json::from_value(value).map_err(parse_err)?,
            )),
        })
    }
}

impl From<Arc<AWSClusterConfig>> for ClusterObject {
    fn from(o: Arc<AWSClusterConfig>) -> Self {
        ClusterObject::Aws(o)
    }
}

impl From<Arc<AzureClusterConfig>> for ClusterObject {
    fn from(o: Arc<AzureClusterConfig>) -> Self {
        ClusterObject::Azure(o)
    }
}

impl From<Arc<KVMClusterConfig>> for ClusterObject {
    fn from(o: Arc<KVMClusterConfig>) -> Self {
        ClusterObject::Kvm(o)
    }
}

impl From<Arc<Cluster>> for ClusterObject {
    fn from(o: Arc<Cluster>) -> Self {
        ClusterObject::ClusterApi(o)
    }
}

/// Typed view of an AWSClusterConfig
pub fn to_aws_cluster_config(obj: &ClusterObject) -> Result<&AWSClusterConfig> {
    match obj {
        ClusterObject::Aws(o) => Ok(o.as_ref()),
        other => Err(Error::wrong_type("AWSClusterConfig", other.kind())),
    }
}

/// Typed view of an AzureClusterConfig
pub fn to_azure_cluster_config(obj: &ClusterObject) -> Result<&AzureClusterConfig> {
    match obj {
        ClusterObject::Azure(o) => Ok(o.as_ref()),
        other => Err(Error::wrong_type("AzureClusterConfig", other.kind())),
    }
}

/// Typed view of a KVMClusterConfig
pub fn to_kvm_cluster_config(obj: &ClusterObject) -> Result<&KVMClusterConfig> {
    match obj {
        ClusterObject::Kvm(o) => Ok(o.as_ref()),
        other => Err(Error::wrong_type("KVMClusterConfig", other.kind())),
    }
}

/// Typed view of a Cluster API Cluster
pub fn to_capi_cluster(obj: &ClusterObject) -> Result<&Cluster> {
    match obj {
        ClusterObject::ClusterApi(o) => Ok(o.as_ref()),
        other => Err(Error::wrong_type("Cluster", other.kind())),
    }
}

/// Parse `spec.providerSpec.value` of a Cluster API cluster
pub fn capi_provider_value(cluster: &Cluster) -> Result<ClusterApiProviderValue> {
    let value = cluster.spec.provider_spec.value.as_ref().ok_or_else(|| {
        Error::empty_value(format!(
            "Cluster {} has no providerSpec value",
            cluster.meta().name.as_deref().unwrap_or_default()
        ))
    })?;
    serde_json::from_value(value.clone())
        .map_err(|e| Error::serialization_for_kind("Cluster", e.to_string()))
}

fn label<'a>(meta: &'a ObjectMeta, key: &str) -> Option<&'a str> {
    meta.labels.as_ref()?.get(key).map(String::as_str)
}

/// Guest cluster identity of any supported object
pub fn cluster_guest_config(obj: &ClusterObject) -> Result<ClusterGuestConfig> {
    match obj {
        ClusterObject::Aws(o) => Ok(o.spec.guest.cluster.clone()),
        ClusterObject::Azure(o) => Ok(o.spec.guest.cluster.clone()),
        ClusterObject::Kvm(o) => Ok(o.spec.guest.cluster.clone()),
        ClusterObject::ClusterApi(o) => {
            let value = capi_provider_value(o)?;
            let meta = o.meta();
            Ok(ClusterGuestConfig {
                id: label(meta, LABEL_CLUSTER)
                    .or(meta.name.as_deref())
                    .unwrap_or_default()
                    .to_string(),
                owner: label(meta, LABEL_ORGANIZATION)
                    .unwrap_or_default()
                    .to_string(),
                dns_zone: value.cluster.dns.domain,
                name: meta.name.clone(),
                release_version: None,
            })
        }
    }
}

/// Tenant cluster ID
pub fn cluster_id(obj: &ClusterObject) -> Result<String> {
    Ok(cluster_guest_config(obj)?.id)
}

/// Organization owning the tenant cluster
pub fn organization(obj: &ClusterObject) -> Result<String> {
    Ok(cluster_guest_config(obj)?.owner)
}

/// Base DNS zone of the tenant cluster
pub fn dns_zone(obj: &ClusterObject) -> Result<String> {
    Ok(cluster_guest_config(obj)?.dns_zone)
}

/// Domain of the tenant cluster Kubernetes API
pub fn api_domain(cfg: &ClusterGuestConfig) -> String {
    format!("api.{}.k8s.{}", cfg.id, cfg.dns_zone)
}

/// Number of worker nodes declared for the tenant cluster
pub fn worker_count(obj: &ClusterObject) -> Result<usize> {
    match obj {
        ClusterObject::Aws(o) => Ok(o.spec.guest.workers.len()),
        ClusterObject::Azure(o) => Ok(o.spec.guest.workers.len()),
        ClusterObject::Kvm(o) => Ok(o.spec.guest.workers.len()),
        ClusterObject::ClusterApi(o) => Ok(capi_provider_value(o)?.workers.len()),
    }
}

/// cluster-operator version bundle version the object is pinned to
pub fn version_bundle_version(obj: &ClusterObject) -> Result<String> {
    match obj {
        ClusterObject::Aws(o) => Ok(o.spec.version_bundle.version.clone()),
        ClusterObject::Azure(o) => Ok(o.spec.version_bundle.version.clone()),
        ClusterObject::Kvm(o) => Ok(o.spec.version_bundle.version.clone()),
        ClusterObject::ClusterApi(o) => label(o.meta(), LABEL_CLUSTER_OPERATOR_VERSION)
            .map(str::to_string)
            .ok_or_else(|| {
                Error::empty_value(format!(
                    "Cluster {} has no {} label",
                    o.meta().name.as_deref().unwrap_or_default(),
                    LABEL_CLUSTER_OPERATOR_VERSION
                ))
            }),
    }
}

/// Name of the host Secret holding the encryption key: `<clusterID>-encryption`
pub fn encryption_key_secret_name(cfg: &ClusterGuestConfig) -> String {
    format!("{}-{}", cfg.id, ENCRYPTION_KEY_SUFFIX)
}

/// Name of the host Secret holding the operator kubeconfig: `<clusterID>-kubeconfig`
pub fn kubeconfig_secret_name(cfg: &ClusterGuestConfig) -> String {
    format!("{}-{}", cfg.id, KUBECONFIG_SUFFIX)
}

/// Name of the host Secret holding an issued certificate: `<clusterID>-<cert>`
pub fn certificate_secret_name(cluster_id: &str, cert: &str) -> String {
    format!("{}-{}", cluster_id, cert)
}

/// Labels put on every object the operator creates for a tenant cluster
pub fn cluster_labels(cfg: &ClusterGuestConfig) -> BTreeMap<String, String> {
    BTreeMap::from([
        (LABEL_CLUSTER.to_string(), cfg.id.clone()),
        (LABEL_ORGANIZATION.to_string(), cfg.owner.clone()),
        (LABEL_MANAGED_BY.to_string(), OPERATOR_NAME.to_string()),
    ])
}
