//! Host and tenant cluster API access
//!
//! Resources talk to Kubernetes only through these traits so they can be
//! tested against mocks. Implementations are thin passthroughs: not found and
//! already exists come back as errors and the resources decide what they mean.

use async_trait::async_trait;
use k8s_openapi::api::core::v1::{ConfigMap, Namespace, Secret};
use kube::api::{Api, DeleteParams, ListParams, Patch, PostParams};
use kube::Client;

#[cfg(test)]
use mockall::automock;

use cluster_operator_common::crd::ChartConfig;
use cluster_operator_common::kube_utils::{apply_params, is_unreachable};
use cluster_operator_common::{Error, Result};

/// Operations against the host cluster running the operator
#[cfg_attr(test, automock)]
#[async_trait]
pub trait HostClient: Send + Sync {
    /// Get a Secret
    async fn get_secret(&self, namespace: &str, name: &str) -> Result<Secret>;

    /// Create a Secret
    async fn create_secret(&self, namespace: &str, secret: &Secret) -> Result<()>;

    /// Update a Secret with server-side apply
    async fn update_secret(&self, namespace: &str, secret: &Secret) -> Result<()>;

    /// Delete a Secret
    async fn delete_secret(&self, namespace: &str, name: &str) -> Result<()>;
}

/// Operations against one tenant cluster
#[cfg_attr(test, automock)]
#[async_trait]
pub trait TenantClient: Send + Sync {
    /// Get a Namespace
    async fn get_namespace(&self, name: &str) -> Result<Namespace>;

    /// Create a Namespace
    async fn create_namespace(&self, namespace: &Namespace) -> Result<()>;

    /// List ConfigMaps matching a label selector
    async fn list_config_maps(&self, namespace: &str, selector: &str) -> Result<Vec<ConfigMap>>;

    /// Create a ConfigMap
    async fn create_config_map(&self, namespace: &str, config_map: &ConfigMap) -> Result<()>;

    /// Update a ConfigMap with server-side apply
    async fn update_config_map(&self, namespace: &str, config_map: &ConfigMap) -> Result<()>;

    /// Delete a ConfigMap
    async fn delete_config_map(&self, namespace: &str, name: &str) -> Result<()>;

    /// List ChartConfigs matching a label selector
    async fn list_chart_configs(&self, namespace: &str, selector: &str)
        -> Result<Vec<ChartConfig>>;

    /// Create a ChartConfig
    async fn create_chart_config(&self, namespace: &str, chart: &ChartConfig) -> Result<()>;

    /// Update a ChartConfig with server-side apply
    async fn update_chart_config(&self, namespace: &str, chart: &ChartConfig) -> Result<()>;

    /// Delete a ChartConfig
    async fn delete_chart_config(&self, namespace: &str, name: &str) -> Result<()>;
}

fn object_name<K: kube::Resource>(obj: &K) -> Result<&str> {
    obj.meta()
        .name
        .as_deref()
        .ok_or_else(|| Error::internal("object to update has no name"))
}

/// Host client backed by a kube [`Client`]
pub struct KubeHostClient {
    client: Client,
}

impl KubeHostClient {
    /// Create a host client
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn secrets(&self, namespace: &str) -> Api<Secret> {
        Api::namespaced(self.client.clone(), namespace)
    }
}

#[async_trait]
impl HostClient for KubeHostClient {
    async fn get_secret(&self, namespace: &str, name: &str) -> Result<Secret> {
        Ok(self.secrets(namespace).get(name).await?)
    }

    async fn create_secret(&self, namespace: &str, secret: &Secret) -> Result<()> {
        self.secrets(namespace)
            .create(&PostParams::default(), secret)
            .await?;
        Ok(())
    }

    async fn update_secret(&self, namespace: &str, secret: &Secret) -> Result<()> {
        self.secrets(namespace)
            .patch(object_name(secret)?, &apply_params(), &Patch::Apply(secret))
            .await?;
        Ok(())
    }

    async fn delete_secret(&self, namespace: &str, name: &str) -> Result<()> {
        self.secrets(namespace)
            .delete(name, &DeleteParams::default())
            .await?;
        Ok(())
    }
}

/// Tenant client backed by a kube [`Client`] for one tenant cluster
///
/// Transport failures are reported as [`Error::TenantUnavailable`] so the
/// resource is retried later instead of failing.
pub struct KubeTenantClient {
    client: Client,
    cluster_id: String,
}

impl KubeTenantClient {
    /// Create a tenant client for `cluster_id`
    pub fn new(client: Client, cluster_id: impl Into<String>) -> Self {
        Self {
            client,
            cluster_id: cluster_id.into(),
        }
    }

    fn map_err(&self, err: kube::Error) -> Error {
        if is_unreachable(&err) {
            Error::tenant_unavailable(&self.cluster_id, err.to_string())
        } else {
            Error::from(err)
        }
    }

    fn config_maps(&self, namespace: &str) -> Api<ConfigMap> {
        Api::namespaced(self.client.clone(), namespace)
    }

    fn chart_configs(&self, namespace: &str) -> Api<ChartConfig> {
        Api::namespaced(self.client.clone(), namespace)
    }
}

#[async_trait]
impl TenantClient for KubeTenantClient {
    async fn get_namespace(&self, name: &str) -> Result<Namespace> {
        let api: Api<Namespace> = Api::all(self.client.clone());
        api.get(name).await.map_err(|e| self.map_err(e))
    }

    async fn create_namespace(&self, namespace: &Namespace) -> Result<()> {
        let api: Api<Namespace> = Api::all(self.client.clone());
        api.create(&PostParams::default(), namespace)
            .await
            .map_err(|e| self.map_err(e))?;
        Ok(())
    }

    async fn list_config_maps(&self, namespace: &str, selector: &str) -> Result<Vec<ConfigMap>> {
        let list = self
            .config_maps(namespace)
            .list(&ListParams::default().labels(selector))
            .await
            .map_err(|e| self.map_err(e))?;
        Ok(list.items)
    }

    async fn create_config_map(&self, namespace: &str, config_map: &ConfigMap) -> Result<()> {
        self.config_maps(namespace)
            .create(&PostParams::default(), config_map)
            .await
            .map_err(|e| self.map_err(e))?;
        Ok(())
    }

    async fn update_config_map(&self, namespace: &str, config_map: &ConfigMap) -> Result<()> {
        self.config_maps(namespace)
            .patch(
                object_name(config_map)?,
                &apply_params(),
                &Patch::Apply(config_map),
            )
            .await
            .map_err(|e| self.map_err(e))?;
        Ok(())
    }

    async fn delete_config_map(&self, namespace: &str, name: &str) -> Result<()> {
        self.config_maps(namespace)
            .delete(name, &DeleteParams::default())
            .await
            .map_err(|e| self.map_err(e))?;
        Ok(())
    }

    async fn list_chart_configs(
        &self,
        namespace: &str,
        selector: &str,
    ) -> Result<Vec<ChartConfig>> {
        let list = self
            .chart_configs(namespace)
            .list(&ListParams::default().labels(selector))
            .await
            .map_err(|e| self.map_err(e))?;
        Ok(list.items)
    }

    async fn create_chart_config(&self, namespace: &str, chart: &ChartConfig) -> Result<()> {
        self.chart_configs(namespace)
            .create(&PostParams::default(), chart)
            .await
            .map_err(|e| self.map_err(e))?;
        Ok(())
    }

    async fn update_chart_config(&self, namespace: &str, chart: &ChartConfig) -> Result<()> {
        self.chart_configs(namespace)
            .patch(object_name(chart)?, &apply_params(), &Patch::Apply(chart))
            .await
            .map_err(|e| self.map_err(e))?;
        Ok(())
    }

    async fn delete_chart_config(&self, namespace: &str, name: &str) -> Result<()> {
        self.chart_configs(namespace)
            .delete(name, &DeleteParams::default())
            .await
            .map_err(|e| self.map_err(e))?;
        Ok(())
    }
}
