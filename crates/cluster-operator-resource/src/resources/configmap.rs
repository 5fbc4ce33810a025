//! Chart values ConfigMaps inside the tenant cluster
//!
//! One ConfigMap per active chart that takes values, holding the rendered
//! values template under `values.json`.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use k8s_openapi::api::core::v1::ConfigMap;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::ResourceExt;
use tracing::info;

use cluster_operator_common::key::{cluster_guest_config, cluster_labels, ClusterObject};
use cluster_operator_common::{Result, MANAGED_BY_SELECTOR};

use crate::charts::{
    active_charts, render_values, template_vars, ChartValuesConfig, CHART_NAMESPACE, VALUES_KEY,
};
use crate::clients::TenantClient;
use crate::diff::{list_delete_patch, list_update_patch};
use crate::resource::{CrudResource, Patch, ReconcileContext};
use crate::resources::{created, deleted, missing};
use crate::tenant::TenantClusterFactory;

/// Resource name
pub const NAME: &str = "configmap";

/// Manages chart values ConfigMaps of a tenant cluster
pub struct ConfigMapResource {
    tenants: Arc<dyn TenantClusterFactory>,
    values: ChartValuesConfig,
}

impl ConfigMapResource {
    /// Start building the resource
    pub fn builder() -> ConfigMapResourceBuilder {
        ConfigMapResourceBuilder::default()
    }

    async fn tenant(&self, obj: &ClusterObject) -> Result<Arc<dyn TenantClient>> {
        let guest = cluster_guest_config(obj)?;
        self.tenants.tenant_client(&guest).await
    }
}

/// Builder for [`ConfigMapResource`]
#[derive(Default)]
pub struct ConfigMapResourceBuilder {
    tenants: Option<Arc<dyn TenantClusterFactory>>,
    values: Option<ChartValuesConfig>,
}

impl ConfigMapResourceBuilder {
    /// Tenant client factory
    pub fn tenant_factory(mut self, tenants: Arc<dyn TenantClusterFactory>) -> Self {
        self.tenants = Some(tenants);
        self
    }

    /// Installation wide chart values
    pub fn chart_values(mut self, values: ChartValuesConfig) -> Self {
        self.values = Some(values);
        self
    }

    /// Build the resource; chart values must be complete
    pub fn build(self) -> Result<ConfigMapResource> {
        let tenants = self
            .tenants
            .ok_or_else(|| missing(NAME, "a tenant cluster factory"))?;
        let values = self.values.ok_or_else(|| missing(NAME, "chart values"))?;
        values.validate()?;
        Ok(ConfigMapResource { tenants, values })
    }
}

fn differs(have: &ConfigMap, want: &ConfigMap) -> bool {
    have.data != want.data || have.metadata.labels != want.metadata.labels
}

#[async_trait]
impl CrudResource for ConfigMapResource {
    type State = Vec<ConfigMap>;

    fn name(&self) -> &str {
        NAME
    }

    async fn get_current_state(
        &self,
        _ctx: &ReconcileContext,
        obj: &ClusterObject,
    ) -> Result<Vec<ConfigMap>> {
        let tenant = self.tenant(obj).await?;
        tenant
            .list_config_maps(CHART_NAMESPACE, MANAGED_BY_SELECTOR)
            .await
    }

    async fn get_desired_state(
        &self,
        ctx: &ReconcileContext,
        obj: &ClusterObject,
    ) -> Result<Vec<ConfigMap>> {
        let guest = cluster_guest_config(obj)?;
        let vars = template_vars(&self.values, obj)?;

        let mut config_maps = Vec::new();
        for (spec, _) in active_charts(&ctx.bundle) {
            let (Some(name), Some(values)) = (spec.config_map, render_values(spec, &vars)?) else {
                continue;
            };
            config_maps.push(ConfigMap {
                metadata: ObjectMeta {
                    name: Some(name.to_string()),
                    namespace: Some(spec.namespace.to_string()),
                    labels: Some(cluster_labels(&guest)),
                    ..Default::default()
                },
                data: Some(BTreeMap::from([(VALUES_KEY.to_string(), values)])),
                ..Default::default()
            });
        }
        Ok(config_maps)
    }

    fn new_update_patch(
        &self,
        _obj: &ClusterObject,
        current: &Vec<ConfigMap>,
        desired: &Vec<ConfigMap>,
    ) -> Result<Patch<Vec<ConfigMap>>> {
        Ok(list_update_patch(current, desired, differs))
    }

    fn new_delete_patch(
        &self,
        _obj: &ClusterObject,
        current: &Vec<ConfigMap>,
        desired: &Vec<ConfigMap>,
    ) -> Result<Patch<Vec<ConfigMap>>> {
        Ok(list_delete_patch(current, desired))
    }

    async fn apply_create_change(
        &self,
        _ctx: &ReconcileContext,
        obj: &ClusterObject,
        create: &Vec<ConfigMap>,
    ) -> Result<()> {
        let tenant = self.tenant(obj).await?;
        for config_map in create {
            let name = config_map.name_any();
            info!(config_map = %name, "creating chart values configmap");
            created(
                tenant
                    .create_config_map(CHART_NAMESPACE, config_map)
                    .await,
                "ConfigMap",
                &name,
            )?;
        }
        Ok(())
    }

    async fn apply_update_change(
        &self,
        _ctx: &ReconcileContext,
        obj: &ClusterObject,
        update: &Vec<ConfigMap>,
    ) -> Result<()> {
        let tenant = self.tenant(obj).await?;
        for config_map in update {
            info!(config_map = %config_map.name_any(), "updating chart values configmap");
            tenant
                .update_config_map(CHART_NAMESPACE, config_map)
                .await?;
        }
        Ok(())
    }

    async fn apply_delete_change(
        &self,
        _ctx: &ReconcileContext,
        obj: &ClusterObject,
        delete: &Vec<ConfigMap>,
    ) -> Result<()> {
        let tenant = self.tenant(obj).await?;
        for config_map in delete {
            let name = config_map.name_any();
            info!(config_map = %name, "deleting chart values configmap");
            deleted(
                tenant.delete_config_map(CHART_NAMESPACE, &name).await,
                "ConfigMap",
                &name,
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::MockTenantClient;
    use crate::resources::testing::{aws_object, capi_object, chart_values, context};
    use crate::tenant::MockTenantClusterFactory;
    use crate::wrapper::CrudResourceWrapper;
    use crate::{Resource, ResourceOutcome};
    use cluster_operator_common::error::api_error;
    use cluster_operator_common::Error;
    use std::sync::Mutex;

    fn factory(tenant: MockTenantClient) -> Arc<dyn TenantClusterFactory> {
        let tenant: Arc<dyn TenantClient> = Arc::new(tenant);
        let mut factory = MockTenantClusterFactory::new();
        factory
            .expect_tenant_client()
            .returning(move |_| Ok(tenant.clone()));
        Arc::new(factory)
    }

    fn resource(factory: Arc<dyn TenantClusterFactory>) -> ConfigMapResource {
        ConfigMapResource::builder()
            .tenant_factory(factory)
            .chart_values(chart_values())
            .build()
            .unwrap()
    }

    #[test]
    fn builder_validates_chart_values() {
        let result = ConfigMapResource::builder()
            .tenant_factory(Arc::new(MockTenantClusterFactory::new()))
            .chart_values(ChartValuesConfig::default())
            .build();
        assert!(matches!(result, Err(Error::InvalidConfig { .. })));

        let result = ConfigMapResource::builder()
            .chart_values(chart_values())
            .build();
        assert!(matches!(result, Err(Error::InvalidConfig { .. })));
    }

    #[tokio::test]
    async fn desired_config_maps_follow_the_bundle() {
        let r = resource(Arc::new(MockTenantClusterFactory::new()));
        let desired = r
            .get_desired_state(&context(), &aws_object("al9qy"))
            .await
            .unwrap();
        let names: Vec<_> = desired.iter().map(|c| c.name_any()).collect();
        assert_eq!(
            names,
            vec!["coredns-values", "nginx-ingress-controller-values"]
        );

        let nginx = &desired[1];
        let values: serde_json::Value =
            serde_json::from_str(&nginx.data.as_ref().unwrap()[VALUES_KEY]).unwrap();
        assert_eq!(values["controller"]["replicas"], 3);
    }

    #[tokio::test]
    async fn cluster_api_objects_render_too() {
        let r = resource(Arc::new(MockTenantClusterFactory::new()));
        let desired = r
            .get_desired_state(&context(), &capi_object("x7k2p"))
            .await
            .unwrap();
        let nginx = desired
            .iter()
            .find(|c| c.name_any() == "nginx-ingress-controller-values")
            .unwrap();
        assert!(nginx.data.as_ref().unwrap()[VALUES_KEY].contains("\"replicas\":2"));
    }

    #[tokio::test]
    async fn identical_states_produce_empty_patch() {
        let r = resource(Arc::new(MockTenantClusterFactory::new()));
        let obj = aws_object("al9qy");
        let desired = r.get_desired_state(&context(), &obj).await.unwrap();
        assert!(r.new_update_patch(&obj, &desired, &desired).unwrap().is_empty());
        assert!(r.new_delete_patch(&obj, &Vec::new(), &desired).unwrap().is_empty());
    }

    /// Story: a fresh tenant gets its values, a second pass changes nothing
    #[tokio::test]
    async fn story_values_converge_and_stay() {
        let store: Arc<Mutex<Vec<ConfigMap>>> = Arc::new(Mutex::new(Vec::new()));
        let mut tenant = MockTenantClient::new();
        let list_store = store.clone();
        tenant
            .expect_list_config_maps()
            .withf(|ns, selector| ns == CHART_NAMESPACE && selector == MANAGED_BY_SELECTOR)
            .returning(move |_, _| Ok(list_store.lock().unwrap().clone()));
        let create_store = store.clone();
        tenant
            .expect_create_config_map()
            .times(2)
            .returning(move |_, cm| {
                create_store.lock().unwrap().push(cm.clone());
                Ok(())
            });
        tenant.expect_update_config_map().never();
        tenant.expect_delete_config_map().never();

        let wrapper = CrudResourceWrapper::new(resource(factory(tenant)));
        for _ in 0..2 {
            let outcome = wrapper
                .ensure_created(&context(), &aws_object("al9qy"))
                .await
                .unwrap();
            assert_eq!(outcome, ResourceOutcome::Reconciled);
        }
        assert_eq!(store.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn changed_values_are_updated_and_stale_maps_deleted() {
        let r = resource(Arc::new(MockTenantClusterFactory::new()));
        let obj = aws_object("al9qy");
        let desired = r.get_desired_state(&context(), &obj).await.unwrap();

        let mut current = desired.clone();
        current[0].data = Some(BTreeMap::from([(VALUES_KEY.to_string(), "{}".to_string())]));
        let mut stale = desired[0].clone();
        stale.metadata.name = Some("kube-state-metrics-values".to_string());
        current.push(stale);

        let patch = r.new_update_patch(&obj, &current, &desired).unwrap();
        assert!(patch.create.is_none());
        assert_eq!(patch.update.unwrap()[0].name_any(), "coredns-values");
        assert_eq!(
            patch.delete.unwrap()[0].name_any(),
            "kube-state-metrics-values"
        );
    }

    #[tokio::test]
    async fn deletes_tolerate_vanished_config_maps() {
        let mut tenant = MockTenantClient::new();
        tenant
            .expect_delete_config_map()
            .times(2)
            .returning(|_, _| Err(api_error(404, "NotFound", "configmaps not found")));

        let r = resource(factory(tenant));
        let obj = aws_object("al9qy");
        let desired = r.get_desired_state(&context(), &obj).await.unwrap();
        r.apply_delete_change(&context(), &obj, &desired)
            .await
            .unwrap();
    }
}
