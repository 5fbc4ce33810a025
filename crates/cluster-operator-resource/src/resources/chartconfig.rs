//! ChartConfigs inside the tenant cluster
//!
//! The chart operator running in the tenant cluster installs one Helm release
//! per ChartConfig. The set of ChartConfigs follows the chart components of
//! the selected version bundle.

use std::sync::Arc;

use async_trait::async_trait;
use kube::ResourceExt;
use tracing::info;

use cluster_operator_common::crd::{
    ChartConfig, ChartConfigChart, ChartConfigConfigMap, ChartConfigSpec, ChartConfigVersionBundle,
};
use cluster_operator_common::key::{cluster_guest_config, cluster_labels, ClusterObject};
use cluster_operator_common::{Error, Result, MANAGED_BY_SELECTOR};
use cluster_operator_versionbundle::CHART_OPERATOR_COMPONENT;

use crate::charts::{active_charts, chart_channel};
use crate::clients::TenantClient;
use crate::diff::{list_delete_patch, list_update_patch};
use crate::resource::{CrudResource, Patch, ReconcileContext};
use crate::resources::{created, deleted, missing};
use crate::tenant::TenantClusterFactory;
use crate::TENANT_NAMESPACE;

/// Resource name
pub const NAME: &str = "chartconfig";

/// Manages ChartConfigs of a tenant cluster
pub struct ChartConfigResource {
    tenants: Arc<dyn TenantClusterFactory>,
}

impl ChartConfigResource {
    /// Start building the resource
    pub fn builder() -> ChartConfigResourceBuilder {
        ChartConfigResourceBuilder::default()
    }

    async fn tenant(&self, obj: &ClusterObject) -> Result<Arc<dyn TenantClient>> {
        let guest = cluster_guest_config(obj)?;
        self.tenants.tenant_client(&guest).await
    }
}

/// Builder for [`ChartConfigResource`]
#[derive(Default)]
pub struct ChartConfigResourceBuilder {
    tenants: Option<Arc<dyn TenantClusterFactory>>,
}

impl ChartConfigResourceBuilder {
    /// Tenant client factory
    pub fn tenant_factory(mut self, tenants: Arc<dyn TenantClusterFactory>) -> Self {
        self.tenants = Some(tenants);
        self
    }

    /// Build the resource
    pub fn build(self) -> Result<ChartConfigResource> {
        let tenants = self
            .tenants
            .ok_or_else(|| missing(NAME, "a tenant cluster factory"))?;
        Ok(ChartConfigResource { tenants })
    }
}

fn differs(have: &ChartConfig, want: &ChartConfig) -> bool {
    have.spec != want.spec || have.metadata.labels != want.metadata.labels
}

#[async_trait]
impl CrudResource for ChartConfigResource {
    type State = Vec<ChartConfig>;

    fn name(&self) -> &str {
        NAME
    }

    async fn get_current_state(
        &self,
        _ctx: &ReconcileContext,
        obj: &ClusterObject,
    ) -> Result<Vec<ChartConfig>> {
        let tenant = self.tenant(obj).await?;
        tenant
            .list_chart_configs(TENANT_NAMESPACE, MANAGED_BY_SELECTOR)
            .await
    }

    async fn get_desired_state(
        &self,
        ctx: &ReconcileContext,
        obj: &ClusterObject,
    ) -> Result<Vec<ChartConfig>> {
        let charts = active_charts(&ctx.bundle);
        if charts.is_empty() {
            return Ok(Vec::new());
        }

        let guest = cluster_guest_config(obj)?;
        let operator = ctx
            .bundle
            .find_component(CHART_OPERATOR_COMPONENT)
            .ok_or_else(|| {
                Error::invalid_config(format!(
                    "version bundle {} has charts but no {} component",
                    ctx.bundle.version, CHART_OPERATOR_COMPONENT
                ))
            })?;

        let mut chart_configs = Vec::with_capacity(charts.len());
        for (spec, component) in charts {
            let mut chart_config = ChartConfig::new(
                spec.release,
                ChartConfigSpec {
                    chart: ChartConfigChart {
                        name: spec.chart_name.to_string(),
                        channel: chart_channel(&component.version)?,
                        namespace: spec.namespace.to_string(),
                        release: spec.release.to_string(),
                        config_map: spec.config_map.map(|name| ChartConfigConfigMap {
                            name: name.to_string(),
                            namespace: spec.namespace.to_string(),
                        }),
                    },
                    version_bundle: ChartConfigVersionBundle {
                        version: operator.version.clone(),
                    },
                },
            );
            chart_config.metadata.namespace = Some(TENANT_NAMESPACE.to_string());
            chart_config.metadata.labels = Some(cluster_labels(&guest));
            chart_configs.push(chart_config);
        }
        Ok(chart_configs)
    }

    fn new_update_patch(
        &self,
        _obj: &ClusterObject,
        current: &Vec<ChartConfig>,
        desired: &Vec<ChartConfig>,
    ) -> Result<Patch<Vec<ChartConfig>>> {
        Ok(list_update_patch(current, desired, differs))
    }

    fn new_delete_patch(
        &self,
        _obj: &ClusterObject,
        current: &Vec<ChartConfig>,
        desired: &Vec<ChartConfig>,
    ) -> Result<Patch<Vec<ChartConfig>>> {
        Ok(list_delete_patch(current, desired))
    }

    async fn apply_create_change(
        &self,
        _ctx: &ReconcileContext,
        obj: &ClusterObject,
        create: &Vec<ChartConfig>,
    ) -> Result<()> {
        let tenant = self.tenant(obj).await?;
        for chart_config in create {
            let name = chart_config.name_any();
            info!(
                chart_config = %name,
                channel = %chart_config.spec.chart.channel,
                "creating chartconfig"
            );
            created(
                tenant
                    .create_chart_config(TENANT_NAMESPACE, chart_config)
                    .await,
                "ChartConfig",
                &name,
            )?;
        }
        Ok(())
    }

    async fn apply_update_change(
        &self,
        _ctx: &ReconcileContext,
        obj: &ClusterObject,
        update: &Vec<ChartConfig>,
    ) -> Result<()> {
        let tenant = self.tenant(obj).await?;
        for chart_config in update {
            info!(
                chart_config = %chart_config.name_any(),
                channel = %chart_config.spec.chart.channel,
                "updating chartconfig"
            );
            tenant
                .update_chart_config(TENANT_NAMESPACE, chart_config)
                .await?;
        }
        Ok(())
    }

    async fn apply_delete_change(
        &self,
        _ctx: &ReconcileContext,
        obj: &ClusterObject,
        delete: &Vec<ChartConfig>,
    ) -> Result<()> {
        let tenant = self.tenant(obj).await?;
        for chart_config in delete {
            let name = chart_config.name_any();
            info!(chart_config = %name, "deleting chartconfig");
            deleted(
                tenant.delete_chart_config(TENANT_NAMESPACE, &name).await,
                "ChartConfig",
                &name,
            )?;
        }
        Ok(())
    }
}
