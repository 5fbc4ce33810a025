use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Chart release request consumed by the chart operator in a tenant cluster
#[derive(CustomResource, Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[kube(
    group = "core.giantswarm.io",
    version = "v1alpha1",
    kind = "ChartConfig",
    plural = "chartconfigs",
    namespaced
)]
#[serde(rename_all = "camelCase")]
pub struct ChartConfigSpec {
    /// Chart to install
    pub chart: ChartConfigChart,
    /// Version bundle of the chart operator handling this ChartConfig
    pub version_bundle: ChartConfigVersionBundle,
}

/// Chart coordinates and release settings
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ChartConfigChart {
    /// Chart name in the catalog (e.g. "kubernetes-coredns-chart")
    pub name: String,
    /// Release channel (e.g. "1-3-stable")
    pub channel: String,
    /// Namespace the chart is installed into
    pub namespace: String,
    /// Helm release name
    pub release: String,
    /// ConfigMap holding chart values
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config_map: Option<ChartConfigConfigMap>,
}

/// Reference to a chart values ConfigMap
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ChartConfigConfigMap {
    /// ConfigMap name
    pub name: String,
    /// ConfigMap namespace
    pub namespace: String,
}

/// Chart operator version bundle
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
pub struct ChartConfigVersionBundle {
    /// Exact chart operator version bundle version
    pub version: String,
}
