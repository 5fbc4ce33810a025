//! Charts installed into tenant clusters
//!
//! Which charts a cluster gets is data: a chart is active when its component
//! appears in the selected version bundle, and its release channel follows
//! the component version.

use cluster_operator_common::crd::ClusterGuestConfig;
use cluster_operator_common::key::{api_domain, cluster_guest_config, worker_count, ClusterObject};
use cluster_operator_common::template::{expand, TemplateVars};
use cluster_operator_common::{Error, Result};
use cluster_operator_versionbundle::{parse_version, Component, VersionBundle};

/// Namespace charts are installed into
pub const CHART_NAMESPACE: &str = "kube-system";

/// Data key of chart values in a values ConfigMap
pub const VALUES_KEY: &str = "values.json";

/// A chart the operator can install into tenant clusters
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChartSpec {
    /// Version bundle component enabling the chart
    pub component: &'static str,
    /// Chart name in the catalog
    pub chart_name: &'static str,
    /// Helm release name
    pub release: &'static str,
    /// Namespace the chart is installed into
    pub namespace: &'static str,
    /// Values ConfigMap name, for charts that take values
    pub config_map: Option<&'static str>,
    /// `${VAR}` template of the chart values; strings go through `tojson`
    pub values_template: Option<&'static str>,
}

/// Every chart the operator knows about
pub const CHART_SPECS: &[ChartSpec] = &[
    ChartSpec {
        component: "cert-exporter",
        chart_name: "cert-exporter-chart",
        release: "cert-exporter",
        namespace: CHART_NAMESPACE,
        config_map: None,
        values_template: None,
    },
    ChartSpec {
        component: "coredns",
        chart_name: "kubernetes-coredns-chart",
        release: "coredns",
        namespace: CHART_NAMESPACE,
        config_map: Some("coredns-values"),
        values_template: Some(
            r#"{"cluster":{"kubernetes":{"API":{"clusterIPRange":${CLUSTER_IP_RANGE|tojson}},"DNS":{"IP":${CLUSTER_DNS_IP|tojson}},"domain":${CLUSTER_DOMAIN|tojson}}},"image":{"registry":${REGISTRY_DOMAIN|tojson}}}"#,
        ),
    },
    ChartSpec {
        component: "kube-state-metrics",
        chart_name: "kubernetes-kube-state-metrics-chart",
        release: "kube-state-metrics",
        namespace: CHART_NAMESPACE,
        config_map: Some("kube-state-metrics-values"),
        values_template: Some(
            r#"{"apiServer":${API_DOMAIN|tojson},"image":{"registry":${REGISTRY_DOMAIN|tojson}}}"#,
        ),
    },
    ChartSpec {
        component: "net-exporter",
        chart_name: "net-exporter-chart",
        release: "net-exporter",
        namespace: CHART_NAMESPACE,
        config_map: None,
        values_template: None,
    },
    ChartSpec {
        component: "nginx-ingress-controller",
        chart_name: "kubernetes-nginx-ingress-controller-chart",
        release: "nginx-ingress-controller",
        namespace: CHART_NAMESPACE,
        config_map: Some("nginx-ingress-controller-values"),
        values_template: Some(
            r#"{"cluster":{"id":${CLUSTER_ID|tojson},"organization":${ORGANIZATION|tojson}},"controller":{"replicas":${WORKER_COUNT}},"image":{"registry":${REGISTRY_DOMAIN|tojson}}}"#,
        ),
    },
    ChartSpec {
        component: "node-exporter",
        chart_name: "kubernetes-node-exporter-chart",
        release: "node-exporter",
        namespace: CHART_NAMESPACE,
        config_map: None,
        values_template: None,
    },
];

/// Installation wide values substituted into chart value templates
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ChartValuesConfig {
    /// Service IP range of tenant clusters (e.g. "172.31.0.0/16")
    pub cluster_ip_range: String,
    /// IP of the tenant cluster DNS service
    pub cluster_dns_ip: String,
    /// Cluster domain (e.g. "cluster.local")
    pub cluster_domain: String,
    /// Container registry images are pulled from
    pub registry_domain: String,
}

impl ChartValuesConfig {
    /// Check that every value is set
    pub fn validate(&self) -> Result<()> {
        let fields = [
            ("cluster IP range", &self.cluster_ip_range),
            ("cluster DNS IP", &self.cluster_dns_ip),
            ("cluster domain", &self.cluster_domain),
            ("registry domain", &self.registry_domain),
        ];
        for (what, value) in fields {
            if value.is_empty() {
                return Err(Error::invalid_config(format!("{} must not be empty", what)));
            }
        }
        Ok(())
    }
}

/// Charts enabled by `bundle`, with the bundled component version
pub fn active_charts(bundle: &VersionBundle) -> Vec<(&'static ChartSpec, &Component)> {
    CHART_SPECS
        .iter()
        .filter_map(|spec| bundle.find_component(spec.component).map(|c| (spec, c)))
        .collect()
}

/// Release channel of a component version: `<major>-<minor>-stable`
pub fn chart_channel(version: &str) -> Result<String> {
    let (major, minor, _) = parse_version(version).ok_or_else(|| {
        Error::invalid_config(format!("invalid chart component version '{}'", version))
    })?;
    Ok(format!("{}-{}-stable", major, minor))
}

/// Template variables for one tenant cluster
pub fn template_vars(config: &ChartValuesConfig, obj: &ClusterObject) -> Result<TemplateVars> {
    let guest = cluster_guest_config(obj)?;
    Ok(vars_for(config, &guest, worker_count(obj)?))
}

fn vars_for(config: &ChartValuesConfig, guest: &ClusterGuestConfig, workers: usize) -> TemplateVars {
    TemplateVars::from([
        ("API_DOMAIN".to_string(), api_domain(guest)),
        ("CLUSTER_ID".to_string(), guest.id.clone()),
        ("ORGANIZATION".to_string(), guest.owner.clone()),
        ("WORKER_COUNT".to_string(), workers.to_string()),
        ("CLUSTER_DNS_IP".to_string(), config.cluster_dns_ip.clone()),
        ("CLUSTER_IP_RANGE".to_string(), config.cluster_ip_range.clone()),
        ("CLUSTER_DOMAIN".to_string(), config.cluster_domain.clone()),
        ("REGISTRY_DOMAIN".to_string(), config.registry_domain.clone()),
    ])
}

/// Rendered values of `spec`, if it takes any
pub fn render_values(spec: &ChartSpec, vars: &TemplateVars) -> Result<Option<String>> {
    spec.values_template
        .map(|template| expand(template, vars))
        .transpose()
}
