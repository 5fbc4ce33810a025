//! Command line and environment configuration

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use cluster_operator_common::telemetry::LogFormat;
use cluster_operator_common::{Error, Provider, Result};
use cluster_operator_resource::charts::ChartValuesConfig;

/// cluster-operator - reconciles tenant cluster CRDs into managed add-ons
#[derive(Parser, Debug, Clone)]
#[command(name = "cluster-operator", version, about, long_about = None)]
pub struct Cli {
    /// Print the provider CRD manifests and exit
    #[arg(long)]
    pub crd: bool,

    /// Path to a host cluster kubeconfig; in-cluster config when unset
    #[arg(long, env = "CLUSTER_OPERATOR_KUBECONFIG")]
    pub kubeconfig: Option<PathBuf>,

    /// Providers to run controllers for
    #[arg(
        long,
        env = "CLUSTER_OPERATOR_PROVIDERS",
        value_delimiter = ',',
        default_value = "aws,azure,kvm,clusterapi"
    )]
    pub providers: Vec<String>,

    /// Host namespace of certificate, encryption key and kubeconfig Secrets
    #[arg(long, env = "CLUSTER_OPERATOR_SECRET_NAMESPACE", default_value = "default")]
    pub secret_namespace: String,

    /// Service IP range of tenant clusters
    #[arg(long, env = "CLUSTER_OPERATOR_CLUSTER_IP_RANGE", default_value = "")]
    pub cluster_ip_range: String,

    /// IP of the tenant cluster DNS service
    #[arg(long, env = "CLUSTER_OPERATOR_CLUSTER_DNS_IP", default_value = "")]
    pub cluster_dns_ip: String,

    /// Tenant cluster domain
    #[arg(long, env = "CLUSTER_OPERATOR_CLUSTER_DOMAIN", default_value = "cluster.local")]
    pub cluster_domain: String,

    /// Container registry chart images are pulled from
    #[arg(long, env = "CLUSTER_OPERATOR_REGISTRY_DOMAIN", default_value = "quay.io")]
    pub registry_domain: String,

    /// Certificate cache TTL in seconds; 0 disables caching
    #[arg(long, env = "CLUSTER_OPERATOR_CERT_CACHE_TTL_SECS", default_value_t = 300)]
    pub cert_cache_ttl_secs: u64,

    /// Seconds between resyncs of a converged cluster
    #[arg(long, env = "CLUSTER_OPERATOR_RESYNC_PERIOD_SECS", default_value_t = 300)]
    pub resync_period_secs: u64,

    /// Reconcile clusters pinned to work-in-progress version bundles
    #[arg(long, env = "CLUSTER_OPERATOR_ALLOW_WIP_BUNDLES")]
    pub allow_wip_bundles: bool,

    /// Log output format: json or text
    #[arg(long, env = "CLUSTER_OPERATOR_LOG_FORMAT", default_value = "json")]
    pub log_format: String,
}

/// Validated operator configuration
#[derive(Clone, Debug)]
pub struct OperatorConfig {
    /// Host cluster kubeconfig path
    pub kubeconfig: Option<PathBuf>,
    /// Providers with a running controller, deduplicated
    pub providers: Vec<Provider>,
    /// Host namespace of operator managed Secrets
    pub secret_namespace: String,
    /// Chart value template inputs
    pub chart_values: ChartValuesConfig,
    /// Certificate cache TTL; zero disables the cache
    pub cert_cache_ttl: Duration,
    /// Requeue interval after a converged pass
    pub resync_period: Duration,
    /// Whether work-in-progress bundles are selectable
    pub allow_wip_bundles: bool,
    /// Log output format
    pub log_format: LogFormat,
}

fn parse_log_format(value: &str) -> Result<LogFormat> {
    match value.to_ascii_lowercase().as_str() {
        "json" => Ok(LogFormat::Json),
        "text" | "plain" => Ok(LogFormat::Text),
        other => Err(Error::invalid_config(format!(
            "unknown log format '{}', expected json or text",
            other
        ))),
    }
}

impl TryFrom<Cli> for OperatorConfig {
    type Error = Error;

    fn try_from(cli: Cli) -> Result<Self> {
        let mut providers = cli
            .providers
            .iter()
            .map(|p| p.trim())
            .filter(|p| !p.is_empty())
            .map(str::parse::<Provider>)
            .collect::<Result<Vec<_>>>()?;
        providers.sort();
        providers.dedup();
        if providers.is_empty() {
            return Err(Error::invalid_config("at least one provider must be enabled"));
        }

        if cli.secret_namespace.is_empty() {
            return Err(Error::invalid_config("secret namespace must not be empty"));
        }
        if cli.resync_period_secs == 0 {
            return Err(Error::invalid_config("resync period must be positive"));
        }

        let chart_values = ChartValuesConfig {
            cluster_ip_range: cli.cluster_ip_range,
            cluster_dns_ip: cli.cluster_dns_ip,
            cluster_domain: cli.cluster_domain,
            registry_domain: cli.registry_domain,
        };
        chart_values.validate()?;

        Ok(Self {
            kubeconfig: cli.kubeconfig,
            providers,
            secret_namespace: cli.secret_namespace,
            chart_values,
            cert_cache_ttl: Duration::from_secs(cli.cert_cache_ttl_secs),
            resync_period: Duration::from_secs(cli.resync_period_secs),
            allow_wip_bundles: cli.allow_wip_bundles,
            log_format: parse_log_format(&cli.log_format)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        let mut argv = vec![
            "cluster-operator",
            "--cluster-ip-range",
            "172.31.0.0/16",
            "--cluster-dns-ip",
            "172.31.0.10",
        ];
        argv.extend_from_slice(args);
        Cli::try_parse_from(argv).unwrap()
    }

    #[test]
    fn defaults_enable_every_provider() {
        let config = OperatorConfig::try_from(parse(&[])).unwrap();
        assert_eq!(config.providers, Provider::ALL.to_vec());
        assert_eq!(config.secret_namespace, "default");
        assert_eq!(config.chart_values.cluster_domain, "cluster.local");
        assert_eq!(config.cert_cache_ttl, Duration::from_secs(300));
        assert_eq!(config.log_format, LogFormat::Json);
        assert!(!config.allow_wip_bundles);
    }

    #[test]
    fn providers_are_parsed_and_deduplicated() {
        let config =
            OperatorConfig::try_from(parse(&["--providers", "kvm,aws,capi,aws"])).unwrap();
        assert_eq!(
            config.providers,
            vec![Provider::Aws, Provider::Kvm, Provider::ClusterApi]
        );
    }

    #[test]
    fn unknown_provider_is_rejected() {
        let err = OperatorConfig::try_from(parse(&["--providers", "aws,gcp"])).unwrap_err();
        assert!(matches!(err, Error::InvalidConfig { .. }));
    }

    #[test]
    fn missing_network_parameters_are_rejected() {
        let cli = Cli::try_parse_from(["cluster-operator"]).unwrap();
        assert!(matches!(
            OperatorConfig::try_from(cli),
            Err(Error::InvalidConfig { .. })
        ));
    }

    #[test]
    fn zero_resync_is_rejected_but_zero_cache_ttl_disables_caching() {
        assert!(OperatorConfig::try_from(parse(&["--resync-period-secs", "0"])).is_err());

        let config = OperatorConfig::try_from(parse(&["--cert-cache-ttl-secs", "0"])).unwrap();
        assert!(config.cert_cache_ttl.is_zero());
    }

    #[test]
    fn log_format_accepts_text() {
        let config = OperatorConfig::try_from(parse(&["--log-format", "text"])).unwrap();
        assert_eq!(config.log_format, LogFormat::Text);
        assert!(OperatorConfig::try_from(parse(&["--log-format", "xml"])).is_err());
    }
}
