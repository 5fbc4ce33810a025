//! cluster-operator - manages add-ons of tenant clusters

use std::sync::Arc;

use clap::Parser;
use kube::CustomResourceExt;
use tokio_util::sync::CancellationToken;
use tracing::info;

use cluster_operator::controller_runner::{build_controllers, build_resource_set};
use cluster_operator::{Cli, Context, OperatorConfig};
use cluster_operator_common::crd::{AWSClusterConfig, AzureClusterConfig, KVMClusterConfig};
use cluster_operator_common::kube_utils::create_client;
use cluster_operator_common::telemetry::{init_telemetry, TelemetryConfig};
use cluster_operator_versionbundle::Registry;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if cli.crd {
        print_crds()?;
        return Ok(());
    }

    let config = OperatorConfig::try_from(cli)?;
    init_telemetry(TelemetryConfig {
        format: config.log_format,
        default_filter: None,
    })?;

    run(config).await
}

/// Print the provider CRDs as a multi-document YAML stream
fn print_crds() -> anyhow::Result<()> {
    let crds = [
        AWSClusterConfig::crd(),
        AzureClusterConfig::crd(),
        KVMClusterConfig::crd(),
    ];
    for crd in crds {
        let yaml = serde_yaml::to_string(&crd)
            .map_err(|e| anyhow::anyhow!("Failed to serialize CRD: {}", e))?;
        println!("---\n{}", yaml.trim_end());
    }
    Ok(())
}

async fn run(config: OperatorConfig) -> anyhow::Result<()> {
    let client = create_client(config.kubeconfig.as_deref()).await?;

    let registry = Arc::new(Registry::with_releases()?);
    info!(bundles = registry.len(), "version bundles loaded");

    let resources = Arc::new(build_resource_set(client.clone(), &config)?);
    info!(resources = ?resources.names(), "resource set ready");

    let shutdown = CancellationToken::new();
    let ctx = Arc::new(
        Context::builder(client.clone(), resources, registry)
            .allow_wip_bundles(config.allow_wip_bundles)
            .resync_period(config.resync_period)
            .shutdown(shutdown.clone())
            .build(),
    );

    info!("Starting controllers:");
    let controllers = build_controllers(client, ctx, &config.providers);

    let signal = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("shutdown signal received, canceling in-flight reconciliations");
            signal.cancel();
        }
    });

    futures::future::join_all(controllers).await;
    shutdown.cancel();
    info!("controllers stopped");
    Ok(())
}
