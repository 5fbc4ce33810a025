//! Tenant cluster controller
//!
//! One reconcile function serves every watched kind: the object is wrapped
//! in a [`ClusterObject`], the version bundle it is pinned to is selected
//! from the registry and the resource set converges (or, behind the
//! finalizer, tears down) the managed add-ons.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use kube::api::{Patch as KubePatch, PatchParams};
use kube::runtime::controller::Action;
use kube::{Api, Client, ResourceExt};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

#[cfg(test)]
use mockall::automock;

use cluster_operator_common::crd::{AWSClusterConfig, AzureClusterConfig, Cluster, KVMClusterConfig};
use cluster_operator_common::key::{version_bundle_version, ClusterObject};
use cluster_operator_common::{Error, Result, CLUSTER_FINALIZER};
use cluster_operator_resource::{ReconcileContext, ReconcileReport, ResourceSet};
use cluster_operator_versionbundle::{Registry, VersionBundle};

/// Requeue interval after a converged pass
pub const DEFAULT_RESYNC_PERIOD: Duration = Duration::from_secs(300);

/// Requeue interval when a resource was canceled and should run again soon
pub const CANCELED_REQUEUE: Duration = Duration::from_secs(30);

/// Requeue interval after a retryable error
pub const RETRY_REQUEUE: Duration = Duration::from_secs(5);

/// Requeue interval after an error retrying cannot fix by itself
pub const FAILED_REQUEUE: Duration = Duration::from_secs(300);

/// Finalizer operations on watched cluster objects
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ClusterObjectClient: Send + Sync {
    /// Add `finalizer` to the object if missing
    async fn add_finalizer(&self, obj: &ClusterObject, finalizer: &str) -> Result<()>;

    /// Remove `finalizer` from the object if present
    async fn remove_finalizer(&self, obj: &ClusterObject, finalizer: &str) -> Result<()>;
}

/// [`ClusterObjectClient`] backed by the host cluster API
pub struct KubeClusterObjectClient {
    client: Client,
}

impl KubeClusterObjectClient {
    /// Wrap a host cluster client
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    async fn patch_finalizers(&self, obj: &ClusterObject, finalizers: Vec<String>) -> Result<()> {
        let meta = obj.meta();
        let name = obj.name();
        let namespace = meta.namespace.as_deref().unwrap_or("default");
        // resourceVersion makes the merge patch fail on a stale finalizer list
        let patch = serde_json::json!({
            "metadata": {
                "finalizers": finalizers,
                "resourceVersion": meta.resource_version,
            }
        });
        let params = PatchParams::default();
        let patch = KubePatch::Merge(&patch);

        match obj {
            ClusterObject::Aws(_) => {
                Api::<AWSClusterConfig>::namespaced(self.client.clone(), namespace)
                    .patch(name, &params, &patch)
                    .await?;
            }
            ClusterObject::Azure(_) => {
                Api::<AzureClusterConfig>::namespaced(self.client.clone(), namespace)
                    .patch(name, &params, &patch)
                    .await?;
            }
            ClusterObject::Kvm(_) => {
                Api::<KVMClusterConfig>::namespaced(self.client.clone(), namespace)
                    .patch(name, &params, &patch)
                    .await?;
            }
            ClusterObject::ClusterApi(_) => {
                Api::<Cluster>::namespaced(self.client.clone(), namespace)
                    .patch(name, &params, &patch)
                    .await?;
            }
        }
        Ok(())
    }
}

#[async_trait]
impl ClusterObjectClient for KubeClusterObjectClient {
    async fn add_finalizer(&self, obj: &ClusterObject, finalizer: &str) -> Result<()> {
        let mut finalizers = obj.meta().finalizers.clone().unwrap_or_default();
        if finalizers.iter().any(|f| f == finalizer) {
            return Ok(());
        }
        finalizers.push(finalizer.to_string());
        self.patch_finalizers(obj, finalizers).await
    }

    async fn remove_finalizer(&self, obj: &ClusterObject, finalizer: &str) -> Result<()> {
        let finalizers: Vec<String> = obj
            .meta()
            .finalizers
            .iter()
            .flatten()
            .filter(|f| f.as_str() != finalizer)
            .cloned()
            .collect();
        self.patch_finalizers(obj, finalizers).await
    }
}

/// Controller context shared by every reconcile
pub struct Context {
    /// Finalizer client for watched objects
    pub kube: Arc<dyn ClusterObjectClient>,
    /// Managed resources in reconcile order
    pub resources: Arc<ResourceSet>,
    /// Known version bundles
    pub registry: Arc<Registry>,
    /// Whether work-in-progress bundles are selectable
    pub allow_wip_bundles: bool,
    /// Requeue interval after a converged pass
    pub resync_period: Duration,
    /// Cancelled on shutdown; each pass runs with a child token
    pub shutdown: CancellationToken,
}

impl Context {
    /// Create a builder for constructing a Context
    pub fn builder(
        client: Client,
        resources: Arc<ResourceSet>,
        registry: Arc<Registry>,
    ) -> ContextBuilder {
        ContextBuilder {
            client,
            resources,
            registry,
            allow_wip_bundles: false,
            resync_period: DEFAULT_RESYNC_PERIOD,
            shutdown: CancellationToken::new(),
        }
    }

    /// Create a context around mocked collaborators
    pub fn for_testing(
        kube: Arc<dyn ClusterObjectClient>,
        resources: Arc<ResourceSet>,
        registry: Arc<Registry>,
    ) -> Self {
        Self {
            kube,
            resources,
            registry,
            allow_wip_bundles: false,
            resync_period: DEFAULT_RESYNC_PERIOD,
            shutdown: CancellationToken::new(),
        }
    }
}

/// Builder for [`Context`]
pub struct ContextBuilder {
    client: Client,
    resources: Arc<ResourceSet>,
    registry: Arc<Registry>,
    allow_wip_bundles: bool,
    resync_period: Duration,
    shutdown: CancellationToken,
}

impl ContextBuilder {
    /// Allow work-in-progress bundles
    pub fn allow_wip_bundles(mut self, allow: bool) -> Self {
        self.allow_wip_bundles = allow;
        self
    }

    /// Requeue interval after a converged pass
    pub fn resync_period(mut self, period: Duration) -> Self {
        self.resync_period = period;
        self
    }

    /// Token cancelled on shutdown
    pub fn shutdown(mut self, token: CancellationToken) -> Self {
        self.shutdown = token;
        self
    }

    /// Build the context
    pub fn build(self) -> Context {
        Context {
            kube: Arc::new(KubeClusterObjectClient::new(self.client)),
            resources: self.resources,
            registry: self.registry,
            allow_wip_bundles: self.allow_wip_bundles,
            resync_period: self.resync_period,
            shutdown: self.shutdown,
        }
    }
}

/// Reconcile entry point for every watched kind
pub async fn reconcile<K>(obj: Arc<K>, ctx: Arc<Context>) -> Result<Action>
where
    Arc<K>: Into<ClusterObject>,
{
    reconcile_object(obj.into(), &ctx).await
}

/// Requeue policy on reconcile failure
pub fn error_policy<K>(obj: Arc<K>, error: &Error, _ctx: Arc<Context>) -> Action
where
    K: ResourceExt,
{
    if error.is_retryable() {
        warn!(?error, object = %obj.name_any(), "reconciliation failed, retrying");
        Action::requeue(RETRY_REQUEUE)
    } else {
        error!(?error, object = %obj.name_any(), "reconciliation failed");
        Action::requeue(FAILED_REQUEUE)
    }
}

fn has_finalizer(obj: &ClusterObject) -> bool {
    obj.meta()
        .finalizers
        .as_ref()
        .is_some_and(|f| f.iter().any(|f| f == CLUSTER_FINALIZER))
}

/// Reconcile one cluster object
#[instrument(skip_all, fields(kind = obj.kind(), object = obj.name()))]
pub async fn reconcile_object(obj: ClusterObject, ctx: &Context) -> Result<Action> {
    if obj.is_deleting() {
        if !has_finalizer(&obj) {
            debug!("object deleting without our finalizer");
            return Ok(Action::await_change());
        }
        return cleanup(&obj, ctx).await;
    }

    let version = version_bundle_version(&obj)?;
    let Some(bundle) = ctx
        .registry
        .select(obj.provider(), &version, ctx.allow_wip_bundles)
    else {
        warn!(
            provider = %obj.provider(),
            version = %version,
            "no version bundle for object, waiting for a change"
        );
        return Ok(Action::await_change());
    };

    if !has_finalizer(&obj) {
        info!("adding finalizer");
        ctx.kube.add_finalizer(&obj, CLUSTER_FINALIZER).await?;
    }

    apply(&obj, bundle.clone(), ctx).await
}

/// Converge the managed resources of a live object
pub async fn apply(obj: &ClusterObject, bundle: VersionBundle, ctx: &Context) -> Result<Action> {
    info!(bundle = %bundle.version, "reconciling");
    let rctx = ReconcileContext::new(bundle, ctx.shutdown.child_token());
    let report = ctx.resources.ensure_created(&rctx, obj).await?;
    Ok(next_action(&report, ctx.resync_period))
}

/// Tear down the managed resources and release the object
///
/// Canceled resources do not hold the finalizer: a tenant cluster that is
/// already unreachable takes its in-cluster resources with it.
pub async fn cleanup(obj: &ClusterObject, ctx: &Context) -> Result<Action> {
    let bundle = cleanup_bundle(obj, ctx);
    match bundle {
        Some(bundle) => {
            info!(bundle = %bundle.version, "cleaning up");
            let rctx = ReconcileContext::new(bundle, ctx.shutdown.child_token());
            let report = ctx.resources.ensure_deleted(&rctx, obj).await?;
            for (resource, reason) in &report.canceled {
                warn!(resource = %resource, reason = %reason, "resource skipped during cleanup");
            }
        }
        None => warn!(
            provider = %obj.provider(),
            "no version bundle to clean up with, releasing object"
        ),
    }

    info!("removing finalizer");
    ctx.kube.remove_finalizer(obj, CLUSTER_FINALIZER).await?;
    Ok(Action::await_change())
}

/// Bundle used for cleanup: the pinned one, else the newest released one
fn cleanup_bundle(obj: &ClusterObject, ctx: &Context) -> Option<VersionBundle> {
    let provider = obj.provider();
    version_bundle_version(obj)
        .ok()
        .and_then(|version| ctx.registry.find(provider, &version))
        .or_else(|| ctx.registry.latest(provider))
        .cloned()
}

fn next_action(report: &ReconcileReport, resync_period: Duration) -> Action {
    if report.has_canceled() {
        debug!(canceled = ?report.canceled, "requeueing canceled resources");
        Action::requeue(CANCELED_REQUEUE)
    } else {
        Action::requeue(resync_period)
    }
}
