//! Adapter running a [`CrudResource`] as a [`Resource`]

use async_trait::async_trait;
use tracing::{debug, info, instrument};

use cluster_operator_common::key::ClusterObject;
use cluster_operator_common::Result;

use crate::resource::{CrudResource, Patch, ReconcileContext, Resource, ResourceOutcome};

/// Drives the CRUD contract of one resource
///
/// Patches are applied in the order create, delete, update. Cancellation is
/// checked before each step and raced against every state read and apply,
/// so a cancelled pass also abandons API calls already in flight.
/// Deferrable errors (tenant API unreachable, certificates not issued yet)
/// cancel the resource instead of failing the whole reconciliation.
pub struct CrudResourceWrapper<R> {
    inner: R,
}

impl<R: CrudResource> CrudResourceWrapper<R> {
    /// Wrap a resource
    pub fn new(inner: R) -> Self {
        Self { inner }
    }

    /// The wrapped resource
    pub fn inner(&self) -> &R {
        &self.inner
    }

    async fn apply(
        &self,
        ctx: &ReconcileContext,
        obj: &ClusterObject,
        patch: Patch<R::State>,
    ) -> Result<()> {
        if patch.is_empty() {
            debug!(resource = self.inner.name(), "no changes to apply");
            return Ok(());
        }
        if let Some(create) = &patch.create {
            ctx.check_canceled("create")?;
            ctx.run_cancellable("create", self.inner.apply_create_change(ctx, obj, create))
                .await?;
        }
        if let Some(delete) = &patch.delete {
            ctx.check_canceled("delete")?;
            ctx.run_cancellable("delete", self.inner.apply_delete_change(ctx, obj, delete))
                .await?;
        }
        if let Some(update) = &patch.update {
            ctx.check_canceled("update")?;
            ctx.run_cancellable("update", self.inner.apply_update_change(ctx, obj, update))
                .await?;
        }
        Ok(())
    }

    async fn states(
        &self,
        ctx: &ReconcileContext,
        obj: &ClusterObject,
    ) -> Result<(R::State, R::State)> {
        let current = ctx
            .run_cancellable("current state", self.inner.get_current_state(ctx, obj))
            .await?;
        let desired = ctx
            .run_cancellable("desired state", self.inner.get_desired_state(ctx, obj))
            .await?;
        Ok((current, desired))
    }

    async fn create_pass(&self, ctx: &ReconcileContext, obj: &ClusterObject) -> Result<()> {
        let (current, desired) = self.states(ctx, obj).await?;
        let patch = self.inner.new_update_patch(obj, &current, &desired)?;
        self.apply(ctx, obj, patch).await
    }

    async fn delete_pass(&self, ctx: &ReconcileContext, obj: &ClusterObject) -> Result<()> {
        let (current, desired) = self.states(ctx, obj).await?;
        let patch = self.inner.new_delete_patch(obj, &current, &desired)?;
        self.apply(ctx, obj, patch).await
    }

    fn outcome(&self, result: Result<()>) -> Result<ResourceOutcome> {
        match result {
            Ok(()) => Ok(ResourceOutcome::Reconciled),
            Err(e) if e.is_deferrable() => {
                info!(
                    resource = self.inner.name(),
                    reason = %e,
                    "canceling resource, retrying later"
                );
                Ok(ResourceOutcome::Canceled {
                    reason: e.to_string(),
                })
            }
            Err(e) => Err(e),
        }
    }
}

#[async_trait]
impl<R: CrudResource> Resource for CrudResourceWrapper<R> {
    fn name(&self) -> &str {
        self.inner.name()
    }

    #[instrument(skip_all, fields(resource = self.inner.name(), object = obj.name()))]
    async fn ensure_created(
        &self,
        ctx: &ReconcileContext,
        obj: &ClusterObject,
    ) -> Result<ResourceOutcome> {
        self.outcome(self.create_pass(ctx, obj).await)
    }

    #[instrument(skip_all, fields(resource = self.inner.name(), object = obj.name()))]
    async fn ensure_deleted(
        &self,
        ctx: &ReconcileContext,
        obj: &ClusterObject,
    ) -> Result<ResourceOutcome> {
        self.outcome(self.delete_pass(ctx, obj).await)
    }
}
