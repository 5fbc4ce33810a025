//! The CRUD resource contract
//!
//! A reconciliation pass for one resource is:
//!
//! 1. `get_current_state`: read what exists, absence is `None`/empty, not an error
//! 2. `get_desired_state`: compute what should exist from the object alone
//! 3. `new_update_patch` or `new_delete_patch`: diff the two
//! 4. `apply_*_change`: apply the non-empty parts of the patch
//!
//! Desired state never depends on current state, so a pass can be replayed
//! at any point and converges to the same result.

use std::fmt::Debug;
use std::future::Future;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use cluster_operator_common::key::ClusterObject;
use cluster_operator_common::{Error, Result};
use cluster_operator_versionbundle::VersionBundle;

/// Per reconciliation inputs shared by every resource in a pass
#[derive(Clone, Debug)]
pub struct ReconcileContext {
    /// Version bundle selected for the object being reconciled
    pub bundle: VersionBundle,
    /// Cancelled when the operator shuts down
    pub cancel: CancellationToken,
}

impl ReconcileContext {
    /// Create a context for `bundle`
    pub fn new(bundle: VersionBundle, cancel: CancellationToken) -> Self {
        Self { bundle, cancel }
    }

    /// Fail with [`Error::Canceled`] once cancellation was requested
    pub fn check_canceled(&self, step: &str) -> Result<()> {
        if self.cancel.is_cancelled() {
            return Err(Error::canceled(format!("reconciliation canceled before {}", step)));
        }
        Ok(())
    }

    /// Run `fut` unless cancellation is requested first
    ///
    /// In-flight API calls are dropped on cancellation instead of waiting
    /// for the client read timeout.
    pub async fn run_cancellable<T, F>(&self, step: &str, fut: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        match self.cancel.run_until_cancelled(fut).await {
            Some(result) => result,
            None => Err(Error::canceled(format!("reconciliation canceled during {}", step))),
        }
    }
}

/// Changes to apply for one resource, split by operation
///
/// An empty slot is `None`; a patch with all slots empty is a no-op.
#[derive(Clone, Debug, PartialEq)]
pub struct Patch<S> {
    /// Objects to create
    pub create: Option<S>,
    /// Objects to update
    pub update: Option<S>,
    /// Objects to delete
    pub delete: Option<S>,
}

impl<S> Default for Patch<S> {
    fn default() -> Self {
        Self {
            create: None,
            update: None,
            delete: None,
        }
    }
}

impl<S> Patch<S> {
    /// Patch that changes nothing
    pub fn empty() -> Self {
        Self::default()
    }

    /// Whether applying the patch would do nothing
    pub fn is_empty(&self) -> bool {
        self.create.is_none() && self.update.is_none() && self.delete.is_none()
    }
}

/// State getters, patch builders and change appliers for one sub-resource kind
#[async_trait]
pub trait CrudResource: Send + Sync {
    /// Snapshot of the sub-resource, both observed and desired
    type State: Debug + Send + Sync;

    /// Stable name, unique within a resource set
    fn name(&self) -> &str;

    /// Read the live state; a missing object is an empty state, not an error
    async fn get_current_state(
        &self,
        ctx: &ReconcileContext,
        obj: &ClusterObject,
    ) -> Result<Self::State>;

    /// Compute the state that should exist for `obj`
    async fn get_desired_state(
        &self,
        ctx: &ReconcileContext,
        obj: &ClusterObject,
    ) -> Result<Self::State>;

    /// Diff for a live object; empty when current already matches desired
    fn new_update_patch(
        &self,
        obj: &ClusterObject,
        current: &Self::State,
        desired: &Self::State,
    ) -> Result<Patch<Self::State>>;

    /// Diff for an object being deleted; only ever carries deletes
    fn new_delete_patch(
        &self,
        obj: &ClusterObject,
        current: &Self::State,
        desired: &Self::State,
    ) -> Result<Patch<Self::State>>;

    /// Create the objects in `create`; objects that already exist are fine
    async fn apply_create_change(
        &self,
        ctx: &ReconcileContext,
        obj: &ClusterObject,
        create: &Self::State,
    ) -> Result<()>;

    /// Update the objects in `update`
    async fn apply_update_change(
        &self,
        ctx: &ReconcileContext,
        obj: &ClusterObject,
        update: &Self::State,
    ) -> Result<()>;

    /// Delete the objects in `delete`; objects already gone are fine
    async fn apply_delete_change(
        &self,
        ctx: &ReconcileContext,
        obj: &ClusterObject,
        delete: &Self::State,
    ) -> Result<()>;
}

/// Result of running one resource
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ResourceOutcome {
    /// The resource converged
    Reconciled,
    /// The resource could not run yet and should be retried soon
    Canceled {
        /// Why the resource was skipped
        reason: String,
    },
}

/// Object-safe view of a resource, as run by a [`crate::ResourceSet`]
#[async_trait]
pub trait Resource: Send + Sync {
    /// Stable name, unique within a resource set
    fn name(&self) -> &str;

    /// Converge towards the desired state of a live object
    async fn ensure_created(
        &self,
        ctx: &ReconcileContext,
        obj: &ClusterObject,
    ) -> Result<ResourceOutcome>;

    /// Remove what was created for an object being deleted
    async fn ensure_deleted(
        &self,
        ctx: &ReconcileContext,
        obj: &ClusterObject,
    ) -> Result<ResourceOutcome>;
}
