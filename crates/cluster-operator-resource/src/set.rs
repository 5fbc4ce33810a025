//! Ordered set of resources reconciled together for one cluster object

use std::collections::HashSet;

use tracing::{debug, info};

use cluster_operator_common::key::ClusterObject;
use cluster_operator_common::{Error, Result};

use crate::resource::{ReconcileContext, Resource, ResourceOutcome};

/// What happened during one pass over a [`ResourceSet`]
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    /// Resources that converged
    pub reconciled: Vec<String>,
    /// Resources canceled for now, with the reason
    pub canceled: Vec<(String, String)>,
}

impl ReconcileReport {
    /// Whether any resource asked to be retried soon
    pub fn has_canceled(&self) -> bool {
        !self.canceled.is_empty()
    }

    fn record(&mut self, name: &str, outcome: ResourceOutcome) {
        match outcome {
            ResourceOutcome::Reconciled => self.reconciled.push(name.to_string()),
            ResourceOutcome::Canceled { reason } => {
                self.canceled.push((name.to_string(), reason))
            }
        }
    }
}

/// Resources run sequentially, in order on creation and reversed on deletion
pub struct ResourceSet {
    resources: Vec<Box<dyn Resource>>,
}

impl ResourceSet {
    /// Build a set; names must be non-empty and unique
    pub fn new(resources: Vec<Box<dyn Resource>>) -> Result<Self> {
        let mut seen = HashSet::new();
        for resource in &resources {
            let name = resource.name();
            if name.is_empty() {
                return Err(Error::invalid_config("resource name must not be empty"));
            }
            if !seen.insert(name.to_string()) {
                return Err(Error::invalid_config(format!(
                    "duplicate resource name '{}'",
                    name
                )));
            }
        }
        Ok(Self { resources })
    }

    /// Resource names in execution order
    pub fn names(&self) -> Vec<&str> {
        self.resources.iter().map(|r| r.name()).collect()
    }

    /// Converge every resource for a live object
    ///
    /// Stops at the first hard error; canceled resources do not stop the pass.
    pub async fn ensure_created(
        &self,
        ctx: &ReconcileContext,
        obj: &ClusterObject,
    ) -> Result<ReconcileReport> {
        let mut report = ReconcileReport::default();
        for resource in &self.resources {
            ctx.check_canceled(resource.name())?;
            debug!(resource = resource.name(), "ensuring created");
            let outcome = resource.ensure_created(ctx, obj).await?;
            report.record(resource.name(), outcome);
        }
        info!(
            reconciled = report.reconciled.len(),
            canceled = report.canceled.len(),
            "resources ensured created"
        );
        Ok(report)
    }

    /// Remove what every resource created for an object being deleted
    pub async fn ensure_deleted(
        &self,
        ctx: &ReconcileContext,
        obj: &ClusterObject,
    ) -> Result<ReconcileReport> {
        let mut report = ReconcileReport::default();
        for resource in self.resources.iter().rev() {
            ctx.check_canceled(resource.name())?;
            debug!(resource = resource.name(), "ensuring deleted");
            let outcome = resource.ensure_deleted(ctx, obj).await?;
            report.record(resource.name(), outcome);
        }
        info!(
            reconciled = report.reconciled.len(),
            canceled = report.canceled.len(),
            "resources ensured deleted"
        );
        Ok(report)
    }
}
