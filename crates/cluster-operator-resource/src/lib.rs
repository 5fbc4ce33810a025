//! Managed add-on resources of cluster-operator
//!
//! A resource reconciles one kind of sub-resource for a tenant cluster. It
//! implements [`CrudResource`]: read the current state, compute the desired
//! state, diff them into a [`Patch`] and apply the patch. [`CrudResourceWrapper`]
//! drives that contract and [`ResourceSet`] runs an ordered list of resources
//! for one cluster object.

#![deny(missing_docs)]

pub mod certs;
pub mod charts;
pub mod clients;
pub mod diff;
pub mod kubeconfig;
pub mod resource;
pub mod resources;
pub mod set;
pub mod tenant;
pub mod wrapper;

pub use resource::{CrudResource, Patch, ReconcileContext, Resource, ResourceOutcome};
pub use set::{ReconcileReport, ResourceSet};
pub use wrapper::CrudResourceWrapper;

/// Namespace in tenant clusters holding everything the operator manages
pub const TENANT_NAMESPACE: &str = "giantswarm";
