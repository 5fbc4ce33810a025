//! cluster-operator - reconciles tenant cluster CRDs into managed add-ons

#![deny(missing_docs)]

/// Command line and environment configuration
pub mod config;
/// Reconcile, finalizer and requeue policy for watched cluster objects
pub mod controller;
/// Resource set wiring and per provider controllers
pub mod controller_runner;

pub use config::{Cli, OperatorConfig};
pub use controller::Context;
