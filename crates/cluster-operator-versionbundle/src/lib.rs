//! Version bundles for cluster-operator releases
//!
//! Each release is described by an immutable [`VersionBundle`] per provider.
//! Release data lives in [`releases`] as one pure function per version, and
//! [`Registry`] validates and indexes them for exact-version selection.

#![deny(missing_docs)]

pub mod bundle;
pub mod registry;
pub mod releases;

pub use bundle::{parse_version, Changelog, ChangelogKind, Component, VersionBundle, BUNDLE_NAME};
pub use registry::Registry;

/// Component carrying the chart operator version used in ChartConfigs
pub const CHART_OPERATOR_COMPONENT: &str = "chart-operator";
