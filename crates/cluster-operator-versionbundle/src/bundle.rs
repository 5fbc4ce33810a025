//! Version bundle records
//!
//! A bundle describes one cluster-operator release for one provider: which
//! component versions it ships and what changed. Bundles are immutable once
//! published; a new release adds a new bundle.

use chrono::{DateTime, TimeZone, Utc};
use serde::Serialize;

use cluster_operator_common::{Error, Provider, Result};

/// Name of the bundle owner, also the component carrying the operator version
pub const BUNDLE_NAME: &str = "cluster-operator";

/// Kind of a changelog entry
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangelogKind {
    /// New functionality
    Added,
    /// Changed behavior
    Changed,
    /// Functionality scheduled for removal
    Deprecated,
    /// Removed functionality
    Removed,
    /// Bug fix
    Fixed,
}

/// One changelog entry
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Changelog {
    /// Component the change applies to
    pub component: String,
    /// What changed
    pub description: String,
    /// Kind of change
    pub kind: ChangelogKind,
}

/// A component and the version shipped with a bundle
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Component {
    /// Component name (e.g. "chart-operator")
    pub name: String,
    /// Exact component version
    pub version: String,
}

/// Immutable description of one release for one provider
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionBundle {
    /// Bundle name
    pub name: String,
    /// Provider the bundle applies to
    pub provider: Provider,
    /// Exact bundle version (e.g. "0.3.0")
    pub version: String,
    /// Release time
    pub time: DateTime<Utc>,
    /// Shipped components
    pub components: Vec<Component>,
    /// Changes since the previous bundle
    pub changelogs: Vec<Changelog>,
    /// No longer used for new clusters
    pub deprecated: bool,
    /// Not released yet
    pub wip: bool,
}

impl VersionBundle {
    /// Start a bundle for `provider` at `version`, released on the given date
    pub fn new(provider: Provider, version: &str, year: i32, month: u32, day: u32) -> Self {
        Self {
            name: BUNDLE_NAME.to_string(),
            provider,
            version: version.to_string(),
            time: Utc
                .with_ymd_and_hms(year, month, day, 12, 0, 0)
                .single()
                .unwrap_or_default(),
            components: Vec::new(),
            changelogs: Vec::new(),
            deprecated: false,
            wip: false,
        }
    }

    /// Add a component
    pub fn component(mut self, name: &str, version: &str) -> Self {
        self.components.push(Component {
            name: name.to_string(),
            version: version.to_string(),
        });
        self
    }

    /// Add a changelog entry
    pub fn changelog(mut self, component: &str, kind: ChangelogKind, description: &str) -> Self {
        self.changelogs.push(Changelog {
            component: component.to_string(),
            description: description.to_string(),
            kind,
        });
        self
    }

    /// Mark the bundle deprecated
    pub fn deprecated(mut self) -> Self {
        self.deprecated = true;
        self
    }

    /// Mark the bundle work in progress
    pub fn wip(mut self) -> Self {
        self.wip = true;
        self
    }

    /// Look up a shipped component by name
    pub fn find_component(&self, name: &str) -> Option<&Component> {
        self.components.iter().find(|c| c.name == name)
    }

    /// Check the bundle is well formed
    pub fn validate(&self) -> Result<()> {
        if self.name.is_empty() {
            return Err(Error::invalid_config("version bundle name must not be empty"));
        }
        if parse_version(&self.version).is_none() {
            return Err(Error::invalid_config(format!(
                "version bundle {} for {} has invalid version '{}'",
                self.name, self.provider, self.version
            )));
        }
        for component in &self.components {
            if component.name.is_empty() || component.version.is_empty() {
                return Err(Error::invalid_config(format!(
                    "version bundle {} {} has a component without name or version",
                    self.provider, self.version
                )));
            }
        }
        for changelog in &self.changelogs {
            if changelog.component.is_empty() || changelog.description.is_empty() {
                return Err(Error::invalid_config(format!(
                    "version bundle {} {} has a changelog without component or description",
                    self.provider, self.version
                )));
            }
        }
        Ok(())
    }
}

/// Parse a `major.minor.patch` version into its numeric parts
pub fn parse_version(version: &str) -> Option<(u64, u64, u64)> {
    let mut parts = version.split('.');
    let major = parts.next()?.parse().ok()?;
    let minor = parts.next()?.parse().ok()?;
    let patch = parts.next()?.parse().ok()?;
    if parts.next().is_some() {
        return None;
    }
    Some((major, minor, patch))
}
