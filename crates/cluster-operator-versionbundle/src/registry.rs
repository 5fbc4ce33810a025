//! Explicit, validated registry of version bundles
//!
//! The registry is built once at startup from a list of bundles and passed
//! to whatever needs to select a bundle. Construction rejects malformed
//! bundles and duplicate `(provider, version)` pairs.

use std::collections::BTreeMap;

use tracing::debug;

use cluster_operator_common::{Error, Provider, Result};

use crate::bundle::{parse_version, VersionBundle};
use crate::releases;

/// Validated set of version bundles indexed by provider and version
#[derive(Clone, Debug, Default)]
pub struct Registry {
    bundles: BTreeMap<(Provider, String), VersionBundle>,
}

impl Registry {
    /// Build a registry, validating every bundle and version uniqueness per provider
    pub fn new(bundles: impl IntoIterator<Item = VersionBundle>) -> Result<Self> {
        let mut indexed = BTreeMap::new();
        for bundle in bundles {
            bundle.validate()?;
            let key = (bundle.provider, bundle.version.clone());
            if indexed.contains_key(&key) {
                return Err(Error::invalid_config(format!(
                    "duplicate version bundle {} for provider {}",
                    bundle.version, bundle.provider
                )));
            }
            indexed.insert(key, bundle);
        }
        debug!(bundles = indexed.len(), "version bundle registry built");
        Ok(Self { bundles: indexed })
    }

    /// Registry of every release this operator ships
    pub fn with_releases() -> Result<Self> {
        Self::new(releases::all())
    }

    /// Bundle for `provider` with exactly `version`
    pub fn find(&self, provider: Provider, version: &str) -> Option<&VersionBundle> {
        self.bundles.get(&(provider, version.to_string()))
    }

    /// Bundle a cluster pinned to `version` should be reconciled with
    ///
    /// Work-in-progress bundles are only selectable when `allow_wip` is set.
    /// Deprecated bundles stay selectable so existing clusters keep working.
    pub fn select(
        &self,
        provider: Provider,
        version: &str,
        allow_wip: bool,
    ) -> Option<&VersionBundle> {
        self.find(provider, version)
            .filter(|bundle| allow_wip || !bundle.wip)
    }

    /// Bundles for `provider`, oldest version first
    pub fn bundles(&self, provider: Provider) -> Vec<&VersionBundle> {
        let mut bundles: Vec<_> = self
            .bundles
            .iter()
            .filter(|((p, _), _)| *p == provider)
            .map(|(_, bundle)| bundle)
            .collect();
        bundles.sort_by_key(|bundle| parse_version(&bundle.version));
        bundles
    }

    /// Newest non-deprecated, released bundle for `provider`
    pub fn latest(&self, provider: Provider) -> Option<&VersionBundle> {
        self.bundles(provider)
            .into_iter()
            .rev()
            .find(|bundle| !bundle.wip && !bundle.deprecated)
    }

    /// Total number of bundles
    pub fn len(&self) -> usize {
        self.bundles.len()
    }

    /// Whether the registry holds no bundles
    pub fn is_empty(&self) -> bool {
        self.bundles.is_empty()
    }
}
