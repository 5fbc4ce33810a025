//! Shipped releases, one pure function per provider and version

pub mod aws;
pub mod azure;
pub mod capi;
pub mod kvm;

use crate::VersionBundle;

/// Every release shipped with this operator
pub fn all() -> Vec<VersionBundle> {
    let mut bundles = Vec::new();
    bundles.extend(aws::all());
    bundles.extend(azure::all());
    bundles.extend(kvm::all());
    bundles.extend(capi::all());
    bundles
}
