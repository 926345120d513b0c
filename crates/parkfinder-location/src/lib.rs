//! Device location for the park finder.
//!
//! Two sans-IO state machines decide *when* to ask a [`LocationSource`] for
//! a fix: [`LocationVerificationCoordinator`] obtains the first one and
//! [`LocationFreshnessTracker`] keeps it fresh afterwards. The [`driver`]
//! module runs each machine on its own tokio task.

pub mod driver;
pub mod freshness;
pub mod source;
pub mod verification;

pub use driver::{
    spawn_freshness_tracker, spawn_verification, FreshnessHandle, VerificationHandle,
};
pub use freshness::{FreshnessEffect, FreshnessState, FreshnessTimer, LocationFreshnessTracker};
pub use source::{LocationSource, StaticLocationSource};
pub use verification::{
    LocationVerificationCoordinator, VerificationEffect, VerificationState, VerificationStatus,
    VerificationTimer,
};

use parkfinder_core::AccuracyTier;

/// Accuracy both machines ask the source for.
pub const REQUESTED_ACCURACY: AccuracyTier = AccuracyTier::House;
