//! Location values produced by a location source.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::geo::Coordinate;

/// Coarseness of a location fix, finest first.
///
/// The derived ordering is the accuracy ordering: `Room < House < Block <
/// Neighborhood < City`. A fix "at or finer than" a floor satisfies
/// `tier <= floor`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccuracyTier {
    /// ~5 m
    Room,
    /// ~15 m
    House,
    /// ~100 m
    Block,
    /// ~1 km
    Neighborhood,
    /// ~5 km
    City,
}

impl AccuracyTier {
    pub const ALL: [AccuracyTier; 5] = [
        AccuracyTier::Room,
        AccuracyTier::House,
        AccuracyTier::Block,
        AccuracyTier::Neighborhood,
        AccuracyTier::City,
    ];

    /// Nominal horizontal accuracy of the tier, in metres.
    #[must_use]
    pub const fn horizontal_meters(self) -> f64 {
        match self {
            AccuracyTier::Room => 5.0,
            AccuracyTier::House => 15.0,
            AccuracyTier::Block => 100.0,
            AccuracyTier::Neighborhood => 1_000.0,
            AccuracyTier::City => 5_000.0,
        }
    }

    /// Finest tier whose nominal accuracy covers `meters`.
    ///
    /// Returns `None` for negative (invalid) readings or readings coarser
    /// than city level.
    #[must_use]
    pub fn from_horizontal_accuracy(meters: f64) -> Option<Self> {
        if meters.is_nan() || meters < 0.0 {
            return None;
        }
        Self::ALL
            .into_iter()
            .find(|tier| meters <= tier.horizontal_meters())
    }

    /// Whether a fix of this tier satisfies `floor`.
    #[must_use]
    pub fn satisfies(self, floor: AccuracyTier) -> bool {
        self <= floor
    }
}

impl std::fmt::Display for AccuracyTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AccuracyTier::Room => write!(f, "room"),
            AccuracyTier::House => write!(f, "house"),
            AccuracyTier::Block => write!(f, "block"),
            AccuracyTier::Neighborhood => write!(f, "neighborhood"),
            AccuracyTier::City => write!(f, "city"),
        }
    }
}

/// An immutable location fix.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub coordinate: Coordinate,
    pub accuracy: Option<AccuracyTier>,
    pub recorded_at: DateTime<Utc>,
}

impl Location {
    /// A fix at `latitude`/`longitude` recorded now, with no accuracy tier.
    #[must_use]
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            coordinate: Coordinate::new(latitude, longitude),
            accuracy: None,
            recorded_at: Utc::now(),
        }
    }

    #[must_use]
    pub fn with_accuracy(mut self, accuracy: AccuracyTier) -> Self {
        self.accuracy = Some(accuracy);
        self
    }

    #[must_use]
    pub fn latitude(&self) -> f64 {
        self.coordinate.latitude
    }

    #[must_use]
    pub fn longitude(&self) -> f64 {
        self.coordinate.longitude
    }
}

/// Why a location request failed, classified from the platform's
/// permission/service status.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LocationFailure {
    #[error("Must respond to the dialog to grant Nearby Park Finder permission to access location services")]
    NotDetermined,

    #[error("Nearby Park Finder has been explicitly denied permission to access location services. Please go to Settings>Nearby Park Finder>Location to allow this feature")]
    Denied,

    #[error("Location services are currently restricted and cannot be enabled due to parental controls, corporate policy, etc")]
    Restricted,

    #[error("Location services have been disabled device-wide. Please enable them in the Settings app")]
    Disabled,

    #[error("{0}")]
    Unknown(String),
}

/// Outcome of one location request.
#[derive(Debug, Clone, PartialEq)]
pub enum LocationResult {
    Success {
        location: Location,
        accuracy: AccuracyTier,
    },
    TimedOut,
    Failed(LocationFailure),
}

impl LocationResult {
    pub const TIMED_OUT_REASON: &'static str =
        "Could not determine location within 3000ft. Please try again in better conditions";

    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, LocationResult::Success { .. })
    }

    /// Human-readable reason for a non-success result.
    #[must_use]
    pub fn failure_reason(&self) -> Option<String> {
        match self {
            LocationResult::Success { .. } => None,
            LocationResult::TimedOut => Some(Self::TIMED_OUT_REASON.to_owned()),
            LocationResult::Failed(failure) => Some(failure.to_string()),
        }
    }
}

/// Errors returned when reading the current location.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LocationError {
    #[error("current location has not been initialized")]
    Uninitialized,

    #[error("location service stopped before a location was found")]
    Stopped,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tiers_order_finer_to_coarser() {
        assert!(AccuracyTier::Room < AccuracyTier::House);
        assert!(AccuracyTier::House < AccuracyTier::Block);
        assert!(AccuracyTier::Block < AccuracyTier::Neighborhood);
        assert!(AccuracyTier::Neighborhood < AccuracyTier::City);
    }

    #[test]
    fn finer_fix_satisfies_coarser_floor() {
        assert!(AccuracyTier::Room.satisfies(AccuracyTier::House));
        assert!(AccuracyTier::House.satisfies(AccuracyTier::House));
        assert!(!AccuracyTier::Block.satisfies(AccuracyTier::House));
    }

    #[test]
    fn classifies_horizontal_accuracy() {
        assert_eq!(
            AccuracyTier::from_horizontal_accuracy(3.0),
            Some(AccuracyTier::Room)
        );
        assert_eq!(
            AccuracyTier::from_horizontal_accuracy(15.0),
            Some(AccuracyTier::House)
        );
        assert_eq!(
            AccuracyTier::from_horizontal_accuracy(650.0),
            Some(AccuracyTier::Neighborhood)
        );
        assert_eq!(AccuracyTier::from_horizontal_accuracy(12_000.0), None);
        assert_eq!(AccuracyTier::from_horizontal_accuracy(-1.0), None);
    }

    #[test]
    fn denied_reason_mentions_settings() {
        let reason = LocationFailure::Denied.to_string();
        assert!(reason.contains("denied permission"), "{reason}");
        assert!(reason.contains("Settings>Nearby Park Finder>Location"));
    }

    #[test]
    fn failure_reason_for_each_result() {
        let ok = LocationResult::Success {
            location: Location::new(1.0, 2.0),
            accuracy: AccuracyTier::House,
        };
        assert!(ok.failure_reason().is_none());
        assert_eq!(
            LocationResult::TimedOut.failure_reason().as_deref(),
            Some(LocationResult::TIMED_OUT_REASON)
        );
        assert_eq!(
            LocationResult::Failed(LocationFailure::Unknown("gps off".to_owned()))
                .failure_reason()
                .as_deref(),
            Some("gps off")
        );
    }

    #[test]
    fn location_serializes_with_lowercase_tier() {
        let loc = Location::new(40.0, -74.0).with_accuracy(AccuracyTier::Block);
        let json = serde_json::to_value(&loc).unwrap();
        assert_eq!(json["accuracy"], "block");
        assert_eq!(json["coordinate"]["latitude"], 40.0);
    }
}
