//! The one-shot location lookup the state machines are built on.

use std::future::Future;
use std::sync::Mutex;
use std::time::Duration;

use parkfinder_core::{AccuracyTier, Coordinate, Location, LocationFailure, LocationResult};

/// A one-shot device location lookup.
///
/// Implementations resolve within `timeout`, returning
/// [`LocationResult::TimedOut`] if no fix arrived in time. A fix coarser than
/// `accuracy_floor` may still be reported as a success; callers accept
/// whatever tier comes back.
pub trait LocationSource: Send + Sync {
    fn request_location(
        &self,
        accuracy_floor: AccuracyTier,
        timeout: Duration,
    ) -> impl Future<Output = LocationResult> + Send;
}

#[derive(Debug, Clone)]
enum Outcome {
    Fix {
        coordinate: Coordinate,
        accuracy: AccuracyTier,
    },
    TimedOut,
    Failed(LocationFailure),
}

/// A source that answers every request the same way.
///
/// Stands in for the device when simulating a location, and for tests. The
/// fixed position can be moved with [`StaticLocationSource::move_to`].
#[derive(Debug)]
pub struct StaticLocationSource {
    outcome: Mutex<Outcome>,
}

impl StaticLocationSource {
    /// Every request succeeds at `coordinate` with `accuracy`.
    #[must_use]
    pub fn at(coordinate: Coordinate, accuracy: AccuracyTier) -> Self {
        Self {
            outcome: Mutex::new(Outcome::Fix {
                coordinate,
                accuracy,
            }),
        }
    }

    /// Every request fails with `failure`.
    #[must_use]
    pub fn failing(failure: LocationFailure) -> Self {
        Self {
            outcome: Mutex::new(Outcome::Failed(failure)),
        }
    }

    /// Every request times out.
    #[must_use]
    pub fn timing_out() -> Self {
        Self {
            outcome: Mutex::new(Outcome::TimedOut),
        }
    }

    /// Later requests succeed at `coordinate`, keeping the current accuracy
    /// (or `House` if the source was not reporting fixes).
    pub fn move_to(&self, coordinate: Coordinate) {
        let mut outcome = self
            .outcome
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        let accuracy = match *outcome {
            Outcome::Fix { accuracy, .. } => accuracy,
            _ => AccuracyTier::House,
        };
        *outcome = Outcome::Fix {
            coordinate,
            accuracy,
        };
    }

    fn current(&self) -> Outcome {
        self.outcome
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }
}

impl LocationSource for StaticLocationSource {
    async fn request_location(
        &self,
        accuracy_floor: AccuracyTier,
        _timeout: Duration,
    ) -> LocationResult {
        match self.current() {
            Outcome::Fix {
                coordinate,
                accuracy,
            } => {
                if !accuracy.satisfies(accuracy_floor) {
                    tracing::debug!(%accuracy, %accuracy_floor, "reporting fix coarser than requested");
                }
                LocationResult::Success {
                    location: Location::new(coordinate.latitude, coordinate.longitude)
                        .with_accuracy(accuracy),
                    accuracy,
                }
            }
            Outcome::TimedOut => LocationResult::TimedOut,
            Outcome::Failed(failure) => LocationResult::Failed(failure),
        }
    }
}
