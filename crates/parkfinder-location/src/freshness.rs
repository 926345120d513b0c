//! Keeps the current location from going stale.
//!
//! ```text
//! Uninitialized ─initialize─▶ Updated ─expire─▶ Expired ─▶ Updating ─ok─▶ Updated
//!                                                            │  ▲
//!                                                       fail │  │ retry
//!                                                            ▼  │
//!                                                        ExpiredError
//! ```
//!
//! The tracker never performs I/O. Each handler returns the effects the
//! driver must carry out, and completions come back tagged with the
//! [`Generation`] they were issued under.

use std::time::Duration;

use parkfinder_core::{
    AccuracyTier, Generation, Location, LocationError, LocationResult, LocationTuning,
};

use crate::REQUESTED_ACCURACY;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FreshnessState {
    Uninitialized,
    Updated,
    Expired,
    Updating,
    ExpiredError,
}

impl std::fmt::Display for FreshnessState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            FreshnessState::Uninitialized => "uninitialized",
            FreshnessState::Updated => "updated",
            FreshnessState::Expired => "expired",
            FreshnessState::Updating => "updating",
            FreshnessState::ExpiredError => "expired_error",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FreshnessTimer {
    /// The stored location has aged out.
    Expire,
    /// Time to try again after a failed refresh.
    Retry,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FreshnessEffect {
    RequestLocation {
        generation: Generation,
        accuracy_floor: AccuracyTier,
        timeout: Duration,
    },
    Schedule {
        timer: FreshnessTimer,
        generation: Generation,
        after: Duration,
    },
    Notify(FreshnessState),
    Publish(Location),
}

/// The freshness state machine.
#[derive(Debug)]
pub struct LocationFreshnessTracker {
    state: FreshnessState,
    location: Option<Location>,
    tuning: LocationTuning,
    request: Generation,
    timer: Generation,
}

impl LocationFreshnessTracker {
    #[must_use]
    pub fn new(tuning: LocationTuning) -> Self {
        Self {
            state: FreshnessState::Uninitialized,
            location: None,
            tuning,
            request: Generation::default(),
            timer: Generation::default(),
        }
    }

    #[must_use]
    pub fn state(&self) -> FreshnessState {
        self.state
    }

    /// The stored location, stale or not.
    ///
    /// # Errors
    ///
    /// Returns [`LocationError::Uninitialized`] until the tracker is seeded.
    pub fn current_location(&self) -> Result<&Location, LocationError> {
        match (self.state, &self.location) {
            (FreshnessState::Uninitialized, _) | (_, None) => Err(LocationError::Uninitialized),
            (_, Some(location)) => Ok(location),
        }
    }

    /// Seeds the tracker with a verified location. Ignored once seeded.
    pub fn initialize_with_location(&mut self, location: Location) -> Vec<FreshnessEffect> {
        let mut effects = Vec::new();
        if self.state != FreshnessState::Uninitialized {
            tracing::debug!(state = %self.state, "tracker already initialized, ignoring");
            return effects;
        }
        self.store(location, &mut effects);
        self.enter(FreshnessState::Updated, &mut effects);
        effects
    }

    pub fn on_timer(&mut self, timer: FreshnessTimer, generation: Generation) -> Vec<FreshnessEffect> {
        let mut effects = Vec::new();
        if generation != self.timer {
            tracing::debug!(?timer, %generation, current = %self.timer, "stale freshness timer");
            return effects;
        }
        match (timer, self.state) {
            (FreshnessTimer::Expire, FreshnessState::Updated) => {
                self.enter(FreshnessState::Expired, &mut effects);
            }
            (FreshnessTimer::Retry, FreshnessState::ExpiredError) => {
                self.enter(FreshnessState::Updating, &mut effects);
            }
            (timer, state) => {
                tracing::debug!(?timer, %state, "freshness timer does not apply in this state");
            }
        }
        effects
    }

    pub fn on_location_result(
        &mut self,
        generation: Generation,
        result: LocationResult,
    ) -> Vec<FreshnessEffect> {
        let mut effects = Vec::new();
        if self.state != FreshnessState::Updating || generation != self.request {
            tracing::debug!(
                state = %self.state,
                %generation,
                outstanding = %self.request,
                "ignoring location completion"
            );
            return effects;
        }
        match result {
            LocationResult::Success { location, accuracy } => {
                self.store(location.with_accuracy(accuracy), &mut effects);
                self.enter(FreshnessState::Updated, &mut effects);
            }
            other => {
                tracing::warn!(
                    reason = other.failure_reason().as_deref().unwrap_or_default(),
                    "location refresh failed"
                );
                self.enter(FreshnessState::ExpiredError, &mut effects);
            }
        }
        effects
    }

    fn store(&mut self, location: Location, effects: &mut Vec<FreshnessEffect>) {
        self.location = Some(location.clone());
        effects.push(FreshnessEffect::Publish(location));
    }

    fn enter(&mut self, state: FreshnessState, effects: &mut Vec<FreshnessEffect>) {
        tracing::info!(from = %self.state, to = %state, "freshness transition");
        self.state = state;
        effects.push(FreshnessEffect::Notify(state));

        match state {
            FreshnessState::Updated => effects.push(FreshnessEffect::Schedule {
                timer: FreshnessTimer::Expire,
                generation: self.timer.bump(),
                after: self.tuning.freshness_window,
            }),
            FreshnessState::Expired => self.enter(FreshnessState::Updating, effects),
            FreshnessState::Updating => effects.push(FreshnessEffect::RequestLocation {
                generation: self.request.bump(),
                accuracy_floor: REQUESTED_ACCURACY,
                timeout: self.tuning.request_timeout,
            }),
            FreshnessState::ExpiredError => effects.push(FreshnessEffect::Schedule {
                timer: FreshnessTimer::Retry,
                generation: self.timer.bump(),
                after: self.tuning.freshness_retry,
            }),
            FreshnessState::Uninitialized => {}
        }
    }
}

#[cfg(test)]
#[path = "freshness_test.rs"]
mod tests;
