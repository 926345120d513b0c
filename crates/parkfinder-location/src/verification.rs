//! Obtains the first verified location before anything else runs.
//!
//! The coordinator searches until a request succeeds, parking in
//! `LocationErrorIdle` between failed attempts. `FoundLocation` is terminal.

use std::time::Duration;

use parkfinder_core::{AccuracyTier, Generation, Location, LocationResult, LocationTuning};

use crate::REQUESTED_ACCURACY;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VerificationState {
    SearchingForLocation,
    /// Still searching after the short initial dwell; hosts show a
    /// "still looking" message here.
    SearchingForLocationExtended,
    LocationErrorIdle,
    FoundLocation,
}

impl VerificationState {
    #[must_use]
    pub fn is_searching(self) -> bool {
        matches!(
            self,
            VerificationState::SearchingForLocation
                | VerificationState::SearchingForLocationExtended
        )
    }
}

impl std::fmt::Display for VerificationState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            VerificationState::SearchingForLocation => "searching",
            VerificationState::SearchingForLocationExtended => "searching_extended",
            VerificationState::LocationErrorIdle => "error_idle",
            VerificationState::FoundLocation => "found",
        };
        f.write_str(name)
    }
}

/// What a verification notification carries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerificationStatus {
    pub state: VerificationState,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerificationTimer {
    Extend,
    Idle,
}

#[derive(Debug, Clone, PartialEq)]
pub enum VerificationEffect {
    RequestLocation {
        generation: Generation,
        accuracy_floor: AccuracyTier,
        timeout: Duration,
    },
    Schedule {
        timer: VerificationTimer,
        generation: Generation,
        after: Duration,
    },
    Notify(VerificationStatus),
    Found(Location),
}

#[derive(Debug)]
pub struct LocationVerificationCoordinator {
    state: VerificationState,
    location: Option<Location>,
    error: Option<String>,
    tuning: LocationTuning,
    request: Generation,
    timer: Generation,
}

impl LocationVerificationCoordinator {
    /// Creates the coordinator already searching, with the effects of
    /// entering `SearchingForLocation`.
    #[must_use]
    pub fn new(tuning: LocationTuning) -> (Self, Vec<VerificationEffect>) {
        let mut coordinator = Self {
            state: VerificationState::SearchingForLocation,
            location: None,
            error: None,
            tuning,
            request: Generation::default(),
            timer: Generation::default(),
        };
        let mut effects = Vec::new();
        coordinator.enter(VerificationState::SearchingForLocation, &mut effects);
        (coordinator, effects)
    }

    #[must_use]
    pub fn state(&self) -> VerificationState {
        self.state
    }

    #[must_use]
    pub fn location(&self) -> Option<&Location> {
        self.location.as_ref()
    }

    /// Reason the last attempt failed, cleared when a new search starts.
    #[must_use]
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    #[must_use]
    pub fn status(&self) -> VerificationStatus {
        VerificationStatus {
            state: self.state,
            error: self.error.clone(),
        }
    }

    pub fn on_timer(
        &mut self,
        timer: VerificationTimer,
        generation: Generation,
    ) -> Vec<VerificationEffect> {
        let mut effects = Vec::new();
        if generation != self.timer {
            tracing::debug!(?timer, %generation, "stale verification timer");
            return effects;
        }
        match (timer, self.state) {
            (VerificationTimer::Extend, VerificationState::SearchingForLocation) => {
                self.enter(VerificationState::SearchingForLocationExtended, &mut effects);
            }
            (VerificationTimer::Idle, VerificationState::LocationErrorIdle) => {
                self.enter(VerificationState::SearchingForLocation, &mut effects);
            }
            (timer, state) => {
                tracing::debug!(?timer, %state, "verification timer does not apply");
            }
        }
        effects
    }

    pub fn on_location_result(
        &mut self,
        generation: Generation,
        result: LocationResult,
    ) -> Vec<VerificationEffect> {
        let mut effects = Vec::new();
        if !self.state.is_searching() || generation != self.request {
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
                let location = location.with_accuracy(accuracy);
                self.location = Some(location.clone());
                self.error = None;
                self.enter(VerificationState::FoundLocation, &mut effects);
                effects.push(VerificationEffect::Found(location));
            }
            other => {
                self.error = other.failure_reason();
                self.enter(VerificationState::LocationErrorIdle, &mut effects);
            }
        }
        effects
    }

    /// The host became visible again; search at once unless a search is
    /// already under way.
    pub fn became_visible_again(&mut self) -> Vec<VerificationEffect> {
        let mut effects = Vec::new();
        if self.state.is_searching() {
            tracing::debug!(state = %self.state, "already searching, ignoring visibility change");
        } else {
            self.enter(VerificationState::SearchingForLocation, &mut effects);
        }
        effects
    }

    fn enter(&mut self, state: VerificationState, effects: &mut Vec<VerificationEffect>) {
        let from = self.state;
        self.state = state;

        match state {
            VerificationState::SearchingForLocation => {
                self.error = None;
                effects.push(VerificationEffect::RequestLocation {
                    generation: self.request.bump(),
                    accuracy_floor: REQUESTED_ACCURACY,
                    timeout: self.tuning.request_timeout,
                });
                effects.push(VerificationEffect::Schedule {
                    timer: VerificationTimer::Extend,
                    generation: self.timer.bump(),
                    after: self.tuning.verification_extend,
                });
            }
            VerificationState::LocationErrorIdle => {
                effects.push(VerificationEffect::Schedule {
                    timer: VerificationTimer::Idle,
                    generation: self.timer.bump(),
                    after: self.tuning.verification_idle,
                });
            }
            VerificationState::SearchingForLocationExtended | VerificationState::FoundLocation => {}
        }

        tracing::info!(
            %from,
            to = %state,
            error = self.error.as_deref().unwrap_or_default(),
            "verification transition"
        );
        effects.push(VerificationEffect::Notify(self.status()));
    }
}

#[cfg(test)]
#[path = "verification_test.rs"]
mod tests;
