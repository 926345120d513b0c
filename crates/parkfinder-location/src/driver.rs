//! Tokio tasks that own the location state machines.
//!
//! Each driver owns its machine exclusively. Commands from handles and
//! completions from spawned I/O and timer tasks arrive on two inboxes and
//! are applied one at a time, so a machine never sees concurrent events.
//! State changes fan out on a `broadcast` channel; current values are
//! readable from `watch` channels without messaging the task.

use std::sync::Arc;
use std::time::Duration;

use parkfinder_core::{Generation, Location, LocationError, LocationResult, LocationTuning};
use tokio::sync::{broadcast, mpsc, watch};

use crate::freshness::{FreshnessEffect, FreshnessState, FreshnessTimer, LocationFreshnessTracker};
use crate::source::LocationSource;
use crate::verification::{
    LocationVerificationCoordinator, VerificationEffect, VerificationState, VerificationStatus,
    VerificationTimer,
};

const NOTIFY_CAPACITY: usize = 32;

/// An I/O or timer completion routed back to the owning driver.
#[derive(Debug)]
enum Completion<T> {
    Location {
        generation: Generation,
        result: LocationResult,
    },
    Timer {
        timer: T,
        generation: Generation,
    },
}

fn spawn_request<S, T>(
    source: &Arc<S>,
    completions: &mpsc::UnboundedSender<Completion<T>>,
    generation: Generation,
    accuracy_floor: parkfinder_core::AccuracyTier,
    timeout: Duration,
) where
    S: LocationSource + 'static,
    T: Send + 'static,
{
    let source = Arc::clone(source);
    let completions = completions.clone();
    tokio::spawn(async move {
        let result = source.request_location(accuracy_floor, timeout).await;
        // The driver may have stopped; nothing to deliver to.
        let _ = completions.send(Completion::Location { generation, result });
    });
}

fn spawn_timer<T>(
    completions: &mpsc::UnboundedSender<Completion<T>>,
    timer: T,
    generation: Generation,
    after: Duration,
) where
    T: Send + 'static,
{
    let completions = completions.clone();
    tokio::spawn(async move {
        tokio::time::sleep(after).await;
        let _ = completions.send(Completion::Timer { timer, generation });
    });
}

// ---------------------------------------------------------------------------
// Freshness tracker
// ---------------------------------------------------------------------------

#[derive(Debug)]
enum FreshnessCommand {
    Initialize(Location),
}

/// Handle to a running freshness tracker. Cheap to clone; the tracker stops
/// when the last handle is dropped.
#[derive(Debug, Clone)]
pub struct FreshnessHandle {
    commands: mpsc::UnboundedSender<FreshnessCommand>,
    location: watch::Receiver<Option<Location>>,
    state: watch::Receiver<FreshnessState>,
    notifications: broadcast::Sender<FreshnessState>,
}

impl FreshnessHandle {
    /// Seeds the tracker. Ignored if it was already seeded.
    ///
    /// # Errors
    ///
    /// Returns [`LocationError::Stopped`] if the tracker task has exited.
    pub fn initialize_with_location(&self, location: Location) -> Result<(), LocationError> {
        self.commands
            .send(FreshnessCommand::Initialize(location))
            .map_err(|_| LocationError::Stopped)
    }

    /// The latest stored location, stale or not.
    ///
    /// # Errors
    ///
    /// Returns [`LocationError::Uninitialized`] until the tracker is seeded.
    pub fn current_location(&self) -> Result<Location, LocationError> {
        self.location
            .borrow()
            .clone()
            .ok_or(LocationError::Uninitialized)
    }

    #[must_use]
    pub fn state(&self) -> FreshnessState {
        *self.state.borrow()
    }

    /// One message per transition, starting from the next one.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<FreshnessState> {
        self.notifications.subscribe()
    }

    /// Watches the stored location; changes on every successful refresh.
    #[must_use]
    pub fn locations(&self) -> watch::Receiver<Option<Location>> {
        self.location.clone()
    }
}

struct FreshnessDriver<S> {
    machine: LocationFreshnessTracker,
    source: Arc<S>,
    completions: mpsc::UnboundedSender<Completion<FreshnessTimer>>,
    location: watch::Sender<Option<Location>>,
    state: watch::Sender<FreshnessState>,
    notifications: broadcast::Sender<FreshnessState>,
}

/// Starts a freshness tracker on the current tokio runtime.
pub fn spawn_freshness_tracker<S>(source: Arc<S>, tuning: LocationTuning) -> FreshnessHandle
where
    S: LocationSource + 'static,
{
    let (commands_tx, commands_rx) = mpsc::unbounded_channel();
    let (completions_tx, completions_rx) = mpsc::unbounded_channel();
    let (location_tx, location_rx) = watch::channel(None);
    let (state_tx, state_rx) = watch::channel(FreshnessState::Uninitialized);
    let (notify_tx, _) = broadcast::channel(NOTIFY_CAPACITY);

    let driver = FreshnessDriver {
        machine: LocationFreshnessTracker::new(tuning),
        source,
        completions: completions_tx,
        location: location_tx,
        state: state_tx,
        notifications: notify_tx.clone(),
    };
    tokio::spawn(driver.run(commands_rx, completions_rx));

    FreshnessHandle {
        commands: commands_tx,
        location: location_rx,
        state: state_rx,
        notifications: notify_tx,
    }
}

impl<S> FreshnessDriver<S>
where
    S: LocationSource + 'static,
{
    async fn run(
        mut self,
        mut commands: mpsc::UnboundedReceiver<FreshnessCommand>,
        mut completions: mpsc::UnboundedReceiver<Completion<FreshnessTimer>>,
    ) {
        tracing::debug!("freshness tracker started");
        loop {
            let effects = tokio::select! {
                biased;

                command = commands.recv() => match command {
                    Some(FreshnessCommand::Initialize(location)) => {
                        self.machine.initialize_with_location(location)
                    }
                    None => break,
                },

                Some(completion) = completions.recv() => match completion {
                    Completion::Location { generation, result } => {
                        self.machine.on_location_result(generation, result)
                    }
                    Completion::Timer { timer, generation } => {
                        self.machine.on_timer(timer, generation)
                    }
                },
            };
            self.execute(effects);
        }
        tracing::debug!("freshness tracker stopped (all handles dropped)");
    }

    fn execute(&self, effects: Vec<FreshnessEffect>) {
        for effect in effects {
            match effect {
                FreshnessEffect::RequestLocation {
                    generation,
                    accuracy_floor,
                    timeout,
                } => spawn_request(
                    &self.source,
                    &self.completions,
                    generation,
                    accuracy_floor,
                    timeout,
                ),
                FreshnessEffect::Schedule {
                    timer,
                    generation,
                    after,
                } => spawn_timer(&self.completions, timer, generation, after),
                FreshnessEffect::Notify(state) => {
                    self.state.send_replace(state);
                    // No subscribers is fine.
                    let _ = self.notifications.send(state);
                }
                FreshnessEffect::Publish(location) => {
                    self.location.send_replace(Some(location));
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Verification coordinator
// ---------------------------------------------------------------------------

#[derive(Debug)]
enum VerificationCommand {
    BecameVisibleAgain,
}

/// Handle to a running verification coordinator. The coordinator task
/// exits once a location is found.
#[derive(Debug, Clone)]
pub struct VerificationHandle {
    commands: mpsc::UnboundedSender<VerificationCommand>,
    status: watch::Receiver<VerificationStatus>,
    found: watch::Receiver<Option<Location>>,
    notifications: broadcast::Sender<VerificationStatus>,
}

impl VerificationHandle {
    /// Forces a new search if the coordinator is idling after an error.
    pub fn became_visible_again(&self) {
        if self
            .commands
            .send(VerificationCommand::BecameVisibleAgain)
            .is_err()
        {
            tracing::debug!("verification already finished, ignoring visibility change");
        }
    }

    #[must_use]
    pub fn status(&self) -> VerificationStatus {
        self.status.borrow().clone()
    }

    /// One message per transition, starting from the next one.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<VerificationStatus> {
        self.notifications.subscribe()
    }

    /// Waits until the coordinator reaches `FoundLocation`.
    ///
    /// # Errors
    ///
    /// Returns [`LocationError::Stopped`] if the coordinator exited without
    /// finding a location.
    pub async fn wait_for_location(&self) -> Result<Location, LocationError> {
        let mut found = self.found.clone();
        let location = found
            .wait_for(Option::is_some)
            .await
            .map_err(|_| LocationError::Stopped)?;
        location.clone().ok_or(LocationError::Stopped)
    }
}

struct VerificationDriver<S> {
    machine: LocationVerificationCoordinator,
    source: Arc<S>,
    completions: mpsc::UnboundedSender<Completion<VerificationTimer>>,
    status: watch::Sender<VerificationStatus>,
    found: watch::Sender<Option<Location>>,
    notifications: broadcast::Sender<VerificationStatus>,
}

/// Starts a verification coordinator on the current tokio runtime. It begins
/// searching immediately.
pub fn spawn_verification<S>(source: Arc<S>, tuning: LocationTuning) -> VerificationHandle
where
    S: LocationSource + 'static,
{
    let (machine, effects) = LocationVerificationCoordinator::new(tuning);
    let (commands_tx, commands_rx) = mpsc::unbounded_channel();
    let (completions_tx, completions_rx) = mpsc::unbounded_channel();
    let (status_tx, status_rx) = watch::channel(machine.status());
    let (found_tx, found_rx) = watch::channel(None);
    let (notify_tx, _) = broadcast::channel(NOTIFY_CAPACITY);

    let driver = VerificationDriver {
        machine,
        source,
        completions: completions_tx,
        status: status_tx,
        found: found_tx,
        notifications: notify_tx.clone(),
    };
    tokio::spawn(driver.run(effects, commands_rx, completions_rx));

    VerificationHandle {
        commands: commands_tx,
        status: status_rx,
        found: found_rx,
        notifications: notify_tx,
    }
}

impl<S> VerificationDriver<S>
where
    S: LocationSource + 'static,
{
    async fn run(
        mut self,
        initial: Vec<VerificationEffect>,
        mut commands: mpsc::UnboundedReceiver<VerificationCommand>,
        mut completions: mpsc::UnboundedReceiver<Completion<VerificationTimer>>,
    ) {
        tracing::debug!("location verification started");
        self.execute(initial);

        while self.machine.state() != VerificationState::FoundLocation {
            let effects = tokio::select! {
                biased;

                command = commands.recv() => match command {
                    Some(VerificationCommand::BecameVisibleAgain) => {
                        self.machine.became_visible_again()
                    }
                    None => break,
                },

                Some(completion) = completions.recv() => match completion {
                    Completion::Location { generation, result } => {
                        self.machine.on_location_result(generation, result)
                    }
                    Completion::Timer { timer, generation } => {
                        self.machine.on_timer(timer, generation)
                    }
                },
            };
            self.execute(effects);
        }
        tracing::debug!(state = %self.machine.state(), "location verification finished");
    }

    fn execute(&self, effects: Vec<VerificationEffect>) {
        for effect in effects {
            match effect {
                VerificationEffect::RequestLocation {
                    generation,
                    accuracy_floor,
                    timeout,
                } => spawn_request(
                    &self.source,
                    &self.completions,
                    generation,
                    accuracy_floor,
                    timeout,
                ),
                VerificationEffect::Schedule {
                    timer,
                    generation,
                    after,
                } => spawn_timer(&self.completions, timer, generation, after),
                VerificationEffect::Notify(status) => {
                    self.status.send_replace(status.clone());
                    let _ = self.notifications.send(status);
                }
                VerificationEffect::Found(location) => {
                    self.found.send_replace(Some(location));
                }
            }
        }
    }
}

#[cfg(test)]
#[path = "driver_test.rs"]
mod tests;
