//! Runs a [`MapSyncController`] against a surface and a park search.
//!
//! The session task owns the controller and the surface. Host events,
//! search completions, retry timers, and location refreshes are applied one
//! at a time on that task, so park merges never race.

use std::sync::Arc;
use std::time::Duration;

use parkfinder_core::{Generation, Location, MapTuning, Park};
use parkfinder_places::NearbySearch;
use tokio::sync::{broadcast, mpsc, watch};
use tokio::task::JoinHandle;

use crate::controller::{MapEffect, MapState, MapSyncController};
use crate::error::SessionError;
use crate::surface::MapSurface;
use crate::viewport::MapViewport;

const NOTIFY_CAPACITY: usize = 64;

/// What a map session tells its host.
#[derive(Debug, Clone, PartialEq)]
pub enum MapNotification {
    StateChanged(MapState),
    ParksUpdated(Vec<Park>),
    /// The host should open the details view for this park.
    ShowParkDetails(Park),
    SearchFailed(String),
}

#[derive(Debug)]
enum MapCommand {
    SurfaceLaidOut,
    CameraSettled(MapViewport),
    ParkSelected(usize),
    MarkerTapped(String),
    InfoWindowTapped(String),
    RecenterRequested,
}

#[derive(Debug)]
enum SessionCompletion {
    ParksFetched {
        generation: Generation,
        outcome: Result<Vec<Park>, String>,
    },
    RetryFired {
        generation: Generation,
    },
}

/// Handle to a running map session. Cheap to clone; the session stops when
/// the last handle is dropped.
#[derive(Debug, Clone)]
pub struct MapSessionHandle {
    commands: mpsc::UnboundedSender<MapCommand>,
    state: watch::Receiver<MapState>,
    parks: watch::Receiver<Vec<Park>>,
    notifications: broadcast::Sender<MapNotification>,
}

impl MapSessionHandle {
    fn send(&self, command: MapCommand) -> Result<(), SessionError> {
        self.commands.send(command).map_err(|_| SessionError::Closed)
    }

    /// # Errors
    ///
    /// Returns [`SessionError::Closed`] if the session task has exited. The
    /// same applies to every other event method on this handle.
    pub fn surface_laid_out(&self) -> Result<(), SessionError> {
        self.send(MapCommand::SurfaceLaidOut)
    }

    #[allow(clippy::missing_errors_doc)]
    pub fn camera_settled(&self, viewport: MapViewport) -> Result<(), SessionError> {
        self.send(MapCommand::CameraSettled(viewport))
    }

    #[allow(clippy::missing_errors_doc)]
    pub fn select_park(&self, index: usize) -> Result<(), SessionError> {
        self.send(MapCommand::ParkSelected(index))
    }

    #[allow(clippy::missing_errors_doc)]
    pub fn tap_marker(&self, park_id: &str) -> Result<(), SessionError> {
        self.send(MapCommand::MarkerTapped(park_id.to_owned()))
    }

    #[allow(clippy::missing_errors_doc)]
    pub fn tap_info_window(&self, park_id: &str) -> Result<(), SessionError> {
        self.send(MapCommand::InfoWindowTapped(park_id.to_owned()))
    }

    #[allow(clippy::missing_errors_doc)]
    pub fn recenter(&self) -> Result<(), SessionError> {
        self.send(MapCommand::RecenterRequested)
    }

    #[must_use]
    pub fn state(&self) -> MapState {
        *self.state.borrow()
    }

    #[must_use]
    pub fn states(&self) -> watch::Receiver<MapState> {
        self.state.clone()
    }

    #[must_use]
    pub fn parks(&self) -> Vec<Park> {
        self.parks.borrow().clone()
    }

    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<MapNotification> {
        self.notifications.subscribe()
    }

    /// Waits until the session reaches `state`.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Closed`] if the session exits first.
    pub async fn wait_for_state(&self, state: MapState) -> Result<(), SessionError> {
        let mut states = self.state.clone();
        states
            .wait_for(|current| *current == state)
            .await
            .map(|_| ())
            .map_err(|_| SessionError::Closed)
    }
}

struct MapSession<P, M> {
    controller: MapSyncController,
    search: Arc<P>,
    surface: M,
    completions: mpsc::UnboundedSender<SessionCompletion>,
    state: watch::Sender<MapState>,
    parks: watch::Sender<Vec<Park>>,
    notifications: broadcast::Sender<MapNotification>,
}

/// Starts a map session on the current tokio runtime.
///
/// `locations` is normally the freshness tracker's location watch; every
/// new value is fed to the controller.
pub fn spawn_map_session<P, M>(
    search: Arc<P>,
    surface: M,
    locations: watch::Receiver<Option<Location>>,
    tuning: MapTuning,
) -> MapSessionHandle
where
    P: NearbySearch + 'static,
    M: MapSurface + 'static,
{
    let (commands_tx, commands_rx) = mpsc::unbounded_channel();
    let (completions_tx, completions_rx) = mpsc::unbounded_channel();
    let (state_tx, state_rx) = watch::channel(MapState::Created);
    let (parks_tx, parks_rx) = watch::channel(Vec::new());
    let (notify_tx, _) = broadcast::channel(NOTIFY_CAPACITY);

    let session = MapSession {
        controller: MapSyncController::new(tuning),
        search,
        surface,
        completions: completions_tx,
        state: state_tx,
        parks: parks_tx,
        notifications: notify_tx.clone(),
    };
    tokio::spawn(session.run(commands_rx, completions_rx, locations));

    MapSessionHandle {
        commands: commands_tx,
        state: state_rx,
        parks: parks_rx,
        notifications: notify_tx,
    }
}

/// Feeds settles reported by a surface (such as
/// [`HeadlessMap`](crate::HeadlessMap)) into the session until either side
/// goes away. Does not keep the session alive.
pub fn forward_settles(
    mut settles: mpsc::UnboundedReceiver<MapViewport>,
    handle: &MapSessionHandle,
) -> JoinHandle<()> {
    let commands = handle.commands.downgrade();
    tokio::spawn(async move {
        while let Some(viewport) = settles.recv().await {
            let Some(commands) = commands.upgrade() else {
                break;
            };
            if commands.send(MapCommand::CameraSettled(viewport)).is_err() {
                break;
            }
        }
    })
}

impl<P, M> MapSession<P, M>
where
    P: NearbySearch + 'static,
    M: MapSurface + 'static,
{
    async fn run(
        mut self,
        mut commands: mpsc::UnboundedReceiver<MapCommand>,
        mut completions: mpsc::UnboundedReceiver<SessionCompletion>,
        mut locations: watch::Receiver<Option<Location>>,
    ) {
        tracing::debug!("map session started");

        let initial = locations.borrow_and_update().clone();
        if let Some(location) = initial {
            let effects = self.controller.location_updated(location);
            self.execute(effects);
        }
        let mut following_locations = true;

        loop {
            let effects = tokio::select! {
                biased;

                command = commands.recv() => match command {
                    Some(command) => self.apply(command),
                    None => break,
                },

                Some(completion) = completions.recv() => match completion {
                    SessionCompletion::ParksFetched { generation, outcome } => {
                        self.controller.parks_fetched(generation, outcome)
                    }
                    SessionCompletion::RetryFired { generation } => {
                        self.controller.retry_fired(generation)
                    }
                },

                changed = locations.changed(), if following_locations => {
                    if changed.is_err() {
                        tracing::debug!("location tracker stopped; keeping last reference");
                        following_locations = false;
                        continue;
                    }
                    let latest = locations.borrow_and_update().clone();
                    match latest {
                        Some(location) => self.controller.location_updated(location),
                        None => Vec::new(),
                    }
                }
            };
            self.execute(effects);
        }
        tracing::debug!(state = %self.controller.state(), "map session stopped");
    }

    fn apply(&mut self, command: MapCommand) -> Vec<MapEffect> {
        match command {
            MapCommand::SurfaceLaidOut => self.controller.surface_laid_out(),
            MapCommand::CameraSettled(viewport) => self.controller.camera_settled(viewport),
            MapCommand::ParkSelected(index) => self.controller.park_selected(index),
            MapCommand::MarkerTapped(id) => self.controller.marker_tapped(&id),
            MapCommand::InfoWindowTapped(id) => self.controller.info_window_tapped(&id),
            MapCommand::RecenterRequested => self.controller.recenter_requested(),
        }
    }

    fn execute(&mut self, effects: Vec<MapEffect>) {
        for effect in effects {
            match effect {
                MapEffect::SetCamera(target) => self.surface.set_camera(target),
                MapEffect::AnimateCamera(target) => self.surface.animate_camera(target),
                MapEffect::EnableLocationTracking { min_zoom, max_zoom } => {
                    self.surface.enable_location_tracking(min_zoom, max_zoom);
                }
                MapEffect::RenderMarkers { parks, selected } => {
                    self.surface.render_markers(&parks, selected.as_deref());
                }
                MapEffect::SelectMarker(id) => self.surface.select_marker(&id),
                MapEffect::SearchParks {
                    generation,
                    info,
                    reference,
                } => {
                    let search = Arc::clone(&self.search);
                    let completions = self.completions.clone();
                    tokio::spawn(async move {
                        let outcome = search.search_parks(info, reference).await.map_err(|e| {
                            tracing::warn!(error = %e, %generation, "park search failed");
                            e.to_string()
                        });
                        let _ = completions.send(SessionCompletion::ParksFetched {
                            generation,
                            outcome,
                        });
                    });
                }
                MapEffect::ScheduleRetry { generation, after } => {
                    self.schedule_retry(generation, after);
                }
                MapEffect::ParksUpdated(parks) => {
                    self.parks.send_replace(parks.clone());
                    self.notify(MapNotification::ParksUpdated(parks));
                }
                MapEffect::ShowParkDetails(park) => {
                    self.notify(MapNotification::ShowParkDetails(park));
                }
                MapEffect::SearchFailed(reason) => {
                    self.notify(MapNotification::SearchFailed(reason));
                }
                MapEffect::Notify(state) => {
                    self.state.send_replace(state);
                    self.notify(MapNotification::StateChanged(state));
                }
            }
        }
    }

    fn schedule_retry(&self, generation: Generation, after: Duration) {
        let completions = self.completions.clone();
        tokio::spawn(async move {
            tokio::time::sleep(after).await;
            let _ = completions.send(SessionCompletion::RetryFired { generation });
        });
    }

    fn notify(&self, notification: MapNotification) {
        // No subscribers is fine.
        let _ = self.notifications.send(notification);
    }
}
