//! Keeps the park set in step with what the map shows.
//!
//! [`MapSyncController`] is sans-IO: hosts feed it surface events and search
//! completions, and carry out the [`MapEffect`]s it returns. Camera moves the
//! controller starts itself are tracked with [`AnimationFlags`] so that
//! their settle events are attributed to the right cause instead of being
//! mistaken for user pans.

use std::time::Duration;

use parkfinder_core::{Generation, Location, MapTuning, Park, ParkSearchInformation};

use crate::viewport::{
    requires_new_search, CameraTarget, MapViewport, CENTERED_THRESHOLD_METERS, DEFAULT_CENTER,
    INITIAL_ZOOM, MAX_ZOOM, MIN_ZOOM, SELECTION_MIN_ZOOM,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MapState {
    Created,
    Initialized,
    InitializedWithFirstLocation,
    ParksNeedUpdating,
    Updated,
    /// The last search failed; a retry timer or the next settle searches again.
    ParksSearchFailed,
}

impl std::fmt::Display for MapState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            MapState::Created => "created",
            MapState::Initialized => "initialized",
            MapState::InitializedWithFirstLocation => "initialized_with_first_location",
            MapState::ParksNeedUpdating => "parks_need_updating",
            MapState::Updated => "updated",
            MapState::ParksSearchFailed => "parks_search_failed",
        };
        f.write_str(name)
    }
}

/// Why the camera is currently moving, if the controller moved it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Animation {
    InitialLocation,
    ParkSelection,
    MarkerTap,
    CurrentLocation,
}

/// Outstanding controller-initiated camera moves. Each settle consumes one,
/// highest priority first.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AnimationFlags {
    initial_location: bool,
    park_selection: bool,
    marker_tap: bool,
    current_location: bool,
}

impl AnimationFlags {
    pub fn set(&mut self, animation: Animation) {
        *self.slot(animation) = true;
    }

    #[must_use]
    pub fn any(&self) -> bool {
        self.initial_location || self.park_selection || self.marker_tap || self.current_location
    }

    /// Clears and returns the highest-priority pending animation.
    pub fn take(&mut self) -> Option<Animation> {
        [
            Animation::InitialLocation,
            Animation::ParkSelection,
            Animation::MarkerTap,
            Animation::CurrentLocation,
        ]
        .into_iter()
        .find(|animation| std::mem::take(self.slot(*animation)))
    }

    fn slot(&mut self, animation: Animation) -> &mut bool {
        match animation {
            Animation::InitialLocation => &mut self.initial_location,
            Animation::ParkSelection => &mut self.park_selection,
            Animation::MarkerTap => &mut self.marker_tap,
            Animation::CurrentLocation => &mut self.current_location,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum MapEffect {
    SetCamera(CameraTarget),
    AnimateCamera(CameraTarget),
    EnableLocationTracking { min_zoom: f32, max_zoom: f32 },
    RenderMarkers {
        parks: Vec<Park>,
        selected: Option<String>,
    },
    SelectMarker(String),
    SearchParks {
        generation: Generation,
        info: ParkSearchInformation,
        reference: Location,
    },
    ScheduleRetry {
        generation: Generation,
        after: Duration,
    },
    ParksUpdated(Vec<Park>),
    ShowParkDetails(Park),
    SearchFailed(String),
    Notify(MapState),
}

#[derive(Debug)]
pub struct MapSyncController {
    state: MapState,
    tuning: MapTuning,
    viewport: Option<MapViewport>,
    reference: Option<Location>,
    parks: Vec<Park>,
    selected: Option<String>,
    last_search: Option<ParkSearchInformation>,
    pending_search: Option<ParkSearchInformation>,
    search: Generation,
    retry: Generation,
    animations: AnimationFlags,
}

impl MapSyncController {
    #[must_use]
    pub fn new(tuning: MapTuning) -> Self {
        Self {
            state: MapState::Created,
            tuning,
            viewport: None,
            reference: None,
            parks: Vec::new(),
            selected: None,
            last_search: None,
            pending_search: None,
            search: Generation::default(),
            retry: Generation::default(),
            animations: AnimationFlags::default(),
        }
    }

    #[must_use]
    pub fn state(&self) -> MapState {
        self.state
    }

    #[must_use]
    pub fn parks(&self) -> &[Park] {
        &self.parks
    }

    #[must_use]
    pub fn selected_park(&self) -> Option<&Park> {
        let id = self.selected.as_deref()?;
        self.parks.iter().find(|p| p.id == id)
    }

    /// Parameters of the search whose results are currently shown.
    #[must_use]
    pub fn last_search(&self) -> Option<&ParkSearchInformation> {
        self.last_search.as_ref()
    }

    #[must_use]
    pub fn reference_location(&self) -> Option<&Location> {
        self.reference.as_ref()
    }

    #[must_use]
    pub fn animations(&self) -> AnimationFlags {
        self.animations
    }

    /// The surface has its final size; show the continental default.
    pub fn surface_laid_out(&mut self) -> Vec<MapEffect> {
        let mut effects = Vec::new();
        if self.state != MapState::Created {
            return effects;
        }
        effects.push(MapEffect::SetCamera(CameraTarget::new(
            DEFAULT_CENTER,
            INITIAL_ZOOM,
        )));
        self.enter(MapState::Initialized, &mut effects);
        effects
    }

    /// A new current location. The first one after layout flies the map to
    /// it; later ones only move the reference point.
    pub fn location_updated(&mut self, location: Location) -> Vec<MapEffect> {
        let mut effects = Vec::new();
        tracing::debug!(location = %location.coordinate, state = %self.state, "map reference location updated");
        self.reference = Some(location);
        if self.state == MapState::Initialized {
            self.enter(MapState::InitializedWithFirstLocation, &mut effects);
        }
        effects
    }

    /// The camera came to rest.
    pub fn camera_settled(&mut self, viewport: MapViewport) -> Vec<MapEffect> {
        let mut effects = Vec::new();
        self.viewport = Some(viewport);

        if let Some(animation) = self.animations.take() {
            tracing::debug!(?animation, state = %self.state, "animation settled");
            match (animation, self.state) {
                (Animation::InitialLocation, MapState::InitializedWithFirstLocation)
                | (
                    Animation::ParkSelection | Animation::MarkerTap | Animation::CurrentLocation,
                    MapState::Updated,
                )
                | (_, MapState::ParksSearchFailed) => {
                    self.enter(MapState::ParksNeedUpdating, &mut effects);
                }
                _ => {}
            }
            return effects;
        }

        match self.state {
            MapState::Updated => {
                let needs_search = self
                    .last_search
                    .as_ref()
                    .is_some_and(|last| requires_new_search(last, &viewport, &self.tuning));
                if needs_search {
                    self.enter(MapState::ParksNeedUpdating, &mut effects);
                }
            }
            MapState::ParksSearchFailed => self.enter(MapState::ParksNeedUpdating, &mut effects),
            _ => {}
        }
        effects
    }

    /// A park was picked from the list. Picking the park that is already
    /// selected and centred opens its details instead of moving the map.
    pub fn park_selected(&mut self, index: usize) -> Vec<MapEffect> {
        let mut effects = Vec::new();
        let Some(park) = self.parks.get(index).cloned() else {
            tracing::debug!(index, parks = self.parks.len(), "park index out of range");
            return effects;
        };

        if self.is_selected_and_centered(&park) {
            effects.push(MapEffect::ShowParkDetails(park));
            return effects;
        }

        let zoom = self.current_zoom().max(SELECTION_MIN_ZOOM);
        self.select(&park, &mut effects);
        self.animations.set(Animation::ParkSelection);
        effects.push(MapEffect::AnimateCamera(CameraTarget::new(
            park.coordinate,
            zoom,
        )));
        effects
    }

    /// A marker was tapped on the map; select it and centre on it.
    pub fn marker_tapped(&mut self, park_id: &str) -> Vec<MapEffect> {
        let mut effects = Vec::new();
        let Some(park) = self.park_by_id(park_id) else {
            tracing::debug!(park_id, "tapped marker has no park");
            return effects;
        };
        let zoom = self.current_zoom();
        self.select(&park, &mut effects);
        self.animations.set(Animation::MarkerTap);
        effects.push(MapEffect::AnimateCamera(CameraTarget::new(
            park.coordinate,
            zoom,
        )));
        effects
    }

    pub fn info_window_tapped(&mut self, park_id: &str) -> Vec<MapEffect> {
        match self.park_by_id(park_id) {
            Some(park) => vec![MapEffect::ShowParkDetails(park)],
            None => Vec::new(),
        }
    }

    /// Flies back to the reference location at the current zoom.
    pub fn recenter_requested(&mut self) -> Vec<MapEffect> {
        let Some(reference) = &self.reference else {
            return Vec::new();
        };
        let target = CameraTarget::new(reference.coordinate, self.current_zoom());
        self.animations.set(Animation::CurrentLocation);
        vec![MapEffect::AnimateCamera(target)]
    }

    /// Applies the outcome of the search issued under `generation`.
    pub fn parks_fetched(
        &mut self,
        generation: Generation,
        outcome: Result<Vec<Park>, String>,
    ) -> Vec<MapEffect> {
        let mut effects = Vec::new();
        if self.state != MapState::ParksNeedUpdating || generation != self.search {
            tracing::debug!(%generation, current = %self.search, state = %self.state, "ignoring park search result");
            return effects;
        }

        match outcome {
            Ok(fetched) => {
                self.parks = merge_parks(self.selected_park(), fetched);
                self.last_search = self.pending_search.take();
                effects.push(MapEffect::RenderMarkers {
                    parks: self.parks.clone(),
                    selected: self.selected.clone(),
                });
                effects.push(MapEffect::ParksUpdated(self.parks.clone()));
                self.enter(MapState::Updated, &mut effects);
            }
            Err(reason) => {
                self.pending_search = None;
                effects.push(MapEffect::SearchFailed(reason));
                self.enter(MapState::ParksSearchFailed, &mut effects);
            }
        }
        effects
    }

    pub fn retry_fired(&mut self, generation: Generation) -> Vec<MapEffect> {
        let mut effects = Vec::new();
        if self.state == MapState::ParksSearchFailed && generation == self.retry {
            self.enter(MapState::ParksNeedUpdating, &mut effects);
        }
        effects
    }

    fn enter(&mut self, state: MapState, effects: &mut Vec<MapEffect>) {
        tracing::info!(from = %self.state, to = %state, "map transition");
        self.state = state;
        effects.push(MapEffect::Notify(state));

        match state {
            MapState::InitializedWithFirstLocation => {
                let Some(reference) = &self.reference else {
                    return;
                };
                let target = CameraTarget::new(reference.coordinate, MIN_ZOOM);
                effects.push(MapEffect::EnableLocationTracking {
                    min_zoom: MIN_ZOOM,
                    max_zoom: MAX_ZOOM,
                });
                self.animations.set(Animation::InitialLocation);
                effects.push(MapEffect::AnimateCamera(target));
            }
            MapState::ParksNeedUpdating => self.issue_search(effects),
            MapState::ParksSearchFailed => effects.push(MapEffect::ScheduleRetry {
                generation: self.retry.bump(),
                after: self.tuning.search_retry,
            }),
            MapState::Initialized => {
                // The location may have arrived before layout finished.
                if self.reference.is_some() {
                    self.enter(MapState::InitializedWithFirstLocation, effects);
                }
            }
            MapState::Created | MapState::Updated => {}
        }
    }

    fn issue_search(&mut self, effects: &mut Vec<MapEffect>) {
        let (Some(viewport), Some(reference)) = (self.viewport, self.reference.clone()) else {
            tracing::warn!("cannot search for parks without a viewport and a location");
            effects.push(MapEffect::SearchFailed(
                "map has no settled viewport or location yet".to_owned(),
            ));
            self.enter(MapState::ParksSearchFailed, effects);
            return;
        };
        let info = ParkSearchInformation {
            center: viewport.center,
            search_radius_meters: viewport.search_radius_meters(self.tuning.radius_multiplier),
            map_zoom: viewport.zoom,
        };
        self.pending_search = Some(info);
        effects.push(MapEffect::SearchParks {
            generation: self.search.bump(),
            info,
            reference,
        });
    }

    fn select(&mut self, park: &Park, effects: &mut Vec<MapEffect>) {
        self.selected = Some(park.id.clone());
        effects.push(MapEffect::SelectMarker(park.id.clone()));
    }

    fn is_selected_and_centered(&self, park: &Park) -> bool {
        let Some(viewport) = &self.viewport else {
            return false;
        };
        self.selected.as_deref() == Some(park.id.as_str())
            && viewport.center.distance_to(&park.coordinate) < CENTERED_THRESHOLD_METERS
    }

    fn park_by_id(&self, park_id: &str) -> Option<Park> {
        self.parks.iter().find(|p| p.id == park_id).cloned()
    }

    fn current_zoom(&self) -> f32 {
        self.viewport.map_or(INITIAL_ZOOM, |v| v.zoom)
    }
}

/// Replaces the park set with `fetched`, keeping `selected` first and not
/// repeating it.
#[must_use]
pub fn merge_parks(selected: Option<&Park>, fetched: Vec<Park>) -> Vec<Park> {
    let Some(selected) = selected else {
        return fetched;
    };
    let mut merged = Vec::with_capacity(fetched.len() + 1);
    merged.push(selected.clone());
    merged.extend(fetched.into_iter().filter(|p| p.id != selected.id));
    merged
}

#[cfg(test)]
#[path = "controller_test.rs"]
mod tests;
