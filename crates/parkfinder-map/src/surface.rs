//! The rendering surface the map session drives.

use std::sync::{Arc, Mutex};

use parkfinder_core::Park;
use tokio::sync::mpsc;

use crate::viewport::{CameraTarget, MapViewport};

/// A map view that can be moved and decorated with park markers.
///
/// Calls are fire-and-forget. When a camera move finishes, the host reports
/// the resulting viewport through
/// [`MapSessionHandle::camera_settled`](crate::MapSessionHandle::camera_settled).
pub trait MapSurface: Send {
    /// Jumps to `target` without animating.
    fn set_camera(&mut self, target: CameraTarget);
    fn animate_camera(&mut self, target: CameraTarget);
    /// Shows the device location and limits zooming to `[min_zoom, max_zoom]`.
    fn enable_location_tracking(&mut self, min_zoom: f32, max_zoom: f32);
    /// Replaces all markers. `selected` keeps its marker highlighted.
    fn render_markers(&mut self, parks: &[Park], selected: Option<&str>);
    fn select_marker(&mut self, park_id: &str);
}

/// A surface call recorded by [`HeadlessMap`].
#[derive(Debug, Clone, PartialEq)]
pub enum SurfaceCall {
    SetCamera(CameraTarget),
    AnimateCamera(CameraTarget),
    EnableLocationTracking { min_zoom: f32, max_zoom: f32 },
    RenderMarkers {
        park_ids: Vec<String>,
        selected: Option<String>,
    },
    SelectMarker(String),
}

/// Shared record of the calls a [`HeadlessMap`] received.
#[derive(Debug, Clone, Default)]
pub struct SurfaceLog(Arc<Mutex<Vec<SurfaceCall>>>);

impl SurfaceLog {
    #[must_use]
    pub fn calls(&self) -> Vec<SurfaceCall> {
        self.lock().clone()
    }

    #[must_use]
    pub fn animation_count(&self) -> usize {
        self.lock()
            .iter()
            .filter(|c| matches!(c, SurfaceCall::AnimateCamera(_)))
            .count()
    }

    fn push(&self, call: SurfaceCall) {
        self.lock().push(call);
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<SurfaceCall>> {
        self.0.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

/// A surface with no display. Animations finish instantly and their settled
/// viewports are sent on the channel returned by [`HeadlessMap::new`].
/// Jumps made with `set_camera` do not report a settle.
#[derive(Debug)]
pub struct HeadlessMap {
    viewport_height_px: f64,
    settles: mpsc::UnboundedSender<MapViewport>,
    log: SurfaceLog,
}

impl HeadlessMap {
    #[must_use]
    pub fn new(viewport_height_px: f64) -> (Self, mpsc::UnboundedReceiver<MapViewport>) {
        let (settles, rx) = mpsc::unbounded_channel();
        let map = Self {
            viewport_height_px,
            settles,
            log: SurfaceLog::default(),
        };
        (map, rx)
    }

    #[must_use]
    pub fn log(&self) -> SurfaceLog {
        self.log.clone()
    }
}

impl MapSurface for HeadlessMap {
    fn set_camera(&mut self, target: CameraTarget) {
        self.log.push(SurfaceCall::SetCamera(target));
    }

    fn animate_camera(&mut self, target: CameraTarget) {
        self.log.push(SurfaceCall::AnimateCamera(target));
        let viewport = MapViewport::from_camera(target, self.viewport_height_px);
        if self.settles.send(viewport).is_err() {
            tracing::debug!("no one is listening for settles");
        }
    }

    fn enable_location_tracking(&mut self, min_zoom: f32, max_zoom: f32) {
        self.log
            .push(SurfaceCall::EnableLocationTracking { min_zoom, max_zoom });
    }

    fn render_markers(&mut self, parks: &[Park], selected: Option<&str>) {
        self.log.push(SurfaceCall::RenderMarkers {
            park_ids: parks.iter().map(|p| p.id.clone()).collect(),
            selected: selected.map(str::to_owned),
        });
    }

    fn select_marker(&mut self, park_id: &str) {
        self.log.push(SurfaceCall::SelectMarker(park_id.to_owned()));
    }
}
