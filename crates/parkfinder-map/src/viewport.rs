//! Camera geometry and the re-query rule.

use parkfinder_core::{destination, distance_meters, Coordinate, MapTuning, ParkSearchInformation};

/// Where the map starts: the middle of the continental United States.
pub const DEFAULT_CENTER: Coordinate = Coordinate::new(39.8282, -98.5795);
pub const INITIAL_ZOOM: f32 = 3.0;
pub const MIN_ZOOM: f32 = 11.0;
pub const MAX_ZOOM: f32 = 15.0;
/// Selecting a park zooms in to at least this level.
pub const SELECTION_MIN_ZOOM: f32 = 13.0;
/// A park closer than this to the view centre counts as centred.
pub const CENTERED_THRESHOLD_METERS: f64 = 10.0;

/// Ground resolution of web-mercator zoom 0 at the equator, metres per pixel.
const METERS_PER_PIXEL_AT_ZOOM_0: f64 = 156_543.033_92;

/// A camera position to set or animate to.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraTarget {
    pub center: Coordinate,
    pub zoom: f32,
}

impl CameraTarget {
    #[must_use]
    pub const fn new(center: Coordinate, zoom: f32) -> Self {
        Self { center, zoom }
    }
}

/// The visible region after the camera settles, as reported by the surface.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MapViewport {
    pub center: Coordinate,
    /// Coordinate under the top-centre pixel of the view.
    pub top_center: Coordinate,
    pub zoom: f32,
}

impl MapViewport {
    /// Derives the viewport of a web-mercator camera on a surface
    /// `viewport_height_px` pixels tall.
    #[must_use]
    pub fn from_camera(camera: CameraTarget, viewport_height_px: f64) -> Self {
        let meters_per_px = METERS_PER_PIXEL_AT_ZOOM_0 * camera.center.latitude.to_radians().cos()
            / 2f64.powf(f64::from(camera.zoom));
        let half_height_m = meters_per_px * viewport_height_px / 2.0;
        Self {
            center: camera.center,
            top_center: destination(camera.center, 0.0, half_height_m),
            zoom: camera.zoom,
        }
    }

    /// Distance from the view centre to its top edge.
    #[must_use]
    pub fn visible_radius_meters(&self) -> f64 {
        distance_meters(self.center, self.top_center)
    }

    /// Search radius covering the view plus `multiplier` overshoot, truncated
    /// to whole metres.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn search_radius_meters(&self, multiplier: f64) -> u32 {
        (self.visible_radius_meters() * multiplier).clamp(0.0, f64::from(u32::MAX)) as u32
    }
}

/// Whether a settle at `viewport` has drifted far enough from `last` to need
/// fresh results: moved more than the configured fraction of the last
/// radius, or zoomed by more than the configured delta.
#[must_use]
pub fn requires_new_search(
    last: &ParkSearchInformation,
    viewport: &MapViewport,
    tuning: &MapTuning,
) -> bool {
    let moved = distance_meters(last.center, viewport.center);
    let allowed = f64::from(last.search_radius_meters) * tuning.requery_distance_fraction;
    let zoom_change = (last.map_zoom - viewport.zoom).abs();
    moved > allowed || zoom_change > tuning.requery_zoom_delta
}
