use std::time::Duration;

/// Timing of the location state machines.
#[derive(Debug, Clone, PartialEq)]
pub struct LocationTuning {
    /// Age after which the tracked location is re-acquired.
    pub freshness_window: Duration,
    /// Idle time in the tracker's error state before trying again.
    pub freshness_retry: Duration,
    /// Timeout handed to every location request.
    pub request_timeout: Duration,
    /// Dwell in `SearchingForLocation` before the "still searching" state.
    pub verification_extend: Duration,
    /// Idle time in the verification error state before searching again.
    pub verification_idle: Duration,
}

impl Default for LocationTuning {
    fn default() -> Self {
        Self {
            freshness_window: Duration::from_secs(30),
            freshness_retry: Duration::from_secs(10),
            request_timeout: Duration::from_secs(15),
            verification_extend: Duration::from_millis(200),
            verification_idle: Duration::from_secs(5),
        }
    }
}

/// Thresholds of the map/park synchronisation.
#[derive(Debug, Clone, PartialEq)]
pub struct MapTuning {
    /// Overshoot applied to the visible radius when searching.
    pub radius_multiplier: f64,
    /// Fraction of the last search radius the view centre may drift before re-querying.
    pub requery_distance_fraction: f64,
    /// Zoom change that forces a re-query.
    pub requery_zoom_delta: f32,
    /// Wait before retrying a park search that failed.
    pub search_retry: Duration,
}

impl Default for MapTuning {
    fn default() -> Self {
        Self {
            radius_multiplier: 1.3,
            requery_distance_fraction: 0.75,
            requery_zoom_delta: 0.7,
            search_retry: Duration::from_secs(10),
        }
    }
}

#[derive(Clone)]
pub struct AppConfig {
    pub log_level: String,
    pub places_api_key: Option<String>,
    pub places_base_url: String,
    pub http_timeout_secs: u64,
    pub http_max_retries: u32,
    pub http_backoff_base_ms: u64,
    pub location: LocationTuning,
    pub map: MapTuning,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("log_level", &self.log_level)
            .field(
                "places_api_key",
                &self.places_api_key.as_ref().map(|_| "[redacted]"),
            )
            .field("places_base_url", &self.places_base_url)
            .field("http_timeout_secs", &self.http_timeout_secs)
            .field("http_max_retries", &self.http_max_retries)
            .field("http_backoff_base_ms", &self.http_backoff_base_ms)
            .field("location", &self.location)
            .field("map", &self.map)
            .finish()
    }
}
