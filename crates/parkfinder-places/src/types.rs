//! Places API response types.
//!
//! Every JSON endpoint wraps its payload in a `{"status": "OK", ...}`
//! envelope. Search results stay as raw `serde_json::Value` records because
//! each one is validated individually by [`crate::parse`].

use serde::Deserialize;

pub const STATUS_OK: &str = "OK";
pub const STATUS_ZERO_RESULTS: &str = "ZERO_RESULTS";

// ---------------------------------------------------------------------------
// nearbysearch
// ---------------------------------------------------------------------------

/// Envelope of the `nearbysearch/json` endpoint.
#[derive(Debug, Deserialize)]
pub struct NearbySearchResponse {
    pub status: String,
    #[serde(default)]
    pub results: Vec<serde_json::Value>,
    #[serde(default)]
    pub error_message: Option<String>,
    #[serde(default)]
    pub next_page_token: Option<String>,
}

// ---------------------------------------------------------------------------
// details
// ---------------------------------------------------------------------------

/// Envelope of the `details/json` endpoint.
#[derive(Debug, Deserialize)]
pub struct PlaceDetailsResponse {
    pub status: String,
    #[serde(default)]
    pub result: Option<PlaceDetailsResult>,
    #[serde(default)]
    pub html_attributions: Vec<String>,
    #[serde(default)]
    pub error_message: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PlaceDetailsResult {
    #[serde(default)]
    pub place_id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub formatted_address: Option<String>,
    #[serde(default)]
    pub formatted_phone_number: Option<String>,
    #[serde(default)]
    pub international_phone_number: Option<String>,
    #[serde(default)]
    pub website: Option<String>,
    #[serde(default)]
    pub opening_hours: Option<OpeningHours>,
}

#[derive(Debug, Deserialize)]
pub struct OpeningHours {
    #[serde(default)]
    pub open_now: Option<bool>,
}

// ---------------------------------------------------------------------------
// photo
// ---------------------------------------------------------------------------

/// Image bytes returned by the photo endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParkPhoto {
    pub content_type: Option<String>,
    pub data: Vec<u8>,
}
