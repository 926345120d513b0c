//! HTTP client for the places web service.
//!
//! Wraps `reqwest` with API key management, the `{"status": ...}` envelope
//! check, and the bounded transient-error retry from [`crate::retry`]. The
//! nearby-search, photo, and details endpoints share one client and one
//! retry policy; each call builds its own retry counter.

use std::time::Duration;

use parkfinder_core::{Coordinate, OpenStatus, Park, ParkDetails};
use reqwest::{Client, Url};

use crate::error::PlacesError;
use crate::retry::retry_with_backoff;
use crate::types::{
    NearbySearchResponse, ParkPhoto, PlaceDetailsResponse, STATUS_OK, STATUS_ZERO_RESULTS,
};

const DEFAULT_BASE_URL: &str = "https://maps.googleapis.com/maps/api/place/";

/// Place type every nearby search is restricted to.
const PARK_PLACE_TYPE: &str = "park";

/// Client for the places web service.
///
/// Use [`PlacesClient::new`] for production or [`PlacesClient::with_base_url`]
/// to point at a mock server in tests.
pub struct PlacesClient {
    client: Client,
    api_key: String,
    base_url: Url,
    max_retries: u32,
    backoff_base_ms: u64,
}

impl PlacesClient {
    /// Creates a client pointed at the production places API.
    ///
    /// # Errors
    ///
    /// Returns [`PlacesError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed.
    pub fn new(
        api_key: &str,
        timeout_secs: u64,
        max_retries: u32,
        backoff_base_ms: u64,
    ) -> Result<Self, PlacesError> {
        Self::with_base_url(
            api_key,
            timeout_secs,
            max_retries,
            backoff_base_ms,
            DEFAULT_BASE_URL,
        )
    }

    /// Creates a client with a custom base URL (for testing with wiremock).
    ///
    /// # Errors
    ///
    /// Returns [`PlacesError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed, or [`PlacesError::InvalidBaseUrl`] if
    /// `base_url` does not parse.
    pub fn with_base_url(
        api_key: &str,
        timeout_secs: u64,
        max_retries: u32,
        backoff_base_ms: u64,
        base_url: &str,
    ) -> Result<Self, PlacesError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent("parkfinder/0.1 (nearby-parks)")
            .build()?;

        // Exactly one trailing slash so endpoint paths join under the base
        // instead of replacing its last segment.
        let normalised = format!("{}/", base_url.trim_end_matches('/'));
        let base_url = Url::parse(&normalised).map_err(|e| PlacesError::InvalidBaseUrl {
            url: base_url.to_owned(),
            reason: e.to_string(),
        })?;

        Ok(Self {
            client,
            api_key: api_key.to_owned(),
            base_url,
            max_retries,
            backoff_base_ms,
        })
    }

    /// Searches for parks within `radius_meters` of `center`.
    ///
    /// Returns the raw result records; use [`crate::parse_parks`] to turn
    /// them into parks. `ZERO_RESULTS` yields an empty list.
    ///
    /// # Errors
    ///
    /// - [`PlacesError::Api`] if the API returns any other non-`OK` status.
    /// - [`PlacesError::Http`] on non-transient HTTP failure, or on a
    ///   transient one once the retry budget is spent.
    /// - [`PlacesError::Deserialize`] if the body is not the expected shape.
    pub async fn search_nearby(
        &self,
        center: Coordinate,
        radius_meters: u32,
    ) -> Result<Vec<serde_json::Value>, PlacesError> {
        let location = format!("{},{}", center.latitude, center.longitude);
        let radius = radius_meters.to_string();
        let url = self.build_url(
            "nearbysearch/json",
            &[
                ("location", &location),
                ("radius", &radius),
                ("types", PARK_PLACE_TYPE),
            ],
        )?;

        tracing::debug!(%center, radius_meters, "places nearby search");
        let body = self.get_json_with_retry(&url).await?;
        let envelope: NearbySearchResponse =
            serde_json::from_value(body).map_err(|e| PlacesError::Deserialize {
                context: format!("nearbysearch(location={location}, radius={radius})"),
                source: e,
            })?;

        match envelope.status.as_str() {
            STATUS_OK => Ok(envelope.results),
            STATUS_ZERO_RESULTS => Ok(Vec::new()),
            _ => Err(PlacesError::Api {
                message: envelope
                    .error_message
                    .unwrap_or_else(|| "nearby search failed".to_owned()),
                status: envelope.status,
            }),
        }
    }

    /// Downloads the photo identified by `photo_reference`, scaled to at
    /// most `max_width_px` pixels wide.
    ///
    /// # Errors
    ///
    /// Returns [`PlacesError::Http`] on non-transient HTTP failure or once
    /// the retry budget is spent.
    pub async fn fetch_photo(
        &self,
        photo_reference: &str,
        max_width_px: u32,
    ) -> Result<ParkPhoto, PlacesError> {
        let max_width = max_width_px.to_string();
        let url = self.build_url(
            "photo",
            &[("photoreference", photo_reference), ("maxwidth", &max_width)],
        )?;

        tracing::debug!(max_width_px, "places photo fetch");
        retry_with_backoff(self.max_retries, self.backoff_base_ms, || {
            let url = url.clone();
            async move {
                let response = self.client.get(url).send().await?.error_for_status()?;
                let content_type = response
                    .headers()
                    .get(reqwest::header::CONTENT_TYPE)
                    .and_then(|v| v.to_str().ok())
                    .map(str::to_owned);
                let data = response.bytes().await?.to_vec();
                Ok(ParkPhoto { content_type, data })
            }
        })
        .await
    }

    /// Resolves extended information for a place id.
    ///
    /// # Errors
    ///
    /// - [`PlacesError::Api`] if the API returns a non-`OK` status or no result.
    /// - [`PlacesError::Http`] / [`PlacesError::Deserialize`] as for
    ///   [`PlacesClient::search_nearby`].
    pub async fn lookup_details(&self, place_id: &str) -> Result<ParkDetails, PlacesError> {
        let url = self.build_url("details/json", &[("placeid", place_id)])?;

        tracing::debug!(place_id, "places details lookup");
        let body = self.get_json_with_retry(&url).await?;
        let envelope: PlaceDetailsResponse =
            serde_json::from_value(body).map_err(|e| PlacesError::Deserialize {
                context: format!("details(placeid={place_id})"),
                source: e,
            })?;

        if envelope.status != STATUS_OK {
            return Err(PlacesError::Api {
                message: envelope
                    .error_message
                    .unwrap_or_else(|| format!("no details for {place_id}")),
                status: envelope.status,
            });
        }
        let Some(result) = envelope.result else {
            return Err(PlacesError::Api {
                status: envelope.status,
                message: format!("no details for {place_id}"),
            });
        };

        Ok(ParkDetails {
            place_id: result.place_id.unwrap_or_else(|| place_id.to_owned()),
            name: result.name,
            formatted_address: result.formatted_address,
            phone_number: result
                .formatted_phone_number
                .or(result.international_phone_number),
            website: result.website,
            open_now: OpenStatus::from_open_now(result.opening_hours.and_then(|h| h.open_now)),
            attributions: envelope.html_attributions,
            photo_reference: None,
        })
    }

    /// Resolves details for `park`, carrying over its photo reference.
    ///
    /// # Errors
    ///
    /// See [`PlacesClient::lookup_details`].
    pub async fn park_details(&self, park: &Park) -> Result<ParkDetails, PlacesError> {
        let mut details = self.lookup_details(&park.id).await?;
        details.photo_reference.clone_from(&park.photo_reference);
        Ok(details)
    }

    /// Builds an endpoint URL with the API key and percent-encoded parameters.
    fn build_url(&self, endpoint: &str, extra: &[(&str, &str)]) -> Result<Url, PlacesError> {
        let mut url = self
            .base_url
            .join(endpoint)
            .map_err(|e| PlacesError::InvalidBaseUrl {
                url: self.base_url.to_string(),
                reason: e.to_string(),
            })?;
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("key", &self.api_key);
            for (k, v) in extra {
                pairs.append_pair(k, v);
            }
        }
        Ok(url)
    }

    /// GETs `url` as JSON, retrying transient failures.
    async fn get_json_with_retry(&self, url: &Url) -> Result<serde_json::Value, PlacesError> {
        retry_with_backoff(self.max_retries, self.backoff_base_ms, || self.request_json(url))
            .await
    }

    /// Sends a GET request, asserts a 2xx HTTP status, and parses the body as JSON.
    async fn request_json(&self, url: &Url) -> Result<serde_json::Value, PlacesError> {
        let response = self.client.get(url.clone()).send().await?;
        let response = response.error_for_status()?;
        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|e| PlacesError::Deserialize {
            context: url.path().to_owned(),
            source: e,
        })
    }
}

#[cfg(test)]
#[path = "client_test.rs"]
mod tests;
