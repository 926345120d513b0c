use thiserror::Error;

/// Errors returned by the places clients.
#[derive(Debug, Error)]
pub enum PlacesError {
    /// Network, TLS, or non-2xx HTTP failure from the underlying client.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The places API answered with a non-`OK` status such as
    /// `REQUEST_DENIED` or `INVALID_REQUEST`.
    #[error("places API error {status}: {message}")]
    Api { status: String, message: String },

    /// The response body could not be deserialized into the expected type.
    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid places base URL '{url}': {reason}")]
    InvalidBaseUrl { url: String, reason: String },
}
