pub mod client;
pub mod error;
pub mod parse;
pub(crate) mod retry;
pub mod search;
pub mod types;

pub use client::PlacesClient;
pub use error::PlacesError;
pub use parse::{parse_park, parse_parks, ParkParseError};
pub use search::NearbySearch;
pub use types::ParkPhoto;
