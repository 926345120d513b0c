pub mod app_config;
pub mod config;
pub mod generation;
pub mod geo;
pub mod location;
pub mod park;

pub use app_config::{AppConfig, LocationTuning, MapTuning};
pub use config::{load_app_config, load_app_config_from_env};
pub use generation::Generation;
pub use geo::{destination, distance_meters, meters_to_miles, Coordinate};
pub use location::{AccuracyTier, Location, LocationError, LocationFailure, LocationResult};
pub use park::{InformationKind, OpenStatus, Park, ParkDetails, ParkSearchInformation};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },
}
