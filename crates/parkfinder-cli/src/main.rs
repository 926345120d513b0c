mod places;
mod simulate;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "parkfinder")]
#[command(about = "Nearby park finder command line interface")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Search for parks around a coordinate
    Search {
        #[arg(long, allow_hyphen_values = true)]
        lat: f64,
        #[arg(long, allow_hyphen_values = true)]
        lng: f64,
        /// Search radius in meters
        #[arg(long, default_value = "1500")]
        radius: u32,
        /// Print the parsed parks as JSON
        #[arg(long)]
        json: bool,
    },
    /// Look up extended information for one place id
    Details {
        place_id: String,
    },
    /// Download a park photo
    Photo {
        reference: String,
        #[arg(long, default_value = "400")]
        max_width: u32,
        /// File to write the image to
        #[arg(long)]
        out: PathBuf,
    },
    /// Run location verification, freshness tracking and the map session
    /// against a headless map
    Simulate {
        #[arg(long, allow_hyphen_values = true)]
        lat: f64,
        #[arg(long, allow_hyphen_values = true)]
        lng: f64,
        /// Simulate a user who denies location access
        #[arg(long)]
        deny: bool,
        /// Pan the map east by this many meters once parks are shown
        #[arg(long)]
        pan_meters: Option<f64>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = parkfinder_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Search {
            lat,
            lng,
            radius,
            json,
        } => places::run_search(&config, lat, lng, radius, json).await,
        Commands::Details { place_id } => places::run_details(&config, &place_id).await,
        Commands::Photo {
            reference,
            max_width,
            out,
        } => places::run_photo(&config, &reference, max_width, &out).await,
        Commands::Simulate {
            lat,
            lng,
            deny,
            pan_meters,
        } => simulate::run_simulate(&config, lat, lng, deny, pan_meters).await,
    }
}
