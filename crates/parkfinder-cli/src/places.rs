//! Places API command handlers for the CLI.

use std::path::Path;

use parkfinder_core::{
    AppConfig, Coordinate, InformationKind, Location, OpenStatus, ParkSearchInformation,
};
use parkfinder_places::{NearbySearch, PlacesClient};

/// Builds a places client from configuration.
///
/// # Errors
///
/// Returns an error if `PARKFINDER_PLACES_API_KEY` is not set or the client
/// cannot be built.
pub(crate) fn build_client(config: &AppConfig) -> anyhow::Result<PlacesClient> {
    let api_key = config.places_api_key.as_deref().ok_or_else(|| {
        anyhow::anyhow!("PARKFINDER_PLACES_API_KEY is not set; cannot reach the places API")
    })?;

    PlacesClient::with_base_url(
        api_key,
        config.http_timeout_secs,
        config.http_max_retries,
        config.http_backoff_base_ms,
        &config.places_base_url,
    )
    .map_err(|e| anyhow::anyhow!("failed to build places client: {e}"))
}

/// Lists parks within `radius` meters of the coordinate, nearest first.
///
/// # Errors
///
/// Returns an error if the client cannot be built or the search fails.
pub(crate) async fn run_search(
    config: &AppConfig,
    lat: f64,
    lng: f64,
    radius: u32,
    json: bool,
) -> anyhow::Result<()> {
    let client = build_client(config)?;
    let center = Coordinate::new(lat, lng);
    let info = ParkSearchInformation {
        center,
        search_radius_meters: radius,
        map_zoom: 0.0,
    };

    let mut parks = client.search_parks(info, Location::new(lat, lng)).await?;
    parks.sort_by(|a, b| a.distance_miles.total_cmp(&b.distance_miles));

    if json {
        println!("{}", serde_json::to_string_pretty(&parks)?);
        return Ok(());
    }

    if parks.is_empty() {
        println!("No parks within {radius} m of {lat},{lng}.");
        return Ok(());
    }

    println!("{:<40} {:>8}  {:<28} VICINITY", "NAME", "MILES", "ID");
    println!("{}", "-".repeat(100));
    for park in &parks {
        println!(
            "{:<40} {:>8.2}  {:<28} {}",
            park.name, park.distance_miles, park.id, park.vicinity
        );
    }
    println!("\n{} park(s)", parks.len());
    Ok(())
}

/// Prints every piece of extended information the places API has for a park.
///
/// # Errors
///
/// Returns an error if the client cannot be built or the lookup fails.
pub(crate) async fn run_details(config: &AppConfig, place_id: &str) -> anyhow::Result<()> {
    let client = build_client(config)?;
    let details = client.lookup_details(place_id).await?;

    let kinds = details.information_kinds();
    if kinds.is_empty() {
        println!("No details available for {place_id}.");
        return Ok(());
    }

    for kind in kinds {
        match kind {
            InformationKind::Name => {
                println!("Name:     {}", details.name.as_deref().unwrap_or_default());
            }
            InformationKind::Open => println!("Open:     {}", open_label(details.open_now)),
            InformationKind::Address => println!(
                "Address:  {}",
                details.formatted_address.as_deref().unwrap_or_default()
            ),
            InformationKind::Phone => {
                let phone = details.phone_number.as_deref().unwrap_or_default();
                match details.dial_digits() {
                    Some(digits) => println!("Phone:    {phone} (tel:{digits})"),
                    None => println!("Phone:    {phone}"),
                }
            }
            InformationKind::Website => {
                println!("Website:  {}", details.website.as_deref().unwrap_or_default());
            }
            InformationKind::Attributions => {
                for attribution in details.attributions.iter().filter(|a| !a.is_empty()) {
                    println!("Credit:   {attribution}");
                }
            }
        }
    }
    Ok(())
}

fn open_label(status: OpenStatus) -> &'static str {
    match status {
        OpenStatus::Yes => "open now",
        OpenStatus::No => "closed",
        OpenStatus::Unknown => "unknown",
    }
}

/// Downloads one park photo to `out`.
///
/// # Errors
///
/// Returns an error if the client cannot be built, the download fails, or
/// the file cannot be written.
pub(crate) async fn run_photo(
    config: &AppConfig,
    reference: &str,
    max_width: u32,
    out: &Path,
) -> anyhow::Result<()> {
    let client = build_client(config)?;
    let photo = client.fetch_photo(reference, max_width).await?;

    tokio::fs::write(out, &photo.data)
        .await
        .map_err(|e| anyhow::anyhow!("failed to write {}: {e}", out.display()))?;

    println!(
        "wrote {} bytes ({}) to {}",
        photo.data.len(),
        photo.content_type.as_deref().unwrap_or("unknown type"),
        out.display()
    );
    Ok(())
}
