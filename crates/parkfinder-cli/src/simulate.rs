//! `simulate`: the whole park finder flow against a simulated device.
//!
//! A [`StaticLocationSource`] stands in for the device and a
//! [`HeadlessMap`] for the map view. Parks come from the real places API.

use std::sync::Arc;
use std::time::Duration;

use parkfinder_core::{destination, AccuracyTier, AppConfig, Coordinate, LocationFailure, Park};
use parkfinder_location::{
    spawn_freshness_tracker, spawn_verification, StaticLocationSource, VerificationState,
};
use parkfinder_map::viewport::MIN_ZOOM;
use parkfinder_map::{
    forward_settles, spawn_map_session, CameraTarget, HeadlessMap, MapNotification, MapState,
    MapViewport,
};
use tokio::sync::broadcast;

const VIEWPORT_HEIGHT_PX: f64 = 800.0;

/// Extra time allowed on top of the configured location timeout.
const SLACK: Duration = Duration::from_secs(5);

/// Runs verification, then freshness tracking, then a map session.
///
/// With `deny` set the simulated device refuses location access and the
/// command stops once verification reports the failure.
///
/// # Errors
///
/// Returns an error if the places client cannot be built or a stage does
/// not finish in time.
pub(crate) async fn run_simulate(
    config: &AppConfig,
    lat: f64,
    lng: f64,
    deny: bool,
    pan_meters: Option<f64>,
) -> anyhow::Result<()> {
    let tuning = &config.location;
    let wait = tuning.request_timeout + tuning.verification_extend + SLACK;
    let home = Coordinate::new(lat, lng);

    let source = Arc::new(if deny {
        StaticLocationSource::failing(LocationFailure::Denied)
    } else {
        StaticLocationSource::at(home, AccuracyTier::House)
    });

    let verification = spawn_verification(Arc::clone(&source), tuning.clone());
    if deny {
        let mut statuses = verification.subscribe();
        let reason = tokio::time::timeout(wait, async {
            loop {
                match statuses.recv().await {
                    Ok(status) if status.state == VerificationState::LocationErrorIdle => {
                        return status.error;
                    }
                    Ok(_) | Err(broadcast::error::RecvError::Lagged(_)) => {}
                    Err(broadcast::error::RecvError::Closed) => return None,
                }
            }
        })
        .await
        .map_err(|_| anyhow::anyhow!("verification did not report a failure in time"))?;

        println!(
            "verification: {} ({})",
            VerificationState::LocationErrorIdle,
            reason.as_deref().unwrap_or("no reason given")
        );
        return Ok(());
    }

    let location = tokio::time::timeout(wait, verification.wait_for_location())
        .await
        .map_err(|_| anyhow::anyhow!("no location found in time"))??;
    println!("verification: found {}", location.coordinate);

    let tracker = spawn_freshness_tracker(Arc::clone(&source), tuning.clone());
    tracker.initialize_with_location(location)?;
    println!("tracker: {}", tracker.state());

    let client = crate::places::build_client(config)?;
    let (map, settles) = HeadlessMap::new(VIEWPORT_HEIGHT_PX);
    let session = spawn_map_session(
        Arc::new(client),
        map,
        tracker.locations(),
        config.map.clone(),
    );
    forward_settles(settles, &session);
    let mut notifications = session.subscribe();
    session.surface_laid_out()?;

    let search_wait = Duration::from_secs(config.http_timeout_secs) * 3 + SLACK;
    let parks = next_parks(&mut notifications, search_wait).await?;
    print_parks("initial search", &parks);

    if let Some(meters) = pan_meters {
        let target = CameraTarget::new(destination(home, 90.0, meters), MIN_ZOOM);
        session.camera_settled(MapViewport::from_camera(target, VIEWPORT_HEIGHT_PX))?;

        // A short pan stays inside the searched area and produces no search.
        match tokio::time::timeout(SLACK, next_parks(&mut notifications, search_wait)).await {
            Ok(parks) => print_parks(&format!("after {meters} m pan"), &parks?),
            Err(_) => println!("after {meters} m pan: still inside the searched area"),
        }
    }

    println!("map: {}", session.state());
    Ok(())
}

/// Waits for the next applied park set, reporting failed searches as they
/// happen.
async fn next_parks(
    notifications: &mut broadcast::Receiver<MapNotification>,
    wait: Duration,
) -> anyhow::Result<Vec<Park>> {
    tokio::time::timeout(wait, async {
        loop {
            match notifications.recv().await {
                Ok(MapNotification::ParksUpdated(parks)) => return Ok(parks),
                Ok(MapNotification::SearchFailed(reason)) => {
                    println!("search failed, retrying: {reason}");
                }
                Ok(MapNotification::StateChanged(state)) => {
                    tracing::info!(%state, "map state changed");
                    if state == MapState::ParksNeedUpdating {
                        println!("map: searching");
                    }
                }
                Ok(MapNotification::ShowParkDetails(_)) => {}
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::debug!(skipped, "notification receiver lagged");
                }
                Err(broadcast::error::RecvError::Closed) => {
                    return Err(anyhow::anyhow!("map session stopped"));
                }
            }
        }
    })
    .await
    .map_err(|_| anyhow::anyhow!("park search did not finish in time"))?
}

fn print_parks(label: &str, parks: &[Park]) {
    println!("{label}: {} park(s)", parks.len());
    for park in parks {
        println!(
            "  {:<40} {:>6.2} mi  {}",
            park.name, park.distance_miles, park.vicinity
        );
    }
}
