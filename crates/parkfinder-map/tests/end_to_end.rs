//! Whole-pipeline scenarios: location verification, freshness tracking, and
//! the map session searching a mocked places API.

use std::sync::Arc;
use std::time::Duration;

use parkfinder_core::{
    destination, AccuracyTier, Coordinate, LocationFailure, LocationTuning, MapTuning,
};
use parkfinder_location::{
    spawn_freshness_tracker, spawn_verification, FreshnessHandle, FreshnessState,
    StaticLocationSource, VerificationState,
};
use parkfinder_map::{
    forward_settles, spawn_map_session, CameraTarget, HeadlessMap, MapNotification,
    MapSessionHandle, MapState, MapViewport, SurfaceLog,
};
use parkfinder_places::PlacesClient;
use tokio::sync::broadcast;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const HEIGHT_PX: f64 = 800.0;
const STEP_TIMEOUT: Duration = Duration::from_secs(5);

fn home() -> Coordinate {
    Coordinate::new(40.7580, -73.9855)
}

fn bryant_park() -> Coordinate {
    Coordinate::new(40.7536, -73.9832)
}

async fn places_server() -> MockServer {
    let server = MockServer::start().await;
    let body = serde_json::json!({
        "status": "OK",
        "results": [{
            "id": "bryant",
            "name": "Bryant Park",
            "geometry": { "location": { "lat": bryant_park().latitude, "lng": bryant_park().longitude } },
            "vicinity": "New York",
            "photos": [{ "photo_reference": "bryant-photo" }]
        }]
    });
    Mock::given(method("GET"))
        .and(path("/nearbysearch/json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&body))
        .mount(&server)
        .await;
    server
}

async fn verified_tracker(source: Arc<StaticLocationSource>) -> FreshnessHandle {
    let verification = spawn_verification(Arc::clone(&source), LocationTuning::default());
    let location = tokio::time::timeout(STEP_TIMEOUT, verification.wait_for_location())
        .await
        .expect("verification finished in time")
        .expect("location found");
    let tracker = spawn_freshness_tracker(source, LocationTuning::default());
    tracker.initialize_with_location(location).unwrap();
    tracker
}

struct Running {
    handle: MapSessionHandle,
    log: SurfaceLog,
    notifications: broadcast::Receiver<MapNotification>,
    _tracker: FreshnessHandle,
}

async fn running_map(server: &MockServer) -> Running {
    let source = Arc::new(StaticLocationSource::at(home(), AccuracyTier::House));
    let tracker = verified_tracker(source).await;
    let client =
        PlacesClient::with_base_url("test-key", 5, 0, 0, &server.uri()).expect("client builds");

    let (map, settles) = HeadlessMap::new(HEIGHT_PX);
    let log = map.log();
    let handle = spawn_map_session(
        Arc::new(client),
        map,
        tracker.locations(),
        MapTuning::default(),
    );
    forward_settles(settles, &handle);
    let notifications = handle.subscribe();
    handle.surface_laid_out().unwrap();

    Running {
        handle,
        log,
        notifications,
        _tracker: tracker,
    }
}

async fn next_matching(
    rx: &mut broadcast::Receiver<MapNotification>,
    mut wanted: impl FnMut(&MapNotification) -> bool,
) -> MapNotification {
    tokio::time::timeout(STEP_TIMEOUT, async {
        loop {
            let notification = rx.recv().await.expect("session alive");
            if wanted(&notification) {
                return notification;
            }
        }
    })
    .await
    .expect("notification arrived in time")
}

async fn next_state(rx: &mut broadcast::Receiver<MapNotification>, state: MapState) {
    next_matching(rx, |n| *n == MapNotification::StateChanged(state)).await;
}

#[tokio::test]
async fn denied_location_idles_with_denied_reason() {
    let source = Arc::new(StaticLocationSource::failing(LocationFailure::Denied));
    let verification = spawn_verification(source, LocationTuning::default());
    let mut events = verification.subscribe();

    let idle = tokio::time::timeout(STEP_TIMEOUT, async {
        loop {
            let status = events.recv().await.unwrap();
            if status.state == VerificationState::LocationErrorIdle {
                return status;
            }
        }
    })
    .await
    .expect("reached error idle");

    let reason = idle.error.expect("reason present");
    assert!(reason.contains("denied"), "{reason}");
    assert_eq!(
        verification.status().state,
        VerificationState::LocationErrorIdle
    );
}

#[tokio::test]
async fn granted_location_initializes_tracker() {
    let source = Arc::new(StaticLocationSource::at(home(), AccuracyTier::Room));
    let verification = spawn_verification(Arc::clone(&source), LocationTuning::default());
    let location = tokio::time::timeout(STEP_TIMEOUT, verification.wait_for_location())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(
        verification.status().state,
        VerificationState::FoundLocation
    );

    let tracker = spawn_freshness_tracker(source, LocationTuning::default());
    let mut states = tracker.subscribe();
    tracker.initialize_with_location(location.clone()).unwrap();
    assert_eq!(states.recv().await.unwrap(), FreshnessState::Updated);
    assert_eq!(tracker.current_location().unwrap(), location);
}

#[tokio::test]
async fn first_location_searches_then_updates() {
    let server = places_server().await;
    let mut running = running_map(&server).await;

    next_state(&mut running.notifications, MapState::ParksNeedUpdating).await;
    next_state(&mut running.notifications, MapState::Updated).await;

    let parks = running.handle.parks();
    assert_eq!(parks.len(), 1);
    assert_eq!(parks[0].name, "Bryant Park");
    assert!(parks[0].distance_miles > 0.2 && parks[0].distance_miles < 0.4);
}

#[tokio::test]
async fn panning_twice_the_radius_searches_again() {
    let server = places_server().await;
    let mut running = running_map(&server).await;
    next_state(&mut running.notifications, MapState::Updated).await;

    let initial = MapViewport::from_camera(CameraTarget::new(home(), 11.0), HEIGHT_PX);
    let radius = f64::from(initial.search_radius_meters(1.3));
    let panned = MapViewport::from_camera(
        CameraTarget::new(destination(home(), 90.0, radius * 2.0), 11.0),
        HEIGHT_PX,
    );
    running.handle.camera_settled(panned).unwrap();

    next_state(&mut running.notifications, MapState::ParksNeedUpdating).await;
    next_state(&mut running.notifications, MapState::Updated).await;
    let requests = server.received_requests().await.unwrap_or_default();
    assert_eq!(requests.len(), 2);
}

#[tokio::test]
async fn reselecting_centered_park_shows_details_without_moving() {
    let server = places_server().await;
    let mut running = running_map(&server).await;
    next_state(&mut running.notifications, MapState::Updated).await;

    // First selection flies to the park and refreshes around it.
    running.handle.select_park(0).unwrap();
    next_state(&mut running.notifications, MapState::ParksNeedUpdating).await;
    next_state(&mut running.notifications, MapState::Updated).await;
    assert_eq!(running.handle.parks()[0].id, "bryant");

    let animations = running.log.animation_count();
    running.handle.select_park(0).unwrap();
    let shown = next_matching(&mut running.notifications, |n| {
        matches!(n, MapNotification::ShowParkDetails(_))
    })
    .await;

    match shown {
        MapNotification::ShowParkDetails(park) => assert_eq!(park.id, "bryant"),
        other => panic!("unexpected {other:?}"),
    }
    assert_eq!(running.log.animation_count(), animations);
    assert_eq!(running.handle.state(), MapState::Updated);
}
