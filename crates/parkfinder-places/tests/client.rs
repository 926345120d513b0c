//! Integration tests for `PlacesClient` using wiremock HTTP mocks.

use parkfinder_core::{
    Coordinate, Location, OpenStatus, Park, ParkSearchInformation,
};
use parkfinder_places::{NearbySearch, PlacesClient, PlacesError};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn test_client(base_url: &str, max_retries: u32) -> PlacesClient {
    PlacesClient::with_base_url("test-key", 30, max_retries, 0, base_url)
        .expect("client construction should not fail")
}

fn park_record(id: &str, name: &str, lat: f64, lng: f64) -> serde_json::Value {
    serde_json::json!({
        "id": id,
        "name": name,
        "geometry": { "location": { "lat": lat, "lng": lng } },
        "vicinity": "Manhattan",
        "photos": [{ "photo_reference": format!("photo-{id}") }]
    })
}

#[tokio::test]
async fn search_sends_location_radius_and_park_type() {
    let server = MockServer::start().await;

    let body = serde_json::json!({
        "status": "OK",
        "results": [park_record("bp", "Bryant Park", 40.753_597, -73.983_233)]
    });

    Mock::given(method("GET"))
        .and(path("/nearbysearch/json"))
        .and(query_param("key", "test-key"))
        .and(query_param("location", "40.75,-73.98"))
        .and(query_param("radius", "1300"))
        .and(query_param("types", "park"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&body))
        .expect(1)
        .mount(&server)
        .await;

    let client = test_client(&server.uri(), 0);
    let records = client
        .search_nearby(Coordinate::new(40.75, -73.98), 1300)
        .await
        .expect("search should succeed");

    assert_eq!(records.len(), 1);
    assert_eq!(records[0]["name"], "Bryant Park");
}

#[tokio::test]
async fn search_parks_parses_and_skips_malformed_records() {
    let server = MockServer::start().await;

    let body = serde_json::json!({
        "status": "OK",
        "results": [
            park_record("bp", "Bryant Park", 40.753_597, -73.983_233),
            { "id": "broken", "name": "No Geometry", "vicinity": "Nowhere" },
            park_record("msp", "Madison Square Park", 40.742_216, -73.987_797)
        ]
    });

    Mock::given(method("GET"))
        .and(path("/nearbysearch/json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&body))
        .mount(&server)
        .await;

    let client = test_client(&server.uri(), 0);
    let info = ParkSearchInformation {
        center: Coordinate::new(40.75, -73.98),
        search_radius_meters: 2000,
        map_zoom: 14.0,
    };
    let parks = client
        .search_parks(info, Location::new(40.759_211, -73.984_638))
        .await
        .expect("search should succeed");

    let names: Vec<&str> = parks.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(names, vec!["Bryant Park", "Madison Square Park"]);
    assert_eq!(parks[0].photo_reference.as_deref(), Some("photo-bp"));
    assert!(parks[0].distance_miles < parks[1].distance_miles);
}

#[tokio::test]
async fn zero_results_is_an_empty_list() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/nearbysearch/json"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({ "status": "ZERO_RESULTS", "results": [] })),
        )
        .mount(&server)
        .await;

    let client = test_client(&server.uri(), 0);
    let records = client
        .search_nearby(Coordinate::new(0.0, 0.0), 500)
        .await
        .expect("ZERO_RESULTS is not an error");
    assert!(records.is_empty());
}

#[tokio::test]
async fn request_denied_is_an_api_error_and_not_retried() {
    let server = MockServer::start().await;

    let body = serde_json::json!({
        "status": "REQUEST_DENIED",
        "error_message": "The provided API key is invalid.",
        "results": []
    });

    Mock::given(method("GET"))
        .and(path("/nearbysearch/json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&body))
        .expect(1)
        .mount(&server)
        .await;

    let client = test_client(&server.uri(), 2);
    let err = client
        .search_nearby(Coordinate::new(40.75, -73.98), 500)
        .await
        .unwrap_err();

    match err {
        PlacesError::Api { status, message } => {
            assert_eq!(status, "REQUEST_DENIED");
            assert_eq!(message, "The provided API key is invalid.");
        }
        other => panic!("expected Api error, got {other:?}"),
    }
}

#[tokio::test]
async fn service_unavailable_is_retried_then_succeeds() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/nearbysearch/json"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/nearbysearch/json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "status": "OK",
            "results": [park_record("bp", "Bryant Park", 40.753_597, -73.983_233)]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = test_client(&server.uri(), 2);
    let records = client
        .search_nearby(Coordinate::new(40.75, -73.98), 500)
        .await
        .expect("second attempt should succeed");
    assert_eq!(records.len(), 1);
}

#[tokio::test]
async fn internal_server_error_is_retried_then_succeeds() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/nearbysearch/json"))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(2)
        .expect(2)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/nearbysearch/json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "status": "OK",
            "results": [park_record("bp", "Bryant Park", 40.753_597, -73.983_233)]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = test_client(&server.uri(), 2);
    let records = client
        .search_nearby(Coordinate::new(40.75, -73.98), 500)
        .await
        .expect("third attempt should succeed");
    assert_eq!(records.len(), 1);
}

#[tokio::test]
async fn internal_server_error_uses_whole_retry_budget() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/nearbysearch/json"))
        .respond_with(ResponseTemplate::new(500))
        .expect(3)
        .mount(&server)
        .await;

    let client = test_client(&server.uri(), 2);
    let err = client
        .search_nearby(Coordinate::new(40.75, -73.98), 500)
        .await
        .unwrap_err();
    assert!(matches!(err, PlacesError::Http(_)), "got {err:?}");
}

#[tokio::test]
async fn exhausted_retry_budget_surfaces_http_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/nearbysearch/json"))
        .respond_with(ResponseTemplate::new(503))
        .expect(3)
        .mount(&server)
        .await;

    let client = test_client(&server.uri(), 2);
    let err = client
        .search_nearby(Coordinate::new(40.75, -73.98), 500)
        .await
        .unwrap_err();
    assert!(matches!(err, PlacesError::Http(_)), "got {err:?}");
}

#[tokio::test]
async fn bad_request_is_not_retried() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/nearbysearch/json"))
        .respond_with(ResponseTemplate::new(400))
        .expect(1)
        .mount(&server)
        .await;

    let client = test_client(&server.uri(), 2);
    let err = client
        .search_nearby(Coordinate::new(40.75, -73.98), 500)
        .await
        .unwrap_err();
    assert!(matches!(err, PlacesError::Http(_)));
}

#[tokio::test]
async fn malformed_body_is_a_deserialize_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/nearbysearch/json"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .mount(&server)
        .await;

    let client = test_client(&server.uri(), 0);
    let err = client
        .search_nearby(Coordinate::new(40.75, -73.98), 500)
        .await
        .unwrap_err();
    assert!(matches!(err, PlacesError::Deserialize { .. }), "got {err:?}");
}

#[tokio::test]
async fn fetch_photo_returns_bytes_and_content_type() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/photo"))
        .and(query_param("key", "test-key"))
        .and(query_param("photoreference", "CmRaAAAA"))
        .and(query_param("maxwidth", "400"))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw(vec![0xFF, 0xD8, 0xFF, 0xE0], "image/jpeg"),
        )
        .mount(&server)
        .await;

    let client = test_client(&server.uri(), 0);
    let photo = client
        .fetch_photo("CmRaAAAA", 400)
        .await
        .expect("photo should download");

    assert_eq!(photo.content_type.as_deref(), Some("image/jpeg"));
    assert_eq!(photo.data, vec![0xFF, 0xD8, 0xFF, 0xE0]);
}

#[tokio::test]
async fn park_details_maps_fields_and_keeps_photo_reference() {
    let server = MockServer::start().await;

    let body = serde_json::json!({
        "status": "OK",
        "html_attributions": ["Listings by <a href=\"https://example.com\">Example</a>"],
        "result": {
            "place_id": "bp",
            "name": "Bryant Park",
            "formatted_address": "New York, NY 10018, USA",
            "formatted_phone_number": "(212) 768-4242",
            "website": "https://bryantpark.org/",
            "opening_hours": { "open_now": false }
        }
    });

    Mock::given(method("GET"))
        .and(path("/details/json"))
        .and(query_param("placeid", "bp"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&body))
        .mount(&server)
        .await;

    let park = Park {
        id: "bp".to_owned(),
        name: "Bryant Park".to_owned(),
        coordinate: Coordinate::new(40.753_597, -73.983_233),
        vicinity: "Manhattan".to_owned(),
        distance_miles: 0.4,
        photo_reference: Some("photo-bp".to_owned()),
    };

    let client = test_client(&server.uri(), 0);
    let details = client.park_details(&park).await.expect("details should parse");

    assert_eq!(details.place_id, "bp");
    assert_eq!(details.name.as_deref(), Some("Bryant Park"));
    assert_eq!(details.open_now, OpenStatus::No);
    assert_eq!(details.dial_digits().as_deref(), Some("2127684242"));
    assert_eq!(details.attributions.len(), 1);
    assert_eq!(details.photo_reference.as_deref(), Some("photo-bp"));
}

#[tokio::test]
async fn details_not_found_is_an_api_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/details/json"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({ "status": "NOT_FOUND" })),
        )
        .mount(&server)
        .await;

    let client = test_client(&server.uri(), 0);
    let err = client.lookup_details("gone").await.unwrap_err();
    assert!(
        matches!(&err, PlacesError::Api { status, .. } if status == "NOT_FOUND"),
        "got {err:?}"
    );
}
