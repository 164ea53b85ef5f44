//! Upstream client tests against a mock HTTP server.

use std::collections::BTreeMap;

use mockito::Matcher;
use wattbind_core::{CampusApi, CoreError, RoomKey, UpstreamConfig, UpstreamError};

fn config(base_url: &str) -> UpstreamConfig {
    UpstreamConfig {
        base_url: base_url.to_string(),
        campuses: BTreeMap::from([("North".to_string(), "0030000000002501".to_string())]),
        ..UpstreamConfig::default()
    }
}

fn building_body() -> &'static str {
    r#"{"query_elec_building": {"buildingtab": [
        {"building": "Building 5", "buildingid": "101"},
        {"building": "Building 7", "buildingid": "103"}
    ]}}"#
}

#[tokio::test]
async fn building_list_is_fetched_and_cached() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/")
        .match_body(Matcher::Regex("query_elec_building".into()))
        .with_status(200)
        .with_body(building_body())
        .expect(1)
        .create_async()
        .await;

    let api = CampusApi::new(&config(&server.url())).unwrap();

    let buildings = api.buildings("North").await.unwrap();
    assert_eq!(buildings.len(), 2);
    assert_eq!(buildings["Building 5"].id, "101");

    // Second call is served from the cache; the mock allows one hit only.
    let again = api.buildings("North").await.unwrap();
    assert_eq!(again.len(), 2);
    mock.assert_async().await;
}

#[tokio::test]
async fn unknown_campus_fails_without_a_request() {
    let server = mockito::Server::new_async().await;
    let api = CampusApi::new(&config(&server.url())).unwrap();

    let err = api.buildings("Nowhere").await.unwrap_err();
    assert!(matches!(err, CoreError::Validation(_)));
}

#[tokio::test]
async fn reading_is_extracted_from_the_balance_message() {
    let mut server = mockito::Server::new_async().await;
    let _buildings = server
        .mock("POST", "/")
        .match_body(Matcher::Regex("query_elec_building".into()))
        .with_status(200)
        .with_body(building_body())
        .create_async()
        .await;
    let _room = server
        .mock("POST", "/")
        .match_body(Matcher::Regex("query_elec_roominfo".into()))
        .with_status(200)
        .with_body(r#"{"query_elec_roominfo": {"error": "0", "errmsg": "remaining balance 23.75 kWh"}}"#)
        .create_async()
        .await;

    let api = CampusApi::new(&config(&server.url())).unwrap();
    let room = RoomKey::new("North", "Building 5", "A544");

    let reading = api.fetch_reading(&room).await.unwrap();
    assert!((reading.value - 23.75).abs() < 1e-12);
}

#[tokio::test]
async fn upstream_error_field_maps_to_not_found() {
    let mut server = mockito::Server::new_async().await;
    let _buildings = server
        .mock("POST", "/")
        .match_body(Matcher::Regex("query_elec_building".into()))
        .with_status(200)
        .with_body(building_body())
        .create_async()
        .await;
    let _room = server
        .mock("POST", "/")
        .match_body(Matcher::Regex("query_elec_roominfo".into()))
        .with_status(200)
        .with_body(r#"{"query_elec_roominfo": {"error": "1", "errmsg": "no such room"}}"#)
        .create_async()
        .await;

    let api = CampusApi::new(&config(&server.url())).unwrap();
    let room = RoomKey::new("North", "Building 5", "Z999");

    let err = api.fetch_reading(&room).await.unwrap_err();
    assert!(matches!(
        err,
        CoreError::Upstream(UpstreamError::NotFound(_))
    ));
}

#[tokio::test]
async fn message_without_a_number_is_a_parse_error() {
    let mut server = mockito::Server::new_async().await;
    let _buildings = server
        .mock("POST", "/")
        .match_body(Matcher::Regex("query_elec_building".into()))
        .with_status(200)
        .with_body(building_body())
        .create_async()
        .await;
    let _room = server
        .mock("POST", "/")
        .match_body(Matcher::Regex("query_elec_roominfo".into()))
        .with_status(200)
        .with_body(r#"{"query_elec_roominfo": {"error": "0", "errmsg": "please retry"}}"#)
        .create_async()
        .await;

    let api = CampusApi::new(&config(&server.url())).unwrap();
    let room = RoomKey::new("North", "Building 5", "A544");

    let err = api.fetch_reading(&room).await.unwrap_err();
    assert!(matches!(err, CoreError::Upstream(UpstreamError::Parse(_))));
}

#[tokio::test]
async fn unknown_building_is_a_validation_error() {
    let mut server = mockito::Server::new_async().await;
    let _buildings = server
        .mock("POST", "/")
        .match_body(Matcher::Regex("query_elec_building".into()))
        .with_status(200)
        .with_body(building_body())
        .create_async()
        .await;

    let api = CampusApi::new(&config(&server.url())).unwrap();
    let room = RoomKey::new("North", "Building 99", "A544");

    let err = api.fetch_reading(&room).await.unwrap_err();
    assert!(matches!(err, CoreError::Validation(_)));
}

#[tokio::test]
async fn malformed_response_shape_is_a_parse_error() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("POST", "/")
        .with_status(200)
        .with_body(r#"{"something_else": {}}"#)
        .create_async()
        .await;

    let api = CampusApi::new(&config(&server.url())).unwrap();
    let err = api.buildings("North").await.unwrap_err();
    assert!(matches!(err, CoreError::Upstream(UpstreamError::Parse(_))));
}
