use axum::extract::{Path, State};
use axum::http::StatusCode;

use super::records::{create_record, delete_record, CreateRecordBody};
use super::zones::list_zones;
use crate::test_helpers::test_app_state;

#[tokio::test]
async fn test_empty_store_has_no_zones() {
    let (state, _tmp) = test_app_state().await;
    let axum::Json(response) = list_zones(State(state)).await.unwrap();
    assert!(response.zones.is_empty());
}

#[tokio::test]
async fn test_zones_are_distinct_and_sorted() {
    let (state, _tmp) = test_app_state().await;

    for (rname, zone, rdata) in [
        ("www.example.org", "example.org", "10.0.0.1"),
        ("mail.example.org", "example.org", "10.0.0.2"),
        ("www.alpha.net", "alpha.net", "10.0.0.3"),
    ] {
        let (status, _) = create_record(
            State(state.clone()),
            Path(("A".to_string(), rname.to_string())),
            axum::Json(CreateRecordBody {
                zone: Some(zone.to_string()),
                rdata: Some(rdata.to_string()),
                ttl: None,
            }),
        )
        .await
        .unwrap();
        assert_eq!(status, StatusCode::CREATED);
    }

    let axum::Json(response) = list_zones(State(state)).await.unwrap();
    assert_eq!(response.zones, vec!["alpha.net", "example.org"]);
}

#[tokio::test]
async fn test_zone_disappears_with_its_last_record() {
    let (state, _tmp) = test_app_state().await;

    create_record(
        State(state.clone()),
        Path(("A".to_string(), "www.example.org".to_string())),
        axum::Json(CreateRecordBody {
            zone: Some("example.org".to_string()),
            rdata: Some("10.0.0.1".to_string()),
            ttl: None,
        }),
    )
    .await
    .unwrap();

    delete_record(
        State(state.clone()),
        Path(("A".to_string(), "www.example.org".to_string())),
    )
    .await
    .unwrap();

    let axum::Json(response) = list_zones(State(state)).await.unwrap();
    assert!(response.zones.is_empty());
}
