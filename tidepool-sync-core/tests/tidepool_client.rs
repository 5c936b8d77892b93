use chrono::{TimeZone, Utc};
use serde_json::json;
use wiremock::matchers::{basic_auth, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use tidepool_sync_core::contract::{SyncWindow, TidepoolSource};
use tidepool_sync_core::tidepool_client::TidepoolClient;

async fn logged_in(server: &MockServer) -> TidepoolClient {
    Mock::given(method("POST"))
        .and(path("/auth/login"))
        .and(basic_auth("me@example.com", "hunter2"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("x-tidepool-session-token", "session-abc")
                .set_body_json(json!({ "userid": "u123", "username": "me@example.com" })),
        )
        .expect(1)
        .mount(server)
        .await;

    TidepoolClient::login(&server.uri(), "me@example.com", "hunter2")
        .await
        .expect("login should succeed")
}

fn window() -> SyncWindow {
    SyncWindow {
        since: Utc.with_ymd_and_hms(2021, 3, 1, 0, 0, 0).unwrap(),
        till: Some(Utc.with_ymd_and_hms(2021, 3, 2, 0, 0, 0).unwrap()),
    }
}

#[tokio::test]
async fn test_login_reads_session_token_and_user_id() {
    let server = MockServer::start().await;
    let client = logged_in(&server).await;
    assert_eq!(client.user_id(), "u123");
}

#[tokio::test]
async fn test_login_rejected() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/login"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let result = TidepoolClient::login(&server.uri(), "me@example.com", "wrong").await;
    assert!(result.is_err());
}

#[tokio::test]
async fn test_boluses_query_uses_type_window_and_session() {
    let server = MockServer::start().await;
    let client = logged_in(&server).await;

    Mock::given(method("GET"))
        .and(path("/data/u123"))
        .and(header("x-tidepool-session-token", "session-abc"))
        .and(query_param("type", "bolus"))
        .and(query_param("startDate", "2021-03-01T00:00:00.000Z"))
        .and(query_param("endDate", "2021-03-02T00:00:00.000Z"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "type": "bolus", "subType": "normal", "time": "2021-03-01T08:00:00.000Z", "normal": 2.5 },
            { "type": "bolus", "subType": "normal", "time": "2021-03-01T12:30:00.000Z", "normal": 1.0 }
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let boluses = client.boluses(window()).await.expect("bolus query should succeed");
    assert_eq!(boluses.len(), 2);
    assert_eq!(boluses[0].normal, Some(2.5));
    assert_eq!(
        boluses[1].time,
        Utc.with_ymd_and_hms(2021, 3, 1, 12, 30, 0).unwrap()
    );
}

#[tokio::test]
async fn test_pump_settings_query() {
    let server = MockServer::start().await;
    let client = logged_in(&server).await;

    Mock::given(method("GET"))
        .and(path("/data/u123"))
        .and(query_param("type", "pumpSettings"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
            "type": "pumpSettings",
            "activeSchedule": "Standard",
            "deviceTime": "2021-03-01T08:15:00",
            "units": { "carb": "grams", "bg": "mmol/L" },
            "basalSchedules": { "Standard": [{ "start": 0, "rate": 0.8 }] },
            "carbRatios": { "Standard": [{ "start": 0, "amount": 10 }] }
        }])))
        .mount(&server)
        .await;

    let settings = client.pump_settings(window()).await.unwrap();
    assert_eq!(settings.len(), 1);
    assert_eq!(settings[0].carb_ratios["Standard"][0].amount, 10.0);
}

#[tokio::test]
async fn test_data_query_failure_is_an_error() {
    let server = MockServer::start().await;
    let client = logged_in(&server).await;

    Mock::given(method("GET"))
        .and(path("/data/u123"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;

    let err = client.food(window()).await.unwrap_err();
    assert!(err.to_string().contains("500"));
}
