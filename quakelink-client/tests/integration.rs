//! Integration tests that connect to a real QuakeLink server.
//!
//! Gated by environment variables:
//! - `QUAKELINK_TEST_SERVER` — server URL (e.g., `ql://localhost:18010`)
//! - `QUAKELINK_TEST_EVENT` — an event id known to the server (optional)

use std::time::Duration;

use quakelink_rs_client::{ClientConfig, Connection};
use quakelink_rs_protocol::{FormatSpec, Options, RequestFormat, SelectParams};

fn server_url() -> Option<String> {
    std::env::var("QUAKELINK_TEST_SERVER").ok()
}

fn known_event() -> Option<String> {
    std::env::var("QUAKELINK_TEST_EVENT").ok()
}

#[tokio::test]
async fn handshake() {
    let Some(url) = server_url() else {
        eprintln!("skipping: QUAKELINK_TEST_SERVER not set");
        return;
    };

    let config = ClientConfig {
        connect_timeout: Duration::from_secs(15),
        read_timeout: Duration::from_secs(30),
    };
    let mut connection = Connection::new(config);
    connection.init(&url, Options::DEFAULTS).await.unwrap();
    connection.hello().await.unwrap();

    eprintln!(
        "server: {:?}, API={}",
        connection.server_id(),
        connection.server_api()
    );
    assert!(connection.connected());

    connection.disconnect().await;
    assert_eq!(connection.server_id(), "");
    assert_eq!(connection.server_api(), 0);
}

#[tokio::test]
async fn get_unknown_event_is_none() {
    let Some(url) = server_url() else {
        eprintln!("skipping: QUAKELINK_TEST_SERVER not set");
        return;
    };

    let mut connection = Connection::default();
    connection.init(&url, Options::DEFAULTS).await.unwrap();

    let response = connection
        .get(
            "no-such-event-id",
            None,
            FormatSpec::new(RequestFormat::Summary, 1),
        )
        .await
        .unwrap();
    assert!(response.is_none());
    assert!(connection.connected());
}

#[tokio::test]
async fn get_known_event() {
    let (Some(url), Some(event_id)) = (server_url(), known_event()) else {
        eprintln!("skipping: QUAKELINK_TEST_SERVER or QUAKELINK_TEST_EVENT not set");
        return;
    };

    let mut connection = Connection::default();
    connection.init(&url, Options::DEFAULTS).await.unwrap();

    let response = connection
        .get(&event_id, None, FormatSpec::new(RequestFormat::Xml, 1))
        .await
        .unwrap()
        .expect("configured event should exist");
    eprintln!(
        "event {}: {} bytes, format {:?}, revision {:?}",
        event_id,
        response.data.len(),
        response.format,
        response.revision
    );
    assert!(!response.data.is_empty());
}

#[tokio::test]
async fn select_archived_last_hour() {
    let Some(url) = server_url() else {
        eprintln!("skipping: QUAKELINK_TEST_SERVER not set");
        return;
    };

    let mut connection = Connection::default();
    connection.init(&url, Options::DEFAULTS).await.unwrap();

    let params = SelectParams {
        from: Some(chrono::Utc::now() - chrono::Duration::hours(1)),
        ..SelectParams::default()
    };
    let responses = connection.select_archived(&params).await.unwrap();
    eprintln!("archived events in the last hour: {}", responses.len());
}
