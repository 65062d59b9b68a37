//! Feed Lifecycle Integration Tests
//!
//! Drives a full client instance against the in-memory transports: seeding,
//! subscription, push delivery, reconnection, and teardown.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use rust_decimal::Decimal;

use coincap_rates::{
    AssetRecord, AssetSnapshot, AssetSource, ConnectionState, MockAssetSource, MockPushConnector,
    PushConnector, RateClient, RateClientConfig, RateError,
};

fn record(id: &str, symbol: &str, price: &str) -> AssetRecord {
    AssetRecord {
        id: id.to_string(),
        symbol: symbol.to_string(),
        price_usd: Decimal::from_str(price).unwrap(),
    }
}

fn fresh_snapshot() -> AssetSnapshot {
    AssetSnapshot {
        assets: vec![
            record("bitcoin", "BTC", "50000"),
            record("ethereum", "ETH", "3000"),
        ],
        server_time: Utc::now(),
    }
}

async fn connect_client(
    source: &Arc<MockAssetSource>,
    connector: &Arc<MockPushConnector>,
) -> RateClient {
    RateClient::connect(
        RateClientConfig::default(),
        Arc::clone(source) as Arc<dyn AssetSource>,
        Arc::clone(connector) as Arc<dyn PushConnector>,
    )
    .await
    .unwrap()
}

async fn settle() {
    tokio::time::sleep(Duration::from_millis(10)).await;
}

#[tokio::test(start_paused = true)]
async fn connect_seeds_registry_before_returning() {
    let source = Arc::new(MockAssetSource::new());
    source.set_snapshot(fresh_snapshot());
    let connector = Arc::new(MockPushConnector::new());

    let client = connect_client(&source, &connector).await;

    assert_eq!(client.asset_count(), 2);
    assert_eq!(source.calls(), 1);
    assert_eq!(
        client.price("BTC").unwrap(),
        Decimal::from_str("50000").unwrap()
    );

    client.disconnect().await;
}

#[tokio::test(start_paused = true)]
async fn push_updates_flow_through_to_lookups() {
    let source = Arc::new(MockAssetSource::new());
    source.set_snapshot(fresh_snapshot());
    let connector = Arc::new(MockPushConnector::new());
    let client = connect_client(&source, &connector).await;

    let session = connector.script_session();
    client.price("BTC").unwrap();
    settle().await;
    assert_eq!(client.connection_state(), ConnectionState::Open);

    session.send(r#"{"bitcoin": "51000"}"#).await;
    settle().await;

    assert_eq!(
        client.price("BTC").unwrap(),
        Decimal::from_str("51000").unwrap()
    );

    client.disconnect().await;
}

#[tokio::test(start_paused = true)]
async fn reconnect_after_close_carries_full_subscribed_set() {
    let source = Arc::new(MockAssetSource::new());
    source.set_snapshot(fresh_snapshot());
    let connector = Arc::new(MockPushConnector::new());
    let client = connect_client(&source, &connector).await;

    let first_session = connector.script_session();
    client.price("BTC").unwrap();
    settle().await;
    assert_eq!(connector.connected_sets(), vec![vec!["bitcoin".to_string()]]);
    drop(first_session);

    // A second symbol joins while the first session is still up; the
    // replacement session carries both.
    let second_session = connector.script_session();
    client.price("ETH").unwrap();
    settle().await;
    let sets = connector.connected_sets();
    assert_eq!(
        sets.last().unwrap(),
        &vec!["bitcoin".to_string(), "ethereum".to_string()]
    );

    // Drop the live session; the retry also carries the full set.
    let connects_before = connector.connect_count();
    second_session.close().await;
    tokio::time::sleep(Duration::from_secs(6)).await;

    assert!(connector.connect_count() > connects_before);
    assert_eq!(
        connector.connected_sets().last().unwrap(),
        &vec!["bitcoin".to_string(), "ethereum".to_string()]
    );

    client.disconnect().await;
}

#[tokio::test(start_paused = true)]
async fn polling_keeps_prices_fresh_without_a_socket() {
    let source = Arc::new(MockAssetSource::new());
    source.set_snapshot(fresh_snapshot());
    let connector = Arc::new(MockPushConnector::new());
    let client = connect_client(&source, &connector).await;

    // Later polls observe a new snapshot.
    source.set_snapshot(AssetSnapshot {
        assets: vec![record("bitcoin", "BTC", "52500")],
        server_time: Utc::now(),
    });

    tokio::time::sleep(Duration::from_secs(21)).await;

    assert!(source.calls() >= 2);
    // Nothing has been subscribed, so polling alone carried the update.
    assert_eq!(connector.connect_count(), 0);
    assert_eq!(
        client.price("BTC").unwrap(),
        Decimal::from_str("52500").unwrap()
    );

    client.disconnect().await;
}

#[tokio::test(start_paused = true)]
async fn stale_seed_fails_until_push_delivers() {
    let source = Arc::new(MockAssetSource::new());
    source.push_response(Ok(AssetSnapshot {
        assets: vec![record("bitcoin", "BTC", "50000")],
        server_time: Utc::now() - chrono::Duration::seconds(45),
    }));
    let connector = Arc::new(MockPushConnector::new());
    let client = connect_client(&source, &connector).await;

    let session = connector.script_session();
    assert!(matches!(
        client.price("BTC"),
        Err(RateError::StalePrice { .. })
    ));
    settle().await;

    session.send(r#"{"bitcoin": "50500"}"#).await;
    settle().await;

    assert_eq!(
        client.price("BTC").unwrap(),
        Decimal::from_str("50500").unwrap()
    );

    client.disconnect().await;
}

#[tokio::test(start_paused = true)]
async fn disconnect_twice_leaves_nothing_running() {
    let source = Arc::new(MockAssetSource::new());
    source.set_snapshot(fresh_snapshot());
    let connector = Arc::new(MockPushConnector::new());
    let client = connect_client(&source, &connector).await;

    client.price("BTC").unwrap();
    settle().await;

    client.disconnect().await;
    client.disconnect().await;

    assert_eq!(client.asset_count(), 0);
    assert_eq!(client.connection_state(), ConnectionState::Idle);

    // Neither the poller nor the reconnect loop fires again.
    let fetches = source.calls();
    let connects = connector.connect_count();
    tokio::time::sleep(Duration::from_secs(120)).await;
    assert_eq!(source.calls(), fetches);
    assert_eq!(connector.connect_count(), connects);
}
