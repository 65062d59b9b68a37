//! CoinCap Rates Binary
//!
//! Watches live prices for a set of symbols.
//!
//! # Usage
//!
//! ```bash
//! cargo run -p coincap-rates -- BTC ETH
//! ```
//!
//! # Environment Variables
//!
//! All optional:
//! - `COINCAP_API_URL`: REST base URL (default: <https://api.coincap.io/v2>)
//! - `COINCAP_WS_URL`: WebSocket base URL (default: wss://ws.coincap.io)
//! - `RATES_POLL_INTERVAL_SECS`: asset-list poll interval (default: 20)
//! - `RATES_STALENESS_SECS`: price freshness threshold (default: 30)
//! - `RATES_RECONNECT_DELAY_SECS`: socket reconnect delay (default: 5)
//! - `RATES_REFERENCE_CURRENCY`: quote currency (default: USD)
//! - `RUST_LOG`: log level (default: info)

use std::sync::Arc;
use std::time::Duration;

use coincap_rates::{
    CoinCapRestClient, CoinCapSocketConnector, FeedSettings, RateClient, RateError,
};
use tokio::signal;
use tracing_subscriber::EnvFilter;

/// How often the watch loop prints prices.
const WATCH_INTERVAL: Duration = Duration::from_secs(5);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    rustls::crypto::ring::default_provider()
        .install_default()
        .expect("Failed to install rustls crypto provider");

    load_dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let settings = FeedSettings::from_env()?;
    log_settings(&settings);

    let symbols: Vec<String> = {
        let args: Vec<String> = std::env::args().skip(1).collect();
        if args.is_empty() {
            vec!["BTC".to_string(), "ETH".to_string()]
        } else {
            args
        }
    };

    let source = Arc::new(CoinCapRestClient::new(&settings.rest_url)?);
    let connector = Arc::new(CoinCapSocketConnector::new(&settings.ws_url));
    let client = RateClient::connect(settings.client_config(), source, connector).await?;

    tracing::info!(symbols = ?symbols, "watching prices, ctrl-c to stop");

    let mut ticker = tokio::time::interval(WATCH_INTERVAL);
    loop {
        tokio::select! {
            _ = signal::ctrl_c() => break,
            _ = ticker.tick() => report(&client, &symbols),
        }
    }

    client.disconnect().await;
    Ok(())
}

fn report(client: &RateClient, symbols: &[String]) {
    for symbol in symbols {
        match client.price(symbol) {
            Ok(price) => tracing::info!(symbol = %symbol, price = %price, "quote"),
            Err(e @ (RateError::UnknownAsset { .. } | RateError::StalePrice { .. })) => {
                tracing::warn!(symbol = %symbol, reason = %e, "no usable quote yet");
            }
            Err(e) => tracing::error!(symbol = %symbol, error = %e, "quote failed"),
        }
    }
}

/// Log the parsed configuration.
fn log_settings(settings: &FeedSettings) {
    tracing::info!(
        rest_url = %settings.rest_url,
        ws_url = %settings.ws_url,
        poll_interval_secs = settings.poll_interval.as_secs(),
        staleness_secs = settings.staleness_threshold.as_secs(),
        reconnect_delay_secs = settings.reconnect_delay.as_secs(),
        reference_currency = %settings.reference_currency,
        "Configuration loaded"
    );
}

fn load_dotenv() {
    if dotenvy::dotenv().is_err() {
        load_dotenv_from_ancestors();
    }
}

/// Walk up from the current directory looking for a `.env` file.
fn load_dotenv_from_ancestors() {
    if let Ok(cwd) = std::env::current_dir() {
        let mut dir = cwd.as_path();
        while let Some(parent) = dir.parent() {
            let env_path = parent.join(".env");
            if env_path.exists() {
                let _ = dotenvy::from_path(&env_path);
                return;
            }
            dir = parent;
        }
    }
}
