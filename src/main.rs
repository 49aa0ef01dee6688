use std::time::Duration;

use lunostream::Dialer;
use lunostream::config::fetch_config;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let app_config = fetch_config().expect("Failed to load configuration.");
    let luno = app_config.luno;
    let key_id = luno.api_key_id.expect("LUNO_API_KEY_ID must be set.");
    let key_secret = luno.api_key_secret.expect("LUNO_API_KEY_SECRET must be set.");

    let conn = Dialer::new(key_id, key_secret, luno.pair)
        .host(luno.websocket_url)
        .dial()
        .expect("Failed to dial streaming API.");

    loop {
        let (sequence, bids, asks) = conn.snapshot();
        match (bids.first(), asks.first()) {
            (Some(bid), Some(ask)) => info!(
                sequence,
                best_bid = %bid.price,
                best_bid_volume = %bid.volume,
                best_ask = %ask.price,
                best_ask_volume = %ask.volume,
                "order book"
            ),
            _ => info!(sequence, "order book not yet initialized"),
        }
        tokio::time::sleep(Duration::from_secs(30)).await;
    }
}
