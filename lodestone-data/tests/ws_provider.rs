use futures_util::{SinkExt, StreamExt};
use lodestone_data::{
    provider::PriceProvider,
    response::TickerResult,
    ticker::ProviderTicker,
    venues::{self, bitget},
};
use rust_decimal_macros::dec;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio_tungstenite::tungstenite::Message;

mod common;

const SUBSCRIBE_ACK: &str =
    r#"{"event":"subscribe","arg":{"channel":"ticker","instId":"BTCUSDT","instType":"SPOT"}}"#;

const TICKER_PUSH: &str = r#"{
    "action": "snapshot",
    "arg": {"channel": "ticker", "instId": "BTCUSDT", "instType": "SPOT"},
    "data": [{"instId": "BTCUSDT", "lastPr": "42000.5"}],
    "ts": 1700000000000
}"#;

/// Venue fixture: acknowledge subscriptions with an ack plus one ticker push, answer
/// pings with pongs.
async fn serve_venue(listener: TcpListener) {
    loop {
        let Ok((socket, _)) = listener.accept().await else {
            return;
        };

        tokio::spawn(async move {
            let Ok(mut websocket) = tokio_tungstenite::accept_async(socket).await else {
                return;
            };

            while let Some(Ok(message)) = websocket.next().await {
                let Message::Text(text) = message else {
                    continue;
                };

                if text.as_str() == "ping" {
                    let _ = websocket.send(Message::text("pong")).await;
                } else if text.as_str().contains("subscribe") {
                    let _ = websocket.send(Message::text(SUBSCRIBE_ACK)).await;
                    let _ = websocket.send(Message::text(TICKER_PUSH)).await;
                }
            }
        });
    }
}

/// Drive a full WebSocket provider - dial, subscribe, classify frames, merge - against a
/// local fixture and read the price back through the snapshot interface.
#[tokio::test]
async fn ws_provider_resolves_prices_end_to_end() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("debug")
        .try_init();

    let (listener, addr) = common::local_listener().await;
    tokio::spawn(serve_venue(listener));

    let mut config = bitget::default_websocket_config();
    config.endpoints[0].url = format!("ws://{addr}");
    config.post_connection_timeout_ms = 10;
    config.write_interval_ms = 10;
    config.reconnection_timeout_ms = 200;

    let handler = venues::ws_handler(bitget::NAME, &config).unwrap();
    let provider = Arc::new(
        PriceProvider::websocket(
            bitget::NAME.into(),
            config,
            handler,
            vec![ProviderTicker::new("BTC/USD", "BTCUSDT", "")],
        )
        .unwrap(),
    );

    let runner = tokio::spawn({
        let provider = provider.clone();
        async move { provider.run().await }
    });

    let deadline = tokio::time::Instant::now() + Duration::from_secs(10);
    loop {
        if let Some(TickerResult::Resolved(result)) = provider.get_data().get("BTC/USD") {
            assert_eq!(result.price, dec!(42000.5));
            break;
        }
        assert!(
            tokio::time::Instant::now() < deadline,
            "no resolved price within deadline"
        );
        tokio::time::sleep(Duration::from_millis(25)).await;
    }

    provider.stop();
    tokio::time::timeout(Duration::from_secs(5), runner)
        .await
        .expect("provider must stop promptly")
        .unwrap();
}
