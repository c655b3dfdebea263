use lodestone_data::{
    config::{ApiConfig, Endpoint},
    marketmap::{Chain, MarketMapFetcher, multi::MultiMarketMapFetcher},
};

mod common;

const MAINNET_PARAMS: &str = r#"{
    "market_params": [
        {
            "pair": "BTC-USD",
            "exponent": -5,
            "min_exchanges": 1,
            "exchange_config_json": "{\"exchanges\":[{\"exchangeName\":\"Binance\",\"ticker\":\"BTCUSDT\"}]}"
        }
    ]
}"#;

const RESEARCH_MARKET_MAP: &str = r#"{
    "markets": {
        "ETH/USD": {
            "ticker": {
                "pair": {"base": "ETH", "quote": "USD"},
                "decimals": 6,
                "min_provider_count": 1,
                "enabled": true
            },
            "provider_configs": [
                {
                    "name": "coinbase_ws",
                    "off_chain_ticker": "ETH-USD",
                    "invert": false,
                    "metadata_json": ""
                }
            ]
        }
    }
}"#;

/// Fetch from a local mainnet params endpoint and a local research document, and check
/// the merged map holds both markets with mainnet precedence semantics intact.
#[tokio::test]
async fn multi_fetcher_merges_local_sources_end_to_end() {
    let (mainnet_listener, mainnet_addr) = common::local_listener().await;
    tokio::spawn(common::serve_json(mainnet_listener, MAINNET_PARAMS));

    let (research_listener, research_addr) = common::local_listener().await;
    tokio::spawn(common::serve_json(research_listener, RESEARCH_MARKET_MAP));

    let api = ApiConfig {
        name: "marketmap_api".into(),
        enabled: true,
        atomic: true,
        timeout_ms: 5_000,
        interval_ms: 10_000,
        reconnect_timeout_ms: 2_000,
        max_queries: 1,
        endpoints: vec![
            Endpoint::new(format!("http://{mainnet_addr}")),
            Endpoint::new(format!("http://{research_addr}/research.json")),
        ],
    };

    let chain = Chain::new("lodestone-1");
    let fetcher = MultiMarketMapFetcher::from_api_config(&api, chain.clone(), false).unwrap();

    let response = fetcher.fetch(&[chain.clone()]).await;
    assert!(
        response.unresolved.is_empty(),
        "unexpected failure: {:?}",
        response.unresolved
    );

    let combined = &response.resolved.get(&chain).unwrap().value;
    assert_eq!(combined.markets.len(), 2);

    let btc = combined.get("BTC/USD").unwrap();
    assert_eq!(btc.ticker.decimals, 5);
    assert_eq!(btc.provider_configs[0].name, "binance_ws");

    let eth = combined.get("ETH/USD").unwrap();
    assert_eq!(eth.provider_configs[0].off_chain_ticker, "ETH-USD");
}
