use async_trait::async_trait;
use chrono::Utc;
use futures_util::{SinkExt, StreamExt};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, error, info, warn};

use crate::aptos::client::NodeReader;
use crate::aptos::types::{EntryFunctionPayload, USDC_DECIMALS};
use crate::error::{ClientError, ClientResult};
use crate::utils::config::VenueConfig;
use crate::utils::format::from_subunits;
use crate::venue::{MarketOrderParams, PayloadBuilder, PerpsVenue, PriceTick, VenuePosition};

const FEED_CAPACITY: usize = 256;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawPosition {
    #[serde(alias = "market")]
    pair: String,
    size: String,
    collateral: String,
    is_long: bool,
}

impl RawPosition {
    fn into_position(self) -> ClientResult<VenuePosition> {
        let parse = |field: &str, value: &str| {
            value
                .parse::<u64>()
                .map_err(|_| ClientError::Malformed(format!("position {} {}", field, value)))
        };
        Ok(VenuePosition {
            size: parse("size", &self.size)?,
            collateral: parse("collateral", &self.collateral)?,
            pair: self.pair,
            is_long: self.is_long,
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawPairState {
    mark_price: String,
}

#[derive(Debug, Deserialize)]
struct RawPriceMessage {
    pair: String,
    price: String,
}

/// Integer venue price (6 decimals) to display value.
fn parse_price(raw: &str) -> ClientResult<Decimal> {
    let value = raw
        .parse::<u64>()
        .map_err(|_| ClientError::Malformed(format!("price {}", raw)))?;
    Ok(from_subunits(value, USDC_DECIMALS))
}

/// Venue reached over its REST and WebSocket APIs. Balances come straight
/// from the node.
pub struct RestVenue {
    http_client: reqwest::Client,
    api_url: String,
    ws_url: String,
    payloads: PayloadBuilder,
    node: Arc<dyn NodeReader>,
}

impl RestVenue {
    pub fn new(config: &VenueConfig, node: Arc<dyn NodeReader>) -> Self {
        Self {
            http_client: reqwest::Client::new(),
            api_url: config.api_url.trim_end_matches('/').to_string(),
            ws_url: config.ws_url.clone(),
            payloads: PayloadBuilder::new(config.contract_address.clone(), config.usdc_coin_type.clone()),
            node,
        }
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, path: &str) -> ClientResult<T> {
        let url = format!("{}{}", self.api_url, path);
        let response = self.http_client.get(&url).send().await?;

        if !response.status().is_success() {
            return Err(ClientError::Status {
                endpoint: path.to_string(),
                status: response.status().as_u16(),
                body: response.text().await.unwrap_or_default(),
            });
        }

        Ok(response.json().await?)
    }
}

#[async_trait]
impl PerpsVenue for RestVenue {
    async fn usdc_balance(&self, address: &str) -> ClientResult<u64> {
        self.node.coin_balance(address, self.payloads.usdc_coin_type()).await
    }

    async fn positions(&self, address: &str) -> ClientResult<Vec<VenuePosition>> {
        debug!("Fetching positions for address: {}", address);
        let raw: Vec<RawPosition> = self.get_json(&format!("/v1/positions/{}", address)).await?;
        raw.into_iter().map(RawPosition::into_position).collect()
    }

    fn market_order_payload(&self, address: &str, params: &MarketOrderParams) -> ClientResult<EntryFunctionPayload> {
        self.payloads.market_order(address, params)
    }

    fn faucet_payload(&self, address: &str, amount: u64) -> ClientResult<EntryFunctionPayload> {
        self.payloads.faucet(address, amount)
    }

    async fn pair_price(&self, pair: &str) -> ClientResult<Option<Decimal>> {
        if pair.is_empty() {
            error!("Error: Pair is undefined");
            return Ok(None);
        }
        match self.get_json::<RawPairState>(&format!("/v1/pairs/{}/state", pair)).await {
            Ok(state) => parse_price(&state.mark_price).map(Some),
            Err(ClientError::Status { status: 404, .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn subscribe_price_feed(&self, pair: &str) -> ClientResult<mpsc::Receiver<PriceTick>> {
        let (stream, _) = connect_async(self.ws_url.as_str()).await?;
        info!("Connected to Websocket API");
        let (mut write, mut read) = stream.split();

        let subscribe = serde_json::json!({ "type": "subscribe", "channel": "price_feed", "pair": pair });
        write.send(Message::Text(subscribe.to_string())).await?;
        info!("Subscribed to {} price feed", pair);

        let (tx, rx) = mpsc::channel(FEED_CAPACITY);
        let pair = pair.to_string();

        tokio::spawn(async move {
            while let Some(message) = read.next().await {
                let text = match message {
                    Ok(Message::Text(text)) => text,
                    Ok(Message::Ping(payload)) => {
                        if let Err(e) = write.send(Message::Pong(payload)).await {
                            warn!("Pong failed: {}", e);
                            break;
                        }
                        continue;
                    }
                    Ok(Message::Close(_)) => break,
                    Ok(_) => continue,
                    Err(e) => {
                        error!("Price feed error: {}", e);
                        break;
                    }
                };

                let tick = match serde_json::from_str::<RawPriceMessage>(&text) {
                    Ok(raw) if raw.pair == pair => match parse_price(&raw.price) {
                        Ok(price) => PriceTick {
                            pair: raw.pair,
                            price,
                            received_at: Utc::now(),
                        },
                        Err(e) => {
                            warn!("Skipping tick: {}", e);
                            continue;
                        }
                    },
                    Ok(_) => continue,
                    Err(_) => {
                        debug!("Ignoring non-price message: {}", text);
                        continue;
                    }
                };

                if tx.send(tick).await.is_err() {
                    break;
                }
            }
            info!("Price feed for {} ended", pair);
        });

        Ok(rx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::venue::mock::MockVenue;
    use rust_decimal_macros::dec;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const USER: &str = "0x0000000000000000000000000000000000000000000000000000000000000abc";

    fn venue_for(server: &MockServer) -> RestVenue {
        let config = VenueConfig {
            api_url: server.uri(),
            ..VenueConfig::default()
        };
        RestVenue::new(&config, Arc::new(MockVenue::new()))
    }

    #[test]
    fn venue_prices_have_six_decimals() {
        assert_eq!(parse_price("68251230000").unwrap(), dec!(68251.23));
        assert!(parse_price("-1").is_err());
    }

    #[tokio::test]
    async fn reads_positions() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(format!("/v1/positions/{}", USER)))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                { "market": "BTC_USD", "size": "300000000", "collateral": "5000000", "isLong": true }
            ])))
            .mount(&server)
            .await;

        let positions = venue_for(&server).positions(USER).await.unwrap();
        assert_eq!(
            positions,
            vec![VenuePosition {
                pair: "BTC_USD".to_string(),
                size: 300_000_000,
                collateral: 5_000_000,
                is_long: true,
            }]
        );
    }

    #[tokio::test]
    async fn unknown_pair_has_no_price() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/pairs/BTC_USD/state"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "markPrice": "68000000000"
            })))
            .mount(&server)
            .await;

        let venue = venue_for(&server);
        assert_eq!(venue.pair_price("BTC_USD").await.unwrap(), Some(dec!(68000)));
        assert_eq!(venue.pair_price("DOGE_USD").await.unwrap(), None);
        assert_eq!(venue.pair_price("").await.unwrap(), None);
    }

    #[tokio::test]
    async fn price_feed_subscribes_filters_and_answers_pings() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let server = tokio::spawn(async move {
            let (socket, _) = listener.accept().await.unwrap();
            let mut ws = tokio_tungstenite::accept_async(socket).await.unwrap();

            let subscribe = match ws.next().await {
                Some(Ok(Message::Text(text))) => serde_json::from_str::<serde_json::Value>(&text).unwrap(),
                other => panic!("expected subscribe, got {:?}", other),
            };

            ws.send(Message::Ping(b"hb".to_vec())).await.unwrap();
            let tick = |pair: &str, price: &str| Message::Text(serde_json::json!({ "pair": pair, "price": price }).to_string());
            ws.send(tick("ETH_USD", "3500000000")).await.unwrap();
            ws.send(Message::Text(r#"{"type":"heartbeat"}"#.to_string())).await.unwrap();
            ws.send(tick("BTC_USD", "68251230000")).await.unwrap();

            let pong = loop {
                match ws.next().await {
                    Some(Ok(Message::Pong(payload))) => break payload,
                    Some(Ok(_)) => continue,
                    other => panic!("expected pong, got {:?}", other),
                }
            };

            ws.send(Message::Close(None)).await.unwrap();
            while let Some(Ok(_)) = ws.next().await {}
            (subscribe, pong)
        });

        let config = VenueConfig {
            ws_url: format!("ws://{}", addr),
            ..VenueConfig::default()
        };
        let venue = RestVenue::new(&config, Arc::new(MockVenue::new()));
        let mut feed = venue.subscribe_price_feed("BTC_USD").await.unwrap();

        let tick = feed.recv().await.unwrap();
        assert_eq!(tick.pair, "BTC_USD");
        assert_eq!(tick.price, dec!(68251.23));
        // closed by the server after the only matching tick
        assert!(feed.recv().await.is_none());

        let (subscribe, pong) = server.await.unwrap();
        assert_eq!(
            subscribe,
            serde_json::json!({ "type": "subscribe", "channel": "price_feed", "pair": "BTC_USD" })
        );
        assert_eq!(pong, b"hb".to_vec());
    }
}
