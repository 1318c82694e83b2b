//! In-memory venue and ledger for paper trading and tests.

use async_trait::async_trait;
use chrono::Utc;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::aptos::client::NodeReader;
use crate::aptos::types::{AccountAddress, EntryFunctionPayload, PendingTransaction, TransactionOutcome, APTOS_COIN_TYPE};
use crate::error::{ClientError, ClientResult};
use crate::utils::config::VenueConfig;
use crate::venue::{
    decode_market_order, MarketOrderParams, PayloadBuilder, PerpsVenue, PriceTick, VenuePosition, FAUCET_FUNCTION,
    FAUCET_MODULE,
};

const FEED_CAPACITY: usize = 64;

#[derive(Debug, Default)]
struct MockState {
    apt: HashMap<String, u64>,
    usdc: HashMap<String, u64>,
    positions: HashMap<String, Vec<VenuePosition>>,
    confirmed: HashSet<String>,
    fail_reads: bool,
    balance_reads: u64,
    position_reads: u64,
}

/// Simulated venue and node. Submitted payloads settle immediately.
pub struct MockVenue {
    payloads: PayloadBuilder,
    state: Mutex<MockState>,
    base_price: Decimal,
    tick_interval: Duration,
}

impl Default for MockVenue {
    fn default() -> Self {
        Self::new()
    }
}

fn key(address: &str) -> String {
    address
        .parse::<AccountAddress>()
        .map(|a| a.to_string())
        .unwrap_or_else(|_| address.to_string())
}

impl MockVenue {
    pub fn new() -> Self {
        let config = VenueConfig::default();
        Self {
            payloads: PayloadBuilder::new(config.contract_address, config.usdc_coin_type),
            state: Mutex::new(MockState::default()),
            base_price: dec!(68250),
            tick_interval: Duration::from_secs(1),
        }
    }

    pub fn with_tick_interval(mut self, tick_interval: Duration) -> Self {
        self.tick_interval = tick_interval;
        self
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn set_apt_balance(&self, address: &str, octas: u64) {
        self.lock().apt.insert(key(address), octas);
    }

    pub fn set_usdc_balance(&self, address: &str, subunits: u64) {
        self.lock().usdc.insert(key(address), subunits);
    }

    pub fn set_positions(&self, address: &str, positions: Vec<VenuePosition>) {
        self.lock().positions.insert(key(address), positions);
    }

    /// Makes every balance and position read fail until switched off.
    pub fn fail_reads(&self, fail: bool) {
        self.lock().fail_reads = fail;
    }

    pub fn balance_reads(&self) -> u64 {
        self.lock().balance_reads
    }

    pub fn position_reads(&self) -> u64 {
        self.lock().position_reads
    }

    fn check_reads(state: &MockState) -> ClientResult<()> {
        if state.fail_reads {
            return Err(ClientError::Status {
                endpoint: "mock".to_string(),
                status: 503,
                body: "simulated outage".to_string(),
            });
        }
        Ok(())
    }

    /// Applies a signed payload to the in-memory ledger.
    pub fn settle(&self, payload: &EntryFunctionPayload) -> ClientResult<PendingTransaction> {
        if payload.module_and_function() == Some((FAUCET_MODULE, FAUCET_FUNCTION)) {
            let user = payload.arguments.first().and_then(|a| a.as_address());
            let amount = payload.arguments.get(1).and_then(|a| a.as_u64());
            let (user, amount) = user
                .zip(amount)
                .ok_or_else(|| ClientError::Malformed("faucet arguments".to_string()))?;
            *self.lock().usdc.entry(user.to_string()).or_default() += amount;
            info!("Faucet credited {} USDC subunits to {}", amount, user);
        } else {
            let (user, params) = decode_market_order(payload)?;
            self.apply_order(&user.to_string(), &params)?;
        }

        let hash = format!("0x{}", uuid::Uuid::new_v4().simple());
        self.lock().confirmed.insert(hash.clone());
        Ok(PendingTransaction { hash })
    }

    fn apply_order(&self, user: &str, params: &MarketOrderParams) -> ClientResult<()> {
        let mut state = self.lock();
        let balance = state.usdc.get(user).copied().unwrap_or(0);

        if params.is_increase && params.collateral_delta > balance {
            return Err(ClientError::Malformed("EINSUFFICIENT_COLLATERAL".to_string()));
        }

        let positions = state.positions.entry(user.to_string()).or_default();
        let existing = positions
            .iter_mut()
            .position(|p| p.pair == params.pair && p.is_long == params.is_long);

        let balance_change: i128 = if params.is_increase {
            match existing {
                Some(i) => {
                    positions[i].size += params.size_delta;
                    positions[i].collateral += params.collateral_delta;
                }
                None => positions.push(VenuePosition {
                    pair: params.pair.clone(),
                    size: params.size_delta,
                    collateral: params.collateral_delta,
                    is_long: params.is_long,
                }),
            }
            -(params.collateral_delta as i128)
        } else {
            let i = existing.ok_or_else(|| ClientError::Malformed(format!("{} position not found", params.pair)))?;
            let released = params.collateral_delta.min(positions[i].collateral);
            positions[i].size = positions[i].size.saturating_sub(params.size_delta);
            positions[i].collateral -= released;
            if positions[i].size == 0 {
                positions.remove(i);
            }
            released as i128
        };

        let updated = (balance as i128 + balance_change).max(0) as u64;
        state.usdc.insert(user.to_string(), updated);
        debug!("Mock order settled for {}: {:?}", user, params);
        Ok(())
    }
}

#[async_trait]
impl NodeReader for MockVenue {
    async fn coin_balance(&self, address: &str, coin_type: &str) -> ClientResult<u64> {
        let mut state = self.lock();
        Self::check_reads(&state)?;
        state.balance_reads += 1;

        let address = key(address);
        let balance = if coin_type == APTOS_COIN_TYPE {
            state.apt.get(&address).copied()
        } else if coin_type == self.payloads.usdc_coin_type() {
            state.usdc.get(&address).copied()
        } else {
            None
        };
        Ok(balance.unwrap_or(0))
    }

    async fn wait_for_transaction(&self, hash: &str) -> ClientResult<TransactionOutcome> {
        if !self.lock().confirmed.contains(hash) {
            return Err(ClientError::Malformed(format!("unknown transaction {}", hash)));
        }
        Ok(TransactionOutcome {
            hash: hash.to_string(),
            success: true,
            vm_status: "Executed successfully".to_string(),
            version: None,
        })
    }
}

#[async_trait]
impl PerpsVenue for MockVenue {
    async fn usdc_balance(&self, address: &str) -> ClientResult<u64> {
        let coin_type = self.payloads.usdc_coin_type().to_string();
        self.coin_balance(address, &coin_type).await
    }

    async fn positions(&self, address: &str) -> ClientResult<Vec<VenuePosition>> {
        let mut state = self.lock();
        Self::check_reads(&state)?;
        state.position_reads += 1;
        Ok(state.positions.get(&key(address)).cloned().unwrap_or_default())
    }

    fn market_order_payload(&self, address: &str, params: &MarketOrderParams) -> ClientResult<EntryFunctionPayload> {
        self.payloads.market_order(address, params)
    }

    fn faucet_payload(&self, address: &str, amount: u64) -> ClientResult<EntryFunctionPayload> {
        self.payloads.faucet(address, amount)
    }

    async fn pair_price(&self, _pair: &str) -> ClientResult<Option<Decimal>> {
        Ok(Some(self.base_price))
    }

    async fn subscribe_price_feed(&self, pair: &str) -> ClientResult<mpsc::Receiver<PriceTick>> {
        let (tx, rx) = mpsc::channel(FEED_CAPACITY);
        let pair = pair.to_string();
        let mut price = self.base_price;
        let tick_interval = self.tick_interval;

        tokio::spawn(async move {
            let mut rng = StdRng::from_entropy();
            let mut interval = tokio::time::interval(tick_interval);
            loop {
                interval.tick().await;
                // +-0.1% random walk
                let bps: i64 = rng.gen_range(-10..=10);
                price += price * Decimal::new(bps, 4);
                let tick = PriceTick {
                    pair: pair.clone(),
                    price: price.round_dp(2),
                    received_at: Utc::now(),
                };
                if tx.send(tick).await.is_err() {
                    debug!("Mock price feed for {} closed", pair);
                    break;
                }
            }
        });

        Ok(rx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const USER: &str = "0x0000000000000000000000000000000000000000000000000000000000000abc";

    fn open_long(venue: &MockVenue, size: u64, collateral: u64) -> ClientResult<PendingTransaction> {
        let params = MarketOrderParams {
            pair: "BTC_USD".to_string(),
            size_delta: size,
            collateral_delta: collateral,
            is_long: true,
            is_increase: true,
        };
        let payload = venue.market_order_payload(USER, &params)?;
        venue.settle(&payload)
    }

    #[tokio::test]
    async fn opening_and_closing_moves_collateral() {
        let venue = MockVenue::new();
        venue.set_usdc_balance(USER, 20_000_000);

        let pending = open_long(&venue, 300_000_000, 5_000_000).unwrap();
        assert!(venue.wait_for_transaction(&pending.hash).await.unwrap().success);
        assert_eq!(venue.usdc_balance(USER).await.unwrap(), 15_000_000);

        // Same pair and side merges
        open_long(&venue, 300_000_000, 5_000_000).unwrap();
        let positions = venue.positions(USER).await.unwrap();
        assert_eq!(positions.len(), 1);
        assert_eq!(positions[0].size, 600_000_000);

        let close = venue.market_order_payload(USER, &MarketOrderParams::close(&positions[0])).unwrap();
        venue.settle(&close).unwrap();
        assert!(venue.positions(USER).await.unwrap().is_empty());
        assert_eq!(venue.usdc_balance(USER).await.unwrap(), 20_000_000);
    }

    #[tokio::test]
    async fn insufficient_collateral_is_rejected() {
        let venue = MockVenue::new();
        venue.set_usdc_balance(USER, 1_000_000);
        assert!(open_long(&venue, 300_000_000, 5_000_000).is_err());
        assert!(venue.positions(USER).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn faucet_credits_usdc() {
        let venue = MockVenue::new();
        let payload = venue.faucet_payload(USER, 10_000_000).unwrap();
        venue.settle(&payload).unwrap();
        assert_eq!(venue.usdc_balance(USER).await.unwrap(), 10_000_000);
    }

    #[test]
    fn unknown_hashes_are_not_confirmed() {
        let venue = MockVenue::new();
        tokio_test::assert_err!(tokio_test::block_on(venue.wait_for_transaction("0xdead")));
    }

    #[tokio::test]
    async fn failing_reads_error_out() {
        let venue = MockVenue::new();
        venue.fail_reads(true);
        assert!(venue.usdc_balance(USER).await.is_err());
        assert!(venue.positions(USER).await.is_err());
        assert_eq!(venue.balance_reads(), 0);
    }

    #[tokio::test]
    async fn price_feed_yields_ticks_for_pair() {
        let venue = MockVenue::new().with_tick_interval(Duration::from_millis(5));
        let mut feed = venue.subscribe_price_feed("BTC_USD").await.unwrap();
        let tick = feed.recv().await.unwrap();
        assert_eq!(tick.pair, "BTC_USD");
        assert!(tick.price > dec!(60000) && tick.price < dec!(80000));
    }
}
