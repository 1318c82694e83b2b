//! Perpetuals venue the desk trades against.
//!
//! The venue owns every trading rule (leverage, matching, fees); this crate
//! only reads balances and positions, asks it for order payloads and
//! consumes its price feed.

pub mod mock;
pub mod rest;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::aptos::types::{AccountAddress, EntryFunctionPayload, MoveValue};
use crate::error::{ClientError, ClientResult};

pub use mock::MockVenue;
pub use rest::RestVenue;

pub const ORDER_MODULE: &str = "managed_trading";
pub const ORDER_FUNCTION: &str = "place_order_v3";
pub const FAUCET_MODULE: &str = "test_usdc";
pub const FAUCET_FUNCTION: &str = "faucet";

/// Open position as reported by the venue, amounts in USDC subunits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VenuePosition {
    pub pair: String,
    pub size: u64,
    pub collateral: u64,
    pub is_long: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MarketOrderParams {
    pub pair: String,
    pub size_delta: u64,
    pub collateral_delta: u64,
    pub is_long: bool,
    pub is_increase: bool,
}

impl MarketOrderParams {
    /// Market order that fully unwinds `position`.
    pub fn close(position: &VenuePosition) -> Self {
        Self {
            pair: position.pair.clone(),
            size_delta: position.size,
            collateral_delta: position.collateral,
            is_long: position.is_long,
            is_increase: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceTick {
    pub pair: String,
    pub price: Decimal,
    pub received_at: DateTime<Utc>,
}

#[async_trait]
pub trait PerpsVenue: Send + Sync {
    async fn usdc_balance(&self, address: &str) -> ClientResult<u64>;

    async fn positions(&self, address: &str) -> ClientResult<Vec<VenuePosition>>;

    fn market_order_payload(&self, address: &str, params: &MarketOrderParams) -> ClientResult<EntryFunctionPayload>;

    fn faucet_payload(&self, address: &str, amount: u64) -> ClientResult<EntryFunctionPayload>;

    /// Latest mark price, if the venue knows the pair.
    async fn pair_price(&self, pair: &str) -> ClientResult<Option<Decimal>>;

    /// Live price ticks for `pair`. The sequence is unbounded; it ends when
    /// the venue closes the stream or the receiver is dropped.
    async fn subscribe_price_feed(&self, pair: &str) -> ClientResult<mpsc::Receiver<PriceTick>>;
}

/// Builds the entry-function payloads of the venue's trading contract.
#[derive(Debug, Clone)]
pub struct PayloadBuilder {
    contract_address: String,
    usdc_coin_type: String,
}

impl PayloadBuilder {
    pub fn new(contract_address: impl Into<String>, usdc_coin_type: impl Into<String>) -> Self {
        Self {
            contract_address: contract_address.into(),
            usdc_coin_type: usdc_coin_type.into(),
        }
    }

    pub fn usdc_coin_type(&self) -> &str {
        &self.usdc_coin_type
    }

    pub fn pair_type(&self, pair: &str) -> String {
        format!("{}::pair_types::{}", self.contract_address, pair)
    }

    pub fn market_order(&self, address: &str, params: &MarketOrderParams) -> ClientResult<EntryFunctionPayload> {
        let user: AccountAddress = address.parse()?;
        // Market orders accept any fill price in the trade's direction
        let acceptable_price = if params.is_long == params.is_increase { u64::MAX } else { 1 };

        Ok(EntryFunctionPayload {
            function: format!("{}::{}::{}", self.contract_address, ORDER_MODULE, ORDER_FUNCTION),
            type_arguments: vec![self.pair_type(&params.pair), self.usdc_coin_type.clone()],
            arguments: vec![
                MoveValue::Address(user),
                MoveValue::U64(params.size_delta),
                MoveValue::U64(params.collateral_delta),
                MoveValue::U64(acceptable_price),
                MoveValue::Bool(params.is_long),
                MoveValue::Bool(params.is_increase),
                MoveValue::Bool(true), // is_market
                MoveValue::U64(0),     // stop loss
                MoveValue::U64(0),     // take profit
                MoveValue::Bool(params.is_long),
            ],
        })
    }

    pub fn faucet(&self, address: &str, amount: u64) -> ClientResult<EntryFunctionPayload> {
        let user: AccountAddress = address.parse()?;
        Ok(EntryFunctionPayload {
            function: format!("{}::{}::{}", self.contract_address, FAUCET_MODULE, FAUCET_FUNCTION),
            type_arguments: vec![],
            arguments: vec![MoveValue::Address(user), MoveValue::U64(amount)],
        })
    }
}

/// Reads a market order payload produced by [`PayloadBuilder::market_order`].
pub fn decode_market_order(payload: &EntryFunctionPayload) -> ClientResult<(AccountAddress, MarketOrderParams)> {
    let malformed = || ClientError::Malformed(format!("not a market order: {}", payload.function));

    if payload.module_and_function() != Some((ORDER_MODULE, ORDER_FUNCTION)) {
        return Err(malformed());
    }

    let pair = payload
        .type_arguments
        .first()
        .and_then(|t| t.rsplit("::").next())
        .ok_or_else(malformed)?
        .to_string();
    let arg = |i: usize| payload.arguments.get(i).ok_or_else(malformed);

    let user = arg(0)?.as_address().ok_or_else(malformed)?;
    let params = MarketOrderParams {
        pair,
        size_delta: arg(1)?.as_u64().ok_or_else(malformed)?,
        collateral_delta: arg(2)?.as_u64().ok_or_else(malformed)?,
        is_long: arg(4)?.as_bool().ok_or_else(malformed)?,
        is_increase: arg(5)?.as_bool().ok_or_else(malformed)?,
    };
    Ok((user, params))
}
