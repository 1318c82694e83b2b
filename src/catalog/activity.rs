//! Mocked dashboard and trading-page data.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Serialize;

use crate::trading::order::TradeDirection;

/// Mock APT/USD rate for the portfolio card.
pub const APT_USD_RATE: Decimal = dec!(16.42);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TradeStatus {
    Open,
    Closed,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TradeRecord {
    pub id: u32,
    pub pair: String,
    #[serde(rename = "type")]
    pub direction: TradeDirection,
    pub entry_price: Decimal,
    pub exit_price: Option<Decimal>,
    pub amount: Decimal,
    pub profit: Decimal,
    pub date: String,
    pub status: TradeStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MockPosition {
    pub id: u32,
    pub symbol: String,
    pub entry_price: Decimal,
    pub current_price: Decimal,
    pub amount: Decimal,
    pub profit: Decimal,
    pub profit_percentage: Decimal,
    #[serde(rename = "type")]
    pub direction: TradeDirection,
}

impl MockPosition {
    pub fn is_profit(&self) -> bool {
        self.profit >= Decimal::ZERO
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Activity {
    pub id: u32,
    pub trader: String,
    pub action: String,
    pub symbol: String,
    #[serde(rename = "type")]
    pub direction: TradeDirection,
    pub price: Decimal,
    pub amount: Decimal,
    pub profit: Option<Decimal>,
    pub time: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartPoint {
    pub time: String,
    pub price: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PortfolioSummary {
    pub total_value: Decimal,
    pub daily_change: Decimal,
    pub total_profit: Decimal,
    pub profit_percentage: Decimal,
}

impl PortfolioSummary {
    /// `apt_balance` is the session's display balance, e.g. `"1.23"`.
    /// Anything unparseable counts as zero.
    pub fn from_balance(apt_balance: &str) -> Self {
        let balance = apt_balance.trim().parse::<Decimal>().unwrap_or_default();
        Self {
            total_value: (balance * APT_USD_RATE).normalize(),
            daily_change: dec!(2.5),
            total_profit: dec!(1250.32),
            profit_percentage: dec!(11.1),
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn record(
    id: u32,
    pair: &str,
    direction: TradeDirection,
    entry_price: Decimal,
    exit_price: Option<Decimal>,
    amount: Decimal,
    profit: Decimal,
    date: &str,
) -> TradeRecord {
    TradeRecord {
        id,
        pair: pair.to_string(),
        direction,
        entry_price,
        exit_price,
        amount,
        profit,
        date: date.to_string(),
        status: if exit_price.is_some() {
            TradeStatus::Closed
        } else {
            TradeStatus::Open
        },
    }
}

pub fn trading_history() -> Vec<TradeRecord> {
    use TradeDirection::*;
    vec![
        record(1, "BTC/USDT", Long, dec!(68251.25), Some(dec!(69120.45)), dec!(0.05), dec!(4.32), "2023-04-08"),
        record(2, "ETH/USDT", Long, dec!(3521.10), Some(dec!(3490.25)), dec!(0.75), dec!(-0.87), "2023-04-07"),
        record(3, "APT/USDT", Long, dec!(8.15), None, dec!(125), dec!(9.45), "2023-04-06"),
        record(4, "SOL/USDT", Short, dec!(152.75), Some(dec!(148.20)), dec!(10), dec!(2.98), "2023-04-05"),
        record(5, "BTC/USDT", Long, dec!(66450.30), Some(dec!(66900.10)), dec!(0.03), dec!(0.68), "2023-04-04"),
    ]
}

pub fn active_positions() -> Vec<MockPosition> {
    let position = |id, symbol: &str, entry, current, amount, profit, pct| MockPosition {
        id,
        symbol: symbol.to_string(),
        entry_price: entry,
        current_price: current,
        amount,
        profit,
        profit_percentage: pct,
        direction: TradeDirection::Long,
    };
    vec![
        position(1, "BTC/USDT", dec!(68251.23), dec!(69120.45), dec!(0.05), dec!(43.46), dec!(1.27)),
        position(2, "ETH/USDT", dec!(3521.10), dec!(3490.25), dec!(0.75), dec!(-23.14), dec!(-0.87)),
        position(3, "APT/USDT", dec!(8.15), dec!(8.92), dec!(125), dec!(96.25), dec!(9.45)),
    ]
}

pub fn activity_feed() -> Vec<Activity> {
    let activity = |id, trader: &str, action: &str, symbol: &str, direction, price, amount, profit, time: &str| Activity {
        id,
        trader: trader.to_string(),
        action: action.to_string(),
        symbol: symbol.to_string(),
        direction,
        price,
        amount,
        profit,
        time: time.to_string(),
    };
    use TradeDirection::*;
    vec![
        activity(1, "Crypto Wizard", "opened position", "BTC/USDT", Long, dec!(69120.45), dec!(0.025), None, "10 minutes ago"),
        activity(2, "APT Whale", "closed position", "APT/USDT", Long, dec!(8.92), dec!(250), Some(dec!(12.5)), "25 minutes ago"),
        activity(3, "MOVE Master", "opened position", "ETH/USDT", Short, dec!(3490.25), dec!(0.5), None, "45 minutes ago"),
        activity(4, "Crypto Wizard", "closed position", "SOL/USDT", Long, dec!(152.75), dec!(2), Some(dec!(-3.2)), "1 hour ago"),
    ]
}

pub fn price_chart() -> Vec<ChartPoint> {
    [
        ("12:00", dec!(8.15)),
        ("13:00", dec!(8.22)),
        ("14:00", dec!(8.19)),
        ("15:00", dec!(8.25)),
        ("16:00", dec!(8.30)),
        ("17:00", dec!(8.28)),
        ("18:00", dec!(8.35)),
        ("19:00", dec!(8.42)),
        ("20:00", dec!(8.48)),
        ("21:00", dec!(8.52)),
        ("22:00", dec!(8.58)),
        ("23:00", dec!(8.65)),
        ("00:00", dec!(8.75)),
        ("01:00", dec!(8.82)),
        ("02:00", dec!(8.92)),
    ]
    .into_iter()
    .map(|(time, price)| ChartPoint {
        time: time.to_string(),
        price,
    })
    .collect()
}

pub const TRADING_PAIRS: [&str; 5] = ["APT/USDT", "BTC/USDT", "ETH/USDT", "SOL/USDT", "AVAX/USDT"];

/// Last point of the mock chart.
pub fn current_price() -> Decimal {
    dec!(8.92)
}
