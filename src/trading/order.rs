use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::aptos::types::USDC_DECIMALS;
use crate::error::OrderError;
use crate::utils::config::VenueConfig;
use crate::utils::format::to_subunits;
use crate::venue::MarketOrderParams;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TradeDirection {
    Long,
    Short,
}

impl TradeDirection {
    pub fn is_long(&self) -> bool {
        matches!(self, TradeDirection::Long)
    }
}

impl fmt::Display for TradeDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TradeDirection::Long => write!(f, "long"),
            TradeDirection::Short => write!(f, "short"),
        }
    }
}

/// Venue minimums, checked before anything is signed.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderLimits {
    pub min_size: Decimal,
    pub min_collateral: Decimal,
    pub decimals: u32,
}

impl From<&VenueConfig> for OrderLimits {
    fn from(config: &VenueConfig) -> Self {
        Self {
            min_size: config.min_position_size,
            min_collateral: config.min_collateral,
            decimals: USDC_DECIMALS,
        }
    }
}

impl Default for OrderLimits {
    fn default() -> Self {
        Self::from(&VenueConfig::default())
    }
}

fn parse_amount(input: &str) -> Result<Decimal, OrderError> {
    input
        .trim()
        .parse::<Decimal>()
        .map_err(|_| OrderError::InvalidAmount(input.to_string()))
}

/// Turns user input into an opening market order, or explains why not.
/// Runs entirely locally; `usdc_balance` is the last balance read, in
/// subunits.
pub fn validate_market_order(
    pair: &str,
    direction: TradeDirection,
    size_input: &str,
    collateral_input: &str,
    limits: &OrderLimits,
    usdc_balance: u64,
) -> Result<MarketOrderParams, OrderError> {
    if size_input.trim().is_empty() || collateral_input.trim().is_empty() {
        return Err(OrderError::MissingInput);
    }

    let size = parse_amount(size_input)?;
    let collateral = parse_amount(collateral_input)?;

    if size < limits.min_size {
        return Err(OrderError::BelowMinimumSize {
            minimum: limits.min_size,
        });
    }
    if collateral < limits.min_collateral {
        return Err(OrderError::BelowMinimumCollateral {
            minimum: limits.min_collateral,
        });
    }

    let size_delta =
        to_subunits(size, limits.decimals).ok_or_else(|| OrderError::InvalidAmount(size_input.to_string()))?;
    let collateral_delta = to_subunits(collateral, limits.decimals)
        .ok_or_else(|| OrderError::InvalidAmount(collateral_input.to_string()))?;

    if collateral_delta > usdc_balance {
        return Err(OrderError::InsufficientBalance);
    }

    Ok(MarketOrderParams {
        pair: pair.to_string(),
        size_delta,
        collateral_delta,
        is_long: direction.is_long(),
        is_increase: true,
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderSide {
    Buy,
    Sell,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderType {
    Market,
    Limit,
}

/// Spot order from the simulated trading page; built for one submit and
/// then dropped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub side: OrderSide,
    pub order_type: OrderType,
    pub amount: Decimal,
    pub price: Option<Decimal>,
}

impl Order {
    /// Confirmation line, e.g. `BUY 10 APT at market price`.
    pub fn describe(&self, pair: &str) -> String {
        let base = pair.split('/').next().unwrap_or(pair);
        let side = match self.side {
            OrderSide::Buy => "BUY",
            OrderSide::Sell => "SELL",
        };
        let at = match (self.order_type, self.price) {
            (OrderType::Limit, Some(price)) => format!("${}", price),
            _ => "market price".to_string(),
        };
        format!("{} {} {} at {}", side, self.amount, base, at)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    const BALANCE: u64 = 50_000_000;

    fn validate(size: &str, collateral: &str) -> Result<MarketOrderParams, OrderError> {
        validate_market_order("BTC_USD", TradeDirection::Long, size, collateral, &OrderLimits::default(), BALANCE)
    }

    #[test]
    fn accepts_order_at_minimums() {
        let params = validate("300", "5").unwrap();
        assert_eq!(params.size_delta, 300_000_000);
        assert_eq!(params.collateral_delta, 5_000_000);
        assert!(params.is_long && params.is_increase);
    }

    #[test]
    fn rejects_small_size() {
        assert_eq!(
            validate("299.99", "10"),
            Err(OrderError::BelowMinimumSize { minimum: dec!(300) })
        );
    }

    #[test]
    fn rejects_small_collateral() {
        let err = validate("500", "4.5").unwrap_err();
        assert_eq!(err, OrderError::BelowMinimumCollateral { minimum: dec!(5) });
        assert_eq!(err.to_string(), "Minimum collateral is 5 USDC");
    }

    #[test]
    fn rejects_missing_and_garbage_input() {
        assert_eq!(validate("", "5"), Err(OrderError::MissingInput));
        assert_eq!(validate("300", "  "), Err(OrderError::MissingInput));
        assert!(matches!(validate("abc", "5"), Err(OrderError::InvalidAmount(_))));
    }

    #[test]
    fn oversized_amounts_are_rejected_not_panicking() {
        assert_eq!(
            validate("100000000000000000000000", "5"),
            Err(OrderError::InvalidAmount("100000000000000000000000".to_string()))
        );
        assert_eq!(
            validate("300", "100000000000000000000000"),
            Err(OrderError::InvalidAmount("100000000000000000000000".to_string()))
        );
    }

    #[test]
    fn rejects_collateral_above_balance() {
        assert_eq!(validate("1000", "50.000001"), Err(OrderError::InsufficientBalance));
        assert!(validate("1000", "50").is_ok());
    }

    #[test]
    fn short_direction_sets_flag() {
        let params = validate_market_order(
            "BTC_USD",
            TradeDirection::Short,
            "300",
            "5",
            &OrderLimits::default(),
            BALANCE,
        )
        .unwrap();
        assert!(!params.is_long);
    }

    #[test]
    fn describes_spot_orders() {
        let market = Order {
            side: OrderSide::Buy,
            order_type: OrderType::Market,
            amount: dec!(10),
            price: None,
        };
        assert_eq!(market.describe("APT/USDT"), "BUY 10 APT at market price");

        let limit = Order {
            side: OrderSide::Sell,
            order_type: OrderType::Limit,
            amount: dec!(2.5),
            price: Some(dec!(8.90)),
        };
        assert_eq!(limit.describe("APT/USDT"), "SELL 2.5 APT at $8.90");
    }
}
