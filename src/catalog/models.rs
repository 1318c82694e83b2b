//! Top-models board: automated strategies ranked by their last 24h.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Serialize;

use crate::utils::format::format_count;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelSummary {
    pub id: String,
    pub name: String,
    pub performance24h: Decimal,
    pub followers: u64,
}

/// Card rendering of a model.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelCard {
    pub id: String,
    pub name: String,
    pub performance: String,
    pub positive: bool,
    pub followers: String,
}

impl ModelSummary {
    pub fn is_positive(&self) -> bool {
        self.performance24h >= Decimal::ZERO
    }

    /// Flat zero still gets a `+`.
    pub fn performance_label(&self) -> String {
        let sign = if self.is_positive() { "+" } else { "" };
        format!("{}{}%", sign, self.performance24h.normalize())
    }

    pub fn card(&self) -> ModelCard {
        ModelCard {
            id: self.id.clone(),
            name: self.name.clone(),
            performance: self.performance_label(),
            positive: self.is_positive(),
            followers: format_count(self.followers),
        }
    }
}

pub fn top_models() -> Vec<ModelSummary> {
    [
        ("1", "BTC Sentiment AI", dec!(12.5), 1234),
        ("2", "Crypto Whale Tracker", dec!(-2.3), 856),
        ("3", "APT Momentum", dec!(5.7), 2145),
        ("4", "DeFi Pulse", dec!(8.9), 1567),
    ]
    .into_iter()
    .map(|(id, name, performance24h, followers)| ModelSummary {
        id: id.to_string(),
        name: name.to_string(),
        performance24h,
        followers,
    })
    .collect()
}

pub fn model(id: &str) -> Option<ModelSummary> {
    top_models().into_iter().find(|m| m.id == id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn board_keeps_listing_order() {
        let names: Vec<_> = top_models().into_iter().map(|m| m.name).collect();
        assert_eq!(names, ["BTC Sentiment AI", "Crypto Whale Tracker", "APT Momentum", "DeFi Pulse"]);
    }

    #[test]
    fn cards_sign_performance_and_group_followers() {
        let card = model("1").unwrap().card();
        assert_eq!(card.performance, "+12.5%");
        assert_eq!(card.followers, "1,234");
        assert!(card.positive);

        let card = model("2").unwrap().card();
        assert_eq!(card.performance, "-2.3%");
        assert_eq!(card.followers, "856");
        assert!(!card.positive);
    }

    #[test]
    fn zero_performance_is_positive() {
        let flat = ModelSummary {
            performance24h: Decimal::ZERO,
            ..model("3").unwrap()
        };
        assert_eq!(flat.performance_label(), "+0%");
    }

    #[test]
    fn unknown_model_is_none() {
        assert!(model("9").is_none());
    }
}
