use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TraderStats {
    pub roi: Decimal,
    pub win_rate: u32,
    pub followers: u32,
    pub trades: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraderSummary {
    pub id: String,
    pub name: String,
    pub avatar: String,
    pub bio: String,
    pub stats: TraderStats,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtendedStats {
    pub avg_trade_duration: String,
    pub profit_factor: Decimal,
    pub daily_volume: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TraderProfile {
    #[serde(flatten)]
    pub summary: TraderSummary,
    pub extended: ExtendedStats,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SortKey {
    #[default]
    Roi,
    WinRate,
    Followers,
    Trades,
}

impl FromStr for SortKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "roi" => Ok(SortKey::Roi),
            "winRate" => Ok(SortKey::WinRate),
            "followers" => Ok(SortKey::Followers),
            "trades" => Ok(SortKey::Trades),
            other => Err(format!("unknown sort key: {}", other)),
        }
    }
}

fn trader(id: &str, name: &str, bio: &str, roi: Decimal, win_rate: u32, followers: u32, trades: u32) -> TraderSummary {
    TraderSummary {
        id: id.to_string(),
        name: name.to_string(),
        avatar: String::new(),
        bio: bio.to_string(),
        stats: TraderStats {
            roi,
            win_rate,
            followers,
            trades,
        },
    }
}

pub fn mock_traders() -> Vec<TraderSummary> {
    vec![
        trader(
            "1",
            "Crypto Wizard",
            "Professional crypto trader with 7 years experience. Specializing in BTC and ETH trades.",
            dec!(32.5),
            68,
            1420,
            287,
        ),
        trader(
            "2",
            "APT Whale",
            "Aptos blockchain specialist. Focus on APT and ecosystem tokens.",
            dec!(28.7),
            65,
            950,
            165,
        ),
        trader(
            "3",
            "MOVE Master",
            "Technical analysis expert focusing on MOVE programming. Building strategies with AI.",
            dec!(24.2),
            72,
            740,
            124,
        ),
        trader(
            "4",
            "AI Trader Bot",
            "AI-powered trading algorithm optimized for Aptos ecosystem. Consistent performance.",
            dec!(41.5),
            75,
            2150,
            452,
        ),
        trader(
            "5",
            "DeFi Explorer",
            "DeFi expert specializing in yield strategies and liquid staking on Aptos.",
            dec!(18.3),
            63,
            580,
            98,
        ),
        trader(
            "6",
            "Momentum Hunter",
            "Finding momentum plays before they happen. Specializing in short-term trades.",
            dec!(36.8),
            61,
            875,
            320,
        ),
    ]
}

fn extended_stats(id: &str) -> Option<ExtendedStats> {
    let (duration, factor, volume) = match id {
        "1" => ("3.2 days", dec!(2.4), "$125,000"),
        "2" => ("5.5 days", dec!(1.9), "$85,000"),
        _ => return None,
    };
    Some(ExtendedStats {
        avg_trade_duration: duration.to_string(),
        profit_factor: factor,
        daily_volume: volume.to_string(),
    })
}

/// Static trader directory behind the discovery and profile pages.
#[derive(Debug, Clone)]
pub struct Catalog {
    traders: Vec<TraderSummary>,
}

impl Default for Catalog {
    fn default() -> Self {
        Self::mock()
    }
}

impl Catalog {
    pub fn mock() -> Self {
        Self {
            traders: mock_traders(),
        }
    }

    pub fn traders(&self) -> &[TraderSummary] {
        &self.traders
    }

    pub fn trader(&self, id: &str) -> Option<&TraderSummary> {
        self.traders.iter().find(|t| t.id == id)
    }

    /// Case-insensitive name filter, best first by `sort`. Ties keep
    /// directory order.
    pub fn discover(&self, query: &str, sort: SortKey) -> Vec<TraderSummary> {
        let needle = query.to_lowercase();
        let mut found: Vec<TraderSummary> = self
            .traders
            .iter()
            .filter(|t| t.name.to_lowercase().contains(&needle))
            .cloned()
            .collect();

        match sort {
            SortKey::Roi => found.sort_by_key(|t| Reverse(t.stats.roi)),
            SortKey::WinRate => found.sort_by_key(|t| Reverse(t.stats.win_rate)),
            SortKey::Followers => found.sort_by_key(|t| Reverse(t.stats.followers)),
            SortKey::Trades => found.sort_by_key(|t| Reverse(t.stats.trades)),
        }
        found
    }

    /// Only traders with published extended stats have a profile.
    pub fn profile(&self, id: &str) -> Option<TraderProfile> {
        let summary = self.trader(id)?.clone();
        let extended = extended_stats(id)?;
        Some(TraderProfile { summary, extended })
    }

    pub fn similar_traders(&self, id: &str) -> Vec<TraderSummary> {
        ["3", "4"]
            .iter()
            .filter(|similar| **similar != id)
            .filter_map(|similar| self.trader(similar).cloned())
            .collect()
    }
}
