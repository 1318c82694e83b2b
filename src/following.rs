//! Locally cached list of followed traders.
//!
//! The cache file is a JSON object holding a single key,
//! [`FOLLOWING_CACHE_KEY`], whose value is the connected user's record.

use anyhow::{anyhow, Result};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{debug, info, warn};

use crate::catalog::TraderSummary;

pub const FOLLOWING_CACHE_KEY: &str = "following_cache_key";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FollowedStats {
    pub roi: Decimal,
    pub followers: u32,
}

/// Which markets a follow mirrors. Spot only unless changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CopySettings {
    pub spot: bool,
    pub margin: bool,
    pub futures: bool,
}

impl Default for CopySettings {
    fn default() -> Self {
        Self {
            spot: true,
            margin: false,
            futures: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CopyMarket {
    Spot,
    Margin,
    Futures,
}

impl CopySettings {
    pub fn toggle(&mut self, market: CopyMarket) {
        let flag = match market {
            CopyMarket::Spot => &mut self.spot,
            CopyMarket::Margin => &mut self.margin,
            CopyMarket::Futures => &mut self.futures,
        };
        *flag = !*flag;
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FollowedTrader {
    pub id: String,
    pub name: String,
    pub avatar: String,
    pub stats: FollowedStats,
    /// Share of the portfolio mirrored, in percent.
    #[serde(default, rename = "allocationPercentage", skip_serializing_if = "Option::is_none")]
    pub allocation: Option<u8>,
    #[serde(default)]
    pub settings: CopySettings,
}

impl FollowedTrader {
    pub fn from_summary(trader: &TraderSummary, allocation: u8, settings: CopySettings) -> Self {
        Self {
            id: trader.id.clone(),
            name: trader.name.clone(),
            avatar: trader.avatar.clone(),
            stats: FollowedStats {
                roi: trader.stats.roi,
                followers: trader.stats.followers,
            },
            allocation: Some(allocation),
            settings,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FollowingRecord {
    pub id: String,
    pub address: String,
    #[serde(default, deserialize_with = "following_map")]
    pub following: BTreeMap<String, FollowedTrader>,
}

// Older records were created with `following: []`.
fn following_map<'de, D>(deserializer: D) -> std::result::Result<BTreeMap<String, FollowedTrader>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Shape {
        Map(BTreeMap<String, FollowedTrader>),
        List(Vec<FollowedTrader>),
    }

    Ok(match Shape::deserialize(deserializer)? {
        Shape::Map(map) => map,
        Shape::List(list) => list.into_iter().map(|t| (t.id.clone(), t)).collect(),
    })
}

/// File-backed store. The record lock is held for the whole
/// read-modify-write of the file, so concurrent updates never overwrite
/// each other.
pub struct FollowingStore {
    path: PathBuf,
    record: Mutex<Option<FollowingRecord>>,
}

impl FollowingStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            record: Mutex::new(None),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Option<FollowingRecord>> {
        self.record.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn read_file(&self) -> Result<Map<String, Value>> {
        if !self.path.exists() {
            return Ok(Map::new());
        }
        let text = std::fs::read_to_string(&self.path)?;
        if text.trim().is_empty() {
            return Ok(Map::new());
        }
        match serde_json::from_str::<Value>(&text)? {
            Value::Object(map) => Ok(map),
            _ => Err(anyhow!("{} is not a JSON object", self.path.display())),
        }
    }

    fn write_record(&self, record: &FollowingRecord) -> Result<()> {
        let mut map = self.read_file()?;
        map.insert(FOLLOWING_CACHE_KEY.to_string(), serde_json::to_value(record)?);
        std::fs::write(&self.path, serde_json::to_string_pretty(&Value::Object(map))?)?;
        debug!("Saved following cache to {}", self.path.display());
        Ok(())
    }

    /// Loads the cached record, creating an empty one for `address` when
    /// none exists yet.
    pub fn load_or_init(&self, address: &str) -> Result<FollowingRecord> {
        let mut guard = self.lock();
        let map = self.read_file()?;
        let record = match map.get(FOLLOWING_CACHE_KEY) {
            Some(value) => {
                let record: FollowingRecord = serde_json::from_value(value.clone())?;
                if record.address != address {
                    warn!("Following cache belongs to {}, connected as {}", record.address, address);
                }
                record
            }
            None => {
                let record = FollowingRecord {
                    id: address.to_string(),
                    address: address.to_string(),
                    following: BTreeMap::new(),
                };
                self.write_record(&record)?;
                info!("Created following cache for {}", address);
                record
            }
        };

        *guard = Some(record.clone());
        Ok(record)
    }

    fn update<F>(&self, change: F) -> Result<FollowingRecord>
    where
        F: FnOnce(&mut FollowingRecord),
    {
        let mut guard = self.lock();
        let record = guard
            .as_mut()
            .ok_or_else(|| anyhow!("Following cache not loaded; connect a wallet first"))?;
        let mut updated = record.clone();
        change(&mut updated);

        self.write_record(&updated)?;
        *record = updated.clone();
        Ok(updated)
    }

    pub fn follow(&self, trader: &TraderSummary, allocation: u8, settings: CopySettings) -> Result<FollowingRecord> {
        let allocation = allocation.min(100);
        let record = self.update(|r| {
            r.following
                .insert(trader.id.clone(), FollowedTrader::from_summary(trader, allocation, settings));
        })?;
        info!("You're now following {} with {}% allocation", trader.name, allocation);
        Ok(record)
    }

    pub fn unfollow(&self, trader_id: &str) -> Result<Option<FollowedTrader>> {
        let mut removed = None;
        self.update(|r| removed = r.following.remove(trader_id))?;
        if let Some(trader) = &removed {
            info!("You have unfollowed {}.", trader.name);
        }
        Ok(removed)
    }

    /// Flips one market on an existing follow. `None` when not following.
    pub fn toggle_setting(&self, trader_id: &str, market: CopyMarket) -> Result<Option<CopySettings>> {
        let mut settings = None;
        self.update(|r| {
            if let Some(trader) = r.following.get_mut(trader_id) {
                trader.settings.toggle(market);
                settings = Some(trader.settings);
            }
        })?;
        Ok(settings)
    }

    pub fn list(&self) -> Vec<FollowedTrader> {
        self.lock()
            .as_ref()
            .map(|r| r.following.values().cloned().collect())
            .unwrap_or_default()
    }

    pub fn is_following(&self, trader_id: &str) -> bool {
        self.lock()
            .as_ref()
            .is_some_and(|r| r.following.contains_key(trader_id))
    }
}
