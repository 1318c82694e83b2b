use anyhow::{Context, Result};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::wallet::provider::WalletKind;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub aptos: AptosConfig,
    pub wallet: WalletConfig,
    pub venue: VenueConfig,
    pub session: SessionConfig,
    pub storage: StorageConfig,
    pub api: ApiConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AptosConfig {
    pub node_url: String,
    pub chain_id: u8,
    pub gas_unit_price: u64,
    pub max_gas_amount: u64,
    /// Seconds added to "now" for a transaction's expiration timestamp.
    pub expiration_secs: u64,
    /// Delay between `by_hash` lookups while waiting for confirmation.
    pub confirmation_poll_ms: u64,
}

impl Default for AptosConfig {
    fn default() -> Self {
        Self {
            node_url: "https://fullnode.testnet.aptoslabs.com/v1".to_string(),
            chain_id: 2, // Testnet chain ID
            gas_unit_price: 100,
            max_gas_amount: 10_000,
            expiration_secs: 600,
            confirmation_poll_ms: 1_000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WalletConfig {
    /// Wallet the binary asks the resolver for on startup.
    pub kind: WalletKind,
    /// Provider name the local key wallet announces.
    pub provider_name: String,
    /// Hex ed25519 private key backing the local key wallet.
    pub private_key: Option<String>,
    /// Skip `kind` and connect to the first provider listed.
    pub connect_first_available: bool,
}

impl Default for WalletConfig {
    fn default() -> Self {
        Self {
            kind: WalletKind::Petra,
            provider_name: WalletKind::Petra.adapter_name().to_string(),
            private_key: None,
            connect_first_available: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VenueMode {
    Mock,
    Rest,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VenueConfig {
    pub mode: VenueMode,
    pub api_url: String,
    pub ws_url: String,
    pub contract_address: String,
    pub usdc_coin_type: String,
    pub pair: String,
    pub min_position_size: Decimal,
    pub min_collateral: Decimal,
}

impl Default for VenueConfig {
    fn default() -> Self {
        Self {
            mode: VenueMode::Mock,
            api_url: "https://api.testnet.merkle.trade".to_string(),
            ws_url: "wss://api.testnet.merkle.trade/v1/ws".to_string(),
            contract_address: "0x5ae6789dd2fec1a9ec9cccfb3acaf12e93d432f0a3a42c92fe1a9d490b7bbc06"
                .to_string(),
            usdc_coin_type:
                "0x5ae6789dd2fec1a9ec9cccfb3acaf12e93d432f0a3a42c92fe1a9d490b7bbc06::fa_box::W_USDC"
                    .to_string(),
            pair: "BTC_USD".to_string(),
            min_position_size: dec!(300),
            min_collateral: dec!(5),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub poll_interval_secs: u64,
    /// Position reloads after an order is confirmed.
    pub post_order_refresh_attempts: u32,
    pub post_order_refresh_delay_ms: u64,
    pub post_close_refresh_delay_ms: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: 10,
            post_order_refresh_attempts: 5,
            post_order_refresh_delay_ms: 3_000,
            post_close_refresh_delay_ms: 2_000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub following_path: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            following_path: "following_cache.json".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub enabled: bool,
    pub bind_address: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            bind_address: "127.0.0.1:8080".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl Config {
    /// Layers `config.toml` (optional) and `COPYTRADE__SECTION__KEY`
    /// environment variables over the defaults.
    pub fn load() -> Result<Self> {
        dotenv::dotenv().ok();

        let settings = config::Config::builder()
            .add_source(config::File::with_name("config").required(false))
            .add_source(
                config::Environment::with_prefix("COPYTRADE")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .context("failed to read configuration sources")?;

        let mut config: Config = settings
            .try_deserialize()
            .context("failed to deserialize configuration")?;

        // Same variable name the node tooling uses
        if config.wallet.private_key.is_none() {
            config.wallet.private_key = std::env::var("APTOS_PRIVATE_KEY").ok();
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        url::Url::parse(&self.aptos.node_url)
            .with_context(|| format!("invalid aptos.node_url: {}", self.aptos.node_url))?;

        if self.venue.mode == VenueMode::Rest {
            url::Url::parse(&self.venue.api_url)
                .with_context(|| format!("invalid venue.api_url: {}", self.venue.api_url))?;
            let ws = url::Url::parse(&self.venue.ws_url)
                .with_context(|| format!("invalid venue.ws_url: {}", self.venue.ws_url))?;
            if !matches!(ws.scheme(), "ws" | "wss") {
                anyhow::bail!("venue.ws_url must use ws:// or wss://, got {}", ws.scheme());
            }
        }

        if self.session.poll_interval_secs == 0 {
            anyhow::bail!("session.poll_interval_secs must be greater than zero");
        }

        Ok(())
    }
}
