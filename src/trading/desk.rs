use anyhow::{anyhow, bail, Result};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::aptos::client::NodeReader;
use crate::aptos::types::{EntryFunctionPayload, PendingTransaction, USDC_DECIMALS};
use crate::error::ClientResult;
use crate::metrics::Metrics;
use crate::trading::order::{validate_market_order, OrderLimits, TradeDirection};
use crate::utils::config::Config;
use crate::utils::format::{format_number, from_subunits};
use crate::venue::{MarketOrderParams, PerpsVenue, VenuePosition};
use crate::wallet::session::WalletManager;

/// 10 USDC
pub const FAUCET_AMOUNT: u64 = 10_000_000;

#[derive(Debug, Clone)]
pub struct DeskSettings {
    pub pair: String,
    pub limits: OrderLimits,
    pub post_order_refresh_attempts: u32,
    pub post_order_refresh_delay: Duration,
    pub post_close_refresh_delay: Duration,
}

impl From<&Config> for DeskSettings {
    fn from(config: &Config) -> Self {
        Self {
            pair: config.venue.pair.clone(),
            limits: OrderLimits::from(&config.venue),
            post_order_refresh_attempts: config.session.post_order_refresh_attempts,
            post_order_refresh_delay: Duration::from_millis(config.session.post_order_refresh_delay_ms),
            post_close_refresh_delay: Duration::from_millis(config.session.post_close_refresh_delay_ms),
        }
    }
}

/// What the trading view shows. Overwritten by each refresh.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DeskState {
    pub positions: Vec<VenuePosition>,
    /// USDC subunits.
    pub usdc_balance: u64,
    pub status: String,
    pub price: Option<Decimal>,
    pub last_price_update: Option<DateTime<Utc>>,
    pub loading: bool,
}

impl DeskState {
    pub fn usdc_balance_display(&self) -> String {
        format_number(from_subunits(self.usdc_balance, USDC_DECIMALS))
    }
}

pub struct TradingDesk {
    venue: Arc<dyn PerpsVenue>,
    wallet: Arc<WalletManager>,
    node: Arc<dyn NodeReader>,
    settings: DeskSettings,
    metrics: Metrics,
    state: RwLock<DeskState>,
}

impl TradingDesk {
    pub fn new(
        venue: Arc<dyn PerpsVenue>,
        wallet: Arc<WalletManager>,
        node: Arc<dyn NodeReader>,
        settings: DeskSettings,
        metrics: Metrics,
    ) -> Self {
        Self {
            venue,
            wallet,
            node,
            settings,
            metrics,
            state: RwLock::new(DeskState::default()),
        }
    }

    pub fn wallet(&self) -> &Arc<WalletManager> {
        &self.wallet
    }

    pub fn pair(&self) -> &str {
        &self.settings.pair
    }

    pub async fn snapshot(&self) -> DeskState {
        self.state.read().await.clone()
    }

    async fn set_status(&self, status: impl Into<String>) {
        let status = status.into();
        debug!("Desk status: {}", status);
        self.state.write().await.status = status;
    }

    fn address(&self) -> Option<String> {
        let session = self.wallet.session();
        session.address.filter(|_| session.connected)
    }

    /// Re-reads the USDC balance, then the open positions. A balance
    /// failure sets the status line and skips the positions read; either
    /// failure leaves the previous values in place.
    pub async fn load_data(&self) -> ClientResult<()> {
        let Some(address) = self.address() else {
            debug!("Skipping refresh: no connected account");
            return Ok(());
        };

        match self.venue.usdc_balance(&address).await {
            Ok(balance) => self.state.write().await.usdc_balance = balance,
            Err(e) => {
                error!("Error in load_data: {}", e);
                self.set_status("Failed to load account data").await;
                return Err(e);
            }
        }

        debug!("Fetching positions for address: {}", address);
        match self.venue.positions(&address).await {
            Ok(positions) => {
                self.state.write().await.positions = positions;
                Ok(())
            }
            Err(e) => {
                error!("Position loading error: {}", e);
                Err(e)
            }
        }
    }

    pub async fn refresh_price(&self) -> ClientResult<Option<Decimal>> {
        let price = self.venue.pair_price(&self.settings.pair).await?;
        if let Some(price) = price {
            let mut state = self.state.write().await;
            state.price = Some(price);
            state.last_price_update = Some(Utc::now());
        }
        Ok(price)
    }

    /// Signs and submits through the wallet, then blocks this call path until
    /// the node reports the transaction committed.
    async fn send_transaction(&self, payload: &EntryFunctionPayload) -> Result<PendingTransaction> {
        let pending = self.wallet.sign_transaction(payload).await?;
        self.metrics.orders_submitted.inc();
        info!("Transaction hash: {}", pending.hash);

        let outcome = self.node.wait_for_transaction(&pending.hash).await?;
        if !outcome.success {
            bail!("Transaction {} failed: {}", outcome.hash, outcome.vm_status);
        }
        Ok(pending)
    }

    async fn set_loading(&self, loading: bool) {
        self.state.write().await.loading = loading;
    }

    pub async fn place_order(&self, direction: TradeDirection, size: &str, collateral: &str) -> Result<PendingTransaction> {
        let Some(address) = self.address() else {
            self.set_status("Please connect your wallet first").await;
            bail!("wallet not connected");
        };

        let balance = self.state.read().await.usdc_balance;
        let params = match validate_market_order(
            &self.settings.pair,
            direction,
            size,
            collateral,
            &self.settings.limits,
            balance,
        ) {
            Ok(params) => params,
            Err(e) => {
                warn!("Order rejected locally: {}", e);
                self.metrics.orders_rejected.inc();
                self.set_status(e.to_string()).await;
                return Err(e.into());
            }
        };

        self.set_loading(true).await;
        self.set_status(format!("Placing {} order...", direction)).await;

        let result = self.submit_order(&address, &params).await;
        match &result {
            Ok(_) => self.set_status("Position opened successfully!").await,
            Err(e) => {
                error!("Error placing order: {}", e);
                self.set_status(e.to_string()).await;
            }
        }
        self.set_loading(false).await;
        result
    }

    async fn submit_order(&self, address: &str, params: &MarketOrderParams) -> Result<PendingTransaction> {
        let payload = self.venue.market_order_payload(address, params)?;
        info!("Submitting order...");
        let pending = self.send_transaction(&payload).await?;
        self.set_status("Order placed! Waiting for confirmation...").await;

        // Positions can lag the committed transaction
        for attempt in 1..=self.settings.post_order_refresh_attempts {
            tokio::time::sleep(self.settings.post_order_refresh_delay).await;
            if let Err(e) = self.load_data().await {
                warn!("Refresh after order failed: {}", e);
            }
            debug!("Checking positions attempt {}", attempt);
        }

        Ok(pending)
    }

    pub async fn close_position(&self, position: &VenuePosition) -> Result<PendingTransaction> {
        let Some(address) = self.address() else {
            bail!("wallet not connected");
        };

        self.set_loading(true).await;
        self.set_status("Closing position...").await;

        let result = async {
            let payload = self
                .venue
                .market_order_payload(&address, &MarketOrderParams::close(position))?;
            let pending = self.send_transaction(&payload).await?;
            info!("Close position transaction: {}", pending.hash);
            Ok::<_, anyhow::Error>(pending)
        }
        .await;

        match &result {
            Ok(_) => {
                self.set_status("Position closed successfully!").await;
                tokio::time::sleep(self.settings.post_close_refresh_delay).await;
                if let Err(e) = self.load_data().await {
                    warn!("Refresh after close failed: {}", e);
                }
            }
            Err(e) => {
                error!("Error closing position: {}", e);
                self.set_status("Failed to close position").await;
            }
        }
        self.set_loading(false).await;
        result
    }

    /// Open position on `pair` in `direction`, if any.
    pub async fn find_position(&self, pair: &str, direction: TradeDirection) -> Option<VenuePosition> {
        self.state
            .read()
            .await
            .positions
            .iter()
            .find(|p| p.pair == pair && p.is_long == direction.is_long())
            .cloned()
    }

    pub async fn claim_test_usdc(&self) -> Result<PendingTransaction> {
        let address = self
            .address()
            .ok_or_else(|| anyhow!("Please connect your wallet first"))?;

        self.set_loading(true).await;
        let result = async {
            let payload = self.venue.faucet_payload(&address, FAUCET_AMOUNT)?;
            self.send_transaction(&payload).await
        }
        .await;

        match &result {
            Ok(_) => {
                self.set_status("Claimed 10 testnet USDC").await;
                if let Err(e) = self.load_data().await {
                    warn!("Refresh after faucet failed: {}", e);
                }
            }
            Err(e) => {
                error!("Error requesting test USDC: {}", e);
                self.set_status("Failed to claim testnet USDC").await;
            }
        }
        self.set_loading(false).await;
        result
    }

    /// Follows the venue's live price for the desk's pair until the feed
    /// ends.
    pub fn spawn_price_feed(self: Arc<Self>) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut feed = match self.venue.subscribe_price_feed(&self.settings.pair).await {
                Ok(feed) => feed,
                Err(e) => {
                    error!("Initialization error: {}", e);
                    self.set_status("Failed to initialize trading interface").await;
                    return;
                }
            };

            while let Some(tick) = feed.recv().await {
                let mut state = self.state.write().await;
                state.price = Some(tick.price);
                state.last_price_update = Some(tick.received_at);
            }
            info!("Price feed for {} closed", self.settings.pair);
        })
    }
}
