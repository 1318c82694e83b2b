//! Connected-wallet state shared with everything that displays or trades.
//!
//! `WalletManager` owns the adapter and the current [`WalletSession`].
//! Readers get snapshots from a `watch` channel; user-facing messages go
//! out on a `broadcast` channel.

use serde::Serialize;
use std::sync::Arc;
use tokio::sync::{broadcast, watch};
use tracing::{debug, error, info};

use crate::aptos::client::NodeReader;
use crate::aptos::types::{EntryFunctionPayload, PendingTransaction, APTOS_COIN_TYPE, APT_DECIMALS};
use crate::error::WalletError;
use crate::utils::format::{format_balance, format_balance_detail};
use crate::wallet::adapter::{AccountIdentity, WalletAdapter};
use crate::wallet::provider::WalletKind;
use crate::wallet::resolver::resolve;

const NOTIFICATION_CAPACITY: usize = 32;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WalletSession {
    pub connected: bool,
    pub address: Option<String>,
    /// APT balance, two fraction digits.
    pub balance: String,
    pub kind: Option<WalletKind>,
}

impl Default for WalletSession {
    fn default() -> Self {
        Self {
            connected: false,
            address: None,
            balance: "0".to_string(),
            kind: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum NotificationLevel {
    Info,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub title: String,
    pub description: String,
    pub level: NotificationLevel,
}

impl Notification {
    fn info(title: &str, description: impl Into<String>) -> Self {
        Self {
            title: title.to_string(),
            description: description.into(),
            level: NotificationLevel::Info,
        }
    }

    fn error(title: &str, description: impl Into<String>) -> Self {
        Self {
            title: title.to_string(),
            description: description.into(),
            level: NotificationLevel::Error,
        }
    }
}

/// Account page data. `balance` is `None` until a read succeeds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccountInfo {
    pub address: String,
    pub public_key: String,
    /// APT balance, four fraction digits.
    pub balance: Option<String>,
}

impl AccountInfo {
    pub fn balance_label(&self) -> String {
        match &self.balance {
            Some(balance) => format!("{} APT", balance),
            None => "Loading...".to_string(),
        }
    }
}

pub struct WalletManager {
    adapter: Arc<dyn WalletAdapter>,
    node: Arc<dyn NodeReader>,
    session: watch::Sender<WalletSession>,
    notifications: broadcast::Sender<Notification>,
}

impl WalletManager {
    pub fn new(adapter: Arc<dyn WalletAdapter>, node: Arc<dyn NodeReader>) -> Self {
        let (session, _) = watch::channel(WalletSession::default());
        let (notifications, _) = broadcast::channel(NOTIFICATION_CAPACITY);
        Self {
            adapter,
            node,
            session,
            notifications,
        }
    }

    pub fn session(&self) -> WalletSession {
        self.session.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<WalletSession> {
        self.session.subscribe()
    }

    pub fn notifications(&self) -> broadcast::Receiver<Notification> {
        self.notifications.subscribe()
    }

    fn notify(&self, notification: Notification) {
        // No subscribers is fine
        let _ = self.notifications.send(notification);
    }

    pub async fn connect_wallet(&self, kind: WalletKind) -> Result<(), WalletError> {
        self.session.send_modify(|s| s.kind = Some(kind));

        let providers = self.adapter.providers();
        let connected = match resolve(kind, &providers) {
            Ok(provider) => {
                info!("Attempting to connect to {}...", provider.name);
                self.adapter
                    .connect(&provider.name)
                    .await
                    .map(|identity| (provider.name.clone(), identity))
            }
            Err(e) => Err(e),
        };

        self.finish_connect(connected).await
    }

    /// Connects to whichever provider the adapter lists first, ready or
    /// not. With no providers nothing happens and `Ok(None)` comes back.
    pub async fn connect_first_available(&self) -> Result<Option<String>, WalletError> {
        let Some(provider) = self.adapter.providers().into_iter().next() else {
            debug!("No wallet providers to connect to");
            return Ok(None);
        };

        let kind = provider.name.parse::<WalletKind>().unwrap_or(WalletKind::Other);
        self.session.send_modify(|s| s.kind = Some(kind));
        info!("Attempting to connect to {}...", provider.name);

        let connected = self
            .adapter
            .connect(&provider.name)
            .await
            .map(|identity| (provider.name.clone(), identity));
        self.finish_connect(connected).await?;
        Ok(Some(provider.name))
    }

    async fn finish_connect(&self, connected: Result<(String, AccountIdentity), WalletError>) -> Result<(), WalletError> {
        match connected {
            Ok((name, identity)) => {
                self.session.send_modify(|s| {
                    s.connected = true;
                    s.address = Some(identity.address.clone());
                });
                self.notify(Notification::info(
                    "Wallet Connected",
                    format!("Successfully connected to {} wallet", name),
                ));
                self.refresh_balance().await;
                Ok(())
            }
            Err(e) => {
                error!("Failed to connect wallet: {}", e);
                self.session.send_modify(|s| s.kind = None);
                self.notify(Notification::error("Connection Failed", e.to_string()));
                Err(e)
            }
        }
    }

    /// Re-reads the APT balance for the connected address. Any failure, or
    /// no address at all, resets the displayed balance to "0". A result for
    /// an address that is no longer connected is dropped.
    pub async fn refresh_balance(&self) {
        let address = self.session.borrow().address.clone();

        let balance = match &address {
            Some(address) => match self.node.coin_balance(address, APTOS_COIN_TYPE).await {
                Ok(octas) => format_balance(octas, APT_DECIMALS),
                Err(e) => {
                    error!("Failed to fetch balance: {}", e);
                    "0".to_string()
                }
            },
            None => "0".to_string(),
        };

        self.session.send_if_modified(|s| {
            if s.address != address {
                debug!("Session changed during balance read, dropping result");
                return false;
            }
            s.balance = balance;
            true
        });
    }

    /// Address plus a four-digit balance for the account page. `None` when
    /// no wallet is connected; a failed read leaves the balance unset.
    pub async fn account_info(&self) -> Option<AccountInfo> {
        let address = self.session.borrow().address.clone()?;
        let public_key = self.adapter.account().map(|a| a.public_key).unwrap_or_default();
        let balance = match self.node.coin_balance(&address, APTOS_COIN_TYPE).await {
            Ok(octas) => Some(format_balance_detail(octas, APT_DECIMALS)),
            Err(e) => {
                error!("Error fetching balance: {}", e);
                None
            }
        };
        Some(AccountInfo {
            address,
            public_key,
            balance,
        })
    }

    pub async fn disconnect_wallet(&self) {
        if let Err(e) = self.adapter.disconnect().await {
            error!("Adapter disconnect failed: {}", e);
        }
        self.session.send_replace(WalletSession::default());
        self.notify(Notification::info(
            "Wallet Disconnected",
            "Your wallet has been disconnected.",
        ));
    }

    pub async fn sign_transaction(&self, payload: &EntryFunctionPayload) -> Result<PendingTransaction, WalletError> {
        if !self.session.borrow().connected {
            return Err(WalletError::NotConnected);
        }

        self.adapter.sign_and_submit(payload).await.map_err(|e| {
            error!("Failed to sign transaction: {}", e);
            e
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::venue::mock::MockVenue;
    use crate::wallet::mock::MockWallet;
    use crate::aptos::types::TransactionOutcome;
    use crate::error::{ClientError, ClientResult};
    use crate::wallet::provider::{ProviderInfo, ReadyState};
    use tokio::sync::Notify;

    fn manager(providers: Vec<ProviderInfo>, apt_octas: u64) -> (WalletManager, Arc<MockWallet>) {
        let venue = Arc::new(MockVenue::new());
        venue.set_apt_balance(MockWallet::DEFAULT_ADDRESS, apt_octas);
        let wallet = Arc::new(MockWallet::new(providers).with_venue(venue.clone()));
        (WalletManager::new(wallet.clone(), venue), wallet)
    }

    #[tokio::test]
    async fn connect_sets_address_and_balance() {
        let (manager, _) = manager(vec![ProviderInfo::new("Petra", ReadyState::Installed)], 123_456_789);
        let mut notes = manager.notifications();

        manager.connect_wallet(WalletKind::Petra).await.unwrap();

        let session = manager.session();
        assert!(session.connected);
        assert_eq!(session.address.as_deref(), Some(MockWallet::DEFAULT_ADDRESS));
        assert_eq!(session.balance, "1.23");
        assert_eq!(session.kind, Some(WalletKind::Petra));
        assert_eq!(notes.recv().await.unwrap().title, "Wallet Connected");
    }

    #[tokio::test]
    async fn failed_connect_resets_kind_and_reports_reason() {
        let (manager, _) = manager(vec![ProviderInfo::new("Martian", ReadyState::Loadable)], 0);
        let mut notes = manager.notifications();

        let err = manager.connect_wallet(WalletKind::Martian).await.unwrap_err();
        assert!(matches!(err, WalletError::NotReady { .. }));

        let session = manager.session();
        assert!(!session.connected);
        assert_eq!(session.kind, None);

        let note = notes.recv().await.unwrap();
        assert_eq!(note.level, NotificationLevel::Error);
        assert!(note.description.contains("not ready"));
    }

    #[tokio::test]
    async fn disconnect_clears_address_and_balance() {
        let (manager, wallet) = manager(vec![ProviderInfo::new("Petra", ReadyState::Installed)], 500_000_000);
        manager.connect_wallet(WalletKind::Petra).await.unwrap();
        assert_eq!(manager.session().balance, "5.00");

        manager.disconnect_wallet().await;

        assert_eq!(manager.session(), WalletSession::default());
        assert!(wallet.account().is_none());
    }

    #[tokio::test]
    async fn balance_failure_resets_to_zero() {
        let venue = Arc::new(MockVenue::new());
        venue.set_apt_balance(MockWallet::DEFAULT_ADDRESS, 900_000_000);
        let wallet = Arc::new(MockWallet::new(vec![ProviderInfo::new("Petra", ReadyState::Installed)]));
        let manager = WalletManager::new(wallet, venue.clone());

        manager.connect_wallet(WalletKind::Petra).await.unwrap();
        assert_eq!(manager.session().balance, "9.00");

        venue.fail_reads(true);
        manager.refresh_balance().await;
        assert_eq!(manager.session().balance, "0");
    }

    #[tokio::test]
    async fn signing_requires_connection() {
        let (manager, _) = manager(vec![ProviderInfo::new("Petra", ReadyState::Installed)], 0);
        let payload = EntryFunctionPayload {
            function: "0x1::aptos_account::transfer".to_string(),
            type_arguments: vec![],
            arguments: vec![],
        };
        assert_eq!(
            manager.sign_transaction(&payload).await.unwrap_err(),
            WalletError::NotConnected
        );
    }

    #[tokio::test]
    async fn subscribers_see_updates() {
        let (manager, _) = manager(vec![ProviderInfo::new("Petra", ReadyState::Installed)], 0);
        let mut rx = manager.subscribe();
        manager.connect_wallet(WalletKind::Petra).await.unwrap();
        assert!(rx.has_changed().unwrap());
        assert!(rx.borrow_and_update().connected);
    }

    #[tokio::test]
    async fn first_available_is_a_no_op_without_providers() {
        let (manager, _) = manager(vec![], 0);
        assert_eq!(manager.connect_first_available().await.unwrap(), None);
        assert_eq!(manager.session(), WalletSession::default());
    }

    #[tokio::test]
    async fn first_available_takes_the_first_listed_provider() {
        let providers = vec![
            ProviderInfo::new("Petra", ReadyState::Installed),
            ProviderInfo::new("Martian", ReadyState::Installed),
        ];
        let (manager, _) = manager(providers, 300_000_000);

        let name = manager.connect_first_available().await.unwrap();
        assert_eq!(name.as_deref(), Some("Petra"));

        let session = manager.session();
        assert!(session.connected);
        assert_eq!(session.kind, Some(WalletKind::Petra));
        assert_eq!(session.balance, "3.00");
    }

    #[tokio::test]
    async fn first_available_reports_adapter_refusal() {
        let providers = vec![
            ProviderInfo::new("Martian", ReadyState::NotDetected),
            ProviderInfo::new("Petra", ReadyState::Installed),
        ];
        let (manager, _) = manager(providers, 0);

        assert!(manager.connect_first_available().await.is_err());
        assert!(!manager.session().connected);
        assert_eq!(manager.session().kind, None);
    }

    #[tokio::test]
    async fn account_info_shows_four_digits_or_loading() {
        let venue = Arc::new(MockVenue::new());
        venue.set_apt_balance(MockWallet::DEFAULT_ADDRESS, 123_456_789);
        let wallet = Arc::new(MockWallet::new(vec![ProviderInfo::new("Petra", ReadyState::Installed)]));
        let manager = WalletManager::new(wallet, venue.clone());
        assert!(manager.account_info().await.is_none());

        manager.connect_wallet(WalletKind::Petra).await.unwrap();
        let info = manager.account_info().await.unwrap();
        assert_eq!(info.address, MockWallet::DEFAULT_ADDRESS);
        assert_eq!(info.balance.as_deref(), Some("1.2346"));
        assert_eq!(info.balance_label(), "1.2346 APT");

        venue.fail_reads(true);
        let info = manager.account_info().await.unwrap();
        assert_eq!(info.balance, None);
        assert_eq!(info.balance_label(), "Loading...");
    }

    /// Holds balance reads until released.
    struct GatedNode {
        entered: Notify,
        release: Notify,
    }

    #[async_trait::async_trait]
    impl NodeReader for GatedNode {
        async fn coin_balance(&self, _address: &str, _coin_type: &str) -> ClientResult<u64> {
            self.entered.notify_one();
            self.release.notified().await;
            Ok(700_000_000)
        }

        async fn wait_for_transaction(&self, hash: &str) -> ClientResult<TransactionOutcome> {
            Err(ClientError::Malformed(format!("unknown transaction {}", hash)))
        }
    }

    #[tokio::test]
    async fn disconnect_during_balance_read_keeps_zero() {
        let node = Arc::new(GatedNode {
            entered: Notify::new(),
            release: Notify::new(),
        });
        let wallet = Arc::new(MockWallet::new(vec![ProviderInfo::new("Petra", ReadyState::Installed)]));
        let manager = Arc::new(WalletManager::new(wallet, node.clone()));

        let connecting = tokio::spawn({
            let manager = manager.clone();
            async move { manager.connect_wallet(WalletKind::Petra).await }
        });
        node.entered.notified().await;

        manager.disconnect_wallet().await;
        node.release.notify_one();
        connecting.await.unwrap().unwrap();

        let session = manager.session();
        assert!(!session.connected);
        assert_eq!(session.address, None);
        assert_eq!(session.balance, "0");
    }
}
