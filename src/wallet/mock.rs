use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use tracing::info;

use crate::aptos::types::{EntryFunctionPayload, PendingTransaction};
use crate::error::WalletError;
use crate::venue::mock::MockVenue;
use crate::wallet::adapter::{AccountIdentity, WalletAdapter};
use crate::wallet::provider::ProviderInfo;

/// Paper-trading wallet. Remembers what it was asked to sign and, when
/// paired with a [`MockVenue`], settles it there.
pub struct MockWallet {
    providers: Vec<ProviderInfo>,
    venue: Option<Arc<MockVenue>>,
    account: Mutex<Option<AccountIdentity>>,
    submitted: Mutex<Vec<EntryFunctionPayload>>,
}

impl MockWallet {
    pub const DEFAULT_ADDRESS: &'static str =
        "0x00000000000000000000000000000000000000000000000000000000000a11ce";

    pub fn new(providers: Vec<ProviderInfo>) -> Self {
        Self {
            providers,
            venue: None,
            account: Mutex::new(None),
            submitted: Mutex::new(Vec::new()),
        }
    }

    pub fn with_venue(mut self, venue: Arc<MockVenue>) -> Self {
        self.venue = Some(venue);
        self
    }

    pub fn submitted(&self) -> Vec<EntryFunctionPayload> {
        self.submitted
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    fn lock_account(&self) -> std::sync::MutexGuard<'_, Option<AccountIdentity>> {
        self.account.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl WalletAdapter for MockWallet {
    fn providers(&self) -> Vec<ProviderInfo> {
        self.providers.clone()
    }

    async fn connect(&self, name: &str) -> Result<AccountIdentity, WalletError> {
        if !self.providers.iter().any(|p| p.name == name && p.is_ready()) {
            return Err(WalletError::Adapter(format!("{} is not available", name)));
        }
        let identity = AccountIdentity {
            address: Self::DEFAULT_ADDRESS.to_string(),
            public_key: format!("0x{}", "00".repeat(32)),
        };
        *self.lock_account() = Some(identity.clone());
        Ok(identity)
    }

    async fn disconnect(&self) -> Result<(), WalletError> {
        self.lock_account().take();
        Ok(())
    }

    fn account(&self) -> Option<AccountIdentity> {
        self.lock_account().clone()
    }

    async fn sign_and_submit(&self, payload: &EntryFunctionPayload) -> Result<PendingTransaction, WalletError> {
        if self.account().is_none() {
            return Err(WalletError::NotConnected);
        }

        self.submitted
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(payload.clone());

        match &self.venue {
            Some(venue) => venue.settle(payload).map_err(|e| WalletError::Adapter(e.to_string())),
            None => {
                let hash = format!("0x{}", uuid::Uuid::new_v4().simple());
                info!("MOCK submit {}: {}", payload.function, hash);
                Ok(PendingTransaction { hash })
            }
        }
    }
}
