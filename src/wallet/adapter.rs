use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::aptos::types::{EntryFunctionPayload, PendingTransaction};
use crate::error::WalletError;
use crate::wallet::provider::ProviderInfo;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountIdentity {
    pub address: String,
    pub public_key: String,
}

/// Boundary to whatever holds the user's keys. Callers only ever connect,
/// disconnect, read the account and ask for a payload to be signed and
/// submitted.
#[async_trait]
pub trait WalletAdapter: Send + Sync {
    /// Providers currently detected, in detection order.
    fn providers(&self) -> Vec<ProviderInfo>;

    async fn connect(&self, name: &str) -> Result<AccountIdentity, WalletError>;

    async fn disconnect(&self) -> Result<(), WalletError>;

    fn account(&self) -> Option<AccountIdentity>;

    async fn sign_and_submit(&self, payload: &EntryFunctionPayload) -> Result<PendingTransaction, WalletError>;
}
