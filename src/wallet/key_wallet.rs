use async_trait::async_trait;
use ed25519_dalek::{Signer, SigningKey};
use std::sync::{Arc, Mutex};
use tracing::{info, warn};

use crate::aptos::client::AptosClient;
use crate::aptos::types::{
    AccountAddress, Ed25519Authenticator, EntryFunctionPayload, PendingTransaction, RawTransaction,
    SignedTransaction, TransactionPayload,
};
use crate::error::WalletError;
use crate::utils::config::AptosConfig;
use crate::wallet::adapter::{AccountIdentity, WalletAdapter};
use crate::wallet::provider::{ProviderInfo, ReadyState};

/// Wallet backed by a local ed25519 key that signs and submits through a
/// full node. It announces itself as a single installed provider.
pub struct KeyWallet {
    name: String,
    signing_key: SigningKey,
    address: AccountAddress,
    client: Arc<AptosClient>,
    account: Mutex<Option<AccountIdentity>>,
}

impl KeyWallet {
    pub fn from_hex(name: impl Into<String>, private_key: &str, client: Arc<AptosClient>) -> Result<Self, WalletError> {
        // Convert hex private key to bytes
        let private_key_hex = private_key.trim().trim_start_matches("0x");
        let private_key_bytes = hex::decode(private_key_hex)
            .map_err(|e| WalletError::Adapter(format!("Invalid private key hex: {}", e)))?;

        let key_array: [u8; 32] = private_key_bytes.as_slice().try_into().map_err(|_| {
            WalletError::Adapter(format!(
                "Private key must be 32 bytes, got {}",
                private_key_bytes.len()
            ))
        })?;

        let signing_key = SigningKey::from_bytes(&key_array);
        let address = AccountAddress::from_ed25519_public_key(signing_key.verifying_key().as_bytes());

        Ok(Self {
            name: name.into(),
            signing_key,
            address,
            client,
            account: Mutex::new(None),
        })
    }

    pub fn address(&self) -> AccountAddress {
        self.address
    }

    fn public_key_bytes(&self) -> [u8; 32] {
        self.signing_key.verifying_key().to_bytes()
    }

    fn identity(&self) -> AccountIdentity {
        AccountIdentity {
            address: self.address.to_string(),
            public_key: format!("0x{}", hex::encode(self.public_key_bytes())),
        }
    }

    pub fn build_raw_transaction(
        &self,
        payload: &EntryFunctionPayload,
        sequence_number: u64,
        config: &AptosConfig,
    ) -> Result<RawTransaction, WalletError> {
        let entry_function = payload
            .to_entry_function()
            .map_err(|e| WalletError::Adapter(e.to_string()))?;

        Ok(RawTransaction {
            sender: self.address,
            sequence_number,
            payload: TransactionPayload(entry_function),
            max_gas_amount: config.max_gas_amount,
            gas_unit_price: config.gas_unit_price,
            expiration_timestamp_secs: (chrono::Utc::now().timestamp() as u64) + config.expiration_secs,
            chain_id: config.chain_id,
        })
    }

    pub fn sign_raw_transaction(&self, raw_transaction: RawTransaction) -> Result<SignedTransaction, WalletError> {
        let message = raw_transaction
            .signing_message()
            .map_err(|e| WalletError::Adapter(e.to_string()))?;

        let signature = self.signing_key.sign(&message);

        Ok(SignedTransaction {
            raw_txn: raw_transaction,
            authenticator: Ed25519Authenticator {
                public_key: self.public_key_bytes(),
                signature: signature.to_bytes(),
            },
        })
    }

    fn lock_account(&self) -> std::sync::MutexGuard<'_, Option<AccountIdentity>> {
        self.account.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl WalletAdapter for KeyWallet {
    fn providers(&self) -> Vec<ProviderInfo> {
        vec![ProviderInfo::new(self.name.clone(), ReadyState::Installed)]
    }

    async fn connect(&self, name: &str) -> Result<AccountIdentity, WalletError> {
        if name != self.name {
            return Err(WalletError::Adapter(format!("{} is not available", name)));
        }
        let identity = self.identity();
        *self.lock_account() = Some(identity.clone());
        info!("Key wallet {} connected as {}", self.name, identity.address);
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

        let sender = self.address.to_string();
        let sequence_number = self
            .client
            .get_sequence_number(&sender)
            .await
            .map_err(|e| WalletError::Adapter(e.to_string()))?;

        let raw = self.build_raw_transaction(payload, sequence_number, self.client.config())?;
        let signed = self.sign_raw_transaction(raw)?;
        let bytes = bcs::to_bytes(&signed).map_err(|e| WalletError::Adapter(e.to_string()))?;

        info!("Submitting {} from {} (seq {})", payload.function, sender, sequence_number);
        self.client.submit_signed_transaction(bytes).await.map_err(|e| {
            warn!("Submission of {} failed: {}", payload.function, e);
            WalletError::Adapter(e.to_string())
        })
    }
}
