use async_trait::async_trait;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::aptos::types::{
    coin_store_type, AccountData, AccountResource, LedgerInfo, PendingTransaction,
    TransactionOutcome,
};
use crate::error::{ClientError, ClientResult};
use crate::utils::config::AptosConfig;

const SIGNED_TRANSACTION_CONTENT_TYPE: &str = "application/x.aptos.signed_transaction+bcs";

/// Read-side of a node that the wallet session and trading desk depend on.
#[async_trait]
pub trait NodeReader: Send + Sync {
    /// Balance of `coin_type` held by `address`, in subunits. An account
    /// without a `CoinStore` for that coin holds zero.
    async fn coin_balance(&self, address: &str, coin_type: &str) -> ClientResult<u64>;

    /// Resolves once the transaction has left the mempool. There is no
    /// timeout of its own; wrap the call if one is wanted.
    async fn wait_for_transaction(&self, hash: &str) -> ClientResult<TransactionOutcome>;
}

pub struct AptosClient {
    http_client: reqwest::Client,
    base_url: String,
    config: AptosConfig,
}

impl AptosClient {
    pub fn new(config: AptosConfig) -> Self {
        Self {
            http_client: reqwest::Client::new(),
            base_url: config.node_url.trim_end_matches('/').to_string(),
            config,
        }
    }

    pub fn config(&self) -> &AptosConfig {
        &self.config
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> ClientResult<T> {
        let url = format!("{}{}", self.base_url, path);
        let response = self.http_client.get(&url).send().await?;

        if !response.status().is_success() {
            return Err(ClientError::Status {
                endpoint: path.to_string(),
                status: response.status().as_u16(),
                body: response.text().await.unwrap_or_default(),
            });
        }

        Ok(response.json().await?)
    }

    pub async fn ledger_info(&self) -> ClientResult<LedgerInfo> {
        self.get_json("/").await
    }

    pub async fn get_account(&self, address: &str) -> ClientResult<AccountData> {
        self.get_json(&format!("/accounts/{}", address)).await
    }

    pub async fn get_sequence_number(&self, address: &str) -> ClientResult<u64> {
        let account = self.get_account(address).await?;
        account
            .sequence_number
            .parse()
            .map_err(|_| ClientError::Malformed(format!("sequence_number {}", account.sequence_number)))
    }

    pub async fn get_account_resources(&self, address: &str) -> ClientResult<Vec<AccountResource>> {
        self.get_json(&format!("/accounts/{}/resources", address)).await
    }

    pub async fn get_account_balance(&self, address: &str, coin_type: &str) -> ClientResult<u64> {
        let resource_type = coin_store_type(coin_type);
        let path = format!("/accounts/{}/resource/{}", address, resource_type);

        let resource: AccountResource = match self.get_json(&path).await {
            Ok(resource) => resource,
            Err(ClientError::Status { status, .. }) if status == StatusCode::NOT_FOUND.as_u16() => {
                debug!("No {} registered for {}", resource_type, address);
                return Ok(0); // Return 0 if resource not found
            }
            Err(e) => return Err(e),
        };

        let value = resource.data["coin"]["value"]
            .as_str()
            .ok_or_else(|| ClientError::Malformed(format!("{} has no coin.value", resource_type)))?;

        value
            .parse::<u64>()
            .map_err(|_| ClientError::Malformed(format!("coin.value {}", value)))
    }

    pub async fn submit_signed_transaction(&self, signed_bcs: Vec<u8>) -> ClientResult<PendingTransaction> {
        let url = format!("{}/transactions", self.base_url);

        let response = self
            .http_client
            .post(&url)
            .header(reqwest::header::CONTENT_TYPE, SIGNED_TRANSACTION_CONTENT_TYPE)
            .body(signed_bcs)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ClientError::Status {
                endpoint: "/transactions".to_string(),
                status: response.status().as_u16(),
                body: response.text().await.unwrap_or_default(),
            });
        }

        let pending: PendingTransaction = response.json().await?;
        info!("Submitted transaction {}", pending.hash);
        Ok(pending)
    }

    async fn poll_transaction(&self, hash: &str) -> ClientResult<Option<TransactionOutcome>> {
        let path = format!("/transactions/by_hash/{}", hash);
        let txn: serde_json::Value = match self.get_json(&path).await {
            Ok(txn) => txn,
            Err(ClientError::Status { status, .. }) if status == StatusCode::NOT_FOUND.as_u16() => {
                return Ok(None);
            }
            Err(e) => return Err(e),
        };

        if txn["type"].as_str() == Some("pending_transaction") {
            return Ok(None);
        }

        Ok(Some(TransactionOutcome {
            hash: hash.to_string(),
            success: txn["success"].as_bool().unwrap_or(false),
            vm_status: txn["vm_status"].as_str().unwrap_or_default().to_string(),
            version: txn["version"].as_str().map(str::to_string),
        }))
    }
}

#[async_trait]
impl NodeReader for AptosClient {
    async fn coin_balance(&self, address: &str, coin_type: &str) -> ClientResult<u64> {
        self.get_account_balance(address, coin_type).await
    }

    async fn wait_for_transaction(&self, hash: &str) -> ClientResult<TransactionOutcome> {
        let delay = Duration::from_millis(self.config.confirmation_poll_ms);
        loop {
            match self.poll_transaction(hash).await {
                Ok(Some(outcome)) => {
                    if outcome.success {
                        info!("Transaction {} committed at version {:?}", hash, outcome.version);
                    } else {
                        warn!("Transaction {} failed: {}", hash, outcome.vm_status);
                    }
                    return Ok(outcome);
                }
                Ok(None) => debug!("Transaction {} still pending", hash),
                // Transient node errors do not end the wait
                Err(e) => warn!("Polling {} failed: {}", hash, e),
            }
            tokio::time::sleep(delay).await;
        }
    }
}
