use rust_decimal::Decimal;
use thiserror::Error;

use crate::wallet::provider::{ReadyState, WalletKind};

/// Failures surfaced to the user when connecting or using a wallet.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum WalletError {
    #[error("No wallets detected. Please make sure you have wallet extensions installed.")]
    NoProviders,

    #[error("{kind} wallet was found but is not ready (state: {state}). Please unlock or reload your wallet.")]
    NotReady { kind: WalletKind, state: ReadyState },

    #[error("{kind} wallet not detected. Please install the wallet extension and refresh the page.")]
    NotFound { kind: WalletKind },

    #[error("Wallet not connected")]
    NotConnected,

    #[error("Wallet adapter error: {0}")]
    Adapter(String),
}

/// Order rejections raised before anything is sent to the venue.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum OrderError {
    #[error("Please enter position size and collateral")]
    MissingInput,

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Minimum position size is {minimum} USDC")]
    BelowMinimumSize { minimum: Decimal },

    #[error("Minimum collateral is {minimum} USDC")]
    BelowMinimumCollateral { minimum: Decimal },

    #[error("Insufficient USDC balance")]
    InsufficientBalance,
}

/// Errors talking to an Aptos node or a venue API.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{endpoint} returned status {status}: {body}")]
    Status {
        endpoint: String,
        status: u16,
        body: String,
    },

    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error("Invalid type tag: {0}")]
    InvalidTypeTag(String),

    #[error("Malformed response: {0}")]
    Malformed(String),

    #[error("Encoding failed: {0}")]
    Encoding(#[from] bcs::Error),

    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),
}

pub type ClientResult<T> = std::result::Result<T, ClientError>;
