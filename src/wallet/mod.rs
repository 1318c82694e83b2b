pub mod adapter;
pub mod key_wallet;
pub mod mock;
pub mod provider;
pub mod resolver;
pub mod session;

pub use adapter::{AccountIdentity, WalletAdapter};
pub use provider::{ProviderInfo, ReadyState, WalletKind};
pub use resolver::resolve;
pub use session::{Notification, NotificationLevel, WalletManager, WalletSession};
