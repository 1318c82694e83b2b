pub mod desk;
pub mod order;
pub mod poller;

pub use desk::{DeskSettings, DeskState, TradingDesk};
pub use order::{validate_market_order, OrderLimits, TradeDirection};
pub use poller::{Poller, Refresh};
