pub mod activity;
pub mod models;
pub mod traders;

pub use activity::{PortfolioSummary, APT_USD_RATE, TRADING_PAIRS};
pub use models::{ModelCard, ModelSummary};
pub use traders::{Catalog, SortKey, TraderProfile, TraderStats, TraderSummary};
