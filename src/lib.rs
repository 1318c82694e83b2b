pub mod api;
pub mod aptos;
pub mod catalog;
pub mod error;
pub mod following;
pub mod metrics;
pub mod trading;
pub mod utils;
pub mod venue;
pub mod wallet;
