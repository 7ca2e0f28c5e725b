pub mod api;
pub mod auth;
pub mod client;
pub mod types;

pub use api::ExchangeInterface;
pub use client::UpbitClient;
pub use types::{AccountBalances, CandleInterval, InvestmentStatus, OrderReceipt};
