pub mod analysis;
pub mod analytics;
pub mod config;
pub mod error;
pub mod exchange;
pub mod execution;
pub mod llm;
pub mod pricefeed;
pub mod simulation;
pub mod strategies;
pub mod trader;
