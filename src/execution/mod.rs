pub mod executor;

pub use executor::{plan_buy, plan_sell, ExecutionResult, Executor, TradeIntent};
