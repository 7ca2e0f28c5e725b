pub mod ledger;
pub mod performance;

pub use ledger::{
    select_reference_trade, ExecutionStatus, JsonlTradeStore, MemoryTradeStore, TradeRecord,
    TradeStore,
};
pub use performance::{compute_statistics, improvement_suggestions, TradeStatistics};
