pub mod stop_loss;

pub use stop_loss::{StopLossEvaluator, StopLossInputs, StopLossVerdict, TradeReferenceInfo};
