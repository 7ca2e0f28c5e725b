pub mod decision;
pub mod improvement;
pub mod indicators;
pub mod signals;
pub mod types;
pub mod vision;

pub use decision::{indicator_only, integrate};
pub use indicators::{Candle, IndicatorSnapshot};
pub use signals::classify;
pub use types::{
    Decision, ForcedSell, MarketSignal, MarketTrend, RiskLevel, TradingDecision, VisionReading,
};
pub use vision::parse_vision_response;
