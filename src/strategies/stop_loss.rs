use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::analysis::indicators::{recent_high_average, Candle};
use crate::analysis::types::{Decision, ForcedSell, TradingDecision};

/// Number of latest minute bars averaged into the recent-high reference.
pub const RECENT_HIGH_BARS: usize = 10;

/// The purchase the stop-loss compares against.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeReferenceInfo {
    pub buy_price: f64,
    pub buy_amount: f64,
    pub buy_time: DateTime<Local>,
}

impl TradeReferenceInfo {
    /// Profit of the reference lot valued at `current_price`.
    pub fn profit_at(&self, current_price: f64) -> f64 {
        current_price * self.buy_amount - self.buy_price * self.buy_amount
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    InsufficientCandles { available: usize },
    NoProfitLoss,
    NoReferenceTrade,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StopLossVerdict {
    Triggered(ForcedSell),
    NotTriggered,
    Skipped(SkipReason),
}

/// Everything the check needs, gathered by the caller for one cycle.
#[derive(Debug, Clone, Copy)]
pub struct StopLossInputs<'a> {
    pub minute_candles: &'a [Candle],
    pub current_price: f64,
    /// Current holdings value minus cost basis; `None` when unavailable.
    pub total_profit_loss: Option<f64>,
    /// Size of the resulting order. Not part of the trigger.
    pub sell_amount: f64,
    pub decision: &'a TradingDecision,
    pub reference: Option<&'a TradeReferenceInfo>,
}

/// Forces a sell on a passive decision once price falls under its recent
/// highs while the reference lot is still in profit.
#[derive(Debug, Clone)]
pub struct StopLossEvaluator {
    lookback: usize,
}

impl Default for StopLossEvaluator {
    fn default() -> Self {
        Self::new(RECENT_HIGH_BARS)
    }
}

impl StopLossEvaluator {
    pub fn new(lookback: usize) -> Self {
        Self { lookback }
    }

    pub fn evaluate(&self, inputs: &StopLossInputs<'_>) -> StopLossVerdict {
        let Some(recent_high_avg) = recent_high_average(inputs.minute_candles, self.lookback)
        else {
            info!("Not enough minute candles, skipping stop-loss check");
            return StopLossVerdict::Skipped(SkipReason::InsufficientCandles {
                available: inputs.minute_candles.len(),
            });
        };

        if inputs.total_profit_loss.is_none() {
            info!("No profit/loss figure, skipping stop-loss check");
            return StopLossVerdict::Skipped(SkipReason::NoProfitLoss);
        }

        let Some(reference) = inputs.reference else {
            info!("No reference purchase, skipping stop-loss check");
            return StopLossVerdict::Skipped(SkipReason::NoReferenceTrade);
        };

        if should_trigger(recent_high_avg, inputs.current_price, reference, inputs.decision) {
            info!("🛑 Stop-loss triggered");
            info!("  - Bought at: {}", reference.buy_time.format("%Y-%m-%d %H:%M:%S"));
            info!("  - Buy price: {:.0}", reference.buy_price);
            info!("  - Current price: {:.0} (recent high avg {:.0})", inputs.current_price, recent_high_avg);
            info!("  - Net profit: {:.0}", reference.profit_at(inputs.current_price));
            info!("  - Sell amount: {:.8}", inputs.sell_amount);
            StopLossVerdict::Triggered(ForcedSell::new())
        } else {
            StopLossVerdict::NotTriggered
        }
    }
}

/// Price below its recent-high average, reference lot in profit, and the
/// current decision is a hold.
pub fn should_trigger(
    recent_high_avg: f64,
    current_price: f64,
    reference: &TradeReferenceInfo,
    decision: &TradingDecision,
) -> bool {
    let price_dropping = recent_high_avg > current_price;
    let in_profit = reference.profit_at(current_price) > 0.0;
    let is_hold = decision.decision == Decision::Hold;
    price_dropping && in_profit && is_hold
}
