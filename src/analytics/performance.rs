use serde::{Deserialize, Serialize};

use super::ledger::TradeRecord;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TradeStatistics {
    /// Closed trades, i.e. executed sells.
    pub total_trades: usize,
    pub winning_trades: usize,
    pub losing_trades: usize,
    pub win_rate: f64,
    pub realized_pnl: f64,
    pub total_fees: f64,
    pub buy_count: usize,
    pub sell_count: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuggestionKind {
    RiskManagement,
    Strategy,
    Monitoring,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImprovementSuggestion {
    pub kind: SuggestionKind,
    pub title: String,
    pub description: String,
    pub priority: Priority,
}

/// Replays executed trades at average cost. Each sell realises
/// `(sell price - average cost) * volume - fee`.
pub fn compute_statistics(trades: &[TradeRecord]) -> TradeStatistics {
    let mut stats = TradeStatistics::default();
    let mut position = 0.0_f64;
    let mut avg_cost = 0.0_f64;

    for trade in trades {
        if trade.is_executed_buy() {
            stats.buy_count += 1;
            stats.total_fees += trade.fee;
            let new_position = position + trade.amount;
            if new_position > 0.0 {
                avg_cost = (avg_cost * position + trade.price * trade.amount) / new_position;
            }
            position = new_position;
        } else if trade.is_executed_sell() {
            stats.sell_count += 1;
            stats.total_fees += trade.fee;
            // sells with no recorded cost basis count at break-even
            let basis = if position > 0.0 { avg_cost } else { trade.price };
            let pnl = (trade.price - basis) * trade.amount - trade.fee;

            stats.total_trades += 1;
            stats.realized_pnl += pnl;
            if pnl > 0.0 {
                stats.winning_trades += 1;
            } else if pnl < 0.0 {
                stats.losing_trades += 1;
            }

            position = (position - trade.amount).max(0.0);
            if position == 0.0 {
                avg_cost = 0.0;
            }
        }
    }

    if stats.total_trades > 0 {
        stats.win_rate = stats.winning_trades as f64 / stats.total_trades as f64;
    }
    stats
}

pub fn improvement_suggestions(stats: &TradeStatistics) -> Vec<ImprovementSuggestion> {
    let mut suggestions = Vec::new();

    if stats.win_rate < 0.4 {
        suggestions.push(ImprovementSuggestion {
            kind: SuggestionKind::RiskManagement,
            title: "Strengthen risk management".to_string(),
            description: "Win rate is low; tighten position sizing and exits.".to_string(),
            priority: Priority::High,
        });
    }

    if stats.win_rate < 0.5 {
        suggestions.push(ImprovementSuggestion {
            kind: SuggestionKind::Strategy,
            title: "Review trading strategy".to_string(),
            description: "Re-evaluate entry conditions against recent results.".to_string(),
            priority: Priority::Medium,
        });
    }

    suggestions.push(ImprovementSuggestion {
        kind: SuggestionKind::Monitoring,
        title: "Keep monitoring".to_string(),
        description: "Track market conditions and trade outcomes continuously.".to_string(),
        priority: Priority::Low,
    });

    suggestions
}
