use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{info, warn};

use super::types::{Decision, RiskLevel, TradingDecision};

pub const MAX_ACTIVE_IMPROVEMENTS: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImprovementKind {
    Condition,
    Parameter,
    Risk,
    Timing,
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImprovementStatus {
    #[default]
    Proposed,
    Implemented,
    Validated,
    Rejected,
    #[serde(other)]
    Unknown,
}

fn default_success_metric() -> f64 {
    0.5
}

/// A learned adjustment to the trading strategy, produced by the offline
/// review process and applied to each fresh decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyImprovement {
    #[serde(rename = "improvement_type")]
    pub kind: ImprovementKind,
    #[serde(default)]
    pub new_value: String,
    #[serde(default = "default_success_metric")]
    pub success_metric: f64,
    #[serde(default)]
    pub status: ImprovementStatus,
}

impl StrategyImprovement {
    pub fn is_active(&self) -> bool {
        matches!(
            self.status,
            ImprovementStatus::Implemented | ImprovementStatus::Validated
        )
    }
}

/// Load the active improvements (best success metric first) from a JSON array.
pub fn load_active(path: impl AsRef<Path>) -> anyhow::Result<Vec<StrategyImprovement>> {
    let raw = std::fs::read_to_string(path.as_ref())?;
    let all: Vec<StrategyImprovement> = serde_json::from_str(&raw)?;
    Ok(select_active(all))
}

pub fn select_active(all: Vec<StrategyImprovement>) -> Vec<StrategyImprovement> {
    let mut active: Vec<StrategyImprovement> = all.into_iter().filter(|i| i.is_active()).collect();
    active.sort_by(|a, b| b.success_metric.total_cmp(&a.success_metric));
    active.truncate(MAX_ACTIVE_IMPROVEMENTS);
    active
}

/// Apply improvements through the decision's setters so the risk level stays
/// derived from confidence.
pub fn apply(decision: &mut TradingDecision, improvements: &[StrategyImprovement]) {
    if improvements.is_empty() {
        return;
    }

    info!("🔧 Applying {} strategy improvements", improvements.len());
    for improvement in improvements {
        let preview: String = improvement.new_value.chars().take(50).collect();
        info!(
            "  - {:?}: {}... (success metric {:.2})",
            improvement.kind, preview, improvement.success_metric
        );

        match improvement.kind {
            ImprovementKind::Condition => {
                if decision.confidence() < 0.7 {
                    decision.set_confidence((decision.confidence() + 0.1).min(0.9));
                    decision.append_reason("[Improvement: stricter entry conditions applied]");
                }
            }
            ImprovementKind::Parameter => {
                if decision.risk_level() == RiskLevel::High {
                    // Lowest confidence that still derives a medium risk
                    decision.set_confidence(0.4);
                    decision.append_reason("[Improvement: risk parameters adjusted]");
                }
            }
            ImprovementKind::Risk => {
                if decision.decision == Decision::Buy {
                    decision.set_confidence((decision.confidence() - 0.1).max(0.6));
                    decision.append_reason("[Improvement: stronger risk management]");
                }
            }
            ImprovementKind::Timing => {
                if decision.decision == Decision::Hold {
                    decision.append_reason("[Improvement: timing optimisation applied]");
                }
            }
            ImprovementKind::Other => {
                warn!("Ignoring unknown improvement type");
            }
        }
    }
}
