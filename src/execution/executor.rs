use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::analysis::{Decision, ForcedSell, RiskLevel, TradingDecision};
use crate::analytics::{ExecutionStatus, TradeRecord, TradeStore};
use crate::config::TradingConfig;
use crate::exchange::{ExchangeInterface, InvestmentStatus};

/// What the cycle asks execution to do.
#[derive(Debug, Clone, Copy)]
pub enum TradeIntent<'a> {
    Integrated(&'a TradingDecision),
    StopLoss(ForcedSell),
}

impl TradeIntent<'_> {
    pub fn action(&self) -> Decision {
        match self {
            TradeIntent::Integrated(d) => d.decision,
            TradeIntent::StopLoss(f) => f.decision,
        }
    }

    fn confidence(&self) -> Option<f64> {
        match self {
            TradeIntent::Integrated(d) => Some(d.confidence()),
            TradeIntent::StopLoss(_) => None,
        }
    }

    fn risk_level(&self) -> Option<RiskLevel> {
        match self {
            TradeIntent::Integrated(d) => Some(d.risk_level()),
            TradeIntent::StopLoss(_) => None,
        }
    }

    fn reason(&self) -> String {
        match self {
            TradeIntent::Integrated(d) => d.reason.clone(),
            TradeIntent::StopLoss(_) => "Stop-loss: price below recent highs while in profit".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExecutionResult {
    pub action: Decision,
    pub status: ExecutionStatus,
    pub price: f64,
    pub amount: f64,
    pub total_value: f64,
    pub fee: f64,
    pub order_id: Option<String>,
    pub success: bool,
    pub message: String,
}

impl ExecutionResult {
    fn skipped(action: Decision, status: ExecutionStatus, price: f64, message: String) -> Self {
        Self {
            action,
            status,
            price,
            amount: 0.0,
            total_value: 0.0,
            fee: 0.0,
            order_id: None,
            success: status == ExecutionStatus::Held,
            message,
        }
    }
}

/// KRW to spend on a buy, or `None` below the exchange minimum.
pub fn plan_buy(krw_balance: f64, rules: &TradingConfig) -> Option<f64> {
    if krw_balance < rules.min_trade_amount {
        return None;
    }
    let amount = (krw_balance * rules.trade_ratio).max(rules.min_trade_amount);
    Some(amount.min(krw_balance))
}

/// BTC volume to sell, or `None` when the holding is worth less than the minimum.
pub fn plan_sell(btc_balance: f64, price: f64, rules: &TradingConfig) -> Option<f64> {
    if btc_balance <= 0.0 || btc_balance * price < rules.min_trade_amount {
        return None;
    }
    let volume = btc_balance * rules.trade_ratio;
    if volume * price < rules.min_trade_amount {
        Some(btc_balance)
    } else {
        Some(volume)
    }
}

pub struct Executor {
    exchange: Arc<dyn ExchangeInterface>,
    store: Arc<dyn TradeStore>,
    rules: TradingConfig,
}

impl Executor {
    pub fn new(
        exchange: Arc<dyn ExchangeInterface>,
        store: Arc<dyn TradeStore>,
        rules: TradingConfig,
    ) -> Self {
        Self {
            exchange,
            store,
            rules,
        }
    }

    /// Carries out `intent` against the account snapshot and records the
    /// outcome. Exchange failures come back as `Failed` results.
    pub async fn execute(&self, intent: TradeIntent<'_>, account: &InvestmentStatus) -> ExecutionResult {
        let result = match intent.action() {
            Decision::Buy => self.buy(account).await,
            Decision::Sell => self.sell(account).await,
            Decision::Hold => {
                info!("⏸️  Holding position");
                ExecutionResult::skipped(
                    Decision::Hold,
                    ExecutionStatus::Held,
                    account.current_price,
                    "Hold decision, no order placed".to_string(),
                )
            }
        };

        self.record(&intent, &result);
        result
    }

    async fn buy(&self, account: &InvestmentStatus) -> ExecutionResult {
        let Some(krw_amount) = plan_buy(account.krw_balance, &self.rules) else {
            warn!(
                "💸 KRW balance {:.0} below minimum order {:.0}",
                account.krw_balance, self.rules.min_trade_amount
            );
            return ExecutionResult::skipped(
                Decision::Buy,
                ExecutionStatus::InsufficientBalance,
                account.current_price,
                format!("KRW balance {:.0} below minimum", account.krw_balance),
            );
        };

        info!("🚀 Buying with {:.0} KRW", krw_amount);
        match self.exchange.buy_market_order(krw_amount).await {
            Ok(receipt) => {
                info!("✅ Buy filled: {:.8} BTC @ {:.0} (order {})", receipt.volume, receipt.price, receipt.order_id);
                ExecutionResult {
                    action: Decision::Buy,
                    status: ExecutionStatus::Executed,
                    price: receipt.price,
                    amount: receipt.volume,
                    total_value: receipt.funds,
                    fee: receipt.funds * self.rules.fee_rate,
                    order_id: Some(receipt.order_id),
                    success: true,
                    message: "Buy order executed".to_string(),
                }
            }
            Err(e) => {
                error!("❌ Buy order failed: {}", e);
                ExecutionResult::skipped(
                    Decision::Buy,
                    ExecutionStatus::Failed,
                    account.current_price,
                    e.to_string(),
                )
            }
        }
    }

    async fn sell(&self, account: &InvestmentStatus) -> ExecutionResult {
        let Some(volume) = plan_sell(account.btc_balance, account.current_price, &self.rules) else {
            warn!(
                "💸 BTC holding {:.8} worth less than minimum order {:.0}",
                account.btc_balance, self.rules.min_trade_amount
            );
            return ExecutionResult::skipped(
                Decision::Sell,
                ExecutionStatus::InsufficientBalance,
                account.current_price,
                format!("BTC holding {:.8} below minimum value", account.btc_balance),
            );
        };

        info!("📉 Selling {:.8} BTC", volume);
        match self.exchange.sell_market_order(volume).await {
            Ok(receipt) => {
                info!("✅ Sell filled: {:.8} BTC @ {:.0} (order {})", receipt.volume, receipt.price, receipt.order_id);
                ExecutionResult {
                    action: Decision::Sell,
                    status: ExecutionStatus::Executed,
                    price: receipt.price,
                    amount: receipt.volume,
                    total_value: receipt.funds,
                    fee: receipt.funds * self.rules.fee_rate,
                    order_id: Some(receipt.order_id),
                    success: true,
                    message: "Sell order executed".to_string(),
                }
            }
            Err(e) => {
                error!("❌ Sell order failed: {}", e);
                ExecutionResult::skipped(
                    Decision::Sell,
                    ExecutionStatus::Failed,
                    account.current_price,
                    e.to_string(),
                )
            }
        }
    }

    fn record(&self, intent: &TradeIntent<'_>, result: &ExecutionResult) {
        let record = TradeRecord {
            id: uuid::Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            action: result.action,
            status: result.status,
            price: result.price,
            amount: result.amount,
            total_value: result.total_value,
            fee: result.fee,
            order_id: result.order_id.clone(),
            confidence: intent.confidence(),
            risk_level: intent.risk_level(),
            reason: intent.reason(),
            forced: matches!(intent, TradeIntent::StopLoss(_)),
        };
        if let Err(e) = self.store.append(&record) {
            warn!("⚠️ Failed to record trade: {}", e);
        }
    }
}
