use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use std::sync::Arc;
use tokio::time::{interval, sleep, Duration, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use crate::analysis::improvement::{self, StrategyImprovement};
use crate::analysis::indicators::{calculate_trend, closes, TREND_WINDOW};
use crate::analysis::signals::classify_snapshot;
use crate::analysis::{
    indicator_only, integrate, parse_vision_response, IndicatorSnapshot, MarketSignal,
    MarketTrend, TradingDecision,
};
use crate::analytics::{compute_statistics, improvement_suggestions, TradeStore};
use crate::config::Config;
use crate::exchange::{CandleInterval, ExchangeInterface, InvestmentStatus};
use crate::execution::{ExecutionResult, Executor, TradeIntent};
use crate::llm::{chart_analysis_prompt, ChartSource, MarketContext, VisionModel};
use crate::pricefeed::{FearGreedClient, FearGreedReading};
use crate::simulation::MarketSimulator;
use crate::strategies::stop_loss::{StopLossEvaluator, StopLossInputs, StopLossVerdict};

/// Everything one cycle saw and did.
#[derive(Debug, Clone)]
pub struct CycleReport {
    pub started_at: DateTime<Local>,
    pub current_price: f64,
    pub account: InvestmentStatus,
    pub indicators: IndicatorSnapshot,
    pub fear_greed: FearGreedReading,
    pub trend: MarketTrend,
    pub signals: MarketSignal,
    pub decision: TradingDecision,
    pub used_vision: bool,
    pub execution: ExecutionResult,
    pub stop_loss: StopLossVerdict,
    pub forced_execution: Option<ExecutionResult>,
}

pub struct Trader {
    config: Config,
    exchange: Arc<dyn ExchangeInterface>,
    store: Arc<dyn TradeStore>,
    executor: Executor,
    stop_loss: StopLossEvaluator,
    fear_greed: Option<FearGreedClient>,
    vision: Option<Arc<dyn VisionModel>>,
    chart: Option<Arc<dyn ChartSource>>,
    improvements: Vec<StrategyImprovement>,
    simulator: Option<Arc<MarketSimulator>>,
}

impl Trader {
    pub fn new(
        config: Config,
        exchange: Arc<dyn ExchangeInterface>,
        store: Arc<dyn TradeStore>,
    ) -> Self {
        let executor = Executor::new(exchange.clone(), store.clone(), config.trading.clone());
        Self {
            config,
            exchange,
            store,
            executor,
            stop_loss: StopLossEvaluator::default(),
            fear_greed: None,
            vision: None,
            chart: None,
            improvements: Vec::new(),
            simulator: None,
        }
    }

    pub fn with_fear_greed(mut self, client: FearGreedClient) -> Self {
        self.fear_greed = Some(client);
        self
    }

    pub fn with_vision(
        mut self,
        model: Arc<dyn VisionModel>,
        chart: Option<Arc<dyn ChartSource>>,
    ) -> Self {
        self.vision = Some(model);
        self.chart = chart;
        self
    }

    pub fn with_improvements(mut self, improvements: Vec<StrategyImprovement>) -> Self {
        self.improvements = improvements;
        self
    }

    /// Replay mode: the loop advances the simulator after every cycle and
    /// stops when its data runs out.
    pub fn with_simulator(mut self, simulator: Arc<MarketSimulator>) -> Self {
        self.simulator = Some(simulator);
        self
    }

    pub async fn run(&self) -> Result<()> {
        info!("🚀 Starting Bitcoin trading agent on {}", self.config.exchange.symbol);
        info!(
            "⏱️  Analysis interval: {} seconds",
            self.config.agent.analysis_interval_secs
        );
        self.log_performance();

        // Main loop
        let mut tick_interval =
            interval(Duration::from_secs(self.config.agent.analysis_interval_secs.max(1)));
        tick_interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let retry_delay = Duration::from_secs(self.config.agent.retry_delay_secs);

        loop {
            tokio::select! {
                _ = tick_interval.tick() => {
                    if let Err(e) = self.run_cycle().await {
                        error!("❌ Trading cycle failed: {:#}", e);
                        info!("⏳ Retrying in {} seconds", retry_delay.as_secs());
                        tokio::select! {
                            _ = sleep(retry_delay) => {}
                            _ = tokio::signal::ctrl_c() => break,
                        }
                        tick_interval.reset();
                    }

                    // Replay mode: next bar
                    if let Some(sim) = &self.simulator {
                        if !sim.advance().await {
                            info!("🏁 Simulation data exhausted");
                            break;
                        }
                    }
                }
                _ = tokio::signal::ctrl_c() => {
                    info!("🛑 Shutdown requested");
                    break;
                }
            }
        }

        // Final stats
        self.log_performance();
        Ok(())
    }

    /// One pass: data, indicators, decision, execution, stop-loss.
    pub async fn run_cycle(&self) -> Result<CycleReport> {
        let started_at = Local::now();
        info!("🔄 Trading cycle started at {}", started_at.format("%Y-%m-%d %H:%M:%S"));

        // Market data and account
        let rules = &self.config.trading;
        let current_price = self
            .exchange
            .get_current_price()
            .await
            .context("fetching current price")?;
        let daily = self
            .exchange
            .get_candles(CandleInterval::Day, rules.daily_candle_count)
            .await
            .context("fetching daily candles")?;
        let minute = self
            .exchange
            .get_candles(CandleInterval::Minute1, rules.minute_candle_count)
            .await
            .context("fetching minute candles")?;
        let balances = self
            .exchange
            .get_balances()
            .await
            .context("fetching balances")?;
        let account = InvestmentStatus::new(balances, current_price);

        info!(
            "💰 KRW {:.0} | BTC {:.8} (avg {:.0}) | price {:.0} | BTC share {:.1}%",
            account.krw_balance,
            account.btc_balance,
            account.btc_avg_price,
            current_price,
            account.btc_ratio_pct()
        );
        if let (Some(pl), Some(pct)) =
            (account.total_profit_loss(), account.total_profit_loss_pct())
        {
            info!("📈 Unrealized P/L: {:+.0} KRW ({:+.2}%)", pl, pct);
        }

        // Indicators and sentiment
        let fear_greed = match &self.fear_greed {
            Some(client) => client.get_index_or_neutral().await,
            None => FearGreedReading::default(),
        };
        let indicators = IndicatorSnapshot::from_candles(&daily);
        let trend = calculate_trend(&closes(&daily), TREND_WINDOW);
        let signals = classify_snapshot(&indicators, fear_greed.value);
        debug!(
            "📈 RSI {:.1} | MACD {:.2} | %B {:.2} | F&G {} | trend {:?}",
            indicators.rsi, indicators.macd, indicators.bb_position, fear_greed.value, trend
        );

        let (mut decision, used_vision) = self
            .decide(&indicators, signals, trend, fear_greed.value, current_price)
            .await;

        if self.config.strategy.improvement_enabled {
            improvement::apply(&mut decision, &self.improvements);
        }

        info!(
            "🤖 Decision: {} (confidence {:.2}, risk {:?})",
            decision.decision,
            decision.confidence(),
            decision.risk_level()
        );
        info!("📝 Reason: {}", decision.reason);

        // Execute
        let execution = self
            .executor
            .execute(TradeIntent::Integrated(&decision), &account)
            .await;
        if execution.success {
            info!("✅ Execution: {}", execution.status.as_str());
        } else {
            warn!("⚠️ Execution: {} ({})", execution.status.as_str(), execution.message);
        }

        // Stop-loss check
        let reference = self
            .store
            .reference_trade(Local::now())
            .unwrap_or_else(|e| {
                warn!("⚠️ Could not read trade history: {}", e);
                None
            });
        let stop_loss = self.stop_loss.evaluate(&StopLossInputs {
            minute_candles: &minute,
            current_price,
            total_profit_loss: account.total_profit_loss(),
            sell_amount: account.btc_balance * rules.trade_ratio,
            decision: &decision,
            reference: reference.as_ref(),
        });

        let forced_execution = match stop_loss {
            StopLossVerdict::Triggered(forced) => Some(
                self.executor
                    .execute(TradeIntent::StopLoss(forced), &account)
                    .await,
            ),
            _ => None,
        };

        Ok(CycleReport {
            started_at,
            current_price,
            account,
            indicators,
            fear_greed,
            trend,
            signals,
            decision,
            used_vision,
            execution,
            stop_loss,
            forced_execution,
        })
    }

    async fn decide(
        &self,
        indicators: &IndicatorSnapshot,
        signals: MarketSignal,
        trend: MarketTrend,
        fear_greed: u8,
        current_price: f64,
    ) -> (TradingDecision, bool) {
        let vision = match &self.vision {
            Some(vision) if self.config.vision.enabled => vision,
            _ => return (indicator_only(signals, fear_greed, current_price), false),
        };

        let image = match &self.chart {
            Some(chart) => chart.capture().await.unwrap_or_else(|e| {
                warn!("⚠️ Chart capture failed: {}", e);
                None
            }),
            None => None,
        };

        let context = MarketContext::new(
            &self.config.exchange.symbol,
            current_price,
            indicators,
            fear_greed,
            trend,
        );
        let prompt = chart_analysis_prompt(&context);

        match vision.analyze(&prompt, image.as_deref()).await {
            Ok(text) if text.trim().is_empty() => {
                warn!("⚠️ {} returned no analysis, using indicators only", vision.name());
                (indicator_only(signals, fear_greed, current_price), false)
            }
            Ok(text) => {
                debug!("👁️  {} replied: {}", vision.name(), text);
                let reading = parse_vision_response(&text);
                (integrate(&reading, signals, trend, current_price), true)
            }
            Err(e) => {
                warn!("⚠️ Vision analysis failed, using indicators only: {}", e);
                (indicator_only(signals, fear_greed, current_price), false)
            }
        }
    }

    fn log_performance(&self) {
        let trades = match self.store.load_all() {
            Ok(trades) => trades,
            Err(e) => {
                warn!("⚠️ Could not load trade history: {}", e);
                return;
            }
        };
        let stats = compute_statistics(&trades);
        info!(
            "📊 Trades: {} closed | win rate {:.1}% | realized P/L {:.0} KRW",
            stats.total_trades,
            stats.win_rate * 100.0,
            stats.realized_pnl
        );
        for suggestion in improvement_suggestions(&stats) {
            info!("  - [{:?}] {}", suggestion.priority, suggestion.title);
        }
    }
}
