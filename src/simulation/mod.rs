use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tokio::sync::Mutex;
use tracing::info;

use crate::analysis::Candle;
use crate::error::ExchangeError;
use crate::exchange::{AccountBalances, CandleInterval, ExchangeInterface, OrderReceipt};

/// Minute bars revealed before the first simulated cycle.
pub const WARMUP_BARS: usize = 30;

/// Local KRW/BTC book that fills market orders immediately at a given price.
#[derive(Debug, Clone, PartialEq)]
pub struct PaperAccount {
    krw: f64,
    btc: f64,
    avg_price: f64,
    fee_rate: f64,
}

impl PaperAccount {
    pub fn new(initial_krw: f64, fee_rate: f64) -> Self {
        Self {
            krw: initial_krw,
            btc: 0.0,
            avg_price: 0.0,
            fee_rate,
        }
    }

    pub fn balances(&self) -> AccountBalances {
        AccountBalances {
            krw: self.krw,
            btc: self.btc,
            btc_avg_price: self.avg_price,
        }
    }

    /// Spend `krw_amount` (fee included) at `price`.
    pub fn buy(&mut self, krw_amount: f64, price: f64) -> Result<OrderReceipt, ExchangeError> {
        if krw_amount <= 0.0 || price <= 0.0 {
            return Err(ExchangeError::OrderRejected(format!(
                "invalid buy: {krw_amount} KRW @ {price}"
            )));
        }
        if krw_amount > self.krw + 1e-6 {
            return Err(ExchangeError::OrderRejected(format!(
                "insufficient KRW: need {:.0}, have {:.0}",
                krw_amount, self.krw
            )));
        }

        let fee = krw_amount * self.fee_rate;
        let volume = (krw_amount - fee) / price;
        let new_btc = self.btc + volume;
        self.avg_price = if self.btc > 0.0 {
            (self.avg_price * self.btc + price * volume) / new_btc
        } else {
            price
        };
        self.btc = new_btc;
        self.krw = (self.krw - krw_amount).max(0.0);

        Ok(OrderReceipt {
            order_id: format!("paper-order-{}", uuid::Uuid::new_v4()),
            price,
            volume,
            funds: krw_amount,
        })
    }

    /// Sell `volume` BTC at `price`, crediting proceeds net of fee.
    pub fn sell(&mut self, volume: f64, price: f64) -> Result<OrderReceipt, ExchangeError> {
        if volume <= 0.0 || price <= 0.0 {
            return Err(ExchangeError::OrderRejected(format!(
                "invalid sell: {volume} BTC @ {price}"
            )));
        }
        if volume > self.btc + 1e-12 {
            return Err(ExchangeError::OrderRejected(format!(
                "insufficient BTC: need {:.8}, have {:.8}",
                volume, self.btc
            )));
        }

        let proceeds = volume * price;
        self.krw += proceeds - proceeds * self.fee_rate;
        self.btc -= volume.min(self.btc);
        if self.btc < 1e-12 {
            self.btc = 0.0;
            self.avg_price = 0.0;
        }

        Ok(OrderReceipt {
            order_id: format!("paper-order-{}", uuid::Uuid::new_v4()),
            price,
            volume,
            funds: proceeds,
        })
    }
}

/// Candle file replayed by the simulator.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SimulationData {
    pub daily: Vec<Candle>,
    pub minute: Vec<Candle>,
}

struct SimState {
    cursor: usize,
    account: PaperAccount,
}

/// Replays recorded candles for backtesting. Each `advance` reveals one
/// more minute bar; orders fill against a [`PaperAccount`] at the current close.
pub struct MarketSimulator {
    daily: Vec<Candle>,
    minute: Vec<Candle>,
    state: Mutex<SimState>,
}

impl MarketSimulator {
    pub fn new(data: SimulationData, initial_krw: f64, fee_rate: f64) -> Result<Self> {
        if data.minute.is_empty() {
            anyhow::bail!("simulation data has no minute candles");
        }
        let cursor = WARMUP_BARS.min(data.minute.len()) - 1;
        info!(
            "🎞️  Simulator loaded {} daily / {} minute candles",
            data.daily.len(),
            data.minute.len()
        );
        Ok(Self {
            daily: data.daily,
            minute: data.minute,
            state: Mutex::new(SimState {
                cursor,
                account: PaperAccount::new(initial_krw, fee_rate),
            }),
        })
    }

    pub fn from_json_file(path: impl AsRef<Path>, initial_krw: f64, fee_rate: f64) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading simulation data {}", path.display()))?;
        let data: SimulationData = serde_json::from_str(&raw)
            .with_context(|| format!("parsing simulation data {}", path.display()))?;
        Self::new(data, initial_krw, fee_rate)
    }

    /// Move to the next minute bar. Returns false once the data is exhausted.
    pub async fn advance(&self) -> bool {
        let mut state = self.state.lock().await;
        if state.cursor + 1 >= self.minute.len() {
            return false;
        }
        state.cursor += 1;
        true
    }

    fn price_at(&self, cursor: usize) -> f64 {
        self.minute[cursor].close
    }
}

fn tail(candles: &[Candle], count: usize) -> Vec<Candle> {
    candles[candles.len().saturating_sub(count)..].to_vec()
}

#[async_trait]
impl ExchangeInterface for MarketSimulator {
    async fn get_candles(
        &self,
        interval: CandleInterval,
        count: usize,
    ) -> Result<Vec<Candle>, ExchangeError> {
        let cursor = self.state.lock().await.cursor;
        match interval {
            CandleInterval::Minute1 => Ok(tail(&self.minute[..=cursor], count)),
            CandleInterval::Day => {
                let now = self.minute[cursor].timestamp;
                let visible = self.daily.partition_point(|c| c.timestamp <= now);
                Ok(tail(&self.daily[..visible], count))
            }
        }
    }

    async fn get_current_price(&self) -> Result<f64, ExchangeError> {
        let cursor = self.state.lock().await.cursor;
        Ok(self.price_at(cursor))
    }

    async fn get_balances(&self) -> Result<AccountBalances, ExchangeError> {
        Ok(self.state.lock().await.account.balances())
    }

    async fn buy_market_order(&self, krw_amount: f64) -> Result<OrderReceipt, ExchangeError> {
        let mut state = self.state.lock().await;
        let price = self.price_at(state.cursor);
        let receipt = state.account.buy(krw_amount, price)?;
        info!("⚡ [SIM] Buy {:.0} KRW @ {:.0} -> {:.8} BTC", krw_amount, price, receipt.volume);
        Ok(receipt)
    }

    async fn sell_market_order(&self, volume: f64) -> Result<OrderReceipt, ExchangeError> {
        let mut state = self.state.lock().await;
        let price = self.price_at(state.cursor);
        let receipt = state.account.sell(volume, price)?;
        info!("⚡ [SIM] Sell {:.8} BTC @ {:.0}", volume, price);
        Ok(receipt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};

    fn series(start_secs: i64, step: Duration, closes: &[f64]) -> Vec<Candle> {
        let start = Utc.timestamp_opt(start_secs, 0).unwrap();
        closes
            .iter()
            .enumerate()
            .map(|(i, &c)| Candle {
                timestamp: start + step * i as i32,
                open: c,
                high: c + 1.0,
                low: c - 1.0,
                close: c,
                volume: 1.0,
            })
            .collect()
    }

    #[test]
    fn test_paper_round_trip_charges_fees() {
        let mut account = PaperAccount::new(100_000.0, 0.001);
        let buy = account.buy(50_000.0, 1_000.0).unwrap();
        assert!(buy.order_id.starts_with("paper-order-"));
        assert!((buy.volume - 49.95).abs() < 1e-9);
        assert_eq!(account.balances().btc_avg_price, 1_000.0);

        account.sell(buy.volume, 1_000.0).unwrap();
        let after = account.balances();
        assert!(after.btc.abs() < 1e-12);
        assert_eq!(after.btc_avg_price, 0.0);
        assert!(after.krw < 100_000.0);
    }

    #[test]
    fn test_paper_average_price_weights_later_fills() {
        let mut account = PaperAccount::new(100_000.0, 0.0);
        account.buy(10_000.0, 0.3).unwrap();
        assert_eq!(account.balances().btc_avg_price, 0.3);

        account.buy(10_000.0, 0.6).unwrap();
        assert!((account.balances().btc_avg_price - 0.4).abs() < 1e-9);
    }

    #[test]
    fn test_paper_rejects_overspend() {
        let mut account = PaperAccount::new(1_000.0, 0.0);
        assert!(matches!(
            account.buy(5_000.0, 100.0),
            Err(ExchangeError::OrderRejected(_))
        ));
        assert!(account.sell(1.0, 100.0).is_err());
    }

    #[tokio::test]
    async fn test_simulator_replays_minute_bars() {
        let closes: Vec<f64> = (0..40).map(|i| 100.0 + i as f64).collect();
        let data = SimulationData {
            daily: series(0, Duration::days(1), &[90.0, 95.0]),
            minute: series(86_400 * 2, Duration::minutes(1), &closes),
        };
        let sim = MarketSimulator::new(data, 10_000.0, 0.0).unwrap();

        assert_eq!(sim.get_current_price().await.unwrap(), 129.0);
        let bars = sim.get_candles(CandleInterval::Minute1, 10).await.unwrap();
        assert_eq!(bars.len(), 10);
        assert_eq!(bars.last().unwrap().close, 129.0);
        assert_eq!(sim.get_candles(CandleInterval::Day, 30).await.unwrap().len(), 2);

        assert!(sim.advance().await);
        assert_eq!(sim.get_current_price().await.unwrap(), 130.0);
        for _ in 0..9 {
            assert!(sim.advance().await);
        }
        assert!(!sim.advance().await);
        assert_eq!(sim.get_current_price().await.unwrap(), 139.0);
    }
}
