use async_trait::async_trait;

use super::types::{AccountBalances, CandleInterval, OrderReceipt};
use crate::analysis::Candle;
use crate::error::ExchangeError;

#[async_trait]
pub trait ExchangeInterface: Send + Sync {
    /// Candles for the configured market, oldest first
    async fn get_candles(
        &self,
        interval: CandleInterval,
        count: usize,
    ) -> Result<Vec<Candle>, ExchangeError>;

    /// Last traded price
    async fn get_current_price(&self) -> Result<f64, ExchangeError>;

    /// KRW and BTC balances
    async fn get_balances(&self) -> Result<AccountBalances, ExchangeError>;

    /// Market buy spending `krw_amount`
    async fn buy_market_order(&self, krw_amount: f64) -> Result<OrderReceipt, ExchangeError>;

    /// Market sell of `volume` BTC
    async fn sell_market_order(&self, volume: f64) -> Result<OrderReceipt, ExchangeError>;
}
