use async_trait::async_trait;
use chrono::{NaiveDateTime, TimeZone, Utc};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::api::ExchangeInterface;
use super::auth;
use super::types::{AccountBalances, CandleInterval, OrderReceipt};
use crate::analysis::Candle;
use crate::config::ExchangeConfig;
use crate::error::ExchangeError;
use crate::simulation::PaperAccount;

/// Upbit caps candle requests at this many bars.
const MAX_CANDLES: usize = 200;

#[derive(Debug, Deserialize)]
struct UpbitCandle {
    candle_date_time_utc: String,
    opening_price: f64,
    high_price: f64,
    low_price: f64,
    trade_price: f64,
    candle_acc_trade_volume: f64,
}

impl UpbitCandle {
    fn into_candle(self) -> Result<Candle, ExchangeError> {
        let naive = NaiveDateTime::parse_from_str(&self.candle_date_time_utc, "%Y-%m-%dT%H:%M:%S")
            .map_err(|e| {
                ExchangeError::Malformed(format!("candle time {}: {}", self.candle_date_time_utc, e))
            })?;
        Ok(Candle {
            timestamp: Utc.from_utc_datetime(&naive),
            open: self.opening_price,
            high: self.high_price,
            low: self.low_price,
            close: self.trade_price,
            volume: self.candle_acc_trade_volume,
        })
    }
}

#[derive(Debug, Deserialize)]
struct UpbitTicker {
    trade_price: f64,
}

#[derive(Debug, Deserialize)]
struct UpbitAccount {
    currency: String,
    balance: String,
    avg_buy_price: String,
}

#[derive(Debug, Deserialize)]
struct UpbitOrder {
    uuid: String,
}

fn parse_amount(raw: &str) -> f64 {
    raw.parse().unwrap_or(0.0)
}

/// Upbit REST client for one market. With `paper_trading` set, public market
/// data still comes from Upbit but balances and fills live in a local
/// [`PaperAccount`].
pub struct UpbitClient {
    http_client: reqwest::Client,
    base_url: String,
    market: String,
    access_key: String,
    secret_key: String,
    paper: Option<Mutex<PaperAccount>>,
}

impl UpbitClient {
    pub fn new(config: &ExchangeConfig) -> Self {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .tcp_nodelay(true)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            http_client,
            base_url: config.api_url.trim_end_matches('/').to_string(),
            market: config.symbol.clone(),
            access_key: config.access_key.clone(),
            secret_key: config.secret_key.clone(),
            paper: None,
        }
    }

    pub fn with_paper_account(mut self, account: PaperAccount) -> Self {
        self.paper = Some(Mutex::new(account));
        self
    }

    pub fn is_paper(&self) -> bool {
        self.paper.is_some()
    }

    async fn get_public<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, ExchangeError> {
        let url = format!("{}{}", self.base_url, path);
        let response = self.http_client.get(&url).query(query).send().await?;
        Self::decode(response).await
    }

    async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ExchangeError> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ExchangeError::Api {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response.json().await?)
    }

    async fn post_order(&self, params: Vec<(&str, String)>) -> Result<UpbitOrder, ExchangeError> {
        let query = url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(params.iter().map(|(k, v)| (*k, v.as_str())))
            .finish();
        let token = auth::bearer(&self.access_key, &self.secret_key, Some(&query))?;
        let body: serde_json::Map<String, serde_json::Value> = params
            .into_iter()
            .map(|(k, v)| (k.to_string(), serde_json::Value::String(v)))
            .collect();

        let response = self
            .http_client
            .post(format!("{}/v1/orders", self.base_url))
            .header("Authorization", token)
            .json(&body)
            .send()
            .await?;
        Self::decode(response).await
    }
}

#[async_trait]
impl ExchangeInterface for UpbitClient {
    async fn get_candles(
        &self,
        interval: CandleInterval,
        count: usize,
    ) -> Result<Vec<Candle>, ExchangeError> {
        let path = match interval {
            CandleInterval::Day => "/v1/candles/days",
            CandleInterval::Minute1 => "/v1/candles/minutes/1",
        };
        let count = count.clamp(1, MAX_CANDLES);
        debug!("Fetching {} candles from {}", count, path);

        let raw: Vec<UpbitCandle> = self
            .get_public(path, &[("market", self.market.clone()), ("count", count.to_string())])
            .await?;

        // newest first on the wire
        let mut candles = raw
            .into_iter()
            .map(UpbitCandle::into_candle)
            .collect::<Result<Vec<_>, _>>()?;
        candles.reverse();
        Ok(candles)
    }

    async fn get_current_price(&self) -> Result<f64, ExchangeError> {
        let tickers: Vec<UpbitTicker> = self
            .get_public("/v1/ticker", &[("markets", self.market.clone())])
            .await?;
        tickers
            .first()
            .map(|t| t.trade_price)
            .ok_or_else(|| ExchangeError::Malformed(format!("empty ticker for {}", self.market)))
    }

    async fn get_balances(&self) -> Result<AccountBalances, ExchangeError> {
        if let Some(paper) = &self.paper {
            return Ok(paper.lock().await.balances());
        }

        let token = auth::bearer(&self.access_key, &self.secret_key, None)?;
        let response = self
            .http_client
            .get(format!("{}/v1/accounts", self.base_url))
            .header("Authorization", token)
            .send()
            .await?;
        let accounts: Vec<UpbitAccount> = Self::decode(response).await?;

        let coin = self.market.rsplit('-').next().unwrap_or("BTC");
        let mut balances = AccountBalances::default();
        for account in &accounts {
            if account.currency == "KRW" {
                balances.krw = parse_amount(&account.balance);
            } else if account.currency == coin {
                balances.btc = parse_amount(&account.balance);
                balances.btc_avg_price = parse_amount(&account.avg_buy_price);
            }
        }
        Ok(balances)
    }

    async fn buy_market_order(&self, krw_amount: f64) -> Result<OrderReceipt, ExchangeError> {
        let price = self.get_current_price().await?;

        if let Some(paper) = &self.paper {
            let receipt = paper.lock().await.buy(krw_amount, price)?;
            info!(
                "📝 [PAPER] Buy {:.0} KRW of {} @ {:.0}",
                krw_amount, self.market, price
            );
            return Ok(receipt);
        }

        warn!("🚨 LIVE ORDER: buy {:.0} KRW of {}", krw_amount, self.market);
        let order = self
            .post_order(vec![
                ("market", self.market.clone()),
                ("side", "bid".to_string()),
                ("ord_type", "price".to_string()),
                ("price", format!("{:.0}", krw_amount.floor())),
            ])
            .await?;

        Ok(OrderReceipt {
            order_id: order.uuid,
            price,
            volume: krw_amount / price,
            funds: krw_amount,
        })
    }

    async fn sell_market_order(&self, volume: f64) -> Result<OrderReceipt, ExchangeError> {
        let price = self.get_current_price().await?;

        if let Some(paper) = &self.paper {
            let receipt = paper.lock().await.sell(volume, price)?;
            info!("📝 [PAPER] Sell {:.8} {} @ {:.0}", volume, self.market, price);
            return Ok(receipt);
        }

        warn!("🚨 LIVE ORDER: sell {:.8} of {}", volume, self.market);
        let order = self
            .post_order(vec![
                ("market", self.market.clone()),
                ("side", "ask".to_string()),
                ("ord_type", "market".to_string()),
                ("volume", format!("{:.8}", volume)),
            ])
            .await?;

        Ok(OrderReceipt {
            order_id: order.uuid,
            price,
            volume,
            funds: volume * price,
        })
    }
}
