use anyhow::Result;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::warn;

use crate::analysis::signals::NEUTRAL_FEAR_GREED;

const CACHE_DURATION: Duration = Duration::from_secs(300);

#[derive(Debug, Deserialize)]
struct FngResponse {
    #[serde(default)]
    data: Vec<FngEntry>,
}

#[derive(Debug, Deserialize)]
struct FngEntry {
    value: String,
    #[serde(default)]
    value_classification: String,
}

/// Latest Fear & Greed reading with the day-over-day change.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FearGreedReading {
    pub value: u8,
    pub classification: String,
    pub previous_value: Option<u8>,
    pub value_change: i16,
}

impl Default for FearGreedReading {
    fn default() -> Self {
        Self {
            value: NEUTRAL_FEAR_GREED,
            classification: "Neutral".to_string(),
            previous_value: None,
            value_change: 0,
        }
    }
}

#[derive(Clone)]
struct CachedReading {
    reading: FearGreedReading,
    timestamp: Instant,
}

pub struct FearGreedClient {
    http_client: Client,
    base_url: String,
    cache: Arc<RwLock<Option<CachedReading>>>,
}

fn parse_value(raw: &str) -> Option<u8> {
    raw.trim().parse::<u8>().ok().map(|v| v.min(100))
}

impl FearGreedClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            http_client: Client::builder()
                .timeout(Duration::from_secs(5))
                .build()
                .unwrap_or_default(),
            base_url: base_url.trim_end_matches('/').to_string(),
            cache: Arc::new(RwLock::new(None)),
        }
    }

    pub async fn get_index(&self) -> Result<FearGreedReading> {
        {
            let cache = self.cache.read().await;
            if let Some(cached) = cache.as_ref() {
                if cached.timestamp.elapsed() < CACHE_DURATION {
                    return Ok(cached.reading.clone());
                }
            }
        }

        let url = format!("{}/fng/?limit=2", self.base_url);
        let resp = self.http_client.get(url).send().await?;

        if !resp.status().is_success() {
            anyhow::bail!("Fear & Greed API returned status {}", resp.status());
        }

        let body: FngResponse = resp.json().await?;
        let Some(current) = body.data.first() else {
            anyhow::bail!("Fear & Greed API returned no data");
        };
        let Some(value) = parse_value(&current.value) else {
            anyhow::bail!("Fear & Greed value is not a number: {}", current.value);
        };
        let previous_value = body.data.get(1).and_then(|e| parse_value(&e.value));

        let reading = FearGreedReading {
            value,
            classification: current.value_classification.clone(),
            previous_value,
            value_change: previous_value.map_or(0, |p| value as i16 - p as i16),
        };

        {
            let mut cache = self.cache.write().await;
            *cache = Some(CachedReading {
                reading: reading.clone(),
                timestamp: Instant::now(),
            });
        }

        Ok(reading)
    }

    /// Like [`get_index`](Self::get_index) but never fails: a neutral
    /// reading stands in for an unreachable feed.
    pub async fn get_index_or_neutral(&self) -> FearGreedReading {
        match self.get_index().await {
            Ok(reading) => reading,
            Err(e) => {
                warn!("⚠️ Fear & Greed unavailable, using neutral {}: {}", NEUTRAL_FEAR_GREED, e);
                FearGreedReading::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_value() {
        assert_eq!(parse_value("72"), Some(72));
        assert_eq!(parse_value(" 5 "), Some(5));
        assert_eq!(parse_value("n/a"), None);
    }

    #[test]
    fn test_default_is_neutral() {
        let reading = FearGreedReading::default();
        assert_eq!(reading.value, 50);
        assert_eq!(reading.value_change, 0);
    }
}
