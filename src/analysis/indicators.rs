//! Standard indicator arithmetic over OHLCV candles.
//!
//! All series functions return a vector aligned with the input, with `NAN`
//! for bars that fall inside the lookback window.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::types::MarketTrend;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

pub const RSI_PERIOD: usize = 14;
pub const MACD_FAST: usize = 12;
pub const MACD_SLOW: usize = 26;
pub const MACD_SIGNAL: usize = 9;
pub const BB_PERIOD: usize = 20;
pub const BB_MULTIPLIER: f64 = 2.0;
pub const TREND_WINDOW: usize = 20;

/// Latest indicator values, already defaulted to neutral midpoints when the
/// series is too short to produce them.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IndicatorSnapshot {
    pub rsi: f64,
    pub macd: f64,
    pub macd_signal: f64,
    pub bb_position: f64,
    pub sma_20: Option<f64>,
}

impl Default for IndicatorSnapshot {
    fn default() -> Self {
        Self {
            rsi: 50.0,
            macd: 0.0,
            macd_signal: 0.0,
            bb_position: 0.5,
            sma_20: None,
        }
    }
}

impl IndicatorSnapshot {
    pub fn from_candles(candles: &[Candle]) -> Self {
        let closes = closes(candles);
        let defaults = Self::default();

        let (macd_line, signal_line) = macd(&closes, MACD_FAST, MACD_SLOW, MACD_SIGNAL);

        Self {
            rsi: last_finite(&rsi(&closes, RSI_PERIOD)).unwrap_or(defaults.rsi),
            macd: last_finite(&macd_line).unwrap_or(defaults.macd),
            macd_signal: last_finite(&signal_line).unwrap_or(defaults.macd_signal),
            bb_position: last_finite(&bollinger_position(&closes, BB_PERIOD, BB_MULTIPLIER))
                .unwrap_or(defaults.bb_position),
            sma_20: last_finite(&sma(&closes, BB_PERIOD)),
        }
    }
}

pub fn closes(candles: &[Candle]) -> Vec<f64> {
    candles.iter().map(|c| c.close).collect()
}

fn last_finite(series: &[f64]) -> Option<f64> {
    series.last().copied().filter(|v| v.is_finite())
}

pub fn sma(values: &[f64], period: usize) -> Vec<f64> {
    let n = values.len();
    let mut out = vec![f64::NAN; n];
    if period == 0 || n < period {
        return out;
    }

    let mut sum: f64 = values[..period].iter().sum();
    out[period - 1] = sum / period as f64;
    for i in period..n {
        sum += values[i] - values[i - period];
        out[i] = sum / period as f64;
    }
    out
}

/// EMA seeded with the SMA of the first `period` values.
pub fn ema(values: &[f64], period: usize) -> Vec<f64> {
    let n = values.len();
    let mut out = vec![f64::NAN; n];
    if period == 0 || n < period {
        return out;
    }

    let alpha = 2.0 / (period as f64 + 1.0);
    let mut prev = values[..period].iter().sum::<f64>() / period as f64;
    out[period - 1] = prev;
    for i in period..n {
        prev = alpha * values[i] + (1.0 - alpha) * prev;
        out[i] = prev;
    }
    out
}

/// Wilder RSI. A flat window with no losses reads 100.
pub fn rsi(values: &[f64], period: usize) -> Vec<f64> {
    let n = values.len();
    let mut out = vec![f64::NAN; n];
    if period == 0 || n < period + 1 {
        return out;
    }

    let mut avg_gain = 0.0;
    let mut avg_loss = 0.0;
    for i in 1..=period {
        let change = values[i] - values[i - 1];
        if change > 0.0 {
            avg_gain += change;
        } else {
            avg_loss -= change;
        }
    }
    avg_gain /= period as f64;
    avg_loss /= period as f64;
    out[period] = rsi_value(avg_gain, avg_loss);

    let p = period as f64;
    for i in (period + 1)..n {
        let change = values[i] - values[i - 1];
        let (gain, loss) = if change > 0.0 {
            (change, 0.0)
        } else {
            (0.0, -change)
        };
        avg_gain = (avg_gain * (p - 1.0) + gain) / p;
        avg_loss = (avg_loss * (p - 1.0) + loss) / p;
        out[i] = rsi_value(avg_gain, avg_loss);
    }
    out
}

fn rsi_value(avg_gain: f64, avg_loss: f64) -> f64 {
    if avg_loss == 0.0 {
        100.0
    } else {
        100.0 - 100.0 / (1.0 + avg_gain / avg_loss)
    }
}

/// Returns the MACD line (fast EMA - slow EMA) and its signal EMA.
pub fn macd(values: &[f64], fast: usize, slow: usize, signal: usize) -> (Vec<f64>, Vec<f64>) {
    let fast_ema = ema(values, fast);
    let slow_ema = ema(values, slow);
    let line: Vec<f64> = fast_ema
        .iter()
        .zip(&slow_ema)
        .map(|(f, s)| f - s)
        .collect();

    let mut signal_line = vec![f64::NAN; values.len()];
    if let Some(start) = line.iter().position(|v| v.is_finite()) {
        let tail = ema(&line[start..], signal);
        signal_line[start..].copy_from_slice(&tail);
    }
    (line, signal_line)
}

/// Bollinger %B: 0 at the lower band, 1 at the upper band. Population stddev.
pub fn bollinger_position(values: &[f64], period: usize, multiplier: f64) -> Vec<f64> {
    let n = values.len();
    let mut out = vec![f64::NAN; n];
    if period == 0 || n < period {
        return out;
    }

    for i in (period - 1)..n {
        let window = &values[i + 1 - period..=i];
        let mean = window.iter().sum::<f64>() / period as f64;
        let std = population_std(window, mean);
        let upper = mean + multiplier * std;
        let lower = mean - multiplier * std;
        out[i] = if upper > lower {
            (values[i] - lower) / (upper - lower)
        } else {
            0.5
        };
    }
    out
}

fn population_std(values: &[f64], mean: f64) -> f64 {
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64;
    variance.sqrt()
}

/// Momentum from the slope of the `window`-period SMA, compared against 1% of
/// the closes' standard deviation.
///
/// The slope is measured over the last `window` bars, or over every bar with a
/// defined SMA when the series is shorter than that.
pub fn calculate_trend(closes: &[f64], window: usize) -> MarketTrend {
    if window == 0 || closes.len() < window + 1 {
        return MarketTrend::Neutral;
    }

    let averages = sma(closes, window);
    let last = averages.len() - 1;
    let first_defined = window - 1;
    let start = last.saturating_sub(window).max(first_defined);
    let current = averages[last];
    let previous = averages[start];
    if !current.is_finite() || !previous.is_finite() {
        return MarketTrend::Neutral;
    }

    let slope = (current - previous) / (last - start) as f64;
    let mean = closes.iter().sum::<f64>() / closes.len() as f64;
    let threshold = population_std(closes, mean) * 0.01;

    if slope > threshold {
        MarketTrend::Upward
    } else if slope < -threshold {
        MarketTrend::Downward
    } else {
        MarketTrend::Neutral
    }
}

/// Mean of the last `count` highs, or `None` when fewer bars exist.
pub fn recent_high_average(candles: &[Candle], count: usize) -> Option<f64> {
    if count == 0 || candles.len() < count {
        return None;
    }
    let recent = &candles[candles.len() - count..];
    Some(recent.iter().map(|c| c.high).sum::<f64>() / count as f64)
}
