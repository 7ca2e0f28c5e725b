use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RsiSignal {
    Overbought,
    Oversold,
    #[default]
    Neutral,
}

/// Binary: a zero MACD counts as bearish.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MacdSignal {
    Bullish,
    Bearish,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BbSignal {
    UpperBand,
    LowerBand,
    #[default]
    Middle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarketSentiment {
    ExtremeGreed,
    Greed,
    #[default]
    Neutral,
    Fear,
    ExtremeFear,
}

/// Categorical read of the indicator values for one cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketSignal {
    pub rsi_signal: RsiSignal,
    pub macd_signal: MacdSignal,
    pub bb_signal: BbSignal,
    pub market_sentiment: MarketSentiment,
}

/// Price momentum supplied by the caller. Distinct from the chart trend the
/// vision model reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarketTrend {
    Upward,
    Downward,
    #[default]
    Neutral,
}

// Vision labels are the Korean words the model is prompted to answer with.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum VisionTrend {
    #[serde(rename = "상승")]
    Up,
    #[serde(rename = "하락")]
    Down,
    #[default]
    #[serde(rename = "횡보")]
    Sideways,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TradingSignal {
    #[serde(rename = "매수")]
    Buy,
    #[serde(rename = "매도")]
    Sell,
    #[default]
    #[serde(rename = "보유")]
    Hold,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConfidenceLabel {
    #[serde(rename = "높음")]
    High,
    #[default]
    #[serde(rename = "중간")]
    Medium,
    #[serde(rename = "낮음")]
    Low,
}

impl VisionTrend {
    pub fn label(self) -> &'static str {
        match self {
            VisionTrend::Up => "상승",
            VisionTrend::Down => "하락",
            VisionTrend::Sideways => "횡보",
        }
    }
}

impl TradingSignal {
    pub fn label(self) -> &'static str {
        match self {
            TradingSignal::Buy => "매수",
            TradingSignal::Sell => "매도",
            TradingSignal::Hold => "보유",
        }
    }
}

impl ConfidenceLabel {
    pub fn label(self) -> &'static str {
        match self {
            ConfidenceLabel::High => "높음",
            ConfidenceLabel::Medium => "중간",
            ConfidenceLabel::Low => "낮음",
        }
    }

    /// Numeric confidence for the label.
    pub fn score(self) -> f64 {
        match self {
            ConfidenceLabel::High => 0.8,
            ConfidenceLabel::Medium => 0.5,
            ConfidenceLabel::Low => 0.3,
        }
    }
}

/// Chart interpretation parsed out of a model response. Every field has a
/// safe default so a partial or garbled answer still yields a reading.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct VisionReading {
    #[serde(default, deserialize_with = "lenient")]
    pub trend: VisionTrend,
    #[serde(default, deserialize_with = "lenient")]
    pub trading_signal: TradingSignal,
    #[serde(rename = "confidence", default, deserialize_with = "lenient")]
    pub confidence_label: ConfidenceLabel,
    #[serde(rename = "analysis_summary", default, deserialize_with = "lenient_text")]
    pub summary_text: String,
}

/// Unknown labels (or non-string values) fall back to the default instead of
/// failing the whole structured parse.
fn lenient<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + DeserializeOwned,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).unwrap_or_default())
}

fn lenient_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::String(s) => s,
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Decision {
    Buy,
    Sell,
    Hold,
}

impl Decision {
    pub fn as_str(self) -> &'static str {
        match self {
            Decision::Buy => "buy",
            Decision::Sell => "sell",
            Decision::Hold => "hold",
        }
    }
}

impl std::fmt::Display for Decision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    /// >0.7 low, <0.4 high, otherwise medium.
    pub fn from_confidence(confidence: f64) -> Self {
        if confidence > 0.7 {
            RiskLevel::Low
        } else if confidence < 0.4 {
            RiskLevel::High
        } else {
            RiskLevel::Medium
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceRange {
    pub min: f64,
    pub max: f64,
}

impl PriceRange {
    /// ±5% band around the current price.
    pub fn around(current_price: f64) -> Self {
        Self {
            min: current_price * 0.95,
            max: current_price * 1.05,
        }
    }
}

/// Final per-cycle decision handed to execution.
///
/// `confidence` is always within [0, 1] and `risk_level` is always the value
/// derived from it; both only change through [`TradingDecision::set_confidence`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TradingDecision {
    pub decision: Decision,
    confidence: f64,
    risk_level: RiskLevel,
    pub expected_price_range: PriceRange,
    pub key_indicators: MarketSignal,
    pub vision_analysis: VisionReading,
    pub reason: String,
}

impl TradingDecision {
    /// Conservative skeleton: hold at 0.5 confidence.
    pub fn hold(current_price: f64, key_indicators: MarketSignal) -> Self {
        let mut decision = Self {
            decision: Decision::Hold,
            confidence: 0.5,
            risk_level: RiskLevel::Medium,
            expected_price_range: PriceRange::around(current_price),
            key_indicators,
            vision_analysis: VisionReading::default(),
            reason: String::new(),
        };
        decision.set_confidence(0.5);
        decision
    }

    pub fn confidence(&self) -> f64 {
        self.confidence
    }

    pub fn risk_level(&self) -> RiskLevel {
        self.risk_level
    }

    pub fn set_confidence(&mut self, confidence: f64) {
        let confidence = if confidence.is_nan() {
            0.0
        } else {
            confidence.clamp(0.0, 1.0)
        };
        self.confidence = confidence;
        self.risk_level = RiskLevel::from_confidence(confidence);
    }

    pub fn set_decision(&mut self, decision: Decision) {
        self.decision = decision;
    }

    pub fn append_reason(&mut self, note: &str) {
        if !self.reason.is_empty() {
            self.reason.push(' ');
        }
        self.reason.push_str(note);
    }
}

/// Minimal override record emitted by the stop-loss check. It carries no
/// confidence or risk fields.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ForcedSell {
    pub decision: Decision,
}

impl ForcedSell {
    pub fn new() -> Self {
        Self {
            decision: Decision::Sell,
        }
    }
}

impl Default for ForcedSell {
    fn default() -> Self {
        Self::new()
    }
}
