use tracing::debug;

use super::types::{ConfidenceLabel, TradingSignal, VisionReading, VisionTrend};

const UP_KEYWORDS: &[&str] = &["상승", "up", "bullish", "매수"];
const DOWN_KEYWORDS: &[&str] = &["하락", "down", "bearish", "매도"];
const BUY_KEYWORDS: &[&str] = &["매수", "buy", "long"];
const SELL_KEYWORDS: &[&str] = &["매도", "sell", "short"];
const HIGH_KEYWORDS: &[&str] = &["높음", "high", "강함"];
const LOW_KEYWORDS: &[&str] = &["낮음", "low", "약함"];

const SUMMARY_CHARS: usize = 200;

/// Parse a model answer into a [`VisionReading`].
///
/// An embedded JSON object (first `{` to last `}`) is preferred; anything
/// else falls back to keyword matching. Never fails.
pub fn parse_vision_response(text: &str) -> VisionReading {
    match parse_structured(text) {
        Some(reading) => reading,
        None => {
            debug!("Vision response has no usable JSON, falling back to keywords");
            parse_keywords(text)
        }
    }
}

fn parse_structured(text: &str) -> Option<VisionReading> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end < start {
        return None;
    }
    serde_json::from_str(&text[start..=end]).ok()
}

fn contains_any(haystack: &str, needles: &[&str]) -> bool {
    needles.iter().any(|n| haystack.contains(n))
}

fn parse_keywords(text: &str) -> VisionReading {
    let lowered = text.to_lowercase();

    let trend = if contains_any(&lowered, UP_KEYWORDS) {
        VisionTrend::Up
    } else if contains_any(&lowered, DOWN_KEYWORDS) {
        VisionTrend::Down
    } else {
        VisionTrend::Sideways
    };

    let trading_signal = if contains_any(&lowered, BUY_KEYWORDS) {
        TradingSignal::Buy
    } else if contains_any(&lowered, SELL_KEYWORDS) {
        TradingSignal::Sell
    } else {
        TradingSignal::Hold
    };

    let confidence_label = if contains_any(&lowered, HIGH_KEYWORDS) {
        ConfidenceLabel::High
    } else if contains_any(&lowered, LOW_KEYWORDS) {
        ConfidenceLabel::Low
    } else {
        ConfidenceLabel::Medium
    };

    VisionReading {
        trend,
        trading_signal,
        confidence_label,
        summary_text: text.trim().chars().take(SUMMARY_CHARS).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_embedded_in_prose() {
        let text = "분석 결과입니다:\n```json\n{\"trend\": \"하락\", \"trading_signal\": \"매도\", \"confidence\": \"낮음\", \"analysis_summary\": \"지지선 이탈\"}\n```";
        let reading = parse_vision_response(text);
        assert_eq!(reading.trend, VisionTrend::Down);
        assert_eq!(reading.trading_signal, TradingSignal::Sell);
        assert_eq!(reading.confidence_label, ConfidenceLabel::Low);
        assert_eq!(reading.summary_text, "지지선 이탈");
    }

    #[test]
    fn test_broken_json_uses_keywords() {
        let reading = parse_vision_response("{trend: bearish, signal: SELL, confidence: high");
        assert_eq!(reading.trend, VisionTrend::Down);
        assert_eq!(reading.trading_signal, TradingSignal::Sell);
        assert_eq!(reading.confidence_label, ConfidenceLabel::High);
    }

    #[test]
    fn test_reversed_braces_fall_back() {
        let reading = parse_vision_response("} nothing here {");
        assert_eq!(reading.trend, VisionTrend::Sideways);
        assert_eq!(reading.trading_signal, TradingSignal::Hold);
        assert_eq!(reading.confidence_label, ConfidenceLabel::Medium);
    }

    #[test]
    fn test_empty_text_defaults() {
        assert_eq!(parse_vision_response(""), VisionReading::default());
    }

    #[test]
    fn test_summary_is_truncated_on_char_boundary() {
        let long = "횡".repeat(500);
        let reading = parse_vision_response(&long);
        assert_eq!(reading.summary_text.chars().count(), SUMMARY_CHARS);
    }
}
