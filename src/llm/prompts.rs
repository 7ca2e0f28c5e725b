use serde::Serialize;

use crate::analysis::{IndicatorSnapshot, MarketTrend};

pub const SYSTEM_PROMPT: &str = "You are a cryptocurrency chart analyst. \
Answer with a single JSON object and nothing else.";

/// Numbers sent alongside the chart so the model reads both.
#[derive(Debug, Clone, Serialize)]
pub struct MarketContext {
    pub market: String,
    pub current_price: f64,
    pub rsi: f64,
    pub macd: f64,
    pub macd_signal: f64,
    pub bb_position: f64,
    pub fear_greed: u8,
    pub trend: MarketTrend,
}

impl MarketContext {
    pub fn new(
        market: &str,
        current_price: f64,
        snapshot: &IndicatorSnapshot,
        fear_greed: u8,
        trend: MarketTrend,
    ) -> Self {
        Self {
            market: market.to_string(),
            current_price,
            rsi: snapshot.rsi,
            macd: snapshot.macd,
            macd_signal: snapshot.macd_signal,
            bb_position: snapshot.bb_position,
            fear_greed,
            trend,
        }
    }
}

pub fn chart_analysis_prompt(context: &MarketContext) -> String {
    let data = serde_json::to_string_pretty(context).unwrap_or_else(|_| "{}".to_string());
    format!(
        r#"비트코인 차트와 아래 시장 데이터를 분석하여 다음 정보를 JSON 형태로 제공해주세요:

{{
    "trend": "상승/하락/횡보",
    "bollinger_position": "상단/중간/하단",
    "support_level": "주요 지지선 위치",
    "resistance_level": "주요 저항선 위치",
    "volume_pattern": "거래량 패턴",
    "trading_signal": "매수/매도/보유",
    "confidence": "높음/중간/낮음",
    "analysis_summary": "간단한 분석 요약"
}}

시장 데이터:
{data}

한국어로 응답해주세요."#
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_embeds_market_data() {
        let context = MarketContext::new(
            "KRW-BTC",
            95_000_000.0,
            &IndicatorSnapshot::default(),
            42,
            MarketTrend::Downward,
        );
        let prompt = chart_analysis_prompt(&context);
        assert!(prompt.contains("\"trading_signal\": \"매수/매도/보유\""));
        assert!(prompt.contains("\"fear_greed\": 42"));
        assert!(prompt.contains("KRW-BTC"));
    }
}
