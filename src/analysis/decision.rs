use tracing::{debug, info};

use super::types::{
    BbSignal, Decision, MacdSignal, MarketSignal, MarketTrend, RsiSignal, TradingDecision,
    TradingSignal, VisionReading,
};

/// Confidence multiplier applied while the market is trending down.
pub const DOWNTREND_DAMPING: f64 = 0.7;
pub const CONFIRMATION_BONUS: f64 = 0.2;
pub const REJECTED_BUY_PENALTY: f64 = 0.1;
pub const REJECTED_BUY_FLOOR: f64 = 0.3;

pub const FEAR_GREED_HIGH: u8 = 70;
pub const FEAR_GREED_LOW: u8 = 30;

/// Combine the chart reading with the indicator signals.
///
/// A buy needs every indicator to confirm it; a sell needs an overbought RSI
/// or a bearish MACD inside a downtrend. Everything else holds.
pub fn integrate(
    vision: &VisionReading,
    signals: MarketSignal,
    trend: MarketTrend,
    current_price: f64,
) -> TradingDecision {
    let mut decision = TradingDecision::hold(current_price, signals);
    decision.vision_analysis = vision.clone();
    decision.reason = vision_reason(vision);

    let downward = trend == MarketTrend::Downward;
    let mut confidence = vision.confidence_label.score();
    if downward {
        confidence *= DOWNTREND_DAMPING;
        decision.append_reason("[Caution: market is in a downtrend, confidence reduced]");
    }

    match vision.trading_signal {
        TradingSignal::Buy => {
            let confirmed = signals.rsi_signal == RsiSignal::Oversold
                && signals.macd_signal == MacdSignal::Bullish
                && signals.bb_signal == BbSignal::LowerBand
                && !downward;
            if confirmed {
                decision.set_decision(Decision::Buy);
                confidence = (confidence + CONFIRMATION_BONUS).min(1.0);
                decision.append_reason("[Buy confirmed: RSI oversold, MACD bullish, price at lower band]");
            } else {
                confidence = (confidence - REJECTED_BUY_PENALTY).max(REJECTED_BUY_FLOOR);
                decision.append_reason("[Buy signal not confirmed by indicators, holding]");
            }
        }
        TradingSignal::Sell => {
            let confirmed = signals.rsi_signal == RsiSignal::Overbought
                || (downward && signals.macd_signal == MacdSignal::Bearish);
            if confirmed {
                decision.set_decision(Decision::Sell);
                confidence = (confidence + CONFIRMATION_BONUS).min(1.0);
                decision.append_reason("[Sell confirmed by indicators]");
            } else {
                decision.append_reason("[Sell signal not confirmed by indicators, holding]");
            }
        }
        TradingSignal::Hold => {}
    }

    decision.set_confidence(confidence);
    debug!(
        "Integrated decision: {} (confidence {:.2}, risk {:?})",
        decision.decision,
        decision.confidence(),
        decision.risk_level()
    );
    decision
}

fn vision_reason(vision: &VisionReading) -> String {
    let header = format!(
        "Chart analysis: trend {}, signal {}, confidence {}.",
        vision.trend.label(),
        vision.trading_signal.label(),
        vision.confidence_label.label()
    );
    if vision.summary_text.is_empty() {
        header
    } else {
        format!("{} {}", header, vision.summary_text)
    }
}

/// Decision used when the model call fails or returns nothing: the hold
/// skeleton with a reason templated from the Fear & Greed value.
pub fn indicator_only(signals: MarketSignal, fear_greed: u8, current_price: f64) -> TradingDecision {
    let mut decision = TradingDecision::hold(current_price, signals);

    let sentiment = if fear_greed > FEAR_GREED_HIGH {
        "greed is elevated, watch for overbought conditions"
    } else if fear_greed < FEAR_GREED_LOW {
        "fear is elevated, possible oversold conditions"
    } else {
        "sentiment is balanced"
    };

    decision.reason = format!(
        "Indicator-only analysis (model unavailable): Fear & Greed {} ({}); RSI {:?}, MACD {:?}, Bollinger {:?}.",
        fear_greed, sentiment, signals.rsi_signal, signals.macd_signal, signals.bb_signal
    );
    info!("📉 Using indicator-only decision: {}", decision.reason);
    decision
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::types::{ConfidenceLabel, MarketSentiment, RiskLevel, VisionTrend};

    fn signals(rsi: RsiSignal, macd: MacdSignal, bb: BbSignal) -> MarketSignal {
        MarketSignal {
            rsi_signal: rsi,
            macd_signal: macd,
            bb_signal: bb,
            market_sentiment: MarketSentiment::Neutral,
        }
    }

    fn reading(signal: TradingSignal, label: ConfidenceLabel) -> VisionReading {
        VisionReading {
            trend: VisionTrend::Up,
            trading_signal: signal,
            confidence_label: label,
            summary_text: String::new(),
        }
    }

    #[test]
    fn test_sell_on_overbought() {
        let d = integrate(
            &reading(TradingSignal::Sell, ConfidenceLabel::Medium),
            signals(RsiSignal::Overbought, MacdSignal::Bullish, BbSignal::Middle),
            MarketTrend::Upward,
            100.0,
        );
        assert_eq!(d.decision, Decision::Sell);
        assert!((d.confidence() - 0.7).abs() < 1e-9);
        assert_eq!(d.risk_level(), RiskLevel::Medium);
    }

    #[test]
    fn test_sell_on_downtrend_bearish_macd() {
        let d = integrate(
            &reading(TradingSignal::Sell, ConfidenceLabel::High),
            signals(RsiSignal::Neutral, MacdSignal::Bearish, BbSignal::Middle),
            MarketTrend::Downward,
            100.0,
        );
        assert_eq!(d.decision, Decision::Sell);
        assert!((d.confidence() - 0.76).abs() < 1e-9);
        assert!(d.reason.contains("downtrend"));
    }

    #[test]
    fn test_unconfirmed_sell_keeps_confidence() {
        let d = integrate(
            &reading(TradingSignal::Sell, ConfidenceLabel::Low),
            signals(RsiSignal::Neutral, MacdSignal::Bullish, BbSignal::Middle),
            MarketTrend::Neutral,
            100.0,
        );
        assert_eq!(d.decision, Decision::Hold);
        assert!((d.confidence() - 0.3).abs() < 1e-9);
        assert_eq!(d.risk_level(), RiskLevel::High);
    }

    #[test]
    fn test_rejected_buy_floors_confidence() {
        let d = integrate(
            &reading(TradingSignal::Buy, ConfidenceLabel::Low),
            signals(RsiSignal::Neutral, MacdSignal::Bullish, BbSignal::LowerBand),
            MarketTrend::Neutral,
            100.0,
        );
        assert_eq!(d.decision, Decision::Hold);
        assert!((d.confidence() - 0.3).abs() < 1e-9);
    }

    #[test]
    fn test_hold_signal_passes_through() {
        let d = integrate(
            &reading(TradingSignal::Hold, ConfidenceLabel::High),
            signals(RsiSignal::Oversold, MacdSignal::Bullish, BbSignal::LowerBand),
            MarketTrend::Upward,
            50_000_000.0,
        );
        assert_eq!(d.decision, Decision::Hold);
        assert!((d.confidence() - 0.8).abs() < 1e-9);
        assert_eq!(d.risk_level(), RiskLevel::Low);
        assert!((d.expected_price_range.max - 52_500_000.0).abs() < 1e-3);
    }

    #[test]
    fn test_indicator_only_reason_templates() {
        let s = signals(RsiSignal::Neutral, MacdSignal::Bearish, BbSignal::Middle);

        let greedy = indicator_only(s, 71, 100.0);
        assert_eq!(greedy.decision, Decision::Hold);
        assert_eq!(greedy.confidence(), 0.5);
        assert_eq!(greedy.risk_level(), RiskLevel::Medium);
        assert!(greedy.reason.contains("greed is elevated"));

        assert!(indicator_only(s, 29, 100.0).reason.contains("fear is elevated"));
        assert!(indicator_only(s, 70, 100.0).reason.contains("balanced"));
        assert!(indicator_only(s, 30, 100.0).reason.contains("balanced"));
    }
}
