use bitcoin_ai_agent::analysis::improvement::{self, ImprovementKind, ImprovementStatus, StrategyImprovement};
use bitcoin_ai_agent::analysis::signals::{classify, classify_fear_greed};
use bitcoin_ai_agent::analysis::types::{
    BbSignal, ConfidenceLabel, MacdSignal, MarketSentiment, RiskLevel, RsiSignal, TradingSignal,
    VisionTrend,
};
use bitcoin_ai_agent::analysis::{
    integrate, parse_vision_response, Decision, MarketSignal, MarketTrend, TradingDecision,
    VisionReading,
};
use bitcoin_ai_agent::strategies::stop_loss::should_trigger;
use bitcoin_ai_agent::strategies::TradeReferenceInfo;
use chrono::Local;

fn confirming_signals() -> MarketSignal {
    MarketSignal {
        rsi_signal: RsiSignal::Oversold,
        macd_signal: MacdSignal::Bullish,
        bb_signal: BbSignal::LowerBand,
        market_sentiment: MarketSentiment::Fear,
    }
}

fn buy_reading(label: ConfidenceLabel) -> VisionReading {
    VisionReading {
        trend: VisionTrend::Up,
        trading_signal: TradingSignal::Buy,
        confidence_label: label,
        summary_text: String::new(),
    }
}

#[test]
fn test_rsi_thresholds_are_exclusive() {
    for rsi in [71.0, 80.0, 99.9] {
        assert_eq!(classify(rsi, 1.0, 0.5, 50).rsi_signal, RsiSignal::Overbought);
    }
    for rsi in [0.0, 10.0, 29.0] {
        assert_eq!(classify(rsi, 1.0, 0.5, 50).rsi_signal, RsiSignal::Oversold);
    }
    assert_eq!(classify(30.0, 1.0, 0.5, 50).rsi_signal, RsiSignal::Neutral);
    assert_eq!(classify(70.0, 1.0, 0.5, 50).rsi_signal, RsiSignal::Neutral);
}

#[test]
fn test_macd_zero_is_bearish() {
    assert_eq!(classify(50.0, 0.0001, 0.5, 50).macd_signal, MacdSignal::Bullish);
    assert_eq!(classify(50.0, 0.0, 0.5, 50).macd_signal, MacdSignal::Bearish);
    assert_eq!(classify(50.0, -3.0, 0.5, 50).macd_signal, MacdSignal::Bearish);
}

#[test]
fn test_bollinger_bands() {
    assert_eq!(classify(50.0, 0.0, 0.81, 50).bb_signal, BbSignal::UpperBand);
    assert_eq!(classify(50.0, 0.0, 0.8, 50).bb_signal, BbSignal::Middle);
    assert_eq!(classify(50.0, 0.0, 0.2, 50).bb_signal, BbSignal::Middle);
    assert_eq!(classify(50.0, 0.0, 0.19, 50).bb_signal, BbSignal::LowerBand);
}

#[test]
fn test_fear_greed_asymmetric_neutral_band() {
    assert_eq!(classify_fear_greed(76), MarketSentiment::ExtremeGreed);
    assert_eq!(classify_fear_greed(56), MarketSentiment::Greed);
    assert_eq!(classify_fear_greed(55), MarketSentiment::Neutral);
    assert_eq!(classify_fear_greed(45), MarketSentiment::Neutral);
    assert_eq!(classify_fear_greed(44), MarketSentiment::Fear);
    assert_eq!(classify_fear_greed(24), MarketSentiment::ExtremeFear);
}

#[test]
fn test_classifier_is_idempotent() {
    let first = classify(63.2, -0.4, 0.91, 33);
    let second = classify(63.2, -0.4, 0.91, 33);
    assert_eq!(first, second);
}

#[test]
fn test_parser_reads_embedded_json() {
    let text = r#"분석 결과: {"trend":"상승","trading_signal":"매수","confidence":"높음"} 입니다"#;
    let reading = parse_vision_response(text);
    assert_eq!(reading.trend, VisionTrend::Up);
    assert_eq!(reading.trading_signal, TradingSignal::Buy);
    assert_eq!(reading.confidence_label, ConfidenceLabel::High);
}

#[test]
fn test_parser_keyword_fallback() {
    let reading = parse_vision_response("가격이 상승하고 있고 매수 신호입니다");
    assert_eq!(reading.trend, VisionTrend::Up);
    assert_eq!(reading.trading_signal, TradingSignal::Buy);
    assert_eq!(reading.confidence_label, ConfidenceLabel::Medium);
}

#[test]
fn test_parser_never_fails_on_garbage() {
    let reading = parse_vision_response("}{ nothing useful here");
    assert_eq!(reading.trading_signal, TradingSignal::Hold);
    assert_eq!(reading.trend, VisionTrend::Sideways);
}

#[test]
fn test_confirmed_buy() {
    let d = integrate(
        &buy_reading(ConfidenceLabel::High),
        confirming_signals(),
        MarketTrend::Upward,
        100_000_000.0,
    );
    assert_eq!(d.decision, Decision::Buy);
    assert_eq!(d.confidence(), 1.0);
    assert_eq!(d.risk_level(), RiskLevel::Low);
    assert_eq!(d.expected_price_range.min, 95_000_000.0);
    assert_eq!(d.expected_price_range.max, 105_000_000.0);
}

#[test]
fn test_downtrend_blocks_buy() {
    let d = integrate(
        &buy_reading(ConfidenceLabel::High),
        confirming_signals(),
        MarketTrend::Downward,
        100.0,
    );
    assert_eq!(d.decision, Decision::Hold);
    assert!((d.confidence() - 0.46).abs() < 1e-9);
    assert_eq!(d.risk_level(), RiskLevel::Medium);
    assert!(d.reason.contains("downtrend"));
}

#[test]
fn test_stop_loss_triggers_on_hold_in_profit() {
    let reference = TradeReferenceInfo {
        buy_price: 80.0,
        buy_amount: 1.0,
        buy_time: Local::now(),
    };
    let hold = TradingDecision::hold(95.0, confirming_signals());
    assert!(should_trigger(100.0, 95.0, &reference, &hold));

    let mut buy = hold.clone();
    buy.set_decision(Decision::Buy);
    assert!(!should_trigger(100.0, 95.0, &reference, &buy));

    let mut sell = hold.clone();
    sell.set_decision(Decision::Sell);
    assert!(!should_trigger(100.0, 95.0, &reference, &sell));
}

#[test]
fn test_improvements_keep_risk_derived() {
    let mut d = TradingDecision::hold(100.0, confirming_signals());
    d.set_confidence(0.3);
    assert_eq!(d.risk_level(), RiskLevel::High);

    let improvements = improvement::select_active(vec![
        StrategyImprovement {
            kind: ImprovementKind::Parameter,
            new_value: "widen stops".into(),
            success_metric: 0.9,
            status: ImprovementStatus::Implemented,
        },
        StrategyImprovement {
            kind: ImprovementKind::Condition,
            new_value: "ignored".into(),
            success_metric: 0.8,
            status: ImprovementStatus::Proposed,
        },
    ]);
    assert_eq!(improvements.len(), 1);

    improvement::apply(&mut d, &improvements);
    assert_eq!(d.confidence(), 0.4);
    assert_eq!(d.risk_level(), RiskLevel::Medium);
}
