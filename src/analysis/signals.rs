use super::indicators::IndicatorSnapshot;
use super::types::{BbSignal, MacdSignal, MarketSentiment, MarketSignal, RsiSignal};

pub const RSI_OVERBOUGHT: f64 = 70.0;
pub const RSI_OVERSOLD: f64 = 30.0;
pub const BB_UPPER: f64 = 0.8;
pub const BB_LOWER: f64 = 0.2;

/// Fear & Greed value used when the feed is unavailable.
pub const NEUTRAL_FEAR_GREED: u8 = 50;

/// Classify the raw indicator values. Thresholds are exclusive.
pub fn classify(rsi: f64, macd: f64, bb_position: f64, fear_greed: u8) -> MarketSignal {
    MarketSignal {
        rsi_signal: classify_rsi(rsi),
        macd_signal: classify_macd(macd),
        bb_signal: classify_bollinger(bb_position),
        market_sentiment: classify_fear_greed(fear_greed),
    }
}

pub fn classify_snapshot(snapshot: &IndicatorSnapshot, fear_greed: u8) -> MarketSignal {
    classify(snapshot.rsi, snapshot.macd, snapshot.bb_position, fear_greed)
}

pub fn classify_rsi(rsi: f64) -> RsiSignal {
    if rsi > RSI_OVERBOUGHT {
        RsiSignal::Overbought
    } else if rsi < RSI_OVERSOLD {
        RsiSignal::Oversold
    } else {
        RsiSignal::Neutral
    }
}

pub fn classify_macd(macd: f64) -> MacdSignal {
    if macd > 0.0 {
        MacdSignal::Bullish
    } else {
        MacdSignal::Bearish
    }
}

pub fn classify_bollinger(bb_position: f64) -> BbSignal {
    if bb_position > BB_UPPER {
        BbSignal::UpperBand
    } else if bb_position < BB_LOWER {
        BbSignal::LowerBand
    } else {
        BbSignal::Middle
    }
}

/// First match wins; the neutral band is 45..=55.
pub fn classify_fear_greed(value: u8) -> MarketSentiment {
    if value > 75 {
        MarketSentiment::ExtremeGreed
    } else if value > 55 {
        MarketSentiment::Greed
    } else if value < 25 {
        MarketSentiment::ExtremeFear
    } else if value < 45 {
        MarketSentiment::Fear
    } else {
        MarketSentiment::Neutral
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rsi_boundaries_are_neutral() {
        assert_eq!(classify_rsi(70.0), RsiSignal::Neutral);
        assert_eq!(classify_rsi(30.0), RsiSignal::Neutral);
        assert_eq!(classify_rsi(70.01), RsiSignal::Overbought);
        assert_eq!(classify_rsi(29.99), RsiSignal::Oversold);
    }

    #[test]
    fn test_bollinger_bands() {
        assert_eq!(classify_bollinger(0.81), BbSignal::UpperBand);
        assert_eq!(classify_bollinger(0.8), BbSignal::Middle);
        assert_eq!(classify_bollinger(0.2), BbSignal::Middle);
        assert_eq!(classify_bollinger(0.0), BbSignal::LowerBand);
    }

    #[test]
    fn test_fear_greed_edges() {
        assert_eq!(classify_fear_greed(100), MarketSentiment::ExtremeGreed);
        assert_eq!(classify_fear_greed(75), MarketSentiment::Greed);
        assert_eq!(classify_fear_greed(25), MarketSentiment::Fear);
        assert_eq!(classify_fear_greed(0), MarketSentiment::ExtremeFear);
        assert_eq!(classify_fear_greed(NEUTRAL_FEAR_GREED), MarketSentiment::Neutral);
    }
}
