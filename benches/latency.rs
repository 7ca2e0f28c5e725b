use criterion::{criterion_group, criterion_main, Criterion};
use std::hint::black_box;

use bitcoin_ai_agent::analysis::indicators::calculate_trend;
use bitcoin_ai_agent::analysis::{
    classify, integrate, parse_vision_response, Candle, IndicatorSnapshot, MarketTrend,
};
use chrono::{Duration, TimeZone, Utc};

fn sample_candles(n: usize) -> Vec<Candle> {
    let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    (0..n)
        .map(|i| {
            let close = 90_000_000.0 + (i as f64 * 0.37).sin() * 1_500_000.0 + i as f64 * 10_000.0;
            Candle {
                timestamp: start + Duration::minutes(i as i64),
                open: close,
                high: close * 1.002,
                low: close * 0.998,
                close,
                volume: 1.5,
            }
        })
        .collect()
}

fn benchmark_decision_path(c: &mut Criterion) {
    let json_reply = r#"차트 분석 결과입니다.
    {"trend":"상승","bollinger_position":"하단","trading_signal":"매수","confidence":"높음",
     "analysis_summary":"하단 밴드 지지 후 반등"}"#;
    let prose_reply = "The chart looks bearish with a clear sell setup, confidence is low.";

    let mut group = c.benchmark_group("decision_path");

    group.bench_function("parse_json_reply", |b| {
        b.iter(|| black_box(parse_vision_response(black_box(json_reply))))
    });

    group.bench_function("parse_prose_reply", |b| {
        b.iter(|| black_box(parse_vision_response(black_box(prose_reply))))
    });

    group.bench_function("classify", |b| {
        b.iter(|| black_box(classify(black_box(27.5), black_box(1.2), black_box(0.15), black_box(22))))
    });

    let reading = parse_vision_response(json_reply);
    let signals = classify(27.5, 1.2, 0.15, 22);
    group.bench_function("integrate", |b| {
        b.iter(|| {
            black_box(integrate(
                black_box(&reading),
                black_box(signals),
                black_box(MarketTrend::Neutral),
                black_box(95_000_000.0),
            ))
        })
    });

    group.finish();

    let candles = sample_candles(200);
    let closes: Vec<f64> = candles.iter().map(|c| c.close).collect();
    let mut group = c.benchmark_group("indicators");

    group.bench_function("snapshot_200_bars", |b| {
        b.iter(|| black_box(IndicatorSnapshot::from_candles(black_box(&candles))))
    });

    group.bench_function("trend_200_bars", |b| {
        b.iter(|| black_box(calculate_trend(black_box(&closes), 20)))
    });

    group.finish();
}

criterion_group!(benches, benchmark_decision_path);
criterion_main!(benches);
