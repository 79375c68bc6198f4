//! Criterion benchmarks for the scan hot paths.
//!
//! Benchmarks:
//! 1. Indicator snapshot for one symbol
//! 2. Full detector battery for one symbol
//! 3. Universe cycle, sequential vs pooled

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use std::collections::HashMap;

use setupscan_core::domain::{Bar, BarSeries, IndicatorSet};
use setupscan_core::indicators::IndicatorConfig;
use setupscan_core::regime::RegimeState;
use setupscan_core::setups::{DetectionContext, DetectorSet, SetupsConfig};
use setupscan_core::{ScanConfig, ScreenConfig};
use setupscan_runner::{run_cycle, CycleOptions, FetchedUniverse};

// ── Helpers ──────────────────────────────────────────────────────────

fn make_bars(n: usize, phase: f64) -> Vec<Bar> {
    let base = chrono::NaiveDate::from_ymd_opt(2020, 1, 2)
        .unwrap()
        .and_hms_opt(16, 0, 0)
        .unwrap();
    (0..n)
        .map(|i| {
            let close = 100.0 + (i as f64 * 0.1 + phase).sin() * 10.0 + i as f64 * 0.05;
            Bar {
                timestamp: base + chrono::Duration::days(i as i64),
                open: close - 0.3,
                high: close + 1.5,
                low: close - 1.5,
                close,
                volume: 1_000_000.0 + (i % 500) as f64 * 1_000.0,
            }
        })
        .collect()
}

fn make_universe(symbols: usize, bars: usize) -> FetchedUniverse {
    FetchedUniverse {
        series: (0..symbols)
            .map(|s| BarSeries::new(format!("S{s:03}"), make_bars(bars, s as f64)).unwrap())
            .collect(),
        benchmark: Some(BarSeries::new("SPY", make_bars(bars, 0.7)).unwrap()),
        failures: Vec::new(),
    }
}

// ── 1-2. Per-symbol ──────────────────────────────────────────────────

fn bench_symbol(c: &mut Criterion) {
    let series = BarSeries::new("BENCH", make_bars(252, 0.0)).unwrap();
    let config = IndicatorConfig::default();
    let detectors = DetectorSet::from_config(&SetupsConfig::default());
    let regime = RegimeState::closed();

    let mut group = c.benchmark_group("symbol");
    group.bench_function("indicator_set_252_bars", |b| {
        b.iter(|| IndicatorSet::compute(black_box(&series), None, &config))
    });
    group.bench_function("detect_all_252_bars", |b| {
        b.iter(|| detectors.detect_all(&DetectionContext::new(black_box(&series), &regime)))
    });
    group.finish();
}

// ── 3. Universe cycle ────────────────────────────────────────────────

fn bench_cycle(c: &mut Criterion) {
    let data = make_universe(500, 252);
    let config = ScanConfig {
        screen: ScreenConfig {
            adr_min_pct: 0.0,
            ..ScreenConfig::default()
        },
        ..ScanConfig::stocks()
    };
    let sessions = HashMap::new();

    let mut group = c.benchmark_group("cycle");
    group.sample_size(10);
    for workers in [1usize, 4] {
        group.bench_with_input(BenchmarkId::new("500_symbols", workers), &workers, |b, &w| {
            let options = CycleOptions {
                workers: w,
                timeout: None,
            };
            b.iter(|| run_cycle(&config, black_box(&data), &sessions, &options).unwrap())
        });
    }
    group.finish();
}

criterion_group!(benches, bench_symbol, bench_cycle);
criterion_main!(benches);
