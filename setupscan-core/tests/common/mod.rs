//! Synthetic bar fixtures shared by the integration tests.

#![allow(dead_code)]

use chrono::{Duration, NaiveDate};
use setupscan_core::domain::{Bar, BarSeries};

pub fn bar(day: usize, open: f64, high: f64, low: f64, close: f64, volume: f64) -> Bar {
    Bar {
        timestamp: NaiveDate::from_ymd_opt(2024, 1, 2)
            .unwrap()
            .and_hms_opt(16, 0, 0)
            .unwrap()
            + Duration::days(day as i64),
        open,
        high,
        low,
        close,
        volume,
    }
}

pub fn series_from_closes(symbol: &str, closes: &[f64]) -> BarSeries {
    let bars = closes
        .iter()
        .enumerate()
        .map(|(i, &c)| bar(i, c, c * 1.01, c * 0.99, c, 1_000.0))
        .collect();
    BarSeries::new(symbol, bars).unwrap()
}

/// Impulse, tight base with rising pivot lows, then a breakout bar closing
/// at 99.0 on `breakout_volume`. Every earlier bar trades 1000 shares.
pub fn flag_series(breakout_volume: f64) -> BarSeries {
    let mut bars = Vec::new();
    let mut day = 0;
    for i in 0..40 {
        let c = 50.0 + i as f64 * 0.5;
        bars.push(bar(day, c - 0.2, c + 1.5, c - 1.5, c, 1000.0));
        day += 1;
    }
    for i in 0..19 {
        let c = 70.0 + i as f64 * 1.4;
        bars.push(bar(day, c - 0.2, c + 1.5, c - 1.5, c, 1000.0));
        day += 1;
    }
    let dips = [(4, 96.0), (10, 96.2), (16, 96.4)];
    for i in 0..20 {
        let c = if i % 2 == 0 { 97.0 } else { 97.4 };
        let low = dips
            .iter()
            .find(|(at, _)| *at == i)
            .map(|(_, l)| *l)
            .unwrap_or(c - 0.3);
        bars.push(bar(day, c, c + 0.3, low, c, 1000.0));
        day += 1;
    }
    bars.push(bar(day, 97.4, 99.3, 97.2, 99.0, breakout_volume));
    BarSeries::new("FLAG", bars).unwrap()
}

/// Steadily compounding benchmark closes.
pub fn rising_closes(len: usize) -> Vec<f64> {
    (0..len).map(|i| 100.0 * 1.004_f64.powi(i as i32)).collect()
}
