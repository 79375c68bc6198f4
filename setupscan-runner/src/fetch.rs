//! Batch data fetch. Completed in full before any computation starts.
//!
//! Failures are isolated per symbol: the symbol is recorded with its reason
//! and dropped from the cycle, and every other symbol proceeds.

use chrono::{Duration, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use setupscan_core::domain::{Bar, BarSeries, SessionSnapshot};
use setupscan_core::indicators::opening_range;
use tracing::{debug, info, warn};

use crate::provider::{BarProvider, DataError, Timeframe};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchRequest {
    pub timeframe: Timeframe,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

/// A symbol excluded from this cycle and why.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymbolFailure {
    pub symbol: String,
    pub reason: String,
}

#[derive(Debug, Clone, Default)]
pub struct FetchedUniverse {
    pub series: Vec<BarSeries>,
    /// `None` when the benchmark could not be fetched; the regime then
    /// fails closed.
    pub benchmark: Option<BarSeries>,
    pub failures: Vec<SymbolFailure>,
}

impl FetchedUniverse {
    pub fn requested(&self) -> usize {
        self.series.len() + self.failures.len()
    }
}

fn fetch_one(
    provider: &dyn BarProvider,
    symbol: &str,
    request: &FetchRequest,
    benchmark: bool,
) -> Result<BarSeries, DataError> {
    let bars = if benchmark {
        provider.get_benchmark_bars(symbol, request.timeframe, request.start, request.end)?
    } else {
        provider.get_bars(symbol, request.timeframe, request.start, request.end)?
    };
    Ok(BarSeries::new(symbol, bars)?)
}

pub fn fetch_batch(
    provider: &dyn BarProvider,
    symbols: &[String],
    benchmark: &str,
    request: &FetchRequest,
) -> FetchedUniverse {
    let mut out = FetchedUniverse::default();
    for symbol in symbols {
        match fetch_one(provider, symbol, request, false) {
            Ok(series) => {
                debug!(symbol = %symbol, bars = series.len(), "fetched");
                out.series.push(series);
            }
            Err(e) => {
                warn!(symbol = %symbol, error = %e, "fetch failed, excluding symbol");
                out.failures.push(SymbolFailure {
                    symbol: symbol.clone(),
                    reason: e.to_string(),
                });
            }
        }
    }
    out.benchmark = match fetch_one(provider, benchmark, request, true) {
        Ok(series) => Some(series),
        Err(e) => {
            warn!(benchmark, error = %e, "benchmark unavailable, regime will report closed");
            None
        }
    };
    info!(
        provider = provider.name(),
        fetched = out.series.len(),
        failed = out.failures.len(),
        benchmark = out.benchmark.is_some(),
        "batch fetch complete"
    );
    out
}

/// Session facts for the latest day in `intraday` bars.
///
/// The open is the first bar at or after `session_open`; opening volume sums
/// the bars in the opening range window. `None` when no bar falls inside
/// the window.
pub fn session_snapshot(
    intraday: &[Bar],
    session_open: NaiveTime,
    opening_minutes: u32,
    prev_close: Option<f64>,
    premarket_notional: Option<f64>,
) -> Option<SessionSnapshot> {
    let range = opening_range(intraday, session_open, opening_minutes)?;
    let start = intraday.last()?.timestamp.date().and_time(session_open);
    let end = start + Duration::minutes(i64::from(opening_minutes));
    let window: Vec<&Bar> = intraday
        .iter()
        .filter(|b| b.timestamp >= start && b.timestamp <= end)
        .collect();
    debug_assert_eq!(window.len(), range.bars);
    Some(SessionSnapshot {
        open: window.first().map(|b| b.open),
        prev_close,
        premarket_notional,
        opening_volume: Some(window.iter().map(|b| b.volume).sum()),
    })
}
