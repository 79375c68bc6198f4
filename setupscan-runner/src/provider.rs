//! Bar provider trait and structured error types.
//!
//! The BarProvider trait abstracts over data sources (broker APIs, CSV
//! exports, in-memory fixtures) so the cycle can swap implementations and
//! mock for tests. Providers return bars in strictly ascending time order;
//! a short or empty result is a valid response, not an error.

use std::collections::HashMap;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use setupscan_core::domain::{Bar, BarError};
use thiserror::Error;

/// Structured error types for data operations.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("symbol not found: {symbol}")]
    SymbolNotFound { symbol: String },

    #[error("provider unavailable for '{symbol}': {reason}")]
    Unavailable { symbol: String, reason: String },

    #[error("malformed data for '{symbol}': {reason}")]
    Malformed { symbol: String, reason: String },

    #[error("invalid bar sequence: {0}")]
    InvalidBars(#[from] BarError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Bar interval requested from a provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Timeframe {
    Minute1,
    Minute5,
    Minute15,
    Hour1,
    Daily,
}

impl Timeframe {
    /// Short token used in file names and logs.
    pub fn token(&self) -> &'static str {
        match self {
            Self::Minute1 => "1min",
            Self::Minute5 => "5min",
            Self::Minute15 => "15min",
            Self::Hour1 => "1hour",
            Self::Daily => "1day",
        }
    }
}

/// Trait for bar providers.
///
/// Implementations handle the specifics of fetching bars from a particular
/// source. The benchmark comes through the same trait.
pub trait BarProvider: Send + Sync {
    /// Human-readable name of this provider.
    fn name(&self) -> &str;

    /// Bars for `symbol` with timestamps in `start..=end`, ascending.
    fn get_bars(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Result<Vec<Bar>, DataError>;

    fn get_benchmark_bars(
        &self,
        benchmark: &str,
        timeframe: Timeframe,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Result<Vec<Bar>, DataError> {
        self.get_bars(benchmark, timeframe, start, end)
    }
}

/// Provider over bars held in memory. Used by tests and by callers that
/// fetched through their own client.
#[derive(Debug, Clone, Default)]
pub struct InMemoryProvider {
    bars: HashMap<(String, Timeframe), Vec<Bar>>,
    failures: HashMap<String, String>,
}

impl InMemoryProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, symbol: impl Into<String>, timeframe: Timeframe, mut bars: Vec<Bar>) {
        bars.sort_by_key(|b| b.timestamp);
        self.bars.insert((symbol.into(), timeframe), bars);
    }

    pub fn with_bars(mut self, symbol: impl Into<String>, timeframe: Timeframe, bars: Vec<Bar>) -> Self {
        self.insert(symbol, timeframe, bars);
        self
    }

    /// Make every request for `symbol` fail with `reason`.
    pub fn with_failure(mut self, symbol: impl Into<String>, reason: impl Into<String>) -> Self {
        self.failures.insert(symbol.into(), reason.into());
        self
    }

    pub fn symbols(&self) -> Vec<&str> {
        let mut out: Vec<&str> = self.bars.keys().map(|(s, _)| s.as_str()).collect();
        out.sort_unstable();
        out.dedup();
        out
    }
}

impl BarProvider for InMemoryProvider {
    fn name(&self) -> &str {
        "memory"
    }

    fn get_bars(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Result<Vec<Bar>, DataError> {
        if let Some(reason) = self.failures.get(symbol) {
            return Err(DataError::Unavailable {
                symbol: symbol.to_string(),
                reason: reason.clone(),
            });
        }
        let bars = self
            .bars
            .get(&(symbol.to_string(), timeframe))
            .ok_or_else(|| DataError::SymbolNotFound {
                symbol: symbol.to_string(),
            })?;
        Ok(bars
            .iter()
            .filter(|b| b.timestamp >= start && b.timestamp <= end)
            .copied()
            .collect())
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;

    #[test]
    fn in_memory_filters_by_range() {
        let provider = InMemoryProvider::new().with_bars("AAA", Timeframe::Daily, make_bars(&[1.0, 2.0, 3.0, 4.0]));
        let bars = provider.get_bars("AAA", Timeframe::Daily, day(1), day(2)).unwrap();
        assert_eq!(bars.len(), 2);
        assert_eq!(bars[0].close, 2.0);
    }

    #[test]
    fn unknown_symbol_and_timeframe_are_not_found() {
        let provider = InMemoryProvider::new().with_bars("AAA", Timeframe::Daily, make_bars(&[1.0]));
        let (start, end) = full_range();
        assert!(matches!(
            provider.get_bars("BBB", Timeframe::Daily, start, end),
            Err(DataError::SymbolNotFound { .. })
        ));
        assert!(matches!(
            provider.get_bars("AAA", Timeframe::Minute5, start, end),
            Err(DataError::SymbolNotFound { .. })
        ));
    }

    #[test]
    fn benchmark_goes_through_get_bars() {
        let provider = InMemoryProvider::new().with_bars("SPY", Timeframe::Daily, make_bars(&[400.0, 401.0]));
        let (start, end) = full_range();
        let bars = provider.get_benchmark_bars("SPY", Timeframe::Daily, start, end).unwrap();
        assert_eq!(bars.len(), 2);
    }

    #[test]
    fn injected_failure_is_reported() {
        let provider = InMemoryProvider::new()
            .with_bars("AAA", Timeframe::Daily, make_bars(&[1.0]))
            .with_failure("AAA", "rate limited");
        let (start, end) = full_range();
        let err = provider.get_bars("AAA", Timeframe::Daily, start, end).unwrap_err();
        assert!(err.to_string().contains("rate limited"));
    }

    #[test]
    fn insert_sorts_bars() {
        let mut bars = make_bars(&[1.0, 2.0, 3.0]);
        bars.reverse();
        let provider = InMemoryProvider::new().with_bars("AAA", Timeframe::Daily, bars);
        let (start, end) = full_range();
        let got = provider.get_bars("AAA", Timeframe::Daily, start, end).unwrap();
        assert!(got.windows(2).all(|w| w[0].timestamp < w[1].timestamp));
    }
}
