//! Opening-range break phase.
//!
//! Run after the first minutes of the session over a cycle's candidates:
//! fetch each candidate's intraday bars, compute the opening range and
//! record which symbols trade above its high.

use serde::{Deserialize, Serialize};
use setupscan_core::indicators::{opening_range, OpeningRange};
use setupscan_core::OpeningRangeConfig;
use tracing::{debug, info, warn};

use crate::fetch::FetchRequest;
use crate::provider::BarProvider;
use crate::report::CycleReport;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpeningRangeResult {
    pub symbol: String,
    /// `None` when the fetch failed or no bar fell inside the window.
    pub range: Option<OpeningRange>,
    /// Percent above the range high; 0 unless triggered.
    pub breakout_pct: f64,
    pub error: Option<String>,
}

impl OpeningRangeResult {
    pub fn triggered(&self) -> bool {
        self.range.is_some_and(|r| r.entry_triggered)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OpeningRangeReport {
    /// One entry per candidate, in candidate order.
    pub results: Vec<OpeningRangeResult>,
    /// Symbols whose last price is above the range high, in candidate order.
    pub triggered: Vec<String>,
}

impl OpeningRangeReport {
    pub fn get(&self, symbol: &str) -> Option<&OpeningRangeResult> {
        self.results.iter().find(|r| r.symbol == symbol)
    }
}

fn evaluate(
    provider: &dyn BarProvider,
    symbol: &str,
    config: &OpeningRangeConfig,
    request: &FetchRequest,
) -> OpeningRangeResult {
    let failed = |reason: String| OpeningRangeResult {
        symbol: symbol.to_string(),
        range: None,
        breakout_pct: 0.0,
        error: Some(reason),
    };
    let bars = match provider.get_bars(symbol, request.timeframe, request.start, request.end) {
        Ok(bars) => bars,
        Err(e) => {
            warn!(symbol, error = %e, "intraday fetch failed");
            return failed(e.to_string());
        }
    };
    match opening_range(&bars, config.session_open, config.minutes) {
        Some(range) => {
            debug!(
                symbol,
                high = range.high,
                low = range.low,
                last = range.last,
                triggered = range.entry_triggered,
                "opening range"
            );
            OpeningRangeResult {
                symbol: symbol.to_string(),
                range: Some(range),
                breakout_pct: range.breakout_strength_pct(),
                error: None,
            }
        }
        None => {
            warn!(symbol, "no bars inside the opening range window");
            failed("no opening range data".into())
        }
    }
}

/// Opening range of each symbol over the intraday bars in `request`.
pub fn opening_range_phase(
    provider: &dyn BarProvider,
    symbols: &[String],
    config: &OpeningRangeConfig,
    request: &FetchRequest,
) -> OpeningRangeReport {
    let results: Vec<OpeningRangeResult> = symbols
        .iter()
        .map(|symbol| evaluate(provider, symbol, config, request))
        .collect();
    let triggered: Vec<String> = results
        .iter()
        .filter(|r| r.triggered())
        .map(|r| r.symbol.clone())
        .collect();
    info!(
        symbols = results.len(),
        triggered = triggered.len(),
        "opening range computed"
    );
    OpeningRangeReport { results, triggered }
}

/// Run the phase over `report`'s candidates and store the result on it.
pub fn attach_opening_range<'a>(
    provider: &dyn BarProvider,
    report: &'a mut CycleReport,
    config: &OpeningRangeConfig,
    request: &FetchRequest,
) -> &'a OpeningRangeReport {
    let symbols: Vec<String> = report.candidates.iter().map(|c| c.symbol.clone()).collect();
    let phase = opening_range_phase(provider, &symbols, config, request);
    report.opening_range.insert(phase)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
    use setupscan_core::domain::Bar;

    use crate::provider::{InMemoryProvider, Timeframe};

    fn at(h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 5, 1).unwrap().and_hms_opt(h, m, 0).unwrap()
    }

    /// 09:30 to 09:44 one-minute bars; the range high is `base + 0.5`, and
    /// the last close is `base + lift`.
    fn session(base: f64, lift: f64) -> Vec<Bar> {
        (0..15)
            .map(|i| {
                let c = if i == 14 { base + lift } else { base };
                Bar {
                    timestamp: at(9, 30 + i),
                    open: c,
                    high: c + 0.5,
                    low: c - 0.5,
                    close: c,
                    volume: 5_000.0,
                }
            })
            .collect()
    }

    fn request() -> FetchRequest {
        FetchRequest {
            timeframe: Timeframe::Minute1,
            start: at(9, 30),
            end: at(16, 0),
        }
    }

    fn provider() -> InMemoryProvider {
        InMemoryProvider::new()
            .with_bars("UP", Timeframe::Minute1, session(50.0, 1.51))
            .with_bars("FLAT", Timeframe::Minute1, session(20.0, 0.0))
            .with_bars("LATE", Timeframe::Minute1, vec![session(10.0, 0.0)[14]])
            .with_failure("DOWN", "timeout")
    }

    fn symbols(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn triggered_symbols_are_reported_in_order() {
        let config = OpeningRangeConfig::default();
        let phase = opening_range_phase(&provider(), &symbols(&["FLAT", "UP"]), &config, &request());
        assert_eq!(phase.triggered, vec!["UP".to_string()]);

        let up = phase.get("UP").unwrap();
        let range = up.range.unwrap();
        assert!((range.high - 50.5).abs() < 1e-9);
        assert!((up.breakout_pct - 2.0).abs() < 1e-6);

        let flat = phase.get("FLAT").unwrap();
        assert!(!flat.triggered());
        assert_eq!(flat.breakout_pct, 0.0);
    }

    #[test]
    fn failures_and_empty_windows_do_not_trigger() {
        let config = OpeningRangeConfig::default();
        let phase = opening_range_phase(&provider(), &symbols(&["DOWN", "LATE", "UP"]), &config, &request());
        assert_eq!(phase.results.len(), 3);
        assert!(phase.get("DOWN").unwrap().error.as_deref().unwrap().contains("timeout"));
        assert!(phase.get("LATE").unwrap().range.is_none());
        assert_eq!(phase.triggered, vec!["UP".to_string()]);
    }

    #[test]
    fn longer_window_absorbs_the_move() {
        let config = OpeningRangeConfig {
            session_open: NaiveTime::from_hms_opt(9, 30, 0).unwrap(),
            minutes: 14,
        };
        let phase = opening_range_phase(&provider(), &symbols(&["UP"]), &config, &request());
        assert!(phase.triggered.is_empty());
    }
}
