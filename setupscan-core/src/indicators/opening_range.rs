//! Opening range high/low and entry trigger over intraday bars.

use chrono::{Duration, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::domain::Bar;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OpeningRange {
    pub high: f64,
    pub low: f64,
    pub last: f64,
    /// Bars that fell inside the range window.
    pub bars: usize,
    pub entry_triggered: bool,
}

impl OpeningRange {
    /// Percent the last price sits above the range high; 0 when untriggered.
    pub fn breakout_strength_pct(&self) -> f64 {
        if self.entry_triggered && self.high > 0.0 {
            (self.last - self.high) / self.high * 100.0
        } else {
            0.0
        }
    }
}

/// Opening range of the latest session in `bars`.
///
/// The window covers bars stamped from `session_open` through
/// `session_open + minutes`, inclusive, on the calendar day of the last bar.
/// The entry triggers when the last close is strictly above the range high.
/// `None` when no bar falls inside the window.
pub fn opening_range(bars: &[Bar], session_open: NaiveTime, minutes: u32) -> Option<OpeningRange> {
    let last = bars.last()?;
    let day = last.timestamp.date();
    let start = day.and_time(session_open);
    let end = start + Duration::minutes(i64::from(minutes));

    let mut high = f64::NEG_INFINITY;
    let mut low = f64::INFINITY;
    let mut count = 0usize;
    for bar in bars
        .iter()
        .filter(|b| b.timestamp >= start && b.timestamp <= end)
    {
        high = high.max(bar.high);
        low = low.min(bar.low);
        count += 1;
    }
    if count == 0 {
        return None;
    }

    Some(OpeningRange {
        high,
        low,
        last: last.close,
        bars: count,
        entry_triggered: last.close > high,
    })
}
