//! Average True Range (ATR).
//!
//! True Range: max(high-low, |high-prev_close|, |low-prev_close|)
//! ATR is the rolling mean of true range over `period` bars.
//! Lookback: period (TR[0] has no previous close, so the first full window
//! ends at index `period`).

use super::{sma_of_series, Indicator};
use crate::domain::Bar;

#[derive(Debug, Clone)]
pub struct Atr {
    period: usize,
    name: String,
}

impl Atr {
    pub fn new(period: usize) -> Self {
        assert!(period >= 1, "ATR period must be >= 1");
        Self {
            period,
            name: format!("atr_{period}"),
        }
    }
}

/// Compute the True Range series from bars.
/// TR[0] = high[0] - low[0] (no previous close).
/// TR[t] = max(high[t]-low[t], |high[t]-close[t-1]|, |low[t]-close[t-1]|).
pub fn true_range(bars: &[Bar]) -> Vec<f64> {
    let n = bars.len();
    let mut tr = vec![f64::NAN; n];

    if n == 0 {
        return tr;
    }

    let h = bars[0].high;
    let l = bars[0].low;
    if !(h.is_nan() || l.is_nan()) {
        tr[0] = h - l;
    }

    for i in 1..n {
        let h = bars[i].high;
        let l = bars[i].low;
        let pc = bars[i - 1].close;
        if !(h.is_nan() || l.is_nan() || pc.is_nan()) {
            tr[i] = (h - l).max((h - pc).abs()).max((l - pc).abs());
        }
    }

    tr
}

impl Indicator for Atr {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.period
    }

    fn compute(&self, bars: &[Bar]) -> Vec<f64> {
        let mut tr = true_range(bars);
        // TR[0] is only high-low; drop it so every window holds proper true ranges.
        if !tr.is_empty() {
            tr[0] = f64::NAN;
        }
        sma_of_series(&tr, self.period)
    }
}

/// ATR at the last bar, or `None` with fewer than `period + 1` bars.
pub fn atr_latest(bars: &[Bar], period: usize) -> Option<f64> {
    if period == 0 || bars.len() < period + 1 {
        return None;
    }
    super::last_defined(&Atr::new(period).compute(bars))
}

/// How the ATR contraction ratio pairs its two windows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum AtrWindows {
    /// Latest ATR(atr_len) divided by the `ma_len`-bar SMA of ATR(atr_len).
    MovingAverage { atr_len: usize, ma_len: usize },
    /// Mean ATR(atr_len) over the last `recent` bars divided by mean
    /// ATR(atr_len) over the `baseline` bars preceding them.
    Split {
        atr_len: usize,
        recent: usize,
        baseline: usize,
    },
}

impl AtrWindows {
    /// Bars needed before the ratio is defined.
    pub fn min_bars(&self) -> usize {
        match *self {
            AtrWindows::MovingAverage { atr_len, ma_len } => atr_len + ma_len,
            AtrWindows::Split {
                atr_len,
                recent,
                baseline,
            } => atr_len + recent + baseline,
        }
    }
}

/// Volatility contraction; below 1.0 means the recent range is compressing.
///
/// Measured at the last bar of `bars`. `None` when either window is not
/// fully defined or the denominator is zero.
pub fn atr_contraction_ratio(bars: &[Bar], windows: AtrWindows) -> Option<f64> {
    match windows {
        AtrWindows::MovingAverage { atr_len, ma_len } => {
            if atr_len == 0 || ma_len == 0 {
                return None;
            }
            let atr = Atr::new(atr_len).compute(bars);
            let latest = super::last_defined(&atr)?;
            let baseline = super::sma_latest(&atr, ma_len)?;
            ratio(latest, baseline)
        }
        AtrWindows::Split {
            atr_len,
            recent,
            baseline,
        } => {
            if atr_len == 0 || recent == 0 || baseline == 0 {
                return None;
            }
            let atr = Atr::new(atr_len).compute(bars);
            let n = atr.len();
            if n < recent + baseline {
                return None;
            }
            let recent_mean = super::mean(&atr[n - recent..])?;
            let baseline_mean = super::mean(&atr[n - recent - baseline..n - recent])?;
            ratio(recent_mean, baseline_mean)
        }
    }
}

fn ratio(num: f64, den: f64) -> Option<f64> {
    if den.abs() <= f64::EPSILON || !den.is_finite() || !num.is_finite() {
        None
    } else {
        Some(num / den)
    }
}

#[cfg(test)]
pub(crate) fn make_ohlc_bars(data: &[(f64, f64, f64, f64)]) -> Vec<Bar> {
    let base = chrono::NaiveDate::from_ymd_opt(2024, 1, 2)
        .unwrap()
        .and_hms_opt(16, 0, 0)
        .unwrap();
    data.iter()
        .enumerate()
        .map(|(i, &(open, high, low, close))| Bar {
            timestamp: base + chrono::Duration::days(i as i64),
            open,
            high,
            low,
            close,
            volume: 1000.0,
        })
        .collect()
}
