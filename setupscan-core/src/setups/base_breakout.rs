//! Shared body of the Breakout and RangeBreakout detectors.
//!
//! Both setups look for a tight base followed by a price-and-volume breakout
//! out of it. They differ only in configuration: whether a prior impulse
//! leg is required, whether rising pivot lows are required, and how strict
//! the contraction and breakout-distance thresholds are.

use serde::{Deserialize, Serialize};

use super::{flag, put, DetectionContext};
use crate::domain::{Diagnostics, SetupKind, SetupTag};
use crate::indicators::{atr_contraction_ratio, higher_lows_asym, mean, relative_strength, AtrWindows};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BaseBreakoutConfig {
    pub require_impulse: bool,
    /// Half-width of the sliding impulse window, in bars.
    pub impulse_half_window: usize,
    /// Minimum (max high - min low) / min low inside one window, in percent.
    pub impulse_threshold_pct: f64,
    /// Bars before the base searched for the impulse leg.
    pub impulse_lookback: usize,
    /// Bars in the base, ending on the bar before the latest one.
    pub base_len: usize,
    pub max_range_width_pct: f64,
    pub atr_len: usize,
    pub atr_ma: usize,
    pub atr_ratio_thresh: f64,
    pub require_higher_lows: bool,
    pub pivot_left: usize,
    pub pivot_right: usize,
    pub pivots_needed: usize,
    /// Latest close must clear the base high by this many percent.
    pub min_break_above_pct: f64,
    pub vol_ma: usize,
    pub vol_mult: f64,
    pub rs_ma: usize,
    /// Require an OPEN regime when a benchmark is supplied.
    pub use_regime_filter: bool,
    /// Floor on history length regardless of the windows above.
    pub min_history: usize,
}

impl BaseBreakoutConfig {
    /// Flag breakout defaults: impulse required, higher lows optional.
    pub fn breakout() -> Self {
        Self {
            require_impulse: true,
            impulse_half_window: 20,
            impulse_threshold_pct: 30.0,
            impulse_lookback: 60,
            base_len: 20,
            max_range_width_pct: 25.0,
            atr_len: 14,
            atr_ma: 50,
            atr_ratio_thresh: 1.2,
            require_higher_lows: false,
            pivot_left: 3,
            pivot_right: 3,
            pivots_needed: 3,
            min_break_above_pct: 1.0,
            vol_ma: 50,
            vol_mult: 1.5,
            rs_ma: 50,
            use_regime_filter: true,
            min_history: 60,
        }
    }

    /// Range breakout defaults: no impulse, higher lows required, stricter
    /// contraction and a larger breakout distance.
    pub fn range_breakout() -> Self {
        Self {
            require_impulse: false,
            require_higher_lows: true,
            atr_ratio_thresh: 1.0,
            min_break_above_pct: 1.5,
            ..Self::breakout()
        }
    }

    pub fn min_bars(&self) -> usize {
        let impulse = if self.require_impulse {
            self.base_len + 1 + 2 * self.impulse_half_window + 1
        } else {
            0
        };
        (self.base_len + 1)
            .max(self.atr_len + self.atr_ma + 1)
            .max(self.vol_ma + 1)
            .max(impulse)
            .max(self.min_history)
    }
}

impl Default for BaseBreakoutConfig {
    fn default() -> Self {
        Self::breakout()
    }
}

/// First impulse leg found by sliding a `[i - half, i + half)` window.
///
/// Returns the leg size in percent, or `None` when no window reaches
/// `threshold_pct`.
pub fn find_impulse(highs: &[f64], lows: &[f64], half: usize, threshold_pct: f64) -> Option<f64> {
    let n = highs.len().min(lows.len());
    if half == 0 || n < 2 * half + 1 {
        return None;
    }
    (half..n - half).find_map(|i| {
        let hi = highs[i - half..i + half].iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let lo = lows[i - half..i + half].iter().copied().fold(f64::INFINITY, f64::min);
        if lo > 0.0 && hi > lo {
            let pct = (hi - lo) / lo * 100.0;
            (pct >= threshold_pct).then_some(pct)
        } else {
            None
        }
    })
}

/// Run the base-breakout gates for `kind`. Every gate must pass; the
/// returned tag is always triggered.
pub(crate) fn detect_base_breakout(
    kind: SetupKind,
    cfg: &BaseBreakoutConfig,
    ctx: &DetectionContext<'_>,
) -> Option<SetupTag> {
    let series = ctx.series;
    let n = series.len();
    if n < cfg.min_bars() || cfg.base_len == 0 || cfg.vol_ma == 0 {
        return None;
    }
    let bars = series.bars();
    let latest = bars[n - 1];
    let mut diag = Diagnostics::new();

    // 1. Prior impulse, searched only in the bars before the base
    if cfg.require_impulse {
        let pre_base = n - 1 - cfg.base_len;
        let from = pre_base.saturating_sub(cfg.impulse_lookback);
        let impulse = find_impulse(
            &series.highs()[from..pre_base],
            &series.lows()[from..pre_base],
            cfg.impulse_half_window,
            cfg.impulse_threshold_pct,
        )?;
        put(&mut diag, "impulse_pct", impulse);
    }

    // 2. Tight base over the bars preceding the latest one
    let base = &bars[n - 1 - cfg.base_len..n - 1];
    let range_high = base.iter().map(|b| b.close).fold(f64::NEG_INFINITY, f64::max);
    let range_low = base.iter().map(|b| b.close).fold(f64::INFINITY, f64::min);
    let range_size = range_high - range_low;
    if !(range_low > 0.0 && range_size > 0.0) {
        return None;
    }
    let range_pct = range_size / range_low;
    let max_width = cfg.max_range_width_pct / 100.0;
    if range_pct > max_width {
        return None;
    }

    // 3. Volatility contraction at the last base bar
    let atr_ratio = atr_contraction_ratio(
        &bars[..n - 1],
        AtrWindows::MovingAverage {
            atr_len: cfg.atr_len,
            ma_len: cfg.atr_ma,
        },
    )?;
    if atr_ratio > cfg.atr_ratio_thresh {
        return None;
    }

    // 4. Structure
    if cfg.require_higher_lows {
        let lows: Vec<f64> = base.iter().map(|b| b.low).collect();
        if !higher_lows_asym(&lows, cfg.pivot_left, cfg.pivot_right, cfg.pivots_needed) {
            return None;
        }
    }

    // 5. Price AND volume confirmation
    let min_break_price = range_high * (1.0 + cfg.min_break_above_pct / 100.0);
    if latest.close < min_break_price {
        return None;
    }
    let vol_avg = mean(&series.volumes()[n - 1 - cfg.vol_ma..n - 1])?;
    if vol_avg <= 0.0 {
        return None;
    }
    let volume_mult = latest.volume / vol_avg;
    if latest.volume < cfg.vol_mult * vol_avg {
        return None;
    }

    // 6. Benchmark confirmation
    let mut confirmed_by_benchmark = false;
    if let Some(bench) = ctx.benchmark {
        let rs = relative_strength(&series.closes(), bench, cfg.rs_ma)?;
        if !rs.ok {
            return None;
        }
        if cfg.use_regime_filter && !ctx.regime.is_open {
            return None;
        }
        put(&mut diag, "rs_ratio", rs.ratio);
        put(&mut diag, "rs_ratio_ma", rs.ratio_ma);
        confirmed_by_benchmark = true;
    }

    // 7. Score
    let breakout_strength = (latest.close - range_high) / range_size;
    let volume_score = (volume_mult / (cfg.vol_mult * 2.0)).min(1.0);
    let range_quality = (1.0 - range_pct / max_width).max(0.0);
    let atr_score = (cfg.atr_ratio_thresh / atr_ratio.max(1e-9)).min(1.0);
    let score = 0.30 * breakout_strength.clamp(0.0, 1.0)
        + 0.25 * volume_score
        + 0.25 * range_quality
        + 0.15 * atr_score
        + 0.05 * flag(confirmed_by_benchmark);

    put(&mut diag, "entry", latest.close);
    put(&mut diag, "stop", range_low);
    put(&mut diag, "range_high", range_high);
    put(&mut diag, "range_low", range_low);
    put(&mut diag, "range_pct", range_pct * 100.0);
    put(&mut diag, "min_break_price", min_break_price);
    put(&mut diag, "breakout_strength", breakout_strength);
    put(&mut diag, "vol_ma", vol_avg);
    put(&mut diag, "volume_mult", volume_mult);
    put(&mut diag, "atr_ratio", atr_ratio);
    put(&mut diag, "higher_lows_checked", flag(cfg.require_higher_lows));
    put(&mut diag, "regime_open", flag(ctx.regime.is_open));

    Some(SetupTag::new(kind, true, score, diag))
}
