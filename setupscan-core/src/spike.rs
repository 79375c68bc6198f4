//! Intraday spike classifier: momentum long entries and exhaustion exits.
//!
//! Works on short-interval bars (5-minute in the stock and crypto profiles).
//! The entry gate requires an energetic bar (TR/ATR), an outsized positive
//! return (Z) and a positive move since the session start, then applies the
//! optional confirmations each threshold profile enables. Exhaustion exits
//! count satisfied warning conditions and fire at a configured score.
//!
//! Every optional threshold is an `Option`; `None` skips its sub-check.
//! Move inputs (`*_dpp`) are percentages; thresholds (`*_dp`) are decimals.

use serde::{Deserialize, Serialize};

use crate::domain::Bar;
use crate::indicators::{rsi_latest, zscore_latest};
use crate::signal_line::{Metric, SignalLine};

/// KIND token appended to signal lines for a confirmed spike entry.
pub const ENTRY_KIND: &str = "Volatility";

/// Smoothing factor of the TR EMA (equivalent span 14).
const TR_EMA_ALPHA: f64 = 2.0 / 15.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetClass {
    Stocks,
    Crypto,
}

/// Per-bar energy and magnitude measurements for the latest bar.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpikeMetrics {
    /// Latest true range over the EMA of true range; `None` if the EMA is 0.
    pub tr_atr: Option<f64>,
    /// Z-score of the latest log return against all earlier ones.
    pub z: f64,
    /// Move of the last close from the reference close, in percent.
    pub change_pct: f64,
    pub price: f64,
}

/// Compute [`SpikeMetrics`] over a session's bars.
///
/// The first true range is measured against the first bar's open. The move
/// is measured from `reference_close` when given, else from the first close.
/// `None` with fewer than three bars or non-positive closes.
pub fn spike_metrics(bars: &[Bar], reference_close: Option<f64>) -> Option<SpikeMetrics> {
    if bars.len() < 3 {
        return None;
    }
    let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
    let z = zscore_latest(&closes, closes.len())?;

    let mut prev_close = bars[0].open;
    let mut ema: Option<f64> = None;
    let mut last_tr = f64::NAN;
    for b in bars {
        let tr = (b.high - b.low)
            .max((b.high - prev_close).abs())
            .max((b.low - prev_close).abs());
        ema = Some(match ema {
            None => tr,
            Some(e) => TR_EMA_ALPHA * tr + (1.0 - TR_EMA_ALPHA) * e,
        });
        last_tr = tr;
        prev_close = b.close;
    }
    let tr_atr = ema.filter(|e| *e > 0.0).map(|e| last_tr / e);

    let reference = reference_close.unwrap_or(closes[0]);
    if !(reference > 0.0) {
        return None;
    }
    let price = closes[closes.len() - 1];
    Some(SpikeMetrics {
        tr_atr,
        z,
        change_pct: (price - reference) / reference * 100.0,
        price,
    })
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpikeThresholds {
    pub breakout_tr_atr: f64,
    pub breakout_z: f64,
    pub breakout_dp: f64,
    /// Compare base gates with `>=` instead of `>`.
    pub use_geq: bool,
    pub mute_first_minutes: u32,
    pub early_minutes: u32,
    pub early_breakout_tr_atr: Option<f64>,
    pub early_breakout_z: Option<f64>,
    pub early_breakout_dp: Option<f64>,
    /// Trailing bars that must all be positive (0 disables).
    pub persistence_bars: usize,
    pub follow_through_dp: Option<f64>,
    pub retrace_cap_dp: Option<f64>,
    pub vwap_disp_dp: Option<f64>,
    pub vwap_slope_min_dp: Option<f64>,
    pub gap_threshold: Option<f64>,
    pub gap_follow_through_dp: Option<f64>,
    pub gap_retrace_cap_dp: Option<f64>,
    pub exit_min_vwap_disp_dp: Option<f64>,
    pub exit_backslide_dp: Option<f64>,
    pub exit_retrace_breach_dp: Option<f64>,
    pub exit_persist_window: usize,
    pub exit_neg_bars: usize,
    pub exit_z_floor: Option<f64>,
    pub exit_tratr_floor: Option<f64>,
    pub exit_score_min: u32,
}

impl SpikeThresholds {
    pub fn stocks() -> Self {
        Self {
            breakout_tr_atr: 2.0,
            breakout_z: 2.5,
            breakout_dp: 0.03,
            use_geq: false,
            mute_first_minutes: 30,
            early_minutes: 60,
            early_breakout_tr_atr: Some(2.2),
            early_breakout_z: Some(3.5),
            early_breakout_dp: Some(0.04),
            persistence_bars: 3,
            follow_through_dp: Some(0.006),
            retrace_cap_dp: Some(0.0025),
            vwap_disp_dp: Some(0.007),
            vwap_slope_min_dp: Some(0.001),
            gap_threshold: Some(0.04),
            gap_follow_through_dp: Some(0.007),
            gap_retrace_cap_dp: Some(0.002),
            exit_min_vwap_disp_dp: Some(0.003),
            exit_backslide_dp: Some(0.003),
            exit_retrace_breach_dp: Some(0.004),
            exit_persist_window: 3,
            exit_neg_bars: 2,
            exit_z_floor: Some(1.0),
            exit_tratr_floor: None,
            exit_score_min: 2,
        }
    }

    pub fn crypto() -> Self {
        Self {
            breakout_tr_atr: 2.0,
            breakout_z: 2.0,
            breakout_dp: 0.02,
            use_geq: false,
            mute_first_minutes: 0,
            early_minutes: 0,
            early_breakout_tr_atr: None,
            early_breakout_z: None,
            early_breakout_dp: None,
            persistence_bars: 2,
            follow_through_dp: Some(0.006),
            retrace_cap_dp: Some(0.003),
            vwap_disp_dp: Some(0.005),
            vwap_slope_min_dp: None,
            gap_threshold: Some(0.04),
            gap_follow_through_dp: Some(0.008),
            gap_retrace_cap_dp: Some(0.003),
            exit_min_vwap_disp_dp: Some(0.0025),
            exit_backslide_dp: Some(0.004),
            exit_retrace_breach_dp: Some(0.005),
            exit_persist_window: 3,
            exit_neg_bars: 2,
            exit_z_floor: Some(1.0),
            exit_tratr_floor: None,
            exit_score_min: 2,
        }
    }

    pub fn for_asset(asset: AssetClass) -> Self {
        match asset {
            AssetClass::Stocks => Self::stocks(),
            AssetClass::Crypto => Self::crypto(),
        }
    }

    fn passes(&self, value: f64, threshold: f64) -> bool {
        if self.use_geq {
            value >= threshold
        } else {
            value > threshold
        }
    }
}

impl Default for SpikeThresholds {
    fn default() -> Self {
        Self::stocks()
    }
}

/// Optional confirmations for an entry decision. Moves are in percent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EntryContext {
    pub minutes_since_open: Option<u32>,
    pub prev_close: Option<f64>,
    pub open_price: Option<f64>,
    /// Per-bar moves of the most recent bars, oldest first.
    pub recent_dpp: Vec<f64>,
    pub follow_through_dpp: Option<f64>,
    /// Worst pullback after the signal bar (<= 0).
    pub retrace_dpp: Option<f64>,
    pub vwap_disp_dpp: Option<f64>,
    pub vwap_slope_dpp: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EntrySignal {
    /// The early-session override gates were in force.
    pub early_session: bool,
    /// The gap-up confirmation path was required.
    pub gap_up: bool,
}

/// Long-only momentum entry.
pub fn classify_long_entry(
    metrics: &SpikeMetrics,
    ctx: &EntryContext,
    th: &SpikeThresholds,
) -> Option<EntrySignal> {
    let tr_atr = metrics.tr_atr?;
    let (z, dpp) = (metrics.z, metrics.change_pct);
    if !(tr_atr.is_finite() && z.is_finite() && dpp.is_finite()) {
        return None;
    }

    let mute = th.mute_first_minutes;
    if mute > 0 && ctx.minutes_since_open.is_some_and(|m| m < mute) {
        return None;
    }

    let dp = dpp / 100.0;
    let ft = ctx.follow_through_dpp.map(|v| v / 100.0);
    let rt = ctx.retrace_dpp.map(|v| v / 100.0);
    let vw = ctx.vwap_disp_dpp.map(|v| v / 100.0);
    let vws = ctx.vwap_slope_dpp.map(|v| v / 100.0);

    let early_session = th.early_minutes > 0
        && ctx
            .minutes_since_open
            .is_some_and(|m| m < th.early_minutes && (mute == 0 || m >= mute));
    let (b_tratr, b_z, b_dp) = if early_session {
        (
            th.early_breakout_tr_atr.unwrap_or(th.breakout_tr_atr),
            th.early_breakout_z.unwrap_or(th.breakout_z),
            th.early_breakout_dp.unwrap_or(th.breakout_dp),
        )
    } else {
        (th.breakout_tr_atr, th.breakout_z, th.breakout_dp)
    };

    let base = th.passes(tr_atr, b_tratr)
        && th.passes(z.abs(), b_z)
        && th.passes(dp.abs(), b_dp)
        && z > 0.0
        && dp > 0.0;
    if !base {
        return None;
    }

    let mut gap_up = false;
    if let (Some(gap_thr), Some(prev), Some(open)) = (th.gap_threshold, ctx.prev_close, ctx.open_price) {
        if prev > 0.0 && open / prev - 1.0 >= gap_thr {
            gap_up = true;
            let ft_ok = ft.is_some_and(|f| f > 0.0 && th.gap_follow_through_dp.map_or(true, |g| f >= g));
            if !ft_ok {
                return None;
            }
            if let Some(r) = rt {
                if !(r <= 0.0 && th.gap_retrace_cap_dp.map_or(true, |g| r.abs() <= g)) {
                    return None;
                }
            }
        }
    }

    let n = th.persistence_bars;
    if n > 0 && ctx.recent_dpp.len() >= n {
        let tail = &ctx.recent_dpp[ctx.recent_dpp.len() - n..];
        if !tail.iter().all(|x| *x > 0.0) {
            return None;
        }
    }

    if let (Some(thr), Some(f)) = (th.follow_through_dp, ft) {
        if !(f > 0.0 && f >= thr) {
            return None;
        }
    }
    if let (Some(cap), Some(r)) = (th.retrace_cap_dp, rt) {
        if !(r <= 0.0 && r.abs() <= cap) {
            return None;
        }
    }
    if let (Some(req), Some(v)) = (th.vwap_disp_dp, vw) {
        if !(v > 0.0 && v >= req) {
            return None;
        }
    }
    if let (Some(min), Some(s)) = (th.vwap_slope_min_dp, vws) {
        if min > 0.0 && !(s > 0.0 && s >= min) {
            return None;
        }
    }

    Some(EntrySignal {
        early_session,
        gap_up,
    })
}

/// Inputs for judging an open long position. Moves are in percent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExitContext {
    pub vwap_disp_dpp: Option<f64>,
    /// Move since the entry bar (negative = backslide).
    pub forward_move_dpp: Option<f64>,
    /// Worst pullback from the post-entry high (<= 0).
    pub retrace_dpp: Option<f64>,
    /// Per-bar moves of the most recent bars, oldest first.
    pub recent_dpp: Vec<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExitReason {
    LostVwap,
    Backslide,
    RetraceBreach,
    PersistenceFlip,
    MomentumFaded,
    EnergyFaded,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExitDecision {
    pub fire: bool,
    pub score: u32,
    pub reasons: Vec<ExitReason>,
}

/// Exhaustion exit for an open long: one point per satisfied condition.
pub fn classify_exhaustion_exit(
    metrics: &SpikeMetrics,
    ctx: &ExitContext,
    th: &SpikeThresholds,
) -> ExitDecision {
    let mut reasons = Vec::new();

    if let (Some(min), Some(v)) = (th.exit_min_vwap_disp_dp, ctx.vwap_disp_dpp) {
        let v = v / 100.0;
        if v <= 0.0 || v < min {
            reasons.push(ExitReason::LostVwap);
        }
    }
    if let (Some(slide), Some(m)) = (th.exit_backslide_dp, ctx.forward_move_dpp) {
        if m / 100.0 <= -slide {
            reasons.push(ExitReason::Backslide);
        }
    }
    if let (Some(breach), Some(r)) = (th.exit_retrace_breach_dp, ctx.retrace_dpp) {
        let r = r / 100.0;
        if r <= 0.0 && r.abs() >= breach {
            reasons.push(ExitReason::RetraceBreach);
        }
    }
    let window = th.exit_persist_window;
    if window > 0 && th.exit_neg_bars > 0 && !ctx.recent_dpp.is_empty() {
        let start = ctx.recent_dpp.len().saturating_sub(window);
        let negatives = ctx.recent_dpp[start..].iter().filter(|x| **x < 0.0).count();
        if negatives >= th.exit_neg_bars {
            reasons.push(ExitReason::PersistenceFlip);
        }
    }
    if let Some(floor) = th.exit_z_floor {
        if metrics.z <= floor && metrics.change_pct <= 0.0 {
            reasons.push(ExitReason::MomentumFaded);
        }
    }
    if let (Some(floor), Some(tr_atr)) = (th.exit_tratr_floor, metrics.tr_atr) {
        if tr_atr < floor {
            reasons.push(ExitReason::EnergyFaded);
        }
    }

    let score = reasons.len() as u32;
    ExitDecision {
        fire: th.exit_score_min > 0 && score >= th.exit_score_min,
        score,
        reasons,
    }
}

/// Signal line for a spike scan: `ATR <tr/atr>x | Z <z> | RSI <rsi>/<rs> | ADR <adr>%`,
/// tagged [`ENTRY_KIND`] when an entry fired.
pub fn spike_signal_line(
    symbol: &str,
    bars: &[Bar],
    metrics: &SpikeMetrics,
    rs_pct: Option<f64>,
    adr_pct: Option<f64>,
    entry: Option<&EntrySignal>,
) -> SignalLine {
    let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
    let mut line = SignalLine::new(symbol, metrics.price, metrics.change_pct);
    if let Some(r) = metrics.tr_atr {
        line.push(Metric::new("ATR", r, 2).with_flag("x"));
    }
    line.push(Metric::new("Z", metrics.z, 2));
    let rsi = Metric::new("RSI", rsi_latest(&closes, 14), 0);
    line.push(match rs_pct {
        Some(rs) => rsi.with_reference(rs, 0),
        None => rsi,
    });
    if let Some(adr) = adr_pct {
        line.push(Metric::new("ADR", adr, 1).with_flag("%"));
    }
    line.kind = entry.map(|_| ENTRY_KIND.to_string());
    line
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate};

    fn five_minute_bars(closes: &[f64]) -> Vec<Bar> {
        let start = NaiveDate::from_ymd_opt(2024, 5, 1)
            .unwrap()
            .and_hms_opt(9, 30, 0)
            .unwrap();
        closes
            .iter()
            .enumerate()
            .map(|(i, &c)| {
                let open = if i == 0 { c } else { closes[i - 1] };
                Bar {
                    timestamp: start + Duration::minutes(5 * i as i64),
                    open,
                    high: open.max(c) + 0.05,
                    low: open.min(c) - 0.05,
                    close: c,
                    volume: 10_000.0,
                }
            })
            .collect()
    }

    /// Quiet drift then a hard up bar.
    fn spike_bars() -> Vec<Bar> {
        let mut closes: Vec<f64> = (0..24)
            .map(|i| 100.0 + if i % 2 == 0 { 0.0 } else { 0.1 })
            .collect();
        closes.push(104.0);
        five_minute_bars(&closes)
    }

    fn metrics(tr_atr: f64, z: f64, dpp: f64) -> SpikeMetrics {
        SpikeMetrics {
            tr_atr: Some(tr_atr),
            z,
            change_pct: dpp,
            price: 100.0,
        }
    }

    #[test]
    fn spike_metrics_on_hard_bar() {
        let m = spike_metrics(&spike_bars(), None).unwrap();
        assert!(m.tr_atr.unwrap() > 2.0);
        assert!(m.z > 2.5);
        assert!((m.change_pct - 4.0).abs() < 1e-9);
    }

    #[test]
    fn spike_metrics_needs_three_bars() {
        assert_eq!(spike_metrics(&five_minute_bars(&[1.0, 2.0]), None), None);
    }

    #[test]
    fn reference_close_overrides_first_close() {
        let m = spike_metrics(&spike_bars(), Some(80.0)).unwrap();
        assert!((m.change_pct - 30.0).abs() < 1e-9);
    }

    #[test]
    fn base_gates_fire_entry() {
        let th = SpikeThresholds::stocks();
        let ctx = EntryContext::default();
        assert!(classify_long_entry(&metrics(2.5, 3.0, 3.5), &ctx, &th).is_some());
        // Each base gate alone blocks the entry.
        assert!(classify_long_entry(&metrics(1.9, 3.0, 3.5), &ctx, &th).is_none());
        assert!(classify_long_entry(&metrics(2.5, 2.4, 3.5), &ctx, &th).is_none());
        assert!(classify_long_entry(&metrics(2.5, 3.0, 2.9), &ctx, &th).is_none());
        // Long only.
        assert!(classify_long_entry(&metrics(2.5, -3.0, -3.5), &ctx, &th).is_none());
    }

    #[test]
    fn strict_comparison_unless_geq() {
        let mut th = SpikeThresholds::crypto();
        let m = metrics(2.0, 3.0, 3.0);
        assert!(classify_long_entry(&m, &EntryContext::default(), &th).is_none());
        th.use_geq = true;
        assert!(classify_long_entry(&m, &EntryContext::default(), &th).is_some());
    }

    #[test]
    fn open_is_muted_then_early_gates_apply() {
        let th = SpikeThresholds::stocks();
        let m = metrics(2.5, 3.0, 3.5);
        let at = |minutes| EntryContext {
            minutes_since_open: Some(minutes),
            ..EntryContext::default()
        };
        assert!(classify_long_entry(&m, &at(10), &th).is_none());
        // Early session needs Z > 3.5 and move > 4%.
        assert!(classify_long_entry(&m, &at(45), &th).is_none());
        let strong = metrics(2.5, 3.8, 4.5);
        let entry = classify_long_entry(&strong, &at(45), &th).unwrap();
        assert!(entry.early_session);
        assert!(classify_long_entry(&m, &at(90), &th).is_some());
    }

    #[test]
    fn crypto_has_no_session_gates() {
        let th = SpikeThresholds::crypto();
        let ctx = EntryContext {
            minutes_since_open: Some(1),
            ..EntryContext::default()
        };
        assert!(classify_long_entry(&metrics(2.5, 2.5, 2.5), &ctx, &th).is_some());
    }

    #[test]
    fn optional_confirmations_only_apply_when_supplied() {
        let th = SpikeThresholds::stocks();
        let m = metrics(2.5, 3.0, 3.5);
        let weak_vwap = EntryContext {
            vwap_disp_dpp: Some(0.5),
            ..EntryContext::default()
        };
        assert!(classify_long_entry(&m, &weak_vwap, &th).is_none());

        let choppy = EntryContext {
            recent_dpp: vec![0.2, -0.1, 0.3],
            ..EntryContext::default()
        };
        assert!(classify_long_entry(&m, &choppy, &th).is_none());

        let clean = EntryContext {
            recent_dpp: vec![0.2, 0.1, 0.3],
            follow_through_dpp: Some(0.8),
            retrace_dpp: Some(-0.1),
            vwap_disp_dpp: Some(0.9),
            vwap_slope_dpp: Some(0.2),
            ..EntryContext::default()
        };
        assert!(classify_long_entry(&m, &clean, &th).is_some());

        let mut no_vwap = th.clone();
        no_vwap.vwap_disp_dp = None;
        assert!(classify_long_entry(&m, &weak_vwap, &no_vwap).is_some());
    }

    #[test]
    fn gap_up_requires_follow_through() {
        let th = SpikeThresholds::stocks();
        let m = metrics(2.5, 3.0, 3.5);
        let gapped = EntryContext {
            prev_close: Some(100.0),
            open_price: Some(105.0),
            ..EntryContext::default()
        };
        assert!(classify_long_entry(&m, &gapped, &th).is_none());
        let confirmed = EntryContext {
            follow_through_dpp: Some(0.8),
            retrace_dpp: Some(-0.1),
            ..gapped
        };
        let entry = classify_long_entry(&m, &confirmed, &th).unwrap();
        assert!(entry.gap_up);
    }

    #[test]
    fn exhaustion_exit_scores_conditions() {
        let th = SpikeThresholds::stocks();
        let fading = metrics(1.0, 0.5, -0.2);
        let ctx = ExitContext {
            vwap_disp_dpp: Some(0.1),
            forward_move_dpp: Some(-0.5),
            retrace_dpp: Some(-0.2),
            recent_dpp: vec![0.3, -0.1, -0.2],
        };
        let d = classify_exhaustion_exit(&fading, &ctx, &th);
        assert!(d.fire);
        assert_eq!(
            d.reasons,
            vec![
                ExitReason::LostVwap,
                ExitReason::Backslide,
                ExitReason::PersistenceFlip,
                ExitReason::MomentumFaded
            ]
        );
        assert_eq!(d.score, 4);
    }

    #[test]
    fn single_warning_does_not_exit() {
        let th = SpikeThresholds::stocks();
        let strong = metrics(2.5, 3.0, 2.0);
        let ctx = ExitContext {
            vwap_disp_dpp: Some(0.1),
            ..ExitContext::default()
        };
        let d = classify_exhaustion_exit(&strong, &ctx, &th);
        assert_eq!(d.score, 1);
        assert!(!d.fire);
    }

    #[test]
    fn disabled_energy_floor_is_skipped() {
        let mut th = SpikeThresholds::stocks();
        let m = metrics(0.5, 3.0, 2.0);
        assert!(classify_exhaustion_exit(&m, &ExitContext::default(), &th).reasons.is_empty());
        th.exit_tratr_floor = Some(1.5);
        assert_eq!(
            classify_exhaustion_exit(&m, &ExitContext::default(), &th).reasons,
            vec![ExitReason::EnergyFaded]
        );
    }

    #[test]
    fn spike_line_carries_kind_on_entry() {
        let bars = spike_bars();
        let m = spike_metrics(&bars, None).unwrap();
        let entry = classify_long_entry(&m, &EntryContext::default(), &SpikeThresholds::stocks());
        let line = spike_signal_line("TEST", &bars, &m, Some(75.0), Some(2.4), entry.as_ref());
        assert!(line.has_kind(ENTRY_KIND));
        let parsed = SignalLine::parse(&line.to_string()).unwrap();
        assert!((parsed.value("Z").unwrap() - m.z).abs() <= 0.005);
        assert!((parsed.value("ATR").unwrap() - m.tr_atr.unwrap()).abs() <= 0.005);
    }
}
