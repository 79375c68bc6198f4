//! Per-symbol, per-cycle derived scalars.

use serde::{Deserialize, Serialize};

/// Snapshot of the indicator library's outputs for one symbol.
///
/// Recomputed every cycle. `None` means the value is undefined for this
/// series (too little history or a zero denominator), never zero.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IndicatorSet {
    pub atr: Option<f64>,
    pub atr_ratio: Option<f64>,
    /// Neutral 50 when history is short.
    pub rsi: f64,
    pub zscore: Option<f64>,
    pub adr_pct: Option<f64>,
    pub sma_short: Option<f64>,
    pub sma_long: Option<f64>,
    pub ema_short: Option<f64>,
    pub ema_long: Option<f64>,
    pub rs_ratio: Option<f64>,
    pub rs_ok: Option<bool>,
    /// Latest close vs prior close, in percent.
    pub change_pct: Option<f64>,
    pub avg_volume: Option<f64>,
}
