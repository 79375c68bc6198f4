//! Episodic Pivot detector: a large opening gap backed by heavy early volume.
//!
//! Volume confirmation is an OR: either the pre-session dollar volume clears
//! a notional floor, or the opening-minutes volume clears a multiple of the
//! trailing average daily volume. An optional filter rejects names whose
//! trailing 3- or 6-month return shows they are already extended.

use serde::{Deserialize, Serialize};

use super::{flag, put, DetectionContext, SetupDetector};
use crate::domain::{Diagnostics, SetupKind, SetupTag};
use crate::indicators::{change_pct, mean, period_return};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EpisodicPivotConfig {
    pub gap_min_pct: f64,
    /// Pre-session dollar volume floor.
    pub premarket_notional_min: f64,
    /// Opening volume must reach this multiple of the average daily volume.
    pub opening_volume_mult: f64,
    pub avg_volume_len: usize,
    pub require_not_extended: bool,
    /// Window lengths (bars) for the 3- and 6-month returns.
    pub return_3m_bars: usize,
    pub return_6m_bars: usize,
    pub max_return_3m_pct: f64,
    pub max_return_6m_pct: f64,
}

impl Default for EpisodicPivotConfig {
    fn default() -> Self {
        Self {
            gap_min_pct: 10.0,
            premarket_notional_min: 2_000_000.0,
            opening_volume_mult: 2.0,
            avg_volume_len: 20,
            require_not_extended: true,
            return_3m_bars: 63,
            return_6m_bars: 126,
            max_return_3m_pct: 30.0,
            max_return_6m_pct: 50.0,
        }
    }
}

impl EpisodicPivotConfig {
    /// Enough bars for the gap day to sit in the series with full return
    /// and volume windows behind it.
    pub fn min_bars(&self) -> usize {
        if self.require_not_extended {
            (self.return_6m_bars.max(self.return_3m_bars) + 1).max(self.avg_volume_len + 1)
        } else {
            self.avg_volume_len + 1
        }
    }
}

#[derive(Debug, Clone)]
pub struct EpisodicPivotDetector {
    config: EpisodicPivotConfig,
}

impl EpisodicPivotDetector {
    pub fn new(config: EpisodicPivotConfig) -> Self {
        Self { config }
    }

    pub fn default_params() -> Self {
        Self::new(EpisodicPivotConfig::default())
    }
}

impl SetupDetector for EpisodicPivotDetector {
    fn kind(&self) -> SetupKind {
        SetupKind::EpisodicPivot
    }

    fn min_bars(&self) -> usize {
        self.config.min_bars()
    }

    fn detect(&self, ctx: &DetectionContext<'_>) -> Option<SetupTag> {
        let cfg = &self.config;
        let series = ctx.series;
        if series.len() < self.min_bars() {
            return None;
        }
        let session = ctx.session.copied().unwrap_or_default();
        let bars = series.bars();

        // With a session open the gap day lies beyond the series and the
        // whole series is prior history. Otherwise the latest bar is the gap
        // day and history ends one bar earlier.
        let (open, history) = match session.open {
            Some(open) => (open, bars),
            None => (series.last()?.open, &bars[..bars.len() - 1]),
        };
        if history.len() < cfg.avg_volume_len.max(1) {
            return None;
        }
        let prev_close = session
            .prev_close
            .or_else(|| history.last().map(|b| b.close))?;

        let gap_pct = change_pct(prev_close, open)?;
        if gap_pct < cfg.gap_min_pct {
            return None;
        }

        let volumes: Vec<f64> = history.iter().map(|b| b.volume).collect();
        let avg_volume = mean(&volumes[volumes.len() - cfg.avg_volume_len..]);
        let notional_ok = session
            .premarket_notional
            .is_some_and(|n| n >= cfg.premarket_notional_min);
        let volume_ratio = match (session.opening_volume, avg_volume) {
            (Some(v), Some(avg)) if avg > 0.0 => Some(v / avg),
            _ => None,
        };
        let opening_ok = volume_ratio.is_some_and(|r| r >= cfg.opening_volume_mult);
        if !(notional_ok || opening_ok) {
            return None;
        }

        let mut diag = Diagnostics::new();
        if cfg.require_not_extended {
            let closes: Vec<f64> = history.iter().map(|b| b.close).collect();
            let r3 = window_return(&closes, cfg.return_3m_bars)?;
            let r6 = window_return(&closes, cfg.return_6m_bars)?;
            if r3 * 100.0 > cfg.max_return_3m_pct || r6 * 100.0 > cfg.max_return_6m_pct {
                return None;
            }
            put(&mut diag, "return_3m_pct", r3 * 100.0);
            put(&mut diag, "return_6m_pct", r6 * 100.0);
        }

        let volume_term = if notional_ok {
            0.4
        } else {
            volume_ratio.map_or(0.0, |r| (r / 5.0).min(0.4))
        };
        let score = 0.6 * (gap_pct / 20.0).min(1.0) + volume_term;

        put(&mut diag, "gap_pct", gap_pct);
        put(&mut diag, "open", open);
        put(&mut diag, "prev_close", prev_close);
        put(&mut diag, "notional_ok", flag(notional_ok));
        if let Some(n) = session.premarket_notional {
            put(&mut diag, "premarket_notional", n);
        }
        if let Some(r) = volume_ratio {
            put(&mut diag, "opening_volume_ratio", r);
        }
        if let Some(avg) = avg_volume {
            put(&mut diag, "avg_volume", avg);
        }

        Some(SetupTag::new(SetupKind::EpisodicPivot, true, score, diag))
    }
}

/// Return from the first to the last close of the trailing `window` bars.
fn window_return(closes: &[f64], window: usize) -> Option<f64> {
    period_return(closes, window.checked_sub(1)?)
}
