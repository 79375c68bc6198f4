//! Cycle selector: picks exactly one signal to emit per scan cycle.
//!
//! Lines are ordered by a volatility score, 0.4·ATR + 0.4·|Z| + 0.2·|change%|,
//! and the top line wins. Whether it carries the hard-threshold KIND marker
//! is reported alongside; under the default best-available policy the
//! marker never vetoes the pick.

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::domain::Candidate;
use crate::signal_line::SignalLine;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectorConfig {
    /// Emit the top line even when it lacks the threshold marker.
    pub best_available: bool,
    /// KIND token that marks a met threshold. `None` accepts any KIND.
    pub trigger_kind: Option<String>,
    pub atr_weight: f64,
    pub z_weight: f64,
    pub change_weight: f64,
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            best_available: true,
            trigger_kind: None,
            atr_weight: 0.4,
            z_weight: 0.4,
            change_weight: 0.2,
        }
    }
}

impl SelectorConfig {
    /// Weighted volatility score. A missing ATR or Z metric contributes nothing.
    pub fn volatility_score(&self, line: &SignalLine) -> f64 {
        let atr = line.value("ATR").unwrap_or(0.0);
        let z = line.value("Z").unwrap_or(0.0);
        self.atr_weight * atr + self.z_weight * z.abs() + self.change_weight * line.change_pct.abs()
    }

    pub fn meets_threshold(&self, line: &SignalLine) -> bool {
        match (&self.trigger_kind, &line.kind) {
            (Some(want), Some(kind)) => want == kind,
            (None, Some(_)) => true,
            (_, None) => false,
        }
    }
}

/// Outcome of one cycle's selection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Selection {
    Selected {
        line: SignalLine,
        volatility_score: f64,
        meets_threshold: bool,
    },
    /// Best-available is off and the top line lacks the marker.
    NothingQualified {
        best: SignalLine,
        volatility_score: f64,
    },
    /// No candidate lines this cycle.
    NoData,
}

impl Selection {
    pub fn line(&self) -> Option<&SignalLine> {
        match self {
            Selection::Selected { line, .. } => Some(line),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct CycleSelector {
    config: SelectorConfig,
}

impl CycleSelector {
    pub fn new(config: SelectorConfig) -> Self {
        Self { config }
    }

    /// Lines sorted by volatility score, highest first; ties by symbol.
    pub fn order(&self, lines: &[SignalLine]) -> Vec<(f64, SignalLine)> {
        let mut scored: Vec<(f64, SignalLine)> = lines
            .iter()
            .map(|l| (self.config.volatility_score(l), l.clone()))
            .collect();
        scored.sort_by(|a, b| b.0.total_cmp(&a.0).then_with(|| a.1.symbol.cmp(&b.1.symbol)));
        scored
    }

    pub fn select(&self, lines: &[SignalLine]) -> Selection {
        let Some((volatility_score, line)) = self.order(lines).into_iter().next() else {
            info!("no candidate signals this cycle");
            return Selection::NoData;
        };
        let meets_threshold = self.config.meets_threshold(&line);
        info!(
            symbol = %line.symbol,
            volatility_score,
            meets_threshold,
            candidates = lines.len(),
            "selected cycle signal"
        );
        if meets_threshold || self.config.best_available {
            Selection::Selected {
                line,
                volatility_score,
                meets_threshold,
            }
        } else {
            Selection::NothingQualified {
                best: line,
                volatility_score,
            }
        }
    }

    /// Format ranked candidates as signal lines, then select.
    pub fn select_candidates(&self, candidates: &[Candidate]) -> Selection {
        let lines: Vec<SignalLine> = candidates.iter().map(SignalLine::from_candidate).collect();
        self.select(&lines)
    }
}
