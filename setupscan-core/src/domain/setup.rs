//! Setup classification results.
//!
//! A `SetupTag` is produced by exactly one detector invocation and is never
//! mutated afterwards. Diagnostics use a `BTreeMap` so serialized tags are
//! byte-for-byte reproducible.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// The four momentum setups the engine recognizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SetupKind {
    Breakout,
    RangeBreakout,
    EpisodicPivot,
    ParabolicLong,
}

impl SetupKind {
    pub const ALL: [SetupKind; 4] = [
        SetupKind::Breakout,
        SetupKind::RangeBreakout,
        SetupKind::EpisodicPivot,
        SetupKind::ParabolicLong,
    ];

    /// Stable snake-case name (config keys, JSON).
    pub fn name(&self) -> &'static str {
        match self {
            Self::Breakout => "breakout",
            Self::RangeBreakout => "range_breakout",
            Self::EpisodicPivot => "episodic_pivot",
            Self::ParabolicLong => "parabolic_long",
        }
    }

    /// Single-token label used as the trailing KIND of a signal line.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Breakout => "Breakout",
            Self::RangeBreakout => "RangeBreakout",
            Self::EpisodicPivot => "EpisodicPivot",
            Self::ParabolicLong => "ParabolicLong",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|k| k.label() == label || k.name() == label)
    }
}

impl fmt::Display for SetupKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Named diagnostic values attached to a tag (range_pct, atr_ratio, gap_pct, ...).
pub type Diagnostics = BTreeMap<String, f64>;

/// One detector's verdict for one symbol in one cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SetupTag {
    pub kind: SetupKind,
    /// True only when every hard gate of the setup passed.
    pub triggered: bool,
    /// Confidence in [0, 1].
    pub score: f64,
    pub diagnostics: Diagnostics,
}

impl SetupTag {
    /// Build a tag, clamping the score into [0, 1]. A NaN score becomes 0.
    pub fn new(kind: SetupKind, triggered: bool, score: f64, diagnostics: Diagnostics) -> Self {
        let score = if score.is_nan() { 0.0 } else { score.clamp(0.0, 1.0) };
        Self {
            kind,
            triggered,
            score,
            diagnostics,
        }
    }

    pub fn diagnostic(&self, name: &str) -> Option<f64> {
        self.diagnostics.get(name).copied()
    }
}
