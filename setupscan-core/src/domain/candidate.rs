//! Candidate: a symbol's aggregated setups for one scan cycle.

use serde::{Deserialize, Serialize};

use super::indicator_set::IndicatorSet;
use super::setup::SetupTag;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub symbol: String,
    /// One or more tags, best first once ranked.
    pub tags: Vec<SetupTag>,
    pub price: f64,
    pub change_pct: f64,
    pub indicators: IndicatorSet,
    /// Cross-universe relative strength percentile in [0, 1], when computed.
    pub rs_score: Option<f64>,
}

impl Candidate {
    /// The leading tag. Ranked candidates keep their best tag first.
    pub fn best(&self) -> Option<&SetupTag> {
        self.tags.first()
    }

    pub fn is_triggered(&self) -> bool {
        self.tags.iter().any(|t| t.triggered)
    }

    pub fn has_kind(&self, kind: super::SetupKind) -> bool {
        self.tags.iter().any(|t| t.kind == kind)
    }
}
