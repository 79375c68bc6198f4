//! Cross-universe ranking of setup candidates.
//!
//! Candidates are ordered by a strict composite key: the best tag's kind
//! priority, then its score, then the cross-universe RS score (missing
//! sorts last), then the symbol. After grouping every symbol appears once,
//! so the symbol tiebreak leaves no two candidates unordered.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::domain::{Candidate, SetupKind, SetupTag};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RankingConfig {
    /// Larger ranks first. Kinds missing from the map rank 0.
    pub priorities: BTreeMap<SetupKind, u32>,
}

impl Default for RankingConfig {
    fn default() -> Self {
        let priorities = BTreeMap::from([
            (SetupKind::EpisodicPivot, 4),
            (SetupKind::Breakout, 3),
            (SetupKind::ParabolicLong, 2),
            (SetupKind::RangeBreakout, 1),
        ]);
        Self { priorities }
    }
}

impl RankingConfig {
    pub fn priority(&self, kind: SetupKind) -> u32 {
        self.priorities.get(&kind).copied().unwrap_or(0)
    }
}

#[derive(Debug, Clone, Default)]
pub struct Ranker {
    config: RankingConfig,
}

impl Ranker {
    pub fn new(config: RankingConfig) -> Self {
        Self { config }
    }

    /// Tag order inside one candidate: priority desc, then score desc.
    pub fn compare_tags(&self, a: &SetupTag, b: &SetupTag) -> Ordering {
        self.config
            .priority(b.kind)
            .cmp(&self.config.priority(a.kind))
            .then_with(|| b.score.total_cmp(&a.score))
            .then_with(|| a.kind.cmp(&b.kind))
    }

    /// Candidate order; `Less` means `a` ranks ahead of `b`.
    pub fn compare(&self, a: &Candidate, b: &Candidate) -> Ordering {
        let key = |c: &Candidate| {
            c.best()
                .map(|t| (self.config.priority(t.kind), t.score))
                .unwrap_or((0, f64::NEG_INFINITY))
        };
        let (pa, sa) = key(a);
        let (pb, sb) = key(b);
        pb.cmp(&pa)
            .then_with(|| sb.total_cmp(&sa))
            .then_with(|| match (a.rs_score, b.rs_score) {
                (Some(x), Some(y)) => y.total_cmp(&x),
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => Ordering::Equal,
            })
            .then_with(|| a.symbol.cmp(&b.symbol))
    }

    /// Group by symbol, order each candidate's tags, then sort candidates.
    ///
    /// Candidates sharing a symbol are merged: tags are concatenated without
    /// de-duplication and the first occurrence's snapshot is kept.
    /// Candidates without tags are dropped.
    pub fn rank(&self, candidates: Vec<Candidate>) -> Vec<Candidate> {
        let mut grouped: BTreeMap<String, Candidate> = BTreeMap::new();
        for candidate in candidates {
            match grouped.get_mut(&candidate.symbol) {
                Some(existing) => {
                    existing.tags.extend(candidate.tags);
                    if existing.rs_score.is_none() {
                        existing.rs_score = candidate.rs_score;
                    }
                }
                None => {
                    grouped.insert(candidate.symbol.clone(), candidate);
                }
            }
        }

        let mut ranked: Vec<Candidate> = grouped
            .into_values()
            .filter(|c| !c.tags.is_empty())
            .map(|mut c| {
                c.tags.sort_by(|a, b| self.compare_tags(a, b));
                c
            })
            .collect();
        ranked.sort_by(|a, b| self.compare(a, b));
        ranked
    }
}
