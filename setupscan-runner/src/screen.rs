//! Universe-wide screening: liquidity and strength gates ahead of detection.
//!
//! RS is a cross-sectional score: each return window is ranked across the
//! universe as a percentile (ties share their average rank), and a symbol's
//! score is the mean of its defined window percentiles.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use setupscan_core::domain::{BarSeries, Candidate, SetupKind};
use setupscan_core::indicators::{adr_pct, period_return, sma_latest};
use setupscan_core::ScreenConfig;

/// Blended return percentile in (0, 1] per symbol. Symbols without any
/// defined window return are absent.
pub fn rs_percentiles(universe: &[BarSeries], windows: &[usize]) -> HashMap<String, f64> {
    let mut sums: HashMap<String, (f64, usize)> = HashMap::new();
    for &window in windows {
        let mut returns: Vec<(&str, f64)> = universe
            .iter()
            .filter_map(|s| {
                period_return(&s.closes(), window)
                    .filter(|r| r.is_finite())
                    .map(|r| (s.symbol(), r))
            })
            .collect();
        if returns.is_empty() {
            continue;
        }
        returns.sort_by(|a, b| a.1.total_cmp(&b.1));
        let n = returns.len() as f64;
        let mut i = 0;
        while i < returns.len() {
            let mut j = i;
            while j + 1 < returns.len() && returns[j + 1].1 == returns[i].1 {
                j += 1;
            }
            // 1-based average rank of the tie group.
            let rank = (i + j) as f64 / 2.0 + 1.0;
            for (symbol, _) in &returns[i..=j] {
                let entry = sums.entry(symbol.to_string()).or_insert((0.0, 0));
                entry.0 += rank / n;
                entry.1 += 1;
            }
            i = j + 1;
        }
    }
    sums.into_iter()
        .map(|(symbol, (sum, count))| (symbol, sum / count as f64))
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "verdict", rename_all = "snake_case")]
pub enum ScreenVerdict {
    Pass,
    LowAdr { adr_pct: Option<f64> },
    LowVolume { avg_volume: Option<f64> },
    WeakRs { rs_score: Option<f64> },
}

impl ScreenVerdict {
    pub fn passed(&self) -> bool {
        matches!(self, Self::Pass)
    }
}

#[derive(Debug, Clone)]
pub struct Screener {
    config: ScreenConfig,
    rs: HashMap<String, f64>,
}

impl Screener {
    pub fn new(config: ScreenConfig, universe: &[BarSeries]) -> Self {
        let rs = rs_percentiles(universe, &config.rs_windows);
        Self { config, rs }
    }

    pub fn rs_score(&self, symbol: &str) -> Option<f64> {
        self.rs.get(symbol).copied()
    }

    pub fn check(&self, series: &BarSeries) -> ScreenVerdict {
        let cfg = &self.config;
        let adr = adr_pct(series.bars(), cfg.adr_len);
        if cfg.adr_min_pct > 0.0 && !adr.is_some_and(|a| a >= cfg.adr_min_pct) {
            return ScreenVerdict::LowAdr { adr_pct: adr };
        }
        if cfg.min_avg_volume > 0.0 {
            let avg = sma_latest(&series.volumes(), cfg.avg_volume_len);
            if !avg.is_some_and(|v| v >= cfg.min_avg_volume) {
                return ScreenVerdict::LowVolume { avg_volume: avg };
            }
        }
        if let Some(threshold) = cfg.rs_top_percentile {
            let rs = self.rs_score(series.symbol());
            if !rs.is_some_and(|r| r >= threshold) {
                return ScreenVerdict::WeakRs { rs_score: rs };
            }
        }
        ScreenVerdict::Pass
    }

    pub fn top_n(&self) -> usize {
        self.config.top_n
    }
}

/// Counts for one cycle's screening and detection.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScreenSummary {
    pub screened: usize,
    pub rejected_adr: usize,
    pub rejected_volume: usize,
    pub rejected_rs: usize,
    pub with_setups: usize,
    pub emitted: usize,
    /// Emitted candidates carrying each kind.
    pub per_kind: BTreeMap<SetupKind, usize>,
    pub triggered: usize,
}

impl ScreenSummary {
    pub fn record(&mut self, verdict: &ScreenVerdict) {
        self.screened += 1;
        match verdict {
            ScreenVerdict::Pass => {}
            ScreenVerdict::LowAdr { .. } => self.rejected_adr += 1,
            ScreenVerdict::LowVolume { .. } => self.rejected_volume += 1,
            ScreenVerdict::WeakRs { .. } => self.rejected_rs += 1,
        }
    }

    pub fn record_emitted(&mut self, emitted: &[Candidate]) {
        self.emitted = emitted.len();
        self.triggered = emitted.iter().filter(|c| c.is_triggered()).count();
        for candidate in emitted {
            for kind in SetupKind::ALL {
                if candidate.has_kind(kind) {
                    *self.per_kind.entry(kind).or_insert(0) += 1;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::test_support::make_bars;

    fn series(symbol: &str, closes: &[f64]) -> BarSeries {
        BarSeries::new(symbol, make_bars(closes)).unwrap()
    }

    /// Linear path from 100 to `end` over `len` bars.
    fn trend(symbol: &str, end: f64, len: usize) -> BarSeries {
        let closes: Vec<f64> = (0..len)
            .map(|i| 100.0 + (end - 100.0) * i as f64 / (len - 1) as f64)
            .collect();
        series(symbol, &closes)
    }

    #[test]
    fn percentiles_rank_across_the_universe() {
        let universe = vec![trend("A", 90.0, 30), trend("B", 110.0, 30), trend("C", 150.0, 30)];
        let rs = rs_percentiles(&universe, &[21]);
        assert!((rs["A"] - 1.0 / 3.0).abs() < 1e-12);
        assert!((rs["B"] - 2.0 / 3.0).abs() < 1e-12);
        assert!((rs["C"] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn ties_share_average_rank() {
        let universe = vec![trend("A", 120.0, 30), trend("B", 120.0, 30)];
        let rs = rs_percentiles(&universe, &[21]);
        assert!((rs["A"] - 0.75).abs() < 1e-12);
        assert_eq!(rs["A"], rs["B"]);
    }

    #[test]
    fn undefined_windows_are_skipped() {
        // Only the 21-bar window is defined for the short history.
        let universe = vec![trend("LONG", 150.0, 140), trend("SHORT", 101.0, 30)];
        let rs = rs_percentiles(&universe, &[21, 126]);
        assert!(rs.contains_key("SHORT"));
        assert!((rs["LONG"] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn screen_gates_in_order() {
        let quiet = series("QUIET", &vec![50.0; 40]);
        let universe = vec![quiet.clone()];
        let screener = Screener::new(ScreenConfig::default(), &universe);
        // 2% daily ranges are below the 5% ADR floor.
        assert!(matches!(screener.check(&quiet), ScreenVerdict::LowAdr { .. }));

        let relaxed = ScreenConfig {
            adr_min_pct: 0.0,
            min_avg_volume: 5_000.0,
            ..ScreenConfig::default()
        };
        let screener = Screener::new(relaxed.clone(), &universe);
        assert!(matches!(screener.check(&quiet), ScreenVerdict::LowVolume { .. }));

        let no_volume_floor = ScreenConfig {
            min_avg_volume: 0.0,
            rs_top_percentile: None,
            ..relaxed
        };
        let screener = Screener::new(no_volume_floor, &universe);
        assert!(screener.check(&quiet).passed());
    }

    #[test]
    fn weak_relative_strength_is_rejected() {
        let universe = vec![trend("A", 90.0, 30), trend("B", 110.0, 30), trend("C", 150.0, 30)];
        let cfg = ScreenConfig {
            adr_min_pct: 0.0,
            rs_windows: vec![21],
            ..ScreenConfig::default()
        };
        let screener = Screener::new(cfg, &universe);
        assert!(matches!(screener.check(&universe[0]), ScreenVerdict::WeakRs { .. }));
        assert!(screener.check(&universe[2]).passed());
    }

    #[test]
    fn summary_counts() {
        let mut summary = ScreenSummary::default();
        summary.record(&ScreenVerdict::Pass);
        summary.record(&ScreenVerdict::LowAdr { adr_pct: Some(1.0) });
        summary.record(&ScreenVerdict::WeakRs { rs_score: None });
        assert_eq!(summary.screened, 3);
        assert_eq!(summary.rejected_adr, 1);
        assert_eq!(summary.rejected_rs, 1);
        assert!(summary.per_kind.is_empty());
    }
}
