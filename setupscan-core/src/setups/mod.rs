//! Setup detection: classifies one symbol's bar history into momentum setups.
//!
//! Detectors are pure: they see the symbol's bars, optional aligned benchmark
//! closes, the cycle's shared regime state and an optional session snapshot.
//! "No setup" is always `None`, never an error. A detector that cannot pass
//! every required gate declines instead of emitting a weak tag.

pub mod base_breakout;
pub mod breakout;
pub mod episodic_pivot;
pub mod parabolic;
pub mod range_breakout;

pub use base_breakout::BaseBreakoutConfig;
pub use breakout::BreakoutDetector;
pub use episodic_pivot::{EpisodicPivotConfig, EpisodicPivotDetector};
pub use parabolic::{ParabolicConfig, ParabolicLongDetector};
pub use range_breakout::RangeBreakoutDetector;

use serde::{Deserialize, Serialize};

use crate::domain::{BarSeries, Diagnostics, SessionSnapshot, SetupKind, SetupTag};
use crate::regime::RegimeState;

/// Everything a detector may look at for one symbol in one cycle.
#[derive(Debug, Clone, Copy)]
pub struct DetectionContext<'a> {
    pub series: &'a BarSeries,
    /// Benchmark closes aligned bar-for-bar with `series`.
    pub benchmark: Option<&'a [f64]>,
    pub regime: &'a RegimeState,
    pub session: Option<&'a SessionSnapshot>,
}

impl<'a> DetectionContext<'a> {
    pub fn new(series: &'a BarSeries, regime: &'a RegimeState) -> Self {
        Self {
            series,
            benchmark: None,
            regime,
            session: None,
        }
    }

    pub fn with_benchmark(mut self, benchmark: &'a [f64]) -> Self {
        self.benchmark = Some(benchmark);
        self
    }

    pub fn with_session(mut self, session: &'a SessionSnapshot) -> Self {
        self.session = Some(session);
        self
    }

    pub fn symbol(&self) -> &str {
        self.series.symbol()
    }
}

/// Trait for setup detectors.
///
/// # Contract
/// - `detect` returns `None` whenever `series.len() < min_bars()`.
/// - A returned tag with `triggered = true` passed every hard gate.
/// - Identical inputs give identical output.
pub trait SetupDetector: Send + Sync {
    fn kind(&self) -> SetupKind;

    /// Bars required before the detector will consider the series.
    fn min_bars(&self) -> usize;

    fn detect(&self, ctx: &DetectionContext<'_>) -> Option<SetupTag>;
}

/// Configuration for the full detector battery.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SetupsConfig {
    pub breakout: BaseBreakoutConfig,
    pub range_breakout: BaseBreakoutConfig,
    pub episodic_pivot: EpisodicPivotConfig,
    pub parabolic_long: ParabolicConfig,
    /// Kinds excluded from the scan.
    pub disabled: Vec<SetupKind>,
}

impl Default for SetupsConfig {
    fn default() -> Self {
        Self {
            breakout: BaseBreakoutConfig::breakout(),
            range_breakout: BaseBreakoutConfig::range_breakout(),
            episodic_pivot: EpisodicPivotConfig::default(),
            parabolic_long: ParabolicConfig::default(),
            disabled: Vec::new(),
        }
    }
}

/// The enabled detectors, run independently over each symbol.
pub struct DetectorSet {
    detectors: Vec<Box<dyn SetupDetector>>,
}

impl DetectorSet {
    pub fn new(detectors: Vec<Box<dyn SetupDetector>>) -> Self {
        Self { detectors }
    }

    pub fn from_config(config: &SetupsConfig) -> Self {
        let all: Vec<Box<dyn SetupDetector>> = vec![
            Box::new(BreakoutDetector::new(config.breakout.clone())),
            Box::new(RangeBreakoutDetector::new(config.range_breakout.clone())),
            Box::new(EpisodicPivotDetector::new(config.episodic_pivot.clone())),
            Box::new(ParabolicLongDetector::new(config.parabolic_long.clone())),
        ];
        Self::new(
            all.into_iter()
                .filter(|d| !config.disabled.contains(&d.kind()))
                .collect(),
        )
    }

    pub fn kinds(&self) -> Vec<SetupKind> {
        self.detectors.iter().map(|d| d.kind()).collect()
    }

    pub fn len(&self) -> usize {
        self.detectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.detectors.is_empty()
    }

    /// Every tag the enabled detectors emit for this context.
    pub fn detect_all(&self, ctx: &DetectionContext<'_>) -> Vec<SetupTag> {
        self.detectors.iter().filter_map(|d| d.detect(ctx)).collect()
    }
}

impl std::fmt::Debug for DetectorSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DetectorSet")
            .field("kinds", &self.kinds())
            .finish()
    }
}

/// Inserts a named diagnostic; booleans are stored as 1.0 / 0.0.
pub(crate) fn put(diag: &mut Diagnostics, name: &str, value: f64) {
    diag.insert(name.to_string(), value);
}

pub(crate) fn flag(b: bool) -> f64 {
    if b {
        1.0
    } else {
        0.0
    }
}
