//! Setupscan Core: domain types, indicators, regime gate, setup detectors,
//! ranking, signal lines and cycle selection.
//!
//! This crate is pure computation over bar histories:
//! - Domain types (bars, series, session snapshots, setup tags, candidates)
//! - Indicator library shared by every detector
//! - Market regime gate evaluated once per cycle
//! - Breakout, range breakout, episodic pivot and parabolic long detectors
//! - Cross-universe ranker and volatility-weighted cycle selector
//! - Signal line codec and intraday spike classifier
//! - Named configuration profiles
//!
//! Data acquisition, scheduling and parallel fan-out live in `setupscan-runner`.

pub mod config;
pub mod domain;
pub mod indicators;
pub mod ranking;
pub mod regime;
pub mod selector;
pub mod setups;
pub mod signal_line;
pub mod spike;

pub use config::{ConfigError, OpeningRangeConfig, ScanConfig, ScreenConfig};

#[cfg(test)]
mod tests {
    use super::*;

    /// Compile-time check: everything the runner shares across worker
    /// threads is Send + Sync.
    #[allow(dead_code)]
    fn assert_send_sync() {
        fn require_send<T: Send>() {}
        fn require_sync<T: Sync>() {}

        // Domain types
        require_send::<domain::Bar>();
        require_sync::<domain::Bar>();
        require_send::<domain::BarSeries>();
        require_sync::<domain::BarSeries>();
        require_send::<domain::SessionSnapshot>();
        require_sync::<domain::SessionSnapshot>();
        require_send::<domain::SetupTag>();
        require_sync::<domain::SetupTag>();
        require_send::<domain::Candidate>();
        require_sync::<domain::Candidate>();
        require_send::<domain::IndicatorSet>();
        require_sync::<domain::IndicatorSet>();

        // Shared cycle state
        require_send::<regime::RegimeState>();
        require_sync::<regime::RegimeState>();
        require_send::<setups::DetectorSet>();
        require_sync::<setups::DetectorSet>();
        require_send::<ranking::Ranker>();
        require_sync::<ranking::Ranker>();
        require_send::<selector::CycleSelector>();
        require_sync::<selector::CycleSelector>();
        require_send::<ScanConfig>();
        require_sync::<ScanConfig>();

        // Detectors
        require_send::<setups::BreakoutDetector>();
        require_sync::<setups::BreakoutDetector>();
        require_send::<setups::RangeBreakoutDetector>();
        require_sync::<setups::RangeBreakoutDetector>();
        require_send::<setups::EpisodicPivotDetector>();
        require_sync::<setups::EpisodicPivotDetector>();
        require_send::<setups::ParabolicLongDetector>();
        require_sync::<setups::ParabolicLongDetector>();
    }

    /// Detectors see one symbol's context and nothing else: the trait takes
    /// only a `DetectionContext`, so a detector cannot read other symbols or
    /// cycle output.
    #[test]
    fn detector_trait_sees_only_its_context() {
        fn _check_trait_object_builds(
            detector: &dyn setups::SetupDetector,
            ctx: &setups::DetectionContext<'_>,
        ) -> Option<domain::SetupTag> {
            detector.detect(ctx)
        }
    }
}
