//! Range breakout detector: a contracted base with rising pivot lows,
//! broken on volume. No prior impulse is needed.

use super::base_breakout::{detect_base_breakout, BaseBreakoutConfig};
use super::{DetectionContext, SetupDetector};
use crate::domain::{SetupKind, SetupTag};

#[derive(Debug, Clone)]
pub struct RangeBreakoutDetector {
    config: BaseBreakoutConfig,
}

impl RangeBreakoutDetector {
    /// Higher lows are always enforced, whatever the supplied config says.
    pub fn new(config: BaseBreakoutConfig) -> Self {
        Self {
            config: BaseBreakoutConfig {
                require_higher_lows: true,
                ..config
            },
        }
    }

    pub fn default_params() -> Self {
        Self::new(BaseBreakoutConfig::range_breakout())
    }

    pub fn config(&self) -> &BaseBreakoutConfig {
        &self.config
    }
}

impl SetupDetector for RangeBreakoutDetector {
    fn kind(&self) -> SetupKind {
        SetupKind::RangeBreakout
    }

    fn min_bars(&self) -> usize {
        self.config.min_bars()
    }

    fn detect(&self, ctx: &DetectionContext<'_>) -> Option<SetupTag> {
        detect_base_breakout(SetupKind::RangeBreakout, &self.config, ctx)
    }
}
