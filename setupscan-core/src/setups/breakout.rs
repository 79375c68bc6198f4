//! Breakout (flag) detector: impulse leg, tight base, price-and-volume breakout.

use super::base_breakout::{detect_base_breakout, BaseBreakoutConfig};
use super::{DetectionContext, SetupDetector};
use crate::domain::{SetupKind, SetupTag};

#[derive(Debug, Clone)]
pub struct BreakoutDetector {
    config: BaseBreakoutConfig,
}

impl BreakoutDetector {
    pub fn new(config: BaseBreakoutConfig) -> Self {
        Self { config }
    }

    pub fn default_params() -> Self {
        Self::new(BaseBreakoutConfig::breakout())
    }

    pub fn config(&self) -> &BaseBreakoutConfig {
        &self.config
    }
}

impl SetupDetector for BreakoutDetector {
    fn kind(&self) -> SetupKind {
        SetupKind::Breakout
    }

    fn min_bars(&self) -> usize {
        self.config.min_bars()
    }

    fn detect(&self, ctx: &DetectionContext<'_>) -> Option<SetupTag> {
        detect_base_breakout(SetupKind::Breakout, &self.config, ctx)
    }
}
