//! Session-level inputs that do not live in the daily bar series.

use serde::{Deserialize, Serialize};

/// Pre-open and opening-minutes facts for one symbol on the scan day.
///
/// Every field is optional; a detector that needs a missing field skips the
/// sub-check that depends on it (or declines, if the check is mandatory).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    /// Session open price. When absent the latest daily bar's open is used.
    pub open: Option<f64>,
    /// Prior session close. When absent the prior daily bar's close is used.
    pub prev_close: Option<f64>,
    /// Pre-session dollar volume.
    pub premarket_notional: Option<f64>,
    /// Shares traded in the first N minutes of the session.
    pub opening_volume: Option<f64>,
}
