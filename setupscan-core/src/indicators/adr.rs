//! Average Daily Range percentage.

use crate::domain::Bar;

/// Mean of per-bar (high - low) / low over the last `n` bars, × 100.
///
/// `None` with fewer than `n` bars or a non-positive low in the window.
pub fn adr_pct(bars: &[Bar], n: usize) -> Option<f64> {
    if n == 0 || bars.len() < n {
        return None;
    }
    let ranges: Vec<f64> = bars[bars.len() - n..]
        .iter()
        .map(|b| {
            if b.low > 0.0 {
                (b.high - b.low) / b.low
            } else {
                f64::NAN
            }
        })
        .collect();
    super::mean(&ranges).map(|m| m * 100.0)
}
