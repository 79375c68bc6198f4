//! Simple return helpers.

/// Total return over `periods` bars, as a decimal (0.25 = +25%).
///
/// `None` unless at least `periods + 1` closes exist and the start close is
/// positive.
pub fn period_return(closes: &[f64], periods: usize) -> Option<f64> {
    if periods == 0 || closes.len() < periods + 1 {
        return None;
    }
    let start = closes[closes.len() - 1 - periods];
    let end = closes[closes.len() - 1];
    if !(start.is_finite() && start > 0.0 && end.is_finite()) {
        return None;
    }
    Some((end - start) / start)
}

/// Percent change from `reference` to `current` (5.0 = +5%).
pub fn change_pct(reference: f64, current: f64) -> Option<f64> {
    if !(reference.is_finite() && reference > 0.0 && current.is_finite()) {
        return None;
    }
    Some((current - reference) / reference * 100.0)
}
