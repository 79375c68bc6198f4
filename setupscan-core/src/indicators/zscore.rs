//! Z-score of the latest log return against the returns before it.

/// Standard deviations at or below this are treated as zero dispersion.
pub const ZERO_STDEV: f64 = 1e-12;

/// Z-score of the latest log return.
///
/// The reference set is up to `lookback` returns immediately preceding the
/// latest one. Sample standard deviation (ddof = 1) is used when the
/// reference holds two or more returns, population otherwise. Returns 0.0
/// when the deviation is effectively zero, and `None` with fewer than three
/// closes or any non-positive close in the window.
pub fn zscore_latest(closes: &[f64], lookback: usize) -> Option<f64> {
    if closes.len() < 3 || lookback == 0 {
        return None;
    }
    let window = &closes[closes.len().saturating_sub(lookback + 2)..];
    if window.iter().any(|&c| !(c.is_finite() && c > 0.0)) {
        return None;
    }

    let rets: Vec<f64> = window.windows(2).map(|w| (w[1] / w[0]).ln()).collect();
    let (latest, reference) = rets.split_last()?;
    let n = reference.len() as f64;
    let mu = reference.iter().sum::<f64>() / n;
    let ss = reference.iter().map(|r| (r - mu).powi(2)).sum::<f64>();
    let sd = if reference.len() >= 2 {
        (ss / (n - 1.0)).sqrt()
    } else {
        (ss / n).sqrt()
    };

    if sd <= ZERO_STDEV {
        Some(0.0)
    } else {
        Some((latest - mu) / sd)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::assert_approx;

    #[test]
    fn too_few_closes_is_undefined() {
        assert_eq!(zscore_latest(&[100.0, 101.0], 20), None);
        assert_eq!(zscore_latest(&[], 20), None);
    }

    #[test]
    fn constant_returns_give_zero() {
        // Geometric series: every log return is identical.
        let closes: Vec<f64> = (0..10).map(|i| 100.0 * 1.01f64.powi(i)).collect();
        assert_eq!(zscore_latest(&closes, 20), Some(0.0));
    }

    #[test]
    fn single_reference_return_is_zero() {
        assert_eq!(zscore_latest(&[100.0, 101.0, 110.0], 20), Some(0.0));
    }

    #[test]
    fn known_value() {
        // Reference log returns r1 = ln(1.01), r2 = ln(0.99); latest ln(1.05).
        let closes = [100.0, 101.0, 99.99, 104.9895];
        let r1 = (1.01f64).ln();
        let r2 = (0.99f64).ln();
        let latest = (104.9895f64 / 99.99).ln();
        let mu = (r1 + r2) / 2.0;
        let sd = (((r1 - mu).powi(2) + (r2 - mu).powi(2)) / 1.0).sqrt();
        assert_approx(zscore_latest(&closes, 20).unwrap(), (latest - mu) / sd, 1e-9);
    }

    #[test]
    fn lookback_limits_reference() {
        // Wild early returns fall outside a 3-return reference window.
        let mut closes = vec![100.0, 300.0, 50.0];
        closes.extend([100.0, 101.0, 102.0, 103.0, 110.0]);
        let tight = zscore_latest(&closes, 3).unwrap();
        let loose = zscore_latest(&closes, 50).unwrap();
        assert!(tight > loose);
    }

    #[test]
    fn non_positive_close_is_undefined() {
        assert_eq!(zscore_latest(&[100.0, 0.0, 101.0, 102.0], 20), None);
    }
}
