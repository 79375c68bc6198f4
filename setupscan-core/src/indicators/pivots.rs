//! Pivot-low structure.

/// Indices of pivot lows.
///
/// Bar `i` is a pivot when `lows[i]` is the minimum of `lows[i-left..=i+right]`
/// and no earlier bar in that window ties it. Bars without a full window on
/// both sides are never pivots.
pub fn pivot_lows(lows: &[f64], left: usize, right: usize) -> Vec<usize> {
    let n = lows.len();
    if n < left + right + 1 {
        return Vec::new();
    }
    (left..n - right)
        .filter(|&i| {
            let window = &lows[i - left..=i + right];
            if window.iter().any(|v| v.is_nan()) {
                return false;
            }
            let first_min = window
                .iter()
                .enumerate()
                .fold((0usize, f64::INFINITY), |(bi, bv), (j, &v)| {
                    if v < bv {
                        (j, v)
                    } else {
                        (bi, bv)
                    }
                })
                .0;
            first_min == left
        })
        .collect()
}

/// True when the last `needed` pivot lows (±`k` bars) strictly increase.
pub fn higher_lows(lows: &[f64], k: usize, needed: usize) -> bool {
    higher_lows_asym(lows, k, k, needed)
}

/// [`higher_lows`] with independent left/right pivot widths.
pub fn higher_lows_asym(lows: &[f64], left: usize, right: usize, needed: usize) -> bool {
    if needed == 0 {
        return true;
    }
    let pivots = pivot_lows(lows, left, right);
    if pivots.len() < needed {
        return false;
    }
    pivots[pivots.len() - needed..]
        .windows(2)
        .all(|w| lows[w[0]] < lows[w[1]])
}
