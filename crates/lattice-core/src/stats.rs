// ─────────────────────────────────────────────────────────────────────
// Trigger Lattice — Series Statistics
// ─────────────────────────────────────────────────────────────────────
//! Small numeric helpers over activation histories.

/// Arithmetic mean; 0.0 for an empty series.
pub fn mean(series: &[f64]) -> f64 {
    if series.is_empty() {
        return 0.0;
    }
    series.iter().sum::<f64>() / series.len() as f64
}

/// Population variance (divides by `n`).
pub fn variance(series: &[f64]) -> f64 {
    if series.is_empty() {
        return 0.0;
    }
    let m = mean(series);
    series.iter().map(|v| (v - m).powi(2)).sum::<f64>() / series.len() as f64
}

/// Stability score `1 / (1 + variance)` in (0, 1].
pub fn stability(series: &[f64]) -> f64 {
    1.0 / (1.0 + variance(series))
}

/// Pearson correlation of two equal-length series.
///
/// Returns 0.0 when the lengths differ, when fewer than two samples are
/// given, or when either series is constant.
pub fn pearson(a: &[f64], b: &[f64]) -> f64 {
    if a.len() != b.len() || a.len() < 2 {
        return 0.0;
    }
    let (ma, mb) = (mean(a), mean(b));
    let mut num = 0.0;
    let mut da2 = 0.0;
    let mut db2 = 0.0;
    for (x, y) in a.iter().zip(b) {
        let dx = x - ma;
        let dy = y - mb;
        num += dx * dy;
        da2 += dx * dx;
        db2 += dy * dy;
    }
    let den = (da2 * db2).sqrt();
    if den == 0.0 || !den.is_finite() {
        return 0.0;
    }
    num / den
}
