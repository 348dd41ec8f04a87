//! Small numeric helpers shared by the analytic modules.

/// Round half up to `dp` decimal places (`round_dp(2.45, 1) == 2.5`,
/// `round_dp(-0.125, 2) == -0.12`).
pub fn round_dp(value: f64, dp: i32) -> f64 {
    if !value.is_finite() {
        return 0.0;
    }
    let factor = 10f64.powi(dp);
    (value * factor + 0.5).floor() / factor
}

/// Round half up to the nearest integer.
pub fn round_half_up(value: f64) -> f64 {
    round_dp(value, 0)
}

/// Arithmetic mean, `None` for an empty slice.
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

/// Pearson correlation coefficient of two equally long series.
///
/// Returns `None` when the series are empty, of different lengths, or when
/// either has zero variance.
pub fn pearson(xs: &[f64], ys: &[f64]) -> Option<f64> {
    if xs.len() != ys.len() {
        return None;
    }
    let mean_x = mean(xs)?;
    let mean_y = mean(ys)?;

    let mut num = 0.0;
    let mut den_x = 0.0;
    let mut den_y = 0.0;
    for (x, y) in xs.iter().zip(ys) {
        let dx = x - mean_x;
        let dy = y - mean_y;
        num += dx * dy;
        den_x += dx * dx;
        den_y += dy * dy;
    }

    let den = (den_x * den_y).sqrt();
    if den > 0.0 {
        Some((num / den).clamp(-1.0, 1.0))
    } else {
        None
    }
}
