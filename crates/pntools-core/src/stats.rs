//! Response selectivity measures over a set of values (e.g. one neuron's
//! input to each glomerulus). NaNs are dropped before computing.

fn finite_values(x: &[f64]) -> Vec<f64> {
    x.iter().copied().filter(|v| !v.is_nan()).collect()
}

/// Lifetime kurtosis: mean of the fourth power of the z-scores, minus 3.
///
/// Uses the population standard deviation. `None` for fewer than two values
/// or zero variance.
pub fn lifetime_kurtosis(x: &[f64]) -> Option<f64> {
    let x = finite_values(x);
    if x.len() < 2 {
        return None;
    }
    let n = x.len() as f64;
    let mean = x.iter().sum::<f64>() / n;
    let var = x.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    let sd = var.sqrt();
    if sd == 0.0 || !sd.is_finite() {
        return None;
    }
    Some(x.iter().map(|v| ((v - mean) / sd).powi(4)).sum::<f64>() / n - 3.0)
}

/// Lifetime sparseness, 0 for a flat response and 1 when a single value
/// carries everything.
///
/// `None` for fewer than two values or when every value is zero.
pub fn lifetime_sparseness(x: &[f64]) -> Option<f64> {
    let x = finite_values(x);
    if x.len() < 2 {
        return None;
    }
    let n = x.len() as f64;
    let mean = x.iter().sum::<f64>() / n;
    let mean_sq = x.iter().map(|v| v * v).sum::<f64>() / n;
    if mean_sq == 0.0 {
        return None;
    }
    Some((1.0 - mean * mean / mean_sq) / (1.0 - 1.0 / n))
}
