//! Small statistics helpers over present values
//!
//! All functions take only present (non-missing) values and return `None`
//! instead of NaN when the input cannot support the statistic.

use statrs::statistics::Statistics;

/// Arithmetic mean; `None` for an empty slice
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let m = values.iter().mean();
    m.is_finite().then_some(m)
}

/// Sample standard deviation (n - 1); `None` below two values
pub fn std_dev(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let sd = values.iter().std_dev();
    sd.is_finite().then_some(sd)
}

/// Pearson correlation of paired observations
///
/// Pairs with a missing side are dropped. Needs at least three complete
/// pairs and non-zero spread on both sides.
pub fn pearson(pairs: &[(Option<f64>, Option<f64>)]) -> Option<f64> {
    let (xs, ys): (Vec<f64>, Vec<f64>) = pairs
        .iter()
        .filter_map(|pair| match pair {
            (Some(x), Some(y)) if x.is_finite() && y.is_finite() => Some((*x, *y)),
            _ => None,
        })
        .unzip();

    if xs.len() < 3 {
        return None;
    }

    let sd_x = std_dev(&xs)?;
    let sd_y = std_dev(&ys)?;
    if sd_x == 0.0 || sd_y == 0.0 {
        return None;
    }

    let cov = xs.iter().covariance(ys.iter());
    let r = cov / (sd_x * sd_y);
    r.is_finite().then_some(r.clamp(-1.0, 1.0))
}
