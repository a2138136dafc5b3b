//! Rolling statistics used by the factor engines
//!
//! Every rolling function returns a vector aligned with its input. Positions
//! without a full trailing window hold `f64::NAN`, which is also what the
//! factor files store (as an empty cell) for "no value yet".

/// Mean of the non-NaN values (NaN if there are none)
pub fn nan_mean(values: &[f64]) -> f64 {
    let (sum, count) = values
        .iter()
        .filter(|v| !v.is_nan())
        .fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));

    if count == 0 {
        f64::NAN
    } else {
        sum / count as f64
    }
}

/// Sample (n-1) standard deviation of the non-NaN values
///
/// NaN when fewer than two values are available.
pub fn nan_sample_std(values: &[f64]) -> f64 {
    let present: Vec<f64> = values.iter().copied().filter(|v| !v.is_nan()).collect();
    if present.len() < 2 {
        return f64::NAN;
    }

    let mean = present.iter().sum::<f64>() / present.len() as f64;
    let sum_sq: f64 = present.iter().map(|v| (v - mean).powi(2)).sum();
    (sum_sq / (present.len() - 1) as f64).sqrt()
}

/// Rolling mean over a trailing window
pub fn rolling_mean(values: &[f64], window: usize) -> Vec<f64> {
    let mut out = vec![f64::NAN; values.len()];
    if window == 0 || values.len() < window {
        return out;
    }

    for i in (window - 1)..values.len() {
        let slice = &values[i + 1 - window..=i];
        out[i] = slice.iter().sum::<f64>() / window as f64;
    }

    out
}

/// Rolling sample standard deviation over a trailing window
pub fn rolling_std(values: &[f64], window: usize) -> Vec<f64> {
    let mut out = vec![f64::NAN; values.len()];
    if window < 2 || values.len() < window {
        return out;
    }

    for i in (window - 1)..values.len() {
        let slice = &values[i + 1 - window..=i];
        let mean = slice.iter().sum::<f64>() / window as f64;
        let sum_sq: f64 = slice.iter().map(|v| (v - mean).powi(2)).sum();
        out[i] = (sum_sq / (window - 1) as f64).sqrt();
    }

    out
}

/// One-step-ahead projection of an OLS line fitted to `y` against `0..n`
///
/// Solved in closed form for each call; returns the fitted value at `x = n`.
pub fn regression_projection(y: &[f64]) -> f64 {
    let n = y.len();
    if n == 0 {
        return f64::NAN;
    }
    if n == 1 {
        return y[0];
    }

    let x_mean = (n - 1) as f64 / 2.0;
    let y_mean = y.iter().sum::<f64>() / n as f64;

    let mut sxx = 0.0;
    let mut sxy = 0.0;
    for (i, value) in y.iter().enumerate() {
        let dx = i as f64 - x_mean;
        sxx += dx * dx;
        sxy += dx * (value - y_mean);
    }

    let slope = sxy / sxx;
    y_mean + slope * (n as f64 - x_mean)
}

/// Rolling one-step-ahead regression projection over a trailing window
pub fn rolling_regression(values: &[f64], window: usize) -> Vec<f64> {
    let mut out = vec![f64::NAN; values.len()];
    if window == 0 || values.len() < window {
        return out;
    }

    for i in (window - 1)..values.len() {
        out[i] = regression_projection(&values[i + 1 - window..=i]);
    }

    out
}

/// Rolling mean and standard deviation of closes
#[derive(Debug, Clone)]
pub struct BollingerBands {
    pub mean: Vec<f64>,
    pub std: Vec<f64>,
}

impl BollingerBands {
    pub fn compute(closes: &[f64], window: usize) -> Self {
        Self {
            mean: rolling_mean(closes, window),
            std: rolling_std(closes, window),
        }
    }

    /// `mean + k * std` at every position (negative `k` for lower bands)
    pub fn band(&self, k: f64) -> Vec<f64> {
        if k == 0.0 {
            return self.mean.clone();
        }
        self.mean
            .iter()
            .zip(&self.std)
            .map(|(mean, std)| mean + k * std)
            .collect()
    }
}

/// Split-adjustment factor per bar
///
/// `round(prev_close / close)` with half-to-even rounding. Ratios of 1 mean
/// no split and are treated as missing, as are 0 and non-finite ratios. Gaps
/// are back-filled from the nearest later known ratio first, and only then
/// do unresolved trailing gaps default to 1.
pub fn split_factors(closes: &[f64]) -> Vec<f64> {
    let mut ratios: Vec<Option<f64>> = closes
        .iter()
        .enumerate()
        .map(|(i, close)| {
            if i == 0 {
                return None;
            }
            let ratio = (closes[i - 1] / close).round_ties_even();
            if ratio.is_finite() && ratio != 1.0 && ratio != 0.0 {
                Some(ratio)
            } else {
                None
            }
        })
        .collect();

    let mut next_known = None;
    for ratio in ratios.iter_mut().rev() {
        match ratio {
            Some(value) => next_known = Some(*value),
            None => *ratio = next_known,
        }
    }

    ratios.into_iter().map(|r| r.unwrap_or(1.0)).collect()
}
