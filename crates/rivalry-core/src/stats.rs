//! Statistics primitives
//!
//! Stateless pure functions over numeric slices. Every function is total:
//! empty or degenerate input yields a neutral value (0, an empty vector, or a
//! zeroed regression) instead of panicking. Variance and standard deviation
//! use population formulas. Rolling and exponential averages are causal and
//! only look backward.
//!
//! Inputs are expected to be finite; series cleaning drops NaN and infinite
//! values before anything reaches this module.

use serde::{Deserialize, Serialize};

/// Neighborhood radius used when measuring peak/trough prominence
pub const PROMINENCE_RADIUS: usize = 5;

/// Result of an ordinary least squares fit against the point index
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinearRegression {
    pub slope: f64,
    pub intercept: f64,
    pub r_squared: f64,
}

impl LinearRegression {
    /// Fitted value at index `x`
    pub fn predict(&self, x: f64) -> f64 {
        self.intercept + self.slope * x
    }
}

pub fn sum(values: &[f64]) -> f64 {
    values.iter().sum()
}

pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    sum(values) / values.len() as f64
}

pub fn median(values: &[f64]) -> f64 {
    percentile(values, 50.0)
}

pub fn min(values: &[f64]) -> f64 {
    values.iter().copied().reduce(f64::min).unwrap_or(0.0)
}

pub fn max(values: &[f64]) -> f64 {
    values.iter().copied().reduce(f64::max).unwrap_or(0.0)
}

/// Population variance
pub fn variance(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let m = mean(values);
    values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / values.len() as f64
}

/// Population standard deviation
pub fn std_dev(values: &[f64]) -> f64 {
    variance(values).sqrt()
}

/// Standard score of `value`; 0 when the spread is zero
pub fn z_score(value: f64, mean: f64, std_dev: f64) -> f64 {
    if std_dev == 0.0 {
        return 0.0;
    }
    (value - mean) / std_dev
}

/// Standard score of every value against the slice's own mean/std
pub fn z_scores(values: &[f64]) -> Vec<f64> {
    let m = mean(values);
    let s = std_dev(values);
    values.iter().map(|&v| z_score(v, m, s)).collect()
}

/// Linearly interpolated percentile, `p` in [0, 100]
pub fn percentile(values: &[f64], p: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));

    let rank = (p.clamp(0.0, 100.0) / 100.0) * (sorted.len() - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    if lower == upper {
        return sorted[lower];
    }
    let weight = rank - lower as f64;
    sorted[lower] * (1.0 - weight) + sorted[upper] * weight
}

/// Population covariance; 0 on empty or mismatched input
pub fn covariance(a: &[f64], b: &[f64]) -> f64 {
    if a.is_empty() || a.len() != b.len() {
        return 0.0;
    }
    let ma = mean(a);
    let mb = mean(b);
    a.iter()
        .zip(b)
        .map(|(x, y)| (x - ma) * (y - mb))
        .sum::<f64>()
        / a.len() as f64
}

/// Pearson correlation; 0 when either side has zero variance or lengths differ
pub fn correlation(a: &[f64], b: &[f64]) -> f64 {
    if a.len() < 2 || a.len() != b.len() {
        return 0.0;
    }
    let sa = std_dev(a);
    let sb = std_dev(b);
    if sa == 0.0 || sb == 0.0 {
        return 0.0;
    }
    (covariance(a, b) / (sa * sb)).clamp(-1.0, 1.0)
}

/// Least squares fit of `values` against their index
pub fn linear_regression(values: &[f64]) -> LinearRegression {
    let n = values.len();
    if n < 2 {
        return LinearRegression::default();
    }

    let n_f = n as f64;
    let sum_x: f64 = (0..n).map(|i| i as f64).sum();
    let sum_y = sum(values);
    let sum_xy: f64 = values.iter().enumerate().map(|(i, y)| i as f64 * y).sum();
    let sum_xx: f64 = (0..n).map(|i| (i as f64).powi(2)).sum();

    let denominator = n_f * sum_xx - sum_x * sum_x;
    if denominator == 0.0 {
        return LinearRegression::default();
    }

    let slope = (n_f * sum_xy - sum_x * sum_y) / denominator;
    let intercept = (sum_y - slope * sum_x) / n_f;

    let y_mean = sum_y / n_f;
    let ss_tot: f64 = values.iter().map(|y| (y - y_mean).powi(2)).sum();
    let ss_res: f64 = values
        .iter()
        .enumerate()
        .map(|(i, y)| (y - (intercept + slope * i as f64)).powi(2))
        .sum();

    let r_squared = if ss_tot == 0.0 {
        0.0
    } else {
        (1.0 - ss_res / ss_tot).clamp(0.0, 1.0)
    };

    LinearRegression {
        slope,
        intercept,
        r_squared,
    }
}

/// Trailing average; early points average over the partial window
pub fn rolling_average(values: &[f64], window: usize) -> Vec<f64> {
    let window = window.max(1);
    (0..values.len())
        .map(|i| {
            let start = (i + 1).saturating_sub(window);
            mean(&values[start..=i])
        })
        .collect()
}

/// Trailing population standard deviation over the same windows as `rolling_average`
pub fn rolling_std_dev(values: &[f64], window: usize) -> Vec<f64> {
    let window = window.max(1);
    (0..values.len())
        .map(|i| {
            let start = (i + 1).saturating_sub(window);
            std_dev(&values[start..=i])
        })
        .collect()
}

/// Exponential moving average with smoothing `2 / (period + 1)`, seeded by the first value
pub fn exponential_moving_average(values: &[f64], period: usize) -> Vec<f64> {
    let alpha = 2.0 / (period.max(1) as f64 + 1.0);
    let mut out = Vec::with_capacity(values.len());
    let mut previous: Option<f64> = None;
    for &v in values {
        let next = match previous {
            Some(prev) => alpha * v + (1.0 - alpha) * prev,
            None => v,
        };
        out.push(next);
        previous = Some(next);
    }
    out
}

/// Indices of values outside `[Q1 - 1.5 IQR, Q3 + 1.5 IQR]`
pub fn detect_outliers(values: &[f64]) -> Vec<usize> {
    if values.len() < 4 {
        return Vec::new();
    }
    let q1 = percentile(values, 25.0);
    let q3 = percentile(values, 75.0);
    let iqr = q3 - q1;
    let lower = q1 - 1.5 * iqr;
    let upper = q3 + 1.5 * iqr;

    values
        .iter()
        .enumerate()
        .filter(|(_, &v)| v < lower || v > upper)
        .map(|(i, _)| i)
        .collect()
}

fn neighborhood(values: &[f64], i: usize) -> &[f64] {
    let start = i.saturating_sub(PROMINENCE_RADIUS);
    let end = (i + PROMINENCE_RADIUS + 1).min(values.len());
    &values[start..end]
}

/// Strict local maxima whose height above the lowest point within ±5 reaches `min_prominence`
pub fn find_peaks(values: &[f64], min_prominence: f64) -> Vec<usize> {
    if values.len() < 3 {
        return Vec::new();
    }
    (1..values.len() - 1)
        .filter(|&i| values[i] > values[i - 1] && values[i] > values[i + 1])
        .filter(|&i| values[i] - min(neighborhood(values, i)) >= min_prominence)
        .collect()
}

/// Strict local minima whose depth below the highest point within ±5 reaches `min_prominence`
pub fn find_troughs(values: &[f64], min_prominence: f64) -> Vec<usize> {
    if values.len() < 3 {
        return Vec::new();
    }
    (1..values.len() - 1)
        .filter(|&i| values[i] < values[i - 1] && values[i] < values[i + 1])
        .filter(|&i| max(neighborhood(values, i)) - values[i] >= min_prominence)
        .collect()
}

/// Standard deviation over the absolute mean, as a ratio (0.25 = 25%)
pub fn coefficient_of_variation(values: &[f64]) -> f64 {
    let m = mean(values);
    if m == 0.0 {
        return 0.0;
    }
    std_dev(values) / m.abs()
}

/// Sample autocorrelation at `lag`; 0 when the lag leaves no pairs or the series is flat
pub fn autocorrelation(values: &[f64], lag: usize) -> f64 {
    if lag == 0 || lag >= values.len() {
        return 0.0;
    }
    let m = mean(values);
    let denominator: f64 = values.iter().map(|v| (v - m).powi(2)).sum();
    if denominator == 0.0 {
        return 0.0;
    }
    let numerator: f64 = (0..values.len() - lag)
        .map(|i| (values[i] - m) * (values[i + lag] - m))
        .sum();
    numerator / denominator
}

/// Residuals after removing the least squares line
pub fn detrend(values: &[f64]) -> Vec<f64> {
    let fit = linear_regression(values);
    values
        .iter()
        .enumerate()
        .map(|(i, v)| v - fit.predict(i as f64))
        .collect()
}

/// Percent change from `from` to `to`; 0 when `from` is zero
pub fn percent_change(from: f64, to: f64) -> f64 {
    if from == 0.0 {
        return 0.0;
    }
    (to - from) / from.abs() * 100.0
}

/// Rescale into [0, 1]; a flat series maps to all zeros
pub fn normalize_min_max(values: &[f64]) -> Vec<f64> {
    let lo = min(values);
    let range = max(values) - lo;
    if range == 0.0 {
        return vec![0.0; values.len()];
    }
    values.iter().map(|v| (v - lo) / range).collect()
}

/// Total clamp: NaN maps to `lo`, and swapped bounds are reordered
pub fn clamp(value: f64, lo: f64, hi: f64) -> f64 {
    let (lo, hi) = if lo <= hi { (lo, hi) } else { (hi, lo) };
    if value.is_nan() {
        return lo;
    }
    value.max(lo).min(hi)
}
