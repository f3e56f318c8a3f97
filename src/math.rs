//! Numeric helpers shared by the formula units and the pattern pipeline.
//!
//! Everything here is a pure function over slices. Windows are trailing:
//! "the last `period` values".

use rust_decimal::{Decimal, RoundingStrategy};

/// Decimal places of every numeric output
pub const OUTPUT_DP: u32 = 4;

/// Round a float to [`OUTPUT_DP`] places (half away from zero). NaN and
/// infinities become 0.
pub fn to_decimal(value: f64) -> Decimal {
    if !value.is_finite() {
        return Decimal::ZERO;
    }
    Decimal::from_f64_retain(value)
        .map(|d| d.round_dp_with_strategy(OUTPUT_DP, RoundingStrategy::MidpointAwayFromZero))
        .unwrap_or(Decimal::ZERO)
}

/// `numerator / denominator`, or 0 when the denominator is ~0
#[inline]
pub fn safe_div(numerator: f64, denominator: f64) -> f64 {
    if denominator.abs() <= f64::EPSILON {
        0.0
    } else {
        numerator / denominator
    }
}

#[inline]
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// The last `period` values, or None when there are not enough
#[inline]
pub fn tail(values: &[f64], period: usize) -> Option<&[f64]> {
    (period > 0 && values.len() >= period).then(|| &values[values.len() - period..])
}

/// Simple moving average over the last `period` values
pub fn sma(values: &[f64], period: usize) -> Option<f64> {
    tail(values, period).map(mean)
}

/// Population standard deviation
pub fn std_dev(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let m = mean(values);
    let var = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / values.len() as f64;
    var.sqrt()
}

/// Exponential moving average series, seeded with the SMA of the first
/// `period` values. Element `k` of the output corresponds to input index
/// `k + period - 1`; the output is empty when there are fewer than
/// `period` inputs.
pub fn ema_series(values: &[f64], period: usize) -> Vec<f64> {
    if period == 0 || values.len() < period {
        return Vec::new();
    }
    let alpha = 2.0 / (period as f64 + 1.0);
    let mut out = Vec::with_capacity(values.len() - period + 1);
    let mut current = mean(&values[..period]);
    out.push(current);
    for v in &values[period..] {
        current = alpha * v + (1.0 - alpha) * current;
        out.push(current);
    }
    out
}

pub fn max_of(values: &[f64]) -> f64 {
    values.iter().copied().fold(f64::NEG_INFINITY, f64::max)
}

pub fn min_of(values: &[f64]) -> f64 {
    values.iter().copied().fold(f64::INFINITY, f64::min)
}

// ============================================================
// LEAST SQUARES
// ============================================================

/// Ordinary least-squares line `y = slope * x + intercept`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineFit {
    pub slope: f64,
    pub intercept: f64,
    /// `1 - SS_res / SS_tot`; 1.0 for a perfect fit, including a
    /// perfectly horizontal one where `SS_tot` is 0
    pub r_squared: f64,
}

impl LineFit {
    #[inline]
    pub fn value_at(&self, x: f64) -> f64 {
        self.slope * x + self.intercept
    }
}

/// Fit a line through `(xs[i], ys[i])`. Needs at least two points with
/// distinct x values.
pub fn fit_line(xs: &[f64], ys: &[f64]) -> Option<LineFit> {
    let n = xs.len().min(ys.len());
    if n < 2 {
        return None;
    }
    let (xs, ys) = (&xs[..n], &ys[..n]);
    let mean_x = mean(xs);
    let mean_y = mean(ys);

    let (sxy, sxx) = xs
        .iter()
        .zip(ys)
        .fold((0.0, 0.0), |(sxy, sxx), (x, y)| {
            (sxy + (x - mean_x) * (y - mean_y), sxx + (x - mean_x).powi(2))
        });
    if sxx <= f64::EPSILON {
        return None;
    }

    let slope = sxy / sxx;
    let intercept = mean_y - slope * mean_x;

    let (ss_res, ss_tot) = xs
        .iter()
        .zip(ys)
        .fold((0.0, 0.0), |(res, tot), (x, y)| {
            let predicted = slope * x + intercept;
            (res + (y - predicted).powi(2), tot + (y - mean_y).powi(2))
        });

    let scale = mean_y.abs().max(1.0);
    let r_squared = if ss_tot <= f64::EPSILON * scale * scale {
        if ss_res <= f64::EPSILON * scale * scale {
            1.0
        } else {
            0.0
        }
    } else {
        (1.0 - ss_res / ss_tot).clamp(0.0, 1.0)
    };

    Some(LineFit {
        slope,
        intercept,
        r_squared,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_to_decimal() {
        assert_eq!(to_decimal(120.0), dec!(120));
        assert_eq!(to_decimal(0.123_45), dec!(0.1235));
        assert_eq!(to_decimal(-0.123_45), dec!(-0.1235));
        assert_eq!(to_decimal(f64::INFINITY), Decimal::ZERO);
    }

    #[test]
    fn test_safe_div() {
        assert_eq!(safe_div(1.0, 0.0), 0.0);
        assert_eq!(safe_div(1.0, 4.0), 0.25);
    }

    #[test]
    fn test_sma_and_tail() {
        let values = [1.0, 2.0, 3.0, 4.0, 5.0];
        assert_eq!(sma(&values, 2), Some(4.5));
        assert_eq!(sma(&values, 5), Some(3.0));
        assert_eq!(sma(&values, 6), None);
        assert_eq!(sma(&values, 0), None);
    }

    #[test]
    fn test_std_dev() {
        assert_eq!(std_dev(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]), 2.0);
        assert_eq!(std_dev(&[]), 0.0);
    }

    #[test]
    fn test_ema_series_seed_and_length() {
        let values: Vec<f64> = (1..=10).map(f64::from).collect();
        let ema = ema_series(&values, 3);
        assert_eq!(ema.len(), 8);
        assert_eq!(ema[0], 2.0);
        // alpha = 0.5
        assert_eq!(ema[1], 3.0);
        assert!(ema_series(&values, 11).is_empty());
    }

    #[test]
    fn test_fit_line_perfect() {
        let xs: Vec<f64> = (0..10).map(f64::from).collect();
        let ys: Vec<f64> = xs.iter().map(|x| 2.0 * x + 1.0).collect();
        let fit = fit_line(&xs, &ys).unwrap();
        assert!((fit.slope - 2.0).abs() < 1e-9);
        assert!((fit.intercept - 1.0).abs() < 1e-9);
        assert!((fit.r_squared - 1.0).abs() < 1e-9);
        assert!((fit.value_at(20.0) - 41.0).abs() < 1e-9);
    }

    #[test]
    fn test_fit_line_flat_and_degenerate() {
        let fit = fit_line(&[0.0, 1.0, 2.0], &[5.0, 5.0, 5.0]).unwrap();
        assert_eq!(fit.slope, 0.0);
        assert_eq!(fit.r_squared, 1.0);
        assert!(fit_line(&[1.0], &[1.0]).is_none());
        assert!(fit_line(&[1.0, 1.0], &[1.0, 2.0]).is_none());
    }

    #[test]
    fn test_fit_line_noisy_r_squared() {
        let xs = [0.0, 1.0, 2.0, 3.0];
        let ys = [1.0, 3.0, 2.0, 4.0];
        let fit = fit_line(&xs, &ys).unwrap();
        assert!(fit.r_squared > 0.5 && fit.r_squared < 1.0);
    }
}
