//! Least-squares trend lines through same-type extrema

use serde::Serialize;

use super::extrema::PeakTrough;
use crate::math::{fit_line, mean};

/// Slope below `avg_price * FLAT_TOLERANCE` per bar counts as flat
pub const FLAT_TOLERANCE: f64 = 0.001;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TrendLine {
    /// Price change per bar
    pub slope: f64,
    pub intercept: f64,
    pub r_squared: f64,
    /// Mean price of the fitted points
    pub avg_price: f64,
    /// Number of fitted points
    pub points: usize,
    /// Index of the first and last fitted point
    pub first_index: usize,
    pub last_index: usize,
}

impl TrendLine {
    /// Fit over the last `count` points. Needs at least two.
    pub fn fit_last(points: &[PeakTrough], count: usize) -> Option<Self> {
        let start = points.len().saturating_sub(count);
        Self::fit(&points[start..])
    }

    pub fn fit(points: &[PeakTrough]) -> Option<Self> {
        if points.len() < 2 {
            return None;
        }
        let xs: Vec<f64> = points.iter().map(|p| p.index as f64).collect();
        let ys: Vec<f64> = points.iter().map(|p| p.price).collect();
        let line = fit_line(&xs, &ys)?;

        Some(Self {
            slope: line.slope,
            intercept: line.intercept,
            r_squared: line.r_squared,
            avg_price: mean(&ys),
            points: points.len(),
            first_index: points[0].index,
            last_index: points[points.len() - 1].index,
        })
    }

    #[inline]
    pub fn value_at(&self, index: usize) -> f64 {
        self.slope * index as f64 + self.intercept
    }

    #[inline]
    pub fn is_flat(&self, tolerance: f64) -> bool {
        self.slope.abs() < self.avg_price.abs() * tolerance
    }

    #[inline]
    pub fn is_rising(&self, tolerance: f64) -> bool {
        self.slope > 0.0 && !self.is_flat(tolerance)
    }

    #[inline]
    pub fn is_falling(&self, tolerance: f64) -> bool {
        self.slope < 0.0 && !self.is_flat(tolerance)
    }

    /// How many of `points` lie within `tolerance` (relative) of the line
    pub fn touches(&self, points: &[PeakTrough], tolerance: f64) -> usize {
        points
            .iter()
            .filter(|p| {
                let expected = self.value_at(p.index);
                (p.price - expected).abs() <= expected.abs() * tolerance
            })
            .count()
    }
}
