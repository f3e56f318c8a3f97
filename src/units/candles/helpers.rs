//! Shape thresholds shared by the candlestick detectors
//!
//! Bodies and shadows are judged against the trailing averages held in a
//! [`CandleContext`]. A flat history (zero averages) falls back to ratios
//! of the bar's own range.

use super::CandleContext;
use crate::series::Bar;
use crate::OHLCVExt;

/// Doji body, as a share of the average range
pub const DOJI_FACTOR: f64 = 0.1;
/// Short body is below the average body times this
pub const BODY_SHORT_FACTOR: f64 = 1.0;
/// Long body is above the average body times this
pub const BODY_LONG_FACTOR: f64 = 1.0;
/// Dominant shadow exceeds the bar's own body times this
pub const SHADOW_VERYLONG_FACTOR: f64 = 2.0;
/// Negligible shadow, as a share of the average range
pub const SHADOW_VERYSHORT_FACTOR: f64 = 0.1;
/// Price tolerance for tweezers, as a share of the average range
pub const EQUAL_FACTOR: f64 = 0.05;
/// Star close must recover this share of the first body
pub const STAR_PENETRATION: f64 = 0.3;

/// Range-relative cutoffs used when the averages are zero
mod flat {
    pub const DOJI: f64 = 0.1;
    pub const SHORT_BODY: f64 = 0.3;
    pub const LONG_BODY: f64 = 0.7;
    pub const TINY_SHADOW: f64 = 0.1;
}

/// `value / range`, `None` for a zero range
#[inline]
fn share(value: f64, range: f64) -> Option<f64> {
    (range > 0.0).then(|| value / range)
}

impl CandleContext {
    /// A zero body is always a doji
    pub fn is_doji(&self, bar: &Bar) -> bool {
        let body = bar.body();
        if body <= 0.0 {
            return true;
        }
        if self.avg_range > 0.0 {
            body <= self.avg_range * DOJI_FACTOR
        } else {
            share(body, bar.range()).is_some_and(|s| s <= flat::DOJI)
        }
    }

    pub fn short_body(&self, bar: &Bar) -> bool {
        if self.avg_body > 0.0 {
            bar.body() < self.avg_body * BODY_SHORT_FACTOR
        } else {
            share(bar.body(), bar.range()).is_some_and(|s| s <= flat::SHORT_BODY)
        }
    }

    pub fn long_body(&self, bar: &Bar) -> bool {
        if self.avg_body > 0.0 {
            bar.body() > self.avg_body * BODY_LONG_FACTOR
        } else {
            share(bar.body(), bar.range()).is_some_and(|s| s >= flat::LONG_BODY)
        }
    }

    /// `shadow` belongs to `bar`
    pub fn tiny_shadow(&self, shadow: f64, bar: &Bar) -> bool {
        if self.avg_range > 0.0 {
            shadow < self.avg_range * SHADOW_VERYSHORT_FACTOR
        } else {
            share(shadow, bar.range()).is_some_and(|s| s <= flat::TINY_SHADOW)
        }
    }

    pub fn same_price(&self, a: f64, b: f64) -> bool {
        (a - b).abs() <= self.avg_range * EQUAL_FACTOR
    }
}

/// Measured against the bar's own body, so any shadow beats a zero body
#[inline]
pub fn dominant_shadow(shadow: f64, bar: &Bar) -> bool {
    shadow > bar.body() * SHADOW_VERYLONG_FACTOR
}
