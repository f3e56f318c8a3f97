//! Support/resistance units

use crate::params::Params;
use crate::series::TimeSeries;
use crate::unit::{
    require, Category, ComputationUnit, Priority, UnitError, UnitMetadata, UnitOutput, Value,
};

use super::Outlook;

static PIVOT_META: UnitMetadata = UnitMetadata {
    name: "pivot",
    category: Category::SupportResistance,
    label: "Pivot Points",
    min_observations: 2,
    priority: Priority::P1,
    params: &[],
};

const FIB_LEVELS: [f64; 3] = [0.382, 0.618, 1.0];

/// Standard and Fibonacci floor pivots of the prior bar
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PivotLevels {
    pub p: f64,
    pub r: [f64; 3],
    pub s: [f64; 3],
    pub fib_r: [f64; 3],
    pub fib_s: [f64; 3],
}

impl PivotLevels {
    pub fn from_bar(high: f64, low: f64, close: f64) -> Self {
        let p = (high + low + close) / 3.0;
        let range = high - low;
        Self {
            p,
            r: [2.0 * p - low, p + range, high + 2.0 * (p - low)],
            s: [2.0 * p - high, p - range, low - 2.0 * (high - p)],
            fib_r: FIB_LEVELS.map(|f| p + f * range),
            fib_s: FIB_LEVELS.map(|f| p - f * range),
        }
    }
}

/// Pivot points from the previous bar, classified by where the as-of
/// close sits:
///
/// - above R1: `STRONG_BULLISH`, above P: `BULLISH`
/// - below S1: `STRONG_BEARISH`, below P: `BEARISH`
#[derive(Debug, Clone, Copy, Default)]
pub struct PivotPoints;

impl ComputationUnit for PivotPoints {
    fn metadata(&self) -> &UnitMetadata {
        &PIVOT_META
    }

    fn compute(&self, series: &TimeSeries, _params: &Params) -> Result<UnitOutput, UnitError> {
        require(series, 2)?;
        let n = series.size();
        let prior = n - 2;
        let levels = PivotLevels::from_bar(
            series.high()[prior],
            series.low()[prior],
            series.close()[prior],
        );
        let close = series.close()[n - 1];

        let outlook = match close {
            c if c > levels.r[0] => Outlook::StrongBullish,
            c if c < levels.s[0] => Outlook::StrongBearish,
            c if c > levels.p => Outlook::Bullish,
            c if c < levels.p => Outlook::Bearish,
            _ => Outlook::Neutral,
        };

        let mut out = UnitOutput::new().with("pivot_p", Value::decimal(levels.p));
        for level in 0..3 {
            let rank = level + 1;
            out.set(format!("pivot_r{rank}"), Value::decimal(levels.r[level]));
            out.set(format!("pivot_s{rank}"), Value::decimal(levels.s[level]));
            out.set(format!("pivot_fib_r{rank}"), Value::decimal(levels.fib_r[level]));
            out.set(format!("pivot_fib_s{rank}"), Value::decimal(levels.fib_s[level]));
        }
        out.set("pivot_signal", outlook.value());
        Ok(out)
    }
}
