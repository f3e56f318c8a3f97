//! Trend units: simple and exponential moving averages, linear regression

use crate::math::{ema_series, fit_line, mean, safe_div, sma, tail};
use crate::params::{ParamMeta, Params};
use crate::series::TimeSeries;
use crate::unit::{
    require, Category, ComputationUnit, Priority, UnitError, UnitMetadata, UnitOutput, Value,
};

use super::Outlook;

// ============================================================
// MOVING AVERAGE
// ============================================================

static MA_META: UnitMetadata = UnitMetadata {
    name: "ma",
    category: Category::Trend,
    label: "Moving Averages",
    min_observations: 60,
    priority: Priority::P0,
    params: &[
        ParamMeta::period("p1", 5.0, (2.0, 250.0, 1.0), "Shortest average"),
        ParamMeta::period("p2", 10.0, (2.0, 250.0, 1.0), "Short average"),
        ParamMeta::period("p3", 20.0, (2.0, 250.0, 1.0), "Medium average"),
        ParamMeta::period("p4", 60.0, (2.0, 250.0, 1.0), "Long average"),
    ],
};

/// `ma{p}` for four periods plus `ma_signal`:
///
/// - `STRONG_BULLISH`: averages stacked short > long and close above the shortest
/// - `BULLISH`: close above the medium average and short above short-medium
/// - mirrored for the bearish side, `NEUTRAL` otherwise
#[derive(Debug, Clone, Copy, Default)]
pub struct MovingAverage;

impl ComputationUnit for MovingAverage {
    fn metadata(&self) -> &UnitMetadata {
        &MA_META
    }

    fn compute(&self, series: &TimeSeries, params: &Params) -> Result<UnitOutput, UnitError> {
        let periods = [
            params.period("p1")?,
            params.period("p2")?,
            params.period("p3")?,
            params.period("p4")?,
        ];
        if let Some(pair) = periods.windows(2).find(|pair| pair[0] >= pair[1]) {
            return Err(UnitError::InvalidParam {
                name: "p1..p4".to_string(),
                reason: format!("periods must increase, got {} then {}", pair[0], pair[1]),
            });
        }
        require(series, periods[3])?;

        let closes = series.close();
        let close = closes[closes.len() - 1];
        let mut averages = [0.0; 4];
        let mut out = UnitOutput::new();
        for (slot, period) in averages.iter_mut().zip(periods) {
            *slot = sma(closes, period).unwrap_or(close);
            out.set(format!("ma{period}"), Value::decimal(*slot));
        }

        let [a1, a2, a3, a4] = averages;
        let outlook = if a1 > a2 && a2 > a3 && a3 > a4 && close > a1 {
            Outlook::StrongBullish
        } else if a1 < a2 && a2 < a3 && a3 < a4 && close < a1 {
            Outlook::StrongBearish
        } else if close > a3 && a1 > a2 {
            Outlook::Bullish
        } else if close < a3 && a1 < a2 {
            Outlook::Bearish
        } else {
            Outlook::Neutral
        };
        out.set("ma_signal", outlook.value());
        Ok(out)
    }
}

// ============================================================
// EXPONENTIAL MOVING AVERAGE
// ============================================================

static EMA_META: UnitMetadata = UnitMetadata {
    name: "ema",
    category: Category::Trend,
    label: "Exponential Moving Averages",
    min_observations: 26,
    priority: Priority::P0,
    params: &[
        ParamMeta::period("fast", 12.0, (2.0, 200.0, 1.0), "Fast EMA period"),
        ParamMeta::period("slow", 26.0, (2.0, 200.0, 1.0), "Slow EMA period"),
        ParamMeta::number("weak_pct", 0.5, (0.0, 10.0, 0.1), "Spread % for BULLISH/BEARISH"),
        ParamMeta::number("strong_pct", 2.0, (0.0, 20.0, 0.1), "Spread % for STRONG_*"),
    ],
};

/// `ema{fast}`, `ema{slow}`, `ema_signal` from the fast/slow spread in
/// percent of the slow average
#[derive(Debug, Clone, Copy, Default)]
pub struct ExponentialAverage;

impl ComputationUnit for ExponentialAverage {
    fn metadata(&self) -> &UnitMetadata {
        &EMA_META
    }

    fn compute(&self, series: &TimeSeries, params: &Params) -> Result<UnitOutput, UnitError> {
        let fast = params.period("fast")?;
        let slow = params.period("slow")?;
        require(series, fast.max(slow))?;

        let closes = series.close();
        let fast_ema = ema_series(closes, fast).last().copied().unwrap_or_default();
        let slow_ema = ema_series(closes, slow).last().copied().unwrap_or_default();
        let spread_pct = safe_div(fast_ema - slow_ema, slow_ema) * 100.0;
        let outlook = Outlook::from_thresholds(
            spread_pct,
            params.number("weak_pct")?,
            params.number("strong_pct")?,
        );

        Ok(UnitOutput::new()
            .with(format!("ema{fast}"), Value::decimal(fast_ema))
            .with(format!("ema{slow}"), Value::decimal(slow_ema))
            .with("ema_signal", outlook.value()))
    }
}

// ============================================================
// LINEAR REGRESSION
// ============================================================

static LINREG_META: UnitMetadata = UnitMetadata {
    name: "linear_regression",
    category: Category::Trend,
    label: "Linear Regression",
    min_observations: 20,
    priority: Priority::P1,
    params: &[
        ParamMeta::period("period", 20.0, (5.0, 250.0, 1.0), "Regression window"),
        ParamMeta::ratio("strong_r2", 0.8, (0.0, 1.0, 0.05), "R-squared for STRONG_* labels"),
        ParamMeta::number("strong_pct", 0.3, (0.0, 10.0, 0.05), "Slope % per bar for STRONG_*"),
        ParamMeta::number("weak_pct", 0.05, (0.0, 10.0, 0.01), "Slope % per bar for UP/DOWN"),
    ],
};

/// Least-squares fit of the trailing closes against bar offset.
///
/// `linreg_slope_pct` is the slope in percent of the mean close per bar.
/// Labels: `STRONG_UPTREND` (R² ≥ strong_r2 and slope% ≥ strong_pct),
/// `UPTREND` (slope% > weak_pct), `SIDEWAYS`, `DOWNTREND`,
/// `STRONG_DOWNTREND`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LinearRegression;

impl ComputationUnit for LinearRegression {
    fn metadata(&self) -> &UnitMetadata {
        &LINREG_META
    }

    fn compute(&self, series: &TimeSeries, params: &Params) -> Result<UnitOutput, UnitError> {
        let period = params.period("period")?;
        require(series, period)?;
        let ys = tail(series.close(), period).ok_or(UnitError::InsufficientData {
            need: period,
            got: series.size(),
        })?;
        let xs: Vec<f64> = (0..period).map(|i| i as f64).collect();
        let fit = fit_line(&xs, ys)
            .ok_or_else(|| UnitError::Computation("regression needs two distinct points".into()))?;

        let slope_pct = safe_div(fit.slope, mean(ys)) * 100.0;
        let strong_r2 = params.ratio("strong_r2")?;
        let strong_pct = params.number("strong_pct")?;
        let weak_pct = params.number("weak_pct")?;

        let label = match slope_pct {
            s if fit.r_squared >= strong_r2 && s >= strong_pct => "STRONG_UPTREND",
            s if fit.r_squared >= strong_r2 && s <= -strong_pct => "STRONG_DOWNTREND",
            s if s > weak_pct => "UPTREND",
            s if s < -weak_pct => "DOWNTREND",
            _ => "SIDEWAYS",
        };

        Ok(UnitOutput::new()
            .with("linreg_slope", Value::decimal(fit.slope))
            .with("linreg_intercept", Value::decimal(fit.intercept))
            .with("linreg_r2", Value::decimal(fit.r_squared))
            .with("linreg_slope_pct", Value::decimal(slope_pct))
            .with("linreg_signal", Value::label(label)))
    }
}
