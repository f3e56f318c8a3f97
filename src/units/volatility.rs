//! Volatility units: Bollinger bands and the Donchian channel

use crate::math::{max_of, mean, min_of, safe_div, std_dev, tail};
use crate::params::{ParamMeta, Params};
use crate::series::TimeSeries;
use crate::unit::{
    require, Category, ComputationUnit, Priority, UnitError, UnitMetadata, UnitOutput, Value,
};

use super::Outlook;

// ============================================================
// BOLLINGER
// ============================================================

static BOLLINGER_META: UnitMetadata = UnitMetadata {
    name: "bollinger",
    category: Category::Volatility,
    label: "Bollinger Bands",
    min_observations: 20,
    priority: Priority::P0,
    params: &[
        ParamMeta::period("period", 20.0, (2.0, 200.0, 1.0), "Rolling window"),
        ParamMeta::number("k", 2.0, (0.5, 5.0, 0.1), "Band width in standard deviations"),
    ],
};

/// Rolling mean ± k · population standard deviation of the closes.
///
/// `boll_width` = (upper − lower) / middle, `boll_percent_b` =
/// (close − lower) / (upper − lower). Labels by %B: ≥ 1 `STRONG_BULLISH`,
/// ≥ 0.8 `BULLISH`, ≤ 0 `STRONG_BEARISH`, ≤ 0.2 `BEARISH`. Zero-width bands
/// are `NEUTRAL`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Bollinger;

impl ComputationUnit for Bollinger {
    fn metadata(&self) -> &UnitMetadata {
        &BOLLINGER_META
    }

    fn compute(&self, series: &TimeSeries, params: &Params) -> Result<UnitOutput, UnitError> {
        let period = params.period("period")?;
        let k = params.number("k")?;
        require(series, period)?;

        let window = tail(series.close(), period).ok_or(UnitError::InsufficientData {
            need: period,
            got: series.size(),
        })?;
        let close = window[window.len() - 1];
        let middle = mean(window);
        let sd = std_dev(window);
        let upper = middle + k * sd;
        let lower = middle - k * sd;
        let width = safe_div(upper - lower, middle);
        let percent_b = safe_div(close - lower, upper - lower);

        let outlook = if upper - lower <= f64::EPSILON {
            Outlook::Neutral
        } else {
            match percent_b {
                b if b >= 1.0 => Outlook::StrongBullish,
                b if b >= 0.8 => Outlook::Bullish,
                b if b <= 0.0 => Outlook::StrongBearish,
                b if b <= 0.2 => Outlook::Bearish,
                _ => Outlook::Neutral,
            }
        };

        Ok(UnitOutput::new()
            .with("boll_upper", Value::decimal(upper))
            .with("boll_middle", Value::decimal(middle))
            .with("boll_lower", Value::decimal(lower))
            .with("boll_width", Value::decimal(width))
            .with("boll_percent_b", Value::decimal(percent_b))
            .with("boll_signal", outlook.value()))
    }
}

// ============================================================
// DONCHIAN
// ============================================================

static DONCHIAN_META: UnitMetadata = UnitMetadata {
    name: "donchian",
    category: Category::Volatility,
    label: "Donchian Channel",
    min_observations: 20,
    priority: Priority::P1,
    params: &[ParamMeta::period("period", 20.0, (2.0, 250.0, 1.0), "Channel window, current bar included")],
};

/// Highest high / lowest low of the trailing window (current bar
/// included). A close at the upper or lower edge is a breakout
/// (`STRONG_*`), otherwise the side of the midline decides.
#[derive(Debug, Clone, Copy, Default)]
pub struct Donchian;

impl ComputationUnit for Donchian {
    fn metadata(&self) -> &UnitMetadata {
        &DONCHIAN_META
    }

    fn compute(&self, series: &TimeSeries, params: &Params) -> Result<UnitOutput, UnitError> {
        let period = params.period("period")?;
        require(series, period)?;
        let start = series.size() - period;
        let upper = max_of(&series.high()[start..]);
        let lower = min_of(&series.low()[start..]);
        let middle = (upper + lower) / 2.0;
        let width = safe_div(upper - lower, middle);
        let close = series.close()[series.size() - 1];

        let outlook = match close {
            c if c >= upper => Outlook::StrongBullish,
            c if c <= lower => Outlook::StrongBearish,
            c if c > middle => Outlook::Bullish,
            c if c < middle => Outlook::Bearish,
            _ => Outlook::Neutral,
        };

        Ok(UnitOutput::new()
            .with("donchian_upper", Value::decimal(upper))
            .with("donchian_middle", Value::decimal(middle))
            .with("donchian_lower", Value::decimal(lower))
            .with("donchian_width", Value::decimal(width))
            .with("donchian_signal", outlook.value()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_bollinger_flat_series() {
        let flat = vec![100.0; 20];
        let series =
            TimeSeries::new("T", flat.clone(), flat.clone(), flat.clone(), flat, vec![1; 20]).unwrap();
        let out = Bollinger.compute(&series, &BOLLINGER_META.defaults()).unwrap();
        assert_eq!(out.values["boll_upper"].as_decimal(), Some(dec!(100)));
        assert_eq!(out.values["boll_lower"].as_decimal(), Some(dec!(100)));
        assert_eq!(out.values["boll_percent_b"].as_decimal(), Some(dec!(0)));
        assert_eq!(out.values["boll_signal"].as_label(), Some("NEUTRAL"));
    }

    #[test]
    fn test_bollinger_breakout() {
        let mut closes = vec![100.0; 19];
        closes.push(110.0);
        let series = TimeSeries::new(
            "T",
            closes.clone(),
            closes.iter().map(|c| c + 1.0).collect(),
            closes.iter().map(|c| c - 1.0).collect(),
            closes,
            vec![1; 20],
        )
        .unwrap();
        let out = Bollinger.compute(&series, &BOLLINGER_META.defaults()).unwrap();
        let middle = out.values["boll_middle"].as_f64().unwrap();
        assert!((middle - 100.5).abs() < 1e-9);
        // upper band is about 104.86
        assert_eq!(out.values["boll_signal"].as_label(), Some("STRONG_BULLISH"));
    }

    #[test]
    fn test_donchian_known_channel() {
        let n = 20;
        let mut high = vec![110.0; n];
        let mut low = vec![90.0; n];
        high[7] = 120.0;
        low[12] = 80.0;
        let close = vec![100.0; n];
        let series = TimeSeries::new("T", close.clone(), high, low, close, vec![1; n]).unwrap();
        let out = Donchian.compute(&series, &DONCHIAN_META.defaults()).unwrap();
        assert_eq!(out.values["donchian_upper"].as_decimal(), Some(dec!(120)));
        assert_eq!(out.values["donchian_lower"].as_decimal(), Some(dec!(80)));
        assert_eq!(out.values["donchian_middle"].as_decimal(), Some(dec!(100)));
        assert_eq!(out.values["donchian_signal"].as_label(), Some("NEUTRAL"));
    }

    #[test]
    fn test_donchian_includes_current_bar() {
        let n = 20;
        let mut high = vec![101.0; n];
        high[n - 1] = 130.0;
        let mut close = vec![100.0; n];
        close[n - 1] = 130.0;
        let series =
            TimeSeries::new("T", close.clone(), high, vec![99.0; n], close, vec![1; n]).unwrap();
        let out = Donchian.compute(&series, &DONCHIAN_META.defaults()).unwrap();
        assert_eq!(out.values["donchian_upper"].as_decimal(), Some(dec!(130)));
        assert_eq!(out.values["donchian_signal"].as_label(), Some("STRONG_BULLISH"));
    }
}
