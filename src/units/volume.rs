//! Volume units

use crate::math::safe_div;
use crate::params::{ParamMeta, Params};
use crate::series::TimeSeries;
use crate::unit::{
    require, Category, ComputationUnit, Priority, UnitError, UnitMetadata, UnitOutput, Value,
};

use super::Outlook;

static CMF_META: UnitMetadata = UnitMetadata {
    name: "cmf",
    category: Category::Volume,
    label: "Chaikin Money Flow",
    min_observations: 20,
    priority: Priority::P1,
    params: &[
        ParamMeta::period("period", 20.0, (2.0, 200.0, 1.0), "Accumulation window"),
        ParamMeta::number("weak", 0.05, (0.0, 1.0, 0.01), "Threshold for BULLISH/BEARISH"),
        ParamMeta::number("strong", 0.25, (0.0, 1.0, 0.01), "Threshold for STRONG_*"),
    ],
};

/// Close location value of one bar, 0 on a zero range
#[inline]
fn money_flow_multiplier(high: f64, low: f64, close: f64) -> f64 {
    safe_div((close - low) - (high - close), high - low)
}

/// Chaikin Money Flow: Σ(CLV · volume) / Σ volume over the window.
///
/// A window without volume yields 0.
#[derive(Debug, Clone, Copy, Default)]
pub struct ChaikinMoneyFlow;

impl ComputationUnit for ChaikinMoneyFlow {
    fn metadata(&self) -> &UnitMetadata {
        &CMF_META
    }

    fn compute(&self, series: &TimeSeries, params: &Params) -> Result<UnitOutput, UnitError> {
        let period = params.period("period")?;
        require(series, period)?;
        let start = series.size() - period;

        let (flow, volume) = (start..series.size()).fold((0.0, 0.0), |(flow, total), i| {
            let vol = series.volume()[i] as f64;
            let mfm = money_flow_multiplier(series.high()[i], series.low()[i], series.close()[i]);
            (flow + mfm * vol, total + vol)
        });
        let cmf = safe_div(flow, volume);
        let outlook =
            Outlook::from_thresholds(cmf, params.number("weak")?, params.number("strong")?);

        Ok(UnitOutput::new()
            .with("cmf", Value::decimal(cmf))
            .with("cmf_signal", outlook.value()))
    }
}
