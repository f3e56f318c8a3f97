//! Chip units: institutional investor flows from auxiliary columns

use crate::math::safe_div;
use crate::params::{ParamMeta, Params};
use crate::series::TimeSeries;
use crate::unit::{
    require, Category, ComputationUnit, Priority, UnitError, UnitMetadata, UnitOutput, Value,
};

use super::Outlook;

/// Auxiliary columns read by [`InstitutionalFlow`], in output order
pub const FLOW_COLUMNS: [&str; 3] = ["foreign_net", "trust_net", "dealer_net"];

static FLOW_META: UnitMetadata = UnitMetadata {
    name: "institutional_flow",
    category: Category::Chip,
    label: "Institutional Flow",
    min_observations: 20,
    priority: Priority::P1,
    params: &[
        ParamMeta::period("short", 5.0, (1.0, 60.0, 1.0), "Short accumulation window"),
        ParamMeta::period("long", 20.0, (1.0, 250.0, 1.0), "Long accumulation window"),
        ParamMeta::ratio("weak", 0.02, (0.0, 1.0, 0.01), "Net/volume ratio for BULLISH/BEARISH"),
        ParamMeta::ratio("strong", 0.1, (0.0, 1.0, 0.01), "Net/volume ratio for STRONG_*"),
    ],
};

/// Signed length of the run of same-signed values ending at the last
/// element. Positive for buying runs, negative for selling runs, 0 when
/// the last value is flat.
pub fn streak(values: &[f64]) -> i64 {
    let Some(&last) = values.last() else {
        return 0;
    };
    if last == 0.0 {
        return 0;
    }
    let run = values
        .iter()
        .rev()
        .take_while(|v| v.signum() == last.signum() && **v != 0.0)
        .count() as i64;
    if last > 0.0 {
        run
    } else {
        -run
    }
}

/// Per-column sums over the short and long windows and the current
/// streak, plus the combined short-window net.
///
/// `institutional_signal` classifies the combined net as a fraction of
/// the traded volume over the same window. Without any flow column the
/// unit is skipped.
#[derive(Debug, Clone, Copy, Default)]
pub struct InstitutionalFlow;

impl ComputationUnit for InstitutionalFlow {
    fn metadata(&self) -> &UnitMetadata {
        &FLOW_META
    }

    fn compute(&self, series: &TimeSeries, params: &Params) -> Result<UnitOutput, UnitError> {
        let short = params.period("short")?;
        let long = params.period("long")?;
        if short >= long {
            return Err(UnitError::InvalidParam {
                name: "short".to_string(),
                reason: format!("short window {short} must be below long window {long}"),
            });
        }
        require(series, long)?;

        let columns: Vec<(&str, &[f64])> = FLOW_COLUMNS
            .iter()
            .filter_map(|name| series.aux(name).map(|values| (*name, values)))
            .collect();
        if columns.is_empty() {
            return Err(UnitError::MissingSeries(FLOW_COLUMNS.join("|")));
        }

        let n = series.size();
        let mut out = UnitOutput::new();
        let mut net_short = 0.0;
        for (name, values) in &columns {
            let sum_short: f64 = values[n - short..].iter().sum();
            let sum_long: f64 = values[n - long..].iter().sum();
            net_short += sum_short;
            out.set(format!("{name}_sum_{short}"), Value::decimal(sum_short));
            out.set(format!("{name}_sum_{long}"), Value::decimal(sum_long));
            out.set(format!("{name}_streak"), Value::Integer(streak(values)));
        }

        let traded: f64 = series.volume()[n - short..].iter().map(|v| *v as f64).sum();
        let ratio = safe_div(net_short, traded);
        let outlook =
            Outlook::from_thresholds(ratio, params.ratio("weak")?, params.ratio("strong")?);

        out.set(format!("institutional_net_{short}"), Value::decimal(net_short));
        out.set("institutional_signal", outlook.value());
        Ok(out)
    }
}
