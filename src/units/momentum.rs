//! Momentum units: RSI, MACD, Qstick, Balance of Power, Elder-Ray

use crate::math::{ema_series, mean, safe_div};
use crate::params::{ParamMeta, Params};
use crate::series::TimeSeries;
use crate::unit::{
    require, Category, ComputationUnit, Priority, UnitError, UnitMetadata, UnitOutput, Value,
};

use super::Outlook;

// ============================================================
// RSI
// ============================================================

static RSI_META: UnitMetadata = UnitMetadata {
    name: "rsi",
    category: Category::Momentum,
    label: "Relative Strength Index",
    min_observations: 15,
    priority: Priority::P0,
    params: &[
        ParamMeta::period("period", 14.0, (2.0, 100.0, 1.0), "Smoothing period"),
        ParamMeta::number("overbought", 70.0, (50.0, 100.0, 1.0), "OVERBOUGHT at or above"),
        ParamMeta::number("bullish", 55.0, (50.0, 100.0, 1.0), "BULLISH at or above"),
        ParamMeta::number("bearish", 45.0, (0.0, 50.0, 1.0), "BEARISH at or below"),
        ParamMeta::number("oversold", 30.0, (0.0, 50.0, 1.0), "OVERSOLD at or below"),
    ],
};

/// Wilder RSI. Seeded with the plain average gain/loss of the first
/// `period` changes, then smoothed as `(avg * (period - 1) + x) / period`.
///
/// No losses gives 100 (or 50 when there are no gains either).
pub fn wilder_rsi(closes: &[f64], period: usize) -> Option<f64> {
    if period == 0 || closes.len() <= period {
        return None;
    }
    let changes: Vec<f64> = closes.windows(2).map(|w| w[1] - w[0]).collect();
    let (seed, rest) = changes.split_at(period);

    let p = period as f64;
    let mut avg_gain = seed.iter().map(|c| c.max(0.0)).sum::<f64>() / p;
    let mut avg_loss = seed.iter().map(|c| (-c).max(0.0)).sum::<f64>() / p;
    for change in rest {
        avg_gain = (avg_gain * (p - 1.0) + change.max(0.0)) / p;
        avg_loss = (avg_loss * (p - 1.0) + (-change).max(0.0)) / p;
    }

    if avg_loss <= f64::EPSILON {
        return Some(if avg_gain <= f64::EPSILON { 50.0 } else { 100.0 });
    }
    Some(100.0 - 100.0 / (1.0 + avg_gain / avg_loss))
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Rsi;

impl ComputationUnit for Rsi {
    fn metadata(&self) -> &UnitMetadata {
        &RSI_META
    }

    fn compute(&self, series: &TimeSeries, params: &Params) -> Result<UnitOutput, UnitError> {
        let period = params.period("period")?;
        require(series, period + 1)?;
        let rsi = wilder_rsi(series.close(), period).unwrap_or(50.0);

        let overbought = params.number("overbought")?;
        let oversold = params.number("oversold")?;
        let bullish = params.number("bullish")?;
        let bearish = params.number("bearish")?;

        let label = match rsi {
            r if r >= overbought => "OVERBOUGHT",
            r if r <= oversold => "OVERSOLD",
            r if r >= bullish => "BULLISH",
            r if r <= bearish => "BEARISH",
            _ => "NEUTRAL",
        };

        Ok(UnitOutput::new()
            .with(format!("rsi_{period}"), Value::decimal(rsi))
            .with("rsi_signal", Value::label(label)))
    }
}

// ============================================================
// MACD
// ============================================================

static MACD_META: UnitMetadata = UnitMetadata {
    name: "macd",
    category: Category::Momentum,
    label: "MACD",
    min_observations: 35,
    priority: Priority::P0,
    params: &[
        ParamMeta::period("fast", 12.0, (2.0, 100.0, 1.0), "Fast EMA period"),
        ParamMeta::period("slow", 26.0, (3.0, 200.0, 1.0), "Slow EMA period"),
        ParamMeta::period("signal", 9.0, (2.0, 50.0, 1.0), "Signal line period"),
    ],
};

/// DIF = EMA(fast) − EMA(slow), DEA = EMA(DIF, signal), histogram = DIF − DEA.
///
/// `GOLDEN_CROSS` / `DEATH_CROSS` when DIF crossed DEA on the last bar,
/// otherwise `BULLISH` / `BEARISH` by the side DIF is on.
#[derive(Debug, Clone, Copy, Default)]
pub struct Macd;

impl ComputationUnit for Macd {
    fn metadata(&self) -> &UnitMetadata {
        &MACD_META
    }

    fn compute(&self, series: &TimeSeries, params: &Params) -> Result<UnitOutput, UnitError> {
        let fast = params.period("fast")?;
        let slow = params.period("slow")?;
        let signal = params.period("signal")?;
        if fast >= slow {
            return Err(UnitError::InvalidParam {
                name: "fast".to_string(),
                reason: format!("fast period {fast} must be below slow period {slow}"),
            });
        }
        require(series, slow + signal)?;

        let closes = series.close();
        let fast_ema = ema_series(closes, fast);
        let slow_ema = ema_series(closes, slow);
        // fast_ema[k] is close index k + fast - 1; align on the slow series
        let offset = slow - fast;
        let dif: Vec<f64> = slow_ema
            .iter()
            .enumerate()
            .map(|(k, s)| fast_ema[k + offset] - s)
            .collect();
        let dea = ema_series(&dif, signal);

        let (dif_now, dif_prev) = last_two(&dif)?;
        let (dea_now, dea_prev) = last_two(&dea)?;
        let hist = dif_now - dea_now;

        let label = if dif_prev <= dea_prev && dif_now > dea_now {
            "GOLDEN_CROSS"
        } else if dif_prev >= dea_prev && dif_now < dea_now {
            "DEATH_CROSS"
        } else if dif_now > dea_now {
            "BULLISH"
        } else if dif_now < dea_now {
            "BEARISH"
        } else {
            "NEUTRAL"
        };

        Ok(UnitOutput::new()
            .with("macd_dif", Value::decimal(dif_now))
            .with("macd_dea", Value::decimal(dea_now))
            .with("macd_hist", Value::decimal(hist))
            .with("macd_signal", Value::label(label)))
    }
}

fn last_two(values: &[f64]) -> Result<(f64, f64), UnitError> {
    match values {
        [.., prev, now] => Ok((*now, *prev)),
        _ => Err(UnitError::InsufficientData {
            need: 2,
            got: values.len(),
        }),
    }
}

// ============================================================
// QSTICK
// ============================================================

static QSTICK_META: UnitMetadata = UnitMetadata {
    name: "qstick",
    category: Category::Momentum,
    label: "Qstick",
    min_observations: 14,
    priority: Priority::P1,
    params: &[
        ParamMeta::period("period", 14.0, (2.0, 100.0, 1.0), "Averaging window"),
        ParamMeta::number("weak_pct", 0.1, (0.0, 10.0, 0.05), "Qstick % of price for BULLISH/BEARISH"),
        ParamMeta::number("strong_pct", 0.5, (0.0, 10.0, 0.05), "Qstick % of price for STRONG_*"),
    ],
};

/// mean(close − open) over the window; labelled by its size relative to the
/// mean close
#[derive(Debug, Clone, Copy, Default)]
pub struct Qstick;

impl ComputationUnit for Qstick {
    fn metadata(&self) -> &UnitMetadata {
        &QSTICK_META
    }

    fn compute(&self, series: &TimeSeries, params: &Params) -> Result<UnitOutput, UnitError> {
        let period = params.period("period")?;
        require(series, period)?;
        let start = series.size() - period;
        let bodies: Vec<f64> = series.close()[start..]
            .iter()
            .zip(&series.open()[start..])
            .map(|(c, o)| c - o)
            .collect();
        let qstick = mean(&bodies);
        let pct = safe_div(qstick, mean(&series.close()[start..])) * 100.0;
        let outlook = Outlook::from_thresholds(
            pct,
            params.number("weak_pct")?,
            params.number("strong_pct")?,
        );

        Ok(UnitOutput::new()
            .with("qstick", Value::decimal(qstick))
            .with("qstick_signal", outlook.value()))
    }
}

// ============================================================
// BALANCE OF POWER
// ============================================================

static BOP_META: UnitMetadata = UnitMetadata {
    name: "bop",
    category: Category::Momentum,
    label: "Balance of Power",
    min_observations: 14,
    priority: Priority::P1,
    params: &[
        ParamMeta::period("period", 14.0, (1.0, 100.0, 1.0), "Averaging window"),
        ParamMeta::ratio("weak", 0.1, (0.0, 1.0, 0.05), "BULLISH/BEARISH beyond"),
        ParamMeta::ratio("strong", 0.3, (0.0, 1.0, 0.05), "STRONG_* at or beyond"),
    ],
};

/// mean((close − open) / (high − low)); a zero-range bar contributes 0
#[derive(Debug, Clone, Copy, Default)]
pub struct BalanceOfPower;

impl ComputationUnit for BalanceOfPower {
    fn metadata(&self) -> &UnitMetadata {
        &BOP_META
    }

    fn compute(&self, series: &TimeSeries, params: &Params) -> Result<UnitOutput, UnitError> {
        let period = params.period("period")?;
        require(series, period)?;
        let start = series.size() - period;
        let ratios: Vec<f64> = (start..series.size())
            .map(|i| {
                safe_div(
                    series.close()[i] - series.open()[i],
                    series.high()[i] - series.low()[i],
                )
            })
            .collect();
        let bop = mean(&ratios);
        let outlook =
            Outlook::from_thresholds(bop, params.ratio("weak")?, params.ratio("strong")?);

        Ok(UnitOutput::new()
            .with("bop", Value::decimal(bop))
            .with("bop_signal", outlook.value()))
    }
}

// ============================================================
// ELDER-RAY
// ============================================================

static ELDER_META: UnitMetadata = UnitMetadata {
    name: "elder_ray",
    category: Category::Momentum,
    label: "Elder-Ray Index",
    min_observations: 13,
    priority: Priority::P1,
    params: &[ParamMeta::period("period", 13.0, (2.0, 100.0, 1.0), "EMA period")],
};

/// Bull power = high − EMA, bear power = low − EMA, on the last bar.
///
/// Whole bar above the EMA is `STRONG_BULLISH`, whole bar below is
/// `STRONG_BEARISH`; otherwise the sign of bull + bear power decides.
#[derive(Debug, Clone, Copy, Default)]
pub struct ElderRay;

impl ComputationUnit for ElderRay {
    fn metadata(&self) -> &UnitMetadata {
        &ELDER_META
    }

    fn compute(&self, series: &TimeSeries, params: &Params) -> Result<UnitOutput, UnitError> {
        let period = params.period("period")?;
        require(series, period)?;
        let ema = ema_series(series.close(), period)
            .last()
            .copied()
            .ok_or(UnitError::InsufficientData {
                need: period,
                got: series.size(),
            })?;
        let last = series.size() - 1;
        let bull = series.high()[last] - ema;
        let bear = series.low()[last] - ema;

        let outlook = if bear > 0.0 {
            Outlook::StrongBullish
        } else if bull < 0.0 {
            Outlook::StrongBearish
        } else if bull + bear > 0.0 {
            Outlook::Bullish
        } else if bull + bear < 0.0 {
            Outlook::Bearish
        } else {
            Outlook::Neutral
        };

        Ok(UnitOutput::new()
            .with("elder_ema", Value::decimal(ema))
            .with("elder_bull_power", Value::decimal(bull))
            .with("elder_bear_power", Value::decimal(bear))
            .with("elder_signal", outlook.value()))
    }
}
