//! Builtin computation units
//!
//! # Catalogue
//!
//! - **Trend**: `ma`, `ema`, `linear_regression`
//! - **Momentum**: `rsi`, `macd`, `qstick`, `bop`, `elder_ray`
//! - **Volatility**: `bollinger`, `donchian`
//! - **Volume**: `cmf`
//! - **Support/resistance**: `pivot`
//! - **Chip**: `institutional_flow`
//! - **Candlestick**: `candle_single`, `candle_double`, `candle_triple`
//!
//! The chart pattern unit lives in [`crate::pattern::chart`].
//!
//! Every formula unit is a pure function of the trailing window: zero
//! denominators produce 0, numeric outputs are rounded to
//! [`crate::math::OUTPUT_DP`] places, and each unit adds one `*_signal`
//! label.

pub mod candles;
pub mod chip;
pub mod momentum;
pub mod support;
pub mod trend;
pub mod volatility;
pub mod volume;

pub use candles::{DoubleCandle, SingleCandle, TripleCandle};
pub use chip::InstitutionalFlow;
pub use momentum::{BalanceOfPower, ElderRay, Macd, Qstick, Rsi};
pub use support::PivotPoints;
pub use trend::{ExponentialAverage, LinearRegression, MovingAverage};
pub use volatility::{Bollinger, Donchian};
pub use volume::ChaikinMoneyFlow;

use crate::unit::Value;

/// Five-level label shared by most units
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outlook {
    StrongBullish,
    Bullish,
    Neutral,
    Bearish,
    StrongBearish,
}

impl Outlook {
    pub fn as_str(self) -> &'static str {
        match self {
            Outlook::StrongBullish => "STRONG_BULLISH",
            Outlook::Bullish => "BULLISH",
            Outlook::Neutral => "NEUTRAL",
            Outlook::Bearish => "BEARISH",
            Outlook::StrongBearish => "STRONG_BEARISH",
        }
    }

    /// Symmetric classification: `>= strong`, `> weak`, `< -weak`,
    /// `<= -strong`.
    pub fn from_thresholds(value: f64, weak: f64, strong: f64) -> Self {
        match value {
            v if v >= strong => Outlook::StrongBullish,
            v if v > weak => Outlook::Bullish,
            v if v <= -strong => Outlook::StrongBearish,
            v if v < -weak => Outlook::Bearish,
            _ => Outlook::Neutral,
        }
    }

    #[inline]
    pub fn value(self) -> Value {
        Value::label(self.as_str())
    }
}
