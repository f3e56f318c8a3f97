//! # YAFE - Yet Another Factor Engine
//!
//! Computes market-analysis factors (technical indicators, candlestick and
//! chart patterns, institutional flow metrics) from per-symbol historical
//! series through a registry of independent computation units.
//!
//! ## Quick Start
//!
//! ```rust
//! use yafe::prelude::*;
//!
//! let closes: Vec<f64> = (0..80).map(|i| 100.0 + i as f64).collect();
//! let series = TimeSeries::new(
//!     "2330",
//!     closes.iter().map(|c| c - 0.5).collect(),
//!     closes.iter().map(|c| c + 1.0).collect(),
//!     closes.iter().map(|c| c - 1.0).collect(),
//!     closes.clone(),
//!     vec![1_000; closes.len()],
//! )
//! .unwrap();
//!
//! let engine = EngineBuilder::new().with_all_defaults().build().unwrap();
//! let (result, diagnostics) = engine.run(&series, &Plan::all()).unwrap();
//!
//! assert!(result.get("ma5").is_some());
//! assert_eq!(diagnostics.succeeded + diagnostics.failed, diagnostics.total);
//! ```

pub mod engine;
pub mod math;
pub mod params;
pub mod pattern;
pub mod plan;
pub mod registry;
pub mod result;
pub mod series;
pub mod unit;
pub mod units;

pub mod prelude {
    pub use crate::{
        // Engine
        engine::{BatchError, BatchItem, Engine, EngineBuilder, EngineConfig},
        // Parameters
        params::{ParamMeta, ParamType, Params},
        // Patterns
        pattern::{
            DetectedPattern, Direction, KeyLevels, PatternCategory, PatternId, Signal,
        },
        plan::Plan,
        registry::Registry,
        result::{AnalysisResult, DiagnosticEntry, Diagnostics, Severity, UnitResult},
        series::{Bar, TimeSeries},
        unit::{Category, ComputationUnit, Priority, UnitError, UnitMetadata, UnitOutput, Value},
        // Errors
        EngineError,
        // Core traits
        OHLCVExt,
        Period,
        Ratio,
        Result,
        OHLCV,
    };
}

// ============================================================
// ERRORS
// ============================================================

pub type Result<T> = std::result::Result<T, EngineError>;

/// Configuration errors. These abort a call; failures inside a single unit
/// never surface here, only in [`result::Diagnostics`].
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EngineError {
    #[error("Invalid value: {0}")]
    InvalidValue(&'static str),

    #[error("{field} = {value} out of range [{min}, {max}]")]
    OutOfRange {
        field: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    #[error("Empty series for symbol '{symbol}'")]
    EmptySeries { symbol: String },

    #[error("Series field '{field}' has {got} observations, expected {expected}")]
    LengthMismatch {
        field: String,
        expected: usize,
        got: usize,
    },

    #[error("Unit '{0}' is already registered")]
    DuplicateUnit(String),

    #[error("Unit '{0}' is not registered")]
    UnknownUnit(String),

    #[error("Invalid OHLCV at index {index}: {reason}")]
    InvalidOHLCV { index: usize, reason: &'static str },
}

// ============================================================
// VALIDATED TYPES
// ============================================================

/// Value in 0.0..=1.0, used for fractional thresholds
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, serde::Serialize, serde::Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct Ratio(f64);

impl Ratio {
    pub fn new(value: f64) -> Result<Self> {
        if !value.is_finite() {
            return Err(EngineError::InvalidValue("ratio must be finite"));
        }
        if !(0.0..=1.0).contains(&value) {
            return Err(EngineError::OutOfRange {
                field: "ratio",
                value,
                min: 0.0,
                max: 1.0,
            });
        }
        Ok(Self(value))
    }

    #[inline]
    pub fn get(self) -> f64 {
        self.0
    }
}

impl TryFrom<f64> for Ratio {
    type Error = EngineError;

    fn try_from(value: f64) -> Result<Self> {
        Ratio::new(value)
    }
}

impl From<Ratio> for f64 {
    fn from(ratio: Ratio) -> f64 {
        ratio.0
    }
}

/// Window length in bars, never zero
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, serde::Serialize, serde::Deserialize,
)]
#[serde(try_from = "usize", into = "usize")]
pub struct Period(usize);

impl Period {
    pub fn new(value: usize) -> Result<Self> {
        if value == 0 {
            return Err(EngineError::InvalidValue("period must be > 0"));
        }
        Ok(Self(value))
    }

    /// Unchecked constructor for constants
    #[doc(hidden)]
    pub const fn new_const(value: usize) -> Self {
        Self(value)
    }

    #[inline]
    pub fn get(self) -> usize {
        self.0
    }
}

impl TryFrom<usize> for Period {
    type Error = EngineError;

    fn try_from(value: usize) -> Result<Self> {
        Period::new(value)
    }
}

impl From<Period> for usize {
    fn from(period: Period) -> usize {
        period.0
    }
}

// ============================================================
// OHLCV TRAITS
// ============================================================

/// A row of price data. Implement it for your own bar type and feed it to
/// [`series::TimeSeries::from_bars`].
pub trait OHLCV {
    fn open(&self) -> f64;
    fn high(&self) -> f64;
    fn low(&self) -> f64;
    fn close(&self) -> f64;
    fn volume(&self) -> u64;

    fn timestamp(&self) -> Option<i64> {
        None
    }
}

/// Candle geometry derived from an [`OHLCV`] row
pub trait OHLCVExt: OHLCV {
    #[inline]
    fn body(&self) -> f64 {
        (self.close() - self.open()).abs()
    }

    #[inline]
    fn range(&self) -> f64 {
        self.high() - self.low()
    }

    #[inline]
    fn body_top(&self) -> f64 {
        self.open().max(self.close())
    }

    #[inline]
    fn body_bottom(&self) -> f64 {
        self.open().min(self.close())
    }

    #[inline]
    fn upper_shadow(&self) -> f64 {
        self.high() - self.body_top()
    }

    #[inline]
    fn lower_shadow(&self) -> f64 {
        self.body_bottom() - self.low()
    }

    #[inline]
    fn is_bullish(&self) -> bool {
        self.close() > self.open()
    }

    #[inline]
    fn is_bearish(&self) -> bool {
        self.close() < self.open()
    }

    /// Body over range, `None` for a zero-range bar
    #[inline]
    fn body_ratio(&self) -> Option<f64> {
        let range = self.range();
        (range > f64::EPSILON).then(|| self.body() / range)
    }

    /// Why this row cannot be used, if anything
    fn defect(&self) -> Option<&'static str> {
        let prices = [self.open(), self.high(), self.low(), self.close()];
        if prices.iter().any(|p| p.is_nan()) {
            Some("NaN price")
        } else if prices.iter().any(|p| p.is_infinite()) {
            Some("infinite price")
        } else if self.high() < self.low() {
            Some("high < low")
        } else {
            None
        }
    }
}

impl<T: OHLCV> OHLCVExt for T {}

// ============================================================
// TESTS
// ============================================================
