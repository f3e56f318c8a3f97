//! The computation unit contract: metadata, output values and errors.

use std::collections::BTreeMap;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::math::to_decimal;
use crate::params::{ParamMeta, Params};
use crate::pattern::DetectedPattern;
use crate::series::TimeSeries;

// ============================================================
// METADATA
// ============================================================

/// Unit category, used by plans to switch whole groups on or off
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Category {
    Trend,
    Momentum,
    Volatility,
    Volume,
    SupportResistance,
    Chip,
    Candlestick,
    Pattern,
}

impl Category {
    pub const ALL: [Category; 8] = [
        Category::Trend,
        Category::Momentum,
        Category::Volatility,
        Category::Volume,
        Category::SupportResistance,
        Category::Chip,
        Category::Candlestick,
        Category::Pattern,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Category::Trend => "TREND",
            Category::Momentum => "MOMENTUM",
            Category::Volatility => "VOLATILITY",
            Category::Volume => "VOLUME",
            Category::SupportResistance => "SUPPORT_RESISTANCE",
            Category::Chip => "CHIP",
            Category::Candlestick => "CANDLESTICK",
            Category::Pattern => "PATTERN",
        }
    }
}

/// Scheduling tier
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum Priority {
    /// Required in the daily batch
    P0,
    /// Optional in the daily batch
    P1,
    /// On demand only
    P2,
}

/// Static descriptor of a unit. The name is the registry key and the
/// namespace its outputs are stored under.
#[derive(Debug, Clone, Serialize)]
pub struct UnitMetadata {
    pub name: &'static str,
    pub category: Category,
    /// Human readable label
    pub label: &'static str,
    /// Series shorter than this are skipped without running the unit
    pub min_observations: usize,
    pub priority: Priority,
    pub params: &'static [ParamMeta],
}

impl UnitMetadata {
    pub fn defaults(&self) -> Params {
        Params::defaults(self.params)
    }
}

// ============================================================
// VALUES
// ============================================================

/// A single output value
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Decimal(Decimal),
    Integer(i64),
    Label(String),
    Map(BTreeMap<String, Value>),
}

impl Value {
    /// Rounded decimal from a float; non-finite input becomes 0
    pub fn decimal(value: f64) -> Self {
        Value::Decimal(to_decimal(value))
    }

    pub fn label(label: impl Into<String>) -> Self {
        Value::Label(label.into())
    }

    pub fn as_decimal(&self) -> Option<Decimal> {
        match self {
            Value::Decimal(d) => Some(*d),
            Value::Integer(i) => Some(Decimal::from(*i)),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Decimal(d) => d.to_f64(),
            Value::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Value::Integer(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_label(&self) -> Option<&str> {
        match self {
            Value::Label(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&BTreeMap<String, Value>> {
        match self {
            Value::Map(m) => Some(m),
            _ => None,
        }
    }
}

/// What one unit produced in one invocation
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UnitOutput {
    pub values: BTreeMap<String, Value>,
    pub patterns: Vec<DetectedPattern>,
    pub warnings: Vec<String>,
}

impl UnitOutput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: Value) -> Self {
        self.values.insert(key.into(), value);
        self
    }

    pub fn set(&mut self, key: impl Into<String>, value: Value) {
        self.values.insert(key.into(), value);
    }

    pub fn push_pattern(&mut self, pattern: DetectedPattern) {
        for warning in &pattern.warnings {
            self.warnings
                .push(format!("{}: {}", pattern.pattern_id.as_str(), warning));
        }
        self.values
            .insert(pattern.pattern_id.as_str().to_string(), pattern.to_value());
        self.patterns.push(pattern);
    }

    pub fn warn(&mut self, message: impl Into<String>) {
        self.warnings.push(message.into());
    }
}

// ============================================================
// ERRORS & CONTRACT
// ============================================================

/// Errors raised inside a unit. None of these abort an engine run.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum UnitError {
    #[error("Insufficient data: need {need} observations, got {got}")]
    InsufficientData { need: usize, got: usize },

    #[error("Missing series column '{0}'")]
    MissingSeries(String),

    #[error("Invalid parameter '{name}': {reason}")]
    InvalidParam { name: String, reason: String },

    #[error("Computation failed: {0}")]
    Computation(String),
}

impl UnitError {
    /// Whether the condition means "no data" (skip) rather than a failure
    pub fn is_skip(&self) -> bool {
        matches!(
            self,
            UnitError::InsufficientData { .. } | UnitError::MissingSeries(_)
        )
    }
}

/// One pluggable analyzer. Implementations must be pure: the same series
/// and parameters always produce the same output, and no unit reads
/// another unit's result.
pub trait ComputationUnit: Send + Sync {
    fn metadata(&self) -> &UnitMetadata;

    fn compute(
        &self,
        series: &TimeSeries,
        params: &Params,
    ) -> std::result::Result<UnitOutput, UnitError>;
}

/// Fails with `InsufficientData` when fewer than `need` observations are available
#[inline]
pub fn require(series: &TimeSeries, need: usize) -> std::result::Result<(), UnitError> {
    if series.size() < need {
        return Err(UnitError::InsufficientData {
            need,
            got: series.size(),
        });
    }
    Ok(())
}
