//! Parameter metadata and resolved parameter maps for computation units
//!
//! Every unit declares its tunables as a static slice of [`ParamMeta`]. The
//! declared defaults form the unit's default map; a [`crate::plan::Plan`]
//! may override individual values, which are checked against the declared
//! range before the unit runs.
//!
//! # Example
//!
//! ```rust
//! use std::collections::BTreeMap;
//! use yafe::params::{ParamMeta, Params};
//!
//! const META: &[ParamMeta] = &[ParamMeta::period("period", 14.0, (2.0, 100.0, 1.0), "Lookback")];
//!
//! let defaults = Params::defaults(META);
//! assert_eq!(defaults.period("period").unwrap(), 14);
//!
//! let overrides = BTreeMap::from([("period".to_string(), 21.0)]);
//! let merged = Params::resolve(META, Some(&overrides)).unwrap();
//! assert_eq!(merged.period("period").unwrap(), 21);
//! ```

use std::collections::BTreeMap;

use serde::Serialize;

use crate::unit::UnitError;
use crate::{EngineError, Period, Ratio, Result};

// ============================================================
// PARAMETER TYPES
// ============================================================

/// Type of parameter value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ParamType {
  /// Ratio value in 0.0..=1.0
  Ratio,
  /// Period value (positive integer)
  Period,
  /// Unconstrained number, bounded only by the declared range
  Number,
}

/// Metadata for a single unit parameter
#[derive(Debug, Clone, Serialize)]
pub struct ParamMeta {
  /// Parameter name (e.g., "period")
  pub name: &'static str,
  pub param_type: ParamType,
  pub default: f64,
  /// Accepted range: (min, max, step)
  pub range: (f64, f64, f64),
  pub description: &'static str,
}

impl ParamMeta {
  pub const fn ratio(
    name: &'static str,
    default: f64,
    range: (f64, f64, f64),
    description: &'static str,
  ) -> Self {
    Self { name, param_type: ParamType::Ratio, default, range, description }
  }

  pub const fn period(
    name: &'static str,
    default: f64,
    range: (f64, f64, f64),
    description: &'static str,
  ) -> Self {
    Self { name, param_type: ParamType::Period, default, range, description }
  }

  pub const fn number(
    name: &'static str,
    default: f64,
    range: (f64, f64, f64),
    description: &'static str,
  ) -> Self {
    Self { name, param_type: ParamType::Number, default, range, description }
  }

  /// Validate a value for this parameter
  pub fn validate(&self, value: f64) -> Result<()> {
    if !value.is_finite() {
      return Err(EngineError::InvalidValue("Parameter cannot be NaN or infinite"));
    }
    let (min, max, _) = self.range;
    if value < min || value > max {
      return Err(EngineError::OutOfRange { field: self.name, value, min, max });
    }
    match self.param_type {
      ParamType::Ratio => Ratio::new(value).map(|_| ()),
      ParamType::Period => {
        if value < 1.0 || value.fract() != 0.0 {
          return Err(EngineError::InvalidValue("Period must be a positive integer"));
        }
        Ok(())
      },
      ParamType::Number => Ok(()),
    }
  }
}

// ============================================================
// RESOLVED PARAMETERS
// ============================================================

/// Resolved parameter map handed to a unit: declared defaults with plan
/// overrides applied on top.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Params(BTreeMap<String, f64>);

impl Params {
  /// Default map built from the declared metadata
  pub fn defaults(meta: &[ParamMeta]) -> Self {
    Self(meta.iter().map(|m| (m.name.to_string(), m.default)).collect())
  }

  /// Merge overrides into the defaults (override wins). Unknown names and
  /// values outside the declared range are rejected.
  pub fn resolve(
    meta: &[ParamMeta],
    overrides: Option<&BTreeMap<String, f64>>,
  ) -> std::result::Result<Self, UnitError> {
    let mut params = Self::defaults(meta);
    let Some(overrides) = overrides else {
      return Ok(params);
    };

    for (name, value) in overrides {
      let declared = meta.iter().find(|m| m.name == name.as_str()).ok_or_else(|| {
        UnitError::InvalidParam { name: name.clone(), reason: "unknown parameter".to_string() }
      })?;
      declared
        .validate(*value)
        .map_err(|e| UnitError::InvalidParam { name: name.clone(), reason: e.to_string() })?;
      params.0.insert(name.clone(), *value);
    }
    Ok(params)
  }

  pub fn number(&self, name: &str) -> std::result::Result<f64, UnitError> {
    self.0.get(name).copied().ok_or_else(|| UnitError::InvalidParam {
      name: name.to_string(),
      reason: "missing parameter".to_string(),
    })
  }

  pub fn period(&self, name: &str) -> std::result::Result<usize, UnitError> {
    let value = self.number(name)?;
    Period::new(value as usize)
      .map(Period::get)
      .map_err(|e| UnitError::InvalidParam { name: name.to_string(), reason: e.to_string() })
  }

  pub fn ratio(&self, name: &str) -> std::result::Result<f64, UnitError> {
    let value = self.number(name)?;
    Ratio::new(value)
      .map(Ratio::get)
      .map_err(|e| UnitError::InvalidParam { name: name.to_string(), reason: e.to_string() })
  }

  pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
    self.0.iter().map(|(k, v)| (k.as_str(), *v))
  }
}

// ============================================================
// TESTS
// ============================================================

#[cfg(test)]
mod tests {
  use super::*;

  const META: &[ParamMeta] = &[
    ParamMeta::period("period", 14.0, (2.0, 100.0, 1.0), "Lookback"),
    ParamMeta::ratio("tolerance", 0.01, (0.0, 0.1, 0.001), "Tolerance"),
    ParamMeta::number("k", 2.0, (0.5, 5.0, 0.5), "Band width"),
  ];

  #[test]
  fn test_period_must_be_whole_and_in_range() {
    let window = ParamMeta::period("window", 120.0, (20.0, 250.0, 1.0), "Chart window");
    assert_eq!(window.param_type, ParamType::Period);
    assert!(window.validate(20.0).is_ok());
    assert!(window.validate(250.0).is_ok());
    assert!(window.validate(60.5).is_err());
    assert!(window.validate(19.0).is_err());
    assert!(window.validate(f64::INFINITY).is_err());
  }

  #[test]
  fn test_ratio_range_and_unit_interval() {
    let flat = ParamMeta::ratio("flat_tolerance", 0.001, (0.0, 0.05, 0.0005), "Flatness");
    assert!(flat.validate(0.0).is_ok());
    assert!(flat.validate(0.05).is_ok());
    assert!(flat.validate(0.06).is_err());
    assert!(flat.validate(f64::NAN).is_err());

    let wide = ParamMeta::ratio("share", 0.5, (0.0, 2.0, 0.1), "Share");
    assert!(wide.validate(1.5).is_err());
  }

  #[test]
  fn test_defaults() {
    let params = Params::defaults(META);
    assert_eq!(params.period("period").unwrap(), 14);
    assert!((params.ratio("tolerance").unwrap() - 0.01).abs() < f64::EPSILON);
    assert!((params.number("k").unwrap() - 2.0).abs() < f64::EPSILON);
    assert!(params.number("missing").is_err());
  }

  #[test]
  fn test_override_wins() {
    let overrides = BTreeMap::from([("k".to_string(), 3.0)]);
    let params = Params::resolve(META, Some(&overrides)).unwrap();
    assert!((params.number("k").unwrap() - 3.0).abs() < f64::EPSILON);
    assert_eq!(params.period("period").unwrap(), 14);
  }

  #[test]
  fn test_unknown_override_rejected() {
    let overrides = BTreeMap::from([("bogus".to_string(), 1.0)]);
    let err = Params::resolve(META, Some(&overrides)).unwrap_err();
    assert!(matches!(err, UnitError::InvalidParam { ref name, .. } if name == "bogus"));
  }

  #[test]
  fn test_out_of_range_override_rejected() {
    let overrides = BTreeMap::from([("period".to_string(), 500.0)]);
    assert!(Params::resolve(META, Some(&overrides)).is_err());
  }
}
