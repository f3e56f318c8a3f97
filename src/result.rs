//! Merged output of one engine invocation and its diagnostics record.

use std::collections::BTreeMap;
use std::time::Duration;

use rust_decimal::Decimal;
use serde::{Serialize, Serializer};

use crate::pattern::DetectedPattern;
use crate::unit::{Category, Value};
use crate::{EngineError, Result};

// ============================================================
// RESULT
// ============================================================

/// Outputs of one unit
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UnitResult {
    pub category: Category,
    pub values: BTreeMap<String, Value>,
}

/// Keyed outputs of every unit that succeeded, one per (symbol, as-of)
/// invocation. All maps are ordered so that serialising the same result
/// twice yields identical bytes.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AnalysisResult {
    pub symbol: String,
    /// Timestamp of the last observation, when the series carried one
    pub as_of: Option<i64>,
    /// Unit name → outputs
    pub units: BTreeMap<String, UnitResult>,
    /// Every detected pattern, ordered by unit name then detection order
    pub patterns: Vec<DetectedPattern>,
}

impl AnalysisResult {
    pub fn new(symbol: impl Into<String>, as_of: Option<i64>) -> Self {
        Self {
            symbol: symbol.into(),
            as_of,
            ..Self::default()
        }
    }

    /// Look up an output key (`ma5`, `rsi_14`, `CHART020`, ...) across all units
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.units.values().find_map(|unit| unit.values.get(key))
    }

    pub fn decimal(&self, key: &str) -> Option<Decimal> {
        self.get(key).and_then(Value::as_decimal)
    }

    pub fn label(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_label)
    }

    pub fn unit(&self, name: &str) -> Option<&UnitResult> {
        self.units.get(name)
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// Outputs grouped by category for presentation
    pub fn by_category(&self) -> BTreeMap<Category, BTreeMap<&str, &Value>> {
        let mut grouped: BTreeMap<Category, BTreeMap<&str, &Value>> = BTreeMap::new();
        for unit in self.units.values() {
            let group = grouped.entry(unit.category).or_default();
            for (key, value) in &unit.values {
                group.insert(key.as_str(), value);
            }
        }
        grouped
    }

    /// Flat `key → value` view consumed by rule evaluators
    pub fn factors(&self) -> BTreeMap<&str, &Value> {
        self.units
            .values()
            .flat_map(|unit| unit.values.iter().map(|(k, v)| (k.as_str(), v)))
            .collect()
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| EngineError::InvalidConfig(e.to_string()))
    }
}

// ============================================================
// DIAGNOSTICS
// ============================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Severity {
    /// Unit skipped for lack of data
    Note,
    /// Unit succeeded with a caveat
    Warning,
    /// Unit failed
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiagnosticEntry {
    pub unit: String,
    pub severity: Severity,
    pub message: String,
}

/// Per-unit outcomes of one invocation.
///
/// `total` counts the units that actually ran, so
/// `succeeded + failed == total` holds after every run; skipped units are
/// counted separately.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Diagnostics {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub skipped: usize,
    /// Ordered by unit name
    pub entries: Vec<DiagnosticEntry>,
    #[serde(rename = "elapsed_ms", serialize_with = "as_millis")]
    pub elapsed: Duration,
}

fn as_millis<S: Serializer>(elapsed: &Duration, s: S) -> std::result::Result<S::Ok, S::Error> {
    s.serialize_u64(u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX))
}

impl Diagnostics {
    pub(crate) fn push(&mut self, unit: &str, severity: Severity, message: impl Into<String>) {
        self.entries.push(DiagnosticEntry {
            unit: unit.to_string(),
            severity,
            message: message.into(),
        });
    }

    fn with_severity(&self, severity: Severity) -> impl Iterator<Item = &DiagnosticEntry> {
        self.entries.iter().filter(move |e| e.severity == severity)
    }

    pub fn errors(&self) -> impl Iterator<Item = &DiagnosticEntry> {
        self.with_severity(Severity::Error)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &DiagnosticEntry> {
        self.with_severity(Severity::Warning)
    }

    pub fn notes(&self) -> impl Iterator<Item = &DiagnosticEntry> {
        self.with_severity(Severity::Note)
    }

    /// Entries about one unit
    pub fn for_unit<'a>(&'a self, unit: &'a str) -> impl Iterator<Item = &'a DiagnosticEntry> {
        self.entries.iter().filter(move |e| e.unit == unit)
    }

    pub fn is_consistent(&self) -> bool {
        self.succeeded + self.failed == self.total
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn sample() -> AnalysisResult {
        let mut result = AnalysisResult::new("2330", Some(20240102));
        result.units.insert(
            "ma".to_string(),
            UnitResult {
                category: Category::Trend,
                values: BTreeMap::from([
                    ("ma5".to_string(), Value::Decimal(dec!(101.5))),
                    ("ma_signal".to_string(), Value::label("BULLISH")),
                ]),
            },
        );
        result.units.insert(
            "rsi".to_string(),
            UnitResult {
                category: Category::Momentum,
                values: BTreeMap::from([("rsi_14".to_string(), Value::Decimal(dec!(55)))]),
            },
        );
        result
    }

    #[test]
    fn test_lookup() {
        let result = sample();
        assert_eq!(result.decimal("ma5"), Some(dec!(101.5)));
        assert_eq!(result.label("ma_signal"), Some("BULLISH"));
        assert!(result.get("bop").is_none());
        assert_eq!(result.factors().len(), 3);
    }

    #[test]
    fn test_by_category() {
        let result = sample();
        let grouped = result.by_category();
        assert_eq!(grouped[&Category::Trend].len(), 2);
        assert!(grouped[&Category::Momentum].contains_key("rsi_14"));
    }

    #[test]
    fn test_json_is_stable() {
        let result = sample();
        let first = result.to_json().unwrap();
        assert_eq!(first, result.clone().to_json().unwrap());
        assert!(first.contains(r#""ma5":"101.5""#));
    }

    #[test]
    fn test_diagnostics_filters() {
        let mut diagnostics = Diagnostics::default();
        diagnostics.push("ma", Severity::Note, "skipped");
        diagnostics.push("bop", Severity::Error, "boom");
        diagnostics.push("chart_pattern", Severity::Warning, "ambiguous");
        assert_eq!(diagnostics.errors().count(), 1);
        assert_eq!(diagnostics.warnings().count(), 1);
        assert_eq!(diagnostics.notes().next().unwrap().unit, "ma");
        assert_eq!(diagnostics.for_unit("bop").count(), 1);
        assert!(diagnostics.is_consistent());
    }

    #[test]
    fn test_diagnostics_serialize_elapsed_ms() {
        let diagnostics = Diagnostics {
            elapsed: Duration::from_millis(42),
            ..Diagnostics::default()
        };
        let json = serde_json::to_string(&diagnostics).unwrap();
        assert!(json.contains(r#""elapsed_ms":42"#));
    }
}
