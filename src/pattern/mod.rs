//! Pattern detection: shared result types plus the geometric chart-pattern
//! pipeline (extrema extraction, trend-line fitting, classification).
//!
//! Candlestick shape detectors live in [`crate::units::candles`] and emit
//! the same [`DetectedPattern`] type.

pub mod chart;
pub mod extrema;
pub mod trendline;

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::unit::Value;

pub use chart::{ChartConfig, ChartPatternUnit, Formation};
pub use extrema::{extract, ExtremaConfig, ExtremumKind, PeakTrough};
pub use trendline::TrendLine;

// ============================================================
// PATTERN IDENTITY
// ============================================================

/// Unique identifier for a pattern type (e.g. `CDL_HAMMER`, `CHART020`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct PatternId(pub &'static str);

impl PatternId {
    #[inline]
    pub fn as_str(&self) -> &'static str {
        self.0
    }
}

/// Direction/bias of a pattern
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    Bullish,
    Neutral,
    Bearish,
}

impl Direction {
    #[inline]
    pub fn is_bullish(self) -> bool {
        matches!(self, Direction::Bullish)
    }

    #[inline]
    pub fn is_bearish(self) -> bool {
        matches!(self, Direction::Bearish)
    }
}

/// Closed set of trading signals a pattern maps to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Signal {
    BullishReversal,
    BearishReversal,
    BullishContinuation,
    BearishContinuation,
    Neutral,
}

impl Signal {
    pub fn as_str(self) -> &'static str {
        match self {
            Signal::BullishReversal => "BULLISH_REVERSAL",
            Signal::BearishReversal => "BEARISH_REVERSAL",
            Signal::BullishContinuation => "BULLISH_CONTINUATION",
            Signal::BearishContinuation => "BEARISH_CONTINUATION",
            Signal::Neutral => "NEUTRAL",
        }
    }

    pub fn direction(self) -> Direction {
        match self {
            Signal::BullishReversal | Signal::BullishContinuation => Direction::Bullish,
            Signal::BearishReversal | Signal::BearishContinuation => Direction::Bearish,
            Signal::Neutral => Direction::Neutral,
        }
    }

    pub fn is_reversal(self) -> bool {
        matches!(self, Signal::BullishReversal | Signal::BearishReversal)
    }
}

/// Category of pattern by construction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PatternCategory {
    SingleBar,
    TwoBar,
    ThreeBar,
    Chart,
}

// ============================================================
// DETECTED PATTERN
// ============================================================

/// Key price levels of a detected pattern
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct KeyLevels {
    pub entry: Option<Decimal>,
    pub target: Option<Decimal>,
    pub invalidation: Option<Decimal>,
}

/// One detected chart or candlestick pattern
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DetectedPattern {
    pub pattern_id: PatternId,
    pub category: PatternCategory,
    pub signal: Signal,
    /// Confidence score 0..=100
    pub strength: u8,
    /// First candle involved (series index)
    pub start_index: usize,
    /// Last candle involved (series index)
    pub end_index: usize,
    pub levels: KeyLevels,
    /// Caveats attached to this detection, e.g. an undetermined breakout
    pub warnings: Vec<String>,
}

impl DetectedPattern {
    #[inline]
    pub fn direction(&self) -> Direction {
        self.signal.direction()
    }

    /// Nested map stored under the pattern id key in the unit's output
    pub fn to_value(&self) -> Value {
        let mut map = BTreeMap::new();
        map.insert("signal".to_string(), Value::label(self.signal.as_str()));
        map.insert("strength".to_string(), Value::Integer(i64::from(self.strength)));
        map.insert("start".to_string(), Value::Integer(self.start_index as i64));
        map.insert("end".to_string(), Value::Integer(self.end_index as i64));
        for (key, level) in [
            ("entry", self.levels.entry),
            ("target", self.levels.target),
            ("invalidation", self.levels.invalidation),
        ] {
            if let Some(level) = level {
                map.insert(key.to_string(), Value::Decimal(level));
            }
        }
        Value::Map(map)
    }
}

/// Clamp a raw score into 0..=100
#[inline]
pub fn clamp_strength(score: f64) -> u8 {
    if score.is_nan() {
        return 0;
    }
    score.round().clamp(0.0, 100.0) as u8
}
