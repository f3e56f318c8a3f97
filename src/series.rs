//! Immutable, column-oriented bundle of aligned observations for one symbol.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{EngineError, OHLCVExt, Result, OHLCV};

/// A single observation. Used for candle-shape predicates and as the
/// row type when series are supplied as JSON.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    #[serde(default)]
    pub volume: u64,
    #[serde(default)]
    pub timestamp: Option<i64>,
}

impl Bar {
    pub fn new(open: f64, high: f64, low: f64, close: f64, volume: u64) -> Self {
        Self {
            open,
            high,
            low,
            close,
            volume,
            timestamp: None,
        }
    }
}

impl OHLCV for Bar {
    fn open(&self) -> f64 {
        self.open
    }

    fn high(&self) -> f64 {
        self.high
    }

    fn low(&self) -> f64 {
        self.low
    }

    fn close(&self) -> f64 {
        self.close
    }

    fn volume(&self) -> u64 {
        self.volume
    }

    fn timestamp(&self) -> Option<i64> {
        self.timestamp
    }
}

/// Ascending, gap-free series of OHLCV observations plus optional auxiliary
/// columns (institutional flow and the like) of the same length.
///
/// The provider is responsible for ordering and gap filling; the engine
/// only checks that every column has the same length.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeSeries {
    symbol: String,
    timestamps: Vec<i64>,
    open: Vec<f64>,
    high: Vec<f64>,
    low: Vec<f64>,
    close: Vec<f64>,
    volume: Vec<u64>,
    aux: BTreeMap<String, Vec<f64>>,
}

impl TimeSeries {
    pub fn new(
        symbol: impl Into<String>,
        open: Vec<f64>,
        high: Vec<f64>,
        low: Vec<f64>,
        close: Vec<f64>,
        volume: Vec<u64>,
    ) -> Result<Self> {
        let expected = close.len();
        for (field, got) in [
            ("open", open.len()),
            ("high", high.len()),
            ("low", low.len()),
            ("volume", volume.len()),
        ] {
            if got != expected {
                return Err(EngineError::LengthMismatch {
                    field: field.to_string(),
                    expected,
                    got,
                });
            }
        }

        Ok(Self {
            symbol: symbol.into(),
            timestamps: Vec::new(),
            open,
            high,
            low,
            close,
            volume,
            aux: BTreeMap::new(),
        })
    }

    /// Build a series from any OHLCV rows. Timestamps are kept only when
    /// every row carries one.
    pub fn from_bars<T: OHLCV>(symbol: impl Into<String>, bars: &[T]) -> Self {
        let timestamps: Option<Vec<i64>> = bars.iter().map(|b| b.timestamp()).collect();

        Self {
            symbol: symbol.into(),
            timestamps: timestamps.unwrap_or_default(),
            open: bars.iter().map(|b| b.open()).collect(),
            high: bars.iter().map(|b| b.high()).collect(),
            low: bars.iter().map(|b| b.low()).collect(),
            close: bars.iter().map(|b| b.close()).collect(),
            volume: bars.iter().map(|b| b.volume()).collect(),
            aux: BTreeMap::new(),
        }
    }

    pub fn with_timestamps(mut self, timestamps: Vec<i64>) -> Result<Self> {
        self.check_len("timestamps", timestamps.len())?;
        self.timestamps = timestamps;
        Ok(self)
    }

    /// Attach an auxiliary column, e.g. `foreign_net` for daily foreign
    /// investor net buy volume.
    pub fn with_aux(mut self, name: impl Into<String>, values: Vec<f64>) -> Result<Self> {
        let name = name.into();
        self.check_len(&name, values.len())?;
        self.aux.insert(name, values);
        Ok(self)
    }

    fn check_len(&self, field: &str, got: usize) -> Result<()> {
        if got != self.size() {
            return Err(EngineError::LengthMismatch {
                field: field.to_string(),
                expected: self.size(),
                got,
            });
        }
        Ok(())
    }

    #[inline]
    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    /// Number of observations
    #[inline]
    pub fn size(&self) -> usize {
        self.close.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.close.is_empty()
    }

    #[inline]
    pub fn open(&self) -> &[f64] {
        &self.open
    }

    #[inline]
    pub fn high(&self) -> &[f64] {
        &self.high
    }

    #[inline]
    pub fn low(&self) -> &[f64] {
        &self.low
    }

    #[inline]
    pub fn close(&self) -> &[f64] {
        &self.close
    }

    #[inline]
    pub fn volume(&self) -> &[u64] {
        &self.volume
    }

    pub fn timestamps(&self) -> Option<&[i64]> {
        (!self.timestamps.is_empty()).then_some(self.timestamps.as_slice())
    }

    /// Timestamp of the last observation, when timestamps were supplied
    pub fn as_of(&self) -> Option<i64> {
        self.timestamps.last().copied()
    }

    pub fn aux(&self, name: &str) -> Option<&[f64]> {
        self.aux.get(name).map(Vec::as_slice)
    }

    pub fn aux_names(&self) -> impl Iterator<Item = &str> {
        self.aux.keys().map(String::as_str)
    }

    pub fn bar(&self, index: usize) -> Option<Bar> {
        if index >= self.size() {
            return None;
        }
        Some(Bar {
            open: self.open[index],
            high: self.high[index],
            low: self.low[index],
            close: self.close[index],
            volume: self.volume[index],
            timestamp: self.timestamps.get(index).copied(),
        })
    }

    /// Materialize the series as rows
    pub fn bars(&self) -> Vec<Bar> {
        (0..self.size()).filter_map(|i| self.bar(i)).collect()
    }

    /// Check every observation for NaN, infinities and high < low
    pub fn validate(&self) -> Result<()> {
        match self.bars().iter().enumerate().find_map(|(i, bar)| bar.defect().map(|r| (i, r))) {
            Some((index, reason)) => Err(EngineError::InvalidOHLCV { index, reason }),
            None => Ok(()),
        }
    }
}
