//! Candlestick units
//!
//! Shape predicates over 1–3 adjacent bars, evaluated against a trailing
//! context (10-bar average body/range before the pattern, 14-bar close
//! trend ending at the pattern's first bar).
//!
//! # Detectors
//!
//! - **Single-bar**: Doji, Hammer, Hanging Man, Inverted Hammer, Shooting Star, Marubozu
//! - **Two-bar**: Engulfing, Harami, Piercing, Dark Cloud Cover, Tweezer Top/Bottom
//! - **Three-bar**: Morning/Evening Star, Three White Soldiers, Three Black Crows

pub mod helpers;
pub mod single_bar;
pub mod three_bar;
pub mod two_bar;

pub use single_bar::*;
pub use three_bar::*;
pub use two_bar::*;

use crate::math::to_decimal;
use crate::params::{ParamMeta, Params};
use crate::pattern::{
    clamp_strength, DetectedPattern, Direction, KeyLevels, PatternCategory, PatternId, Signal,
};
use crate::series::{Bar, TimeSeries};
use crate::unit::{
    require, Category, ComputationUnit, Priority, UnitError, UnitMetadata, UnitOutput,
};
use crate::{OHLCVExt, OHLCV};

/// Bars averaged for body/range context
pub const CANDLE_PERIOD: usize = 10;
/// Bars spanned by the close-change trend
pub const TREND_PERIOD: usize = 14;

// ============================================================
// CONTEXT
// ============================================================

/// Close trend preceding a pattern
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trend {
    StrongUp,
    WeakUp,
    Sideways,
    WeakDown,
    StrongDown,
}

impl Trend {
    #[inline]
    pub fn is_up(self) -> bool {
        matches!(self, Trend::StrongUp | Trend::WeakUp)
    }

    #[inline]
    pub fn is_down(self) -> bool {
        matches!(self, Trend::StrongDown | Trend::WeakDown)
    }

    #[inline]
    pub fn is_strong(self) -> bool {
        matches!(self, Trend::StrongUp | Trend::StrongDown)
    }

    /// Close change over [`TREND_PERIOD`] bars ending at `index`:
    /// beyond ±5% strong, beyond ±2% weak.
    pub fn at(bars: &[Bar], index: usize) -> Self {
        if index < TREND_PERIOD || index >= bars.len() {
            return Trend::Sideways;
        }
        let first = bars[index - TREND_PERIOD].close;
        if first <= f64::EPSILON {
            return Trend::Sideways;
        }
        match (bars[index].close - first) / first {
            c if c > 0.05 => Trend::StrongUp,
            c if c > 0.02 => Trend::WeakUp,
            c if c < -0.05 => Trend::StrongDown,
            c if c < -0.02 => Trend::WeakDown,
            _ => Trend::Sideways,
        }
    }
}

/// Market context for one candidate pattern
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CandleContext {
    pub trend: Trend,
    pub avg_body: f64,
    pub avg_range: f64,
}

impl CandleContext {
    /// Context for a pattern spanning `start..=end`. Averages cover the
    /// [`CANDLE_PERIOD`] bars before `start` (fewer near the series head;
    /// the first bar itself when nothing precedes it).
    pub fn for_span(bars: &[Bar], start: usize) -> Self {
        let trend = Trend::at(bars, start);
        if start == 0 {
            let bar = &bars[0];
            return Self {
                trend,
                avg_body: bar.body(),
                avg_range: bar.range(),
            };
        }
        let trail = &bars[start.saturating_sub(CANDLE_PERIOD)..start];
        let count = trail.len() as f64;
        let (body, range) = trail
            .iter()
            .fold((0.0, 0.0), |(b, r), bar| (b + bar.body(), r + bar.range()));
        Self {
            trend,
            avg_body: body / count,
            avg_range: range / count,
        }
    }
}

// ============================================================
// DETECTOR CONTRACT
// ============================================================

/// One candlestick shape
pub trait CandlePattern {
    fn id(&self) -> PatternId;

    /// Number of adjacent bars the shape spans
    fn span(&self) -> usize;

    /// Test the shape ending at `index`. Callers guarantee
    /// `index + 1 >= span`.
    fn detect(&self, bars: &[Bar], index: usize, ctx: &CandleContext) -> Option<DetectedPattern>;
}

/// Base 60, +10 when the preceding trend is the one the signal expects,
/// another +10 when that trend is strong.
pub fn trend_score(base: f64, signal: Signal, trend: Trend) -> u8 {
    let aligned = match signal {
        Signal::BullishReversal | Signal::BearishContinuation => trend.is_down(),
        Signal::BearishReversal | Signal::BullishContinuation => trend.is_up(),
        Signal::Neutral => false,
    };
    let mut score = base;
    if aligned {
        score += 10.0;
        if trend.is_strong() {
            score += 10.0;
        }
    }
    clamp_strength(score)
}

/// Assemble a candlestick match. Entry is the last close; invalidation is
/// the extreme the pattern must not break.
pub(crate) fn matched<P: CandlePattern + ?Sized>(
    pattern: &P,
    bars: &[Bar],
    index: usize,
    signal: Signal,
    strength: u8,
) -> DetectedPattern {
    let span = pattern.span();
    let start = index + 1 - span;
    let involved = &bars[start..=index];
    let invalidation = match signal.direction() {
        Direction::Bullish => {
            Some(involved.iter().map(|b| b.low()).fold(f64::INFINITY, f64::min))
        }
        Direction::Bearish => {
            Some(involved.iter().map(|b| b.high()).fold(f64::NEG_INFINITY, f64::max))
        }
        Direction::Neutral => None,
    };
    DetectedPattern {
        pattern_id: pattern.id(),
        category: match span {
            1 => PatternCategory::SingleBar,
            2 => PatternCategory::TwoBar,
            _ => PatternCategory::ThreeBar,
        },
        signal,
        strength,
        start_index: start,
        end_index: index,
        levels: KeyLevels {
            entry: Some(to_decimal(bars[index].close)),
            target: None,
            invalidation: invalidation.map(to_decimal),
        },
        warnings: Vec::new(),
    }
}

/// Generates the enum-dispatched [`CandleDetector`]
macro_rules! define_candle_detectors {
  (
    $(
      $variant:ident($detector:ty)
    ),* $(,)?
  ) => {
    /// All builtin candlestick detectors, dispatched without boxing
    #[derive(Debug, Clone, Copy)]
    pub enum CandleDetector {
      $($variant($detector)),*
    }

    impl CandlePattern for CandleDetector {
      #[inline]
      fn id(&self) -> PatternId {
        match self {
          $(Self::$variant(d) => CandlePattern::id(d)),*
        }
      }

      #[inline]
      fn span(&self) -> usize {
        match self {
          $(Self::$variant(d) => CandlePattern::span(d)),*
        }
      }

      #[inline]
      fn detect(&self, bars: &[Bar], index: usize, ctx: &CandleContext) -> Option<DetectedPattern> {
        match self {
          $(Self::$variant(d) => CandlePattern::detect(d, bars, index, ctx)),*
        }
      }
    }
  };
}

define_candle_detectors! {
    Doji(Doji),
    Hammer(Hammer),
    HangingMan(HangingMan),
    InvertedHammer(InvertedHammer),
    ShootingStar(ShootingStar),
    Marubozu(Marubozu),

    Engulfing(Engulfing),
    Harami(Harami),
    Piercing(Piercing),
    DarkCloudCover(DarkCloudCover),
    TweezerTop(TweezerTop),
    TweezerBottom(TweezerBottom),

    MorningStar(MorningStar),
    EveningStar(EveningStar),
    ThreeWhiteSoldiers(ThreeWhiteSoldiers),
    ThreeBlackCrows(ThreeBlackCrows),
}

pub const SINGLE_BAR: [CandleDetector; 6] = [
    CandleDetector::Doji(Doji),
    CandleDetector::Hammer(Hammer),
    CandleDetector::HangingMan(HangingMan),
    CandleDetector::InvertedHammer(InvertedHammer),
    CandleDetector::ShootingStar(ShootingStar),
    CandleDetector::Marubozu(Marubozu),
];

pub const TWO_BAR: [CandleDetector; 6] = [
    CandleDetector::Engulfing(Engulfing),
    CandleDetector::Harami(Harami),
    CandleDetector::Piercing(Piercing),
    CandleDetector::DarkCloudCover(DarkCloudCover),
    CandleDetector::TweezerTop(TweezerTop),
    CandleDetector::TweezerBottom(TweezerBottom),
];

pub const THREE_BAR: [CandleDetector; 4] = [
    CandleDetector::MorningStar(MorningStar),
    CandleDetector::EveningStar(EveningStar),
    CandleDetector::ThreeWhiteSoldiers(ThreeWhiteSoldiers),
    CandleDetector::ThreeBlackCrows(ThreeBlackCrows),
];

// ============================================================
// SCAN
// ============================================================

/// Run `detectors` over the trailing `lookback` bars, oldest first.
///
/// Bars with nothing before them are never pattern ends, so every
/// detection has at least one bar of context.
pub fn scan(bars: &[Bar], detectors: &[CandleDetector], lookback: usize) -> Vec<DetectedPattern> {
    let n = bars.len();
    let mut found = Vec::new();
    for index in n.saturating_sub(lookback)..n {
        for detector in detectors {
            let span = detector.span();
            if index < span {
                continue;
            }
            let ctx = CandleContext::for_span(bars, index + 1 - span);
            if let Some(pattern) = detector.detect(bars, index, &ctx) {
                found.push(pattern);
            }
        }
    }
    found
}

fn run_candle_unit(
    series: &TimeSeries,
    params: &Params,
    meta: &UnitMetadata,
    detectors: &[CandleDetector],
) -> Result<UnitOutput, UnitError> {
    require(series, meta.min_observations)?;
    let lookback = params.period("lookback")?;
    let bars = series.bars();
    let mut out = UnitOutput::new();
    for pattern in scan(&bars, detectors, lookback) {
        tracing::trace!(
            unit = meta.name,
            pattern = pattern.pattern_id.as_str(),
            index = pattern.end_index,
            "candlestick matched"
        );
        out.push_pattern(pattern);
    }
    Ok(out)
}

const LOOKBACK: ParamMeta =
    ParamMeta::period("lookback", 1.0, (1.0, 250.0, 1.0), "Trailing bars scanned for pattern ends");

// ============================================================
// UNITS
// ============================================================

static SINGLE_META: UnitMetadata = UnitMetadata {
    name: "candle_single",
    category: Category::Candlestick,
    label: "Single-bar Candlesticks",
    min_observations: CANDLE_PERIOD + 1,
    priority: Priority::P0,
    params: &[LOOKBACK],
};

static DOUBLE_META: UnitMetadata = UnitMetadata {
    name: "candle_double",
    category: Category::Candlestick,
    label: "Two-bar Candlesticks",
    min_observations: CANDLE_PERIOD + 2,
    priority: Priority::P0,
    params: &[LOOKBACK],
};

static TRIPLE_META: UnitMetadata = UnitMetadata {
    name: "candle_triple",
    category: Category::Candlestick,
    label: "Three-bar Candlesticks",
    min_observations: CANDLE_PERIOD + 3,
    priority: Priority::P0,
    params: &[LOOKBACK],
};

#[derive(Debug, Clone, Copy, Default)]
pub struct SingleCandle;

impl ComputationUnit for SingleCandle {
    fn metadata(&self) -> &UnitMetadata {
        &SINGLE_META
    }

    fn compute(&self, series: &TimeSeries, params: &Params) -> Result<UnitOutput, UnitError> {
        run_candle_unit(series, params, &SINGLE_META, &SINGLE_BAR)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DoubleCandle;

impl ComputationUnit for DoubleCandle {
    fn metadata(&self) -> &UnitMetadata {
        &DOUBLE_META
    }

    fn compute(&self, series: &TimeSeries, params: &Params) -> Result<UnitOutput, UnitError> {
        run_candle_unit(series, params, &DOUBLE_META, &TWO_BAR)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TripleCandle;

impl ComputationUnit for TripleCandle {
    fn metadata(&self) -> &UnitMetadata {
        &TRIPLE_META
    }

    fn compute(&self, series: &TimeSeries, params: &Params) -> Result<UnitOutput, UnitError> {
        run_candle_unit(series, params, &TRIPLE_META, &THREE_BAR)
    }
}
