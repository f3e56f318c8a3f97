//! Chart pattern classification and scoring
//!
//! Pipeline over the trailing `window` bars:
//! 1. extract alternating peaks/troughs ([`super::extrema`]);
//! 2. fit an upper line over the last `fit_points` peaks and a lower line
//!    over the last `fit_points` troughs ([`super::trendline`]);
//! 3. classify the pair of lines into a converging formation (triangles,
//!    wedges) and the last three extrema into double tops/bottoms;
//! 4. score, project a measured-move target and emit [`DetectedPattern`]s.
//!
//! Fewer than two peaks or two troughs yields no pattern. A formation whose
//! height is zero or negative is suppressed.

use super::extrema::{self, ExtremaConfig, PeakTrough};
use super::trendline::{TrendLine, FLAT_TOLERANCE};
use super::{clamp_strength, DetectedPattern, KeyLevels, PatternCategory, PatternId, Signal};
use crate::math::to_decimal;
use crate::params::{ParamMeta, Params};
use crate::series::TimeSeries;
use crate::unit::{Category, ComputationUnit, Priority, UnitError, UnitMetadata, UnitOutput};
use crate::Period;

// ============================================================
// FORMATIONS
// ============================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Formation {
    DoubleTop,
    DoubleBottom,
    AscendingTriangle,
    DescendingTriangle,
    SymmetricalTriangle,
    RisingWedge,
    FallingWedge,
}

impl Formation {
    pub fn id(self) -> PatternId {
        match self {
            Formation::DoubleTop => PatternId("CHART010"),
            Formation::DoubleBottom => PatternId("CHART011"),
            Formation::AscendingTriangle => PatternId("CHART020"),
            Formation::DescendingTriangle => PatternId("CHART021"),
            Formation::SymmetricalTriangle => PatternId("CHART022"),
            Formation::RisingWedge => PatternId("CHART023"),
            Formation::FallingWedge => PatternId("CHART024"),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Formation::DoubleTop => "Double Top",
            Formation::DoubleBottom => "Double Bottom",
            Formation::AscendingTriangle => "Ascending Triangle",
            Formation::DescendingTriangle => "Descending Triangle",
            Formation::SymmetricalTriangle => "Symmetrical Triangle",
            Formation::RisingWedge => "Rising Wedge",
            Formation::FallingWedge => "Falling Wedge",
        }
    }

    pub fn signal(self) -> Signal {
        match self {
            Formation::DoubleTop | Formation::RisingWedge => Signal::BearishReversal,
            Formation::DoubleBottom | Formation::FallingWedge => Signal::BullishReversal,
            Formation::AscendingTriangle => Signal::BullishContinuation,
            Formation::DescendingTriangle => Signal::BearishContinuation,
            Formation::SymmetricalTriangle => Signal::Neutral,
        }
    }

    /// Breakout direction used for the measured move. The symmetrical
    /// triangle has none and defaults to upward.
    fn breaks_upward(self) -> bool {
        !self.signal().direction().is_bearish()
    }
}

/// Classify an upper (peak) line and a lower (trough) line.
///
/// | upper   | lower   | result                               |
/// |---------|---------|--------------------------------------|
/// | flat    | rising  | ascending triangle                   |
/// | falling | flat    | descending triangle                  |
/// | falling | rising  | symmetrical triangle                 |
/// | rising  | rising  | rising wedge, if lower rises faster  |
/// | falling | falling | falling wedge, if upper falls faster |
pub fn classify(upper: &TrendLine, lower: &TrendLine, flat_tolerance: f64) -> Option<Formation> {
    let upper_flat = upper.is_flat(flat_tolerance);
    let upper_rising = upper.is_rising(flat_tolerance);
    let upper_falling = upper.is_falling(flat_tolerance);
    let lower_flat = lower.is_flat(flat_tolerance);
    let lower_rising = lower.is_rising(flat_tolerance);
    let lower_falling = lower.is_falling(flat_tolerance);

    if upper_flat && lower_rising {
        Some(Formation::AscendingTriangle)
    } else if lower_flat && upper_falling {
        Some(Formation::DescendingTriangle)
    } else if upper_falling && lower_rising {
        Some(Formation::SymmetricalTriangle)
    } else if upper_rising && lower_rising && lower.slope > upper.slope {
        Some(Formation::RisingWedge)
    } else if upper_falling && lower_falling && upper.slope < lower.slope {
        Some(Formation::FallingWedge)
    } else {
        None
    }
}

// ============================================================
// CONFIG
// ============================================================

const CHART_PARAMS: &[ParamMeta] = &[
    ParamMeta::period("window", 120.0, (20.0, 1000.0, 10.0), "Trailing bars analysed"),
    ParamMeta::period("neighborhood", 2.0, (1.0, 10.0, 1.0), "Bars on each side of an extremum"),
    ParamMeta::period("min_distance", 3.0, (1.0, 30.0, 1.0), "Minimum bars between extrema"),
    ParamMeta::period("fit_points", 4.0, (2.0, 10.0, 1.0), "Extrema per trend line"),
    ParamMeta::number("flat_tolerance", FLAT_TOLERANCE, (0.0, 0.05, 0.0005), "Flat slope per bar, relative to price"),
    ParamMeta::ratio("touch_tolerance", 0.01, (0.0, 0.1, 0.005), "Distance from a line that counts as a touch"),
    ParamMeta::ratio("double_tolerance", 0.02, (0.0, 0.1, 0.005), "Price match for double tops/bottoms"),
    ParamMeta::number("base_score", 60.0, (0.0, 100.0, 5.0), "Starting strength"),
    ParamMeta::ratio("r2_threshold", 0.8, (0.0, 1.0, 0.05), "R-squared above which a line earns a bonus"),
    ParamMeta::number("r2_bonus", 10.0, (0.0, 50.0, 1.0), "Bonus per well-fitted line"),
    ParamMeta::period("min_touches", 3.0, (1.0, 10.0, 1.0), "Touches for the touch bonus"),
    ParamMeta::number("touch_bonus", 5.0, (0.0, 50.0, 1.0), "Bonus per well-touched line"),
    ParamMeta::number("convergence_bonus", 10.0, (0.0, 50.0, 1.0), "Bonus when the spread halves"),
];

/// Tunables of the chart pattern pipeline
#[derive(Debug, Clone)]
pub struct ChartConfig {
    pub window: Period,
    pub extrema: ExtremaConfig,
    pub fit_points: usize,
    pub flat_tolerance: f64,
    pub touch_tolerance: f64,
    pub double_tolerance: f64,
    pub base_score: f64,
    pub r2_threshold: f64,
    pub r2_bonus: f64,
    pub min_touches: usize,
    pub touch_bonus: f64,
    pub convergence_bonus: f64,
}

impl Default for ChartConfig {
    fn default() -> Self {
        Self {
            window: Period::new_const(120),
            extrema: ExtremaConfig::default(),
            fit_points: 4,
            flat_tolerance: FLAT_TOLERANCE,
            touch_tolerance: 0.01,
            double_tolerance: 0.02,
            base_score: 60.0,
            r2_threshold: 0.8,
            r2_bonus: 10.0,
            min_touches: 3,
            touch_bonus: 5.0,
            convergence_bonus: 10.0,
        }
    }
}

impl ChartConfig {
    pub fn from_params(params: &Params) -> Result<Self, UnitError> {
        let neighborhood = params.period("neighborhood")?;
        Ok(Self {
            window: Period::new_const(params.period("window")?),
            extrema: ExtremaConfig {
                neighborhood: Period::new_const(neighborhood),
                min_distance: params.period("min_distance")?,
            },
            fit_points: params.period("fit_points")?,
            flat_tolerance: params.number("flat_tolerance")?,
            touch_tolerance: params.ratio("touch_tolerance")?,
            double_tolerance: params.ratio("double_tolerance")?,
            base_score: params.number("base_score")?,
            r2_threshold: params.ratio("r2_threshold")?,
            r2_bonus: params.number("r2_bonus")?,
            min_touches: params.period("min_touches")?,
            touch_bonus: params.number("touch_bonus")?,
            convergence_bonus: params.number("convergence_bonus")?,
        })
    }
}

// ============================================================
// DETECTION
// ============================================================

/// Detect chart patterns over the trailing window of the given columns.
/// Indices in the returned patterns refer to the full input slices.
pub fn detect_chart_patterns(
    highs: &[f64],
    lows: &[f64],
    closes: &[f64],
    config: &ChartConfig,
) -> Vec<DetectedPattern> {
    let n = highs.len().min(lows.len()).min(closes.len());
    if n == 0 {
        return Vec::new();
    }
    let offset = n.saturating_sub(config.window.get());
    let (highs, lows, closes) = (&highs[offset..n], &lows[offset..n], &closes[offset..n]);

    let points = extrema::extract(highs, lows, &config.extrema);
    if extrema::peaks(&points).len() < 2 || extrema::troughs(&points).len() < 2 {
        return Vec::new();
    }
    let last_close = closes[closes.len() - 1];

    // A triangle or wedge already accounts for the latest extrema; a double
    // top/bottom is only looked for when neither line pair classified.
    let mut patterns = Vec::new();
    if let Some(pattern) = detect_converging(&points, highs.len() - 1, config) {
        patterns.push(pattern);
    } else {
        let len = points.len();
        for end in [len, len.saturating_sub(1)] {
            if end >= 3 {
                if let Some(pattern) = detect_double(&points[end - 3..end], last_close, config) {
                    if !patterns.iter().any(|p| p.pattern_id == pattern.pattern_id) {
                        patterns.push(pattern);
                    }
                }
            }
        }
    }

    for pattern in &mut patterns {
        pattern.start_index += offset;
        pattern.end_index += offset;
    }
    patterns
}

/// Triangles and wedges
fn detect_converging(
    points: &[PeakTrough],
    last_index: usize,
    config: &ChartConfig,
) -> Option<DetectedPattern> {
    let peaks = extrema::peaks(points);
    let troughs = extrema::troughs(points);
    if peaks.len() < 2 || troughs.len() < 2 {
        return None;
    }

    let fit_peaks = &peaks[peaks.len().saturating_sub(config.fit_points)..];
    let fit_troughs = &troughs[troughs.len().saturating_sub(config.fit_points)..];
    let upper = TrendLine::fit(fit_peaks)?;
    let lower = TrendLine::fit(fit_troughs)?;
    let formation = classify(&upper, &lower, config.flat_tolerance)?;

    let (first_peak, last_peak) = (fit_peaks[0], fit_peaks[fit_peaks.len() - 1]);
    let (first_trough, last_trough) = (fit_troughs[0], fit_troughs[fit_troughs.len() - 1]);

    let height = first_peak.price - first_trough.price;
    if height <= 0.0 {
        return None;
    }

    let mut score = config.base_score;
    for line in [&upper, &lower] {
        if line.r_squared > config.r2_threshold {
            score += config.r2_bonus;
        }
    }
    if upper.touches(&peaks, config.touch_tolerance) >= config.min_touches {
        score += config.touch_bonus;
    }
    if lower.touches(&troughs, config.touch_tolerance) >= config.min_touches {
        score += config.touch_bonus;
    }
    let latest_spread = last_peak.price - last_trough.price;
    if latest_spread < height / 2.0 {
        score += config.convergence_bonus;
    }

    let apex = (last_peak.price + last_trough.price) / 2.0;
    let levels = if formation.breaks_upward() {
        KeyLevels {
            entry: Some(to_decimal(upper.value_at(last_index))),
            target: Some(to_decimal(apex + height)),
            invalidation: Some(to_decimal(last_trough.price)),
        }
    } else {
        KeyLevels {
            entry: Some(to_decimal(lower.value_at(last_index))),
            target: Some(to_decimal(apex - height)),
            invalidation: Some(to_decimal(last_peak.price)),
        }
    };

    let mut warnings = Vec::new();
    if formation == Formation::SymmetricalTriangle {
        warnings.push(
            "breakout direction undetermined; target assumes an upward breakout".to_string(),
        );
    }

    Some(DetectedPattern {
        pattern_id: formation.id(),
        category: PatternCategory::Chart,
        signal: formation.signal(),
        strength: clamp_strength(score),
        start_index: first_peak.index.min(first_trough.index),
        end_index: last_peak.index.max(last_trough.index),
        levels,
        warnings,
    })
}

/// Double top (peak, trough, peak) or double bottom (trough, peak, trough)
/// over exactly three consecutive extrema.
fn detect_double(
    triple: &[PeakTrough],
    last_close: f64,
    config: &ChartConfig,
) -> Option<DetectedPattern> {
    let &[first, neck, second] = triple else {
        return None;
    };
    let reference = first.price.abs().max(second.price.abs());
    if (first.price - second.price).abs() > reference * config.double_tolerance {
        return None;
    }

    let top = first.is_peak();
    let (formation, extreme, height) = if top {
        let extreme = first.price.max(second.price);
        (Formation::DoubleTop, extreme, extreme - neck.price)
    } else {
        let extreme = first.price.min(second.price);
        (Formation::DoubleBottom, extreme, neck.price - extreme)
    };
    if height <= 0.0 {
        return None;
    }

    let mut score = config.base_score;
    let failed_to_extend = if top {
        second.price <= first.price
    } else {
        second.price >= first.price
    };
    if failed_to_extend {
        score += 10.0;
    }
    let neckline_broken = if top {
        last_close < neck.price
    } else {
        last_close > neck.price
    };
    if neckline_broken {
        score += 10.0;
    }

    let target = if top {
        neck.price - height
    } else {
        neck.price + height
    };

    Some(DetectedPattern {
        pattern_id: formation.id(),
        category: PatternCategory::Chart,
        signal: formation.signal(),
        strength: clamp_strength(score),
        start_index: first.index,
        end_index: second.index,
        levels: KeyLevels {
            entry: Some(to_decimal(neck.price)),
            target: Some(to_decimal(target)),
            invalidation: Some(to_decimal(extreme)),
        },
        warnings: Vec::new(),
    })
}

// ============================================================
// UNIT
// ============================================================

static CHART_META: UnitMetadata = UnitMetadata {
    name: "chart_pattern",
    category: Category::Pattern,
    label: "Chart Patterns",
    min_observations: 20,
    priority: Priority::P2,
    params: CHART_PARAMS,
};

/// Emits one key per detected formation (`CHART0xx`) holding its signal,
/// strength, candle range and key levels.
#[derive(Debug, Clone, Copy, Default)]
pub struct ChartPatternUnit;

impl ComputationUnit for ChartPatternUnit {
    fn metadata(&self) -> &UnitMetadata {
        &CHART_META
    }

    fn compute(&self, series: &TimeSeries, params: &Params) -> Result<UnitOutput, UnitError> {
        let config = ChartConfig::from_params(params)?;
        let mut out = UnitOutput::new();
        for pattern in detect_chart_patterns(series.high(), series.low(), series.close(), &config) {
            tracing::debug!(
                symbol = series.symbol(),
                pattern = pattern.pattern_id.as_str(),
                strength = pattern.strength,
                "chart pattern detected"
            );
            out.push_pattern(pattern);
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pattern::extrema::ExtremumKind;
    use rust_decimal_macros::dec;

    fn point(index: usize, price: f64, kind: ExtremumKind) -> PeakTrough {
        PeakTrough { index, price, kind }
    }

    fn line(points: &[(usize, f64)]) -> TrendLine {
        let pts: Vec<PeakTrough> =
            points.iter().map(|&(i, p)| point(i, p, ExtremumKind::Peak)).collect();
        TrendLine::fit(&pts).unwrap()
    }

    #[test]
    fn test_classify_triangles() {
        let flat = line(&[(0, 120.0), (10, 120.0), (20, 120.0)]);
        let rising = line(&[(5, 100.0), (15, 105.0), (25, 110.0)]);
        let falling = line(&[(0, 130.0), (10, 125.0), (20, 120.0)]);
        let flat_low = line(&[(5, 100.0), (15, 100.0), (25, 100.0)]);

        assert_eq!(classify(&flat, &rising, FLAT_TOLERANCE), Some(Formation::AscendingTriangle));
        assert_eq!(classify(&falling, &flat_low, FLAT_TOLERANCE), Some(Formation::DescendingTriangle));
        assert_eq!(classify(&falling, &rising, FLAT_TOLERANCE), Some(Formation::SymmetricalTriangle));
        assert_eq!(classify(&flat, &flat_low, FLAT_TOLERANCE), None);
        assert_eq!(classify(&rising, &falling, FLAT_TOLERANCE), None);
    }

    #[test]
    fn test_classify_wedges() {
        let upper_slow = line(&[(0, 120.0), (10, 122.0), (20, 124.0)]);
        let lower_fast = line(&[(5, 100.0), (15, 106.0), (25, 112.0)]);
        assert_eq!(classify(&upper_slow, &lower_fast, FLAT_TOLERANCE), Some(Formation::RisingWedge));

        let upper_fast = line(&[(0, 130.0), (10, 124.0), (20, 118.0)]);
        let lower_slow = line(&[(5, 110.0), (15, 108.0), (25, 106.0)]);
        assert_eq!(classify(&upper_fast, &lower_slow, FLAT_TOLERANCE), Some(Formation::FallingWedge));

        // Diverging channel: parallel-ish lines are not wedges
        assert_eq!(classify(&lower_fast, &upper_slow, FLAT_TOLERANCE), None);
    }

    #[test]
    fn test_double_top_levels() {
        let triple = [
            point(10, 120.0, ExtremumKind::Peak),
            point(20, 100.0, ExtremumKind::Trough),
            point(30, 119.0, ExtremumKind::Peak),
        ];
        let pattern = detect_double(&triple, 98.0, &ChartConfig::default()).unwrap();
        assert_eq!(pattern.pattern_id, PatternId("CHART010"));
        assert_eq!(pattern.signal, Signal::BearishReversal);
        assert_eq!(pattern.strength, 80);
        assert_eq!(pattern.levels.entry, Some(dec!(100)));
        assert_eq!(pattern.levels.target, Some(dec!(80)));
        assert_eq!(pattern.levels.invalidation, Some(dec!(120)));
        assert_eq!((pattern.start_index, pattern.end_index), (10, 30));
    }

    #[test]
    fn test_double_bottom_requires_matching_lows() {
        let triple = [
            point(10, 100.0, ExtremumKind::Trough),
            point(20, 115.0, ExtremumKind::Peak),
            point(30, 90.0, ExtremumKind::Trough),
        ];
        assert!(detect_double(&triple, 110.0, &ChartConfig::default()).is_none());
    }

    #[test]
    fn test_no_patterns_without_enough_extrema() {
        let prices: Vec<f64> = (0..60).map(|i| 100.0 + i as f64).collect();
        assert!(detect_chart_patterns(&prices, &prices, &prices, &ChartConfig::default()).is_empty());
        assert!(detect_chart_patterns(&[], &[], &[], &ChartConfig::default()).is_empty());
    }

    #[test]
    fn test_converging_needs_positive_height() {
        // flat peaks at 100, troughs rising from 100: ascending lines, no room
        let points = [
            point(0, 100.0, ExtremumKind::Peak),
            point(5, 100.0, ExtremumKind::Trough),
            point(10, 100.0, ExtremumKind::Peak),
            point(15, 102.0, ExtremumKind::Trough),
            point(20, 100.0, ExtremumKind::Peak),
            point(25, 104.0, ExtremumKind::Trough),
        ];
        assert!(detect_converging(&points, 30, &ChartConfig::default()).is_none());

        let shifted: Vec<PeakTrough> = points
            .iter()
            .map(|p| match p.kind {
                ExtremumKind::Peak => point(p.index, p.price + 10.0, p.kind),
                ExtremumKind::Trough => *p,
            })
            .collect();
        let pattern = detect_converging(&shifted, 30, &ChartConfig::default()).unwrap();
        assert_eq!(pattern.pattern_id, PatternId("CHART020"));
    }

    #[test]
    fn test_double_top_needs_two_troughs() {
        // peak, trough, peak: one trough only
        let mut highs = vec![0.0; 30];
        for (i, h) in highs.iter_mut().enumerate() {
            *h = match i {
                0..=8 => 90.0 + 2.5 * i as f64,
                9..=15 => 110.0 - 15.0 * (i - 8) as f64 / 7.0,
                16..=22 => 95.0 + 15.0 * (i - 15) as f64 / 7.0,
                _ => 110.0 - 16.0 * (i - 22) as f64 / 7.0,
            };
        }
        let lows: Vec<f64> = highs.iter().map(|h| h - 1.0).collect();
        assert!(detect_chart_patterns(&highs, &lows, &lows, &ChartConfig::default()).is_empty());
    }

    #[test]
    fn test_config_from_default_params() {
        let params = CHART_META.defaults();
        let config = ChartConfig::from_params(&params).unwrap();
        assert_eq!(config.window.get(), 120);
        assert_eq!(config.fit_points, 4);
        assert_eq!(config.extrema.min_distance, 3);
        assert!((config.flat_tolerance - FLAT_TOLERANCE).abs() < f64::EPSILON);
    }
}
