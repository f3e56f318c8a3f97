//! Chart and candlestick pattern detection through the engine

mod common;

use common::{ascending_triangle, decline, path, TestBar};
use rust_decimal_macros::dec;
use yafe::prelude::*;

fn run_with(engine: &Engine, series: &TimeSeries, plan: Plan) -> (AnalysisResult, Diagnostics) {
    engine.run(series, &plan).unwrap()
}

fn engine() -> Engine {
    EngineBuilder::new().with_all_defaults().build().unwrap()
}

fn pattern<'a>(result: &'a AnalysisResult, id: &str) -> Option<&'a DetectedPattern> {
    result.patterns.iter().find(|p| p.pattern_id.as_str() == id)
}

// ============================================================
// CHART PATTERNS
// ============================================================

#[test]
fn test_ascending_triangle() {
    let (result, diagnostics) = run_with(
        &engine(),
        &ascending_triangle(),
        Plan::none().with_unit("chart_pattern"),
    );
    assert_eq!(diagnostics.succeeded, 1);

    let triangle = pattern(&result, "CHART020").unwrap();
    assert_eq!(triangle.signal, Signal::BullishContinuation);
    assert_eq!(triangle.category, PatternCategory::Chart);
    assert!(triangle.strength >= 80);
    assert_eq!((triangle.start_index, triangle.end_index), (20, 55));
    assert_eq!(triangle.levels.entry, Some(dec!(110.5)));
    assert_eq!(triangle.levels.target, Some(dec!(122.5)));
    assert_eq!(triangle.levels.invalidation, Some(dec!(104.5)));
    // the flat top is the triangle's resistance, not a double top
    assert!(pattern(&result, "CHART010").is_none());
    assert_eq!(result.patterns.len(), 1);

    let summary = result.get("CHART020").and_then(Value::as_map).unwrap();
    assert_eq!(summary["signal"].as_label(), Some("BULLISH_CONTINUATION"));
    assert_eq!(summary["target"].as_decimal(), Some(dec!(122.5)));
}

#[test]
fn test_descending_triangle_measured_move() {
    // flat support at 90, peaks falling 3 points per cycle
    let series = path(
        "DESC",
        60,
        &[
            (0, 100.0),
            (5, 110.0),
            (10, 90.0),
            (15, 107.0),
            (20, 90.0),
            (25, 104.0),
            (30, 90.0),
            (35, 101.0),
            (40, 90.0),
            (45, 98.0),
            (50, 90.0),
            (55, 95.0),
            (60, 90.0),
        ],
    );
    let (result, _) = run_with(&engine(), &series, Plan::none().with_unit("chart_pattern"));

    let triangle = pattern(&result, "CHART021").unwrap();
    assert_eq!(triangle.signal, Signal::BearishContinuation);
    assert!(triangle.strength >= 80);
    assert_eq!((triangle.start_index, triangle.end_index), (20, 55));
    // apex 92.5 minus the 15 point opening height
    assert_eq!(triangle.levels.target, Some(dec!(77.5)));
    assert_eq!(triangle.levels.entry, Some(dec!(89.5)));
    assert_eq!(triangle.levels.invalidation, Some(dec!(95.5)));
    assert!(pattern(&result, "CHART011").is_none());
    let summary = result.get("CHART021").and_then(Value::as_map).unwrap();
    assert_eq!(summary["signal"].as_label(), Some("BEARISH_CONTINUATION"));
}

#[test]
fn test_falling_wedge() {
    // peaks fall 5 per cycle, troughs only 3
    let series = path(
        "WEDGE",
        60,
        &[
            (0, 110.0),
            (5, 120.0),
            (10, 100.0),
            (15, 115.0),
            (20, 97.0),
            (25, 110.0),
            (30, 94.0),
            (35, 105.0),
            (40, 91.0),
            (45, 100.0),
            (50, 88.0),
            (55, 95.0),
            (60, 90.0),
        ],
    );
    let (result, diagnostics) =
        run_with(&engine(), &series, Plan::none().with_unit("chart_pattern"));
    assert_eq!(diagnostics.failed, 0);

    let wedge = pattern(&result, "CHART024").unwrap();
    assert_eq!(wedge.signal, Signal::BullishReversal);
    assert!(wedge.levels.target > wedge.levels.entry);
}

#[test]
fn test_double_top_needs_a_second_trough() {
    // two equal peaks around a single trough
    let series = path(
        "DT",
        30,
        &[(0, 90.0), (8, 110.0), (15, 95.0), (22, 110.0), (29, 94.0)],
    );
    let (result, diagnostics) =
        run_with(&engine(), &series, Plan::none().with_unit("chart_pattern"));
    assert_eq!(diagnostics.succeeded, 1);
    assert!(result.patterns.is_empty());
}

#[test]
fn test_symmetrical_triangle_warns() {
    let series = path(
        "SYM",
        60,
        &[
            (0, 100.0),
            (5, 80.0),
            (10, 120.0),
            (15, 84.0),
            (20, 116.0),
            (25, 88.0),
            (30, 112.0),
            (35, 92.0),
            (40, 108.0),
            (45, 96.0),
            (50, 104.0),
            (55, 100.0),
            (60, 103.0),
        ],
    );
    let (result, diagnostics) =
        run_with(&engine(), &series, Plan::none().with_unit("chart_pattern"));

    let triangle = pattern(&result, "CHART022").unwrap();
    assert_eq!(triangle.signal, Signal::Neutral);
    assert_eq!(triangle.warnings.len(), 1);

    let warning = diagnostics.warnings().next().unwrap();
    assert_eq!(warning.unit, "chart_pattern");
    assert!(warning.message.starts_with("CHART022: "));
    assert_eq!(diagnostics.failed, 0);
}

#[test]
fn test_trendless_series_has_no_chart_pattern() {
    let bars: Vec<TestBar> = (0..80)
        .map(|i| {
            let c = 100.0 + i as f64 * 0.5;
            TestBar::new(c, c + 0.5, c - 0.5, c)
        })
        .collect();
    let (result, diagnostics) = run_with(
        &engine(),
        &TimeSeries::from_bars("MONO", &bars),
        Plan::none().with_unit("chart_pattern"),
    );
    assert_eq!(diagnostics.succeeded, 1);
    assert!(result.patterns.is_empty());
    assert!(result.unit("chart_pattern").unwrap().values.is_empty());
}

// ============================================================
// CANDLESTICKS
// ============================================================

fn hammer_series() -> TimeSeries {
    let mut bars = decline(20);
    let c = bars[19].close();
    bars[19] = TestBar::new(c - 0.1, c + 0.02, c - 3.0, c);
    TimeSeries::from_bars("HAM", &bars)
}

#[test]
fn test_hammer_after_decline() {
    let (result, _) = run_with(
        &engine(),
        &hammer_series(),
        Plan::none().with_category(Category::Candlestick),
    );
    let hammer = pattern(&result, "CDL_HAMMER").unwrap();
    assert_eq!(hammer.signal, Signal::BullishReversal);
    assert_eq!(hammer.category, PatternCategory::SingleBar);
    assert_eq!((hammer.start_index, hammer.end_index), (19, 19));
    assert_eq!(hammer.strength, 80);
    assert!(result.unit("candle_single").unwrap().values.contains_key("CDL_HAMMER"));
    assert!(pattern(&result, "CDL_HANGINGMAN").is_none());
}

#[test]
fn test_bullish_engulfing() {
    let mut bars = decline(20);
    let mid = bars[18].close() + 0.25;
    bars[19] = TestBar::new(mid - 0.6, mid + 0.6, mid - 0.65, mid + 0.55);
    let (result, _) = run_with(
        &engine(),
        &TimeSeries::from_bars("ENG", &bars),
        Plan::none().with_unit("candle_double"),
    );
    let engulfing = pattern(&result, "CDL_ENGULFING").unwrap();
    assert_eq!(engulfing.signal, Signal::BullishReversal);
    assert_eq!((engulfing.start_index, engulfing.end_index), (18, 19));
    assert_eq!(engulfing.levels.invalidation, Some(yafe::math::to_decimal(mid - 0.65)));
}

#[test]
fn test_lookback_widens_the_scan() {
    let mut bars = decline(21);
    let c = bars[19].close();
    bars[19] = TestBar::new(c - 0.1, c + 0.02, c - 3.0, c);
    let series = TimeSeries::from_bars("LB", &bars);
    let engine = engine();

    let (latest, _) = run_with(&engine, &series, Plan::none().with_unit("candle_single"));
    assert!(pattern(&latest, "CDL_HAMMER").is_none());

    let plan = Plan::none()
        .with_unit("candle_single")
        .with_override("candle_single", "lookback", 2.0);
    let (wider, _) = run_with(&engine, &series, plan);
    assert_eq!(pattern(&wider, "CDL_HAMMER").unwrap().end_index, 19);
}

#[test]
fn test_min_strength_drops_weak_patterns() {
    let strict = EngineBuilder::new()
        .with_all_defaults()
        .min_pattern_strength(90)
        .build()
        .unwrap();
    let (result, _) = run_with(
        &strict,
        &hammer_series(),
        Plan::none().with_unit("candle_single"),
    );
    assert!(result.patterns.is_empty());
    assert!(result.get("CDL_HAMMER").is_none());
}
