//! Formula and chip units through the public engine surface

mod common;

use common::{linear, path, walk, TestBar};
use rust_decimal_macros::dec;
use yafe::prelude::*;

fn run(series: &TimeSeries, units: &[&str]) -> (AnalysisResult, Diagnostics) {
    let plan = units.iter().fold(Plan::none(), |plan, u| plan.with_unit(*u));
    EngineBuilder::new()
        .with_all_defaults()
        .build()
        .unwrap()
        .run(series, &plan)
        .unwrap()
}

#[test]
fn test_linear_regression_on_a_line() {
    let (result, _) = run(&linear("LIN", 40, 100.0, 1.0), &["linear_regression"]);
    assert_eq!(result.decimal("linreg_slope"), Some(dec!(1)));
    assert_eq!(result.decimal("linreg_r2"), Some(dec!(1)));
    assert_eq!(result.label("linreg_signal"), Some("STRONG_UPTREND"));
}

#[test]
fn test_flat_series_is_sideways_and_neutral() {
    let (result, diagnostics) = run(
        &linear("FLAT", 80, 50.0, 0.0),
        &["linear_regression", "ma", "bollinger", "qstick", "bop"],
    );
    assert_eq!(diagnostics.failed, 0);
    assert_eq!(result.decimal("linreg_slope"), Some(dec!(0)));
    assert_eq!(result.label("linreg_signal"), Some("SIDEWAYS"));
    assert_eq!(result.label("ma_signal"), Some("NEUTRAL"));
    assert_eq!(result.label("boll_signal"), Some("NEUTRAL"));
    assert_eq!(result.decimal("qstick"), Some(dec!(0)));
    assert_eq!(result.decimal("bop"), Some(dec!(0)));
}

#[test]
fn test_donchian_channel_levels() {
    // swings between 80 and 120 (±0.5 on the bars), closes back at 100
    let series = path(
        "DON",
        20,
        &[(0, 100.0), (5, 119.5), (10, 100.0), (15, 80.5), (19, 100.0)],
    );
    let (result, _) = run(&series, &["donchian"]);
    assert_eq!(result.decimal("donchian_upper"), Some(dec!(120)));
    assert_eq!(result.decimal("donchian_lower"), Some(dec!(80)));
    assert_eq!(result.decimal("donchian_middle"), Some(dec!(100)));
    assert_eq!(result.decimal("donchian_width"), Some(dec!(0.4)));
}

#[test]
fn test_rsi_extremes() {
    let (up, _) = run(&linear("UP", 40, 100.0, 1.0), &["rsi"]);
    assert_eq!(up.decimal("rsi_14"), Some(dec!(100)));
    assert_eq!(up.label("rsi_signal"), Some("OVERBOUGHT"));

    let (down, _) = run(&linear("DOWN", 40, 100.0, -1.0), &["rsi"]);
    assert_eq!(down.decimal("rsi_14"), Some(dec!(0)));
    assert_eq!(down.label("rsi_signal"), Some("OVERSOLD"));
}

#[test]
fn test_pivot_uses_previous_bar() {
    let bars = [
        TestBar::new(100.0, 110.0, 90.0, 100.0),
        TestBar::new(100.0, 101.0, 99.0, 100.0),
    ];
    let (result, _) = run(&TimeSeries::from_bars("PIV", &bars), &["pivot"]);
    assert_eq!(result.decimal("pivot_p"), Some(dec!(100)));
    assert_eq!(result.decimal("pivot_r1"), Some(dec!(110)));
    assert_eq!(result.decimal("pivot_s2"), Some(dec!(80)));
    assert_eq!(result.decimal("pivot_fib_r2"), Some(dec!(112.36)));
    assert_eq!(result.label("pivot_signal"), Some("NEUTRAL"));
}

#[test]
fn test_institutional_flow_from_aux_columns() {
    let n = 30;
    let series = walk("FLOW", n)
        .with_aux("foreign_net", vec![100.0; n])
        .unwrap()
        .with_aux("trust_net", vec![-20.0; n])
        .unwrap();
    let (result, diagnostics) = run(&series, &["institutional_flow"]);
    assert_eq!(diagnostics.succeeded, 1);
    assert_eq!(result.decimal("foreign_net_sum_5"), Some(dec!(500)));
    assert_eq!(result.decimal("trust_net_sum_20"), Some(dec!(-400)));
    assert_eq!(result.get("foreign_net_streak").and_then(Value::as_integer), Some(30));
    assert_eq!(result.get("trust_net_streak").and_then(Value::as_integer), Some(-30));
    assert_eq!(result.decimal("institutional_net_5"), Some(dec!(400)));
    assert!(result.get("dealer_net_streak").is_none());
}

#[test]
fn test_outputs_grouped_by_category() {
    let (result, _) = run(&walk("CAT", 120), &["ma", "rsi", "cmf"]);
    let grouped = result.by_category();
    assert!(grouped[&Category::Trend].contains_key("ma_signal"));
    assert!(grouped[&Category::Momentum].contains_key("rsi_signal"));
    assert!(grouped[&Category::Volume].contains_key("cmf"));
}
