//! Shared fixtures for the integration tests

#![allow(dead_code)]

use yafe::prelude::*;

/// Foreign row type, fed through `TimeSeries::from_bars`
#[derive(Debug, Clone, Copy)]
pub struct TestBar {
    o: f64,
    h: f64,
    l: f64,
    c: f64,
    v: u64,
}

impl TestBar {
    pub fn new(o: f64, h: f64, l: f64, c: f64) -> Self {
        Self { o, h, l, c, v: 1_000 }
    }
}

impl OHLCV for TestBar {
    fn open(&self) -> f64 {
        self.o
    }

    fn high(&self) -> f64 {
        self.h
    }

    fn low(&self) -> f64 {
        self.l
    }

    fn close(&self) -> f64 {
        self.c
    }

    fn volume(&self) -> u64 {
        self.v
    }
}

/// Closes on a straight line `start + step * i`, one point of range
pub fn linear(symbol: &str, n: usize, start: f64, step: f64) -> TimeSeries {
    let bars: Vec<TestBar> = (0..n)
        .map(|i| {
            let c = start + step * i as f64;
            let o = c - step / 2.0;
            TestBar::new(o, o.max(c) + 0.5, o.min(c) - 0.5, c)
        })
        .collect();
    TimeSeries::from_bars(symbol, &bars)
}

/// Deterministic noisy walk, long enough for every builtin unit
pub fn walk(symbol: &str, n: usize) -> TimeSeries {
    let mut price = 100.0;
    let bars: Vec<TestBar> = (0..n)
        .map(|i| {
            let drift = ((i * 7919) % 13) as f64 / 13.0 - 0.45;
            let open = price;
            price = (price + drift).max(1.0);
            let swing = 0.3 + ((i * 31) % 5) as f64 * 0.2;
            TestBar::new(open, open.max(price) + swing, open.min(price) - swing, price)
        })
        .collect();
    TimeSeries::from_bars(symbol, &bars)
}

/// Bars whose high/low follow a piecewise-linear path through `anchors`
/// (index, price), half a point either side
pub fn path(symbol: &str, n: usize, anchors: &[(usize, f64)]) -> TimeSeries {
    let bars: Vec<TestBar> = (0..n)
        .map(|i| {
            let p = interpolate(anchors, i);
            TestBar::new(p, p + 0.5, p - 0.5, p)
        })
        .collect();
    TimeSeries::from_bars(symbol, &bars)
}

fn interpolate(anchors: &[(usize, f64)], i: usize) -> f64 {
    for pair in anchors.windows(2) {
        let ((x0, y0), (x1, y1)) = (pair[0], pair[1]);
        if i >= x0 && i <= x1 {
            let t = (i - x0) as f64 / (x1 - x0) as f64;
            return y0 + (y1 - y0) * t;
        }
    }
    anchors.last().map(|a| a.1).unwrap_or(0.0)
}

/// Flat resistance at 110 with troughs rising 3 points per cycle
pub fn ascending_triangle() -> TimeSeries {
    path(
        "ASC",
        60,
        &[
            (0, 100.0),
            (5, 90.0),
            (10, 110.0),
            (15, 93.0),
            (20, 110.0),
            (25, 96.0),
            (30, 110.0),
            (35, 99.0),
            (40, 110.0),
            (45, 102.0),
            (50, 110.0),
            (55, 105.0),
            (60, 110.0),
        ],
    )
}

/// `n` bars falling 1% per bar, quiet bodies
pub fn decline(n: usize) -> Vec<TestBar> {
    (0..n)
        .map(|i| {
            let c = 100.0 * 0.99_f64.powi(i as i32);
            TestBar::new(c + 0.25, c + 0.5, c - 0.5, c - 0.25)
        })
        .collect()
}
