//! Two-bar candlestick detectors

use super::{matched, trend_score, CandleContext, CandlePattern};
use crate::pattern::{DetectedPattern, PatternId, Signal};
use crate::series::Bar;
use crate::OHLCVExt;

#[inline]
fn pair(bars: &[Bar], index: usize) -> Option<(&Bar, &Bar)> {
    if index < 1 {
        return None;
    }
    Some((bars.get(index - 1)?, bars.get(index)?))
}

#[inline]
fn midpoint(bar: &Bar) -> f64 {
    (bar.open + bar.close) / 2.0
}

// ============================================================
// ENGULFING / HARAMI
// ============================================================

/// Second body covers the first, opposite colours
#[derive(Debug, Clone, Copy, Default)]
pub struct Engulfing;

impl CandlePattern for Engulfing {
    fn id(&self) -> PatternId {
        PatternId("CDL_ENGULFING")
    }

    fn span(&self) -> usize {
        2
    }

    fn detect(&self, bars: &[Bar], index: usize, ctx: &CandleContext) -> Option<DetectedPattern> {
        let (prev, cur) = pair(bars, index)?;
        let signal = if prev.is_bearish() && cur.is_bullish() {
            Signal::BullishReversal
        } else if prev.is_bullish() && cur.is_bearish() {
            Signal::BearishReversal
        } else {
            return None;
        };
        if cur.body_top() < prev.body_top()
            || cur.body_bottom() > prev.body_bottom()
            || cur.body() <= prev.body()
        {
            return None;
        }
        Some(matched(self, bars, index, signal, trend_score(60.0, signal, ctx.trend)))
    }
}

/// Short body inside a preceding long body
#[derive(Debug, Clone, Copy, Default)]
pub struct Harami;

impl CandlePattern for Harami {
    fn id(&self) -> PatternId {
        PatternId("CDL_HARAMI")
    }

    fn span(&self) -> usize {
        2
    }

    fn detect(&self, bars: &[Bar], index: usize, ctx: &CandleContext) -> Option<DetectedPattern> {
        let (prev, cur) = pair(bars, index)?;
        if !ctx.long_body(prev)
            || !ctx.short_body(cur)
            || cur.body_top() >= prev.body_top()
            || cur.body_bottom() <= prev.body_bottom()
        {
            return None;
        }
        let signal = if prev.is_bearish() {
            Signal::BullishReversal
        } else {
            Signal::BearishReversal
        };
        Some(matched(self, bars, index, signal, trend_score(55.0, signal, ctx.trend)))
    }
}

// ============================================================
// PIERCING / DARK CLOUD COVER
// ============================================================

/// Long black bar, then a white bar opening below its low and closing
/// above its midpoint but inside its body
#[derive(Debug, Clone, Copy, Default)]
pub struct Piercing;

impl CandlePattern for Piercing {
    fn id(&self) -> PatternId {
        PatternId("CDL_PIERCING")
    }

    fn span(&self) -> usize {
        2
    }

    fn detect(&self, bars: &[Bar], index: usize, ctx: &CandleContext) -> Option<DetectedPattern> {
        let (prev, cur) = pair(bars, index)?;
        if !prev.is_bearish()
            || !cur.is_bullish()
            || !ctx.long_body(prev)
            || cur.open >= prev.low
            || cur.close <= midpoint(prev)
            || cur.close >= prev.open
        {
            return None;
        }
        let signal = Signal::BullishReversal;
        Some(matched(self, bars, index, signal, trend_score(60.0, signal, ctx.trend)))
    }
}

/// Long white bar, then a black bar opening above its high and closing
/// below its midpoint but inside its body
#[derive(Debug, Clone, Copy, Default)]
pub struct DarkCloudCover;

impl CandlePattern for DarkCloudCover {
    fn id(&self) -> PatternId {
        PatternId("CDL_DARKCLOUDCOVER")
    }

    fn span(&self) -> usize {
        2
    }

    fn detect(&self, bars: &[Bar], index: usize, ctx: &CandleContext) -> Option<DetectedPattern> {
        let (prev, cur) = pair(bars, index)?;
        if !prev.is_bullish()
            || !cur.is_bearish()
            || !ctx.long_body(prev)
            || cur.open <= prev.high
            || cur.close >= midpoint(prev)
            || cur.close <= prev.open
        {
            return None;
        }
        let signal = Signal::BearishReversal;
        Some(matched(self, bars, index, signal, trend_score(60.0, signal, ctx.trend)))
    }
}

// ============================================================
// TWEEZERS
// ============================================================

/// Matching highs after an advance, white then black
#[derive(Debug, Clone, Copy, Default)]
pub struct TweezerTop;

impl CandlePattern for TweezerTop {
    fn id(&self) -> PatternId {
        PatternId("CDL_TWEEZERTOP")
    }

    fn span(&self) -> usize {
        2
    }

    fn detect(&self, bars: &[Bar], index: usize, ctx: &CandleContext) -> Option<DetectedPattern> {
        let (prev, cur) = pair(bars, index)?;
        if !ctx.trend.is_up()
            || !prev.is_bullish()
            || !cur.is_bearish()
            || !ctx.same_price(prev.high, cur.high)
        {
            return None;
        }
        let signal = Signal::BearishReversal;
        Some(matched(self, bars, index, signal, trend_score(55.0, signal, ctx.trend)))
    }
}

/// Matching lows after a decline, black then white
#[derive(Debug, Clone, Copy, Default)]
pub struct TweezerBottom;

impl CandlePattern for TweezerBottom {
    fn id(&self) -> PatternId {
        PatternId("CDL_TWEEZERBOTTOM")
    }

    fn span(&self) -> usize {
        2
    }

    fn detect(&self, bars: &[Bar], index: usize, ctx: &CandleContext) -> Option<DetectedPattern> {
        let (prev, cur) = pair(bars, index)?;
        if !ctx.trend.is_down()
            || !prev.is_bearish()
            || !cur.is_bullish()
            || !ctx.same_price(prev.low, cur.low)
        {
            return None;
        }
        let signal = Signal::BullishReversal;
        Some(matched(self, bars, index, signal, trend_score(55.0, signal, ctx.trend)))
    }
}
