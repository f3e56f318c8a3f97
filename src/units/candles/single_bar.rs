//! Single-bar candlestick detectors
//!
//! Hammer / Hanging Man and Inverted Hammer / Shooting Star share a shape
//! and differ only by the preceding trend.

use super::helpers::dominant_shadow;
use super::{matched, trend_score, CandleContext, CandlePattern};
use crate::pattern::{DetectedPattern, PatternId, Signal};
use crate::series::Bar;
use crate::OHLCVExt;

/// Small body, very long lower shadow, almost no upper shadow
fn lower_pin(bar: &Bar, ctx: &CandleContext) -> bool {
    bar.range() > 0.0
        && ctx.short_body(bar)
        && dominant_shadow(bar.lower_shadow(), bar)
        && ctx.tiny_shadow(bar.upper_shadow(), bar)
}

/// Small body, very long upper shadow, almost no lower shadow
fn upper_pin(bar: &Bar, ctx: &CandleContext) -> bool {
    bar.range() > 0.0
        && ctx.short_body(bar)
        && dominant_shadow(bar.upper_shadow(), bar)
        && ctx.tiny_shadow(bar.lower_shadow(), bar)
}

// ============================================================
// DOJI
// ============================================================

/// Open and close (nearly) equal. Neutral; stronger after a trend.
#[derive(Debug, Clone, Copy, Default)]
pub struct Doji;

impl CandlePattern for Doji {
    fn id(&self) -> PatternId {
        PatternId("CDL_DOJI")
    }

    fn span(&self) -> usize {
        1
    }

    fn detect(&self, bars: &[Bar], index: usize, ctx: &CandleContext) -> Option<DetectedPattern> {
        let bar = bars.get(index)?;
        if bar.range() <= 0.0 || !ctx.is_doji(bar) {
            return None;
        }
        let strength = if ctx.trend.is_up() || ctx.trend.is_down() { 60 } else { 50 };
        Some(matched(self, bars, index, Signal::Neutral, strength))
    }
}

// ============================================================
// HAMMER FAMILY
// ============================================================

/// Lower pin after a decline
#[derive(Debug, Clone, Copy, Default)]
pub struct Hammer;

impl CandlePattern for Hammer {
    fn id(&self) -> PatternId {
        PatternId("CDL_HAMMER")
    }

    fn span(&self) -> usize {
        1
    }

    fn detect(&self, bars: &[Bar], index: usize, ctx: &CandleContext) -> Option<DetectedPattern> {
        let bar = bars.get(index)?;
        if !ctx.trend.is_down() || !lower_pin(bar, ctx) {
            return None;
        }
        let signal = Signal::BullishReversal;
        Some(matched(self, bars, index, signal, trend_score(60.0, signal, ctx.trend)))
    }
}

/// Lower pin after an advance
#[derive(Debug, Clone, Copy, Default)]
pub struct HangingMan;

impl CandlePattern for HangingMan {
    fn id(&self) -> PatternId {
        PatternId("CDL_HANGINGMAN")
    }

    fn span(&self) -> usize {
        1
    }

    fn detect(&self, bars: &[Bar], index: usize, ctx: &CandleContext) -> Option<DetectedPattern> {
        let bar = bars.get(index)?;
        if !ctx.trend.is_up() || !lower_pin(bar, ctx) {
            return None;
        }
        let signal = Signal::BearishReversal;
        Some(matched(self, bars, index, signal, trend_score(60.0, signal, ctx.trend)))
    }
}

/// Upper pin after a decline
#[derive(Debug, Clone, Copy, Default)]
pub struct InvertedHammer;

impl CandlePattern for InvertedHammer {
    fn id(&self) -> PatternId {
        PatternId("CDL_INVERTEDHAMMER")
    }

    fn span(&self) -> usize {
        1
    }

    fn detect(&self, bars: &[Bar], index: usize, ctx: &CandleContext) -> Option<DetectedPattern> {
        let bar = bars.get(index)?;
        if !ctx.trend.is_down() || !upper_pin(bar, ctx) {
            return None;
        }
        let signal = Signal::BullishReversal;
        // weaker than the hammer until confirmed
        Some(matched(self, bars, index, signal, trend_score(55.0, signal, ctx.trend)))
    }
}

/// Upper pin after an advance
#[derive(Debug, Clone, Copy, Default)]
pub struct ShootingStar;

impl CandlePattern for ShootingStar {
    fn id(&self) -> PatternId {
        PatternId("CDL_SHOOTINGSTAR")
    }

    fn span(&self) -> usize {
        1
    }

    fn detect(&self, bars: &[Bar], index: usize, ctx: &CandleContext) -> Option<DetectedPattern> {
        let bar = bars.get(index)?;
        if !ctx.trend.is_up() || !upper_pin(bar, ctx) {
            return None;
        }
        let signal = Signal::BearishReversal;
        Some(matched(self, bars, index, signal, trend_score(60.0, signal, ctx.trend)))
    }
}

// ============================================================
// MARUBOZU
// ============================================================

/// Long body with no meaningful shadows; continuation in its colour
#[derive(Debug, Clone, Copy, Default)]
pub struct Marubozu;

impl CandlePattern for Marubozu {
    fn id(&self) -> PatternId {
        PatternId("CDL_MARUBOZU")
    }

    fn span(&self) -> usize {
        1
    }

    fn detect(&self, bars: &[Bar], index: usize, ctx: &CandleContext) -> Option<DetectedPattern> {
        let bar = bars.get(index)?;
        if bar.range() <= 0.0
            || !ctx.long_body(bar)
            || !ctx.tiny_shadow(bar.upper_shadow(), bar)
            || !ctx.tiny_shadow(bar.lower_shadow(), bar)
        {
            return None;
        }
        let signal = if bar.is_bullish() {
            Signal::BullishContinuation
        } else {
            Signal::BearishContinuation
        };
        Some(matched(self, bars, index, signal, trend_score(60.0, signal, ctx.trend)))
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{downtrend, uptrend};
    use super::*;

    fn ctx_at(bars: &[Bar], index: usize) -> CandleContext {
        CandleContext::for_span(bars, index)
    }

    #[test]
    fn test_doji() {
        let mut bars = downtrend(20);
        let c = bars[19].close;
        bars[19] = Bar::new(c, c + 0.5, c - 0.5, c + 0.01, 1);
        let found = Doji.detect(&bars, 19, &ctx_at(&bars, 19)).unwrap();
        assert_eq!(found.signal, Signal::Neutral);
        assert_eq!(found.strength, 60);
        assert!(found.levels.invalidation.is_none());
    }

    #[test]
    fn test_pin_shapes_follow_trend() {
        let mut down = downtrend(20);
        let c = down[19].close;
        down[19] = Bar::new(c - 0.1, c + 0.02, c - 3.0, c, 1);
        let ctx = ctx_at(&down, 19);
        assert!(Hammer.detect(&down, 19, &ctx).is_some());
        assert!(HangingMan.detect(&down, 19, &ctx).is_none());

        let mut up = uptrend(20);
        let c = up[19].close;
        up[19] = Bar::new(c - 0.1, c + 0.02, c - 3.0, c, 1);
        let ctx = ctx_at(&up, 19);
        let hanging = HangingMan.detect(&up, 19, &ctx).unwrap();
        assert_eq!(hanging.signal, Signal::BearishReversal);
        assert!(Hammer.detect(&up, 19, &ctx).is_none());
    }

    #[test]
    fn test_shooting_star_levels() {
        let mut up = uptrend(20);
        let c = up[19].close;
        up[19] = Bar::new(c, c + 3.0, c - 0.12, c - 0.1, 1);
        let star = ShootingStar.detect(&up, 19, &ctx_at(&up, 19)).unwrap();
        assert_eq!(star.strength, 80);
        assert_eq!(
            star.levels.invalidation,
            Some(crate::math::to_decimal(c + 3.0))
        );
        assert!(InvertedHammer.detect(&up, 19, &ctx_at(&up, 19)).is_none());
    }

    #[test]
    fn test_marubozu_direction() {
        let mut up = uptrend(20);
        let c = up[19].close;
        up[19] = Bar::new(c, c + 2.0, c, c + 2.0, 1);
        let found = Marubozu.detect(&up, 19, &ctx_at(&up, 19)).unwrap();
        assert_eq!(found.signal, Signal::BullishContinuation);
        assert_eq!(found.strength, 80);
    }
}
