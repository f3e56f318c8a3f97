//! Three-bar candlestick detectors: stars, soldiers and crows

use super::helpers::STAR_PENETRATION;
use super::{matched, trend_score, CandleContext, CandlePattern};
use crate::pattern::{DetectedPattern, PatternId, Signal};
use crate::series::Bar;
use crate::OHLCVExt;

#[inline]
fn triple(bars: &[Bar], index: usize) -> Option<(&Bar, &Bar, &Bar)> {
  if index < 2 {
    return None;
  }
  Some((bars.get(index - 2)?, bars.get(index - 1)?, bars.get(index)?))
}

// ============================================================
// MORNING STAR / EVENING STAR
// ============================================================

/// Long black bar, a short body gapping below it, then a white bar
/// recovering into the first body
#[derive(Debug, Clone, Copy, Default)]
pub struct MorningStar;

impl CandlePattern for MorningStar {
  fn id(&self) -> PatternId {
    PatternId("CDL_MORNINGSTAR")
  }

  fn span(&self) -> usize {
    3
  }

  fn detect(&self, bars: &[Bar], index: usize, ctx: &CandleContext) -> Option<DetectedPattern> {
    let (first, second, third) = triple(bars, index)?;

    if !first.is_bearish() || !third.is_bullish() {
      return None;
    }
    if !ctx.long_body(first) {
      return None;
    }
    if !ctx.short_body(second) {
      return None;
    }
    // star body gaps below the first body
    if second.body_top() >= first.body_bottom() {
      return None;
    }
    if third.body() <= ctx.avg_body {
      return None;
    }
    if third.close <= first.close + first.body() * STAR_PENETRATION {
      return None;
    }

    let signal = Signal::BullishReversal;
    Some(matched(self, bars, index, signal, trend_score(65.0, signal, ctx.trend)))
  }
}

/// Long white bar, a short body gapping above it, then a black bar
/// falling into the first body
#[derive(Debug, Clone, Copy, Default)]
pub struct EveningStar;

impl CandlePattern for EveningStar {
  fn id(&self) -> PatternId {
    PatternId("CDL_EVENINGSTAR")
  }

  fn span(&self) -> usize {
    3
  }

  fn detect(&self, bars: &[Bar], index: usize, ctx: &CandleContext) -> Option<DetectedPattern> {
    let (first, second, third) = triple(bars, index)?;

    if !first.is_bullish() || !third.is_bearish() {
      return None;
    }
    if !ctx.long_body(first) {
      return None;
    }
    if !ctx.short_body(second) {
      return None;
    }
    if second.body_bottom() <= first.body_top() {
      return None;
    }
    if third.body() <= ctx.avg_body {
      return None;
    }
    if third.close >= first.close - first.body() * STAR_PENETRATION {
      return None;
    }

    let signal = Signal::BearishReversal;
    Some(matched(self, bars, index, signal, trend_score(65.0, signal, ctx.trend)))
  }
}

// ============================================================
// THREE WHITE SOLDIERS / THREE BLACK CROWS
// ============================================================

/// Three white bars with rising closes, each opening inside the prior
/// body and closing near its high. Reversal after a decline,
/// continuation otherwise.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreeWhiteSoldiers;

impl CandlePattern for ThreeWhiteSoldiers {
  fn id(&self) -> PatternId {
    PatternId("CDL_3WHITESOLDIERS")
  }

  fn span(&self) -> usize {
    3
  }

  fn detect(&self, bars: &[Bar], index: usize, ctx: &CandleContext) -> Option<DetectedPattern> {
    let (first, second, third) = triple(bars, index)?;

    if !first.is_bullish() || !second.is_bullish() || !third.is_bullish() {
      return None;
    }
    if second.close <= first.close || third.close <= second.close {
      return None;
    }
    if second.open <= first.open || second.open > first.close {
      return None;
    }
    if third.open <= second.open || third.open > second.close {
      return None;
    }
    if [first, second, third]
      .iter()
      .any(|b| !ctx.tiny_shadow(b.upper_shadow(), b))
    {
      return None;
    }
    if third.body() < ctx.avg_body {
      return None;
    }

    let signal = if ctx.trend.is_down() {
      Signal::BullishReversal
    } else {
      Signal::BullishContinuation
    };
    Some(matched(self, bars, index, signal, trend_score(65.0, signal, ctx.trend)))
  }
}

/// Mirror of [`ThreeWhiteSoldiers`]
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreeBlackCrows;

impl CandlePattern for ThreeBlackCrows {
  fn id(&self) -> PatternId {
    PatternId("CDL_3BLACKCROWS")
  }

  fn span(&self) -> usize {
    3
  }

  fn detect(&self, bars: &[Bar], index: usize, ctx: &CandleContext) -> Option<DetectedPattern> {
    let (first, second, third) = triple(bars, index)?;

    if !first.is_bearish() || !second.is_bearish() || !third.is_bearish() {
      return None;
    }
    if second.close >= first.close || third.close >= second.close {
      return None;
    }
    if second.open >= first.open || second.open < first.close {
      return None;
    }
    if third.open >= second.open || third.open < second.close {
      return None;
    }
    if [first, second, third]
      .iter()
      .any(|b| !ctx.tiny_shadow(b.lower_shadow(), b))
    {
      return None;
    }
    if third.body() < ctx.avg_body {
      return None;
    }

    let signal = if ctx.trend.is_up() {
      Signal::BearishReversal
    } else {
      Signal::BearishContinuation
    };
    Some(matched(self, bars, index, signal, trend_score(65.0, signal, ctx.trend)))
  }
}

#[cfg(test)]
mod tests {
  use super::super::test_support::downtrend;
  use super::*;
  use crate::pattern::PatternCategory;

  #[test]
  fn test_morning_star() {
    let mut bars = downtrend(20);
    let b = bars[16].close;
    bars[17] = Bar::new(b + 1.5, b + 1.6, b - 0.6, b - 0.5, 1);
    bars[18] = Bar::new(b - 1.0, b - 0.8, b - 1.2, b - 0.9, 1);
    bars[19] = Bar::new(b - 0.8, b + 0.9, b - 0.85, b + 0.8, 1);
    let ctx = CandleContext::for_span(&bars, 17);
    let found = MorningStar.detect(&bars, 19, &ctx).unwrap();
    assert_eq!(found.signal, Signal::BullishReversal);
    assert_eq!(found.category, PatternCategory::ThreeBar);
    assert_eq!(found.start_index, 17);
    assert_eq!(found.strength, 85);
    assert!(EveningStar.detect(&bars, 19, &ctx).is_none());
  }

  #[test]
  fn test_three_white_soldiers_after_decline() {
    let mut bars = downtrend(20);
    let b = bars[16].close;
    bars[17] = Bar::new(b, b + 1.02, b - 0.1, b + 1.0, 1);
    bars[18] = Bar::new(b + 0.5, b + 1.62, b + 0.4, b + 1.6, 1);
    bars[19] = Bar::new(b + 1.2, b + 2.32, b + 1.1, b + 2.3, 1);
    let ctx = CandleContext::for_span(&bars, 17);
    let found = ThreeWhiteSoldiers.detect(&bars, 19, &ctx).unwrap();
    assert_eq!(found.signal, Signal::BullishReversal);
    assert_eq!(found.strength, 85);
    assert!(ThreeBlackCrows.detect(&bars, 19, &ctx).is_none());
  }

  #[test]
  fn test_soldiers_reject_long_upper_shadow() {
    let mut bars = downtrend(20);
    let b = bars[16].close;
    bars[17] = Bar::new(b, b + 1.02, b - 0.1, b + 1.0, 1);
    bars[18] = Bar::new(b + 0.5, b + 2.5, b + 0.4, b + 1.6, 1);
    bars[19] = Bar::new(b + 1.2, b + 2.32, b + 1.1, b + 2.3, 1);
    let ctx = CandleContext::for_span(&bars, 17);
    assert!(ThreeWhiteSoldiers.detect(&bars, 19, &ctx).is_none());
  }
}
