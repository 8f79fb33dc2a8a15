/// Reversal candlestick patterns used by the box breakout strategy
///
/// All checks use strict inequalities, so a zero-body candle never
/// classifies as any pattern.

use crate::models::{Candle, PatternKind};

/// Lower shadow must exceed this multiple of the body
const HAMMER_SHADOW_RATIO: f64 = 2.0;
/// Upper shadow must stay below this fraction of the body
const HAMMER_UPPER_SHADOW_RATIO: f64 = 0.3;

/// Hammer: small body near the top, long lower shadow, almost no upper shadow
pub fn is_hammer(candle: &Candle) -> bool {
    let body = candle.body();

    body > 0.0
        && candle.lower_shadow() > HAMMER_SHADOW_RATIO * body
        && candle.upper_shadow() < HAMMER_UPPER_SHADOW_RATIO * body
}

/// Bearish candle followed by a bullish candle whose body contains it
pub fn is_bullish_engulfing(prev: &Candle, curr: &Candle) -> bool {
    prev.is_bearish()
        && curr.is_bullish()
        && curr.open < prev.close
        && curr.close > prev.open
}

/// Bullish candle followed by a bearish candle whose body contains it
pub fn is_bearish_engulfing(prev: &Candle, curr: &Candle) -> bool {
    prev.is_bullish()
        && curr.is_bearish()
        && curr.open > prev.close
        && curr.close < prev.open
}

/// Long-side reversal on `curr`, hammer taking priority over engulfing
pub fn detect_bullish_reversal(prev: &Candle, curr: &Candle) -> Option<PatternKind> {
    if is_hammer(curr) {
        Some(PatternKind::Hammer)
    } else if is_bullish_engulfing(prev, curr) {
        Some(PatternKind::BullishEngulfing)
    } else {
        None
    }
}

/// Short-side reversal on `curr`
pub fn detect_bearish_reversal(prev: &Candle, curr: &Candle) -> Option<PatternKind> {
    is_bearish_engulfing(prev, curr).then_some(PatternKind::BearishEngulfing)
}
