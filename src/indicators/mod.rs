// Technical indicators module
// ATR volatility filter and reversal candle patterns

pub mod atr;
pub mod patterns;

pub use atr::{calculate_atr, true_ranges, DEFAULT_ATR_PERIOD};
pub use patterns::{
    detect_bearish_reversal, detect_bullish_reversal, is_bearish_engulfing, is_bullish_engulfing,
    is_hammer,
};
