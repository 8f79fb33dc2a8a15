/// Average True Range (ATR) indicator
///
/// Measures market volatility by averaging true ranges over a period.
/// True Range is the greatest of:
/// - Current High - Current Low
/// - Abs(Current High - Previous Close)
/// - Abs(Current Low - Previous Close)
///
/// The first candle has no previous close, so it contributes no true range.
/// ATR here is the simple moving average of the trailing `period` true ranges.

use crate::models::Candle;

pub const DEFAULT_ATR_PERIOD: usize = 14;

/// True range for every candle after the first
pub fn true_ranges(candles: &[Candle]) -> Vec<f64> {
    candles
        .windows(2)
        .map(|pair| {
            let prev_close = pair[0].close;
            let high = pair[1].high;
            let low = pair[1].low;

            (high - low)
                .max((high - prev_close).abs())
                .max((low - prev_close).abs())
        })
        .collect()
}

/// Calculate ATR for the given candles
///
/// Returns the ATR at the last candle, or None if fewer than `period + 1`
/// candles are available (the window cannot fill)
pub fn calculate_atr(candles: &[Candle], period: usize) -> Option<f64> {
    if period == 0 || candles.len() < period + 1 {
        return None;
    }

    let trs = true_ranges(candles);
    let window = &trs[trs.len() - period..];

    Some(window.iter().sum::<f64>() / period as f64)
}
