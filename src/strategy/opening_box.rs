use crate::error::{EvaluationError, EvaluationResult};
use crate::models::{Candle, PriceBox};

/// Box range must stay below this fraction of daily ATR
pub const BOX_ATR_FRACTION: f64 = 0.25;

/// Build the opening-range box from the first `window` candles of a session
///
/// # Arguments
/// * `session` - Candles of one trading session, oldest first
/// * `window` - Number of opening candles that define the box (3 at 5-minute bars)
pub fn build_box(session: &[Candle], window: usize) -> EvaluationResult<PriceBox> {
    if window == 0 {
        return Err(EvaluationError::Other(
            "box window must contain at least one bar".to_string(),
        ));
    }

    if session.len() < window {
        return Err(EvaluationError::InsufficientData(format!(
            "session has {} bars, box needs {}",
            session.len(),
            window
        )));
    }

    let opening = &session[..window];
    let high = opening.iter().map(|c| c.high).fold(f64::MIN, f64::max);
    let low = opening.iter().map(|c| c.low).fold(f64::MAX, f64::min);

    Ok(PriceBox { high, low })
}

/// Widest box range that still passes the volatility filter (exclusive)
pub fn volatility_threshold(atr: f64) -> f64 {
    BOX_ATR_FRACTION * atr
}

/// True if the box is narrow enough relative to daily ATR to trade
pub fn is_volatility_valid(price_box: &PriceBox, atr: f64) -> bool {
    price_box.range() < volatility_threshold(atr)
}
