use crate::error::{EvaluationError, EvaluationResult};
use crate::indicators::{detect_bearish_reversal, detect_bullish_reversal};
use crate::models::{Candle, Direction, PriceBox, Signal};
use serde::{Deserialize, Serialize};
use std::fmt;

/// How far one evaluation progressed
///
/// The machine runs start to finish on every evaluation and keeps nothing
/// between runs.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum EvaluatorState {
    /// Box too wide relative to ATR
    AwaitingVolatilityPass,
    /// Price still inside the box
    AwaitingBreakout,
    /// Price broke out but the last candle is not a reversal
    AwaitingPattern,
    Signaled,
}

impl fmt::Display for EvaluatorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            EvaluatorState::AwaitingVolatilityPass => "awaiting volatility pass",
            EvaluatorState::AwaitingBreakout => "awaiting breakout",
            EvaluatorState::AwaitingPattern => "awaiting reversal pattern",
            EvaluatorState::Signaled => "signaled",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SignalOutcome {
    pub state: EvaluatorState,
    pub signal: Option<Signal>,
}

impl SignalOutcome {
    fn stopped(state: EvaluatorState) -> Self {
        Self {
            state,
            signal: None,
        }
    }
}

/// Evaluate the last candle of a session against the opening box
///
/// A close above the box can only produce a SHORT (bearish engulfing), a
/// close below it only a LONG (hammer first, then bullish engulfing). The
/// last candle is both the breakout candle and the pattern candle.
pub fn evaluate_signal(
    session: &[Candle],
    price_box: &PriceBox,
    volatility_valid: bool,
) -> EvaluationResult<SignalOutcome> {
    if !volatility_valid {
        return Ok(SignalOutcome::stopped(
            EvaluatorState::AwaitingVolatilityPass,
        ));
    }

    let (prev, curr) = match session {
        [.., prev, curr] => (prev, curr),
        _ => {
            return Err(EvaluationError::InsufficientData(format!(
                "signal check needs 2 bars, session has {}",
                session.len()
            )))
        }
    };

    let current_price = curr.close;

    let signal = if current_price > price_box.high {
        tracing::debug!(
            "Breakout up: {:.2} > box high {:.2}, checking bearish reversal",
            current_price,
            price_box.high
        );
        detect_bearish_reversal(prev, curr).map(|pattern| Signal {
            direction: Direction::Short,
            pattern,
            entry: curr.high,
            stop_loss: curr.high,
            take_profit: price_box.low,
            candle_time: curr.timestamp,
        })
    } else if current_price < price_box.low {
        tracing::debug!(
            "Breakout down: {:.2} < box low {:.2}, checking bullish reversal",
            current_price,
            price_box.low
        );
        detect_bullish_reversal(prev, curr).map(|pattern| Signal {
            direction: Direction::Long,
            pattern,
            entry: curr.low,
            stop_loss: curr.low,
            take_profit: price_box.high,
            candle_time: curr.timestamp,
        })
    } else {
        return Ok(SignalOutcome::stopped(EvaluatorState::AwaitingBreakout));
    };

    Ok(match signal {
        Some(signal) => SignalOutcome {
            state: EvaluatorState::Signaled,
            signal: Some(signal),
        },
        None => SignalOutcome::stopped(EvaluatorState::AwaitingPattern),
    })
}
