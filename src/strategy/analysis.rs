use super::opening_box::{build_box, is_volatility_valid, volatility_threshold};
use super::session::{select_session, Session};
use super::signals::{evaluate_signal, EvaluatorState};
use super::StrategyConfig;
use crate::error::{EvaluationError, EvaluationResult};
use crate::indicators::calculate_atr;
use crate::models::{BarInterval, DataMode, PriceBox, PricePosition, Series, Signal};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Complete result of one evaluation, handed to presentation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Analysis {
    pub symbol: String,
    pub interval: BarInterval,
    pub atr: f64,
    pub price_box: PriceBox,
    pub volatility_threshold: f64,
    pub volatility_valid: bool,
    pub current_price: f64,
    pub price_position: PricePosition,
    pub state: EvaluatorState,
    pub signal: Option<Signal>,
    pub session: Session,
    pub mode: DataMode,
}

impl Analysis {
    /// Box range as a percentage of daily ATR
    pub fn box_atr_pct(&self) -> f64 {
        if self.atr > 0.0 {
            self.price_box.range() / self.atr * 100.0
        } else {
            0.0
        }
    }

    pub fn data_points(&self) -> usize {
        self.session.len()
    }

    /// Minutes covered by the session's candles
    pub fn time_span_minutes(&self) -> u32 {
        self.session.len() as u32 * self.interval.minutes()
    }

    pub fn is_live(&self) -> bool {
        self.mode == DataMode::Live
    }
}

/// Run the numeric pipeline over already-fetched series
///
/// # Arguments
/// * `daily` - Daily candles for ATR (at least `atr_period + 1`)
/// * `intraday` - Intraday candles, possibly spanning several sessions
/// * `as_of` - Current calendar date in exchange time
/// * `config` - ATR period and box window
///
/// Pure and deterministic: identical inputs give identical results.
pub fn analyze(
    daily: &Series,
    intraday: &Series,
    as_of: NaiveDate,
    config: &StrategyConfig,
) -> EvaluationResult<Analysis> {
    let atr = calculate_atr(&daily.candles, config.atr_period).ok_or_else(|| {
        EvaluationError::InsufficientData(format!(
            "{} daily bars, ATR({}) needs {}",
            daily.len(),
            config.atr_period,
            config.atr_period + 1
        ))
    })?;
    tracing::debug!("ATR({}) = {:.4}", config.atr_period, atr);

    let (session, mode) = select_session(intraday, as_of, config.min_session_bars())?;

    let price_box = build_box(&session.candles, config.box_window_bars)?;
    let volatility_valid = is_volatility_valid(&price_box, atr);

    let current_price = session
        .candles
        .last()
        .map(|c| c.close)
        .ok_or_else(|| EvaluationError::InsufficientData("selected session is empty".into()))?;

    let outcome = evaluate_signal(&session.candles, &price_box, volatility_valid)?;

    Ok(Analysis {
        symbol: intraday.symbol.clone(),
        interval: intraday.interval,
        atr,
        price_box,
        volatility_threshold: volatility_threshold(atr),
        volatility_valid,
        current_price,
        price_position: price_box.position_of(current_price),
        state: outcome.state,
        signal: outcome.signal,
        session,
        mode,
    })
}
