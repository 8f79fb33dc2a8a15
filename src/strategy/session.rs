use crate::error::{EvaluationError, EvaluationResult};
use crate::models::{Candle, DataMode, Series};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// All intraday candles of one calendar trading date
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Session {
    pub date: NaiveDate,
    pub candles: Vec<Candle>,
}

impl Session {
    pub fn len(&self) -> usize {
        self.candles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candles.is_empty()
    }
}

/// Group a series by calendar date in the exchange's offset
pub fn partition_by_date(series: &Series) -> BTreeMap<NaiveDate, Vec<Candle>> {
    let mut sessions: BTreeMap<NaiveDate, Vec<Candle>> = BTreeMap::new();

    for candle in &series.candles {
        sessions
            .entry(series.local_date(candle))
            .or_default()
            .push(*candle);
    }

    sessions
}

/// Pick the session to evaluate
///
/// Uses the `as_of` date's session when it has at least `min_bars` candles
/// (live). Otherwise falls back to the most recent date that does
/// (historical).
pub fn select_session(
    series: &Series,
    as_of: NaiveDate,
    min_bars: usize,
) -> EvaluationResult<(Session, DataMode)> {
    let mut sessions = partition_by_date(series);

    if let Some(candles) = sessions.remove(&as_of) {
        if candles.len() >= min_bars {
            return Ok((
                Session {
                    date: as_of,
                    candles,
                },
                DataMode::Live,
            ));
        }
        tracing::debug!(
            "Session {} has only {} bars (need {}), looking for an earlier one",
            as_of,
            candles.len(),
            min_bars
        );
    }

    sessions
        .into_iter()
        .rev()
        .find(|(_, candles)| candles.len() >= min_bars)
        .map(|(date, candles)| (Session { date, candles }, DataMode::Historical))
        .ok_or(EvaluationError::NoSessionData { min_bars })
}
