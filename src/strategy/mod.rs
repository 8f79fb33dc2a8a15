// ATR box scalping strategy
pub mod analysis;
pub mod opening_box;
pub mod session;
pub mod signals;

pub use analysis::{analyze, Analysis};
pub use opening_box::{build_box, is_volatility_valid, volatility_threshold, BOX_ATR_FRACTION};
pub use session::{partition_by_date, select_session, Session};
pub use signals::{evaluate_signal, EvaluatorState, SignalOutcome};

use crate::indicators::DEFAULT_ATR_PERIOD;
use crate::models::BarInterval;

/// Parameters of the numeric core
#[derive(Debug, Clone, PartialEq)]
pub struct StrategyConfig {
    /// Daily bars averaged into ATR
    pub atr_period: usize,
    /// Opening intraday bars that define the box
    pub box_window_bars: usize,
}

impl Default for StrategyConfig {
    fn default() -> Self {
        Self {
            atr_period: DEFAULT_ATR_PERIOD,
            box_window_bars: 3, // 15 minutes of 5-minute bars
        }
    }
}

impl StrategyConfig {
    /// Derive the box window from an opening-range length and bar interval
    ///
    /// # Example
    /// ```
    /// use atrbox::models::BarInterval;
    /// use atrbox::strategy::StrategyConfig;
    ///
    /// let config = StrategyConfig::from_opening_range(14, 15, BarInterval::FiveMinutes).unwrap();
    /// assert_eq!(config.box_window_bars, 3);
    /// ```
    pub fn from_opening_range(
        atr_period: usize,
        opening_range_minutes: u32,
        interval: BarInterval,
    ) -> Result<Self, String> {
        if !interval.is_intraday() {
            return Err(format!("box interval must be intraday, got {}", interval));
        }

        let bar_minutes = interval.minutes();
        if opening_range_minutes == 0 || opening_range_minutes % bar_minutes != 0 {
            return Err(format!(
                "opening range of {} minutes is not a whole number of {} bars",
                opening_range_minutes, interval
            ));
        }

        if atr_period == 0 {
            return Err("ATR period must be at least 1".to_string());
        }

        Ok(Self {
            atr_period,
            box_window_bars: (opening_range_minutes / bar_minutes) as usize,
        })
    }

    /// Session floor: the box window plus one candle to test for a breakout
    pub fn min_session_bars(&self) -> usize {
        self.box_window_bars + 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_matches_five_minute_bars() {
        let derived = StrategyConfig::from_opening_range(14, 15, BarInterval::FiveMinutes).unwrap();
        assert_eq!(derived, StrategyConfig::default());
        assert_eq!(derived.min_session_bars(), 4);
    }

    #[test]
    fn test_window_scales_with_interval() {
        let one_minute = StrategyConfig::from_opening_range(14, 15, BarInterval::OneMinute).unwrap();
        assert_eq!(one_minute.box_window_bars, 15);

        let thirty = StrategyConfig::from_opening_range(14, 30, BarInterval::FifteenMinutes).unwrap();
        assert_eq!(thirty.box_window_bars, 2);
    }

    #[test]
    fn test_rejects_uneven_or_daily_windows() {
        assert!(StrategyConfig::from_opening_range(14, 15, BarInterval::ThirtyMinutes).is_err());
        assert!(StrategyConfig::from_opening_range(14, 0, BarInterval::FiveMinutes).is_err());
        assert!(StrategyConfig::from_opening_range(14, 15, BarInterval::OneDay).is_err());
        assert!(StrategyConfig::from_opening_range(0, 15, BarInterval::FiveMinutes).is_err());
    }
}
