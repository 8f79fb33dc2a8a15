use super::MarketDataSource;
use crate::error::DataError;
use crate::models::{BarInterval, Candle, LookbackRange, Series};
use chrono::{DateTime, Datelike, Duration, FixedOffset, NaiveDate, Offset, Utc, Weekday};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// New York standard time
const EXCHANGE_UTC_OFFSET_SECS: i32 = -5 * 3600;
/// Regular session 09:30-16:00 exchange time, expressed in UTC
const SESSION_OPEN_UTC: (u32, u32) = (14, 30);
const SESSION_MINUTES: i64 = 390;

/// Offline data source producing reproducible random-walk candles
///
/// Only weekdays get bars. The anchor instant plays the role of "now": no
/// candle that would still be forming at the anchor is emitted.
#[derive(Debug, Clone)]
pub struct SyntheticSource {
    seed: u64,
    anchor: DateTime<Utc>,
    base_price: f64,
    base_volume: f64,
}

impl SyntheticSource {
    /// Create a new source with a seed for reproducibility
    pub fn new(seed: u64, anchor: DateTime<Utc>) -> Self {
        Self {
            seed,
            anchor,
            base_price: 450.0,
            base_volume: 1_000_000.0,
        }
    }

    fn rng_for(&self, symbol: &str, interval: BarInterval) -> StdRng {
        let salt = symbol
            .bytes()
            .fold(interval.minutes() as u64, |acc, b| acc.wrapping_mul(31).wrapping_add(b as u64));
        StdRng::seed_from_u64(self.seed ^ salt)
    }

    /// Trading days covered by `range`, oldest first, ending at the anchor date
    fn trading_days(&self, range: LookbackRange) -> Vec<NaiveDate> {
        let offset = FixedOffset::east_opt(EXCHANGE_UTC_OFFSET_SECS).unwrap_or_else(|| Utc.fix());
        let last = self.anchor.with_timezone(&offset).date_naive();
        let first = last - Duration::days(range.days() - 1);

        first
            .iter_days()
            .take_while(|d| *d <= last)
            .filter(|d| !matches!(d.weekday(), Weekday::Sat | Weekday::Sun))
            .collect()
    }

    fn session_open(date: NaiveDate) -> Option<DateTime<Utc>> {
        date.and_hms_opt(SESSION_OPEN_UTC.0, SESSION_OPEN_UTC.1, 0)
            .map(|dt| dt.and_utc())
    }

    fn generate_daily(&self, symbol: &str, range: LookbackRange) -> Vec<Candle> {
        let mut rng = self.rng_for(symbol, BarInterval::OneDay);
        let mut price = self.base_price;
        let mut candles = Vec::new();

        for date in self.trading_days(range) {
            let Some(timestamp) = Self::session_open(date) else {
                continue;
            };
            if timestamp > self.anchor {
                break;
            }

            let open = price;
            price *= 1.0 + rng.gen_range(-0.01..0.01); // ±1% daily
            candles.push(self.create_candle(&mut rng, open, price, 0.006, timestamp));
        }

        candles
    }

    fn generate_intraday(
        &self,
        symbol: &str,
        range: LookbackRange,
        interval: BarInterval,
    ) -> Vec<Candle> {
        let mut rng = self.rng_for(symbol, interval);
        let step = Duration::minutes(interval.minutes() as i64);
        let mut price = self.base_price;
        let mut candles = Vec::new();

        for date in self.trading_days(range) {
            let Some(open_time) = Self::session_open(date) else {
                continue;
            };
            let close_time = open_time + Duration::minutes(SESSION_MINUTES);

            let mut timestamp = open_time;
            while timestamp < close_time && timestamp + step <= self.anchor {
                let open = price;
                price *= 1.0 + rng.gen_range(-0.001..0.001); // ±0.1% per bar
                candles.push(self.create_candle(&mut rng, open, price, 0.0008, timestamp));
                timestamp = timestamp + step;
            }
        }

        candles
    }

    /// Build a candle around an open/close pair with random wicks
    fn create_candle(
        &self,
        rng: &mut StdRng,
        open: f64,
        close: f64,
        wick_pct: f64,
        timestamp: DateTime<Utc>,
    ) -> Candle {
        let high = open.max(close) * (1.0 + rng.gen_range(0.0..wick_pct));
        let low = open.min(close) * (1.0 - rng.gen_range(0.0..wick_pct));

        // Vary volume ±30%
        let volume = self.base_volume * rng.gen_range(0.7..1.3);

        Candle {
            timestamp,
            open,
            high,
            low,
            close,
            volume,
        }
    }
}

impl MarketDataSource for SyntheticSource {
    fn name(&self) -> &str {
        "Synthetic"
    }

    async fn fetch_bars(
        &self,
        symbol: &str,
        range: LookbackRange,
        interval: BarInterval,
    ) -> Result<Series, DataError> {
        let candles = if interval.is_intraday() {
            self.generate_intraday(symbol, range, interval)
        } else {
            self.generate_daily(symbol, range)
        };

        if candles.is_empty() {
            return Err(DataError::Empty {
                symbol: symbol.to_string(),
                interval: interval.to_string(),
            });
        }

        Ok(Series::new(symbol, interval, candles).with_utc_offset(EXCHANGE_UTC_OFFSET_SECS))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn anchor(s: &str) -> DateTime<Utc> {
        s.parse().unwrap()
    }

    #[tokio::test]
    async fn test_daily_has_enough_bars_for_atr() {
        // Tuesday afternoon
        let source = SyntheticSource::new(42, anchor("2024-03-05T18:00:00Z"));
        let daily = source
            .fetch_bars("SPY", LookbackRange::OneMonth, BarInterval::OneDay)
            .await
            .unwrap();

        assert!(daily.len() >= 15, "only {} daily bars", daily.len());
        assert_eq!(daily.utc_offset_secs, EXCHANGE_UTC_OFFSET_SECS);
    }

    #[tokio::test]
    async fn test_intraday_stops_at_anchor() {
        // 30 minutes after the open: 6 completed 5-minute bars today
        let anchor_time = anchor("2024-03-05T15:00:00Z");
        let source = SyntheticSource::new(42, anchor_time);
        let series = source
            .fetch_bars("SPY", LookbackRange::FiveDays, BarInterval::FiveMinutes)
            .await
            .unwrap();

        let today: NaiveDate = "2024-03-05".parse().unwrap();
        let today_bars = series
            .candles
            .iter()
            .filter(|c| series.local_date(c) == today)
            .count();

        assert_eq!(today_bars, 6);
        assert!(series.candles.iter().all(|c| c.timestamp < anchor_time));
    }

    #[tokio::test]
    async fn test_weekend_has_no_bars() {
        // Saturday: the latest session is Friday's full day
        let source = SyntheticSource::new(7, anchor("2024-03-09T18:00:00Z"));
        let series = source
            .fetch_bars("SPY", LookbackRange::FiveDays, BarInterval::FiveMinutes)
            .await
            .unwrap();

        let last = series.last().unwrap();
        assert_eq!(
            series.local_date(last),
            "2024-03-08".parse::<NaiveDate>().unwrap()
        );
        // Tue-Fri in a 5-day window ending Saturday, 78 bars each
        assert_eq!(series.len(), 4 * 78);
    }

    #[tokio::test]
    async fn test_reproducible_and_consistent() {
        let source = SyntheticSource::new(42, anchor("2024-03-05T20:00:00Z"));
        let a = source
            .fetch_bars("SPY", LookbackRange::FiveDays, BarInterval::FiveMinutes)
            .await
            .unwrap();
        let b = source
            .fetch_bars("SPY", LookbackRange::FiveDays, BarInterval::FiveMinutes)
            .await
            .unwrap();

        assert_eq!(a, b);

        for window in a.candles.windows(2) {
            assert!(window[1].timestamp > window[0].timestamp);
        }
        for candle in &a.candles {
            assert!(candle.high >= candle.open.max(candle.close));
            assert!(candle.low <= candle.open.min(candle.close));
            assert!(candle.low > 0.0);
        }
    }

    #[tokio::test]
    async fn test_anchor_before_any_session_is_empty() {
        // Sunday with a one-day range
        let source = SyntheticSource::new(42, anchor("2024-03-10T12:00:00Z"));
        let err = source
            .fetch_bars("SPY", LookbackRange::OneDay, BarInterval::FiveMinutes)
            .await
            .unwrap_err();

        assert!(matches!(err, DataError::Empty { .. }));
    }
}
