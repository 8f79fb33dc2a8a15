use chrono::{DateTime, FixedOffset, NaiveDate, Offset, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One OHLC candle as delivered by a data source
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Candle {
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Candle {
    /// Absolute body size
    pub fn body(&self) -> f64 {
        (self.close - self.open).abs()
    }

    /// Distance from the bottom of the body to the low
    pub fn lower_shadow(&self) -> f64 {
        self.open.min(self.close) - self.low
    }

    /// Distance from the top of the body to the high
    pub fn upper_shadow(&self) -> f64 {
        self.high - self.open.max(self.close)
    }

    pub fn is_bullish(&self) -> bool {
        self.close > self.open
    }

    pub fn is_bearish(&self) -> bool {
        self.close < self.open
    }
}

/// Bar resolution requested from a data source
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum BarInterval {
    #[serde(rename = "1m")]
    OneMinute,
    #[serde(rename = "5m")]
    FiveMinutes,
    #[serde(rename = "15m")]
    FifteenMinutes,
    #[serde(rename = "30m")]
    ThirtyMinutes,
    #[serde(rename = "60m")]
    OneHour,
    #[serde(rename = "1d")]
    OneDay,
}

impl BarInterval {
    /// Provider query value (e.g. "5m")
    pub fn as_str(&self) -> &'static str {
        match self {
            BarInterval::OneMinute => "1m",
            BarInterval::FiveMinutes => "5m",
            BarInterval::FifteenMinutes => "15m",
            BarInterval::ThirtyMinutes => "30m",
            BarInterval::OneHour => "60m",
            BarInterval::OneDay => "1d",
        }
    }

    /// Length of one bar in minutes
    pub fn minutes(&self) -> u32 {
        match self {
            BarInterval::OneMinute => 1,
            BarInterval::FiveMinutes => 5,
            BarInterval::FifteenMinutes => 15,
            BarInterval::ThirtyMinutes => 30,
            BarInterval::OneHour => 60,
            BarInterval::OneDay => 24 * 60,
        }
    }

    pub fn is_intraday(&self) -> bool {
        !matches!(self, BarInterval::OneDay)
    }
}

impl fmt::Display for BarInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BarInterval {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "1m" => Ok(BarInterval::OneMinute),
            "5m" => Ok(BarInterval::FiveMinutes),
            "15m" => Ok(BarInterval::FifteenMinutes),
            "30m" => Ok(BarInterval::ThirtyMinutes),
            "60m" | "1h" => Ok(BarInterval::OneHour),
            "1d" => Ok(BarInterval::OneDay),
            other => Err(format!("unsupported bar interval: {}", other)),
        }
    }
}

/// How far back to fetch
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum LookbackRange {
    #[serde(rename = "1d")]
    OneDay,
    #[serde(rename = "5d")]
    FiveDays,
    #[serde(rename = "1mo")]
    OneMonth,
    #[serde(rename = "3mo")]
    ThreeMonths,
}

impl LookbackRange {
    pub fn as_str(&self) -> &'static str {
        match self {
            LookbackRange::OneDay => "1d",
            LookbackRange::FiveDays => "5d",
            LookbackRange::OneMonth => "1mo",
            LookbackRange::ThreeMonths => "3mo",
        }
    }

    /// Approximate calendar days covered
    pub fn days(&self) -> i64 {
        match self {
            LookbackRange::OneDay => 1,
            LookbackRange::FiveDays => 5,
            LookbackRange::OneMonth => 31,
            LookbackRange::ThreeMonths => 92,
        }
    }
}

impl fmt::Display for LookbackRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LookbackRange {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "1d" => Ok(LookbackRange::OneDay),
            "5d" => Ok(LookbackRange::FiveDays),
            "1mo" => Ok(LookbackRange::OneMonth),
            "3mo" => Ok(LookbackRange::ThreeMonths),
            other => Err(format!("unsupported lookback range: {}", other)),
        }
    }
}

/// Chronologically ordered candles for one symbol at one resolution
///
/// Timestamps are stored in UTC; `utc_offset_secs` is the exchange offset
/// reported by the provider and decides which calendar date a candle
/// belongs to.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Series {
    pub symbol: String,
    pub interval: BarInterval,
    pub utc_offset_secs: i32,
    pub candles: Vec<Candle>,
}

impl Series {
    pub fn new(symbol: impl Into<String>, interval: BarInterval, candles: Vec<Candle>) -> Self {
        Self {
            symbol: symbol.into(),
            interval,
            utc_offset_secs: 0,
            candles,
        }
    }

    pub fn with_utc_offset(mut self, utc_offset_secs: i32) -> Self {
        self.utc_offset_secs = utc_offset_secs;
        self
    }

    /// Exchange offset, falling back to UTC for out-of-range values
    pub fn offset(&self) -> FixedOffset {
        FixedOffset::east_opt(self.utc_offset_secs).unwrap_or_else(|| Utc.fix())
    }

    /// Calendar date of a candle in exchange time
    pub fn local_date(&self, candle: &Candle) -> NaiveDate {
        candle.timestamp.with_timezone(&self.offset()).date_naive()
    }

    /// Calendar date of an arbitrary instant in exchange time
    pub fn date_at(&self, instant: DateTime<Utc>) -> NaiveDate {
        instant.with_timezone(&self.offset()).date_naive()
    }

    pub fn len(&self) -> usize {
        self.candles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candles.is_empty()
    }

    pub fn last(&self) -> Option<&Candle> {
        self.candles.last()
    }
}

/// Opening-range box
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct PriceBox {
    pub high: f64,
    pub low: f64,
}

impl PriceBox {
    pub fn range(&self) -> f64 {
        self.high - self.low
    }

    /// Where a price sits relative to the box (boundaries count as inside)
    pub fn position_of(&self, price: f64) -> PricePosition {
        if price > self.high {
            PricePosition::Above
        } else if price < self.low {
            PricePosition::Below
        } else {
            PricePosition::Inside
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum PricePosition {
    Inside,
    Above,
    Below,
}

impl fmt::Display for PricePosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PricePosition::Inside => f.write_str("INSIDE"),
            PricePosition::Above => f.write_str("ABOVE"),
            PricePosition::Below => f.write_str("BELOW"),
        }
    }
}

/// Trade direction
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Direction {
    Long,
    Short,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Long => f.write_str("LONG"),
            Direction::Short => f.write_str("SHORT"),
        }
    }
}

/// Reversal candle pattern that triggered a signal
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum PatternKind {
    Hammer,
    BullishEngulfing,
    BearishEngulfing,
}

impl fmt::Display for PatternKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PatternKind::Hammer => f.write_str("Hammer"),
            PatternKind::BullishEngulfing => f.write_str("Bullish Engulfing"),
            PatternKind::BearishEngulfing => f.write_str("Bearish Engulfing"),
        }
    }
}

/// Trade signal
///
/// Entry and stop loss are the same price: the strategy enters at the
/// signal candle's extreme and protects at that same level.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Signal {
    pub direction: Direction,
    pub pattern: PatternKind,
    pub entry: f64,
    pub stop_loss: f64,
    pub take_profit: f64,
    pub candle_time: DateTime<Utc>,
}

/// Whether the evaluated session is today's or a fallback to an older one
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum DataMode {
    Live,
    Historical,
}

impl fmt::Display for DataMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataMode::Live => f.write_str("LIVE"),
            DataMode::Historical => f.write_str("HISTORICAL"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candle(open: f64, high: f64, low: f64, close: f64) -> Candle {
        Candle {
            timestamp: Utc::now(),
            open,
            high,
            low,
            close,
            volume: 0.0,
        }
    }

    #[test]
    fn test_candle_components() {
        let c = candle(100.0, 101.0, 97.0, 100.5);
        assert!((c.body() - 0.5).abs() < 1e-9);
        assert!((c.lower_shadow() - 3.0).abs() < 1e-9);
        assert!((c.upper_shadow() - 0.5).abs() < 1e-9);
        assert!(c.is_bullish());
        assert!(!c.is_bearish());
    }

    #[test]
    fn test_price_box_position() {
        let b = PriceBox {
            high: 101.0,
            low: 99.8,
        };

        assert!((b.range() - 1.2).abs() < 1e-9);
        assert_eq!(b.position_of(101.0), PricePosition::Inside);
        assert_eq!(b.position_of(101.01), PricePosition::Above);
        assert_eq!(b.position_of(99.7), PricePosition::Below);
    }

    #[test]
    fn test_interval_parsing() {
        assert_eq!("5m".parse::<BarInterval>().unwrap(), BarInterval::FiveMinutes);
        assert_eq!(BarInterval::FiveMinutes.minutes(), 5);
        assert!(!BarInterval::OneDay.is_intraday());
        assert!("7m".parse::<BarInterval>().is_err());
        assert_eq!("1mo".parse::<LookbackRange>().unwrap(), LookbackRange::OneMonth);
    }

    #[test]
    fn test_series_local_date_uses_exchange_offset() {
        // 2024-03-05 02:00 UTC is still 2024-03-04 in New York (UTC-5)
        let ts = DateTime::parse_from_rfc3339("2024-03-05T02:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let mut c = candle(1.0, 1.0, 1.0, 1.0);
        c.timestamp = ts;

        let series = Series::new("SPY", BarInterval::FiveMinutes, vec![c]).with_utc_offset(-5 * 3600);
        assert_eq!(
            series.local_date(&c),
            NaiveDate::from_ymd_opt(2024, 3, 4).unwrap()
        );

        let utc_series = Series::new("SPY", BarInterval::FiveMinutes, vec![c]);
        assert_eq!(
            utc_series.local_date(&c),
            NaiveDate::from_ymd_opt(2024, 3, 5).unwrap()
        );
    }
}
