use super::MarketDataSource;
use crate::error::DataError;
use crate::models::{BarInterval, Candle, LookbackRange, Series};
use chrono::DateTime;
use governor::{Quota, RateLimiter};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

pub const YAHOO_API_BASE: &str = "https://query2.finance.yahoo.com";
const MAX_RETRIES: u32 = 3;
const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";

type YahooRateLimiter = RateLimiter<
    governor::state::direct::NotKeyed,
    governor::state::InMemoryState,
    governor::clock::DefaultClock,
>;

// ============== Response Types ==============

#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: ChartResult,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    result: Option<Vec<ChartData>>,
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    code: String,
    description: String,
}

#[derive(Debug, Deserialize)]
struct ChartData {
    meta: Option<ChartMeta>,
    timestamp: Option<Vec<i64>>,
    indicators: Indicators,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChartMeta {
    #[serde(default)]
    gmtoffset: Option<i32>,
    #[serde(default)]
    exchange_timezone_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    quote: Vec<QuoteData>,
}

#[derive(Debug, Deserialize)]
struct QuoteData {
    #[serde(default)]
    open: Vec<Option<f64>>,
    #[serde(default)]
    high: Vec<Option<f64>>,
    #[serde(default)]
    low: Vec<Option<f64>>,
    #[serde(default)]
    close: Vec<Option<f64>>,
    #[serde(default)]
    volume: Vec<Option<f64>>,
}

// ============== Implementation ==============

/// Yahoo Finance v8 chart API client
///
/// Cloneable; all clones share one rate limiter.
#[derive(Clone)]
pub struct YahooClient {
    client: Client,
    base_url: String,
    rate_limiter: Arc<YahooRateLimiter>,
    retry_delay: Duration,
}

impl YahooClient {
    pub fn new(
        base_url: impl Into<String>,
        timeout: Duration,
        requests_per_minute: u32,
    ) -> Result<Self, DataError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| DataError::Other(format!("failed to build HTTP client: {}", e)))?;

        let rpm = NonZeroU32::new(requests_per_minute).unwrap_or(NonZeroU32::MIN);
        let rate_limiter = Arc::new(RateLimiter::direct(Quota::per_minute(rpm)));

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            rate_limiter,
            retry_delay: Duration::from_secs(1),
        })
    }

    /// Base delay for exponential backoff between retries
    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    fn chart_url(&self, symbol: &str, range: LookbackRange, interval: BarInterval) -> String {
        format!(
            "{}/v8/finance/chart/{}?range={}&interval={}&includePrePost=false",
            self.base_url, symbol, range, interval
        )
    }

    /// Make a rate-limited request, retrying on 429, 5xx and network errors
    async fn make_request(&self, symbol: &str, url: &str) -> Result<reqwest::Response, DataError> {
        let mut last_error = DataError::Other("no request attempted".to_string());

        for attempt in 1..=MAX_RETRIES {
            if attempt > 1 {
                let backoff = self.retry_delay * 2u32.pow(attempt - 2);
                tokio::time::sleep(backoff).await;
            }

            self.rate_limiter.until_ready().await;

            match self.client.get(url).send().await {
                Ok(response) => {
                    let status = response.status();

                    if status.is_success() {
                        return Ok(response);
                    }

                    if status == StatusCode::NOT_FOUND {
                        return Err(DataError::SymbolNotFound {
                            symbol: symbol.to_string(),
                        });
                    }

                    if status == StatusCode::TOO_MANY_REQUESTS {
                        tracing::warn!(
                            "Rate limited by Yahoo (429) (attempt {}/{})",
                            attempt,
                            MAX_RETRIES
                        );
                        last_error = DataError::RateLimited { attempts: attempt };
                        continue;
                    }

                    if status.is_server_error() {
                        tracing::warn!(
                            "Server error {} from Yahoo (attempt {}/{})",
                            status,
                            attempt,
                            MAX_RETRIES
                        );
                        last_error = DataError::Other(format!("HTTP {} for {}", status, symbol));
                        continue;
                    }

                    // Other 4xx - don't retry
                    let error_text = response
                        .text()
                        .await
                        .unwrap_or_else(|_| "Unknown error".to_string());
                    return Err(DataError::Other(format!(
                        "Yahoo API error ({}): {}",
                        status, error_text
                    )));
                }
                Err(e) => {
                    tracing::warn!(
                        "Network error: {} (attempt {}/{})",
                        e,
                        attempt,
                        MAX_RETRIES
                    );
                    last_error = DataError::NetworkUnreachable(e.to_string());
                }
            }
        }

        Err(last_error)
    }
}

impl MarketDataSource for YahooClient {
    fn name(&self) -> &str {
        "Yahoo Finance"
    }

    async fn fetch_bars(
        &self,
        symbol: &str,
        range: LookbackRange,
        interval: BarInterval,
    ) -> Result<Series, DataError> {
        let url = self.chart_url(symbol, range, interval);
        tracing::debug!("Fetching {} {} bars over {}", symbol, interval, range);

        let response = self.make_request(symbol, &url).await?;
        let chart: ChartResponse = response.json().await.map_err(|e| {
            DataError::ResponseFormatChanged(format!("failed to parse chart for {}: {}", symbol, e))
        })?;

        let series = parse_chart(symbol, interval, chart)?;
        tracing::debug!("Fetched {} {} bars for {}", series.len(), interval, symbol);

        Ok(series)
    }
}

/// Flatten the provider's columnar quote arrays into candles
///
/// Rows with any missing or non-positive OHLC value are dropped. Duplicate
/// timestamps keep the later row.
fn parse_chart(
    symbol: &str,
    interval: BarInterval,
    response: ChartResponse,
) -> Result<Series, DataError> {
    let result = response.chart.result.ok_or_else(|| match response.chart.error {
        Some(err) if err.code == "Not Found" => DataError::SymbolNotFound {
            symbol: symbol.to_string(),
        },
        Some(err) => DataError::ResponseFormatChanged(format!("{}: {}", err.code, err.description)),
        None => DataError::ResponseFormatChanged("empty result with no error".into()),
    })?;

    let data = result
        .into_iter()
        .next()
        .ok_or_else(|| DataError::ResponseFormatChanged("result array is empty".into()))?;

    let utc_offset_secs = data.meta.as_ref().and_then(|m| m.gmtoffset).unwrap_or(0);
    if let Some(tz) = data.meta.as_ref().and_then(|m| m.exchange_timezone_name.as_deref()) {
        tracing::debug!("{} trades in {} (offset {}s)", symbol, tz, utc_offset_secs);
    }

    let empty = || DataError::Empty {
        symbol: symbol.to_string(),
        interval: interval.to_string(),
    };

    // Yahoo omits timestamps entirely when a range has no trades
    let timestamps = data.timestamp.ok_or_else(empty)?;
    let quote = data
        .indicators
        .quote
        .into_iter()
        .next()
        .ok_or_else(|| DataError::ResponseFormatChanged("no quote data".into()))?;

    let mut candles: Vec<Candle> = Vec::with_capacity(timestamps.len());
    let mut skipped = 0usize;

    for (i, &ts) in timestamps.iter().enumerate() {
        let value = |column: &Vec<Option<f64>>| column.get(i).copied().flatten();

        let (Some(open), Some(high), Some(low), Some(close)) = (
            value(&quote.open),
            value(&quote.high),
            value(&quote.low),
            value(&quote.close),
        ) else {
            skipped += 1;
            continue;
        };

        if [open, high, low, close].iter().any(|v| !v.is_finite() || *v <= 0.0) {
            skipped += 1;
            continue;
        }

        let timestamp = DateTime::from_timestamp(ts, 0).ok_or_else(|| {
            DataError::ResponseFormatChanged(format!("invalid timestamp: {}", ts))
        })?;

        candles.push(Candle {
            timestamp,
            open,
            high,
            low,
            close,
            volume: value(&quote.volume).unwrap_or(0.0),
        });
    }

    if skipped > 0 {
        tracing::debug!("Dropped {} incomplete {} rows for {}", skipped, interval, symbol);
    }

    candles.sort_by_key(|c| c.timestamp);
    let mut deduped: Vec<Candle> = Vec::with_capacity(candles.len());
    for candle in candles {
        match deduped.last_mut() {
            Some(last) if last.timestamp == candle.timestamp => *last = candle,
            _ => deduped.push(candle),
        }
    }

    if deduped.is_empty() {
        return Err(empty());
    }

    Ok(Series::new(symbol, interval, deduped).with_utc_offset(utc_offset_secs))
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    const CHART_BODY: &str = r#"{
        "chart": {
            "result": [{
                "meta": {"symbol": "SPY", "gmtoffset": -18000, "exchangeTimezoneName": "America/New_York"},
                "timestamp": [1709649000, 1709649300, 1709649600, 1709649300],
                "indicators": {
                    "quote": [{
                        "open":   [100.0, 100.5, null, 100.2],
                        "high":   [101.0, 100.9, 100.4, 100.6],
                        "low":    [99.5, 100.1, 99.9, 100.0],
                        "close":  [100.5, 100.3, 100.1, 100.4],
                        "volume": [1000, 2000, 1500, null]
                    }]
                }
            }],
            "error": null
        }
    }"#;

    fn client(base_url: &str) -> YahooClient {
        YahooClient::new(base_url, Duration::from_secs(5), 600)
            .unwrap()
            .with_retry_delay(Duration::from_millis(1))
    }

    #[test]
    fn test_parse_chart_normalizes_rows() {
        let response: ChartResponse = serde_json::from_str(CHART_BODY).unwrap();
        let series = parse_chart("SPY", BarInterval::FiveMinutes, response).unwrap();

        // Null open row dropped; the two rows sharing a timestamp collapse to the later one
        assert_eq!(series.len(), 2);
        assert_eq!(series.utc_offset_secs, -18000);
        assert_eq!(series.candles[0].close, 100.5);
        assert_eq!(series.candles[0].volume, 1000.0);
        assert_eq!(series.candles[1].close, 100.4);
        assert_eq!(series.candles[1].volume, 0.0);
        assert!(series.candles[0].timestamp < series.candles[1].timestamp);
    }

    #[test]
    fn test_parse_chart_not_found() {
        let body = r#"{"chart": {"result": null, "error": {"code": "Not Found", "description": "No data found, symbol may be delisted"}}}"#;
        let response: ChartResponse = serde_json::from_str(body).unwrap();

        let err = parse_chart("NOPE", BarInterval::OneDay, response).unwrap_err();
        assert!(matches!(err, DataError::SymbolNotFound { .. }));
    }

    #[test]
    fn test_parse_chart_without_timestamps_is_empty() {
        let body = r#"{"chart": {"result": [{"meta": {"gmtoffset": -18000}, "indicators": {"quote": [{}]}}], "error": null}}"#;
        let response: ChartResponse = serde_json::from_str(body).unwrap();

        let err = parse_chart("SPY", BarInterval::FiveMinutes, response).unwrap_err();
        assert!(matches!(err, DataError::Empty { .. }));
    }

    #[tokio::test]
    async fn test_fetch_bars_from_mock_server() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/v8/finance/chart/SPY")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("range".into(), "5d".into()),
                Matcher::UrlEncoded("interval".into(), "5m".into()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(CHART_BODY)
            .create_async()
            .await;

        let series = client(&server.url())
            .fetch_bars("SPY", LookbackRange::FiveDays, BarInterval::FiveMinutes)
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(series.symbol, "SPY");
        assert_eq!(series.interval, BarInterval::FiveMinutes);
        assert_eq!(series.len(), 2);
    }

    #[tokio::test]
    async fn test_fetch_bars_404_is_symbol_not_found() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/v8/finance/chart/NOPE")
            .match_query(Matcher::Any)
            .with_status(404)
            .create_async()
            .await;

        let err = client(&server.url())
            .fetch_bars("NOPE", LookbackRange::OneMonth, BarInterval::OneDay)
            .await
            .unwrap_err();

        assert!(matches!(err, DataError::SymbolNotFound { .. }));
    }

    #[tokio::test]
    async fn test_fetch_bars_retries_server_errors() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/v8/finance/chart/SPY")
            .match_query(Matcher::Any)
            .with_status(503)
            .expect(MAX_RETRIES as usize)
            .create_async()
            .await;

        let err = client(&server.url())
            .fetch_bars("SPY", LookbackRange::OneMonth, BarInterval::OneDay)
            .await
            .unwrap_err();

        mock.assert_async().await;
        assert!(err.to_string().contains("503"));
    }

    #[tokio::test]
    async fn test_fetch_bars_rate_limited() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/v8/finance/chart/SPY")
            .match_query(Matcher::Any)
            .with_status(429)
            .create_async()
            .await;

        let err = client(&server.url())
            .fetch_bars("SPY", LookbackRange::OneMonth, BarInterval::OneDay)
            .await
            .unwrap_err();

        assert!(matches!(err, DataError::RateLimited { attempts: 3 }));
    }

    #[tokio::test]
    async fn test_unparseable_body() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/v8/finance/chart/SPY")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body("<html>maintenance</html>")
            .create_async()
            .await;

        let err = client(&server.url())
            .fetch_bars("SPY", LookbackRange::OneMonth, BarInterval::OneDay)
            .await
            .unwrap_err();

        assert!(matches!(err, DataError::ResponseFormatChanged(_)));
    }
}
