use crate::api::MarketDataSource;
use crate::context::AnalysisContext;
use crate::error::{EvaluationError, EvaluationResult};
use crate::indicators::calculate_atr;
use crate::models::{BarInterval, DataMode, Direction, LookbackRange, PatternKind};
use crate::strategy::{analyze, Analysis, StrategyConfig};
use chrono::{DateTime, Utc};
use std::future::Future;
use std::time::Duration;
use tokio::time::{interval, MissedTickBehavior};

/// What to fetch for each evaluation
#[derive(Debug, Clone, PartialEq)]
pub struct FetchPlan {
    pub daily_range: LookbackRange,
    pub intraday_range: LookbackRange,
    pub intraday_interval: BarInterval,
}

impl Default for FetchPlan {
    fn default() -> Self {
        Self {
            daily_range: LookbackRange::OneMonth,
            intraday_range: LookbackRange::FiveDays,
            intraday_interval: BarInterval::FiveMinutes,
        }
    }
}

/// Drives one evaluation: daily fetch, intraday fetch, then the numeric core
pub struct Monitor<S: MarketDataSource> {
    source: S,
    plan: FetchPlan,
    strategy: StrategyConfig,
}

impl<S: MarketDataSource> Monitor<S> {
    pub fn new(source: S, plan: FetchPlan, strategy: StrategyConfig) -> Self {
        Self {
            source,
            plan,
            strategy,
        }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn strategy(&self) -> &StrategyConfig {
        &self.strategy
    }

    /// Run a single evaluation for `symbol` as of `now`
    ///
    /// # Arguments
    /// * `ctx` - Activity log and last-update marker, owned by the caller
    /// * `symbol` - Ticker, already normalized
    /// * `now` - Evaluation clock; converted to the exchange offset to find "today"
    ///
    /// Failures are logged into `ctx` and returned; there is no partial result.
    pub async fn run(
        &self,
        ctx: &mut AnalysisContext,
        symbol: &str,
        now: DateTime<Utc>,
    ) -> EvaluationResult<Analysis> {
        ctx.mark_updated(now);

        match self.evaluate(ctx, symbol, now).await {
            Ok(analysis) => Ok(analysis),
            Err(e) => {
                tracing::error!("❌ Evaluation failed for {}: {}", symbol, e);
                ctx.log(now, format!("Error: {}", e));
                Err(e)
            }
        }
    }

    async fn evaluate(
        &self,
        ctx: &mut AnalysisContext,
        symbol: &str,
        now: DateTime<Utc>,
    ) -> EvaluationResult<Analysis> {
        tracing::info!("📡 Fetching data for {} from {}", symbol, self.source.name());
        ctx.log(now, format!("Fetching data for {}...", symbol));

        let daily = self
            .source
            .fetch_bars(symbol, self.plan.daily_range, BarInterval::OneDay)
            .await
            .map_err(|e| EvaluationError::from_fetch("daily", e))?;

        // Logged before the intraday fetch so it survives an intraday failure
        if let Some(atr) = calculate_atr(&daily.candles, self.strategy.atr_period) {
            ctx.log(now, format!("ATR({}) = ${:.2}", self.strategy.atr_period, atr));
        }

        let intraday = self
            .source
            .fetch_bars(symbol, self.plan.intraday_range, self.plan.intraday_interval)
            .await
            .map_err(|e| EvaluationError::from_fetch("intraday", e))?;

        tracing::debug!(
            "Fetched {} daily and {} intraday bars (offset {}s)",
            daily.len(),
            intraday.len(),
            intraday.utc_offset_secs
        );

        let as_of = intraday.date_at(now);
        let analysis = analyze(&daily, &intraday, as_of, &self.strategy)?;

        self.record(ctx, now, &analysis);
        Ok(analysis)
    }

    fn record(&self, ctx: &mut AnalysisContext, now: DateTime<Utc>, analysis: &Analysis) {
        tracing::info!(
            "📊 {} ATR({}) = ${:.2}, box ${:.2}-${:.2}",
            analysis.symbol,
            self.strategy.atr_period,
            analysis.atr,
            analysis.price_box.low,
            analysis.price_box.high
        );

        if analysis.mode == DataMode::Historical {
            tracing::warn!(
                "⚠️  No live session for {}, using {}",
                analysis.symbol,
                analysis.session.date
            );
            ctx.log(now, "⚠️ Market appears closed. Using most recent trading day.");
            ctx.log(
                now,
                format!("📊 Showing data from: {}", analysis.session.date.format("%Y-%m-%d")),
            );
        }

        match &analysis.signal {
            Some(signal) => {
                let (emoji, name) = match (signal.direction, signal.pattern) {
                    (Direction::Short, _) => ("🔴", "BEARISH ENGULFING"),
                    (Direction::Long, PatternKind::Hammer) => ("🟢", "HAMMER"),
                    (Direction::Long, _) => ("🟢", "BULLISH ENGULFING"),
                };
                tracing::info!(
                    "{} {} signal on {} at ${:.2} (TP ${:.2})",
                    emoji,
                    signal.direction,
                    analysis.symbol,
                    signal.entry,
                    signal.take_profit
                );
                ctx.log(
                    now,
                    format!("{} {} detected - {} signal", emoji, name, signal.direction),
                );
            }
            None => {
                tracing::info!("⏳ {} state: {}", analysis.symbol, analysis.state);
            }
        }
    }
}

/// Re-run the evaluation every `period` until `shutdown` resolves
///
/// Each run is awaited before the next tick, so runs never overlap; ticks
/// missed during a slow run are skipped. `on_result` sees every outcome,
/// including failures. Returns the number of completed runs.
pub async fn watch<S, F>(
    monitor: &Monitor<S>,
    ctx: &mut AnalysisContext,
    symbol: &str,
    period: Duration,
    shutdown: impl Future<Output = ()>,
    mut on_result: F,
) -> u64
where
    S: MarketDataSource,
    F: FnMut(&AnalysisContext, &EvaluationResult<Analysis>),
{
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    tokio::pin!(shutdown);

    tracing::info!("🔄 Watching {} every {:?}", symbol, period);

    let mut runs = 0u64;
    loop {
        tokio::select! {
            _ = &mut shutdown => {
                tracing::info!("⚠️  Shutdown requested, stopping after {} runs", runs);
                break;
            }
            _ = ticker.tick() => {
                let result = monitor.run(ctx, symbol, Utc::now()).await;
                runs += 1;
                on_result(ctx, &result);
            }
        }
    }

    runs
}
