use crate::context::{AnalysisContext, LogEntry};
use crate::models::{DataMode, Direction, PricePosition};
use crate::risk::{RiskSettings, TradePlan};
use crate::strategy::{Analysis, EvaluatorState, BOX_ATR_FRACTION};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt::Write;

/// Log entries shown at the bottom of a report
pub const REPORT_LOG_ENTRIES: usize = 20;

/// Everything a presentation layer needs for one evaluation
#[derive(Debug, Serialize)]
pub struct Report<'a> {
    pub analysis: &'a Analysis,
    pub trade_plan: Option<TradePlan>,
    pub risk: &'a RiskSettings,
    pub last_update: Option<DateTime<Utc>>,
    pub recent_log: Vec<&'a LogEntry>,
}

impl<'a> Report<'a> {
    pub fn new(analysis: &'a Analysis, risk: &'a RiskSettings, ctx: &'a AnalysisContext) -> Self {
        Self {
            analysis,
            trade_plan: analysis
                .signal
                .as_ref()
                .map(|signal| TradePlan::for_signal(signal, risk)),
            risk,
            last_update: ctx.last_update,
            recent_log: ctx.log.recent(REPORT_LOG_ENTRIES),
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// Plain-text rendering for the terminal
    pub fn render_text(&self) -> String {
        let mut out = String::new();
        // Writing into a String cannot fail
        let _ = self.write_text(&mut out);
        out
    }

    fn write_text(&self, out: &mut String) -> std::fmt::Result {
        let a = self.analysis;
        let rule = "═".repeat(56);

        writeln!(out, "╔{}╗", rule)?;
        writeln!(out, "║{:^56}║", format!("ATR BOX SCALPING - {}", a.symbol))?;
        writeln!(out, "╚{}╝", rule)?;

        match a.mode {
            DataMode::Live => writeln!(out, "🟢 MARKET STATUS: LIVE DATA")?,
            DataMode::Historical => writeln!(
                out,
                "🔴 MARKET CLOSED - Showing historical data from {}",
                a.session.date.format("%Y-%m-%d")
            )?,
        }
        if let Some(at) = self.last_update {
            writeln!(out, "   Last update: {}", at.format("%Y-%m-%d %H:%M:%S UTC"))?;
        }

        writeln!(out, "\n📊 METRICS")?;
        writeln!(out, "  ATR (Daily):           ${:.2}", a.atr)?;
        writeln!(out, "  Box High:              ${:.2}", a.price_box.high)?;
        writeln!(out, "  Box Low:               ${:.2}", a.price_box.low)?;
        writeln!(
            out,
            "  Current Price:         ${:.2} ({} box)",
            a.current_price, a.price_position
        )?;

        if a.volatility_valid {
            writeln!(out, "\n✅ Volatility Valid - Box range acceptable for trading")?;
        } else {
            writeln!(
                out,
                "\n❌ Volatility Too Wide - Box range (${:.2}) exceeds {:.0}% of ATR (${:.2})",
                a.price_box.range(),
                BOX_ATR_FRACTION * 100.0,
                a.volatility_threshold
            )?;
        }

        match (&a.signal, &self.trade_plan) {
            (Some(signal), Some(plan)) => {
                writeln!(out, "\n⭐ {} SIGNAL DETECTED", signal.direction)?;
                writeln!(out, "  Pattern:               {}", signal.pattern)?;
                writeln!(
                    out,
                    "  Candle:                {}",
                    signal.candle_time.format("%Y-%m-%d %H:%M UTC")
                )?;
                let order = match signal.direction {
                    Direction::Long => "BUY (stop limit)",
                    Direction::Short => "SELL SHORT (stop limit)",
                };
                writeln!(out, "  Order:                 {}", order)?;
                writeln!(out, "  Entry:                 ${:.2}", signal.entry)?;
                writeln!(out, "  Stop Loss:             ${:.2}", signal.stop_loss)?;
                writeln!(out, "  Take Profit:           ${:.2}", signal.take_profit)?;

                writeln!(out, "\n🛡️  TRADE PLAN")?;
                writeln!(out, "  Risk per Share:        ${:.2}", plan.risk_per_share)?;
                writeln!(out, "  Reward per Share:      ${:.2}", plan.reward_per_share)?;
                writeln!(out, "  Risk/Reward:           {:.2}:1", plan.risk_reward)?;
                writeln!(
                    out,
                    "  Profit ({} shares):    ${:.2}",
                    plan.reference_shares, plan.reference_profit
                )?;
                writeln!(
                    out,
                    "  Loss ({} shares):      ${:.2}",
                    plan.reference_shares, plan.reference_loss
                )?;

                writeln!(out, "\n📐 POSITION SIZE")?;
                writeln!(
                    out,
                    "  Account:               ${:.2} at {:.1}% risk (${:.2})",
                    self.risk.account_size,
                    self.risk.risk_percent,
                    self.risk.risk_amount()
                )?;
                match &plan.sizing {
                    Some(sizing) => {
                        writeln!(out, "  Maximum Shares:        {}", sizing.max_shares)?;
                        writeln!(out, "  Position Value:        ${:.2}", sizing.position_value)?;
                        writeln!(out, "  Total Risk:            ${:.2}", sizing.total_risk)?;
                        writeln!(out, "  Potential Profit:      ${:.2}", sizing.potential_profit)?;
                    }
                    None => {
                        writeln!(
                            out,
                            "  Unavailable: entry equals stop loss, risk per share is $0.00"
                        )?;
                    }
                }

                self.write_order_entry(out, plan)?;
            }
            _ => self.write_checklist(out)?,
        }

        writeln!(out, "\n📈 STATISTICS")?;
        writeln!(out, "  Box Range:             ${:.2}", a.price_box.range())?;
        writeln!(out, "  25% of ATR:            ${:.2}", a.volatility_threshold)?;
        writeln!(out, "  Box/ATR:               {:.1}%", a.box_atr_pct())?;
        writeln!(out, "  Data Points:           {}", a.data_points())?;
        writeln!(out, "  Time Span:             {} minutes", a.time_span_minutes())?;

        writeln!(out, "\n📝 ACTIVITY LOG")?;
        if self.recent_log.is_empty() {
            writeln!(out, "  No activity yet")?;
        }
        for entry in &self.recent_log {
            writeln!(out, "  {}", entry)?;
        }

        Ok(())
    }

    /// Order ticket to verify in the broker before entering
    fn write_order_entry(&self, out: &mut String, plan: &TradePlan) -> std::fmt::Result {
        let Some(signal) = &self.analysis.signal else {
            return Ok(());
        };
        let (side, exit_side) = match signal.direction {
            Direction::Long => ("BUY", "SELL"),
            Direction::Short => ("SELL SHORT", "BUY TO COVER"),
        };
        let shares = match &plan.sizing {
            Some(sizing) => sizing.max_shares.to_string(),
            None => "calculate manually".to_string(),
        };

        writeln!(out, "\n✅ BEFORE ENTERING")?;
        writeln!(out, "  Symbol:                {}", self.analysis.symbol)?;
        writeln!(out, "  Direction:             {} ({})", signal.direction, side)?;
        writeln!(out, "  Entry (stop limit):    ${:.2}", signal.entry)?;
        writeln!(out, "  Stop Loss:             ${:.2} ({} stop)", signal.stop_loss, exit_side)?;
        writeln!(out, "  Take Profit:           ${:.2} ({} limit)", signal.take_profit, exit_side)?;
        writeln!(out, "  Shares:                {}", shares)?;
        writeln!(out, "  [ ] Price still near entry, setup not invalidated")?;
        writeln!(out, "  [ ] Stop and target attached as bracket orders")?;
        Ok(())
    }

    fn write_checklist(&self, out: &mut String) -> std::fmt::Result {
        let a = self.analysis;
        let broke_out = a.state == EvaluatorState::AwaitingPattern;

        writeln!(out, "\n⏳ No signal detected. Waiting for valid setup...")?;
        writeln!(out, "  1. ✓ Box defined from the opening bars")?;
        writeln!(
            out,
            "  2. {} Box range < 25% of ATR: {}",
            if a.volatility_valid { "✓" } else { "✗" },
            if a.volatility_valid { "PASS" } else { "FAIL - Too Wide" }
        )?;
        writeln!(
            out,
            "  3. {} Price breaks above box high (SHORT) or below box low (LONG)",
            if broke_out { "✓" } else { "⏳" }
        )?;
        writeln!(out, "  4. ⏳ Reversal candle pattern forms (Hammer or Engulfing)")?;

        let placement = match a.price_position {
            PricePosition::Inside => "INSIDE",
            PricePosition::Above | PricePosition::Below => "OUTSIDE",
        };
        writeln!(out, "  Price is {} the box ({})", placement, a.state)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{BarInterval, Candle, PatternKind, PriceBox, Signal};
    use crate::strategy::Session;
    use chrono::NaiveDate;

    fn analysis(signal: Option<Signal>, state: EvaluatorState, mode: DataMode) -> Analysis {
        let ts: DateTime<Utc> = "2024-03-05T14:30:00Z".parse().unwrap();
        let candle = Candle {
            timestamp: ts,
            open: 100.0,
            high: 101.0,
            low: 100.5,
            close: 100.6,
            volume: 0.0,
        };
        Analysis {
            symbol: "SPY".into(),
            interval: BarInterval::FiveMinutes,
            atr: 4.0,
            price_box: PriceBox {
                high: 101.0,
                low: 100.5,
            },
            volatility_threshold: 1.0,
            volatility_valid: true,
            current_price: 100.6,
            price_position: PricePosition::Inside,
            state,
            signal,
            session: Session {
                date: NaiveDate::from_ymd_opt(2024, 3, 5).unwrap(),
                candles: vec![candle; 4],
            },
            mode,
        }
    }

    fn long_signal() -> Signal {
        Signal {
            direction: Direction::Long,
            pattern: PatternKind::Hammer,
            entry: 98.0,
            stop_loss: 98.0,
            take_profit: 101.0,
            candle_time: "2024-03-05T14:50:00Z".parse().unwrap(),
        }
    }

    #[test]
    fn test_signal_report_includes_trade_plan() {
        let analysis = analysis(Some(long_signal()), EvaluatorState::Signaled, DataMode::Live);
        let risk = RiskSettings::default();
        let ctx = AnalysisContext::new();

        let text = Report::new(&analysis, &risk, &ctx).render_text();

        assert!(text.contains("LIVE DATA"));
        assert!(text.contains("LONG SIGNAL DETECTED"));
        assert!(text.contains("Pattern:               Hammer"));
        assert!(text.contains("Risk/Reward:           300.00:1"));
        assert!(text.contains("Profit (100 shares):    $300.00"));
        assert!(text.contains("Unavailable: entry equals stop loss"));
        assert!(text.contains("Time Span:             20 minutes"));
    }

    #[test]
    fn test_signal_report_lists_order_entry() {
        let signal = Signal {
            direction: Direction::Long,
            pattern: PatternKind::Hammer,
            entry: 100.0,
            stop_loss: 99.5,
            take_profit: 101.5,
            candle_time: "2024-03-05T14:50:00Z".parse().unwrap(),
        };
        let analysis = analysis(Some(signal), EvaluatorState::Signaled, DataMode::Live);
        let risk = RiskSettings::default();
        let ctx = AnalysisContext::new();

        let text = Report::new(&analysis, &risk, &ctx).render_text();
        let ticket = &text[text.find("BEFORE ENTERING").unwrap()..];

        assert!(ticket.contains("Symbol:                SPY"));
        assert!(ticket.contains("Direction:             LONG (BUY)"));
        assert!(ticket.contains("Entry (stop limit):    $100.00"));
        assert!(ticket.contains("Stop Loss:             $99.50 (SELL stop)"));
        assert!(ticket.contains("Take Profit:           $101.50 (SELL limit)"));
        assert!(ticket.contains("Shares:                200"));
    }

    #[test]
    fn test_unsized_order_entry_asks_for_manual_shares() {
        let analysis = analysis(Some(long_signal()), EvaluatorState::Signaled, DataMode::Live);
        let risk = RiskSettings::default();
        let ctx = AnalysisContext::new();

        let text = Report::new(&analysis, &risk, &ctx).render_text();

        assert!(text.contains("Shares:                calculate manually"));
    }

    #[test]
    fn test_waiting_report_shows_checklist() {
        let analysis = analysis(None, EvaluatorState::AwaitingBreakout, DataMode::Historical);
        let risk = RiskSettings::default();
        let mut ctx = AnalysisContext::new();
        ctx.log("2024-03-05T15:00:00Z".parse().unwrap(), "ATR(14) = $4.00");

        let report = Report::new(&analysis, &risk, &ctx);
        let text = report.render_text();

        assert!(report.trade_plan.is_none());
        assert!(text.contains("MARKET CLOSED - Showing historical data from 2024-03-05"));
        assert!(text.contains("Waiting for valid setup"));
        assert!(text.contains("Box range < 25% of ATR: PASS"));
        assert!(text.contains("Price is INSIDE the box"));
        assert!(text.contains("[15:00:00] ATR(14) = $4.00"));
    }

    #[test]
    fn test_json_report() {
        let analysis = analysis(Some(long_signal()), EvaluatorState::Signaled, DataMode::Live);
        let risk = RiskSettings::default();
        let ctx = AnalysisContext::new();

        let json = Report::new(&analysis, &risk, &ctx).to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["analysis"]["symbol"], "SPY");
        assert_eq!(value["analysis"]["mode"], "Live");
        assert_eq!(value["analysis"]["signal"]["direction"], "Long");
        assert_eq!(value["trade_plan"]["sizing"], serde_json::Value::Null);
        assert_eq!(value["risk"]["reference_shares"], 100);
    }
}
