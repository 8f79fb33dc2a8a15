use crate::models::Signal;
use serde::{Deserialize, Serialize};

/// Floor applied to risk per share when computing the risk/reward ratio
pub const MIN_RISK_PER_SHARE: f64 = 0.01;

/// Account-level sizing inputs
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RiskSettings {
    pub account_size: f64,
    pub risk_percent: f64,
    pub reference_shares: u32,
}

impl Default for RiskSettings {
    fn default() -> Self {
        Self {
            account_size: 10_000.0, // $10k account
            risk_percent: 1.0,      // 1% per trade
            reference_shares: 100,  // P&L quoted per 100 shares
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RiskSettingsViolation {
    AccountSize(f64),
    RiskPercent(f64),
    ReferenceShares,
}

impl std::fmt::Display for RiskSettingsViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RiskSettingsViolation::AccountSize(v) => {
                write!(f, "account size ${:.2} outside $1,000-$1,000,000", v)
            }
            RiskSettingsViolation::RiskPercent(v) => {
                write!(f, "risk percent {:.2}% outside 0.5%-5.0%", v)
            }
            RiskSettingsViolation::ReferenceShares => f.write_str("reference shares must be > 0"),
        }
    }
}

impl RiskSettings {
    pub const ACCOUNT_SIZE_RANGE: (f64, f64) = (1_000.0, 1_000_000.0);
    pub const RISK_PERCENT_RANGE: (f64, f64) = (0.5, 5.0);

    pub fn check(&self) -> Result<(), RiskSettingsViolation> {
        let (min_account, max_account) = Self::ACCOUNT_SIZE_RANGE;
        if !(min_account..=max_account).contains(&self.account_size) {
            return Err(RiskSettingsViolation::AccountSize(self.account_size));
        }

        let (min_pct, max_pct) = Self::RISK_PERCENT_RANGE;
        if !(min_pct..=max_pct).contains(&self.risk_percent) {
            return Err(RiskSettingsViolation::RiskPercent(self.risk_percent));
        }

        if self.reference_shares == 0 {
            return Err(RiskSettingsViolation::ReferenceShares);
        }

        Ok(())
    }

    /// Dollars the account is willing to lose on one trade
    pub fn risk_amount(&self) -> f64 {
        self.account_size * self.risk_percent / 100.0
    }
}

/// Per-share economics of a signal
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TradePlan {
    pub risk_per_share: f64,
    pub reward_per_share: f64,
    pub risk_reward: f64,
    pub reference_shares: u32,
    /// Profit at take profit for `reference_shares`
    pub reference_profit: f64,
    /// Loss at stop for `reference_shares`
    pub reference_loss: f64,
    pub sizing: Option<PositionSizing>,
}

/// Shares affordable within the account's risk budget
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PositionSizing {
    pub risk_amount: f64,
    pub max_shares: u64,
    pub position_value: f64,
    pub total_risk: f64,
    pub potential_profit: f64,
}

impl TradePlan {
    /// Build the plan for a signal
    ///
    /// Sizing is `None` when entry and stop coincide, which is how this
    /// strategy places its stops.
    pub fn for_signal(signal: &Signal, settings: &RiskSettings) -> Self {
        let risk_per_share = (signal.entry - signal.stop_loss).abs();
        let reward_per_share = (signal.take_profit - signal.entry).abs();
        let risk_reward = reward_per_share / risk_per_share.max(MIN_RISK_PER_SHARE);
        let shares = settings.reference_shares as f64;

        Self {
            risk_per_share,
            reward_per_share,
            risk_reward,
            reference_shares: settings.reference_shares,
            reference_profit: reward_per_share * shares,
            reference_loss: risk_per_share * shares,
            sizing: size_position(signal.entry, risk_per_share, reward_per_share, settings),
        }
    }
}

fn size_position(
    entry: f64,
    risk_per_share: f64,
    reward_per_share: f64,
    settings: &RiskSettings,
) -> Option<PositionSizing> {
    if risk_per_share <= 0.0 {
        return None;
    }

    let risk_amount = settings.risk_amount();
    let max_shares = (risk_amount / risk_per_share).floor() as u64;
    let shares = max_shares as f64;

    Some(PositionSizing {
        risk_amount,
        max_shares,
        position_value: shares * entry,
        total_risk: shares * risk_per_share,
        potential_profit: shares * reward_per_share,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Direction, PatternKind};
    use chrono::Utc;

    fn signal(entry: f64, stop_loss: f64, take_profit: f64) -> Signal {
        Signal {
            direction: Direction::Long,
            pattern: PatternKind::Hammer,
            entry,
            stop_loss,
            take_profit,
            candle_time: Utc::now(),
        }
    }

    #[test]
    fn test_entry_equals_stop_uses_floor() {
        let plan = TradePlan::for_signal(&signal(98.0, 98.0, 101.0), &RiskSettings::default());

        assert_eq!(plan.risk_per_share, 0.0);
        assert!((plan.reward_per_share - 3.0).abs() < 1e-9);
        assert!((plan.risk_reward - 300.0).abs() < 1e-6);
        assert!((plan.reference_profit - 300.0).abs() < 1e-9);
        assert_eq!(plan.reference_loss, 0.0);
        assert!(plan.sizing.is_none());
    }

    #[test]
    fn test_sizing_with_real_stop() {
        // $10k at 1% = $100 risk; $0.50/share risk -> 200 shares
        let plan = TradePlan::for_signal(&signal(100.0, 99.5, 101.5), &RiskSettings::default());
        let sizing = plan.sizing.unwrap();

        assert!((plan.risk_reward - 3.0).abs() < 1e-9);
        assert!((sizing.risk_amount - 100.0).abs() < 1e-9);
        assert_eq!(sizing.max_shares, 200);
        assert!((sizing.position_value - 20_000.0).abs() < 1e-6);
        assert!((sizing.total_risk - 100.0).abs() < 1e-6);
        assert!((sizing.potential_profit - 300.0).abs() < 1e-6);
    }

    #[test]
    fn test_short_signal_distances_are_absolute() {
        let short = Signal {
            direction: Direction::Short,
            pattern: PatternKind::BearishEngulfing,
            ..signal(102.0, 102.5, 100.0)
        };
        let plan = TradePlan::for_signal(&short, &RiskSettings::default());

        assert!((plan.risk_per_share - 0.5).abs() < 1e-9);
        assert!((plan.reward_per_share - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_settings_ranges() {
        assert!(RiskSettings::default().check().is_ok());

        let small = RiskSettings {
            account_size: 500.0,
            ..RiskSettings::default()
        };
        assert_eq!(small.check(), Err(RiskSettingsViolation::AccountSize(500.0)));

        let greedy = RiskSettings {
            risk_percent: 10.0,
            ..RiskSettings::default()
        };
        assert_eq!(greedy.check(), Err(RiskSettingsViolation::RiskPercent(10.0)));

        let edge = RiskSettings {
            account_size: 1_000_000.0,
            risk_percent: 0.5,
            reference_shares: 1,
        };
        assert!(edge.check().is_ok());
    }
}
