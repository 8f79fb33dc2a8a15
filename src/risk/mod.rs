// Trade plan and position sizing
pub mod trade_plan;

pub use trade_plan::{
    PositionSizing, RiskSettings, RiskSettingsViolation, TradePlan, MIN_RISK_PER_SHARE,
};
