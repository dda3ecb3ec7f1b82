//! Trade policy resolution.
//!
//! What an account may open depends on its tier and the day of week: the
//! promotional day raises the standard-tier leverage ceiling to the pro
//! ceiling, but not the position-count ceiling. Kept as a pure function of
//! (tier, time, config) so it is independently testable.

use crate::account::AccountTier;
use crate::config::GameConfig;
use crate::types::Timestamp;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TradePolicy {
    pub max_leverage: u32,
    pub max_positions: usize,
    pub high_risk_allowed: bool,
    pub promo_day: bool,
    pub advanced_orders_allowed: bool,
}

pub fn resolve_policy(tier: AccountTier, now: Timestamp, config: &GameConfig) -> TradePolicy {
    let promo_day = now.weekday() == config.promo_weekday;

    match tier {
        AccountTier::Pro | AccountTier::Operator => TradePolicy {
            max_leverage: config.max_pro_leverage(),
            max_positions: config.pro_max_positions,
            high_risk_allowed: true,
            promo_day,
            advanced_orders_allowed: true,
        },
        AccountTier::Standard => TradePolicy {
            max_leverage: if promo_day {
                config.max_pro_leverage()
            } else {
                config.max_standard_leverage()
            },
            max_positions: config.standard_max_positions,
            high_risk_allowed: promo_day,
            promo_day,
            advanced_orders_allowed: false,
        },
    }
}

// a leverage value is valid if it sits in the standard set, or in the
// high-risk set when the policy unlocks it
pub fn leverage_allowed(policy: &TradePolicy, leverage: u32, config: &GameConfig) -> bool {
    if leverage > policy.max_leverage {
        return false;
    }
    if config.standard_leverages.contains(&leverage) {
        return true;
    }
    policy.high_risk_allowed && config.high_risk_leverages.contains(&leverage)
}
