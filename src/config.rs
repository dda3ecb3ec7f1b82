// 7.0 config.rs: all game parameters in one place. fees, leverage tiers,
// season length, scan cadence, prize weights.

use std::time::Duration;

use chrono::Weekday;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::types::Eur;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameConfig {
    // Flat fee on notional (collateral x leverage), charged at open
    pub fee_rate: Decimal,
    // Balance granted on registration; also the season performance fallback basis
    pub starting_balance: Eur,
    // Leverage values every account may use
    pub standard_leverages: Vec<u32>,
    // High-risk values gated behind the pro tier (or the promo day)
    pub high_risk_leverages: Vec<u32>,
    // Concurrent open position caps per tier
    pub standard_max_positions: usize,
    pub pro_max_positions: usize,
    // Day of week on which standard accounts get the pro leverage ceiling
    pub promo_weekday: Weekday,
    // Ranking epoch length
    pub season_length_days: i64,
    // Liquidation sweep cadence
    pub scan_interval_secs: u64,
    // Season end-detection cadence
    pub season_check_interval_secs: u64,
    // Pool shares for ranks 1..=10, as fractions
    pub prize_weights: Vec<Decimal>,
    // Event log retention cap
    pub max_events: usize,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            fee_rate: dec!(0.005),
            starting_balance: Eur::new(dec!(10000)),
            standard_leverages: vec![2, 3, 5, 10],
            high_risk_leverages: vec![20, 50],
            standard_max_positions: 3,
            pro_max_positions: 10,
            promo_weekday: Weekday::Mon,
            season_length_days: 30,
            scan_interval_secs: 45,
            season_check_interval_secs: 12 * 60 * 60,
            prize_weights: vec![
                dec!(0.40),
                dec!(0.25),
                dec!(0.15),
                dec!(0.05),
                dec!(0.04),
                dec!(0.03),
                dec!(0.03),
                dec!(0.02),
                dec!(0.02),
                dec!(0.01),
            ],
            max_events: 100_000,
        }
    }
}

impl GameConfig {
    // Short seasons and a fast scanner, for demos and integration tests
    pub fn quick_demo() -> Self {
        let mut config = Self::default();
        config.season_length_days = 1;
        config.scan_interval_secs = 1;
        config.season_check_interval_secs = 1;
        config
    }

    // Cadences for the background tasks, in the form the runtime wants
    pub fn scan_interval(&self) -> Duration {
        Duration::from_secs(self.scan_interval_secs)
    }

    pub fn season_check_interval(&self) -> Duration {
        Duration::from_secs(self.season_check_interval_secs)
    }

    pub fn max_standard_leverage(&self) -> u32 {
        self.standard_leverages.iter().copied().max().unwrap_or(2)
    }

    pub fn max_pro_leverage(&self) -> u32 {
        self.high_risk_leverages
            .iter()
            .copied()
            .max()
            .unwrap_or_else(|| self.max_standard_leverage())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.fee_rate < Decimal::ZERO || self.fee_rate >= Decimal::ONE {
            return Err(ConfigError::InvalidFees {
                reason: "fee rate must be in [0, 1)".to_string(),
            });
        }

        if !self.starting_balance.is_positive() {
            return Err(ConfigError::InvalidBalances {
                reason: "starting balance must be positive".to_string(),
            });
        }

        if self.standard_leverages.is_empty() {
            return Err(ConfigError::InvalidLeverages {
                reason: "standard leverage set must not be empty".to_string(),
            });
        }

        for set in [&self.standard_leverages, &self.high_risk_leverages] {
            if set.windows(2).any(|w| w[0] >= w[1]) {
                return Err(ConfigError::InvalidLeverages {
                    reason: "leverage sets must be strictly ascending".to_string(),
                });
            }
            if set.iter().any(|&l| l < 2) {
                return Err(ConfigError::InvalidLeverages {
                    reason: "leverage must be at least 2x".to_string(),
                });
            }
        }

        if self.season_length_days <= 0 {
            return Err(ConfigError::InvalidSeason {
                reason: "season length must be positive".to_string(),
            });
        }

        // weights must sum to exactly 100% so distribution can never overshoot
        let total: Decimal = self.prize_weights.iter().sum();
        if total != Decimal::ONE {
            return Err(ConfigError::InvalidPrizes {
                reason: format!("prize weights sum to {total}, expected 1"),
            });
        }
        if self.prize_weights.iter().any(|w| *w <= Decimal::ZERO) {
            return Err(ConfigError::InvalidPrizes {
                reason: "prize weights must be positive".to_string(),
            });
        }

        if self.standard_max_positions == 0 || self.pro_max_positions < self.standard_max_positions
        {
            return Err(ConfigError::InvalidBalances {
                reason: "position caps must be positive and pro >= standard".to_string(),
            });
        }

        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid fee config: {reason}")]
    InvalidFees { reason: String },

    #[error("invalid leverage config: {reason}")]
    InvalidLeverages { reason: String },

    #[error("invalid season config: {reason}")]
    InvalidSeason { reason: String },

    #[error("invalid prize config: {reason}")]
    InvalidPrizes { reason: String },

    #[error("invalid balance config: {reason}")]
    InvalidBalances { reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_valid() {
        assert!(GameConfig::default().validate().is_ok());
    }

    #[test]
    fn quick_demo_config_valid() {
        let config = GameConfig::quick_demo();
        assert!(config.validate().is_ok());
        assert_eq!(config.season_length_days, 1);
    }

    #[test]
    fn prize_weights_must_sum_to_one() {
        let mut config = GameConfig::default();
        config.prize_weights.pop();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidPrizes { .. })
        ));
    }

    #[test]
    fn leverage_sets_must_ascend() {
        let mut config = GameConfig::default();
        config.standard_leverages = vec![10, 5];
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidLeverages { .. })
        ));
    }

    #[test]
    fn fee_rate_bounds() {
        let mut config = GameConfig::default();
        config.fee_rate = dec!(1);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidFees { .. })
        ));
    }

    #[test]
    fn cadence_durations_come_from_config() {
        let config = GameConfig::default();
        assert_eq!(config.scan_interval(), Duration::from_secs(45));
        assert_eq!(config.season_check_interval(), Duration::from_secs(12 * 60 * 60));
        assert_eq!(GameConfig::quick_demo().scan_interval(), Duration::from_secs(1));
    }

    #[test]
    fn leverage_ceilings() {
        let config = GameConfig::default();
        assert_eq!(config.max_standard_leverage(), 10);
        assert_eq!(config.max_pro_leverage(), 50);
    }

    #[test]
    fn config_serialization_round_trip() {
        let config = GameConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        let back: GameConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back.fee_rate, config.fee_rate);
        assert_eq!(back.promo_weekday, config.promo_weekday);
        assert_eq!(back.prize_weights, config.prize_weights);
    }
}
