//! Player accounts.
//!
//! An account holds the virtual EUR balance, spot coin holdings, and the
//! performance baselines the seasonal ranking is measured against. Every
//! balance mutation stamps `last_active`, which the inactivity sweeps key on.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::types::{AccountId, Eur, Symbol, Timestamp};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountTier {
    Standard,
    Pro,
    Operator,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub id: AccountId,
    pub display_name: String,
    pub balance: Eur,
    pub holdings: HashMap<Symbol, Decimal>,
    pub lifetime_volume: Eur,
    // net worth at season start; basis for the season ranking
    pub season_start_worth: Eur,
    // net worth at day start; basis for the daily ranking
    pub day_start_worth: Eur,
    pub tier: AccountTier,
    pub tier_expires_at: Option<Timestamp>,
    // gifted/promotional money, excluded from fair-profit ranking
    pub bonus_received: Eur,
    pub strikes: u32,
    pub story_bonus_claimed: bool,
    pub inactivity_bonus_claimed: bool,
    pub feedback_sent: bool,
    pub created_at: Timestamp,
    pub last_active: Timestamp,
}

impl Account {
    pub fn new(id: AccountId, display_name: String, starting_balance: Eur, now: Timestamp) -> Self {
        Self {
            id,
            display_name,
            balance: starting_balance,
            holdings: HashMap::new(),
            lifetime_volume: Eur::zero(),
            season_start_worth: starting_balance,
            day_start_worth: starting_balance,
            tier: AccountTier::Standard,
            tier_expires_at: None,
            bonus_received: Eur::zero(),
            strikes: 0,
            story_bonus_claimed: false,
            inactivity_bonus_claimed: false,
            feedback_sent: false,
            created_at: now,
            last_active: now,
        }
    }

    // Pro privileges lapse at their expiry; Operator never does.
    pub fn effective_tier(&self, now: Timestamp) -> AccountTier {
        match self.tier {
            AccountTier::Pro => match self.tier_expires_at {
                Some(expiry) if expiry <= now => AccountTier::Standard,
                _ => AccountTier::Pro,
            },
            tier => tier,
        }
    }

    pub fn credit(&mut self, amount: Eur, now: Timestamp) {
        self.balance = self.balance.add(amount);
        self.last_active = now;
    }

    pub fn debit(&mut self, amount: Eur, now: Timestamp) -> Result<(), AccountError> {
        if amount.value() > self.balance.value() {
            return Err(AccountError::InsufficientBalance {
                requested: amount,
                available: self.balance,
            });
        }
        self.balance = self.balance.sub(amount);
        self.last_active = now;
        Ok(())
    }

    pub fn add_volume(&mut self, delta: Eur, now: Timestamp) {
        self.lifetime_volume = self.lifetime_volume.add(delta);
        self.last_active = now;
    }

    pub fn add_holding(&mut self, symbol: Symbol, amount: Decimal) {
        let entry = self.holdings.entry(symbol).or_insert(Decimal::ZERO);
        *entry += amount;
    }

    pub fn record_strike(&mut self) -> u32 {
        self.strikes += 1;
        self.strikes
    }
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum AccountError {
    #[error("insufficient balance: requested {requested}, available {available}")]
    InsufficientBalance { requested: Eur, available: Eur },
}
