// 8.1: main engine struct. all game state lives here; season and
// leaderboard logic extend it from their own modules.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::warn;

use super::results::{EngineError, PositionsView};
use crate::account::{Account, AccountTier};
use crate::config::GameConfig;
use crate::events::{
    BonusGrantedEvent, BonusKind, EventPayload, GameEvent, NotificationSink, NullSink,
};
use crate::fee_pool::FeePool;
use crate::ledger::{Ledger, Transaction, TxKind};
use crate::oracle::PriceOracle;
use crate::policy::{resolve_policy, TradePolicy};
use crate::season::Season;
use crate::store::PositionStore;
use crate::types::{AccountId, Eur, EventId, Timestamp};

pub struct Engine {
    pub(crate) config: GameConfig,
    pub(crate) accounts: BTreeMap<AccountId, Account>,
    pub(crate) store: PositionStore,
    pub(crate) ledger: Ledger,
    pub(crate) fee_pool: FeePool,
    pub(crate) seasons: Vec<Season>,
    pub(crate) events: Vec<GameEvent>,
    pub(crate) next_event_id: u64,
    pub(crate) oracle: Arc<dyn PriceOracle>,
    pub(crate) sink: Box<dyn NotificationSink>,
    pub(crate) current_time: Timestamp,
}

impl Engine {
    pub fn new(config: GameConfig, oracle: Arc<dyn PriceOracle>) -> Self {
        Self::with_sink(config, oracle, Box::new(NullSink))
    }

    pub fn with_sink(
        config: GameConfig,
        oracle: Arc<dyn PriceOracle>,
        sink: Box<dyn NotificationSink>,
    ) -> Self {
        Self {
            config,
            accounts: BTreeMap::new(),
            store: PositionStore::new(),
            ledger: Ledger::new(),
            fee_pool: FeePool::new(),
            seasons: Vec::new(),
            events: Vec::new(),
            next_event_id: 1,
            oracle,
            sink,
            current_time: Timestamp::from_millis(0),
        }
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    pub fn set_time(&mut self, timestamp: Timestamp) {
        self.current_time = timestamp;
    }

    pub fn time(&self) -> Timestamp {
        self.current_time
    }

    pub fn advance_time(&mut self, millis: i64) {
        self.current_time = Timestamp::from_millis(self.current_time.as_millis() + millis);
    }

    // idempotent: a returning player keeps their existing account
    pub fn register_account(&mut self, id: AccountId, display_name: &str) -> AccountId {
        if !self.accounts.contains_key(&id) {
            let account = Account::new(
                id,
                display_name.to_string(),
                self.config.starting_balance,
                self.current_time,
            );
            self.accounts.insert(id, account);
        }
        id
    }

    pub fn get_account(&self, id: AccountId) -> Option<&Account> {
        self.accounts.get(&id)
    }

    pub fn accounts_iter(&self) -> impl Iterator<Item = &Account> {
        self.accounts.values()
    }

    pub fn policy_for(&self, id: AccountId) -> Result<TradePolicy, EngineError> {
        let account = self
            .accounts
            .get(&id)
            .ok_or(EngineError::AccountNotFound(id))?;
        let tier = account.effective_tier(self.current_time);
        Ok(resolve_policy(tier, self.current_time, &self.config))
    }

    pub fn positions_view(&self, id: AccountId) -> Result<PositionsView, EngineError> {
        let policy = self.policy_for(id)?;
        Ok(PositionsView {
            open: self
                .store
                .open_for_account(id)
                .into_iter()
                .cloned()
                .collect(),
            history: self
                .store
                .history_for_account(id)
                .into_iter()
                .cloned()
                .collect(),
            policy,
        })
    }

    pub fn grant_tier(&mut self, id: AccountId, tier: AccountTier, expires_at: Option<Timestamp>) {
        if let Some(account) = self.accounts.get_mut(&id) {
            account.tier = tier;
            account.tier_expires_at = expires_at;
        }
    }

    // Promotional credits. Excluded from fair-profit ranking via the
    // bonus_received accumulator; one-shot kinds are claim-once.
    pub fn grant_bonus(
        &mut self,
        id: AccountId,
        kind: BonusKind,
        amount: Eur,
    ) -> Result<(), EngineError> {
        if !amount.is_positive() {
            return Err(EngineError::InvalidArgument(
                "bonus amount must be positive".to_string(),
            ));
        }
        let now = self.current_time;
        let account = self
            .accounts
            .get_mut(&id)
            .ok_or(EngineError::AccountNotFound(id))?;

        let claimed = match kind {
            BonusKind::Story => &mut account.story_bonus_claimed,
            BonusKind::Inactivity => &mut account.inactivity_bonus_claimed,
            BonusKind::Feedback => &mut account.feedback_sent,
        };
        if *claimed {
            return Err(EngineError::Forbidden("bonus already claimed".to_string()));
        }
        *claimed = true;

        account.credit(amount, now);
        account.bonus_received = account.bonus_received.add(amount);

        self.ledger.log(
            id,
            TxKind::Bonus,
            None,
            amount,
            None,
            Eur::zero(),
            amount,
            now,
        );
        self.emit(EventPayload::BonusGranted(BonusGrantedEvent {
            account: id,
            kind,
            amount,
        }));
        Ok(())
    }

    pub fn record_strike(&mut self, id: AccountId) -> Result<u32, EngineError> {
        let account = self
            .accounts
            .get_mut(&id)
            .ok_or(EngineError::AccountNotFound(id))?;
        Ok(account.record_strike())
    }

    // explicit-request or inactivity deletion: positions and transactions
    // go with the account
    pub fn delete_account(&mut self, id: AccountId) -> Result<(), EngineError> {
        self.accounts
            .remove(&id)
            .ok_or(EngineError::AccountNotFound(id))?;
        self.store.remove_for_account(id);
        Ok(())
    }

    pub fn transactions(&self, id: AccountId) -> Vec<&Transaction> {
        self.ledger.history(id)
    }

    pub fn fee_pool_total(&self) -> Eur {
        self.fee_pool.total()
    }

    pub fn events(&self) -> &[GameEvent] {
        &self.events
    }

    pub fn recent_events(&self, count: usize) -> &[GameEvent] {
        let start = self.events.len().saturating_sub(count);
        &self.events[start..]
    }

    pub(crate) fn emit(&mut self, payload: EventPayload) {
        let event = GameEvent {
            id: EventId(self.next_event_id),
            timestamp: self.current_time,
            payload,
        };
        self.next_event_id += 1;

        if let Err(e) = self.sink.deliver(&event) {
            // delivery must never abort settlement
            warn!(error = %e, event = event.id.0, "dropping undeliverable notification");
        }

        self.events.push(event);

        if self.events.len() > self.config.max_events {
            let drain_count = self.events.len() - self.config.max_events;
            self.events.drain(0..drain_count);
        }
    }
}
