// 7.0: season lifecycle. a season is a fixed-length ranking epoch; when it
// ends, the fee pool is paid out to the top of the season-profit board and
// a new season begins immediately. the end check is driven by a timer but
// guarded by state, so it fires exactly once no matter how often it runs.

use rust_decimal::RoundingStrategy;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::engine::Engine;
use crate::events::{
    EventPayload, PrizeAwardedEvent, SeasonEndedEvent, SeasonStartedEvent,
};
use crate::leaderboard::RankingFilter;
use crate::ledger::TxKind;
use crate::types::{AccountId, Eur, Timestamp};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Season {
    pub name: String,
    pub starts_at: Timestamp,
    pub ends_at: Timestamp,
    pub ended: bool,
    pub awards: Vec<PrizeAward>,
}

impl Season {
    pub fn is_active(&self, now: Timestamp) -> bool {
        !self.ended && now < self.ends_at
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrizeAward {
    pub account: AccountId,
    pub rank: usize,
    pub amount: Eur,
}

#[derive(Debug, Clone)]
pub struct SeasonTransition {
    pub ended_season: String,
    pub awards: Vec<PrizeAward>,
    pub distributed: Eur,
    // share of the pool for unfilled ranks, kept for the next season
    pub rolled_over: Eur,
    pub next_season: String,
}

impl Engine {
    // Starts the first season, or the next one after a finished season.
    // Idempotent while a season is running.
    pub fn ensure_active_season(&mut self) -> &Season {
        let needs_new = match self.seasons.last() {
            Some(season) => season.ended,
            None => true,
        };
        if needs_new {
            let starts_at = self.current_time;
            let ends_at = starts_at.plus_days(self.config.season_length_days);
            let season = Season {
                name: format!("Season {}", self.seasons.len() + 1),
                starts_at,
                ends_at,
                ended: false,
                awards: Vec::new(),
            };
            info!(season = %season.name, ends_at = ends_at.as_millis(), "season started");
            self.emit(EventPayload::SeasonStarted(SeasonStartedEvent {
                name: season.name.clone(),
                starts_at,
                ends_at,
            }));
            self.seasons.push(season);
        }
        // just pushed or already present
        match self.seasons.last() {
            Some(season) => season,
            None => unreachable!("ensure_active_season always leaves a season"),
        }
    }

    pub fn current_season(&self) -> Option<&Season> {
        self.seasons.last().filter(|s| !s.ended)
    }

    // The periodic end check. Returns Some only on the tick that actually
    // closes a season; every other call is a cheap no-op.
    pub fn check_season_end(&mut self) -> Option<SeasonTransition> {
        self.ensure_active_season();
        let now = self.current_time;
        let season_index = self.seasons.len() - 1;
        {
            let season = &self.seasons[season_index];
            if season.ended || now < season.ends_at {
                return None;
            }
        }

        let ended_name = self.seasons[season_index].name.clone();
        let awards = self.distribute_prizes(&ended_name);
        let distributed: Eur = awards.iter().map(|a| a.amount).sum();
        // what the unfilled ranks would have won stays in the pool
        let rolled_over = self.fee_pool.total();

        {
            let season = &mut self.seasons[season_index];
            season.ended = true;
            season.awards = awards.clone();
        }

        self.emit(EventPayload::SeasonEnded(SeasonEndedEvent {
            name: ended_name.clone(),
            pool_distributed: distributed,
            winners: awards.len(),
        }));
        info!(
            season = %ended_name,
            distributed = %distributed,
            rolled_over = %rolled_over,
            winners = awards.len(),
            "season ended"
        );

        self.rebase_season_baselines();
        let next_season = self.ensure_active_season().name.clone();

        Some(SeasonTransition {
            ended_season: ended_name,
            awards,
            distributed,
            rolled_over,
            next_season,
        })
    }

    // Pays rank 1..=N of the season-profit board their weighted share of
    // the pool. Only positive profit qualifies; shares are rounded toward
    // zero and capped at what is left in the pool, so the sum can never
    // exceed it even under a bad weight list.
    fn distribute_prizes(&mut self, season_name: &str) -> Vec<PrizeAward> {
        let pool = self.fee_pool.total();
        if !pool.is_positive() {
            return Vec::new();
        }

        let winners: Vec<(AccountId, usize)> = self
            .leaderboard(RankingFilter::SeasonProfit)
            .into_iter()
            .filter(|entry| entry.score.is_positive())
            .take(self.config.prize_weights.len())
            .map(|entry| (entry.account, entry.rank))
            .collect();

        let now = self.current_time;
        let mut remaining = pool;
        let mut awards = Vec::with_capacity(winners.len());
        for (i, (account_id, rank)) in winners.into_iter().enumerate() {
            let weight = self.config.prize_weights[i];
            let share = Eur::new(
                (pool.value() * weight).round_dp_with_strategy(2, RoundingStrategy::ToZero),
            );
            let amount = share.min(remaining);
            if !amount.is_positive() {
                continue;
            }

            let Some(account) = self.accounts.get_mut(&account_id) else {
                continue;
            };
            account.credit(amount, now);
            self.fee_pool.drain(amount, now);
            remaining = remaining.sub(amount);
            self.ledger.log(
                account_id,
                TxKind::SeasonPrize,
                None,
                amount,
                None,
                Eur::zero(),
                amount,
                now,
            );
            self.emit(EventPayload::PrizeAwarded(PrizeAwardedEvent {
                account: account_id,
                season: season_name.to_string(),
                rank,
                amount,
            }));
            awards.push(PrizeAward {
                account: account_id,
                rank,
                amount,
            });
        }
        awards
    }

    // Everyone restarts from their current net worth, prizes included, so
    // nobody carries a ranking head start into the new season.
    fn rebase_season_baselines(&mut self) {
        let worths: Vec<(AccountId, Eur)> = self
            .accounts
            .keys()
            .filter_map(|&id| self.net_worth(id).map(|w| (id, w)))
            .collect();
        for (id, worth) in worths {
            if let Some(account) = self.accounts.get_mut(&id) {
                account.season_start_worth = worth;
                account.day_start_worth = worth;
            }
        }
    }
}
