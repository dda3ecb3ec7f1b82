// 6.0: rankings. every board is computed on demand from account state and
// a fresh price snapshot; nothing here is cached.
//
// net worth = cash balance + spot holdings at current prices + the value of
// open leveraged positions settled at current prices. a symbol with no
// quote contributes its book value (holdings count zero, positions count
// their posted collateral) rather than failing the whole board.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::engine::Engine;
use crate::position::close_payout;
use crate::types::{AccountId, Eur};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RankingFilter {
    // net worth delta since season start, best first
    SeasonProfit,
    // same delta, worst first
    SeasonLoss,
    // net worth delta since day start
    DailyProfit,
    DailyLoss,
    // season profit minus gifted bonuses
    FairProfit,
    // absolute net worth
    NetWorth,
    // lifetime traded notional
    Volume,
}

impl RankingFilter {
    fn ascending(&self) -> bool {
        matches!(self, RankingFilter::SeasonLoss | RankingFilter::DailyLoss)
    }
}

#[derive(Debug, Clone)]
pub struct LeaderboardEntry {
    pub rank: usize,
    pub account: AccountId,
    pub display_name: String,
    pub score: Eur,
    // score relative to the performance basis; 0 when the basis is not
    // positive or the filter has no basis
    pub score_percent: Decimal,
    pub net_worth: Eur,
}

impl Engine {
    // cash + spot holdings, without open leveraged positions
    pub fn cash_worth(&self, id: AccountId) -> Option<Eur> {
        let account = self.accounts.get(&id)?;
        let holdings_value: Decimal = account
            .holdings
            .iter()
            .filter_map(|(symbol, amount)| {
                self.oracle
                    .current_price(symbol)
                    .map(|price| price.value() * amount)
            })
            .sum();
        Some(account.balance.add(Eur::new(holdings_value)))
    }

    pub fn net_worth(&self, id: AccountId) -> Option<Eur> {
        let cash = self.cash_worth(id)?;
        let positions_value: Eur = self
            .store
            .open_for_account(id)
            .into_iter()
            .map(|position| match self.oracle.current_price(&position.symbol) {
                Some(price) => close_payout(position.collateral, position.pnl_at(price)),
                None => position.collateral,
            })
            .sum();
        Some(cash.add(positions_value))
    }

    pub fn leaderboard(&self, filter: RankingFilter) -> Vec<LeaderboardEntry> {
        let mut entries: Vec<LeaderboardEntry> = self
            .accounts
            .values()
            .filter_map(|account| {
                let net_worth = self.net_worth(account.id)?;

                // a zeroed baseline falls back so a fresh or migrated
                // account still gets a sane delta
                let season_basis = if account.season_start_worth.is_positive() {
                    account.season_start_worth
                } else {
                    self.config.starting_balance
                };
                let day_basis = if account.day_start_worth.is_positive() {
                    account.day_start_worth
                } else {
                    net_worth
                };

                let (score, basis) = match filter {
                    RankingFilter::SeasonProfit | RankingFilter::SeasonLoss => {
                        (net_worth.sub(season_basis), Some(season_basis))
                    }
                    RankingFilter::DailyProfit | RankingFilter::DailyLoss => {
                        (net_worth.sub(day_basis), Some(day_basis))
                    }
                    RankingFilter::FairProfit => (
                        net_worth
                            .sub(account.bonus_received)
                            .sub(self.config.starting_balance),
                        Some(self.config.starting_balance),
                    ),
                    RankingFilter::NetWorth => (net_worth, None),
                    RankingFilter::Volume => (account.lifetime_volume, None),
                };
                let score_percent = match basis {
                    Some(basis) if basis.is_positive() => {
                        score.value() / basis.value() * dec!(100)
                    }
                    _ => Decimal::ZERO,
                };

                Some(LeaderboardEntry {
                    rank: 0,
                    account: account.id,
                    display_name: account.display_name.clone(),
                    score,
                    score_percent,
                    net_worth,
                })
            })
            .collect();

        // account id breaks ties deterministically
        if filter.ascending() {
            entries.sort_by(|a, b| a.score.cmp(&b.score).then(a.account.cmp(&b.account)));
        } else {
            entries.sort_by(|a, b| b.score.cmp(&a.score).then(a.account.cmp(&b.account)));
        }
        for (i, entry) in entries.iter_mut().enumerate() {
            entry.rank = i + 1;
        }
        entries
    }

    // midnight job: today's profit baseline becomes the current net worth
    pub fn snapshot_day_start(&mut self) {
        let worths: Vec<(AccountId, Eur)> = self
            .accounts
            .keys()
            .filter_map(|&id| self.net_worth(id).map(|w| (id, w)))
            .collect();
        for (id, worth) in worths {
            if let Some(account) = self.accounts.get_mut(&id) {
                account.day_start_worth = worth;
            }
        }
    }
}
