//! Position store.
//!
//! Owns the position lifecycle. Every lookup that feeds a settlement path is
//! scoped to status Open, so a user close racing a scanner liquidation has at
//! most one winner: whichever lands first flips the status, the loser sees
//! `None` and treats it as a no-op.

use std::collections::BTreeMap;

use crate::position::{Position, PositionStatus};
use crate::types::{AccountId, Eur, Price, PositionId, Timestamp};

#[derive(Debug, Default)]
pub struct PositionStore {
    positions: BTreeMap<PositionId, Position>,
    next_id: u64,
}

impl PositionStore {
    pub fn new() -> Self {
        Self {
            positions: BTreeMap::new(),
            next_id: 1,
        }
    }

    pub fn open(&mut self, mut position: Position) -> PositionId {
        let id = PositionId(self.next_id);
        self.next_id += 1;
        position.id = id;
        position.status = PositionStatus::Open;
        self.positions.insert(id, position);
        id
    }

    // status-scoped read: closed and liquidated rows are invisible here
    pub fn get_open(&self, id: PositionId) -> Option<&Position> {
        self.positions.get(&id).filter(|p| p.is_open())
    }

    pub fn open_for_account(&self, account: AccountId) -> Vec<&Position> {
        self.positions
            .values()
            .filter(|p| p.is_open() && p.account == account)
            .collect()
    }

    pub fn all_open(&self) -> Vec<&Position> {
        self.positions.values().filter(|p| p.is_open()).collect()
    }

    pub fn history_for_account(&self, account: AccountId) -> Vec<&Position> {
        self.positions
            .values()
            .filter(|p| !p.is_open() && p.account == account)
            .collect()
    }

    // Settles part of an open position in place: reduced collateral, booked
    // pnl share. Entry, leverage and liquidation price stay untouched.
    pub fn apply_partial(
        &mut self,
        id: PositionId,
        remaining_collateral: Eur,
        settled_pnl: Eur,
    ) -> Option<&Position> {
        let position = self.positions.get_mut(&id).filter(|p| p.is_open())?;
        position.collateral = remaining_collateral;
        position.realized_pnl = position.realized_pnl.add(settled_pnl);
        Some(position)
    }

    // The single Open → {Closed, Liquidated} transition. Returns None when
    // the position is absent or already terminal, which callers treat as
    // NotFound (user close) or a no-op (second liquidation attempt).
    pub fn close(
        &mut self,
        id: PositionId,
        exit_price: Price,
        realized_pnl: Eur,
        liquidated: bool,
        now: Timestamp,
    ) -> Option<Position> {
        let position = self.positions.get_mut(&id).filter(|p| p.is_open())?;
        position.status = if liquidated {
            PositionStatus::Liquidated
        } else {
            PositionStatus::Closed
        };
        position.exit_price = Some(exit_price);
        position.realized_pnl = position.realized_pnl.add(realized_pnl);
        position.closed_at = Some(now);
        Some(position.clone())
    }

    // account-deletion cascade
    pub fn remove_for_account(&mut self, account: AccountId) -> usize {
        let before = self.positions.len();
        self.positions.retain(|_, p| p.account != account);
        before - self.positions.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::position::liquidation_price;
    use crate::types::{Leverage, Side, Symbol};
    use rust_decimal_macros::dec;

    fn draft(account: u64) -> Position {
        let leverage = Leverage::new(10).unwrap();
        let entry = Price::new_unchecked(dec!(50000));
        Position {
            id: PositionId(0),
            account: AccountId(account),
            symbol: Symbol::new("BTC"),
            side: Side::Long,
            leverage,
            collateral: Eur::new(dec!(100)),
            entry_price: entry,
            liquidation_price: liquidation_price(entry, leverage, Side::Long),
            status: PositionStatus::Open,
            stop_loss: None,
            take_profit: None,
            limit_entry: None,
            trailing_stop: false,
            opened_at: Timestamp::from_millis(0),
            closed_at: None,
            exit_price: None,
            realized_pnl: Eur::zero(),
        }
    }

    #[test]
    fn open_assigns_ids_and_scopes_reads() {
        let mut store = PositionStore::new();
        let a = store.open(draft(1));
        let b = store.open(draft(1));
        let c = store.open(draft(2));
        assert_ne!(a, b);

        assert_eq!(store.open_for_account(AccountId(1)).len(), 2);
        assert_eq!(store.open_for_account(AccountId(2)).len(), 1);
        assert_eq!(store.all_open().len(), 3);
        assert!(store.get_open(c).is_some());
    }

    #[test]
    fn close_transitions_exactly_once() {
        let mut store = PositionStore::new();
        let id = store.open(draft(1));

        let closed = store
            .close(
                id,
                Price::new_unchecked(dec!(51000)),
                Eur::new(dec!(200)),
                false,
                Timestamp::from_millis(5),
            )
            .unwrap();
        assert_eq!(closed.status, PositionStatus::Closed);
        assert_eq!(closed.exit_price, Some(Price::new_unchecked(dec!(51000))));
        assert_eq!(closed.closed_at, Some(Timestamp::from_millis(5)));

        // second transition is a no-op
        assert!(store
            .close(
                id,
                Price::new_unchecked(dec!(1)),
                Eur::zero(),
                true,
                Timestamp::from_millis(6)
            )
            .is_none());
        assert!(store.get_open(id).is_none());
        assert_eq!(store.history_for_account(AccountId(1)).len(), 1);
    }

    #[test]
    fn liquidated_status_is_distinct() {
        let mut store = PositionStore::new();
        let id = store.open(draft(1));
        let closed = store
            .close(
                id,
                Price::new_unchecked(dec!(45000)),
                Eur::new(dec!(-100)),
                true,
                Timestamp::from_millis(1),
            )
            .unwrap();
        assert_eq!(closed.status, PositionStatus::Liquidated);
    }

    #[test]
    fn partial_updates_only_open_rows() {
        let mut store = PositionStore::new();
        let id = store.open(draft(1));

        store
            .apply_partial(id, Eur::new(dec!(50)), Eur::new(dec!(10)))
            .unwrap();
        let pos = store.get_open(id).unwrap();
        assert_eq!(pos.collateral.value(), dec!(50));
        assert_eq!(pos.realized_pnl.value(), dec!(10));
        // liquidation price untouched
        assert_eq!(pos.liquidation_price.value(), dec!(45000));

        store
            .close(
                id,
                Price::new_unchecked(dec!(50000)),
                Eur::zero(),
                false,
                Timestamp::from_millis(2),
            )
            .unwrap();
        assert!(store.apply_partial(id, Eur::zero(), Eur::zero()).is_none());
    }

    #[test]
    fn cascade_removal() {
        let mut store = PositionStore::new();
        store.open(draft(1));
        store.open(draft(1));
        store.open(draft(2));
        assert_eq!(store.remove_for_account(AccountId(1)), 2);
        assert_eq!(store.all_open().len(), 1);
    }
}
