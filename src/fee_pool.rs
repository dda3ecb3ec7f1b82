// 2.5: the season prize pool. fed by a cut of every position's notional,
// paid out to the top of the leaderboard at season end.
//
// kept as an append-only list of fee events summed on read instead of a
// mutable accumulator, so concurrent collectors never race a
// read-modify-write and the pool history stays auditable.

use serde::{Deserialize, Serialize};

use crate::types::{Eur, Timestamp};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeeEvent {
    pub amount: Eur,
    pub at: Timestamp,
}

#[derive(Debug, Default)]
pub struct FeePool {
    events: Vec<FeeEvent>,
}

impl FeePool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn collect(&mut self, amount: Eur, at: Timestamp) {
        if amount.is_positive() {
            self.events.push(FeeEvent { amount, at });
        }
    }

    // prize payouts are negative events; the sum stays the live balance
    pub fn drain(&mut self, amount: Eur, at: Timestamp) {
        if amount.is_positive() {
            self.events.push(FeeEvent {
                amount: amount.negate(),
                at,
            });
        }
    }

    pub fn total(&self) -> Eur {
        self.events.iter().map(|e| e.amount).sum()
    }

    pub fn events(&self) -> &[FeeEvent] {
        &self.events
    }
}
