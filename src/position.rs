// 4.0: leveraged position record and its settlement math.
// 4.1 has the pnl/payout formulas, 4.2 the partial-close split.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::{AccountId, Eur, Leverage, Price, PositionId, Side, Symbol, Timestamp};

// Explicit status machine: Open transitions exactly once, to Closed or
// Liquidated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PositionStatus {
    Open,
    Closed,
    Liquidated,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Position {
    pub id: PositionId,
    pub account: AccountId,
    pub symbol: Symbol,
    pub side: Side,
    pub leverage: Leverage,
    pub collateral: Eur,
    pub entry_price: Price,
    // fixed at open; a partial close deliberately does not move it
    pub liquidation_price: Price,
    pub status: PositionStatus,
    pub stop_loss: Option<Price>,
    pub take_profit: Option<Price>,
    pub limit_entry: Option<Price>,
    pub trailing_stop: bool,
    pub opened_at: Timestamp,
    pub closed_at: Option<Timestamp>,
    pub exit_price: Option<Price>,
    pub realized_pnl: Eur,
}

impl Position {
    pub fn is_open(&self) -> bool {
        self.status == PositionStatus::Open
    }

    // 4.1: effective exposure = collateral x leverage
    pub fn notional(&self) -> Eur {
        self.collateral.mul(self.leverage.as_decimal())
    }

    pub fn pnl_at(&self, exit: Price) -> Eur {
        position_pnl(self.side, self.entry_price, exit, self.notional())
    }

    // hard threshold, direction-appropriate: <= for longs, >= for shorts
    pub fn liquidation_triggered(&self, current: Price) -> bool {
        match self.side {
            Side::Long => current <= self.liquidation_price,
            Side::Short => current >= self.liquidation_price,
        }
    }

    pub fn stop_loss_triggered(&self, current: Price) -> bool {
        match (self.stop_loss, self.side) {
            (Some(stop), Side::Long) => current <= stop,
            (Some(stop), Side::Short) => current >= stop,
            (None, _) => false,
        }
    }

    pub fn take_profit_triggered(&self, current: Price) -> bool {
        match (self.take_profit, self.side) {
            (Some(target), Side::Long) => current >= target,
            (Some(target), Side::Short) => current <= target,
            (None, _) => false,
        }
    }
}

// 4.1: the price at which accumulated loss equals posted collateral exactly
// (100% margin loss, linear pnl on notional).
// long: entry * (1 - 1/L), short: entry * (1 + 1/L)
pub fn liquidation_price(entry: Price, leverage: Leverage, side: Side) -> Price {
    let fraction = leverage.margin_fraction();
    let value = match side {
        Side::Long => entry.value() * (Decimal::ONE - fraction),
        Side::Short => entry.value() * (Decimal::ONE + fraction),
    };
    Price::new_unchecked(value)
}

// pnl on notional exposure:
// long: ((exit - entry) / entry) * notional, short mirrored
pub fn position_pnl(side: Side, entry: Price, exit: Price, notional: Eur) -> Eur {
    let move_fraction = (exit.value() - entry.value()) / entry.value();
    notional.mul(side.sign() * move_fraction)
}

// collateral can be fully wiped but the payout never goes negative
pub fn close_payout(collateral: Eur, pnl: Eur) -> Eur {
    collateral.add(pnl).max_zero()
}

#[derive(Debug, Clone)]
pub struct PartialSplit {
    pub payout: Eur,
    pub settled_pnl: Eur,
    pub released_collateral: Eur,
    pub remaining_collateral: Eur,
}

// 4.2: proportional split for a partial close. settles pct of the notional
// pnl and releases pct of the collateral; the remainder keeps the original
// entry price, leverage and liquidation price.
pub fn split_position(position: &Position, pct: Decimal, exit: Price) -> PartialSplit {
    debug_assert!(pct > Decimal::ZERO && pct < Decimal::ONE);

    let total_pnl = position.pnl_at(exit);
    let settled_pnl = total_pnl.mul(pct);
    let released_collateral = position.collateral.mul(pct);

    PartialSplit {
        payout: released_collateral.add(settled_pnl).max_zero(),
        settled_pnl,
        released_collateral,
        remaining_collateral: position.collateral.sub(released_collateral),
    }
}
