// 8.3: close settlement. user closes, partial closes, and the shared
// settlement path the stop/take-profit executions reuse. the status flip in
// the store happens first, so a concurrent settlement of the same position
// can land at most once.

use rust_decimal::Decimal;
use tracing::info;

use super::results::{CloseReceipt, EngineError};
use super::Engine;
use crate::events::{CloseReason, EventPayload, PositionClosedEvent};
use crate::ledger::TxKind;
use crate::position::{close_payout, split_position, Position};
use crate::types::{AccountId, Eur, Price, PositionId};

impl Engine {
    pub fn close_position(
        &mut self,
        account_id: AccountId,
        position_id: PositionId,
    ) -> Result<CloseReceipt, EngineError> {
        let position = self
            .store
            .get_open(position_id)
            .ok_or(EngineError::PositionNotFound(position_id))?;
        if position.account != account_id {
            return Err(EngineError::Forbidden(
                "position belongs to another account".to_string(),
            ));
        }

        let exit_price = self
            .oracle
            .current_price(&position.symbol)
            .ok_or_else(|| EngineError::PriceUnavailable(position.symbol.clone()))?;
        let position = position.clone();

        self.settle_close(position, exit_price, CloseReason::UserClosed)
    }

    // Closes pct of an open position; pct == 1 is just a full close.
    pub fn partial_close_position(
        &mut self,
        account_id: AccountId,
        position_id: PositionId,
        pct: Decimal,
    ) -> Result<CloseReceipt, EngineError> {
        if pct <= Decimal::ZERO || pct > Decimal::ONE {
            return Err(EngineError::InvalidArgument(format!(
                "close fraction {pct} must be in (0, 1]"
            )));
        }
        if pct == Decimal::ONE {
            return self.close_position(account_id, position_id);
        }

        let position = self
            .store
            .get_open(position_id)
            .ok_or(EngineError::PositionNotFound(position_id))?;
        if position.account != account_id {
            return Err(EngineError::Forbidden(
                "position belongs to another account".to_string(),
            ));
        }

        let exit_price = self
            .oracle
            .current_price(&position.symbol)
            .ok_or_else(|| EngineError::PriceUnavailable(position.symbol.clone()))?;
        let position = position.clone();
        let now = self.current_time;

        let split = split_position(&position, pct, exit_price);
        self.store
            .apply_partial(position_id, split.remaining_collateral, split.settled_pnl)
            .ok_or(EngineError::PositionNotFound(position_id))?;

        let account = self
            .accounts
            .get_mut(&account_id)
            .ok_or(EngineError::AccountNotFound(account_id))?;
        account.credit(split.payout, now);
        // settled share of the notional counts toward lifetime volume
        account.add_volume(
            split.released_collateral.mul(position.leverage.as_decimal()),
            now,
        );

        self.ledger.log(
            account_id,
            TxKind::LeveragePartialClose,
            Some(position.symbol.clone()),
            split.released_collateral,
            Some(exit_price),
            Eur::zero(),
            split.payout,
            now,
        );

        self.emit(EventPayload::PositionClosed(PositionClosedEvent {
            account: account_id,
            position: position_id,
            symbol: position.symbol.clone(),
            exit_price,
            pnl: split.settled_pnl,
            payout: split.payout,
            reason: CloseReason::PartialClose,
        }));

        info!(
            account = account_id.0,
            position = position_id.0,
            pct = %pct,
            payout = %split.payout,
            remaining = %split.remaining_collateral,
            "partial close settled"
        );

        Ok(CloseReceipt {
            position_id,
            pnl: split.settled_pnl,
            payout: split.payout,
            exit_price,
            fully_closed: false,
        })
    }

    // Shared full-close settlement: flips the status, pays out, books the
    // ledger row and event. Caller has already verified ownership and fetched
    // a price.
    pub(crate) fn settle_close(
        &mut self,
        position: Position,
        exit_price: Price,
        reason: CloseReason,
    ) -> Result<CloseReceipt, EngineError> {
        let now = self.current_time;
        let pnl = position.pnl_at(exit_price);
        let payout = close_payout(position.collateral, pnl);

        // single Open -> Closed transition; a loser in a settlement race
        // sees NotFound here and nothing else happens
        self.store
            .close(position.id, exit_price, pnl, false, now)
            .ok_or(EngineError::PositionNotFound(position.id))?;

        let account = self
            .accounts
            .get_mut(&position.account)
            .ok_or(EngineError::AccountNotFound(position.account))?;
        account.credit(payout, now);
        account.add_volume(position.notional(), now);

        self.ledger.log(
            position.account,
            TxKind::LeverageClose,
            Some(position.symbol.clone()),
            pnl,
            Some(exit_price),
            Eur::zero(),
            payout,
            now,
        );

        self.emit(EventPayload::PositionClosed(PositionClosedEvent {
            account: position.account,
            position: position.id,
            symbol: position.symbol.clone(),
            exit_price,
            pnl,
            payout,
            reason,
        }));

        info!(
            account = position.account.0,
            position = position.id.0,
            symbol = %position.symbol,
            exit = %exit_price,
            pnl = %pnl,
            payout = %payout,
            ?reason,
            "position closed"
        );

        Ok(CloseReceipt {
            position_id: position.id,
            pnl,
            payout,
            exit_price,
            fully_closed: true,
        })
    }
}
