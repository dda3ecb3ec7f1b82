// 8.2: position opening. all validation happens before the single debit,
// so a rejected request leaves no partial state behind.

use tracing::info;

use super::results::{EngineError, OpenReceipt};
use super::Engine;
use crate::account::AccountError;
use crate::events::{EventPayload, PositionOpenedEvent};
use crate::ledger::TxKind;
use crate::policy::leverage_allowed;
use crate::position::{liquidation_price, Position, PositionStatus};
use crate::types::{AccountId, Eur, Leverage, Price, PositionId, Side, Symbol};

#[derive(Debug, Clone)]
pub struct OpenRequest {
    pub symbol: Symbol,
    pub side: Side,
    pub collateral: Eur,
    pub leverage: u32,
    pub stop_loss: Option<Price>,
    pub take_profit: Option<Price>,
    pub limit_entry: Option<Price>,
    pub trailing_stop: bool,
}

impl OpenRequest {
    pub fn market(symbol: Symbol, side: Side, collateral: Eur, leverage: u32) -> Self {
        Self {
            symbol,
            side,
            collateral,
            leverage,
            stop_loss: None,
            take_profit: None,
            limit_entry: None,
            trailing_stop: false,
        }
    }

    fn uses_advanced_orders(&self) -> bool {
        self.stop_loss.is_some()
            || self.take_profit.is_some()
            || self.limit_entry.is_some()
            || self.trailing_stop
    }

    // a stop above the entry (long) would fire immediately; same for a
    // take-profit below it
    fn validate_triggers(&self, entry: Price) -> Result<(), EngineError> {
        match (self.side, self.stop_loss) {
            (Side::Long, Some(stop)) if stop >= entry => {
                return Err(EngineError::InvalidArgument(format!(
                    "stop loss {stop} must be below entry {entry} for a long"
                )));
            }
            (Side::Short, Some(stop)) if stop <= entry => {
                return Err(EngineError::InvalidArgument(format!(
                    "stop loss {stop} must be above entry {entry} for a short"
                )));
            }
            _ => {}
        }
        match (self.side, self.take_profit) {
            (Side::Long, Some(target)) if target <= entry => {
                return Err(EngineError::InvalidArgument(format!(
                    "take profit {target} must be above entry {entry} for a long"
                )));
            }
            (Side::Short, Some(target)) if target >= entry => {
                return Err(EngineError::InvalidArgument(format!(
                    "take profit {target} must be below entry {entry} for a short"
                )));
            }
            _ => {}
        }
        Ok(())
    }
}

impl Engine {
    pub fn open_position(
        &mut self,
        account_id: AccountId,
        request: OpenRequest,
    ) -> Result<OpenReceipt, EngineError> {
        let now = self.current_time;
        let policy = self.policy_for(account_id)?;

        if !request.collateral.is_positive() {
            return Err(EngineError::InvalidArgument(
                "collateral must be positive".to_string(),
            ));
        }

        let leverage = Leverage::new(request.leverage).ok_or_else(|| {
            EngineError::InvalidArgument(format!("leverage {}x below minimum", request.leverage))
        })?;
        if !leverage_allowed(&policy, request.leverage, &self.config) {
            return Err(EngineError::Forbidden(format!(
                "leverage {leverage} not available (ceiling {}x)",
                policy.max_leverage
            )));
        }

        if request.uses_advanced_orders() && !policy.advanced_orders_allowed {
            return Err(EngineError::Forbidden(
                "stop loss, take profit, limit and trailing orders require the pro tier"
                    .to_string(),
            ));
        }

        let open_count = self.store.open_for_account(account_id).len();
        if open_count >= policy.max_positions {
            return Err(EngineError::Forbidden(format!(
                "open position limit reached ({} of {})",
                open_count, policy.max_positions
            )));
        }

        let entry_price = self
            .oracle
            .current_price(&request.symbol)
            .ok_or_else(|| EngineError::PriceUnavailable(request.symbol.clone()))?;
        request.validate_triggers(entry_price)?;

        // fee on notional, charged up front on top of the collateral
        let notional = request.collateral.mul(leverage.as_decimal());
        let fee = notional.mul(self.config.fee_rate);
        let required = request.collateral.add(fee);

        // the only mutation that can fail; nothing above has touched state
        let account = self
            .accounts
            .get_mut(&account_id)
            .ok_or(EngineError::AccountNotFound(account_id))?;
        account
            .debit(required, now)
            .map_err(|AccountError::InsufficientBalance { requested, available }| {
                EngineError::InsufficientFunds {
                    required: requested,
                    available,
                }
            })?;
        account.add_volume(notional, now);

        self.fee_pool.collect(fee, now);

        let liq_price = liquidation_price(entry_price, leverage, request.side);
        let position = Position {
            id: PositionId(0), // store assigns
            account: account_id,
            symbol: request.symbol.clone(),
            side: request.side,
            leverage,
            collateral: request.collateral,
            entry_price,
            liquidation_price: liq_price,
            status: PositionStatus::Open,
            stop_loss: request.stop_loss,
            take_profit: request.take_profit,
            limit_entry: request.limit_entry,
            trailing_stop: request.trailing_stop,
            opened_at: now,
            closed_at: None,
            exit_price: None,
            realized_pnl: Eur::zero(),
        };
        let position_id = self.store.open(position);

        self.ledger.log(
            account_id,
            TxKind::LeverageOpen,
            Some(request.symbol.clone()),
            request.collateral,
            Some(entry_price),
            fee,
            required.negate(),
            now,
        );

        self.emit(EventPayload::PositionOpened(PositionOpenedEvent {
            account: account_id,
            position: position_id,
            symbol: request.symbol.clone(),
            side: request.side,
            leverage,
            collateral: request.collateral,
            entry_price,
            liquidation_price: liq_price,
            fee,
        }));

        info!(
            account = account_id.0,
            position = position_id.0,
            symbol = %request.symbol,
            side = %request.side,
            leverage = %leverage,
            entry = %entry_price,
            liquidation = %liq_price,
            "position opened"
        );

        Ok(OpenReceipt {
            position_id,
            entry_price,
            liquidation_price: liq_price,
            fee,
            required,
        })
    }
}
