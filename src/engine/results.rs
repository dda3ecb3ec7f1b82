// 8.0.2: result types and the error taxonomy for engine operations.

use crate::policy::TradePolicy;
use crate::position::Position;
use crate::types::{AccountId, Eur, Price, PositionId, Symbol};

#[derive(Debug, Clone)]
pub struct OpenReceipt {
    pub position_id: PositionId,
    pub entry_price: Price,
    pub liquidation_price: Price,
    pub fee: Eur,
    // collateral + fee, the amount debited
    pub required: Eur,
}

#[derive(Debug, Clone)]
pub struct CloseReceipt {
    pub position_id: PositionId,
    pub pnl: Eur,
    pub payout: Eur,
    pub exit_price: Price,
    pub fully_closed: bool,
}

#[derive(Debug, Clone)]
pub struct LiquidationOutcome {
    pub position_id: PositionId,
    pub account: AccountId,
    pub symbol: Symbol,
    pub trigger_price: Price,
    pub collateral_lost: Eur,
}

#[derive(Debug, Clone, Default)]
pub struct SweepReport {
    pub scanned: usize,
    pub liquidated: Vec<LiquidationOutcome>,
    pub stops_executed: usize,
    pub skipped_no_price: usize,
}

// read surface behind `GET positions`
#[derive(Debug, Clone)]
pub struct PositionsView {
    pub open: Vec<Position>,
    pub history: Vec<Position>,
    pub policy: TradePolicy,
}

// Synchronous rejections never mutate state. PriceUnavailable is the one
// retryable case: the oracle had no fresh quote, nothing happened.
#[derive(Debug, Clone, thiserror::Error)]
pub enum EngineError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("insufficient funds: required {required}, available {available}")]
    InsufficientFunds { required: Eur, available: Eur },

    #[error("account {0:?} not found")]
    AccountNotFound(AccountId),

    #[error("position {0:?} not found")]
    PositionNotFound(PositionId),

    #[error("no current price for {0}")]
    PriceUnavailable(Symbol),
}
