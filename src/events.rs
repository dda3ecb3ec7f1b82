// 11.0: every settlement produces an event. the engine keeps a capped event
// log for audit, and forwards each event to a notification sink for user
// delivery. delivery is fire-and-forget: a failing sink is logged and
// ignored, it never aborts a financial operation that already succeeded.

use serde::{Deserialize, Serialize};

use crate::types::{AccountId, Eur, EventId, Leverage, Price, PositionId, Side, Symbol, Timestamp};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameEvent {
    pub id: EventId,
    pub timestamp: Timestamp,
    pub payload: EventPayload,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum EventPayload {
    PositionOpened(PositionOpenedEvent),
    PositionClosed(PositionClosedEvent),
    PositionLiquidated(PositionLiquidatedEvent),
    SeasonStarted(SeasonStartedEvent),
    SeasonEnded(SeasonEndedEvent),
    PrizeAwarded(PrizeAwardedEvent),
    BonusGranted(BonusGrantedEvent),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PositionOpenedEvent {
    pub account: AccountId,
    pub position: PositionId,
    pub symbol: Symbol,
    pub side: Side,
    pub leverage: Leverage,
    pub collateral: Eur,
    pub entry_price: Price,
    pub liquidation_price: Price,
    pub fee: Eur,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CloseReason {
    UserClosed,
    PartialClose,
    StopLoss,
    TakeProfit,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PositionClosedEvent {
    pub account: AccountId,
    pub position: PositionId,
    pub symbol: Symbol,
    pub exit_price: Price,
    pub pnl: Eur,
    pub payout: Eur,
    pub reason: CloseReason,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PositionLiquidatedEvent {
    pub account: AccountId,
    pub position: PositionId,
    pub symbol: Symbol,
    pub side: Side,
    pub trigger_price: Price,
    pub collateral_lost: Eur,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeasonStartedEvent {
    pub name: String,
    pub starts_at: Timestamp,
    pub ends_at: Timestamp,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeasonEndedEvent {
    pub name: String,
    pub pool_distributed: Eur,
    pub winners: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrizeAwardedEvent {
    pub account: AccountId,
    pub season: String,
    pub rank: usize,
    pub amount: Eur,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BonusKind {
    Story,
    Inactivity,
    Feedback,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BonusGrantedEvent {
    pub account: AccountId,
    pub kind: BonusKind,
    pub amount: Eur,
}

#[derive(Debug, Clone, thiserror::Error)]
#[error("notification delivery failed: {0}")]
pub struct NotifyError(pub String);

pub trait NotificationSink: Send {
    fn deliver(&mut self, event: &GameEvent) -> Result<(), NotifyError>;
}

// drops everything; the default sink when no chat frontend is attached
#[derive(Debug, Default)]
pub struct NullSink;

impl NotificationSink for NullSink {
    fn deliver(&mut self, _event: &GameEvent) -> Result<(), NotifyError> {
        Ok(())
    }
}

// Test sink with a shared buffer, so callers keep a handle after the
// engine takes ownership.
#[derive(Debug, Clone, Default)]
pub struct EventCollector {
    delivered: std::sync::Arc<std::sync::Mutex<Vec<GameEvent>>>,
}

impl EventCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn delivered(&self) -> Vec<GameEvent> {
        self.delivered.lock().expect("collector lock poisoned").clone()
    }
}

impl NotificationSink for EventCollector {
    fn deliver(&mut self, event: &GameEvent) -> Result<(), NotifyError> {
        self.delivered
            .lock()
            .expect("collector lock poisoned")
            .push(event.clone());
        Ok(())
    }
}
