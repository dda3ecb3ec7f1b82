// 8.0: core game engine. coordinates position opening, close settlement,
// liquidation sweeps and account bookkeeping. deterministic under an
// explicit clock; the async runtime drives it from outside.

mod close;
mod core;
mod liquidations;
mod open;
mod results;

pub use core::Engine;
pub use open::OpenRequest;
pub use results::{
    CloseReceipt, EngineError, LiquidationOutcome, OpenReceipt, PositionsView, SweepReport,
};
