// levcore: leveraged trading game engine.
// settlement-first architecture: every payout path is deterministic and
// scoped to status-Open reads, so racing settlements land at most once.
//
// file map (search X.0 for structs, X.1+ for logic):
//   1.x  types.rs: primitives: AccountId, Symbol, Side, Eur, Price, Leverage
//   2.x  ledger.rs: append-only transaction log
//   2.5  fee_pool.rs: season prize pool fed by open fees
//   3.x  account.rs: balances, tiers, performance baselines
//   4.x  position.rs: position record, pnl, liquidation math, partial split
//   5.x  store.rs: position lifecycle, status-scoped reads
//   6.x  leaderboard.rs: net worth, ranking boards, daily snapshot
//   7.x  season.rs: season lifecycle, prize distribution, rollover
//   7.0  config.rs: fees, leverage tiers, cadences, prize weights
//   8.x  engine/: open, close, partial close, liquidation sweep
//   9.x  oracle.rs: price oracle boundary + in-memory implementation
//   10.x runtime.rs: background scanner and season clock tasks
//   11.x events.rs: audit event log and notification sinks

// core game modules
pub mod account;
pub mod engine;
pub mod events;
pub mod fee_pool;
pub mod ledger;
pub mod position;
pub mod store;
pub mod types;

// ranking and season modules
pub mod leaderboard;
pub mod season;

// integration modules
pub mod config;
pub mod oracle;
pub mod policy;
pub mod runtime;

// re exports for convenience
pub use account::*;
pub use config::*;
pub use engine::*;
pub use events::*;
pub use fee_pool::*;
pub use leaderboard::*;
pub use ledger::*;
pub use oracle::*;
pub use policy::*;
pub use position::*;
pub use season::*;
pub use store::*;
pub use types::*;
