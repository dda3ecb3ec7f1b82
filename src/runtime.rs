// 10.0: background scheduling. the engine itself is synchronous and
// single-writer; these tasks take the shared lock on a timer, do one unit of
// work, and release it. shutdown is cooperative via a watch channel.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::engine::Engine;
use crate::types::Timestamp;

pub type SharedEngine = Arc<Mutex<Engine>>;

pub struct TaskHandle {
    shutdown: watch::Sender<bool>,
    join: JoinHandle<()>,
}

impl TaskHandle {
    pub async fn stop(self) {
        // receivers see the flag flip and drain out
        let _ = self.shutdown.send(true);
        let _ = self.join.await;
    }

    pub fn abort(&self) {
        self.join.abort();
    }
}

// Liquidation scanner: one sweep per interval. The engine clock is advanced
// to wall time on every tick so trigger checks and settlements share a
// consistent timestamp.
pub fn spawn_liquidation_scanner(engine: SharedEngine, interval: Duration) -> TaskHandle {
    let (shutdown, mut watcher) = watch::channel(false);
    let join = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        info!(interval_ms = interval.as_millis() as u64, "liquidation scanner running");
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let mut engine = engine.lock().await;
                    engine.set_time(Timestamp::now());
                    let report = engine.sweep();
                    if !report.liquidated.is_empty() || report.stops_executed > 0 {
                        info!(
                            scanned = report.scanned,
                            liquidated = report.liquidated.len(),
                            stops = report.stops_executed,
                            "sweep settled positions"
                        );
                    } else {
                        debug!(scanned = report.scanned, "sweep clean");
                    }
                }
                _ = watcher.changed() => {
                    info!("liquidation scanner stopping");
                    break;
                }
            }
        }
    });
    TaskHandle { shutdown, join }
}

// Season clock: keeps a season active and fires the end-of-season
// settlement when one expires.
pub fn spawn_season_clock(engine: SharedEngine, interval: Duration) -> TaskHandle {
    let (shutdown, mut watcher) = watch::channel(false);
    let join = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        info!(interval_ms = interval.as_millis() as u64, "season clock running");
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let mut engine = engine.lock().await;
                    engine.set_time(Timestamp::now());
                    engine.ensure_active_season();
                    if let Some(transition) = engine.check_season_end() {
                        info!(
                            ended = %transition.ended_season,
                            next = %transition.next_season,
                            distributed = %transition.distributed,
                            "season rolled over"
                        );
                    }
                }
                _ = watcher.changed() => {
                    info!("season clock stopping");
                    break;
                }
            }
        }
    });
    TaskHandle { shutdown, join }
}
