// 8.4: liquidation sweep. runs on a timer, checks every open position
// against one batched price snapshot, and force-settles anything past its
// liquidation threshold. stop-loss and take-profit triggers execute on the
// same pass through the shared close path.

use tracing::{info, warn};

use super::results::{EngineError, LiquidationOutcome, SweepReport};
use super::Engine;
use crate::events::{CloseReason, EventPayload, PositionLiquidatedEvent};
use crate::ledger::TxKind;
use crate::types::{Eur, Price, PositionId};

impl Engine {
    // Force-settles one position at the trigger price: the full collateral is
    // lost, payout is zero regardless of what the pnl formula would say at
    // this price. Returns None when the position is already terminal, which
    // makes a racing second liquidation a no-op.
    pub fn liquidate(
        &mut self,
        position_id: PositionId,
        trigger_price: Price,
    ) -> Option<LiquidationOutcome> {
        let now = self.current_time;
        let realized = {
            let position = self.store.get_open(position_id)?;
            position.collateral.negate()
        };
        let position = self
            .store
            .close(position_id, trigger_price, realized, true, now)?;

        self.ledger.log(
            position.account,
            TxKind::Liquidation,
            Some(position.symbol.clone()),
            realized,
            Some(trigger_price),
            Eur::zero(),
            Eur::zero(),
            now,
        );

        self.emit(EventPayload::PositionLiquidated(PositionLiquidatedEvent {
            account: position.account,
            position: position_id,
            symbol: position.symbol.clone(),
            side: position.side,
            trigger_price,
            collateral_lost: realized.negate(),
        }));

        info!(
            account = position.account.0,
            position = position_id.0,
            symbol = %position.symbol,
            trigger = %trigger_price,
            lost = %realized.negate(),
            "position liquidated"
        );

        Some(LiquidationOutcome {
            position_id,
            account: position.account,
            symbol: position.symbol,
            trigger_price,
            collateral_lost: realized.negate(),
        })
    }

    // One sweep over all open positions. Liquidation outranks stop loss and
    // take profit when several triggers hold at the same price. A symbol with
    // no fresh quote is skipped and caught next cycle; a single failed
    // settlement is logged and never aborts the rest of the batch.
    pub fn sweep(&mut self) -> SweepReport {
        let open: Vec<_> = self.store.all_open().into_iter().cloned().collect();

        let mut symbols: Vec<_> = open.iter().map(|p| p.symbol.clone()).collect();
        symbols.sort();
        symbols.dedup();
        let prices = self.oracle.snapshot(&symbols);

        let mut report = SweepReport {
            scanned: open.len(),
            ..SweepReport::default()
        };

        for position in open {
            let Some(&price) = prices.get(&position.symbol) else {
                report.skipped_no_price += 1;
                continue;
            };

            if position.liquidation_triggered(price) {
                if let Some(outcome) = self.liquidate(position.id, price) {
                    report.liquidated.push(outcome);
                }
            } else if position.stop_loss_triggered(price) {
                match self.settle_close(position.clone(), price, CloseReason::StopLoss) {
                    Ok(_) => report.stops_executed += 1,
                    Err(EngineError::PositionNotFound(_)) => {}
                    Err(e) => {
                        warn!(position = position.id.0, error = %e, "stop loss settlement failed");
                    }
                }
            } else if position.take_profit_triggered(price) {
                match self.settle_close(position.clone(), price, CloseReason::TakeProfit) {
                    Ok(_) => report.stops_executed += 1,
                    Err(EngineError::PositionNotFound(_)) => {}
                    Err(e) => {
                        warn!(position = position.id.0, error = %e, "take profit settlement failed");
                    }
                }
            }
        }

        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::account::AccountTier;
    use crate::config::GameConfig;
    use crate::engine::OpenRequest;
    use crate::oracle::StaticOracle;
    use crate::position::PositionStatus;
    use crate::types::{AccountId, Side, Symbol, Timestamp};
    use rust_decimal_macros::dec;
    use std::sync::Arc;

    const WEDNESDAY: Timestamp = Timestamp(1_704_283_200_000);

    fn setup() -> (Engine, Arc<StaticOracle>) {
        let oracle = Arc::new(StaticOracle::new());
        oracle.set_price(Symbol::new("BTC"), Price::new_unchecked(dec!(50000)));
        let mut engine = Engine::new(GameConfig::default(), oracle.clone());
        engine.set_time(WEDNESDAY);
        engine.register_account(AccountId(1), "alice");
        (engine, oracle)
    }

    #[test]
    fn sweep_liquidates_past_threshold() {
        let (mut engine, oracle) = setup();

        // 10x long from 50000 liquidates at 45000
        let receipt = engine
            .open_position(
                AccountId(1),
                OpenRequest::market(Symbol::new("BTC"), Side::Long, Eur::new(dec!(100)), 10),
            )
            .unwrap();
        let balance_after_open = engine.get_account(AccountId(1)).unwrap().balance;

        oracle.set_price(Symbol::new("BTC"), Price::new_unchecked(dec!(44000)));
        let report = engine.sweep();

        assert_eq!(report.scanned, 1);
        assert_eq!(report.liquidated.len(), 1);
        assert_eq!(report.liquidated[0].collateral_lost.value(), dec!(100));

        // zero payout: balance unchanged since the open debit
        let account = engine.get_account(AccountId(1)).unwrap();
        assert_eq!(account.balance, balance_after_open);

        let view = engine.positions_view(AccountId(1)).unwrap();
        assert!(view.open.is_empty());
        assert_eq!(view.history[0].status, PositionStatus::Liquidated);
        assert_eq!(view.history[0].realized_pnl.value(), dec!(-100));
        assert_eq!(engine.transactions(AccountId(1)).len(), 2);

        // touching the threshold exactly also triggers
        assert_eq!(report.liquidated[0].position_id, receipt.position_id);
    }

    #[test]
    fn sweep_ignores_healthy_positions() {
        let (mut engine, oracle) = setup();
        engine
            .open_position(
                AccountId(1),
                OpenRequest::market(Symbol::new("BTC"), Side::Long, Eur::new(dec!(100)), 10),
            )
            .unwrap();

        oracle.set_price(Symbol::new("BTC"), Price::new_unchecked(dec!(45001)));
        let report = engine.sweep();
        assert!(report.liquidated.is_empty());
        assert_eq!(engine.positions_view(AccountId(1)).unwrap().open.len(), 1);
    }

    #[test]
    fn second_liquidation_is_noop() {
        let (mut engine, _oracle) = setup();
        let receipt = engine
            .open_position(
                AccountId(1),
                OpenRequest::market(Symbol::new("BTC"), Side::Long, Eur::new(dec!(100)), 10),
            )
            .unwrap();

        let trigger = Price::new_unchecked(dec!(44000));
        assert!(engine.liquidate(receipt.position_id, trigger).is_some());
        assert!(engine.liquidate(receipt.position_id, trigger).is_none());
        // one ledger row and one event for the open, one each for the kill
        assert_eq!(engine.transactions(AccountId(1)).len(), 2);
    }

    #[test]
    fn short_liquidation_direction() {
        let (mut engine, oracle) = setup();

        // 5x short from 50000 liquidates at 60000
        engine
            .open_position(
                AccountId(1),
                OpenRequest::market(Symbol::new("BTC"), Side::Short, Eur::new(dec!(200)), 5),
            )
            .unwrap();

        oracle.set_price(Symbol::new("BTC"), Price::new_unchecked(dec!(60000)));
        let report = engine.sweep();
        assert_eq!(report.liquidated.len(), 1);
        assert_eq!(report.liquidated[0].collateral_lost.value(), dec!(200));
    }

    #[test]
    fn sweep_skips_symbols_without_prices() {
        let (mut engine, oracle) = setup();
        engine
            .open_position(
                AccountId(1),
                OpenRequest::market(Symbol::new("BTC"), Side::Long, Eur::new(dec!(100)), 10),
            )
            .unwrap();

        oracle.clear_price(&Symbol::new("BTC"));
        let report = engine.sweep();
        assert_eq!(report.scanned, 1);
        assert_eq!(report.skipped_no_price, 1);
        assert!(report.liquidated.is_empty());
        // position untouched, caught next cycle
        assert_eq!(engine.positions_view(AccountId(1)).unwrap().open.len(), 1);
    }

    #[test]
    fn sweep_executes_stop_loss() {
        let (mut engine, oracle) = setup();
        engine.grant_tier(AccountId(1), AccountTier::Pro, None);

        engine
            .open_position(
                AccountId(1),
                OpenRequest {
                    stop_loss: Some(Price::new_unchecked(dec!(48000))),
                    ..OpenRequest::market(Symbol::new("BTC"), Side::Long, Eur::new(dec!(100)), 10)
                },
            )
            .unwrap();

        // below the stop but above the liquidation threshold
        oracle.set_price(Symbol::new("BTC"), Price::new_unchecked(dec!(47000)));
        let report = engine.sweep();
        assert_eq!(report.stops_executed, 1);
        assert!(report.liquidated.is_empty());

        let view = engine.positions_view(AccountId(1)).unwrap();
        // stop-loss close settles at market, pnl booked normally
        assert_eq!(view.history[0].status, PositionStatus::Closed);
        assert_eq!(view.history[0].realized_pnl.value(), dec!(-60));
    }

    #[test]
    fn sweep_executes_take_profit() {
        let (mut engine, oracle) = setup();
        engine.grant_tier(AccountId(1), AccountTier::Pro, None);

        engine
            .open_position(
                AccountId(1),
                OpenRequest {
                    take_profit: Some(Price::new_unchecked(dec!(55000))),
                    ..OpenRequest::market(Symbol::new("BTC"), Side::Long, Eur::new(dec!(100)), 10)
                },
            )
            .unwrap();

        oracle.set_price(Symbol::new("BTC"), Price::new_unchecked(dec!(56000)));
        let report = engine.sweep();
        assert_eq!(report.stops_executed, 1);

        let view = engine.positions_view(AccountId(1)).unwrap();
        assert_eq!(view.history[0].realized_pnl.value(), dec!(120));
    }

    #[test]
    fn liquidation_outranks_stop_loss() {
        let (mut engine, oracle) = setup();
        engine.grant_tier(AccountId(1), AccountTier::Pro, None);

        // stop at 46000, liquidation at 45000; a gap straight to 44000
        // must liquidate, not stop out
        engine
            .open_position(
                AccountId(1),
                OpenRequest {
                    stop_loss: Some(Price::new_unchecked(dec!(46000))),
                    ..OpenRequest::market(Symbol::new("BTC"), Side::Long, Eur::new(dec!(100)), 10)
                },
            )
            .unwrap();

        oracle.set_price(Symbol::new("BTC"), Price::new_unchecked(dec!(44000)));
        let report = engine.sweep();
        assert_eq!(report.liquidated.len(), 1);
        assert_eq!(report.stops_executed, 0);
    }

    #[test]
    fn sweep_handles_mixed_batch() {
        let (mut engine, oracle) = setup();
        oracle.set_price(Symbol::new("ETH"), Price::new_unchecked(dec!(3000)));
        engine.register_account(AccountId(2), "bob");

        engine
            .open_position(
                AccountId(1),
                OpenRequest::market(Symbol::new("BTC"), Side::Long, Eur::new(dec!(100)), 10),
            )
            .unwrap();
        engine
            .open_position(
                AccountId(2),
                OpenRequest::market(Symbol::new("ETH"), Side::Short, Eur::new(dec!(100)), 5),
            )
            .unwrap();

        // BTC long dies, ETH short survives
        oracle.set_price(Symbol::new("BTC"), Price::new_unchecked(dec!(40000)));
        oracle.set_price(Symbol::new("ETH"), Price::new_unchecked(dec!(3100)));

        let report = engine.sweep();
        assert_eq!(report.scanned, 2);
        assert_eq!(report.liquidated.len(), 1);
        assert_eq!(report.liquidated[0].account, AccountId(1));
        assert_eq!(engine.positions_view(AccountId(2)).unwrap().open.len(), 1);
    }
}
