//! Leveraged Trading Game Simulation.
//!
//! Walks the full game lifecycle: opening leveraged positions, partial and
//! full closes, a liquidation cascade, the leaderboard, and a season ending
//! with prize distribution. Finishes with the background scanner running
//! against a live price feed.

use std::sync::Arc;
use std::time::Duration;

use levcore::*;
use rust_decimal_macros::dec;
use tokio::sync::Mutex;

// 2024-01-03, a Wednesday: standard weekday policy applies
const WEDNESDAY: Timestamp = Timestamp(1_704_283_200_000);

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "levcore=info".into()),
        )
        .init();

    println!("Leveraged Trading Game Engine Simulation");
    println!("Virtual EUR, Seasonal Rankings, Full Lifecycle\n");

    scenario_1_open_and_close();
    scenario_2_partial_close();
    scenario_3_liquidation_cascade();
    scenario_4_policy_gates();
    scenario_5_season_settlement();
    scenario_6_live_scanner().await;

    println!("\nAll simulations completed successfully.");
}

fn setup(config: GameConfig) -> (Engine, Arc<StaticOracle>) {
    let oracle = Arc::new(StaticOracle::new());
    oracle.set_price(Symbol::new("BTC"), Price::new_unchecked(dec!(50000)));
    oracle.set_price(Symbol::new("ETH"), Price::new_unchecked(dec!(3000)));
    let mut engine = Engine::new(config, oracle.clone());
    engine.set_time(WEDNESDAY);
    (engine, oracle)
}

/// A single position from open to profitable close.
fn scenario_1_open_and_close() {
    println!("Scenario 1: Open and Close\n");

    let (mut engine, oracle) = setup(GameConfig::default());
    let alice = engine.register_account(AccountId(1), "alice");
    println!("  alice registers with {} EUR", engine.get_account(alice).unwrap().balance);

    let receipt = engine
        .open_position(
            alice,
            OpenRequest::market(Symbol::new("BTC"), Side::Long, Eur::new(dec!(500)), 10),
        )
        .expect("open");
    println!(
        "  opened 10x long: entry {}, liquidation {}, fee {}",
        receipt.entry_price, receipt.liquidation_price, receipt.fee
    );

    oracle.set_price(Symbol::new("BTC"), Price::new_unchecked(dec!(54000)));
    let close = engine.close_position(alice, receipt.position_id).expect("close");
    println!(
        "  price 54000: closed with pnl {} for a payout of {}",
        close.pnl, close.payout
    );
    println!("  final balance: {}\n", engine.get_account(alice).unwrap().balance);
}

/// Partial close keeps the remainder running at the original terms.
fn scenario_2_partial_close() {
    println!("Scenario 2: Partial Close\n");

    let (mut engine, oracle) = setup(GameConfig::default());
    let bob = engine.register_account(AccountId(2), "bob");

    let receipt = engine
        .open_position(
            bob,
            OpenRequest::market(Symbol::new("ETH"), Side::Long, Eur::new(dec!(400)), 2),
        )
        .expect("open");

    oracle.set_price(Symbol::new("ETH"), Price::new_unchecked(dec!(3300)));
    let close = engine
        .partial_close_position(bob, receipt.position_id, dec!(0.5))
        .expect("partial close");
    println!("  settled half at 3300: payout {}", close.payout);

    let view = engine.positions_view(bob).expect("view");
    let rest = &view.open[0];
    println!(
        "  remainder: {} collateral, entry {}, liquidation {} (unchanged)\n",
        rest.collateral, rest.entry_price, rest.liquidation_price
    );
}

/// Overleveraged longs into a crash; the sweep wipes them in one pass.
fn scenario_3_liquidation_cascade() {
    println!("Scenario 3: Liquidation Cascade\n");

    let (mut engine, oracle) = setup(GameConfig::default());
    for (id, name) in [(1, "alice"), (2, "bob"), (3, "carol")] {
        engine.register_account(AccountId(id), name);
    }
    for id in [1, 2, 3] {
        engine
            .open_position(
                AccountId(id),
                OpenRequest::market(Symbol::new("BTC"), Side::Long, Eur::new(dec!(1000)), 10),
            )
            .expect("open");
    }
    println!("  three 10x longs from 50000 (liquidation at 45000)");

    oracle.set_price(Symbol::new("BTC"), Price::new_unchecked(dec!(44500)));
    let report = engine.sweep();
    println!(
        "  price 44500: scanned {}, liquidated {}",
        report.scanned,
        report.liquidated.len()
    );
    for outcome in &report.liquidated {
        println!(
            "    account {} lost {} on {}",
            outcome.account.0, outcome.collateral_lost, outcome.symbol
        );
    }
    println!("  prize pool now holds {}\n", engine.fee_pool_total());
}

/// Tier and promo-day gates on leverage and advanced orders.
fn scenario_4_policy_gates() {
    println!("Scenario 4: Policy Gates\n");

    let (mut engine, _oracle) = setup(GameConfig::default());
    let dave = engine.register_account(AccountId(4), "dave");

    let request = OpenRequest::market(Symbol::new("BTC"), Side::Long, Eur::new(dec!(100)), 50);
    match engine.open_position(dave, request.clone()) {
        Err(e) => println!("  standard tier, wednesday, 50x: {e}"),
        Ok(_) => unreachable!("gate should hold"),
    }

    // monday promo lifts the leverage ceiling
    engine.set_time(Timestamp(1_704_110_400_000));
    let receipt = engine.open_position(dave, request).expect("promo open");
    println!(
        "  same request on monday: accepted, liquidation at {}",
        receipt.liquidation_price
    );

    let policy = engine.policy_for(dave).expect("policy");
    println!(
        "  promo policy: max leverage {}x, max positions {}\n",
        policy.max_leverage, policy.max_positions
    );
}

/// A full season: trading, fees, ranking, prizes, rollover.
fn scenario_5_season_settlement() {
    println!("Scenario 5: Season Settlement\n");

    let (mut engine, oracle) = setup(GameConfig::default());
    for (id, name) in [(1, "alice"), (2, "bob"), (3, "carol"), (4, "dave")] {
        engine.register_account(AccountId(id), name);
    }
    engine.ensure_active_season();

    // alice and bob ride the rally; carol shorts into it; dave sits out
    for (id, side) in [(1, Side::Long), (2, Side::Long), (3, Side::Short)] {
        engine
            .open_position(
                AccountId(id),
                OpenRequest::market(Symbol::new("BTC"), side, Eur::new(dec!(1000)), 10),
            )
            .expect("open");
    }
    oracle.set_price(Symbol::new("BTC"), Price::new_unchecked(dec!(52000)));
    for id in [1, 2] {
        let view = engine.positions_view(AccountId(id)).expect("view");
        let position_id = view.open[0].id;
        engine.close_position(AccountId(id), position_id).expect("close");
    }

    let board = engine.leaderboard(RankingFilter::FairProfit);
    println!("  fair-profit board before season end:");
    for entry in board.iter().take(3) {
        println!("    #{} {} with {}", entry.rank, entry.display_name, entry.score);
    }

    engine.set_time(WEDNESDAY.plus_days(31));
    let transition = engine.check_season_end().expect("transition");
    println!(
        "  {} ended: {} distributed, {} rolled over to {}",
        transition.ended_season,
        transition.distributed,
        transition.rolled_over,
        transition.next_season
    );
    for award in &transition.awards {
        println!("    rank {} wins {}", award.rank, award.amount);
    }
    println!();
}

/// The background scanner against a drifting live price.
async fn scenario_6_live_scanner() {
    println!("Scenario 6: Live Scanner\n");

    let oracle = Arc::new(StaticOracle::new());
    oracle.set_price(Symbol::new("BTC"), Price::new_unchecked(dec!(50000)));
    let config = GameConfig::quick_demo();
    let scan_interval = config.scan_interval();
    let mut engine = Engine::new(config, oracle.clone());
    engine.set_time(Timestamp::now());
    let eve = engine.register_account(AccountId(5), "eve");
    engine
        .open_position(
            eve,
            OpenRequest::market(Symbol::new("BTC"), Side::Long, Eur::new(dec!(500)), 20),
        )
        .expect("open");
    println!("  eve opens a 20x long from 50000 (liquidation at 47500)");

    let shared: runtime::SharedEngine = Arc::new(Mutex::new(engine));
    let scanner = runtime::spawn_liquidation_scanner(shared.clone(), scan_interval);

    // price drifts down past the threshold across a few scan cycles
    for price in [49000, 48000, 47000] {
        oracle.set_price(
            Symbol::new("BTC"),
            Price::new_unchecked(rust_decimal::Decimal::from(price)),
        );
        tokio::time::sleep(Duration::from_millis(800)).await;
    }
    scanner.stop().await;

    let engine = shared.lock().await;
    let view = engine.positions_view(eve).expect("view");
    println!(
        "  after the drift to 47000: {} open, {} in history",
        view.open.len(),
        view.history.len()
    );
    for event in engine.recent_events(3) {
        if let EventPayload::PositionLiquidated(e) = &event.payload {
            println!("    scanner liquidated position {} at {}", e.position.0, e.trigger_price);
        }
    }
}
