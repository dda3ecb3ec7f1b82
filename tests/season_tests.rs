//! Season lifecycle tests: a full month of trading feeding the prize pool,
//! then the end-of-season settlement with prizes, rollover and re-based
//! performance baselines.

use std::sync::Arc;

use levcore::*;
use rust_decimal_macros::dec;

const WEDNESDAY: Timestamp = Timestamp(1_704_283_200_000);

fn setup() -> (Engine, Arc<StaticOracle>) {
    let oracle = Arc::new(StaticOracle::new());
    oracle.set_price(Symbol::new("BTC"), Price::new_unchecked(dec!(50000)));
    let mut engine = Engine::new(GameConfig::default(), oracle.clone());
    engine.set_time(WEDNESDAY);
    (engine, oracle)
}

// Four players each open a 10x long with 5000 collateral: notional 50000,
// fee 250 each, so the pool holds exactly 1000.
fn play_a_season(engine: &mut Engine, oracle: &StaticOracle) {
    for (id, name) in [(1, "alice"), (2, "bob"), (3, "carol"), (4, "dave")] {
        engine.register_account(AccountId(id), name);
    }
    engine.ensure_active_season();

    let mut positions = Vec::new();
    for id in 1..=4u64 {
        let receipt = engine
            .open_position(
                AccountId(id),
                OpenRequest::market(Symbol::new("BTC"), Side::Long, Eur::new(dec!(5000)), 10),
            )
            .unwrap();
        positions.push((AccountId(id), receipt.position_id));
    }
    assert_eq!(engine.fee_pool_total().value(), dec!(1000));

    // distinct exits produce a strict ranking; dave takes a loss
    for ((account, position), exit) in positions
        .into_iter()
        .zip([dec!(51500), dec!(51000), dec!(50500), dec!(49000)])
    {
        oracle.set_price(Symbol::new("BTC"), Price::new_unchecked(exit));
        engine.close_position(account, position).unwrap();
    }
}

#[test]
fn season_end_distributes_and_rolls_over() {
    let (mut engine, oracle) = setup();
    play_a_season(&mut engine, &oracle);

    engine.set_time(WEDNESDAY.plus_days(31));
    let transition = engine.check_season_end().unwrap();

    // three qualifying winners out of ten ranks: 40% + 25% + 15% of the
    // 1000 pool pays out, the seven unfilled tail shares stay behind
    assert_eq!(transition.ended_season, "Season 1");
    assert_eq!(transition.awards.len(), 3);
    assert_eq!(transition.awards[0].account, AccountId(1));
    assert_eq!(transition.awards[0].amount.value(), dec!(400));
    assert_eq!(transition.awards[1].account, AccountId(2));
    assert_eq!(transition.awards[1].amount.value(), dec!(250));
    assert_eq!(transition.awards[2].account, AccountId(3));
    assert_eq!(transition.awards[2].amount.value(), dec!(150));
    assert_eq!(transition.distributed.value(), dec!(800));
    assert_eq!(transition.rolled_over.value(), dec!(200));
    assert_eq!(engine.fee_pool_total().value(), dec!(200));

    // alice: 10000 - 5250 + 6500 payout + 400 prize
    assert_eq!(
        engine.get_account(AccountId(1)).unwrap().balance.value(),
        dec!(11650)
    );
    // dave lost money and wins nothing
    assert_eq!(
        engine.get_account(AccountId(4)).unwrap().balance.value(),
        dec!(8750)
    );

    // prizes land in the audit trail
    let alice_txs = engine.transactions(AccountId(1));
    let prize = alice_txs.last().unwrap();
    assert_eq!(prize.kind, TxKind::SeasonPrize);
    assert_eq!(prize.amount.value(), dec!(400));
}

#[test]
fn next_season_starts_clean() {
    let (mut engine, oracle) = setup();
    play_a_season(&mut engine, &oracle);

    engine.set_time(WEDNESDAY.plus_days(31));
    let transition = engine.check_season_end().unwrap();
    assert_eq!(transition.next_season, "Season 2");

    let season = engine.current_season().unwrap();
    assert_eq!(season.name, "Season 2");
    assert!(!season.ended);

    // everyone restarts flat: prizes and last season's pnl are baked into
    // the new baseline
    for entry in engine.leaderboard(RankingFilter::SeasonProfit) {
        assert_eq!(entry.score, Eur::zero());
    }
}

#[test]
fn transition_fires_exactly_once_per_season() {
    let (mut engine, oracle) = setup();
    play_a_season(&mut engine, &oracle);

    engine.set_time(WEDNESDAY.plus_days(31));
    assert!(engine.check_season_end().is_some());
    assert!(engine.check_season_end().is_none());
    assert!(engine.check_season_end().is_none());

    // rolled-over pool is still intact after the repeated checks
    assert_eq!(engine.fee_pool_total().value(), dec!(200));

    // and the next expiry fires again
    engine.set_time(WEDNESDAY.plus_days(62));
    let transition = engine.check_season_end().unwrap();
    assert_eq!(transition.ended_season, "Season 2");
}

#[test]
fn rollover_feeds_the_next_pool() {
    let (mut engine, oracle) = setup();
    play_a_season(&mut engine, &oracle);

    engine.set_time(WEDNESDAY.plus_days(31));
    engine.check_season_end().unwrap();
    assert_eq!(engine.fee_pool_total().value(), dec!(200));

    // season 2: one trade adds its fee on top of the rolled-over 200
    oracle.set_price(Symbol::new("BTC"), Price::new_unchecked(dec!(50000)));
    engine
        .open_position(
            AccountId(1),
            OpenRequest::market(Symbol::new("BTC"), Side::Long, Eur::new(dec!(1000)), 10),
        )
        .unwrap();
    assert_eq!(engine.fee_pool_total().value(), dec!(250));
}

#[test]
fn season_events_tell_the_whole_story() {
    let (mut engine, oracle) = setup();
    play_a_season(&mut engine, &oracle);

    engine.set_time(WEDNESDAY.plus_days(31));
    engine.check_season_end().unwrap();

    let mut started = 0;
    let mut ended = 0;
    let mut prizes = 0;
    for event in engine.events() {
        match &event.payload {
            EventPayload::SeasonStarted(_) => started += 1,
            EventPayload::SeasonEnded(e) => {
                ended += 1;
                assert_eq!(e.pool_distributed.value(), dec!(800));
                assert_eq!(e.winners, 3);
            }
            EventPayload::PrizeAwarded(e) => {
                prizes += 1;
                assert_eq!(e.season, "Season 1");
            }
            _ => {}
        }
    }
    assert_eq!(started, 2);
    assert_eq!(ended, 1);
    assert_eq!(prizes, 3);
}

#[test]
fn full_prize_board_conserves_the_pool() {
    let (mut engine, oracle) = setup();
    for id in 1..=10u64 {
        engine.register_account(AccountId(id), &format!("player{id}"));
    }
    engine.ensure_active_season();

    // ten 10x longs with 2000 collateral: fee 100 each, pool exactly 1000
    let mut positions = Vec::new();
    for id in 1..=10u64 {
        let receipt = engine
            .open_position(
                AccountId(id),
                OpenRequest::market(Symbol::new("BTC"), Side::Long, Eur::new(dec!(2000)), 10),
            )
            .unwrap();
        positions.push((AccountId(id), receipt.position_id));
    }
    assert_eq!(engine.fee_pool_total().value(), dec!(1000));

    // exits step down by 50, so every rank is filled by a distinct winner
    // and even the last one clears their 100 fee
    for (i, (account, position)) in positions.into_iter().enumerate() {
        let exit = dec!(51000) - dec!(50) * rust_decimal::Decimal::from(i as u32);
        oracle.set_price(Symbol::new("BTC"), Price::new_unchecked(exit));
        engine.close_position(account, position).unwrap();
    }

    engine.set_time(WEDNESDAY.plus_days(31));
    let transition = engine.check_season_end().unwrap();

    // all ten ranks pay out and the whole pool is spoken for
    assert_eq!(transition.awards.len(), 10);
    assert_eq!(transition.awards[0].amount.value(), dec!(400));
    assert_eq!(transition.awards[9].amount.value(), dec!(10));
    assert!(transition.distributed.value() <= dec!(1000));
    assert_eq!(transition.distributed.value(), dec!(1000));
    assert_eq!(transition.rolled_over, Eur::zero());
    assert!(engine.fee_pool_total().value() >= rust_decimal::Decimal::ZERO);
    assert_eq!(engine.fee_pool_total(), Eur::zero());

    // ranks follow the close profits in order
    for (i, award) in transition.awards.iter().enumerate() {
        assert_eq!(award.rank, i + 1);
        assert_eq!(award.account, AccountId(i as u64 + 1));
    }
}

#[test]
fn only_positive_season_profit_qualifies() {
    let (mut engine, oracle) = setup();
    engine.register_account(AccountId(1), "alice");
    engine.register_account(AccountId(2), "bob");
    engine.ensure_active_season();

    // alice ends green, bob ends red
    let receipt = engine
        .open_position(
            AccountId(1),
            OpenRequest::market(Symbol::new("BTC"), Side::Long, Eur::new(dec!(1000)), 10),
        )
        .unwrap();
    oracle.set_price(Symbol::new("BTC"), Price::new_unchecked(dec!(51000)));
    engine
        .close_position(AccountId(1), receipt.position_id)
        .unwrap();

    let receipt = engine
        .open_position(
            AccountId(2),
            OpenRequest::market(Symbol::new("BTC"), Side::Long, Eur::new(dec!(1000)), 10),
        )
        .unwrap();
    oracle.set_price(Symbol::new("BTC"), Price::new_unchecked(dec!(50000)));
    engine
        .close_position(AccountId(2), receipt.position_id)
        .unwrap();

    engine.set_time(WEDNESDAY.plus_days(31));
    let transition = engine.check_season_end().unwrap();

    // alice: pnl 200 minus 50 fee. bob lost money and ranks out.
    assert_eq!(transition.awards.len(), 1);
    assert_eq!(transition.awards[0].account, AccountId(1));
    assert_eq!(transition.awards[0].rank, 1);
}
