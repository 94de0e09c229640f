//! Trading state machine scenarios

use std::collections::BTreeSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use anyhow::anyhow;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use sol_curve_sdk::common::AnyResult;
use sol_curve_sdk::constants::{INITIAL_PRICE, SCALE};
use sol_curve_sdk::trading::{
    LiquidityMigrator, MigrationOutcome, MigrationRequest, NativeVault, RecordingListener,
};
use sol_curve_sdk::utils::calc::{cost_to_buy, market_cap, tokens_for_payment};
use sol_curve_sdk::{
    BondingCurve, CurveConfig, CurveContext, CurveError, CurveEvent, ManualClock, MigrationStatus,
    TradingPhase,
};
use solana_sdk::pubkey::Pubkey;

const START: i64 = 1_700_000_000;

struct Harness {
    curve: BondingCurve,
    vault: Arc<NativeVault>,
    listener: Arc<RecordingListener>,
    owner: Pubkey,
}

fn harness(threshold: u128, migrator: Option<Arc<dyn LiquidityMigrator>>) -> Harness {
    let vault = Arc::new(NativeVault::new());
    let listener = Arc::new(RecordingListener::new());
    let mut ctx = CurveContext::default()
        .with_clock(Arc::new(ManualClock::new(START)))
        .with_transfer(vault.clone())
        .with_listener(listener.clone());
    if let Some(migrator) = migrator {
        ctx = ctx.with_migrator(migrator);
    }
    let owner = Pubkey::new_unique();
    let curve = BondingCurve::new(
        Pubkey::new_unique(),
        owner,
        CurveConfig::new("Launch", "LNCH", threshold),
        ctx,
    )
    .unwrap();
    Harness { curve, vault, listener, owner }
}

/// Fails until switched on
#[derive(Default)]
struct FlakyMigrator {
    healthy: AtomicBool,
    calls: AtomicUsize,
}

impl LiquidityMigrator for FlakyMigrator {
    fn migrate(&self, _request: &MigrationRequest) -> AnyResult<MigrationOutcome> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.healthy.load(Ordering::SeqCst) {
            Ok(MigrationOutcome::Completed)
        } else {
            Err(anyhow!("pool unavailable"))
        }
    }
}

#[test]
fn test_threshold_crossing_migrates_once() {
    let threshold = 10 * SCALE;
    let h = harness(threshold, None);
    let alice = Pubkey::new_unique();
    let bob = Pubkey::new_unique();

    // first buy stays under the threshold
    let expected = tokens_for_payment(0, SCALE).unwrap();
    assert!(market_cap(expected).unwrap() < threshold);
    let first = h.curve.buy(alice, SCALE, 0).unwrap();
    assert_eq!(first.amount, expected);
    assert!(!first.migrated);
    assert_eq!(h.curve.phase(), TradingPhase::Open);
    assert_eq!(h.curve.issued_total(), expected);
    assert_eq!(h.curve.reserve_balance(), SCALE);

    // second buy crosses it
    let expected_second = tokens_for_payment(expected, 20 * SCALE).unwrap();
    assert!(market_cap(expected + expected_second).unwrap() >= threshold);
    let second = h.curve.buy(bob, 20 * SCALE, 0).unwrap();
    assert_eq!(second.amount, expected_second);
    assert!(second.migrated);
    assert_eq!(h.curve.phase(), TradingPhase::Migrated);
    assert_eq!(h.curve.issued_total(), expected + expected_second);
    assert_eq!(h.curve.reserve_balance(), 21 * SCALE);
    assert_eq!(h.listener.count("migrated"), 1);
    assert_eq!(h.curve.migration_status(), MigrationStatus::Disabled);

    // closed for good
    assert_eq!(h.curve.sell(alice, first.amount, 0), Err(CurveError::TradingClosed));
    assert_eq!(h.curve.buy(alice, SCALE, 0), Err(CurveError::TradingClosed));
    assert_eq!(h.curve.quote_buy(SCALE), Err(CurveError::TradingClosed));
    assert_eq!(h.listener.count("migrated"), 1);

    // balances still move between holders
    h.curve.transfer(alice, bob, first.amount).unwrap();
    assert_eq!(h.curve.holder_count(), 1);
}

#[test]
fn test_sell_slippage_mutates_nothing() {
    let h = harness(1_000 * SCALE, None);
    let alice = Pubkey::new_unique();
    let bought = h.curve.buy(alice, 5 * SCALE, 0).unwrap();
    let quote = h.curve.quote_sell(bought.amount / 2).unwrap();
    let before = h.curve.snapshot();

    let err = h.curve.sell(alice, bought.amount / 2, quote.payment_out + 1).unwrap_err();
    assert_eq!(
        err,
        CurveError::SlippageExceeded { minimum: quote.payment_out + 1, actual: quote.payment_out }
    );
    assert_eq!(h.curve.snapshot(), before);
    assert_eq!(h.curve.balance_of(&alice), bought.amount);
    assert_eq!(h.vault.credited(&alice), 0);

    // the exact quote goes through
    let sold = h.curve.sell(alice, bought.amount / 2, quote.payment_out).unwrap();
    assert_eq!(sold.proceeds, quote.payment_out);
}

#[test]
fn test_buy_then_sell_returns_cost_exactly() {
    let h = harness(1_000_000 * SCALE, None);
    let alice = Pubkey::new_unique();
    let bob = Pubkey::new_unique();
    h.curve.buy(bob, 7 * SCALE, 0).unwrap();

    let supply = h.curve.issued_total();
    let bought = h.curve.buy(alice, 3 * SCALE, 0).unwrap();
    let cost = cost_to_buy(supply, bought.amount).unwrap();
    let sold = h.curve.sell(alice, bought.amount, 0).unwrap();
    assert_eq!(sold.proceeds, cost);
    assert_eq!(h.curve.issued_total(), supply);
    // the unspent remainder of the payment stays in the reserve
    assert_eq!(h.curve.reserve_balance(), 10 * SCALE - cost);
}

#[test]
fn test_events_carry_trade_data() {
    let h = harness(1_000 * SCALE, None);
    let alice = Pubkey::new_unique();
    let bought = h.curve.buy(alice, SCALE, 0).unwrap();
    h.curve.sell(alice, bought.amount, 0).unwrap();

    let events = h.listener.events();
    assert_eq!(events.len(), 2);
    match &events[0] {
        CurveEvent::Bought { buyer, payment, amount, timestamp, .. } => {
            assert_eq!(*buyer, alice);
            assert_eq!(*payment, SCALE);
            assert_eq!(*amount, bought.amount);
            assert_eq!(*timestamp, START);
        }
        other => panic!("unexpected event {other:?}"),
    }
    match &events[1] {
        CurveEvent::Sold { seller, price_after, .. } => {
            assert_eq!(*seller, alice);
            assert_eq!(*price_after, INITIAL_PRICE);
        }
        other => panic!("unexpected event {other:?}"),
    }
}

#[test]
fn test_failed_migration_keeps_trade_and_can_be_retried() {
    let migrator = Arc::new(FlakyMigrator::default());
    let h = harness(SCALE, Some(migrator.clone()));
    let alice = Pubkey::new_unique();

    let receipt = h.curve.buy(alice, 10 * SCALE, 0).unwrap();
    assert!(receipt.migrated);
    assert_eq!(h.curve.phase(), TradingPhase::Migrated);
    assert_eq!(h.curve.balance_of(&alice), receipt.amount);
    assert!(matches!(h.curve.migration_status(), MigrationStatus::Failed(_)));
    assert_eq!(h.listener.count("migration_failed"), 1);

    assert_eq!(h.curve.retry_migration(alice), Err(CurveError::Unauthorized));
    migrator.healthy.store(true, Ordering::SeqCst);
    assert_eq!(h.curve.retry_migration(h.owner), Ok(MigrationStatus::Completed));
    assert_eq!(h.curve.migration_status(), MigrationStatus::Completed);
    assert_eq!(h.curve.retry_migration(h.owner), Err(CurveError::MigrationNotPending));
    assert_eq!(migrator.calls.load(Ordering::SeqCst), 2);
    assert_eq!(h.listener.count("migrated"), 1);
}

#[test]
fn test_retry_requires_migrated_phase() {
    let h = harness(1_000 * SCALE, None);
    assert_eq!(h.curve.retry_migration(h.owner), Err(CurveError::MigrationNotPending));
}

#[test]
fn test_holder_count_matches_balances() {
    let h = harness(u128::MAX / 4, None);
    let mut rng = StdRng::seed_from_u64(7);
    let users: Vec<Pubkey> = (0..6).map(|_| Pubkey::new_unique()).collect();

    for _ in 0..400 {
        let user = users[rng.random_range(0..users.len())];
        match rng.random_range(0..3) {
            0 => {
                let payment = rng.random_range(1..=3 * SCALE);
                let _ = h.curve.buy(user, payment, 0);
            }
            1 => {
                let balance = h.curve.balance_of(&user);
                if balance > 0 {
                    let amount = if rng.random_bool(0.5) { balance } else { rng.random_range(1..=balance) };
                    h.curve.sell(user, amount, 0).unwrap();
                }
            }
            _ => {
                let to = users[rng.random_range(0..users.len())];
                let balance = h.curve.balance_of(&user);
                if balance > 0 {
                    let amount = if rng.random_bool(0.5) { balance } else { rng.random_range(1..=balance) };
                    h.curve.transfer(user, to, amount).unwrap();
                }
            }
        }

        let holding: BTreeSet<Pubkey> =
            users.iter().copied().filter(|u| h.curve.balance_of(u) > 0).collect();
        assert_eq!(h.curve.holder_count() as usize, holding.len());
        for user in &users {
            assert_eq!(h.curve.is_holder(user), holding.contains(user));
        }
        let supply: u128 = users.iter().map(|u| h.curve.balance_of(u)).sum();
        assert_eq!(supply, h.curve.issued_total());
    }
    assert_eq!(h.curve.phase(), TradingPhase::Open);
}
