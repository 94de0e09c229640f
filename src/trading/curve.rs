//! Bonding curve trading state machine
//!
//! [`BondingCurve`] is the handle for one curve instance. Every mutating call
//! follows the same order:
//!
//! 1. enter the reentrancy guard
//! 2. run every check under the state lock
//! 3. commit the effects (ledger, reserve, holder count, phase) and release the lock
//! 4. interact with collaborators (value transfer, migrator, listener)
//!
//! A failed interaction takes the lock again and reverses step 3. The
//! curve's own fields and holder flags always return to their pre-call
//! values. If the ledger also refuses the reversal the call fails with the
//! fatal [`CurveError::RollbackFailed`].

use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use solana_sdk::pubkey::Pubkey;
use tracing::{debug, error, info, warn};

use super::custody::ReentrancyGuard;
use super::lifecycle::{CurveEvent, ListenerRef, NoopListener};
use super::migration::{DisabledMigrator, LiquidityMigrator, MigrationRequest};
use super::transfer::{NativeTransfer, NativeVault};
use crate::common::clock::system_clock;
use crate::common::{
    Clock, CurveAccount, CurveConfig, CurveError, CurveResult, FungibleLedger, HolderChange,
    HolderTracker, InMemoryLedger, LedgerError, MigrationStatus, TradingPhase,
};
use crate::constants::RECOVERY_TIMELOCK_SECS;
use crate::utils::calc::{market_cap, proceeds_from_sell, spot_price, tokens_for_payment};
use crate::utils::quote::{quote_buy, quote_sell, BuyQuote, SellQuote};

/// Collaborators shared by a curve instance
#[derive(Clone)]
pub struct CurveContext {
    pub clock: Arc<dyn Clock>,
    pub transfer: Arc<dyn NativeTransfer>,
    pub migrator: Arc<dyn LiquidityMigrator>,
    pub listener: ListenerRef,
}

impl Default for CurveContext {
    fn default() -> Self {
        Self {
            clock: system_clock(),
            transfer: Arc::new(NativeVault::new()),
            migrator: Arc::new(DisabledMigrator),
            listener: Arc::new(NoopListener),
        }
    }
}

impl CurveContext {
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_transfer(mut self, transfer: Arc<dyn NativeTransfer>) -> Self {
        self.transfer = transfer;
        self
    }

    pub fn with_migrator(mut self, migrator: Arc<dyn LiquidityMigrator>) -> Self {
        self.migrator = migrator;
        self
    }

    pub fn with_listener(mut self, listener: ListenerRef) -> Self {
        self.listener = listener;
        self
    }
}

/// Side-effect-free view used by registry listings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurveDetails {
    pub address: Pubkey,
    pub name: String,
    pub symbol: String,
    #[serde(with = "crate::common::serde_u128")]
    pub spot_price: u128,
    #[serde(with = "crate::common::serde_u128")]
    pub market_cap: u128,
    pub phase: TradingPhase,
    #[serde(with = "crate::common::serde_u128")]
    pub issued_total: u128,
    pub holder_count: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuyReceipt {
    pub amount: u128,
    pub payment: u128,
    pub price_after: u128,
    /// This buy crossed the threshold
    pub migrated: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SellReceipt {
    pub amount: u128,
    pub proceeds: u128,
    pub price_after: u128,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecoveryReceipt {
    pub native_amount: u128,
    pub token_amount: u128,
}

struct CurveState {
    owner: Pubkey,
    phase: TradingPhase,
    issued_total: u128,
    reserve_balance: u128,
    migration: MigrationStatus,
    ledger: Box<dyn FungibleLedger>,
    holders: HolderTracker,
}

/// Curve-side values captured before a call commits its effects
struct Checkpoint {
    issued_total: u128,
    reserve_balance: u128,
    holders: Vec<(Pubkey, bool)>,
}

/// Ledger mutation that reverses a committed effect
enum LedgerUndo {
    Remint { to: Pubkey, amount: u128 },
    Return { from: Pubkey, to: Pubkey, amount: u128 },
}

impl CurveState {
    fn checkpoint(&self, touched: &[Pubkey]) -> Checkpoint {
        Checkpoint {
            issued_total: self.issued_total,
            reserve_balance: self.reserve_balance,
            holders: touched.iter().map(|a| (*a, self.holders.is_holder(a))).collect(),
        }
    }

    /// Applies `undo` to the ledger, then resets the checkpointed fields
    /// whether or not the ledger accepted it.
    fn rewind(&mut self, checkpoint: Checkpoint, undo: LedgerUndo) -> Result<(), LedgerError> {
        let undone = match undo {
            LedgerUndo::Remint { amount: 0, .. } | LedgerUndo::Return { amount: 0, .. } => Ok(()),
            LedgerUndo::Remint { to, amount } => self.ledger.mint(&to, amount),
            LedgerUndo::Return { from, to, amount } => self.ledger.transfer(&from, &to, amount),
        };
        self.issued_total = checkpoint.issued_total;
        self.reserve_balance = checkpoint.reserve_balance;
        for (address, holding) in &checkpoint.holders {
            self.holders.set_holder(address, *holding);
        }
        undone
    }

    fn track(&mut self, from: Option<&Pubkey>, to: Option<&Pubkey>) {
        for change in self.holders.on_balance_change(from, to, self.ledger.as_ref()) {
            match change {
                HolderChange::Gained(holder) => debug!(holder = %holder, "holder gained"),
                HolderChange::Lost(holder) => debug!(holder = %holder, "holder lost"),
            }
        }
    }

    fn migration_request(&self, curve: Pubkey) -> CurveResult<MigrationRequest> {
        Ok(MigrationRequest {
            curve,
            reserve_balance: self.reserve_balance,
            issued_total: self.issued_total,
            market_cap: market_cap(self.issued_total)?,
        })
    }
}

pub struct BondingCurve {
    address: Pubkey,
    creator: Pubkey,
    name: String,
    symbol: String,
    market_cap_threshold: u128,
    created_at: i64,
    state: Mutex<CurveState>,
    guard: ReentrancyGuard,
    ctx: CurveContext,
}

impl BondingCurve {
    /// Create a curve backed by a fresh [`InMemoryLedger`]
    pub fn new(
        address: Pubkey,
        creator: Pubkey,
        config: CurveConfig,
        ctx: CurveContext,
    ) -> CurveResult<Self> {
        Self::with_ledger(address, creator, config, Box::new(InMemoryLedger::new()), ctx)
    }

    /// Create a curve over an external ledger, which must not have issued anything yet
    pub fn with_ledger(
        address: Pubkey,
        creator: Pubkey,
        config: CurveConfig,
        ledger: Box<dyn FungibleLedger>,
        ctx: CurveContext,
    ) -> CurveResult<Self> {
        config.validate()?;
        if ledger.total_issued() != 0 {
            return Err(CurveError::SnapshotMismatch(format!(
                "new curve needs an empty ledger, found {} issued",
                ledger.total_issued()
            )));
        }
        let created_at = ctx.clock.now();
        info!(
            curve = %address,
            creator = %creator,
            symbol = %config.symbol,
            threshold = config.market_cap_threshold,
            created_at,
            "curve created"
        );
        Ok(Self {
            address,
            creator,
            name: config.name,
            symbol: config.symbol,
            market_cap_threshold: config.market_cap_threshold,
            created_at,
            state: Mutex::new(CurveState {
                owner: creator,
                phase: TradingPhase::Open,
                issued_total: 0,
                reserve_balance: 0,
                migration: MigrationStatus::NotTriggered,
                ledger,
                holders: HolderTracker::new(),
            }),
            guard: ReentrancyGuard::new(),
            ctx,
        })
    }

    /// Rebuild a live curve from a persisted account and the ledger it was saved with
    pub fn restore(
        account: CurveAccount,
        ledger: Box<dyn FungibleLedger>,
        ctx: CurveContext,
    ) -> CurveResult<Self> {
        if account.market_cap_threshold == 0 {
            return Err(CurveError::InvalidThreshold);
        }
        if ledger.total_issued() != account.issued_total {
            return Err(CurveError::SnapshotMismatch(format!(
                "issued total {} but ledger reports {}",
                account.issued_total,
                ledger.total_issued()
            )));
        }
        let ledger_holders: Vec<Pubkey> = ledger.holders().into_iter().map(|(k, _)| k).collect();
        let mut account_holders = account.holders.clone();
        account_holders.sort();
        if ledger_holders != account_holders
            || account.holder_count != account_holders.len() as u64
        {
            return Err(CurveError::SnapshotMismatch(format!(
                "{} holders recorded, ledger has {}",
                account.holder_count,
                ledger_holders.len()
            )));
        }
        info!(curve = %account.address, issued = account.issued_total, "curve restored");
        Ok(Self {
            address: account.address,
            creator: account.creator,
            name: account.name,
            symbol: account.symbol,
            market_cap_threshold: account.market_cap_threshold,
            created_at: account.created_at,
            state: Mutex::new(CurveState {
                owner: account.owner,
                phase: account.phase,
                issued_total: account.issued_total,
                reserve_balance: account.reserve_balance,
                migration: account.migration,
                ledger,
                holders: HolderTracker::from_holders(account_holders),
            }),
            guard: ReentrancyGuard::new(),
            ctx,
        })
    }

    /// Buy with `payment` native base units already attached by the host.
    pub fn buy(&self, buyer: Pubkey, payment: u128, min_amount_out: u128) -> CurveResult<BuyReceipt> {
        let _call = self.guard.enter()?;
        let now = self.ctx.clock.now();

        let (receipt, migration) = {
            let mut state = self.state.lock();
            if !state.phase.is_open() {
                return Err(CurveError::TradingClosed);
            }
            if payment == 0 {
                return Err(CurveError::InvalidPayment);
            }
            let amount = tokens_for_payment(state.issued_total, payment)?;
            if amount == 0 {
                debug!(curve = %self.address, payment, "payment buys nothing");
                return Err(CurveError::QuoteTooSmall);
            }
            if amount < min_amount_out {
                return Err(CurveError::SlippageExceeded { minimum: min_amount_out, actual: amount });
            }
            let issued_after =
                state.issued_total.checked_add(amount).ok_or(CurveError::ArithmeticOverflow)?;
            let reserve_after =
                state.reserve_balance.checked_add(payment).ok_or(CurveError::ArithmeticOverflow)?;
            let price_after = spot_price(issued_after)?;
            let market_cap_after = market_cap(issued_after)?;

            state.ledger.mint(&buyer, amount)?;
            state.issued_total = issued_after;
            state.reserve_balance = reserve_after;
            state.track(None, Some(&buyer));

            let migrated = market_cap_after >= self.market_cap_threshold;
            let migration = if migrated {
                state.phase = TradingPhase::Migrated;
                Some(MigrationRequest {
                    curve: self.address,
                    reserve_balance: reserve_after,
                    issued_total: issued_after,
                    market_cap: market_cap_after,
                })
            } else {
                None
            };
            (BuyReceipt { amount, payment, price_after, migrated }, migration)
        };

        info!(
            curve = %self.address,
            buyer = %buyer,
            payment,
            amount = receipt.amount,
            price_after = receipt.price_after,
            "buy"
        );
        self.emit(CurveEvent::Bought {
            curve: self.address,
            buyer,
            payment,
            amount: receipt.amount,
            price_after: receipt.price_after,
            timestamp: now,
        });

        if let Some(request) = migration {
            info!(
                curve = %self.address,
                market_cap = request.market_cap,
                threshold = self.market_cap_threshold,
                "market cap threshold reached, trading closed"
            );
            self.emit(CurveEvent::Migrated {
                curve: self.address,
                market_cap: request.market_cap,
                issued_total: request.issued_total,
                reserve_balance: request.reserve_balance,
                timestamp: now,
            });
            self.run_migration(&request, now);
        }

        Ok(receipt)
    }

    pub fn sell(&self, seller: Pubkey, amount: u128, min_payment_out: u128) -> CurveResult<SellReceipt> {
        let _call = self.guard.enter()?;
        let now = self.ctx.clock.now();

        let checkpoint;
        let receipt = {
            let mut state = self.state.lock();
            if !state.phase.is_open() {
                return Err(CurveError::TradingClosed);
            }
            if amount == 0 {
                return Err(CurveError::InvalidAmount);
            }
            let available = state.ledger.balance_of(&seller);
            if available < amount {
                return Err(CurveError::InsufficientBalance { requested: amount, available });
            }
            let proceeds = proceeds_from_sell(state.issued_total, amount)?;
            if proceeds < min_payment_out {
                return Err(CurveError::SlippageExceeded { minimum: min_payment_out, actual: proceeds });
            }
            if state.reserve_balance < proceeds {
                error!(
                    curve = %self.address,
                    reserve = state.reserve_balance,
                    proceeds,
                    "reserve shortfall"
                );
                return Err(CurveError::ReserveShortfall {
                    reserve: state.reserve_balance,
                    required: proceeds,
                });
            }
            let issued_after = state.issued_total - amount;
            let price_after = spot_price(issued_after)?;

            checkpoint = state.checkpoint(&[seller]);
            state.ledger.burn(&seller, amount)?;
            state.issued_total = issued_after;
            state.reserve_balance -= proceeds;
            state.track(Some(&seller), None);
            SellReceipt { amount, proceeds, price_after }
        };

        if receipt.proceeds > 0 {
            if let Err(e) = self.ctx.transfer.send(&seller, receipt.proceeds) {
                warn!(curve = %self.address, seller = %seller, error = %e, "payout failed, rolling back sell");
                let undone = self
                    .state
                    .lock()
                    .rewind(checkpoint, LedgerUndo::Remint { to: seller, amount });
                return Err(self.rollback_error(e.to_string(), undone));
            }
        }

        info!(
            curve = %self.address,
            seller = %seller,
            amount,
            proceeds = receipt.proceeds,
            price_after = receipt.price_after,
            "sell"
        );
        self.emit(CurveEvent::Sold {
            curve: self.address,
            seller,
            amount,
            proceeds: receipt.proceeds,
            price_after: receipt.price_after,
            timestamp: now,
        });
        Ok(receipt)
    }

    /// Owner-only sweep of an abandoned curve, once the timelock has run out.
    pub fn recover_funds(&self, caller: Pubkey) -> CurveResult<RecoveryReceipt> {
        let _call = self.guard.enter()?;
        let now = self.ctx.clock.now();

        let checkpoint;
        let (owner, receipt) = {
            let mut state = self.state.lock();
            if caller != state.owner {
                return Err(CurveError::Unauthorized);
            }
            let unlocks_at = self.recovery_unlocks_at();
            if now <= unlocks_at {
                return Err(CurveError::TimelockNotExpired { unlocks_at });
            }
            if !state.phase.is_open() {
                return Err(CurveError::AlreadyMigrated);
            }
            let owner = state.owner;
            let native_amount = state.reserve_balance;
            let token_amount = state.ledger.balance_of(&self.address);
            checkpoint = state.checkpoint(&[self.address, owner]);

            if token_amount > 0 {
                state.ledger.transfer(&self.address, &owner, token_amount)?;
                state.track(Some(&self.address), Some(&owner));
            }
            state.reserve_balance = 0;
            (owner, RecoveryReceipt { native_amount, token_amount })
        };

        if receipt.native_amount > 0 {
            if let Err(e) = self.ctx.transfer.send(&owner, receipt.native_amount) {
                warn!(curve = %self.address, owner = %owner, error = %e, "recovery sweep failed, rolling back");
                let undo = LedgerUndo::Return { from: owner, to: self.address, amount: receipt.token_amount };
                let undone = self.state.lock().rewind(checkpoint, undo);
                return Err(self.rollback_error(e.to_string(), undone));
            }
        }

        info!(
            curve = %self.address,
            owner = %owner,
            native_amount = receipt.native_amount,
            token_amount = receipt.token_amount,
            "funds recovered"
        );
        self.emit(CurveEvent::FundsRecovered {
            curve: self.address,
            owner,
            native_amount: receipt.native_amount,
            token_amount: receipt.token_amount,
            timestamp: now,
        });
        Ok(receipt)
    }

    /// Holder to holder unit transfer. Allowed after migration too.
    pub fn transfer(&self, from: Pubkey, to: Pubkey, amount: u128) -> CurveResult<()> {
        let _call = self.guard.enter()?;
        if amount == 0 {
            return Err(CurveError::InvalidAmount);
        }
        let mut state = self.state.lock();
        let available = state.ledger.balance_of(&from);
        if available < amount {
            return Err(CurveError::InsufficientBalance { requested: amount, available });
        }
        state.ledger.transfer(&from, &to, amount)?;
        state.track(Some(&from), Some(&to));
        debug!(curve = %self.address, from = %from, to = %to, amount, "transfer");
        Ok(())
    }

    pub fn transfer_ownership(&self, caller: Pubkey, new_owner: Pubkey) -> CurveResult<()> {
        let previous_owner = {
            let mut state = self.state.lock();
            if caller != state.owner {
                return Err(CurveError::Unauthorized);
            }
            if new_owner == Pubkey::default() {
                return Err(CurveError::InvalidOwner);
            }
            std::mem::replace(&mut state.owner, new_owner)
        };
        info!(curve = %self.address, previous_owner = %previous_owner, new_owner = %new_owner, "ownership transferred");
        self.emit(CurveEvent::OwnershipTransferred {
            curve: self.address,
            previous_owner,
            new_owner,
        });
        Ok(())
    }

    /// Owner-only. Runs the migrator again for a migrated curve whose hand-off
    /// has not completed.
    pub fn retry_migration(&self, caller: Pubkey) -> CurveResult<MigrationStatus> {
        let _call = self.guard.enter()?;
        let now = self.ctx.clock.now();
        let request = {
            let state = self.state.lock();
            if caller != state.owner {
                return Err(CurveError::Unauthorized);
            }
            if state.phase.is_open() || state.migration.is_settled() {
                return Err(CurveError::MigrationNotPending);
            }
            state.migration_request(self.address)?
        };
        Ok(self.run_migration(&request, now))
    }

    /// Error for a rejected interaction, after [`CurveState::rewind`]
    fn rollback_error(&self, cause: String, undone: Result<(), LedgerError>) -> CurveError {
        match undone {
            Ok(()) => CurveError::TransferFailed(cause),
            Err(e) => {
                error!(
                    curve = %self.address,
                    cause = %cause,
                    ledger_error = %e,
                    "ledger refused rollback, curve fields restored but ledger diverges"
                );
                CurveError::RollbackFailed { cause, ledger: e.to_string() }
            }
        }
    }

    fn run_migration(&self, request: &MigrationRequest, now: i64) -> MigrationStatus {
        debug_assert!(self.guard.is_active());
        let status = match self.ctx.migrator.migrate(request) {
            Ok(outcome) => {
                let status = MigrationStatus::from(outcome);
                info!(curve = %self.address, status = ?status, "liquidity migration");
                status
            }
            Err(e) => {
                error!(curve = %self.address, error = %e, "liquidity migration failed");
                self.emit(CurveEvent::MigrationFailed {
                    curve: self.address,
                    reason: e.to_string(),
                    timestamp: now,
                });
                MigrationStatus::Failed(e.to_string())
            }
        };
        self.state.lock().migration = status.clone();
        status
    }

    fn emit(&self, event: CurveEvent) {
        self.ctx.listener.on_event(&event);
    }

    fn recovery_unlocks_at(&self) -> i64 {
        self.created_at.saturating_add(RECOVERY_TIMELOCK_SECS)
    }

    pub fn quote_buy(&self, payment: u128) -> CurveResult<BuyQuote> {
        let state = self.state.lock();
        if !state.phase.is_open() {
            return Err(CurveError::TradingClosed);
        }
        quote_buy(state.issued_total, payment)
    }

    pub fn quote_sell(&self, amount: u128) -> CurveResult<SellQuote> {
        let state = self.state.lock();
        if !state.phase.is_open() {
            return Err(CurveError::TradingClosed);
        }
        if amount == 0 {
            return Err(CurveError::InvalidAmount);
        }
        if amount > state.issued_total {
            return Err(CurveError::InsufficientSupply { requested: amount, issued: state.issued_total });
        }
        quote_sell(state.issued_total, amount)
    }

    pub fn get_details(&self) -> CurveResult<CurveDetails> {
        let state = self.state.lock();
        Ok(CurveDetails {
            address: self.address,
            name: self.name.clone(),
            symbol: self.symbol.clone(),
            spot_price: spot_price(state.issued_total)?,
            market_cap: market_cap(state.issued_total)?,
            phase: state.phase,
            issued_total: state.issued_total,
            holder_count: state.holders.holder_count(),
        })
    }

    pub fn get_created_at(&self) -> i64 {
        self.created_at
    }

    pub fn balance_of(&self, owner: &Pubkey) -> u128 {
        self.state.lock().ledger.balance_of(owner)
    }

    pub fn holder_count(&self) -> u64 {
        self.state.lock().holders.holder_count()
    }

    pub fn is_holder(&self, address: &Pubkey) -> bool {
        self.state.lock().holders.is_holder(address)
    }

    pub fn phase(&self) -> TradingPhase {
        self.state.lock().phase
    }

    pub fn migration_status(&self) -> MigrationStatus {
        self.state.lock().migration.clone()
    }

    pub fn reserve_balance(&self) -> u128 {
        self.state.lock().reserve_balance
    }

    pub fn issued_total(&self) -> u128 {
        self.state.lock().issued_total
    }

    pub fn market_cap_threshold(&self) -> u128 {
        self.market_cap_threshold
    }

    pub fn owner(&self) -> Pubkey {
        self.state.lock().owner
    }

    pub fn creator(&self) -> Pubkey {
        self.creator
    }

    pub fn address(&self) -> Pubkey {
        self.address
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn snapshot(&self) -> CurveAccount {
        let state = self.state.lock();
        CurveAccount {
            address: self.address,
            creator: self.creator,
            owner: state.owner,
            name: self.name.clone(),
            symbol: self.symbol.clone(),
            market_cap_threshold: self.market_cap_threshold,
            created_at: self.created_at,
            phase: state.phase,
            issued_total: state.issued_total,
            reserve_balance: state.reserve_balance,
            holder_count: state.holders.holder_count(),
            holders: state.holders.holders(),
            migration: state.migration.clone(),
        }
    }
}
