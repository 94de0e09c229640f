//! Fungible ledger collaborator
//!
//! The curve never keeps balances itself; it drives a ledger through this
//! trait and runs the holder hook after every mutation.

use fnv::FnvHashMap;
use solana_sdk::pubkey::Pubkey;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LedgerError {
    #[error("insufficient balance for {owner}: requested {requested}, available {available}")]
    InsufficientBalance { owner: Pubkey, requested: u128, available: u128 },
    #[error("total issued would overflow")]
    SupplyOverflow,
    #[error("ledger rejected operation: {0}")]
    Rejected(String),
}

pub trait FungibleLedger: Send {
    fn mint(&mut self, to: &Pubkey, amount: u128) -> Result<(), LedgerError>;

    fn burn(&mut self, from: &Pubkey, amount: u128) -> Result<(), LedgerError>;

    fn transfer(&mut self, from: &Pubkey, to: &Pubkey, amount: u128) -> Result<(), LedgerError>;

    fn balance_of(&self, owner: &Pubkey) -> u128;

    fn total_issued(&self) -> u128;

    /// Every address with a non-zero balance, for audits and snapshots
    fn holders(&self) -> Vec<(Pubkey, u128)>;
}

/// In-process ledger. Zero balances are dropped so the map only ever holds
/// live holders.
#[derive(Debug, Clone, Default)]
pub struct InMemoryLedger {
    balances: FnvHashMap<Pubkey, u128>,
    total_issued: u128,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    fn debit(&mut self, owner: &Pubkey, amount: u128) -> Result<(), LedgerError> {
        let available = self.balance_of(owner);
        if available < amount {
            return Err(LedgerError::InsufficientBalance {
                owner: *owner,
                requested: amount,
                available,
            });
        }
        let remaining = available - amount;
        if remaining == 0 {
            self.balances.remove(owner);
        } else {
            self.balances.insert(*owner, remaining);
        }
        Ok(())
    }

    fn credit(&mut self, owner: &Pubkey, amount: u128) -> Result<(), LedgerError> {
        if amount == 0 {
            return Ok(());
        }
        let entry = self.balances.entry(*owner).or_insert(0);
        *entry = entry.checked_add(amount).ok_or(LedgerError::SupplyOverflow)?;
        Ok(())
    }
}

impl FungibleLedger for InMemoryLedger {
    fn mint(&mut self, to: &Pubkey, amount: u128) -> Result<(), LedgerError> {
        let total = self.total_issued.checked_add(amount).ok_or(LedgerError::SupplyOverflow)?;
        self.credit(to, amount)?;
        self.total_issued = total;
        Ok(())
    }

    fn burn(&mut self, from: &Pubkey, amount: u128) -> Result<(), LedgerError> {
        self.debit(from, amount)?;
        self.total_issued -= amount;
        Ok(())
    }

    fn transfer(&mut self, from: &Pubkey, to: &Pubkey, amount: u128) -> Result<(), LedgerError> {
        if from == to {
            let available = self.balance_of(from);
            if available < amount {
                return Err(LedgerError::InsufficientBalance {
                    owner: *from,
                    requested: amount,
                    available,
                });
            }
            return Ok(());
        }
        self.debit(from, amount)?;
        self.credit(to, amount)
    }

    fn balance_of(&self, owner: &Pubkey) -> u128 {
        self.balances.get(owner).copied().unwrap_or(0)
    }

    fn total_issued(&self) -> u128 {
        self.total_issued
    }

    fn holders(&self) -> Vec<(Pubkey, u128)> {
        let mut holders: Vec<_> = self.balances.iter().map(|(k, v)| (*k, *v)).collect();
        holders.sort_by(|a, b| a.0.cmp(&b.0));
        holders
    }
}
