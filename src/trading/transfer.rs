//! 原生币转账模块
//!
//! 卖出所得和恢复清扫的原生币都经由此接口转出。
//! 接收方拒绝时实现必须返回错误，曲线随后回滚自身的变更。

use anyhow::anyhow;
use dashmap::DashMap;
use fnv::FnvHashSet;
use parking_lot::RwLock;
use solana_sdk::pubkey::Pubkey;
use tracing::{debug, warn};

use crate::common::AnyResult;

pub trait NativeTransfer: Send + Sync {
    /// 发送原生币到 `to`，接收方拒绝时返回错误
    fn send(&self, to: &Pubkey, amount: u128) -> AnyResult<()>;
}

/// 进程内金库：按接收方累计入账，拒收名单上的地址拒绝所有转账
#[derive(Default)]
pub struct NativeVault {
    credits: DashMap<Pubkey, u128>,
    rejected: RwLock<FnvHashSet<Pubkey>>,
}

impl NativeVault {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn credited(&self, to: &Pubkey) -> u128 {
        self.credits.get(to).map(|v| *v).unwrap_or(0)
    }

    pub fn total_credited(&self) -> u128 {
        self.credits.iter().map(|e| *e.value()).sum()
    }

    pub fn reject(&self, address: Pubkey) {
        self.rejected.write().insert(address);
    }

    pub fn accept(&self, address: &Pubkey) {
        self.rejected.write().remove(address);
    }
}

impl NativeTransfer for NativeVault {
    fn send(&self, to: &Pubkey, amount: u128) -> AnyResult<()> {
        if self.rejected.read().contains(to) {
            warn!(recipient = %to, amount, "recipient rejected native transfer");
            return Err(anyhow!("recipient {to} rejected {amount}"));
        }
        let mut entry = self.credits.entry(*to).or_insert(0);
        *entry = entry
            .checked_add(amount)
            .ok_or_else(|| anyhow!("credit overflow for {to}"))?;
        debug!(recipient = %to, amount, "native transfer");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_send_accumulates() {
        let vault = NativeVault::new();
        let alice = Pubkey::new_unique();
        vault.send(&alice, 5).unwrap();
        vault.send(&alice, 7).unwrap();
        assert_eq!(vault.credited(&alice), 12);
        assert_eq!(vault.total_credited(), 12);
    }

    #[test]
    fn test_rejection_list() {
        let vault = NativeVault::new();
        let alice = Pubkey::new_unique();
        vault.reject(alice);
        assert!(vault.send(&alice, 1).is_err());
        assert_eq!(vault.credited(&alice), 0);

        vault.accept(&alice);
        vault.send(&alice, 1).unwrap();
        assert_eq!(vault.credited(&alice), 1);
    }
}
