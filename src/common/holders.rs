//! 持币地址计数
//!
//! 增量维护持币地址：每次余额变更只看两条边（接收方 0 -> 正数，发送方 正数 -> 0），
//! 从不重新扫描全部余额。

use fnv::FnvHashSet;
use solana_sdk::pubkey::Pubkey;

use super::ledger::FungibleLedger;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HolderChange {
    Gained(Pubkey),
    Lost(Pubkey),
}

#[derive(Debug, Clone, Default)]
pub struct HolderTracker {
    is_holder: FnvHashSet<Pubkey>,
    holder_count: u64,
}

impl HolderTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// 从已知持币列表重建（快照恢复）
    pub fn from_holders<I: IntoIterator<Item = Pubkey>>(holders: I) -> Self {
        let is_holder: FnvHashSet<Pubkey> = holders.into_iter().collect();
        let holder_count = is_holder.len() as u64;
        Self { is_holder, holder_count }
    }

    /// 余额变更后的钩子。铸造时 `from` 为 `None`，销毁时 `to` 为 `None`。
    /// 余额在变更*之后*从账本读取。
    pub fn on_balance_change(
        &mut self,
        from: Option<&Pubkey>,
        to: Option<&Pubkey>,
        ledger: &dyn FungibleLedger,
    ) -> Vec<HolderChange> {
        let mut changes = Vec::with_capacity(2);

        if let Some(from) = from {
            if ledger.balance_of(from) == 0 && self.is_holder.remove(from) {
                self.holder_count -= 1;
                changes.push(HolderChange::Lost(*from));
            }
        }

        if let Some(to) = to {
            if ledger.balance_of(to) != 0 && self.is_holder.insert(*to) {
                self.holder_count += 1;
                changes.push(HolderChange::Gained(*to));
            }
        }

        debug_assert_eq!(self.holder_count as usize, self.is_holder.len());
        changes
    }

    /// 强制设置单个地址的标志，回滚调用时使用
    pub fn set_holder(&mut self, address: &Pubkey, holding: bool) {
        if holding {
            if self.is_holder.insert(*address) {
                self.holder_count += 1;
            }
        } else if self.is_holder.remove(address) {
            self.holder_count -= 1;
        }
    }

    pub fn holder_count(&self) -> u64 {
        self.holder_count
    }

    pub fn is_holder(&self, address: &Pubkey) -> bool {
        self.is_holder.contains(address)
    }

    /// 排序后的持币列表，用于持久化
    pub fn holders(&self) -> Vec<Pubkey> {
        let mut holders: Vec<Pubkey> = self.is_holder.iter().copied().collect();
        holders.sort();
        holders
    }
}
