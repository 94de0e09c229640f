//! 曲线事件回调模块
//!
//! 每次提交的状态变更都会通知监听器。
//! 监听器在状态锁释放之后运行，可以自由读取曲线。

use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use solana_sdk::pubkey::Pubkey;
use tracing::info;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CurveEvent {
    Bought {
        curve: Pubkey,
        buyer: Pubkey,
        #[serde(with = "crate::common::serde_u128")]
        payment: u128,
        #[serde(with = "crate::common::serde_u128")]
        amount: u128,
        #[serde(with = "crate::common::serde_u128")]
        price_after: u128,
        timestamp: i64,
    },
    Sold {
        curve: Pubkey,
        seller: Pubkey,
        #[serde(with = "crate::common::serde_u128")]
        amount: u128,
        #[serde(with = "crate::common::serde_u128")]
        proceeds: u128,
        #[serde(with = "crate::common::serde_u128")]
        price_after: u128,
        timestamp: i64,
    },
    /// 每条曲线只触发一次
    Migrated {
        curve: Pubkey,
        #[serde(with = "crate::common::serde_u128")]
        market_cap: u128,
        #[serde(with = "crate::common::serde_u128")]
        issued_total: u128,
        #[serde(with = "crate::common::serde_u128")]
        reserve_balance: u128,
        timestamp: i64,
    },
    MigrationFailed {
        curve: Pubkey,
        reason: String,
        timestamp: i64,
    },
    FundsRecovered {
        curve: Pubkey,
        owner: Pubkey,
        #[serde(with = "crate::common::serde_u128")]
        native_amount: u128,
        #[serde(with = "crate::common::serde_u128")]
        token_amount: u128,
        timestamp: i64,
    },
    OwnershipTransferred {
        curve: Pubkey,
        previous_owner: Pubkey,
        new_owner: Pubkey,
    },
}

impl CurveEvent {
    pub fn curve(&self) -> Pubkey {
        match self {
            CurveEvent::Bought { curve, .. }
            | CurveEvent::Sold { curve, .. }
            | CurveEvent::Migrated { curve, .. }
            | CurveEvent::MigrationFailed { curve, .. }
            | CurveEvent::FundsRecovered { curve, .. }
            | CurveEvent::OwnershipTransferred { curve, .. } => *curve,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            CurveEvent::Bought { .. } => "bought",
            CurveEvent::Sold { .. } => "sold",
            CurveEvent::Migrated { .. } => "migrated",
            CurveEvent::MigrationFailed { .. } => "migration_failed",
            CurveEvent::FundsRecovered { .. } => "funds_recovered",
            CurveEvent::OwnershipTransferred { .. } => "ownership_transferred",
        }
    }

    /// JSON 形式，供日志和索引器使用
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_else(|e| {
            serde_json::json!({ self.kind(): { "error": e.to_string() } })
        })
    }
}

pub trait CurveEventListener: Send + Sync {
    fn on_event(&self, event: &CurveEvent);
}

pub type ListenerRef = Arc<dyn CurveEventListener>;

#[derive(Clone, Default)]
pub struct NoopListener;

impl CurveEventListener for NoopListener {
    fn on_event(&self, _event: &CurveEvent) {}
}

/// 以 info 级别转发到 `tracing`
#[derive(Clone, Default)]
pub struct TracingListener;

impl CurveEventListener for TracingListener {
    fn on_event(&self, event: &CurveEvent) {
        info!(curve = %event.curve(), kind = event.kind(), event = %event.to_json(), "curve event");
    }
}

/// 在内存中保存全部事件
#[derive(Default)]
pub struct RecordingListener {
    events: Mutex<Vec<CurveEvent>>,
}

impl RecordingListener {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<CurveEvent> {
        self.events.lock().clone()
    }

    pub fn count(&self, kind: &str) -> usize {
        self.events.lock().iter().filter(|e| e.kind() == kind).count()
    }

    pub fn clear(&self) {
        self.events.lock().clear();
    }
}

impl CurveEventListener for RecordingListener {
    fn on_event(&self, event: &CurveEvent) {
        self.events.lock().push(event.clone());
    }
}
