//! 防重入保护
//!
//! 每条曲线一个守卫，包住所有转移价值的操作。
//! 其他线程的调用在锁上排队；持锁线程上的嵌套调用（例如收款方在付款过程中回调曲线）
//! 会看到标志位，并以 [`CurveError::ReentrancyBlocked`] 被拒绝。

use std::cell::Cell;

use parking_lot::{ReentrantMutex, ReentrantMutexGuard};
use tracing::warn;

use crate::common::{CurveError, CurveResult};

#[derive(Default)]
pub struct ReentrancyGuard {
    lock: ReentrantMutex<Cell<bool>>,
}

/// 在受保护调用期间持有，释放时清除标志位
pub struct CallGuard<'a> {
    inner: ReentrantMutexGuard<'a, Cell<bool>>,
}

impl ReentrancyGuard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enter(&self) -> CurveResult<CallGuard<'_>> {
        let inner = self.lock.lock();
        if inner.get() {
            warn!("reentrant call rejected");
            return Err(CurveError::ReentrancyBlocked);
        }
        inner.set(true);
        Ok(CallGuard { inner })
    }

    /// 有调用持有守卫时返回 true
    pub(crate) fn is_active(&self) -> bool {
        match self.lock.try_lock() {
            Some(inner) => inner.get(),
            None => true,
        }
    }
}

impl Drop for CallGuard<'_> {
    fn drop(&mut self) {
        self.inner.set(false);
    }
}
