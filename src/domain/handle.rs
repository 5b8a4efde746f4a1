//! 通知句柄
//!
//! 句柄是生成式的不透明标识，不是对象地址：
//! - 单调递增，进程生命周期内不复用
//! - 0 保留为无效值（与 FFI 侧约定一致）

use std::sync::atomic::{AtomicU64, Ordering};

/// 通知的不透明身份，整个生命周期内稳定唯一
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NotificationHandle(pub u64);

impl NotificationHandle {
    pub const INVALID: NotificationHandle = NotificationHandle(0);

    pub fn is_valid(self) -> bool {
        self.0 != 0
    }
}

/// 句柄分配器
///
/// 从 1 开始原子递增，支持任意线程并发创建
pub struct HandleAllocator {
    next: AtomicU64,
}

impl HandleAllocator {
    pub fn new() -> Self {
        Self {
            next: AtomicU64::new(1),
        }
    }

    pub fn allocate(&self) -> NotificationHandle {
        NotificationHandle(self.next.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for HandleAllocator {
    fn default() -> Self {
        Self::new()
    }
}
