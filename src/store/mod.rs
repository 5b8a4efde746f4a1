//! NotificationStore - 通知的唯一所有者
//!
//! 职责：
//! - 进程内所有存活通知的权威存储（arena，按生成式句柄索引）
//! - 生产者线程的注册/注销/按句柄更新都经这里
//! - 合成器与启动队列只持句柄，删除权只在 store
//!
//! 并发模型：
//! - 单把互斥锁罩住整个遍历；查找是线性扫描
//!   （预期通知数 < 10，扫描开销可忽略）
//! - 锁内绝不回调用户代码
//! - 锁序：合成器锁在外、store 锁在内；持 store 锁时不得再取合成器锁

use parking_lot::Mutex;

use crate::domain::handle::{HandleAllocator, NotificationHandle};
use crate::domain::notification::Notification;

pub struct NotificationStore {
    /// 注册顺序靠前的是最新的（与原始注册表 push_front 一致）
    entries: Mutex<Vec<(NotificationHandle, Notification)>>,
    allocator: HandleAllocator,
}

impl NotificationStore {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(Vec::new()),
            allocator: HandleAllocator::new(),
        }
    }

    /// 注册一条通知，分配并返回句柄
    pub fn insert(&self, mut notification: Notification) -> NotificationHandle {
        let handle = self.allocator.allocate();
        notification.assign_handle(handle);
        self.entries.lock().insert(0, (handle, notification));
        handle
    }

    /// 按句柄查找并原地修改
    ///
    /// 未注册的句柄返回 None 且无任何副作用。
    pub fn with_mut<R>(
        &self,
        handle: NotificationHandle,
        f: impl FnOnce(&mut Notification) -> R,
    ) -> Option<R> {
        let mut entries = self.entries.lock();
        entries
            .iter_mut()
            .find(|(h, _)| *h == handle)
            .map(|(_, n)| f(n))
    }

    /// 注销并取回所有权（合成器回收路径）
    pub fn remove(&self, handle: NotificationHandle) -> Option<Notification> {
        let mut entries = self.entries.lock();
        let idx = entries.iter().position(|(h, _)| *h == handle)?;
        Some(entries.remove(idx).1)
    }

    pub fn contains(&self, handle: NotificationHandle) -> bool {
        self.entries.lock().iter().any(|(h, _)| *h == handle)
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    pub fn len_dynamic(&self) -> usize {
        self.entries
            .lock()
            .iter()
            .filter(|(_, n)| n.is_dynamic())
            .count()
    }
}

impl Default for NotificationStore {
    fn default() -> Self {
        Self::new()
    }
}
