//! StartupQueue - 合成器就绪前的通知缓冲
//!
//! 与合成器集合共用同一把锁（app 层的 overlay 锁），
//! 保证一条通知不会同时出现在两边。

use crate::app::OverlayConfig;
use crate::compositor::OverlayCompositor;
use crate::domain::handle::NotificationHandle;
use crate::store::NotificationStore;

#[derive(Default)]
pub struct StartupQueue {
    /// 提交顺序（旧的在前）
    pending: Vec<NotificationHandle>,
}

impl StartupQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, handle: NotificationHandle) {
        self.pending.push(handle);
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// 合成器创建时的迁移
    ///
    /// keepUntilShown 的条目按原相对顺序转入合成器，其余从 store 注销丢弃
    /// （突然丢弃，不触发任何回调）。返回 (保留数, 丢弃数)。
    pub(crate) fn drain_into(
        &mut self,
        compositor: &mut OverlayCompositor,
        store: &NotificationStore,
        config: &OverlayConfig,
    ) -> (usize, usize) {
        let mut kept = 0;
        let mut discarded = 0;
        for handle in self.pending.drain(..) {
            match store.with_mut(handle, |n| n.keep_until_shown()) {
                Some(true) => {
                    compositor.attach(handle, store, config);
                    kept += 1;
                }
                Some(false) => {
                    store.remove(handle);
                    discarded += 1;
                }
                None => {
                    crate::nm_log_error!(
                        "[StartupQueue] queued handle {} not registered",
                        handle.0
                    );
                }
            }
        }
        (kept, discarded)
    }

    /// 会话收尾：只保留 keepUntilShown 的条目（重启前未首绘的幸存语义）
    pub(crate) fn retain_kept(&mut self, store: &NotificationStore) -> usize {
        let before = self.pending.len();
        self.pending.retain(|&handle| {
            match store.with_mut(handle, |n| n.keep_until_shown()) {
                Some(true) => true,
                Some(false) => {
                    store.remove(handle);
                    false
                }
                None => false,
            }
        });
        before - self.pending.len()
    }
}
