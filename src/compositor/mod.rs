//! OverlayCompositor - 悬浮层合成器
//!
//! 职责：
//! - 持有渲染挂接的有序句柄列表（最新的在最前）
//! - 每帧 tick：推进状态机 → 自上而下布局 → 至多移除一条已退出的
//! - 通知本体在 store 里，这里只有非拥有的句柄
//!
//! 并发模型：
//! - tick/draw 只由渲染线程调用，外层由 app 的 overlay 锁保护
//! - 每帧至多一次结构性移除，封顶单帧开销、避免迭代中级联失效
//! - removal 回调在合成器锁内触发（文档化的唯一例外），
//!   回调实现不得重入合成器/注册表 API
//! - finish 回调在锁内取走、出锁后由 app 层触发

pub mod startup_queue;

use std::time::Instant;

use smallvec::SmallVec;

use crate::app::OverlayConfig;
use crate::domain::handle::NotificationHandle;
use crate::domain::notification::{FinishHook, InternalState};
use crate::render::canvas::FrameCanvas;
use crate::render::font::FontSystem;
use crate::store::NotificationStore;

/// tick 中取走、待出锁触发的 finish 回调
pub(crate) type PendingFinish = SmallVec<[(NotificationHandle, FinishHook); 2]>;

pub struct OverlayCompositor {
    /// 插入序列表，最新的在最前；布局顺序即此顺序
    order: SmallVec<[NotificationHandle; 8]>,
    width: f32,
    height: f32,
}

impl OverlayCompositor {
    pub fn new(width: f32, height: f32) -> Self {
        Self {
            order: SmallVec::new(),
            width,
            height,
        }
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn size(&self) -> (f32, f32) {
        (self.width, self.height)
    }

    /// 挂接一条通知：分配入场淡入，前插（最新在最上）
    pub(crate) fn attach(
        &mut self,
        handle: NotificationHandle,
        store: &NotificationStore,
        config: &OverlayConfig,
    ) {
        store.with_mut(handle, |n| n.start_fade_in(config.fade_in_step));
        self.order.insert(0, handle);
    }

    /// 每帧一次的合成过程（单线程、不可重入）
    ///
    /// 单趟算法：
    /// 1. 依序推进每条通知：计时 → 布局落位 → 消解状态请求 → 推进特效
    /// 2. 扫描一次，移除至多一条 RequestedExit 的通知
    pub(crate) fn tick(
        &mut self,
        now: Instant,
        store: &NotificationStore,
        config: &OverlayConfig,
    ) -> PendingFinish {
        let mut pending_finish = PendingFinish::new();
        let mut y = config.stack_origin_y;

        for &handle in self.order.iter() {
            let advanced = store.with_mut(handle, |n| {
                n.process(now);
                n.set_layout_position(config.stack_origin_x, y);
                let height = n.size(config.widget_padding).height;

                match n.internal_state() {
                    InternalState::RequestedFadeOutAndExit => {
                        n.start_exit_slide(config.slide_out_speed, config.fade_in_step);
                        if let Some(hook) = n.take_finish_hook() {
                            pending_finish.push((handle, hook));
                        }
                    }
                    InternalState::RequestedShake => {
                        // 固定墙钟时长的摇晃，丢帧也不延长
                        n.start_shake(now);
                    }
                    _ => {}
                }

                n.advance_effect(now, config.widget_padding);
                height
            });

            match advanced {
                Some(height) => y += height + config.stack_gap,
                None => {
                    crate::nm_log_error!("[Overlay] tick: handle {} not registered", handle.0)
                }
            }
        }

        // 每帧至多回收一条
        let exited = self.order.iter().position(|&h| {
            store.with_mut(h, |n| n.internal_state()) == Some(InternalState::RequestedExit)
        });
        if let Some(idx) = exited {
            let handle = self.order.remove(idx);
            match store.remove(handle) {
                Some(mut notification) => notification.fire_removal(),
                None => {
                    // 尽力而为：句柄找不到只记日志，不影响其余通知
                    crate::nm_log_error!(
                        "[Overlay] removal: handle {} not registered",
                        handle.0
                    );
                }
            }
        }

        pending_finish
    }

    /// 绘制全部通知（渲染线程，每帧一次）
    pub(crate) fn draw(
        &self,
        canvas: &mut dyn FrameCanvas,
        font: &mut FontSystem,
        store: &NotificationStore,
        config: &OverlayConfig,
    ) {
        // 旧的先画，最新的画在最上层
        for &handle in self.order.iter().rev() {
            store.with_mut(handle, |n| n.draw(canvas, font, config.widget_padding));
        }
    }

    /// 强制清空全部通知（会话收尾的突然拆除，不触发任何回调）
    pub(crate) fn clear(&mut self, store: &NotificationStore) -> usize {
        let cleared = self.order.len();
        for handle in self.order.drain(..) {
            store.remove(handle);
        }
        cleared
    }

    #[cfg(test)]
    pub(crate) fn handles(&self) -> Vec<NotificationHandle> {
        self.order.to_vec()
    }
}
