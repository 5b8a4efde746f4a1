//! Application Layer - OverlayApp
//!
//! 职责：协调各领域，不含业务逻辑
//!
//! - 没有进程级单例：`OverlayApp` 是显式上下文对象，
//!   在子系统启动时构造，（经不透明指针）传给每一个操作
//! - 生产者侧操作同步返回结果码，从不向调用方抛出
//! - 渲染侧 tick/draw 由宿主帧钩子驱动，每帧一次
//!
//! 锁序（必须遵守）：overlay 锁 → font 锁 → store 锁，不得反向嵌套。
//! 生产者操作只触 store 锁；add 的路由先释放 store 锁再取 overlay 锁。

pub mod config;

use std::sync::Arc;
use std::time::Instant;

use parking_lot::Mutex;
use serde::Serialize;
use thiserror::Error;

pub use config::OverlayConfig;

use crate::compositor::startup_queue::StartupQueue;
use crate::compositor::OverlayCompositor;
use crate::domain::handle::NotificationHandle;
use crate::domain::notification::{
    FinishHook, FinishMode, Notification, NotificationKind, NotificationSpec, NotificationStatus,
};
use crate::domain::primitives::Color;
use crate::render::canvas::FrameCanvas;
use crate::render::font::glyph_cache::{GlyphCacheError, GlyphCacheStats};
use crate::render::font::{FontSystem, GlyphRasterizer};
use crate::store::NotificationStore;

/// 生产者可见的错误
#[derive(Debug, Error)]
pub enum OverlayError {
    #[error("invalid argument")]
    InvalidArgument,
    #[error("handle {0:?} is not registered")]
    InvalidHandle(NotificationHandle),
    #[error("unsupported type value {0}")]
    UnsupportedType(u32),
    #[error("allocation failed ({requested} bytes)")]
    AllocationFailed { requested: usize },
    #[error("overlay not initialized")]
    OverlayNotReady,
}

impl From<GlyphCacheError> for OverlayError {
    fn from(e: GlyphCacheError) -> Self {
        match e {
            GlyphCacheError::PoolExhausted { requested, .. } => {
                OverlayError::AllocationFailed { requested }
            }
        }
    }
}

/// 静态通知请求（即发即忘）
pub struct StaticNotification {
    pub text: String,
    pub kind: NotificationKind,
    pub wait_seconds: f32,
    pub shake_seconds: f32,
    pub text_color: Color,
    pub background_color: Color,
    pub finish_hook: Option<FinishHook>,
    pub keep_until_shown: bool,
}

/// 动态通知请求（注册表跟踪，可后续更新/结束）
pub struct DynamicNotification {
    pub text: String,
    pub text_color: Color,
    pub background_color: Color,
    pub finish_hook: Option<FinishHook>,
    pub keep_until_shown: bool,
}

/// 调试统计（FFI 侧序列化为 JSON）
#[derive(Debug, Clone, Copy, Serialize)]
pub struct OverlayStats {
    pub live: usize,
    pub live_dynamic: usize,
    pub queued: usize,
    pub overlay_ready: bool,
    pub glyph: GlyphCacheStats,
}

/// 合成器集合 + 启动队列，同一把锁罩住（两结构间的交接原子可见）
struct OverlayState {
    compositor: Option<OverlayCompositor>,
    queue: StartupQueue,
}

pub struct OverlayApp {
    config: OverlayConfig,
    store: Arc<NotificationStore>,
    overlay: Mutex<OverlayState>,
    font: Mutex<FontSystem>,
}

impl OverlayApp {
    /// 构造上下文对象
    ///
    /// 光栅化能力由宿主注入。配置非法返回 InvalidArgument；
    /// 这里失败意味着悬浮层子系统无法接入宿主渲染管线，
    /// 宿主应视为致命错误终止（FFI 层返回空指针并记日志）。
    pub fn new(
        config: OverlayConfig,
        rasterizer: Box<dyn GlyphRasterizer>,
    ) -> Result<Self, OverlayError> {
        if config.screen_width <= 0.0
            || config.screen_height <= 0.0
            || config.glyph_pool_bytes == 0
            || config.text_pixel_size == 0
        {
            return Err(OverlayError::InvalidArgument);
        }
        let font = FontSystem::new(rasterizer, config.glyph_pool_bytes);
        Ok(Self {
            config,
            store: Arc::new(NotificationStore::new()),
            overlay: Mutex::new(OverlayState {
                compositor: None,
                queue: StartupQueue::new(),
            }),
            font: Mutex::new(font),
        })
    }

    pub fn config(&self) -> &OverlayConfig {
        &self.config
    }

    // ===== 生命周期（宿主帧钩子侧） =====

    /// 创建合成器（宿主渲染管线就绪时调用一次）
    ///
    /// 迁移启动队列：keepUntilShown 的按原相对顺序入场，其余丢弃。
    /// 重复调用是无害的空操作。
    pub fn init_overlay(&self, width: f32, height: f32) {
        let mut overlay = self.overlay.lock();
        if overlay.compositor.is_some() {
            return;
        }
        let mut compositor = OverlayCompositor::new(width, height);
        let OverlayState { queue, .. } = &mut *overlay;
        let (kept, discarded) = queue.drain_into(&mut compositor, &self.store, &self.config);
        if kept + discarded > 0 {
            crate::nm_log_info!(
                "[Overlay] init: migrated {} queued notifications, discarded {}",
                kept,
                discarded
            );
        }
        overlay.compositor = Some(compositor);
    }

    pub fn is_overlay_ready(&self) -> bool {
        self.overlay.lock().compositor.is_some()
    }

    pub fn api_version(&self) -> u32 {
        crate::API_VERSION
    }

    /// 每帧一次的合成过程（渲染线程）
    pub fn tick(&self) {
        self.tick_at(Instant::now());
    }

    /// 按给定时间推进一帧（测试用模拟时钟入口）
    pub fn tick_at(&self, now: Instant) {
        let pending_finish = {
            let mut overlay = self.overlay.lock();
            match overlay.compositor.as_mut() {
                Some(c) => c.tick(now, &self.store, &self.config),
                None => return,
            }
        };
        // finish 回调在两把锁之外触发
        for (handle, mut hook) in pending_finish {
            hook(handle);
        }
    }

    /// 绘制全部通知到宿主画布（渲染线程，tick 之后）
    pub fn draw_into(&self, canvas: &mut dyn FrameCanvas) {
        let overlay = self.overlay.lock();
        let Some(compositor) = overlay.compositor.as_ref() else {
            return;
        };
        let mut font = self.font.lock();
        compositor.draw(canvas, &mut font, &self.store, &self.config);
    }

    /// 强制清空全部通知（突然拆除，不触发回调）
    pub fn clear_elements(&self) {
        let mut overlay = self.overlay.lock();
        if let Some(c) = overlay.compositor.as_mut() {
            let cleared = c.clear(&self.store);
            if cleared > 0 {
                crate::nm_log_info!("[Overlay] cleared {} notifications", cleared);
            }
        }
    }

    /// 宿主应用会话结束：清空合成器与字形数据，
    /// 启动队列只保留 keepUntilShown 的条目
    pub fn session_end(&self) {
        {
            let mut overlay = self.overlay.lock();
            if let Some(c) = overlay.compositor.as_mut() {
                c.clear(&self.store);
            }
            let OverlayState { queue, .. } = &mut *overlay;
            queue.retain_kept(&self.store);
        }
        self.font.lock().unload();
    }

    // ===== 生产者操作（任意线程） =====

    /// 修订 1：悬浮层未就绪时直接失败
    pub fn add_static_notification(&self, request: StaticNotification) -> Result<(), OverlayError> {
        if !self.is_overlay_ready() {
            return Err(OverlayError::OverlayNotReady);
        }
        self.add_static_notification_v2(request)
    }

    /// 修订 2：未就绪时经启动队列缓冲，不因此失败
    pub fn add_static_notification_v2(
        &self,
        request: StaticNotification,
    ) -> Result<(), OverlayError> {
        let notification = Notification::new(
            NotificationSpec {
                text: request.text,
                status: request.kind.into(),
                wait_seconds: request.wait_seconds,
                shake_seconds: request.shake_seconds,
                text_color: request.text_color,
                background_color: request.background_color,
                finish_hook: request.finish_hook,
                keep_until_shown: request.keep_until_shown,
            },
            Instant::now(),
            self.config.text_pixel_size,
        );
        let handle = self.store.insert(notification);
        self.route(handle);
        Ok(())
    }

    /// 修订 1：悬浮层未就绪时直接失败
    pub fn add_dynamic_notification(
        &self,
        request: DynamicNotification,
    ) -> Result<NotificationHandle, OverlayError> {
        if !self.is_overlay_ready() {
            return Err(OverlayError::OverlayNotReady);
        }
        self.add_dynamic_notification_v2(request)
    }

    /// 修订 2：未就绪时经启动队列缓冲，不因此失败
    pub fn add_dynamic_notification_v2(
        &self,
        request: DynamicNotification,
    ) -> Result<NotificationHandle, OverlayError> {
        let mut notification = Notification::new(
            NotificationSpec {
                text: request.text,
                status: NotificationStatus::InProgress,
                wait_seconds: 0.0,
                shake_seconds: 0.0,
                text_color: request.text_color,
                background_color: request.background_color,
                finish_hook: request.finish_hook,
                keep_until_shown: request.keep_until_shown,
            },
            Instant::now(),
            self.config.text_pixel_size,
        );
        notification.mark_dynamic(Some(Box::new(|handle| {
            crate::nm_log_debug!("[Overlay] notification {} left the overlay", handle.0);
        })));
        let handle = self.store.insert(notification);
        self.route(handle);
        Ok(handle)
    }

    /// 新通知路由：合成器在则入场，不在则排队
    ///
    /// 整个路由在 overlay 锁内完成，通知不会同时见于两个结构。
    fn route(&self, handle: NotificationHandle) {
        let mut overlay = self.overlay.lock();
        match overlay.compositor.as_mut() {
            Some(compositor) => compositor.attach(handle, &self.store, &self.config),
            None => overlay.queue.push(handle),
        }
    }

    pub fn update_text(&self, handle: NotificationHandle, text: &str) -> Result<(), OverlayError> {
        self.store
            .with_mut(handle, |n| n.update_text(text))
            .ok_or(OverlayError::InvalidHandle(handle))
    }

    pub fn update_background_color(
        &self,
        handle: NotificationHandle,
        color: Color,
    ) -> Result<(), OverlayError> {
        self.store
            .with_mut(handle, |n| n.update_background_color(color))
            .ok_or(OverlayError::InvalidHandle(handle))
    }

    pub fn update_text_color(
        &self,
        handle: NotificationHandle,
        color: Color,
    ) -> Result<(), OverlayError> {
        self.store
            .with_mut(handle, |n| n.update_text_color(color))
            .ok_or(OverlayError::InvalidHandle(handle))
    }

    /// 结束一条动态通知：切换状态并更新等待/摇晃时长，
    /// 之后由状态机走正常的退出路径
    pub fn finish_notification(
        &self,
        handle: NotificationHandle,
        mode: FinishMode,
        wait_seconds: f32,
        shake_seconds: f32,
    ) -> Result<(), OverlayError> {
        let status = match mode {
            FinishMode::Finish => NotificationStatus::Info,
            FinishMode::FinishWithShake => NotificationStatus::Error,
        };
        self.store
            .with_mut(handle, |n| {
                n.update_status(status);
                n.update_wait_duration(wait_seconds);
                n.update_shake_duration(shake_seconds);
            })
            .ok_or(OverlayError::InvalidHandle(handle))
    }

    pub fn debug_stats(&self) -> OverlayStats {
        let overlay = self.overlay.lock();
        OverlayStats {
            live: self.store.len(),
            live_dynamic: self.store.len_dynamic(),
            queued: overlay.queue.len(),
            overlay_ready: overlay.compositor.is_some(),
            glyph: self.font.lock().cache_stats(),
        }
    }

    #[cfg(test)]
    pub(crate) fn store(&self) -> &NotificationStore {
        &self.store
    }

    #[cfg(test)]
    pub(crate) fn compositor_handles(&self) -> Vec<NotificationHandle> {
        self.overlay
            .lock()
            .compositor
            .as_ref()
            .map(|c| c.handles())
            .unwrap_or_default()
    }
}
