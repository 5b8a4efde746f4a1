//! notify-overlay-ffi - 通知悬浮层引擎
//!
//! 在宿主应用的每一帧之上叠加 toast 通知，宿主无需配合：
//! - 任意生产者线程随时提交/更新/结束通知
//! - 渲染线程每帧驱动一次 tick（状态机推进 + 布局 + 回收）
//! - 通过 C ABI 嵌入宿主进程，帧钩子与最终呈现由宿主负责
//!
//! 数据流：
//!
//! ```text
//! 生产者线程 ──→ OverlayApp API ──→ NotificationStore（唯一所有者）
//!                      │                    ↑
//!                      └──→ 启动队列 / 合成器（只持句柄）
//!                                           │
//! 渲染线程 ──每帧──→ tick() ──→ 状态机 + 布局 + 至多一次移除
//! ```

pub mod app;
pub mod compositor;
pub mod domain;
pub mod ffi;
pub mod render;
pub mod store;

#[cfg(test)]
pub(crate) mod test_support;


pub use app::{OverlayApp, OverlayConfig, OverlayError, OverlayStats};
pub use domain::handle::NotificationHandle;
pub use domain::notification::{FinishMode, Notification, NotificationKind, NotificationStatus};
pub use domain::primitives::Color;
pub use render::canvas::FrameCanvas;
pub use render::font::{FontSystem, GlyphRasterizer, LineMetrics, RasterizedGlyph};

/// 当前 API 修订号
///
/// 修订 1：悬浮层未就绪时 add 操作返回 OverlayNotReady。
/// 修订 2：未就绪时经启动队列缓冲，add 不再因此失败。
pub const API_VERSION: u32 = 2;
