//! Notification Domain
//!
//! 职责：通知的聚合根与值对象
//!
//! 核心概念：
//! - `Notification`: 聚合根，一条通知的全部状态（文本/颜色/计时/状态机）
//! - `NotificationHandle`: 值对象，通知的不透明身份
//! - `Effect`: 值对象，进行中的视觉过渡（淡入/摇晃/滑出）
//!
//! 核心原则：
//! - 不知道锁的存在，所有并发控制在 store/compositor 层
//! - 状态机只由合成器 tick 推进，生产者只能发出"请求"

pub mod effect;
pub mod handle;
pub mod notification;
pub mod primitives;
