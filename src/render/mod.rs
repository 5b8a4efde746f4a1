//! Render Domain
//!
//! 职责：把通知变成一帧内的绘制输出
//!
//! 核心概念：
//! - `FrameCanvas`: 能力接口，宿主每帧提供的绘制目标
//! - `FontSystem`: 字形光栅化 + 缓存 + 文本度量
//! - `TextBlock`: 通知正文控件（尺寸缓存 + 脏标记）
//!
//! 核心原则：
//! - 光栅化本身是外部能力（`GlyphRasterizer`），这里只做缓存与组合
//! - 绘制只产生命令，不接触 GPU/表面细节

pub mod cache;
pub mod canvas;
pub mod font;
pub mod text;
