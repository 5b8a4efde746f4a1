//! FFI 模块 - C ABI 兼容的对外接口
//!
//! 按功能拆分：
//! - notifications: 通知模块的全部导出函数（创建/更新/结束/帧驱动）
//! - logging: 宿主日志桥接

pub mod logging;
pub mod notifications;

pub use logging::*;
pub use notifications::*;
