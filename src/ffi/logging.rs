//! 日志桥接 FFI 模块
//!
//! 把 Rust 端的关键日志转发给宿主，由宿主统一落盘：
//! - 宿主通过全局回调接收日志消息
//! - 回调未设置时 fallback 到 eprintln!
//!
//! # 使用方式
//! ```ignore
//! // 宿主侧安装回调
//! nm_set_log_callback(my_callback);
//!
//! // Rust 侧记录日志
//! nm_log_warn!("[Overlay] tick: handle {} not registered", handle);
//! ```

use std::ffi::{c_char, CString};
use std::sync::atomic::{AtomicPtr, Ordering};

/// 日志级别（与宿主侧约定一致）
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NmLogLevel {
    Debug = 0,
    Info = 1,
    Warn = 2,
    Error = 3,
}

/// 日志回调函数类型
///
/// # 线程安全
/// 回调可能从任意线程调用，宿主实现需自行保证线程安全
pub type LogCallback = extern "C" fn(level: NmLogLevel, message: *const c_char);

/// 全局日志回调（原子指针，线程安全）
static LOG_CALLBACK: AtomicPtr<()> = AtomicPtr::new(std::ptr::null_mut());

/// 设置日志回调（宿主启动时调用一次）
#[no_mangle]
pub extern "C" fn nm_set_log_callback(callback: LogCallback) {
    LOG_CALLBACK.store(callback as *mut (), Ordering::SeqCst);
}

/// 清除日志回调
#[no_mangle]
pub extern "C" fn nm_clear_log_callback() {
    LOG_CALLBACK.store(std::ptr::null_mut(), Ordering::SeqCst);
}

/// 发送一条日志
///
/// 回调已设置则转发宿主，否则 fallback 到 stderr。
/// 任意线程可调用。
pub fn log_message(level: NmLogLevel, message: &str) {
    let callback = LOG_CALLBACK.load(Ordering::SeqCst);

    if !callback.is_null() {
        let cb: LogCallback = unsafe { std::mem::transmute(callback) };
        if let Ok(c_message) = CString::new(message) {
            cb(level, c_message.as_ptr());
            return;
        }
    }

    eprintln!("[notify-overlay {:?}] {}", level, message);
}

#[macro_export]
macro_rules! nm_log_debug {
    ($($arg:tt)*) => {
        $crate::ffi::logging::log_message(
            $crate::ffi::logging::NmLogLevel::Debug,
            &format!($($arg)*),
        )
    };
}

#[macro_export]
macro_rules! nm_log_info {
    ($($arg:tt)*) => {
        $crate::ffi::logging::log_message(
            $crate::ffi::logging::NmLogLevel::Info,
            &format!($($arg)*),
        )
    };
}

#[macro_export]
macro_rules! nm_log_warn {
    ($($arg:tt)*) => {
        $crate::ffi::logging::log_message(
            $crate::ffi::logging::NmLogLevel::Warn,
            &format!($($arg)*),
        )
    };
}

#[macro_export]
macro_rules! nm_log_error {
    ($($arg:tt)*) => {
        $crate::ffi::logging::log_message(
            $crate::ffi::logging::NmLogLevel::Error,
            &format!($($arg)*),
        )
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_without_callback_does_not_panic() {
        nm_clear_log_callback();
        log_message(NmLogLevel::Info, "fallback path");
        nm_log_info!("macro path {}", 42);
    }

    #[test]
    fn log_with_interior_nul_falls_back() {
        nm_clear_log_callback();
        log_message(NmLogLevel::Warn, "bad\0message");
    }
}
