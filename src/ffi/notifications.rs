//! 通知模块 FFI - C ABI 导出面
//!
//! 所有操作都以不透明的 `OverlayAppHandle` 为第一参数（显式上下文，
//! 没有进程级单例）。生产者侧函数任意线程可调，同步返回 `NotifyResult`；
//! 帧驱动函数（init/tick/draw）只能由渲染线程调用。
//!
//! 修订历史：
//! - 修订 1（不带 v2 后缀的 add）：悬浮层未就绪返回 OverlayNotReady
//! - 修订 2（v2 后缀）：未就绪经启动队列缓冲，不因此失败；版本号 2

use std::ffi::{c_char, c_void, CStr, CString};
use std::ptr;

use crate::app::{DynamicNotification, OverlayApp, OverlayConfig, OverlayError, StaticNotification};
use crate::domain::handle::NotificationHandle;
use crate::domain::notification::{FinishHook, FinishMode, NotificationKind};
use crate::domain::primitives::{Color, Rect};
use crate::render::canvas::FrameCanvas;
use crate::render::font::{GlyphBitmap, GlyphRasterizer, LineMetrics, RasterizedGlyph};

/// 辅助宏：在 FFI 边界捕获 panic
macro_rules! catch_panic {
    ($default:expr, $body:expr) => {
        match std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| $body)) {
            Ok(result) => result,
            Err(e) => {
                crate::nm_log_error!("[notify-overlay FFI] caught panic: {:?}", e);
                $default
            }
        }
    };
}

// ============================================================================
// 基础类型
// ============================================================================

/// 操作结果码
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotifyResult {
    Success = 0,
    InvalidArgument = 1,
    InvalidHandle = 2,
    UnsupportedType = 3,
    AllocationFailed = 4,
    OverlayNotReady = 5,
}

impl From<OverlayError> for NotifyResult {
    fn from(e: OverlayError) -> Self {
        match e {
            OverlayError::InvalidArgument => NotifyResult::InvalidArgument,
            OverlayError::InvalidHandle(_) => NotifyResult::InvalidHandle,
            OverlayError::UnsupportedType(_) => NotifyResult::UnsupportedType,
            OverlayError::AllocationFailed { .. } => NotifyResult::AllocationFailed,
            OverlayError::OverlayNotReady => NotifyResult::OverlayNotReady,
        }
    }
}

fn to_result(r: Result<(), OverlayError>) -> NotifyResult {
    match r {
        Ok(()) => NotifyResult::Success,
        Err(e) => e.into(),
    }
}

/// RGBA 颜色（0-255 每通道），与 `Color` 同布局
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct NMColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl From<NMColor> for Color {
    fn from(c: NMColor) -> Self {
        Color::new(c.r, c.g, c.b, c.a)
    }
}

impl From<Color> for NMColor {
    fn from(c: Color) -> Self {
        NMColor {
            r: c.r,
            g: c.g,
            b: c.b,
            a: c.a,
        }
    }
}

/// 通知类型编码（静态通知参数）
const NM_NOTIFICATION_TYPE_INFO: u32 = 0;
const NM_NOTIFICATION_TYPE_ERROR: u32 = 1;

/// 结束方式编码
const NM_FINISH: u32 = 0;
const NM_FINISH_WITH_SHAKE: u32 = 1;

fn kind_from(value: u32) -> Result<NotificationKind, OverlayError> {
    match value {
        NM_NOTIFICATION_TYPE_INFO => Ok(NotificationKind::Info),
        NM_NOTIFICATION_TYPE_ERROR => Ok(NotificationKind::Error),
        other => Err(OverlayError::UnsupportedType(other)),
    }
}

fn finish_mode_from(value: u32) -> Result<FinishMode, OverlayError> {
    match value {
        NM_FINISH => Ok(FinishMode::Finish),
        NM_FINISH_WITH_SHAKE => Ok(FinishMode::FinishWithShake),
        other => Err(OverlayError::UnsupportedType(other)),
    }
}

/// finish 回调：通知进入退出流程时触发一次
pub type NMFinishCallback = extern "C" fn(handle: u64, context: *mut c_void);

/// 裸指针包装
///
/// Safety: context 指针的线程约定由宿主负责（回调可能在渲染线程触发）
struct SendPtr(*mut c_void);
unsafe impl Send for SendPtr {}

fn wrap_finish_hook(
    callback: Option<NMFinishCallback>,
    context: *mut c_void,
) -> Option<FinishHook> {
    let cb = callback?;
    let ctx = SendPtr(context);
    Some(Box::new(move |handle: NotificationHandle| {
        // 强制整体捕获 SendPtr（而非 edition 2021 的字段级拆分捕获），保证闭包 Send
        let ctx = &ctx;
        cb(handle.0, ctx.0);
    }))
}

fn text_from(text: *const c_char) -> Result<String, OverlayError> {
    if text.is_null() {
        return Err(OverlayError::InvalidArgument);
    }
    let c_str = unsafe { CStr::from_ptr(text) };
    match c_str.to_str() {
        Ok(s) => Ok(s.to_owned()),
        Err(_) => Err(OverlayError::InvalidArgument),
    }
}

// ============================================================================
// 光栅化能力注入
// ============================================================================

/// 字形光栅化结果描述
#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
pub struct NMGlyphInfo {
    pub width: u16,
    pub height: u16,
    pub left_bearing: f32,
    pub top: f32,
    pub advance: f32,
    pub glyph_index: u32,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
pub struct NMLineMetrics {
    pub ascender: f32,
    pub descender: f32,
}

/// 光栅化回调（两段式协议）
///
/// 第一次调用 out_pixels = NULL 只填 out_info；
/// 第二次调用带 width*height 大小的缓冲区写入 8-bit coverage 像素。
/// 字体不含该字符时返回 false。
pub type NMRasterizeFn = extern "C" fn(
    context: *mut c_void,
    char_code: u32,
    pixel_size: u16,
    out_info: *mut NMGlyphInfo,
    out_pixels: *mut u8,
    pixels_capacity: usize,
) -> bool;

pub type NMLineMetricsFn =
    extern "C" fn(context: *mut c_void, pixel_size: u16, out_metrics: *mut NMLineMetrics) -> bool;

/// 宿主注入的光栅化能力
#[repr(C)]
#[derive(Clone, Copy)]
pub struct NMRasterizer {
    pub context: *mut c_void,
    pub rasterize: Option<NMRasterizeFn>,
    pub line_metrics: Option<NMLineMetricsFn>,
}

/// C 回调适配成 `GlyphRasterizer`
struct CallbackRasterizer {
    context: SendPtr,
    rasterize: NMRasterizeFn,
    line_metrics: Option<NMLineMetricsFn>,
}

impl GlyphRasterizer for CallbackRasterizer {
    fn rasterize(&mut self, ch: char, pixel_size: u16) -> Option<RasterizedGlyph> {
        let mut info = NMGlyphInfo::default();
        if !(self.rasterize)(
            self.context.0,
            ch as u32,
            pixel_size,
            &mut info,
            ptr::null_mut(),
            0,
        ) {
            return None;
        }

        let len = info.width as usize * info.height as usize;
        let mut pixels = vec![0u8; len];
        if len > 0
            && !(self.rasterize)(
                self.context.0,
                ch as u32,
                pixel_size,
                &mut info,
                pixels.as_mut_ptr(),
                len,
            )
        {
            return None;
        }

        Some(RasterizedGlyph {
            width: info.width,
            height: info.height,
            pixels,
            left_bearing: info.left_bearing,
            top: info.top,
            advance: info.advance,
            glyph_index: info.glyph_index,
        })
    }

    fn line_metrics(&mut self, pixel_size: u16) -> LineMetrics {
        let mut out = NMLineMetrics::default();
        if let Some(f) = self.line_metrics {
            if f(self.context.0, pixel_size, &mut out) {
                return LineMetrics {
                    ascender: out.ascender,
                    descender: out.descender,
                };
            }
        }
        LineMetrics::default()
    }
}

// ============================================================================
// 画布能力注入
// ============================================================================

pub type NMFillQuadFn =
    extern "C" fn(context: *mut c_void, x: f32, y: f32, width: f32, height: f32, color: NMColor);

pub type NMBlitGlyphFn = extern "C" fn(
    context: *mut c_void,
    x: f32,
    y: f32,
    width: u16,
    height: u16,
    row_bytes: usize,
    pixels: *const u8,
    color: NMColor,
);

/// 宿主每帧提供的绘制目标
#[repr(C)]
#[derive(Clone, Copy)]
pub struct NMCanvas {
    pub context: *mut c_void,
    pub fill_quad: Option<NMFillQuadFn>,
    pub blit_glyph: Option<NMBlitGlyphFn>,
}

struct CallbackCanvas {
    canvas: NMCanvas,
}

impl FrameCanvas for CallbackCanvas {
    fn fill_quad(&mut self, rect: Rect, color: Color) {
        if let Some(f) = self.canvas.fill_quad {
            f(
                self.canvas.context,
                rect.x,
                rect.y,
                rect.width,
                rect.height,
                color.into(),
            );
        }
    }

    fn blit_glyph(&mut self, x: f32, y: f32, bitmap: &GlyphBitmap, color: Color) {
        if let Some(f) = self.canvas.blit_glyph {
            f(
                self.canvas.context,
                x,
                y,
                bitmap.width,
                bitmap.height,
                bitmap.row_bytes,
                bitmap.data.as_ptr(),
                color.into(),
            );
        }
    }
}

// ============================================================================
// 生命周期管理
// ============================================================================

/// 初始化参数（0 值字段取内置默认）
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct NMOverlayInit {
    pub screen_width: f32,
    pub screen_height: f32,
    pub text_pixel_size: u16,
    pub glyph_pool_bytes: usize,
}

/// 不透明句柄（宿主不可见内部结构）
#[repr(C)]
pub struct OverlayAppHandle {
    _private: [u8; 0],
}

fn app_ref(handle: *mut OverlayAppHandle) -> Option<&'static OverlayApp> {
    if handle.is_null() {
        None
    } else {
        Some(unsafe { &*(handle as *const OverlayApp) })
    }
}

/// 创建悬浮层上下文
///
/// 失败返回 NULL 并记日志；宿主应视为致命错误
/// （悬浮层无法接入渲染管线后没有安全的降级模式）。
#[no_mangle]
pub extern "C" fn nm_overlay_create(
    init: NMOverlayInit,
    rasterizer: NMRasterizer,
) -> *mut OverlayAppHandle {
    catch_panic!(ptr::null_mut(), {
        let Some(rasterize) = rasterizer.rasterize else {
            crate::nm_log_error!("[notify-overlay FFI] create: rasterize callback is required");
            return ptr::null_mut();
        };

        let defaults = OverlayConfig::default();
        let config = OverlayConfig {
            screen_width: if init.screen_width > 0.0 {
                init.screen_width
            } else {
                defaults.screen_width
            },
            screen_height: if init.screen_height > 0.0 {
                init.screen_height
            } else {
                defaults.screen_height
            },
            text_pixel_size: if init.text_pixel_size > 0 {
                init.text_pixel_size
            } else {
                defaults.text_pixel_size
            },
            glyph_pool_bytes: if init.glyph_pool_bytes > 0 {
                init.glyph_pool_bytes
            } else {
                defaults.glyph_pool_bytes
            },
            ..defaults
        };

        let callback_rasterizer = CallbackRasterizer {
            context: SendPtr(rasterizer.context),
            rasterize,
            line_metrics: rasterizer.line_metrics,
        };

        match OverlayApp::new(config, Box::new(callback_rasterizer)) {
            Ok(app) => Box::into_raw(Box::new(app)) as *mut OverlayAppHandle,
            Err(e) => {
                crate::nm_log_error!("[notify-overlay FFI] create failed: {}", e);
                ptr::null_mut()
            }
        }
    })
}

/// 销毁上下文（其后句柄不可再用）
#[no_mangle]
pub extern "C" fn nm_overlay_destroy(handle: *mut OverlayAppHandle) {
    if !handle.is_null() {
        unsafe {
            let _ = Box::from_raw(handle as *mut OverlayApp);
        }
    }
}

/// 宿主渲染管线就绪：创建合成器并迁移启动队列
#[no_mangle]
pub extern "C" fn nm_overlay_init(
    handle: *mut OverlayAppHandle,
    width: f32,
    height: f32,
) -> NotifyResult {
    catch_panic!(NotifyResult::InvalidArgument, {
        let Some(app) = app_ref(handle) else {
            return NotifyResult::InvalidArgument;
        };
        let (w, h) = if width > 0.0 && height > 0.0 {
            (width, height)
        } else {
            (app.config().screen_width, app.config().screen_height)
        };
        app.init_overlay(w, h);
        NotifyResult::Success
    })
}

/// 每帧一次：推进状态机 + 布局 + 回收（渲染线程）
#[no_mangle]
pub extern "C" fn nm_overlay_tick(handle: *mut OverlayAppHandle) {
    catch_panic!((), {
        if let Some(app) = app_ref(handle) {
            app.tick();
        }
    })
}

/// 每帧一次：绘制全部通知到宿主画布（tick 之后调用）
#[no_mangle]
pub extern "C" fn nm_overlay_draw(handle: *mut OverlayAppHandle, canvas: NMCanvas) {
    catch_panic!((), {
        if let Some(app) = app_ref(handle) {
            let mut callback_canvas = CallbackCanvas { canvas };
            app.draw_into(&mut callback_canvas);
        }
    })
}

/// 强制清空全部通知（突然拆除，不触发回调）
#[no_mangle]
pub extern "C" fn nm_overlay_clear(handle: *mut OverlayAppHandle) {
    catch_panic!((), {
        if let Some(app) = app_ref(handle) {
            app.clear_elements();
        }
    })
}

/// 宿主应用会话结束：清空合成器与字形数据，
/// 启动队列只保留 keepUntilShown 的条目
#[no_mangle]
pub extern "C" fn nm_overlay_session_end(handle: *mut OverlayAppHandle) {
    catch_panic!((), {
        if let Some(app) = app_ref(handle) {
            app.session_end();
        }
    })
}

// ============================================================================
// 查询
// ============================================================================

#[no_mangle]
pub extern "C" fn nm_is_overlay_ready(
    handle: *mut OverlayAppHandle,
    out_is_ready: *mut bool,
) -> NotifyResult {
    catch_panic!(NotifyResult::InvalidArgument, {
        let Some(app) = app_ref(handle) else {
            return NotifyResult::InvalidArgument;
        };
        if out_is_ready.is_null() {
            return NotifyResult::InvalidArgument;
        }
        unsafe { *out_is_ready = app.is_overlay_ready() };
        NotifyResult::Success
    })
}

#[no_mangle]
pub extern "C" fn nm_get_version(
    handle: *mut OverlayAppHandle,
    out_version: *mut u32,
) -> NotifyResult {
    catch_panic!(NotifyResult::InvalidArgument, {
        let Some(app) = app_ref(handle) else {
            return NotifyResult::InvalidArgument;
        };
        if out_version.is_null() {
            return NotifyResult::InvalidArgument;
        }
        unsafe { *out_version = app.api_version() };
        NotifyResult::Success
    })
}

/// 调试统计，JSON 字符串；用 `nm_free_string` 释放
#[no_mangle]
pub extern "C" fn nm_debug_stats_json(handle: *mut OverlayAppHandle) -> *mut c_char {
    catch_panic!(ptr::null_mut(), {
        let Some(app) = app_ref(handle) else {
            return ptr::null_mut();
        };
        let stats = app.debug_stats();
        match serde_json::to_string(&stats) {
            Ok(json) => match CString::new(json) {
                Ok(s) => s.into_raw(),
                Err(_) => ptr::null_mut(),
            },
            Err(e) => {
                crate::nm_log_error!("[notify-overlay FFI] stats serialization failed: {}", e);
                ptr::null_mut()
            }
        }
    })
}

/// 释放本库分配的字符串
#[no_mangle]
pub extern "C" fn nm_free_string(s: *mut c_char) {
    if !s.is_null() {
        unsafe {
            drop(CString::from_raw(s));
        }
    }
}

// ============================================================================
// 通知操作（生产者，任意线程）
// ============================================================================

/// 修订 1：悬浮层未就绪返回 OverlayNotReady
#[no_mangle]
pub extern "C" fn nm_add_static_notification(
    handle: *mut OverlayAppHandle,
    text: *const c_char,
    notification_type: u32,
    wait_seconds: f32,
    shake_seconds: f32,
    text_color: NMColor,
    background_color: NMColor,
    finish_callback: Option<NMFinishCallback>,
    callback_context: *mut c_void,
) -> NotifyResult {
    catch_panic!(NotifyResult::InvalidArgument, {
        static_request(
            handle,
            text,
            notification_type,
            wait_seconds,
            shake_seconds,
            text_color,
            background_color,
            finish_callback,
            callback_context,
            false,
        )
        .map(|(app, request)| to_result(app.add_static_notification(request)))
        .unwrap_or_else(|e| e.into())
    })
}

/// 修订 2：未就绪经启动队列缓冲
#[no_mangle]
pub extern "C" fn nm_add_static_notification_v2(
    handle: *mut OverlayAppHandle,
    text: *const c_char,
    notification_type: u32,
    wait_seconds: f32,
    shake_seconds: f32,
    text_color: NMColor,
    background_color: NMColor,
    finish_callback: Option<NMFinishCallback>,
    callback_context: *mut c_void,
    keep_until_shown: bool,
) -> NotifyResult {
    catch_panic!(NotifyResult::InvalidArgument, {
        static_request(
            handle,
            text,
            notification_type,
            wait_seconds,
            shake_seconds,
            text_color,
            background_color,
            finish_callback,
            callback_context,
            keep_until_shown,
        )
        .map(|(app, request)| to_result(app.add_static_notification_v2(request)))
        .unwrap_or_else(|e| e.into())
    })
}

#[allow(clippy::too_many_arguments)]
fn static_request(
    handle: *mut OverlayAppHandle,
    text: *const c_char,
    notification_type: u32,
    wait_seconds: f32,
    shake_seconds: f32,
    text_color: NMColor,
    background_color: NMColor,
    finish_callback: Option<NMFinishCallback>,
    callback_context: *mut c_void,
    keep_until_shown: bool,
) -> Result<(&'static OverlayApp, StaticNotification), OverlayError> {
    let app = app_ref(handle).ok_or(OverlayError::InvalidArgument)?;
    let kind = kind_from(notification_type)?;
    let text = text_from(text)?;
    Ok((
        app,
        StaticNotification {
            text,
            kind,
            wait_seconds,
            shake_seconds,
            text_color: text_color.into(),
            background_color: background_color.into(),
            finish_hook: wrap_finish_hook(finish_callback, callback_context),
            keep_until_shown,
        },
    ))
}

/// 修订 1：悬浮层未就绪返回 OverlayNotReady
#[no_mangle]
pub extern "C" fn nm_add_dynamic_notification(
    handle: *mut OverlayAppHandle,
    text: *const c_char,
    text_color: NMColor,
    background_color: NMColor,
    finish_callback: Option<NMFinishCallback>,
    callback_context: *mut c_void,
    out_handle: *mut u64,
) -> NotifyResult {
    nm_add_dynamic_notification_impl(
        handle,
        text,
        text_color,
        background_color,
        finish_callback,
        callback_context,
        false,
        out_handle,
        false,
    )
}

/// 修订 2：未就绪经启动队列缓冲
#[no_mangle]
pub extern "C" fn nm_add_dynamic_notification_v2(
    handle: *mut OverlayAppHandle,
    text: *const c_char,
    text_color: NMColor,
    background_color: NMColor,
    finish_callback: Option<NMFinishCallback>,
    callback_context: *mut c_void,
    keep_until_shown: bool,
    out_handle: *mut u64,
) -> NotifyResult {
    nm_add_dynamic_notification_impl(
        handle,
        text,
        text_color,
        background_color,
        finish_callback,
        callback_context,
        keep_until_shown,
        out_handle,
        true,
    )
}

#[allow(clippy::too_many_arguments)]
fn nm_add_dynamic_notification_impl(
    handle: *mut OverlayAppHandle,
    text: *const c_char,
    text_color: NMColor,
    background_color: NMColor,
    finish_callback: Option<NMFinishCallback>,
    callback_context: *mut c_void,
    keep_until_shown: bool,
    out_handle: *mut u64,
    buffered: bool,
) -> NotifyResult {
    catch_panic!(NotifyResult::InvalidArgument, {
        let Some(app) = app_ref(handle) else {
            return NotifyResult::InvalidArgument;
        };
        if out_handle.is_null() {
            return NotifyResult::InvalidArgument;
        }
        unsafe { *out_handle = 0 };

        let text = match text_from(text) {
            Ok(t) => t,
            Err(e) => return e.into(),
        };
        let request = DynamicNotification {
            text,
            text_color: text_color.into(),
            background_color: background_color.into(),
            finish_hook: wrap_finish_hook(finish_callback, callback_context),
            keep_until_shown,
        };

        let result = if buffered {
            app.add_dynamic_notification_v2(request)
        } else {
            app.add_dynamic_notification(request)
        };
        match result {
            Ok(notification_handle) => {
                unsafe { *out_handle = notification_handle.0 };
                NotifyResult::Success
            }
            Err(e) => e.into(),
        }
    })
}

#[no_mangle]
pub extern "C" fn nm_update_dynamic_notification_text(
    handle: *mut OverlayAppHandle,
    notification: u64,
    text: *const c_char,
) -> NotifyResult {
    catch_panic!(NotifyResult::InvalidArgument, {
        let Some(app) = app_ref(handle) else {
            return NotifyResult::InvalidArgument;
        };
        let text = match text_from(text) {
            Ok(t) => t,
            Err(e) => return e.into(),
        };
        to_result(app.update_text(NotificationHandle(notification), &text))
    })
}

#[no_mangle]
pub extern "C" fn nm_update_dynamic_notification_background_color(
    handle: *mut OverlayAppHandle,
    notification: u64,
    color: NMColor,
) -> NotifyResult {
    catch_panic!(NotifyResult::InvalidArgument, {
        let Some(app) = app_ref(handle) else {
            return NotifyResult::InvalidArgument;
        };
        to_result(app.update_background_color(NotificationHandle(notification), color.into()))
    })
}

#[no_mangle]
pub extern "C" fn nm_update_dynamic_notification_text_color(
    handle: *mut OverlayAppHandle,
    notification: u64,
    color: NMColor,
) -> NotifyResult {
    catch_panic!(NotifyResult::InvalidArgument, {
        let Some(app) = app_ref(handle) else {
            return NotifyResult::InvalidArgument;
        };
        to_result(app.update_text_color(NotificationHandle(notification), color.into()))
    })
}

#[no_mangle]
pub extern "C" fn nm_finish_dynamic_notification(
    handle: *mut OverlayAppHandle,
    notification: u64,
    finish_mode: u32,
    wait_seconds: f32,
    shake_seconds: f32,
) -> NotifyResult {
    catch_panic!(NotifyResult::InvalidArgument, {
        let Some(app) = app_ref(handle) else {
            return NotifyResult::InvalidArgument;
        };
        let mode = match finish_mode_from(finish_mode) {
            Ok(m) => m,
            Err(e) => return e.into(),
        };
        to_result(app.finish_notification(
            NotificationHandle(notification),
            mode,
            wait_seconds,
            shake_seconds,
        ))
    })
}
