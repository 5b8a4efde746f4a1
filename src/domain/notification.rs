//! Notification - 通知聚合根
//!
//! 职责：
//! - 一条通知的全部状态：文本/颜色/计时/回调/状态机
//! - 状态机只由合成器 tick 推进；生产者通过 update* 发出"请求"
//! - finish 回调整个生命周期至多触发一次
//!
//! 状态机：
//!
//! ```text
//! Info ────→ Wait ──(等待超时)──→ RequestedFadeOutAndExit ──→ Effect(滑出) ──→ RequestedExit
//! Error ───→ RequestedShake ──→ Effect(摇晃, 墙钟) ──→ Wait
//! InProgress → Nothing（等待 finish 请求）
//! ```
//!
//! 计时重整（waitForReset）：状态变更不立即重置计时器，而是打标记、
//! 由下一次 tick 重新采样起点并跳过该帧的超时判定，避免生产者更新与
//! tick 交错时的竞态。这个"跳一帧"行为是对外契约的一部分。

use std::time::Instant;

use crate::domain::effect::{Effect, EffectCompleted, VisualState};
use crate::domain::handle::NotificationHandle;
use crate::domain::primitives::{Color, Point, Size};
use crate::render::canvas::FrameCanvas;
use crate::render::font::FontSystem;
use crate::render::text::TextBlock;

/// 通知对外状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationStatus {
    Info,
    Error,
    InProgress,
}

/// 静态通知的类型参数（API 表面只接受这两种）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    Info,
    Error,
}

impl From<NotificationKind> for NotificationStatus {
    fn from(kind: NotificationKind) -> Self {
        match kind {
            NotificationKind::Info => NotificationStatus::Info,
            NotificationKind::Error => NotificationStatus::Error,
        }
    }
}

/// 动态通知的结束方式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinishMode {
    Finish,
    FinishWithShake,
}

/// 内部状态机状态（只在 tick 里推进）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InternalState {
    Nothing,
    Wait,
    RequestedShake,
    Effect,
    RequestedFadeOutAndExit,
    RequestedExit,
}

/// finish / removal 回调
///
/// FFI 层把 C 函数指针 + context 包装成这个类型。
pub type FinishHook = Box<dyn FnMut(NotificationHandle) + Send>;
pub type RemovalHook = Box<dyn FnMut(NotificationHandle) + Send>;

/// 创建参数
pub struct NotificationSpec {
    pub text: String,
    pub status: NotificationStatus,
    pub wait_seconds: f32,
    pub shake_seconds: f32,
    pub text_color: Color,
    pub background_color: Color,
    pub finish_hook: Option<FinishHook>,
    pub keep_until_shown: bool,
}

pub struct Notification {
    handle: NotificationHandle,
    status: NotificationStatus,
    internal: InternalState,

    text: TextBlock,
    background_color: Color,
    text_pixel_size: u16,

    wait_seconds: f32,
    shake_seconds: f32,

    finish_hook: Option<FinishHook>,
    finish_called: bool,
    removal_hook: Option<RemovalHook>,
    removal_called: bool,

    keep_until_shown: bool,
    dynamic: bool,

    /// 下一次 tick 重新采样计时起点（见模块注释）
    wait_for_reset: bool,
    timer_start: Instant,

    position: Point,
    position_set: bool,

    visual: VisualState,
    effect: Option<Effect>,
}

impl Notification {
    pub fn new(spec: NotificationSpec, now: Instant, text_pixel_size: u16) -> Self {
        let mut n = Self {
            handle: NotificationHandle::INVALID,
            status: spec.status,
            internal: InternalState::Nothing,
            text: TextBlock::new(spec.text, spec.text_color, text_pixel_size),
            background_color: spec.background_color,
            text_pixel_size,
            wait_seconds: spec.wait_seconds,
            shake_seconds: spec.shake_seconds,
            finish_hook: spec.finish_hook,
            finish_called: false,
            removal_hook: None,
            removal_called: false,
            keep_until_shown: spec.keep_until_shown,
            dynamic: false,
            wait_for_reset: false,
            timer_start: now,
            position: Point::default(),
            position_set: false,
            visual: VisualState::hidden(),
            effect: None,
        };
        n.update_status(spec.status);
        n.wait_for_reset = true;
        n
    }

    // ===== 身份 =====

    pub fn handle(&self) -> NotificationHandle {
        self.handle
    }

    pub(crate) fn assign_handle(&mut self, handle: NotificationHandle) {
        debug_assert!(!self.handle.is_valid());
        self.handle = handle;
    }

    pub fn status(&self) -> NotificationStatus {
        self.status
    }

    pub fn internal_state(&self) -> InternalState {
        self.internal
    }

    pub fn keep_until_shown(&self) -> bool {
        self.keep_until_shown
    }

    pub fn is_dynamic(&self) -> bool {
        self.dynamic
    }

    pub(crate) fn mark_dynamic(&mut self, removal_hook: Option<RemovalHook>) {
        self.dynamic = true;
        self.removal_hook = removal_hook;
    }

    // ===== 生产者侧更新 =====

    pub fn update_text(&mut self, text: &str) {
        self.text.set_text(text);
    }

    pub fn update_text_color(&mut self, color: Color) {
        self.text.set_color(color);
    }

    pub fn update_background_color(&mut self, color: Color) {
        self.background_color = color;
    }

    pub fn update_wait_duration(&mut self, seconds: f32) {
        self.wait_seconds = seconds;
    }

    pub fn update_shake_duration(&mut self, seconds: f32) {
        self.shake_seconds = seconds;
    }

    /// 状态变更：映射到内部状态并重整计时器
    pub fn update_status(&mut self, status: NotificationStatus) {
        self.internal = match status {
            NotificationStatus::Info => InternalState::Wait,
            NotificationStatus::Error => InternalState::RequestedShake,
            NotificationStatus::InProgress => InternalState::Nothing,
        };
        self.wait_for_reset = true;
        self.status = status;
    }

    // ===== tick 侧状态机（合成器锁内调用） =====

    /// 计时推进：重整标记消耗一帧，Wait 超时转入退出请求
    pub(crate) fn process(&mut self, now: Instant) {
        if self.wait_for_reset {
            self.timer_start = now;
            self.wait_for_reset = false;
            return;
        }

        if self.internal == InternalState::Wait
            && now.duration_since(self.timer_start).as_secs_f32() >= self.wait_seconds
        {
            self.internal = InternalState::RequestedFadeOutAndExit;
        }
    }

    /// 推进进行中的特效并消解完成转移
    pub(crate) fn advance_effect(&mut self, now: Instant, padding: f32) {
        let Some(fx) = self.effect else { return };
        let exit_distance = self.position.x + self.size(padding).width;
        match fx.advance(now, &mut self.visual, exit_distance) {
            Some(EffectCompleted::SlideOutDone) => {
                self.effect = None;
                self.internal = InternalState::RequestedExit;
            }
            Some(EffectCompleted::ShakeDone) => {
                self.effect = None;
                self.internal = InternalState::Wait;
            }
            None => {
                if fx.is_finished(&self.visual) {
                    self.effect = None;
                }
            }
        }
    }

    /// 任何新特效先清掉旧特效，避免叠加
    fn clear_effect(&mut self) {
        self.effect = None;
        self.visual.offset_x = 0.0;
    }

    pub(crate) fn start_fade_in(&mut self, step: u8) {
        self.clear_effect();
        self.effect = Some(Effect::FadeIn { step });
    }

    pub(crate) fn start_exit_slide(&mut self, speed: f32, fade_step: u8) {
        self.clear_effect();
        self.effect = Some(Effect::SlideOut { speed, fade_step });
        self.internal = InternalState::Effect;
    }

    pub(crate) fn start_shake(&mut self, now: Instant) {
        self.clear_effect();
        let duration = std::time::Duration::from_secs_f32(self.shake_seconds.max(0.0));
        self.effect = Some(Effect::shake(now, duration));
        self.internal = InternalState::Effect;
    }

    // ===== 回调 =====

    /// 取走 finish 回调（至多成功一次）
    ///
    /// 回调不在任何锁内触发：tick 在锁内取走，出锁后再调用。
    pub(crate) fn take_finish_hook(&mut self) -> Option<FinishHook> {
        if self.finish_called {
            return None;
        }
        self.finish_called = true;
        self.finish_hook.take()
    }

    /// removal 回调，恰好在离开合成器集合时一次
    pub(crate) fn fire_removal(&mut self) {
        if self.removal_called {
            return;
        }
        self.removal_called = true;
        if let Some(mut hook) = self.removal_hook.take() {
            hook(self.handle);
        }
    }

    #[cfg(test)]
    pub(crate) fn finish_was_called(&self) -> bool {
        self.finish_called
    }

    // ===== 布局 / 绘制 =====

    pub(crate) fn set_layout_position(&mut self, x: f32, y: f32) {
        self.position = Point::new(x, y);
        self.position_set = true;
    }

    pub fn position(&self) -> Point {
        self.position
    }

    pub fn position_set(&self) -> bool {
        self.position_set
    }

    pub fn visual(&self) -> VisualState {
        self.visual
    }

    /// 控件尺寸 = 文本度量 + 内边距（文本未测量前为内边距本身）
    pub fn size(&self, padding: f32) -> Size {
        let m = self.text.metrics();
        Size::new(m.width + padding, m.height + padding)
    }

    /// 绘制一条通知
    ///
    /// 首次布局前（position 未设置）以及内容为空时不绘制，
    /// 防止在默认位置画出残影。
    pub(crate) fn draw(
        &mut self,
        canvas: &mut dyn FrameCanvas,
        font: &mut FontSystem,
        padding: f32,
    ) {
        if !self.position_set {
            return;
        }
        let metrics = self.text.ensure_measured(font);
        let width = metrics.width + padding;
        let height = metrics.height + padding;
        if width <= padding && height <= padding {
            return;
        }

        let x = self.position.x + self.visual.offset_x;
        canvas.fill_quad(
            crate::domain::primitives::Rect::new(x, self.position.y, width, height),
            self.background_color.scaled_alpha(self.visual.alpha),
        );
        self.text.draw(
            canvas,
            font,
            Point::new(x + padding / 2.0, self.position.y + padding / 2.0),
            self.visual.alpha,
        );
    }

    pub fn text(&self) -> &str {
        self.text.text()
    }

    pub fn text_pixel_size(&self) -> u16 {
        self.text_pixel_size
    }

    pub fn background_color(&self) -> Color {
        self.background_color
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn spec(status: NotificationStatus, wait: f32, shake: f32) -> NotificationSpec {
        NotificationSpec {
            text: "test".into(),
            status,
            wait_seconds: wait,
            shake_seconds: shake,
            text_color: Color::WHITE,
            background_color: Color::DEFAULT_BACKGROUND,
            finish_hook: None,
            keep_until_shown: false,
        }
    }

    #[test]
    fn info_starts_in_wait_with_reset_pending() {
        let t0 = Instant::now();
        let n = Notification::new(spec(NotificationStatus::Info, 2.0, 0.5), t0, 20);
        assert_eq!(n.internal_state(), InternalState::Wait);
        assert_eq!(n.status(), NotificationStatus::Info);
    }

    #[test]
    fn in_progress_stays_in_nothing() {
        let t0 = Instant::now();
        let mut n = Notification::new(spec(NotificationStatus::InProgress, 0.0, 0.0), t0, 20);
        n.process(t0); // 消耗重整帧
        for i in 1..100 {
            n.process(t0 + Duration::from_secs(i));
        }
        assert_eq!(n.internal_state(), InternalState::Nothing);
    }

    /// 重整标记消耗一帧：紧随状态变更的那次 tick 不做超时判定
    #[test]
    fn wait_reset_skips_one_tick() {
        let t0 = Instant::now();
        let mut n = Notification::new(spec(NotificationStatus::Info, 2.0, 0.5), t0, 20);

        // 第一帧只重置计时器，即使已经"超时"也不转移
        n.process(t0 + Duration::from_secs(10));
        assert_eq!(n.internal_state(), InternalState::Wait);

        // 从重置点重新计时
        n.process(t0 + Duration::from_secs(11));
        assert_eq!(n.internal_state(), InternalState::Wait);
        n.process(t0 + Duration::from_secs(13));
        assert_eq!(n.internal_state(), InternalState::RequestedFadeOutAndExit);
    }

    #[test]
    fn wait_times_out_into_fade_out_request() {
        let t0 = Instant::now();
        let mut n = Notification::new(spec(NotificationStatus::Info, 2.0, 0.5), t0, 20);
        n.process(t0);
        n.process(t0 + Duration::from_millis(1999));
        assert_eq!(n.internal_state(), InternalState::Wait);
        n.process(t0 + Duration::from_millis(2000));
        assert_eq!(n.internal_state(), InternalState::RequestedFadeOutAndExit);
    }

    #[test]
    fn status_change_rearms_timer_and_state() {
        let t0 = Instant::now();
        let mut n = Notification::new(spec(NotificationStatus::InProgress, 0.0, 0.0), t0, 20);
        n.process(t0);

        n.update_status(NotificationStatus::Error);
        assert_eq!(n.internal_state(), InternalState::RequestedShake);

        // 下一帧消耗重整标记
        n.process(t0 + Duration::from_secs(1));
        assert_eq!(n.internal_state(), InternalState::RequestedShake);
    }

    #[test]
    fn finish_hook_fires_at_most_once() {
        use std::sync::atomic::{AtomicUsize, Ordering};
        use std::sync::Arc;

        let count = Arc::new(AtomicUsize::new(0));
        let count2 = Arc::clone(&count);
        let mut s = spec(NotificationStatus::Info, 2.0, 0.5);
        s.finish_hook = Some(Box::new(move |_| {
            count2.fetch_add(1, Ordering::SeqCst);
        }));

        let mut n = Notification::new(s, Instant::now(), 20);
        for _ in 0..3 {
            if let Some(mut hook) = n.take_finish_hook() {
                hook(n.handle());
            }
        }
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert!(n.finish_was_called());
    }

    #[test]
    fn shake_effect_round_trips_to_wait() {
        let t0 = Instant::now();
        let mut n = Notification::new(spec(NotificationStatus::Error, 2.0, 0.5), t0, 20);
        assert_eq!(n.internal_state(), InternalState::RequestedShake);

        n.start_shake(t0);
        assert_eq!(n.internal_state(), InternalState::Effect);

        n.advance_effect(t0 + Duration::from_millis(100), 25.0);
        assert_eq!(n.internal_state(), InternalState::Effect);

        n.advance_effect(t0 + Duration::from_millis(500), 25.0);
        assert_eq!(n.internal_state(), InternalState::Wait);
    }

    #[test]
    fn exit_slide_reaches_requested_exit() {
        let t0 = Instant::now();
        let mut n = Notification::new(spec(NotificationStatus::Info, 0.0, 0.0), t0, 20);
        n.set_layout_position(25.0, 25.0);
        n.start_exit_slide(30.0, 55);
        assert_eq!(n.internal_state(), InternalState::Effect);

        for _ in 0..64 {
            n.advance_effect(t0, 25.0);
            if n.internal_state() == InternalState::RequestedExit {
                break;
            }
        }
        assert_eq!(n.internal_state(), InternalState::RequestedExit);
    }

    #[test]
    fn new_effect_clears_previous_offset() {
        let t0 = Instant::now();
        let mut n = Notification::new(spec(NotificationStatus::Error, 2.0, 10.0), t0, 20);
        n.start_shake(t0);
        n.advance_effect(t0 + Duration::from_millis(31), 25.0);
        assert!(n.visual().offset_x.abs() > 0.01);

        // 改为滑出：旧的摇晃偏移先被清零
        n.start_exit_slide(30.0, 55);
        // SlideOut 第一帧从 0 开始递减
        n.advance_effect(t0, 25.0);
        assert_eq!(n.visual().offset_x, -30.0);
    }
}
