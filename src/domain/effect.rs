//! 视觉特效描述符
//!
//! 特效不注册任何回调：每个通知至多持有一个进行中的描述符，
//! 合成器 tick 里同步推进并在完成时就地消解（见 compositor）。
//!
//! 时间模型：
//! - 淡入/滑出按帧步进（与原生渲染节奏一致）
//! - 摇晃按墙钟计时，丢帧不会延长摇晃时长

use std::time::Instant;

/// 摇晃频率（Hz）
const SHAKE_FREQUENCY_HZ: f32 = 8.0;

/// 摇晃水平振幅（逻辑像素）
const SHAKE_AMPLITUDE: f32 = 8.0;

/// 通知的视觉呈现状态，由特效推进修改
#[derive(Debug, Clone, Copy)]
pub struct VisualState {
    /// 整体透明度（0 = 不可见，255 = 完全可见）
    pub alpha: u8,
    /// 水平偏移（摇晃 / 滑出时非零）
    pub offset_x: f32,
}

impl VisualState {
    pub fn hidden() -> Self {
        Self {
            alpha: 0,
            offset_x: 0.0,
        }
    }
}

/// 特效完成后的状态机去向
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EffectCompleted {
    /// 滑出完成，通知应进入 RequestedExit
    SlideOutDone,
    /// 摇晃完成，通知应回到 Wait 继续倒计时
    ShakeDone,
}

/// 进行中的特效描述符
#[derive(Debug, Clone, Copy)]
pub enum Effect {
    /// 入场淡入：每帧 alpha + step，到 255 为止
    FadeIn { step: u8 },
    /// 离场滑出：每帧向左 speed 像素并按 fade_step 淡出，
    /// 完全移出左边缘后完成
    SlideOut { speed: f32, fade_step: u8 },
    /// 摇晃：固定墙钟时长的水平振荡
    Shake {
        started_at: Instant,
        until: Instant,
    },
}

impl Effect {
    pub fn shake(now: Instant, duration: std::time::Duration) -> Self {
        Effect::Shake {
            started_at: now,
            until: now + duration,
        }
    }

    /// 推进一帧
    ///
    /// `exit_distance`：滑出特效需要越过的总距离（通知左缘到屏幕左缘 + 自身宽度）。
    /// 返回 Some(..) 表示特效完成且需要状态机转移；淡入完成只返回 None
    /// 并由 `is_finished` 判定清理。
    pub fn advance(&self, now: Instant, visual: &mut VisualState, exit_distance: f32) -> Option<EffectCompleted> {
        match *self {
            Effect::FadeIn { step } => {
                visual.alpha = visual.alpha.saturating_add(step);
                None
            }
            Effect::SlideOut { speed, fade_step } => {
                visual.offset_x -= speed;
                visual.alpha = visual.alpha.saturating_sub(fade_step);
                if visual.offset_x <= -exit_distance {
                    Some(EffectCompleted::SlideOutDone)
                } else {
                    None
                }
            }
            Effect::Shake { started_at, until } => {
                if now >= until {
                    visual.offset_x = 0.0;
                    Some(EffectCompleted::ShakeDone)
                } else {
                    let elapsed = now.duration_since(started_at).as_secs_f32();
                    visual.offset_x = SHAKE_AMPLITUDE
                        * (elapsed * SHAKE_FREQUENCY_HZ * std::f32::consts::TAU).sin();
                    None
                }
            }
        }
    }

    /// 淡入是否已达目标（完成后描述符可丢弃）
    pub fn is_finished(&self, visual: &VisualState) -> bool {
        matches!(self, Effect::FadeIn { .. }) && visual.alpha == u8::MAX
    }
}
