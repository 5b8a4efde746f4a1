//! 悬浮层配置
//!
//! 配置文件的加载/解析由宿主负责，这里只定义配置面；
//! 所有字段有内置默认值，FFI 初始化参数覆盖其中的原始类型字段。

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OverlayConfig {
    /// 悬浮层逻辑尺寸
    pub screen_width: f32,
    pub screen_height: f32,

    /// 通知堆叠起点（左上角）
    pub stack_origin_x: f32,
    pub stack_origin_y: f32,

    /// 相邻通知之间的间距
    pub stack_gap: f32,

    /// 控件内边距：宽高各为文本尺寸 + padding
    pub widget_padding: f32,

    /// 通知正文像素尺寸
    pub text_pixel_size: u16,

    /// 入场淡入每帧步进（0-255）
    pub fade_in_step: u8,

    /// 离场滑出速度（逻辑像素/帧）
    pub slide_out_speed: f32,

    /// 字形池预算（字节），所有像素尺寸的桶共享
    pub glyph_pool_bytes: usize,

    /// 静态通知缺省等待/摇晃时长（秒）
    pub default_wait_seconds: f32,
    pub default_shake_seconds: f32,
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            screen_width: 1280.0,
            screen_height: 720.0,
            stack_origin_x: 25.0,
            stack_origin_y: 25.0,
            stack_gap: 10.0,
            widget_padding: 25.0,
            text_pixel_size: 20,
            fade_in_step: 55,
            slide_out_speed: 30.0,
            glyph_pool_bytes: 1024 * 1024,
            default_wait_seconds: 2.0,
            default_shake_seconds: 0.5,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_round_trips_through_json() {
        let config = OverlayConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        let back: OverlayConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back.text_pixel_size, config.text_pixel_size);
        assert_eq!(back.glyph_pool_bytes, config.glyph_pool_bytes);
    }

    #[test]
    fn partial_json_fills_defaults() {
        let config: OverlayConfig = serde_json::from_str(r#"{"text_pixel_size": 32}"#).unwrap();
        assert_eq!(config.text_pixel_size, 32);
        assert_eq!(config.stack_gap, 10.0);
    }
}
