//! 测试协作者：确定性光栅化器 + 录制画布
//!
//! 真实的 shaping/光栅化与呈现是外部能力，测试里用确定性替身。

use crate::app::{OverlayApp, OverlayConfig};
use crate::domain::primitives::{Color, Rect};
use crate::render::canvas::FrameCanvas;
use crate::render::font::{FontSystem, GlyphBitmap, GlyphRasterizer, LineMetrics, RasterizedGlyph};

/// 确定性光栅化器：每个字形是一个实心方块
///
/// px → 位图 (px/2) × px，advance = px/2 + 2，基线上方 3/4 px。
/// 控制字符视为字体缺字（返回 None）。
pub struct BoxRasterizer {
    /// 实际光栅化次数（缓存命中时不增长）
    pub calls: usize,
}

impl BoxRasterizer {
    pub fn new() -> Self {
        Self { calls: 0 }
    }
}

impl GlyphRasterizer for BoxRasterizer {
    fn rasterize(&mut self, ch: char, pixel_size: u16) -> Option<RasterizedGlyph> {
        if (ch as u32) < 0x20 {
            return None;
        }
        self.calls += 1;
        let width = (pixel_size / 2).max(1);
        let height = pixel_size.max(1);
        Some(RasterizedGlyph {
            width,
            height,
            pixels: vec![0xFF; width as usize * height as usize],
            left_bearing: 1.0,
            top: pixel_size as f32 * 0.75,
            advance: width as f32 + 2.0,
            glyph_index: ch as u32,
        })
    }

    fn line_metrics(&mut self, pixel_size: u16) -> LineMetrics {
        LineMetrics {
            ascender: pixel_size as f32 * 0.75,
            descender: -(pixel_size as f32) * 0.25,
        }
    }
}

/// 录制画布：收集绘制命令供断言
#[derive(Default)]
pub struct RecordingCanvas {
    pub quads: Vec<(Rect, Color)>,
    pub glyphs: Vec<(f32, f32, Color)>,
}

impl FrameCanvas for RecordingCanvas {
    fn fill_quad(&mut self, rect: Rect, color: Color) {
        self.quads.push((rect, color));
    }

    fn blit_glyph(&mut self, x: f32, y: f32, _bitmap: &GlyphBitmap, color: Color) {
        self.glyphs.push((x, y, color));
    }
}

pub fn test_font_system() -> FontSystem {
    FontSystem::new(Box::new(BoxRasterizer::new()), 1024 * 1024)
}

pub fn test_app() -> OverlayApp {
    OverlayApp::new(OverlayConfig::default(), Box::new(BoxRasterizer::new()))
        .expect("test app construction")
}

/// 已就绪的 app（合成器已创建）
pub fn ready_app() -> OverlayApp {
    let app = test_app();
    app.init_overlay(1280.0, 720.0);
    app
}
