//! TextBlock - 通知正文控件
//!
//! 尺寸度量懒更新：生产者线程改文本只打脏标记，
//! 真正的测量发生在渲染线程的下一次绘制里。

use crate::domain::primitives::{Color, Point};
use crate::render::canvas::FrameCanvas;
use crate::render::font::{FontSystem, TextMetrics};

pub struct TextBlock {
    text: String,
    color: Color,
    pixel_size: u16,
    dirty: bool,
    metrics: TextMetrics,
}

impl TextBlock {
    pub fn new(text: impl Into<String>, color: Color, pixel_size: u16) -> Self {
        let text = text.into();
        let dirty = !text.is_empty();
        Self {
            text,
            color,
            pixel_size,
            dirty,
            metrics: TextMetrics::default(),
        }
    }

    /// 换文本并打脏标记，度量推迟到下次绘制
    pub fn set_text(&mut self, text: &str) {
        self.text.clear();
        self.text.push_str(text);
        self.dirty = true;
    }

    pub fn set_color(&mut self, color: Color) {
        self.color = color;
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// 最近一次测量结果（可能为零值，直到首次绘制）
    pub fn metrics(&self) -> TextMetrics {
        self.metrics
    }

    /// 脏则重新测量（渲染线程调用）
    pub fn ensure_measured(&mut self, font: &mut FontSystem) -> TextMetrics {
        if self.dirty {
            self.metrics = font.measure(&self.text, self.pixel_size);
            self.dirty = false;
        }
        self.metrics
    }

    /// 以 `origin` 为文本框左上角绘制
    pub fn draw(
        &self,
        canvas: &mut dyn FrameCanvas,
        font: &mut FontSystem,
        origin: Point,
        alpha: u8,
    ) {
        if self.text.is_empty() {
            return;
        }
        let baseline_y = origin.y + self.metrics.max;
        font.draw_text(
            canvas,
            origin.x,
            baseline_y,
            &self.text,
            self.pixel_size,
            self.color.scaled_alpha(alpha),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{test_font_system, RecordingCanvas};

    #[test]
    fn measurement_is_lazy_and_cached() {
        let mut font = test_font_system();
        let mut block = TextBlock::new("Hi", Color::WHITE, 20);

        assert_eq!(block.metrics(), TextMetrics::default());
        let m = block.ensure_measured(&mut font);
        assert!(m.width > 0.0);
        assert!(m.height > 0.0);

        // 不打脏标记就不再测量
        assert_eq!(block.ensure_measured(&mut font), m);

        block.set_text("Hello there");
        let m2 = block.ensure_measured(&mut font);
        assert!(m2.width > m.width);
    }

    #[test]
    fn draw_emits_one_blit_per_glyph() {
        let mut font = test_font_system();
        let mut canvas = RecordingCanvas::default();
        let mut block = TextBlock::new("abc", Color::WHITE, 20);
        block.ensure_measured(&mut font);
        block.draw(&mut canvas, &mut font, Point::new(10.0, 10.0), 255);
        assert_eq!(canvas.glyphs.len(), 3);
    }

    #[test]
    fn draw_applies_effect_alpha() {
        let mut font = test_font_system();
        let mut canvas = RecordingCanvas::default();
        let mut block = TextBlock::new("a", Color::new(255, 255, 255, 255), 20);
        block.ensure_measured(&mut font);
        block.draw(&mut canvas, &mut font, Point::new(0.0, 0.0), 128);
        assert_eq!(canvas.glyphs[0].2.a, 128);
    }
}
