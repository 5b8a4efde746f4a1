//! FontSystem - 字形光栅化包装 + 文本度量
//!
//! 职责：
//! - 持有宿主提供的光栅化能力（`GlyphRasterizer`）
//! - 所有字形经 `GlyphCache` 缓存（固定内存池，桶式清空回收）
//! - 文本宽高度量（带 LRU 度量缓存）
//! - 按基线逐字形落位绘制
//!
//! 光栅化器只需实现 rasterize(char, px) -> 位图 + 度量；
//! kerning 是可选能力，默认实现返回 0。

pub mod glyph_cache;

use std::sync::Arc;

use crate::domain::primitives::Color;
use crate::render::cache::measure_cache::MeasureCache;
use crate::render::canvas::FrameCanvas;
use crate::render::font::glyph_cache::{GlyphCache, GlyphCacheStats};

/// 光栅化结果：8-bit coverage 位图 + 排版度量
///
/// `pixels` 行主序、无行填充，长度 = width * height。
/// 坐标约定：`top` 为字形顶边在基线以上的高度（向上为正），
/// `bottom` = top - height（基线以下为负）。
#[derive(Debug, Clone)]
pub struct RasterizedGlyph {
    pub width: u16,
    pub height: u16,
    pub pixels: Vec<u8>,
    /// 笔位到字形左边缘的偏移
    pub left_bearing: f32,
    /// 字形顶边相对基线的高度（向上为正）
    pub top: f32,
    /// 水平步进
    pub advance: f32,
    /// 字体内部的字形索引（kerning 用）
    pub glyph_index: u32,
}

/// 行度量（每个像素尺寸一份，桶内缓存）
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LineMetrics {
    pub ascender: f32,
    pub descender: f32,
}

/// 字形光栅化能力（外部协作者）
///
/// 实现者把一个字符码变成像素位图；本 crate 不关心 shaping 细节。
pub trait GlyphRasterizer: Send {
    /// 光栅化失败 / 字体不含该字符时返回 None，调用方跳过该字符
    fn rasterize(&mut self, ch: char, pixel_size: u16) -> Option<RasterizedGlyph>;

    fn line_metrics(&mut self, pixel_size: u16) -> LineMetrics;

    /// 可选 kerning：前后字形索引之间的水平修正
    fn kerning(&mut self, _prev_glyph: u32, _next_glyph: u32, _pixel_size: u16) -> f32 {
        0.0
    }
}

/// 缓存里的字形位图（行填充到 4 字节）
#[derive(Debug)]
pub struct GlyphBitmap {
    pub width: u16,
    pub height: u16,
    pub row_bytes: usize,
    pub data: Vec<u8>,
}

/// 文本整体度量
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TextMetrics {
    pub width: f32,
    pub height: f32,
    /// 最高字形顶边（基线以上，向上为正）
    pub max: f32,
    /// 最低字形底边（基线以下为负）
    pub min: f32,
}

/// 字形系统：光栅化器 + 字形缓存 + 度量缓存
pub struct FontSystem {
    rasterizer: Box<dyn GlyphRasterizer>,
    cache: GlyphCache,
    measure_cache: MeasureCache,
}

impl FontSystem {
    pub fn new(rasterizer: Box<dyn GlyphRasterizer>, glyph_pool_bytes: usize) -> Self {
        Self {
            rasterizer,
            cache: GlyphCache::new(glyph_pool_bytes),
            measure_cache: MeasureCache::new(),
        }
    }

    /// 度量一段文本（单行）
    ///
    /// 结果进 LRU 缓存；字形本身经 GlyphCache，两次度量同一文本
    /// 返回完全一致的结果（光栅化幂等）。
    pub fn measure(&mut self, text: &str, pixel_size: u16) -> TextMetrics {
        if let Some(m) = self.measure_cache.get(text, pixel_size) {
            return m;
        }

        let mut width = 0.0f32;
        let mut max = f32::MIN;
        let mut min = f32::MAX;
        let mut prev: Option<u32> = None;

        for ch in text.chars() {
            match self
                .cache
                .get_or_insert(pixel_size, ch, self.rasterizer.as_mut())
            {
                Ok(Some(glyph)) => {
                    if let Some(p) = prev {
                        width += self
                            .rasterizer
                            .kerning(p, glyph.metrics.glyph_index, pixel_size);
                    }
                    width += glyph.metrics.advance;
                    max = max.max(glyph.metrics.top);
                    min = min.min(glyph.metrics.bottom);
                    prev = Some(glyph.metrics.glyph_index);
                }
                Ok(None) => {}
                Err(e) => {
                    crate::nm_log_warn!("[FontSystem] glyph U+{:04X} px {}: {}", ch as u32, pixel_size, e);
                }
            }
        }

        let metrics = if prev.is_some() {
            TextMetrics {
                width,
                height: max - min,
                max,
                min,
            }
        } else {
            TextMetrics::default()
        };
        self.measure_cache.put(text, pixel_size, metrics);
        metrics
    }

    /// 沿基线绘制一段文本
    pub fn draw_text(
        &mut self,
        canvas: &mut dyn FrameCanvas,
        x: f32,
        baseline_y: f32,
        text: &str,
        pixel_size: u16,
        color: Color,
    ) {
        let mut pen = x;
        let mut prev: Option<u32> = None;

        for ch in text.chars() {
            if let Ok(Some(glyph)) = self
                .cache
                .get_or_insert(pixel_size, ch, self.rasterizer.as_mut())
            {
                if let Some(p) = prev {
                    pen += self
                        .rasterizer
                        .kerning(p, glyph.metrics.glyph_index, pixel_size);
                }
                canvas.blit_glyph(
                    pen + glyph.metrics.left_bearing,
                    baseline_y - glyph.metrics.top,
                    &glyph.bitmap,
                    color,
                );
                pen += glyph.metrics.advance;
                prev = Some(glyph.metrics.glyph_index);
            }
        }
    }

    pub fn line_metrics(&mut self, pixel_size: u16) -> LineMetrics {
        self.cache
            .line_metrics(pixel_size, self.rasterizer.as_mut())
    }

    /// 会话收尾：清空全部字形数据（原池可复用）
    pub fn unload(&mut self) {
        self.cache.clear();
    }

    pub fn cache_stats(&self) -> GlyphCacheStats {
        self.cache.stats()
    }
}

/// 缓存字形的共享引用（位图用 Arc，绘制时零拷贝）
#[derive(Debug, Clone)]
pub struct GlyphRef {
    pub metrics: GlyphMetrics,
    pub bitmap: Arc<GlyphBitmap>,
}

/// 字形排版度量（缓存键命中后直接复制返回）
#[derive(Debug, Clone, Copy)]
pub struct GlyphMetrics {
    pub advance: f32,
    pub left_bearing: f32,
    pub top: f32,
    pub bottom: f32,
    pub glyph_index: u32,
}
