//! GlyphCache - 有界字形缓存
//!
//! 每个唯一 (像素尺寸, 字符) 只光栅化一次。
//! 所有桶共享一个固定大小的后备内存池：
//! - 桶 = 一个像素尺寸下 字符 → 字形 的映射，条目数不限
//! - 新字形申请失败时，整体清空该像素尺寸的桶后重试一次
//! - 回收以桶为单位，不做 LRU，也绝不留下半清空的桶

use std::sync::Arc;

use rustc_hash::FxHashMap;
use thiserror::Error;

use crate::render::font::{GlyphBitmap, GlyphMetrics, GlyphRasterizer, GlyphRef, LineMetrics};

#[derive(Debug, Error)]
pub enum GlyphCacheError {
    /// 清桶重试后内存池仍不足
    #[error("glyph pool exhausted ({requested} bytes requested, {capacity} capacity)")]
    PoolExhausted { requested: usize, capacity: usize },
}

/// 缓存统计（调试接口用）
#[derive(Debug, Clone, Copy, serde::Serialize)]
pub struct GlyphCacheStats {
    pub buckets: usize,
    pub glyphs: usize,
    pub pool_capacity: usize,
    pub pool_used: usize,
}

// ============================================================================
// GlyphPool - 固定大小的后备内存池
// ============================================================================

/// 后备内存池（按字节记账）
///
/// 池子本身不持有内存，只约束所有桶的位图总量；
/// 位图数据在 `GlyphBitmap` 里，释放时归还字节数。
struct GlyphPool {
    capacity: usize,
    used: usize,
}

impl GlyphPool {
    fn new(capacity: usize) -> Self {
        Self { capacity, used: 0 }
    }

    fn try_alloc(&mut self, bytes: usize) -> bool {
        if self.used + bytes > self.capacity {
            return false;
        }
        self.used += bytes;
        true
    }

    fn free(&mut self, bytes: usize) {
        debug_assert!(self.used >= bytes);
        self.used = self.used.saturating_sub(bytes);
    }
}

// ============================================================================
// Bucket - 单个像素尺寸的字形桶
// ============================================================================

struct Bucket {
    glyphs: FxHashMap<char, CachedGlyph>,
    /// 该尺寸的行度量（首次触桶时缓存）
    line: Option<LineMetrics>,
    /// 本桶占用的池字节数
    bytes: usize,
}

impl Bucket {
    fn new() -> Self {
        Self {
            glyphs: FxHashMap::default(),
            line: None,
            bytes: 0,
        }
    }
}

struct CachedGlyph {
    metrics: GlyphMetrics,
    bitmap: Arc<GlyphBitmap>,
    bytes: usize,
}

// ============================================================================
// GlyphCache
// ============================================================================

pub struct GlyphCache {
    pool: GlyphPool,
    buckets: FxHashMap<u16, Bucket>,
}

impl GlyphCache {
    pub fn new(pool_bytes: usize) -> Self {
        Self {
            pool: GlyphPool::new(pool_bytes),
            buckets: FxHashMap::default(),
        }
    }

    /// 查询或光栅化一个字形
    ///
    /// - 命中：直接返回（位图 Arc 共享）
    /// - 未命中：调用光栅化器；字体不含该字符时返回 Ok(None)
    /// - 池满：清空且仅清空该像素尺寸的桶，重试一次；仍失败返回 PoolExhausted
    pub fn get_or_insert(
        &mut self,
        pixel_size: u16,
        ch: char,
        rasterizer: &mut dyn GlyphRasterizer,
    ) -> Result<Option<GlyphRef>, GlyphCacheError> {
        if let Some(glyph) = self
            .buckets
            .get(&pixel_size)
            .and_then(|b| b.glyphs.get(&ch))
        {
            return Ok(Some(GlyphRef {
                metrics: glyph.metrics,
                bitmap: Arc::clone(&glyph.bitmap),
            }));
        }

        let Some(raster) = rasterizer.rasterize(ch, pixel_size) else {
            return Ok(None);
        };
        let bitmap = pad_bitmap(&raster);
        let bytes = bitmap.data.len();

        if !self.pool.try_alloc(bytes) {
            // 池满：整桶清空后重试，不保留部分条目
            let bucket = self.buckets.entry(pixel_size).or_insert_with(Bucket::new);
            crate::nm_log_info!(
                "[GlyphCache] pool full, clearing bucket px={} ({} glyphs, {} bytes)",
                pixel_size,
                bucket.glyphs.len(),
                bucket.bytes
            );
            let freed = bucket.bytes;
            bucket.glyphs.clear();
            bucket.bytes = 0;
            self.pool.free(freed);

            if !self.pool.try_alloc(bytes) {
                return Err(GlyphCacheError::PoolExhausted {
                    requested: bytes,
                    capacity: self.pool.capacity,
                });
            }
        }

        let metrics = GlyphMetrics {
            advance: raster.advance,
            left_bearing: raster.left_bearing,
            top: raster.top,
            bottom: raster.top - raster.height as f32,
            glyph_index: raster.glyph_index,
        };
        let bitmap = Arc::new(bitmap);
        let bucket = self.buckets.entry(pixel_size).or_insert_with(Bucket::new);
        bucket.bytes += bytes;
        bucket.glyphs.insert(
            ch,
            CachedGlyph {
                metrics,
                bitmap: Arc::clone(&bitmap),
                bytes,
            },
        );

        Ok(Some(GlyphRef { metrics, bitmap }))
    }

    /// 行度量（每桶缓存一份）
    pub fn line_metrics(
        &mut self,
        pixel_size: u16,
        rasterizer: &mut dyn GlyphRasterizer,
    ) -> LineMetrics {
        let bucket = self.buckets.entry(pixel_size).or_insert_with(Bucket::new);
        *bucket
            .line
            .get_or_insert_with(|| rasterizer.line_metrics(pixel_size))
    }

    /// 清空全部桶并归还池内存
    pub fn clear(&mut self) {
        self.buckets.clear();
        self.pool.used = 0;
    }

    pub fn stats(&self) -> GlyphCacheStats {
        GlyphCacheStats {
            buckets: self.buckets.len(),
            glyphs: self.buckets.values().map(|b| b.glyphs.len()).sum(),
            pool_capacity: self.pool.capacity,
            pool_used: self.pool.used,
        }
    }

    #[cfg(test)]
    pub(crate) fn bucket_len(&self, pixel_size: u16) -> usize {
        self.buckets
            .get(&pixel_size)
            .map(|b| b.glyphs.len())
            .unwrap_or(0)
    }
}

/// 位图行填充到 4 字节、最小 4×4（沿用纹理对齐约束）
fn pad_bitmap(raster: &crate::render::font::RasterizedGlyph) -> GlyphBitmap {
    let row_bytes = (((raster.width as usize) + 3) & !3).max(4);
    let height = (raster.height as usize).max(4);
    let mut data = vec![0u8; row_bytes * height];
    for y in 0..raster.height as usize {
        let src = y * raster.width as usize;
        let dst = y * row_bytes;
        data[dst..dst + raster.width as usize]
            .copy_from_slice(&raster.pixels[src..src + raster.width as usize]);
    }
    GlyphBitmap {
        width: raster.width,
        height: raster.height,
        row_bytes,
        data,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::BoxRasterizer;

    fn cache_with(pool: usize) -> (GlyphCache, BoxRasterizer) {
        (GlyphCache::new(pool), BoxRasterizer::new())
    }

    #[test]
    fn glyph_lookup_is_idempotent() {
        let (mut cache, mut rast) = cache_with(1024 * 1024);

        let a1 = cache.get_or_insert(20, 'A', &mut rast).unwrap().unwrap();
        let rasterized_once = rast.calls;
        let a2 = cache.get_or_insert(20, 'A', &mut rast).unwrap().unwrap();

        assert_eq!(rast.calls, rasterized_once, "second lookup must hit cache");
        assert_eq!(a1.metrics.advance, a2.metrics.advance);
        assert_eq!(a1.metrics.top, a2.metrics.top);
        assert_eq!(a1.bitmap.data, a2.bitmap.data);
    }

    #[test]
    fn buckets_are_separated_by_pixel_size() {
        let (mut cache, mut rast) = cache_with(1024 * 1024);
        cache.get_or_insert(20, 'A', &mut rast).unwrap();
        cache.get_or_insert(32, 'A', &mut rast).unwrap();
        assert_eq!(cache.bucket_len(20), 1);
        assert_eq!(cache.bucket_len(32), 1);
        assert_eq!(cache.stats().buckets, 2);
    }

    /// 池满时只清空申请尺寸的桶，其他桶保留
    #[test]
    fn pool_exhaustion_clears_exactly_one_bucket() {
        // BoxRasterizer: px=20 → 10x20 位图 → 行填充 12 × 20 = 240 字节
        let bytes_per_glyph_20 = 240;
        // 容量放得下 px=20 四个字形 + px=40 一个（20x40 → 行填充 20 × 40 = 800）
        let (mut cache, mut rast) = cache_with(bytes_per_glyph_20 * 4 + 800);

        cache.get_or_insert(40, 'Z', &mut rast).unwrap();
        for ch in ['A', 'B', 'C', 'D'] {
            cache.get_or_insert(20, ch, &mut rast).unwrap();
        }
        assert_eq!(cache.bucket_len(20), 4);

        // 第五个 px=20 字形放不下 → 清空 px=20 桶重试
        cache.get_or_insert(20, 'E', &mut rast).unwrap();
        assert_eq!(cache.bucket_len(20), 1, "bucket must be reset, then refilled");
        assert_eq!(cache.bucket_len(40), 1, "other buckets keep their entries");
    }

    #[test]
    fn pool_exhaustion_after_retry_is_an_error() {
        // 容量连一个字形都放不下
        let (mut cache, mut rast) = cache_with(16);
        let err = cache.get_or_insert(20, 'A', &mut rast).unwrap_err();
        assert!(matches!(err, GlyphCacheError::PoolExhausted { .. }));
        assert_eq!(cache.bucket_len(20), 0);
    }

    #[test]
    fn missing_glyph_is_not_an_error() {
        let (mut cache, mut rast) = cache_with(1024);
        // BoxRasterizer 对控制字符返回 None
        let got = cache.get_or_insert(20, '\u{1}', &mut rast).unwrap();
        assert!(got.is_none());
        assert_eq!(cache.stats().glyphs, 0);
    }

    #[test]
    fn clear_returns_pool_memory() {
        let (mut cache, mut rast) = cache_with(4096);
        cache.get_or_insert(20, 'A', &mut rast).unwrap();
        assert!(cache.stats().pool_used > 0);
        cache.clear();
        let stats = cache.stats();
        assert_eq!(stats.pool_used, 0);
        assert_eq!(stats.glyphs, 0);
    }

    #[test]
    fn bitmap_rows_are_padded_to_four_bytes() {
        let (mut cache, mut rast) = cache_with(1024 * 1024);
        let glyph = cache.get_or_insert(20, 'A', &mut rast).unwrap().unwrap();
        assert_eq!(glyph.bitmap.row_bytes % 4, 0);
        assert!(glyph.bitmap.row_bytes >= glyph.bitmap.width as usize);
    }
}
