//! 字形缓存性能基准
//!
//! 对比三条路径：
//! - 缓存命中（热路径，每帧每字形一次）
//! - 首次光栅化 + 入缓存
//! - 池满触发整桶清空后的重建

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use notify_overlay_ffi::render::font::{
    FontSystem, GlyphRasterizer, LineMetrics, RasterizedGlyph,
};

/// 固定开销的模拟光栅化器
struct FlatRasterizer;

impl GlyphRasterizer for FlatRasterizer {
    fn rasterize(&mut self, ch: char, pixel_size: u16) -> Option<RasterizedGlyph> {
        let width = (pixel_size / 2).max(1);
        let height = pixel_size.max(1);
        // 模拟光栅化的像素填充开销
        let pixels = vec![0xAAu8; width as usize * height as usize];
        Some(RasterizedGlyph {
            width,
            height,
            pixels,
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

const SAMPLE: &str = "Saving... 42% complete";

fn bench_measure_hot_cache(c: &mut Criterion) {
    let mut font = FontSystem::new(Box::new(FlatRasterizer), 1024 * 1024);
    // 预热：全部字形入缓存
    font.measure(SAMPLE, 20);

    c.bench_function("measure_hot_cache", |b| {
        b.iter(|| {
            let m = font.measure(black_box(SAMPLE), 20);
            black_box(m);
        });
    });
}

fn bench_measure_cold_cache(c: &mut Criterion) {
    c.bench_function("measure_cold_cache", |b| {
        b.iter(|| {
            // 每轮新建：包含光栅化 + 缓存插入
            let mut font = FontSystem::new(Box::new(FlatRasterizer), 1024 * 1024);
            let m = font.measure(black_box(SAMPLE), 20);
            black_box(m);
        });
    });
}

fn bench_bucket_reset_churn(c: &mut Criterion) {
    // 池只够容纳少量字形，强制反复走整桶清空路径
    c.bench_function("bucket_reset_churn", |b| {
        let mut font = FontSystem::new(Box::new(FlatRasterizer), 2048);
        let mut code = 0x4E00u32; // 持续喂新字符，保证不命中
        b.iter(|| {
            let ch = char::from_u32(code).unwrap_or('一');
            code += 1;
            let m = font.measure(black_box(&ch.to_string()), 20);
            black_box(m);
        });
    });
}

criterion_group!(
    benches,
    bench_measure_hot_cache,
    bench_measure_cold_cache,
    bench_bucket_reset_churn
);
criterion_main!(benches);
