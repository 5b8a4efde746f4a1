//! Text measure cache
//!
//! LRU cache for full-string measurement results, keyed by
//! (text, pixel size). Glyph rasterization is idempotent, so entries never
//! need invalidation — a bucket reset in the glyph cache reproduces the
//! same metrics on the next miss.

use std::num::NonZeroUsize;

use lru::LruCache;

use crate::render::font::TextMetrics;

/// Enough for every live notification plus headroom; notification counts
/// are typically < 10.
const MEASURE_CACHE_CAPACITY: usize = 128;

pub struct MeasureCache {
    inner: LruCache<(String, u16), TextMetrics>,
}

impl MeasureCache {
    pub fn new() -> Self {
        Self {
            inner: LruCache::new(NonZeroUsize::new(MEASURE_CACHE_CAPACITY).unwrap()),
        }
    }

    pub fn get(&mut self, text: &str, pixel_size: u16) -> Option<TextMetrics> {
        // LruCache::get needs the owned key type; allocate only on lookup
        self.inner.get(&(text.to_owned(), pixel_size)).copied()
    }

    pub fn put(&mut self, text: &str, pixel_size: u16, metrics: TextMetrics) {
        self.inner.put((text.to_owned(), pixel_size), metrics);
    }
}

impl Default for MeasureCache {
    fn default() -> Self {
        Self::new()
    }
}
