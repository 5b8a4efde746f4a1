//! 渲染侧缓存

pub mod measure_cache;
