//! Frame canvas capability
//!
//! The compositor draws each notification through this trait once per
//! displayed frame. The host implements it on top of whatever surface it
//! presents (the FFI layer adapts C callbacks to it); tests use a recorder.

use crate::domain::primitives::{Color, Rect};
use crate::render::font::GlyphBitmap;

pub trait FrameCanvas {
    /// Fill an axis-aligned quad (notification background).
    fn fill_quad(&mut self, rect: Rect, color: Color);

    /// Blit a cached glyph bitmap at (x, y) = top-left, tinted with `color`.
    /// The bitmap is 8-bit coverage; `color` carries the effect alpha.
    fn blit_glyph(&mut self, x: f32, y: f32, bitmap: &GlyphBitmap, color: Color);
}
