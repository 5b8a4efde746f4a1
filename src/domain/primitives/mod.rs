//! 基础值对象（颜色 / 几何）

mod color;
mod rect;

pub use color::Color;
pub use rect::{Point, Rect, Size};
