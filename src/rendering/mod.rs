//! Small presentation helpers shared with the renderer.

pub mod css;
pub mod geometry;

pub use css::{css_stringify, css_stringify_json};
pub use geometry::{square_intersects_circle, Circle, Square};
