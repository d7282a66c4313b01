//! Core primitives.
//!
//! Pure math shared by the game layer: float vectors, rectangles,
//! ray casting and the seeded generator used to lay out arenas.

pub mod vec2;
pub mod geometry;
pub mod rng;

// Re-export core types
pub use vec2::Vec2;
pub use geometry::{
    Rect, Ray, Segment, Intersection, VisibilityPolygon, GeometryError,
    ray_intersect, compute_visibility_polygon, is_visible,
};
pub use rng::SeededRng;
