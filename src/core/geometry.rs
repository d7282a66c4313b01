//! Geometry Kernel
//!
//! Ray/segment intersection and the radial-sweep visibility polygon.
//! Everything here is a pure function over plain values.
//!
//! ## Visibility sweep
//!
//! ```text
//!   corner angles (a - eps, a, a + eps) for every rectangle corner
//!        │
//!        ▼
//!   sort ascending ──► cast one ray per angle ──► keep closest edge hit
//!        │
//!        ▼
//!   [origin, hit_0, hit_1, ..., hit_n, hit_0]   (closed fan)
//! ```

use serde::{Serialize, Deserialize};

use super::vec2::Vec2;

/// Angular offset around each corner, so rays slip past corners
/// and reach whatever lies behind them.
pub const ANGLE_EPSILON: f32 = 1e-4;

/// Geometry errors.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GeometryError {
    /// Fewer than three fan points were resolved.
    #[error("degenerate visibility polygon ({points} points)")]
    Degenerate {
        /// Points resolved before closing the fan (origin included).
        points: usize,
    },
}

// =============================================================================
// RECT
// =============================================================================

/// Axis-aligned rectangle given by its top-left and bottom-right corners.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    /// Top-left corner (minimum x and y)
    pub top_left: Vec2,
    /// Bottom-right corner (maximum x and y)
    pub bottom_right: Vec2,
}

impl Rect {
    /// Create from two corners. Corners are normalized so
    /// `top_left` always holds the minimum coordinates.
    pub fn new(a: Vec2, b: Vec2) -> Self {
        Self {
            top_left: Vec2::new(a.x.min(b.x), a.y.min(b.y)),
            bottom_right: Vec2::new(a.x.max(b.x), a.y.max(b.y)),
        }
    }

    /// Create from position and size.
    pub fn from_xywh(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self::new(Vec2::new(x, y), Vec2::new(x + width, y + height))
    }

    /// Left edge x.
    #[inline]
    pub fn left(&self) -> f32 {
        self.top_left.x
    }

    /// Top edge y.
    #[inline]
    pub fn top(&self) -> f32 {
        self.top_left.y
    }

    /// Right edge x.
    #[inline]
    pub fn right(&self) -> f32 {
        self.bottom_right.x
    }

    /// Bottom edge y.
    #[inline]
    pub fn bottom(&self) -> f32 {
        self.bottom_right.y
    }

    /// Width.
    #[inline]
    pub fn width(&self) -> f32 {
        self.bottom_right.x - self.top_left.x
    }

    /// Height.
    #[inline]
    pub fn height(&self) -> f32 {
        self.bottom_right.y - self.top_left.y
    }

    /// Point containment, edges included.
    #[inline]
    pub fn contains(&self, point: Vec2) -> bool {
        point.x >= self.left()
            && point.x <= self.right()
            && point.y >= self.top()
            && point.y <= self.bottom()
    }

    /// Corners in order: top-left, top-right, bottom-right, bottom-left.
    pub fn corners(&self) -> [Vec2; 4] {
        [
            self.top_left,
            Vec2::new(self.right(), self.top()),
            self.bottom_right,
            Vec2::new(self.left(), self.bottom()),
        ]
    }

    /// The four edges: top, bottom, left, right.
    pub fn edges(&self) -> [Segment; 4] {
        let [tl, tr, br, bl] = self.corners();
        [
            Segment::new(tl, tr),
            Segment::new(bl, br),
            Segment::new(tl, bl),
            Segment::new(tr, br),
        ]
    }
}

// =============================================================================
// RAYS AND SEGMENTS
// =============================================================================

/// Line segment between two points.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Segment {
    /// Start point
    pub a: Vec2,
    /// End point
    pub b: Vec2,
}

impl Segment {
    /// Create a segment.
    pub const fn new(a: Vec2, b: Vec2) -> Self {
        Self { a, b }
    }

    /// Vector from `a` to `b`.
    #[inline]
    pub fn delta(&self) -> Vec2 {
        self.b - self.a
    }
}

/// Half-line starting at `origin` and extending along `direction`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Ray {
    /// Start point
    pub origin: Vec2,
    /// Direction (not required to be unit length)
    pub direction: Vec2,
}

impl Ray {
    /// Create a ray.
    pub const fn new(origin: Vec2, direction: Vec2) -> Self {
        Self { origin, direction }
    }

    /// Unit-direction ray pointing at `angle` radians.
    pub fn from_angle(origin: Vec2, angle: f32) -> Self {
        Self::new(origin, Vec2::from_angle(angle))
    }

    /// Point at parameter `t` along the ray.
    #[inline]
    pub fn at(&self, t: f32) -> Vec2 {
        self.origin + self.direction.scale(t)
    }
}

/// A ray/segment hit.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Intersection {
    /// Hit point
    pub point: Vec2,
    /// Ray parameter of the hit, in multiples of the ray direction.
    /// Equals the euclidean distance for unit-length directions.
    pub distance: f32,
}

/// Intersect a ray with a segment.
///
/// Returns `None` when:
/// - the ray and segment directions are parallel, compared as exact
///   equality of the normalized direction vectors (either orientation)
/// - the hit lies behind the ray origin
/// - the hit falls outside the segment's parametric range `[0, 1]`
///
/// The parallel test is exact on purpose: near-parallel pairs are
/// solved normally and may produce far-away or non-finite hits, which
/// are discarded.
pub fn ray_intersect(ray: &Ray, segment: &Segment) -> Option<Intersection> {
    let r = ray.direction;
    let s = segment.delta();

    let r_len = r.length();
    let s_len = s.length();
    if r_len == 0.0 || s_len == 0.0 {
        return None;
    }

    let r_unit = r.scale(1.0 / r_len);
    let s_unit = s.scale(1.0 / s_len);
    if r_unit == s_unit || r_unit == -s_unit {
        return None;
    }

    let denom = r.cross(s);
    if denom == 0.0 {
        return None;
    }

    let to_segment = segment.a - ray.origin;
    let t = to_segment.cross(s) / denom;
    let u = to_segment.cross(r) / denom;

    if !t.is_finite() || !u.is_finite() {
        return None;
    }

    if t < 0.0 {
        return None;
    }

    if !(0.0..=1.0).contains(&u) {
        return None;
    }

    Some(Intersection {
        point: ray.at(t),
        distance: t,
    })
}

// =============================================================================
// VISIBILITY
// =============================================================================

/// Closed fan of points visible from an origin.
///
/// `points[0]` is the origin; the last point repeats `points[1]`.
#[derive(Clone, Debug, PartialEq)]
pub struct VisibilityPolygon {
    points: Vec<Vec2>,
}

impl VisibilityPolygon {
    /// Fan origin.
    pub fn origin(&self) -> Vec2 {
        self.points[0]
    }

    /// All fan points, origin first, closing point last.
    pub fn points(&self) -> &[Vec2] {
        &self.points
    }

    /// Number of fan points including origin and closing point.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Always false; kept for API symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// Compute the visibility polygon of `origin` among `obstacles`,
/// bounded by `world_bounds`.
///
/// For each corner of every obstacle and of the bounds rectangle, three
/// candidate angles are swept (`a - eps`, `a`, `a + eps`). Each angle casts
/// one ray; the closest edge hit becomes a fan point. Rays hitting nothing
/// are skipped.
///
/// # Errors
///
/// [`GeometryError::Degenerate`] when fewer than three points (origin
/// included) were resolved. Callers keep their previous polygon.
pub fn compute_visibility_polygon(
    origin: Vec2,
    obstacles: &[Rect],
    world_bounds: &Rect,
) -> Result<VisibilityPolygon, GeometryError> {
    let rect_count = obstacles.len() + 1;
    let mut angles = Vec::with_capacity(rect_count * 12);
    let mut segments = Vec::with_capacity(rect_count * 4);

    for rect in obstacles.iter().chain(std::iter::once(world_bounds)) {
        for corner in rect.corners() {
            let angle = origin.angle_to(corner);
            angles.extend([angle - ANGLE_EPSILON, angle, angle + ANGLE_EPSILON]);
        }
        segments.extend(rect.edges());
    }

    angles.sort_by(f32::total_cmp);

    let mut points = Vec::with_capacity(angles.len() + 2);
    points.push(origin);

    for angle in angles {
        let ray = Ray::from_angle(origin, angle);
        let closest = segments
            .iter()
            .filter_map(|segment| ray_intersect(&ray, segment))
            .min_by(|a, b| a.distance.total_cmp(&b.distance));

        if let Some(hit) = closest {
            points.push(hit.point);
        }
    }

    if points.len() < 3 {
        return Err(GeometryError::Degenerate { points: points.len() });
    }

    points.push(points[1]);
    Ok(VisibilityPolygon { points })
}

/// True iff no obstacle edge crosses the open segment `origin -> target`.
pub fn is_visible(origin: Vec2, target: Vec2, obstacles: &[Rect]) -> bool {
    let ray = Ray::new(origin, target - origin);

    !obstacles
        .iter()
        .flat_map(|rect| rect.edges())
        .filter_map(|edge| ray_intersect(&ray, &edge))
        .any(|hit| hit.distance > 0.0 && hit.distance < 1.0)
}

// =============================================================================
// TESTS
// =============================================================================
