//! Arena Layout
//!
//! The obstacle field: a fixed-size world holding axis-aligned cover
//! rectangles. Cover blocks movement, sight and bullets fired from
//! outside it.

use crate::core::geometry::Rect;
use crate::core::rng::SeededRng;
use crate::core::vec2::Vec2;
use crate::game::movement::hitbox_in_cover;

const MIN_OBSTACLES: i32 = 5;
const MAX_OBSTACLES: i32 = 14;
const MIN_OBSTACLE_SIDE: i32 = 20;
const MAX_OBSTACLE_SIDE: i32 = 219;
const SPAWN_ATTEMPTS: usize = 64;

/// World size plus cover rectangles.
#[derive(Clone, Debug)]
pub struct Arena {
    width: f32,
    height: f32,
    obstacles: Vec<Rect>,
}

impl Arena {
    /// Arena of the given size with a fixed obstacle list.
    pub fn new(width: f32, height: f32, obstacles: Vec<Rect>) -> Self {
        Self {
            width,
            height,
            obstacles,
        }
    }

    /// Random layout: 5 to 14 rectangles, each side 20 to 219 units,
    /// placed fully inside the world.
    pub fn generate(width: f32, height: f32, rng: &mut SeededRng) -> Self {
        let count = rng.next_int_range(MIN_OBSTACLES, MAX_OBSTACLES);
        let mut obstacles = Vec::with_capacity(count as usize);

        for _ in 0..count {
            let w = rng.next_int_range(MIN_OBSTACLE_SIDE, MAX_OBSTACLE_SIDE) as f32;
            let h = rng.next_int_range(MIN_OBSTACLE_SIDE, MAX_OBSTACLE_SIDE) as f32;
            let w = w.min(width);
            let h = h.min(height);
            let x = rng.next_f32_range(0.0, width - w).floor();
            let y = rng.next_f32_range(0.0, height - h).floor();
            obstacles.push(Rect::from_xywh(x, y, w, h));
        }

        Self::new(width, height, obstacles)
    }

    /// World width.
    pub fn width(&self) -> f32 {
        self.width
    }

    /// World height.
    pub fn height(&self) -> f32 {
        self.height
    }

    /// Obstacle rectangles.
    pub fn obstacles(&self) -> &[Rect] {
        &self.obstacles
    }

    /// World rectangle, used as the outer wall for sight lines.
    pub fn bounds(&self) -> Rect {
        Rect::from_xywh(0.0, 0.0, self.width, self.height)
    }

    /// True if `point` is inside any obstacle.
    pub fn in_cover(&self, point: Vec2) -> bool {
        self.obstacles.iter().any(|rect| rect.contains(point))
    }

    /// Central half of the world, where players spawn.
    pub fn spawn_area(&self) -> Rect {
        Rect::from_xywh(
            self.width / 4.0,
            self.height / 4.0,
            self.width / 2.0,
            self.height / 2.0,
        )
    }

    /// Pick a spawn point whose unrotated hit-box is clear of cover.
    ///
    /// Falls back to the last sampled point if the spawn area is too
    /// crowded to find a clear one.
    pub fn random_spawn(&self, rng: &mut SeededRng) -> Vec2 {
        let area = self.spawn_area();
        let mut point = rng.random_point_in(&area);

        for _ in 1..SPAWN_ATTEMPTS {
            if !hitbox_in_cover(self, point, 0.0) {
                return point;
            }
            point = rng.random_point_in(&area);
        }

        point
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_within_limits() {
        for seed in 0..50 {
            let mut rng = SeededRng::new(seed);
            let arena = Arena::generate(1600.0, 1200.0, &mut rng);
            let count = arena.obstacles().len() as i32;
            assert!((MIN_OBSTACLES..=MAX_OBSTACLES).contains(&count));

            for rect in arena.obstacles() {
                assert!(rect.width() >= 20.0 && rect.width() <= 219.0);
                assert!(rect.height() >= 20.0 && rect.height() <= 219.0);
                assert!(rect.left() >= 0.0 && rect.right() <= 1600.0);
                assert!(rect.top() >= 0.0 && rect.bottom() <= 1200.0);
            }
        }
    }

    #[test]
    fn test_generate_deterministic() {
        let a = Arena::generate(1600.0, 1200.0, &mut SeededRng::new(42));
        let b = Arena::generate(1600.0, 1200.0, &mut SeededRng::new(42));
        assert_eq!(a.obstacles(), b.obstacles());
    }

    #[test]
    fn test_in_cover() {
        let arena = Arena::new(
            1600.0,
            1200.0,
            vec![Rect::from_xywh(100.0, 100.0, 50.0, 50.0)],
        );
        assert!(arena.in_cover(Vec2::new(120.0, 120.0)));
        assert!(arena.in_cover(Vec2::new(100.0, 150.0)));
        assert!(!arena.in_cover(Vec2::new(99.0, 120.0)));
    }

    #[test]
    fn test_spawn_area_is_central_half() {
        let arena = Arena::new(1600.0, 1200.0, Vec::new());
        let area = arena.spawn_area();
        assert_eq!(area.left(), 400.0);
        assert_eq!(area.top(), 300.0);
        assert_eq!(area.right(), 1200.0);
        assert_eq!(area.bottom(), 900.0);
    }

    #[test]
    fn test_random_spawn_avoids_cover() {
        // Cover most of the spawn area, leaving a strip on the right
        let arena = Arena::new(
            1600.0,
            1200.0,
            vec![Rect::from_xywh(380.0, 280.0, 500.0, 640.0)],
        );
        let mut rng = SeededRng::new(3);

        for _ in 0..20 {
            let spawn = arena.random_spawn(&mut rng);
            assert!(arena.spawn_area().contains(spawn));
            assert!(!hitbox_in_cover(&arena, spawn, 0.0));
        }
    }
}
