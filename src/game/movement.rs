//! Movement Validation
//!
//! Player hit-boxes and the move check run for every movement-bearing
//! command. A player is a 20x20 square centered on its position and
//! rotated to its facing; a move is accepted only if none of the
//! rotated corners lands inside an obstacle.

use std::f32::consts::FRAC_PI_2;

use crate::core::vec2::Vec2;
use crate::game::arena::Arena;
use crate::game::input::Motion;

/// Distance covered by one movement command.
pub const STEP: f32 = 10.0;

/// Half the side of the square hit-box.
pub const HITBOX_HALF_EXTENT: f32 = 10.0;

/// Position and facing of a player.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Pose {
    /// Hit-box center
    pub position: Vec2,
    /// Facing in radians
    pub rotation: f32,
}

impl Pose {
    /// Create a pose.
    pub const fn new(position: Vec2, rotation: f32) -> Self {
        Self { position, rotation }
    }
}

/// Result of validating a move.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum MoveOutcome {
    /// The pose changed and is clear of cover.
    Moved(Pose),
    /// Nothing would change.
    Unchanged,
    /// A hit-box corner would end up inside an obstacle.
    Blocked,
}

impl Motion {
    /// (forward, strafe) displacement in units.
    fn offsets(self) -> (f32, f32) {
        match self {
            Motion::Stay => (0.0, 0.0),
            Motion::Forward => (STEP, 0.0),
            Motion::Backward => (-STEP, 0.0),
            Motion::StrafeLeft => (0.0, -STEP),
            Motion::StrafeRight => (0.0, STEP),
        }
    }
}

/// Corners of the hit-box at `position` rotated by `rotation`.
pub fn hitbox_corners(position: Vec2, rotation: f32) -> [Vec2; 4] {
    let h = HITBOX_HALF_EXTENT;
    [
        Vec2::new(-h, -h),
        Vec2::new(h, -h),
        Vec2::new(h, h),
        Vec2::new(-h, h),
    ]
    .map(|corner| position + corner.rotate(rotation))
}

/// True if `point` lies inside the rotated hit-box (edges inclusive).
pub fn hitbox_contains(position: Vec2, rotation: f32, point: Vec2) -> bool {
    let local = (point - position).rotate(-rotation);
    local.x.abs() <= HITBOX_HALF_EXTENT && local.y.abs() <= HITBOX_HALF_EXTENT
}

/// True if any hit-box corner is inside an obstacle.
pub fn hitbox_in_cover(arena: &Arena, position: Vec2, rotation: f32) -> bool {
    hitbox_corners(position, rotation)
        .iter()
        .any(|corner| arena.in_cover(*corner))
}

/// Validate a move from `current` toward `motion`, facing `aim`.
///
/// Facing is recomputed from the current position toward the aim point
/// first; forward/backward follow the new facing and strafes follow the
/// facing turned a quarter. The target is clamped into the world before
/// the corner check.
pub fn validate_move(arena: &Arena, current: Pose, aim: Vec2, motion: Motion) -> MoveOutcome {
    let rotation = current.position.angle_to(aim);
    let (forward, strafe) = motion.offsets();

    let mut requested = current.position;
    if forward != 0.0 {
        requested = requested + Vec2::from_angle(rotation).scale(forward);
    } else if strafe != 0.0 {
        requested = requested + Vec2::from_angle(rotation + FRAC_PI_2).scale(strafe);
    }
    let requested = requested.clamp_to(arena.width(), arena.height());

    if hitbox_in_cover(arena, requested, rotation) {
        return MoveOutcome::Blocked;
    }

    if requested == current.position && rotation == current.rotation {
        return MoveOutcome::Unchanged;
    }

    MoveOutcome::Moved(Pose::new(requested, rotation))
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::geometry::Rect;
    use proptest::prelude::*;

    fn approx(a: Vec2, b: Vec2) -> bool {
        a.distance(b) < 1e-3
    }

    fn open_arena() -> Arena {
        Arena::new(1600.0, 1200.0, Vec::new())
    }

    #[test]
    fn test_forward_follows_aim() {
        let arena = open_arena();
        let start = Pose::new(Vec2::new(100.0, 100.0), 0.0);

        let outcome = validate_move(&arena, start, Vec2::new(200.0, 100.0), Motion::Forward);
        match outcome {
            MoveOutcome::Moved(pose) => {
                assert!(approx(pose.position, Vec2::new(110.0, 100.0)));
                assert_eq!(pose.rotation, 0.0);
            }
            other => panic!("expected move, got {other:?}"),
        }

        let outcome = validate_move(&arena, start, Vec2::new(100.0, 300.0), Motion::Backward);
        match outcome {
            MoveOutcome::Moved(pose) => assert!(approx(pose.position, Vec2::new(100.0, 90.0))),
            other => panic!("expected move, got {other:?}"),
        }
    }

    #[test]
    fn test_strafe_perpendicular() {
        let arena = open_arena();
        let start = Pose::new(Vec2::new(100.0, 100.0), 0.0);
        let aim = Vec2::new(200.0, 100.0);

        // Facing +X, so the perpendicular is +Y (screen down)
        match validate_move(&arena, start, aim, Motion::StrafeRight) {
            MoveOutcome::Moved(pose) => assert!(approx(pose.position, Vec2::new(100.0, 110.0))),
            other => panic!("expected move, got {other:?}"),
        }
        match validate_move(&arena, start, aim, Motion::StrafeLeft) {
            MoveOutcome::Moved(pose) => assert!(approx(pose.position, Vec2::new(100.0, 90.0))),
            other => panic!("expected move, got {other:?}"),
        }
    }

    #[test]
    fn test_stay_updates_facing_only() {
        let arena = open_arena();
        let start = Pose::new(Vec2::new(100.0, 100.0), 0.0);

        match validate_move(&arena, start, Vec2::new(100.0, 200.0), Motion::Stay) {
            MoveOutcome::Moved(pose) => {
                assert_eq!(pose.position, start.position);
                assert!((pose.rotation - FRAC_PI_2).abs() < 1e-5);
            }
            other => panic!("expected facing change, got {other:?}"),
        }

        let same = validate_move(&arena, start, Vec2::new(300.0, 100.0), Motion::Stay);
        assert_eq!(same, MoveOutcome::Unchanged);
    }

    #[test]
    fn test_blocked_by_cover() {
        let arena = Arena::new(
            1600.0,
            1200.0,
            vec![Rect::from_xywh(115.0, 50.0, 40.0, 100.0)],
        );
        let start = Pose::new(Vec2::new(100.0, 100.0), 0.0);

        // Front corners would reach x = 120
        let outcome = validate_move(&arena, start, Vec2::new(500.0, 100.0), Motion::Forward);
        assert_eq!(outcome, MoveOutcome::Blocked);

        // Moving away is fine
        let outcome = validate_move(&arena, start, Vec2::new(500.0, 100.0), Motion::Backward);
        assert!(matches!(outcome, MoveOutcome::Moved(_)));
    }

    #[test]
    fn test_clamped_to_world() {
        let arena = open_arena();
        let start = Pose::new(Vec2::new(5.0, 600.0), std::f32::consts::PI);

        match validate_move(&arena, start, Vec2::new(-100.0, 600.0), Motion::Forward) {
            MoveOutcome::Moved(pose) => assert_eq!(pose.position.x, 0.0),
            other => panic!("expected clamped move, got {other:?}"),
        }
    }

    #[test]
    fn test_hitbox_contains_rotated() {
        let center = Vec2::new(50.0, 50.0);
        assert!(hitbox_contains(center, 0.0, Vec2::new(59.0, 59.0)));
        assert!(!hitbox_contains(center, 0.0, Vec2::new(61.0, 50.0)));

        // At 45 degrees the corner reaches ~14.14 along the axis
        let quarter = std::f32::consts::FRAC_PI_4;
        assert!(hitbox_contains(center, quarter, Vec2::new(63.0, 50.0)));
        assert!(!hitbox_contains(center, quarter, Vec2::new(59.0, 59.0)));
    }

    proptest! {
        #[test]
        fn prop_accepted_moves_stay_out_of_cover(
            x in 0.0f32..1600.0,
            y in 0.0f32..1200.0,
            aim_x in 0.0f32..1600.0,
            aim_y in 0.0f32..1200.0,
            motion in prop_oneof![
                Just(Motion::Stay),
                Just(Motion::Forward),
                Just(Motion::Backward),
                Just(Motion::StrafeLeft),
                Just(Motion::StrafeRight),
            ],
        ) {
            let arena = Arena::new(
                1600.0,
                1200.0,
                vec![
                    Rect::from_xywh(300.0, 300.0, 120.0, 60.0),
                    Rect::from_xywh(900.0, 500.0, 40.0, 200.0),
                ],
            );
            let start = Pose::new(Vec2::new(x, y), 0.0);

            if let MoveOutcome::Moved(pose) = validate_move(&arena, start, Vec2::new(aim_x, aim_y), motion) {
                prop_assert!(!hitbox_in_cover(&arena, pose.position, pose.rotation));
                prop_assert!(pose.position.x >= 0.0 && pose.position.x <= 1600.0);
                prop_assert!(pose.position.y >= 0.0 && pose.position.y <= 1200.0);
            }
        }
    }
}
