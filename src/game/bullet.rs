//! Bullets
//!
//! A bullet flies in a straight line from its origin to a target point
//! at constant speed. Along the way it is stopped by crossing a cover
//! boundary or by touching a living player other than its owner.
//!
//! State machine:
//!
//! ```text
//! Armed --start--> Flying --+--> Expired          (reached target)
//!                           +--> StoppedByCover   (cover state flipped)
//!                           +--> Hit(victim)      (entered a hit-box)
//! ```
//!
//! Flight time is `distance / BULLET_SPEED` seconds. Aim points farther
//! than [`MAX_RANGE`] are cut short at that range. Each tick the
//! bullet is swept in sub-steps no longer than [`SUBSTEP_LENGTH`] so a
//! fast bullet cannot tunnel through a hit-box or a thin obstacle.

use crate::core::vec2::Vec2;
use crate::game::arena::Arena;
use crate::game::movement::{hitbox_contains, Pose};
use crate::game::state::{BulletId, PlayerId};

/// Travel speed in units per second.
pub const BULLET_SPEED: f32 = 1000.0;

/// Longest distance covered between two collision checks.
pub const SUBSTEP_LENGTH: f32 = 4.0;

/// Farthest a bullet travels before it expires.
pub const MAX_RANGE: f32 = 10_000.0;

/// Bullet lifecycle state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BulletState {
    /// Created, not yet launched
    Armed,
    /// In flight
    Flying,
    /// Reached its target point
    Expired,
    /// Entered or left cover
    StoppedByCover,
    /// Hit the given player
    Hit(PlayerId),
}

impl BulletState {
    /// True once the bullet can be removed.
    pub fn is_terminal(self) -> bool {
        !matches!(self, BulletState::Armed | BulletState::Flying)
    }
}

/// A living player a bullet can hit.
#[derive(Clone, Copy, Debug)]
pub struct HitTarget {
    /// Player id
    pub id: PlayerId,
    /// Hit-box pose
    pub pose: Pose,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Axis {
    X,
    Y,
}

/// A single projectile.
#[derive(Clone, Debug)]
pub struct Bullet {
    id: BulletId,
    owner: PlayerId,
    origin: Vec2,
    target: Vec2,
    destination: Vec2,
    position: Vec2,
    elapsed: f32,
    duration: f32,
    started_in_cover: bool,
    state: BulletState,
    // Both axes animate independently; the flight only expires once
    // neither is still running.
    x_running: bool,
    y_running: bool,
}

impl Bullet {
    /// Create an armed bullet at `origin` aimed at `target`.
    pub fn new(id: BulletId, owner: PlayerId, origin: Vec2, target: Vec2) -> Self {
        let (destination, range) = flight_path(origin, target);
        Self {
            id,
            owner,
            origin,
            target,
            destination,
            position: origin,
            elapsed: 0.0,
            duration: range / BULLET_SPEED,
            started_in_cover: false,
            state: BulletState::Armed,
            x_running: false,
            y_running: false,
        }
    }

    /// Launch the bullet. Records whether it starts inside cover.
    pub fn start(&mut self, arena: &Arena) {
        if self.state != BulletState::Armed {
            return;
        }
        self.started_in_cover = arena.in_cover(self.origin);
        self.x_running = true;
        self.y_running = true;
        self.state = BulletState::Flying;
    }

    /// Advance the flight by `dt` seconds.
    ///
    /// `targets` must only contain living players. Returns the state
    /// after the step.
    pub fn advance(&mut self, dt: f32, arena: &Arena, targets: &[HitTarget]) -> BulletState {
        if self.state != BulletState::Flying {
            return self.state;
        }

        let from = self.elapsed;
        let to = (self.elapsed + dt.max(0.0)).min(self.duration);
        let travelled = (to - from) * BULLET_SPEED;
        let steps = ((travelled / SUBSTEP_LENGTH).ceil() as usize).max(1);

        for step in 1..=steps {
            let t = from + (to - from) * (step as f32 / steps as f32);
            let fraction = if self.duration > 0.0 { t / self.duration } else { 1.0 };
            self.position = self.origin.lerp(self.destination, fraction);

            if let Some(end) = self.check_position(arena, targets) {
                self.stop(end);
                return self.state;
            }
        }

        self.elapsed = to;
        if self.elapsed >= self.duration {
            self.finish_axis(Axis::X);
            self.finish_axis(Axis::Y);
        }

        self.state
    }

    fn check_position(&self, arena: &Arena, targets: &[HitTarget]) -> Option<BulletState> {
        if arena.in_cover(self.position) != self.started_in_cover {
            return Some(BulletState::StoppedByCover);
        }

        targets
            .iter()
            .find(|target| {
                target.id != self.owner
                    && hitbox_contains(target.pose.position, target.pose.rotation, self.position)
            })
            .map(|target| BulletState::Hit(target.id))
    }

    fn stop(&mut self, end: BulletState) {
        self.x_running = false;
        self.y_running = false;
        self.state = end;
    }

    fn finish_axis(&mut self, axis: Axis) {
        match axis {
            Axis::X => self.x_running = false,
            Axis::Y => self.y_running = false,
        }
        if self.x_running || self.y_running {
            return;
        }
        self.state = BulletState::Expired;
    }

    /// Where the flight ends: the target, or the point [`MAX_RANGE`] along the aim.
    pub fn destination(&self) -> Vec2 {
        self.destination
    }

    /// Bullet id.
    pub fn id(&self) -> BulletId {
        self.id
    }

    /// Player who fired.
    pub fn owner(&self) -> PlayerId {
        self.owner
    }

    /// Launch point.
    pub fn origin(&self) -> Vec2 {
        self.origin
    }

    /// Aim point.
    pub fn target(&self) -> Vec2 {
        self.target
    }

    /// Current position.
    pub fn position(&self) -> Vec2 {
        self.position
    }

    /// Total flight time in seconds.
    pub fn duration(&self) -> f32 {
        self.duration
    }

    /// Current state.
    pub fn state(&self) -> BulletState {
        self.state
    }
}

/// End point and length of the flight toward `target`, measured in f64
/// so far-off aim points cannot overflow to an infinite duration.
fn flight_path(origin: Vec2, target: Vec2) -> (Vec2, f32) {
    let dx = f64::from(target.x) - f64::from(origin.x);
    let dy = f64::from(target.y) - f64::from(origin.y);
    let distance = dx.hypot(dy);
    let max_range = f64::from(MAX_RANGE);

    if !distance.is_finite() {
        return (origin, 0.0);
    }
    if distance <= max_range {
        return (target, distance as f32);
    }

    let scale = max_range / distance;
    let end = Vec2::new(
        (f64::from(origin.x) + dx * scale) as f32,
        (f64::from(origin.y) + dy * scale) as f32,
    );
    (end, MAX_RANGE)
}

// =============================================================================
// TESTS
// =============================================================================
