//! Presentation Hooks
//!
//! The simulation never draws anything itself. Whatever hosts it
//! (a headless server, a debug viewer) implements [`SceneHooks`] and
//! receives attach/detach notifications for every entity plus a redraw
//! request once per tick. The only thing the simulation reads back is
//! the viewport size, which fixes the world bounds.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::core::vec2::Vec2;
use crate::game::state::{BulletId, PlayerId};

/// RGB color with components in `[0, 1]`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Color {
    /// Red
    pub r: f32,
    /// Green
    pub g: f32,
    /// Blue
    pub b: f32,
}

impl Color {
    /// Create a color.
    pub const fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b }
    }
}

/// Handle to a simulated entity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EntityId {
    /// A player avatar
    Player(PlayerId),
    /// A bullet in flight
    Bullet(BulletId),
}

/// What the host should draw for an entity.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Renderable {
    /// Player hit-box
    Player {
        /// Fill color
        color: Color,
    },
    /// Bullet tracer
    Bullet {
        /// Tint, taken from the shooter
        color: Color,
    },
}

/// Callbacks from the simulation to its host.
pub trait SceneHooks: Send + Sync {
    /// Current viewport size; the world spans `[0, size.x] x [0, size.y]`.
    fn viewport(&self) -> Vec2;

    /// Called once per running tick after the simulation step.
    fn request_redraw(&self) {}

    /// An entity appeared or revived.
    fn attach_renderable(&self, _id: EntityId, _renderable: Renderable) {}

    /// An entity was removed or died.
    fn detach_renderable(&self, _id: EntityId) {}
}

/// Host without a display. Counts redraw requests.
#[derive(Debug)]
pub struct HeadlessScene {
    size: Vec2,
    redraws: AtomicU64,
}

impl HeadlessScene {
    /// Scene with a fixed viewport.
    pub fn new(width: f32, height: f32) -> Self {
        Self {
            size: Vec2::new(width, height),
            redraws: AtomicU64::new(0),
        }
    }

    /// Number of redraws requested so far.
    pub fn redraws(&self) -> u64 {
        self.redraws.load(Ordering::Relaxed)
    }
}

impl SceneHooks for HeadlessScene {
    fn viewport(&self) -> Vec2 {
        self.size
    }

    fn request_redraw(&self) {
        self.redraws.fetch_add(1, Ordering::Relaxed);
    }

    fn attach_renderable(&self, id: EntityId, _renderable: Renderable) {
        tracing::trace!(?id, "attach renderable");
    }

    fn detach_renderable(&self, id: EntityId) {
        tracing::trace!(?id, "detach renderable");
    }
}
