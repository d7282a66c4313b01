//! Player
//!
//! One player slot: pose, aim point, liveness, the command mailbox and
//! the cached sight data. Connection handles are kept by the network
//! session; the player only knows whether a client is attached.

use std::collections::BTreeSet;
use std::sync::Arc;

use serde::{Serialize, Deserialize};

use crate::core::geometry::{compute_visibility_polygon, is_visible, VisibilityPolygon};
use crate::core::vec2::Vec2;
use crate::game::arena::Arena;
use crate::game::bullet::HitTarget;
use crate::game::input::{Command, CommandError, CommandLine, Mailbox, Motion};
use crate::game::movement::{validate_move, MoveOutcome, Pose};
use crate::game::scene::Color;
use crate::game::state::PlayerId;

/// Per-player state sent to clients.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PlayerSnapshot {
    /// Position X
    pub x: f32,
    /// Position Y
    pub y: f32,
    /// Aim point X
    pub pointing_at_x: f32,
    /// Aim point Y
    pub pointing_at_y: f32,
    /// Facing in radians
    pub rotation: f32,
    /// Still in the round
    pub alive: bool,
}

/// What an applied command asks of the world.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum CommandEffect {
    /// Spawn a bullet.
    Fire {
        /// Shooter position
        origin: Vec2,
        /// Aim point at the time of firing
        target: Vec2,
    },
    /// Pose update result.
    Move(MoveOutcome),
}

/// A player slot.
#[derive(Debug)]
pub struct Player {
    id: PlayerId,
    name: String,
    color: Color,
    pose: Pose,
    aim: Vec2,
    alive: bool,
    active: bool,
    mailbox: Arc<Mailbox>,
    visibility: Option<VisibilityPolygon>,
    visible_opponents: BTreeSet<PlayerId>,
}

impl Player {
    /// Create a living, unattached player at `spawn`.
    pub fn new(id: PlayerId, color: Color, spawn: Vec2) -> Self {
        Self {
            id,
            name: format!("Bot {}", id),
            color,
            pose: Pose::new(spawn, 0.0),
            aim: spawn,
            alive: true,
            active: false,
            mailbox: Arc::new(Mailbox::new()),
            visibility: None,
            visible_opponents: BTreeSet::new(),
        }
    }

    // =========================================================================
    // COMMANDS
    // =========================================================================

    /// Apply one command line.
    pub fn handle_command(
        &mut self,
        line: &CommandLine,
        arena: &Arena,
    ) -> Result<CommandEffect, CommandError> {
        if !self.alive {
            return Err(CommandError::PlayerDead);
        }

        match Command::parse(line)? {
            Command::Name(name) => {
                self.name = name;
                Ok(self.apply_motion(arena, Motion::Stay))
            }
            Command::PointAt(point) => {
                self.aim = point;
                Ok(self.apply_motion(arena, Motion::Stay))
            }
            Command::Fire => Ok(CommandEffect::Fire {
                origin: self.pose.position,
                target: self.aim,
            }),
            Command::Move(motion) => Ok(self.apply_motion(arena, motion)),
        }
    }

    fn apply_motion(&mut self, arena: &Arena, motion: Motion) -> CommandEffect {
        let outcome = validate_move(arena, self.pose, self.aim, motion);
        if let MoveOutcome::Moved(pose) = outcome {
            self.pose = pose;
        }
        CommandEffect::Move(outcome)
    }

    /// Per-tick update: refresh sight, then apply the pending command if
    /// a client is attached.
    ///
    /// `opponents` are the positions of the other living players.
    /// Returns `None` when nothing was pending.
    pub fn update(
        &mut self,
        arena: &Arena,
        opponents: &[(PlayerId, Vec2)],
    ) -> Option<Result<CommandEffect, CommandError>> {
        if !self.alive {
            return None;
        }

        self.update_visibility(arena, opponents);

        if !self.active {
            return None;
        }
        let line = self.mailbox.take()?;
        Some(self.handle_command(&line, arena))
    }

    /// Recompute the sight polygon and the set of opponents in line of sight.
    ///
    /// A degenerate polygon keeps the previous one.
    pub fn update_visibility(&mut self, arena: &Arena, opponents: &[(PlayerId, Vec2)]) {
        let origin = self.pose.position;

        match compute_visibility_polygon(origin, arena.obstacles(), &arena.bounds()) {
            Ok(polygon) => self.visibility = Some(polygon),
            Err(e) => tracing::debug!(player = %self.id, error = %e, "keeping previous sight polygon"),
        }

        self.visible_opponents = opponents
            .iter()
            .filter(|(id, _)| *id != self.id)
            .filter(|(_, position)| is_visible(origin, *position, arena.obstacles()))
            .map(|(id, _)| *id)
            .collect();
    }

    // =========================================================================
    // LIFECYCLE
    // =========================================================================

    /// Mark dead. Returns false if already dead.
    pub fn die(&mut self) -> bool {
        if !self.alive {
            return false;
        }
        self.alive = false;
        self.mailbox.clear();
        self.visible_opponents.clear();
        true
    }

    /// Revive at `spawn` for a new round. Keeps the name and the
    /// attached client.
    pub fn reset(&mut self, spawn: Vec2) {
        self.pose = Pose::new(spawn, 0.0);
        self.aim = spawn;
        self.alive = true;
        self.mailbox.clear();
        self.visibility = None;
        self.visible_opponents.clear();
    }

    /// Mark a client as attached or detached.
    pub fn set_active(&mut self, active: bool) {
        self.active = active;
        if !active {
            self.mailbox.clear();
        }
    }

    /// Wire representation.
    pub fn serialize_state(&self) -> PlayerSnapshot {
        PlayerSnapshot {
            x: self.pose.position.x,
            y: self.pose.position.y,
            pointing_at_x: self.aim.x,
            pointing_at_y: self.aim.y,
            rotation: self.pose.rotation,
            alive: self.alive,
        }
    }

    /// Hit-box for bullet checks.
    pub fn hit_target(&self) -> HitTarget {
        HitTarget {
            id: self.id,
            pose: self.pose,
        }
    }

    // =========================================================================
    // ACCESSORS
    // =========================================================================

    /// Player id.
    pub fn id(&self) -> PlayerId {
        self.id
    }

    /// Display name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Render color.
    pub fn color(&self) -> Color {
        self.color
    }

    /// Hit-box center.
    pub fn position(&self) -> Vec2 {
        self.pose.position
    }

    /// Facing in radians.
    pub fn rotation(&self) -> f32 {
        self.pose.rotation
    }

    /// Aim point.
    pub fn aim(&self) -> Vec2 {
        self.aim
    }

    /// Still in the round.
    pub fn is_alive(&self) -> bool {
        self.alive
    }

    /// A client is attached.
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Shared mailbox handle for the connection reader.
    pub fn mailbox(&self) -> Arc<Mailbox> {
        Arc::clone(&self.mailbox)
    }

    /// Last computed sight polygon.
    pub fn visibility(&self) -> Option<&VisibilityPolygon> {
        self.visibility.as_ref()
    }

    /// Opponents in line of sight as of the last update.
    pub fn visible_opponents(&self) -> &BTreeSet<PlayerId> {
        &self.visible_opponents
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::geometry::Rect;
    use std::f32::consts::FRAC_PI_2;

    fn arena() -> Arena {
        Arena::new(
            1600.0,
            1200.0,
            vec![Rect::from_xywh(300.0, 0.0, 50.0, 400.0)],
        )
    }

    fn player_at(x: f32, y: f32) -> Player {
        Player::new(PlayerId(1), Color::rgb(1.0, 0.6, 0.6), Vec2::new(x, y))
    }

    fn line(text: &str) -> CommandLine {
        CommandLine::tokenize(text).unwrap()
    }

    #[test]
    fn test_default_name() {
        let player = player_at(100.0, 100.0);
        assert_eq!(player.name(), "Bot 1");
        assert!(player.is_alive());
        assert!(!player.is_active());
    }

    #[test]
    fn test_name_command() {
        let mut player = player_at(100.0, 100.0);
        let effect = player.handle_command(&line("NAME Bot"), &arena());
        assert!(effect.is_ok());
        assert_eq!(player.name(), "Bot");
    }

    #[test]
    fn test_point_at_updates_facing() {
        let mut player = player_at(100.0, 100.0);
        let effect = player.handle_command(&line("POINT_AT 100 300"), &arena()).unwrap();

        assert!(matches!(effect, CommandEffect::Move(MoveOutcome::Moved(_))));
        assert_eq!(player.aim(), Vec2::new(100.0, 300.0));
        assert_eq!(player.position(), Vec2::new(100.0, 100.0));
        assert!((player.rotation() - FRAC_PI_2).abs() < 1e-5);
    }

    #[test]
    fn test_fire_uses_current_aim() {
        let mut player = player_at(100.0, 100.0);
        player.handle_command(&line("POINT_AT 50 50"), &arena()).unwrap();

        let effect = player.handle_command(&line("FIRE"), &arena()).unwrap();
        assert_eq!(
            effect,
            CommandEffect::Fire {
                origin: Vec2::new(100.0, 100.0),
                target: Vec2::new(50.0, 50.0),
            }
        );
    }

    #[test]
    fn test_move_blocked_by_cover() {
        let mut player = player_at(280.0, 100.0);
        player.handle_command(&line("POINT_AT 500 100"), &arena()).unwrap();

        let effect = player.handle_command(&line("FORWARD"), &arena()).unwrap();
        assert_eq!(effect, CommandEffect::Move(MoveOutcome::Blocked));
        assert_eq!(player.position(), Vec2::new(280.0, 100.0));
    }

    #[test]
    fn test_dead_player_rejects_commands() {
        let mut player = player_at(100.0, 100.0);
        assert!(player.die());
        assert!(!player.die());

        assert_eq!(
            player.handle_command(&line("FIRE"), &arena()),
            Err(CommandError::PlayerDead)
        );
    }

    #[test]
    fn test_update_requires_active() {
        let mut player = player_at(100.0, 100.0);
        let mailbox = player.mailbox();

        mailbox.put(line("FIRE"));
        assert!(player.update(&arena(), &[]).is_none());

        player.set_active(true);
        mailbox.put(line("FIRE"));
        let result = player.update(&arena(), &[]);
        assert!(matches!(result, Some(Ok(CommandEffect::Fire { .. }))));
        assert!(mailbox.is_empty());
        assert!(player.visibility().is_some());
    }

    #[test]
    fn test_visible_opponents_respect_cover() {
        let mut player = player_at(100.0, 100.0);
        let opponents = [
            (PlayerId(1), Vec2::new(100.0, 100.0)),
            (PlayerId(2), Vec2::new(500.0, 100.0)),
            (PlayerId(3), Vec2::new(100.0, 600.0)),
        ];

        player.update_visibility(&arena(), &opponents);
        let visible: Vec<_> = player.visible_opponents().iter().copied().collect();
        assert_eq!(visible, vec![PlayerId(3)]);
    }

    #[test]
    fn test_degenerate_sight_keeps_previous_polygon() {
        let mut player = player_at(100.0, 100.0);
        player.update_visibility(&arena(), &[]);
        let before = player.visibility().cloned().unwrap();
        assert!(before.len() >= 3);

        // Same origin, but the world collapsed to a point: every ray misses
        player.update_visibility(&Arena::new(0.0, 0.0, Vec::new()), &[]);

        assert_eq!(player.visibility(), Some(&before));
        assert_eq!(player.visibility().unwrap().origin(), Vec2::new(100.0, 100.0));
    }

    #[test]
    fn test_reset_revives() {
        let mut player = player_at(100.0, 100.0);
        player.set_active(true);
        player.die();

        player.reset(Vec2::new(700.0, 500.0));
        assert!(player.is_alive());
        assert!(player.is_active());
        assert_eq!(player.position(), Vec2::new(700.0, 500.0));
    }

    #[test]
    fn test_serialize_state_fields() {
        let mut player = player_at(10.0, 20.0);
        player.handle_command(&line("POINT_AT 30 40"), &arena()).unwrap();

        let snapshot = player.serialize_state();
        assert_eq!(snapshot.x, 10.0);
        assert_eq!(snapshot.y, 20.0);
        assert_eq!(snapshot.pointing_at_x, 30.0);
        assert_eq!(snapshot.pointing_at_y, 40.0);
        assert!(snapshot.alive);

        let json = serde_json::to_value(snapshot).unwrap();
        for key in ["x", "y", "pointing_at_x", "pointing_at_y", "rotation", "alive"] {
            assert!(json.get(key).is_some(), "missing {key}");
        }
    }
}
