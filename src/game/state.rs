//! World State
//!
//! Everything the simulation owns: the arena, the fixed set of player
//! slots, bullets in flight, the session phase and the generator used
//! for layout and spawns.

use std::fmt;
use std::sync::Arc;
use serde::{Serialize, Deserialize};

use crate::core::geometry::Rect;
use crate::core::rng::SeededRng;
use crate::core::vec2::Vec2;
use crate::game::arena::Arena;
use crate::game::bullet::Bullet;
use crate::game::events::{GameEvent, GameEventData, GameOutcome};
use crate::game::player::Player;
use crate::game::scene::{Color, EntityId, Renderable, SceneHooks};

// =============================================================================
// IDS
// =============================================================================

/// Player slot index.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PlayerId(pub u32);

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Bullet identifier, unique within a world.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BulletId(pub u32);

impl fmt::Display for BulletId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Slot colors, cycled by player index.
pub const PLAYER_COLORS: [Color; 3] = [
    Color::rgb(1.0, 0.6, 0.6),
    Color::rgb(0.6, 1.0, 0.6),
    Color::rgb(0.6, 0.6, 1.0),
];

// =============================================================================
// SESSION PHASE
// =============================================================================

/// Session phase.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum SessionPhase {
    /// Ticks do nothing
    #[default]
    Paused,
    /// Simulation advances every tick
    Running,
    /// Round decided; needs a reset before it can run again
    Over(GameOutcome),
}

impl fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionPhase::Paused => f.write_str("paused"),
            SessionPhase::Running => f.write_str("running"),
            SessionPhase::Over(GameOutcome::Draw) => f.write_str("over (draw)"),
            SessionPhase::Over(GameOutcome::Winner(id)) => write!(f, "over (player {id} won)"),
        }
    }
}

// =============================================================================
// WORLD
// =============================================================================

/// World construction parameters.
#[derive(Clone, Debug)]
pub struct WorldConfig {
    /// Number of player slots
    pub player_slots: usize,
    /// Seed for arena layout and spawns
    pub arena_seed: u64,
    /// Fixed obstacle layout; generated from the seed when `None`
    pub obstacles: Option<Vec<Rect>>,
    /// Fixed spawn points by slot index; slots past the end spawn randomly
    pub spawn_points: Vec<Vec2>,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            player_slots: 3,
            arena_seed: 0,
            obstacles: None,
            spawn_points: Vec::new(),
        }
    }
}

/// The simulated world.
pub struct World {
    /// Ticks simulated this round
    pub tick: u64,

    /// Current phase
    pub phase: SessionPhase,

    /// Events produced since the last drain
    pub pending_events: Vec<GameEvent>,

    arena: Arena,
    players: Vec<Player>,
    bullets: Vec<Bullet>,
    next_bullet_id: u32,
    rng: SeededRng,
    spawn_points: Vec<Vec2>,
    scene: Arc<dyn SceneHooks>,
}

impl fmt::Debug for World {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("World")
            .field("tick", &self.tick)
            .field("phase", &self.phase)
            .field("players", &self.players.len())
            .field("bullets", &self.bullets.len())
            .finish()
    }
}

impl World {
    /// Build the arena and player slots. The world size is the scene's
    /// viewport.
    pub fn new(config: WorldConfig, scene: Arc<dyn SceneHooks>) -> Self {
        let size = scene.viewport();
        let mut rng = SeededRng::new(config.arena_seed);

        let arena = match config.obstacles {
            Some(obstacles) => Arena::new(size.x, size.y, obstacles),
            None => Arena::generate(size.x, size.y, &mut rng),
        };

        let mut world = Self {
            tick: 0,
            phase: SessionPhase::Paused,
            pending_events: Vec::new(),
            arena,
            players: Vec::with_capacity(config.player_slots),
            bullets: Vec::new(),
            next_bullet_id: 0,
            rng,
            spawn_points: config.spawn_points,
            scene,
        };

        for index in 0..config.player_slots {
            let id = PlayerId(index as u32);
            let spawn = world.spawn_point(index);
            let color = PLAYER_COLORS[index % PLAYER_COLORS.len()];
            world.players.push(Player::new(id, color, spawn));
            world
                .scene
                .attach_renderable(EntityId::Player(id), Renderable::Player { color });
        }

        tracing::debug!(
            obstacles = world.arena.obstacles().len(),
            players = world.players.len(),
            "world created"
        );

        world
    }

    fn spawn_point(&mut self, index: usize) -> Vec2 {
        match self.spawn_points.get(index) {
            Some(point) => *point,
            None => self.arena.random_spawn(&mut self.rng),
        }
    }

    // =========================================================================
    // PHASE CONTROL
    // =========================================================================

    /// True while ticks advance the simulation.
    pub fn is_running(&self) -> bool {
        self.phase == SessionPhase::Running
    }

    /// Start or pause. An ended round stays ended until reset.
    /// Returns true if the phase changed.
    pub fn set_running(&mut self, running: bool) -> bool {
        let next = match (self.phase, running) {
            (SessionPhase::Over(_), _) => return false,
            (_, true) => SessionPhase::Running,
            (_, false) => SessionPhase::Paused,
        };
        let changed = next != self.phase;
        self.phase = next;
        changed
    }

    /// Flip between running and paused. Returns whether it is now running.
    pub fn toggle_running(&mut self) -> bool {
        let running = !self.is_running();
        self.set_running(running);
        self.is_running()
    }

    /// Revive every player at a fresh spawn, drop all bullets and pause.
    /// Attached clients stay attached.
    pub fn reset_round(&mut self) {
        for bullet in self.bullets.drain(..) {
            self.scene.detach_renderable(EntityId::Bullet(bullet.id()));
        }

        for index in 0..self.players.len() {
            let spawn = self.spawn_point(index);
            let player = &mut self.players[index];
            let revived = !player.is_alive();
            player.reset(spawn);
            if revived {
                self.scene.attach_renderable(
                    EntityId::Player(player.id()),
                    Renderable::Player { color: player.color() },
                );
            }
        }

        self.tick = 0;
        self.phase = SessionPhase::Paused;
        self.pending_events.clear();
        tracing::info!("round reset");
    }

    /// Record the outcome and stop.
    pub fn end_round(&mut self, outcome: GameOutcome) {
        self.phase = SessionPhase::Over(outcome);
        self.push_event(GameEventData::GameOver { outcome });
    }

    // =========================================================================
    // ENTITIES
    // =========================================================================

    /// Launch a bullet owned by `owner`.
    pub fn spawn_bullet(&mut self, owner: PlayerId, origin: Vec2, target: Vec2) -> BulletId {
        let id = BulletId(self.next_bullet_id);
        self.next_bullet_id = self.next_bullet_id.wrapping_add(1);

        let mut bullet = Bullet::new(id, owner, origin, target);
        bullet.start(&self.arena);

        let color = self
            .player(owner)
            .map(Player::color)
            .unwrap_or(PLAYER_COLORS[0]);
        self.scene
            .attach_renderable(EntityId::Bullet(id), Renderable::Bullet { color });

        self.bullets.push(bullet);
        self.push_event(GameEventData::BulletFired {
            bullet_id: id,
            owner,
            origin,
            target,
        });
        id
    }

    /// Kill a player. Returns false if already dead or unknown.
    pub fn kill_player(&mut self, id: PlayerId) -> bool {
        let Some(player) = self.players.get_mut(id.0 as usize) else {
            return false;
        };
        if !player.die() {
            return false;
        }
        self.scene.detach_renderable(EntityId::Player(id));
        true
    }

    /// First living player without an attached client.
    pub fn free_slot(&self) -> Option<PlayerId> {
        self.players
            .iter()
            .find(|p| p.is_alive() && !p.is_active())
            .map(Player::id)
    }

    /// Number of living players.
    pub fn alive_count(&self) -> usize {
        self.players.iter().filter(|p| p.is_alive()).count()
    }

    /// Queue an event stamped with the current tick.
    pub fn push_event(&mut self, data: GameEventData) {
        self.pending_events.push(GameEvent::new(self.tick, data));
    }

    /// Take queued events.
    pub fn drain_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.pending_events)
    }

    // =========================================================================
    // ACCESSORS
    // =========================================================================

    /// Obstacle field.
    pub fn arena(&self) -> &Arena {
        &self.arena
    }

    /// All player slots, by index.
    pub fn players(&self) -> &[Player] {
        &self.players
    }

    /// Player slots, mutable.
    pub fn players_mut(&mut self) -> &mut [Player] {
        &mut self.players
    }

    /// Get a player by id.
    pub fn player(&self, id: PlayerId) -> Option<&Player> {
        self.players.get(id.0 as usize)
    }

    /// Get a player mutably by id.
    pub fn player_mut(&mut self, id: PlayerId) -> Option<&mut Player> {
        self.players.get_mut(id.0 as usize)
    }

    /// Bullets in flight.
    pub fn bullets(&self) -> &[Bullet] {
        &self.bullets
    }

    pub(crate) fn arena_and_players_mut(&mut self) -> (&Arena, &mut [Player]) {
        (&self.arena, &mut self.players)
    }

    pub(crate) fn arena_and_bullets_mut(&mut self) -> (&Arena, &mut Vec<Bullet>) {
        (&self.arena, &mut self.bullets)
    }

    /// Presentation hooks.
    pub fn scene(&self) -> &Arc<dyn SceneHooks> {
        &self.scene
    }
}

// =============================================================================
// TESTS
// =============================================================================
