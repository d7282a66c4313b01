//! Simulation Tick
//!
//! One step of the session, run every 20 ms while the round is live.
//!
//! Order within a tick:
//!
//! 1. Every living player refreshes sight and applies its mailbox command
//! 2. Bullets fired this tick are launched, all bullets advance
//! 3. Finished bullets are removed, hit players die
//! 4. Redraw is requested
//! 5. End check: no survivors is a draw, one survivor wins
//! 6. Otherwise an update is built for every player

use crate::core::vec2::Vec2;
use crate::game::bullet::{BulletState, HitTarget};
use crate::game::events::{GameEvent, GameEventData, GameOutcome};
use crate::game::player::{CommandEffect, PlayerSnapshot};
use crate::game::scene::EntityId;
use crate::game::state::{BulletId, PlayerId, World};

/// Default tick length in seconds.
pub const TICK_SECONDS: f32 = 0.02;

/// Tick parameters.
#[derive(Clone, Copy, Debug)]
pub struct TickConfig {
    /// Simulated seconds per tick
    pub dt: f32,
    /// Limit each player's view of others to those in line of sight
    pub fog_of_war: bool,
}

impl Default for TickConfig {
    fn default() -> Self {
        Self {
            dt: TICK_SECONDS,
            fog_of_war: false,
        }
    }
}

/// State sent to one player after a tick.
#[derive(Clone, Debug, PartialEq)]
pub struct WorldUpdate {
    /// Player the update is for
    pub recipient: PlayerId,
    /// The recipient's own state
    pub you: PlayerSnapshot,
    /// Other living players
    pub others: Vec<PlayerSnapshot>,
}

/// What the tick decided.
#[derive(Clone, Debug, PartialEq)]
pub enum TickOutcome {
    /// Session not running; nothing happened.
    Idle,
    /// Round continues; one update per player slot.
    Continue(Vec<WorldUpdate>),
    /// Round ended this tick.
    GameOver(GameOutcome),
}

/// Result of a tick.
#[derive(Debug)]
pub struct TickResult {
    /// Events generated this tick
    pub events: Vec<GameEvent>,
    /// Outcome
    pub outcome: TickOutcome,
}

/// Run one simulation tick.
pub fn tick(world: &mut World, config: &TickConfig) -> TickResult {
    if !world.is_running() {
        return TickResult {
            events: Vec::new(),
            outcome: TickOutcome::Idle,
        };
    }

    world.tick += 1;

    // 1. Sight and commands
    update_players(world);

    // 2-3. Bullets
    advance_bullets(world, config.dt);

    // 4. Redraw
    world.scene().request_redraw();

    // 5. End conditions
    let outcome = match check_end_conditions(world) {
        Some(outcome) => {
            world.end_round(outcome);
            TickOutcome::GameOver(outcome)
        }
        // 6. Updates
        None => TickOutcome::Continue(build_updates(world, config.fog_of_war)),
    };

    TickResult {
        events: world.drain_events(),
        outcome,
    }
}

fn update_players(world: &mut World) {
    let opponents: Vec<(PlayerId, Vec2)> = world
        .players()
        .iter()
        .filter(|p| p.is_alive())
        .map(|p| (p.id(), p.position()))
        .collect();

    let mut shots = Vec::new();
    let mut rejected = Vec::new();

    let (arena, players) = world.arena_and_players_mut();
    for player in players.iter_mut() {
        match player.update(arena, &opponents) {
            Some(Ok(CommandEffect::Fire { origin, target })) => {
                shots.push((player.id(), origin, target));
            }
            Some(Ok(CommandEffect::Move(_))) | None => {}
            Some(Err(e)) => {
                tracing::warn!(player = %player.id(), error = %e, "command rejected");
                rejected.push((player.id(), e.to_string()));
            }
        }
    }

    for (player_id, reason) in rejected {
        world.push_event(GameEventData::CommandRejected { player_id, reason });
    }
    for (owner, origin, target) in shots {
        world.spawn_bullet(owner, origin, target);
    }
}

fn advance_bullets(world: &mut World, dt: f32) {
    let mut targets: Vec<HitTarget> = world
        .players()
        .iter()
        .filter(|p| p.is_alive())
        .map(|p| p.hit_target())
        .collect();

    let mut finished: Vec<(BulletId, PlayerId, BulletState, Vec2)> = Vec::new();

    let (arena, bullets) = world.arena_and_bullets_mut();
    for bullet in bullets.iter_mut() {
        let state = bullet.advance(dt, arena, &targets);
        if let BulletState::Hit(victim) = state {
            // A player can only be hit once
            targets.retain(|t| t.id != victim);
        }
        if state.is_terminal() {
            finished.push((bullet.id(), bullet.owner(), state, bullet.position()));
        }
    }
    bullets.retain(|b| !b.state().is_terminal());

    for (bullet_id, owner, state, position) in finished {
        world.scene().detach_renderable(EntityId::Bullet(bullet_id));

        match state {
            BulletState::Expired => {
                world.push_event(GameEventData::BulletExpired { bullet_id });
            }
            BulletState::StoppedByCover => {
                world.push_event(GameEventData::BulletStopped { bullet_id, position });
            }
            BulletState::Hit(victim) => {
                if world.kill_player(victim) {
                    tracing::info!(victim = %victim, shooter = %owner, "player hit");
                    world.push_event(GameEventData::PlayerHit {
                        victim,
                        shooter: owner,
                        bullet_id,
                    });
                }
            }
            BulletState::Armed | BulletState::Flying => {}
        }
    }
}

fn check_end_conditions(world: &World) -> Option<GameOutcome> {
    let mut alive = world.players().iter().filter(|p| p.is_alive());

    match (alive.next(), alive.next()) {
        (None, _) => Some(GameOutcome::Draw),
        (Some(winner), None) => Some(GameOutcome::Winner(winner.id())),
        _ => None,
    }
}

fn build_updates(world: &World, fog_of_war: bool) -> Vec<WorldUpdate> {
    let alive: Vec<(PlayerId, PlayerSnapshot)> = world
        .players()
        .iter()
        .filter(|p| p.is_alive())
        .map(|p| (p.id(), p.serialize_state()))
        .collect();

    world
        .players()
        .iter()
        .map(|player| {
            let others = alive
                .iter()
                .filter(|(id, _)| *id != player.id())
                .filter(|(id, _)| !fog_of_war || player.visible_opponents().contains(id))
                .map(|(_, snapshot)| *snapshot)
                .collect();

            WorldUpdate {
                recipient: player.id(),
                you: player.serialize_state(),
                others,
            }
        })
        .collect()
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use crate::core::geometry::Rect;
    use crate::game::input::CommandLine;
    use crate::game::scene::HeadlessScene;
    use crate::game::state::{SessionPhase, WorldConfig};

    fn world_with(spawns: Vec<Vec2>, obstacles: Vec<Rect>) -> (World, Arc<HeadlessScene>) {
        let scene = Arc::new(HeadlessScene::new(1600.0, 1200.0));
        let config = WorldConfig {
            player_slots: spawns.len(),
            arena_seed: 1,
            obstacles: Some(obstacles),
            spawn_points: spawns,
        };
        (World::new(config, scene.clone()), scene)
    }

    fn send(world: &World, id: u32, text: &str) {
        world.players()[id as usize]
            .mailbox()
            .put(CommandLine::tokenize(text).unwrap());
    }

    fn activate_all(world: &mut World) {
        for player in world.players_mut() {
            player.set_active(true);
        }
    }

    #[test]
    fn test_paused_tick_is_idle() {
        let (mut world, scene) = world_with(vec![Vec2::new(500.0, 500.0), Vec2::new(700.0, 500.0)], vec![]);
        let result = tick(&mut world, &TickConfig::default());

        assert_eq!(result.outcome, TickOutcome::Idle);
        assert_eq!(world.tick, 0);
        assert_eq!(scene.redraws(), 0);
    }

    #[test]
    fn test_running_tick_broadcasts_to_every_player() {
        let (mut world, scene) = world_with(
            vec![Vec2::new(500.0, 500.0), Vec2::new(700.0, 500.0), Vec2::new(900.0, 500.0)],
            vec![],
        );
        world.set_running(true);

        let result = tick(&mut world, &TickConfig::default());
        let TickOutcome::Continue(updates) = result.outcome else {
            panic!("expected updates");
        };

        assert_eq!(updates.len(), 3);
        for update in &updates {
            assert_eq!(update.others.len(), 2);
            assert!(update.you.alive);
        }
        assert_eq!(updates[0].you.x, 500.0);
        assert_eq!(scene.redraws(), 1);
    }

    #[test]
    fn test_inactive_players_ignore_mailbox() {
        let (mut world, _) = world_with(vec![Vec2::new(500.0, 500.0), Vec2::new(700.0, 500.0)], vec![]);
        world.set_running(true);

        send(&world, 0, "FIRE");
        tick(&mut world, &TickConfig::default());
        assert!(world.bullets().is_empty());
    }

    #[test]
    fn test_bullets_at_far_aim_point_are_cleared() {
        let (mut world, _) = world_with(vec![Vec2::new(500.0, 500.0), Vec2::new(1100.0, 300.0)], vec![]);
        activate_all(&mut world);
        world.set_running(true);
        let config = TickConfig::default();

        send(&world, 0, "POINT_AT 3e38 3e38");
        tick(&mut world, &config);
        for _ in 0..100 {
            send(&world, 0, "FIRE");
            tick(&mut world, &config);
        }
        assert_eq!(world.bullets().len(), 100);

        // Longest flight is MAX_RANGE / BULLET_SPEED = 10s = 500 ticks
        for _ in 0..600 {
            tick(&mut world, &config);
        }
        assert!(world.bullets().is_empty());
        assert!(world.is_running());
    }

    #[test]
    fn test_fire_kills_and_ends_round() {
        let (mut world, _) = world_with(vec![Vec2::new(50.0, 50.0), Vec2::new(200.0, 50.0)], vec![]);
        activate_all(&mut world);
        world.set_running(true);

        send(&world, 0, "POINT_AT 200 50");
        tick(&mut world, &TickConfig::default());
        send(&world, 0, "FIRE");
        let result = tick(&mut world, &TickConfig::default());
        assert!(result
            .events
            .iter()
            .any(|e| matches!(e.data, GameEventData::BulletFired { owner: PlayerId(0), .. })));

        let mut outcome = TickOutcome::Idle;
        for _ in 0..20 {
            let result = tick(&mut world, &TickConfig::default());
            if let TickOutcome::GameOver(_) = result.outcome {
                assert!(result.events.iter().any(|e| matches!(
                    e.data,
                    GameEventData::PlayerHit { victim: PlayerId(1), shooter: PlayerId(0), .. }
                )));
                outcome = result.outcome;
                break;
            }
        }

        assert_eq!(outcome, TickOutcome::GameOver(GameOutcome::Winner(PlayerId(0))));
        assert_eq!(world.phase, SessionPhase::Over(GameOutcome::Winner(PlayerId(0))));
        assert!(!world.players()[1].is_alive());

        // Ended rounds stay idle
        assert_eq!(tick(&mut world, &TickConfig::default()).outcome, TickOutcome::Idle);
    }

    #[test]
    fn test_everyone_dead_is_draw() {
        let (mut world, _) = world_with(vec![Vec2::new(500.0, 500.0), Vec2::new(700.0, 500.0)], vec![]);
        world.set_running(true);
        world.kill_player(PlayerId(0));
        world.kill_player(PlayerId(1));

        let result = tick(&mut world, &TickConfig::default());
        assert_eq!(result.outcome, TickOutcome::GameOver(GameOutcome::Draw));
    }

    #[test]
    fn test_dead_players_still_receive_updates() {
        let (mut world, _) = world_with(
            vec![Vec2::new(500.0, 500.0), Vec2::new(700.0, 500.0), Vec2::new(900.0, 500.0)],
            vec![],
        );
        world.set_running(true);
        world.kill_player(PlayerId(2));

        let TickOutcome::Continue(updates) = tick(&mut world, &TickConfig::default()).outcome else {
            panic!("expected updates");
        };
        assert_eq!(updates.len(), 3);
        assert!(!updates[2].you.alive);
        assert_eq!(updates[2].others.len(), 2);
        assert_eq!(updates[0].others.len(), 1);
    }

    #[test]
    fn test_bullet_stopped_by_cover() {
        let (mut world, _) = world_with(
            vec![Vec2::new(50.0, 50.0), Vec2::new(400.0, 50.0), Vec2::new(50.0, 900.0)],
            vec![Rect::from_xywh(150.0, 0.0, 40.0, 120.0)],
        );
        activate_all(&mut world);
        world.set_running(true);

        send(&world, 0, "POINT_AT 400 50");
        tick(&mut world, &TickConfig::default());
        send(&world, 0, "FIRE");
        tick(&mut world, &TickConfig::default());

        let mut stopped = false;
        for _ in 0..20 {
            let result = tick(&mut world, &TickConfig::default());
            if result.events.iter().any(|e| matches!(e.data, GameEventData::BulletStopped { .. })) {
                stopped = true;
                break;
            }
        }
        assert!(stopped);
        assert!(world.players()[1].is_alive());
        assert!(world.bullets().is_empty());
    }

    #[test]
    fn test_fog_of_war_hides_covered_players() {
        let (mut world, _) = world_with(
            vec![Vec2::new(50.0, 50.0), Vec2::new(400.0, 50.0), Vec2::new(50.0, 900.0)],
            vec![Rect::from_xywh(150.0, 0.0, 40.0, 120.0)],
        );
        world.set_running(true);

        let config = TickConfig { fog_of_war: true, ..Default::default() };
        let TickOutcome::Continue(updates) = tick(&mut world, &config).outcome else {
            panic!("expected updates");
        };

        // Player 0 sees player 2 below but not player 1 behind the wall
        assert_eq!(updates[0].others.len(), 1);
        assert_eq!(updates[0].others[0].y, 900.0);
    }

    #[test]
    fn test_rejected_command_event() {
        let (mut world, _) = world_with(vec![Vec2::new(500.0, 500.0), Vec2::new(700.0, 500.0)], vec![]);
        activate_all(&mut world);
        world.set_running(true);

        send(&world, 1, "DANCE");
        let result = tick(&mut world, &TickConfig::default());
        assert!(result.events.iter().any(|e| matches!(
            e.data,
            GameEventData::CommandRejected { player_id: PlayerId(1), .. }
        )));
    }
}
