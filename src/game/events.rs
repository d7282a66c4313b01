//! Game Events
//!
//! Events generated during a tick. The session logs them and forwards
//! them to event subscribers.

use serde::{Serialize, Deserialize};
use crate::core::vec2::Vec2;
use crate::game::state::{BulletId, PlayerId};

/// How a round ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "result", content = "player", rename_all = "snake_case")]
pub enum GameOutcome {
    /// Nobody is left alive.
    Draw,
    /// Exactly one player is left alive.
    Winner(PlayerId),
}

/// Game event data.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum GameEventData {
    /// A player fired
    BulletFired {
        /// New bullet
        bullet_id: BulletId,
        /// Shooter
        owner: PlayerId,
        /// Muzzle position
        origin: Vec2,
        /// Aim point
        target: Vec2,
    },

    /// Bullet reached the end of its flight
    BulletExpired {
        /// Finished bullet
        bullet_id: BulletId,
    },

    /// Bullet crossed a cover boundary
    BulletStopped {
        /// Stopped bullet
        bullet_id: BulletId,
        /// Where it crossed
        position: Vec2,
    },

    /// Bullet hit a player, who dies
    PlayerHit {
        /// Player killed
        victim: PlayerId,
        /// Bullet owner
        shooter: PlayerId,
        /// Bullet that hit
        bullet_id: BulletId,
    },

    /// A mailbox command was rejected
    CommandRejected {
        /// Sender of the command
        player_id: PlayerId,
        /// Why it was rejected
        reason: String,
    },

    /// Round ended
    GameOver {
        /// Draw or winner
        outcome: GameOutcome,
    },
}

/// A game event stamped with the tick it happened on.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GameEvent {
    /// Tick when event occurred
    pub tick: u64,

    /// Event data
    pub data: GameEventData,
}

impl GameEvent {
    /// Create a new event.
    pub fn new(tick: u64, data: GameEventData) -> Self {
        Self { tick, data }
    }

    /// Player the event is about, if any.
    pub fn player_id(&self) -> Option<PlayerId> {
        match &self.data {
            GameEventData::BulletFired { owner, .. } => Some(*owner),
            GameEventData::PlayerHit { victim, .. } => Some(*victim),
            GameEventData::CommandRejected { player_id, .. } => Some(*player_id),
            GameEventData::GameOver { outcome: GameOutcome::Winner(id) } => Some(*id),
            _ => None,
        }
    }
}
