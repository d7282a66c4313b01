//! Arena Session
//!
//! Binds client connections to player slots and drives the world one
//! tick at a time. The session owns the [`World`] plus one
//! [`PlayerLink`] per attached client; the network server wraps it in
//! `Arc<RwLock<_>>` and shares it between the tick loop and the
//! connection tasks.
//!
//! Outbound traffic goes through a bounded queue per link so a slow
//! client can never stall the tick loop: when the queue is full the
//! update is dropped for that client only.
//!
//! Game events from every tick are logged and published on a broadcast
//! channel; subscribers that fall behind miss the oldest events.

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio::sync::mpsc::error::TrySendError;

use crate::game::events::{GameEvent, GameEventData, GameOutcome};
use crate::game::input::Mailbox;
use crate::game::state::{PlayerId, SessionPhase, World};
use crate::game::tick::{tick, TickConfig, TickOutcome, TickResult, WorldUpdate};
use crate::network::protocol::ServerMessage;

/// Events buffered per subscriber before the oldest are dropped.
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Identifies one accepted connection. Never reused within a session.
pub type LinkId = u64;

/// Item on a connection's outbound queue.
#[derive(Debug)]
pub enum Outbound {
    /// A serialized, newline-terminated message.
    Line(String),
    /// Flush, shut down the socket, then acknowledge if asked to.
    Close(Option<oneshot::Sender<()>>),
}

/// Session-side half of an attached connection.
#[derive(Debug)]
pub struct PlayerLink {
    /// Connection id
    pub link_id: LinkId,
    /// Remote address
    pub peer: SocketAddr,
    sender: mpsc::Sender<Outbound>,
    closed: watch::Sender<bool>,
}

/// Connection-side handles returned by [`ArenaSession::attach`].
#[derive(Debug)]
pub struct LinkHandles {
    /// Slot the connection controls
    pub player_id: PlayerId,
    /// Connection id, needed to detach
    pub link_id: LinkId,
    /// Where incoming commands go
    pub mailbox: Arc<Mailbox>,
    /// Flips to true when the session drops the link
    pub closed: watch::Receiver<bool>,
}

/// Summary for operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionStatus {
    /// Current phase
    pub phase: SessionPhase,
    /// Ticks simulated this round
    pub tick: u64,
    /// Player slots
    pub slots: usize,
    /// Living players
    pub alive: usize,
    /// Attached clients
    pub connected: usize,
}

/// Session errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    /// Every living player already has a client.
    #[error("no free player slot")]
    NoFreeSlot,

    /// No such player slot.
    #[error("unknown player {0}")]
    UnknownPlayer(PlayerId),

    /// The slot is held by a different connection, or by none.
    #[error("link {link_id} no longer holds player {player_id}")]
    StaleLink {
        /// Slot named by the caller
        player_id: PlayerId,
        /// Connection named by the caller
        link_id: LinkId,
    },

    /// The round ended; reset before starting again.
    #[error("round is over")]
    RoundOver,
}

/// A running arena with its attached clients.
pub struct ArenaSession {
    world: World,
    links: BTreeMap<PlayerId, PlayerLink>,
    tick_config: TickConfig,
    next_link_id: LinkId,
    events: broadcast::Sender<GameEvent>,
}

impl ArenaSession {
    /// Create a session around a world.
    pub fn new(world: World, tick_config: TickConfig) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            world,
            links: BTreeMap::new(),
            tick_config,
            next_link_id: 0,
            events,
        }
    }

    /// Receive every game event from the next tick on.
    pub fn subscribe_events(&self) -> broadcast::Receiver<GameEvent> {
        self.events.subscribe()
    }

    // =========================================================================
    // LINKS
    // =========================================================================

    /// Attach a connection to the first living player without a client.
    pub fn attach(
        &mut self,
        peer: SocketAddr,
        sender: mpsc::Sender<Outbound>,
    ) -> Result<LinkHandles, SessionError> {
        let player_id = self.world.free_slot().ok_or(SessionError::NoFreeSlot)?;
        let player = self
            .world
            .player_mut(player_id)
            .ok_or(SessionError::NoFreeSlot)?;

        player.set_active(true);
        let mailbox = player.mailbox();

        let link_id = self.next_link_id;
        self.next_link_id += 1;

        let (closed_tx, closed_rx) = watch::channel(false);
        self.links.insert(
            player_id,
            PlayerLink {
                link_id,
                peer,
                sender,
                closed: closed_tx,
            },
        );

        tracing::info!(player = %player_id, link = link_id, %peer, "client attached");

        Ok(LinkHandles {
            player_id,
            link_id,
            mailbox,
            closed: closed_rx,
        })
    }

    /// Detach a connection after read failure or EOF.
    ///
    /// Fails with [`SessionError::StaleLink`] if the slot is now held by
    /// a different link; the current holder is left alone.
    pub fn detach(&mut self, player_id: PlayerId, link_id: LinkId) -> Result<(), SessionError> {
        if self.world.player(player_id).is_none() {
            return Err(SessionError::UnknownPlayer(player_id));
        }
        match self.links.get(&player_id) {
            Some(link) if link.link_id == link_id => {
                self.drop_link(player_id);
                Ok(())
            }
            _ => Err(SessionError::StaleLink { player_id, link_id }),
        }
    }

    fn drop_link(&mut self, player_id: PlayerId) -> Option<PlayerLink> {
        let link = self.links.remove(&player_id)?;
        let _ = link.closed.send(true);

        if let Some(player) = self.world.player_mut(player_id) {
            player.set_active(false);
        }

        tracing::info!(player = %player_id, link = link.link_id, peer = %link.peer, "client detached");
        Some(link)
    }

    /// Ask every writer to flush and close. Returns one receiver per
    /// writer that accepted the request; each fires once its socket is shut.
    pub fn close_all(&mut self) -> Vec<oneshot::Receiver<()>> {
        let ids: Vec<PlayerId> = self.links.keys().copied().collect();
        let mut acks = Vec::with_capacity(ids.len());

        for player_id in ids {
            let Some(link) = self.drop_link(player_id) else {
                continue;
            };
            let (ack_tx, ack_rx) = oneshot::channel();
            match link.sender.try_send(Outbound::Close(Some(ack_tx))) {
                Ok(()) => acks.push(ack_rx),
                Err(e) => {
                    tracing::debug!(player = %player_id, error = %e, "close request not queued");
                }
            }
        }

        acks
    }

    // =========================================================================
    // TICK
    // =========================================================================

    /// Run one tick and deliver its results.
    ///
    /// Updates go to every attached client. When the round ends, every
    /// client is detached.
    pub fn run_tick(&mut self) -> TickResult {
        let result = tick(&mut self.world, &self.tick_config);

        for event in &result.events {
            log_event(event);
            // No subscribers is fine
            let _ = self.events.send(event.clone());
        }

        match &result.outcome {
            TickOutcome::Idle => {}
            TickOutcome::Continue(updates) => self.broadcast(updates),
            TickOutcome::GameOver(outcome) => {
                match outcome {
                    GameOutcome::Draw => tracing::info!(tick = self.world.tick, "game over: draw"),
                    GameOutcome::Winner(id) => {
                        tracing::info!(tick = self.world.tick, winner = %id, "game over")
                    }
                }
                let ids: Vec<PlayerId> = self.links.keys().copied().collect();
                for player_id in ids {
                    self.drop_link(player_id);
                }
            }
        }

        result
    }

    fn broadcast(&mut self, updates: &[WorldUpdate]) {
        let mut gone = Vec::new();

        for update in updates {
            let Some(link) = self.links.get(&update.recipient) else {
                continue;
            };

            let line = match ServerMessage::from(update.clone()).to_line() {
                Ok(line) => line,
                Err(e) => {
                    tracing::error!(player = %update.recipient, error = %e, "failed to serialize update");
                    continue;
                }
            };

            match link.sender.try_send(Outbound::Line(line)) {
                Ok(()) => {}
                Err(TrySendError::Full(_)) => {
                    tracing::debug!(player = %update.recipient, "outbound queue full, update dropped");
                }
                Err(TrySendError::Closed(_)) => gone.push(update.recipient),
            }
        }

        for player_id in gone {
            tracing::warn!(player = %player_id, "writer gone");
            self.drop_link(player_id);
        }
    }

    // =========================================================================
    // CONTROL
    // =========================================================================

    /// Start or pause the round. Returns true if the phase changed.
    pub fn set_running(&mut self, running: bool) -> Result<bool, SessionError> {
        if matches!(self.world.phase, SessionPhase::Over(_)) {
            return if running { Err(SessionError::RoundOver) } else { Ok(false) };
        }
        let changed = self.world.set_running(running);
        if changed {
            tracing::info!(phase = %self.world.phase, "phase changed");
        }
        Ok(changed)
    }

    /// Flip between running and paused. Returns whether it is now running.
    pub fn toggle_running(&mut self) -> Result<bool, SessionError> {
        if matches!(self.world.phase, SessionPhase::Over(_)) {
            return Err(SessionError::RoundOver);
        }
        let running = self.world.toggle_running();
        tracing::info!(phase = %self.world.phase, "phase toggled");
        Ok(running)
    }

    /// Start a fresh round; attached clients keep their slots.
    pub fn reset_round(&mut self) {
        self.world.reset_round();
    }

    /// Current phase.
    pub fn phase(&self) -> SessionPhase {
        self.world.phase
    }

    /// Operator summary.
    pub fn status(&self) -> SessionStatus {
        SessionStatus {
            phase: self.world.phase,
            tick: self.world.tick,
            slots: self.world.players().len(),
            alive: self.world.alive_count(),
            connected: self.links.len(),
        }
    }

    /// Number of attached clients.
    pub fn connected_count(&self) -> usize {
        self.links.len()
    }

    /// The simulated world.
    pub fn world(&self) -> &World {
        &self.world
    }

    /// The simulated world, mutable.
    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }
}

fn log_event(event: &GameEvent) {
    match &event.data {
        GameEventData::BulletFired { bullet_id, owner, target, .. } => {
            tracing::debug!(tick = event.tick, bullet = %bullet_id, owner = %owner, %target, "bullet fired");
        }
        GameEventData::BulletExpired { bullet_id } => {
            tracing::trace!(tick = event.tick, bullet = %bullet_id, "bullet expired");
        }
        GameEventData::BulletStopped { bullet_id, position } => {
            tracing::trace!(tick = event.tick, bullet = %bullet_id, %position, "bullet stopped by cover");
        }
        GameEventData::PlayerHit { .. } | GameEventData::GameOver { .. } => {}
        GameEventData::CommandRejected { player_id, reason } => {
            tracing::debug!(tick = event.tick, player = %player_id, %reason, "command rejected");
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
