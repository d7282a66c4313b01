//! TCP Game Server
//!
//! Async server for the line protocol. Accepts connections, binds each
//! one to a free player slot and drives the session tick loop.
//!
//! Per connection there are two tasks:
//! - reader: fixed-size reads into a [`LineFramer`]; the last complete
//!   line goes into the player's mailbox
//! - writer: drains the outbound queue onto the socket; on a close
//!   request it flushes, shuts the socket down and acknowledges

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, RwLock, broadcast};
use tokio::time::{interval, timeout, MissedTickBehavior};
use tracing::{info, warn, error, debug, trace, instrument};

use crate::config::ServerConfig;
use crate::game::events::GameEvent;
use crate::game::scene::HeadlessScene;
use crate::game::state::{PlayerId, World};
use crate::network::protocol::LineFramer;
use crate::network::session::{
    ArenaSession, LinkHandles, Outbound, SessionError, SessionStatus,
};

/// Game server errors.
#[derive(Debug, thiserror::Error)]
pub enum GameServerError {
    /// Failed to bind to address.
    #[error("Failed to bind {addr}: {source}")]
    BindFailed {
        /// Requested address
        addr: SocketAddr,
        /// Underlying error
        source: std::io::Error,
    },

    /// Socket error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Session error.
    #[error("Session error: {0}")]
    Session(#[from] SessionError),
}

/// The game server.
pub struct GameServer {
    /// Server configuration.
    config: ServerConfig,
    /// The single arena session.
    session: Arc<RwLock<ArenaSession>>,
    /// Shutdown signal.
    shutdown_tx: broadcast::Sender<()>,
}

impl GameServer {
    /// Create a server with a freshly generated world.
    pub fn new(config: ServerConfig) -> Self {
        let scene = Arc::new(HeadlessScene::new(config.world_width, config.world_height));
        let world = World::new(config.world_config(), scene);
        Self::with_world(config, world)
    }

    /// Create a server around an existing world.
    pub fn with_world(config: ServerConfig, world: World) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);
        let mut session = ArenaSession::new(world, config.tick_config());

        if config.auto_start {
            // A fresh world is paused, never over
            let _ = session.set_running(true);
        }

        Self {
            config,
            session: Arc::new(RwLock::new(session)),
            shutdown_tx,
        }
    }

    /// Bind the configured address and run until shutdown.
    #[instrument(skip(self))]
    pub async fn run(&self) -> Result<(), GameServerError> {
        let addr = self.config.bind_addr;
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| GameServerError::BindFailed { addr, source })?;

        self.run_with_listener(listener).await
    }

    /// Run on an already bound listener until shutdown.
    pub async fn run_with_listener(&self, listener: TcpListener) -> Result<(), GameServerError> {
        info!("Game server listening on {}", listener.local_addr()?);

        let tick_handle = tokio::spawn(Self::run_tick_loop(
            self.session.clone(),
            self.config.tick_interval,
            self.shutdown_tx.subscribe(),
        ));

        let mut shutdown_rx = self.shutdown_tx.subscribe();

        loop {
            tokio::select! {
                result = listener.accept() => {
                    match result {
                        Ok((stream, addr)) => self.handle_connection(stream, addr).await,
                        Err(e) => error!("Accept error: {}", e),
                    }
                }
                _ = shutdown_rx.recv() => {
                    info!("Shutdown signal received");
                    break;
                }
            }
        }

        tick_handle.abort();
        drop(listener);
        self.close_connections().await;

        Ok(())
    }

    /// Flush and close every attached connection, bounded by the grace period.
    async fn close_connections(&self) {
        let acks = self.session.write().await.close_all();
        let pending = acks.len();
        if pending == 0 {
            return;
        }

        let flushed = timeout(self.config.shutdown_grace, async {
            for ack in acks {
                let _ = ack.await;
            }
        })
        .await;

        match flushed {
            Ok(()) => info!("Closed {} connection(s)", pending),
            Err(_) => warn!(
                "Gave up waiting for connections to flush after {:?}",
                self.config.shutdown_grace
            ),
        }
    }

    /// Attach a new connection to a free slot, or refuse it.
    async fn handle_connection(&self, stream: TcpStream, addr: SocketAddr) {
        let (msg_tx, msg_rx) = mpsc::channel::<Outbound>(self.config.outbound_queue);

        let handles = match self.session.write().await.attach(addr, msg_tx) {
            Ok(handles) => handles,
            Err(e) => {
                warn!("Refusing connection from {}: {}", addr, e);
                return;
            }
        };

        info!("New connection from {} controls player {}", addr, handles.player_id);

        if let Err(e) = stream.set_nodelay(true) {
            debug!("set_nodelay failed for {}: {}", addr, e);
        }
        let (read_half, write_half) = stream.into_split();

        tokio::spawn(Self::run_writer(write_half, msg_rx, handles.player_id));
        tokio::spawn(Self::run_reader(
            read_half,
            handles,
            self.session.clone(),
            self.config.read_chunk_size,
            self.config.max_line_bytes,
        ));
    }

    /// Read loop for one connection.
    async fn run_reader(
        mut reader: OwnedReadHalf,
        handles: LinkHandles,
        session: Arc<RwLock<ArenaSession>>,
        read_chunk_size: usize,
        max_line_bytes: usize,
    ) {
        let LinkHandles { player_id, link_id, mailbox, mut closed } = handles;
        let mut framer = LineFramer::new(max_line_bytes);
        let mut chunk = vec![0u8; read_chunk_size];

        loop {
            tokio::select! {
                read = reader.read(&mut chunk) => {
                    match read {
                        Ok(0) => {
                            debug!("Player {} disconnected", player_id);
                            break;
                        }
                        Ok(n) => match framer.push_command(&chunk[..n]) {
                            Ok(Some(command)) => {
                                trace!(player = %player_id, %command, "command received");
                                if mailbox.put(command) {
                                    trace!(player = %player_id, "unapplied command overwritten");
                                }
                            }
                            Ok(None) => {}
                            Err(e) => warn!(player = %player_id, error = %e, "discarding input"),
                        },
                        Err(e) => {
                            warn!("Read error for player {}: {}", player_id, e);
                            break;
                        }
                    }
                }
                _ = closed.changed() => {
                    debug!("Session closed link {} for player {}", link_id, player_id);
                    return;
                }
            }
        }

        if let Err(e) = session.write().await.detach(player_id, link_id) {
            debug!("Detach after disconnect skipped: {}", e);
        }
    }

    /// Write loop for one connection.
    async fn run_writer(
        mut writer: OwnedWriteHalf,
        mut msg_rx: mpsc::Receiver<Outbound>,
        player_id: PlayerId,
    ) {
        let mut ack = None;

        while let Some(msg) = msg_rx.recv().await {
            match msg {
                Outbound::Line(line) => {
                    if let Err(e) = writer.write_all(line.as_bytes()).await {
                        warn!("Write error for player {}: {}", player_id, e);
                        break;
                    }
                }
                Outbound::Close(reply) => {
                    ack = reply;
                    break;
                }
            }
        }

        if let Err(e) = writer.flush().await {
            debug!("Flush failed for player {}: {}", player_id, e);
        }
        if let Err(e) = writer.shutdown().await {
            debug!("Shutdown failed for player {}: {}", player_id, e);
        }
        if let Some(ack) = ack {
            let _ = ack.send(());
        }
    }

    /// Fixed-rate tick driver.
    async fn run_tick_loop(
        session: Arc<RwLock<ArenaSession>>,
        period: Duration,
        mut shutdown_rx: broadcast::Receiver<()>,
    ) {
        let mut tick_interval = interval(period);
        tick_interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = tick_interval.tick() => {
                    session.write().await.run_tick();
                }
                _ = shutdown_rx.recv() => break,
            }
        }
    }

    // =========================================================================
    // CONTROL
    // =========================================================================

    /// Shutdown the server.
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(());
    }

    /// Start or pause the round.
    pub async fn set_running(&self, running: bool) -> Result<bool, SessionError> {
        self.session.write().await.set_running(running)
    }

    /// Flip between running and paused.
    pub async fn toggle_running(&self) -> Result<bool, SessionError> {
        self.session.write().await.toggle_running()
    }

    /// Revive everyone and pause.
    pub async fn reset_round(&self) {
        self.session.write().await.reset_round();
    }

    /// Operator summary.
    pub async fn status(&self) -> SessionStatus {
        self.session.read().await.status()
    }

    /// Receive game events from the next tick on.
    pub async fn subscribe_events(&self) -> broadcast::Receiver<GameEvent> {
        self.session.read().await.subscribe_events()
    }

    /// Shared session handle.
    pub fn session(&self) -> Arc<RwLock<ArenaSession>> {
        self.session.clone()
    }

    /// Server configuration.
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }
}
