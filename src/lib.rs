//! # Sightline Game Server
//!
//! Authoritative server for a top-down arena shooter where line of sight
//! is the whole game. Bots connect over TCP, steer with text commands and
//! receive one JSON update per tick.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    SIGHTLINE SERVER                          │
//! ├─────────────────────────────────────────────────────────────┤
//! │  core/           - Pure math                                 │
//! │  ├── vec2.rs     - 2D float vector                           │
//! │  ├── geometry.rs - Rects, rays, visibility polygon           │
//! │  └── rng.rs      - Seeded PRNG                               │
//! │                                                              │
//! │  game/           - Simulation                                │
//! │  ├── arena.rs    - Obstacle field                            │
//! │  ├── movement.rs - Hit-box and move validation               │
//! │  ├── input.rs    - Commands and mailbox                      │
//! │  ├── bullet.rs   - Projectile state machine                  │
//! │  ├── player.rs   - Player slots                              │
//! │  ├── state.rs    - World and session phase                   │
//! │  ├── tick.rs     - One simulation step                       │
//! │  └── scene.rs    - Presentation hooks                        │
//! │                                                              │
//! │  network/        - TCP line protocol                         │
//! │  ├── server.rs   - Accept loop and tick driver               │
//! │  ├── protocol.rs - Line framing and update messages          │
//! │  └── session.rs  - Connection to player binding              │
//! │                                                              │
//! │  config.rs       - Environment configuration                 │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Protocol
//!
//! Client lines: `NAME <name>`, `POINT_AT <x> <y>`, `FIRE`,
//! `FORWARD`, `BACKWARD`, `STRAFE_LEFT`, `STRAFE_RIGHT`. Only the last
//! complete line received before a tick is applied.
//!
//! Server lines: `{"type":"update","you":{..},"world":{"others":[..]}}`.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod core;
pub mod game;
pub mod network;
pub mod config;

// Re-export commonly used types
pub use crate::core::vec2::Vec2;
pub use crate::core::geometry::Rect;
pub use crate::core::rng::SeededRng;
pub use config::{ServerConfig, ConfigError};
pub use game::state::{World, WorldConfig, PlayerId, SessionPhase};
pub use network::server::{GameServer, GameServerError};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default tick interval in milliseconds
pub const TICK_INTERVAL_MS: u64 = 20;

/// Default listen port
pub const DEFAULT_PORT: u16 = 1337;
