//! Game Logic Module
//!
//! The simulation: no sockets, no clocks. The network layer feeds it
//! mailbox commands and calls [`tick::tick`] on a fixed interval.
//!
//! ## Module Structure
//!
//! - `arena`: Obstacle field and spawn sampling
//! - `movement`: Hit-boxes and move validation
//! - `input`: Command vocabulary and the per-player mailbox
//! - `bullet`: Projectile state machine
//! - `player`: Player slots
//! - `state`: World state, ids and session phase
//! - `tick`: One simulation step
//! - `scene`: Presentation hooks
//! - `events`: Game events

pub mod arena;
pub mod movement;
pub mod input;
pub mod bullet;
pub mod player;
pub mod state;
pub mod tick;
pub mod scene;
pub mod events;

// Re-export key types
pub use arena::Arena;
pub use input::{Command, CommandError, CommandLine, Mailbox, Motion};
pub use bullet::{Bullet, BulletState};
pub use player::{Player, PlayerSnapshot, CommandEffect};
pub use state::{World, WorldConfig, PlayerId, BulletId, SessionPhase};
pub use tick::{TickConfig, TickOutcome, TickResult, WorldUpdate};
pub use scene::{SceneHooks, HeadlessScene};
pub use events::{GameEvent, GameEventData, GameOutcome};
