//! Network Layer
//!
//! TCP line protocol on top of the simulation. Nothing in here decides
//! game rules; it moves bytes into mailboxes and updates out to sockets.

pub mod protocol;
pub mod session;
pub mod server;

pub use protocol::{FrameError, LineFramer, ServerMessage, WorldView};
pub use session::{
    ArenaSession, LinkHandles, LinkId, Outbound, PlayerLink, SessionError, SessionStatus,
};
pub use server::{GameServer, GameServerError};
