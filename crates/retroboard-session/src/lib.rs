//! Lobby membership and reconnection for Retroboard rooms.
//!
//! This crate handles who is in a room and how they get back in:
//!
//! 1. **Membership**: joining, capacity, host flag ([`Lobby`])
//! 2. **Durable identity**: a [`SessionId`] per member that outlives the
//!    connection it was issued on
//! 3. **Reconnection**: handing a seat to a new connection, with a grace
//!    window ([`SessionConfig::reconnect_grace`]) before a dropped member
//!    is removed
//!
//! # How it fits in the stack
//!
//! ```text
//! Room Layer (above)  ← arms grace timers, remaps game state on reconnect
//!     ↕
//! Session Layer (this crate)  ← session id ↔ connection mapping
//!     ↕
//! Protocol Layer (below)  ← provides PlayerId, LobbyPlayer
//! ```

mod error;
mod lobby;
mod session;

pub use error::SessionError;
pub use lobby::Lobby;
pub use session::{LobbyMember, Presence, SessionConfig, SessionId};
