//! # Retroboard
//!
//! Authoritative server for Retroboard, a party board game played in the
//! browser: players roll, walk a generated board, answer retrospective
//! questions, and play skill-timer, duel and quiz minigames.
//!
//! The server owns all game state. Clients send intents over a WebSocket
//! and receive the sanitized state after every change.
//!
//! ```text
//! retroboard-transport   sockets, frames
//! retroboard-protocol    ClientMessage / ServerMessage / Envelope, JSON codec
//! retroboard-room        engine task: rooms, lobby, timers
//! retroboard-session     membership and reconnection seats
//! retroboard-timer       cancellable room timers, server clock
//! retroboard-game        board, turn machine, minigames
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use retroboard::prelude::*;
//!
//! # async fn run() -> Result<(), RetroboardError> {
//! let server = RetroboardServerBuilder::new()
//!     .bind("0.0.0.0:3001")
//!     .build()
//!     .await?;
//! server.run().await
//! # }
//! ```

mod error;
mod handler;
mod server;

pub use error::RetroboardError;
pub use server::{RetroboardServer, RetroboardServerBuilder, DEFAULT_BIND_ADDR};

/// Everything needed to configure and run a server.
pub mod prelude {
    pub use crate::{RetroboardError, RetroboardServer, RetroboardServerBuilder};
    pub use retroboard_protocol::{ClientMessage, Envelope, PlayerId, ServerMessage};
    pub use retroboard_room::{EngineHandle, RoomConfig};
    pub use retroboard_session::SessionConfig;
}
