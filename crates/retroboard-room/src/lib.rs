//! Rooms for Retroboard.
//!
//! All rooms live in one [`RoomManager`], owned by a single engine task
//! ([`spawn_engine`]). Connection handlers talk to it through an
//! [`EngineHandle`]; fired room timers come back to the same task, so
//! every mutation of every room happens in one place, one at a time.
//!
//! # Key types
//!
//! - [`RoomManager`]: registry, lobby entry points, message routing
//! - [`Room`]: one room's lobby, game and timers
//! - [`RoomTimer`] / [`TimerKind`]: what a scheduled step will do
//! - [`EngineHandle`]: send commands to the running engine
//! - [`RoomConfig`]: rounds, board shape, timings, capacity
//!
//! ```text
//! handler ──EngineCommand──→ engine task ──→ RoomManager ──→ Room ──→ GameState
//!                                 ↑                           │
//!                                 └──── Fired<RoomTimer> ─────┘ (TimerSet)
//! ```

mod config;
mod engine;
mod error;
mod manager;
mod room;

pub use config::RoomConfig;
pub use engine::{spawn_engine, EngineHandle};
pub use error::RoomError;
pub use manager::{Outbound, RoomManager, HOST_LEFT_MESSAGE};
pub use room::{Outbox, Recipient, Room, RoomCode, RoomTimer, TimerKind};
