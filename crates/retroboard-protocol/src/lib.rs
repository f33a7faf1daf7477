//! Wire protocol for Retroboard.
//!
//! - **Types** ([`ClientMessage`], [`ServerMessage`], [`Envelope`]): what
//!   travels between browser and server.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]): how those messages become
//!   bytes.
//! - **Errors** ([`ProtocolError`]): what can go wrong doing so.
//!
//! The protocol layer knows nothing about connections or rooms. Game views
//! such as [`GameSnapshot`](retroboard_game::GameSnapshot) come straight
//! from the engine crate.
//!
//! ```text
//! Transport (text frames) → Protocol (ClientMessage) → Room engine
//! Room engine → Protocol (Envelope) → Transport
//! ```

mod codec;
mod error;
mod types;

pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::ProtocolError;
pub use types::{ClientMessage, Envelope, LobbyPlayer, MinigameSummary, ServerMessage};

pub use retroboard_game::PlayerId;
