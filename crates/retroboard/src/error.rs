//! Unified error type for the server.

use retroboard_protocol::ProtocolError;
use retroboard_room::RoomError;
use retroboard_session::SessionError;
use retroboard_transport::TransportError;

/// Top-level error wrapping every layer's error.
///
/// `#[from]` on each variant lets `?` convert layer errors directly.
#[derive(Debug, thiserror::Error)]
pub enum RetroboardError {
    /// Binding, accepting, or moving frames failed.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Encoding or decoding a message failed.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error(transparent)]
    Session(#[from] SessionError),

    /// The room engine refused a request or is gone.
    #[error(transparent)]
    Room(#[from] RoomError),
}
