//! Error types for the room layer.
//!
//! Two kinds of failure travel through here. User-facing ones (unknown
//! room, full room, game already running) are sent back to the requesting
//! connection as `error_msg`, with the `Display` text as the message.
//! Everything else is a refused action: it is logged and dropped.

use retroboard_game::Rejection;
use retroboard_protocol::PlayerId;
use retroboard_session::SessionError;

/// Errors that can occur during room operations.
#[derive(Debug, thiserror::Error)]
pub enum RoomError {
    /// No live room has the requested code.
    #[error("Room not found")]
    NotFound,

    /// Joining is only possible while the room is in its lobby.
    #[error("Game already started")]
    AlreadyStarted,

    /// Lobby membership failed (full, unknown session, ...).
    #[error(transparent)]
    Session(#[from] SessionError),

    /// The connection is not attached to any room.
    #[error("player {0} is not in a room")]
    NotInRoom(PlayerId),

    /// A host-only action from someone else.
    #[error("player {0} is not the host")]
    NotHost(PlayerId),

    /// The game engine refused the transition.
    #[error("action rejected: {0}")]
    Rejected(#[from] Rejection),

    /// The engine task has stopped.
    #[error("room engine is unavailable")]
    Unavailable,
}

impl RoomError {
    /// Whether the requesting client should be told about this error.
    pub fn is_user_facing(&self) -> bool {
        matches!(self, Self::NotFound | Self::AlreadyStarted | Self::Session(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_facing_messages() {
        assert_eq!(RoomError::NotFound.to_string(), "Room not found");
        assert_eq!(RoomError::AlreadyStarted.to_string(), "Game already started");
        assert_eq!(
            RoomError::from(SessionError::RoomFull(20)).to_string(),
            "Room is full (20 players max)"
        );
        assert_eq!(
            RoomError::from(SessionError::NotFound).to_string(),
            "Session not found"
        );
    }

    #[test]
    fn test_rejections_stay_silent() {
        assert!(RoomError::NotFound.is_user_facing());
        assert!(RoomError::from(SessionError::SessionInUse).is_user_facing());
        assert!(!RoomError::from(Rejection::NotYourTurn).is_user_facing());
        assert!(!RoomError::NotHost(PlayerId(1)).is_user_facing());
        assert!(!RoomError::NotInRoom(PlayerId(1)).is_user_facing());
    }
}
