//! Error types for the session layer.
//!
//! The `Display` text of these errors is what a client sees in
//! `error_msg`, so it is written for players, not for logs.

/// Errors that can occur while joining or reconnecting to a lobby.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    /// The lobby already holds `max_members` members.
    #[error("Room is full ({0} players max)")]
    RoomFull(usize),

    /// No member holds the session id the client presented.
    #[error("Session not found")]
    NotFound,

    /// The session id is already taken by another member.
    #[error("Session already in use")]
    SessionInUse,

    /// The connection is not a member of this lobby.
    #[error("Player {0} is not in this room")]
    UnknownPlayer(retroboard_protocol::PlayerId),
}
