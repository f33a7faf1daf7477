//! Session types: the durable seat a player keeps across connections.
//!
//! A lobby member is reachable through two identities:
//! - its [`SessionId`], a random token the client stores and presents
//!   again after a dropped connection;
//! - its `PlayerId`, which is the id of whatever connection currently
//!   owns the seat and therefore changes on every reconnect.

use std::fmt;
use std::time::Duration;

use rand::Rng;
use retroboard_protocol::{LobbyPlayer, PlayerId};
use tokio::time::Instant;

// ---------------------------------------------------------------------------
// SessionId
// ---------------------------------------------------------------------------

/// The reconnection anchor of a lobby member.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionId(String);

impl SessionId {
    /// A fresh 32-character hex id (128 bits of randomness).
    pub fn generate() -> Self {
        let bytes: [u8; 16] = rand::rng().random();
        Self(bytes.iter().map(|b| format!("{b:02x}")).collect())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for SessionId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for SessionId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// SessionConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// How long a disconnected durable member keeps their seat.
    ///
    /// Default: 30 seconds.
    pub reconnect_grace: Duration,

    /// Lobby capacity. Default: 20.
    pub max_members: usize,

    /// Whether members that did not bring a session id get one issued.
    /// Members without one are removed as soon as they disconnect.
    ///
    /// Default: `true`.
    pub issue_session_ids: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            reconnect_grace: Duration::from_secs(30),
            max_members: 20,
            issue_session_ids: true,
        }
    }
}

// ---------------------------------------------------------------------------
// Presence
// ---------------------------------------------------------------------------

/// Whether a member currently has a live connection.
///
/// ```text
///   Connected ──(disconnect)──→ Disconnected ──(grace timer)──→ removed
///       ↑                            │
///       └────────(reconnect)─────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Presence {
    Connected,
    Disconnected { since: Instant },
}

// ---------------------------------------------------------------------------
// LobbyMember
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LobbyMember {
    /// `None` for a member that cannot reconnect.
    pub session_id: Option<SessionId>,
    /// Id of the connection that owns the seat right now.
    pub player_id: PlayerId,
    pub name: String,
    pub avatar: u32,
    pub is_host: bool,
    pub presence: Presence,
}

impl LobbyMember {
    pub fn is_connected(&self) -> bool {
        matches!(self.presence, Presence::Connected)
    }

    /// Whether the member can come back after a dropped connection.
    pub fn is_durable(&self) -> bool {
        self.session_id.is_some()
    }

    /// How long the member has been gone, if they are.
    pub fn disconnected_for(&self) -> Option<Duration> {
        match self.presence {
            Presence::Connected => None,
            Presence::Disconnected { since } => Some(since.elapsed()),
        }
    }

    /// The row broadcast in `lobby_update`. Never carries the session id.
    pub fn view(&self) -> LobbyPlayer {
        LobbyPlayer {
            player_id: self.player_id,
            name: self.name.clone(),
            avatar: self.avatar,
            is_host: self.is_host,
            connected: self.is_connected(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_session_id_is_32_hex_chars() {
        let id = SessionId::generate();
        assert_eq!(id.as_str().len(), 32);
        assert!(id.as_str().chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_generate_session_id_is_unique() {
        assert_ne!(SessionId::generate(), SessionId::generate());
    }

    #[test]
    fn test_default_config() {
        let config = SessionConfig::default();
        assert_eq!(config.reconnect_grace, Duration::from_secs(30));
        assert_eq!(config.max_members, 20);
        assert!(config.issue_session_ids);
    }

    #[tokio::test(start_paused = true)]
    async fn test_view_hides_session_and_reports_presence() {
        let mut member = LobbyMember {
            session_id: Some("secret".into()),
            player_id: PlayerId(3),
            name: "Ada".into(),
            avatar: 2,
            is_host: false,
            presence: Presence::Connected,
        };
        assert!(member.view().connected);
        assert_eq!(member.disconnected_for(), None);

        member.presence = Presence::Disconnected {
            since: Instant::now(),
        };
        tokio::time::advance(Duration::from_secs(4)).await;
        let view = member.view();
        assert!(!view.connected);
        assert_eq!(view.player_id, PlayerId(3));
        assert_eq!(member.disconnected_for(), Some(Duration::from_secs(4)));
    }
}
