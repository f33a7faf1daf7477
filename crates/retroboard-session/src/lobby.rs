//! The lobby: every member of one room, connected or not.
//!
//! The lobby is the only place that knows how a durable [`SessionId`]
//! maps onto the transient `PlayerId` of a connection. Reconnecting
//! rewrites that mapping here; the room layer then remaps the same pair
//! across the game state.
//!
//! Like the rest of a room, a `Lobby` is owned by the engine task and is
//! never shared, so it is a plain `Vec` in join order (join order is also
//! turn order when the game starts).

use retroboard_protocol::{LobbyPlayer, PlayerId};
use tokio::time::Instant;

use crate::{LobbyMember, Presence, SessionConfig, SessionError, SessionId};

/// Members of one room.
#[derive(Debug, Clone)]
pub struct Lobby {
    members: Vec<LobbyMember>,
    config: SessionConfig,
}

impl Lobby {
    pub fn new(config: SessionConfig) -> Self {
        Self {
            members: Vec::new(),
            config,
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Adds a connected member.
    ///
    /// Returns the session id the member will reconnect with: the one
    /// they supplied, a freshly generated one when the lobby issues ids,
    /// or `None` for a non-durable member.
    ///
    /// # Errors
    /// - [`SessionError::RoomFull`] when the lobby is at capacity
    /// - [`SessionError::SessionInUse`] when another member holds the id
    pub fn add(
        &mut self,
        player_id: PlayerId,
        name: String,
        avatar: u32,
        session_id: Option<SessionId>,
        is_host: bool,
    ) -> Result<Option<SessionId>, SessionError> {
        if self.is_full() {
            return Err(SessionError::RoomFull(self.config.max_members));
        }
        if let Some(id) = &session_id {
            if self.find_session(id).is_some() {
                return Err(SessionError::SessionInUse);
            }
        }

        let session_id = match session_id {
            Some(id) => Some(id),
            None if self.config.issue_session_ids => Some(SessionId::generate()),
            None => None,
        };

        self.members.push(LobbyMember {
            session_id: session_id.clone(),
            player_id,
            name,
            avatar,
            is_host,
            presence: Presence::Connected,
        });

        tracing::info!(
            %player_id,
            durable = session_id.is_some(),
            members = self.members.len(),
            "member joined lobby"
        );
        Ok(session_id)
    }

    pub fn find_session(&self, session_id: &SessionId) -> Option<&LobbyMember> {
        self.members
            .iter()
            .find(|m| m.session_id.as_ref() == Some(session_id))
    }

    pub fn member(&self, player_id: PlayerId) -> Option<&LobbyMember> {
        self.members.iter().find(|m| m.player_id == player_id)
    }

    pub fn member_mut(&mut self, player_id: PlayerId) -> Option<&mut LobbyMember> {
        self.members.iter_mut().find(|m| m.player_id == player_id)
    }

    /// Marks a member as disconnected and starts their grace window.
    ///
    /// # Errors
    /// Returns [`SessionError::UnknownPlayer`] if the connection is not a
    /// member.
    pub fn disconnect(&mut self, player_id: PlayerId) -> Result<&LobbyMember, SessionError> {
        let member = self
            .member_mut(player_id)
            .ok_or(SessionError::UnknownPlayer(player_id))?;
        member.presence = Presence::Disconnected {
            since: Instant::now(),
        };
        tracing::info!(%player_id, durable = member.is_durable(), "member disconnected");
        Ok(member)
    }

    /// Hands a member's seat to a new connection.
    ///
    /// Returns the `PlayerId` the seat had before, which the caller must
    /// remap everywhere else. A seat whose old connection is still open
    /// is taken over.
    ///
    /// # Errors
    /// Returns [`SessionError::NotFound`] if no member holds `session_id`.
    pub fn reconnect(
        &mut self,
        session_id: &SessionId,
        new_player: PlayerId,
    ) -> Result<PlayerId, SessionError> {
        let member = self
            .members
            .iter_mut()
            .find(|m| m.session_id.as_ref() == Some(session_id))
            .ok_or(SessionError::NotFound)?;

        let previous = member.player_id;
        member.player_id = new_player;
        member.presence = Presence::Connected;

        tracing::info!(from = %previous, to = %new_player, "member reconnected");
        Ok(previous)
    }

    /// Removes a member for good.
    pub fn remove(&mut self, player_id: PlayerId) -> Option<LobbyMember> {
        let index = self.members.iter().position(|m| m.player_id == player_id)?;
        let member = self.members.remove(index);
        tracing::info!(%player_id, members = self.members.len(), "member removed from lobby");
        Some(member)
    }

    /// Whether a grace timer armed for `(session_id, player_id)` should
    /// still remove the member: the seat exists, is still owned by the
    /// same connection, and that connection has not come back.
    pub fn still_disconnected(&self, session_id: &SessionId, player_id: PlayerId) -> bool {
        self.find_session(session_id)
            .is_some_and(|m| m.player_id == player_id && !m.is_connected())
    }

    /// Makes `host` the only member flagged as host.
    pub fn set_host(&mut self, host: Option<PlayerId>) {
        for member in &mut self.members {
            member.is_host = Some(member.player_id) == host;
        }
    }

    pub fn host(&self) -> Option<&LobbyMember> {
        self.members.iter().find(|m| m.is_host)
    }

    pub fn members(&self) -> &[LobbyMember] {
        &self.members
    }

    /// Members with a live connection, in join order.
    pub fn connected(&self) -> impl Iterator<Item = &LobbyMember> {
        self.members.iter().filter(|m| m.is_connected())
    }

    /// The `lobby_update` payload.
    pub fn views(&self) -> Vec<LobbyPlayer> {
        self.members.iter().map(LobbyMember::view).collect()
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.members.len() >= self.config.max_members
    }
}

impl Default for Lobby {
    fn default() -> Self {
        Self::new(SessionConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    fn pid(n: u64) -> PlayerId {
        PlayerId(n)
    }

    fn lobby_with(config: SessionConfig) -> Lobby {
        Lobby::new(config)
    }

    fn join(lobby: &mut Lobby, n: u64, session: Option<&str>) -> Option<SessionId> {
        lobby
            .add(pid(n), format!("P{n}"), 0, session.map(SessionId::from), n == 1)
            .unwrap()
    }

    #[test]
    fn test_add_issues_session_id_when_missing() {
        let mut lobby = Lobby::default();
        let issued = join(&mut lobby, 1, None).unwrap();
        assert_eq!(issued.as_str().len(), 32);
        assert_eq!(lobby.find_session(&issued).unwrap().player_id, pid(1));
    }

    #[test]
    fn test_add_keeps_supplied_session_id() {
        let mut lobby = Lobby::default();
        let id = join(&mut lobby, 1, Some("abc"));
        assert_eq!(id, Some(SessionId::from("abc")));
    }

    #[test]
    fn test_add_without_issuing_creates_non_durable_member() {
        let mut lobby = lobby_with(SessionConfig {
            issue_session_ids: false,
            ..SessionConfig::default()
        });
        assert_eq!(join(&mut lobby, 1, None), None);
        assert!(!lobby.member(pid(1)).unwrap().is_durable());
    }

    #[test]
    fn test_add_rejects_when_full() {
        let mut lobby = lobby_with(SessionConfig {
            max_members: 2,
            ..SessionConfig::default()
        });
        join(&mut lobby, 1, None);
        join(&mut lobby, 2, None);
        let err = lobby.add(pid(3), "P3".into(), 0, None, false).unwrap_err();
        assert_eq!(err, SessionError::RoomFull(2));
        assert_eq!(err.to_string(), "Room is full (2 players max)");
        assert!(lobby.is_full());
    }

    #[test]
    fn test_add_rejects_duplicate_session() {
        let mut lobby = Lobby::default();
        join(&mut lobby, 1, Some("dup"));
        let err = lobby
            .add(pid(2), "P2".into(), 0, Some("dup".into()), false)
            .unwrap_err();
        assert_eq!(err, SessionError::SessionInUse);
        assert_eq!(lobby.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_disconnect_then_reconnect_moves_seat() {
        let mut lobby = Lobby::default();
        let session = join(&mut lobby, 1, None).unwrap();
        join(&mut lobby, 2, None);

        lobby.disconnect(pid(1)).unwrap();
        assert!(!lobby.member(pid(1)).unwrap().is_connected());
        assert_eq!(lobby.connected().count(), 1);

        tokio::time::advance(Duration::from_secs(5)).await;
        let previous = lobby.reconnect(&session, pid(7)).unwrap();
        assert_eq!(previous, pid(1));
        assert!(lobby.member(pid(1)).is_none());

        let member = lobby.member(pid(7)).unwrap();
        assert!(member.is_connected());
        assert!(member.is_host);
        // Seat keeps its place in join order.
        assert_eq!(lobby.members()[0].player_id, pid(7));
    }

    #[test]
    fn test_reconnect_unknown_session() {
        let mut lobby = Lobby::default();
        join(&mut lobby, 1, None);
        let err = lobby.reconnect(&"nope".into(), pid(9)).unwrap_err();
        assert_eq!(err, SessionError::NotFound);
        assert_eq!(err.to_string(), "Session not found");
    }

    #[test]
    fn test_reconnect_takes_over_connected_seat() {
        let mut lobby = Lobby::default();
        let session = join(&mut lobby, 1, None).unwrap();
        assert_eq!(lobby.reconnect(&session, pid(4)).unwrap(), pid(1));
        assert_eq!(lobby.len(), 1);
    }

    #[test]
    fn test_disconnect_unknown_player() {
        let mut lobby = Lobby::default();
        assert_eq!(
            lobby.disconnect(pid(5)).unwrap_err(),
            SessionError::UnknownPlayer(pid(5))
        );
    }

    #[test]
    fn test_still_disconnected_tracks_connection() {
        let mut lobby = Lobby::default();
        let session = join(&mut lobby, 1, None).unwrap();
        lobby.disconnect(pid(1)).unwrap();
        assert!(lobby.still_disconnected(&session, pid(1)));

        // Came back and dropped again under a new connection: the timer
        // armed for the first connection no longer applies.
        lobby.reconnect(&session, pid(2)).unwrap();
        assert!(!lobby.still_disconnected(&session, pid(1)));
        lobby.disconnect(pid(2)).unwrap();
        assert!(!lobby.still_disconnected(&session, pid(1)));
        assert!(lobby.still_disconnected(&session, pid(2)));

        lobby.remove(pid(2));
        assert!(!lobby.still_disconnected(&session, pid(2)));
    }

    #[test]
    fn test_set_host_is_exclusive() {
        let mut lobby = Lobby::default();
        join(&mut lobby, 1, None);
        join(&mut lobby, 2, None);
        lobby.set_host(Some(pid(2)));
        assert_eq!(lobby.host().unwrap().player_id, pid(2));
        assert_eq!(lobby.members().iter().filter(|m| m.is_host).count(), 1);

        lobby.set_host(None);
        assert!(lobby.host().is_none());
    }

    #[test]
    fn test_views_follow_join_order() {
        let mut lobby = Lobby::default();
        join(&mut lobby, 1, None);
        join(&mut lobby, 2, None);
        join(&mut lobby, 3, None);
        lobby.remove(pid(2));

        let views = lobby.views();
        let ids: Vec<_> = views.iter().map(|v| v.player_id).collect();
        assert_eq!(ids, vec![pid(1), pid(3)]);
        assert!(views[0].is_host);
    }
}
