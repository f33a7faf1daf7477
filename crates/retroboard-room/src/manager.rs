//! Room manager: the registry of rooms and of who is attached where.
//!
//! This is the entry point for everything a connection does. It owns:
//! - every live [`Room`], keyed by its code;
//! - which room each connection is attached to (at most one);
//! - the outbound channel of each connection.
//!
//! Lobby traffic (create, join, reconnect, leave) and connection drops are
//! handled here because they can create or close rooms. In-game actions
//! and fired timers are handed to the room they belong to; the messages a
//! room produces come back as an [`Outbox`] and are delivered here,
//! followed by the `lobby_update` / `state_update` pair.
//!
//! `RoomManager` is not shared. It lives inside the engine task (see
//! [`spawn_engine`](crate::spawn_engine)), which is what serializes every
//! room mutation.

use std::collections::HashMap;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use retroboard_game::GamePhase;
use retroboard_protocol::{ClientMessage, PlayerId, ServerMessage};
use retroboard_session::{SessionError, SessionId};
use retroboard_timer::{Clock, Fired};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::room::{Departure, Outbox, Recipient, Room, RoomCode, RoomTimer, TimerKind};
use crate::{RoomConfig, RoomError};

/// Sent to everyone still attached when the host is removed.
pub const HOST_LEFT_MESSAGE: &str = "Host left the room";

/// Channel sender for delivering outbound messages to a connection.
pub type Outbound = mpsc::UnboundedSender<ServerMessage>;

/// Manages all live rooms and the connections attached to them.
pub struct RoomManager {
    config: RoomConfig,
    clock: Clock,
    rooms: HashMap<RoomCode, Room>,

    /// Maps each connection to the room it is attached to.
    /// A connection is in at most ONE room at a time.
    memberships: HashMap<PlayerId, RoomCode>,

    /// Outbound channel of every open connection.
    connections: HashMap<PlayerId, Outbound>,

    /// Handed to each room's timer set; the engine reads the other end.
    timer_tx: mpsc::UnboundedSender<Fired<RoomTimer>>,

    /// Seeds room codes and each room's own generator.
    rng: StdRng,
}

impl RoomManager {
    pub fn new(
        config: RoomConfig,
        clock: Clock,
        timer_tx: mpsc::UnboundedSender<Fired<RoomTimer>>,
    ) -> Self {
        let rng = match config.rng_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        Self {
            config,
            clock,
            rooms: HashMap::new(),
            memberships: HashMap::new(),
            connections: HashMap::new(),
            timer_tx,
            rng,
        }
    }

    // -----------------------------------------------------------------------
    // Connections
    // -----------------------------------------------------------------------

    /// Registers a new connection and greets it.
    pub fn connect(&mut self, player: PlayerId, outbound: Outbound) {
        self.connections.insert(player, outbound);
        self.send(player, ServerMessage::ServerHello { ok: true });
        debug!(player_id = %player, connections = self.connections.len(), "connection registered");
    }

    /// Handles a dropped connection.
    ///
    /// Durable members keep their seat for the grace window; anyone else
    /// is removed on the spot.
    pub fn disconnect(&mut self, player: PlayerId) {
        self.connections.remove(&player);
        let Some(code) = self.memberships.remove(&player) else {
            return;
        };
        let Some(room) = self.rooms.get_mut(&code) else {
            return;
        };
        match room.disconnect(player) {
            Ok(true) => {
                info!(%code, player_id = %player, "player disconnected, seat held");
                self.flush(&code, Outbox::new());
            }
            Ok(false) => {
                info!(%code, player_id = %player, "player disconnected without a session");
                self.remove_member(&code, player);
            }
            Err(e) => debug!(%code, player_id = %player, error = %e, "disconnect ignored"),
        }
    }

    /// Handles one message from a connection.
    ///
    /// User-facing failures are answered with `error_msg`; refused actions
    /// are logged and dropped.
    pub fn handle(&mut self, player: PlayerId, msg: ClientMessage) {
        let result = match msg {
            ClientMessage::CreateRoom {
                name,
                avatar,
                session_id,
            } => self.create_room(player, name, avatar, session_id.map(SessionId::from)),
            ClientMessage::JoinRoom {
                code,
                name,
                avatar,
                session_id,
            } => self.join_room(
                player,
                RoomCode::parse(&code),
                name,
                avatar,
                session_id.map(SessionId::from),
            ),
            ClientMessage::ReconnectRoom { code, session_id } => {
                self.reconnect_room(player, RoomCode::parse(&code), SessionId::from(session_id))
            }
            ClientMessage::LeaveRoom => self.leave(player),
            other => self.apply(player, other),
        };

        if let Err(e) = result {
            if e.is_user_facing() {
                debug!(player_id = %player, error = %e, "request failed");
                self.send(player, ServerMessage::error(e.to_string()));
            } else {
                debug!(player_id = %player, error = %e, "action rejected");
            }
        }
    }

    // -----------------------------------------------------------------------
    // Lobby entry points
    // -----------------------------------------------------------------------

    fn create_room(
        &mut self,
        player: PlayerId,
        name: String,
        avatar: u32,
        session_id: Option<SessionId>,
    ) -> Result<(), RoomError> {
        self.detach(player);

        let code = self.unique_code();
        let rng = StdRng::seed_from_u64(self.rng.random());
        let mut room = Room::new(code.clone(), self.config.clone(), self.timer_tx.clone(), rng);
        let session = room.add_member(player, name, avatar, session_id, true)?;

        info!(%code, player_id = %player, seed = room.game().board.seed, "room created");
        self.rooms.insert(code.clone(), room);
        self.memberships.insert(player, code.clone());
        self.send(
            player,
            ServerMessage::RoomCreated {
                code: code.to_string(),
                session_id: session.map(|s| s.to_string()),
            },
        );
        self.flush(&code, Outbox::new());
        Ok(())
    }

    fn join_room(
        &mut self,
        player: PlayerId,
        code: RoomCode,
        name: String,
        avatar: u32,
        session_id: Option<SessionId>,
    ) -> Result<(), RoomError> {
        let room = self.rooms.get(&code).ok_or(RoomError::NotFound)?;

        // A seat this session already holds: take it back.
        if let Some(session) = session_id.as_ref() {
            if room.lobby().find_session(session).is_some() {
                return self.reconnect_room(player, code, session.clone());
            }
        }

        if self.memberships.get(&player) == Some(&code) {
            let session = room.lobby().member(player).and_then(|m| m.session_id.clone());
            self.send(
                player,
                ServerMessage::RoomJoined {
                    code: code.to_string(),
                    session_id: session.map(|s| s.to_string()),
                },
            );
            return Ok(());
        }
        if room.game().phase != GamePhase::Lobby {
            return Err(RoomError::AlreadyStarted);
        }
        if room.lobby().is_full() {
            return Err(SessionError::RoomFull(room.lobby().config().max_members).into());
        }

        self.detach(player);
        let room = self.rooms.get_mut(&code).ok_or(RoomError::NotFound)?;
        let session = room.add_member(player, name, avatar, session_id, false)?;

        info!(%code, player_id = %player, members = room.lobby().len(), "player joined");
        self.memberships.insert(player, code.clone());
        self.send(
            player,
            ServerMessage::RoomJoined {
                code: code.to_string(),
                session_id: session.map(|s| s.to_string()),
            },
        );
        self.flush(&code, Outbox::new());
        Ok(())
    }

    fn reconnect_room(
        &mut self,
        player: PlayerId,
        code: RoomCode,
        session_id: SessionId,
    ) -> Result<(), RoomError> {
        let room = self.rooms.get(&code).ok_or(RoomError::NotFound)?;
        if room.lobby().find_session(&session_id).is_none() {
            return Err(SessionError::NotFound.into());
        }
        if self.memberships.get(&player) != Some(&code) {
            self.detach(player);
        }

        let room = self.rooms.get_mut(&code).ok_or(RoomError::NotFound)?;
        let previous = room.reconnect(&session_id, player)?;
        if previous != player && self.memberships.get(&previous) == Some(&code) {
            // The seat was taken over from a connection that is still open.
            self.memberships.remove(&previous);
        }
        self.memberships.insert(player, code.clone());

        info!(%code, from = %previous, to = %player, "player reconnected");
        self.send(
            player,
            ServerMessage::RoomReconnected {
                code: code.to_string(),
                session_id: Some(session_id.to_string()),
            },
        );
        self.flush(&code, Outbox::new());
        Ok(())
    }

    fn leave(&mut self, player: PlayerId) -> Result<(), RoomError> {
        let code = self
            .memberships
            .remove(&player)
            .ok_or(RoomError::NotInRoom(player))?;
        info!(%code, player_id = %player, "player left");
        self.remove_member(&code, player);
        Ok(())
    }

    /// Takes a connection out of whatever room it is in, as if it left.
    fn detach(&mut self, player: PlayerId) {
        if let Some(code) = self.memberships.remove(&player) {
            debug!(%code, player_id = %player, "detaching from previous room");
            self.remove_member(&code, player);
        }
    }

    fn remove_member(&mut self, code: &RoomCode, player: PlayerId) {
        let Some(room) = self.rooms.get_mut(code) else {
            return;
        };
        let mut out = Outbox::new();
        match room.remove_member(player, &mut out) {
            Departure::NotMember => {}
            Departure::Removed => {
                info!(%code, player_id = %player, members = room.lobby().len(), "player removed");
                self.flush(code, out);
            }
            Departure::HostLeft => self.close_room(code, HOST_LEFT_MESSAGE),
            Departure::Emptied => self.close_room(code, "Room is empty"),
        }
    }

    /// Tears a room down: cancels its timers, tells everyone still attached,
    /// and forgets it.
    fn close_room(&mut self, code: &RoomCode, reason: &str) {
        let Some(mut room) = self.rooms.remove(code) else {
            return;
        };
        let cancelled = room.cancel_all_timers();

        let attached: Vec<PlayerId> = self
            .memberships
            .iter()
            .filter(|(_, c)| *c == code)
            .map(|(p, _)| *p)
            .collect();
        for player in &attached {
            self.memberships.remove(player);
            self.send(
                *player,
                ServerMessage::RoomClosed {
                    message: reason.to_string(),
                },
            );
        }
        info!(%code, cancelled, notified = attached.len(), reason, "room closed");
    }

    fn unique_code(&mut self) -> RoomCode {
        loop {
            let code = RoomCode::generate(&mut self.rng, self.config.code_length);
            if !self.rooms.contains_key(&code) {
                return code;
            }
        }
    }

    // -----------------------------------------------------------------------
    // Game traffic
    // -----------------------------------------------------------------------

    fn apply(&mut self, player: PlayerId, msg: ClientMessage) -> Result<(), RoomError> {
        let code = self
            .memberships
            .get(&player)
            .cloned()
            .ok_or(RoomError::NotInRoom(player))?;
        let now = self.clock.now_ms();
        let room = self.rooms.get_mut(&code).ok_or(RoomError::NotFound)?;
        let mut out = Outbox::new();
        room.apply(player, msg, now, &mut out)?;
        self.flush(&code, out);
        Ok(())
    }

    /// Runs a fired timer against the room it was armed for.
    ///
    /// The event is dropped if the room is gone, the timer was cancelled,
    /// or the minigame / phase / round it names is no longer current.
    pub fn on_timer(&mut self, fired: Fired<RoomTimer>) {
        let Fired {
            id,
            event: RoomTimer { code, kind },
        } = fired;
        let Some(room) = self.rooms.get_mut(&code) else {
            debug!(%code, timer = %id, "timer for a closed room dropped");
            return;
        };
        if !room.retire_timer(id) {
            debug!(%code, timer = %id, "cancelled timer dropped");
            return;
        }

        if let TimerKind::GraceExpired { session, player } = kind {
            if room.grace_expired(id, &session, player) {
                info!(%code, player_id = %player, "reconnect grace expired");
                self.remove_member(&code, player);
            }
            return;
        }

        let now = self.clock.now_ms();
        let mut out = Outbox::new();
        match room.on_timer(kind, now, &mut out) {
            Ok(()) => self.flush(&code, out),
            Err(e) => debug!(%code, timer = %id, error = %e, "stale timer dropped"),
        }
    }

    // -----------------------------------------------------------------------
    // Delivery
    // -----------------------------------------------------------------------

    /// Delivers `out`, then the room's lobby and state.
    fn flush(&self, code: &RoomCode, mut out: Outbox) {
        let Some(room) = self.rooms.get(code) else {
            return;
        };
        room.sync(&mut out);
        for (recipient, msg) in out {
            match recipient {
                Recipient::All => {
                    for member in room.lobby().connected() {
                        self.send(member.player_id, msg.clone());
                    }
                }
                Recipient::Player(player) => self.send(player, msg),
            }
        }
    }

    /// Sends to one connection. Silently drops if it is gone.
    fn send(&self, player: PlayerId, msg: ServerMessage) {
        if let Some(outbound) = self.connections.get(&player) {
            if outbound.send(msg).is_err() {
                warn!(player_id = %player, "outbound channel closed, message dropped");
            }
        }
    }

    // -----------------------------------------------------------------------
    // Inspection
    // -----------------------------------------------------------------------

    pub fn room(&self, code: &RoomCode) -> Option<&Room> {
        self.rooms.get(code)
    }

    /// The room a connection is attached to, if any.
    pub fn room_of(&self, player: PlayerId) -> Option<&Room> {
        self.memberships.get(&player).and_then(|code| self.rooms.get(code))
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    pub fn clock(&self) -> Clock {
        self.clock
    }
}
