//! Message types that travel on the wire.
//!
//! Clients send bare [`ClientMessage`]s. The server answers with
//! [`ServerMessage`]s wrapped in an [`Envelope`] that carries a
//! per-connection sequence number, so a client can drop a snapshot that
//! arrives after a newer one.
//!
//! Both enums are internally tagged: `{"type": "move_player", "steps": 3}`.
//! Lobby and game actions use snake_case tags, minigame traffic uses
//! SCREAMING_SNAKE_CASE tags, and payload fields are camelCase.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use retroboard_game::{
    GameSnapshot, MinigameId, MinigameKind, PlayerId, QuizRejection, RoundReveal, RoundStart,
    Verdict, Vote,
};

// ---------------------------------------------------------------------------
// Client → server
// ---------------------------------------------------------------------------

/// Everything a client can ask the server to do.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum ClientMessage {
    /// Opens a new room with the sender as host.
    CreateRoom {
        name: String,
        #[serde(default)]
        avatar: u32,
        #[serde(default)]
        session_id: Option<String>,
    },

    /// Joins an existing room. A known `session_id` turns this into a
    /// reconnect.
    JoinRoom {
        code: String,
        name: String,
        #[serde(default)]
        avatar: u32,
        #[serde(default)]
        session_id: Option<String>,
    },

    /// Takes a disconnected seat back under the sender's connection.
    ReconnectRoom { code: String, session_id: String },

    LeaveRoom,

    /// Host only.
    StartGame,

    /// Host only. Back to the lobby on a fresh board.
    ResetGame,

    RollDice,

    MovePlayer { steps: u32 },

    OpenQuestion,

    VoteQuestion { vote: Vote },

    ValidateQuestion,

    /// Host only. Manual turn override.
    NextTurn,

    /// Live score mirror while the skill timer runs.
    #[serde(rename = "SKILL_TIMER_PROGRESS")]
    SkillTimerProgress { score: f64 },

    #[serde(rename = "SKILL_TIMER_COMPLETE")]
    SkillTimerComplete { score: f64 },

    #[serde(rename = "DUEL_SUBMIT")]
    DuelSubmit { category: Verdict },

    /// A role guess for the open quiz round, sent as its wire name
    /// (`"DEV"`, `"SCRUM_MASTER"`, ...).
    #[serde(rename = "QUIZ_SUBMIT")]
    QuizSubmit {
        round_index: u32,
        #[serde(alias = "roleIndex")]
        role: String,
    },
}

// ---------------------------------------------------------------------------
// Server → client
// ---------------------------------------------------------------------------

/// One row of the lobby as clients see it. Session ids are never included.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LobbyPlayer {
    /// Current in-game identity of the member.
    pub player_id: PlayerId,
    pub name: String,
    pub avatar: u32,
    pub is_host: bool,
    pub connected: bool,
}

/// Points earned (or lost) in a finished minigame.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MinigameSummary {
    pub points_gained: BTreeMap<PlayerId, i64>,
}

/// Everything the server sends.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum ServerMessage {
    /// First message on every connection.
    ServerHello { ok: bool },

    /// `session_id` is the durable seat to reconnect with, if one was
    /// issued.
    RoomCreated {
        code: String,
        session_id: Option<String>,
    },

    RoomJoined {
        code: String,
        session_id: Option<String>,
    },

    RoomReconnected {
        code: String,
        session_id: Option<String>,
    },

    /// A user-facing failure, sent only to the requesting connection.
    ErrorMsg { message: String },

    LobbyUpdate { players: Vec<LobbyPlayer> },

    StateUpdate { state: Box<GameSnapshot> },

    /// The room is gone; the client should go back to the start screen.
    RoomClosed { message: String },

    #[serde(rename = "MINIGAME_START")]
    MinigameStart {
        kind: MinigameKind,
        minigame_id: MinigameId,
        /// Quiz only.
        total_rounds: Option<u32>,
    },

    #[serde(rename = "QUIZ_ROUND_START")]
    QuizRoundStart(RoundStart),

    #[serde(rename = "QUIZ_ROUND_REVEAL")]
    QuizRoundReveal(RoundReveal),

    /// Answer to a `QUIZ_SUBMIT`, sent only to its sender.
    #[serde(rename = "QUIZ_SUBMIT_RESULT")]
    QuizSubmitResult {
        accepted: bool,
        reason: Option<QuizRejection>,
    },

    #[serde(rename = "MINIGAME_END")]
    MinigameEnd {
        kind: MinigameKind,
        minigame_id: MinigameId,
        summary: MinigameSummary,
    },
}

impl ServerMessage {
    pub fn error(message: impl Into<String>) -> Self {
        Self::ErrorMsg {
            message: message.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Envelope
// ---------------------------------------------------------------------------

/// Wrapper around every outbound message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    /// Per-connection counter, starting at 1.
    pub seq: u64,

    /// Milliseconds since the server started.
    pub timestamp: u64,

    /// The message itself.
    pub message: ServerMessage,
}

// =========================================================================
// Tests
// =========================================================================
