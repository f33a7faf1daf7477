//! The Retroboard game engine.
//!
//! Everything in this crate is synchronous and owns no I/O: a room hands a
//! [`GameState`] the action it received (plus the current time in
//! milliseconds and a random source) and gets back either the outcome of
//! the transition or a [`Rejection`].
//!
//! # Key types
//!
//! - [`Board`] / [`generate`]: seeded board generation
//! - [`GameState`]: the per-room turn state machine
//! - [`Minigame`]: the active skill timer, duel or quiz
//! - [`GameSnapshot`]: the sanitized view broadcast to clients
//! - [`Mulberry32`]: the reproducible PRNG behind boards and prompts
//!
//! ```text
//! roll → move → land ─┬─ question → open → vote → validate ─┬─ next turn
//!                     │                                     └─ skill timer
//!                     └─ duel
//! round change ─ quiz
//! ```

pub mod bank;
pub mod board;
mod error;
pub mod minigame;
mod player;
mod prng;
mod question;
mod snapshot;
mod state;

pub use board::{generate, Board, BoardOptions, Tile, TileKind};
pub use error::Rejection;
pub use minigame::{
    Duel, DuelPhase, Minigame, MinigameId, MinigameKind, Quiz, QuizOptions, QuizRejection,
    QuizStatus, Role, RoundReveal, RoundStart, SkillTimer, Transfer, Verdict,
};
pub use player::{Player, PlayerId, PlayerSeed, PLAYER_COLORS};
pub use prng::Mulberry32;
pub use question::{Question, QuestionStatus, QuestionSummary, Vote, Votes};
pub use snapshot::{BoardView, DuelView, GameSnapshot, MinigameView, QuizView, SkillTimerView};
pub use state::{
    DuelAnswer, DuelResult, DuelStep, GamePhase, GameState, Landing, QuizResult, Removal,
    SkillTimerResult, TurnAdvance, Validation, DEFAULT_MAX_ROUNDS,
};
