//! Room configuration.

use std::time::Duration;

use retroboard_game::{BoardOptions, QuizOptions, DEFAULT_MAX_ROUNDS};
use retroboard_session::SessionConfig;

// ---------------------------------------------------------------------------
// RoomConfig
// ---------------------------------------------------------------------------

/// Settings shared by every room of an engine.
#[derive(Debug, Clone)]
pub struct RoomConfig {
    /// Rounds before the game moves to results.
    pub max_rounds: u32,

    /// Shape of generated boards.
    pub board: BoardOptions,

    /// Lobby capacity, reconnect grace window, session id issuing.
    pub session: SessionConfig,

    /// Round count and timings of the quiz.
    pub quiz: QuizOptions,

    /// How long the dice roll animates before it settles.
    pub dice_settle: Duration,

    /// Extra time after a skill timer's countdown before the server
    /// completes it with the last mirrored score.
    pub skill_timer_grace: Duration,

    /// Start a quiz with every player at the beginning of each new round.
    pub quiz_each_round: bool,

    /// Characters in a room code.
    pub code_length: usize,

    /// Fixed seed for room codes, boards and minigame draws. `None` seeds
    /// from the OS.
    pub rng_seed: Option<u64>,
}

impl Default for RoomConfig {
    fn default() -> Self {
        Self {
            max_rounds: DEFAULT_MAX_ROUNDS,
            board: BoardOptions::default(),
            session: SessionConfig::default(),
            quiz: QuizOptions::default(),
            dice_settle: Duration::from_millis(650),
            skill_timer_grace: Duration::from_millis(5_000),
            quiz_each_round: true,
            code_length: 4,
            rng_seed: None,
        }
    }
}
