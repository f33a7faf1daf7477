//! Why a game transition was refused.
//!
//! Refusals are not failures: the engine leaves its state untouched and the
//! caller simply drops the action. The variants exist so the room layer can
//! log what happened and so tests can assert on the exact precondition.

/// A transition precondition that did not hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum Rejection {
    #[error("game is not in progress")]
    NotPlaying,

    #[error("game is not in the lobby")]
    NotInLobby,

    #[error("no players to start with")]
    NoPlayers,

    #[error("not this player's turn")]
    NotYourTurn,

    #[error("unknown player")]
    UnknownPlayer,

    #[error("a question is in progress")]
    QuestionActive,

    #[error("a minigame is in progress")]
    MinigameActive,

    #[error("no question awaiting this action")]
    NoQuestion,

    #[error("question is not open")]
    QuestionNotOpen,

    #[error("question is already open")]
    QuestionAlreadyOpen,

    #[error("only the targeted player may do this")]
    NotTarget,

    #[error("players cannot vote on their own question")]
    OwnQuestion,

    #[error("dice already rolled")]
    DiceAlreadyRolled,

    #[error("dice not rolled")]
    DiceNotRolled,

    #[error("dice are not rolling")]
    DiceNotRolling,

    #[error("step count must be positive")]
    InvalidSteps,

    #[error("no matching minigame")]
    NoMinigame,

    #[error("quiz has no rounds to play")]
    NoQuizRounds,

    #[error("minigame is in a different phase")]
    WrongPhase,

    #[error("the scheduled moment has not arrived")]
    NotDue,

    #[error("only duelists may answer")]
    NotDuelist,

    #[error("answer window is closed")]
    WindowClosed,

    #[error("already answered")]
    AlreadySubmitted,

    #[error("a duel needs two distinct players")]
    InvalidDuelists,
}
