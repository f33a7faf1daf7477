//! The broadcast view of a game.
//!
//! Clients render whatever they receive, so the snapshot carries exactly
//! what every player may see: no duel verdicts or upcoming words, no quiz
//! answers, and no individual answers before a reveal. Everything else in
//! [`GameState`] is copied through as is.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::board::Tile;
use crate::minigame::duel::{DuelPhase, RoundType, Transfer};
use crate::minigame::quiz::QuizStatus;
use crate::minigame::{Duel, Minigame, MinigameId, Quiz, SkillTimer};
use crate::player::{Player, PlayerId};
use crate::question::{Question, QuestionSummary};
use crate::state::{GamePhase, GameState};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameSnapshot {
    pub phase: GamePhase,
    pub players: Vec<Player>,
    pub current_player_index: usize,
    pub current_round: u32,
    pub max_rounds: u32,
    pub board: BoardView,
    pub tiles: Vec<Tile>,
    pub dice_value: Option<u8>,
    pub is_rolling: bool,
    pub current_question: Option<Question>,
    pub current_minigame: Option<MinigameView>,
    pub question_history: Vec<QuestionSummary>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoardView {
    pub seed: u32,
    pub cols: u32,
    pub rows: u32,
    pub length: usize,
}

/// Public face of the active minigame, tagged by kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MinigameView {
    SkillTimer(SkillTimerView),
    Duel(DuelView),
    Quiz(QuizView),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkillTimerView {
    pub minigame_id: MinigameId,
    pub target_player_id: PlayerId,
    pub start_at: u64,
    pub duration_ms: u64,
    pub score: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DuelView {
    pub minigame_id: MinigameId,
    pub duelists: [PlayerId; 2],
    pub phase: DuelPhase,
    pub round_type: RoundType,
    pub current_word_index: usize,
    pub total_words: usize,
    pub sudden_death_round: u32,
    pub scores: BTreeMap<PlayerId, u32>,
    pub submitted_player_ids: Vec<PlayerId>,
    /// Only set while a word is on screen.
    pub word: Option<String>,
    pub word_is_double: bool,
    pub word_ends_at: Option<u64>,
    pub next_word_at: Option<u64>,
    pub transfer: Option<Transfer>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizView {
    pub minigame_id: MinigameId,
    pub participants: Vec<PlayerId>,
    pub round_index: u32,
    pub total_rounds: u32,
    pub status: QuizStatus,
    pub quote_id: Option<String>,
    pub text: Option<String>,
    pub ends_at: Option<u64>,
    pub submitted_player_ids: Vec<PlayerId>,
    pub points_gained: BTreeMap<PlayerId, u32>,
}

impl From<&SkillTimer> for SkillTimerView {
    fn from(t: &SkillTimer) -> Self {
        Self {
            minigame_id: t.id,
            target_player_id: t.target,
            start_at: t.start_at,
            duration_ms: t.duration_ms,
            score: t.score,
        }
    }
}

impl From<&Duel> for DuelView {
    fn from(d: &Duel) -> Self {
        let shown = d.word.filter(|_| d.phase != DuelPhase::Between);
        Self {
            minigame_id: d.id,
            duelists: d.duelists,
            phase: d.phase,
            round_type: d.round_type,
            current_word_index: d.current_word_index,
            total_words: d.total_words,
            sudden_death_round: d.sudden_death_round,
            scores: d.duelists.iter().copied().zip(d.scores).collect(),
            submitted_player_ids: d.submitted_players(),
            word: shown.map(|w| w.text.to_string()),
            word_is_double: shown.is_some_and(|w| w.is_double),
            word_ends_at: d.word_ends_at,
            next_word_at: d.next_word_at,
            transfer: d.transfer,
        }
    }
}

impl From<&Quiz> for QuizView {
    fn from(q: &Quiz) -> Self {
        let round = q.current_round.as_ref();
        Self {
            minigame_id: q.id,
            participants: q.participants.clone(),
            round_index: q.round_index,
            total_rounds: q.total_rounds(),
            status: q.status,
            quote_id: round.map(|r| r.quote_id.to_string()),
            text: round.map(|r| r.text.to_string()),
            ends_at: round.map(|r| r.ends_at),
            submitted_player_ids: q.submitted_players(),
            points_gained: q.points_gained.clone(),
        }
    }
}

impl From<&Minigame> for MinigameView {
    fn from(m: &Minigame) -> Self {
        match m {
            Minigame::SkillTimer(t) => Self::SkillTimer(t.into()),
            Minigame::Duel(d) => Self::Duel(d.into()),
            Minigame::Quiz(q) => Self::Quiz(q.into()),
        }
    }
}

impl GameState {
    /// What gets broadcast after every mutation.
    pub fn snapshot(&self) -> GameSnapshot {
        GameSnapshot {
            phase: self.phase,
            players: self.players.clone(),
            current_player_index: self.current_player_index,
            current_round: self.current_round,
            max_rounds: self.max_rounds,
            board: BoardView {
                seed: self.board.seed,
                cols: self.board.cols,
                rows: self.board.rows,
                length: self.board.length,
            },
            tiles: self.board.tiles.clone(),
            dice_value: self.dice_value,
            is_rolling: self.is_rolling,
            current_question: self.current_question.clone(),
            current_minigame: self.current_minigame.as_ref().map(MinigameView::from),
            question_history: self.question_history.clone(),
        }
    }
}
