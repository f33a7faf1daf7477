//! Quiz minigame: everyone guesses which role said a quote.
//!
//! A quiz runs a fixed number of rounds. Each round opens an answer window,
//! then reveals the answer and the points earned. Points accumulate in the
//! quiz itself and only reach the players' totals when the quiz finishes.
//!
//! Participants can leave or be remapped to a new identity mid-quiz without
//! losing what they already earned.

use std::collections::{BTreeMap, HashSet};
use std::fmt;

use rand::Rng;
use rand::seq::IndexedRandom;
use serde::{Deserialize, Serialize};

use crate::bank::{self, BankQuote};
use crate::minigame::MinigameId;
use crate::{PlayerId, Rejection};

/// Delay between the quiz announcement and its first round.
pub const QUIZ_ANNOUNCE_MS: u64 = 4_000;
/// Answers submitted within this many ms of the round start are "fast".
pub const QUIZ_FAST_ANSWER_MS: u64 = 5_000;
pub const QUIZ_POINTS_FAST: u32 = 3;
pub const QUIZ_POINTS_CORRECT: u32 = 2;
/// Extra point for the only correct answer of a round.
pub const QUIZ_SOLE_CORRECT_BONUS: u32 = 1;

// ---------------------------------------------------------------------------
// Roles and options
// ---------------------------------------------------------------------------

/// The roles a quote can be attributed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Manager,
    Po,
    Dev,
    ScrumMaster,
    QaSupport,
}

impl Role {
    pub const ALL: [Role; 5] = [Role::Manager, Role::Po, Role::Dev, Role::ScrumMaster, Role::QaSupport];

    pub fn as_str(self) -> &'static str {
        match self {
            Role::Manager => "MANAGER",
            Role::Po => "PO",
            Role::Dev => "DEV",
            Role::ScrumMaster => "SCRUM_MASTER",
            Role::QaSupport => "QA_SUPPORT",
        }
    }

    /// Parses the wire name of a role.
    pub fn parse(s: &str) -> Option<Role> {
        Role::ALL.into_iter().find(|r| r.as_str() == s)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Quiz timing and length.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuizOptions {
    pub rounds: u32,
    pub answer_window_ms: u64,
    pub reveal_ms: u64,
    pub between_rounds_ms: u64,
}

impl Default for QuizOptions {
    fn default() -> Self {
        Self {
            rounds: 3,
            answer_window_ms: 20_000,
            reveal_ms: 3_000,
            between_rounds_ms: 1_000,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuizStatus {
    Answer,
    Reveal,
    Done,
}

/// Why a quiz answer was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QuizRejection {
    #[error("no round is running")]
    NoActiveRound,
    #[error("player is not taking part in this quiz")]
    UnknownPlayer,
    #[error("unknown role")]
    InvalidRole,
    #[error("answer is for another round")]
    RoundMismatch,
    #[error("round is not accepting answers")]
    RoundNotAccepting,
    #[error("answer window has ended")]
    RoundEnded,
    #[error("already answered this round")]
    AlreadySubmitted,
}

// ---------------------------------------------------------------------------
// Rounds
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Submission {
    pub role: Role,
    pub submitted_at: u64,
}

#[derive(Debug, Clone)]
pub struct QuizRound {
    pub round_index: u32,
    pub quote_id: &'static str,
    pub text: &'static str,
    answer: Role,
    pub starts_at: u64,
    pub ends_at: u64,
    pub submissions: BTreeMap<PlayerId, Submission>,
}

/// Broadcast when a round opens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoundStart {
    pub round_index: u32,
    pub total_rounds: u32,
    pub quote_id: String,
    pub text: String,
    pub ends_at: u64,
}

/// Broadcast when a round's answer is revealed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoundReveal {
    pub round_index: u32,
    pub answer_role: Role,
    pub distribution: BTreeMap<Role, u32>,
    pub winners: Vec<PlayerId>,
    pub points_delta: BTreeMap<PlayerId, u32>,
}

// ---------------------------------------------------------------------------
// Quiz
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Quiz {
    pub id: MinigameId,
    pub options: QuizOptions,
    pub participants: Vec<PlayerId>,
    pub points_gained: BTreeMap<PlayerId, u32>,
    /// 1-based index of the current (or next) round.
    pub round_index: u32,
    pub status: QuizStatus,
    pub current_round: Option<QuizRound>,
    used_quotes: HashSet<&'static str>,
    last_quote: Option<&'static str>,
}

impl Quiz {
    pub(crate) fn new(id: MinigameId, participants: Vec<PlayerId>, options: QuizOptions) -> Self {
        let points_gained = participants.iter().map(|p| (*p, 0)).collect();
        Self {
            id,
            options,
            participants,
            points_gained,
            round_index: 1,
            status: QuizStatus::Answer,
            current_round: None,
            used_quotes: HashSet::new(),
            last_quote: None,
        }
    }

    pub fn total_rounds(&self) -> u32 {
        self.options.rounds
    }

    /// Correct role of the open round. Never broadcast before the reveal.
    pub fn current_answer(&self) -> Option<Role> {
        self.current_round.as_ref().map(|r| r.answer)
    }

    /// Opens round `round_index` with a fresh quote.
    pub fn start_round<R: Rng + ?Sized>(&mut self, now: u64, rng: &mut R) -> Result<RoundStart, Rejection> {
        if self.status != QuizStatus::Answer || self.current_round.is_some() {
            return Err(Rejection::WrongPhase);
        }
        if self.round_index > self.total_rounds() {
            return Err(Rejection::WrongPhase);
        }
        let quote = self.pick_quote(rng).ok_or(Rejection::WrongPhase)?;
        self.used_quotes.insert(quote.id);
        self.last_quote = Some(quote.id);

        let round = QuizRound {
            round_index: self.round_index,
            quote_id: quote.id,
            text: quote.text,
            answer: quote.role,
            starts_at: now,
            ends_at: now + self.options.answer_window_ms,
            submissions: BTreeMap::new(),
        };
        let start = RoundStart {
            round_index: round.round_index,
            total_rounds: self.total_rounds(),
            quote_id: round.quote_id.to_string(),
            text: round.text.to_string(),
            ends_at: round.ends_at,
        };
        self.current_round = Some(round);
        Ok(start)
    }

    /// Unused quotes first, never the previous one if anything else is left.
    fn pick_quote<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<&'static BankQuote> {
        let all = bank::quotes();
        let unused: Vec<&'static BankQuote> =
            all.iter().filter(|q| !self.used_quotes.contains(q.id)).collect();
        let base = if unused.is_empty() { all.iter().collect() } else { unused };
        let fresh: Vec<&'static BankQuote> =
            base.iter().copied().filter(|q| Some(q.id) != self.last_quote).collect();
        let pool = if fresh.is_empty() { base } else { fresh };
        pool.choose(rng).copied()
    }

    /// Records a participant's guess for the open round.
    pub fn submit(
        &mut self,
        player: PlayerId,
        round_index: u32,
        role: &str,
        now: u64,
    ) -> Result<(), QuizRejection> {
        let status = self.status;
        let round = self.current_round.as_mut().ok_or(QuizRejection::NoActiveRound)?;
        if !self.participants.contains(&player) {
            return Err(QuizRejection::UnknownPlayer);
        }
        let role = Role::parse(role).ok_or(QuizRejection::InvalidRole)?;
        if round_index != round.round_index {
            return Err(QuizRejection::RoundMismatch);
        }
        if status != QuizStatus::Answer {
            return Err(QuizRejection::RoundNotAccepting);
        }
        if now > round.ends_at {
            return Err(QuizRejection::RoundEnded);
        }
        if round.submissions.contains_key(&player) {
            return Err(QuizRejection::AlreadySubmitted);
        }
        round.submissions.insert(player, Submission { role, submitted_at: now });
        Ok(())
    }

    /// Whether every participant has answered the open round.
    pub fn all_submitted(&self) -> bool {
        match &self.current_round {
            Some(round) if self.status == QuizStatus::Answer => {
                !self.participants.is_empty()
                    && self.participants.iter().all(|p| round.submissions.contains_key(p))
            }
            _ => false,
        }
    }

    /// Scores the open round and switches to `reveal`.
    pub fn reveal(&mut self) -> Result<RoundReveal, Rejection> {
        if self.status != QuizStatus::Answer {
            return Err(Rejection::WrongPhase);
        }
        let round = self.current_round.as_ref().ok_or(Rejection::WrongPhase)?;

        let mut distribution: BTreeMap<Role, u32> = Role::ALL.iter().map(|r| (*r, 0)).collect();
        let mut points_delta: BTreeMap<PlayerId, u32> =
            self.participants.iter().map(|p| (*p, 0)).collect();
        let mut correct = Vec::new();

        for player in &self.participants {
            let Some(sub) = round.submissions.get(player) else {
                continue;
            };
            *distribution.entry(sub.role).or_default() += 1;
            if sub.role == round.answer {
                let fast = sub.submitted_at.saturating_sub(round.starts_at) <= QUIZ_FAST_ANSWER_MS;
                let points = if fast { QUIZ_POINTS_FAST } else { QUIZ_POINTS_CORRECT };
                *points_delta.entry(*player).or_default() += points;
                correct.push(*player);
            }
        }
        if let [sole] = correct.as_slice() {
            *points_delta.entry(*sole).or_default() += QUIZ_SOLE_CORRECT_BONUS;
        }

        for (player, points) in &points_delta {
            *self.points_gained.entry(*player).or_default() += points;
        }
        self.status = QuizStatus::Reveal;

        Ok(RoundReveal {
            round_index: round.round_index,
            answer_role: round.answer,
            distribution,
            winners: self
                .participants
                .iter()
                .copied()
                .filter(|p| points_delta.get(p).is_some_and(|pts| *pts > 0))
                .collect(),
            points_delta,
        })
    }

    /// Moves past a revealed round. Returns `true` when the quiz is over.
    pub fn advance(&mut self) -> Result<bool, Rejection> {
        if self.status != QuizStatus::Reveal {
            return Err(Rejection::WrongPhase);
        }
        self.round_index += 1;
        self.current_round = None;
        if self.round_index > self.total_rounds() {
            self.status = QuizStatus::Done;
            return Ok(true);
        }
        self.status = QuizStatus::Answer;
        Ok(false)
    }

    /// Drops a participant along with their points and pending answer.
    pub fn remove_participant(&mut self, player: PlayerId) -> bool {
        let before = self.participants.len();
        self.participants.retain(|p| *p != player);
        self.points_gained.remove(&player);
        if let Some(round) = &mut self.current_round {
            round.submissions.remove(&player);
        }
        self.participants.len() != before
    }

    /// Moves everything recorded for `from` over to `to`.
    pub fn remap_participant(&mut self, from: PlayerId, to: PlayerId) {
        for p in &mut self.participants {
            if *p == from {
                *p = to;
            }
        }
        if let Some(points) = self.points_gained.remove(&from) {
            self.points_gained.insert(to, points);
        }
        if let Some(round) = &mut self.current_round {
            if let Some(sub) = round.submissions.remove(&from) {
                round.submissions.insert(to, sub);
            }
        }
    }

    pub fn submitted_players(&self) -> Vec<PlayerId> {
        self.current_round
            .as_ref()
            .map(|r| r.submissions.keys().copied().collect())
            .unwrap_or_default()
    }
}
