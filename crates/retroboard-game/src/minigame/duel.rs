//! Duel minigame: two players judge buzzwords, with sudden death on a tie.
//!
//! ```text
//! between → word → between → … → word #10 ─┬─ winner ──────────────→ transfer
//!                                          └─ tie → between → sudden_death ─┬─ first correct → transfer
//!                                                      ↑                    │
//!                                                      └──── nobody ────────┘
//! ```
//!
//! Every phase change except a sudden-death win is driven by the room's
//! timers: `between` ends at `next_word_at`, a word ends at `word_ends_at`.
//! The engine checks those deadlines itself, so a timer that fires early or
//! twice is refused instead of skipping a word.

use std::ops::RangeInclusive;

use rand::Rng;
use rand::seq::{IndexedRandom, SliceRandom};
use serde::{Deserialize, Serialize};

use crate::bank::{self, BankWord};
use crate::minigame::MinigameId;
use crate::{PlayerId, Rejection};

/// Words in the main round.
pub const DUEL_MAIN_WORDS: usize = 10;
/// How long each word accepts answers.
pub const DUEL_WORD_WINDOW_MS: u64 = 3_000;
/// Pause between two words.
pub const DUEL_BETWEEN_WORDS_MS: u64 = 500;
/// Delay before the first word after the duel is announced.
pub const DUEL_ANNOUNCE_MS: u64 = 4_000;
/// How long the point transfer is displayed before the duel clears.
pub const DUEL_TRANSFER_DISPLAY_MS: u64 = 1_800;
/// Upper bound on the points a winner can steal.
pub const DUEL_MAX_STEAL: u32 = 5;
/// 1-based positions the double-value word is drawn from.
pub const DUEL_DOUBLE_RANGE: RangeInclusive<usize> = 7..=DUEL_MAIN_WORDS;

/// The two judgment categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Verdict {
    Legit,
    Bullshit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuelPhase {
    Between,
    Word,
    SuddenDeath,
    Transfer,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoundType {
    Main,
    SuddenDeath,
}

/// A word as played in this duel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DuelWord {
    pub text: &'static str,
    pub verdict: Verdict,
    pub is_double: bool,
}

impl DuelWord {
    fn points(&self) -> u32 {
        if self.is_double { 2 } else { 1 }
    }
}

/// Points moving from the loser to the winner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transfer {
    pub winner: PlayerId,
    pub loser: PlayerId,
    pub amount: u32,
    pub started_at: u64,
}

/// Result of an accepted answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    Recorded,
    /// Correct sudden-death answer: the duel is decided on the spot.
    Won(PlayerId),
}

/// Result of closing a word window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WordOutcome {
    /// Back to `between` before the next main word.
    NextWord,
    /// Back to `between` before a (new) sudden-death word.
    SuddenDeath,
    /// The main round produced a winner.
    Winner(PlayerId),
}

#[derive(Debug, Clone)]
pub struct Duel {
    pub id: MinigameId,
    pub duelists: [PlayerId; 2],
    pub phase: DuelPhase,
    pub round_type: RoundType,
    pub total_words: usize,
    /// 1-based index of the current (or upcoming) main word.
    pub current_word_index: usize,
    pub sudden_death_round: u32,
    pub double_word_index: usize,
    /// Scores aligned with `duelists`.
    pub scores: [u32; 2],
    /// Answers for the current word, aligned with `duelists`.
    pub submissions: [Option<Verdict>; 2],
    pub word: Option<DuelWord>,
    pub word_started_at: Option<u64>,
    pub word_ends_at: Option<u64>,
    pub next_word_at: Option<u64>,
    pub transfer: Option<Transfer>,
    main_words: Vec<DuelWord>,
    pending_sudden: Option<DuelWord>,
    seen: Vec<&'static str>,
}

impl Duel {
    /// Draws ten words from the shuffled bank and announces the duel.
    pub(crate) fn new<R: Rng + ?Sized>(
        id: MinigameId,
        a: PlayerId,
        b: PlayerId,
        now: u64,
        rng: &mut R,
    ) -> Result<Self, Rejection> {
        if a == b {
            return Err(Rejection::InvalidDuelists);
        }

        let mut pool: Vec<BankWord> = bank::duel_words().to_vec();
        pool.shuffle(rng);
        let double_word_index = rng.random_range(DUEL_DOUBLE_RANGE);
        let main_words: Vec<DuelWord> = pool
            .into_iter()
            .take(DUEL_MAIN_WORDS)
            .enumerate()
            .map(|(i, w)| DuelWord {
                text: w.text,
                verdict: w.verdict,
                is_double: i + 1 == double_word_index,
            })
            .collect();

        Ok(Self {
            id,
            duelists: [a, b],
            phase: DuelPhase::Between,
            round_type: RoundType::Main,
            total_words: main_words.len(),
            current_word_index: 1,
            sudden_death_round: 0,
            double_word_index,
            scores: [0, 0],
            submissions: [None, None],
            word: None,
            word_started_at: None,
            word_ends_at: None,
            next_word_at: Some(now + DUEL_ANNOUNCE_MS),
            transfer: None,
            seen: main_words.iter().map(|w| w.text).collect(),
            main_words,
            pending_sudden: None,
        })
    }

    fn slot(&self, player: PlayerId) -> Option<usize> {
        self.duelists.iter().position(|d| *d == player)
    }

    pub fn is_duelist(&self, player: PlayerId) -> bool {
        self.slot(player).is_some()
    }

    pub fn score_of(&self, player: PlayerId) -> Option<u32> {
        self.slot(player).map(|i| self.scores[i])
    }

    /// The other duelist.
    pub fn opponent(&self, player: PlayerId) -> Option<PlayerId> {
        self.slot(player).map(|i| self.duelists[1 - i])
    }

    /// Duelists who answered the current word.
    pub fn submitted_players(&self) -> Vec<PlayerId> {
        self.duelists
            .iter()
            .zip(self.submissions)
            .filter(|(_, s)| s.is_some())
            .map(|(p, _)| *p)
            .collect()
    }

    /// Correct category of the word on screen. Never broadcast.
    pub fn current_verdict(&self) -> Option<Verdict> {
        self.word.map(|w| w.verdict)
    }

    pub fn main_words(&self) -> &[DuelWord] {
        &self.main_words
    }

    /// Whether a word is currently accepting answers.
    pub fn is_word_open(&self) -> bool {
        matches!(self.phase, DuelPhase::Word | DuelPhase::SuddenDeath)
    }

    /// Leaves `between` once `next_word_at` has passed.
    pub fn start_next_word(&mut self, now: u64) -> Result<(), Rejection> {
        if self.phase != DuelPhase::Between {
            return Err(Rejection::WrongPhase);
        }
        match self.next_word_at {
            Some(at) if now >= at => {}
            _ => return Err(Rejection::NotDue),
        }

        let (word, phase) = match self.round_type {
            RoundType::Main => {
                let word = self
                    .main_words
                    .get(self.current_word_index.saturating_sub(1))
                    .copied()
                    .ok_or(Rejection::WrongPhase)?;
                (word, DuelPhase::Word)
            }
            RoundType::SuddenDeath => {
                let word = self.pending_sudden.take().ok_or(Rejection::WrongPhase)?;
                (word, DuelPhase::SuddenDeath)
            }
        };

        self.word = Some(word);
        self.phase = phase;
        self.word_started_at = Some(now);
        self.word_ends_at = Some(now + DUEL_WORD_WINDOW_MS);
        self.next_word_at = None;
        self.submissions = [None, None];
        Ok(())
    }

    /// Records one duelist's answer to the open word.
    pub fn submit(
        &mut self,
        player: PlayerId,
        verdict: Verdict,
        now: u64,
    ) -> Result<SubmitOutcome, Rejection> {
        let slot = self.slot(player).ok_or(Rejection::NotDuelist)?;
        if !self.is_word_open() {
            return Err(Rejection::WrongPhase);
        }
        match self.word_ends_at {
            Some(end) if now < end => {}
            _ => return Err(Rejection::WindowClosed),
        }
        if self.submissions[slot].is_some() {
            return Err(Rejection::AlreadySubmitted);
        }

        self.submissions[slot] = Some(verdict);
        if self.phase == DuelPhase::SuddenDeath && self.current_verdict() == Some(verdict) {
            return Ok(SubmitOutcome::Won(player));
        }
        Ok(SubmitOutcome::Recorded)
    }

    /// Closes the open word once its window has passed and scores it.
    pub fn resolve_word<R: Rng + ?Sized>(
        &mut self,
        now: u64,
        rng: &mut R,
    ) -> Result<WordOutcome, Rejection> {
        if !self.is_word_open() {
            return Err(Rejection::WrongPhase);
        }
        match self.word_ends_at {
            Some(end) if now >= end => {}
            _ => return Err(Rejection::NotDue),
        }
        let word = self.word.ok_or(Rejection::WrongPhase)?;

        if self.round_type == RoundType::SuddenDeath {
            self.enter_sudden_death(now, rng);
            return Ok(WordOutcome::SuddenDeath);
        }

        for (slot, answer) in self.submissions.iter().enumerate() {
            if *answer == Some(word.verdict) {
                self.scores[slot] += word.points();
            }
        }

        if self.current_word_index < self.total_words {
            self.current_word_index += 1;
            self.to_between(now);
            return Ok(WordOutcome::NextWord);
        }

        let [a, b] = self.scores;
        if a == b {
            self.enter_sudden_death(now, rng);
            return Ok(WordOutcome::SuddenDeath);
        }
        let winner = if a > b { self.duelists[0] } else { self.duelists[1] };
        Ok(WordOutcome::Winner(winner))
    }

    /// Settles the duel in `winner`'s favor. `loser_points` is the loser's
    /// current total; the stolen amount never exceeds it.
    pub(crate) fn begin_transfer(
        &mut self,
        winner: PlayerId,
        loser_points: u32,
        now: u64,
    ) -> Result<Transfer, Rejection> {
        let loser = self.opponent(winner).ok_or(Rejection::NotDuelist)?;
        let transfer = Transfer {
            winner,
            loser,
            amount: loser_points.min(DUEL_MAX_STEAL),
            started_at: now,
        };
        self.phase = DuelPhase::Transfer;
        self.transfer = Some(transfer);
        self.word_ends_at = None;
        self.next_word_at = None;
        Ok(transfer)
    }

    fn to_between(&mut self, now: u64) {
        self.phase = DuelPhase::Between;
        self.word = None;
        self.word_started_at = None;
        self.word_ends_at = None;
        self.submissions = [None, None];
        self.next_word_at = Some(now + DUEL_BETWEEN_WORDS_MS);
    }

    fn enter_sudden_death<R: Rng + ?Sized>(&mut self, now: u64, rng: &mut R) {
        let previous = self.word.map(|w| w.text);
        let word = self.pick_sudden_word(previous, rng);
        self.round_type = RoundType::SuddenDeath;
        self.sudden_death_round += 1;
        self.pending_sudden = word;
        self.to_between(now);
    }

    /// Prefers words never seen in this duel, then anything but the previous
    /// word, then the whole bank.
    fn pick_sudden_word<R: Rng + ?Sized>(
        &mut self,
        previous: Option<&'static str>,
        rng: &mut R,
    ) -> Option<DuelWord> {
        let all = bank::duel_words();
        let unseen: Vec<&BankWord> = all.iter().filter(|w| !self.seen.contains(&w.text)).collect();
        let not_previous: Vec<&BankWord> = all.iter().filter(|w| Some(w.text) != previous).collect();
        let everything: Vec<&BankWord> = all.iter().collect();

        let pool = if !unseen.is_empty() {
            unseen
        } else if !not_previous.is_empty() {
            not_previous
        } else {
            everything
        };

        let picked = pool.choose(rng).copied()?;
        self.seen.push(picked.text);
        Some(DuelWord {
            text: picked.text,
            verdict: picked.verdict,
            is_double: false,
        })
    }

    pub(crate) fn remap_player(&mut self, from: PlayerId, to: PlayerId) {
        for d in &mut self.duelists {
            if *d == from {
                *d = to;
            }
        }
        if let Some(t) = &mut self.transfer {
            if t.winner == from {
                t.winner = to;
            }
            if t.loser == from {
                t.loser = to;
            }
        }
    }
}
