//! Per-room game state and the turn state machine.
//!
//! [`GameState`] is owned by exactly one room and only ever mutated through
//! the transition methods below. Every transition either applies in full
//! and returns `Ok`, or refuses with a [`Rejection`] and leaves the state
//! exactly as it was. There is no partial application.
//!
//! Two invariants hold after every transition:
//!
//! - `current_question` and `current_minigame` are never both set;
//! - while `phase == Playing`, `current_player_index` points at a player.

use std::collections::BTreeMap;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::bank;
use crate::board::{Board, TileKind};
use crate::minigame::duel::{DuelPhase, SubmitOutcome, Transfer, Verdict, WordOutcome};
use crate::minigame::quiz::{QuizOptions, QuizRejection, QuizStatus};
use crate::minigame::skill_timer::{self, SkillTimer};
use crate::minigame::{Duel, Minigame, MinigameId, MinigameKind, Quiz};
use crate::player::{Player, PlayerId, PlayerSeed};
use crate::prng::Mulberry32;
use crate::question::{Question, QuestionStatus, QuestionSummary, Vote, Votes};
use crate::Rejection;

/// Rounds played before the game ends.
pub const DEFAULT_MAX_ROUNDS: u32 = 12;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GamePhase {
    Lobby,
    Playing,
    Results,
}

// ---------------------------------------------------------------------------
// Transition outcomes
// ---------------------------------------------------------------------------

/// What a turn advance did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TurnAdvance {
    pub previous_round: u32,
    pub round: u32,
    /// The game moved to `results`.
    pub finished: bool,
}

impl TurnAdvance {
    /// Whether this advance started a new round of a game still in progress.
    pub fn started_new_round(&self) -> bool {
        !self.finished && self.round > self.previous_round
    }
}

/// What landing on a tile triggered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Landing {
    Question { kind: TileKind, bonus_awarded: bool },
    Duel { minigame: MinigameId, opponent: PlayerId },
    /// The board has no tile under the player; the turn passed.
    Empty(TurnAdvance),
}

/// What validating a question led to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Validation {
    TurnAdvanced(TurnAdvance),
    MinigameStarted(MinigameId),
}

/// What a timer-driven duel step did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DuelStep {
    WordOpened,
    BackToBetween,
    TransferStarted(Transfer),
}

/// What an accepted duel answer did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DuelAnswer {
    Recorded,
    TransferStarted(Transfer),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DuelResult {
    pub minigame: MinigameId,
    pub transfer: Transfer,
    pub advance: TurnAdvance,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SkillTimerResult {
    pub minigame: MinigameId,
    pub player: PlayerId,
    pub score: u32,
    pub stars: u32,
    pub advance: TurnAdvance,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuizResult {
    pub minigame: MinigameId,
    pub points_gained: BTreeMap<PlayerId, u32>,
}

/// Side effects of removing a player mid-game.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Removal {
    pub removed: bool,
    pub cleared_question: bool,
    pub cleared_minigame: Option<MinigameId>,
    /// Set when the removal left the board stuck and the turn moved on.
    pub advance: Option<TurnAdvance>,
}

// ---------------------------------------------------------------------------
// GameState
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct GameState {
    pub phase: GamePhase,
    pub players: Vec<Player>,
    pub current_player_index: usize,
    pub current_round: u32,
    pub max_rounds: u32,
    pub board: Board,
    pub dice_value: Option<u8>,
    pub is_rolling: bool,
    pub current_question: Option<Question>,
    pub current_minigame: Option<Minigame>,
    pub question_history: Vec<QuestionSummary>,
    next_minigame_id: u64,
    next_question_id: u64,
}

impl GameState {
    /// A fresh lobby on `board`.
    pub fn new(board: Board, max_rounds: u32) -> Self {
        Self {
            phase: GamePhase::Lobby,
            players: Vec::new(),
            current_player_index: 0,
            current_round: 1,
            max_rounds,
            board,
            dice_value: None,
            is_rolling: false,
            current_question: None,
            current_minigame: None,
            question_history: Vec::new(),
            next_minigame_id: 1,
            next_question_id: 1,
        }
    }

    /// Back to a fresh lobby on a new board.
    ///
    /// Id counters keep running so a minigame id is never handed out twice
    /// for the same room.
    pub fn reset(&mut self, board: Board) {
        let next_minigame_id = self.next_minigame_id;
        let next_question_id = self.next_question_id;
        *self = Self::new(board, self.max_rounds);
        self.next_minigame_id = next_minigame_id;
        self.next_question_id = next_question_id;
    }

    /// Starts the game with `seeds`, in order. Only valid from the lobby.
    pub fn start(&mut self, seeds: &[PlayerSeed]) -> Result<(), Rejection> {
        if self.phase != GamePhase::Lobby {
            return Err(Rejection::NotInLobby);
        }
        if seeds.is_empty() {
            return Err(Rejection::NoPlayers);
        }
        self.players = seeds
            .iter()
            .enumerate()
            .map(|(i, seed)| Player::from_seed(seed, i))
            .collect();
        self.phase = GamePhase::Playing;
        self.current_player_index = 0;
        self.current_round = 1;
        self.dice_value = None;
        self.is_rolling = false;
        self.current_question = None;
        self.current_minigame = None;
        self.question_history.clear();
        tracing::debug!(players = self.players.len(), "game started");
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Lookups
    // -----------------------------------------------------------------------

    pub fn player(&self, id: PlayerId) -> Option<&Player> {
        self.players.iter().find(|p| p.id == id)
    }

    fn player_mut(&mut self, id: PlayerId) -> Option<&mut Player> {
        self.players.iter_mut().find(|p| p.id == id)
    }

    pub fn current_player(&self) -> Option<&Player> {
        match self.phase {
            GamePhase::Playing => self.players.get(self.current_player_index),
            _ => None,
        }
    }

    pub fn minigame_id(&self) -> Option<MinigameId> {
        self.current_minigame.as_ref().map(Minigame::id)
    }

    pub fn duel(&self) -> Option<&Duel> {
        match &self.current_minigame {
            Some(Minigame::Duel(d)) => Some(d),
            _ => None,
        }
    }

    pub fn quiz(&self) -> Option<&Quiz> {
        match &self.current_minigame {
            Some(Minigame::Quiz(q)) => Some(q),
            _ => None,
        }
    }

    pub fn skill_timer(&self) -> Option<&SkillTimer> {
        match &self.current_minigame {
            Some(Minigame::SkillTimer(t)) => Some(t),
            _ => None,
        }
    }

    fn ensure_playing(&self) -> Result<(), Rejection> {
        if self.phase == GamePhase::Playing {
            Ok(())
        } else {
            Err(Rejection::NotPlaying)
        }
    }

    /// Playing, `who`'s turn, and nothing else in progress.
    fn ensure_free_turn(&self, who: PlayerId) -> Result<(), Rejection> {
        self.ensure_playing()?;
        if self.current_player().map(|p| p.id) != Some(who) {
            return Err(Rejection::NotYourTurn);
        }
        self.ensure_board_free()
    }

    fn ensure_board_free(&self) -> Result<(), Rejection> {
        if self.current_question.is_some() {
            return Err(Rejection::QuestionActive);
        }
        if self.current_minigame.is_some() {
            return Err(Rejection::MinigameActive);
        }
        Ok(())
    }

    fn allocate_minigame_id(&mut self) -> MinigameId {
        let id = MinigameId(self.next_minigame_id);
        self.next_minigame_id += 1;
        id
    }

    fn clear_dice(&mut self) {
        self.dice_value = None;
        self.is_rolling = false;
    }

    // -----------------------------------------------------------------------
    // Dice and movement
    // -----------------------------------------------------------------------

    /// Rolls 1..=6 for the current player and starts the roll animation.
    pub fn roll_dice<R: Rng + ?Sized>(&mut self, who: PlayerId, rng: &mut R) -> Result<u8, Rejection> {
        self.ensure_free_turn(who)?;
        if self.dice_value.is_some() {
            return Err(Rejection::DiceAlreadyRolled);
        }
        let value = rng.random_range(1..=6u8);
        self.dice_value = Some(value);
        self.is_rolling = true;
        Ok(value)
    }

    /// Ends the roll animation.
    pub fn settle_dice(&mut self) -> Result<(), Rejection> {
        if !self.is_rolling {
            return Err(Rejection::DiceNotRolling);
        }
        self.is_rolling = false;
        Ok(())
    }

    /// Moves the current player forward, stopping on the last tile.
    pub fn move_player(&mut self, who: PlayerId, steps: u32) -> Result<usize, Rejection> {
        self.ensure_free_turn(who)?;
        if self.dice_value.is_none() {
            return Err(Rejection::DiceNotRolled);
        }
        if steps == 0 {
            return Err(Rejection::InvalidSteps);
        }
        let last = self.board.last_index();
        let player = self.player_mut(who).ok_or(Rejection::UnknownPlayer)?;
        player.position = player.position.saturating_add(steps as usize).min(last);
        Ok(player.position)
    }

    /// Resolves the tile the current player stands on.
    ///
    /// Another player on the same tile starts a duel. Otherwise a question
    /// is drawn from a stream seeded by board seed, position and round, so
    /// the same landing always asks the same thing. On a board with no
    /// tiles nothing can be drawn and the turn passes instead.
    pub fn land<R: Rng + ?Sized>(&mut self, who: PlayerId, now: u64, rng: &mut R) -> Result<Landing, Rejection> {
        self.ensure_free_turn(who)?;
        let position = self.player(who).ok_or(Rejection::UnknownPlayer)?.position;
        let Some(kind) = self.board.tile(position).map(|t| t.kind) else {
            return Ok(Landing::Empty(self.advance_turn()));
        };

        let opponent = self
            .players
            .iter()
            .find(|p| p.id != who && p.position == position)
            .map(|p| p.id);

        if let Some(opponent) = opponent {
            let id = MinigameId(self.next_minigame_id);
            let duel = Duel::new(id, who, opponent, now, rng)?;
            self.next_minigame_id += 1;
            self.current_minigame = Some(Minigame::Duel(duel));
            self.clear_dice();
            return Ok(Landing::Duel { minigame: id, opponent });
        }

        let bonus_awarded = kind == TileKind::Bonus;
        if bonus_awarded {
            if let Some(p) = self.player_mut(who) {
                p.bonus_points += 1;
            }
        }

        let seed = self
            .board
            .seed
            .wrapping_add(position as u32)
            .wrapping_add(self.current_round.wrapping_mul(1000));
        let text = bank::pick_question(kind, &mut Mulberry32::new(seed));

        self.current_question = Some(Question {
            id: self.next_question_id,
            kind,
            text: text.to_string(),
            target_player_id: who,
            votes: Votes::default(),
            status: QuestionStatus::Pending,
            next_minigame: (kind == TileKind::Red).then_some(MinigameKind::SkillTimer),
        });
        self.next_question_id += 1;
        self.clear_dice();
        Ok(Landing::Question { kind, bonus_awarded })
    }

    // -----------------------------------------------------------------------
    // Questions
    // -----------------------------------------------------------------------

    pub fn open_question(&mut self, who: PlayerId) -> Result<(), Rejection> {
        self.ensure_playing()?;
        let question = self.current_question.as_mut().ok_or(Rejection::NoQuestion)?;
        if question.target_player_id != who {
            return Err(Rejection::NotTarget);
        }
        if question.status != QuestionStatus::Pending {
            return Err(Rejection::QuestionAlreadyOpen);
        }
        question.status = QuestionStatus::Open;
        Ok(())
    }

    /// Any player but the target may vote; a new vote replaces the old one.
    pub fn vote_question(&mut self, who: PlayerId, vote: Vote) -> Result<(), Rejection> {
        self.ensure_playing()?;
        if self.player(who).is_none() {
            return Err(Rejection::UnknownPlayer);
        }
        let question = self.current_question.as_mut().ok_or(Rejection::NoQuestion)?;
        if question.status != QuestionStatus::Open {
            return Err(Rejection::QuestionNotOpen);
        }
        if question.target_player_id == who {
            return Err(Rejection::OwnQuestion);
        }
        question.votes.cast(who, vote);
        Ok(())
    }

    /// Closes the question, then either starts its follow-up minigame or
    /// passes the turn.
    pub fn validate_question(&mut self, who: PlayerId, now: u64) -> Result<Validation, Rejection> {
        self.ensure_playing()?;
        let question = self.current_question.as_ref().ok_or(Rejection::NoQuestion)?;
        if question.target_player_id != who {
            return Err(Rejection::NotTarget);
        }
        if question.status != QuestionStatus::Open {
            return Err(Rejection::QuestionNotOpen);
        }

        let next = question.next_minigame;
        self.question_history.push(QuestionSummary::from(question));
        self.current_question = None;

        if next == Some(MinigameKind::SkillTimer) {
            let id = self.allocate_minigame_id();
            self.current_minigame = Some(Minigame::SkillTimer(SkillTimer::new(id, who, now)));
            self.clear_dice();
            return Ok(Validation::MinigameStarted(id));
        }
        Ok(Validation::TurnAdvanced(self.advance_turn()))
    }

    // -----------------------------------------------------------------------
    // Turn order
    // -----------------------------------------------------------------------

    /// Passes the turn. Refused while a question or minigame is running.
    pub fn next_turn(&mut self) -> Result<TurnAdvance, Rejection> {
        self.ensure_playing()?;
        self.ensure_board_free()?;
        Ok(self.advance_turn())
    }

    /// Moves to the next player, consuming skip flags.
    ///
    /// The skip scan is bounded by the player count, so it terminates even
    /// when every player is flagged.
    fn advance_turn(&mut self) -> TurnAdvance {
        let previous_round = self.current_round;
        self.clear_dice();

        let count = self.players.len();
        if count == 0 {
            return TurnAdvance {
                previous_round,
                round: previous_round,
                finished: false,
            };
        }

        let mut round = self.current_round;
        let mut next = self.current_player_index + 1;
        if next >= count {
            next = 0;
            round += 1;
        }
        let mut scanned = 0;
        while scanned < count && self.players[next].skip_next_turn {
            self.players[next].skip_next_turn = false;
            next += 1;
            if next >= count {
                next = 0;
                round += 1;
            }
            scanned += 1;
        }

        if round > self.max_rounds {
            self.phase = GamePhase::Results;
            self.current_round = self.max_rounds;
            tracing::debug!(rounds = self.max_rounds, "game finished");
        } else {
            self.current_player_index = next;
            self.current_round = round;
        }

        TurnAdvance {
            previous_round,
            round: self.current_round,
            finished: self.phase == GamePhase::Results,
        }
    }

    // -----------------------------------------------------------------------
    // Skill timer
    // -----------------------------------------------------------------------

    fn skill_timer_mut(&mut self) -> Result<&mut SkillTimer, Rejection> {
        match &mut self.current_minigame {
            Some(Minigame::SkillTimer(t)) => Ok(t),
            _ => Err(Rejection::NoMinigame),
        }
    }

    /// Mirrors the target's live score. Grants nothing.
    pub fn update_skill_timer(&mut self, who: PlayerId, raw_score: f64) -> Result<u32, Rejection> {
        self.ensure_playing()?;
        let timer = self.skill_timer_mut()?;
        if timer.target != who {
            return Err(Rejection::NotTarget);
        }
        timer.score = skill_timer::clamp_score(raw_score);
        Ok(timer.score)
    }

    /// Converts the final score to stars, clears the minigame and passes
    /// the turn.
    pub fn complete_skill_timer(&mut self, who: PlayerId, raw_score: f64) -> Result<SkillTimerResult, Rejection> {
        self.ensure_playing()?;
        let timer = self.skill_timer_mut()?;
        if timer.target != who {
            return Err(Rejection::NotTarget);
        }
        let minigame = timer.id;
        let score = skill_timer::clamp_score(raw_score);
        Ok(self.finish_skill_timer(minigame, who, score))
    }

    /// Completes skill timer `id` with its last mirrored score.
    pub fn expire_skill_timer(&mut self, id: MinigameId) -> Result<SkillTimerResult, Rejection> {
        self.ensure_playing()?;
        let timer = self.skill_timer_mut()?;
        if timer.id != id {
            return Err(Rejection::NoMinigame);
        }
        let (target, score) = (timer.target, timer.score);
        Ok(self.finish_skill_timer(id, target, score))
    }

    fn finish_skill_timer(&mut self, minigame: MinigameId, player: PlayerId, score: u32) -> SkillTimerResult {
        let stars = skill_timer::stars_for_score(score);
        if let Some(p) = self.player_mut(player) {
            p.bonus_points += stars;
        }
        self.current_minigame = None;
        let advance = self.advance_turn();
        SkillTimerResult {
            minigame,
            player,
            score,
            stars,
            advance,
        }
    }

    // -----------------------------------------------------------------------
    // Duel
    // -----------------------------------------------------------------------

    fn duel_mut(&mut self, id: Option<MinigameId>) -> Result<&mut Duel, Rejection> {
        match &mut self.current_minigame {
            Some(Minigame::Duel(d)) if id.is_none_or(|id| d.id == id) => Ok(d),
            _ => Err(Rejection::NoMinigame),
        }
    }

    /// Starts a duel between two players outside of a landing.
    pub fn start_duel<R: Rng + ?Sized>(
        &mut self,
        a: PlayerId,
        b: PlayerId,
        now: u64,
        rng: &mut R,
    ) -> Result<MinigameId, Rejection> {
        self.ensure_playing()?;
        self.ensure_board_free()?;
        if self.player(a).is_none() || self.player(b).is_none() {
            return Err(Rejection::UnknownPlayer);
        }
        let id = MinigameId(self.next_minigame_id);
        let duel = Duel::new(id, a, b, now, rng)?;
        self.next_minigame_id += 1;
        self.current_minigame = Some(Minigame::Duel(duel));
        Ok(id)
    }

    /// A duelist's answer to the open word. A correct sudden-death answer
    /// settles the duel immediately.
    pub fn submit_duel(
        &mut self,
        who: PlayerId,
        verdict: Verdict,
        now: u64,
    ) -> Result<DuelAnswer, Rejection> {
        self.ensure_playing()?;
        let outcome = self.duel_mut(None)?.submit(who, verdict, now)?;
        match outcome {
            SubmitOutcome::Recorded => Ok(DuelAnswer::Recorded),
            SubmitOutcome::Won(winner) => Ok(DuelAnswer::TransferStarted(self.settle_duel(winner, now)?)),
        }
    }

    /// Timer-driven step of duel `id`, valid only if it is still in
    /// `expected` phase.
    pub fn advance_duel<R: Rng + ?Sized>(
        &mut self,
        id: MinigameId,
        expected: DuelPhase,
        now: u64,
        rng: &mut R,
    ) -> Result<DuelStep, Rejection> {
        self.ensure_playing()?;
        let duel = self.duel_mut(Some(id))?;
        if duel.phase != expected {
            return Err(Rejection::WrongPhase);
        }
        match expected {
            DuelPhase::Between => {
                duel.start_next_word(now)?;
                Ok(DuelStep::WordOpened)
            }
            DuelPhase::Word | DuelPhase::SuddenDeath => match duel.resolve_word(now, rng)? {
                WordOutcome::NextWord | WordOutcome::SuddenDeath => Ok(DuelStep::BackToBetween),
                WordOutcome::Winner(winner) => Ok(DuelStep::TransferStarted(self.settle_duel(winner, now)?)),
            },
            DuelPhase::Transfer => Err(Rejection::WrongPhase),
        }
    }

    /// Moves the stolen points and puts the duel in `transfer`.
    fn settle_duel(&mut self, winner: PlayerId, now: u64) -> Result<Transfer, Rejection> {
        let loser = self.duel_mut(None)?.opponent(winner).ok_or(Rejection::NotDuelist)?;
        let loser_points = self.player(loser).map_or(0, |p| p.bonus_points);
        let transfer = self.duel_mut(None)?.begin_transfer(winner, loser_points, now)?;
        if let Some(p) = self.player_mut(loser) {
            p.bonus_points -= transfer.amount;
        }
        if let Some(p) = self.player_mut(winner) {
            p.bonus_points += transfer.amount;
        }
        Ok(transfer)
    }

    /// Clears duel `id` after its transfer was displayed and passes the turn.
    pub fn complete_duel(&mut self, id: MinigameId) -> Result<DuelResult, Rejection> {
        self.ensure_playing()?;
        let duel = self.duel_mut(Some(id))?;
        if duel.phase != DuelPhase::Transfer {
            return Err(Rejection::WrongPhase);
        }
        let transfer = duel.transfer.ok_or(Rejection::WrongPhase)?;
        self.current_minigame = None;
        let advance = self.advance_turn();
        Ok(DuelResult {
            minigame: id,
            transfer,
            advance,
        })
    }

    // -----------------------------------------------------------------------
    // Quiz
    // -----------------------------------------------------------------------

    /// Starts a quiz with every player.
    pub fn start_quiz(&mut self, options: QuizOptions) -> Result<MinigameId, Rejection> {
        self.ensure_playing()?;
        self.ensure_board_free()?;
        if self.players.is_empty() {
            return Err(Rejection::NoPlayers);
        }
        if options.rounds == 0 {
            return Err(Rejection::NoQuizRounds);
        }
        let id = self.allocate_minigame_id();
        let participants = self.players.iter().map(|p| p.id).collect();
        self.current_minigame = Some(Minigame::Quiz(Quiz::new(id, participants, options)));
        Ok(id)
    }

    /// Quiz `id`, if it is still the active minigame.
    pub fn quiz_mut(&mut self, id: MinigameId) -> Result<&mut Quiz, Rejection> {
        match &mut self.current_minigame {
            Some(Minigame::Quiz(q)) if q.id == id => Ok(q),
            _ => Err(Rejection::NoMinigame),
        }
    }

    /// A participant's guess for the running quiz round.
    pub fn submit_quiz(
        &mut self,
        who: PlayerId,
        round_index: u32,
        role: &str,
        now: u64,
    ) -> Result<(), QuizRejection> {
        match &mut self.current_minigame {
            Some(Minigame::Quiz(q)) => q.submit(who, round_index, role, now),
            _ => Err(QuizRejection::NoActiveRound),
        }
    }

    /// Applies a finished quiz's points to the players and clears it.
    pub fn finish_quiz(&mut self, id: MinigameId) -> Result<QuizResult, Rejection> {
        let quiz = self.quiz_mut(id)?;
        if quiz.status != QuizStatus::Done {
            return Err(Rejection::WrongPhase);
        }
        let points_gained = quiz.points_gained.clone();
        for (player, points) in &points_gained {
            if let Some(p) = self.player_mut(*player) {
                p.bonus_points += points;
            }
        }
        self.current_minigame = None;
        Ok(QuizResult {
            minigame: id,
            points_gained,
        })
    }

    // -----------------------------------------------------------------------
    // Membership changes
    // -----------------------------------------------------------------------

    /// Rewrites every reference to `from` as `to`. Returns `false` if `from`
    /// is not a player.
    pub fn remap_player(&mut self, from: PlayerId, to: PlayerId) -> bool {
        let Some(player) = self.player_mut(from) else {
            return false;
        };
        player.id = to;
        if let Some(q) = &mut self.current_question {
            if q.target_player_id == from {
                q.target_player_id = to;
            }
            q.votes.remap(from, to);
        }
        if let Some(m) = &mut self.current_minigame {
            m.remap_player(from, to);
        }
        true
    }

    /// Keeps `is_host` in line with the room's host.
    pub fn set_host(&mut self, host: Option<PlayerId>) {
        for p in &mut self.players {
            p.is_host = Some(p.id) == host;
        }
    }

    /// Removes a player and unwinds whatever referenced them.
    ///
    /// A question they were asked is dropped, their votes disappear, a
    /// skill timer or duel they played is cancelled, and they leave a quiz
    /// (which ends once nobody is left). If that leaves the current player
    /// with nothing to do, the turn passes.
    pub fn remove_player(&mut self, id: PlayerId) -> Removal {
        let Some(index) = self.players.iter().position(|p| p.id == id) else {
            return Removal::default();
        };
        let was_current = index == self.current_player_index;
        self.players.remove(index);

        let mut removal = Removal {
            removed: true,
            ..Removal::default()
        };

        if let Some(q) = &mut self.current_question {
            if q.target_player_id == id {
                self.current_question = None;
                removal.cleared_question = true;
            } else {
                q.votes.remove(id);
            }
        }

        let mut blocking_minigame_cleared = false;
        let clear = match &mut self.current_minigame {
            Some(Minigame::Quiz(q)) => {
                q.remove_participant(id);
                q.participants.is_empty()
            }
            Some(m) => m.involves(id),
            None => false,
        };
        if clear {
            if let Some(m) = self.current_minigame.take() {
                blocking_minigame_cleared = m.kind() != MinigameKind::Quiz;
                removal.cleared_minigame = Some(m.id());
            }
        }

        if self.players.is_empty() {
            self.phase = GamePhase::Lobby;
            self.current_player_index = 0;
            self.current_question = None;
            self.current_minigame = None;
            self.clear_dice();
            return removal;
        }

        if index < self.current_player_index {
            self.current_player_index -= 1;
        } else if self.current_player_index >= self.players.len() {
            self.current_player_index = 0;
        }
        if was_current {
            self.clear_dice();
        }

        let stalled = removal.cleared_question || blocking_minigame_cleared;
        if stalled && !was_current && self.phase == GamePhase::Playing {
            removal.advance = Some(self.advance_turn());
        }
        removal
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::{self, BoardOptions};

    fn pid(n: u64) -> PlayerId {
        PlayerId(n)
    }

    fn seeds(n: u64) -> Vec<PlayerSeed> {
        (1..=n)
            .map(|i| PlayerSeed {
                id: pid(i),
                name: format!("player-{i}"),
                avatar: i as u32,
                is_host: i == 1,
            })
            .collect()
    }

    fn playing(n: u64) -> GameState {
        let mut state = GameState::new(board::generate(42, &BoardOptions::default()), DEFAULT_MAX_ROUNDS);
        state.start(&seeds(n)).unwrap();
        state
    }

    fn exclusive(state: &GameState) -> bool {
        !(state.current_question.is_some() && state.current_minigame.is_some())
    }

    /// Puts a question of `kind` on the table for the current player.
    fn ask(state: &mut GameState, kind: TileKind) -> PlayerId {
        let who = state.current_player().unwrap().id;
        state.current_question = Some(Question {
            id: 99,
            kind,
            text: "?".into(),
            target_player_id: who,
            votes: Votes::default(),
            status: QuestionStatus::Pending,
            next_minigame: (kind == TileKind::Red).then_some(MinigameKind::SkillTimer),
        });
        who
    }

    // =====================================================================
    // Start
    // =====================================================================

    #[test]
    fn test_start_requires_lobby_and_players() {
        let mut state = GameState::new(board::generate(1, &BoardOptions::default()), 12);
        assert_eq!(state.start(&[]), Err(Rejection::NoPlayers));
        state.start(&seeds(2)).unwrap();
        assert_eq!(state.phase, GamePhase::Playing);
        assert_eq!(state.current_round, 1);
        assert_eq!(state.start(&seeds(2)), Err(Rejection::NotInLobby));
    }

    // =====================================================================
    // Dice and movement
    // =====================================================================

    #[test]
    fn test_roll_dice_only_for_current_player_once() {
        let mut state = playing(2);
        let mut rng = Mulberry32::new(1);
        assert_eq!(state.roll_dice(pid(2), &mut rng), Err(Rejection::NotYourTurn));
        let value = state.roll_dice(pid(1), &mut rng).unwrap();
        assert!((1..=6).contains(&value));
        assert!(state.is_rolling);
        assert_eq!(state.roll_dice(pid(1), &mut rng), Err(Rejection::DiceAlreadyRolled));
        state.settle_dice().unwrap();
        assert!(!state.is_rolling);
        assert_eq!(state.settle_dice(), Err(Rejection::DiceNotRolling));
    }

    #[test]
    fn test_move_player_requires_roll_and_positive_steps() {
        let mut state = playing(2);
        assert_eq!(state.move_player(pid(1), 3), Err(Rejection::DiceNotRolled));
        state.roll_dice(pid(1), &mut Mulberry32::new(2)).unwrap();
        assert_eq!(state.move_player(pid(1), 0), Err(Rejection::InvalidSteps));
        assert_eq!(state.move_player(pid(1), 3), Ok(3));
    }

    #[test]
    fn test_move_player_clamps_to_last_tile() {
        let mut state = playing(1);
        state.roll_dice(pid(1), &mut Mulberry32::new(2)).unwrap();
        let pos = state.move_player(pid(1), u32::MAX).unwrap();
        assert_eq!(pos, state.board.length - 1);
    }

    #[test]
    fn test_move_player_on_empty_board_stays_at_zero() {
        let empty = board::generate(
            1,
            &BoardOptions {
                cols: 0,
                ..BoardOptions::default()
            },
        );
        let mut state = GameState::new(empty, 12);
        state.start(&seeds(1)).unwrap();
        state.roll_dice(pid(1), &mut Mulberry32::new(2)).unwrap();
        assert_eq!(state.move_player(pid(1), 4), Ok(0));
    }

    #[test]
    fn test_land_on_empty_board_passes_turn() {
        let empty = board::generate(
            1,
            &BoardOptions {
                cols: 0,
                ..BoardOptions::default()
            },
        );
        let mut state = GameState::new(empty, 12);
        state.start(&seeds(2)).unwrap();
        state.roll_dice(pid(1), &mut Mulberry32::new(2)).unwrap();
        state.settle_dice().unwrap();
        state.move_player(pid(1), 4).unwrap();

        let landing = state.land(pid(1), 0, &mut Mulberry32::new(1)).unwrap();
        assert!(matches!(landing, Landing::Empty(advance) if !advance.finished));
        assert_eq!(state.current_player_index, 1);
        assert_eq!(state.dice_value, None);
        assert!(state.current_question.is_none());
        assert!(state.current_minigame.is_none());
        assert!(state.roll_dice(pid(2), &mut Mulberry32::new(3)).is_ok());
    }

    // =====================================================================
    // Landing
    // =====================================================================

    #[test]
    fn test_land_creates_deterministic_question() {
        let mut a = playing(2);
        let mut b = playing(2);
        for state in [&mut a, &mut b] {
            state.roll_dice(pid(1), &mut Mulberry32::new(3)).unwrap();
            state.move_player(pid(1), 5).unwrap();
            state.land(pid(1), 0, &mut Mulberry32::new(3)).unwrap();
        }
        let qa = a.current_question.clone().unwrap();
        let qb = b.current_question.clone().unwrap();
        assert_eq!(qa.text, qb.text);
        assert_eq!(qa.target_player_id, pid(1));
        assert_eq!(qa.status, QuestionStatus::Pending);
        assert_eq!(qa.kind, a.board.tiles[5].kind);
        assert_eq!(a.dice_value, None);
        assert!(exclusive(&a));
    }

    #[test]
    fn test_land_on_red_sets_skill_timer_follow_up() {
        let mut state = playing(1);
        let red = state
            .board
            .tiles
            .iter()
            .position(|t| t.kind == TileKind::Red)
            .expect("board has a red tile");
        state.roll_dice(pid(1), &mut Mulberry32::new(1)).unwrap();
        state.move_player(pid(1), red as u32).unwrap();
        state.land(pid(1), 0, &mut Mulberry32::new(1)).unwrap();
        let q = state.current_question.as_ref().unwrap();
        assert_eq!(q.next_minigame, Some(MinigameKind::SkillTimer));
    }

    #[test]
    fn test_land_on_bonus_awards_point_and_asks() {
        let mut state = playing(1);
        let bonus = state
            .board
            .tiles
            .iter()
            .position(|t| t.kind == TileKind::Bonus)
            .unwrap();
        state.roll_dice(pid(1), &mut Mulberry32::new(1)).unwrap();
        state.move_player(pid(1), bonus as u32).unwrap();
        let landing = state.land(pid(1), 0, &mut Mulberry32::new(1)).unwrap();
        assert_eq!(
            landing,
            Landing::Question {
                kind: TileKind::Bonus,
                bonus_awarded: true
            }
        );
        assert_eq!(state.players[0].bonus_points, 1);
        assert_eq!(state.current_question.as_ref().unwrap().kind, TileKind::Bonus);
    }

    #[test]
    fn test_land_on_occupied_tile_starts_duel() {
        let mut state = playing(2);
        state.players[1].position = 4;
        state.roll_dice(pid(1), &mut Mulberry32::new(1)).unwrap();
        state.move_player(pid(1), 4).unwrap();
        let landing = state.land(pid(1), 1_000, &mut Mulberry32::new(1)).unwrap();
        let Landing::Duel { minigame, opponent } = landing else {
            panic!("expected a duel, got {landing:?}");
        };
        assert_eq!(opponent, pid(2));
        assert_eq!(state.minigame_id(), Some(minigame));
        assert!(state.current_question.is_none());
        assert!(exclusive(&state));
        assert_eq!(state.duel().unwrap().duelists, [pid(1), pid(2)]);
    }

    // =====================================================================
    // Questions
    // =====================================================================

    #[test]
    fn test_question_lifecycle_and_votes() {
        let mut state = playing(3);
        let target = ask(&mut state, TileKind::Blue);

        assert_eq!(state.vote_question(pid(2), Vote::Up), Err(Rejection::QuestionNotOpen));
        assert_eq!(state.open_question(pid(2)), Err(Rejection::NotTarget));
        state.open_question(target).unwrap();
        assert_eq!(state.open_question(target), Err(Rejection::QuestionAlreadyOpen));

        assert_eq!(state.vote_question(target, Vote::Up), Err(Rejection::OwnQuestion));
        state.vote_question(pid(2), Vote::Up).unwrap();
        state.vote_question(pid(2), Vote::Down).unwrap();
        state.vote_question(pid(3), Vote::Down).unwrap();

        let votes = &state.current_question.as_ref().unwrap().votes;
        assert!(votes.up.is_empty());
        assert_eq!(votes.down, vec![pid(2), pid(3)]);

        let validation = state.validate_question(target, 0).unwrap();
        assert!(matches!(validation, Validation::TurnAdvanced(_)));
        assert!(state.current_question.is_none());
        assert_eq!(state.current_player_index, 1);
        let summary = state.question_history.last().unwrap();
        assert_eq!((summary.up_votes, summary.down_votes), (0, 2));
    }

    #[test]
    fn test_board_actions_blocked_while_question_active() {
        let mut state = playing(2);
        ask(&mut state, TileKind::Blue);
        assert_eq!(state.roll_dice(pid(1), &mut Mulberry32::new(1)), Err(Rejection::QuestionActive));
        assert_eq!(state.next_turn(), Err(Rejection::QuestionActive));
    }

    #[test]
    fn test_validate_red_question_starts_skill_timer() {
        let mut state = playing(2);
        let target = ask(&mut state, TileKind::Red);
        state.open_question(target).unwrap();
        let validation = state.validate_question(target, 10_000).unwrap();
        let Validation::MinigameStarted(id) = validation else {
            panic!("expected a minigame");
        };
        let timer = state.skill_timer().unwrap();
        assert_eq!(timer.id, id);
        assert_eq!(timer.target, target);
        assert_eq!(timer.start_at, 14_000);
        assert!(exclusive(&state));
        // Turn does not pass until the timer completes.
        assert_eq!(state.current_player_index, 0);
    }

    // =====================================================================
    // Skill timer
    // =====================================================================

    #[test]
    fn test_skill_timer_progress_and_completion() {
        let mut state = playing(2);
        let target = ask(&mut state, TileKind::Red);
        state.open_question(target).unwrap();
        state.validate_question(target, 0).unwrap();

        assert_eq!(state.update_skill_timer(pid(2), 10.0), Err(Rejection::NotTarget));
        assert_eq!(state.update_skill_timer(target, 13.7), Ok(13));
        assert_eq!(state.players[0].bonus_points, 0);

        let result = state.complete_skill_timer(target, 18.0).unwrap();
        assert_eq!(result.stars, 3);
        assert_eq!(state.players[0].bonus_points, 3);
        assert!(state.current_minigame.is_none());
        assert_eq!(state.current_player_index, 1);
    }

    #[test]
    fn test_expire_skill_timer_uses_mirrored_score() {
        let mut state = playing(2);
        let target = ask(&mut state, TileKind::Red);
        state.open_question(target).unwrap();
        let Validation::MinigameStarted(id) = state.validate_question(target, 0).unwrap() else {
            panic!("expected a minigame");
        };
        state.update_skill_timer(target, 7.0).unwrap();
        assert_eq!(state.expire_skill_timer(MinigameId(id.0 + 1)), Err(Rejection::NoMinigame));
        let result = state.expire_skill_timer(id).unwrap();
        assert_eq!(result.stars, 1);
        assert_eq!(state.expire_skill_timer(id), Err(Rejection::NoMinigame));
    }

    // =====================================================================
    // Turn order
    // =====================================================================

    #[test]
    fn test_next_turn_wraps_and_counts_rounds() {
        let mut state = playing(2);
        let first = state.next_turn().unwrap();
        assert_eq!(state.current_player_index, 1);
        assert!(!first.started_new_round());
        let second = state.next_turn().unwrap();
        assert_eq!(state.current_player_index, 0);
        assert_eq!(state.current_round, 2);
        assert!(second.started_new_round());
    }

    #[test]
    fn test_next_turn_skips_flagged_player_once() {
        let mut state = playing(3);
        state.players[1].skip_next_turn = true;
        state.next_turn().unwrap();
        assert_eq!(state.current_player_index, 2);
        assert!(!state.players[1].skip_next_turn);
        state.next_turn().unwrap();
        state.next_turn().unwrap();
        assert_eq!(state.current_player_index, 1);
    }

    #[test]
    fn test_next_turn_terminates_when_everyone_is_flagged() {
        let mut state = playing(3);
        for p in &mut state.players {
            p.skip_next_turn = true;
        }
        state.next_turn().unwrap();
        assert!(state.players.iter().all(|p| !p.skip_next_turn));
        assert!(state.current_player_index < 3);
    }

    #[test]
    fn test_next_turn_past_max_rounds_enters_results() {
        let mut state = playing(2);
        state.max_rounds = 2;
        for _ in 0..3 {
            state.next_turn().unwrap();
        }
        assert_eq!(state.phase, GamePhase::Playing);
        let last = state.next_turn().unwrap();
        assert!(last.finished);
        assert_eq!(state.phase, GamePhase::Results);
        assert_eq!(state.current_round, 2);
        assert_eq!(state.next_turn(), Err(Rejection::NotPlaying));
    }

    // =====================================================================
    // Duel through the state machine
    // =====================================================================

    #[test]
    fn test_duel_transfer_moves_points_and_resumes_turns() {
        let mut state = playing(2);
        state.players[0].bonus_points = 1;
        state.players[1].bonus_points = 7;
        let mut rng = Mulberry32::new(9);
        let id = state.start_duel(pid(1), pid(2), 0, &mut rng).unwrap();

        // Player 1 answers every word correctly, player 2 never answers.
        loop {
            let duel = state.duel().unwrap();
            match duel.phase {
                DuelPhase::Between => {
                    let at = duel.next_word_at.unwrap();
                    state.advance_duel(id, DuelPhase::Between, at, &mut rng).unwrap();
                }
                phase @ (DuelPhase::Word | DuelPhase::SuddenDeath) => {
                    let verdict = duel.current_verdict().unwrap();
                    let (start, end) = (duel.word_started_at.unwrap(), duel.word_ends_at.unwrap());
                    state.submit_duel(pid(1), verdict, start).unwrap();
                    state.advance_duel(id, phase, end, &mut rng).unwrap();
                }
                DuelPhase::Transfer => break,
            }
        }

        let transfer = state.duel().unwrap().transfer.unwrap();
        assert_eq!(transfer.winner, pid(1));
        assert_eq!(transfer.amount, 5);
        assert_eq!(state.players[0].bonus_points, 6);
        assert_eq!(state.players[1].bonus_points, 2);

        assert_eq!(
            state.advance_duel(id, DuelPhase::Between, 0, &mut rng),
            Err(Rejection::WrongPhase)
        );
        let result = state.complete_duel(id).unwrap();
        assert_eq!(result.transfer, transfer);
        assert!(state.current_minigame.is_none());
        assert_eq!(state.current_player_index, 1);
    }

    #[test]
    fn test_advance_duel_with_stale_id_is_refused() {
        let mut state = playing(2);
        let mut rng = Mulberry32::new(9);
        let id = state.start_duel(pid(1), pid(2), 0, &mut rng).unwrap();
        let stale = MinigameId(id.0 + 100);
        assert_eq!(
            state.advance_duel(stale, DuelPhase::Between, 10_000, &mut rng),
            Err(Rejection::NoMinigame)
        );
        assert_eq!(
            state.advance_duel(id, DuelPhase::Word, 10_000, &mut rng),
            Err(Rejection::WrongPhase)
        );
    }

    // =====================================================================
    // Quiz through the state machine
    // =====================================================================

    #[test]
    fn test_quiz_points_apply_only_at_finish() {
        let mut state = playing(2);
        let mut rng = Mulberry32::new(5);
        let id = state.start_quiz(QuizOptions {
            rounds: 1,
            ..QuizOptions::default()
        })
        .unwrap();
        let quiz = state.quiz_mut(id).unwrap();
        quiz.start_round(0, &mut rng).unwrap();
        let answer = quiz.current_answer().unwrap();
        state.submit_quiz(pid(1), 1, answer.as_str(), 100).unwrap();

        let quiz = state.quiz_mut(id).unwrap();
        quiz.reveal().unwrap();
        assert_eq!(state.players[0].bonus_points, 0);
        assert_eq!(state.finish_quiz(id), Err(Rejection::WrongPhase));

        assert!(state.quiz_mut(id).unwrap().advance().unwrap());
        let result = state.finish_quiz(id).unwrap();
        assert_eq!(result.points_gained[&pid(1)], 4);
        assert_eq!(state.players[0].bonus_points, 4);
        assert!(state.current_minigame.is_none());
    }

    #[test]
    fn test_submit_quiz_without_quiz() {
        let mut state = playing(1);
        assert_eq!(state.submit_quiz(pid(1), 1, "DEV", 0), Err(QuizRejection::NoActiveRound));
    }

    // =====================================================================
    // Remap and removal
    // =====================================================================

    #[test]
    fn test_remap_player_rewrites_question_and_votes() {
        let mut state = playing(3);
        state.players[0].bonus_points = 4;
        let target = ask(&mut state, TileKind::Blue);
        state.open_question(target).unwrap();
        state.vote_question(pid(2), Vote::Up).unwrap();

        assert!(state.remap_player(pid(1), pid(10)));
        assert!(state.remap_player(pid(2), pid(20)));
        assert!(!state.remap_player(pid(99), pid(100)));

        assert_eq!(state.players[0].id, pid(10));
        assert_eq!(state.players[0].bonus_points, 4);
        let q = state.current_question.as_ref().unwrap();
        assert_eq!(q.target_player_id, pid(10));
        assert_eq!(q.votes.up, vec![pid(20)]);
        state.open_question(pid(10)).unwrap_err();
        state.validate_question(pid(10), 0).unwrap();
    }

    #[test]
    fn test_remove_question_target_clears_question() {
        let mut state = playing(3);
        let target = ask(&mut state, TileKind::Blue);
        let removal = state.remove_player(target);
        assert!(removal.cleared_question);
        assert!(removal.advance.is_none());
        assert_eq!(state.current_player().unwrap().id, pid(2));
    }

    #[test]
    fn test_remove_voter_strips_their_ballot() {
        let mut state = playing(3);
        let target = ask(&mut state, TileKind::Blue);
        state.open_question(target).unwrap();
        state.vote_question(pid(3), Vote::Up).unwrap();
        state.remove_player(pid(3));
        assert!(state.current_question.as_ref().unwrap().votes.up.is_empty());
    }

    #[test]
    fn test_remove_other_duelist_clears_duel_and_passes_turn() {
        let mut state = playing(3);
        let id = state.start_duel(pid(1), pid(2), 0, &mut Mulberry32::new(1)).unwrap();
        let removal = state.remove_player(pid(2));
        assert_eq!(removal.cleared_minigame, Some(id));
        assert!(state.current_minigame.is_none());
        assert!(removal.advance.is_some());
        assert_eq!(state.current_player().unwrap().id, pid(3));
    }

    #[test]
    fn test_start_quiz_without_rounds_is_refused() {
        let mut state = playing(2);
        let options = QuizOptions {
            rounds: 0,
            ..QuizOptions::default()
        };
        assert_eq!(state.start_quiz(options), Err(Rejection::NoQuizRounds));
        assert!(state.current_minigame.is_none());
        assert!(state.next_turn().is_ok());
    }

    #[test]
    fn test_remove_bystander_keeps_duel() {
        let mut state = playing(3);
        let id = state.start_duel(pid(1), pid(2), 0, &mut Mulberry32::new(1)).unwrap();
        let removal = state.remove_player(pid(3));
        assert!(removal.cleared_minigame.is_none());
        assert_eq!(state.current_minigame.as_ref().map(Minigame::id), Some(id));
    }

    #[test]
    fn test_remove_quiz_participant_keeps_quiz_running() {
        let mut state = playing(3);
        let id = state.start_quiz(QuizOptions::default()).unwrap();
        let removal = state.remove_player(pid(3));
        assert!(removal.cleared_minigame.is_none());
        assert_eq!(state.quiz_mut(id).unwrap().participants, vec![pid(1), pid(2)]);
    }

    #[test]
    fn test_remove_before_current_keeps_same_current_player() {
        let mut state = playing(3);
        state.next_turn().unwrap();
        state.next_turn().unwrap();
        assert_eq!(state.current_player().unwrap().id, pid(3));
        state.remove_player(pid(1));
        assert_eq!(state.current_player().unwrap().id, pid(3));
    }

    #[test]
    fn test_remove_last_player_returns_to_lobby() {
        let mut state = playing(1);
        state.remove_player(pid(1));
        assert_eq!(state.phase, GamePhase::Lobby);
        assert!(state.current_player().is_none());
    }

    #[test]
    fn test_reset_keeps_minigame_ids_unique() {
        let mut state = playing(2);
        let first = state.start_quiz(QuizOptions::default()).unwrap();
        state.reset(board::generate(7, &BoardOptions::default()));
        assert_eq!(state.phase, GamePhase::Lobby);
        assert!(state.players.is_empty());
        state.start(&seeds(2)).unwrap();
        let second = state.start_quiz(QuizOptions::default()).unwrap();
        assert_ne!(first, second);
    }
}
