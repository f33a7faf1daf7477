//! One room: its lobby, its game, and the timers that drive both.
//!
//! A `Room` never talks to connections directly. Every operation pushes
//! the messages it produces into an [`Outbox`] of `(Recipient, message)`
//! pairs, and the [`RoomManager`](crate::RoomManager) delivers them to
//! whichever connections are attached when it flushes.
//!
//! Timed steps (dice settle, duel words, quiz rounds, reconnect grace) are
//! scheduled on the room's own [`TimerSet`]. Each carries a [`TimerKind`]
//! naming the minigame instance and the phase or round it was armed for;
//! when it fires, the room re-checks both before doing anything.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::Rng;
use retroboard_game::minigame::duel::DUEL_TRANSFER_DISPLAY_MS;
use retroboard_game::minigame::quiz::QUIZ_ANNOUNCE_MS;
use retroboard_game::{
    generate, Board, BoardOptions, DuelAnswer, DuelPhase, DuelStep, GamePhase, GameSnapshot,
    GameState, Landing, MinigameId, MinigameKind, PlayerSeed, Rejection, SkillTimerResult,
    Transfer, TurnAdvance, Validation,
};
use retroboard_protocol::{ClientMessage, MinigameSummary, PlayerId, ServerMessage};
use retroboard_session::{Lobby, SessionId};
use retroboard_timer::{Fired, TimerId, TimerSet};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::{RoomConfig, RoomError};

/// Characters a room code is drawn from.
const CODE_ALPHABET: &[u8] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// Board seeds are drawn from `0..BOARD_SEED_RANGE`.
const BOARD_SEED_RANGE: u32 = 1_000_000_000;

// ---------------------------------------------------------------------------
// Addressing
// ---------------------------------------------------------------------------

/// Who an outbound message is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recipient {
    /// Every connection attached to the room.
    All,
    /// One connection.
    Player(PlayerId),
}

/// Messages produced by a room operation, in delivery order.
pub type Outbox = Vec<(Recipient, ServerMessage)>;

// ---------------------------------------------------------------------------
// RoomCode
// ---------------------------------------------------------------------------

/// The short code players type to join a room.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RoomCode(String);

impl RoomCode {
    /// A random code of `length` characters from `[0-9A-Z]`.
    pub fn generate<R: Rng + ?Sized>(rng: &mut R, length: usize) -> Self {
        let code = (0..length)
            .map(|_| CODE_ALPHABET[rng.random_range(0..CODE_ALPHABET.len())] as char)
            .collect();
        Self(code)
    }

    /// Normalizes a code as typed by a player.
    pub fn parse(s: &str) -> Self {
        Self(s.trim().to_ascii_uppercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoomCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// Timers
// ---------------------------------------------------------------------------

/// A scheduled step, addressed to a room by code so it can be dropped if
/// the room is gone by the time it fires.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomTimer {
    pub code: RoomCode,
    pub kind: TimerKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimerKind {
    /// End of the dice animation.
    SettleDice,
    /// Next step of a duel that should still be in `phase`.
    DuelStep { minigame: MinigameId, phase: DuelPhase },
    /// The transfer was on screen long enough.
    DuelTransferDone { minigame: MinigameId },
    QuizRoundStart { minigame: MinigameId, round: u32 },
    QuizReveal { minigame: MinigameId, round: u32 },
    QuizAdvance { minigame: MinigameId, round: u32 },
    /// The target never reported completion.
    SkillTimerExpired { minigame: MinigameId },
    /// A disconnected seat ran out of grace.
    GraceExpired { session: SessionId, player: PlayerId },
}

// ---------------------------------------------------------------------------
// Room
// ---------------------------------------------------------------------------

/// What removing a member did to the room.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Departure {
    NotMember,
    Removed,
    /// The host is gone; the room must close.
    HostLeft,
    /// Nobody is left.
    Emptied,
}

/// A live room.
pub struct Room {
    code: RoomCode,
    host: Option<PlayerId>,
    lobby: Lobby,
    game: GameState,
    config: RoomConfig,
    timers: TimerSet<RoomTimer>,
    minigame_timer: Option<TimerId>,
    dice_timer: Option<TimerId>,
    grace_timers: HashMap<SessionId, TimerId>,
    rng: StdRng,
}

impl Room {
    pub(crate) fn new(
        code: RoomCode,
        config: RoomConfig,
        timer_tx: mpsc::UnboundedSender<Fired<RoomTimer>>,
        mut rng: StdRng,
    ) -> Self {
        let board = new_board(&mut rng, &config.board);
        Self {
            code,
            host: None,
            lobby: Lobby::new(config.session.clone()),
            game: GameState::new(board, config.max_rounds),
            config,
            timers: TimerSet::new(timer_tx),
            minigame_timer: None,
            dice_timer: None,
            grace_timers: HashMap::new(),
            rng,
        }
    }

    pub fn code(&self) -> &RoomCode {
        &self.code
    }

    pub fn host(&self) -> Option<PlayerId> {
        self.host
    }

    pub fn lobby(&self) -> &Lobby {
        &self.lobby
    }

    pub fn game(&self) -> &GameState {
        &self.game
    }

    pub fn snapshot(&self) -> GameSnapshot {
        self.game.snapshot()
    }

    /// Timers scheduled and not yet fired or cancelled.
    pub fn pending_timers(&self) -> usize {
        self.timers.len()
    }

    /// Appends the `lobby_update` / `state_update` pair every mutation
    /// ends with.
    pub(crate) fn sync(&self, out: &mut Outbox) {
        out.push((
            Recipient::All,
            ServerMessage::LobbyUpdate {
                players: self.lobby.views(),
            },
        ));
        out.push((
            Recipient::All,
            ServerMessage::StateUpdate {
                state: Box::new(self.game.snapshot()),
            },
        ));
    }

    // -----------------------------------------------------------------------
    // Membership
    // -----------------------------------------------------------------------

    /// Seats a new member. Returns the session id they reconnect with.
    pub(crate) fn add_member(
        &mut self,
        player: PlayerId,
        name: String,
        avatar: u32,
        session_id: Option<SessionId>,
        as_host: bool,
    ) -> Result<Option<SessionId>, RoomError> {
        if self.game.phase != GamePhase::Lobby {
            return Err(RoomError::AlreadyStarted);
        }
        let session = self.lobby.add(player, name, avatar, session_id, as_host)?;
        if as_host {
            self.set_host(Some(player));
        }
        Ok(session)
    }

    /// Hands the seat of `session_id` to `player` and rewrites the old
    /// identity everywhere in the game. Returns the old identity.
    ///
    /// Only the seat's grace timer is cancelled. Dice and minigame timers
    /// stay armed: they belong to the game the player rejoins, and the
    /// remap above keeps them addressed to the right seat.
    pub(crate) fn reconnect(
        &mut self,
        session_id: &SessionId,
        player: PlayerId,
    ) -> Result<PlayerId, RoomError> {
        let previous = self.lobby.reconnect(session_id, player)?;
        self.cancel_grace(session_id);
        if previous != player {
            self.game.remap_player(previous, player);
            if self.host == Some(previous) {
                self.set_host(Some(player));
            }
        }
        Ok(previous)
    }

    /// Marks a member's connection as gone. Returns `true` if their seat
    /// is held for the grace window, `false` if they must be removed now.
    pub(crate) fn disconnect(&mut self, player: PlayerId) -> Result<bool, RoomError> {
        let member = self.lobby.disconnect(player)?;
        let Some(session) = member.session_id.clone() else {
            return Ok(false);
        };
        let grace = self.lobby.config().reconnect_grace;
        self.arm_grace(session, player, grace);
        Ok(true)
    }

    /// Whether a fired grace timer should still remove its member.
    pub(crate) fn grace_expired(&mut self, id: TimerId, session: &SessionId, player: PlayerId) -> bool {
        if self.grace_timers.get(session) == Some(&id) {
            self.grace_timers.remove(session);
        }
        self.lobby.still_disconnected(session, player)
    }

    /// Removes a member from the lobby and the game.
    pub(crate) fn remove_member(&mut self, player: PlayerId, out: &mut Outbox) -> Departure {
        let Some(member) = self.lobby.remove(player) else {
            return Departure::NotMember;
        };
        if let Some(session) = &member.session_id {
            self.cancel_grace(session);
        }
        if self.host == Some(player) {
            return Departure::HostLeft;
        }

        let removal = self.game.remove_player(player);
        if let Some(minigame) = removal.cleared_minigame {
            self.cancel_minigame_timer();
            info!(code = %self.code, %minigame, "minigame cleared by player removal");
        }
        if self.game.dice_value.is_none() {
            self.cancel_dice_timer();
        }
        if self.lobby.is_empty() {
            return Departure::Emptied;
        }
        if let Some(advance) = removal.advance {
            self.after_turn(advance, out);
        }
        Departure::Removed
    }

    fn set_host(&mut self, host: Option<PlayerId>) {
        self.host = host;
        self.lobby.set_host(host);
        self.game.set_host(host);
    }

    // -----------------------------------------------------------------------
    // Timer bookkeeping
    // -----------------------------------------------------------------------

    fn schedule(&mut self, delay: Duration, kind: TimerKind) -> TimerId {
        let event = RoomTimer {
            code: self.code.clone(),
            kind,
        };
        self.timers.schedule(delay, event)
    }

    /// Replaces the pending minigame step, if any.
    fn arm_minigame(&mut self, delay_ms: u64, kind: TimerKind) {
        self.cancel_minigame_timer();
        let id = self.schedule(Duration::from_millis(delay_ms), kind);
        self.minigame_timer = Some(id);
    }

    fn cancel_minigame_timer(&mut self) {
        if let Some(id) = self.minigame_timer.take() {
            self.timers.cancel(id);
        }
    }

    fn cancel_dice_timer(&mut self) {
        if let Some(id) = self.dice_timer.take() {
            self.timers.cancel(id);
        }
    }

    fn arm_grace(&mut self, session: SessionId, player: PlayerId, delay: Duration) {
        self.cancel_grace(&session);
        let id = self.schedule(
            delay,
            TimerKind::GraceExpired {
                session: session.clone(),
                player,
            },
        );
        self.grace_timers.insert(session, id);
    }

    fn cancel_grace(&mut self, session: &SessionId) {
        if let Some(id) = self.grace_timers.remove(session) {
            self.timers.cancel(id);
        }
    }

    /// Retires a fired timer. `false` means it was cancelled after it fired
    /// and the event must be ignored.
    pub(crate) fn retire_timer(&mut self, id: TimerId) -> bool {
        if !self.timers.complete(id) {
            return false;
        }
        if self.minigame_timer == Some(id) {
            self.minigame_timer = None;
        }
        if self.dice_timer == Some(id) {
            self.dice_timer = None;
        }
        true
    }

    /// Cancels everything. Returns how many timers were pending.
    pub(crate) fn cancel_all_timers(&mut self) -> usize {
        self.minigame_timer = None;
        self.dice_timer = None;
        self.grace_timers.clear();
        self.timers.cancel_all()
    }

    // -----------------------------------------------------------------------
    // Game actions
    // -----------------------------------------------------------------------

    fn ensure_host(&self, player: PlayerId) -> Result<(), RoomError> {
        if self.host == Some(player) {
            Ok(())
        } else {
            Err(RoomError::NotHost(player))
        }
    }

    /// Applies an in-game action from `player`.
    pub(crate) fn apply(
        &mut self,
        player: PlayerId,
        msg: ClientMessage,
        now: u64,
        out: &mut Outbox,
    ) -> Result<(), RoomError> {
        match msg {
            ClientMessage::StartGame => self.start_game(player)?,
            ClientMessage::ResetGame => self.reset_game(player)?,
            ClientMessage::RollDice => {
                let value = self.game.roll_dice(player, &mut self.rng)?;
                debug!(code = %self.code, player_id = %player, value, "dice rolled");
                self.cancel_dice_timer();
                let settle = self.config.dice_settle;
                self.dice_timer = Some(self.schedule(settle, TimerKind::SettleDice));
            }
            ClientMessage::MovePlayer { steps } => self.move_and_land(player, steps, now, out)?,
            ClientMessage::OpenQuestion => self.game.open_question(player)?,
            ClientMessage::VoteQuestion { vote } => self.game.vote_question(player, vote)?,
            ClientMessage::ValidateQuestion => match self.game.validate_question(player, now)? {
                Validation::TurnAdvanced(advance) => self.after_turn(advance, out),
                Validation::MinigameStarted(minigame) => self.announce_skill_timer(minigame, now, out),
            },
            ClientMessage::NextTurn => {
                self.ensure_host(player)?;
                let advance = self.game.next_turn()?;
                self.after_turn(advance, out);
            }
            ClientMessage::SkillTimerProgress { score } => {
                self.game.update_skill_timer(player, score)?;
            }
            ClientMessage::SkillTimerComplete { score } => {
                let result = self.game.complete_skill_timer(player, score)?;
                self.cancel_minigame_timer();
                self.end_skill_timer(result, out);
            }
            ClientMessage::DuelSubmit { category } => {
                let minigame = self.game.minigame_id().ok_or(Rejection::NoMinigame)?;
                if let DuelAnswer::TransferStarted(transfer) = self.game.submit_duel(player, category, now)? {
                    log_transfer(&self.code, minigame, &transfer, "duel won in sudden death");
                    self.schedule_duel_step(minigame, now);
                }
            }
            ClientMessage::QuizSubmit { round_index, role } => {
                self.submit_quiz(player, round_index, &role, now, out)?;
            }
            // Lobby traffic is handled by the manager.
            ClientMessage::CreateRoom { .. }
            | ClientMessage::JoinRoom { .. }
            | ClientMessage::ReconnectRoom { .. }
            | ClientMessage::LeaveRoom => {}
        }
        Ok(())
    }

    /// Starts the game with every connected member, in lobby order.
    fn start_game(&mut self, player: PlayerId) -> Result<(), RoomError> {
        self.ensure_host(player)?;
        let seeds: Vec<PlayerSeed> = self
            .lobby
            .connected()
            .map(|m| PlayerSeed {
                id: m.player_id,
                name: m.name.clone(),
                avatar: m.avatar,
                is_host: m.is_host,
            })
            .collect();
        self.game.start(&seeds)?;
        info!(code = %self.code, players = seeds.len(), "game started");
        Ok(())
    }

    /// Back to the lobby on a fresh board. Lobby members stay.
    fn reset_game(&mut self, player: PlayerId) -> Result<(), RoomError> {
        self.ensure_host(player)?;
        let cancelled = self.cancel_all_timers();

        // Seats already waiting for their player keep what is left of
        // their grace window.
        let grace = self.lobby.config().reconnect_grace;
        let waiting: Vec<(SessionId, PlayerId, Duration)> = self
            .lobby
            .members()
            .iter()
            .filter_map(|m| {
                let session = m.session_id.clone()?;
                let gone = m.disconnected_for()?;
                Some((session, m.player_id, grace.saturating_sub(gone)))
            })
            .collect();
        for (session, player, remaining) in waiting {
            self.arm_grace(session, player, remaining);
        }

        let board = new_board(&mut self.rng, &self.config.board);
        self.game.reset(board);
        info!(code = %self.code, cancelled, seed = self.game.board.seed, "game reset");
        Ok(())
    }

    fn move_and_land(&mut self, player: PlayerId, steps: u32, now: u64, out: &mut Outbox) -> Result<(), RoomError> {
        let position = self.game.move_player(player, steps)?;
        match self.game.land(player, now, &mut self.rng) {
            Ok(Landing::Duel { minigame, opponent }) => {
                self.cancel_dice_timer();
                info!(code = %self.code, %minigame, a = %player, b = %opponent, position, "duel started");
                out.push((
                    Recipient::All,
                    ServerMessage::MinigameStart {
                        kind: MinigameKind::Duel,
                        minigame_id: minigame,
                        total_rounds: None,
                    },
                ));
                self.schedule_duel_step(minigame, now);
            }
            Ok(Landing::Question { kind, bonus_awarded }) => {
                self.cancel_dice_timer();
                debug!(code = %self.code, player_id = %player, position, ?kind, bonus_awarded, "question drawn");
            }
            Ok(Landing::Empty(advance)) => {
                self.cancel_dice_timer();
                debug!(code = %self.code, player_id = %player, position, "no tile to land on, turn passed");
                self.after_turn(advance, out);
            }
            Err(rejection) => {
                debug!(code = %self.code, player_id = %player, position, %rejection, "landing refused");
            }
        }
        Ok(())
    }

    /// Follows up on a turn change: starts the round quiz when a new round
    /// began.
    fn after_turn(&mut self, advance: TurnAdvance, out: &mut Outbox) {
        if advance.finished {
            info!(code = %self.code, rounds = self.game.max_rounds, "game finished");
            return;
        }
        if !(self.config.quiz_each_round && advance.started_new_round()) {
            return;
        }
        match self.game.start_quiz(self.config.quiz.clone()) {
            Ok(minigame) => {
                let rounds = self.config.quiz.rounds;
                info!(code = %self.code, %minigame, round = advance.round, rounds, "quiz started");
                out.push((
                    Recipient::All,
                    ServerMessage::MinigameStart {
                        kind: MinigameKind::Quiz,
                        minigame_id: minigame,
                        total_rounds: Some(rounds),
                    },
                ));
                self.arm_minigame(QUIZ_ANNOUNCE_MS, TimerKind::QuizRoundStart { minigame, round: 1 });
            }
            Err(rejection) => debug!(code = %self.code, %rejection, "round quiz skipped"),
        }
    }

    // -----------------------------------------------------------------------
    // Skill timer
    // -----------------------------------------------------------------------

    fn announce_skill_timer(&mut self, minigame: MinigameId, now: u64, out: &mut Outbox) {
        let Some(timer) = self.game.skill_timer() else {
            return;
        };
        let deadline = timer.ends_at().saturating_sub(now) + self.config.skill_timer_grace.as_millis() as u64;
        info!(code = %self.code, %minigame, player_id = %timer.target, "skill timer started");
        out.push((
            Recipient::All,
            ServerMessage::MinigameStart {
                kind: MinigameKind::SkillTimer,
                minigame_id: minigame,
                total_rounds: None,
            },
        ));
        self.arm_minigame(deadline, TimerKind::SkillTimerExpired { minigame });
    }

    fn end_skill_timer(&mut self, result: SkillTimerResult, out: &mut Outbox) {
        info!(
            code = %self.code,
            minigame = %result.minigame,
            player_id = %result.player,
            score = result.score,
            stars = result.stars,
            "skill timer finished"
        );
        out.push((
            Recipient::All,
            ServerMessage::MinigameEnd {
                kind: MinigameKind::SkillTimer,
                minigame_id: result.minigame,
                summary: MinigameSummary {
                    points_gained: BTreeMap::from([(result.player, i64::from(result.stars))]),
                },
            },
        ));
        self.after_turn(result.advance, out);
    }

    // -----------------------------------------------------------------------
    // Duel
    // -----------------------------------------------------------------------

    /// Arms the timer for whatever the duel is waiting on now.
    fn schedule_duel_step(&mut self, minigame: MinigameId, now: u64) {
        let Some(duel) = self.game.duel() else {
            return;
        };
        let (phase, due) = match duel.phase {
            DuelPhase::Between => (DuelPhase::Between, duel.next_word_at),
            DuelPhase::Word | DuelPhase::SuddenDeath => (duel.phase, duel.word_ends_at),
            DuelPhase::Transfer => {
                self.arm_minigame(DUEL_TRANSFER_DISPLAY_MS, TimerKind::DuelTransferDone { minigame });
                return;
            }
        };
        let delay = due.map_or(0, |at| at.saturating_sub(now));
        self.arm_minigame(delay, TimerKind::DuelStep { minigame, phase });
    }

    // -----------------------------------------------------------------------
    // Quiz
    // -----------------------------------------------------------------------

    fn submit_quiz(
        &mut self,
        player: PlayerId,
        round_index: u32,
        role: &str,
        now: u64,
        out: &mut Outbox,
    ) -> Result<(), RoomError> {
        if let Err(reason) = self.game.submit_quiz(player, round_index, role, now) {
            debug!(code = %self.code, player_id = %player, round_index, %reason, "quiz answer refused");
            out.push((
                Recipient::Player(player),
                ServerMessage::QuizSubmitResult {
                    accepted: false,
                    reason: Some(reason),
                },
            ));
            return Ok(());
        }
        out.push((
            Recipient::Player(player),
            ServerMessage::QuizSubmitResult {
                accepted: true,
                reason: None,
            },
        ));

        let full_round = self
            .game
            .quiz()
            .filter(|quiz| quiz.all_submitted())
            .map(|quiz| (quiz.id, quiz.round_index));
        if let Some((minigame, round)) = full_round {
            self.reveal_quiz_round(minigame, round, out)?;
        }
        Ok(())
    }

    fn start_quiz_round(&mut self, minigame: MinigameId, round: u32, now: u64, out: &mut Outbox) -> Result<(), RoomError> {
        let quiz = self.game.quiz_mut(minigame)?;
        if quiz.round_index != round {
            return Err(Rejection::WrongPhase.into());
        }
        let window = quiz.options.answer_window_ms;
        let start = quiz.start_round(now, &mut self.rng)?;
        debug!(code = %self.code, %minigame, round, quote = %start.quote_id, "quiz round opened");
        out.push((Recipient::All, ServerMessage::QuizRoundStart(start)));
        self.arm_minigame(window, TimerKind::QuizReveal { minigame, round });
        Ok(())
    }

    fn reveal_quiz_round(&mut self, minigame: MinigameId, round: u32, out: &mut Outbox) -> Result<(), RoomError> {
        let quiz = self.game.quiz_mut(minigame)?;
        if quiz.round_index != round {
            return Err(Rejection::WrongPhase.into());
        }
        let hold = quiz.options.reveal_ms;
        let reveal = quiz.reveal()?;
        debug!(code = %self.code, %minigame, round, winners = reveal.winners.len(), "quiz round revealed");
        out.push((Recipient::All, ServerMessage::QuizRoundReveal(reveal)));
        self.arm_minigame(hold, TimerKind::QuizAdvance { minigame, round });
        Ok(())
    }

    fn advance_quiz(&mut self, minigame: MinigameId, round: u32, out: &mut Outbox) -> Result<(), RoomError> {
        let quiz = self.game.quiz_mut(minigame)?;
        if quiz.round_index != round {
            return Err(Rejection::WrongPhase.into());
        }
        let pause = quiz.options.between_rounds_ms;
        if !quiz.advance()? {
            self.arm_minigame(pause, TimerKind::QuizRoundStart { minigame, round: round + 1 });
            return Ok(());
        }

        let result = self.game.finish_quiz(minigame)?;
        info!(code = %self.code, %minigame, "quiz finished");
        out.push((
            Recipient::All,
            ServerMessage::MinigameEnd {
                kind: MinigameKind::Quiz,
                minigame_id: minigame,
                summary: MinigameSummary {
                    points_gained: result
                        .points_gained
                        .into_iter()
                        .map(|(player, points)| (player, i64::from(points)))
                        .collect(),
                },
            },
        ));
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Fired timers
    // -----------------------------------------------------------------------

    /// Runs a fired game timer. An `Err` means the state moved on since the
    /// timer was armed and the event is stale.
    pub(crate) fn on_timer(&mut self, kind: TimerKind, now: u64, out: &mut Outbox) -> Result<(), RoomError> {
        match kind {
            TimerKind::SettleDice => self.game.settle_dice()?,
            TimerKind::DuelStep { minigame, phase } => {
                let step = self.game.advance_duel(minigame, phase, now, &mut self.rng)?;
                if let DuelStep::TransferStarted(transfer) = step {
                    log_transfer(&self.code, minigame, &transfer, "duel won");
                }
                self.schedule_duel_step(minigame, now);
            }
            TimerKind::DuelTransferDone { minigame } => {
                let result = self.game.complete_duel(minigame)?;
                let Transfer { winner, loser, amount, .. } = result.transfer;
                info!(code = %self.code, %minigame, "duel finished");
                out.push((
                    Recipient::All,
                    ServerMessage::MinigameEnd {
                        kind: MinigameKind::Duel,
                        minigame_id: minigame,
                        summary: MinigameSummary {
                            points_gained: BTreeMap::from([
                                (winner, i64::from(amount)),
                                (loser, -i64::from(amount)),
                            ]),
                        },
                    },
                ));
                self.after_turn(result.advance, out);
            }
            TimerKind::QuizRoundStart { minigame, round } => self.start_quiz_round(minigame, round, now, out)?,
            TimerKind::QuizReveal { minigame, round } => self.reveal_quiz_round(minigame, round, out)?,
            TimerKind::QuizAdvance { minigame, round } => self.advance_quiz(minigame, round, out)?,
            TimerKind::SkillTimerExpired { minigame } => {
                let result = self.game.expire_skill_timer(minigame)?;
                self.end_skill_timer(result, out);
            }
            // Membership timers are resolved by the manager.
            TimerKind::GraceExpired { .. } => {}
        }
        Ok(())
    }
}

impl fmt::Debug for Room {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Room")
            .field("code", &self.code)
            .field("host", &self.host)
            .field("members", &self.lobby.len())
            .field("phase", &self.game.phase)
            .field("timers", &self.timers.len())
            .finish()
    }
}

/// Generates a board on a random seed.
fn new_board<R: Rng + ?Sized>(rng: &mut R, options: &BoardOptions) -> Board {
    let seed = rng.random_range(0..BOARD_SEED_RANGE);
    let board = generate(seed, options);
    if board.is_empty() {
        warn!(seed, "board generation gave up; playing on an empty board");
    }
    board
}

fn log_transfer(code: &RoomCode, minigame: MinigameId, transfer: &Transfer, msg: &str) {
    info!(
        %code,
        %minigame,
        winner = %transfer.winner,
        loser = %transfer.loser,
        amount = transfer.amount,
        "{msg}"
    );
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;

    use super::*;

    #[test]
    fn test_room_code_shape() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..50 {
            let code = RoomCode::generate(&mut rng, 4);
            assert_eq!(code.as_str().len(), 4);
            assert!(code
                .as_str()
                .chars()
                .all(|c| c.is_ascii_digit() || c.is_ascii_uppercase()));
        }
    }

    #[test]
    fn test_room_code_parse_normalizes() {
        assert_eq!(RoomCode::parse(" ab1z "), RoomCode::parse("AB1Z"));
        assert_eq!(RoomCode::parse("ab1z").to_string(), "AB1Z");
    }

    #[test]
    fn test_new_board_is_seeded_below_range() {
        let mut rng = StdRng::seed_from_u64(1);
        let board = new_board(&mut rng, &BoardOptions::default());
        assert!(board.seed < BOARD_SEED_RANGE);
        assert_eq!(board.length, 45);
    }
}
