//! The three timed minigames and the slot that holds the active one.
//!
//! A room runs at most one minigame at a time. [`Minigame`] is the sum of
//! the three engines; every instance carries a [`MinigameId`] handed out by
//! the game state, so a timer scheduled for one instance can tell whether
//! the minigame it finds on firing is still the same one.

pub mod duel;
pub mod quiz;
pub mod skill_timer;

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::PlayerId;

pub use duel::{Duel, DuelPhase, DuelWord, RoundType, Transfer, Verdict};
pub use quiz::{Quiz, QuizOptions, QuizRejection, QuizStatus, Role, RoundReveal, RoundStart};
pub use skill_timer::SkillTimer;

/// Generation token of a minigame instance. Never reused within a game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MinigameId(pub u64);

impl fmt::Display for MinigameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "M-{}", self.0)
    }
}

/// Which minigame, as named on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MinigameKind {
    SkillTimer,
    Duel,
    Quiz,
}

impl fmt::Display for MinigameKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::SkillTimer => "SKILL_TIMER",
            Self::Duel => "DUEL",
            Self::Quiz => "QUIZ",
        };
        f.write_str(name)
    }
}

/// The active minigame of a room.
#[derive(Debug, Clone)]
pub enum Minigame {
    SkillTimer(SkillTimer),
    Duel(Duel),
    Quiz(Quiz),
}

impl Minigame {
    pub fn id(&self) -> MinigameId {
        match self {
            Self::SkillTimer(m) => m.id,
            Self::Duel(m) => m.id,
            Self::Quiz(m) => m.id,
        }
    }

    pub fn kind(&self) -> MinigameKind {
        match self {
            Self::SkillTimer(_) => MinigameKind::SkillTimer,
            Self::Duel(_) => MinigameKind::Duel,
            Self::Quiz(_) => MinigameKind::Quiz,
        }
    }

    /// Whether `player` plays in this minigame.
    pub fn involves(&self, player: PlayerId) -> bool {
        match self {
            Self::SkillTimer(m) => m.target == player,
            Self::Duel(m) => m.is_duelist(player),
            Self::Quiz(m) => m.participants.contains(&player),
        }
    }

    pub(crate) fn remap_player(&mut self, from: PlayerId, to: PlayerId) {
        match self {
            Self::SkillTimer(m) => {
                if m.target == from {
                    m.target = to;
                }
            }
            Self::Duel(m) => m.remap_player(from, to),
            Self::Quiz(m) => m.remap_participant(from, to),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prng::Mulberry32;

    fn pid(n: u64) -> PlayerId {
        PlayerId(n)
    }

    #[test]
    fn test_involves_each_kind() {
        let timer = Minigame::SkillTimer(SkillTimer::new(MinigameId(1), pid(1), 0));
        assert!(timer.involves(pid(1)));
        assert!(!timer.involves(pid(2)));

        let duel = Duel::new(MinigameId(2), pid(1), pid(2), 0, &mut Mulberry32::new(5)).unwrap();
        let duel = Minigame::Duel(duel);
        assert!(duel.involves(pid(2)));
        assert!(!duel.involves(pid(3)));

        let quiz = Minigame::Quiz(Quiz::new(MinigameId(3), vec![pid(1), pid(3)], QuizOptions::default()));
        assert!(quiz.involves(pid(3)));
        assert!(!quiz.involves(pid(2)));
    }
}
