//! Discussion prompts raised when a player lands on a tile.

use serde::{Deserialize, Serialize};

use crate::board::TileKind;
use crate::minigame::MinigameKind;
use crate::PlayerId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuestionStatus {
    Pending,
    Open,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Vote {
    Up,
    Down,
}

/// Ballots on the current question. A voter appears in at most one list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Votes {
    pub up: Vec<PlayerId>,
    pub down: Vec<PlayerId>,
}

impl Votes {
    /// Records `voter`'s ballot, replacing any earlier one.
    pub fn cast(&mut self, voter: PlayerId, vote: Vote) {
        self.remove(voter);
        match vote {
            Vote::Up => self.up.push(voter),
            Vote::Down => self.down.push(voter),
        }
    }

    pub fn remove(&mut self, voter: PlayerId) {
        self.up.retain(|p| *p != voter);
        self.down.retain(|p| *p != voter);
    }

    pub(crate) fn remap(&mut self, from: PlayerId, to: PlayerId) {
        for p in self.up.iter_mut().chain(self.down.iter_mut()) {
            if *p == from {
                *p = to;
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    pub id: u64,
    #[serde(rename = "type")]
    pub kind: TileKind,
    pub text: String,
    pub target_player_id: PlayerId,
    pub votes: Votes,
    pub status: QuestionStatus,
    /// Minigame to launch once the question is validated.
    pub next_minigame: Option<MinigameKind>,
}

/// What is kept of a question once it has been validated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionSummary {
    pub id: u64,
    #[serde(rename = "type")]
    pub kind: TileKind,
    pub text: String,
    pub up_votes: usize,
    pub down_votes: usize,
}

impl From<&Question> for QuestionSummary {
    fn from(q: &Question) -> Self {
        Self {
            id: q.id,
            kind: q.kind,
            text: q.text.clone(),
            up_votes: q.votes.up.len(),
            down_votes: q.votes.down.len(),
        }
    }
}
