//! Skill-timer minigame: one player races a countdown to build a score.
//!
//! The score itself is produced client-side; the server only mirrors the
//! live value to spectators and converts the final score to stars.

use crate::minigame::MinigameId;
use crate::PlayerId;

/// Delay between the minigame being announced and the countdown starting.
pub const SKILL_TIMER_ANNOUNCE_MS: u64 = 4_000;

/// Length of the countdown.
pub const SKILL_TIMER_DURATION_MS: u64 = 20_000;

/// Highest score the server accepts.
pub const MAX_SKILL_SCORE: u32 = 999;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkillTimer {
    pub id: MinigameId,
    pub target: PlayerId,
    /// Server time (ms) at which the countdown starts.
    pub start_at: u64,
    pub duration_ms: u64,
    /// Last score mirrored from the target.
    pub score: u32,
}

impl SkillTimer {
    pub(crate) fn new(id: MinigameId, target: PlayerId, now: u64) -> Self {
        Self {
            id,
            target,
            start_at: now + SKILL_TIMER_ANNOUNCE_MS,
            duration_ms: SKILL_TIMER_DURATION_MS,
            score: 0,
        }
    }

    /// Server time (ms) at which the countdown ends.
    pub fn ends_at(&self) -> u64 {
        self.start_at + self.duration_ms
    }
}

/// Stars earned for a final score.
pub fn stars_for_score(score: u32) -> u32 {
    match score {
        18.. => 3,
        12.. => 2,
        6.. => 1,
        _ => 0,
    }
}

/// Normalizes a client-reported score: floored, clamped to `0..=999`.
pub fn clamp_score(raw: f64) -> u32 {
    if !raw.is_finite() {
        return 0;
    }
    raw.floor().clamp(0.0, f64::from(MAX_SKILL_SCORE)) as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stars_for_score_tiers() {
        assert_eq!(stars_for_score(0), 0);
        assert_eq!(stars_for_score(5), 0);
        assert_eq!(stars_for_score(6), 1);
        assert_eq!(stars_for_score(11), 1);
        assert_eq!(stars_for_score(12), 2);
        assert_eq!(stars_for_score(17), 2);
        assert_eq!(stars_for_score(18), 3);
        assert_eq!(stars_for_score(999), 3);
    }

    #[test]
    fn test_clamp_score_bounds() {
        assert_eq!(clamp_score(-4.0), 0);
        assert_eq!(clamp_score(12.9), 12);
        assert_eq!(clamp_score(5_000.0), MAX_SKILL_SCORE);
        assert_eq!(clamp_score(f64::NAN), 0);
        assert_eq!(clamp_score(f64::INFINITY), 0);
    }

    #[test]
    fn test_new_schedules_after_announce() {
        let timer = SkillTimer::new(MinigameId(1), PlayerId(2), 1_000);
        assert_eq!(timer.start_at, 5_000);
        assert_eq!(timer.ends_at(), 25_000);
        assert_eq!(timer.score, 0);
    }
}
