//! Static text banks: retrospective prompts, duel buzzwords, quiz quotes.
//!
//! The engine treats these as pure lookups. Prompts are picked with the
//! seeded stream so a landing always yields the same text for the same
//! board, round and position.

use crate::board::TileKind;
use crate::minigame::duel::Verdict;
use crate::minigame::quiz::Role;
use crate::prng::Mulberry32;

/// Text used when a tile category has no prompts.
pub const MISSING_QUESTION: &str = "(missing question)";

const BLUE: &[&str] = &[
    "What worked best this sprint?",
    "What did we ship that we can be proud of?",
    "Which moment was the most productive for the team?",
    "What took longer than expected?",
    "Which decision had a positive impact?",
    "Which task turned out simpler than planned?",
    "Which collaboration went really well?",
    "What did we learn about the way we work?",
    "Sum up the sprint in one sentence.",
];

const GREEN: &[&str] = &[
    "Which small improvement could have a big impact?",
    "How could we reduce interruptions?",
    "Which agile practice should we reinforce?",
    "What should we stop doing next sprint?",
    "Which automation would save us time?",
    "How could we make the backlog clearer?",
    "How could we catch bugs earlier?",
    "If we changed just one thing, what would it be?",
];

const RED: &[&str] = &[
    "What frustrated you the most this sprint?",
    "What made you lose time for nothing?",
    "Which obstacle was the most painful?",
    "What slowed the team down?",
    "Which situation put you under pressure?",
    "What created confusion?",
    "Which external dependency blocked us?",
    "What was decided too late?",
];

const VIOLET: &[&str] = &[
    "Who deserves a shout-out this sprint, and why?",
    "Which teammate helped you without being asked?",
    "What made you smile during the sprint?",
    "Which habit of a colleague would you like to borrow?",
    "Thank someone for something small that mattered.",
    "Which moment made you feel part of the team?",
];

const BONUS: &[&str] = &[
    "Bonus: share a tip that makes your day easier.",
    "Bonus: which tool would you recommend to everyone?",
    "Bonus: describe the sprint as a movie title.",
    "Bonus: what would you celebrate right now?",
    "Bonus: one word for the next sprint.",
];

/// Returns the prompts available for a tile category.
pub fn questions(kind: TileKind) -> &'static [&'static str] {
    match kind {
        TileKind::Start => &[],
        TileKind::Blue => BLUE,
        TileKind::Green => GREEN,
        TileKind::Red => RED,
        TileKind::Violet => VIOLET,
        TileKind::Bonus => BONUS,
    }
}

/// Picks a prompt for `kind` from the seeded stream.
pub fn pick_question(kind: TileKind, rng: &mut Mulberry32) -> &'static str {
    let list = questions(kind);
    if list.is_empty() {
        return MISSING_QUESTION;
    }
    list[rng.below(list.len())]
}

// ---------------------------------------------------------------------------
// Duel words
// ---------------------------------------------------------------------------

/// A buzzword and whether it is a real practice or made-up jargon.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BankWord {
    pub text: &'static str,
    pub verdict: Verdict,
}

const fn legit(text: &'static str) -> BankWord {
    BankWord { text, verdict: Verdict::Legit }
}

const fn bogus(text: &'static str) -> BankWord {
    BankWord { text, verdict: Verdict::Bullshit }
}

const DUEL_WORDS: &[BankWord] = &[
    legit("Definition of Done"),
    legit("Burndown chart"),
    legit("Story points"),
    legit("Sprint review"),
    legit("Continuous integration"),
    legit("Pair programming"),
    legit("Technical debt"),
    legit("Feature flag"),
    legit("Blameless postmortem"),
    legit("Trunk-based development"),
    legit("Acceptance criteria"),
    legit("Velocity"),
    legit("Spike"),
    legit("Kanban WIP limit"),
    bogus("Quantum backlog grooming"),
    bogus("Synergy-driven refactoring"),
    bogus("Agile waterfall sprint"),
    bogus("Blockchain retrospective"),
    bogus("Holistic story velocity"),
    bogus("Reverse standup"),
    bogus("Cloud-native burndown"),
    bogus("Hyperscale pair review"),
    bogus("Paradigm-shift deployment"),
    bogus("Disruptive done-ness"),
    bogus("Omnichannel ticket"),
    bogus("Scrumfall"),
];

/// The full duel word bank.
pub fn duel_words() -> &'static [BankWord] {
    DUEL_WORDS
}

// ---------------------------------------------------------------------------
// Quotes
// ---------------------------------------------------------------------------

/// A quote and the role that would say it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BankQuote {
    pub id: &'static str,
    pub text: &'static str,
    pub role: Role,
}

const QUOTES: &[BankQuote] = &[
    BankQuote { id: "q01", text: "Can we have it by Friday?", role: Role::Manager },
    BankQuote { id: "q02", text: "Let's take this offline and align on priorities.", role: Role::Manager },
    BankQuote { id: "q03", text: "What is the business value of this story?", role: Role::Po },
    BankQuote { id: "q04", text: "That's out of scope, let's put it in the backlog.", role: Role::Po },
    BankQuote { id: "q05", text: "It works on my machine.", role: Role::Dev },
    BankQuote { id: "q06", text: "It's just a one-line change.", role: Role::Dev },
    BankQuote { id: "q07", text: "Let's timebox this discussion.", role: Role::ScrumMaster },
    BankQuote { id: "q08", text: "Is anything blocking you today?", role: Role::ScrumMaster },
    BankQuote { id: "q09", text: "Did anyone actually test the edge cases?", role: Role::QaSupport },
    BankQuote { id: "q10", text: "The customer says it broke again.", role: Role::QaSupport },
    BankQuote { id: "q11", text: "I'll refactor it later.", role: Role::Dev },
    BankQuote { id: "q12", text: "Let's reprioritize the roadmap for next quarter.", role: Role::Manager },
];

/// The full quote bank.
pub fn quotes() -> &'static [BankQuote] {
    QUOTES
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pick_question_is_deterministic() {
        let a = pick_question(TileKind::Blue, &mut Mulberry32::new(10));
        let b = pick_question(TileKind::Blue, &mut Mulberry32::new(10));
        assert_eq!(a, b);
        assert!(BLUE.contains(&a));
    }

    #[test]
    fn test_pick_question_start_tile_falls_back() {
        let text = pick_question(TileKind::Start, &mut Mulberry32::new(1));
        assert_eq!(text, MISSING_QUESTION);
    }

    #[test]
    fn test_duel_bank_has_enough_words_of_both_kinds() {
        assert!(duel_words().len() > 10);
        assert!(duel_words().iter().any(|w| w.verdict == Verdict::Legit));
        assert!(duel_words().iter().any(|w| w.verdict == Verdict::Bullshit));
    }

    #[test]
    fn test_quote_ids_are_unique() {
        let mut ids: Vec<_> = quotes().iter().map(|q| q.id).collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), quotes().len());
    }
}
