use std::{fmt, str::FromStr};

/// Account-level achievements
#[derive(
    Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, serde::Deserialize, serde::Serialize,
)]
#[serde(rename_all = "kebab-case")]
pub enum BadgeId {
    FirstNote,
    Notetaker,
    FlashcardCreator,
    FlashcardCollector,
    PerfectScore,
    QuizMaster,
    WellLiked,
    CommunityFavorite,
    FirstWords,
    ForumRegular,
}

impl BadgeId {
    pub fn as_str(&self) -> &'static str {
        match self {
            BadgeId::FirstNote => "first-note",
            BadgeId::Notetaker => "notetaker",
            BadgeId::FlashcardCreator => "flashcard-creator",
            BadgeId::FlashcardCollector => "flashcard-collector",
            BadgeId::PerfectScore => "perfect-score",
            BadgeId::QuizMaster => "quiz-master",
            BadgeId::WellLiked => "well-liked",
            BadgeId::CommunityFavorite => "community-favorite",
            BadgeId::FirstWords => "first-words",
            BadgeId::ForumRegular => "forum-regular",
        }
    }
}

impl fmt::Display for BadgeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BadgeId {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<BadgeId> {
        BADGE_TABLE
            .iter()
            .map(|(b, _, _)| *b)
            .find(|b| b.as_str() == s)
            .ok_or_else(|| anyhow::anyhow!("unknown badge {s:?}"))
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum BadgeStat {
    NotesCreated,
    FlashcardsCreated,
    PerfectQuizScores,
    UpvotesReceived,
    ForumActivity,
}

/// Activity counters of one user, as of the last badge check
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct BadgeStats {
    pub notes_created: i64,
    pub flashcards_created: i64,

    /// Quiz results with a nonzero total and no wrong answer
    pub perfect_quiz_scores: i64,

    /// Upvotes from other users on this user's posts and comments
    pub upvotes_received: i64,

    /// Posts plus comments
    pub forum_activity: i64,
}

impl BadgeStats {
    pub fn get(&self, stat: BadgeStat) -> i64 {
        match stat {
            BadgeStat::NotesCreated => self.notes_created,
            BadgeStat::FlashcardsCreated => self.flashcards_created,
            BadgeStat::PerfectQuizScores => self.perfect_quiz_scores,
            BadgeStat::UpvotesReceived => self.upvotes_received,
            BadgeStat::ForumActivity => self.forum_activity,
        }
    }

    pub fn qualifies_for(&self, badge: BadgeId) -> bool {
        BADGE_TABLE
            .iter()
            .any(|(b, stat, threshold)| *b == badge && self.get(*stat) >= *threshold)
    }
}

/// Every badge, the counter it is awarded on, and the value that counter must reach
pub const BADGE_TABLE: &[(BadgeId, BadgeStat, i64)] = &[
    (BadgeId::FirstNote, BadgeStat::NotesCreated, 1),
    (BadgeId::Notetaker, BadgeStat::NotesCreated, 25),
    (BadgeId::FlashcardCreator, BadgeStat::FlashcardsCreated, 1),
    (BadgeId::FlashcardCollector, BadgeStat::FlashcardsCreated, 100),
    (BadgeId::PerfectScore, BadgeStat::PerfectQuizScores, 1),
    (BadgeId::QuizMaster, BadgeStat::PerfectQuizScores, 10),
    (BadgeId::WellLiked, BadgeStat::UpvotesReceived, 10),
    (BadgeId::CommunityFavorite, BadgeStat::UpvotesReceived, 100),
    (BadgeId::FirstWords, BadgeStat::ForumActivity, 1),
    (BadgeId::ForumRegular, BadgeStat::ForumActivity, 50),
];
