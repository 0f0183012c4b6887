use uuid::Uuid;

use crate::{Error, Time, UserId};

#[derive(
    Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, serde::Deserialize, serde::Serialize,
)]
pub struct NoteId(pub Uuid);

#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct Note {
    pub id: NoteId,
    pub owner_id: UserId,
    pub date: Time,
    pub title: String,
    pub content: String,
}

impl Note {
    pub fn validate(&self) -> Result<(), Error> {
        crate::validate_time(&self.date)?;
        crate::validate_string(&self.title)?;
        crate::validate_string(&self.content)?;
        Ok(())
    }
}

#[derive(
    Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, serde::Deserialize, serde::Serialize,
)]
pub struct FlashcardId(pub Uuid);

#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct Flashcard {
    pub id: FlashcardId,
    pub owner_id: UserId,
    pub date: Time,

    /// Note this card was generated from, if any
    pub note_id: Option<NoteId>,

    pub front: String,
    pub back: String,
}

impl Flashcard {
    pub fn validate(&self) -> Result<(), Error> {
        crate::validate_time(&self.date)?;
        crate::validate_string(&self.front)?;
        crate::validate_string(&self.back)?;
        Ok(())
    }
}

#[derive(
    Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, serde::Deserialize, serde::Serialize,
)]
pub struct QuizResultId(pub Uuid);

#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct QuizResult {
    pub id: QuizResultId,
    pub owner_id: UserId,
    pub date: Time,
    pub score: i32,
    pub total: i32,
}

impl QuizResult {
    pub fn is_perfect(&self) -> bool {
        self.total > 0 && self.score == self.total
    }

    pub fn validate(&self) -> Result<(), Error> {
        crate::validate_time(&self.date)?;
        if self.score < 0 || self.score > self.total {
            return Err(Error::InvalidQuizScore {
                score: self.score,
                total: self.total,
            });
        }
        Ok(())
    }
}
