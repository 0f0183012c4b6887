use chrono::{Datelike, Utc};

pub use uuid::{uuid, Uuid};
pub type Time = chrono::DateTime<Utc>;

pub const STUB_UUID: Uuid = uuid!("ffffffff-ffff-ffff-ffff-ffffffffffff");

mod action;
pub use action::{Action, Report, VoteAction};

mod auth;
pub use auth::{AuthToken, NewSession, BCRYPT_POW_COST};

mod badge;
pub use badge::{BadgeId, BadgeStat, BadgeStats, BADGE_TABLE};

mod comment;
pub use comment::{Comment, CommentId, NestedComment, NewComment};

mod db;
pub use db::Db;

mod error;
pub use error::Error;

mod notification;
pub use notification::{Notification, NotificationData, NotificationId};

mod post;
pub use post::{Post, PostId, PostSummary, PostView};

mod study;
pub use study::{Flashcard, FlashcardId, Note, NoteId, QuizResult, QuizResultId};

mod user;
pub use user::{NewUser, User, UserId};

mod vote;
pub use vote::{Target, Vote, VoteChange, VoteState, VoteTally, VoteType};

#[derive(Clone, Debug, serde::Deserialize, serde::Serialize)]
pub enum FeedMessage {
    Pong,
    Notification(Notification),
}

// Postgres does not support null bytes in strings, so all user-provided strings
// go through this before hitting either the real server or the mock
pub fn validate_string(s: &str) -> Result<(), Error> {
    if s.contains('\0') {
        return Err(Error::NullByteInString(String::from(s)));
    }
    Ok(())
}

// Names end up in urls and in mentions, keep them boring
pub fn validate_name(s: &str) -> Result<(), Error> {
    validate_string(s)?;
    if s.is_empty()
        || !s
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    {
        return Err(Error::InvalidName(String::from(s)));
    }
    Ok(())
}

// Postgres timestamps cannot represent years beyond 294276, and before 1970 is
// most likely a client clock bug anyway
pub fn validate_time(t: &Time) -> Result<(), Error> {
    if t.year() < 1970 || t.year() > 9999 {
        return Err(Error::InvalidTime(*t));
    }
    Ok(())
}
