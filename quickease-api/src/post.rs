use uuid::Uuid;

use crate::{Error, NestedComment, Time, User, UserId, VoteTally};

#[derive(
    Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, serde::Deserialize, serde::Serialize,
)]
pub struct PostId(pub Uuid);

#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct Post {
    pub id: PostId,
    pub owner_id: UserId,
    pub date: Time,
    pub title: String,
    pub content: String,
}

impl Post {
    // See comments on other `validate` functions throughout quickease-api
    pub fn validate(&self) -> Result<(), Error> {
        crate::validate_time(&self.date)?;
        crate::validate_string(&self.title)?;
        crate::validate_string(&self.content)?;
        Ok(())
    }
}

/// One line of the forum's post list
#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct PostSummary {
    pub post: Post,
    pub author: User,
    pub tally: VoteTally,
    pub comment_count: i64,
}

/// A post along with its whole discussion, as seen by one user
#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct PostView {
    pub post: Post,
    pub author: User,
    pub tally: VoteTally,
    pub comments: Vec<NestedComment>,
}
