use uuid::Uuid;

use crate::{Error, PostId, Time, User, UserId, Vote, VoteTally};

#[derive(
    Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, serde::Deserialize, serde::Serialize,
)]
pub struct CommentId(pub Uuid);

/// A comment as stored, with everything needed to render it
#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct Comment {
    pub id: CommentId,
    pub post_id: PostId,

    /// None for top-level comments on the post
    pub parent_id: Option<CommentId>,

    pub owner_id: UserId,
    pub date: Time,
    pub text: String,

    /// At most one vote per user
    pub votes: Vec<Vote>,

    pub user: User,
}

/// A comment placed in its reply tree
#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct NestedComment {
    pub comment: Comment,

    /// Computed from this comment's own votes only, never from the replies'
    pub tally: VoteTally,

    /// Direct replies, oldest first
    pub replies: Vec<NestedComment>,
}

impl NestedComment {
    /// Number of comments in this subtree, including self
    pub fn subtree_size(&self) -> usize {
        let mut res = 0;
        let mut todo = vec![self];
        while let Some(c) = todo.pop() {
            res += 1;
            todo.extend(c.replies.iter());
        }
        res
    }
}

#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct NewComment {
    pub id: CommentId,
    pub post_id: PostId,
    pub parent_id: Option<CommentId>,
    pub owner_id: UserId,
    pub date: Time,
    pub text: String,
}

impl NewComment {
    // See comments on other `validate` functions throughout quickease-api
    pub fn validate(&self) -> Result<(), Error> {
        crate::validate_time(&self.date)?;
        crate::validate_string(&self.text)?;
        Ok(())
    }
}
