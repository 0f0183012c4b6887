use async_trait::async_trait;

use crate::{CommentId, NoteId, PostId, Time, UserId};

/// The lookups authorization checks need, implemented by both the postgres
/// server and the in-memory store
#[async_trait]
pub trait Db {
    fn current_user(&self) -> UserId;
    async fn post_owner(&mut self, p: PostId) -> anyhow::Result<Option<UserId>>;

    /// Returns the owner, post and creation date of the comment
    async fn comment_info(
        &mut self,
        c: CommentId,
    ) -> anyhow::Result<Option<(UserId, PostId, Time)>>;

    async fn note_owner(&mut self, n: NoteId) -> anyhow::Result<Option<UserId>>;
}
