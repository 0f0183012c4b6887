use anyhow::Context;

use crate::{
    CommentId, Db, Error, Flashcard, NewComment, Note, Post, QuizResult, Target, Time, UserId,
    VoteType,
};

/// Every mutation a user can submit
#[derive(Clone, Debug, serde::Deserialize, serde::Serialize)]
pub enum Action {
    NewPost(Post),
    NewComment(NewComment),
    DeleteComment(CommentId),
    Vote(VoteAction),
    Report(Report),
    NewNote(Note),
    NewFlashcard(Flashcard),
    RecordQuizScore(QuizResult),
}

/// Toggles `voter_id`'s vote on `target`, see `VoteState::cast`
#[derive(Clone, Copy, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct VoteAction {
    pub voter_id: UserId,
    pub target: Target,
    pub vote_type: VoteType,
}

#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct Report {
    pub reporter_id: UserId,
    pub target: Target,
    pub date: Time,
    pub reason: String,
}

impl Action {
    // See comments on other `validate` functions throughout quickease-api
    pub fn validate(&self) -> Result<(), Error> {
        match self {
            Action::NewPost(p) => p.validate(),
            Action::NewComment(c) => c.validate(),
            Action::DeleteComment(_) => Ok(()),
            Action::Vote(_) => Ok(()),
            Action::Report(r) => {
                crate::validate_time(&r.date)?;
                crate::validate_string(&r.reason)
            }
            Action::NewNote(n) => n.validate(),
            Action::NewFlashcard(f) => f.validate(),
            Action::RecordQuizScore(q) => q.validate(),
        }
    }

    /// Checks that the current user of `db` is allowed to perform this action
    ///
    /// Referring to an object that does not exist is reported as unauthorized.
    pub async fn is_authorized<D: Db + Send>(&self, db: &mut D) -> anyhow::Result<bool> {
        let me = db.current_user();
        macro_rules! comment_info {
            ($c:expr) => {{
                let c = $c;
                db.comment_info(c)
                    .await
                    .with_context(|| format!("getting info of comment {:?}", c))?
            }};
        }
        macro_rules! target_exists {
            ($t:expr) => {{
                match $t {
                    Target::Post(p) => db
                        .post_owner(p)
                        .await
                        .with_context(|| format!("getting owner of post {:?}", p))?
                        .is_some(),
                    Target::Comment(c) => comment_info!(c).is_some(),
                }
            }};
        }
        Ok(match self {
            Action::NewPost(p) => p.owner_id == me,
            Action::NewComment(c) => {
                if c.owner_id != me {
                    return Ok(false);
                }
                let post_exists = db
                    .post_owner(c.post_id)
                    .await
                    .with_context(|| format!("getting owner of post {:?}", c.post_id))?
                    .is_some();
                match c.parent_id {
                    None => post_exists,
                    // replies must be strictly younger than their parent and on the same post,
                    // so that sorting by date always lists a parent before its replies
                    Some(parent) => match comment_info!(parent) {
                        None => false,
                        Some((_, par_post, par_date)) => {
                            post_exists && par_post == c.post_id && par_date < c.date
                        }
                    },
                }
            }
            Action::DeleteComment(c) => match comment_info!(*c) {
                None => false,
                Some((owner, _, _)) => owner == me,
            },
            Action::Vote(v) => v.voter_id == me && target_exists!(v.target),
            Action::Report(r) => r.reporter_id == me && target_exists!(r.target),
            Action::NewNote(n) => n.owner_id == me,
            Action::NewFlashcard(f) => {
                if f.owner_id != me {
                    return Ok(false);
                }
                match f.note_id {
                    None => true,
                    Some(n) => {
                        db.note_owner(n)
                            .await
                            .with_context(|| format!("getting owner of note {:?}", n))?
                            == Some(me)
                    }
                }
            }
            Action::RecordQuizScore(q) => q.owner_id == me,
        })
    }
}
