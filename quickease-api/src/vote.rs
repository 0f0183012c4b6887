use crate::{CommentId, PostId, UserId};

/// A single user's opinion of a post or comment
///
/// Serialized, and stored in the database, as the signed integer it stands for.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(try_from = "i16", into = "i16")]
pub enum VoteType {
    Up,
    Down,
}

impl VoteType {
    pub fn value(self) -> i16 {
        match self {
            VoteType::Up => 1,
            VoteType::Down => -1,
        }
    }
}

impl From<VoteType> for i16 {
    fn from(v: VoteType) -> i16 {
        v.value()
    }
}

impl TryFrom<i16> for VoteType {
    type Error = String;

    fn try_from(v: i16) -> Result<VoteType, String> {
        match v {
            1 => Ok(VoteType::Up),
            -1 => Ok(VoteType::Down),
            v => Err(format!("vote type must be 1 or -1, got {v}")),
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct Vote {
    pub user_id: UserId,
    pub vote_type: VoteType,
}

/// Something that can be voted on or reported
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, serde::Deserialize, serde::Serialize)]
pub enum Target {
    Post(PostId),
    Comment(CommentId),
}

/// Net score of a post or comment, along with what the viewing user voted
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct VoteTally {
    pub vote_sum: i64,

    /// -1, 0 or 1; 0 meaning the viewer did not vote
    pub user_vote: i16,
}

impl VoteTally {
    /// Assumes there is at most one vote per user in `votes`
    pub fn of<'a>(votes: impl IntoIterator<Item = &'a Vote>, viewer: UserId) -> VoteTally {
        votes
            .into_iter()
            .fold(VoteTally::default(), |mut tally, v| {
                tally.vote_sum += i64::from(v.vote_type.value());
                if v.user_id == viewer {
                    tally.user_vote = v.vote_type.value();
                }
                tally
            })
    }
}

/// What one user currently thinks of one target
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum VoteState {
    NoVote,
    Upvoted,
    Downvoted,
}

impl VoteState {
    pub fn from_vote(v: Option<VoteType>) -> VoteState {
        match v {
            None => VoteState::NoVote,
            Some(VoteType::Up) => VoteState::Upvoted,
            Some(VoteType::Down) => VoteState::Downvoted,
        }
    }

    pub fn vote(self) -> Option<VoteType> {
        match self {
            VoteState::NoVote => None,
            VoteState::Upvoted => Some(VoteType::Up),
            VoteState::Downvoted => Some(VoteType::Down),
        }
    }

    /// Casting the vote already held retracts it, anything else replaces it
    pub fn cast(self, v: VoteType) -> VoteState {
        match (self, v) {
            (VoteState::Upvoted, VoteType::Up) | (VoteState::Downvoted, VoteType::Down) => {
                VoteState::NoVote
            }
            (_, VoteType::Up) => VoteState::Upvoted,
            (_, VoteType::Down) => VoteState::Downvoted,
        }
    }
}

/// Row-level operation turning one `VoteState` into another
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum VoteChange {
    Nothing,
    Insert(VoteType),
    Replace(VoteType),
    Delete,
}

impl VoteChange {
    pub fn between(before: VoteState, after: VoteState) -> VoteChange {
        match (before.vote(), after.vote()) {
            (None, None) => VoteChange::Nothing,
            (None, Some(v)) => VoteChange::Insert(v),
            (Some(_), None) => VoteChange::Delete,
            (Some(old), Some(new)) if old == new => VoteChange::Nothing,
            (Some(_), Some(new)) => VoteChange::Replace(new),
        }
    }
}
