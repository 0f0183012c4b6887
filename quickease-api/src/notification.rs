use uuid::Uuid;

use crate::{BadgeId, CommentId, PostId, Time, UserId};

#[derive(
    Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, serde::Deserialize, serde::Serialize,
)]
pub struct NotificationId(pub Uuid);

#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct Notification {
    pub id: NotificationId,
    pub user_id: UserId,
    pub date: Time,
    pub data: NotificationData,
    pub read: bool,
}

#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
pub enum NotificationData {
    /// Someone commented at the top level of one of your posts
    NewComment { post: PostId, comment: CommentId },

    /// Someone replied to one of your comments
    Reply {
        post: PostId,
        comment: CommentId,
        parent: CommentId,
    },

    BadgeAwarded(BadgeId),
}

impl Notification {
    pub fn now(user_id: UserId, data: NotificationData) -> Notification {
        Notification {
            id: NotificationId(Uuid::new_v4()),
            user_id,
            date: chrono::Utc::now(),
            data,
            read: false,
        }
    }
}
