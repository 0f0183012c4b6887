use std::collections::{BTreeSet, HashMap};

use anyhow::{anyhow, Context};
use chrono::Utc;
use futures::TryStreamExt;
use quickease_api::{
    Action, AuthToken, BadgeId, BadgeStats, Comment, CommentId, Db, NewComment, NewSession,
    NewUser, NoteId, Notification, NotificationData, NotificationId, Post, PostId, PostSummary,
    PostView, Target, Time, User, UserId, Uuid, Vote, VoteAction, VoteChange, VoteState,
    VoteTally, VoteType,
};
use quickease_forum::{badge, build_comment_tree, sort_for_tree};
use sqlx::{postgres::PgRow, Connection, Row};

use crate::Error;

pub struct PostgresDb<'a> {
    pub conn: &'a mut sqlx::PgConnection,
    pub user: UserId,
}

#[axum::async_trait]
impl<'a> Db for PostgresDb<'a> {
    fn current_user(&self) -> UserId {
        self.user
    }

    async fn post_owner(&mut self, p: PostId) -> anyhow::Result<Option<UserId>> {
        Ok(sqlx::query("SELECT owner_id FROM posts WHERE id = $1")
            .bind(p.0)
            .fetch_optional(&mut *self.conn)
            .await
            .with_context(|| format!("querying posts table for {:?}", p))?
            .map(|r| r.try_get("owner_id").map(UserId))
            .transpose()
            .context("retrieving the owner_id field")?)
    }

    async fn comment_info(
        &mut self,
        c: CommentId,
    ) -> anyhow::Result<Option<(UserId, PostId, Time)>> {
        let row = sqlx::query("SELECT owner_id, post_id, date FROM comments WHERE id = $1")
            .bind(c.0)
            .fetch_optional(&mut *self.conn)
            .await
            .with_context(|| format!("querying comments table for {:?}", c))?;
        match row {
            None => Ok(None),
            Some(r) => Ok(Some((
                UserId(r.try_get("owner_id").context("retrieving the owner_id field")?),
                PostId(r.try_get("post_id").context("retrieving the post_id field")?),
                r.try_get("date").context("retrieving the date field")?,
            ))),
        }
    }

    async fn note_owner(&mut self, n: NoteId) -> anyhow::Result<Option<UserId>> {
        Ok(sqlx::query("SELECT owner_id FROM notes WHERE id = $1")
            .bind(n.0)
            .fetch_optional(&mut *self.conn)
            .await
            .with_context(|| format!("querying notes table for {:?}", n))?
            .map(|r| r.try_get("owner_id").map(UserId))
            .transpose()
            .context("retrieving the owner_id field")?)
    }
}

pub async fn create_user(conn: &mut sqlx::PgConnection, u: NewUser) -> Result<(), Error> {
    let name_taken = sqlx::query("SELECT 1 FROM users WHERE name = $1")
        .bind(&u.name)
        .fetch_optional(&mut *conn)
        .await
        .context("checking whether the name is already taken")?
        .is_some();
    if name_taken {
        return Err(Error::name_already_used(u.name));
    }
    let res = sqlx::query(
        "INSERT INTO users (id, name, password) VALUES ($1, $2, $3) ON CONFLICT DO NOTHING",
    )
    .bind(u.id.0)
    .bind(&u.name)
    .bind(&u.initial_password_hash)
    .execute(&mut *conn)
    .await
    .with_context(|| format!("inserting user {:?}", u.id))?;
    match res.rows_affected() {
        1 => Ok(()),
        // either the id, or a concurrent insert took the name
        _ => Err(Error::uuid_already_used(u.id.0)),
    }
}

#[cfg(not(test))]
fn check_password(password: &str, hash: &str) -> anyhow::Result<bool> {
    bcrypt::verify(password, hash).context("verifying password")
}

// tests send the password itself in place of its hash
#[cfg(test)]
fn check_password(password: &str, hash: &str) -> anyhow::Result<bool> {
    Ok(password == hash)
}

pub async fn login_user(
    conn: &mut sqlx::PgConnection,
    s: &NewSession,
) -> anyhow::Result<Option<AuthToken>> {
    let row = sqlx::query("SELECT id, password FROM users WHERE name = $1")
        .bind(&s.user)
        .fetch_optional(&mut *conn)
        .await
        .with_context(|| format!("fetching password of user {:?}", s.user))?;
    let (user, hash): (Uuid, String) = match row {
        None => return Ok(None),
        Some(r) => (
            r.try_get("id").context("retrieving the id field")?,
            r.try_get("password").context("retrieving the password field")?,
        ),
    };
    if !check_password(&s.password, &hash)? {
        return Ok(None);
    }
    let token = AuthToken(Uuid::new_v4());
    let now = Utc::now();
    sqlx::query("INSERT INTO sessions VALUES ($1, $2, $3, $4, $4)")
        .bind(token.0)
        .bind(user)
        .bind(&s.device)
        .bind(now)
        .execute(&mut *conn)
        .await
        .with_context(|| format!("inserting new session for user {:?}", s.user))?;
    Ok(Some(token))
}

/// Returns `false` iff the session did not exist
pub async fn logout_user(conn: &mut sqlx::PgConnection, tok: &AuthToken) -> anyhow::Result<bool> {
    let res = sqlx::query("DELETE FROM sessions WHERE id = $1")
        .bind(tok.0)
        .execute(&mut *conn)
        .await
        .context("deleting session")?;
    Ok(res.rows_affected() == 1)
}

pub async fn recover_session(
    conn: &mut sqlx::PgConnection,
    tok: AuthToken,
) -> Result<UserId, Error> {
    let row = sqlx::query(
        "UPDATE sessions SET last_active = $1 WHERE id = $2 RETURNING user_id",
    )
    .bind(Utc::now())
    .bind(tok.0)
    .fetch_optional(&mut *conn)
    .await
    .context("recovering session")?;
    match row {
        None => Err(Error::permission_denied()),
        Some(r) => Ok(UserId(
            r.try_get("user_id")
                .context("retrieving the user_id field")?,
        )),
    }
}

pub async fn fetch_users(conn: &mut sqlx::PgConnection) -> anyhow::Result<Vec<User>> {
    let mut res = Vec::new();
    let mut rows = sqlx::query("SELECT id, name FROM users ORDER BY id").fetch(conn);
    while let Some(r) = rows.try_next().await.context("querying users table")? {
        res.push(User {
            id: UserId(r.try_get("id").context("retrieving the id field")?),
            name: r.try_get("name").context("retrieving the name field")?,
        });
    }
    Ok(res)
}

const POST_FIELDS: &str = "
    p.id, p.owner_id, p.date, p.title, p.content,
    u.name AS owner_name,
    COALESCE((SELECT SUM(v.vote_type) FROM post_votes v WHERE v.post_id = p.id), 0)::BIGINT
        AS vote_sum,
    COALESCE((SELECT v.vote_type FROM post_votes v WHERE v.post_id = p.id AND v.user_id = $1), 0)::SMALLINT
        AS user_vote,
    (SELECT COUNT(*) FROM comments c WHERE c.post_id = p.id) AS comment_count
";

fn post_from_row(r: &PgRow) -> anyhow::Result<(Post, User, VoteTally, i64)> {
    let owner_id = UserId(r.try_get("owner_id").context("retrieving the owner_id field")?);
    Ok((
        Post {
            id: PostId(r.try_get("id").context("retrieving the id field")?),
            owner_id,
            date: r.try_get("date").context("retrieving the date field")?,
            title: r.try_get("title").context("retrieving the title field")?,
            content: r.try_get("content").context("retrieving the content field")?,
        },
        User {
            id: owner_id,
            name: r
                .try_get("owner_name")
                .context("retrieving the owner_name field")?,
        },
        VoteTally {
            vote_sum: r.try_get("vote_sum").context("retrieving the vote_sum field")?,
            user_vote: r
                .try_get("user_vote")
                .context("retrieving the user_vote field")?,
        },
        r.try_get("comment_count")
            .context("retrieving the comment_count field")?,
    ))
}

/// Newest posts first
pub async fn list_posts(
    conn: &mut sqlx::PgConnection,
    viewer: UserId,
) -> anyhow::Result<Vec<PostSummary>> {
    let query = format!(
        "SELECT {POST_FIELDS}
            FROM posts p
        INNER JOIN users u
            ON u.id = p.owner_id
        ORDER BY p.date DESC, p.id"
    );
    let mut res = Vec::new();
    let mut rows = sqlx::query(&query).bind(viewer.0).fetch(conn);
    while let Some(r) = rows.try_next().await.context("querying posts table")? {
        let (post, author, tally, comment_count) = post_from_row(&r)?;
        res.push(PostSummary {
            post,
            author,
            tally,
            comment_count,
        });
    }
    Ok(res)
}

pub async fn fetch_post(
    conn: &mut sqlx::PgConnection,
    post: PostId,
    viewer: UserId,
) -> anyhow::Result<Option<PostView>> {
    let query = format!(
        "SELECT {POST_FIELDS}
            FROM posts p
        INNER JOIN users u
            ON u.id = p.owner_id
        WHERE p.id = $2"
    );
    let row = sqlx::query(&query)
        .bind(viewer.0)
        .bind(post.0)
        .fetch_optional(&mut *conn)
        .await
        .with_context(|| format!("querying posts table for {:?}", post))?;
    let (post_data, author, tally, _) = match row {
        None => return Ok(None),
        Some(r) => post_from_row(&r)?,
    };

    let mut votes = HashMap::<CommentId, Vec<Vote>>::new();
    let mut rows = sqlx::query(
        "
            SELECT v.comment_id, v.user_id, v.vote_type
                FROM comment_votes v
            INNER JOIN comments c
                ON c.id = v.comment_id
            WHERE c.post_id = $1
            ORDER BY v.user_id
        ",
    )
    .bind(post.0)
    .fetch(&mut *conn);
    while let Some(r) = rows.try_next().await.context("querying comment_votes table")? {
        let vote_type: i16 = r
            .try_get("vote_type")
            .context("retrieving the vote_type field")?;
        votes
            .entry(CommentId(
                r.try_get("comment_id")
                    .context("retrieving the comment_id field")?,
            ))
            .or_default()
            .push(Vote {
                user_id: UserId(r.try_get("user_id").context("retrieving the user_id field")?),
                vote_type: VoteType::try_from(vote_type).map_err(|e| anyhow!(e))?,
            });
    }
    std::mem::drop(rows); // free conn borrow

    let mut comments = Vec::new();
    let mut rows = sqlx::query(
        "
            SELECT c.id, c.parent_id, c.owner_id, c.date, c.text, u.name AS owner_name
                FROM comments c
            INNER JOIN users u
                ON u.id = c.owner_id
            WHERE c.post_id = $1
        ",
    )
    .bind(post.0)
    .fetch(&mut *conn);
    while let Some(r) = rows.try_next().await.context("querying comments table")? {
        let id = CommentId(r.try_get("id").context("retrieving the id field")?);
        let owner_id = UserId(r.try_get("owner_id").context("retrieving the owner_id field")?);
        comments.push(Comment {
            id,
            post_id: post,
            parent_id: r
                .try_get::<Option<Uuid>, _>("parent_id")
                .context("retrieving the parent_id field")?
                .map(CommentId),
            owner_id,
            date: r.try_get("date").context("retrieving the date field")?,
            text: r.try_get("text").context("retrieving the text field")?,
            votes: votes.remove(&id).unwrap_or_default(),
            user: User {
                id: owner_id,
                name: r
                    .try_get("owner_name")
                    .context("retrieving the owner_name field")?,
            },
        });
    }
    sort_for_tree(&mut comments);

    Ok(Some(PostView {
        post: post_data,
        author,
        tally,
        comments: build_comment_tree(comments, viewer),
    }))
}

/// Applies an action that was already validated and authorized, returning the
/// notifications it triggered
pub async fn apply_action(db: &mut PostgresDb<'_>, a: Action) -> Result<Vec<Notification>, Error> {
    let user = db.user;
    let mut tx = db.conn.begin().await.context("starting action transaction")?;
    let notifs = apply_action_in_tx(
        &mut PostgresDb {
            conn: &mut *tx,
            user,
        },
        a,
    )
    .await?;
    tx.commit().await.context("committing action transaction")?;
    Ok(notifs)
}

async fn comment_id_was_deleted(
    conn: &mut sqlx::PgConnection,
    c: CommentId,
) -> anyhow::Result<bool> {
    Ok(sqlx::query("SELECT 1 FROM deleted_comments WHERE id = $1")
        .bind(c.0)
        .fetch_optional(conn)
        .await
        .with_context(|| format!("checking whether comment {:?} was deleted", c))?
        .is_some())
}

async fn apply_action_in_tx(
    db: &mut PostgresDb<'_>,
    a: Action,
) -> Result<Vec<Notification>, Error> {
    macro_rules! insert_new {
        ($query:expr, $id:expr, $( $v:expr ),*) => {{
            let id: Uuid = $id;
            let res = sqlx::query(concat!($query, " ON CONFLICT (id) DO NOTHING"))
                .bind(id)
                $(.bind($v))*
                .execute(&mut *db.conn)
                .await
                .with_context(|| format!("inserting object {:?}", id))?;
            if res.rows_affected() != 1 {
                return Err(Error::uuid_already_used(id));
            }
        }};
    }

    let mut notifs = Vec::new();
    match a {
        Action::NewPost(p) => insert_new!(
            "INSERT INTO posts VALUES ($1, $2, $3, $4, $5)",
            p.id.0,
            p.owner_id.0,
            p.date,
            p.title,
            p.content
        ),
        Action::NewComment(c) => {
            if comment_id_was_deleted(&mut *db.conn, c.id).await? {
                return Err(Error::uuid_already_used(c.id.0));
            }
            notifs = notifications_for_comment(db, &c).await?;
            insert_new!(
                "INSERT INTO comments VALUES ($1, $2, $3, $4, $5, $6)",
                c.id.0,
                c.post_id.0,
                c.parent_id.map(|p| p.0),
                c.owner_id.0,
                c.date,
                c.text
            );
        }
        Action::DeleteComment(c) => {
            sqlx::query("DELETE FROM comments WHERE id = $1")
                .bind(c.0)
                .execute(&mut *db.conn)
                .await
                .with_context(|| format!("deleting comment {:?}", c))?;
            sqlx::query("INSERT INTO deleted_comments VALUES ($1) ON CONFLICT DO NOTHING")
                .bind(c.0)
                .execute(&mut *db.conn)
                .await
                .with_context(|| format!("recording deletion of comment {:?}", c))?;
        }
        Action::Vote(v) => toggle_vote(&mut *db.conn, v).await?,
        Action::Report(r) => {
            let (kind, id) = target_columns(r.target);
            sqlx::query("INSERT INTO reports VALUES ($1, $2, $3, $4, $5) ON CONFLICT DO NOTHING")
                .bind(r.reporter_id.0)
                .bind(kind)
                .bind(id)
                .bind(r.date)
                .bind(&r.reason)
                .execute(&mut *db.conn)
                .await
                .with_context(|| format!("inserting report on {:?}", r.target))?;
        }
        Action::NewNote(n) => insert_new!(
            "INSERT INTO notes VALUES ($1, $2, $3, $4, $5)",
            n.id.0,
            n.owner_id.0,
            n.date,
            n.title,
            n.content
        ),
        Action::NewFlashcard(f) => insert_new!(
            "INSERT INTO flashcards VALUES ($1, $2, $3, $4, $5, $6)",
            f.id.0,
            f.owner_id.0,
            f.date,
            f.note_id.map(|n| n.0),
            f.front,
            f.back
        ),
        Action::RecordQuizScore(q) => insert_new!(
            "INSERT INTO quiz_results VALUES ($1, $2, $3, $4, $5)",
            q.id.0,
            q.owner_id.0,
            q.date,
            q.score,
            q.total
        ),
    }
    for n in notifs.iter() {
        insert_notification(&mut *db.conn, n).await?;
    }
    Ok(notifs)
}

fn target_columns(t: Target) -> (&'static str, Uuid) {
    match t {
        Target::Post(p) => ("post", p.0),
        Target::Comment(c) => ("comment", c.0),
    }
}

async fn notifications_for_comment(
    db: &mut PostgresDb<'_>,
    c: &NewComment,
) -> anyhow::Result<Vec<Notification>> {
    let to_notify = match c.parent_id {
        None => db.post_owner(c.post_id).await?.map(|owner| {
            (
                owner,
                NotificationData::NewComment {
                    post: c.post_id,
                    comment: c.id,
                },
            )
        }),
        Some(parent) => db.comment_info(parent).await?.map(|(owner, _, _)| {
            (
                owner,
                NotificationData::Reply {
                    post: c.post_id,
                    comment: c.id,
                    parent,
                },
            )
        }),
    };
    Ok(match to_notify {
        Some((user, data)) if user != c.owner_id => vec![Notification::now(user, data)],
        _ => Vec::new(),
    })
}

async fn toggle_vote(conn: &mut sqlx::PgConnection, v: VoteAction) -> anyhow::Result<()> {
    let (table, column, target) = match v.target {
        Target::Post(p) => ("post_votes", "post_id", p.0),
        Target::Comment(c) => ("comment_votes", "comment_id", c.0),
    };
    let mut tx = conn.begin().await.context("starting vote transaction")?;
    let current = sqlx::query(&format!(
        "SELECT vote_type FROM {table} WHERE user_id = $1 AND {column} = $2 FOR UPDATE"
    ))
    .bind(v.voter_id.0)
    .bind(target)
    .fetch_optional(&mut *tx)
    .await
    .with_context(|| format!("fetching current vote of {:?} on {:?}", v.voter_id, v.target))?
    .map(|r| r.try_get::<i16, _>("vote_type"))
    .transpose()
    .context("retrieving the vote_type field")?
    .map(VoteType::try_from)
    .transpose()
    .map_err(|e| anyhow!(e))?;

    let before = VoteState::from_vote(current);
    match VoteChange::between(before, before.cast(v.vote_type)) {
        VoteChange::Nothing => (),
        VoteChange::Insert(t) | VoteChange::Replace(t) => {
            sqlx::query(&format!(
                "INSERT INTO {table} VALUES ($1, $2, $3)
                    ON CONFLICT (user_id, {column}) DO UPDATE SET vote_type = EXCLUDED.vote_type"
            ))
            .bind(v.voter_id.0)
            .bind(target)
            .bind(t.value())
            .execute(&mut *tx)
            .await
            .with_context(|| format!("recording vote of {:?} on {:?}", v.voter_id, v.target))?;
        }
        VoteChange::Delete => {
            sqlx::query(&format!(
                "DELETE FROM {table} WHERE user_id = $1 AND {column} = $2"
            ))
            .bind(v.voter_id.0)
            .bind(target)
            .execute(&mut *tx)
            .await
            .with_context(|| format!("retracting vote of {:?} on {:?}", v.voter_id, v.target))?;
        }
    }
    tx.commit().await.context("committing vote transaction")
}

async fn insert_notification(
    conn: &mut sqlx::PgConnection,
    n: &Notification,
) -> anyhow::Result<()> {
    sqlx::query("INSERT INTO notifications VALUES ($1, $2, $3, $4, $5)")
        .bind(n.id.0)
        .bind(n.user_id.0)
        .bind(n.date)
        .bind(sqlx::types::Json(&n.data))
        .bind(n.read)
        .execute(conn)
        .await
        .with_context(|| format!("inserting notification {:?}", n.id))?;
    Ok(())
}

pub async fn fetch_notifications(
    conn: &mut sqlx::PgConnection,
    user: UserId,
) -> anyhow::Result<Vec<Notification>> {
    let mut res = Vec::new();
    let mut rows = sqlx::query(
        "SELECT id, date, data, read FROM notifications WHERE user_id = $1 ORDER BY date DESC, id",
    )
    .bind(user.0)
    .fetch(conn);
    while let Some(r) = rows.try_next().await.context("querying notifications table")? {
        let sqlx::types::Json(data) = r
            .try_get::<sqlx::types::Json<NotificationData>, _>("data")
            .context("retrieving the data field")?;
        res.push(Notification {
            id: NotificationId(r.try_get("id").context("retrieving the id field")?),
            user_id: user,
            date: r.try_get("date").context("retrieving the date field")?,
            data,
            read: r.try_get("read").context("retrieving the read field")?,
        });
    }
    Ok(res)
}

pub async fn mark_notifications_read(
    conn: &mut sqlx::PgConnection,
    user: UserId,
    ids: &[NotificationId],
) -> anyhow::Result<()> {
    sqlx::query("UPDATE notifications SET read = true WHERE user_id = $1 AND id = ANY($2)")
        .bind(user.0)
        .bind(ids.iter().map(|n| n.0).collect::<Vec<Uuid>>())
        .execute(conn)
        .await
        .with_context(|| format!("marking notifications of {:?} as read", user))?;
    Ok(())
}

pub async fn fetch_badges(
    conn: &mut sqlx::PgConnection,
    user: UserId,
) -> anyhow::Result<BTreeSet<BadgeId>> {
    let mut res = BTreeSet::new();
    let mut rows = sqlx::query("SELECT badge FROM user_badges WHERE user_id = $1")
        .bind(user.0)
        .fetch(conn);
    while let Some(r) = rows.try_next().await.context("querying user_badges table")? {
        let badge: String = r.try_get("badge").context("retrieving the badge field")?;
        res.insert(badge.parse()?);
    }
    Ok(res)
}

pub async fn badge_stats(
    conn: &mut sqlx::PgConnection,
    user: UserId,
) -> anyhow::Result<BadgeStats> {
    let r = sqlx::query(
        "
            SELECT
                (SELECT COUNT(*) FROM notes WHERE owner_id = $1) AS notes_created,
                (SELECT COUNT(*) FROM flashcards WHERE owner_id = $1) AS flashcards_created,
                (SELECT COUNT(*) FROM quiz_results
                    WHERE owner_id = $1 AND total > 0 AND score = total) AS perfect_quiz_scores,
                (SELECT COUNT(*) FROM post_votes v INNER JOIN posts p ON p.id = v.post_id
                    WHERE p.owner_id = $1 AND v.user_id != $1 AND v.vote_type = 1)
                + (SELECT COUNT(*) FROM comment_votes v INNER JOIN comments c ON c.id = v.comment_id
                    WHERE c.owner_id = $1 AND v.user_id != $1 AND v.vote_type = 1)
                    AS upvotes_received,
                (SELECT COUNT(*) FROM posts WHERE owner_id = $1)
                + (SELECT COUNT(*) FROM comments WHERE owner_id = $1) AS forum_activity
        ",
    )
    .bind(user.0)
    .fetch_one(conn)
    .await
    .with_context(|| format!("computing badge stats for {:?}", user))?;
    Ok(BadgeStats {
        notes_created: r
            .try_get("notes_created")
            .context("retrieving the notes_created field")?,
        flashcards_created: r
            .try_get("flashcards_created")
            .context("retrieving the flashcards_created field")?,
        perfect_quiz_scores: r
            .try_get("perfect_quiz_scores")
            .context("retrieving the perfect_quiz_scores field")?,
        upvotes_received: r
            .try_get("upvotes_received")
            .context("retrieving the upvotes_received field")?,
        forum_activity: r
            .try_get("forum_activity")
            .context("retrieving the forum_activity field")?,
    })
}

/// Atomically claims the right to run a badge check for `user` at `now`
///
/// Returns `false` if another check ran less than `interval` before `now`.
async fn claim_badge_check(
    conn: &mut sqlx::PgConnection,
    user: UserId,
    now: Time,
    interval: chrono::Duration,
) -> anyhow::Result<bool> {
    let res = sqlx::query(
        "
            UPDATE users
                SET last_badge_check = $2
            WHERE id = $1
            AND (last_badge_check IS NULL OR last_badge_check <= $3)
        ",
    )
    .bind(user.0)
    .bind(now)
    .bind(now - interval)
    .execute(conn)
    .await
    .with_context(|| format!("claiming badge check for {:?}", user))?;
    Ok(res.rows_affected() == 1)
}

/// Awards the badges `user` newly qualifies for, unless a check already ran
/// for them less than `interval` ago
pub async fn check_badges(
    conn: &mut sqlx::PgConnection,
    user: UserId,
    now: Time,
    interval: chrono::Duration,
) -> anyhow::Result<(Vec<BadgeId>, Vec<Notification>)> {
    let mut tx = conn.begin().await.context("starting badge check transaction")?;
    if !claim_badge_check(&mut *tx, user, now, interval).await? {
        tracing::debug!(?user, "badge check already ran recently, skipping");
        return Ok((Vec::new(), Vec::new()));
    }
    let stats = badge_stats(&mut *tx, user).await?;
    let held = fetch_badges(&mut *tx, user).await?;
    let mut awarded = Vec::new();
    let mut notifs = Vec::new();
    for b in badge::newly_qualified(&stats, &held) {
        let res = sqlx::query("INSERT INTO user_badges VALUES ($1, $2, $3) ON CONFLICT DO NOTHING")
            .bind(user.0)
            .bind(b.as_str())
            .bind(now)
            .execute(&mut *tx)
            .await
            .with_context(|| format!("awarding badge {b} to {:?}", user))?;
        if res.rows_affected() == 1 {
            let n = Notification::now(user, NotificationData::BadgeAwarded(b));
            insert_notification(&mut *tx, &n).await?;
            awarded.push(b);
            notifs.push(n);
        }
    }
    tx.commit().await.context("committing badge check transaction")?;
    tracing::info!(?user, ?awarded, "ran badge check");
    Ok((awarded, notifs))
}
