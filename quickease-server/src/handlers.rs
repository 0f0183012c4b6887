use anyhow::Context;
use axum::{
    extract::{ws::Message, Path, State, WebSocketUpgrade},
    Json,
};
use chrono::Utc;
use futures::{SinkExt, StreamExt};
use quickease_api::{
    Action, AuthToken, BadgeId, NewSession, NewUser, Notification, NotificationId, PostId,
    PostSummary, PostView, User, UserId, Uuid,
};

use crate::{db, extractors::*, Error, UserFeeds};

pub async fn admin_create_user(
    _: AdminAuth,
    mut conn: PgConn,
    Json(data): Json<NewUser>,
) -> Result<(), Error> {
    data.validate()?;
    db::create_user(&mut conn, data).await
}

pub async fn auth(
    mut conn: PgConn,
    Json(data): Json<NewSession>,
) -> Result<Json<AuthToken>, Error> {
    data.validate_except_pow()?;
    // in test setup, also allow the "empty" pow to work
    #[cfg(test)]
    if !data.pow.is_empty() && !data.verify_pow() {
        return Err(Error::invalid_pow());
    }
    #[cfg(not(test))]
    if !data.verify_pow() {
        return Err(Error::invalid_pow());
    }
    Ok(Json(
        db::login_user(&mut conn, &data)
            .await
            .context("logging user in")?
            .ok_or_else(Error::permission_denied)?,
    ))
}

pub async fn unauth(user: PreAuth, mut conn: PgConn) -> Result<(), Error> {
    match db::logout_user(&mut conn, &user.0).await {
        Ok(true) => Ok(()),
        Ok(false) => Err(Error::permission_denied()),
        Err(e) => Err(Error::Anyhow(e)),
    }
}

pub async fn whoami(Auth(user): Auth) -> Json<UserId> {
    Json(user)
}

pub async fn fetch_users(Auth(user): Auth, mut conn: PgConn) -> Result<Json<Vec<User>>, Error> {
    Ok(Json(db::fetch_users(&mut conn).await.with_context(
        || format!("fetching user list for {:?}", user),
    )?))
}

pub async fn list_posts(
    Auth(user): Auth,
    mut conn: PgConn,
) -> Result<Json<Vec<PostSummary>>, Error> {
    Ok(Json(
        db::list_posts(&mut conn, user)
            .await
            .with_context(|| format!("listing posts for {:?}", user))?,
    ))
}

pub async fn fetch_post(
    Auth(user): Auth,
    mut conn: PgConn,
    Path(post): Path<Uuid>,
) -> Result<Json<PostView>, Error> {
    db::fetch_post(&mut conn, PostId(post), user)
        .await
        .with_context(|| format!("fetching post {:?} for {:?}", post, user))?
        .map(Json)
        .ok_or_else(|| Error::not_found(post))
}

pub async fn submit_action(
    Auth(user): Auth,
    State(feeds): State<UserFeeds>,
    mut conn: PgConn,
    Json(a): Json<Action>,
) -> Result<(), Error> {
    a.validate()?;
    let mut db = db::PostgresDb {
        conn: &mut *conn,
        user,
    };
    if !a
        .is_authorized(&mut db)
        .await
        .with_context(|| format!("checking authorization of {:?} for {:?}", a, user))?
    {
        return Err(Error::unauthorized_action(user, &a));
    }
    let notifs = db::apply_action(&mut db, a).await?;
    feeds.relay_notifications(notifs).await;
    Ok(())
}

pub async fn fetch_badges(Auth(user): Auth, mut conn: PgConn) -> Result<Json<Vec<BadgeId>>, Error> {
    Ok(Json(
        db::fetch_badges(&mut conn, user)
            .await
            .with_context(|| format!("fetching badges of {:?}", user))?
            .into_iter()
            .collect(),
    ))
}

pub async fn check_badges(
    Auth(user): Auth,
    State(feeds): State<UserFeeds>,
    State(BadgeCheckInterval(interval)): State<BadgeCheckInterval>,
    mut conn: PgConn,
) -> Result<Json<Vec<BadgeId>>, Error> {
    let (awarded, notifs) = db::check_badges(&mut conn, user, Utc::now(), interval)
        .await
        .with_context(|| format!("checking badges of {:?}", user))?;
    feeds.relay_notifications(notifs).await;
    Ok(Json(awarded))
}

pub async fn fetch_notifications(
    Auth(user): Auth,
    mut conn: PgConn,
) -> Result<Json<Vec<Notification>>, Error> {
    Ok(Json(
        db::fetch_notifications(&mut conn, user)
            .await
            .with_context(|| format!("fetching notifications of {:?}", user))?,
    ))
}

pub async fn mark_notifications_read(
    Auth(user): Auth,
    mut conn: PgConn,
    Json(ids): Json<Vec<NotificationId>>,
) -> Result<(), Error> {
    db::mark_notifications_read(&mut conn, user, &ids)
        .await
        .with_context(|| format!("marking notifications of {:?} as read", user))?;
    Ok(())
}

pub async fn notification_feed(
    ws: WebSocketUpgrade,
    State(db): State<PgPool>,
    State(feeds): State<UserFeeds>,
) -> Result<axum::response::Response, Error> {
    Ok(ws.on_upgrade(move |sock| {
        let (write, read) = sock.split();
        notification_feed_impl(write, read, db, feeds)
    }))
}

/// The client first sends its auth token as a text message, then only pings
async fn notification_feed_impl<W, R>(mut write: W, mut read: R, db: PgPool, feeds: UserFeeds)
where
    W: 'static + Send + Unpin + futures::Sink<Message>,
    <W as futures::Sink<Message>>::Error: Send,
    R: 'static + Send + Unpin + futures::Stream<Item = Result<Message, axum::Error>>,
{
    tracing::debug!("notification feed websocket connected");
    if let Some(Ok(Message::Text(token))) = read.next().await {
        if let Ok(token) = Uuid::try_parse(&token) {
            if let Ok(mut conn) = db.acquire().await {
                if let Ok(user) = db::recover_session(&mut conn, AuthToken(token)).await {
                    std::mem::drop(conn);
                    if write.send(Message::Text(String::from("ok"))).await.is_ok() {
                        tracing::debug!(?user, "notification feed websocket auth success");
                        feeds.add_for_user(user, write, read).await;
                        return;
                    }
                }
            }
        }
        tracing::debug!(?token, "notification feed websocket auth failure");
        let _ = write
            .send(Message::Text(String::from("permission denied")))
            .await;
    }
}
