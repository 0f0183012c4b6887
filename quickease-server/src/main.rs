use std::net::SocketAddr;

use anyhow::Context;
use axum::{
    routing::{get, post},
    Router,
};
use quickease_api::{AuthToken, Uuid};
use structopt::StructOpt;

mod db;
mod error;
mod extractors;
mod feeds;
mod handlers;

#[cfg(test)]
mod fuzz;

use error::Error;
use extractors::*;
use feeds::UserFeeds;

pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");

#[derive(Debug, StructOpt)]
struct Opt {
    /// Address to listen on
    #[structopt(short, long, default_value = "127.0.0.1:3000")]
    listen: SocketAddr,

    /// Minimal number of seconds between two badge evaluations for one user
    #[structopt(long, default_value = "600")]
    badge_check_interval_secs: u32,
}

impl Opt {
    fn badge_check_interval(&self) -> chrono::Duration {
        chrono::Duration::seconds(i64::from(self.badge_check_interval_secs))
    }
}

pub async fn create_sqlx_pool(db_url: &str) -> anyhow::Result<PgPool> {
    Ok(PgPool::new(
        sqlx::postgres::PgPoolOptions::new()
            .max_connections(8)
            .connect(db_url)
            .await
            .with_context(|| format!("opening database {:?}", db_url))?,
    ))
}

pub async fn app(
    db: PgPool,
    admin_token: Option<AuthToken>,
    badge_check_interval: chrono::Duration,
) -> Router {
    let state = AppState {
        db,
        feeds: UserFeeds::new(),
        admin_token,
        badge_check_interval: BadgeCheckInterval(badge_check_interval),
    };
    Router::new()
        .route("/api/admin/create-user", post(handlers::admin_create_user))
        .route("/api/auth", post(handlers::auth))
        .route("/api/unauth", post(handlers::unauth))
        .route("/api/whoami", get(handlers::whoami))
        .route("/api/fetch-users", get(handlers::fetch_users))
        .route("/api/posts", get(handlers::list_posts))
        .route("/api/posts/:id", get(handlers::fetch_post))
        .route("/api/submit-action", post(handlers::submit_action))
        .route("/api/badges", get(handlers::fetch_badges))
        .route("/api/badges/check", post(handlers::check_badges))
        .route("/api/notifications", get(handlers::fetch_notifications))
        .route(
            "/api/notifications/read",
            post(handlers::mark_notifications_read),
        )
        .route("/ws/notification-feed", get(handlers::notification_feed))
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .with_state(state)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();
    let opt = Opt::from_args();

    let db_url = std::env::var("DATABASE_URL").context("DATABASE_URL must be set")?;
    let db = create_sqlx_pool(&db_url).await?;
    MIGRATOR
        .run(&mut *db.acquire().await?)
        .await
        .context("applying pending migrations")?;

    let admin_token = match std::env::var("ADMIN_TOKEN") {
        Err(_) => {
            tracing::info!("no ADMIN_TOKEN set, admin routes are disabled");
            None
        }
        Ok(tok) => Some(AuthToken(
            Uuid::try_parse(&tok).context("parsing ADMIN_TOKEN as an uuid")?,
        )),
    };

    let app = app(db, admin_token, opt.badge_check_interval()).await;

    tracing::info!("listening on {}", opt.listen);
    axum::Server::bind(&opt.listen)
        .serve(app.into_make_service())
        .await
        .context("serving axum webserver")
}
