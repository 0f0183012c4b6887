#![cfg(test)]

use std::{cmp, fmt::Debug, ops::RangeTo, panic::AssertUnwindSafe, path::Path};

use async_recursion::async_recursion;
use bolero::generator::{bolero_generator, TypeGenerator};
use axum::{
    extract::FromRequestParts,
    http::{self, request},
    Router,
};
use chrono::{Duration, TimeZone, Utc};
use quickease_api::{
    Action, AuthToken, BadgeId, CommentId, Error as ApiError, Flashcard, FlashcardId, NewComment,
    NewSession, NewUser, Note, NoteId, Notification, NotificationData, NotificationId, Post,
    PostId, PostSummary, PostView, QuizResult, QuizResultId, Report, Target, Time, User, UserId,
    Uuid, VoteAction, VoteType,
};
use quickease_forum::badge;
use quickease_mock_server::MockServer;
use tower::{Service, ServiceExt};

use crate::{extractors::*, *};

macro_rules! do_tokio_test {
    ( $name:ident, $typ:ty, $fn:expr ) => {
        #[test]
        fn $name() {
            let runtime = AssertUnwindSafe(
                tokio::runtime::Builder::new_current_thread()
                    .enable_all()
                    .build()
                    .expect("failed initializing tokio runtime"),
            );
            bolero::check!()
                .with_type::<$typ>()
                .cloned()
                .for_each(move |v| {
                    let () = runtime.block_on($fn(v));
                })
        }
    };
}

/// Returns `None` when no postgresql binaries are installed
fn build_pg_cluster(data: &Path) -> Option<postgresfixture::cluster::Cluster> {
    let runtime = postgresfixture::runtime::Runtime::find_on_path()
        .into_iter()
        .filter_map(|r| r.version().ok().map(|v| (v, r)))
        .max_by(|(v1, _), (v2, _)| v1.partial_cmp(v2).unwrap_or(cmp::Ordering::Equal))
        .map(|(_, r)| r)?;
    Some(postgresfixture::cluster::Cluster::new(data, runtime))
}

macro_rules! do_sqlx_test {
    ( $name:ident, $gen:expr, $fn:expr ) => {
        #[test]
        fn $name() {
            if std::env::var("RUST_LOG").is_ok() {
                tracing_subscriber::fmt::init();
            }
            let lockfile = tempfile::tempfile().expect("creating tempfile");
            let datadir = tempfile::tempdir().expect("creating tempdir");
            let datadir_path: &Path = datadir.as_ref();
            let cluster = match build_pg_cluster(datadir_path) {
                Some(cluster) => cluster,
                None => {
                    eprintln!("postgresql seems to not be installed in path, skipping {}", stringify!($name));
                    return;
                }
            };
            let datadir_path: &str = datadir_path.to_str().expect("tempdir is not valid utf8");
            postgresfixture::coordinate::run_and_destroy(&cluster, lockfile.into(), || {
                cluster.createdb("test_db").expect("creating test_db database");
                let runtime = AssertUnwindSafe(
                    tokio::runtime::Builder::new_current_thread()
                        .enable_all()
                        .build()
                        .expect("failed initializing tokio runtime"),
                );
                // create test db
                let pool = AssertUnwindSafe(runtime.block_on(async move {
                    let pool = create_sqlx_pool(&format!("postgresql://?host={}&dbname=test_db", datadir_path)).await.expect("creating sqlx pool");
                    MIGRATOR
                        .run(&mut *pool.acquire().await.expect("getting migrator connection"))
                        .await
                        .expect("failed applying migrations");
                    pool
                }));
                bolero::check!()
                    .with_generator($gen)
                    .cloned()
                    .for_each(move |v| {
                        let pool = pool.clone();
                        // run the test
                        let idle_before = pool.num_idle();
                        let v_str = format!("{v:?}");
                        let idle_after_res: Result<usize, _> = {
                            let pool = pool.clone();
                            std::panic::catch_unwind(AssertUnwindSafe(|| {
                                runtime.block_on(async move {
                                    let () = $fn(pool.clone(), v).await;
                                    let mut idle_after = pool.num_idle();
                                    let wait_release_since = std::time::Instant::now();
                                    while idle_after < idle_before
                                        && wait_release_since.elapsed()
                                            <= std::time::Duration::from_secs(1)
                                    {
                                        tokio::task::yield_now().await;
                                        idle_after = pool.num_idle();
                                    }
                                    idle_after
                                })
                            }))
                        };
                        runtime.block_on(async move {
                            // cleanup
                            let mut conn =
                                pool.acquire().await.expect("getting db cleanup connection");
                            sqlx::query(include_str!("../reset-test-db.sql"))
                                .execute(&mut *conn)
                                .await
                                .expect("failed cleaning up database");
                        });
                        // resume the panics
                        match idle_after_res {
                            Err(e) => std::panic::resume_unwind(e),
                            Ok(idle_after) => assert!(
                                idle_after >= idle_before,
                                "test {} held onto pool after exiting test: before there were {idle_before} connections, and after there were {idle_after} with value {v_str}",
                                stringify!($name)
                            ),
                        }
                    });
            })
            .expect("coordinating spinup and shutdown of the pg cluster");
        }
    };
}

do_tokio_test!(fuzz_preauth_extractor, String, |token| async move {
    if let Ok(req) = http::Request::builder()
        .method(http::Method::GET)
        .uri("/")
        .header(http::header::AUTHORIZATION, token)
        .body(())
    {
        let mut req = req.into_parts().0;
        let res = PreAuth::from_request_parts(&mut req, &()).await;
        match res {
            Ok(_) => (),
            Err(Error::Api(ApiError::PermissionDenied)) => (),
            Err(e) => panic!("got unexpected error: {e}"),
        }
    }
});

#[tokio::test]
async fn preauth_accepts_bearer_tokens_only() {
    let tok = Uuid::new_v4();
    for (header, ok) in [
        (format!("Bearer {tok}"), true),
        (format!("bearer {tok}"), true),
        (format!("Basic {tok}"), false),
        (format!("Bearer {tok} {tok}"), false),
        (String::from("Bearer"), false),
        (String::from("Bearer not-a-uuid"), false),
    ] {
        let mut req = http::Request::builder()
            .header(http::header::AUTHORIZATION, &header)
            .body(())
            .unwrap()
            .into_parts()
            .0;
        match PreAuth::from_request_parts(&mut req, &()).await {
            Ok(PreAuth(AuthToken(t))) => assert!(ok && t == tok, "accepted {header:?}"),
            Err(_) => assert!(!ok, "refused {header:?}"),
        }
    }
}

/// Something that already exists on both sides, or a fresh random id
#[derive(Clone, Debug, bolero::generator::TypeGenerator)]
enum FuzzTarget {
    Post(Option<usize>),
    Comment(Option<usize>),
}

#[derive(Clone, Debug, bolero::generator::TypeGenerator)]
enum FuzzOp {
    CreateUser {
        name: u8,
        bad_name: bool,
        reuse_id: Option<usize>,
    },
    Auth {
        uid: usize,
        #[generator(bolero::generator::gen_with::<String>().len(1..100usize))]
        device: String,
        bad_password: bool,
    },
    Unauth {
        sid: usize,
    },
    Whoami {
        sid: usize,
    },
    FetchUsers {
        sid: usize,
    },
    ListPosts {
        sid: usize,
    },
    FetchPost {
        sid: usize,
        post: Option<usize>,
    },
    NewPost {
        sid: usize,
        reuse_id: Option<usize>,
        delay_ms: u16,
        #[generator(bolero::generator::gen_with::<String>().len(0..50usize))]
        title: String,
    },
    NewComment {
        sid: usize,
        post: Option<usize>,
        parent: Option<usize>,
        reuse_id: Option<usize>,
        delay_ms: i16,
        #[generator(bolero::generator::gen_with::<String>().len(0..50usize))]
        text: String,
    },
    DeleteComment {
        sid: usize,
        comment: Option<usize>,
    },
    Vote {
        sid: usize,
        target: FuzzTarget,
        up: bool,
    },
    Report {
        sid: usize,
        target: FuzzTarget,
    },
    NewNote {
        sid: usize,
        reuse_id: Option<usize>,
    },
    NewFlashcard {
        sid: usize,
        note: Option<usize>,
    },
    RecordQuizScore {
        sid: usize,
        score: i8,
        total: i8,
    },
    FetchBadges {
        sid: usize,
    },
    CheckBadges {
        sid: usize,
    },
    FetchNotifications {
        sid: usize,
    },
    MarkAllNotificationsRead {
        sid: usize,
    },
}

async fn call<Req, Resp>(
    app: &mut Router,
    req: request::Request<axum::body::Body>,
    req_body: &Req,
) -> Result<Resp, ApiError>
where
    Req: Debug,
    Resp: 'static + for<'de> serde::Deserialize<'de>,
{
    app.ready().await.expect("waiting for app to be ready");
    let resp = app.call(req).await.expect("running request");
    let status = resp.status();
    let body = hyper::body::to_bytes(resp.into_body())
        .await
        .expect("recovering resp bytes");
    if status == http::StatusCode::OK {
        // the server returns an empty body for unit responses, which serde_json does not parse
        let body: &[u8] = match body.is_empty() {
            true => b"null",
            false => &body,
        };
        return Ok(serde_json::from_slice(body).unwrap_or_else(|err| {
            panic!(
                r#"
                    Failed parsing resp body!

                    The error is the following:
                    ---
                    {err}
                    ---

                    Response body is:
                    ---
                    {body:?}
                    ---

                    Request was:
                    ---
                    {req_body:?}
                    ---
                "#
            )
        }));
    }
    Err(ApiError::parse(&body)
        .unwrap_or_else(|err| panic!("parsing error response body {err}, body is {body:?}")))
}

async fn run_on_app<Req, Resp>(
    app: &mut Router,
    method: &str,
    uri: &str,
    token: Option<Uuid>,
    body: &Req,
) -> Result<Resp, ApiError>
where
    Req: Debug + serde::Serialize,
    Resp: 'static + for<'de> serde::Deserialize<'de>,
{
    let req = request::Builder::new()
        .method(method)
        .uri(uri)
        .header(http::header::CONTENT_TYPE, "application/json");
    let req = match token {
        Some(token) => req.header(http::header::AUTHORIZATION, format!("bearer {token}")),
        None => req,
    };
    let req = req
        .body(axum::body::Body::from(
            serde_json::to_vec(body).expect("serializing request body to json"),
        ))
        .expect("building request");
    call(app, req, body).await
}

fn compare<T>(name: &str, app_res: Result<T, ApiError>, mock_res: Result<T, ApiError>)
where
    T: Debug + PartialEq,
{
    assert_eq!(
        app_res, mock_res,
        "app and mock did not return the same result for {name}"
    );
}

fn resize_int(fuzz_id: usize, RangeTo { end }: RangeTo<usize>) -> Option<usize> {
    if end == 0 {
        return None;
    }
    let bucket_size = cmp::max(1, usize::MAX / end); // in case we rounded to 0
    let id = fuzz_id / bucket_size;
    Some(cmp::min(id, end - 1)) // in case id was actually over end - 1 due to rounding
}

fn pick<T: Copy>(fuzz_id: Option<usize>, known: &[T], fresh: impl FnOnce() -> T) -> T {
    match fuzz_id.and_then(|i| resize_int(i, ..known.len())) {
        Some(i) => known[i],
        None => fresh(),
    }
}

/// Notification ids and dates are picked independently by each side
fn comparable_notifications(n: Vec<Notification>) -> Vec<(NotificationData, bool)> {
    let mut res = n
        .into_iter()
        .map(|n| (n.data, n.read))
        .collect::<Vec<_>>();
    res.sort_by_key(|(data, read)| (format!("{data:?}"), *read));
    res
}

#[derive(Clone, Copy)]
struct Session {
    app: AuthToken,
    mock: AuthToken,
    user: UserId,
}

struct ComparativeFuzzer {
    admin_token: Uuid,
    app: Router,
    mock: MockServer,
    sessions: Vec<Session>,
    users: Vec<UserId>,
    posts: Vec<PostId>,
    comments: Vec<(CommentId, Time)>,
    notes: Vec<NoteId>,
    clock: Time,
}

impl ComparativeFuzzer {
    async fn new(pool: PgPool) -> ComparativeFuzzer {
        let admin_token = Uuid::new_v4();
        let interval = badge::default_check_interval();
        ComparativeFuzzer {
            admin_token,
            app: app(pool, Some(AuthToken(admin_token)), interval).await,
            mock: MockServer::new(interval),
            sessions: Vec::new(),
            users: Vec::new(),
            posts: Vec::new(),
            comments: Vec::new(),
            notes: Vec::new(),
            // whole milliseconds, that postgres stores without loss
            clock: Utc.with_ymd_and_hms(2023, 3, 1, 12, 0, 0).unwrap(),
        }
    }

    fn tick(&mut self, delay_ms: i64) -> Time {
        self.clock = self.clock + Duration::milliseconds(delay_ms.max(1));
        self.clock
    }

    /// Returns a session, logging a fresh user in if there is none yet
    #[async_recursion]
    async fn session(&mut self, sid: usize) -> Session {
        match resize_int(sid, ..self.sessions.len()) {
            Some(sid) => self.sessions[sid],
            None => {
                let uid = self.mock.test_num_users();
                self.execute_fuzz_op(FuzzOp::CreateUser {
                    name: 0,
                    bad_name: false,
                    reuse_id: None,
                })
                .await;
                self.execute_fuzz_op(FuzzOp::Auth {
                    uid: uid.saturating_mul(usize::MAX / (uid + 1)),
                    device: String::from("fuzzer"),
                    bad_password: false,
                })
                .await;
                self.sessions
                    .last()
                    .copied()
                    .expect("logging in a fresh user failed")
            }
        }
    }

    async fn get<Resp>(&mut self, s: Session, uri: &str) -> Result<Resp, ApiError>
    where
        Resp: 'static + for<'de> serde::Deserialize<'de>,
    {
        run_on_app(&mut self.app, "GET", uri, Some(s.app.0), &()).await
    }

    async fn submit(&mut self, name: &str, s: Session, a: Action) {
        compare(
            name,
            run_on_app(
                &mut self.app,
                "POST",
                "/api/submit-action",
                Some(s.app.0),
                &a,
            )
            .await,
            self.mock.submit_action(s.mock, a).await,
        )
    }

    fn target(&self, t: FuzzTarget) -> Target {
        match t {
            FuzzTarget::Post(p) => Target::Post(pick(p, &self.posts, || PostId(Uuid::new_v4()))),
            FuzzTarget::Comment(c) => Target::Comment(
                pick(c, &self.comments, || (CommentId(Uuid::new_v4()), self.clock)).0,
            ),
        }
    }

    #[async_recursion]
    async fn execute_fuzz_op(&mut self, op: FuzzOp) {
        match op {
            FuzzOp::CreateUser {
                name,
                bad_name,
                reuse_id,
            } => {
                let id = pick(reuse_id, &self.users, || UserId(Uuid::new_v4()));
                let name = match bad_name {
                    true => format!("user {name}"),
                    false => format!("user{}-{name}", self.mock.test_num_users()),
                };
                // no hashing for tests
                let new_user = NewUser {
                    id,
                    name,
                    initial_password_hash: String::from("password"),
                };
                let pass = new_user.initial_password_hash.clone();
                let app_res = run_on_app(
                    &mut self.app,
                    "POST",
                    "/api/admin/create-user",
                    Some(self.admin_token),
                    &new_user,
                )
                .await;
                let mock_res = self.mock.admin_create_user(new_user, pass);
                if mock_res.is_ok() {
                    self.users.push(id);
                }
                compare("CreateUser", app_res, mock_res)
            }
            FuzzOp::Auth {
                uid,
                device,
                bad_password,
            } => match resize_int(uid, ..self.mock.test_num_users()) {
                None => {
                    self.session(0).await;
                }
                Some(uid) => {
                    let (user, password) = self.mock.test_get_user_info(uid);
                    let session = NewSession {
                        user: String::from(user),
                        password: match bad_password {
                            true => format!("not {password}"),
                            false => String::from(password),
                        },
                        device,
                        pow: String::new(),
                    };
                    let app_tok: Result<AuthToken, _> =
                        run_on_app(&mut self.app, "POST", "/api/auth", None, &session).await;
                    let mock_tok = self.mock.auth(session);
                    if let (&Ok(app), &Ok(mock)) = (&app_tok, &mock_tok) {
                        let user = self.mock.whoami(mock).expect("whoami right after login");
                        self.sessions.push(Session { app, mock, user });
                    }
                    compare("Auth", app_tok.map(|_| ()), mock_tok.map(|_| ()));
                }
            },
            FuzzOp::Unauth { sid } => {
                let s = self.session(sid).await;
                compare(
                    "Unauth",
                    run_on_app(&mut self.app, "POST", "/api/unauth", Some(s.app.0), &()).await,
                    self.mock.unauth(s.mock),
                );
                // keep the dead session around, to check it is refused everywhere
            }
            FuzzOp::Whoami { sid } => {
                let s = self.session(sid).await;
                compare::<UserId>(
                    "Whoami",
                    self.get(s, "/api/whoami").await,
                    self.mock.whoami(s.mock),
                );
            }
            FuzzOp::FetchUsers { sid } => {
                let s = self.session(sid).await;
                compare::<Vec<User>>(
                    "FetchUsers",
                    self.get(s, "/api/fetch-users").await,
                    self.mock.fetch_users(s.mock),
                );
            }
            FuzzOp::ListPosts { sid } => {
                let s = self.session(sid).await;
                compare::<Vec<PostSummary>>(
                    "ListPosts",
                    self.get(s, "/api/posts").await,
                    self.mock.list_posts(s.mock),
                );
            }
            FuzzOp::FetchPost { sid, post } => {
                let s = self.session(sid).await;
                let post = pick(post, &self.posts, || PostId(Uuid::new_v4()));
                compare::<PostView>(
                    "FetchPost",
                    self.get(s, &format!("/api/posts/{}", post.0)).await,
                    self.mock.fetch_post(s.mock, post),
                );
            }
            FuzzOp::NewPost {
                sid,
                reuse_id,
                delay_ms,
                title,
            } => {
                let s = self.session(sid).await;
                let post = Post {
                    id: pick(reuse_id, &self.posts, || PostId(Uuid::new_v4())),
                    owner_id: s.user,
                    date: self.tick(i64::from(delay_ms)),
                    content: format!("About {title}"),
                    title,
                };
                if !self.posts.contains(&post.id) {
                    self.posts.push(post.id);
                }
                self.submit("NewPost", s, Action::NewPost(post)).await;
            }
            FuzzOp::NewComment {
                sid,
                post,
                parent,
                reuse_id,
                delay_ms,
                text,
            } => {
                let s = self.session(sid).await;
                let post = pick(post, &self.posts, || PostId(Uuid::new_v4()));
                let parent = parent.map(|p| {
                    pick(Some(p), &self.comments, || {
                        (CommentId(Uuid::new_v4()), self.clock)
                    })
                });
                let id = pick(reuse_id, &self.comments, || {
                    (CommentId(Uuid::new_v4()), self.clock)
                })
                .0;
                // a negative delay may date the reply before its parent
                let date = match delay_ms < 0 {
                    true => self.clock + Duration::milliseconds(i64::from(delay_ms)),
                    false => self.tick(i64::from(delay_ms)),
                };
                let comment = NewComment {
                    id,
                    post_id: post,
                    parent_id: parent.map(|(p, _)| p),
                    owner_id: s.user,
                    date,
                    text,
                };
                if !self.comments.iter().any(|(c, _)| *c == id) {
                    self.comments.push((id, date));
                }
                self.submit("NewComment", s, Action::NewComment(comment))
                    .await;
            }
            FuzzOp::DeleteComment { sid, comment } => {
                let s = self.session(sid).await;
                let comment = pick(comment, &self.comments, || {
                    (CommentId(Uuid::new_v4()), self.clock)
                })
                .0;
                self.submit("DeleteComment", s, Action::DeleteComment(comment))
                    .await;
            }
            FuzzOp::Vote { sid, target, up } => {
                let s = self.session(sid).await;
                let vote = VoteAction {
                    voter_id: s.user,
                    target: self.target(target),
                    vote_type: match up {
                        true => VoteType::Up,
                        false => VoteType::Down,
                    },
                };
                self.submit("Vote", s, Action::Vote(vote)).await;
            }
            FuzzOp::Report { sid, target } => {
                let s = self.session(sid).await;
                let report = Report {
                    reporter_id: s.user,
                    target: self.target(target),
                    date: self.tick(1),
                    reason: String::from("spam"),
                };
                self.submit("Report", s, Action::Report(report)).await;
            }
            FuzzOp::NewNote { sid, reuse_id } => {
                let s = self.session(sid).await;
                let note = Note {
                    id: pick(reuse_id, &self.notes, || NoteId(Uuid::new_v4())),
                    owner_id: s.user,
                    date: self.tick(1),
                    title: String::from("Photosynthesis"),
                    content: String::from("6 CO2 + 6 H2O -> C6H12O6 + 6 O2"),
                };
                if !self.notes.contains(&note.id) {
                    self.notes.push(note.id);
                }
                self.submit("NewNote", s, Action::NewNote(note)).await;
            }
            FuzzOp::NewFlashcard { sid, note } => {
                let s = self.session(sid).await;
                let card = Flashcard {
                    id: FlashcardId(Uuid::new_v4()),
                    owner_id: s.user,
                    date: self.tick(1),
                    note_id: note.map(|n| pick(Some(n), &self.notes, || NoteId(Uuid::new_v4()))),
                    front: String::from("Where does photosynthesis happen?"),
                    back: String::from("In the chloroplasts"),
                };
                self.submit("NewFlashcard", s, Action::NewFlashcard(card))
                    .await;
            }
            FuzzOp::RecordQuizScore { sid, score, total } => {
                let s = self.session(sid).await;
                let result = QuizResult {
                    id: QuizResultId(Uuid::new_v4()),
                    owner_id: s.user,
                    date: self.tick(1),
                    score: i32::from(score),
                    total: i32::from(total),
                };
                self.submit("RecordQuizScore", s, Action::RecordQuizScore(result))
                    .await;
            }
            FuzzOp::FetchBadges { sid } => {
                let s = self.session(sid).await;
                compare::<Vec<BadgeId>>(
                    "FetchBadges",
                    self.get(s, "/api/badges").await,
                    self.mock.fetch_badges(s.mock),
                );
            }
            FuzzOp::CheckBadges { sid } => {
                let s = self.session(sid).await;
                compare::<Vec<BadgeId>>(
                    "CheckBadges",
                    run_on_app(
                        &mut self.app,
                        "POST",
                        "/api/badges/check",
                        Some(s.app.0),
                        &(),
                    )
                    .await,
                    self.mock.check_badges(s.mock),
                );
            }
            FuzzOp::FetchNotifications { sid } => {
                let s = self.session(sid).await;
                compare(
                    "FetchNotifications",
                    self.get::<Vec<Notification>>(s, "/api/notifications")
                        .await
                        .map(comparable_notifications),
                    self.mock
                        .fetch_notifications(s.mock)
                        .map(comparable_notifications),
                );
            }
            FuzzOp::MarkAllNotificationsRead { sid } => {
                let s = self.session(sid).await;
                let app_ids = self
                    .get::<Vec<Notification>>(s, "/api/notifications")
                    .await
                    .map(|n| n.into_iter().map(|n| n.id).collect::<Vec<NotificationId>>())
                    .unwrap_or_default();
                let mock_ids = self
                    .mock
                    .fetch_notifications(s.mock)
                    .map(|n| n.into_iter().map(|n| n.id).collect::<Vec<NotificationId>>())
                    .unwrap_or_default();
                compare(
                    "MarkAllNotificationsRead",
                    run_on_app(
                        &mut self.app,
                        "POST",
                        "/api/notifications/read",
                        Some(s.app.0),
                        &app_ids,
                    )
                    .await,
                    self.mock.mark_notifications_read(s.mock, &mock_ids),
                );
            }
        }
    }
}

do_sqlx_test!(
    compare_with_mock,
    bolero::generator::gen_with::<Vec<FuzzOp>>().len(1..100usize),
    |pool, test: Vec<FuzzOp>| async move {
        let mut fuzzer = ComparativeFuzzer::new(pool).await;
        for op in test {
            fuzzer.execute_fuzz_op(op).await;
        }
    }
);

do_sqlx_test!(
    deleted_comment_ids_stay_taken,
    bolero::generator::gen::<bool>(),
    |pool, as_reply: bool| async move {
        let mut fuzzer = ComparativeFuzzer::new(pool).await;
        let s = fuzzer.session(0).await;
        fuzzer
            .execute_fuzz_op(FuzzOp::NewPost {
                sid: 0,
                reuse_id: None,
                delay_ms: 1,
                title: String::from("Krebs cycle"),
            })
            .await;
        for parent in [None, Some(0)] {
            fuzzer
                .execute_fuzz_op(FuzzOp::NewComment {
                    sid: 0,
                    post: Some(0),
                    parent,
                    reuse_id: None,
                    delay_ms: 1,
                    text: String::from("citrate first"),
                })
                .await;
        }
        let (deleted, _) = fuzzer.comments[0];
        let (reply, _) = fuzzer.comments[1];
        fuzzer
            .execute_fuzz_op(FuzzOp::DeleteComment {
                sid: 0,
                comment: Some(0),
            })
            .await;

        let date = fuzzer.tick(1);
        let again = Action::NewComment(NewComment {
            id: deleted,
            post_id: fuzzer.posts[0],
            parent_id: as_reply.then_some(reply),
            owner_id: s.user,
            date,
            text: String::from("oxaloacetate last"),
        });
        let app_res: Result<(), ApiError> = run_on_app(
            &mut fuzzer.app,
            "POST",
            "/api/submit-action",
            Some(s.app.0),
            &again,
        )
        .await;
        assert_eq!(app_res, Err(ApiError::UuidAlreadyUsed(deleted.0)));
        assert_eq!(
            fuzzer.mock.submit_action(s.mock, again).await,
            Err(ApiError::UuidAlreadyUsed(deleted.0))
        );

        let view: PostView = fuzzer
            .get(s, &format!("/api/posts/{}", fuzzer.posts[0].0))
            .await
            .expect("fetching post");
        assert_eq!(view.comments.len(), 1);
        assert_eq!(view.comments[0].comment.id, reply);
        assert!(view.comments[0].replies.is_empty());
    }
);
