use std::collections::{btree_map, BTreeMap, HashMap};

use chrono::{Duration, Utc};
use quickease_forum::{
    api::{
        self, Action, AuthToken, BadgeId, Error, NewSession, NewUser, Notification,
        NotificationId, PostId, PostSummary, PostView, Time, UserId, Uuid,
    },
    badge, ForumDump,
};
use tokio::sync::mpsc;

pub struct MockServer {
    users: BTreeMap<UserId, MockUser>,
    forum: ForumDump,
    badge_check_interval: Duration,
}

#[derive(Debug)]
struct MockUser {
    name: String,
    pass: String,
    pass_hash: String,
    sessions: HashMap<AuthToken, Device>,
    feeds: Vec<mpsc::UnboundedSender<Notification>>,
}

#[derive(Debug)]
struct Device(String);

impl Default for MockServer {
    fn default() -> MockServer {
        MockServer::new(badge::default_check_interval())
    }
}

impl MockServer {
    pub fn new(badge_check_interval: Duration) -> MockServer {
        MockServer {
            users: BTreeMap::new(),
            forum: ForumDump::new(),
            badge_check_interval,
        }
    }

    /// Return name & pass for user number `id`
    pub fn test_get_user_info(&self, id: usize) -> (&str, &str) {
        let u = self
            .users
            .values()
            .nth(id)
            .unwrap_or_else(|| panic!("getting user {id} among {}", self.users.len()));
        (&u.name, &u.pass)
    }

    /// Return the current number of users
    pub fn test_num_users(&self) -> usize {
        self.users.len()
    }

    pub fn admin_create_user(&mut self, u: NewUser, password: String) -> Result<(), Error> {
        u.validate()?;

        if self.users.values().any(|db| db.name == u.name) {
            return Err(Error::NameAlreadyUsed(u.name));
        }

        match self.users.entry(u.id) {
            btree_map::Entry::Occupied(_) => Err(Error::UuidAlreadyUsed(u.id.0)),
            btree_map::Entry::Vacant(entry) => {
                entry.insert(MockUser {
                    name: u.name.clone(),
                    pass: password,
                    pass_hash: u.initial_password_hash,
                    sessions: HashMap::new(),
                    feeds: Vec::new(),
                });
                self.forum.add_user(api::User {
                    id: u.id,
                    name: u.name,
                });
                Ok(())
            }
        }
    }

    pub fn auth(&mut self, s: NewSession) -> Result<AuthToken, Error> {
        s.validate_except_pow()?;
        let u = self
            .users
            .values_mut()
            .find(|u| u.name == s.user)
            .ok_or(Error::PermissionDenied)?;
        // tests (of which mock-server is a part of) don't actually use bcrypt
        if s.password != u.pass_hash {
            return Err(Error::PermissionDenied);
        }
        let tok = AuthToken(Uuid::new_v4());
        u.sessions.insert(tok, Device(s.device));
        Ok(tok)
    }

    fn resolve(&self, tok: AuthToken) -> Result<UserId, Error> {
        self.users
            .iter()
            .find(|(_, u)| u.sessions.contains_key(&tok))
            .map(|(id, _)| *id)
            .ok_or(Error::PermissionDenied)
    }

    pub fn unauth(&mut self, tok: AuthToken) -> Result<(), Error> {
        let user = self.resolve(tok)?;
        if let Some(u) = self.users.get_mut(&user) {
            u.sessions.remove(&tok);
        }
        Ok(())
    }

    pub fn whoami(&self, tok: AuthToken) -> Result<UserId, Error> {
        self.resolve(tok)
    }

    pub fn fetch_users(&self, tok: AuthToken) -> Result<Vec<api::User>, Error> {
        self.resolve(tok)?;
        Ok(self
            .users
            .iter()
            .map(|(id, u)| api::User {
                id: *id,
                name: u.name.clone(),
            })
            .collect())
    }

    pub fn list_posts(&self, tok: AuthToken) -> Result<Vec<PostSummary>, Error> {
        let user = self.resolve(tok)?;
        self.forum
            .post_summaries(user)
            .map_err(|e| Error::Unknown(format!("{e:#}")))
    }

    pub fn fetch_post(&self, tok: AuthToken, post: PostId) -> Result<PostView, Error> {
        let user = self.resolve(tok)?;
        self.forum
            .view_post(post, user)
            .map_err(|e| Error::Unknown(format!("{e:#}")))?
            .ok_or(Error::NotFound(post.0))
    }

    pub async fn submit_action(&mut self, tok: AuthToken, a: Action) -> Result<(), Error> {
        let user = self.resolve(tok)?;
        a.validate()?;
        let authorized = a
            .is_authorized(&mut self.forum.as_user(user))
            .await
            .map_err(|e| Error::Unknown(format!("{e:#}")))?;
        if !authorized {
            tracing::debug!(?user, ?a, "refusing unauthorized action");
            return Err(Error::PermissionDenied);
        }
        let notifs = self.forum.apply(a)?;
        self.relay_notifications(notifs);
        Ok(())
    }

    pub fn fetch_badges(&self, tok: AuthToken) -> Result<Vec<BadgeId>, Error> {
        let user = self.resolve(tok)?;
        Ok(self.forum.badges_of(user))
    }

    pub fn check_badges(&mut self, tok: AuthToken) -> Result<Vec<BadgeId>, Error> {
        self.check_badges_at(tok, Utc::now())
    }

    pub fn check_badges_at(&mut self, tok: AuthToken, now: Time) -> Result<Vec<BadgeId>, Error> {
        let user = self.resolve(tok)?;
        let (awarded, notifs) = self
            .forum
            .check_badges(user, now, self.badge_check_interval);
        self.relay_notifications(notifs);
        Ok(awarded)
    }

    pub fn fetch_notifications(&self, tok: AuthToken) -> Result<Vec<Notification>, Error> {
        let user = self.resolve(tok)?;
        Ok(self.forum.notifications_for(user))
    }

    pub fn mark_notifications_read(
        &mut self,
        tok: AuthToken,
        ids: &[NotificationId],
    ) -> Result<(), Error> {
        let user = self.resolve(tok)?;
        self.forum.mark_notifications_read(user, ids);
        Ok(())
    }

    pub fn notification_feed(
        &mut self,
        tok: AuthToken,
    ) -> Result<mpsc::UnboundedReceiver<Notification>, Error> {
        let user = self.resolve(tok)?;
        let (sender, receiver) = mpsc::unbounded_channel();
        if let Some(u) = self.users.get_mut(&user) {
            u.feeds.push(sender);
        }
        Ok(receiver)
    }

    fn relay_notifications(&mut self, notifs: Vec<Notification>) {
        for n in notifs {
            if let Some(u) = self.users.get_mut(&n.user_id) {
                u.feeds.retain(|f| f.send(n.clone()).is_ok());
            }
        }
    }
}
