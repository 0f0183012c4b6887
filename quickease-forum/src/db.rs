use std::collections::{BTreeSet, HashMap, HashSet};

use anyhow::anyhow;
use async_trait::async_trait;
use chrono::Duration;

use crate::{
    api::{
        Action, BadgeId, BadgeStats, Comment, CommentId, Db, Error, Flashcard, FlashcardId,
        NewComment, Note, NoteId, Notification, NotificationData, NotificationId, Post, PostId,
        PostSummary, PostView, QuizResult, QuizResultId, Report, Target, Time, User, UserId, Vote,
        VoteAction, VoteChange, VoteState, VoteTally, VoteType,
    },
    badge, build_comment_tree, sort_for_tree,
};

/// The whole forum, held in memory
#[derive(Clone, Debug, Default)]
pub struct ForumDump {
    pub users: HashMap<UserId, User>,
    pub posts: HashMap<PostId, Post>,
    pub comments: HashMap<CommentId, NewComment>,
    /// Ids of deleted comments, that stay taken
    pub deleted_comments: HashSet<CommentId>,
    pub post_votes: HashMap<(UserId, PostId), VoteType>,
    pub comment_votes: HashMap<(UserId, CommentId), VoteType>,
    pub reports: HashMap<(UserId, Target), Report>,
    pub notes: HashMap<NoteId, Note>,
    pub flashcards: HashMap<FlashcardId, Flashcard>,
    pub quiz_results: HashMap<QuizResultId, QuizResult>,
    pub badges: HashMap<UserId, BTreeSet<BadgeId>>,
    pub last_badge_check: HashMap<UserId, Time>,
    pub notifications: Vec<Notification>,
}

/// A `ForumDump` seen from one user's point of view, for authorization checks
pub struct DumpAs<'a> {
    pub dump: &'a ForumDump,
    pub user: UserId,
}

impl ForumDump {
    pub fn new() -> ForumDump {
        ForumDump::default()
    }

    pub fn as_user(&self, user: UserId) -> DumpAs<'_> {
        DumpAs { dump: self, user }
    }

    pub fn add_user(&mut self, u: User) {
        self.users.insert(u.id, u);
    }

    fn user(&self, id: UserId) -> anyhow::Result<User> {
        self.users
            .get(&id)
            .cloned()
            .ok_or_else(|| anyhow!("user {id:?} is not in db"))
    }

    fn post_tally(&self, post: PostId, viewer: UserId) -> VoteTally {
        let votes = self
            .post_votes
            .iter()
            .filter(|((_, p), _)| *p == post)
            .map(|((user_id, _), vote_type)| Vote {
                user_id: *user_id,
                vote_type: *vote_type,
            })
            .collect::<Vec<_>>();
        VoteTally::of(&votes, viewer)
    }

    /// All comments of `post`, sorted for `build_comment_tree`
    pub fn comments_of(&self, post: PostId) -> anyhow::Result<Vec<Comment>> {
        let mut res = Vec::new();
        for c in self.comments.values().filter(|c| c.post_id == post) {
            let mut votes = self
                .comment_votes
                .iter()
                .filter(|((_, comm), _)| *comm == c.id)
                .map(|((user_id, _), vote_type)| Vote {
                    user_id: *user_id,
                    vote_type: *vote_type,
                })
                .collect::<Vec<_>>();
            votes.sort_unstable_by_key(|v| v.user_id);
            res.push(Comment {
                id: c.id,
                post_id: c.post_id,
                parent_id: c.parent_id,
                owner_id: c.owner_id,
                date: c.date,
                text: c.text.clone(),
                votes,
                user: self.user(c.owner_id)?,
            });
        }
        sort_for_tree(&mut res);
        Ok(res)
    }

    /// Newest posts first
    pub fn post_summaries(&self, viewer: UserId) -> anyhow::Result<Vec<PostSummary>> {
        let mut posts = self.posts.values().collect::<Vec<_>>();
        posts.sort_unstable_by_key(|p| (std::cmp::Reverse(p.date), p.id));
        posts
            .into_iter()
            .map(|p| {
                Ok(PostSummary {
                    post: p.clone(),
                    author: self.user(p.owner_id)?,
                    tally: self.post_tally(p.id, viewer),
                    comment_count: self.comments.values().filter(|c| c.post_id == p.id).count()
                        as i64,
                })
            })
            .collect()
    }

    pub fn view_post(&self, post: PostId, viewer: UserId) -> anyhow::Result<Option<PostView>> {
        let p = match self.posts.get(&post) {
            None => return Ok(None),
            Some(p) => p,
        };
        Ok(Some(PostView {
            post: p.clone(),
            author: self.user(p.owner_id)?,
            tally: self.post_tally(post, viewer),
            comments: build_comment_tree(self.comments_of(post)?, viewer),
        }))
    }

    /// Applies an action that was already validated and authorized, returning the
    /// notifications it triggered
    pub fn apply(&mut self, a: Action) -> Result<Vec<Notification>, Error> {
        let mut notifs = Vec::new();
        match a {
            Action::NewPost(p) => {
                if self.posts.contains_key(&p.id) {
                    return Err(Error::UuidAlreadyUsed(p.id.0));
                }
                self.posts.insert(p.id, p);
            }
            Action::NewComment(c) => {
                if self.comments.contains_key(&c.id) || self.deleted_comments.contains(&c.id) {
                    return Err(Error::UuidAlreadyUsed(c.id.0));
                }
                let to_notify = match c.parent_id {
                    None => self.posts.get(&c.post_id).map(|p| {
                        (
                            p.owner_id,
                            NotificationData::NewComment {
                                post: c.post_id,
                                comment: c.id,
                            },
                        )
                    }),
                    Some(parent) => self.comments.get(&parent).map(|par| {
                        (
                            par.owner_id,
                            NotificationData::Reply {
                                post: c.post_id,
                                comment: c.id,
                                parent,
                            },
                        )
                    }),
                };
                if let Some((user, data)) = to_notify {
                    if user != c.owner_id {
                        notifs.push(Notification::now(user, data));
                    }
                }
                self.comments.insert(c.id, c);
            }
            Action::DeleteComment(c) => {
                // replies are left in place, and will show up as orphans
                if self.comments.remove(&c).is_some() {
                    self.deleted_comments.insert(c);
                }
                self.comment_votes.retain(|(_, comm), _| *comm != c);
            }
            Action::Vote(v) => self.apply_vote(v),
            Action::Report(r) => {
                self.reports.entry((r.reporter_id, r.target)).or_insert(r);
            }
            Action::NewNote(n) => {
                if self.notes.contains_key(&n.id) {
                    return Err(Error::UuidAlreadyUsed(n.id.0));
                }
                self.notes.insert(n.id, n);
            }
            Action::NewFlashcard(f) => {
                if self.flashcards.contains_key(&f.id) {
                    return Err(Error::UuidAlreadyUsed(f.id.0));
                }
                self.flashcards.insert(f.id, f);
            }
            Action::RecordQuizScore(q) => {
                if self.quiz_results.contains_key(&q.id) {
                    return Err(Error::UuidAlreadyUsed(q.id.0));
                }
                self.quiz_results.insert(q.id, q);
            }
        }
        self.notifications.extend(notifs.iter().cloned());
        Ok(notifs)
    }

    fn apply_vote(&mut self, v: VoteAction) {
        macro_rules! toggle {
            ($table:expr, $key:expr) => {{
                let key = $key;
                let before = VoteState::from_vote($table.get(&key).copied());
                match VoteChange::between(before, before.cast(v.vote_type)) {
                    VoteChange::Nothing => (),
                    VoteChange::Insert(t) | VoteChange::Replace(t) => {
                        $table.insert(key, t);
                    }
                    VoteChange::Delete => {
                        $table.remove(&key);
                    }
                }
            }};
        }
        match v.target {
            Target::Post(p) => toggle!(self.post_votes, (v.voter_id, p)),
            Target::Comment(c) => toggle!(self.comment_votes, (v.voter_id, c)),
        }
    }

    pub fn vote_state(&self, user: UserId, target: Target) -> VoteState {
        VoteState::from_vote(match target {
            Target::Post(p) => self.post_votes.get(&(user, p)).copied(),
            Target::Comment(c) => self.comment_votes.get(&(user, c)).copied(),
        })
    }

    pub fn badge_stats(&self, user: UserId) -> BadgeStats {
        let own_posts = self.posts.values().filter(|p| p.owner_id == user);
        let own_comments = self.comments.values().filter(|c| c.owner_id == user);
        let post_upvotes = self
            .post_votes
            .iter()
            .filter(|((voter, p), t)| {
                *voter != user
                    && **t == VoteType::Up
                    && self.posts.get(p).map(|p| p.owner_id) == Some(user)
            })
            .count();
        let comment_upvotes = self
            .comment_votes
            .iter()
            .filter(|((voter, c), t)| {
                *voter != user
                    && **t == VoteType::Up
                    && self.comments.get(c).map(|c| c.owner_id) == Some(user)
            })
            .count();
        BadgeStats {
            notes_created: self.notes.values().filter(|n| n.owner_id == user).count() as i64,
            flashcards_created: self
                .flashcards
                .values()
                .filter(|f| f.owner_id == user)
                .count() as i64,
            perfect_quiz_scores: self
                .quiz_results
                .values()
                .filter(|q| q.owner_id == user && q.is_perfect())
                .count() as i64,
            upvotes_received: (post_upvotes + comment_upvotes) as i64,
            forum_activity: (own_posts.count() + own_comments.count()) as i64,
        }
    }

    pub fn badges_of(&self, user: UserId) -> Vec<BadgeId> {
        self.badges
            .get(&user)
            .map(|b| b.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Awards the badges `user` newly qualifies for, unless a check already ran
    /// for them less than `interval` ago
    pub fn check_badges(
        &mut self,
        user: UserId,
        now: Time,
        interval: Duration,
    ) -> (Vec<BadgeId>, Vec<Notification>) {
        if !badge::check_is_stale(self.last_badge_check.get(&user).copied(), now, interval) {
            return (Vec::new(), Vec::new());
        }
        self.last_badge_check.insert(user, now);
        let stats = self.badge_stats(user);
        let held = self.badges.entry(user).or_default();
        let awarded = badge::newly_qualified(&stats, held);
        held.extend(awarded.iter().copied());
        let notifs = awarded
            .iter()
            .map(|b| Notification::now(user, NotificationData::BadgeAwarded(*b)))
            .collect::<Vec<_>>();
        self.notifications.extend(notifs.iter().cloned());
        (awarded, notifs)
    }

    /// Newest first
    pub fn notifications_for(&self, user: UserId) -> Vec<Notification> {
        let mut res = self
            .notifications
            .iter()
            .filter(|n| n.user_id == user)
            .cloned()
            .collect::<Vec<_>>();
        res.sort_unstable_by_key(|n| (std::cmp::Reverse(n.date), n.id));
        res
    }

    pub fn mark_notifications_read(&mut self, user: UserId, ids: &[NotificationId]) {
        for n in self.notifications.iter_mut() {
            if n.user_id == user && ids.contains(&n.id) {
                n.read = true;
            }
        }
    }
}

#[async_trait]
impl<'a> Db for DumpAs<'a> {
    fn current_user(&self) -> UserId {
        self.user
    }

    async fn post_owner(&mut self, p: PostId) -> anyhow::Result<Option<UserId>> {
        Ok(self.dump.posts.get(&p).map(|p| p.owner_id))
    }

    async fn comment_info(
        &mut self,
        c: CommentId,
    ) -> anyhow::Result<Option<(UserId, PostId, Time)>> {
        Ok(self
            .dump
            .comments
            .get(&c)
            .map(|c| (c.owner_id, c.post_id, c.date)))
    }

    async fn note_owner(&mut self, n: NoteId) -> anyhow::Result<Option<UserId>> {
        Ok(self.dump.notes.get(&n).map(|n| n.owner_id))
    }
}
