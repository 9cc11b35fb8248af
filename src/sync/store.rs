//! Local mirror of remote state.
//!
//! Every user action is split into a `begin_*` transition, which validates
//! input, issues a sequencing ticket and applies any optimistic change, and
//! a `finish_*` transition that reconciles the server's answer. Both halves
//! are plain synchronous functions so they can be exercised without a
//! network.

use super::drafts::Drafts;
use super::policy::PolicyTable;
use super::sequence::{Sequencer, Stream, Ticket};
use crate::api::{
    Comment, CommentId, FollowOutcome, LikeOutcome, MediaAttachment, Post, PostId, Settings, User,
    UserId,
};
use crate::config::SyncConfig;
use crate::error::{Result, SyncError};
use crate::notice::Notice;
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum LoadStatus {
    #[default]
    Loading,
    Ready,
    /// Start-up failed; calling `initialize` again is the retry.
    Failed(String),
}

#[derive(Debug, Clone, Default)]
pub struct SessionSlice {
    pub user: Option<User>,
}

#[derive(Debug, Clone, Default)]
pub struct FeedSlice {
    pub posts: Vec<Post>,
}

#[derive(Debug, Clone, Default)]
pub struct ProfileSlice {
    pub user: Option<User>,
    pub posts: Vec<Post>,
}

#[derive(Debug, Clone, Default)]
pub struct DiscoverySlice {
    pub suggested: Vec<User>,
    pub query: String,
    pub results: Vec<User>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ComposeDraft {
    pub content: String,
    pub media: Option<MediaAttachment>,
}

impl ComposeDraft {
    pub fn is_blank(&self) -> bool {
        self.content.trim().is_empty() && self.media.is_none()
    }
}

#[derive(Debug, Clone, Default)]
pub struct DraftSlice {
    pub compose: ComposeDraft,
    pub quick_post: String,
    pub comments: Drafts<PostId>,
    pub replies: Drafts<CommentId>,
    pub settings: Settings,
}

/// A dispatched toggle: what it targets, what the flag was before, and
/// whether the flip was already applied locally.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ToggleTicket<K> {
    pub key: K,
    pub ticket: Ticket,
    pub prior: bool,
    pub optimistic: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchDispatch {
    /// Query too short; results were cleared locally.
    Cleared,
    Query(Ticket, String),
}

#[derive(Debug, Clone)]
pub struct Store {
    pub status: LoadStatus,
    pub session: SessionSlice,
    pub feed: FeedSlice,
    pub profile: ProfileSlice,
    pub discovery: DiscoverySlice,
    pub drafts: DraftSlice,
    notices: Vec<Notice>,
    sequencer: Sequencer,
    options: SyncConfig,
}

/// Flip `flag` to `value`, moving `count` by one in the same direction.
/// Returns whether anything changed.
fn set_counted_flag(flag: &mut bool, count: &mut u64, value: bool) -> bool {
    if *flag == value {
        return false;
    }
    *flag = value;
    if value {
        *count += 1;
    } else {
        *count = count.saturating_sub(1);
    }
    true
}

impl Store {
    pub fn new(options: SyncConfig) -> Self {
        Self {
            status: LoadStatus::Loading,
            session: SessionSlice::default(),
            feed: FeedSlice::default(),
            profile: ProfileSlice::default(),
            discovery: DiscoverySlice::default(),
            drafts: DraftSlice::default(),
            notices: Vec::new(),
            sequencer: Sequencer::new(options.discard_stale_responses),
            options,
        }
    }

    pub fn policies(&self) -> &PolicyTable {
        &self.options.policies
    }

    pub fn suggested_limit(&self) -> usize {
        self.options.suggested_limit
    }

    // --- notices -------------------------------------------------------

    pub fn notify(&mut self, notice: Notice) {
        self.notices.push(notice);
    }

    pub fn notices(&self) -> &[Notice] {
        &self.notices
    }

    pub fn drain_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }

    // --- session -------------------------------------------------------

    /// Install the session user and seed the profile target and settings
    /// form from it.
    pub fn set_session(&mut self, user: User) {
        self.drafts.settings = Settings::for_user(&user);
        self.profile.user = Some(user.clone());
        self.session.user = Some(user);
    }

    pub fn session_id(&self) -> Option<UserId> {
        self.session.user.as_ref().map(|u| u.id)
    }

    pub fn is_current_user_profile(&self) -> bool {
        match (&self.profile.user, &self.session.user) {
            (Some(profile), Some(session)) => profile.id == session.id,
            _ => false,
        }
    }

    /// Forget everything tied to the session. Configuration survives.
    pub fn clear_session(&mut self) {
        *self = Store::new(self.options.clone());
    }

    // --- reads ---------------------------------------------------------

    pub fn begin_feed(&mut self) -> Ticket {
        self.sequencer.issue(Stream::Feed)
    }

    /// Replace the feed wholesale. Comment drafts are reset to one empty
    /// entry per post.
    pub fn finish_feed(&mut self, ticket: &Ticket, posts: Vec<Post>) -> bool {
        if !self.sequencer.accepts(ticket) {
            return false;
        }
        self.feed.posts = posts
            .into_iter()
            .map(|mut post| {
                post.comments_open = false;
                post
            })
            .collect();
        self.drafts.comments = Drafts::default();
        for post in &self.feed.posts {
            self.drafts.comments.seed(post.id);
        }
        self.prune_reply_drafts();
        true
    }

    pub fn begin_suggestions(&mut self) -> Ticket {
        self.sequencer.issue(Stream::Suggestions)
    }

    pub fn finish_suggestions(&mut self, ticket: &Ticket, mut users: Vec<User>) -> bool {
        if !self.sequencer.accepts(ticket) {
            return false;
        }
        users.truncate(self.options.suggested_limit);
        self.discovery.suggested = users;
        true
    }

    pub fn begin_search(&mut self, query: &str) -> SearchDispatch {
        self.discovery.query = query.to_string();
        let ticket = self.sequencer.issue(Stream::Search);
        if query.chars().count() < self.options.search_min_chars {
            self.discovery.results.clear();
            return SearchDispatch::Cleared;
        }
        SearchDispatch::Query(ticket, query.to_string())
    }

    pub fn finish_search(&mut self, ticket: &Ticket, results: Vec<User>) -> bool {
        if !self.sequencer.accepts(ticket) {
            return false;
        }
        self.discovery.results = results;
        true
    }

    /// Point the profile view at `user`. Posts of a previously viewed
    /// profile are dropped.
    pub fn begin_view_profile(&mut self, user: User) -> Ticket {
        let changed = self.profile.user.as_ref().map(|u| u.id) != Some(user.id);
        if changed {
            self.profile.posts.clear();
        }
        self.profile.user = Some(user);
        self.sequencer.issue(Stream::ProfilePosts)
    }

    pub fn finish_profile_posts(&mut self, ticket: &Ticket, posts: Vec<Post>) -> bool {
        if !self.sequencer.accepts(ticket) {
            return false;
        }
        self.profile.posts = posts;
        self.prune_reply_drafts();
        true
    }

    // --- compose -------------------------------------------------------

    /// Snapshot of the compose draft, or `None` when there is nothing to send.
    pub fn begin_post(&self) -> Option<ComposeDraft> {
        if self.drafts.compose.is_blank() {
            return None;
        }
        Some(self.drafts.compose.clone())
    }

    pub fn finish_post(&mut self, post: Post) {
        self.prepend_post(post);
        self.drafts.compose = ComposeDraft::default();
    }

    pub fn begin_quick_post(&self) -> Option<String> {
        let content = self.drafts.quick_post.trim();
        (!content.is_empty()).then(|| content.to_string())
    }

    pub fn finish_quick_post(&mut self, post: Post) {
        self.prepend_post(post);
        self.drafts.quick_post.clear();
    }

    fn prepend_post(&mut self, mut post: Post) {
        post.comments_open = false;
        self.drafts.comments.seed(post.id);
        if self.profile.user.as_ref().map(|u| u.id) == Some(post.user.id) {
            self.profile.posts.insert(0, post.clone());
        }
        self.feed.posts.insert(0, post);
    }

    // --- likes ---------------------------------------------------------

    fn posts_mut(&mut self) -> impl Iterator<Item = &mut Post> + '_ {
        self.feed
            .posts
            .iter_mut()
            .chain(self.profile.posts.iter_mut())
    }

    fn find_post(&self, id: PostId) -> Option<&Post> {
        self.feed
            .posts
            .iter()
            .chain(self.profile.posts.iter())
            .find(|p| p.id == id)
    }

    pub fn post(&self, id: PostId) -> Option<&Post> {
        self.find_post(id)
    }

    pub fn begin_like(&mut self, id: PostId) -> Option<ToggleTicket<PostId>> {
        let prior = self.find_post(id)?.liked;
        let optimistic = self.options.policies.like.is_optimistic();
        if optimistic {
            self.set_post_liked(id, !prior, None);
        }
        Some(ToggleTicket {
            key: id,
            ticket: self.sequencer.issue(Stream::Like(id)),
            prior,
            optimistic,
        })
    }

    /// `outcome` is `None` when the request failed.
    pub fn finish_like(&mut self, t: &ToggleTicket<PostId>, outcome: Option<LikeOutcome>) {
        if !self.sequencer.accepts(&t.ticket) {
            return;
        }
        match outcome {
            Some(outcome) => self.set_post_liked(t.key, outcome.liked, outcome.likes_count),
            None if t.optimistic => self.set_post_liked(t.key, t.prior, None),
            None => {}
        }
    }

    fn set_post_liked(&mut self, id: PostId, liked: bool, likes_count: Option<u64>) {
        for post in self.posts_mut().filter(|p| p.id == id) {
            set_counted_flag(&mut post.liked, &mut post.likes_count, liked);
            if let Some(count) = likes_count {
                post.likes_count = count;
            }
        }
    }

    fn for_each_comment(&mut self, id: CommentId, mut f: impl FnMut(&mut Comment)) {
        for post in self.posts_mut() {
            if let Some(comment) = post.find_comment_mut(id) {
                f(comment);
            }
        }
    }

    pub fn comment(&self, id: CommentId) -> Option<&Comment> {
        fn find(list: &[Comment], id: CommentId) -> Option<&Comment> {
            list.iter()
                .find_map(|c| if c.id == id { Some(c) } else { find(&c.replies, id) })
        }
        self.feed
            .posts
            .iter()
            .chain(self.profile.posts.iter())
            .filter_map(|p| p.comments.as_deref())
            .find_map(|list| find(list, id))
    }

    pub fn begin_comment_like(&mut self, id: CommentId) -> Option<ToggleTicket<CommentId>> {
        let prior = self.comment(id)?.liked;
        let optimistic = self.options.policies.comment_like.is_optimistic();
        if optimistic {
            self.set_comment_liked(id, !prior, None);
        }
        Some(ToggleTicket {
            key: id,
            ticket: self.sequencer.issue(Stream::CommentLike(id)),
            prior,
            optimistic,
        })
    }

    pub fn finish_comment_like(
        &mut self,
        t: &ToggleTicket<CommentId>,
        outcome: Option<LikeOutcome>,
    ) {
        if !self.sequencer.accepts(&t.ticket) {
            return;
        }
        match outcome {
            Some(outcome) => self.set_comment_liked(t.key, outcome.liked, outcome.likes_count),
            None if t.optimistic => self.set_comment_liked(t.key, t.prior, None),
            None => {}
        }
    }

    fn set_comment_liked(&mut self, id: CommentId, liked: bool, likes_count: Option<u64>) {
        self.for_each_comment(id, |c| {
            set_counted_flag(&mut c.liked, &mut c.likes_count, liked);
            if let Some(count) = likes_count {
                c.likes_count = count;
            }
        });
    }

    // --- comments ------------------------------------------------------

    /// Flip the comments panel. Returns true when the panel is now open and
    /// its comments still have to be fetched.
    pub fn toggle_comments_panel(&mut self, id: PostId) -> bool {
        let mut needs_load = false;
        let mut opened = None;
        for post in self.posts_mut().filter(|p| p.id == id) {
            let open = *opened.get_or_insert(!post.comments_open);
            post.comments_open = open;
            needs_load |= open && post.comments.is_none();
        }
        needs_load
    }

    pub fn begin_comments(&mut self, id: PostId) -> Ticket {
        self.sequencer.issue(Stream::Comments(id))
    }

    pub fn finish_comments(&mut self, ticket: &Ticket, id: PostId, mut comments: Vec<Comment>) -> bool {
        if !self.sequencer.accepts(ticket) {
            return false;
        }
        for comment in comments.iter_mut() {
            comment.for_each_mut(&mut |c| {
                c.reply_open = false;
                self.drafts.replies.seed(c.id);
            });
        }
        for post in self.posts_mut().filter(|p| p.id == id) {
            post.comments = Some(comments.clone());
        }
        true
    }

    /// Drop cached comments so the next panel open fetches them again.
    pub fn clear_comments(&mut self, id: PostId) {
        for post in self.posts_mut().filter(|p| p.id == id) {
            post.comments = None;
        }
        self.prune_reply_drafts();
    }

    pub fn begin_comment(&self, id: PostId) -> Option<String> {
        self.find_post(id)?;
        self.drafts.comments.trimmed(id)
    }

    pub fn finish_comment(&mut self, id: PostId, comment: Comment) {
        self.drafts.replies.seed(comment.id);
        for post in self.posts_mut().filter(|p| p.id == id) {
            post.comments
                .get_or_insert_with(Vec::new)
                .push(comment.clone());
            post.comments_count += 1;
        }
        self.drafts.comments.clear(id);
    }

    /// Flip a comment's reply panel and reset its draft.
    pub fn toggle_reply_panel(&mut self, id: CommentId) {
        let mut opened = None;
        self.for_each_comment(id, |c| {
            let open = *opened.get_or_insert(!c.reply_open);
            c.reply_open = open;
        });
        self.drafts.replies.seed(id);
    }

    pub fn begin_reply(&self, id: CommentId) -> Option<String> {
        self.comment(id)?;
        self.drafts.replies.trimmed(id)
    }

    /// Append a reply. The owning post's comment count is left alone.
    pub fn finish_reply(&mut self, id: CommentId, reply: Comment) {
        self.for_each_comment(id, |c| {
            c.replies.push(reply.clone());
            c.reply_open = false;
        });
        self.drafts.replies.clear(id);
    }

    fn prune_reply_drafts(&mut self) {
        let mut live = Vec::new();
        for post in self.feed.posts.iter_mut().chain(self.profile.posts.iter_mut()) {
            if let Some(comments) = post.comments.as_mut() {
                for comment in comments.iter_mut() {
                    comment.for_each_mut(&mut |c| live.push(c.id));
                }
            }
        }
        self.drafts.replies.retain(|id| live.contains(id));
    }

    // --- follows -------------------------------------------------------

    fn user_mirrors_mut(&mut self, id: UserId) -> impl Iterator<Item = &mut User> + '_ {
        self.profile
            .user
            .iter_mut()
            .chain(self.discovery.suggested.iter_mut())
            .chain(self.discovery.results.iter_mut())
            .chain(self.feed.posts.iter_mut().map(|p| &mut p.user))
            .chain(self.profile.posts.iter_mut().map(|p| &mut p.user))
            .filter(move |u| u.id == id)
    }

    fn known_following(&self, id: UserId) -> Option<bool> {
        self.profile
            .user
            .iter()
            .chain(self.discovery.suggested.iter())
            .chain(self.discovery.results.iter())
            .chain(self.feed.posts.iter().map(|p| &p.user))
            .chain(self.profile.posts.iter().map(|p| &p.user))
            .find(|u| u.id == id)
            .map(|u| u.is_following)
    }

    /// Start a follow toggle on `target`. Following yourself is refused
    /// locally.
    pub fn begin_follow(&mut self, target: &User) -> Option<ToggleTicket<UserId>> {
        if self.session_id() == Some(target.id) {
            return None;
        }
        let prior = self
            .known_following(target.id)
            .unwrap_or(target.is_following);
        let optimistic = self.options.policies.follow.is_optimistic();
        if optimistic {
            self.transition_follow(target.id, prior, !prior, None, None);
        }
        Some(ToggleTicket {
            key: target.id,
            ticket: self.sequencer.issue(Stream::Follow(target.id)),
            prior,
            optimistic,
        })
    }

    /// Reconcile with the server's label, starting from whatever the local
    /// flag is now. Counts only move when the label differs from it, so
    /// responses applied out of order keep both sides paired.
    pub fn finish_follow(&mut self, t: &ToggleTicket<UserId>, outcome: Option<FollowOutcome>) {
        if !self.sequencer.accepts(&t.ticket) {
            return;
        }
        let current = self
            .known_following(t.key)
            .unwrap_or(if t.optimistic { !t.prior } else { t.prior });
        match outcome {
            Some(outcome) => self.transition_follow(
                t.key,
                current,
                outcome.following,
                outcome.followers_count,
                outcome.following_count,
            ),
            None if t.optimistic => self.transition_follow(t.key, current, t.prior, None, None),
            None => {}
        }
    }

    fn transition_follow(
        &mut self,
        id: UserId,
        from: bool,
        to: bool,
        followers_count: Option<u64>,
        following_count: Option<u64>,
    ) {
        for user in self.user_mirrors_mut(id) {
            set_counted_flag(&mut user.is_following, &mut user.followers_count, to);
            if let Some(count) = followers_count {
                user.followers_count = count;
            }
        }

        let Some(session_id) = self.session_id() else {
            return;
        };
        let adjust = |user: &mut User| {
            if from != to {
                if to {
                    user.following_count += 1;
                } else {
                    user.following_count = user.following_count.saturating_sub(1);
                }
            }
            if let Some(count) = following_count {
                user.following_count = count;
            }
        };
        if let Some(session) = self.session.user.as_mut() {
            adjust(session);
        }
        if let Some(profile) = self.profile.user.as_mut().filter(|u| u.id == session_id) {
            adjust(profile);
        }
    }

    // --- settings ------------------------------------------------------

    pub fn begin_save_settings(&self) -> Result<(UserId, Settings)> {
        let id = self.session_id().ok_or(SyncError::NoSession)?;
        Ok((id, self.drafts.settings.clone()))
    }

    /// Merge the server's returned fields into the session user; returned
    /// fields win over local ones. Nulls are ignored.
    pub fn finish_save_settings(&mut self, fields: Value) -> Result<()> {
        let user = self.session.user.as_ref().ok_or(SyncError::NoSession)?;
        let mut merged = serde_json::to_value(user)?;
        if let (Some(target), Value::Object(patch)) = (merged.as_object_mut(), fields) {
            for (key, value) in patch {
                if !value.is_null() {
                    target.insert(key, value);
                }
            }
        }
        let merged: User = serde_json::from_value(merged)?;

        if let Some(profile) = self.profile.user.as_mut().filter(|u| u.id == merged.id) {
            *profile = merged.clone();
        }
        self.session.user = Some(merged);
        Ok(())
    }
}
