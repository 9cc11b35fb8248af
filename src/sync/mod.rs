//! View-state synchronizer.
//!
//! Owns the [`Store`] and drives every user action against a [`SocialApi`].
//! The store lock is never held across a network await, so several
//! operations may be in flight at once; [`Sequencer`](sequence::Sequencer)
//! tickets decide which of their responses still apply.
//!
//! Failure handling per call site:
//! - content mutations (post, comment, reply, settings) raise an error
//!   notice and keep the draft;
//! - reads (feed, suggestions, search, comments, profile posts) log at
//!   debug and keep prior state;
//! - toggles (like, follow) log and follow their [`policy::PolicyTable`]
//!   entry.

pub mod drafts;
pub mod policy;
pub mod sequence;
pub mod store;

use crate::api::{CommentId, MediaAttachment, PostId, SocialApi, User};
use crate::config::SyncConfig;
use crate::error::{Result, SyncError};
use crate::navigation::Navigator;
use crate::notice::Notice;
use std::sync::Arc;
use tokio::sync::{Mutex, MutexGuard};

pub use store::{ComposeDraft, LoadStatus, SearchDispatch, Store};

pub struct Synchronizer {
    api: Arc<dyn SocialApi>,
    navigator: Arc<dyn Navigator>,
    store: Mutex<Store>,
}

impl Synchronizer {
    pub fn new(api: Arc<dyn SocialApi>, navigator: Arc<dyn Navigator>, options: SyncConfig) -> Self {
        Self {
            api,
            navigator,
            store: Mutex::new(Store::new(options)),
        }
    }

    /// Direct access to the store, for reading view state or editing drafts.
    pub async fn store(&self) -> MutexGuard<'_, Store> {
        self.store.lock().await
    }

    pub async fn snapshot(&self) -> Store {
        self.store.lock().await.clone()
    }

    pub async fn drain_notices(&self) -> Vec<Notice> {
        self.store.lock().await.drain_notices()
    }

    // --- start-up ------------------------------------------------------

    /// Load the session user, then the feed and suggestions. An
    /// unauthenticated answer sends the user to the login page; any session
    /// failure marks start-up as failed so it can be retried.
    pub async fn initialize(&self) -> Result<()> {
        self.store.lock().await.status = LoadStatus::Loading;

        if let Err(err) = self.load_session().await {
            tracing::error!(error = %err, "Failed to initialize");
            self.store.lock().await.status = LoadStatus::Failed(err.to_string());
            if err.is_unauthenticated() {
                self.navigator.redirect_to_login();
            }
            return Err(err);
        }

        futures::join!(self.load_feed(), self.load_suggestions());
        self.store.lock().await.status = LoadStatus::Ready;
        Ok(())
    }

    pub async fn load_session(&self) -> Result<()> {
        let user = self.api.current_user().await?;
        tracing::debug!(user_id = %user.id, username = %user.username, "Session user loaded");
        self.store.lock().await.set_session(user);
        Ok(())
    }

    // --- reads ---------------------------------------------------------

    pub async fn load_feed(&self) {
        let ticket = self.store.lock().await.begin_feed();
        match self.api.list_posts().await {
            Ok(posts) => {
                let count = posts.len();
                if self.store.lock().await.finish_feed(&ticket, posts) {
                    tracing::debug!(count, "Feed replaced");
                }
            }
            Err(err) => tracing::debug!(error = %err, "Failed to fetch posts"),
        }
    }

    pub async fn load_suggestions(&self) {
        let (ticket, limit) = {
            let mut store = self.store.lock().await;
            (store.begin_suggestions(), store.suggested_limit())
        };
        match self.api.list_users(limit).await {
            Ok(users) => {
                self.store.lock().await.finish_suggestions(&ticket, users);
            }
            Err(err) => tracing::debug!(error = %err, "Failed to fetch suggested users"),
        }
    }

    /// Run a user search. Queries below the minimum length clear the results
    /// without a request.
    pub async fn search(&self, query: &str) {
        let dispatch = self.store.lock().await.begin_search(query);
        let SearchDispatch::Query(ticket, query) = dispatch else {
            return;
        };
        match self.api.search_users(query.clone()).await {
            Ok(users) => {
                if !self.store.lock().await.finish_search(&ticket, users) {
                    tracing::debug!(query = %query, "Discarded superseded search results");
                }
            }
            Err(err) => tracing::debug!(error = %err, query = %query, "Search failed"),
        }
    }

    pub async fn view_profile(&self, user: User) {
        let id = user.id;
        let ticket = self.store.lock().await.begin_view_profile(user);
        match self.api.user_posts(id).await {
            Ok(posts) => {
                self.store.lock().await.finish_profile_posts(&ticket, posts);
            }
            Err(err) => tracing::debug!(error = %err, user_id = %id, "Failed to fetch user posts"),
        }
    }

    /// Open or close a post's comments; the first open fetches them.
    pub async fn toggle_comments(&self, post: PostId) {
        let needs_load = self.store.lock().await.toggle_comments_panel(post);
        if needs_load {
            self.load_comments(post).await;
        }
    }

    pub async fn load_comments(&self, post: PostId) {
        let ticket = self.store.lock().await.begin_comments(post);
        match self.api.list_comments(post).await {
            Ok(comments) => {
                self.store.lock().await.finish_comments(&ticket, post, comments);
            }
            Err(err) => tracing::debug!(error = %err, post_id = %post, "Failed to fetch comments"),
        }
    }

    // --- content mutations ---------------------------------------------

    pub async fn set_compose(&self, content: impl Into<String>, media: Option<MediaAttachment>) {
        let mut store = self.store.lock().await;
        store.drafts.compose = ComposeDraft {
            content: content.into(),
            media,
        };
    }

    /// Publish the compose draft. Returns whether a post was created.
    pub async fn submit_post(&self) -> bool {
        let Some(draft) = self.store.lock().await.begin_post() else {
            return false;
        };

        let result = match draft.media.map(MediaAttachment::into_upload).transpose() {
            Ok(upload) => self.api.create_post(draft.content, upload).await,
            Err(err) => Err(err),
        };

        let mut store = self.store.lock().await;
        match result {
            Ok(post) => {
                tracing::info!(post_id = %post.id, "Post created");
                store.finish_post(post);
                true
            }
            Err(err) => {
                tracing::warn!(error = %err, "Failed to create post");
                store.notify(Notice::error(format!("Could not publish your post: {}", err)));
                false
            }
        }
    }

    pub async fn submit_quick_post(&self) -> bool {
        let Some(content) = self.store.lock().await.begin_quick_post() else {
            return false;
        };
        let result = self.api.create_text_post(content).await;

        let mut store = self.store.lock().await;
        match result {
            Ok(post) => {
                tracing::info!(post_id = %post.id, "Quick post created");
                store.finish_quick_post(post);
                true
            }
            Err(err) => {
                tracing::warn!(error = %err, "Failed to create quick post");
                store.notify(Notice::error(format!("Could not publish your post: {}", err)));
                false
            }
        }
    }

    pub async fn submit_comment(&self, post: PostId) -> bool {
        let Some(content) = self.store.lock().await.begin_comment(post) else {
            return false;
        };
        let result = self.api.add_comment(post, content).await;

        let mut store = self.store.lock().await;
        match result {
            Ok(comment) => {
                store.finish_comment(post, comment);
                true
            }
            Err(err) => {
                tracing::warn!(error = %err, post_id = %post, "Failed to add comment");
                store.notify(Notice::error(format!("Could not add your comment: {}", err)));
                false
            }
        }
    }

    pub async fn toggle_reply(&self, comment: CommentId) {
        self.store.lock().await.toggle_reply_panel(comment);
    }

    pub async fn submit_reply(&self, comment: CommentId) -> bool {
        let Some(content) = self.store.lock().await.begin_reply(comment) else {
            return false;
        };
        let result = self.api.add_reply(comment, content).await;

        let mut store = self.store.lock().await;
        match result {
            Ok(reply) => {
                store.finish_reply(comment, reply);
                true
            }
            Err(err) => {
                tracing::warn!(error = %err, comment_id = %comment, "Failed to add reply");
                store.notify(Notice::error(format!("Could not add your reply: {}", err)));
                false
            }
        }
    }

    pub async fn save_settings(&self) -> bool {
        let (id, settings) = match self.store.lock().await.begin_save_settings() {
            Ok(pending) => pending,
            Err(err) => {
                tracing::warn!(error = %err, "Cannot save settings");
                return false;
            }
        };
        let result = self.api.save_settings(id, settings).await;

        let mut store = self.store.lock().await;
        match result.and_then(|fields| store.finish_save_settings(fields)) {
            Ok(()) => {
                store.notify(Notice::info("Settings saved"));
                true
            }
            Err(err) => {
                tracing::warn!(error = %err, "Failed to save settings");
                store.notify(Notice::error(format!("Could not save settings: {}", err)));
                false
            }
        }
    }

    // --- toggles -------------------------------------------------------

    pub async fn toggle_like(&self, post: PostId) {
        let Some(ticket) = self.store.lock().await.begin_like(post) else {
            tracing::debug!(post_id = %post, "Like on unknown post ignored");
            return;
        };
        let outcome = self
            .api
            .toggle_like(post)
            .await
            .map_err(|err| tracing::warn!(error = %err, post_id = %post, "Failed to toggle like"))
            .ok();
        self.store.lock().await.finish_like(&ticket, outcome);
    }

    pub async fn toggle_comment_like(&self, comment: CommentId) {
        let Some(ticket) = self.store.lock().await.begin_comment_like(comment) else {
            tracing::debug!(comment_id = %comment, "Like on unknown comment ignored");
            return;
        };
        let outcome = self
            .api
            .toggle_comment_like(comment)
            .await
            .map_err(|err| {
                tracing::warn!(error = %err, comment_id = %comment, "Failed to toggle comment like")
            })
            .ok();
        self.store.lock().await.finish_comment_like(&ticket, outcome);
    }

    pub async fn toggle_follow(&self, target: &User) {
        let Some(ticket) = self.store.lock().await.begin_follow(target) else {
            tracing::debug!(user_id = %target.id, "Follow toggle on self ignored");
            return;
        };
        let outcome = self
            .api
            .toggle_follow(target.id)
            .await
            .map_err(|err| {
                tracing::warn!(error = %err, user_id = %target.id, "Failed to toggle follow")
            })
            .ok();
        self.store.lock().await.finish_follow(&ticket, outcome);
    }

    // --- session end ---------------------------------------------------

    /// End the session server-side if possible; always leave locally.
    pub async fn logout(&self) {
        if let Err(err) = self.api.logout().await {
            tracing::warn!(error = %err, "Logout request failed");
        }
        self.store.lock().await.clear_session();
        self.navigator.redirect_to_login();
    }

    pub async fn require_session(&self) -> Result<User> {
        self.store
            .lock()
            .await
            .session
            .user
            .clone()
            .ok_or(SyncError::NoSession)
    }
}
