pub mod http;
pub mod media;

use crate::error::{Result, SyncError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

pub use media::{MediaAttachment, MediaKind, MediaSource, Upload};

macro_rules! id_type {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub u64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

id_type!(UserId);
id_type!(PostId);
id_type!(CommentId);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub bio: String,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub profile_image: Option<String>,
    #[serde(default)]
    pub cover_image: Option<String>,
    #[serde(default)]
    pub followers_count: u64,
    #[serde(default)]
    pub following_count: u64,
    #[serde(default)]
    pub is_private: bool,
    #[serde(default)]
    pub is_following: bool,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PostType {
    #[default]
    Text,
    Image,
    Video,
}

impl PostType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PostType::Text => "text",
            PostType::Image => "image",
            PostType::Video => "video",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    pub id: PostId,
    pub user: User,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub post_type: PostType,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub video: Option<String>,
    #[serde(default)]
    pub likes_count: u64,
    #[serde(default)]
    pub liked: bool,
    #[serde(default)]
    pub comments_count: u64,
    #[serde(default)]
    pub shares_count: u64,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    /// `None` until the comments panel has been loaded once.
    #[serde(skip)]
    pub comments: Option<Vec<Comment>>,
    #[serde(skip)]
    pub comments_open: bool,
}

/// Media reference carried by a post.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaRef<'a> {
    Image(&'a str),
    Video(&'a str),
}

impl Post {
    /// Image wins over video; a text-only post has neither.
    pub fn media(&self) -> Option<MediaRef<'_>> {
        match (self.image.as_deref(), self.video.as_deref()) {
            (Some(url), _) if !url.is_empty() => Some(MediaRef::Image(url)),
            (_, Some(url)) if !url.is_empty() => Some(MediaRef::Video(url)),
            _ => None,
        }
    }

    /// Depth-first search through loaded comments and their replies.
    pub fn find_comment_mut(&mut self, id: CommentId) -> Option<&mut Comment> {
        self.comments
            .as_mut()?
            .iter_mut()
            .find_map(|c| c.find_mut(id))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    pub id: CommentId,
    #[serde(default)]
    pub post: Option<PostId>,
    pub user: User,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub parent: Option<CommentId>,
    #[serde(default)]
    pub likes_count: u64,
    #[serde(default)]
    pub liked: bool,
    #[serde(default)]
    pub replies: Vec<Comment>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(skip)]
    pub reply_open: bool,
}

impl Comment {
    pub fn reply_count(&self) -> usize {
        self.replies.len()
    }

    pub fn find_mut(&mut self, id: CommentId) -> Option<&mut Comment> {
        if self.id == id {
            return Some(self);
        }
        self.replies.iter_mut().find_map(|r| r.find_mut(id))
    }

    pub(crate) fn for_each_mut(&mut self, f: &mut dyn FnMut(&mut Comment)) {
        f(self);
        for reply in &mut self.replies {
            reply.for_each_mut(f);
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

/// Account settings record sent as a full replacement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    pub username: String,
    pub email: String,
    pub bio: String,
    pub private_account: bool,
    pub show_activity_status: bool,
    pub email_notifications: bool,
    pub push_notifications: bool,
    pub language: String,
    pub theme: Theme,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            username: String::new(),
            email: String::new(),
            bio: String::new(),
            private_account: false,
            show_activity_status: true,
            email_notifications: true,
            push_notifications: true,
            language: "ar".to_string(),
            theme: Theme::Light,
        }
    }
}

impl Settings {
    /// Settings form pre-filled from the user's identity fields.
    pub fn for_user(user: &User) -> Self {
        Self {
            username: user.username.clone(),
            email: user.email.clone(),
            bio: user.bio.clone(),
            private_account: user.is_private,
            ..Self::default()
        }
    }
}

/// Server-confirmed outcome of a like toggle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LikeOutcome {
    pub liked: bool,
    pub likes_count: Option<u64>,
}

/// Server-confirmed outcome of a follow toggle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FollowOutcome {
    pub following: bool,
    pub followers_count: Option<u64>,
    pub following_count: Option<u64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "lowercase")]
enum LikeStatus {
    Liked,
    Unliked,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "lowercase")]
enum FollowStatus {
    Followed,
    Unfollowed,
}

/// Like responses come either as `{status}` or as `{liked, likes_count}`.
#[derive(Debug, Deserialize)]
pub(crate) struct LikeResponse {
    status: Option<LikeStatus>,
    liked: Option<bool>,
    likes_count: Option<u64>,
}

impl TryFrom<LikeResponse> for LikeOutcome {
    type Error = SyncError;

    fn try_from(resp: LikeResponse) -> Result<Self> {
        let liked = match (resp.status, resp.liked) {
            (Some(LikeStatus::Liked), _) => true,
            (Some(LikeStatus::Unliked), _) => false,
            (None, Some(liked)) => liked,
            (None, None) => {
                return Err(SyncError::Decode(serde::de::Error::custom(
                    "like response carries neither `status` nor `liked`",
                )))
            }
        };
        Ok(LikeOutcome {
            liked,
            likes_count: resp.likes_count,
        })
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct FollowResponse {
    status: Option<FollowStatus>,
    followed: Option<bool>,
    followers_count: Option<u64>,
    following_count: Option<u64>,
}

impl TryFrom<FollowResponse> for FollowOutcome {
    type Error = SyncError;

    fn try_from(resp: FollowResponse) -> Result<Self> {
        let following = match (resp.status, resp.followed) {
            (Some(FollowStatus::Followed), _) => true,
            (Some(FollowStatus::Unfollowed), _) => false,
            (None, Some(followed)) => followed,
            (None, None) => {
                return Err(SyncError::Decode(serde::de::Error::custom(
                    "follow response carries neither `status` nor `followed`",
                )))
            }
        };
        Ok(FollowOutcome {
            following,
            followers_count: resp.followers_count,
            following_count: resp.following_count,
        })
    }
}

/// List endpoints answer either a bare array or a paginated `{results: [...]}`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum Listing<T> {
    Plain(Vec<T>),
    Page { results: Vec<T> },
}

impl<T> Listing<T> {
    pub(crate) fn into_vec(self) -> Vec<T> {
        match self {
            Listing::Plain(items) | Listing::Page { results: items } => items,
        }
    }
}

/// The REST boundary of the synchronizer, one method per route.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SocialApi: Send + Sync {
    async fn current_user(&self) -> Result<User>;
    async fn list_posts(&self) -> Result<Vec<Post>>;
    async fn list_users(&self, limit: usize) -> Result<Vec<User>>;
    async fn create_post(&self, content: String, upload: Option<Upload>) -> Result<Post>;
    async fn create_text_post(&self, content: String) -> Result<Post>;
    async fn toggle_like(&self, post: PostId) -> Result<LikeOutcome>;
    async fn toggle_comment_like(&self, comment: CommentId) -> Result<LikeOutcome>;
    async fn list_comments(&self, post: PostId) -> Result<Vec<Comment>>;
    async fn add_comment(&self, post: PostId, content: String) -> Result<Comment>;
    async fn add_reply(&self, parent: CommentId, content: String) -> Result<Comment>;
    async fn search_users(&self, query: String) -> Result<Vec<User>>;
    async fn toggle_follow(&self, user: UserId) -> Result<FollowOutcome>;
    async fn user_posts(&self, user: UserId) -> Result<Vec<Post>>;
    async fn save_settings(&self, user: UserId, settings: Settings) -> Result<serde_json::Value>;
    async fn logout(&self) -> Result<()>;
}


#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_listing_accepts_plain_array() {
        let listing: Listing<u64> = serde_json::from_value(json!([1, 2, 3])).unwrap();
        assert_eq!(listing.into_vec(), vec![1, 2, 3]);
    }

    #[test]
    fn test_listing_accepts_paginated_object() {
        let listing: Listing<u64> =
            serde_json::from_value(json!({"count": 2, "next": null, "results": [4, 5]})).unwrap();
        assert_eq!(listing.into_vec(), vec![4, 5]);
    }

    #[test]
    fn test_like_outcome_from_status_label() {
        let resp: LikeResponse = serde_json::from_value(json!({"status": "unliked"})).unwrap();
        let outcome = LikeOutcome::try_from(resp).unwrap();
        assert!(!outcome.liked);
        assert_eq!(outcome.likes_count, None);
    }

    #[test]
    fn test_like_outcome_from_boolean_shape() {
        let resp: LikeResponse =
            serde_json::from_value(json!({"liked": true, "likes_count": 9})).unwrap();
        let outcome = LikeOutcome::try_from(resp).unwrap();
        assert!(outcome.liked);
        assert_eq!(outcome.likes_count, Some(9));
    }

    #[test]
    fn test_like_outcome_rejects_empty_body() {
        let resp: LikeResponse = serde_json::from_value(json!({})).unwrap();
        assert!(matches!(
            LikeOutcome::try_from(resp),
            Err(SyncError::Decode(_))
        ));
    }

    #[test]
    fn test_follow_outcome_from_either_shape() {
        let labelled: FollowResponse =
            serde_json::from_value(json!({"status": "followed"})).unwrap();
        assert!(FollowOutcome::try_from(labelled).unwrap().following);

        let counted: FollowResponse = serde_json::from_value(
            json!({"followed": false, "followers_count": 3, "following_count": 7}),
        )
        .unwrap();
        let outcome = FollowOutcome::try_from(counted).unwrap();
        assert!(!outcome.following);
        assert_eq!(outcome.followers_count, Some(3));
        assert_eq!(outcome.following_count, Some(7));
    }

    #[test]
    fn test_post_deserializes_with_server_fields() {
        let post: Post = serde_json::from_value(json!({
            "id": 10,
            "user": {"id": 1, "username": "amal"},
            "content": "hello",
            "post_type": "image",
            "image": "/media/a.jpg",
            "video": null,
            "likes_count": 3,
            "comments_count": 1,
            "shares_count": 0,
            "created_at": "2026-01-02T03:04:05Z",
            "liked": false,
            "is_edited": false
        }))
        .unwrap();
        assert_eq!(post.id, PostId(10));
        assert_eq!(post.media(), Some(MediaRef::Image("/media/a.jpg")));
        assert!(post.comments.is_none());
        assert!(!post.comments_open);
    }

    #[test]
    fn test_find_comment_searches_replies() {
        let author = fixtures::user(1, "amal");
        let mut top = fixtures::comment(1, 10, author.clone(), "top");
        top.replies.push(fixtures::comment(2, 10, author.clone(), "nested"));
        let mut post = fixtures::post(10, author, "p");
        post.comments = Some(vec![top]);

        let found = post.find_comment_mut(CommentId(2)).unwrap();
        assert_eq!(found.content, "nested");
        assert!(post.find_comment_mut(CommentId(3)).is_none());
    }

    #[test]
    fn test_settings_for_user_prefills_identity() {
        let mut user = fixtures::user(4, "noor");
        user.bio = "bio".to_string();
        user.is_private = true;
        let settings = Settings::for_user(&user);
        assert_eq!(settings.username, "noor");
        assert_eq!(settings.bio, "bio");
        assert!(settings.private_account);
        assert_eq!(settings.theme, Theme::Light);
        assert_eq!(settings.language, "ar");
    }
}
