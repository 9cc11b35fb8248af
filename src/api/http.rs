use super::{
    Comment, CommentId, FollowOutcome, FollowResponse, LikeOutcome, LikeResponse, Listing, Post,
    PostId, PostType, Settings, SocialApi, Upload, User, UserId,
};
use crate::config::ApiConfig;
use crate::error::{Result, SyncError};
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;

/// `SocialApi` over HTTP. Session transport (cookie, CSRF header) is
/// attached to every request when configured.
pub struct HttpApi {
    base_url: String,
    session_cookie: Option<String>,
    csrf_token: Option<String>,
    client: reqwest::Client,
}

#[derive(Serialize)]
struct ContentBody<'a> {
    content: &'a str,
}

#[derive(Serialize)]
struct ReplyBody<'a> {
    content: &'a str,
    parent: CommentId,
}

#[derive(Serialize)]
struct TextPostBody<'a> {
    content: &'a str,
    post_type: PostType,
}

impl HttpApi {
    pub fn new(config: &ApiConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(concat!("socialsync/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            session_cookie: config.session_cookie.clone(),
            csrf_token: config.csrf_token.clone(),
            client,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let mut builder = self
            .client
            .request(method, self.url(path))
            .header("Accept", "application/json");
        if let Some(cookie) = &self.session_cookie {
            builder = builder.header("Cookie", cookie);
        }
        if let Some(token) = &self.csrf_token {
            builder = builder.header("X-CSRFToken", token);
        }
        builder
    }

    async fn send(&self, builder: RequestBuilder) -> Result<Response> {
        let response = builder.send().await?;
        check_status(response).await
    }

    async fn send_json<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T> {
        let response = self.send(builder).await?;
        let body = response.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        self.send_json(self.request(Method::GET, path)).await
    }
}

async fn check_status(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    if status == StatusCode::UNAUTHORIZED {
        return Err(SyncError::Unauthorized);
    }
    if status.is_client_error() {
        let message = response.text().await.unwrap_or_default();
        return Err(SyncError::Rejected {
            status: status.as_u16(),
            message,
        });
    }
    Err(SyncError::Server {
        status: status.as_u16(),
    })
}

#[async_trait]
impl SocialApi for HttpApi {
    async fn current_user(&self) -> Result<User> {
        self.get("/api/users/me/").await
    }

    async fn list_posts(&self) -> Result<Vec<Post>> {
        let listing: Listing<Post> = self.get("/api/posts/").await?;
        Ok(listing.into_vec())
    }

    async fn list_users(&self, limit: usize) -> Result<Vec<User>> {
        let listing: Listing<User> = self.get(&format!("/api/users/?limit={}", limit)).await?;
        Ok(listing.into_vec().into_iter().take(limit).collect())
    }

    async fn create_post(&self, content: String, upload: Option<Upload>) -> Result<Post> {
        let post_type = upload
            .as_ref()
            .map(|u| u.kind.post_type())
            .unwrap_or(PostType::Text);

        let mut form = Form::new()
            .text("content", content)
            .text("post_type", post_type.as_str());

        if let Some(upload) = upload {
            let part = Part::bytes(upload.bytes)
                .file_name(upload.file_name)
                .mime_str(&upload.mime)?;
            form = form.part(upload.kind.field_name(), part);
        }

        self.send_json(self.request(Method::POST, "/api/posts/").multipart(form))
            .await
    }

    async fn create_text_post(&self, content: String) -> Result<Post> {
        let body = TextPostBody {
            content: &content,
            post_type: PostType::Text,
        };
        self.send_json(self.request(Method::POST, "/api/posts/").json(&body))
            .await
    }

    async fn toggle_like(&self, post: PostId) -> Result<LikeOutcome> {
        let path = format!("/api/posts/{}/like/", post);
        let resp: LikeResponse = self.send_json(self.request(Method::POST, &path)).await?;
        resp.try_into()
    }

    async fn toggle_comment_like(&self, comment: CommentId) -> Result<LikeOutcome> {
        let path = format!("/api/comments/{}/like/", comment);
        let resp: LikeResponse = self.send_json(self.request(Method::POST, &path)).await?;
        resp.try_into()
    }

    async fn list_comments(&self, post: PostId) -> Result<Vec<Comment>> {
        let listing: Listing<Comment> = self.get(&format!("/api/posts/{}/comments/", post)).await?;
        Ok(listing.into_vec())
    }

    async fn add_comment(&self, post: PostId, content: String) -> Result<Comment> {
        let path = format!("/api/posts/{}/comment/", post);
        let body = ContentBody { content: &content };
        self.send_json(self.request(Method::POST, &path).json(&body))
            .await
    }

    async fn add_reply(&self, parent: CommentId, content: String) -> Result<Comment> {
        let path = format!("/api/comments/{}/reply/", parent);
        let body = ReplyBody {
            content: &content,
            parent,
        };
        self.send_json(self.request(Method::POST, &path).json(&body))
            .await
    }

    async fn search_users(&self, query: String) -> Result<Vec<User>> {
        let path = format!("/api/users/search/?q={}", urlencoding::encode(&query));
        let listing: Listing<User> = self.get(&path).await?;
        Ok(listing.into_vec())
    }

    async fn toggle_follow(&self, user: UserId) -> Result<FollowOutcome> {
        let path = format!("/api/users/{}/follow/", user);
        let resp: FollowResponse = self.send_json(self.request(Method::POST, &path)).await?;
        resp.try_into()
    }

    async fn user_posts(&self, user: UserId) -> Result<Vec<Post>> {
        let listing: Listing<Post> = self.get(&format!("/api/users/{}/posts/", user)).await?;
        Ok(listing.into_vec())
    }

    async fn save_settings(&self, user: UserId, settings: Settings) -> Result<serde_json::Value> {
        let path = format!("/api/users/{}/settings/", user);
        self.send_json(self.request(Method::PUT, &path).json(&settings))
            .await
    }

    async fn logout(&self) -> Result<()> {
        self.send(self.request(Method::POST, "/api/logout/"))
            .await
            .map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    fn config(base_url: &str) -> ApiConfig {
        ApiConfig {
            base_url: base_url.to_string(),
            ..ApiConfig::default()
        }
    }

    #[test]
    fn test_new_trims_trailing_slash() {
        let api = HttpApi::new(&config("http://localhost:8000/")).unwrap();
        assert_eq!(api.url("/api/posts/"), "http://localhost:8000/api/posts/");
    }

    #[test]
    fn test_reply_body_shape() {
        let body = ReplyBody {
            content: "thanks",
            parent: CommentId(7),
        };
        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            serde_json::json!({"content": "thanks", "parent": 7})
        );
    }

    #[test]
    fn test_text_post_body_shape() {
        let body = TextPostBody {
            content: "hi",
            post_type: PostType::Text,
        };
        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            serde_json::json!({"content": "hi", "post_type": "text"})
        );
    }

    #[tokio::test]
    async fn test_unreachable_server_is_transport_error() {
        // Port 9 (discard) on localhost is expected to refuse connections.
        let api = HttpApi::new(&ApiConfig {
            base_url: "http://127.0.0.1:9".to_string(),
            timeout_secs: 2,
            ..ApiConfig::default()
        })
        .unwrap();
        let err = api.current_user().await.unwrap_err();
        assert!(matches!(err, SyncError::Http(_)));
        assert!(!err.is_unauthenticated());
    }

    /// Answers the first request with a fixed status line and body.
    async fn serve_once(status: &'static str, body: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 4096];
            let _ = socket.read(&mut buf).await;
            let response = format!(
                "HTTP/1.1 {}\r\ncontent-type: text/plain\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
                status,
                body.len(),
                body
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            let _ = socket.shutdown().await;
        });
        format!("http://{}", addr)
    }

    #[tokio::test]
    async fn test_unauthorized_status_is_unauthenticated() {
        let base = serve_once("401 Unauthorized", "").await;
        let api = HttpApi::new(&config(&base)).unwrap();

        let err = api.current_user().await.unwrap_err();
        assert!(matches!(err, SyncError::Unauthorized));
        assert!(err.is_unauthenticated());
        assert_eq!(err.status(), Some(401));
    }

    #[tokio::test]
    async fn test_forbidden_status_is_rejected_with_message() {
        let base = serve_once("403 Forbidden", "not allowed").await;
        let api = HttpApi::new(&config(&base)).unwrap();

        let err = api.current_user().await.unwrap_err();
        match &err {
            SyncError::Rejected { status, message } => {
                assert_eq!(*status, 403);
                assert_eq!(message, "not allowed");
            }
            other => panic!("expected Rejected, got {:?}", other),
        }
        assert!(!err.is_unauthenticated());
    }

    #[tokio::test]
    async fn test_server_error_status_is_server() {
        let base = serve_once("500 Internal Server Error", "boom").await;
        let api = HttpApi::new(&config(&base)).unwrap();

        let err = api.list_posts().await.unwrap_err();
        assert!(matches!(err, SyncError::Server { status: 500 }));
        assert!(!err.is_unauthenticated());
    }
}
