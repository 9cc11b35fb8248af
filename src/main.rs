use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use socialsync::api::{CommentId, MediaAttachment, MediaKind, PostId, Theme, User, UserId};
use socialsync::config::{Config, LogFormat, LoggingConfig};
use socialsync::display;
use socialsync::{HttpApi, LoginRedirect, Store, Synchronizer};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const WRAP_WIDTH: usize = 72;

#[derive(Parser)]
#[command(name = "socialsync")]
#[command(about = "Browse and act on a social feed from the terminal", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to config file (default: <config dir>/socialsync/config.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Show the home feed and suggested users
    Feed,
    /// Publish a post, optionally with one image or video
    Post {
        text: String,
        #[arg(long, conflicts_with = "video")]
        image: Option<PathBuf>,
        #[arg(long)]
        video: Option<PathBuf>,
    },
    /// Publish a text-only post
    Quick { text: String },
    /// Toggle your like on a post
    Like { post: u64 },
    /// Show a post with its comments
    Comments { post: u64 },
    /// Comment on a post
    Comment { post: u64, text: String },
    /// Reply to a comment on a post
    Reply { post: u64, comment: u64, text: String },
    /// Toggle your like on a comment of a post
    LikeComment { post: u64, comment: u64 },
    /// Follow or unfollow a user seen in the feed or suggestions
    Follow { user: u64 },
    /// Search users
    Search { query: String },
    /// Show a profile (your own by default)
    Profile { user: Option<u64> },
    /// Update account settings
    Settings {
        #[arg(long)]
        username: Option<String>,
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        bio: Option<String>,
        #[arg(long)]
        private: Option<bool>,
        #[arg(long)]
        language: Option<String>,
        #[arg(long)]
        dark: Option<bool>,
    },
    /// End the session
    Logout,
}

fn init_tracing(logging: &LoggingConfig) {
    let format = match std::env::var("SOCIALSYNC_LOG_FORMAT").as_deref() {
        Ok("json") => LogFormat::Json,
        Ok("pretty") => LogFormat::Pretty,
        _ => logging.format,
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.filter));
    let registry = tracing_subscriber::registry().with(filter);

    match format {
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init(),
        LogFormat::Pretty => registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init(),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::load(cli.config.as_deref()).context("Failed to load configuration")?;
    init_tracing(&config.logging);

    let api = Arc::new(HttpApi::new(&config.api)?);
    let navigator = Arc::new(LoginRedirect::new(config.api.login_url()));
    let sync = Synchronizer::new(api, navigator.clone(), config.sync.clone());

    if let Err(err) = sync.initialize().await {
        if navigator.redirected() {
            return Ok(());
        }
        return Err(anyhow!("Failed to load the app: {}", err));
    }

    let result = run(&sync, cli.command).await;

    for notice in sync.drain_notices().await {
        eprintln!("{}", display::render_notice(&notice));
    }
    result
}

async fn run(sync: &Synchronizer, command: Command) -> Result<()> {
    match command {
        Command::Feed => {
            let store = sync.snapshot().await;
            print_posts(&store.feed.posts);
            if !store.discovery.suggested.is_empty() {
                println!("Who to follow:");
                for user in &store.discovery.suggested {
                    println!("  {}", display::render_user(user));
                }
            }
        }
        Command::Post { text, image, video } => {
            let media = match (image, video) {
                (Some(path), _) => Some(MediaAttachment::from_file(MediaKind::Image, &path).await?),
                (None, Some(path)) => {
                    Some(MediaAttachment::from_file(MediaKind::Video, &path).await?)
                }
                (None, None) => None,
            };
            sync.set_compose(text, media).await;
            if sync.submit_post().await {
                print_first_post(sync).await;
            }
        }
        Command::Quick { text } => {
            sync.store().await.drafts.quick_post = text;
            if sync.submit_quick_post().await {
                print_first_post(sync).await;
            }
        }
        Command::Like { post } => {
            let post = PostId(post);
            sync.toggle_like(post).await;
            print_post(sync, post).await;
        }
        Command::Comments { post } => {
            let post = PostId(post);
            sync.toggle_comments(post).await;
            print_post(sync, post).await;
        }
        Command::Comment { post, text } => {
            let post = PostId(post);
            sync.toggle_comments(post).await;
            sync.store().await.drafts.comments.set(post, text);
            sync.submit_comment(post).await;
            print_post(sync, post).await;
        }
        Command::Reply { post, comment, text } => {
            let (post, comment) = (PostId(post), CommentId(comment));
            sync.toggle_comments(post).await;
            sync.toggle_reply(comment).await;
            sync.store().await.drafts.replies.set(comment, text);
            sync.submit_reply(comment).await;
            print_post(sync, post).await;
        }
        Command::LikeComment { post, comment } => {
            let post = PostId(post);
            sync.toggle_comments(post).await;
            sync.toggle_comment_like(CommentId(comment)).await;
            print_post(sync, post).await;
        }
        Command::Follow { user } => {
            let target = find_user(&sync.snapshot().await, UserId(user))
                .ok_or_else(|| anyhow!("User #{} is not in your feed or suggestions", user))?;
            sync.toggle_follow(&target).await;
            let store = sync.snapshot().await;
            if let Some(updated) = find_user(&store, target.id) {
                println!("{}", display::render_user(&updated));
            }
        }
        Command::Search { query } => {
            sync.search(&query).await;
            let store = sync.snapshot().await;
            if store.discovery.results.is_empty() {
                println!("No users found.");
            }
            for user in &store.discovery.results {
                println!("{}", display::render_user(user));
            }
        }
        Command::Profile { user } => {
            let store = sync.snapshot().await;
            let target = match user {
                Some(id) => find_user(&store, UserId(id))
                    .ok_or_else(|| anyhow!("User #{} is not in your feed or suggestions", id))?,
                None => sync.require_session().await?,
            };
            sync.view_profile(target).await;

            let store = sync.snapshot().await;
            if let Some(profile) = &store.profile.user {
                println!("{}", display::render_user(profile));
                if store.is_current_user_profile() {
                    println!("  (this is you)");
                }
                println!();
            }
            print_posts(&store.profile.posts);
        }
        Command::Settings {
            username,
            email,
            bio,
            private,
            language,
            dark,
        } => {
            {
                let mut store = sync.store().await;
                let settings = &mut store.drafts.settings;
                if let Some(username) = username {
                    settings.username = username;
                }
                if let Some(email) = email {
                    settings.email = email;
                }
                if let Some(bio) = bio {
                    settings.bio = bio;
                }
                if let Some(private) = private {
                    settings.private_account = private;
                }
                if let Some(language) = language {
                    settings.language = language;
                }
                if let Some(dark) = dark {
                    settings.theme = if dark { Theme::Dark } else { Theme::Light };
                }
            }
            if sync.save_settings().await {
                let session = sync.require_session().await?;
                println!("{}", display::render_user(&session));
            }
        }
        Command::Logout => sync.logout().await,
    }
    Ok(())
}

/// Users reachable from the loaded view state.
fn find_user(store: &Store, id: UserId) -> Option<User> {
    store
        .discovery
        .suggested
        .iter()
        .chain(store.discovery.results.iter())
        .chain(store.feed.posts.iter().map(|p| &p.user))
        .chain(store.profile.user.iter())
        .find(|u| u.id == id)
        .cloned()
}

fn print_posts(posts: &[socialsync::api::Post]) {
    if posts.is_empty() {
        println!("Nothing to show yet.");
        return;
    }
    let now = chrono::Utc::now();
    for post in posts {
        println!("{}", display::render_post(post, WRAP_WIDTH, now));
    }
}

async fn print_post(sync: &Synchronizer, id: PostId) {
    let store = sync.snapshot().await;
    match store.post(id) {
        Some(post) => println!("{}", display::render_post(post, WRAP_WIDTH, chrono::Utc::now())),
        None => eprintln!("Post #{} is not in your feed.", id),
    }
}

async fn print_first_post(sync: &Synchronizer) {
    let store = sync.snapshot().await;
    if let Some(post) = store.feed.posts.first() {
        println!("{}", display::render_post(post, WRAP_WIDTH, chrono::Utc::now()));
    }
}
