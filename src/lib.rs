//! Client-side view-state synchronizer for a REST social-networking API.
//!
//! The [`sync::Synchronizer`] keeps a local mirror of session, feed,
//! profile, discovery and draft state, applies user actions to it and
//! reconciles them with the server through the [`api::SocialApi`] boundary.

pub mod api;
pub mod config;
pub mod display;
pub mod error;
pub mod navigation;
pub mod notice;
pub mod sync;

pub use api::http::HttpApi;
pub use config::Config;
pub use error::{Result, SyncError};
pub use navigation::{LoginRedirect, Navigator};
pub use notice::{Notice, NoticeLevel};
pub use sync::{Store, Synchronizer};
