//! Blog client - typed access to a blog REST API plus paginated feed stores.
//!
//! # Layers
//!
//! - [`error`] - failure classification and user-facing notices
//! - [`retry`] - exponential backoff around a fallible async operation
//! - [`client::BlogClient`] - authenticated requests and typed post endpoints
//! - [`store::PostStore`] - fetch-once, reveal-by-page feed over all posts or
//!   the current user's posts
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use blog_client::{BlogClient, ClientConfig, PostStore};
//!
//! # async fn run() -> blog_client::Result<()> {
//! let config = ClientConfig::from_env()?;
//! let client = Arc::new(BlogClient::anonymous(&config)?);
//! let feed = PostStore::all_posts(client, &config);
//!
//! feed.fetch_posts().await?;
//! while feed.has_more() {
//!     feed.load_more().await?;
//! }
//! println!("{} posts", feed.posts().len());
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod retry;
pub mod session;
pub mod store;
pub mod types;

pub use client::{ApiRequest, BlogClient, PostsApi, ResponseBody};
pub use config::ClientConfig;
pub use error::{BlogError, ErrorKind, ErrorNotice, Result, Severity, classify_response};
pub use retry::{RetryConfig, Retryable, retry_with_backoff};
pub use session::{
    AnonymousSession, AuthStatus, SessionProvider, StaticSession, UserProfile, has_liked,
    is_own_post,
};
pub use store::{FeedScope, FeedSnapshot, LoadStatus, PostStore};
pub use types::{Comment, NewComment, NewPost, Post, PostPatch};
