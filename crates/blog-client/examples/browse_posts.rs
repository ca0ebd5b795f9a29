//! Example: page through the blog feed the way a scrolling UI would.
//!
//! Reads `BLOG_*` settings from the environment, fetches the collection once,
//! then reveals it page by page.
//!
//! Usage:
//!   BLOG_API_BASE_URL=http://localhost:3000 cargo run -p blog-client --example browse_posts
//!
//! With a bearer token, also shows which posts belong to that user:
//!   BLOG_ID_TOKEN=... BLOG_USER_SUB=... cargo run -p blog-client --example browse_posts
//!
//! Set `RUST_LOG=blog_client=debug` to see each request and retry.

use std::sync::Arc;

use blog_client::{
    AnonymousSession, BlogClient, ClientConfig, PostStore, Result, SessionProvider, StaticSession,
    UserProfile, is_own_post,
};
use tracing_subscriber::EnvFilter;

fn session_from_env() -> Arc<dyn SessionProvider> {
    let token = std::env::var("BLOG_ID_TOKEN").ok().filter(|s| !s.is_empty());
    let sub = std::env::var("BLOG_USER_SUB").ok().filter(|s| !s.is_empty());
    match (token, sub) {
        (Some(token), Some(sub)) => Arc::new(StaticSession::new(token, UserProfile::new(sub))),
        _ => Arc::new(AnonymousSession),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let config = ClientConfig::from_env()?;
    let session = session_from_env();
    let client = Arc::new(BlogClient::new(&config, session.clone())?);
    let feed = PostStore::all_posts(client.clone(), &config);

    if let Err(e) = feed.fetch_posts().await {
        let notice = e.notice();
        eprintln!("{}: {}", notice.title, notice.message);
        return Err(e);
    }

    loop {
        let snapshot = feed.snapshot();
        println!(
            "page {} - showing {} of {} posts",
            snapshot.page,
            snapshot.posts.len(),
            snapshot.buffered
        );
        if !snapshot.has_more {
            break;
        }
        feed.load_more().await?;
    }

    for post in feed.posts() {
        let marker = if is_own_post(session.as_ref(), &post) { "*" } else { " " };
        println!(
            "{marker} [{}] {} ({} likes, {} comments): {}",
            post.id,
            post.author,
            post.likes_count,
            post.comments.len(),
            post.content.chars().take(60).collect::<String>()
        );
    }

    if session.user_id().is_some() {
        let mine = PostStore::user_posts(client, session, &config);
        mine.fetch_posts().await?;
        println!("{} of them are yours", mine.buffered_len());
    }

    Ok(())
}
