//! Paginated post feed.
//!
//! The backend returns the whole collection on every list call, so a store
//! fetches it once into a buffer and reveals it page by page. Mutations go to
//! the server first and are applied locally only after it confirms them.
//!
//! Invariants, outside of a reset in progress:
//! - `visible` is a prefix of `buffer`
//! - `cursor == visible.len()`
//! - `has_more == cursor < buffer.len()`
//!
//! Each fetch is tagged with the store's generation. [`PostStore::refresh`]
//! bumps the generation, so a fetch that was already in flight cannot
//! overwrite the reset state when it finally completes.

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::client::PostsApi;
use crate::config::ClientConfig;
use crate::error::{BlogError, Result};
use crate::session::SessionProvider;
use crate::types::{NewComment, NewPost, Post, PostPatch};

/// Load state of a store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadStatus {
    Idle,
    Loading,
    Ready,
    Error,
}

/// Which part of the collection a store exposes.
#[derive(Clone)]
pub enum FeedScope {
    All,
    /// Only posts written by the session's current user.
    CurrentUser(Arc<dyn SessionProvider>),
}

impl FeedScope {
    pub fn label(&self) -> &'static str {
        match self {
            FeedScope::All => "posts",
            FeedScope::CurrentUser(_) => "your posts",
        }
    }

    /// Resolve to an author filter. Fails when a user scope has no user.
    fn author_filter(&self) -> Result<Option<String>> {
        match self {
            FeedScope::All => Ok(None),
            FeedScope::CurrentUser(session) => session.user_id().map(Some).ok_or_else(|| {
                BlogError::Unauthenticated("User not authenticated - no user ID found".to_string())
            }),
        }
    }

    fn admits(&self, post: &Post) -> bool {
        match self.author_filter() {
            Ok(None) => true,
            Ok(Some(author_id)) => post.author_id == author_id,
            Err(_) => false,
        }
    }
}

impl std::fmt::Debug for FeedScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Owned copy of a store's state, for rendering.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedSnapshot {
    pub status: LoadStatus,
    pub posts: Vec<Post>,
    pub has_more: bool,
    pub error: Option<String>,
    pub page: u32,
    /// Number of posts held locally, revealed or not.
    pub buffered: usize,
}

#[derive(Debug)]
struct FeedState {
    status: LoadStatus,
    buffer: Vec<Post>,
    visible: Vec<Post>,
    cursor: usize,
    has_more: bool,
    page: u32,
    error: Option<String>,
    generation: u64,
    in_flight: Option<u64>,
    /// Set by a successful fetch, cleared by a reset.
    loaded: bool,
}

impl FeedState {
    fn new() -> Self {
        Self {
            status: LoadStatus::Idle,
            buffer: Vec::new(),
            visible: Vec::new(),
            cursor: 0,
            has_more: true,
            page: 1,
            error: None,
            generation: 0,
            in_flight: None,
            loaded: false,
        }
    }

    fn reset(&mut self) {
        self.buffer.clear();
        self.visible.clear();
        self.cursor = 0;
        self.has_more = true;
        self.page = 1;
        self.error = None;
        self.loaded = false;
    }

    fn sync_cursor(&mut self) {
        self.cursor = self.visible.len();
        self.has_more = self.cursor < self.buffer.len();
    }

    fn install(&mut self, posts: Vec<Post>, page_size: usize) {
        let first_page = page_size.min(posts.len());
        self.visible = posts[..first_page].to_vec();
        self.buffer = posts;
        self.page = 1;
        self.status = LoadStatus::Ready;
        self.error = None;
        self.loaded = true;
        self.sync_cursor();
    }

    fn reveal_next_page(&mut self, page_size: usize) -> usize {
        let end = (self.cursor + page_size).min(self.buffer.len());
        let revealed = end.saturating_sub(self.cursor);
        if revealed > 0 {
            self.visible
                .extend_from_slice(&self.buffer[self.cursor..end]);
            self.page += 1;
        }
        self.sync_cursor();
        revealed
    }

    fn prepend(&mut self, post: Post) {
        self.visible.insert(0, post.clone());
        self.buffer.insert(0, post);
        self.sync_cursor();
    }

    fn replace(&mut self, id: &str, post: &Post) {
        for list in [&mut self.visible, &mut self.buffer] {
            for slot in list.iter_mut().filter(|existing| existing.id == id) {
                *slot = post.clone();
            }
        }
    }

    fn remove(&mut self, id: &str) {
        self.visible.retain(|post| post.id != id);
        self.buffer.retain(|post| post.id != id);
        self.sync_cursor();
    }

    fn snapshot(&self) -> FeedSnapshot {
        FeedSnapshot {
            status: self.status,
            posts: self.visible.clone(),
            has_more: self.has_more,
            error: self.error.clone(),
            page: self.page,
            buffered: self.buffer.len(),
        }
    }
}

/// Client-side paginated view over the post collection.
///
/// Methods take `&self`; the state lock is never held across an `.await`, so
/// a store can be shared between concurrent tasks.
pub struct PostStore<A: PostsApi + ?Sized> {
    api: Arc<A>,
    scope: FeedScope,
    page_size: usize,
    fetch_limit: u32,
    state: Mutex<FeedState>,
}

impl<A: PostsApi + ?Sized> PostStore<A> {
    pub fn new(api: Arc<A>, scope: FeedScope, config: &ClientConfig) -> Self {
        Self {
            api,
            scope,
            page_size: config.page_size.max(1),
            fetch_limit: config.fetch_limit,
            state: Mutex::new(FeedState::new()),
        }
    }

    /// Store over every post.
    pub fn all_posts(api: Arc<A>, config: &ClientConfig) -> Self {
        Self::new(api, FeedScope::All, config)
    }

    /// Store over the current user's posts.
    pub fn user_posts(
        api: Arc<A>,
        session: Arc<dyn SessionProvider>,
        config: &ClientConfig,
    ) -> Self {
        Self::new(api, FeedScope::CurrentUser(session), config)
    }

    pub fn scope(&self) -> &FeedScope {
        &self.scope
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Fetch the whole collection and show the first page.
    ///
    /// A no-op while another fetch is in flight. On failure the error message
    /// is stored, the visible posts are left as they were, and the error is
    /// returned.
    pub async fn fetch_posts(&self) -> Result<()> {
        let author_filter = match self.scope.author_filter() {
            Ok(filter) => filter,
            Err(err) => {
                let mut state = self.state.lock();
                state.status = LoadStatus::Error;
                state.error = Some(err.message());
                return Err(err);
            }
        };

        let generation = {
            let mut state = self.state.lock();
            if state.in_flight.is_some() {
                debug!(scope = self.scope.label(), "fetch already in flight");
                return Ok(());
            }
            state.in_flight = Some(state.generation);
            state.status = LoadStatus::Loading;
            state.error = None;
            state.generation
        };
        debug!(scope = self.scope.label(), generation, "fetching");

        let result = self.api.list_posts(1, self.fetch_limit).await;

        let mut state = self.state.lock();
        if state.generation != generation {
            debug!(
                scope = self.scope.label(),
                generation,
                current = state.generation,
                "discarding stale fetch result"
            );
            return result.map(|_| ());
        }
        state.in_flight = None;

        match result {
            Ok(mut posts) => {
                if let Some(author_id) = &author_filter {
                    posts.retain(|post| &post.author_id == author_id);
                }
                state.install(posts, self.page_size);
                info!(
                    scope = self.scope.label(),
                    buffered = state.buffer.len(),
                    visible = state.visible.len(),
                    "loaded"
                );
                Ok(())
            }
            Err(err) => {
                warn!(scope = self.scope.label(), error = %err, "error loading {}", self.scope.label());
                state.status = LoadStatus::Error;
                state.error = Some(err.message());
                state.has_more = state.cursor < state.buffer.len();
                Err(err)
            }
        }
    }

    /// Reveal the next page from the buffer.
    ///
    /// Purely local once the collection is buffered. Before the first
    /// successful fetch it performs that fetch instead.
    pub async fn load_more(&self) -> Result<()> {
        let needs_fetch = {
            let mut state = self.state.lock();
            if state.in_flight.is_some() {
                return Ok(());
            }
            if !state.loaded && matches!(state.status, LoadStatus::Idle | LoadStatus::Error) {
                true
            } else if !state.has_more {
                return Ok(());
            } else {
                let revealed = state.reveal_next_page(self.page_size);
                debug!(
                    scope = self.scope.label(),
                    revealed,
                    cursor = state.cursor,
                    has_more = state.has_more,
                    "revealed page"
                );
                false
            }
        };

        if needs_fetch {
            self.fetch_posts().await
        } else {
            Ok(())
        }
    }

    /// Drop everything and fetch again from the first page.
    pub async fn refresh(&self) -> Result<()> {
        {
            let mut state = self.state.lock();
            state.generation += 1;
            state.in_flight = None;
            state.reset();
            debug!(scope = self.scope.label(), generation = state.generation, "refreshing");
        }
        self.fetch_posts().await
    }

    // ---------- Mutations ----------

    /// Create a post and put it at the top of the feed once the server accepts it.
    pub async fn create_post(&self, post: &NewPost) -> Result<Post> {
        let created = self.api.create_post(post).await?;
        if self.scope.admits(&created) {
            self.state.lock().prepend(created.clone());
        }
        Ok(created)
    }

    pub async fn update_post(&self, id: &str, patch: &PostPatch) -> Result<Post> {
        let updated = self.api.update_post(id, patch).await?;
        self.state.lock().replace(id, &updated);
        Ok(updated)
    }

    pub async fn delete_post(&self, id: &str) -> Result<()> {
        self.api.delete_post(id).await?;
        self.state.lock().remove(id);
        Ok(())
    }

    pub async fn add_comment(&self, post_id: &str, comment: &NewComment) -> Result<Post> {
        let updated = self.api.add_comment(post_id, comment).await?;
        self.state.lock().replace(post_id, &updated);
        Ok(updated)
    }

    pub async fn like_post(&self, id: &str) -> Result<Post> {
        let updated = self.api.like_post(id).await?;
        self.state.lock().replace(id, &updated);
        Ok(updated)
    }

    pub async fn unlike_post(&self, id: &str) -> Result<Post> {
        let updated = self.api.unlike_post(id).await?;
        self.state.lock().replace(id, &updated);
        Ok(updated)
    }

    // ---------- Reads ----------

    pub fn snapshot(&self) -> FeedSnapshot {
        self.state.lock().snapshot()
    }

    /// Posts currently revealed.
    pub fn posts(&self) -> Vec<Post> {
        self.state.lock().visible.clone()
    }

    /// Every post held locally, revealed or not.
    pub fn buffered_posts(&self) -> Vec<Post> {
        self.state.lock().buffer.clone()
    }

    pub fn buffered_len(&self) -> usize {
        self.state.lock().buffer.len()
    }

    pub fn status(&self) -> LoadStatus {
        self.state.lock().status
    }

    pub fn is_loading(&self) -> bool {
        self.state.lock().status == LoadStatus::Loading
    }

    pub fn has_more(&self) -> bool {
        self.state.lock().has_more
    }

    pub fn error(&self) -> Option<String> {
        self.state.lock().error.clone()
    }

    pub fn page(&self) -> u32 {
        self.state.lock().page
    }

    pub fn cursor(&self) -> usize {
        self.state.lock().cursor
    }
}
