//! Request and response types for the blog API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::error::{BlogError, Result};

// ---------- Posts ----------

/// A blog post as returned by the API.
///
/// Decoding is lenient: the id may arrive as `_id`, `id` or both, and
/// missing or `null` counts and collections fall back to empty values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "PostWire")]
pub struct Post {
    #[serde(rename = "_id")]
    pub id: String,
    pub author_id: String,
    /// Author display name.
    pub author: String,
    pub content: String,
    pub tags: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    /// Server-reported like count. Display this rather than `liked_by.len()`.
    pub likes_count: u64,
    pub liked_by: Vec<String>,
    pub comments: Vec<Comment>,
}

impl Post {
    pub fn is_liked_by(&self, user_id: &str) -> bool {
        self.liked_by.iter().any(|id| id == user_id)
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PostWire {
    #[serde(rename = "_id")]
    mongo_id: Option<String>,
    id: Option<String>,
    author_id: Option<String>,
    author: Option<String>,
    content: Option<String>,
    tags: Option<Vec<String>>,
    created_at: Option<DateTime<Utc>>,
    updated_at: Option<DateTime<Utc>>,
    likes_count: Option<u64>,
    liked_by: Option<Vec<String>>,
    comments: Option<Vec<Comment>>,
}

impl TryFrom<PostWire> for Post {
    type Error = String;

    fn try_from(wire: PostWire) -> std::result::Result<Self, Self::Error> {
        let id = either_id(wire.mongo_id, wire.id).ok_or("post has no `_id` or `id`")?;
        Ok(Self {
            id,
            author_id: wire.author_id.unwrap_or_default(),
            author: wire.author.unwrap_or_default(),
            content: wire.content.unwrap_or_default(),
            tags: wire.tags.unwrap_or_default(),
            created_at: wire.created_at,
            updated_at: wire.updated_at,
            likes_count: wire.likes_count.unwrap_or_default(),
            liked_by: wire.liked_by.unwrap_or_default(),
            comments: wire.comments.unwrap_or_default(),
        })
    }
}

/// A comment on a post. Comments are only ever appended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "CommentWire")]
pub struct Comment {
    /// Empty when the server sent neither `_id` nor `id`.
    #[serde(rename = "_id")]
    pub id: String,
    pub author: String,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CommentWire {
    #[serde(rename = "_id")]
    mongo_id: Option<String>,
    id: Option<String>,
    author: Option<String>,
    content: Option<String>,
    created_at: Option<DateTime<Utc>>,
}

impl From<CommentWire> for Comment {
    fn from(wire: CommentWire) -> Self {
        Self {
            id: either_id(wire.mongo_id, wire.id).unwrap_or_default(),
            author: wire.author.unwrap_or_default(),
            content: wire.content.unwrap_or_default(),
            created_at: wire.created_at,
        }
    }
}

fn either_id(mongo_id: Option<String>, id: Option<String>) -> Option<String> {
    mongo_id
        .filter(|id| !id.is_empty())
        .or(id.filter(|id| !id.is_empty()))
}

/// Collection response: either a bare array or `{ "posts": [...] }`.
///
/// Entries are decoded one at a time; an entry that is not a readable post
/// is skipped with a warning instead of failing the whole list.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub(crate) enum PostsEnvelope {
    List(Vec<Value>),
    Wrapped {
        #[serde(default)]
        posts: Option<Vec<Value>>,
    },
}

impl PostsEnvelope {
    pub(crate) fn into_posts(self) -> Vec<Post> {
        let entries = match self {
            PostsEnvelope::List(entries) => entries,
            PostsEnvelope::Wrapped { posts } => posts.unwrap_or_default(),
        };
        entries
            .into_iter()
            .enumerate()
            .filter_map(|(index, entry)| match serde_json::from_value::<Post>(entry) {
                Ok(post) => Some(post),
                Err(e) => {
                    warn!(index, error = %e, "skipping unreadable post");
                    None
                }
            })
            .collect()
    }
}

// ---------- Requests ----------

/// Request body for POST /api/posts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewPost {
    pub content: String,
    pub tags: Vec<String>,
}

impl NewPost {
    /// Trimmed content and de-duplicated, trimmed, non-empty tags.
    pub fn new<I, S>(content: impl Into<String>, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            content: content.into().trim().to_string(),
            tags: normalize_tags(tags),
        }
    }

    pub fn validate(&self, max_content_length: usize) -> Result<()> {
        validate_content(&self.content, max_content_length)
    }
}

/// Request body for PUT /api/posts/{id}. Only fields that are set are sent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PostPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
}

impl PostPatch {
    pub fn content(mut self, content: impl Into<String>) -> Self {
        self.content = Some(content.into().trim().to_string());
        self
    }

    pub fn tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = Some(normalize_tags(tags));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.content.is_none() && self.tags.is_none()
    }

    pub fn validate(&self, max_content_length: usize) -> Result<()> {
        if self.is_empty() {
            return Err(BlogError::Validation("Nothing to update".to_string()));
        }
        match &self.content {
            Some(content) => validate_content(content, max_content_length),
            None => Ok(()),
        }
    }
}

/// Request body for POST /api/posts/{id}/comments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewComment {
    pub content: String,
}

impl NewComment {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into().trim().to_string(),
        }
    }
}

fn normalize_tags<I, S>(tags: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let mut out: Vec<String> = Vec::new();
    for tag in tags {
        let tag = tag.into().trim().to_string();
        if !tag.is_empty() && !out.contains(&tag) {
            out.push(tag);
        }
    }
    out
}

fn validate_content(content: &str, max_content_length: usize) -> Result<()> {
    if content.is_empty() {
        return Err(BlogError::Validation("Post content cannot be empty".to_string()));
    }
    let length = content.chars().count();
    if length > max_content_length {
        return Err(BlogError::Validation(format!(
            "Post content is {length} characters; the limit is {max_content_length}"
        )));
    }
    Ok(())
}
