//! HTTP client for the blog posts API.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, Method};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

use crate::config::ClientConfig;
use crate::error::{BlogError, Result, classify_response};
use crate::retry::{RetryConfig, retry_with_backoff};
use crate::session::{AnonymousSession, SessionProvider};
use crate::types::*;

const POSTS_PATH: &str = "/api/posts";
const JSON_CONTENT_TYPE: &str = "application/json";
const BODY_SNIPPET_CHARS: usize = 400;

/// Decoded success body: JSON when the server said so, raw text otherwise.
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseBody {
    Json(Value),
    Text(String),
}

impl ResponseBody {
    /// Decode into `T`. A text body is still tried as JSON, for servers that
    /// omit the content type.
    pub fn into_json<T: DeserializeOwned>(self) -> Result<T> {
        match self {
            ResponseBody::Json(value) => {
                let snippet = snippet(&value.to_string());
                serde_json::from_value(value).map_err(|e| BlogError::Decode {
                    message: e.to_string(),
                    body_snippet: snippet,
                })
            }
            ResponseBody::Text(text) => serde_json::from_str(&text).map_err(|e| BlogError::Decode {
                message: e.to_string(),
                body_snippet: snippet(&text),
            }),
        }
    }
}

/// A request against the API, relative to the configured base URL.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    method: Method,
    path: String,
    query: Vec<(String, String)>,
    body: Option<Value>,
    headers: Vec<(String, String)>,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: None,
            headers: Vec::new(),
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    /// Attach a body, sent as JSON text.
    pub fn json<T: Serialize + ?Sized>(mut self, body: &T) -> Result<Self> {
        self.body = Some(serde_json::to_value(body)?);
        Ok(self)
    }

    pub fn query(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.query.push((key.into(), value.to_string()));
        self
    }

    /// Extra header; overrides the defaults, including `Content-Type`.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }
}

/// Blog API client.
///
/// Reads are sent without credentials. Writes carry `Authorization: Bearer
/// <token>` when the session has a token at the moment of sending. Every call
/// goes through [`retry_with_backoff`].
#[derive(Clone)]
pub struct BlogClient {
    base_url: String,
    http: Client,
    session: Arc<dyn SessionProvider>,
    retry: RetryConfig,
    max_content_length: usize,
}

impl BlogClient {
    pub fn new(config: &ClientConfig, session: Arc<dyn SessionProvider>) -> Result<Self> {
        config.validate()?;
        let http = Client::builder()
            .timeout(config.request_timeout_duration())
            .connect_timeout(config.connect_timeout_duration())
            .build()
            .map_err(|e| BlogError::Config(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            base_url: config.base_url.clone(),
            http,
            session,
            retry: config.retry(),
            max_content_length: config.max_content_length,
        })
    }

    /// Client with no session (only reads will be meaningful).
    pub fn anonymous(config: &ClientConfig) -> Result<Self> {
        Self::new(config, Arc::new(AnonymousSession))
    }

    pub fn session(&self) -> &Arc<dyn SessionProvider> {
        &self.session
    }

    fn url(&self, path: &str) -> String {
        let base = self.base_url.trim_end_matches('/');
        let path = path.trim_start_matches('/');
        format!("{base}/{path}")
    }

    /// Headers for one attempt: defaults, then bearer auth, then overrides.
    fn headers_for(&self, request: &ApiRequest) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static(JSON_CONTENT_TYPE));

        if request.method != Method::GET {
            if let Some(token) = self.session.bearer_token() {
                let value = HeaderValue::from_str(&format!("Bearer {token}")).map_err(|_| {
                    BlogError::Unauthenticated("Session token is not a valid header value".into())
                })?;
                headers.insert(AUTHORIZATION, value);
            }
        }

        for (name, value) in &request.headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|_| BlogError::Validation(format!("invalid header name {name:?}")))?;
            let value = HeaderValue::from_str(value)
                .map_err(|_| BlogError::Validation(format!("invalid value for header {name}")))?;
            headers.insert(name, value);
        }
        Ok(headers)
    }

    async fn send_once(&self, request: &ApiRequest) -> Result<ResponseBody> {
        let headers = self.headers_for(request)?;
        debug!(
            method = %request.method,
            path = %request.path,
            has_token = headers.contains_key(AUTHORIZATION),
            "sending request"
        );

        let mut builder = self
            .http
            .request(request.method.clone(), self.url(&request.path))
            .headers(headers);
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(body) = &request.body {
            builder = builder.body(serde_json::to_string(body)?);
        }

        let response = builder.send().await.map_err(BlogError::network)?;
        self.check_response(response).await
    }

    async fn check_response(&self, response: reqwest::Response) -> Result<ResponseBody> {
        let status = response.status();
        if !status.is_success() {
            // Best effort: an unreadable error body classifies like an empty one.
            let body = response.text().await.unwrap_or_default();
            let err = classify_response(status.as_u16(), &body);
            debug!(status = status.as_u16(), code = %err.code(), "request failed");
            return Err(err);
        }

        let is_json = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .is_some_and(|content_type| content_type.contains(JSON_CONTENT_TYPE));
        let text = response.text().await.map_err(BlogError::network)?;

        if !is_json {
            return Ok(ResponseBody::Text(text));
        }
        if text.trim().is_empty() {
            return Ok(ResponseBody::Json(Value::Null));
        }
        serde_json::from_str(&text)
            .map(ResponseBody::Json)
            .map_err(|e| BlogError::Decode {
                message: format!("error decoding response body: {e}"),
                body_snippet: snippet(&text),
            })
    }

    /// Send a request, retrying transient failures.
    pub async fn request(&self, request: ApiRequest) -> Result<ResponseBody> {
        let operation = format!("{} {}", request.method, request.path);
        retry_with_backoff(&self.retry, &operation, || self.send_once(&request)).await
    }

    // ---------- Posts ----------

    /// Fetch the post collection. The backend ignores paging and returns everything.
    pub async fn list_posts(&self, page: u32, limit: u32) -> Result<Vec<Post>> {
        let request = ApiRequest::get(POSTS_PATH)
            .query("page", page)
            .query("limit", limit);
        let envelope: PostsEnvelope = self.request(request).await?.into_json()?;
        Ok(envelope.into_posts())
    }

    pub async fn get_post(&self, id: &str) -> Result<Post> {
        let request = ApiRequest::get(post_path(id)?);
        self.request(request).await?.into_json()
    }

    pub async fn create_post(&self, post: &NewPost) -> Result<Post> {
        post.validate(self.max_content_length)?;
        let request = ApiRequest::post(POSTS_PATH).json(post)?;
        self.request(request).await?.into_json()
    }

    /// Partial update; only the fields set in `patch` are sent.
    pub async fn update_post(&self, id: &str, patch: &PostPatch) -> Result<Post> {
        patch.validate(self.max_content_length)?;
        let request = ApiRequest::put(post_path(id)?).json(patch)?;
        self.request(request).await?.into_json()
    }

    pub async fn delete_post(&self, id: &str) -> Result<()> {
        let request = ApiRequest::delete(post_path(id)?);
        self.request(request).await?;
        Ok(())
    }

    // ---------- Engagement ----------

    /// Append a comment. The server answers with the updated post.
    pub async fn add_comment(&self, post_id: &str, comment: &NewComment) -> Result<Post> {
        if comment.content.is_empty() {
            return Err(BlogError::Validation("Comment cannot be empty".to_string()));
        }
        let path = format!("{}/comments", post_path(post_id)?);
        let request = ApiRequest::post(path).json(comment)?;
        self.request(request).await?.into_json()
    }

    pub async fn like_post(&self, id: &str) -> Result<Post> {
        let request = ApiRequest::post(format!("{}/like", post_path(id)?));
        self.request(request).await?.into_json()
    }

    pub async fn unlike_post(&self, id: &str) -> Result<Post> {
        let request = ApiRequest::post(format!("{}/unlike", post_path(id)?));
        self.request(request).await?.into_json()
    }
}

/// Operations the feed store needs from the API.
#[async_trait]
pub trait PostsApi: Send + Sync {
    async fn list_posts(&self, page: u32, limit: u32) -> Result<Vec<Post>>;
    async fn create_post(&self, post: &NewPost) -> Result<Post>;
    async fn update_post(&self, id: &str, patch: &PostPatch) -> Result<Post>;
    async fn delete_post(&self, id: &str) -> Result<()>;
    async fn add_comment(&self, post_id: &str, comment: &NewComment) -> Result<Post>;
    async fn like_post(&self, id: &str) -> Result<Post>;
    async fn unlike_post(&self, id: &str) -> Result<Post>;
}

#[async_trait]
impl PostsApi for BlogClient {
    async fn list_posts(&self, page: u32, limit: u32) -> Result<Vec<Post>> {
        BlogClient::list_posts(self, page, limit).await
    }

    async fn create_post(&self, post: &NewPost) -> Result<Post> {
        BlogClient::create_post(self, post).await
    }

    async fn update_post(&self, id: &str, patch: &PostPatch) -> Result<Post> {
        BlogClient::update_post(self, id, patch).await
    }

    async fn delete_post(&self, id: &str) -> Result<()> {
        BlogClient::delete_post(self, id).await
    }

    async fn add_comment(&self, post_id: &str, comment: &NewComment) -> Result<Post> {
        BlogClient::add_comment(self, post_id, comment).await
    }

    async fn like_post(&self, id: &str) -> Result<Post> {
        BlogClient::like_post(self, id).await
    }

    async fn unlike_post(&self, id: &str) -> Result<Post> {
        BlogClient::unlike_post(self, id).await
    }
}

fn post_path(id: &str) -> Result<String> {
    let id = id.trim();
    if id.is_empty() {
        return Err(BlogError::Validation("Post id cannot be empty".to_string()));
    }
    let encoded: String = url::form_urlencoded::byte_serialize(id.as_bytes()).collect();
    Ok(format!("{POSTS_PATH}/{}", encoded.replace('+', "%20")))
}

fn snippet(body: &str) -> String {
    body.chars().take(BODY_SNIPPET_CHARS).collect()
}
