//! Access to the identity provider's session.
//!
//! The client never stores a bearer token itself. It asks a [`SessionProvider`]
//! on every authenticated request, so a provider that refreshes or drops its
//! token is picked up immediately.

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::types::Post;

/// Authentication status as reported by the identity provider.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthStatus {
    pub is_loading: bool,
    pub is_authenticated: bool,
}

impl AuthStatus {
    /// Signed in with a usable credential and not mid-transition.
    pub fn is_signed_in(self, has_token: bool) -> bool {
        self.is_authenticated && has_token && !self.is_loading
    }
}

/// Read-only view of the current session.
pub trait SessionProvider: Send + Sync {
    fn status(&self) -> AuthStatus;

    /// Bearer credential (the OIDC `id_token`), if one is available right now.
    fn bearer_token(&self) -> Option<String>;

    /// Stable subject identifier of the signed-in user.
    fn user_id(&self) -> Option<String>;

    fn is_signed_in(&self) -> bool {
        self.status().is_signed_in(self.bearer_token().is_some())
    }
}

/// Session with no user. Every request goes out without credentials.
#[derive(Debug, Clone, Copy, Default)]
pub struct AnonymousSession;

impl SessionProvider for AnonymousSession {
    fn status(&self) -> AuthStatus {
        AuthStatus::default()
    }

    fn bearer_token(&self) -> Option<String> {
        None
    }

    fn user_id(&self) -> Option<String> {
        None
    }
}

#[derive(Debug, Clone, Default)]
struct StaticSessionInner {
    token: Option<String>,
    user: Option<UserProfile>,
    is_loading: bool,
}

/// In-memory session whose credential can be swapped at runtime.
#[derive(Debug, Default)]
pub struct StaticSession {
    inner: RwLock<StaticSessionInner>,
}

impl StaticSession {
    pub fn new(token: impl Into<String>, user: UserProfile) -> Self {
        Self {
            inner: RwLock::new(StaticSessionInner {
                token: Some(token.into()),
                user: Some(user),
                is_loading: false,
            }),
        }
    }

    /// Replace the bearer token, e.g. after a silent renew.
    pub fn set_token(&self, token: Option<String>) {
        self.inner.write().token = token;
    }

    pub fn set_loading(&self, is_loading: bool) {
        self.inner.write().is_loading = is_loading;
    }

    pub fn user(&self) -> Option<UserProfile> {
        self.inner.read().user.clone()
    }

    /// Forget the user and token (sign-out).
    pub fn clear(&self) {
        let mut inner = self.inner.write();
        inner.token = None;
        inner.user = None;
    }
}

impl SessionProvider for StaticSession {
    fn status(&self) -> AuthStatus {
        let inner = self.inner.read();
        AuthStatus {
            is_loading: inner.is_loading,
            is_authenticated: inner.user.is_some(),
        }
    }

    fn bearer_token(&self) -> Option<String> {
        self.inner.read().token.clone()
    }

    fn user_id(&self) -> Option<String> {
        self.inner
            .read()
            .user
            .as_ref()
            .map(|user| user.sub.clone())
            .filter(|sub| !sub.is_empty())
    }
}

/// OIDC profile claims used by the client.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub sub: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub given_name: Option<String>,
    #[serde(default)]
    pub preferred_username: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

impl UserProfile {
    pub fn new(sub: impl Into<String>) -> Self {
        Self {
            sub: sub.into(),
            ..Default::default()
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    /// Best available human name for the user.
    pub fn display_name(&self) -> String {
        let non_empty = |value: &Option<String>| value.clone().filter(|s| !s.trim().is_empty());
        non_empty(&self.name)
            .or_else(|| non_empty(&self.given_name))
            .or_else(|| non_empty(&self.preferred_username))
            .or_else(|| {
                self.email
                    .as_deref()
                    .and_then(|email| email.split('@').next())
                    .filter(|local| !local.is_empty())
                    .map(str::to_string)
            })
            .unwrap_or_else(|| "User".to_string())
    }
}

/// Whether the signed-in user wrote `post`.
pub fn is_own_post(session: &dyn SessionProvider, post: &Post) -> bool {
    session
        .user_id()
        .is_some_and(|user_id| user_id == post.author_id)
}

/// Whether the signed-in user has liked `post`.
pub fn has_liked(session: &dyn SessionProvider, post: &Post) -> bool {
    session
        .user_id()
        .is_some_and(|user_id| post.is_liked_by(&user_id))
}
