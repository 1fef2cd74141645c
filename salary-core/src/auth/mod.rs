//! Authentication seam.
//!
//! The application only needs to know who is signed in and to hear about
//! sign-in / sign-out. [`AuthService`] is the boundary; [`LocalAuthService`]
//! is an in-process implementation backed by configured identities.

mod local;

use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use local::LocalAuthService;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("not signed in")]
    NotSignedIn,

    #[error("sign-in provider '{0}' is not available")]
    ProviderUnavailable(OAuthProvider),

    #[error("unknown sign-in provider '{0}'")]
    UnknownProvider(String),
}

/// The signed-in user as reported by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: String,
    pub email: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OAuthProvider {
    Google,
}

impl OAuthProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Google => "google",
        }
    }
}

impl fmt::Display for OAuthProvider {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OAuthProvider {
    type Err = AuthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "google" => Ok(Self::Google),
            _ => Err(AuthError::UnknownProvider(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthEvent {
    SignedIn(AuthUser),
    SignedOut,
}

impl AuthEvent {
    /// The user after this event, if any.
    pub fn user(&self) -> Option<&AuthUser> {
        match self {
            Self::SignedIn(user) => Some(user),
            Self::SignedOut => None,
        }
    }
}

pub type AuthCallback = Box<dyn Fn(&AuthEvent) + Send + Sync>;

/// Handle returned by [`AuthService::on_auth_state_change`].
///
/// The listener stays registered until [`unsubscribe`](Self::unsubscribe) is
/// called or the handle is dropped.
pub struct AuthSubscription {
    detach: Option<Box<dyn FnOnce() + Send + Sync>>,
}

impl AuthSubscription {
    pub fn new(detach: impl FnOnce() + Send + Sync + 'static) -> Self {
        Self {
            detach: Some(Box::new(detach)),
        }
    }

    pub fn unsubscribe(mut self) {
        self.detach_now();
    }

    fn detach_now(&mut self) {
        if let Some(detach) = self.detach.take() {
            detach();
        }
    }
}

impl Drop for AuthSubscription {
    fn drop(&mut self) {
        self.detach_now();
    }
}

impl fmt::Debug for AuthSubscription {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.debug_struct("AuthSubscription")
            .field("active", &self.detach.is_some())
            .finish()
    }
}

#[async_trait]
pub trait AuthService: Send + Sync {
    async fn current_user(&self) -> Result<Option<AuthUser>, AuthError>;

    /// Registers `callback` for sign-in and sign-out events.
    fn on_auth_state_change(
        &self,
        callback: AuthCallback,
    ) -> AuthSubscription;

    async fn sign_in_with_oauth(
        &self,
        provider: OAuthProvider,
    ) -> Result<AuthUser, AuthError>;

    async fn sign_out(&self) -> Result<(), AuthError>;

    /// The signed-in user, or [`AuthError::NotSignedIn`].
    async fn require_user(&self) -> Result<AuthUser, AuthError> {
        self.current_user().await?.ok_or(AuthError::NotSignedIn)
    }
}
