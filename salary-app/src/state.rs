//! Application state for the salary command line.
//!
//! Holds the configuration, the open repository and the auth session for the
//! lifetime of one command.

use std::sync::{Arc, Mutex, PoisonError};

use salary_core::auth::{AuthEvent, AuthSubscription};
use salary_core::{AuthError, AuthService, AuthUser, FinanceRepository};

use crate::config::AppConfig;
use crate::units::DisplayUnit;

pub struct AppState {
    pub config: AppConfig,
    repo: Box<dyn FinanceRepository>,
    auth: Arc<dyn AuthService>,
    /// Mirrors the auth service through its state-change listener.
    session: Arc<Mutex<Option<AuthUser>>>,
    _auth_subscription: AuthSubscription,
}

impl AppState {
    pub fn new(
        config: AppConfig,
        repo: Box<dyn FinanceRepository>,
        auth: Arc<dyn AuthService>,
    ) -> Self {
        let session = Arc::new(Mutex::new(None));
        let sink = session.clone();
        let subscription = auth.on_auth_state_change(Box::new(move |event: &AuthEvent| {
            *sink.lock().unwrap_or_else(PoisonError::into_inner) = event.user().cloned();
        }));

        Self {
            config,
            repo,
            auth,
            session,
            _auth_subscription: subscription,
        }
    }

    pub fn repo(&self) -> &dyn FinanceRepository {
        self.repo.as_ref()
    }

    pub fn auth(&self) -> &dyn AuthService {
        self.auth.as_ref()
    }

    pub fn unit(&self) -> DisplayUnit {
        self.config.display.unit
    }

    pub fn current_user(&self) -> Option<AuthUser> {
        self.session
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// The signed-in user, or [`AuthError::NotSignedIn`].
    pub fn require_user(&self) -> Result<AuthUser, AuthError> {
        self.current_user().ok_or(AuthError::NotSignedIn)
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("config", &self.config)
            .field("user", &self.current_user())
            .finish_non_exhaustive()
    }
}
