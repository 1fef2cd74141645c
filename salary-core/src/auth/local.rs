use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use tracing::{debug, info};

use super::{
    AuthCallback, AuthError, AuthEvent, AuthService, AuthSubscription, AuthUser, OAuthProvider,
};

type Listener = Arc<dyn Fn(&AuthEvent) + Send + Sync>;

#[derive(Default)]
struct SessionState {
    current: Option<AuthUser>,
    listeners: HashMap<u64, Listener>,
    next_listener_id: u64,
}

/// In-process [`AuthService`] that signs in to a preconfigured identity per
/// provider.
///
/// Sessions live for the lifetime of the service; nothing is persisted.
pub struct LocalAuthService {
    identities: HashMap<OAuthProvider, AuthUser>,
    state: Arc<Mutex<SessionState>>,
}

impl LocalAuthService {
    pub fn new() -> Self {
        Self {
            identities: HashMap::new(),
            state: Arc::new(Mutex::new(SessionState::default())),
        }
    }

    /// Makes `user` the identity returned when signing in with `provider`.
    pub fn with_identity(
        mut self,
        provider: OAuthProvider,
        user: AuthUser,
    ) -> Self {
        self.identities.insert(provider, user);
        self
    }

    fn lock(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Listeners are called outside the lock so they may query the service.
    fn notify(
        &self,
        event: &AuthEvent,
    ) {
        let listeners: Vec<Listener> = self.lock().listeners.values().cloned().collect();
        debug!(listeners = listeners.len(), ?event, "auth state changed");
        for listener in listeners {
            listener(event);
        }
    }
}

impl Default for LocalAuthService {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AuthService for LocalAuthService {
    async fn current_user(&self) -> Result<Option<AuthUser>, AuthError> {
        Ok(self.lock().current.clone())
    }

    fn on_auth_state_change(
        &self,
        callback: AuthCallback,
    ) -> AuthSubscription {
        let id = {
            let mut state = self.lock();
            let id = state.next_listener_id;
            state.next_listener_id += 1;
            state.listeners.insert(id, Arc::from(callback));
            id
        };

        let weak = Arc::downgrade(&self.state);
        AuthSubscription::new(move || {
            if let Some(state) = weak.upgrade() {
                state
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .listeners
                    .remove(&id);
            }
        })
    }

    async fn sign_in_with_oauth(
        &self,
        provider: OAuthProvider,
    ) -> Result<AuthUser, AuthError> {
        let user = self
            .identities
            .get(&provider)
            .cloned()
            .ok_or(AuthError::ProviderUnavailable(provider))?;

        self.lock().current = Some(user.clone());
        info!(user_id = %user.id, %provider, "signed in");
        self.notify(&AuthEvent::SignedIn(user.clone()));
        Ok(user)
    }

    async fn sign_out(&self) -> Result<(), AuthError> {
        let previous = self.lock().current.take();
        if let Some(user) = previous {
            info!(user_id = %user.id, "signed out");
            self.notify(&AuthEvent::SignedOut);
        }
        Ok(())
    }
}
