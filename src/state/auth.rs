use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::api::Backend;
use crate::error::ApiError;
use crate::models::User;
use crate::session::TokenStore;

/// Where the session currently stands. Transitions are driven exclusively by
/// `AuthStore` methods; pages only ever read this.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthPhase {
    Anonymous,
    Authenticating,
    Authenticated,
    /// Login failed; carries the message shown on the login screen.
    Error(String),
}

#[derive(Debug, Clone)]
struct AuthState {
    phase: AuthPhase,
    user: Option<User>,
}

/// Session state machine over the persisted token.
///
/// Startup is eager-optimistic: if a token is on disk we enter `Authenticated`
/// immediately and let `check_session` (or the first 401) correct us. This
/// keeps the console usable without a blocking round-trip on launch.
pub struct AuthStore {
    backend: Arc<dyn Backend>,
    tokens: Arc<TokenStore>,
    state: RwLock<AuthState>,
}

impl AuthStore {
    pub fn new(backend: Arc<dyn Backend>, tokens: Arc<TokenStore>) -> Self {
        let phase = if tokens.is_present() {
            AuthPhase::Authenticated
        } else {
            AuthPhase::Anonymous
        };
        AuthStore {
            backend,
            tokens,
            state: RwLock::new(AuthState { phase, user: None }),
        }
    }

    pub async fn phase(&self) -> AuthPhase {
        self.state.read().await.phase.clone()
    }

    pub async fn user(&self) -> Option<User> {
        self.state.read().await.user.clone()
    }

    pub async fn is_authenticated(&self) -> bool {
        self.state.read().await.phase == AuthPhase::Authenticated
    }

    /// Exchange credentials for a token. On success the token is persisted and
    /// the user record cached; on failure the phase carries the backend's
    /// message so the login screen can show it verbatim.
    pub async fn login(&self, username: &str, password: &str) -> Result<(), ApiError> {
        {
            let mut state = self.state.write().await;
            state.phase = AuthPhase::Authenticating;
        }

        match self.backend.login(username, password).await {
            Ok(resp) => {
                self.tokens.set(&resp.access_token);
                let mut state = self.state.write().await;
                state.phase = AuthPhase::Authenticated;
                state.user = Some(resp.user);
                info!("Logged in as {}", username);
                Ok(())
            }
            Err(e) => {
                let message = e.user_message("Login failed");
                let mut state = self.state.write().await;
                state.phase = AuthPhase::Error(message);
                state.user = None;
                Err(e)
            }
        }
    }

    pub async fn logout(&self) {
        self.tokens.clear();
        let mut state = self.state.write().await;
        state.phase = AuthPhase::Anonymous;
        state.user = None;
        info!("Logged out");
    }

    /// Validate the restored token against `/auth/me`. Invalid or rejected
    /// tokens drop the session back to `Anonymous`; transport errors leave the
    /// optimistic session alone so a flaky network does not log the user out.
    pub async fn check_session(&self) {
        if !self.tokens.is_present() {
            return;
        }
        match self.backend.me().await {
            Ok(user) => {
                let mut state = self.state.write().await;
                state.phase = AuthPhase::Authenticated;
                state.user = Some(user);
            }
            Err(e) if e.is_unauthorized() => {
                warn!("Persisted session rejected by backend");
                self.tokens.clear();
                let mut state = self.state.write().await;
                state.phase = AuthPhase::Anonymous;
                state.user = None;
            }
            Err(e) => {
                warn!("Session check failed (keeping session): {}", e);
            }
        }
    }

    /// Reaction to an out-of-band 401 observed by the HTTP adapter. Only
    /// downgrades an `Authenticated` session; an in-flight login failure owns
    /// its own `Error` phase and must not be clobbered here.
    pub async fn force_logout(&self) {
        let mut state = self.state.write().await;
        if state.phase == AuthPhase::Authenticated {
            state.phase = AuthPhase::Anonymous;
            state.user = None;
            warn!("Session expired; returning to login");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phase_equality_ignores_nothing() {
        assert_eq!(
            AuthPhase::Error("bad".into()),
            AuthPhase::Error("bad".into())
        );
        assert_ne!(AuthPhase::Error("bad".into()), AuthPhase::Anonymous);
    }
}
