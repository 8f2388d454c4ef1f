//! In-memory identity of the signed-in user.
//!
//! Tokens live in the [`TokenStore`]; this only holds what `/user/me` or the
//! login response said about the user, plus whether the startup profile call
//! is still running.

use pki_api::{Role, TokenStore, User};
use tracing::{debug, info, warn};

use crate::core::effects::TaskError;
use crate::router::Route;

#[derive(Debug, Default, Clone, PartialEq)]
pub struct Session {
    user: Option<User>,
    loading: bool,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn user(&self) -> Option<&User> {
        self.user.as_ref()
    }

    pub fn role(&self) -> Option<Role> {
        self.user.as_ref().map(|u| u.role)
    }

    pub fn is_authenticated(&self) -> bool {
        self.user.is_some()
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    /// Replaces the whole identity.
    pub fn set_user(&mut self, user: Option<User>) {
        self.user = user;
    }

    /// Starts hydration. Returns whether the profile must be fetched, which is
    /// only the case when a persisted access token exists.
    pub fn begin_hydration(&mut self, has_token: bool) -> bool {
        self.loading = has_token;
        if !has_token {
            debug!("no persisted token, starting anonymous");
        }
        has_token
    }

    /// Ends hydration. A failed profile call leaves the session anonymous
    /// without surfacing anything to the user.
    pub fn finish_hydration(&mut self, result: Result<User, TaskError>) {
        self.loading = false;
        match result {
            Ok(user) => {
                info!(user = %user.email, role = %user.role, "session restored");
                self.set_user(Some(user));
            }
            Err(err) => {
                debug!(error = %err, "session restore failed");
                self.set_user(None);
            }
        }
    }

    /// Forgets the user and the persisted tokens. Returns where to go next.
    pub fn logout(&mut self, tokens: &dyn TokenStore) -> Route {
        if let Err(err) = tokens.clear() {
            warn!(error = %err, "failed to clear persisted tokens");
        }
        if let Some(user) = self.user.take() {
            info!(user = %user.email, "logged out");
        }
        self.loading = false;
        Route::Login
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pki_api::{MemoryTokenStore, Tokens};
    use pretty_assertions::assert_eq;

    fn user() -> User {
        User {
            id: "7".into(),
            email: "paul@pki.cm".into(),
            first_name: "Paul".into(),
            last_name: "Biya".into(),
            role: Role::User,
            is_active: true,
            email_verified: true,
            created_at: String::new(),
            last_login: None,
        }
    }

    #[test]
    fn without_token_no_profile_call() {
        let mut session = Session::new();
        assert!(!session.begin_hydration(false));
        assert!(!session.is_loading());
        assert!(!session.is_authenticated());
    }

    #[test]
    fn hydration_success_authenticates() {
        let mut session = Session::new();
        assert!(session.begin_hydration(true));
        assert!(session.is_loading());
        session.finish_hydration(Ok(user()));
        assert!(!session.is_loading());
        assert_eq!(session.role(), Some(Role::User));
    }

    #[test]
    fn hydration_failure_is_silent_and_anonymous() {
        let mut session = Session::new();
        session.begin_hydration(true);
        session.finish_hydration(Err(TaskError::unauthorized()));
        assert!(!session.is_loading());
        assert!(!session.is_authenticated());
    }

    #[test]
    fn logout_clears_tokens_and_user() {
        let store = MemoryTokenStore::with_tokens(Tokens {
            access_token: "a".into(),
            refresh_token: "r".into(),
        });
        let mut session = Session::new();
        session.set_user(Some(user()));

        assert_eq!(session.logout(&store), Route::Login);
        assert!(!session.is_authenticated());
        assert_eq!(store.load(), None);
    }
}
