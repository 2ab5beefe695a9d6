//! App-wide auth state mirrored from the identity provider

use log::{error, info};
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::auth::{AuthResponse, IdentityProvider, OAuthProvider, User, UserAttributes};
use crate::error::Error;

/// Point-in-time view of the auth state
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AuthSnapshot {
    /// The signed-in user, if any
    pub user: Option<User>,

    /// True until the provider delivers its first notification
    pub loading: bool,

    /// User-safe message of the last failed auth call
    pub last_error: Option<String>,
}

impl AuthSnapshot {
    pub fn user_id(&self) -> Option<&str> {
        self.user.as_ref().map(|u| u.id.as_str())
    }

    pub fn is_authenticated(&self) -> bool {
        self.user.is_some()
    }
}

/// Where an OAuth sign-in continues
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OAuthRedirect {
    pub provider: OAuthProvider,
    pub url: String,
}

/// Session wrapper shared by every screen.
///
/// Subscribes to the provider once at construction; each notification replaces
/// the local user and clears `loading`. There is no timeout, so a provider that
/// never calls back leaves `loading` set.
pub struct AuthContext {
    provider: Arc<dyn IdentityProvider>,
    state: Arc<watch::Sender<AuthSnapshot>>,
    listener: JoinHandle<()>,
}

impl AuthContext {
    /// Subscribe to `provider`. Must be called from within a tokio runtime.
    pub fn new(provider: Arc<dyn IdentityProvider>) -> Self {
        let (tx, _rx) = watch::channel(AuthSnapshot {
            user: None,
            loading: true,
            last_error: None,
        });
        let state = Arc::new(tx);

        let mut subscription = provider.on_auth_state_change();
        let listener_state = state.clone();
        let listener = tokio::spawn(async move {
            while let Some(change) = subscription.recv().await {
                info!("Auth state changed: {:?}", change.event);
                let user = change.session.map(|s| s.user);
                listener_state.send_modify(|snapshot| {
                    snapshot.user = user;
                    snapshot.loading = false;
                });
            }
        });

        Self {
            provider,
            state,
            listener,
        }
    }

    /// The current auth state
    pub fn snapshot(&self) -> AuthSnapshot {
        self.state.borrow().clone()
    }

    /// Observe auth state transitions
    pub fn watch(&self) -> watch::Receiver<AuthSnapshot> {
        self.state.subscribe()
    }

    /// The signed-in user, if any
    pub fn user(&self) -> Option<User> {
        self.state.borrow().user.clone()
    }

    /// Wait until the provider has delivered its first notification
    pub async fn wait_until_ready(&self) -> AuthSnapshot {
        let mut rx = self.state.subscribe();
        // The sender lives as long as self, so this cannot fail while borrowed.
        let ready = rx.wait_for(|s| !s.loading).await.map(|s| s.clone());
        ready.unwrap_or_else(|_| self.snapshot())
    }

    fn record<T>(&self, operation: &str, result: Result<T, Error>) -> Result<T, Error> {
        match &result {
            Ok(_) => self.state.send_if_modified(|s| s.last_error.take().is_some()),
            Err(e) => {
                error!("{} failed: {}", operation, e);
                let message = e.user_message();
                self.state.send_modify(|s| s.last_error = Some(message));
                false
            }
        };
        result
    }

    fn set_user(&self, user: Option<User>) {
        self.state.send_modify(|s| s.user = user);
    }

    /// Sign in with email and password
    pub async fn login(&self, email: &str, password: &str) -> Result<AuthResponse, Error> {
        let result = self.provider.sign_in_with_password(email, password).await;
        let response = self.record("login", result)?;
        if response.session.is_some() {
            self.set_user(response.user.clone());
        }
        Ok(response)
    }

    /// Register a new account
    pub async fn register(&self, email: &str, password: &str) -> Result<AuthResponse, Error> {
        let result = self.provider.sign_up(email, password).await;
        let response = self.record("register", result)?;
        if response.session.is_some() {
            self.set_user(response.user.clone());
        }
        Ok(response)
    }

    /// Sign out.
    ///
    /// The local user is cleared only after the provider confirms; on failure
    /// the user stays signed in locally and the error is returned.
    pub async fn logout(&self) -> Result<(), Error> {
        let result = self.provider.sign_out().await;
        self.record("logout", result)?;
        self.set_user(None);
        Ok(())
    }

    /// Send a password reset email
    pub async fn reset_password(&self, email: &str) -> Result<(), Error> {
        let result = self.provider.reset_password_for_email(email).await;
        self.record("reset_password", result)
    }

    /// Start a Google sign-in; the session arrives later through a notification
    pub async fn login_with_google(&self) -> Result<OAuthRedirect, Error> {
        self.login_with_oauth(OAuthProvider::Google).await
    }

    /// Start a Facebook sign-in; the session arrives later through a notification
    pub async fn login_with_facebook(&self) -> Result<OAuthRedirect, Error> {
        self.login_with_oauth(OAuthProvider::Facebook).await
    }

    async fn login_with_oauth(&self, provider: OAuthProvider) -> Result<OAuthRedirect, Error> {
        let result = self.provider.sign_in_with_oauth(provider).await;
        let url = self.record("oauth sign-in", result)?;
        Ok(OAuthRedirect { provider, url })
    }

    /// Update email, password or profile metadata of the signed-in user
    pub async fn update_profile(&self, attributes: UserAttributes) -> Result<User, Error> {
        let result = self.provider.update_user(attributes).await;
        let user = self.record("update_profile", result)?;
        self.set_user(Some(user.clone()));
        Ok(user)
    }
}

impl Drop for AuthContext {
    fn drop(&mut self) {
        self.listener.abort();
    }
}
