//! Identity provider seam used by the auth state wrapper

use async_trait::async_trait;
use tokio::sync::mpsc;

use super::types::{AuthChangeEvent, AuthResponse, OAuthProvider, User, UserAttributes};
use crate::error::Error;

/// Receiving end of an auth state subscription.
///
/// Dropping it unsubscribes.
#[derive(Debug)]
pub struct AuthSubscription {
    receiver: mpsc::UnboundedReceiver<AuthChangeEvent>,
}

impl AuthSubscription {
    pub fn new(receiver: mpsc::UnboundedReceiver<AuthChangeEvent>) -> Self {
        Self { receiver }
    }

    /// Wait for the next auth state change; `None` once the provider is gone
    pub async fn recv(&mut self) -> Option<AuthChangeEvent> {
        self.receiver.recv().await
    }
}

/// Operations the app needs from an identity provider
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Register with email and password
    async fn sign_up(&self, email: &str, password: &str) -> Result<AuthResponse, Error>;

    /// Sign in with email and password
    async fn sign_in_with_password(&self, email: &str, password: &str)
        -> Result<AuthResponse, Error>;

    /// Start an OAuth sign-in, returning the URL the user must visit
    async fn sign_in_with_oauth(&self, provider: OAuthProvider) -> Result<String, Error>;

    /// End the current session at the provider
    async fn sign_out(&self) -> Result<(), Error>;

    /// Send a password reset email
    async fn reset_password_for_email(&self, email: &str) -> Result<(), Error>;

    /// Update the signed-in user
    async fn update_user(&self, attributes: UserAttributes) -> Result<User, Error>;

    /// Subscribe to auth state changes; the current state is delivered first
    fn on_auth_state_change(&self) -> AuthSubscription;
}
