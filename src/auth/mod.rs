//! Authentication and user management against the backend auth API

mod provider;
mod session;
mod types;

use async_trait::async_trait;
use log::{debug, info, warn};
use reqwest::Client;
use serde_json::json;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use tokio::sync::mpsc;
use url::Url;

use crate::config::ClientOptions;
use crate::error::Error;
use crate::fetch::Fetch;

pub use provider::*;
pub use session::*;
pub use types::*;

/// Client for the backend auth API
#[derive(Clone)]
pub struct Auth {
    /// The base URL for the project
    url: String,

    /// The anonymous API key for the project
    key: String,

    /// HTTP client used for requests
    client: Client,

    /// The current session
    session: SharedSession,

    /// Live auth state subscribers
    listeners: Arc<Mutex<Vec<mpsc::UnboundedSender<AuthChangeEvent>>>>,

    /// Client options
    options: ClientOptions,
}

impl Auth {
    /// Create a new Auth client
    pub fn new(url: &str, key: &str, client: Client, options: ClientOptions) -> Self {
        Self {
            url: url.trim_end_matches('/').to_string(),
            key: key.to_string(),
            client,
            session: Arc::new(RwLock::new(None)),
            listeners: Arc::new(Mutex::new(Vec::new())),
            options,
        }
    }

    fn get_auth_url(&self, path: &str) -> String {
        format!("{}/auth/v1{}", self.url, path)
    }

    fn access_token(&self) -> Result<String, Error> {
        self.get_session()
            .map(|s| s.access_token)
            .ok_or_else(|| Error::provider(401, Some("session_missing".into()), "Not logged in"))
    }

    /// Store the session (when persisting) and notify subscribers.
    ///
    /// The listener lock is taken first, here and in `subscribe`, so every
    /// subscriber sees transitions in the order the session was written.
    fn apply_session(&self, session: Option<Session>, event: AuthEvent) {
        let mut listeners = self.listeners.lock().unwrap_or_else(PoisonError::into_inner);
        if session.is_none() || self.options.persist_session {
            let mut current = self.session.write().unwrap_or_else(PoisonError::into_inner);
            *current = session.clone();
        }

        let change = AuthChangeEvent { event, session };
        let before = listeners.len();
        listeners.retain(|tx| tx.send(change.clone()).is_ok());
        if listeners.len() < before {
            debug!("Pruned {} closed auth subscribers", before - listeners.len());
        }
        debug!("Auth state {:?} delivered to {} subscribers", change.event, listeners.len());
    }

    /// Sign up a new user with email and password
    pub async fn sign_up(&self, email: &str, password: &str) -> Result<AuthResponse, Error> {
        let url = self.get_auth_url("/signup");

        let value = Fetch::post(&self.client, &url)
            .api_key(&self.key)
            .json(&json!({ "email": email, "password": password }))?
            .execute::<serde_json::Value>()
            .await?;

        let response = AuthResponse::from_value(value)?;
        if let Some(session) = &response.session {
            info!("Signed up and signed in user {}", session.user.id);
            self.apply_session(Some(session.clone()), AuthEvent::SignedIn);
        } else {
            info!("Signed up user pending email confirmation");
        }

        Ok(response)
    }

    /// Sign in a user with email and password
    pub async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<AuthResponse, Error> {
        let url = self.get_auth_url("/token");

        let value = Fetch::post(&self.client, &url)
            .api_key(&self.key)
            .query([("grant_type", "password")])
            .json(&json!({ "email": email, "password": password }))?
            .execute::<serde_json::Value>()
            .await?;

        let response = AuthResponse::from_value(value)?;
        if let Some(session) = &response.session {
            info!("Signed in user {}", session.user.id);
            self.apply_session(Some(session.clone()), AuthEvent::SignedIn);
        }

        Ok(response)
    }

    /// Sign out the current user.
    ///
    /// Without a session this only notifies subscribers. A token the server no
    /// longer recognises (401/403/404) counts as signed out.
    pub async fn sign_out(&self) -> Result<(), Error> {
        let token = match self.get_session() {
            Some(session) => session.access_token,
            None => {
                self.apply_session(None, AuthEvent::SignedOut);
                return Ok(());
            }
        };

        let url = self.get_auth_url("/logout");
        let result = Fetch::post(&self.client, &url)
            .api_key(&self.key)
            .bearer_auth(&token)
            .execute_checked()
            .await;

        match result {
            Ok(_) => {}
            Err(Error::Provider(err)) if matches!(err.status, 401 | 403 | 404) => {
                warn!("Logout with stale token ({}), clearing local session", err.status);
            }
            Err(e) => return Err(e),
        }

        info!("Signed out");
        self.apply_session(None, AuthEvent::SignedOut);
        Ok(())
    }

    /// Send a password reset email
    pub async fn reset_password_for_email(
        &self,
        email: &str,
        redirect_to: Option<&str>,
    ) -> Result<(), Error> {
        let url = self.get_auth_url("/recover");

        let mut fetch = Fetch::post(&self.client, &url).api_key(&self.key);
        if let Some(redirect_to) = redirect_to {
            fetch = fetch.query([("redirect_to", redirect_to)]);
        }

        fetch
            .json(&json!({ "email": email }))?
            .execute_checked()
            .await?;

        Ok(())
    }

    /// Get the user data for the currently authenticated user
    pub async fn get_user(&self) -> Result<User, Error> {
        let token = self.access_token()?;
        self.fetch_user(&token).await
    }

    async fn fetch_user(&self, token: &str) -> Result<User, Error> {
        let url = self.get_auth_url("/user");

        Fetch::get(&self.client, &url)
            .api_key(&self.key)
            .bearer_auth(token)
            .execute::<User>()
            .await
    }

    /// Update the user data
    pub async fn update_user(&self, attributes: UserAttributes) -> Result<User, Error> {
        let token = self.access_token()?;
        let url = self.get_auth_url("/user");

        let user = Fetch::put(&self.client, &url)
            .api_key(&self.key)
            .bearer_auth(&token)
            .json(&attributes)?
            .execute::<User>()
            .await?;

        let updated = self.get_session().map(|mut session| {
            session.user = user.clone();
            session
        });
        if updated.is_some() {
            self.apply_session(updated, AuthEvent::UserUpdated);
        }

        Ok(user)
    }

    /// Build the URL that starts an OAuth sign-in
    pub fn get_oauth_sign_in_url(
        &self,
        provider: OAuthProvider,
        options: Option<OAuthSignInOptions>,
    ) -> String {
        let options = options.unwrap_or_default();

        let mut url = format!("{}?provider={}", self.get_auth_url("/authorize"), provider.as_str());

        if let Some(redirect_to) = options.redirect_to {
            url.push_str(&format!("&redirect_to={}", urlencoding::encode(&redirect_to)));
        }

        if let Some(scopes) = options.scopes {
            url.push_str(&format!("&scopes={}", urlencoding::encode(&scopes)));
        }

        url
    }

    /// Finish an OAuth sign-in from the redirect URL the provider sent back.
    ///
    /// The tokens travel in the URL fragment; the user is fetched with the new
    /// access token before the session is stored.
    pub async fn complete_oauth_sign_in(&self, redirect_url: &str) -> Result<Session, Error> {
        let url = Url::parse(redirect_url)?;
        let fragment = url.fragment().unwrap_or_default();
        let params: HashMap<String, String> = url::form_urlencoded::parse(fragment.as_bytes())
            .into_owned()
            .collect();

        if let Some(description) = params.get("error_description") {
            return Err(Error::provider(
                400,
                params.get("error").cloned(),
                description,
            ));
        }

        let access_token = params
            .get("access_token")
            .ok_or_else(|| Error::parse("redirect URL has no access_token"))?;
        let refresh_token = params.get("refresh_token").cloned().unwrap_or_default();
        let expires_in = params
            .get("expires_in")
            .and_then(|v| v.parse::<i64>().ok())
            .unwrap_or(3600);

        let user = self.fetch_user(access_token).await?;
        let session = Session::new(access_token.clone(), refresh_token, expires_in, user);

        let event = match params.get("type").map(String::as_str) {
            Some("recovery") => AuthEvent::PasswordRecovery,
            _ => AuthEvent::SignedIn,
        };
        info!("OAuth sign-in completed for user {}", session.user.id);
        self.apply_session(Some(session.clone()), event);

        Ok(session)
    }

    /// Get the current session
    pub fn get_session(&self) -> Option<Session> {
        let current = self.session.read().unwrap_or_else(PoisonError::into_inner);
        current.clone()
    }

    /// The live session slot; services holding it always act as the current user
    pub fn shared_session(&self) -> SharedSession {
        self.session.clone()
    }

    /// Replace the session, e.g. one restored by the host app
    pub fn set_session(&self, session: Session) {
        self.apply_session(Some(session), AuthEvent::SignedIn);
    }

    /// Subscribe to auth state changes
    pub fn subscribe(&self) -> AuthSubscription {
        let (tx, rx) = mpsc::unbounded_channel();
        // Held across the read so a concurrent transition is either seen here
        // or delivered to the new listener afterwards.
        let mut listeners = self.listeners.lock().unwrap_or_else(PoisonError::into_inner);
        let initial = AuthChangeEvent {
            event: AuthEvent::InitialSession,
            session: self.get_session(),
        };
        if tx.send(initial).is_ok() {
            listeners.push(tx);
        }
        AuthSubscription::new(rx)
    }
}

#[async_trait]
impl IdentityProvider for Auth {
    async fn sign_up(&self, email: &str, password: &str) -> Result<AuthResponse, Error> {
        Auth::sign_up(self, email, password).await
    }

    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<AuthResponse, Error> {
        Auth::sign_in_with_password(self, email, password).await
    }

    async fn sign_in_with_oauth(&self, provider: OAuthProvider) -> Result<String, Error> {
        Ok(self.get_oauth_sign_in_url(provider, None))
    }

    async fn sign_out(&self) -> Result<(), Error> {
        Auth::sign_out(self).await
    }

    async fn reset_password_for_email(&self, email: &str) -> Result<(), Error> {
        Auth::reset_password_for_email(self, email, None).await
    }

    async fn update_user(&self, attributes: UserAttributes) -> Result<User, Error> {
        Auth::update_user(self, attributes).await
    }

    fn on_auth_state_change(&self) -> AuthSubscription {
        self.subscribe()
    }
}
