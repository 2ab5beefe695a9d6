//! Types for authentication and user management

use serde::{Deserialize, Serialize};

use super::session::Session;
use crate::error::Error;

/// User data
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    /// The user ID
    pub id: String,

    /// The user's email address
    #[serde(default)]
    pub email: Option<String>,

    /// The user's phone number
    #[serde(default)]
    pub phone: Option<String>,

    /// The user's role
    #[serde(default)]
    pub role: Option<String>,

    /// The app metadata
    #[serde(default)]
    pub app_metadata: serde_json::Value,

    /// The user metadata
    #[serde(default)]
    pub user_metadata: serde_json::Value,

    /// When the email was confirmed
    #[serde(default)]
    pub email_confirmed_at: Option<String>,

    /// The last sign-in time
    #[serde(default)]
    pub last_sign_in_at: Option<String>,

    /// The creation time
    #[serde(default)]
    pub created_at: Option<String>,

    /// The update time
    #[serde(default)]
    pub updated_at: Option<String>,
}

/// Result of a sign-up or sign-in call.
///
/// Sign-up returns only a user while the email still needs confirming, so
/// either side may be absent.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthResponse {
    /// The user data
    pub user: Option<User>,

    /// The session data
    pub session: Option<Session>,
}

impl AuthResponse {
    /// Interpret an auth API response body
    pub(crate) fn from_value(value: serde_json::Value) -> Result<Self, Error> {
        if value.get("access_token").is_some() {
            let session: Session = serde_json::from_value(value)?;
            return Ok(Self {
                user: Some(session.user.clone()),
                session: Some(session.with_expiry()),
            });
        }

        if let Some(user) = value.get("user").filter(|u| u.is_object()) {
            let user: User = serde_json::from_value(user.clone())?;
            return Ok(Self {
                user: Some(user),
                session: None,
            });
        }

        if value.get("id").is_some() {
            let user: User = serde_json::from_value(value)?;
            return Ok(Self {
                user: Some(user),
                session: None,
            });
        }

        Err(Error::parse("auth response carried neither a session nor a user"))
    }
}

/// User attributes that can be updated
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserAttributes {
    /// Email address
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    /// Password
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,

    /// User metadata
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

/// OAuth providers offered on the sign-in screen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OAuthProvider {
    Google,
    Facebook,
}

impl OAuthProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Google => "google",
            Self::Facebook => "facebook",
        }
    }
}

/// OAuth sign-in settings
#[derive(Debug, Clone, Default)]
pub struct OAuthSignInOptions {
    /// Deep link the provider redirects back to
    pub redirect_to: Option<String>,

    /// Space-separated provider scopes
    pub scopes: Option<String>,
}

/// Kind of auth state transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthEvent {
    /// Delivered once to each new subscriber with the current session
    InitialSession,
    SignedIn,
    SignedOut,
    TokenRefreshed,
    UserUpdated,
    PasswordRecovery,
}

/// Notification pushed to auth state subscribers
#[derive(Debug, Clone, PartialEq)]
pub struct AuthChangeEvent {
    pub event: AuthEvent,
    pub session: Option<Session>,
}

impl AuthChangeEvent {
    /// The user carried by the event, if signed in
    pub fn user(&self) -> Option<&User> {
        self.session.as_ref().map(|s| &s.user)
    }
}
