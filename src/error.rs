//! Error handling for the Poultry Hub client

use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

/// Unified error type for the Poultry Hub client
#[derive(Error, Debug)]
pub enum Error {
    /// Network or HTTP transport errors (connection refused, timeout, ...)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization or deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Local form or argument validation failed
    #[error("Validation error: {0}")]
    Validation(ValidationErrors),

    /// A remote service (identity provider, record store, model API) rejected the call
    #[error("Provider error: {0}")]
    Provider(ProviderError),

    /// A remote response could not be interpreted
    #[error("Parse error: {0}")]
    Parse(String),

    /// Database query errors that are not provider rejections
    #[error("Database error: {0}")]
    Database(String),

    /// Realtime subscription errors
    #[error("Realtime error: {0}")]
    Realtime(String),

    /// The anonymous consultation allowance is used up
    #[error("Login required: {used} of {limit} free consultations used")]
    LoginRequired { used: u32, limit: u32 },

    /// URL parsing errors
    #[error("URL error: {0}")]
    Url(#[from] url::ParseError),

    /// General errors
    #[error("{0}")]
    General(String),
}

impl Error {
    /// Create a new provider error from its parts
    pub fn provider<T: fmt::Display>(status: u16, code: Option<String>, msg: T) -> Self {
        Error::Provider(ProviderError {
            status,
            code,
            message: msg.to_string(),
        })
    }

    /// Create a validation error for a single field
    pub fn validation<T: fmt::Display>(field: &str, msg: T) -> Self {
        let mut errors = ValidationErrors::new();
        errors.add(field, msg);
        Error::Validation(errors)
    }

    /// Create a new parse error
    pub fn parse<T: fmt::Display>(msg: T) -> Self {
        Error::Parse(msg.to_string())
    }

    /// Create a new database error
    pub fn database<T: fmt::Display>(msg: T) -> Self {
        Error::Database(msg.to_string())
    }

    /// Create a new realtime error
    pub fn realtime<T: fmt::Display>(msg: T) -> Self {
        Error::Realtime(msg.to_string())
    }

    /// Create a new general error
    pub fn general<T: fmt::Display>(msg: T) -> Self {
        Error::General(msg.to_string())
    }

    /// A stable message that is safe to put in front of a user.
    ///
    /// Provider text is never echoed back; known provider codes map to a fixed
    /// table and everything else collapses to a generic message.
    pub fn user_message(&self) -> String {
        match self {
            Error::Validation(errors) => errors
                .first_message()
                .unwrap_or("Please check the highlighted fields")
                .to_string(),
            Error::Provider(err) => err.user_message().to_string(),
            Error::Http(err) if err.is_timeout() => {
                "The request timed out. Please try again".to_string()
            }
            Error::Http(_) => "Network error. Please check your connection".to_string(),
            Error::Parse(_) => {
                "We could not understand the response. Please try again".to_string()
            }
            Error::LoginRequired { .. } => {
                "You have used your free consultations. Please sign in to continue".to_string()
            }
            _ => "An error occurred. Please try again".to_string(),
        }
    }
}

/// Rejection returned by a remote service
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderError {
    /// HTTP status of the rejected call
    pub status: u16,

    /// Machine-readable error code, when the provider supplied one
    pub code: Option<String>,

    /// Raw provider message
    pub message: String,
}

impl ProviderError {
    /// Map the provider code to a user-safe message
    pub fn user_message(&self) -> &'static str {
        let code = self.code.as_deref().unwrap_or_default();
        match code {
            "user_already_exists" | "email_exists" => "This email is already registered",
            "email_address_invalid" | "validation_failed" => "Please enter a valid email address",
            "signup_disabled" | "provider_disabled" | "email_provider_disabled" => {
                "This operation is not allowed"
            }
            "weak_password" => "Password should be at least 8 characters",
            "user_banned" => "This account has been disabled",
            "user_not_found" => "No account found with this email",
            "invalid_credentials" | "invalid_grant" => "Incorrect email or password",
            "email_not_confirmed" => "Please confirm your email address first",
            "over_request_rate_limit" | "over_email_send_rate_limit" => {
                "Too many attempts. Please try again later"
            }
            _ if self.status == 429 => "Too many attempts. Please try again later",
            _ => "An error occurred. Please try again",
        }
    }
}

impl fmt::Display for ProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.code {
            Some(code) => write!(f, "{} ({}): {}", self.status, code, self.message),
            None => write!(f, "{}: {}", self.status, self.message),
        }
    }
}

/// Per-field validation messages, in field order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors {
    fields: BTreeMap<String, String>,
}

impl ValidationErrors {
    /// Create an empty set
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a message for a field; the first message per field wins
    pub fn add<T: fmt::Display>(&mut self, field: &str, msg: T) {
        self.fields
            .entry(field.to_string())
            .or_insert_with(|| msg.to_string());
    }

    /// The message recorded for a field
    pub fn get(&self, field: &str) -> Option<&str> {
        self.fields.get(field).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    fn first_message(&self) -> Option<&str> {
        self.fields.values().next().map(String::as_str)
    }

    /// `Ok(())` when nothing was recorded, otherwise `Error::Validation`
    pub fn into_result(self) -> Result<(), Error> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(Error::Validation(self))
        }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .fields
            .iter()
            .map(|(field, msg)| format!("{}: {}", field, msg))
            .collect();
        write!(f, "{}", parts.join(", "))
    }
}
