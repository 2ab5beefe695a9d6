//! Configuration options for the Poultry Hub client

use std::time::Duration;

use crate::error::Error;

/// How anonymous consultations are counted against the free allowance
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QuotaScope {
    /// Every anonymous consultation in the system counts, whoever made it
    Global,

    /// Only anonymous consultations tagged with this device token count
    Device(String),
}

impl QuotaScope {
    /// Scope to a freshly generated device token
    pub fn new_device() -> Self {
        QuotaScope::Device(uuid::Uuid::new_v4().to_string())
    }

    /// The device token, if scoped to one
    pub fn device_id(&self) -> Option<&str> {
        match self {
            QuotaScope::Global => None,
            QuotaScope::Device(id) => Some(id),
        }
    }
}

/// Configuration options for the Poultry Hub client
#[derive(Debug, Clone)]
pub struct ClientOptions {
    /// Whether sign-in results are kept as the current session
    pub persist_session: bool,

    /// Timeout applied to every HTTP request
    pub request_timeout: Option<Duration>,

    /// The database schema
    pub db_schema: String,

    /// How long a notification stays visible
    pub notification_display: Duration,

    /// How long a hidden notification keeps its content for the exit transition
    pub notification_fade: Duration,

    /// Free consultations before sign-in is required
    pub anonymous_consultation_limit: u32,

    /// Counting scope for anonymous consultations
    pub quota_scope: QuotaScope,

    /// Generative-language model name
    pub gemini_model: String,

    /// Generative-language API base URL
    pub gemini_base_url: String,

    /// Weather API base URL
    pub weather_base_url: String,

    /// Temperature (°C) above which heat-stress alerts are raised
    pub heat_stress_threshold_c: f64,

    /// Time allowed per quiz question
    pub quiz_question_time_limit: Duration,

    /// Score percentage that unlocks the quiz badge
    pub quiz_badge_threshold_percent: u32,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            persist_session: true,
            request_timeout: Some(Duration::from_secs(30)),
            db_schema: "public".to_string(),
            notification_display: Duration::from_millis(3000),
            notification_fade: Duration::from_millis(300),
            anonymous_consultation_limit: 2,
            quota_scope: QuotaScope::Global,
            gemini_model: "gemini-pro".to_string(),
            gemini_base_url: "https://generativelanguage.googleapis.com".to_string(),
            weather_base_url: "https://api.open-meteo.com".to_string(),
            heat_stress_threshold_c: 35.0,
            quiz_question_time_limit: Duration::from_secs(30),
            quiz_badge_threshold_percent: 90,
        }
    }
}

impl ClientOptions {
    /// Set whether to persist the session
    pub fn with_persist_session(mut self, value: bool) -> Self {
        self.persist_session = value;
        self
    }

    /// Set the request timeout
    pub fn with_request_timeout(mut self, value: Option<Duration>) -> Self {
        self.request_timeout = value;
        self
    }

    /// Set the database schema
    pub fn with_db_schema(mut self, value: &str) -> Self {
        self.db_schema = value.to_string();
        self
    }

    /// Set the notification display and fade durations
    pub fn with_notification_timing(mut self, display: Duration, fade: Duration) -> Self {
        self.notification_display = display;
        self.notification_fade = fade;
        self
    }

    /// Set the number of free anonymous consultations
    pub fn with_anonymous_consultation_limit(mut self, value: u32) -> Self {
        self.anonymous_consultation_limit = value;
        self
    }

    /// Set the anonymous consultation counting scope
    pub fn with_quota_scope(mut self, value: QuotaScope) -> Self {
        self.quota_scope = value;
        self
    }

    /// Set the generative-language model
    pub fn with_gemini_model(mut self, value: &str) -> Self {
        self.gemini_model = value.to_string();
        self
    }

    /// Set the generative-language API base URL
    pub fn with_gemini_base_url(mut self, value: &str) -> Self {
        self.gemini_base_url = value.trim_end_matches('/').to_string();
        self
    }

    /// Set the weather API base URL
    pub fn with_weather_base_url(mut self, value: &str) -> Self {
        self.weather_base_url = value.trim_end_matches('/').to_string();
        self
    }

    /// Set the heat-stress alert threshold
    pub fn with_heat_stress_threshold(mut self, celsius: f64) -> Self {
        self.heat_stress_threshold_c = celsius;
        self
    }

    /// Set the quiz timing and badge threshold
    pub fn with_quiz_rules(mut self, time_limit: Duration, badge_threshold_percent: u32) -> Self {
        self.quiz_question_time_limit = time_limit;
        self.quiz_badge_threshold_percent = badge_threshold_percent;
        self
    }
}

/// Connection settings read from the environment
#[derive(Debug, Clone)]
pub struct Config {
    /// Project URL of the auth/data backend
    pub supabase_url: String,

    /// Anonymous API key of the backend
    pub supabase_key: String,

    /// API key for the generative-language endpoint
    pub gemini_api_key: String,

    /// Client options, with the weather base URL overridden when configured
    pub options: ClientOptions,
}

impl Config {
    /// Load `.env` (if present) and read the connection settings.
    ///
    /// Requires `SUPABASE_URL`, `SUPABASE_KEY` and `GEMINI_API_KEY`;
    /// `WEATHER_BASE_URL` and `GEMINI_MODEL` are optional.
    pub fn from_env() -> Result<Self, Error> {
        dotenv::dotenv().ok();

        let mut options = ClientOptions::default();
        if let Ok(url) = std::env::var("WEATHER_BASE_URL") {
            options = options.with_weather_base_url(&url);
        }
        if let Ok(model) = std::env::var("GEMINI_MODEL") {
            options = options.with_gemini_model(&model);
        }

        Ok(Self {
            supabase_url: required_var("SUPABASE_URL")?,
            supabase_key: required_var("SUPABASE_KEY")?,
            gemini_api_key: required_var("GEMINI_API_KEY")?,
            options,
        })
    }
}

fn required_var(name: &str) -> Result<String, Error> {
    match std::env::var(name) {
        Ok(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(Error::general(format!("{} must be set", name))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_app_behavior() {
        let options = ClientOptions::default();
        assert_eq!(options.notification_display, Duration::from_millis(3000));
        assert_eq!(options.notification_fade, Duration::from_millis(300));
        assert_eq!(options.anonymous_consultation_limit, 2);
        assert_eq!(options.quota_scope, QuotaScope::Global);
        assert_eq!(options.request_timeout, Some(Duration::from_secs(30)));
    }

    #[test]
    fn builder_trims_base_urls() {
        let options = ClientOptions::default()
            .with_weather_base_url("http://localhost:9000/")
            .with_gemini_base_url("http://localhost:9001/");
        assert_eq!(options.weather_base_url, "http://localhost:9000");
        assert_eq!(options.gemini_base_url, "http://localhost:9001");
    }

    #[test]
    fn device_scope_carries_token() {
        let scope = QuotaScope::new_device();
        assert!(scope.device_id().is_some());
        assert!(QuotaScope::Global.device_id().is_none());
    }
}
