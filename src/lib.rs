//! Poultry Hub client library
//!
//! Service and state layer of the Poultry Hub marketplace and health-advisory
//! app: cart, auth session, consultation quota, notifications, record access,
//! AI health consultations, weather alerts and the training quiz.

pub mod auth;
pub mod auth_state;
pub mod cart;
pub mod config;
pub mod error;
pub mod fetch;
pub mod health;
pub mod models;
pub mod notification;
pub mod postgrest;
pub mod quiz;
pub mod quota;
pub mod realtime;
pub mod records;
pub mod validation;
pub mod weather;

use reqwest::Client;
use std::sync::{Arc, RwLock};

use crate::auth::Auth;
use crate::auth_state::AuthContext;
use crate::cart::Cart;
use crate::config::{ClientOptions, Config};
use crate::error::Error;
use crate::health::{GeminiClient, HealthConsultant, LanguageModel};
use crate::notification::NotificationChannel;
use crate::postgrest::PostgrestClient;
use crate::quiz::{Question, QuizSession};
use crate::quota::ConsultationQuota;
use crate::realtime::RealtimeClient;
use crate::records::{Consultations, Profiles, Tips};
use crate::weather::{heat_stress_alerts, WeatherAlert, WeatherClient};

/// Process-wide services, built once at startup and shared by every screen
pub struct PoultryHub {
    /// The base URL for the backend project
    pub url: String,
    /// The anonymous API key for the backend project
    pub key: String,
    /// HTTP client shared by every service
    pub http_client: Client,
    /// Auth client for user management and authentication
    pub auth: Auth,
    /// Client options
    pub options: ClientOptions,
    gemini_api_key: Option<String>,
    cart: Arc<RwLock<Cart>>,
    notifications: Arc<NotificationChannel>,
}

impl PoultryHub {
    /// Create a new client with default options
    ///
    /// # Example
    ///
    /// ```
    /// use poultry_hub_client::PoultryHub;
    ///
    /// let hub = PoultryHub::new("https://your-project-url.supabase.co", "your-anon-key").unwrap();
    /// assert!(hub.cart().read().unwrap().is_empty());
    /// ```
    pub fn new(url: &str, key: &str) -> Result<Self, Error> {
        Self::new_with_options(url, key, ClientOptions::default())
    }

    /// Create a new client with custom options
    pub fn new_with_options(url: &str, key: &str, options: ClientOptions) -> Result<Self, Error> {
        let mut builder = Client::builder();
        if let Some(timeout) = options.request_timeout {
            builder = builder.timeout(timeout);
        }
        let http_client = builder.build()?;

        let auth = Auth::new(url, key, http_client.clone(), options.clone());
        let notifications = Arc::new(NotificationChannel::new(
            options.notification_display,
            options.notification_fade,
        ));

        Ok(Self {
            url: url.trim_end_matches('/').to_string(),
            key: key.to_string(),
            http_client,
            auth,
            options,
            gemini_api_key: None,
            cart: Arc::new(RwLock::new(Cart::new())),
            notifications,
        })
    }

    /// Create a client from environment settings
    pub fn from_config(config: Config) -> Result<Self, Error> {
        let mut hub = Self::new_with_options(&config.supabase_url, &config.supabase_key, config.options)?;
        hub.gemini_api_key = Some(config.gemini_api_key);
        Ok(hub)
    }

    /// Set the API key used by `health_consultant`
    pub fn with_gemini_api_key(mut self, api_key: &str) -> Self {
        self.gemini_api_key = Some(api_key.to_string());
        self
    }

    /// Get a reference to the auth client
    pub fn auth(&self) -> &Auth {
        &self.auth
    }

    /// App-wide auth state subscribed to this client's auth events.
    /// Must be called from within a tokio runtime.
    pub fn auth_context(&self) -> AuthContext {
        AuthContext::new(Arc::new(self.auth.clone()))
    }

    /// The shared cart
    pub fn cart(&self) -> Arc<RwLock<Cart>> {
        self.cart.clone()
    }

    /// The shared notification slot
    pub fn notifications(&self) -> Arc<NotificationChannel> {
        self.notifications.clone()
    }

    /// Table access. Every request carries the token of whoever is signed in
    /// when it is sent, or the anonymous key.
    ///
    /// # Example
    ///
    /// ```
    /// use poultry_hub_client::PoultryHub;
    ///
    /// let hub = PoultryHub::new("https://your-project-url.supabase.co", "your-anon-key").unwrap();
    /// let tips = hub.from("tips");
    /// ```
    pub fn from(&self, table: &str) -> PostgrestClient {
        let client = PostgrestClient::new(
            &self.url,
            &self.key,
            table,
            &self.options.db_schema,
            self.http_client.clone(),
        );
        client.with_session(self.auth.shared_session())
    }

    /// Realtime client for table change subscriptions; channels join as the
    /// user signed in at subscription time
    pub fn realtime(&self) -> RealtimeClient {
        RealtimeClient::new(&self.url, &self.key).with_session(self.auth.shared_session())
    }

    pub fn profiles(&self) -> Profiles {
        Profiles::new(self.from(Profiles::TABLE))
    }

    pub fn consultations(&self) -> Consultations {
        Consultations::new(self.from(Consultations::TABLE))
    }

    pub fn tips(&self) -> Tips {
        Tips::new(self.from(Tips::TABLE), &self.options.db_schema)
    }

    /// Anonymous consultation allowance, scoped as configured
    pub fn quota(&self) -> ConsultationQuota {
        ConsultationQuota::new(
            Arc::new(self.consultations()),
            self.options.quota_scope.clone(),
            self.options.anonymous_consultation_limit,
        )
    }

    pub fn weather(&self) -> WeatherClient {
        WeatherClient::new(self.http_client.clone(), &self.options.weather_base_url)
    }

    /// Current heat-stress alerts at a coordinate, using the configured threshold
    pub async fn weather_alerts(&self, latitude: f64, longitude: f64) -> Result<Vec<WeatherAlert>, Error> {
        let conditions = self.weather().current(latitude, longitude).await?;
        Ok(heat_stress_alerts(&conditions, self.options.heat_stress_threshold_c))
    }

    /// Start a quiz with the configured time limit and badge threshold
    pub fn quiz(&self, questions: Vec<Question>) -> Result<QuizSession, Error> {
        QuizSession::new(
            questions,
            self.options.quiz_question_time_limit,
            self.options.quiz_badge_threshold_percent,
        )
    }

    /// The configured Gemini model; requires an API key
    pub fn gemini(&self) -> Result<GeminiClient, Error> {
        let api_key = self
            .gemini_api_key
            .as_deref()
            .ok_or_else(|| Error::general("GEMINI_API_KEY is not configured"))?;
        Ok(GeminiClient::new(
            self.http_client.clone(),
            &self.options.gemini_base_url,
            &self.options.gemini_model,
            api_key,
        ))
    }

    /// Consultation flow using the configured Gemini model
    pub fn health_consultant(&self) -> Result<HealthConsultant, Error> {
        Ok(self.health_consultant_with(Arc::new(self.gemini()?)))
    }

    /// Consultation flow using any language model
    pub fn health_consultant_with(&self, model: Arc<dyn LanguageModel>) -> HealthConsultant {
        HealthConsultant::new(model, Arc::new(self.consultations()), self.quota())
    }
}

/// A convenience module for common imports
pub mod prelude {
    pub use crate::auth::{AuthEvent, OAuthProvider, Session, User};
    pub use crate::auth_state::{AuthContext, AuthSnapshot};
    pub use crate::cart::{Cart, CartItem, Product};
    pub use crate::config::{ClientOptions, Config, QuotaScope};
    pub use crate::error::Error;
    pub use crate::health::HealthConsultant;
    pub use crate::models::{ConsultationRecord, HealthAdvice, Tip, UserProfile, UserRole};
    pub use crate::notification::{NotificationChannel, Severity};
    pub use crate::quiz::{Question, QuizSession};
    pub use crate::quota::{ConsultationQuota, QuotaStatus};
    pub use crate::weather::{CurrentConditions, WeatherAlert};
    pub use crate::PoultryHub;
}
