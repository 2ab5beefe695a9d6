//! Rows stored in the backend tables

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Structured poultry-health advice
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthAdvice {
    /// Most likely disease or problem
    pub suspected_issue: String,

    /// Immediate steps to take
    pub action_plan: String,

    /// Low-cost, locally available remedy
    pub natural_remedy: String,

    /// General husbandry tip
    pub tip: String,
}

/// A stored consultation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsultationRecord {
    pub id: String,

    /// Author, or `None` for an anonymous consultation
    #[serde(default)]
    pub user_id: Option<String>,

    /// Device token of an anonymous author, when device-scoped counting is on
    #[serde(default)]
    pub device_id: Option<String>,

    pub question: String,
    pub response: HealthAdvice,

    /// Feedback left by the user, if any
    #[serde(default)]
    pub is_helpful: Option<bool>,

    pub created_at: DateTime<Utc>,
}

/// A consultation ready to be stored
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewConsultation {
    pub user_id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_id: Option<String>,

    pub question: String,
    pub response: HealthAdvice,
    pub created_at: DateTime<Utc>,
}

impl NewConsultation {
    pub fn new(question: &str, response: HealthAdvice, user_id: Option<&str>) -> Self {
        Self {
            user_id: user_id.map(str::to_string),
            device_id: None,
            question: question.to_string(),
            response,
            created_at: Utc::now(),
        }
    }

    /// Tag the consultation with a device token
    pub fn with_device_id(mut self, device_id: Option<&str>) -> Self {
        self.device_id = device_id.map(str::to_string);
        self
    }
}

/// Role of an app user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Admin,
    Farmer,
    Buyer,
}

/// Profile row in the `users` table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: String,
    pub email: String,
    pub name: String,
    pub role: UserRole,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields of a new profile
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewProfile {
    /// Identity provider user id; generated by the table when absent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub email: String,
    pub name: String,
    pub role: UserRole,
}

/// Partial profile update; unset fields are left untouched
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<UserRole>,
}

/// A daily husbandry tip
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tip {
    pub id: String,
    pub title: String,
    pub content: String,

    #[serde(default)]
    pub image_url: Option<String>,

    #[serde(default)]
    pub icon: Option<String>,

    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}
