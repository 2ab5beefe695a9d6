//! Poultry health consultations backed by a language model

mod gemini;
mod parse;

use async_trait::async_trait;
use log::{error, info};
use serde_json::Value;
use std::sync::Arc;

pub use gemini::GeminiClient;
pub use parse::{advice_schema, build_prompt, parse_advice};

use crate::error::Error;
use crate::models::{ConsultationRecord, HealthAdvice, NewConsultation};
use crate::quota::ConsultationQuota;
use crate::records::ConsultationStore;
use crate::validation::validate_consultation_question;

/// Single-shot text generation
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Generate a reply to `prompt`, asking for JSON matching `response_schema` when given
    async fn generate(&self, prompt: &str, response_schema: Option<&Value>) -> Result<String, Error>;
}

/// Runs a consultation end to end: validate, gate, generate, parse, store.
#[derive(Clone)]
pub struct HealthConsultant {
    model: Arc<dyn LanguageModel>,
    store: Arc<dyn ConsultationStore>,
    quota: ConsultationQuota,
}

impl HealthConsultant {
    pub fn new(
        model: Arc<dyn LanguageModel>,
        store: Arc<dyn ConsultationStore>,
        quota: ConsultationQuota,
    ) -> Self {
        Self { model, store, quota }
    }

    /// Ask the model without storing anything
    pub async fn analyze(&self, question: &str) -> Result<HealthAdvice, Error> {
        validate_consultation_question(question)?;

        let schema = advice_schema();
        let text = self
            .model
            .generate(&build_prompt(question), Some(&schema))
            .await?;
        parse_advice(&text).map_err(|e| {
            error!("Unusable advice from model: {}", e);
            e
        })
    }

    /// Answer `question` and store the consultation.
    ///
    /// Anonymous callers (`user_id` of `None`) are checked against the free
    /// allowance first and get `Error::LoginRequired` once it is used up.
    pub async fn consult(
        &self,
        question: &str,
        user_id: Option<&str>,
    ) -> Result<ConsultationRecord, Error> {
        validate_consultation_question(question)?;
        if user_id.is_none() {
            self.quota.ensure_allowed(false).await?;
        }

        let advice = self.analyze(question).await?;
        let device_id = match user_id {
            Some(_) => None,
            None => self.quota.scope().device_id(),
        };
        let consultation =
            NewConsultation::new(question.trim(), advice, user_id).with_device_id(device_id);

        let record = self.store.insert(consultation).await?;
        info!(
            "Consultation {} answered ({})",
            record.id,
            if user_id.is_some() { "signed in" } else { "anonymous" }
        );
        Ok(record)
    }

    /// Record whether a consultation's advice was helpful
    pub async fn record_feedback(&self, consultation_id: &str, helpful: bool) -> Result<(), Error> {
        self.store.set_helpful(consultation_id, helpful).await
    }
}
