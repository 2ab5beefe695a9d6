//! Table-backed repositories for profiles, consultations and tips

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use serde::Serialize;
use serde_json::json;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::config::QuotaScope;
use crate::error::Error;
use crate::models::{
    ConsultationRecord, NewConsultation, NewProfile, ProfileUpdate, Tip, UserProfile,
};
use crate::postgrest::PostgrestClient;
use crate::realtime::RealtimeClient;

/// Persistence used by the consultation flow and the quota tracker
#[async_trait]
pub trait ConsultationStore: Send + Sync {
    /// Store a consultation and return it with its assigned id
    async fn insert(&self, consultation: NewConsultation) -> Result<ConsultationRecord, Error>;

    /// Record whether the advice was helpful
    async fn set_helpful(&self, id: &str, helpful: bool) -> Result<(), Error>;

    /// Count consultations that have no user reference
    async fn count_anonymous(&self, scope: &QuotaScope) -> Result<u64, Error>;
}

/// The `health_consultations` table
#[derive(Debug, Clone)]
pub struct Consultations {
    table: PostgrestClient,
}

impl Consultations {
    pub const TABLE: &'static str = "health_consultations";

    pub fn new(table: PostgrestClient) -> Self {
        Self { table }
    }
}

#[async_trait]
impl ConsultationStore for Consultations {
    async fn insert(&self, consultation: NewConsultation) -> Result<ConsultationRecord, Error> {
        let rows = self
            .table
            .insert(&consultation)
            .execute::<ConsultationRecord>()
            .await?;
        let record = rows
            .into_iter()
            .next()
            .ok_or_else(|| Error::database("insert returned no consultation"))?;
        info!("Stored consultation {}", record.id);
        Ok(record)
    }

    async fn set_helpful(&self, id: &str, helpful: bool) -> Result<(), Error> {
        self.table
            .update(json!({ "is_helpful": helpful }))
            .eq("id", id)
            .execute_no_return()
            .await
    }

    async fn count_anonymous(&self, scope: &QuotaScope) -> Result<u64, Error> {
        let mut query = self.table.select("id");
        query.is_null("user_id");
        if let Some(device_id) = scope.device_id() {
            query.eq("device_id", device_id);
        }
        let count = query.execute_count().await?;
        debug!("{} anonymous consultations ({:?})", count, scope);
        Ok(count)
    }
}

#[derive(Serialize)]
struct StampedProfile<'a> {
    #[serde(flatten)]
    profile: &'a NewProfile,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Serialize)]
struct StampedUpdate<'a> {
    #[serde(flatten)]
    update: &'a ProfileUpdate,
    updated_at: DateTime<Utc>,
}

/// The `users` profile table
#[derive(Debug, Clone)]
pub struct Profiles {
    table: PostgrestClient,
}

impl Profiles {
    pub const TABLE: &'static str = "users";

    pub fn new(table: PostgrestClient) -> Self {
        Self { table }
    }

    /// Create a profile, stamping both timestamps
    pub async fn create(&self, profile: &NewProfile) -> Result<UserProfile, Error> {
        let now = Utc::now();
        let row = StampedProfile {
            profile,
            created_at: now,
            updated_at: now,
        };
        let rows = self.table.insert(&row).execute::<UserProfile>().await?;
        rows.into_iter()
            .next()
            .ok_or_else(|| Error::database("insert returned no profile"))
    }

    /// Fetch a profile by id
    pub async fn get(&self, id: &str) -> Result<Option<UserProfile>, Error> {
        self.table.select("*").eq("id", id).execute_one().await
    }

    /// Apply a partial update, refreshing `updated_at`
    pub async fn update(&self, id: &str, update: &ProfileUpdate) -> Result<UserProfile, Error> {
        let row = StampedUpdate {
            update,
            updated_at: Utc::now(),
        };
        let rows = self
            .table
            .update(&row)
            .eq("id", id)
            .execute::<UserProfile>()
            .await?;
        rows.into_iter()
            .next()
            .ok_or_else(|| Error::database(format!("no profile with id {}", id)))
    }
}

/// The `tips` table
#[derive(Debug, Clone)]
pub struct Tips {
    table: PostgrestClient,
    schema: String,
}

impl Tips {
    pub const TABLE: &'static str = "tips";

    pub fn new(table: PostgrestClient, schema: &str) -> Self {
        Self {
            table,
            schema: schema.to_string(),
        }
    }

    /// All tips, newest first
    pub async fn list(&self) -> Result<Vec<Tip>, Error> {
        self.table
            .select("*")
            .order("created_at", false)
            .execute::<Tip>()
            .await
    }

    /// Load the tips and keep them current.
    ///
    /// The list is re-fetched after every change on the table; a failed
    /// re-fetch keeps the previous list.
    pub async fn watch(&self, realtime: &RealtimeClient) -> Result<TipFeed, Error> {
        let mut subscription = realtime.subscribe_table(&self.schema, Self::TABLE).await?;
        let initial = self.list().await?;
        let (tx, rx) = watch::channel(initial);

        let tips = self.clone();
        let task = tokio::spawn(async move {
            while let Some(change) = subscription.recv().await {
                debug!("Tip {:?}, refreshing list", change.kind);
                match tips.list().await {
                    Ok(list) => {
                        tx.send_replace(list);
                    }
                    Err(e) => warn!("Failed to refresh tips: {}", e),
                }
            }
        });

        Ok(TipFeed { receiver: rx, task })
    }
}

/// Live list of tips. Dropping it ends the subscription.
#[derive(Debug)]
pub struct TipFeed {
    receiver: watch::Receiver<Vec<Tip>>,
    task: JoinHandle<()>,
}

impl TipFeed {
    /// The latest list
    pub fn current(&self) -> Vec<Tip> {
        self.receiver.borrow().clone()
    }

    /// Wait for the next refresh
    pub async fn changed(&mut self) -> Result<Vec<Tip>, Error> {
        self.receiver
            .changed()
            .await
            .map_err(|_| Error::realtime("tip subscription closed"))?;
        Ok(self.receiver.borrow_and_update().clone())
    }

    /// Another observer of the same list
    pub fn subscribe(&self) -> watch::Receiver<Vec<Tip>> {
        self.receiver.clone()
    }
}

impl Drop for TipFeed {
    fn drop(&mut self) {
        self.task.abort();
    }
}
