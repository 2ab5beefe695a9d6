//! Free-consultation allowance for anonymous users

use log::{info, warn};
use std::sync::Arc;

use crate::config::QuotaScope;
use crate::error::Error;
use crate::records::ConsultationStore;

/// Anonymous usage against the allowance
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuotaStatus {
    pub used: u32,
    pub limit: u32,
    pub remaining: u32,

    /// The feature is gated until the user signs in
    pub requires_login: bool,
}

impl QuotaStatus {
    fn unlimited(limit: u32) -> Self {
        Self {
            used: 0,
            limit,
            remaining: limit,
            requires_login: false,
        }
    }

    fn from_used(used: u32, limit: u32) -> Self {
        Self {
            used,
            limit,
            remaining: limit.saturating_sub(used),
            requires_login: used >= limit,
        }
    }
}

/// Counts anonymous consultations in the record store.
///
/// With `QuotaScope::Global` every anonymous consultation in the system counts,
/// not just this device's.
#[derive(Clone)]
pub struct ConsultationQuota {
    store: Arc<dyn ConsultationStore>,
    scope: QuotaScope,
    limit: u32,
}

impl ConsultationQuota {
    pub fn new(store: Arc<dyn ConsultationStore>, scope: QuotaScope, limit: u32) -> Self {
        Self { store, scope, limit }
    }

    pub fn scope(&self) -> &QuotaScope {
        &self.scope
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }

    /// Number of stored consultations without a user reference
    pub async fn anonymous_usage_count(&self) -> Result<u32, Error> {
        let count = self.store.count_anonymous(&self.scope).await?;
        Ok(u32::try_from(count).unwrap_or(u32::MAX))
    }

    /// Current allowance; signed-in users are never gated and cost no query
    pub async fn status(&self, is_authenticated: bool) -> Result<QuotaStatus, Error> {
        if is_authenticated {
            return Ok(QuotaStatus::unlimited(self.limit));
        }
        let used = self.anonymous_usage_count().await?;
        Ok(QuotaStatus::from_used(used, self.limit))
    }

    /// `Error::LoginRequired` once the allowance is used up
    pub async fn ensure_allowed(&self, is_authenticated: bool) -> Result<QuotaStatus, Error> {
        let status = self.status(is_authenticated).await?;
        if status.requires_login {
            warn!("Anonymous allowance exhausted ({} of {})", status.used, status.limit);
            return Err(Error::LoginRequired {
                used: status.used,
                limit: status.limit,
            });
        }
        if !is_authenticated {
            info!("{} free consultations remaining", status.remaining);
        }
        Ok(status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ConsultationRecord, NewConsultation};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU64, Ordering};

    struct CountingStore {
        anonymous: AtomicU64,
        queries: AtomicU64,
    }

    impl CountingStore {
        fn with(anonymous: u64) -> Arc<Self> {
            Arc::new(Self {
                anonymous: AtomicU64::new(anonymous),
                queries: AtomicU64::new(0),
            })
        }
    }

    #[async_trait]
    impl ConsultationStore for CountingStore {
        async fn insert(&self, _: NewConsultation) -> Result<ConsultationRecord, Error> {
            Err(Error::general("not used"))
        }

        async fn set_helpful(&self, _: &str, _: bool) -> Result<(), Error> {
            Ok(())
        }

        async fn count_anonymous(&self, _: &QuotaScope) -> Result<u64, Error> {
            self.queries.fetch_add(1, Ordering::SeqCst);
            Ok(self.anonymous.load(Ordering::SeqCst))
        }
    }

    #[tokio::test]
    async fn gate_closes_at_limit() {
        let store = CountingStore::with(1);
        let quota = ConsultationQuota::new(store.clone(), QuotaScope::Global, 2);

        let status = quota.ensure_allowed(false).await.unwrap();
        assert_eq!(status.remaining, 1);

        store.anonymous.store(2, Ordering::SeqCst);
        match quota.ensure_allowed(false).await {
            Err(Error::LoginRequired { used, limit }) => assert_eq!((used, limit), (2, 2)),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[tokio::test]
    async fn signed_in_users_skip_the_query() {
        let store = CountingStore::with(10);
        let quota = ConsultationQuota::new(store.clone(), QuotaScope::Global, 2);

        let status = quota.ensure_allowed(true).await.unwrap();
        assert!(!status.requires_login);
        assert_eq!(store.queries.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn remaining_never_underflows() {
        let status = QuotaStatus::from_used(5, 2);
        assert_eq!(status.remaining, 0);
        assert!(status.requires_login);
    }
}
