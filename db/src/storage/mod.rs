use std::{fmt::Debug, time::Duration};

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use thiserror::Error;

use crate::models::{DbCertificate, storable_timestamps};

#[cfg(any(test, feature = "testing"))]
pub mod memory;
pub mod sqlite;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("A record with the same identity already exists")]
    Conflict,

    #[error("Record not found")]
    NotFound,

    #[error("Query did not complete within {0:?}")]
    Timeout(Duration),

    #[error("Query Error: {0}")]
    Database(#[source] sqlx::Error),

    #[error("Migration Error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Storage Error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Internal(#[from] Box<dyn std::error::Error + Send + Sync>),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => StoreError::NotFound,
            sqlx::Error::Database(ref db) if db.is_unique_violation() => StoreError::Conflict,
            err => StoreError::Database(err),
        }
    }
}

/// Selects certificates whose validity ends soon.
///
/// A certificate matches when `not_after <= until`. Unless `include_expired`
/// is set it must also still be valid, i.e. `not_after > now`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExpiryQuery {
    pub now: DateTime<Utc>,
    pub until: DateTime<Utc>,
    pub include_expired: bool,
}

impl ExpiryQuery {
    pub fn new(now: DateTime<Utc>, window: Duration, include_expired: bool) -> Self {
        let latest = *storable_timestamps().end();
        let until = TimeDelta::from_std(window)
            .ok()
            .and_then(|window| now.checked_add_signed(window))
            .map_or(latest, |until| until.min(latest));

        Self {
            now,
            until,
            include_expired,
        }
    }

    pub fn matches(&self, not_after: DateTime<Utc>) -> bool {
        not_after <= self.until && (self.include_expired || not_after > self.now)
    }
}

#[async_trait]
pub trait Storage: CertificateStore + Send + Sync + 'static {
    async fn ping(&self) -> Result<(), StoreError>;
}

#[async_trait]
pub trait CertificateStore: Send + Sync {
    /// Insert a fully populated certificate. Fails with
    /// [`StoreError::Conflict`] when the id or fingerprint is already taken.
    async fn create(&self, cert: DbCertificate) -> Result<DbCertificate, StoreError>;

    async fn get(&self, id: &str) -> Result<DbCertificate, StoreError>;

    /// Every stored certificate, oldest first.
    async fn list(&self) -> Result<Vec<DbCertificate>, StoreError>;

    /// Certificates matching `query`, soonest expiry first.
    async fn list_expiring(&self, query: ExpiryQuery) -> Result<Vec<DbCertificate>, StoreError>;

    /// Remove a certificate. Fails with [`StoreError::NotFound`] when nothing
    /// was deleted.
    async fn delete(&self, id: &str) -> Result<(), StoreError>;
}
