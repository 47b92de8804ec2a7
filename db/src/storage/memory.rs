use std::{
    collections::HashMap,
    sync::{Mutex, MutexGuard},
};

use async_trait::async_trait;

use crate::{
    models::DbCertificate,
    storage::{CertificateStore, ExpiryQuery, Storage, StoreError},
};

/// A `HashMap`-backed [`Storage`] that honours the same conflict and
/// not-found rules as [`super::sqlite::SqliteStorage`].
#[derive(Debug, Default)]
pub struct MemoryStorage {
    certificates: Mutex<HashMap<String, DbCertificate>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.lock().map(|certs| certs.len()).unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<String, DbCertificate>>, StoreError> {
        self.certificates
            .lock()
            .map_err(|_| StoreError::Internal("memory storage lock poisoned".into()))
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn ping(&self) -> Result<(), StoreError> {
        self.lock().map(|_| ())
    }
}

#[async_trait]
impl CertificateStore for MemoryStorage {
    async fn create(&self, cert: DbCertificate) -> Result<DbCertificate, StoreError> {
        let mut certs = self.lock()?;
        let id = cert.id.to_string();

        let taken = certs.contains_key(&id)
            || certs
                .values()
                .any(|c| c.fingerprint_sha256 == cert.fingerprint_sha256);
        if taken {
            return Err(StoreError::Conflict);
        }

        certs.insert(id, cert.clone());
        Ok(cert)
    }

    async fn get(&self, id: &str) -> Result<DbCertificate, StoreError> {
        self.lock()?.get(id).cloned().ok_or(StoreError::NotFound)
    }

    async fn list(&self) -> Result<Vec<DbCertificate>, StoreError> {
        let mut all: Vec<_> = self.lock()?.values().cloned().collect();
        all.sort_by(|a, b| (a.created_at, a.id).cmp(&(b.created_at, b.id)));
        Ok(all)
    }

    async fn list_expiring(&self, query: ExpiryQuery) -> Result<Vec<DbCertificate>, StoreError> {
        let mut matching: Vec<_> = self
            .lock()?
            .values()
            .filter(|c| query.matches(c.not_after))
            .cloned()
            .collect();
        matching.sort_by(|a, b| (a.not_after, a.id).cmp(&(b.not_after, b.id)));
        Ok(matching)
    }

    async fn delete(&self, id: &str) -> Result<(), StoreError> {
        self.lock()?
            .remove(id)
            .map(|_| ())
            .ok_or(StoreError::NotFound)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use chrono::{TimeDelta, Utc};

    use super::*;
    use crate::models::CertificateId;

    fn cert(fingerprint: &str, not_after: chrono::DateTime<Utc>) -> DbCertificate {
        DbCertificate {
            id: CertificateId::new(),
            common_name: "example.com".into(),
            serial_number: "01".into(),
            issuer: "Example CA".into(),
            not_before: not_after - TimeDelta::days(30),
            not_after,
            fingerprint_sha256: fingerprint.repeat(32),
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_memory_conflict_and_not_found() {
        let storage = MemoryStorage::new();
        let now = Utc::now();
        let first = storage.create(cert("ab", now)).await.unwrap();

        assert!(matches!(
            storage.create(cert("ab", now)).await,
            Err(StoreError::Conflict)
        ));
        assert_eq!(storage.len(), 1);

        storage.delete(&first.id.to_string()).await.unwrap();
        assert!(matches!(
            storage.delete(&first.id.to_string()).await,
            Err(StoreError::NotFound)
        ));
        assert!(storage.is_empty());
    }

    #[tokio::test]
    async fn test_memory_list_expiring_matches_query() {
        let storage = MemoryStorage::new();
        let now = Utc::now();
        storage.create(cert("01", now - TimeDelta::minutes(1))).await.unwrap();
        let soon = storage.create(cert("02", now + TimeDelta::minutes(30))).await.unwrap();
        storage.create(cert("03", now + TimeDelta::hours(2))).await.unwrap();

        let found = storage
            .list_expiring(ExpiryQuery::new(now, Duration::from_secs(3600), false))
            .await
            .unwrap();
        assert_eq!(found, vec![soon]);

        let found = storage
            .list_expiring(ExpiryQuery::new(now, Duration::from_secs(3600), true))
            .await
            .unwrap();
        assert_eq!(found.len(), 2);
    }
}
