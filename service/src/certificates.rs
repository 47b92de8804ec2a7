use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use certwatch_common::{params::CreateCertificateParams, views::Certificate};
use certwatch_db::{
    models::CertificateId,
    storage::{ExpiryQuery, Storage},
};
use tracing::{debug, info, instrument};

use crate::{
    clock::{Clock, SystemClock},
    error::CertificateError,
    validation::{validate, validate_id},
};

/// Whether [`CertificateService::list_expiring`] also returns certificates
/// whose validity has already ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpiryOption {
    IncludeExpired,
    ExcludeExpired,
}

impl ExpiryOption {
    pub fn includes_expired(self) -> bool {
        matches!(self, ExpiryOption::IncludeExpired)
    }
}

impl From<bool> for ExpiryOption {
    fn from(include_expired: bool) -> Self {
        if include_expired {
            ExpiryOption::IncludeExpired
        } else {
            ExpiryOption::ExcludeExpired
        }
    }
}

/// The operations other layers may perform on certificates.
#[async_trait]
pub trait CertificateService: Send + Sync {
    async fn create(&self, params: CreateCertificateParams)
    -> Result<Certificate, CertificateError>;

    async fn get(&self, id: &str) -> Result<Certificate, CertificateError>;

    async fn list(&self) -> Result<Vec<Certificate>, CertificateError>;

    /// Certificates whose `not_after` falls within `window` from now.
    async fn list_expiring(
        &self,
        window: Duration,
        option: ExpiryOption,
    ) -> Result<Vec<Certificate>, CertificateError>;

    async fn delete(&self, id: &str) -> Result<(), CertificateError>;
}

/// [`CertificateService`] backed by a [`Storage`].
///
/// Holds no state of its own. Uniqueness is left entirely to the store, so two
/// racing creates with the same fingerprint resolve to one success and one
/// [`CertificateError::Conflict`].
#[derive(Clone)]
pub struct CertificateManager {
    store: Arc<dyn Storage>,
    clock: Arc<dyn Clock>,
}

impl CertificateManager {
    pub fn new(store: Arc<dyn Storage>) -> Self {
        Self::with_clock(store, Arc::new(SystemClock))
    }

    pub fn with_clock(store: Arc<dyn Storage>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }
}

#[async_trait]
impl CertificateService for CertificateManager {
    #[instrument(skip(self, params), fields(common_name = %params.common_name))]
    async fn create(
        &self,
        params: CreateCertificateParams,
    ) -> Result<Certificate, CertificateError> {
        let validated = validate(params)?;
        let record = validated.into_record(CertificateId::new(), self.clock.now());

        let created = self.store.create(record).await?;
        info!(id = %created.id, fingerprint = %created.fingerprint_sha256, "Certificate created");

        Ok(created.into())
    }

    #[instrument(skip(self))]
    async fn get(&self, id: &str) -> Result<Certificate, CertificateError> {
        let id = validate_id(id)?;
        Ok(self.store.get(id).await?.into())
    }

    #[instrument(skip(self))]
    async fn list(&self) -> Result<Vec<Certificate>, CertificateError> {
        let certs = self.store.list().await?;
        Ok(certs.into_iter().map(Into::into).collect())
    }

    #[instrument(skip(self))]
    async fn list_expiring(
        &self,
        window: Duration,
        option: ExpiryOption,
    ) -> Result<Vec<Certificate>, CertificateError> {
        let query = ExpiryQuery::new(self.clock.now(), window, option.includes_expired());
        let certs = self.store.list_expiring(query).await?;

        debug!(count = certs.len(), until = %query.until, "Listed expiring certificates");
        Ok(certs.into_iter().map(Into::into).collect())
    }

    #[instrument(skip(self))]
    async fn delete(&self, id: &str) -> Result<(), CertificateError> {
        let id = validate_id(id)?;
        self.store.delete(id).await?;

        info!(id, "Certificate deleted");
        Ok(())
    }
}
