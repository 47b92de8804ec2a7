use certwatch_db::storage::StoreError;
use thiserror::Error;

use crate::validation::ValidationError;

/// Every way a certificate operation can fail.
#[derive(Debug, Error)]
pub enum CertificateError {
    #[error("Invalid input: {0}")]
    InvalidInput(#[from] ValidationError),

    #[error("A certificate with this fingerprint already exists")]
    Conflict,

    #[error("Certificate not found")]
    NotFound,

    #[error(transparent)]
    Other(StoreError),
}

impl From<StoreError> for CertificateError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict => Self::Conflict,
            StoreError::NotFound => Self::NotFound,
            other => Self::Other(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn test_store_errors_translate_by_kind() {
        assert!(matches!(
            CertificateError::from(StoreError::Conflict),
            CertificateError::Conflict
        ));
        assert!(matches!(
            CertificateError::from(StoreError::NotFound),
            CertificateError::NotFound
        ));
        assert!(matches!(
            CertificateError::from(StoreError::Timeout(Duration::from_secs(1))),
            CertificateError::Other(StoreError::Timeout(_))
        ));
    }

    #[test]
    fn test_other_keeps_cause() {
        let err = CertificateError::from(StoreError::Timeout(Duration::from_secs(5)));

        assert_eq!(err.to_string(), "Query did not complete within 5s");
    }
}
