use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Metadata for a TLS certificate tracked by certwatch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Certificate {
    /// Server-assigned identifier (UUID).
    pub id: String,

    /// Subject common name of the certificate.
    pub common_name: String,

    /// Serial number as presented by the issuer.
    pub serial_number: String,

    /// Distinguished name or label of the issuing CA.
    pub issuer: String,

    /// Start of the validity window.
    pub not_before: DateTime<Utc>,

    /// End of the validity window. Always later than `not_before`.
    pub not_after: DateTime<Utc>,

    /// Lowercase hex SHA-256 fingerprint. Unique across all certificates.
    pub fingerprint_sha256: String,

    pub created_at: DateTime<Utc>,
}
