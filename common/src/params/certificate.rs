use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

/// Parameters for registering a certificate.
///
/// Timestamps may carry any UTC offset; they are normalised to UTC before
/// they are stored. Missing timestamps are rejected by validation rather than
/// by deserialization so that callers get a uniform invalid-input error.
#[derive(Debug, Clone, Default, Deserialize, Serialize, ToSchema)]
pub struct CreateCertificateParams {
    #[serde(default)]
    pub common_name: String,

    #[serde(default)]
    pub serial_number: String,

    #[serde(default)]
    pub issuer: String,

    #[serde(default)]
    pub not_before: Option<DateTime<FixedOffset>>,

    #[serde(default)]
    pub not_after: Option<DateTime<FixedOffset>>,

    /// Hex encoded SHA-256 fingerprint, 64 characters, any case.
    #[serde(default)]
    pub fingerprint_sha256: String,
}

/// Query parameters for listing certificates.
#[derive(Debug, Clone, Default, Deserialize, Serialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct ListCertificatesParams {
    /// Only return certificates whose validity ends within this window, e.g.
    /// `30m`, `12h` or `7d`. When omitted every certificate is returned.
    pub expiring_within: Option<String>,

    /// Whether certificates that have already expired are included when
    /// `expiring_within` is set. Defaults to `true`.
    pub expired: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_params_keep_offsets() {
        let params: CreateCertificateParams = serde_json::from_str(
            r#"{
                "common_name": "example.com",
                "serial_number": "01",
                "issuer": "Example CA",
                "not_before": "2025-01-01T02:00:00+02:00",
                "not_after": "2026-01-01T00:00:00Z",
                "fingerprint_sha256": "AB"
            }"#,
        )
        .unwrap();

        let not_before = params.not_before.unwrap();
        assert_eq!(not_before.offset().local_minus_utc(), 2 * 3600);
        assert_eq!(not_before.to_utc().to_rfc3339(), "2025-01-01T00:00:00+00:00");
    }

    #[test]
    fn test_create_params_missing_fields_default() {
        let params: CreateCertificateParams = serde_json::from_str("{}").unwrap();

        assert!(params.common_name.is_empty());
        assert!(params.not_before.is_none());
        assert!(params.not_after.is_none());
    }
}
