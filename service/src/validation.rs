//! Registration rules for certificates.
//!
//! [`validate`] is pure: it never touches the store, so a request that fails
//! here has had no side effects.

use certwatch_common::params::CreateCertificateParams;
use certwatch_db::models::{CertificateId, DbCertificate, storable_timestamps};
use chrono::{DateTime, FixedOffset, Utc};
use thiserror::Error;

pub const MAX_COMMON_NAME_LEN: usize = 255;
pub const MAX_SERIAL_NUMBER_LEN: usize = 128;
pub const MAX_ISSUER_LEN: usize = 255;
pub const FINGERPRINT_LEN: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{field} is required")]
    Missing { field: &'static str },

    #[error("{field} is {actual} characters long, the limit is {max}")]
    TooLong {
        field: &'static str,
        max: usize,
        actual: usize,
    },

    #[error("fingerprint_sha256 must be 64 characters, got {0}")]
    FingerprintLength(usize),

    #[error("fingerprint_sha256 is not valid hex")]
    FingerprintNotHex,

    #[error("{field} is outside the supported range of years 1 to 9999")]
    TimestampOutOfRange { field: &'static str },

    #[error("not_after must be later than not_before")]
    ValidityWindow,

    #[error("id is required")]
    EmptyId,
}

/// A registration request that passed [`validate`].
///
/// Timestamps are in UTC and the fingerprint is lowercase; only the id and
/// creation time are still missing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCertificate {
    pub common_name: String,
    pub serial_number: String,
    pub issuer: String,
    pub not_before: DateTime<Utc>,
    pub not_after: DateTime<Utc>,
    pub fingerprint_sha256: String,
}

impl NewCertificate {
    pub fn into_record(self, id: CertificateId, created_at: DateTime<Utc>) -> DbCertificate {
        DbCertificate {
            id,
            common_name: self.common_name,
            serial_number: self.serial_number,
            issuer: self.issuer,
            not_before: self.not_before,
            not_after: self.not_after,
            fingerprint_sha256: self.fingerprint_sha256,
            created_at,
        }
    }
}

pub fn validate(params: CreateCertificateParams) -> Result<NewCertificate, ValidationError> {
    let CreateCertificateParams {
        common_name,
        serial_number,
        issuer,
        not_before,
        not_after,
        fingerprint_sha256,
    } = params;

    require("common_name", &common_name)?;
    require("serial_number", &serial_number)?;
    require("issuer", &issuer)?;
    require("fingerprint_sha256", &fingerprint_sha256)?;

    limit("common_name", &common_name, MAX_COMMON_NAME_LEN)?;
    limit("serial_number", &serial_number, MAX_SERIAL_NUMBER_LEN)?;
    limit("issuer", &issuer, MAX_ISSUER_LEN)?;

    let fingerprint_len = fingerprint_sha256.chars().count();
    if fingerprint_len != FINGERPRINT_LEN {
        return Err(ValidationError::FingerprintLength(fingerprint_len));
    }
    if hex::decode(&fingerprint_sha256).is_err() {
        return Err(ValidationError::FingerprintNotHex);
    }

    let not_before = timestamp("not_before", not_before)?;
    let not_after = timestamp("not_after", not_after)?;
    if not_after <= not_before {
        return Err(ValidationError::ValidityWindow);
    }

    Ok(NewCertificate {
        common_name,
        serial_number,
        issuer,
        not_before,
        not_after,
        fingerprint_sha256: fingerprint_sha256.to_ascii_lowercase(),
    })
}

/// Reject the empty id before it reaches the store.
pub fn validate_id(id: &str) -> Result<&str, ValidationError> {
    if id.is_empty() {
        return Err(ValidationError::EmptyId);
    }
    Ok(id)
}

fn require(field: &'static str, value: &str) -> Result<(), ValidationError> {
    if value.is_empty() {
        return Err(ValidationError::Missing { field });
    }
    Ok(())
}

fn limit(field: &'static str, value: &str, max: usize) -> Result<(), ValidationError> {
    let actual = value.chars().count();
    if actual > max {
        return Err(ValidationError::TooLong { field, max, actual });
    }
    Ok(())
}

/// Absent values and `0001-01-01T00:00:00Z`, the zero time many clients send
/// for an unset field, both count as unset.
fn timestamp(
    field: &'static str,
    value: Option<DateTime<FixedOffset>>,
) -> Result<DateTime<Utc>, ValidationError> {
    let storable = storable_timestamps();
    let value = value
        .map(|ts| ts.to_utc())
        .filter(|ts| ts != storable.start())
        .ok_or(ValidationError::Missing { field })?;

    if !storable.contains(&value) {
        return Err(ValidationError::TimestampOutOfRange { field });
    }

    Ok(value)
}
