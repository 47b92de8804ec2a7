use std::ops::RangeInclusive;

use certwatch_common::views::Certificate;
use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::FromRow;

use crate::models::CertificateId;

/// 0001-01-01T00:00:00Z
const EARLIEST_STORABLE_SECS: i64 = -62_135_596_800;

/// 9999-12-31T23:59:59Z
const LATEST_STORABLE_SECS: i64 = 253_402_300_799;

#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct DbCertificate {
    pub id: CertificateId,

    pub common_name: String,

    pub serial_number: String,

    pub issuer: String,

    pub not_before: DateTime<Utc>,

    pub not_after: DateTime<Utc>,

    /// Always lowercase hex; the column carries a unique constraint.
    pub fingerprint_sha256: String,

    pub created_at: DateTime<Utc>,
}

impl From<DbCertificate> for Certificate {
    fn from(value: DbCertificate) -> Self {
        Self {
            id: value.id.to_string(),
            common_name: value.common_name,
            serial_number: value.serial_number,
            issuer: value.issuer,
            not_before: value.not_before,
            not_after: value.not_after,
            fingerprint_sha256: value.fingerprint_sha256,
            created_at: value.created_at,
        }
    }
}

/// The instants a certificate timestamp may take.
///
/// Timestamps are persisted as fixed-width RFC 3339 text so that SQL string
/// comparison matches chronological order. That only holds for four digit
/// years.
pub fn storable_timestamps() -> RangeInclusive<DateTime<Utc>> {
    let earliest =
        DateTime::from_timestamp(EARLIEST_STORABLE_SECS, 0).unwrap_or(DateTime::<Utc>::MIN_UTC);
    let latest = DateTime::from_timestamp(LATEST_STORABLE_SECS, 999_999_999)
        .unwrap_or(DateTime::<Utc>::MAX_UTC);

    earliest..=latest
}

/// Render a timestamp in the fixed-width text form used for storage.
pub fn encode_timestamp(ts: &DateTime<Utc>) -> String {
    let range = storable_timestamps();
    let clamped = (*ts).clamp(*range.start(), *range.end());

    clamped.to_rfc3339_opts(SecondsFormat::Nanos, true)
}
