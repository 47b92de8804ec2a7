//! The certificate lifecycle engine.
//!
//! - [`validation`] checks registration requests before anything is stored.
//! - [`certificates`] is the service every caller goes through. It owns id and
//!   timestamp assignment and translates store failures into
//!   [`error::CertificateError`].
//! - [`monitor`] periodically looks for certificates nearing expiry and warns
//!   about each one once.

pub mod certificates;
pub mod clock;
pub mod error;
pub mod monitor;
pub mod validation;

pub use certificates::{CertificateManager, CertificateService, ExpiryOption};
pub use error::CertificateError;
