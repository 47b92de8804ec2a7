//! certwatch HTTP service.
//!
//! Exposes certificate registration, lookup and removal over a small REST
//! API, and runs the expiry monitor alongside it. See
//! [`config::CertwatchConfig`] for the available settings.

pub mod config;
pub mod context;
pub mod server;

pub(crate) mod error;
pub(crate) mod handlers;
