//! Persistence for certwatch.
//!
//! [`models`] defines the stored row shape and [`storage`] the store contract
//! along with its SQLite implementation.

pub mod models;
pub mod storage;
