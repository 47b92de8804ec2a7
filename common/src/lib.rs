//! Types shared between the certwatch service crates and the HTTP API.
//!
//! [`params`] holds the inputs callers send in, [`views`] holds what they get
//! back.

pub mod params;
pub mod views;
