use std::{net::SocketAddr, path::PathBuf, time::Duration};

use certwatch_common::params::parse_duration;
use clap::Parser;

const DEFAULT_DB_PATH: &str = "./data/certwatch.db";

#[derive(Clone, Debug, Parser)]
#[command(version, about = "Tracks TLS certificates and warns before they expire")]
pub struct CertwatchConfig {
    #[clap(
        short,
        long,
        env = "CERTWATCH_BIND_ADDR",
        default_value = "0.0.0.0:8080"
    )]
    pub bind_addr: SocketAddr,

    /// SQLite database file. Missing parent directories are created.
    ///
    /// Falls back to `DB_PATH`, then to `./data/certwatch.db`.
    #[clap(long, env = "CERTWATCH_DB_PATH")]
    pub db_path: Option<PathBuf>,

    /// How often the expiry monitor scans, e.g. `1h` or `15m`.
    #[clap(
        long,
        env = "CERTWATCH_EXPIRY_CHECK_INTERVAL",
        default_value = "1h",
        value_parser = positive_duration
    )]
    pub expiry_check_interval: Duration,

    /// Certificates expiring within this window are reported.
    #[clap(
        long,
        env = "CERTWATCH_EXPIRY_WINDOW",
        default_value = "30d",
        value_parser = parse_duration
    )]
    pub expiry_window: Duration,

    #[clap(
        long,
        env = "CERTWATCH_QUERY_TIMEOUT",
        default_value = "5s",
        value_parser = positive_duration
    )]
    pub query_timeout: Duration,

    /// How long to wait for background tasks after the server stops.
    #[clap(
        long,
        env = "CERTWATCH_SHUTDOWN_TIMEOUT",
        default_value = "10s",
        value_parser = parse_duration
    )]
    pub shutdown_timeout: Duration,

    #[clap(long, default_value_t = false)]
    pub dump_openapi: bool,
}

impl CertwatchConfig {
    pub fn database_path(&self) -> PathBuf {
        self.db_path
            .clone()
            .or_else(|| std::env::var_os("DB_PATH").map(PathBuf::from))
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DB_PATH))
    }
}

fn positive_duration(value: &str) -> Result<Duration, String> {
    match parse_duration(value) {
        Ok(d) if d.is_zero() => Err("must be greater than zero".into()),
        Ok(d) => Ok(d),
        Err(e) => Err(e.to_string()),
    }
}
