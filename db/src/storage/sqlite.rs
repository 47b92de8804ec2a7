use std::{future::Future, path::{Path, PathBuf}, str::FromStr, time::Duration};

use async_trait::async_trait;
use sqlx::{
    SqlitePool,
    migrate::Migrator,
    sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions},
};
use tracing::{debug, info, instrument};

use crate::{
    models::{DbCertificate, encode_timestamp},
    storage::{CertificateStore, ExpiryQuery, Storage, StoreError},
};

static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

const CERTIFICATE_COLUMNS: &str = "id, common_name, serial_number, issuer, not_before, not_after, fingerprint_sha256, created_at";

#[derive(Debug, Clone)]
pub struct SqliteStorageOptions {
    /// Path of the database file. Parent directories are created on connect.
    pub path: PathBuf,

    /// Upper bound on a single statement, including waiting for the
    /// connection.
    pub query_timeout: Duration,
}

impl SqliteStorageOptions {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            query_timeout: Duration::from_secs(5),
        }
    }

    pub fn query_timeout(mut self, timeout: Duration) -> Self {
        self.query_timeout = timeout;
        self
    }
}

#[derive(Debug, Clone)]
pub struct SqliteStorage {
    pool: SqlitePool,
    query_timeout: Duration,
}

impl SqliteStorage {
    /// Open (creating if needed) the database file and bring its schema up to
    /// date.
    pub async fn connect(options: SqliteStorageOptions) -> Result<Self, StoreError> {
        ensure_parent_dir(&options.path)?;

        let connect_options = SqliteConnectOptions::new()
            .filename(&options.path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .foreign_keys(true)
            .busy_timeout(options.query_timeout);

        // SQLite is single-writer
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .acquire_timeout(options.query_timeout)
            .connect_with(connect_options)
            .await?;

        let storage = Self {
            pool,
            query_timeout: options.query_timeout,
        };
        storage.migrate().await?;

        info!(path = %options.path.display(), "SQLite storage ready");
        Ok(storage)
    }

    /// A private in-memory database, mostly useful for tests.
    pub async fn in_memory() -> Result<Self, StoreError> {
        let connect_options = SqliteConnectOptions::from_str("sqlite::memory:")?;

        // The database lives exactly as long as its only connection.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(connect_options)
            .await?;

        let storage = Self {
            pool,
            query_timeout: Duration::from_secs(5),
        };
        storage.migrate().await?;

        Ok(storage)
    }

    pub async fn migrate(&self) -> Result<(), StoreError> {
        MIGRATOR.run(&self.pool).await?;
        debug!("Migrations applied");
        Ok(())
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }

    /// Run a statement under the configured deadline.
    async fn bounded<T, F>(&self, fut: F) -> Result<T, StoreError>
    where
        F: Future<Output = Result<T, sqlx::Error>> + Send,
    {
        match tokio::time::timeout(self.query_timeout, fut).await {
            Ok(result) => result.map_err(StoreError::from),
            Err(_) => Err(StoreError::Timeout(self.query_timeout)),
        }
    }
}

fn ensure_parent_dir(path: &Path) -> Result<(), StoreError> {
    match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => {
            std::fs::create_dir_all(dir)?;
            Ok(())
        }
        _ => Ok(()),
    }
}

#[async_trait]
impl Storage for SqliteStorage {
    async fn ping(&self) -> Result<(), StoreError> {
        self.bounded(sqlx::query("SELECT 1").execute(&self.pool))
            .await
            .map(|_| ())
    }
}

#[async_trait]
impl CertificateStore for SqliteStorage {
    #[instrument(skip(self, cert), fields(id = %cert.id))]
    async fn create(&self, cert: DbCertificate) -> Result<DbCertificate, StoreError> {
        let query = sqlx::query(
            r#"
            INSERT INTO certificates (id, common_name, serial_number, issuer, not_before, not_after, fingerprint_sha256, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(cert.id)
        .bind(&cert.common_name)
        .bind(&cert.serial_number)
        .bind(&cert.issuer)
        .bind(encode_timestamp(&cert.not_before))
        .bind(encode_timestamp(&cert.not_after))
        .bind(&cert.fingerprint_sha256)
        .bind(encode_timestamp(&cert.created_at));

        self.bounded(query.execute(&self.pool)).await?;

        Ok(cert)
    }

    #[instrument(skip(self))]
    async fn get(&self, id: &str) -> Result<DbCertificate, StoreError> {
        let sql = format!("SELECT {CERTIFICATE_COLUMNS} FROM certificates WHERE id = ?");
        let query = sqlx::query_as::<_, DbCertificate>(&sql).bind(id);

        self.bounded(query.fetch_optional(&self.pool))
            .await?
            .ok_or(StoreError::NotFound)
    }

    #[instrument(skip(self))]
    async fn list(&self) -> Result<Vec<DbCertificate>, StoreError> {
        let sql = format!("SELECT {CERTIFICATE_COLUMNS} FROM certificates ORDER BY created_at, id");
        let query = sqlx::query_as::<_, DbCertificate>(&sql);

        self.bounded(query.fetch_all(&self.pool)).await
    }

    #[instrument(skip(self))]
    async fn list_expiring(&self, query: ExpiryQuery) -> Result<Vec<DbCertificate>, StoreError> {
        let until = encode_timestamp(&query.until);

        if query.include_expired {
            let sql = format!(
                "SELECT {CERTIFICATE_COLUMNS} FROM certificates WHERE not_after <= ? ORDER BY not_after, id"
            );
            let q = sqlx::query_as::<_, DbCertificate>(&sql).bind(until);

            self.bounded(q.fetch_all(&self.pool)).await
        } else {
            let sql = format!(
                "SELECT {CERTIFICATE_COLUMNS} FROM certificates WHERE not_after > ? AND not_after <= ? ORDER BY not_after, id"
            );
            let q = sqlx::query_as::<_, DbCertificate>(&sql)
                .bind(encode_timestamp(&query.now))
                .bind(until);

            self.bounded(q.fetch_all(&self.pool)).await
        }
    }

    #[instrument(skip(self))]
    async fn delete(&self, id: &str) -> Result<(), StoreError> {
        let query = sqlx::query("DELETE FROM certificates WHERE id = ?").bind(id);

        let result = self.bounded(query.execute(&self.pool)).await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }

        Ok(())
    }
}
