
use chrono::Utc;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::Row;
use std::path::Path;
use std::str::FromStr;
use threadcast_core::{
    CoreError, DatabaseError, DedupLedger, LedgerBackend, LedgerConfig, MemoryLedger,
};
use tracing::{debug, info};

pub struct Database {
    connection_string: String,
    pool: Option<SqlitePool>,
}

impl Database {
    pub fn new(connection_string: String) -> Self {
        Self {
            connection_string,
            pool: None,
        }
    }

    /// Database stored in the file at `path`, created on first connect.
    pub fn at_path(path: &str) -> Self {
        Self::new(format!("sqlite://{}", path))
    }

    pub async fn connect(&mut self) -> Result<(), CoreError> {
        let options = SqliteConnectOptions::from_str(&self.connection_string)
            .map_err(|e| DatabaseError::ConnectionFailed {
                reason: e.to_string(),
            })?
            .create_if_missing(true);

        // A single connection serialises ledger writes.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .map_err(|e| DatabaseError::ConnectionFailed {
                reason: e.to_string(),
            })?;

        info!("Connected to {}", self.connection_string);
        self.pool = Some(pool);
        Ok(())
    }

    pub async fn run_migrations(&self) -> Result<(), CoreError> {
        sqlx::migrate!("./migrations")
            .run(self.pool()?)
            .await
            .map_err(|e| DatabaseError::MigrationFailed {
                migration: e.to_string(),
            })?;
        debug!("Database migrations applied");
        Ok(())
    }

    fn pool(&self) -> Result<&SqlitePool, CoreError> {
        self.pool
            .as_ref()
            .ok_or(CoreError::Database(DatabaseError::NotConnected))
    }

    pub async fn close(&self) {
        if let Some(pool) = &self.pool {
            pool.close().await;
        }
    }

    pub async fn is_processed(&self, item_id: &str) -> Result<bool, CoreError> {
        let row = sqlx::query("SELECT 1 FROM processed_items WHERE item_id = ?")
            .bind(item_id)
            .fetch_optional(self.pool()?)
            .await
            .map_err(DatabaseError::from)?;
        Ok(row.is_some())
    }

    /// Records `item_id`. Recording the same item twice keeps the first row.
    pub async fn mark_processed(&self, item_id: &str) -> Result<(), CoreError> {
        sqlx::query("INSERT OR IGNORE INTO processed_items (item_id, processed_at) VALUES (?, ?)")
            .bind(item_id)
            .bind(Utc::now().to_rfc3339())
            .execute(self.pool()?)
            .await
            .map_err(|e| DatabaseError::QueryFailed {
                query: format!("insert processed item {}: {}", item_id, e),
            })?;
        Ok(())
    }

    pub async fn processed_count(&self) -> Result<u64, CoreError> {
        let row = sqlx::query("SELECT COUNT(*) AS count FROM processed_items")
            .fetch_one(self.pool()?)
            .await
            .map_err(DatabaseError::from)?;
        let count: i64 = row.try_get("count").map_err(DatabaseError::from)?;
        Ok(count as u64)
    }
}

/// Ledger kept in a SQLite file so processed items survive restarts.
pub struct SqliteLedger {
    db: Database,
}

impl SqliteLedger {
    pub async fn open(path: &str) -> Result<Self, CoreError> {
        if let Some(parent) = Path::new(path).parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let mut db = Database::at_path(path);
        db.connect().await?;
        db.run_migrations().await?;
        Ok(Self { db })
    }

    pub fn database(&self) -> &Database {
        &self.db
    }
}

impl DedupLedger for SqliteLedger {
    async fn contains(&self, item_id: &str) -> Result<bool, CoreError> {
        self.db.is_processed(item_id).await
    }

    async fn add(&mut self, item_id: &str) -> Result<(), CoreError> {
        self.db.mark_processed(item_id).await
    }
}

/// The ledger backend chosen at startup.
pub enum LedgerStore {
    Memory(MemoryLedger),
    Sqlite(SqliteLedger),
}

impl LedgerStore {
    pub async fn open(config: &LedgerConfig) -> Result<Self, CoreError> {
        match config.backend {
            LedgerBackend::Memory => {
                info!("Using in-memory ledger; processed items are forgotten on restart");
                Ok(LedgerStore::Memory(MemoryLedger::new()))
            }
            LedgerBackend::Sqlite => {
                info!("Using SQLite ledger at {}", config.path);
                Ok(LedgerStore::Sqlite(SqliteLedger::open(&config.path).await?))
            }
        }
    }
}

impl DedupLedger for LedgerStore {
    async fn contains(&self, item_id: &str) -> Result<bool, CoreError> {
        match self {
            LedgerStore::Memory(ledger) => ledger.contains(item_id).await,
            LedgerStore::Sqlite(ledger) => ledger.contains(item_id).await,
        }
    }

    async fn add(&mut self, item_id: &str) -> Result<(), CoreError> {
        match self {
            LedgerStore::Memory(ledger) => ledger.add(item_id).await,
            LedgerStore::Sqlite(ledger) => ledger.add(item_id).await,
        }
    }
}
