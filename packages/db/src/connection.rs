//! Backend selection and the process-wide storage binding.

use std::sync::Arc;

use surrealdb::Surreal;
use surrealdb::engine::any::{Any, connect};
use surrealdb::opt::auth::Root;
use tokio::sync::OnceCell;

use crate::memory::MemoryStorage;
use crate::schema::init_schema;
use crate::storage::{DbError, Storage};
use crate::surreal::SurrealStorage;

/// Process-wide storage binding, set once at startup.
static GATEWAY: OnceCell<Arc<dyn Storage>> = OnceCell::const_new();

/// Database connection wrapper.
pub type Database = Surreal<Any>;

/// Which backend implementation to bind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    /// Sharded in-process maps.
    Memory,
    /// SurrealDB through the `any` engine.
    Surreal,
}

/// Database configuration.
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// Backend implementation.
    pub backend: StorageBackend,
    /// SurrealDB endpoint: "mem://", "rocksdb://path" or "ws://host:port"
    pub endpoint: String,
    /// Namespace to use
    pub namespace: String,
    /// Database name to use
    pub database: String,
    /// Optional root credentials for authentication
    pub credentials: Option<(String, String)>,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::Memory,
            endpoint: "mem://".to_string(),
            namespace: "encoding".to_string(),
            database: "main".to_string(),
            credentials: None,
        }
    }
}

impl DbConfig {
    /// Create a config for the in-process map backend.
    pub fn memory() -> Self {
        Self::default()
    }

    /// Create a config for an embedded in-memory SurrealDB.
    pub fn surreal_memory() -> Self {
        Self {
            backend: StorageBackend::Surreal,
            ..Default::default()
        }
    }

    /// Create a config for a remote SurrealDB server (requires `remote` feature).
    pub fn remote(endpoint: impl Into<String>) -> Self {
        Self {
            backend: StorageBackend::Surreal,
            endpoint: endpoint.into(),
            ..Default::default()
        }
    }

    /// Create a config for RocksDB persistence (requires `rocksdb` feature).
    pub fn rocksdb(path: impl Into<String>) -> Self {
        Self {
            backend: StorageBackend::Surreal,
            endpoint: format!("rocksdb://{}", path.into()),
            ..Default::default()
        }
    }

    /// Set the namespace.
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    /// Set the database name.
    pub fn with_database(mut self, database: impl Into<String>) -> Self {
        self.database = database.into();
        self
    }

    /// Set root credentials for authentication.
    pub fn with_credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.credentials = Some((username.into(), password.into()));
        self
    }
}

/// Connect to SurrealDB and select the configured namespace and database.
pub async fn connect_surreal(config: &DbConfig) -> Result<Database, DbError> {
    tracing::info!("Connecting to database: {}", config.endpoint);

    let db = connect(&config.endpoint).await?;

    // Authenticate if credentials provided
    if let Some((username, password)) = &config.credentials {
        db.signin(Root {
            username,
            password,
        })
        .await?;
    }

    // Select namespace and database
    db.use_ns(&config.namespace).use_db(&config.database).await?;

    tracing::info!(
        "Connected to database: {}/{}",
        config.namespace,
        config.database
    );

    Ok(db)
}

/// Build a storage backend from configuration without binding it globally.
pub async fn open(config: &DbConfig) -> Result<Arc<dyn Storage>, DbError> {
    match config.backend {
        StorageBackend::Memory => {
            tracing::info!("Using in-memory storage");
            Ok(Arc::new(MemoryStorage::new()))
        }
        StorageBackend::Surreal => {
            let db = connect_surreal(config).await?;
            init_schema(&db).await?;
            Ok(Arc::new(SurrealStorage::new(db)))
        }
    }
}

/// Bind the process-wide storage.
///
/// This should be called once at application startup. Binding a second
/// time fails with `AlreadyInitialized`; re-binding mid-process is not
/// supported.
pub async fn init(config: DbConfig) -> Result<Arc<dyn Storage>, DbError> {
    if GATEWAY.initialized() {
        return Err(DbError::AlreadyInitialized);
    }

    let storage = open(&config).await?;
    GATEWAY
        .set(storage.clone())
        .map_err(|_| DbError::AlreadyInitialized)?;

    tracing::info!("Storage bound to {} backend", storage.backend());
    Ok(storage)
}

/// Get the process-wide storage.
///
/// Fails with `NotInitialized` if `init` has not completed yet.
pub fn get() -> Result<Arc<dyn Storage>, DbError> {
    GATEWAY.get().cloned().ok_or(DbError::NotInitialized)
}
