//! Database schema definitions using SurrealQL.

use crate::{Database, DbError};

/// Initialize the database schema.
///
/// This creates the job and preset tables and their indexes. Safe to run on
/// every startup.
pub async fn init_schema(db: &Database) -> Result<(), DbError> {
    tracing::info!("Initializing database schema...");

    // Preset table
    db.query(PRESET_SCHEMA).await?.check()?;

    // Job table
    db.query(JOB_SCHEMA).await?.check()?;

    tracing::info!("Database schema initialized");

    Ok(())
}

/// Preset table schema.
///
/// Params are opaque encoder configuration, so the table stays schemaless.
const PRESET_SCHEMA: &str = r#"
-- Preset table, keyed by preset name
DEFINE TABLE IF NOT EXISTS preset SCHEMALESS;

DEFINE FIELD IF NOT EXISTS name ON preset TYPE string;

DEFINE INDEX IF NOT EXISTS preset_name ON preset FIELDS name UNIQUE;
"#;

/// Job table schema.
const JOB_SCHEMA: &str = r#"
-- Job table, keyed by job id
DEFINE TABLE IF NOT EXISTS job SCHEMALESS;

DEFINE FIELD IF NOT EXISTS job_id ON job TYPE string;
DEFINE FIELD IF NOT EXISTS source ON job TYPE string;
DEFINE FIELD IF NOT EXISTS destination ON job TYPE string;
DEFINE FIELD IF NOT EXISTS status ON job TYPE object;
DEFINE FIELD IF NOT EXISTS progress ON job TYPE int DEFAULT 0;

-- Indexes for listing in creation order and filtering by status
DEFINE INDEX IF NOT EXISTS job_id ON job FIELDS job_id UNIQUE;
DEFINE INDEX IF NOT EXISTS job_status ON job FIELDS status.status;
"#;
