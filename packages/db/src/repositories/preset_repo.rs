//! Preset repository for SurrealDB persistence.

use chrono::{DateTime, Utc};
use encode_core::Preset;
use serde::{Deserialize, Serialize};

use crate::{Database, DbError};

/// Repository for preset persistence operations.
///
/// Presets are keyed by name, so `preset:<name>` is the record id.
pub struct PresetRepository;

/// Stored shape of a preset.
///
/// `params` is kept as JSON text. SurrealDB values drop `null` object members
/// and have no unsigned 64-bit integers, so storing the blob natively would
/// not give it back unchanged.
#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct PresetRecord {
    name: String,
    #[serde(default)]
    description: Option<String>,
    params: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl PresetRecord {
    pub(crate) fn from_preset(preset: &Preset) -> Result<Self, DbError> {
        Ok(Self {
            name: preset.name.clone(),
            description: preset.description.clone(),
            params: serde_json::to_string(&preset.params)?,
            created_at: preset.created_at,
            updated_at: preset.updated_at,
        })
    }

    pub(crate) fn into_preset(self) -> Result<Preset, DbError> {
        Ok(Preset {
            name: self.name,
            description: self.description,
            params: serde_json::from_str(&self.params)?,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

impl PresetRepository {
    /// Create a new preset in the database.
    pub async fn create(db: &Database, preset: &Preset) -> Result<Preset, DbError> {
        let now = Utc::now();
        let mut stored = preset.clone();
        stored.created_at = now;
        stored.updated_at = now;

        let created: Result<Option<PresetRecord>, _> = db
            .create(("preset", preset.name.clone()))
            .content(PresetRecord::from_preset(&stored)?)
            .await;

        match created {
            Ok(record) => record
                .ok_or_else(|| DbError::Query("Failed to create preset".into()))?
                .into_preset(),
            // A failed CREATE on an existing key is a name collision.
            Err(e) => match Self::exists(db, &preset.name).await {
                Ok(true) => Err(DbError::Conflict(format!(
                    "Preset already exists: {}",
                    preset.name
                ))),
                _ => Err(e.into()),
            },
        }
    }

    /// Get a preset by name.
    pub async fn get(db: &Database, name: &str) -> Result<Preset, DbError> {
        let record: Option<PresetRecord> = db.select(("preset", name.to_string())).await?;

        record
            .ok_or_else(|| DbError::preset_not_found(name))?
            .into_preset()
    }

    /// List all presets ordered by name.
    pub async fn list(db: &Database) -> Result<Vec<Preset>, DbError> {
        let mut response = db
            .query("SELECT * FROM preset ORDER BY name ASC")
            .await?;

        let records: Vec<PresetRecord> = response.take(0)?;

        records.into_iter().map(PresetRecord::into_preset).collect()
    }

    /// Replace description and params of an existing preset.
    ///
    /// UPDATE never creates records, so a missing preset yields no rows.
    pub async fn update(db: &Database, name: &str, preset: &Preset) -> Result<Preset, DbError> {
        let mut result = db
            .query(
                "UPDATE type::thing('preset', $name) SET description = $description, \
                 params = $params, updated_at = $now RETURN AFTER",
            )
            .bind(("name", name.to_string()))
            .bind(("description", preset.description.clone()))
            .bind(("params", serde_json::to_string(&preset.params)?))
            .bind(("now", serde_json::to_value(Utc::now())?))
            .await?
            .check()?;

        let records: Vec<PresetRecord> = result.take(0)?;

        records
            .into_iter()
            .next()
            .ok_or_else(|| DbError::preset_not_found(name))?
            .into_preset()
    }

    /// Delete a preset.
    pub async fn delete(db: &Database, name: &str) -> Result<(), DbError> {
        let deleted: Option<PresetRecord> = db.delete(("preset", name.to_string())).await?;

        deleted
            .map(|_| ())
            .ok_or_else(|| DbError::preset_not_found(name))
    }

    /// Check if a preset name exists.
    pub async fn exists(db: &Database, name: &str) -> Result<bool, DbError> {
        let record: Option<PresetRecord> = db.select(("preset", name.to_string())).await?;

        Ok(record.is_some())
    }
}
