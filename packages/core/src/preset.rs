//! Preset domain types: named encoding configuration templates.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Maximum length of a preset name.
pub const MAX_PRESET_NAME_LEN: usize = 128;

/// A named, reusable encoding configuration.
///
/// `params` is opaque to this service; only the encoder interprets it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Preset {
    /// Unique name, used as the primary key.
    pub name: String,
    /// Optional human-readable description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Encoder configuration blob.
    #[serde(default)]
    pub params: serde_json::Value,
    /// When the preset was first stored.
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    /// When the preset was last updated.
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

impl Preset {
    /// Create a new preset with the given name and parameters.
    pub fn new(name: impl Into<String>, params: serde_json::Value) -> Self {
        let now = Utc::now();
        Self {
            name: name.into(),
            description: None,
            params,
            created_at: now,
            updated_at: now,
        }
    }

    /// Set the description for this preset.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Check the name against the naming rules.
    pub fn validate(&self) -> Result<(), String> {
        validate_preset_name(&self.name)
    }
}

/// Preset names are path segments in the HTTP API and record keys in the
/// store, so they must be short and free of whitespace and slashes.
pub fn validate_preset_name(name: &str) -> Result<(), String> {
    if name.is_empty() {
        return Err("preset name must not be empty".into());
    }
    if name.chars().count() > MAX_PRESET_NAME_LEN {
        return Err(format!(
            "preset name exceeds {} characters",
            MAX_PRESET_NAME_LEN
        ));
    }
    if name.chars().any(|c| c.is_whitespace() || c == '/') {
        return Err(format!("invalid preset name: {:?}", name));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_rules() {
        assert!(validate_preset_name("mobile").is_ok());
        assert!(validate_preset_name("h264-720p_fast").is_ok());
        assert!(validate_preset_name("").is_err());
        assert!(validate_preset_name("two words").is_err());
        assert!(validate_preset_name("a/b").is_err());
        assert!(validate_preset_name(&"x".repeat(MAX_PRESET_NAME_LEN + 1)).is_err());
    }

    #[test]
    fn deserializes_without_timestamps() {
        let preset: Preset = serde_json::from_value(serde_json::json!({
            "name": "mobile",
            "params": {"video": {"codec": "h264", "height": 360}}
        }))
        .unwrap();
        assert_eq!(preset.name, "mobile");
        assert_eq!(preset.params["video"]["height"], 360);
        assert!(preset.description.is_none());
    }
}
