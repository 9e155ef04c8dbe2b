//! Configuration types
//!
//! Defines:
//! - `RunProfile` - a named, persisted set of run parameters
//! - `ConfigFile` - the persisted `.fpilot/config.toml` surface

use serde::{Deserialize, Serialize};

/// Fallback Dart entrypoint when a profile leaves it blank
pub const DEFAULT_ENTRYPOINT: &str = "lib/main.dart";

/// Name of the synthetic profile materialized when no profiles are persisted
pub const DEFAULT_PROFILE_NAME: &str = "default";

/// A single named run configuration
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct RunProfile {
    /// Display name, unique among all persisted profiles
    pub name: String,

    /// Entry point passed as `-t` (defaults to lib/main.dart when blank)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dart_entrypoint: Option<String>,

    /// Build flavor passed as `--flavor` (omitted when blank)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flavor: Option<String>,

    /// Unknown fields round-trip untouched
    #[serde(flatten)]
    pub extra: toml::Table,
}

impl RunProfile {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            dart_entrypoint: None,
            flavor: None,
            extra: toml::Table::new(),
        }
    }

    /// The synthetic profile returned when the persisted list is empty.
    /// Never written back to storage by listing alone.
    pub fn synthetic_default() -> Self {
        Self {
            name: DEFAULT_PROFILE_NAME.to_string(),
            dart_entrypoint: Some(DEFAULT_ENTRYPOINT.to_string()),
            flavor: None,
            extra: toml::Table::new(),
        }
    }

    /// Effective entrypoint: configured value or the fixed fallback
    pub fn entrypoint(&self) -> &str {
        match self.dart_entrypoint.as_deref() {
            Some(path) if !path.trim().is_empty() => path,
            _ => DEFAULT_ENTRYPOINT,
        }
    }

    /// Effective flavor: trimmed, empty when blank or absent
    pub fn flavor(&self) -> &str {
        self.flavor.as_deref().map(str::trim).unwrap_or("")
    }

    /// Copy with entrypoint defaulted and flavor trimmed to empty-if-blank
    pub fn normalized(&self) -> Self {
        let mut profile = self.clone();
        profile.dart_entrypoint = Some(self.entrypoint().to_string());
        let flavor = self.flavor();
        profile.flavor = if flavor.is_empty() {
            None
        } else {
            Some(flavor.to_string())
        };
        profile
    }
}

/// Persisted settings (`.fpilot/config.toml`)
///
/// `profiles` is declared last so scalar keys serialize before the
/// array-of-tables.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ConfigFile {
    /// Name of the active profile
    #[serde(default = "default_profile_name")]
    pub active_profile: String,

    /// Debounced hot reload when a watched file is saved
    #[serde(default = "default_true")]
    pub hot_reload_on_save: bool,

    /// Third tier of the selected-device fallback chain
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preferred_device: Option<String>,

    /// Fourth tier of the selected-device fallback chain
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fallback_device: Option<String>,

    /// Ordered list of run profiles
    #[serde(default)]
    pub profiles: Vec<RunProfile>,
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self {
            active_profile: default_profile_name(),
            hot_reload_on_save: true,
            preferred_device: None,
            fallback_device: None,
            profiles: Vec::new(),
        }
    }
}

fn default_profile_name() -> String {
    DEFAULT_PROFILE_NAME.to_string()
}

fn default_true() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entrypoint_falls_back_when_blank() {
        let mut profile = RunProfile::new("dev");
        assert_eq!(profile.entrypoint(), DEFAULT_ENTRYPOINT);

        profile.dart_entrypoint = Some("   ".to_string());
        assert_eq!(profile.entrypoint(), DEFAULT_ENTRYPOINT);

        profile.dart_entrypoint = Some("lib/main_dev.dart".to_string());
        assert_eq!(profile.entrypoint(), "lib/main_dev.dart");
    }

    #[test]
    fn test_flavor_trimmed_to_empty() {
        let mut profile = RunProfile::new("dev");
        assert_eq!(profile.flavor(), "");

        profile.flavor = Some("  ".to_string());
        assert_eq!(profile.flavor(), "");

        profile.flavor = Some(" dev ".to_string());
        assert_eq!(profile.flavor(), "dev");
    }

    #[test]
    fn test_config_defaults() {
        let config: ConfigFile = toml::from_str("").unwrap();
        assert_eq!(config.active_profile, "default");
        assert!(config.hot_reload_on_save);
        assert!(config.profiles.is_empty());
    }

    #[test]
    fn test_extra_fields_preserved_round_trip() {
        let source = r#"
active_profile = "dev"

[[profiles]]
name = "dev"
flavor = "dev"
custom_field = "kept"
"#;
        let config: ConfigFile = toml::from_str(source).unwrap();
        assert_eq!(
            config.profiles[0].extra.get("custom_field"),
            Some(&toml::Value::String("kept".to_string()))
        );

        let serialized = toml::to_string(&config).unwrap();
        assert!(serialized.contains("custom_field"));
    }
}
