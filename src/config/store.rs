//! Profile store backed by `.fpilot/config.toml`
//!
//! A small CRUD layer over the persisted ordered profile list. Uniqueness
//! of profile names is enforced by callers before persistence (see
//! [`add_profile`] / [`rename_profile`]); the store itself performs no
//! deduplication.

use fs2::FileExt;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::config::types::{ConfigFile, RunProfile, DEFAULT_PROFILE_NAME};
use crate::prelude::*;

const CONFIG_FILENAME: &str = "config.toml";
const FPILOT_DIR: &str = ".fpilot";

/// Reads and writes the persisted configuration for one project folder
#[derive(Debug, Clone)]
pub struct ProfileStore {
    config_path: PathBuf,
}

impl ProfileStore {
    pub fn new(project_dir: &Path) -> Self {
        Self {
            config_path: project_dir.join(FPILOT_DIR).join(CONFIG_FILENAME),
        }
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    /// Load the persisted configuration; a missing file yields defaults
    pub fn load(&self) -> Result<ConfigFile> {
        match std::fs::read_to_string(&self.config_path) {
            Ok(content) => Ok(toml::from_str(&content)?),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(ConfigFile::default()),
            Err(err) => Err(err.into()),
        }
    }

    /// List profiles, normalized (entrypoint defaulted, flavor trimmed).
    ///
    /// An empty persisted list yields exactly one synthetic `default`
    /// profile, which is never written back by listing alone.
    pub fn list(&self) -> Result<Vec<RunProfile>> {
        let config = self.load()?;
        if config.profiles.is_empty() {
            return Ok(vec![RunProfile::synthetic_default()]);
        }
        Ok(config.profiles.iter().map(RunProfile::normalized).collect())
    }

    /// The profile named by `active_profile`, falling back to the first
    pub fn active(&self) -> Result<RunProfile> {
        let config = self.load()?;
        let profiles = self.list()?;
        let profile = profiles
            .iter()
            .find(|p| p.name == config.active_profile)
            .or_else(|| profiles.first())
            .cloned()
            .ok_or_else(|| Error::config("no run profiles configured"))?;
        Ok(profile)
    }

    /// Replace the entire persisted profile list.
    ///
    /// Callers are responsible for uniqueness checks before calling.
    pub fn save(&self, profiles: Vec<RunProfile>) -> Result<()> {
        let mut config = self.load()?;
        config.profiles = profiles;
        self.persist(&config)
    }

    /// Persist the active-profile pointer
    pub fn set_active(&self, name: &str) -> Result<()> {
        let mut config = self.load()?;
        if !self.list()?.iter().any(|p| p.name == name) {
            return Err(Error::unknown_profile(name));
        }
        config.active_profile = name.to_string();
        self.persist(&config)
    }

    /// Delete a profile by name.
    ///
    /// If the deleted profile was active, the pointer falls back to the new
    /// first profile's name, or the literal default name on an empty list.
    pub fn delete(&self, name: &str) -> Result<()> {
        let mut config = self.load()?;
        let before = config.profiles.len();
        config.profiles.retain(|p| p.name != name);
        if config.profiles.len() == before {
            return Err(Error::unknown_profile(name));
        }
        if config.active_profile == name {
            config.active_profile = config
                .profiles
                .first()
                .map(|p| p.name.clone())
                .unwrap_or_else(|| DEFAULT_PROFILE_NAME.to_string());
        }
        self.persist(&config)
    }

    pub fn hot_reload_on_save(&self) -> bool {
        self.load().map(|c| c.hot_reload_on_save).unwrap_or(true)
    }

    /// The two configuration keys of the device fallback chain
    pub fn device_keys(&self) -> (Option<String>, Option<String>) {
        match self.load() {
            Ok(config) => (config.preferred_device, config.fallback_device),
            Err(_) => (None, None),
        }
    }

    /// Write the config file under an exclusive lock
    pub fn persist(&self, config: &ConfigFile) -> Result<()> {
        let content = toml::to_string_pretty(config)?;

        if let Some(parent) = self.config_path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| Error::config(format!("Failed to create {}: {}", FPILOT_DIR, e)))?;
        }

        let mut file = std::fs::OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&self.config_path)
            .map_err(|e| Error::config(format!("Failed to open config.toml: {}", e)))?;

        file.lock_exclusive()
            .map_err(|e| Error::config(format!("Failed to lock config.toml: {}", e)))?;

        file.write_all(content.as_bytes())
            .map_err(|e| Error::config(format!("Failed to write config.toml: {}", e)))?;
        file.flush()
            .map_err(|e| Error::config(format!("Failed to flush config.toml: {}", e)))?;

        // Lock released when the file handle drops
        info!("Saved config to {:?}", self.config_path);
        Ok(())
    }
}

/// Add a new profile, rejecting a duplicate name before persistence
pub fn add_profile(store: &ProfileStore, profile: RunProfile) -> Result<()> {
    let config = store.load()?;
    if config.profiles.iter().any(|p| p.name == profile.name) {
        return Err(Error::duplicate_profile(&profile.name));
    }
    let mut profiles = config.profiles;
    profiles.push(profile);
    store.save(profiles)
}

/// Rename a profile, rejecting a collision with an existing name.
///
/// On collision the persisted list is left unchanged. If the renamed
/// profile was active, the active pointer follows it.
pub fn rename_profile(store: &ProfileStore, old_name: &str, new_name: &str) -> Result<()> {
    let mut config = store.load()?;
    if old_name != new_name && config.profiles.iter().any(|p| p.name == new_name) {
        return Err(Error::duplicate_profile(new_name));
    }
    let profile = config
        .profiles
        .iter_mut()
        .find(|p| p.name == old_name)
        .ok_or_else(|| Error::unknown_profile(old_name))?;
    profile.name = new_name.to_string();
    if config.active_profile == old_name {
        config.active_profile = new_name.to_string();
    }
    store.persist(&config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::types::DEFAULT_ENTRYPOINT;
    use tempfile::TempDir;

    fn store_in(tmp: &TempDir) -> ProfileStore {
        ProfileStore::new(tmp.path())
    }

    fn named(name: &str) -> RunProfile {
        RunProfile::new(name)
    }

    #[test]
    fn test_empty_list_yields_synthetic_default() {
        let tmp = TempDir::new().unwrap();
        let store = store_in(&tmp);

        let profiles = store.list().unwrap();
        assert_eq!(profiles.len(), 1);
        assert_eq!(profiles[0].name, "default");
        assert_eq!(profiles[0].entrypoint(), DEFAULT_ENTRYPOINT);
        assert_eq!(profiles[0].flavor(), "");

        // Listing alone never writes the synthetic profile back
        assert!(!store.config_path().exists());
    }

    #[test]
    fn test_active_returns_named_profile() {
        let tmp = TempDir::new().unwrap();
        let store = store_in(&tmp);
        store.save(vec![named("dev"), named("prod")]).unwrap();
        store.set_active("prod").unwrap();

        assert_eq!(store.active().unwrap().name, "prod");
    }

    #[test]
    fn test_active_falls_back_to_first_when_name_absent() {
        let tmp = TempDir::new().unwrap();
        let store = store_in(&tmp);
        store.save(vec![named("dev"), named("prod")]).unwrap();

        // active_profile defaults to "default", which matches nothing
        assert_eq!(store.active().unwrap().name, "dev");
    }

    #[test]
    fn test_set_active_unknown_name_rejected() {
        let tmp = TempDir::new().unwrap();
        let store = store_in(&tmp);
        store.save(vec![named("dev")]).unwrap();

        assert!(matches!(
            store.set_active("missing"),
            Err(Error::UnknownProfile { .. })
        ));
    }

    #[test]
    fn test_delete_active_falls_back_to_new_first() {
        let tmp = TempDir::new().unwrap();
        let store = store_in(&tmp);
        store.save(vec![named("dev"), named("prod")]).unwrap();
        store.set_active("dev").unwrap();

        store.delete("dev").unwrap();
        assert_eq!(store.load().unwrap().active_profile, "prod");
    }

    #[test]
    fn test_delete_last_profile_resets_active_to_default() {
        let tmp = TempDir::new().unwrap();
        let store = store_in(&tmp);
        store.save(vec![named("only")]).unwrap();
        store.set_active("only").unwrap();

        store.delete("only").unwrap();
        assert_eq!(store.load().unwrap().active_profile, "default");
        assert!(store.load().unwrap().profiles.is_empty());
    }

    #[test]
    fn test_add_profile_rejects_duplicate_name() {
        let tmp = TempDir::new().unwrap();
        let store = store_in(&tmp);
        add_profile(&store, named("dev")).unwrap();

        let result = add_profile(&store, named("dev"));
        assert!(matches!(result, Err(Error::DuplicateProfile { .. })));
        assert_eq!(store.load().unwrap().profiles.len(), 1);
    }

    #[test]
    fn test_rename_collision_leaves_list_unchanged() {
        let tmp = TempDir::new().unwrap();
        let store = store_in(&tmp);
        store.save(vec![named("dev"), named("prod")]).unwrap();

        let result = rename_profile(&store, "dev", "prod");
        assert!(matches!(result, Err(Error::DuplicateProfile { .. })));

        let names: Vec<String> = store
            .load()
            .unwrap()
            .profiles
            .iter()
            .map(|p| p.name.clone())
            .collect();
        assert_eq!(names, vec!["dev", "prod"]);
    }

    #[test]
    fn test_rename_moves_active_pointer() {
        let tmp = TempDir::new().unwrap();
        let store = store_in(&tmp);
        store.save(vec![named("dev")]).unwrap();
        store.set_active("dev").unwrap();

        rename_profile(&store, "dev", "develop").unwrap();
        assert_eq!(store.load().unwrap().active_profile, "develop");
    }

    #[test]
    fn test_list_normalizes_entrypoint_and_flavor() {
        let tmp = TempDir::new().unwrap();
        let store = store_in(&tmp);
        let mut profile = named("dev");
        profile.flavor = Some("  dev  ".to_string());
        store.save(vec![profile]).unwrap();

        let listed = store.list().unwrap();
        assert_eq!(listed[0].dart_entrypoint.as_deref(), Some(DEFAULT_ENTRYPOINT));
        assert_eq!(listed[0].flavor.as_deref(), Some("dev"));
    }
}
