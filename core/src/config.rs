//! Profile store.
//!
//! Stores forwarding profiles in JSON format at `~/.kubeward/profiles.json`.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tokio::fs;

use crate::error::{Error, Result};
use crate::profile::Profile;

/// On-disk representation: profile name -> profile.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileConfig {
    #[serde(default)]
    pub profiles: BTreeMap<String, Profile>,
}

/// Configuration store for forwarding profiles.
pub struct ProfileStore {
    config_path: PathBuf,
}

impl ProfileStore {
    /// Creates a store with the default path (~/.kubeward/profiles.json).
    pub fn new() -> Result<Self> {
        let config_dir = dirs::home_dir()
            .ok_or_else(|| Error::Config("Could not find home directory".to_string()))?
            .join(".kubeward");

        Ok(Self {
            config_path: config_dir.join("profiles.json"),
        })
    }

    /// Creates a store with a custom path.
    pub fn with_path(path: PathBuf) -> Self {
        Self { config_path: path }
    }

    /// Returns the config file path.
    pub fn config_path(&self) -> &PathBuf {
        &self.config_path
    }

    /// Loads the configuration from disk.
    pub async fn load(&self) -> Result<ProfileConfig> {
        if !self.config_path.exists() {
            return Ok(ProfileConfig::default());
        }

        let content = fs::read_to_string(&self.config_path)
            .await
            .map_err(|e| Error::Config(format!("Failed to read profiles: {}", e)))?;

        serde_json::from_str(&content)
            .map_err(|e| Error::Config(format!("Failed to parse profiles: {}", e)))
    }

    /// Saves the configuration to disk.
    pub async fn save(&self, config: &ProfileConfig) -> Result<()> {
        if let Some(parent) = self.config_path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| Error::Config(format!("Failed to create config dir: {}", e)))?;
        }

        // Write to a temp file first, then rename (atomic write)
        let temp_path = self.config_path.with_extension("json.tmp");
        let content = serde_json::to_string_pretty(config)
            .map_err(|e| Error::Config(format!("Failed to serialize profiles: {}", e)))?;

        fs::write(&temp_path, content)
            .await
            .map_err(|e| Error::Config(format!("Failed to write profiles: {}", e)))?;

        fs::rename(&temp_path, &self.config_path)
            .await
            .map_err(|e| Error::Config(format!("Failed to save profiles: {}", e)))?;

        Ok(())
    }

    /// Returns the names of all stored profiles.
    pub async fn profile_names(&self) -> Result<Vec<String>> {
        let config = self.load().await?;
        Ok(config.profiles.keys().cloned().collect())
    }

    /// Resolves a profile by name.
    ///
    /// A missing name is a distinct error that enumerates the available
    /// profile names as a recovery hint.
    pub async fn get_profile(&self, name: &str) -> Result<Profile> {
        let config = self.load().await?;
        match config.profiles.get(name) {
            Some(profile) => Ok(profile.clone()),
            None => Err(Error::ProfileNotFound {
                name: name.to_string(),
                available: config.profiles.keys().cloned().collect(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::{ForwardSpec, ResourceType};
    use tempfile::tempdir;

    fn sample_profile() -> Profile {
        Profile {
            context: None,
            namespace: "default".to_string(),
            forwards: vec![ForwardSpec {
                name: "api".to_string(),
                resource_type: ResourceType::Deployment,
                local_port: 8080,
                remote_port: 80,
            }],
        }
    }

    fn config_with(names: &[&str]) -> ProfileConfig {
        let mut config = ProfileConfig::default();
        for name in names {
            config.profiles.insert(name.to_string(), sample_profile());
        }
        config
    }

    #[tokio::test]
    async fn test_store_round_trip() {
        let temp_dir = tempdir().unwrap();
        let store = ProfileStore::with_path(temp_dir.path().join("profiles.json"));

        assert!(store.profile_names().await.unwrap().is_empty());

        store.save(&config_with(&["dev"])).await.unwrap();

        let names = store.profile_names().await.unwrap();
        assert_eq!(names, vec!["dev".to_string()]);

        let profile = store.get_profile("dev").await.unwrap();
        assert_eq!(profile, sample_profile());
    }

    #[tokio::test]
    async fn test_missing_profile_lists_available() {
        let temp_dir = tempdir().unwrap();
        let store = ProfileStore::with_path(temp_dir.path().join("profiles.json"));

        store.save(&config_with(&["dev", "prod"])).await.unwrap();

        let err = store.get_profile("staging").await.unwrap_err();
        match err {
            Error::ProfileNotFound { name, available } => {
                assert_eq!(name, "staging");
                assert_eq!(available, vec!["dev".to_string(), "prod".to_string()]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_unparseable_store_is_config_error() {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("profiles.json");
        std::fs::write(&path, "not json").unwrap();

        let store = ProfileStore::with_path(path);
        assert!(matches!(store.load().await, Err(Error::Config(_))));
    }
}
