//! Engine configuration.
//!
//! Read from `config.json` in the platform config directory, then overridden
//! by `WORKGATE_*` environment variables. A missing or unreadable file falls
//! back to defaults.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::models::{Phase, TaskType};
use crate::rules::Preset;

const APP_NAME: &str = "workgate";
const CONFIG_FILE: &str = "config.json";

pub const ENV_DB: &str = "WORKGATE_DB";
pub const ENV_PRESET: &str = "WORKGATE_PRESET";
pub const ENV_AUTO_ADVANCE: &str = "WORKGATE_AUTO_ADVANCE_PHASE";

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EngineConfig {
    /// Database file. Defaults to `workgate.db` in the platform data directory.
    pub database_path: Option<PathBuf>,
    /// Preset used when a project is initialized without one.
    pub default_preset: Preset,
    /// Move the phase forward when a work item enters ACTIVE, REVIEW or DONE.
    pub auto_advance_phase: bool,
    /// Per-phase orchestrator overrides. `null` unmaps a phase.
    pub routing: HashMap<Phase, Option<String>>,
    /// Per-task-type assignee overrides. `null` unmaps a type.
    pub assignments: HashMap<TaskType, Option<String>>,
}

impl EngineConfig {
    /// Load from the default location, then apply the environment.
    pub fn load() -> Self {
        let mut config = match config_path().and_then(|path| Self::load_from(&path)) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!("Failed to load config, using defaults: {:#}", e);
                Self::default()
            }
        };
        config.apply_env(|key| std::env::var(key).ok());
        config
    }

    /// Read `path`. A missing file yields the defaults.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        Ok(config)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).context("Failed to create config directory")?;
        }
        let content = serde_json::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(path, content).context("Failed to write config file")?;
        Ok(())
    }

    /// Apply `WORKGATE_*` overrides. Unparseable values are ignored with a warning.
    pub fn apply_env(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(db) = var(ENV_DB).filter(|v| !v.is_empty()) {
            self.database_path = Some(PathBuf::from(db));
        }

        if let Some(preset) = var(ENV_PRESET) {
            match Preset::from_str(preset.trim()) {
                Some(preset) => self.default_preset = preset,
                None => tracing::warn!("Ignoring unknown {}={}", ENV_PRESET, preset),
            }
        }

        if let Some(flag) = var(ENV_AUTO_ADVANCE) {
            match flag.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => self.auto_advance_phase = true,
                "0" | "false" | "no" | "off" => self.auto_advance_phase = false,
                other => tracing::warn!("Ignoring unknown {}={}", ENV_AUTO_ADVANCE, other),
            }
        }
    }
}

/// `config.json` in the platform config directory.
pub fn config_path() -> Result<PathBuf> {
    let dirs = directories::ProjectDirs::from("", "", APP_NAME)
        .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;
    Ok(dirs.config_dir().join(CONFIG_FILE))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = TempDir::new().unwrap();
        let config = EngineConfig::load_from(&dir.path().join("config.json")).unwrap();
        assert_eq!(config, EngineConfig::default());
        assert!(!config.auto_advance_phase);
        assert_eq!(config.default_preset, Preset::Standard);
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        fs::write(
            &path,
            r#"{
                "default_preset": "enterprise",
                "routing": { "O1_OPERATIONS": "sre-orch" },
                "assignments": { "testing": "qa-bot", "review": null }
            }"#,
        )
        .unwrap();

        let config = EngineConfig::load_from(&path).unwrap();
        assert_eq!(config.default_preset, Preset::Enterprise);
        assert!(!config.auto_advance_phase);
        assert_eq!(
            config.routing.get(&Phase::O1Operations),
            Some(&Some("sre-orch".to_string()))
        );
        assert_eq!(config.assignments.get(&TaskType::Review), Some(&None));
    }

    #[test]
    fn test_malformed_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "{ not json").unwrap();
        assert!(EngineConfig::load_from(&path).is_err());
    }

    #[test]
    fn test_save_then_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.json");
        let config = EngineConfig {
            auto_advance_phase: true,
            default_preset: Preset::Minimal,
            ..Default::default()
        };
        config.save_to(&path).unwrap();
        assert_eq!(EngineConfig::load_from(&path).unwrap(), config);
    }

    #[test]
    fn test_env_overrides() {
        let env = HashMap::from([
            (ENV_DB, "/tmp/wg.db"),
            (ENV_PRESET, "professional"),
            (ENV_AUTO_ADVANCE, "true"),
        ]);
        let mut config = EngineConfig::default();
        config.apply_env(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.database_path, Some(PathBuf::from("/tmp/wg.db")));
        assert_eq!(config.default_preset, Preset::Professional);
        assert!(config.auto_advance_phase);
    }

    #[test]
    fn test_bad_env_values_are_ignored() {
        let mut config = EngineConfig::default();
        config.apply_env(|key| match key {
            ENV_PRESET => Some("gigantic".into()),
            ENV_AUTO_ADVANCE => Some("maybe".into()),
            _ => None,
        });
        assert_eq!(config, EngineConfig::default());
    }
}
