//! Engine configuration.
//!
//! The engine is wired from one explicit configuration object constructed
//! at process start — there is no ambient global state. Configs are plain
//! YAML with defaults for every optional field.

use crate::domain::types::{SpecialistKind, TaskPriority};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Top-level engine configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct EngineConfig {
    #[serde(default)]
    pub event_store: EventStoreConfig,
    #[serde(default)]
    pub delegation: DelegationConfig,
    #[serde(default)]
    pub tasks: TasksConfig,
}

impl EngineConfig {
    /// Loads configuration from a YAML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;
        let config: EngineConfig = serde_yaml::from_str(&content)
            .with_context(|| format!("failed to parse config file: {}", path.display()))?;
        Ok(config)
    }

    /// Configuration rooted in a data directory, for embedding and tests.
    pub fn with_data_dir(dir: &Path) -> Self {
        Self {
            event_store: EventStoreConfig {
                log_path: dir.join("events.jsonl"),
                snapshot_dir: dir.join("snapshots"),
                snapshot_every: default_snapshot_every(),
            },
            ..Self::default()
        }
    }
}

/// Where the event log lives.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EventStoreConfig {
    #[serde(default = "default_log_path")]
    pub log_path: PathBuf,
    #[serde(default = "default_snapshot_dir")]
    pub snapshot_dir: PathBuf,
    /// Snapshot after every N events (0 = disabled).
    #[serde(default = "default_snapshot_every")]
    pub snapshot_every: u64,
}

impl Default for EventStoreConfig {
    fn default() -> Self {
        Self {
            log_path: default_log_path(),
            snapshot_dir: default_snapshot_dir(),
            snapshot_every: default_snapshot_every(),
        }
    }
}

/// Delegation timeouts.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DelegationConfig {
    /// Timeout applied to every delegation call, in seconds.
    #[serde(default = "default_timeout_secs")]
    pub default_timeout_secs: u64,
    /// Per-specialist overrides, in seconds.
    #[serde(default)]
    pub timeout_overrides_secs: HashMap<SpecialistKind, u64>,
}

impl DelegationConfig {
    /// The timeout for one specialist's delegations.
    pub fn timeout_for(&self, specialist: SpecialistKind) -> Duration {
        let secs = self
            .timeout_overrides_secs
            .get(&specialist)
            .copied()
            .unwrap_or(self.default_timeout_secs);
        Duration::from_secs(secs)
    }
}

impl Default for DelegationConfig {
    fn default() -> Self {
        Self {
            default_timeout_secs: default_timeout_secs(),
            timeout_overrides_secs: HashMap::new(),
        }
    }
}

/// Task registry defaults.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TasksConfig {
    /// Retry budget for workflow-created tasks.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Priority for workflow-created tasks.
    #[serde(default)]
    pub default_priority: TaskPriority,
}

impl Default for TasksConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            default_priority: TaskPriority::default(),
        }
    }
}

fn default_log_path() -> PathBuf {
    PathBuf::from(".agency/events.jsonl")
}

fn default_snapshot_dir() -> PathBuf {
    PathBuf::from(".agency/snapshots")
}

fn default_snapshot_every() -> u64 {
    50
}

fn default_timeout_secs() -> u64 {
    120
}

fn default_max_retries() -> u32 {
    3
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.event_store.snapshot_every, 50);
        assert_eq!(config.delegation.default_timeout_secs, 120);
        assert_eq!(config.tasks.max_retries, 3);
        assert_eq!(config.tasks.default_priority, TaskPriority::Medium);
    }

    #[test]
    fn test_parse_partial_yaml_fills_defaults() {
        let yaml = r#"
delegation:
  default_timeout_secs: 30
  timeout_overrides_secs:
    deep_research: 300
"#;
        let config: EngineConfig = serde_yaml::from_str(yaml).expect("parse");
        assert_eq!(config.delegation.default_timeout_secs, 30);
        assert_eq!(
            config.delegation.timeout_for(SpecialistKind::DeepResearch),
            Duration::from_secs(300)
        );
        assert_eq!(
            config.delegation.timeout_for(SpecialistKind::Qa),
            Duration::from_secs(30)
        );
        assert_eq!(config.tasks.max_retries, 3);
    }

    #[test]
    fn test_load_missing_file_reports_path() {
        let err = EngineConfig::load(Path::new("/nonexistent/agency.yaml"))
            .expect_err("missing file should fail");
        assert!(err.to_string().contains("/nonexistent/agency.yaml"));
    }
}
