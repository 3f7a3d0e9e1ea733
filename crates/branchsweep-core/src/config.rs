use std::fs;
use std::path::{Path, PathBuf};

use directories::BaseDirs;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::branch::MergeRelation;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SweepConfig {
    pub version: u32,
    #[serde(default)]
    pub defaults: SweepDefaults,
}

/// Default classification parameters; every field can be overridden by the
/// host (CLI flags, TUI controls).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct SweepDefaults {
    #[serde(default = "default_reference_branch")]
    pub reference_branch: String,
    #[serde(default = "default_remote_name")]
    pub remote_name: String,
    #[serde(default = "default_older_than_days")]
    pub older_than_days: u32,
    #[serde(default)]
    pub include_remotes: bool,
    #[serde(default = "default_merge_relation")]
    pub merge_relation: String,
    #[serde(default)]
    pub pattern: Option<String>,
}

impl Default for SweepDefaults {
    fn default() -> Self {
        Self {
            reference_branch: default_reference_branch(),
            remote_name: default_remote_name(),
            older_than_days: default_older_than_days(),
            include_remotes: false,
            merge_relation: default_merge_relation(),
            pattern: None,
        }
    }
}

impl SweepDefaults {
    pub fn merge_relation(&self) -> MergeRelation {
        MergeRelation::parse(&self.merge_relation).unwrap_or_default()
    }
}

fn default_reference_branch() -> String {
    "main".to_string()
}

fn default_remote_name() -> String {
    "origin".to_string()
}

fn default_older_than_days() -> u32 {
    30
}

fn default_merge_relation() -> String {
    MergeRelation::MergedOnly.as_str().to_string()
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not resolve home directory for config path")]
    HomeDirectoryUnavailable,
    #[error("failed to read config at {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("invalid config: {message}")]
    Validation { message: String },
}

pub fn resolve_config_path() -> Result<PathBuf, ConfigError> {
    let base_dirs = BaseDirs::new().ok_or(ConfigError::HomeDirectoryUnavailable)?;
    Ok(base_dirs
        .home_dir()
        .join(".config")
        .join("branchsweep")
        .join("config.toml"))
}

pub fn load_config(path: &Path) -> Result<SweepConfig, ConfigError> {
    let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    let parsed: SweepConfig = toml::from_str(&raw).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })?;

    validate_config(&parsed)?;
    Ok(parsed)
}

/// A missing config file means built-in defaults; an unreadable or invalid
/// one is an error the user must fix.
pub fn load_or_default() -> Result<SweepConfig, ConfigError> {
    let path = resolve_config_path()?;
    if !path.exists() {
        return Ok(SweepConfig {
            version: 1,
            defaults: SweepDefaults::default(),
        });
    }

    load_config(&path)
}

pub fn validate_config(config: &SweepConfig) -> Result<(), ConfigError> {
    if config.version != 1 {
        return Err(ConfigError::Validation {
            message: "version must be 1".to_string(),
        });
    }

    if config.defaults.reference_branch.trim().is_empty() {
        return Err(ConfigError::Validation {
            message: "defaults.reference_branch must be non-empty".to_string(),
        });
    }

    if config.defaults.remote_name.trim().is_empty() {
        return Err(ConfigError::Validation {
            message: "defaults.remote_name must be non-empty".to_string(),
        });
    }

    if MergeRelation::parse(&config.defaults.merge_relation).is_none() {
        return Err(ConfigError::Validation {
            message: format!(
                "defaults.merge_relation must be one of all, merged-only, nothing-to-merge (got '{}')",
                config.defaults.merge_relation
            ),
        });
    }

    if let Some(pattern) = &config.defaults.pattern
        && let Err(error) = regex::Regex::new(pattern)
    {
        return Err(ConfigError::Validation {
            message: format!("defaults.pattern is not a valid regex: {error}"),
        });
    }

    Ok(())
}
