//! Engine configuration persistence
//!
//! The configuration holds what the rule table does not: the default policy
//! and the interface naming convention. It is stored as pretty JSON and a
//! missing or broken file falls back to defaults.

use crate::core::direction::InterfaceConvention;
use crate::core::engine::DEFAULT_POLICY;
use crate::core::error::{Error, Result};
use crate::core::firewall::Verdict;
use crate::utils::{config_file_path, write_atomic};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Engine settings that are not part of the rule table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Verdict for packets no rule matches
    #[serde(default = "default_policy")]
    pub default_policy: Verdict,
    /// How inbound traffic is recognised from interface names
    #[serde(default)]
    pub interfaces: InterfaceConvention,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_policy: DEFAULT_POLICY,
            interfaces: InterfaceConvention::default(),
        }
    }
}

fn default_policy() -> Verdict {
    DEFAULT_POLICY
}

fn resolve_path(path: Option<&Path>) -> Option<PathBuf> {
    path.map(Path::to_path_buf).or_else(config_file_path)
}

/// Saves the config as pretty JSON using an atomic write.
///
/// `path` overrides the XDG location.
///
/// # Security
///
/// On Unix systems, the file is created with mode 0o600 (user read/write only).
pub fn save_config(config: &EngineConfig, path: Option<&Path>) -> Result<()> {
    let path = resolve_path(path).ok_or(Error::NoDirectory("config"))?;
    let json = serde_json::to_string_pretty(config)?;
    write_atomic(&path, json.as_bytes())?;
    tracing::debug!(path = %path.display(), "Saved configuration");
    Ok(())
}

/// Loads the config, or returns the default if it is missing or unreadable.
///
/// `path` overrides the XDG location.
pub fn load_config(path: Option<&Path>) -> EngineConfig {
    let Some(path) = resolve_path(path) else {
        return EngineConfig::default();
    };

    let json = match std::fs::read_to_string(&path) {
        Ok(json) => json,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return EngineConfig::default(),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "Cannot read config, using defaults");
            return EngineConfig::default();
        }
    };

    match serde_json::from_str::<EngineConfig>(&json) {
        Ok(config) => config,
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "Invalid config, using defaults");
            EngineConfig::default()
        }
    }
}
