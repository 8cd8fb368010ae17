//! Utility functions for directory management and file persistence
//!
//! This module provides helper functions following the XDG Base Directory specification
//! for portable configuration and state storage across Linux distributions.
//!
//! # Directory Structure
//!
//! - Config: `~/.config/secws/` - Engine configuration (`config.json`)
//! - State: `~/.local/state/secws/` - Persisted rule table (`rules.bin`)
//!
//! # Example
//!
//! ```no_run
//! use secws::utils::{ensure_dir, rules_file_path};
//!
//! if let Some(path) = rules_file_path() {
//!     if let Some(dir) = path.parent() {
//!         ensure_dir(dir).expect("Failed to create state directory");
//!     }
//!     println!("rules live in {}", path.display());
//! }
//! ```

use directories::ProjectDirs;
use std::io::Write;
use std::path::{Path, PathBuf};

const CONFIG_FILE: &str = "config.json";
const RULES_FILE: &str = "rules.bin";

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("com", "secws", "secws")
}

pub fn get_config_dir() -> Option<PathBuf> {
    project_dirs().map(|pd| pd.config_dir().to_path_buf())
}

pub fn get_state_dir() -> Option<PathBuf> {
    project_dirs().and_then(|pd| pd.state_dir().map(Path::to_path_buf))
}

pub fn config_file_path() -> Option<PathBuf> {
    get_config_dir().map(|dir| dir.join(CONFIG_FILE))
}

pub fn rules_file_path() -> Option<PathBuf> {
    get_state_dir().map(|dir| dir.join(RULES_FILE))
}

/// Creates `dir` and any missing parents.
///
/// On Unix the directories are created with mode 0o700.
pub fn ensure_dir(dir: &Path) -> std::io::Result<()> {
    #[cfg(unix)]
    {
        use std::fs::DirBuilder;
        use std::os::unix::fs::DirBuilderExt;

        DirBuilder::new()
            .mode(0o700) // User read/write/execute only
            .recursive(true)
            .create(dir)
    }

    #[cfg(not(unix))]
    {
        std::fs::create_dir_all(dir)
    }
}

/// Writes `contents` to `path` so that readers see either the old file or the
/// complete new one.
///
/// 1. Writes to a temporary file in the same directory.
/// 2. Sets restrictive permissions (0o600) before any data is written.
/// 3. Atomically renames over the target path.
///
/// # Errors
///
/// Returns `Err` if the parent directory is missing or any step fails. A
/// full disk is reported with a readable message.
pub fn write_atomic(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));

    let mut temp = tempfile::NamedTempFile::new_in(dir)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        temp.as_file()
            .set_permissions(std::fs::Permissions::from_mode(0o600))?;
    }

    temp.write_all(contents)?;
    temp.as_file().sync_all()?;

    temp.persist(path).map_err(|e| {
        if e.error.kind() == std::io::ErrorKind::StorageFull {
            std::io::Error::new(
                std::io::ErrorKind::StorageFull,
                "Disk full: cannot save file. Free up space and try again.",
            )
        } else {
            e.error
        }
    })?;
    Ok(())
}
