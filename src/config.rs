//! Configuration and naming conventions.
//!
//! This module owns the constants every component must agree on for
//! cross-process composition to work: the meta file name, the lock-file
//! naming convention, and the JSON indent used for exports. It also resolves
//! the default state directory.
//!
//! # Resolution strategy
//!
//! 1. `LINKSTASH_STATE_DIR` environment variable, if non-empty.
//! 2. `~/.linkstash/` under the user's home directory.

use std::path::{Path, PathBuf};

/// File name of the canonical on-disk state representation.
pub const META_FILE_NAME: &str = "meta.json";

/// Suffix appended to a guarded path to form its companion lock file.
pub const LOCK_SUFFIX: &str = ".lock";

/// Indent unit for pretty-printed JSON exports (fixed at four spaces).
pub const JSON_INDENT: &[u8] = b"    ";

/// Environment variable overriding the default state directory.
pub const STATE_DIR_ENV: &str = "LINKSTASH_STATE_DIR";

/// Resolve the default state directory.
///
/// Returns `None` only when no home directory can be determined and the
/// environment override is unset.
#[must_use]
pub fn default_state_dir() -> Option<PathBuf> {
    if let Ok(dir) = std::env::var(STATE_DIR_ENV) {
        if !dir.is_empty() {
            return Some(PathBuf::from(dir));
        }
    }
    directories::BaseDirs::new().map(|b| b.home_dir().join(".linkstash"))
}

/// Companion lock-file path for a guarded path.
///
/// Two operations contend if and only if they derive the same lock path, so
/// everything that touches a shared file must funnel through this one
/// convention.
#[must_use]
pub fn lock_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(LOCK_SUFFIX);
    PathBuf::from(name)
}

/// Whether a path selects gzip transparently by suffix.
#[must_use]
pub fn is_gzip_path(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == "gz")
}
