//! Lock-guarded persistence manager for the meta file.
//!
//! [`MetaStore`] is the only component that touches the shared file. Every
//! operation acquires the companion `<path>.lock` before reading or writing,
//! so save/load/exists/create-if-absent compose safely under concurrent
//! access from unrelated call sites, as long as they agree on the target
//! path.
//!
//! Absence of the file is a negative result (`Ok(None)` / `Ok(false)`),
//! never an error; callers must treat "no prior state" and
//! "present but empty" as distinct cases.

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use serde_json::Value as JsonValue;
use tracing::debug;

use crate::config::{self, META_FILE_NAME};
use crate::error::{Error, Result};
use crate::state::{Schema, StateSet};
use crate::storage::lock::with_lock;

/// Persistence manager for a state directory and its meta file.
#[derive(Debug, Clone)]
pub struct MetaStore {
    state_dir: PathBuf,
    meta_path: PathBuf,
}

impl MetaStore {
    /// Create a manager rooted at `state_dir`, with the meta file at the
    /// conventional `<state_dir>/meta.json`.
    pub fn new(state_dir: impl Into<PathBuf>) -> Self {
        let state_dir = state_dir.into();
        let meta_path = state_dir.join(META_FILE_NAME);
        Self {
            state_dir,
            meta_path,
        }
    }

    /// The state directory this manager was rooted at.
    #[must_use]
    pub fn state_dir(&self) -> &Path {
        &self.state_dir
    }

    /// Re-root the state directory. The meta path is left untouched.
    pub fn set_state_dir(&mut self, dir: impl Into<PathBuf>) {
        self.state_dir = dir.into();
    }

    /// The currently configured meta file path.
    #[must_use]
    pub fn meta_path(&self) -> &Path {
        &self.meta_path
    }

    /// Override the configured meta file path.
    pub fn set_meta_path(&mut self, path: impl Into<PathBuf>) {
        self.meta_path = path.into();
    }

    /// Create the state directory (and parents) if missing.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the directory cannot be created.
    pub fn create_dir(&self) -> Result<()> {
        fs::create_dir_all(&self.state_dir)?;
        Ok(())
    }

    fn decide_path(&self, path: Option<&Path>) -> PathBuf {
        path.map_or_else(|| self.meta_path.clone(), Path::to_path_buf)
    }

    /// Serialize `state` to pretty JSON and write it to `path` (or the
    /// configured meta path), fully overwriting prior contents.
    ///
    /// The write happens inside the lock, so a concurrent reader of the same
    /// path blocks until it completes and never observes a partial file.
    /// The configured meta path is updated to the path just used.
    ///
    /// # Errors
    ///
    /// Returns an error if the lock cannot be acquired or the write fails.
    pub fn save(&mut self, state: &StateSet, path: Option<&Path>) -> Result<()> {
        let path = self.decide_path(path);
        self.meta_path.clone_from(&path);

        with_lock(&config::lock_path(&path), || {
            write_pretty_json(&path, &state.to_value())
        })?;
        debug!(path = %path.display(), keys = state.len(), "state saved");
        Ok(())
    }

    /// Load and reconstruct the state from the configured meta path.
    ///
    /// Returns `Ok(None)` when the file does not exist (no prior state).
    /// Otherwise the file is decoded under lock and reconstructed with
    /// default filling enabled. With `section`, only the sub-object stored
    /// under that top-level key is reconstructed; a missing section
    /// reconstructs to all schema defaults.
    ///
    /// # Errors
    ///
    /// Decode and reconstruction errors are surfaced to the caller, never
    /// swallowed.
    pub fn load(&self, schema: &Schema, section: Option<&str>) -> Result<Option<StateSet>> {
        let path = self.meta_path.clone();
        if !path.exists() {
            return Ok(None);
        }

        let raw = with_lock(&config::lock_path(&path), || read_json(&path))?;

        let scoped = match section {
            Some(key) => match &raw {
                JsonValue::Object(map) => map.get(key).cloned().unwrap_or_else(
                    || JsonValue::Object(serde_json::Map::new()),
                ),
                _ => return Err(Error::NotAnObject { path }),
            },
            None => raw,
        };

        let state = StateSet::from_raw(&scoped, schema, true).map_err(|err| match err {
            Error::NotAnObject { .. } => Error::NotAnObject { path: path.clone() },
            other => other,
        })?;
        debug!(path = %path.display(), keys = state.len(), "state loaded");
        Ok(Some(state))
    }

    /// Whether `path` (or the configured meta path) exists with size
    /// strictly greater than zero.
    ///
    /// Distinguishes "present but empty" from "absent"; both are negative
    /// here, while a bare existence check would treat them differently.
    ///
    /// # Errors
    ///
    /// Returns an error if the lock cannot be acquired or metadata cannot
    /// be read.
    pub fn data_exists(&self, path: Option<&Path>) -> Result<bool> {
        let path = self.decide_path(path);
        with_lock(&config::lock_path(&path), || {
            if !path.exists() {
                return Ok(false);
            }
            Ok(fs::metadata(&path)?.len() > 0)
        })
    }

    /// Write `data` to `path` (or the configured meta path) only if the file
    /// does not already exist; a no-op otherwise.
    ///
    /// The existence check and the write share one lock acquisition, so
    /// racing processes calling this at startup produce exactly one write.
    ///
    /// # Errors
    ///
    /// Returns an error if the lock cannot be acquired or the write fails.
    pub fn create_if_absent(&self, data: &JsonValue, path: Option<&Path>) -> Result<()> {
        let path = self.decide_path(path);
        with_lock(&config::lock_path(&path), || {
            if path.exists() {
                return Ok(());
            }
            debug!(path = %path.display(), "initializing absent file");
            write_json(&path, data)
        })
    }

    /// Read the decoded raw JSON structure without schema reconstruction.
    ///
    /// Returns `Ok(None)` when `path` (or the configured meta path) does not
    /// exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the lock cannot be acquired or decoding fails.
    pub fn read_raw(&self, path: Option<&Path>) -> Result<Option<JsonValue>> {
        let path = self.decide_path(path);
        if !path.exists() {
            return Ok(None);
        }
        with_lock(&config::lock_path(&path), || read_json(&path).map(Some))
    }
}

fn read_json(path: &Path) -> Result<JsonValue> {
    let file = File::open(path)?;
    let reader = BufReader::new(file);
    Ok(serde_json::from_reader(reader)?)
}

fn write_json(path: &Path, value: &JsonValue) -> Result<()> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer(&mut writer, value)?;
    writer.flush()?;
    Ok(())
}

fn write_pretty_json(path: &Path, value: &JsonValue) -> Result<()> {
    use serde::Serialize;

    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    let formatter = serde_json::ser::PrettyFormatter::with_indent(config::JSON_INDENT);
    let mut ser = serde_json::Serializer::with_formatter(&mut writer, formatter);
    value.serialize(&mut ser)?;
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::thread;
    use tempfile::TempDir;

    fn test_schema() -> Schema {
        Schema::with_keys(["urls", "domains"])
    }

    fn populated_state() -> StateSet {
        let mut state = StateSet::with_defaults(&test_schema());
        state.merge("urls", ["a.com", "b.com"]).unwrap();
        state.merge("domains", ["x.org"]).unwrap();
        state
    }

    #[test]
    fn test_save_load_round_trip() {
        let dir = TempDir::new().unwrap();
        let mut store = MetaStore::new(dir.path());
        let state = populated_state();

        store.save(&state, None).unwrap();
        let loaded = store.load(&test_schema(), None).unwrap().unwrap();
        assert_eq!(loaded, state);
    }

    #[test]
    fn test_load_absent_is_negative_not_error() {
        let dir = TempDir::new().unwrap();
        let store = MetaStore::new(dir.path());
        assert!(store.load(&test_schema(), None).unwrap().is_none());
    }

    #[test]
    fn test_load_fills_missing_keys_with_defaults() {
        let dir = TempDir::new().unwrap();
        let store = MetaStore::new(dir.path());
        fs::write(store.meta_path(), r#"{"urls": ["a.com", "b.com"]}"#).unwrap();

        let state = store.load(&test_schema(), None).unwrap().unwrap();
        assert_eq!(state.get("urls").unwrap().len(), 2);
        assert!(state.get("domains").unwrap().is_empty());
    }

    #[test]
    fn test_load_rejects_undeclared_key() {
        let dir = TempDir::new().unwrap();
        let store = MetaStore::new(dir.path());
        fs::write(store.meta_path(), r#"{"obsolete": ["x"]}"#).unwrap();

        let err = store.load(&test_schema(), None).unwrap_err();
        assert!(matches!(err, Error::UnknownKey { key, .. } if key == "obsolete"));
    }

    #[test]
    fn test_load_surfaces_decode_errors() {
        let dir = TempDir::new().unwrap();
        let store = MetaStore::new(dir.path());
        fs::write(store.meta_path(), "{not json").unwrap();

        assert!(matches!(
            store.load(&test_schema(), None),
            Err(Error::Json(_))
        ));
    }

    #[test]
    fn test_sectioned_load() {
        let dir = TempDir::new().unwrap();
        let store = MetaStore::new(dir.path());
        fs::write(
            store.meta_path(),
            r#"{"crawl": {"urls": ["a.com"]}, "review": {"urls": ["b.com"]}}"#,
        )
        .unwrap();

        let state = store.load(&test_schema(), Some("crawl")).unwrap().unwrap();
        assert!(state.get("urls").unwrap().contains("a.com"));
        assert!(!state.get("urls").unwrap().contains("b.com"));
    }

    #[test]
    fn test_sectioned_load_missing_section_is_all_defaults() {
        let dir = TempDir::new().unwrap();
        let store = MetaStore::new(dir.path());
        fs::write(store.meta_path(), r#"{"crawl": {"urls": ["a.com"]}}"#).unwrap();

        let state = store.load(&test_schema(), Some("review")).unwrap().unwrap();
        assert!(state.get("urls").unwrap().is_empty());
        assert!(state.get("domains").unwrap().is_empty());
    }

    #[test]
    fn test_save_updates_configured_path() {
        let dir = TempDir::new().unwrap();
        let mut store = MetaStore::new(dir.path());
        let other = dir.path().join("other.json");

        store.save(&populated_state(), Some(&other)).unwrap();
        assert_eq!(store.meta_path(), other.as_path());

        // A subsequent default-path load reads the file just written.
        assert!(store.load(&test_schema(), None).unwrap().is_some());
    }

    #[test]
    fn test_data_exists_distinguishes_empty_from_absent() {
        let dir = TempDir::new().unwrap();
        let store = MetaStore::new(dir.path());

        // Absent.
        assert!(!store.data_exists(None).unwrap());

        // Present but zero length: exists on disk, but no data.
        fs::write(store.meta_path(), "").unwrap();
        assert!(store.meta_path().exists());
        assert!(!store.data_exists(None).unwrap());

        // Present with content.
        fs::write(store.meta_path(), "{}").unwrap();
        assert!(store.data_exists(None).unwrap());
    }

    #[test]
    fn test_create_if_absent_is_a_noop_on_existing() {
        let dir = TempDir::new().unwrap();
        let store = MetaStore::new(dir.path());

        store
            .create_if_absent(&json!({"urls": []}), None)
            .unwrap();
        let first = fs::read_to_string(store.meta_path()).unwrap();

        store
            .create_if_absent(&json!({"urls": ["clobbered.com"]}), None)
            .unwrap();
        let second = fs::read_to_string(store.meta_path()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_read_raw_returns_undecorated_structure() {
        let dir = TempDir::new().unwrap();
        let store = MetaStore::new(dir.path());

        assert!(store.read_raw(None).unwrap().is_none());

        fs::write(store.meta_path(), r#"{"anything": {"nested": [1, 2]}}"#).unwrap();
        let raw = store.read_raw(None).unwrap().unwrap();
        assert_eq!(raw["anything"]["nested"][1], json!(2));
    }

    #[test]
    fn test_concurrent_saves_never_interleave() {
        let dir = TempDir::new().unwrap();
        let schema = test_schema();
        let path = dir.path().join(META_FILE_NAME);

        let mut handles = Vec::new();
        for i in 0..8 {
            let dir_path = dir.path().to_path_buf();
            let schema = schema.clone();
            handles.push(thread::spawn(move || {
                let mut state = StateSet::with_defaults(&schema);
                // Each writer produces a distinct, self-consistent payload.
                let values: Vec<String> =
                    (0..50).map(|n| format!("writer{i}-value{n}.com")).collect();
                state.merge("urls", values).unwrap();

                let mut store = MetaStore::new(dir_path);
                store.save(&state, None).unwrap();
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }

        // Last-writer-wins at the byte level: the surviving file is one
        // complete write, never a corrupt mix of two.
        let raw: JsonValue =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        let urls = raw["urls"].as_array().unwrap();
        assert_eq!(urls.len(), 50);
        let writer_tags: std::collections::BTreeSet<_> = urls
            .iter()
            .map(|v| v.as_str().unwrap().split('-').next().unwrap().to_string())
            .collect();
        assert_eq!(writer_tags.len(), 1, "bytes from two writers interleaved");
    }
}
