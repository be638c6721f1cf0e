//! Serializing the state out to external formats.
//!
//! The `export_*` functions are pure codec adapters over already-open
//! writers; the `export_*_file` wrappers open the file (gzip-transparently)
//! and finalize the stream.
//!
//! # Row-oriented export
//!
//! CSV export materializes each requested key's set into a column and zips
//! the columns with empty-string padding: the longest set determines the row
//! count, shorter sets contribute `""` in the remaining rows. Values landing
//! on the same row are **not** correlated in any way; sets are unordered and
//! the columns are independent. Consumers must treat each column as a bag of
//! values, never as rows of related fields.

use std::io::Write;
use std::path::Path;

use serde::Serialize;
use tracing::debug;

use crate::config;
use crate::error::{Error, Result};
use crate::state::StateSet;
use crate::sync::file::StashWriter;

/// Resolve the requested key list, preserving request order.
///
/// An unrecognized key in an export request is a validation error, raised
/// before anything is written.
fn resolve_targets(state: &StateSet, targets: Option<&[&str]>) -> Result<Vec<String>> {
    match targets {
        Some(keys) => {
            for key in keys {
                if !state.contains_key(key) {
                    return Err(Error::UnknownKey {
                        key: (*key).to_string(),
                        declared: state.keys().map(str::to_string).collect(),
                    });
                }
            }
            Ok(keys.iter().map(|k| (*k).to_string()).collect())
        }
        None => Ok(state.keys().map(str::to_string).collect()),
    }
}

/// Export the selected keys as a pretty-printed JSON object (fixed
/// four-space indent).
///
/// # Errors
///
/// Returns an error for an unrecognized key or a write failure.
pub fn export_json<W: Write>(
    state: &StateSet,
    writer: W,
    targets: Option<&[&str]>,
) -> Result<()> {
    let targets = resolve_targets(state, targets)?;
    let map: serde_json::Map<String, serde_json::Value> = targets
        .iter()
        .map(|key| {
            let values: Vec<serde_json::Value> = state
                .get(key)
                .map(|set| {
                    set.iter()
                        .map(|v| serde_json::Value::String(v.clone()))
                        .collect()
                })
                .unwrap_or_default();
            (key.clone(), serde_json::Value::Array(values))
        })
        .collect();

    let formatter = serde_json::ser::PrettyFormatter::with_indent(config::JSON_INDENT);
    let mut ser = serde_json::Serializer::with_formatter(writer, formatter);
    serde_json::Value::Object(map).serialize(&mut ser)?;
    Ok(())
}

/// Export the selected keys as CSV: header = requested keys, rows = values
/// zipped with empty-string padding.
///
/// # Errors
///
/// Returns an error for an unrecognized key or a write failure.
pub fn export_csv<W: Write>(
    state: &StateSet,
    writer: W,
    targets: Option<&[&str]>,
) -> Result<()> {
    let targets = resolve_targets(state, targets)?;

    let columns: Vec<Vec<&String>> = targets
        .iter()
        .map(|key| state.get(key).map(|set| set.iter().collect()))
        .collect::<Result<_>>()?;
    let row_count = columns.iter().map(Vec::len).max().unwrap_or(0);

    let mut csv_writer = csv::Writer::from_writer(writer);
    csv_writer.write_record(&targets)?;
    for row in 0..row_count {
        let record: Vec<&str> = columns
            .iter()
            .map(|col| col.get(row).map_or("", |v| v.as_str()))
            .collect();
        csv_writer.write_record(&record)?;
    }
    csv_writer.flush()?;
    Ok(())
}

/// Export the selected keys as a binary-serialized mapping (key →
/// materialized value list), symmetric with [`crate::sync::merge_bin`].
///
/// # Errors
///
/// Returns an error for an unrecognized key or a write failure.
pub fn export_bin<W: Write>(
    state: &StateSet,
    writer: W,
    targets: Option<&[&str]>,
) -> Result<()> {
    let targets = resolve_targets(state, targets)?;
    let mapping: std::collections::BTreeMap<String, Vec<String>> = targets
        .iter()
        .filter_map(|key| {
            state
                .get(key)
                .ok()
                .map(|set| (key.clone(), set.iter().cloned().collect()))
        })
        .collect();
    bincode::serialize_into(writer, &mapping)?;
    Ok(())
}

/// Export to a JSON file, optionally gzipped.
///
/// # Errors
///
/// Returns an error if the file cannot be created or written.
pub fn export_json_file(
    state: &StateSet,
    path: &Path,
    targets: Option<&[&str]>,
    compress: bool,
) -> Result<()> {
    let mut writer = StashWriter::create(path, compress)?;
    export_json(state, &mut writer, targets)?;
    writer.finish()?;
    debug!(path = %path.display(), "JSON export written");
    Ok(())
}

/// Export to a CSV file, optionally gzipped.
///
/// # Errors
///
/// Returns an error if the file cannot be created or written.
pub fn export_csv_file(
    state: &StateSet,
    path: &Path,
    targets: Option<&[&str]>,
    compress: bool,
) -> Result<()> {
    let mut writer = StashWriter::create(path, compress)?;
    export_csv(state, &mut writer, targets)?;
    writer.finish()?;
    debug!(path = %path.display(), "CSV export written");
    Ok(())
}

/// Export to a binary-serialized file, optionally gzipped.
///
/// # Errors
///
/// Returns an error if the file cannot be created or written.
pub fn export_bin_file(
    state: &StateSet,
    path: &Path,
    targets: Option<&[&str]>,
    compress: bool,
) -> Result<()> {
    let mut writer = StashWriter::create(path, compress)?;
    export_bin(state, &mut writer, targets)?;
    writer.finish()?;
    debug!(path = %path.display(), "binary export written");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::Schema;
    use crate::sync::import::{merge_bin, merge_csv, merge_json};
    use std::io::Cursor;

    fn test_state() -> StateSet {
        let mut state = StateSet::with_defaults(&Schema::with_keys(["urls", "domains"]));
        state.merge("urls", ["a", "b", "c"]).unwrap();
        state.merge("domains", ["x"]).unwrap();
        state
    }

    #[test]
    fn test_csv_export_zips_with_padding() {
        let mut buffer = Vec::new();
        export_csv(&test_state(), &mut buffer, Some(&["urls", "domains"])).unwrap();

        let text = String::from_utf8(buffer).unwrap();
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines, vec!["urls,domains", "a,x", "b,", "c,"]);
    }

    #[test]
    fn test_csv_export_of_all_empty_sets_is_header_only() {
        let state = StateSet::with_defaults(&Schema::with_keys(["urls", "domains"]));
        let mut buffer = Vec::new();
        export_csv(&state, &mut buffer, None).unwrap();

        let text = String::from_utf8(buffer).unwrap();
        assert_eq!(text.lines().count(), 1);
    }

    #[test]
    fn test_export_rejects_unknown_key() {
        let mut buffer = Vec::new();
        let err = export_csv(&test_state(), &mut buffer, Some(&["bogus"])).unwrap_err();
        assert!(matches!(err, Error::UnknownKey { key, .. } if key == "bogus"));
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_json_export_is_pretty_with_four_space_indent() {
        let mut buffer = Vec::new();
        export_json(&test_state(), &mut buffer, None).unwrap();

        let text = String::from_utf8(buffer).unwrap();
        assert!(text.contains("\n    \"domains\""));

        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["urls"].as_array().unwrap().len(), 3);
    }

    #[test]
    fn test_json_export_import_round_trip() {
        let state = test_state();
        let mut buffer = Vec::new();
        export_json(&state, &mut buffer, None).unwrap();

        let mut restored = StateSet::with_defaults(&Schema::with_keys(["urls", "domains"]));
        merge_json(&mut restored, Cursor::new(buffer), None).unwrap();
        assert_eq!(restored, state);
    }

    #[test]
    fn test_csv_export_import_round_trip() {
        let state = test_state();
        let mut buffer = Vec::new();
        export_csv(&state, &mut buffer, None).unwrap();

        let mut restored = StateSet::with_defaults(&Schema::with_keys(["urls", "domains"]));
        merge_csv(&mut restored, Cursor::new(buffer), None).unwrap();
        assert_eq!(restored, state);
    }

    #[test]
    fn test_bin_export_import_round_trip() {
        let state = test_state();
        let mut buffer = Vec::new();
        export_bin(&state, &mut buffer, None).unwrap();

        let mut restored = StateSet::with_defaults(&Schema::with_keys(["urls", "domains"]));
        merge_bin(&mut restored, Cursor::new(buffer), None).unwrap();
        assert_eq!(restored, state);
    }

    #[test]
    fn test_gzipped_file_export_round_trips() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("export.json");
        let state = test_state();

        export_json_file(&state, &path, None, true).unwrap();

        let mut restored = StateSet::with_defaults(&Schema::with_keys(["urls", "domains"]));
        crate::sync::import::import_json(&mut restored, &path, None, true).unwrap();
        assert_eq!(restored, state);
    }
}
