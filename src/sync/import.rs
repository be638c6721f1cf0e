//! Merging harvested and serialized data into the state.
//!
//! Every import is a **set union** into the state, never a replace, so
//! repeated imports of overlapping data are idempotent with respect to
//! final content.
//!
//! The `merge_*` functions are pure codec adapters over already-open
//! streams; the `import_*` wrappers open the file (gzip-transparently) and
//! delegate. Target keys are validated before anything is written: an
//! unrecognized key in the target list, or in a CSV header, fails the whole
//! import with nothing applied.

use std::collections::BTreeMap;
use std::io::Read;
use std::path::Path;

use tracing::debug;

use crate::error::{Error, Result};
use crate::state::StateSet;
use crate::sync::file::open_reader;
use crate::sync::types::MergeStats;

/// Resolve the target key list: an explicit request, or every state key.
///
/// Each requested key must be part of the state, which is what catches an
/// import aimed at a category the schema never declared.
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

/// Union a decoded key → values mapping into the state, restricted to
/// `targets`. Decoded keys outside the target list are ignored.
fn merge_mapping(
    state: &mut StateSet,
    mapping: &BTreeMap<String, Vec<String>>,
    targets: &[String],
) -> Result<MergeStats> {
    let mut stats = MergeStats::default();
    for key in targets {
        let Some(values) = mapping.get(key) else {
            continue;
        };
        stats.seen += values.len();
        let added = state.merge(key, values.iter().cloned())?;
        stats.added += added;
        if added > 0 {
            stats.keys_updated += 1;
        }
    }
    Ok(stats)
}

/// Merge a JSON object (key → array of strings) from `reader`.
///
/// # Errors
///
/// Returns a decode error for malformed JSON and [`Error::UnknownKey`] for
/// an invalid target key.
pub fn merge_json<R: Read>(
    state: &mut StateSet,
    reader: R,
    targets: Option<&[&str]>,
) -> Result<MergeStats> {
    let targets = resolve_targets(state, targets)?;
    let mapping: BTreeMap<String, Vec<String>> = serde_json::from_reader(reader)?;
    merge_mapping(state, &mapping, &targets)
}

/// Merge a binary-serialized mapping (same shape as the JSON form) from
/// `reader`.
///
/// # Errors
///
/// Returns a decode error for malformed input and [`Error::UnknownKey`] for
/// an invalid target key.
pub fn merge_bin<R: Read>(
    state: &mut StateSet,
    reader: R,
    targets: Option<&[&str]>,
) -> Result<MergeStats> {
    let targets = resolve_targets(state, targets)?;
    let mapping: BTreeMap<String, Vec<String>> = bincode::deserialize_from(reader)?;
    merge_mapping(state, &mapping, &targets)
}

/// Merge a CSV table from `reader`.
///
/// The header row must be a subset of the target keys; an unrecognized
/// header fails the import before any row is applied. Cells are trimmed and
/// empty cells are ignored (they are zip padding, not values).
///
/// # Errors
///
/// Returns [`Error::UnknownKey`] for a bad header or target key, and a
/// decode error for malformed CSV.
pub fn merge_csv<R: Read>(
    state: &mut StateSet,
    reader: R,
    targets: Option<&[&str]>,
) -> Result<MergeStats> {
    let targets = resolve_targets(state, targets)?;
    let mut csv_reader = csv::Reader::from_reader(reader);

    let headers: Vec<String> = csv_reader
        .headers()?
        .iter()
        .map(str::to_string)
        .collect();
    for header in &headers {
        if !targets.contains(header) {
            return Err(Error::UnknownKey {
                key: header.clone(),
                declared: targets,
            });
        }
    }

    let mut stats = MergeStats::default();
    let mut touched: BTreeMap<String, usize> = BTreeMap::new();
    for record in csv_reader.records() {
        let record = record?;
        for (header, cell) in headers.iter().zip(record.iter()) {
            let value = cell.trim();
            if value.is_empty() {
                continue;
            }
            stats.seen += 1;
            if state.insert(header, value)? {
                stats.added += 1;
                *touched.entry(header.clone()).or_default() += 1;
            }
        }
    }
    stats.keys_updated = touched.len();
    Ok(stats)
}

/// Import a JSON file (optionally gzipped) into the state.
///
/// # Errors
///
/// Returns an error if the file cannot be opened or decoded, or a target
/// key is invalid.
pub fn import_json(
    state: &mut StateSet,
    path: &Path,
    targets: Option<&[&str]>,
    compress: bool,
) -> Result<MergeStats> {
    let stats = merge_json(state, open_reader(path, compress)?, targets)?;
    debug!(path = %path.display(), added = stats.added, "JSON import merged");
    Ok(stats)
}

/// Import a binary-serialized file (optionally gzipped) into the state.
///
/// # Errors
///
/// Returns an error if the file cannot be opened or decoded, or a target
/// key is invalid.
pub fn import_bin(
    state: &mut StateSet,
    path: &Path,
    targets: Option<&[&str]>,
    compress: bool,
) -> Result<MergeStats> {
    let stats = merge_bin(state, open_reader(path, compress)?, targets)?;
    debug!(path = %path.display(), added = stats.added, "binary import merged");
    Ok(stats)
}

/// Import a CSV file (optionally gzipped) into the state.
///
/// # Errors
///
/// Returns an error if the file cannot be opened or decoded, a header is
/// unrecognized, or a target key is invalid.
pub fn import_csv(
    state: &mut StateSet,
    path: &Path,
    targets: Option<&[&str]>,
    compress: bool,
) -> Result<MergeStats> {
    let stats = merge_csv(state, open_reader(path, compress)?, targets)?;
    debug!(path = %path.display(), added = stats.added, "CSV import merged");
    Ok(stats)
}
