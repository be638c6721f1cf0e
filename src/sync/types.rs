//! Shared types for import/export and harvesting.

use std::collections::BTreeSet;
use std::path::PathBuf;

/// Statistics for a merge (import) operation.
///
/// Because merges are set unions, `added` is the interesting number: a
/// repeated import of the same source reports `added == 0` and leaves the
/// state unchanged.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct MergeStats {
    /// Number of values decoded from the source.
    pub seen: usize,
    /// Number of values that were new to the state.
    pub added: usize,
    /// Number of keys that received at least one new value.
    pub keys_updated: usize,
}

impl MergeStats {
    /// Number of values that were already present (deduplicated away).
    #[must_use]
    pub fn duplicates(&self) -> usize {
        self.seen - self.added
    }

    /// Returns true if the merge changed nothing.
    #[must_use]
    pub fn is_noop(&self) -> bool {
        self.added == 0
    }
}

/// Which kind of source files a harvest should read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    /// Plain-text files (`*.txt`), one value per line.
    Text,
    /// HTML files (`*.html`), anchor `href` values.
    Html,
}

/// The outcome of harvesting a source directory.
///
/// Per-file read or parse failures do not abort a harvest; the offending
/// files are listed in [`skipped`](Self::skipped) so callers can tell
/// "no matches" apart from "unreadable source".
#[derive(Debug, Default, Clone)]
pub struct Harvest {
    /// The merged set of harvested values.
    pub values: BTreeSet<String>,
    /// Files that were skipped because they could not be read or parsed.
    pub skipped: Vec<PathBuf>,
}

impl Harvest {
    /// Whether every matched file was harvested cleanly.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.skipped.is_empty()
    }
}
