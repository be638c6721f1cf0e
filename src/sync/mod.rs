//! Import/export façade.
//!
//! This module assembles the state from heterogeneous sources and
//! serializes it back out:
//!
//! - **Import**: JSON / CSV / binary mappings → set union into the state
//! - **Export**: state → pretty JSON, zipped CSV, or binary mapping
//! - **Harvest**: plain-text lines and HTML anchor `href` values → raw sets
//! - **Compression**: transparent gzip by flag or `.gz` suffix
//!
//! Codec adapters are pure over streams and never touch the filesystem
//! themselves; only the `import_*` / `export_*_file` wrappers (and the
//! harvesters) open files. None of this is lock-guarded: import/export
//! files are private to the caller, unlike the shared meta file owned by
//! [`crate::storage::MetaStore`].
//!
//! # Example
//!
//! ```ignore
//! use linkstash::{Schema, StateSet};
//! use linkstash::sync::{self, SourceKind};
//!
//! let schema = Schema::with_keys(["urls", "domains"]);
//! let mut state = StateSet::with_defaults(&schema);
//!
//! let harvested = sync::harvest_all(&source_dir, "urls")?;
//! state.merge("urls", harvested.values)?;
//!
//! sync::export_csv_file(&state, &out_path, Some(&["urls", "domains"]), false)?;
//! ```

mod export;
mod file;
mod harvest;
mod import;
mod types;

pub use export::{
    export_bin, export_bin_file, export_csv, export_csv_file, export_json, export_json_file,
};
pub use file::{open_reader, StashWriter};
pub use harvest::{harvest, harvest_all};
pub use import::{import_bin, import_csv, import_json, merge_bin, merge_csv, merge_json};
pub use types::{Harvest, MergeStats, SourceKind};
