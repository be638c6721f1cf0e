//! linkstash - durable, lock-guarded collections of categorized strings
//!
//! This crate persists a single composite record (the "state"): a mapping
//! from a fixed, schema-declared set of category names to deduplicated sets
//! of strings. The state survives process restarts and is safe to touch from
//! multiple concurrent processes sharing the same backing file.
//!
//! # Architecture
//!
//! - [`state`] - The [`state::Schema`] / [`state::StateSet`] pair: the
//!   in-memory record and its schema-driven reconstruction rules
//! - [`storage`] - Advisory file locking and the lock-guarded persistence
//!   manager ([`storage::MetaStore`])
//! - [`sync`] - Import/export façade: JSON, CSV, and binary codecs with
//!   transparent gzip, plus harvesting from plain-text and HTML sources
//! - [`config`] - State-directory discovery and file-naming conventions
//! - [`error`] - Error types and handling
//!
//! # Concurrency
//!
//! Every filesystem touch goes through an exclusive advisory lock on a
//! companion `<path>.lock` file, so save/load/exists/create-if-absent compose
//! safely across threads and processes as long as callers agree on the
//! target path. The in-memory [`state::StateSet`] itself carries no interior
//! locking; `&mut` discipline covers single-process mutation.

#![forbid(unsafe_code)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod error;
pub mod state;
pub mod storage;
pub mod sync;

pub use error::{Error, Result};
pub use state::{Schema, StateSet};
pub use storage::MetaStore;
