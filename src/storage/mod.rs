//! Lock-guarded file storage.
//!
//! # Submodules
//!
//! - [`lock`] - Scoped advisory file locking ([`FileLock`], [`with_lock`])
//! - [`meta`] - The persistence manager ([`MetaStore`])
//!
//! All shared-file access in this crate funnels through these two pieces:
//! [`meta`] never touches the filesystem except inside a [`lock`] guard
//! keyed on the target path's companion `.lock` file.

pub mod lock;
pub mod meta;

pub use lock::{with_lock, FileLock};
pub use meta::MetaStore;
