//! Snapshot discovery for snapback.
//!
//! This crate provides the in-memory model of a periodic snapshot tool's
//! output directory:
//! - Decoding and encoding entry names (`@home.20250916_112530`)
//! - Grouping snapshots by subvolume family, newest first
//! - Recognising displaced (`.BROKEN`) copies of live subvolumes
//!
//! # Example
//!
//! ```no_run
//! use snapback_snapshot::Catalog;
//! use std::path::Path;
//!
//! # async fn example() {
//! let scan = Catalog::scan(Path::new("/mnt/btr_pool/btrbk_snapshots")).await;
//! if let Some(err) = &scan.error {
//!     eprintln!("{err}");
//! }
//! for group in scan.catalog.groups() {
//!     println!("{} ({})", group.id(), group.len());
//! }
//! # }
//! ```

mod broken;
mod catalog;
mod error;
pub mod name;
mod snapshot;

pub use broken::{list_broken, BrokenEntry};
pub use catalog::{Catalog, Scan, SkipReason, SkippedEntry};
pub use error::{SnapshotError, SnapshotResult};
pub use name::{BrokenName, DecodeError, GroupId, Timestamp};
pub use snapshot::{Snapshot, SnapshotGroup};
