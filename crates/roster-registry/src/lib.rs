//! # roster-registry
//!
//! The connection registry: the single shared mutable resource of the
//! presence service. Every operation is keyed by [`ConnectionId`] and atomic
//! per key, so independent disconnects never coordinate with each other.
//!
//! | Module | Purpose |
//! |--------|---------|
//! | `traits` | [`ConnectionRegistry`] seam, [`DeleteOutcome`], [`ScanPage`] |
//! | `scan` | Lazy paged [`scan`] stream over any registry |
//! | `memory` | [`InMemoryRegistry`]: ordered map, process-local |
//! | `sqlite` | [`SqliteRegistry`]: durable, pooled, WAL |
//! | `retrying` | [`RetryingRegistry`]: bounded retry of transient failures |
//!
//! [`ConnectionId`]: roster_core::ConnectionId

#![deny(unsafe_code)]

pub mod errors;
pub mod memory;
pub mod retrying;
pub mod scan;
pub mod sqlite;
pub mod traits;

pub use errors::{RegistryError, Result};
pub use memory::InMemoryRegistry;
pub use retrying::RetryingRegistry;
pub use scan::scan;
pub use sqlite::SqliteRegistry;
pub use traits::{ConnectionRegistry, DeleteOutcome, ScanPage};
