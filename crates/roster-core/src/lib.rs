//! # roster-core
//!
//! Foundation types shared by every roster crate.
//!
//! - **Ids**: [`ConnectionId`], the registry's primary key
//! - **Records**: [`ConnectionRecord`] (registry row) and [`DisconnectEvent`] (wire payload)
//! - **Retry**: [`retry::RetryConfig`], backoff math, and an async retry loop
//! - **Logging**: `tracing` subscriber setup

#![deny(unsafe_code)]

pub mod ids;
pub mod logging;
pub mod records;
pub mod retry;

pub use ids::ConnectionId;
pub use records::{ConnectionRecord, DisconnectEvent, EventAction};
