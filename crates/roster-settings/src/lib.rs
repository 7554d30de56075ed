//! # roster-settings
//!
//! Settings are loaded from three layers (in priority order):
//! 1. **Compiled defaults**: [`RosterSettings::default()`]
//! 2. **Settings file**: `$ROSTER_SETTINGS` or `./roster.json` (deep-merged over defaults)
//! 3. **Environment variables**: `TABLE_NAME`, `WEBSOCKET_ADDRESS` and `ROSTER_*` overrides
//!
//! [`RosterSettings::resolve`] validates the two required values (registry
//! location and gateway endpoint) into a [`Deployment`] at startup.

#![deny(unsafe_code)]

pub mod deployment;
pub mod errors;
pub mod loader;
pub mod types;

pub use deployment::{Deployment, GatewayEndpoint, RegistryLocation};
pub use errors::{Result, SettingsError};
pub use loader::{deep_merge, load_settings, load_settings_with, settings_path};
pub use types::*;
