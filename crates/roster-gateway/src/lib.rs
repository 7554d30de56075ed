//! # roster-gateway
//!
//! Pushes payloads to individual live connections.
//!
//! - [`GatewayPush`]: the seam the fan-out talks to
//! - [`HttpGatewayClient`]: management-API client (`POST @connections/{id}`)
//! - [`LocalGateway`]: sockets attached to this process
//! - [`push_with_retry`]: bounded retry turning errors into a [`PushOutcome`]

#![deny(unsafe_code)]

pub mod errors;
pub mod http;
pub mod local;
pub mod retry;
pub mod traits;

pub use errors::{PushError, Result};
pub use http::HttpGatewayClient;
pub use local::{ClientConnection, LocalGateway};
pub use retry::{PushOutcome, push_with_retry};
pub use traits::GatewayPush;
