//! # roster-server
//!
//! The disconnect pipeline and its HTTP surface.
//!
//! A disconnect runs lookup, delete, scan and broadcast against the
//! registry and gateway seams:
//!
//! - [`coordinator`]: per-connection state machine producing a [`DisconnectReport`]
//! - [`fanout`]: bounded-parallel push of the departure event
//! - [`handler`]: gateway-event parsing, time budget, `{statusCode, body}` contract
//! - [`server`]: Axum routes `/disconnect`, `/ws`, `/health`, `/metrics`
//! - [`websocket`]: sockets attached to the in-process gateway
//! - [`shutdown`], [`metrics`], [`health`], [`config`]

#![deny(unsafe_code)]

pub mod config;
pub mod coordinator;
pub mod errors;
pub mod fanout;
pub mod handler;
pub mod health;
pub mod metrics;
pub mod server;
pub mod shutdown;
pub mod websocket;

pub use config::ServerConfig;
pub use coordinator::{DisconnectConfig, DisconnectCoordinator, DisconnectOutcome, DisconnectReport};
pub use errors::{DisconnectError, DisconnectPhase, HandlerError};
pub use fanout::{Fanout, FanoutReport};
pub use handler::{DisconnectHandler, GatewayEvent, HandlerResponse, RequestContext};
pub use server::{AppState, RosterServer};
pub use shutdown::ShutdownCoordinator;
