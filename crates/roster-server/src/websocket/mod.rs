//! In-process gateway sockets served at `/ws`.

pub mod session;

pub use session::{WsParams, ws_handler};
