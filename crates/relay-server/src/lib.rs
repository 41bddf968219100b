//! # signalhub-relay-server
//!
//! Delivery transports for the signalhub relay core: a pull-style HTTP API
//! and a push-style WebSocket endpoint over one shared room directory, plus
//! the server lifecycle glue and the binary entry point.
//!
//! Both transports speak the same core. The HTTP surface is stateless
//! request handling over directory operations; the WebSocket surface
//! registers an event handler that fans posted messages out to live
//! connections. Clients may mix transports freely within one room.

pub mod api;
pub mod config;
pub mod connections;
pub mod error;
pub mod protocol;
pub mod server;
pub mod state;

pub use config::ServerConfig;
pub use connections::{ConnectionRegistry, PushEventHandler};
pub use error::{Result, ServerError};
pub use protocol::{ClientFrame, ServerFrame};
pub use server::{RelayServer, RelayServerBuilder, RelayServerHandle};
pub use state::AppState;

// Core types callers commonly need alongside the server.
pub use signalhub_room_core::{RelayConfig, RoomDirectory};
