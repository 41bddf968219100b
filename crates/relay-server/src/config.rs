//! Server configuration

use std::net::SocketAddr;

use serde::Deserialize;

use signalhub_room_core::RelayConfig;

/// Configuration for the relay server process.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address the HTTP/WebSocket listener binds to
    pub bind_addr: SocketAddr,
    /// Answer any origin. The browser clients are served from elsewhere, so
    /// this is on by default.
    pub cors_permissive: bool,
    /// Core relay bounds and windows
    pub relay: RelayConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 3001)),
            cors_permissive: true,
            relay: RelayConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Set the listen address
    pub fn with_bind_addr(mut self, addr: SocketAddr) -> Self {
        self.bind_addr = addr;
        self
    }

    /// Enable or disable permissive CORS
    pub fn with_cors_permissive(mut self, on: bool) -> Self {
        self.cors_permissive = on;
        self
    }

    /// Set the relay core configuration
    pub fn with_relay(mut self, relay: RelayConfig) -> Self {
        self.relay = relay;
        self
    }
}
