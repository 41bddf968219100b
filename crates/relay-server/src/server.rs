//! Server lifecycle
//!
//! The builder wires a room directory, the push bridge, the reaper and the
//! socket keepalive, binds the listener and produces a `RelayServer` ready
//! to serve. The binary runs it until ctrl-c; tests start it on an
//! ephemeral port and stop it through the returned handle.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use signalhub_room_core::{Reaper, RelayConfig, RoomDirectory};

use crate::api::create_router;
use crate::config::ServerConfig;
use crate::connections::{ConnectionRegistry, PushEventHandler};
use crate::error::{Result, ServerError};
use crate::state::AppState;

/// Name under which the push bridge registers for room events.
const PUSH_HANDLER_NAME: &str = "push-transport";

/// Builder for a relay server.
pub struct RelayServerBuilder {
    config: ServerConfig,
    directory: Option<Arc<RoomDirectory>>,
}

impl RelayServerBuilder {
    pub fn new() -> Self {
        Self {
            config: ServerConfig::default(),
            directory: None,
        }
    }

    /// Replace the whole configuration
    pub fn with_config(mut self, config: ServerConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the listen address
    pub fn with_bind_addr(mut self, addr: SocketAddr) -> Self {
        self.config.bind_addr = addr;
        self
    }

    /// Set the relay core configuration
    pub fn with_relay_config(mut self, relay: RelayConfig) -> Self {
        self.config.relay = relay;
        self
    }

    /// Serve an existing directory instead of constructing a fresh one
    pub fn with_directory(mut self, directory: Arc<RoomDirectory>) -> Self {
        self.directory = Some(directory);
        self
    }

    /// Wire everything up and bind the listener.
    pub async fn build(self) -> Result<RelayServer> {
        let directory = self
            .directory
            .unwrap_or_else(|| Arc::new(RoomDirectory::new(self.config.relay.clone())));

        let connections = ConnectionRegistry::new();
        directory
            .add_event_handler(
                PUSH_HANDLER_NAME,
                Arc::new(PushEventHandler::new(connections.clone())),
            )
            .await;

        let reaper = Reaper::new(Arc::clone(&directory));
        reaper.start();

        // Keepalive pings on every open socket, well inside the liveness
        // window. The pong each client stack answers with refreshes its
        // participant's stamp, so a quiet viewer is never expired while its
        // connection is up.
        let ping_interval =
            Duration::from_millis((self.config.relay.participant_liveness_ms / 3).max(1));
        let pinger = {
            let connections = connections.clone();
            tokio::spawn(async move {
                let mut ticker = tokio::time::interval(ping_interval);
                loop {
                    ticker.tick().await;
                    connections.ping_all();
                }
            })
        };

        let state = AppState::new(Arc::clone(&directory), connections);
        let router = create_router(state);
        let router = if self.config.cors_permissive {
            router.layer(
                ServiceBuilder::new()
                    .layer(TraceLayer::new_for_http())
                    .layer(CorsLayer::permissive()),
            )
        } else {
            router.layer(TraceLayer::new_for_http())
        };

        let listener = TcpListener::bind(self.config.bind_addr).await?;
        let local_addr = listener.local_addr()?;
        info!(addr = %local_addr, "relay server bound");

        Ok(RelayServer {
            directory,
            reaper,
            pinger,
            router,
            listener,
            local_addr,
        })
    }
}

impl Default for RelayServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A built and bound server that has not started serving yet.
pub struct RelayServer {
    directory: Arc<RoomDirectory>,
    reaper: Reaper,
    pinger: JoinHandle<()>,
    router: Router,
    listener: TcpListener,
    local_addr: SocketAddr,
}

impl RelayServer {
    /// Address the listener actually bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// The room directory this server serves.
    pub fn directory(&self) -> Arc<RoomDirectory> {
        Arc::clone(&self.directory)
    }

    /// Serve on the current task until ctrl-c.
    pub async fn run(self) -> Result<()> {
        info!(addr = %self.local_addr, "relay server listening");
        let RelayServer {
            reaper,
            pinger,
            router,
            listener,
            ..
        } = self;
        let result = axum::serve(listener, router)
            .with_graceful_shutdown(async {
                let _ = tokio::signal::ctrl_c().await;
                info!("shutdown signal received");
            })
            .await;
        reaper.stop();
        pinger.abort();
        result.map_err(|e| ServerError::transport(e.to_string()))
    }

    /// Serve in a background task; the handle stops it.
    pub fn start(self) -> RelayServerHandle {
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let RelayServer {
            directory,
            reaper,
            pinger,
            router,
            listener,
            local_addr,
        } = self;

        let task = tokio::spawn(async move {
            let serve = axum::serve(listener, router).with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
            });
            if let Err(e) = serve.await {
                error!(error = %e, "relay server failed");
            }
        });

        RelayServerHandle {
            local_addr,
            directory,
            reaper,
            pinger,
            shutdown_tx,
            task,
        }
    }
}

/// Handle to a serving relay server.
pub struct RelayServerHandle {
    local_addr: SocketAddr,
    directory: Arc<RoomDirectory>,
    reaper: Reaper,
    pinger: JoinHandle<()>,
    shutdown_tx: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

impl RelayServerHandle {
    /// Address the server is listening on.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Base HTTP URL.
    pub fn url(&self) -> String {
        format!("http://{}", self.local_addr)
    }

    /// Base WebSocket URL.
    pub fn ws_url(&self) -> String {
        format!("ws://{}", self.local_addr)
    }

    /// The room directory behind the server.
    pub fn directory(&self) -> Arc<RoomDirectory> {
        Arc::clone(&self.directory)
    }

    /// Stop the reaper and pinger, close the listener and wait for
    /// in-flight work.
    pub async fn shutdown(self) {
        self.reaper.stop();
        self.pinger.abort();
        let _ = self.shutdown_tx.send(());
        let _ = self.task.await;
        info!("relay server stopped");
    }
}
