//! `RetroboardServer` builder and accept loop.
//!
//! Ties the layers together: the transport accepts sockets, one handler
//! task per socket speaks the protocol, and a single engine task owns
//! every room.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use retroboard_protocol::{Codec, JsonCodec};
use retroboard_room::{spawn_engine, EngineHandle, RoomConfig};
use retroboard_transport::{Transport, WebSocketTransport};

use crate::handler::handle_connection;
use crate::RetroboardError;

/// Default listen address when none is configured.
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3001";

/// State shared by every connection task.
pub(crate) struct ServerState<C: Codec> {
    pub(crate) engine: EngineHandle,
    pub(crate) codec: C,
}

/// Builder for a [`RetroboardServer`].
///
/// ```rust,no_run
/// # async fn run() -> Result<(), retroboard::RetroboardError> {
/// use retroboard::RetroboardServer;
///
/// let server = RetroboardServer::builder()
///     .bind("127.0.0.1:3001")
///     .build()
///     .await?;
/// server.run().await
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct RetroboardServerBuilder {
    bind_addr: String,
    room_config: RoomConfig,
}

impl RetroboardServerBuilder {
    pub fn new() -> Self {
        Self {
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            room_config: RoomConfig::default(),
        }
    }

    /// Sets the `host:port` to listen on. Port 0 picks a free port.
    pub fn bind(mut self, addr: &str) -> Self {
        self.bind_addr = addr.to_string();
        self
    }

    /// Sets the configuration every room is created with.
    pub fn room_config(mut self, config: RoomConfig) -> Self {
        self.room_config = config;
        self
    }

    /// Binds the listener and starts the room engine.
    ///
    /// Must be called inside a Tokio runtime.
    pub async fn build(self) -> Result<RetroboardServer<JsonCodec>, RetroboardError> {
        let transport = WebSocketTransport::bind(self.bind_addr.as_str()).await?;
        let engine = spawn_engine(self.room_config);
        let state = Arc::new(ServerState {
            engine,
            codec: JsonCodec,
        });
        Ok(RetroboardServer { transport, state })
    }
}

impl Default for RetroboardServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A bound server. Call [`run`](Self::run) to start accepting.
pub struct RetroboardServer<C: Codec> {
    transport: WebSocketTransport,
    state: Arc<ServerState<C>>,
}

impl RetroboardServer<JsonCodec> {
    pub fn builder() -> RetroboardServerBuilder {
        RetroboardServerBuilder::new()
    }
}

impl<C: Codec> RetroboardServer<C> {
    pub fn local_addr(&self) -> Result<SocketAddr, RetroboardError> {
        Ok(self.transport.local_addr()?)
    }

    /// Handle to the room engine, e.g. for inspecting room counts.
    pub fn engine(&self) -> EngineHandle {
        self.state.engine.clone()
    }

    /// Accepts connections until the process ends.
    pub async fn run(self) -> Result<(), RetroboardError> {
        self.run_until(std::future::pending()).await
    }

    /// Accepts connections until `shutdown` resolves, then stops the
    /// engine. Rooms and their timers are dropped with it.
    pub async fn run_until(mut self, shutdown: impl Future<Output = ()>) -> Result<(), RetroboardError> {
        tracing::info!("retroboard server running");
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                accepted = self.transport.accept() => match accepted {
                    Ok(conn) => {
                        let state = Arc::clone(&self.state);
                        tokio::spawn(async move {
                            if let Err(e) = handle_connection(conn, state).await {
                                tracing::debug!(error = %e, "connection ended with error");
                            }
                        });
                    }
                    Err(e) => tracing::warn!(error = %e, "accept failed"),
                },
                () = &mut shutdown => break,
            }
        }

        tracing::info!("retroboard server shutting down");
        self.state.engine.shutdown().await?;
        Ok(())
    }
}
