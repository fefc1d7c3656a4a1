//! `TyperaceServer` builder and server loop.
//!
//! This is the entry point for running a Typerace server. It ties
//! together all the layers: transport → protocol → session → lobby.

use std::sync::Arc;
use std::time::Duration;

use typerace_lobby::{
    ChannelGateway, Coordinator, CoordinatorHandle, LobbyConfig, SamplePool, TrackCatalog,
    spawn_coordinator,
};
use typerace_protocol::{Codec, JsonCodec};
use typerace_session::SessionManager;
use typerace_transport::{Transport, WebSocketTransport};
use tokio::sync::Mutex;

use crate::TyperaceError;
use crate::handler::handle_connection;

/// The current protocol version. Clients must send this in their
/// `Hello` or be rejected.
pub const PROTOCOL_VERSION: u32 = 1;

/// Shared server state passed to each connection handler task.
///
/// Wrapped in `Arc` so it can be cheaply cloned across tasks. Lobby state
/// is not in here: it lives in the coordinator actor, reached through
/// its handle.
pub(crate) struct ServerState<C: Codec> {
    pub(crate) sessions: Mutex<SessionManager>,
    pub(crate) coordinator: CoordinatorHandle,
    pub(crate) codec: C,
    /// `None` keeps silent connections open, and with them any lobby
    /// their participant hosts.
    pub(crate) idle_timeout: Option<Duration>,
}

/// Builder for configuring and starting a Typerace server.
///
/// # Example
///
/// ```rust,no_run
/// use typerace::prelude::*;
///
/// # async fn run() -> Result<(), TyperaceError> {
/// let server = ServerBuilder::new()
///     .bind("0.0.0.0:3000")
///     .lobby_config(LobbyConfig {
///         win_accuracy_threshold: 80.0,
///         ..LobbyConfig::default()
///     })
///     .build()
///     .await?;
/// server.run().await
/// # }
/// ```
pub struct ServerBuilder {
    bind_addr: String,
    lobby_config: LobbyConfig,
    text_pool: Option<SamplePool>,
    tracks: TrackCatalog,
    idle_timeout: Option<Duration>,
}

impl ServerBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self {
            bind_addr: "127.0.0.1:3000".to_string(),
            lobby_config: LobbyConfig::default(),
            text_pool: None,
            tracks: TrackCatalog::default(),
            idle_timeout: None,
        }
    }

    /// Sets the address to bind the server to.
    pub fn bind(mut self, addr: &str) -> Self {
        self.bind_addr = addr.to_string();
        self
    }

    /// Sets the lobby configuration.
    pub fn lobby_config(mut self, config: LobbyConfig) -> Self {
        self.lobby_config = config;
        self
    }

    /// Sets the pool race texts are drawn from. Defaults to the
    /// built-in corpus.
    pub fn text_pool(mut self, pool: SamplePool) -> Self {
        self.text_pool = Some(pool);
        self
    }

    /// Sets the tracks hosts can choose from.
    pub fn tracks(mut self, tracks: TrackCatalog) -> Self {
        self.tracks = tracks;
        self
    }

    /// Drops connections that send nothing for `timeout`.
    ///
    /// Off by default. Only inbound frames count as activity, so a client
    /// that enables this on the server must send `Heartbeat`s while it
    /// waits; a dropped host takes its lobby with it.
    pub fn idle_timeout(mut self, timeout: Duration) -> Self {
        self.idle_timeout = Some(timeout);
        self
    }

    /// Binds the transport and starts the lobby coordinator.
    ///
    /// Uses `JsonCodec` and `WebSocketTransport`. Must be called from
    /// within a Tokio runtime.
    pub async fn build(self) -> Result<TyperaceServer<JsonCodec>, TyperaceError> {
        let transport = WebSocketTransport::bind(&self.bind_addr).await?;

        let channel_size = self.lobby_config.command_channel_size;
        let coordinator = Coordinator::new(
            self.lobby_config,
            self.tracks,
            self.text_pool.unwrap_or_default(),
            ChannelGateway::new(),
        );
        let coordinator = spawn_coordinator(coordinator, channel_size);

        let state = Arc::new(ServerState {
            sessions: Mutex::new(SessionManager::new()),
            coordinator,
            codec: JsonCodec,
            idle_timeout: self.idle_timeout,
        });

        Ok(TyperaceServer { transport, state })
    }
}

impl Default for ServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A bound Typerace server.
///
/// Call [`run()`](Self::run) to start accepting connections.
pub struct TyperaceServer<C: Codec> {
    transport: WebSocketTransport,
    state: Arc<ServerState<C>>,
}

impl<C> TyperaceServer<C>
where
    C: Codec,
{
    /// Creates a new builder.
    pub fn builder() -> ServerBuilder {
        ServerBuilder::new()
    }

    /// Returns the local address the server is bound to.
    pub fn local_addr(&self) -> std::io::Result<std::net::SocketAddr> {
        self.transport.local_addr()
    }

    /// Returns a handle to the lobby coordinator.
    pub fn coordinator(&self) -> CoordinatorHandle {
        self.state.coordinator.clone()
    }

    /// Runs the server accept loop.
    ///
    /// Spawns a handler task for each accepted connection. Runs until
    /// the process is terminated.
    pub async fn run(mut self) -> Result<(), TyperaceError> {
        tracing::info!("Typerace server running");

        loop {
            match self.transport.accept().await {
                Ok(conn) => {
                    let state = Arc::clone(&self.state);
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(conn, state).await {
                            tracing::debug!(error = %e, "connection ended with error");
                        }
                    });
                }
                Err(e) => {
                    tracing::error!(error = %e, "accept failed");
                }
            }
        }
    }
}
