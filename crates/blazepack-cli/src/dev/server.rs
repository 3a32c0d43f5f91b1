//! Transport layer: one listening port for the session channel, the content
//! server and the npm proxy.
//!
//! Browsers open a WebSocket at [`SESSION_PATH`]. Outbound frames come from
//! the session's per-client queue; inbound text frames are parsed as client
//! reports and forwarded to the session.

use super::assets::{ContentServer, CLIENT_SCRIPT_PATH};
use super::registry::RegistryProxy;
use super::session::{Connection, SessionHandle};
use crate::error::{CliError, Result};
use axum::{
    extract::{
        ws::{CloseFrame, Message, WebSocket, WebSocketUpgrade},
        State,
    },
    http::Uri,
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use blazepack_protocol::ClientMessage;
use futures_util::{SinkExt, StreamExt};
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};

/// WebSocket endpoint for the session channel.
pub const SESSION_PATH: &str = "/__blazepack_ws__";

/// Close code sent when the session refuses a connection (internal error).
const CLOSE_INTERNAL_ERROR: u16 = 1011;

/// State shared by all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Session actor handle
    pub session: SessionHandle,
    /// Shell page, project files and bundler assets
    pub content: Arc<ContentServer>,
    /// Private npm registries
    pub registry: Arc<RegistryProxy>,
}

impl AppState {
    /// Bundle the handler dependencies.
    pub fn new(session: SessionHandle, content: ContentServer, registry: RegistryProxy) -> Self {
        Self {
            session,
            content: Arc::new(content),
            registry: Arc::new(registry),
        }
    }
}

/// Build the router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route(SESSION_PATH, get(handle_session))
        .route(CLIENT_SCRIPT_PATH, get(handle_client_script))
        .route("/npm/{*package}", get(handle_npm))
        .fallback(handle_content)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

/// Development server bound to its port.
pub struct DevServer {
    listener: TcpListener,
    addr: SocketAddr,
}

impl DevServer {
    /// Bind the listening socket.
    ///
    /// # Errors
    ///
    /// [`CliError::PortInUse`] if the port is taken; the server never falls
    /// back to another port.
    pub async fn bind(addr: SocketAddr) -> Result<Self> {
        let listener = TcpListener::bind(addr).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::AddrInUse {
                CliError::PortInUse(addr.port())
            } else {
                CliError::Server(format!("Failed to bind to {}: {}", addr, e))
            }
        })?;
        let addr = listener.local_addr()?;
        tracing::debug!(%addr, "Listening");
        Ok(Self { listener, addr })
    }

    /// Bound address; differs from the requested one when port 0 was used.
    pub fn local_addr(&self) -> SocketAddr {
        self.addr
    }

    /// Serve until `shutdown` resolves.
    pub async fn serve<F>(self, state: AppState, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        axum::serve(self.listener, router(state))
            .with_graceful_shutdown(shutdown)
            .await
            .map_err(|e| CliError::Server(format!("Server error: {}", e)))
    }
}

async fn handle_session(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| client_loop(socket, state.session))
}

async fn handle_client_script() -> Response {
    ContentServer::client_script()
}

async fn handle_npm(State(state): State<AppState>, uri: Uri) -> Response {
    // Raw path: package names keep their `%2f`
    state.registry.respond(uri.path()).await
}

async fn handle_content(State(state): State<AppState>, uri: Uri) -> impl IntoResponse {
    state.content.serve(uri.path()).await
}

/// Pump one socket until either side goes away.
async fn client_loop(mut socket: WebSocket, session: SessionHandle) {
    let Connection { id, mut outbound } = match session.connect().await {
        Ok(connection) => connection,
        Err(err) => {
            tracing::warn!(error = %err, "Refusing connection");
            let _ = socket
                .send(Message::Close(Some(CloseFrame {
                    code: CLOSE_INTERNAL_ERROR,
                    reason: "snapshot unavailable".into(),
                })))
                .await;
            return;
        }
    };

    tracing::debug!(client = id, "Client connected");
    let (mut sink, mut stream) = socket.split();

    loop {
        tokio::select! {
            frame = outbound.recv() => match frame {
                Some(frame) => {
                    if sink.send(Message::Text(frame.as_ref().into())).await.is_err() {
                        tracing::debug!(client = id, "Send failed; client gone");
                        break;
                    }
                }
                None => {
                    // Session closed this client
                    let _ = sink.send(Message::Close(None)).await;
                    break;
                }
            },
            incoming = stream.next() => match incoming {
                Some(Ok(Message::Text(text))) => match ClientMessage::from_json(text.as_str()) {
                    Ok(message) => session.report(id, message).await,
                    Err(err) => {
                        tracing::warn!(client = id, error = %err, "Ignoring malformed client message");
                    }
                },
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => {}
                Some(Err(err)) => {
                    tracing::debug!(client = id, error = %err, "WebSocket error");
                    break;
                }
            },
        }
    }

    session.disconnect(id).await;
    tracing::debug!(client = id, "Client disconnected");
}
