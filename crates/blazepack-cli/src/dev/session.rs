//! Session server: owns the set of connected browsers.
//!
//! A single task owns the client registry and processes connects,
//! disconnects, client reports and file change events one at a time. That
//! gives each client a strict order: its INIT is queued before it is
//! registered for broadcasts, so no PATCH can overtake it, and every PATCH is
//! delivered in the order the watcher produced it.
//!
//! Each client gets its own bounded outbound queue. A client that stops
//! draining its queue is dropped rather than allowed to miss a patch; the
//! browser reconnects and receives a fresh snapshot.

use super::ignore::IgnoreRules;
use super::snapshot::read_snapshot_async;
use crate::error::{CliError, Result};
use blazepack_protocol::{
    ChangeEvent, ClientMessage, ErrorReport, InitPayload, ServerMessage, DEFAULT_MANIFEST,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, oneshot, watch};

/// Identifier assigned to each connection.
pub type ClientId = u64;

/// A serialized server message. Shared so a broadcast encodes once.
pub type Frame = Arc<str>;

/// Default per-client outbound queue length.
pub const DEFAULT_CLIENT_BUFFER: usize = 256;

const COMMAND_BUFFER: usize = 64;

/// Lifecycle of the session server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    /// Created, not yet accepting connections
    Idle,
    /// Listening socket bound
    Listening,
    /// Processing connections and change events
    Serving,
    /// Stopped; all connections closed
    Terminated,
}

/// How INIT snapshots are produced.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SnapshotPolicy {
    /// Read the project from disk for every connection
    #[default]
    PerConnection,
    /// Reuse the last INIT until the next change event
    Cached,
}

/// Why [`SessionServer::run`] returned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionExit {
    /// Shutdown was requested
    Shutdown,
    /// A browser reported an unrecoverable bundler error
    Fatal(ErrorReport),
}

impl SessionExit {
    /// Convert into the command's result.
    pub fn into_result(self) -> Result<()> {
        match self {
            SessionExit::Shutdown => Ok(()),
            SessionExit::Fatal(report) => Err(CliError::BundlerCrashed {
                title: report.title,
                message: report.message,
            }),
        }
    }
}

/// Session configuration.
#[derive(Debug, Clone)]
pub struct SessionOptions {
    /// Project root read for INIT snapshots
    pub root: PathBuf,
    /// Rules shared with the watcher
    pub rules: Arc<IgnoreRules>,
    /// Scopes served by private registries, forwarded in INIT
    pub registry_scopes: Vec<String>,
    /// Ask browsers to log verbosely
    pub verbose: bool,
    /// Manifest file name forwarded in INIT
    pub manifest: String,
    /// Snapshot production strategy
    pub policy: SnapshotPolicy,
    /// Per-client outbound queue length
    pub client_buffer: usize,
}

impl SessionOptions {
    /// Options with defaults for everything but the root.
    pub fn new(root: PathBuf, rules: Arc<IgnoreRules>) -> Self {
        Self {
            root,
            rules,
            registry_scopes: Vec::new(),
            verbose: false,
            manifest: DEFAULT_MANIFEST.to_string(),
            policy: SnapshotPolicy::default(),
            client_buffer: DEFAULT_CLIENT_BUFFER,
        }
    }
}

/// An accepted client: its id and its outbound queue, INIT first.
#[derive(Debug)]
pub struct Connection {
    /// Assigned id
    pub id: ClientId,
    /// Frames to write to the socket, in order
    pub outbound: mpsc::Receiver<Frame>,
}

enum Command {
    Connect {
        reply: oneshot::Sender<Result<Connection>>,
    },
    Disconnect {
        id: ClientId,
    },
    Report {
        id: ClientId,
        message: ClientMessage,
    },
}

/// Cloneable handle used by socket handlers to talk to the session.
#[derive(Clone)]
pub struct SessionHandle {
    commands: mpsc::Sender<Command>,
    phase: watch::Receiver<SessionPhase>,
}

impl SessionHandle {
    /// Register a new client.
    ///
    /// Resolves once the client's INIT is queued. Fails if the snapshot could
    /// not be read or the session has stopped; in both cases the caller
    /// should close the socket.
    pub async fn connect(&self) -> Result<Connection> {
        let (reply, response) = oneshot::channel();
        self.commands
            .send(Command::Connect { reply })
            .await
            .map_err(|_| CliError::Server("session has stopped".to_string()))?;
        response
            .await
            .map_err(|_| CliError::Server("session has stopped".to_string()))?
    }

    /// Remove a client. No-op if it is already gone.
    pub async fn disconnect(&self, id: ClientId) {
        let _ = self.commands.send(Command::Disconnect { id }).await;
    }

    /// Forward a message received from a client.
    pub async fn report(&self, id: ClientId, message: ClientMessage) {
        let _ = self.commands.send(Command::Report { id, message }).await;
    }

    /// Current lifecycle phase.
    pub fn phase(&self) -> SessionPhase {
        *self.phase.borrow()
    }

    /// Wait until the session reaches `phase` or stops.
    pub async fn wait_for(&mut self, phase: SessionPhase) {
        let _ = self
            .phase
            .wait_for(|current| *current == phase || *current == SessionPhase::Terminated)
            .await;
    }
}

/// The session actor. Drive it with [`SessionServer::run`].
pub struct SessionServer {
    options: SessionOptions,
    commands: mpsc::Receiver<Command>,
    clients: BTreeMap<ClientId, mpsc::Sender<Frame>>,
    next_id: ClientId,
    phase: watch::Sender<SessionPhase>,
    cached_init: Option<Frame>,
}

impl SessionServer {
    /// Create the actor and a handle to it.
    pub fn new(options: SessionOptions) -> (Self, SessionHandle) {
        let (commands_tx, commands) = mpsc::channel(COMMAND_BUFFER);
        let (phase, phase_rx) = watch::channel(SessionPhase::Idle);
        let server = Self {
            options,
            commands,
            clients: BTreeMap::new(),
            next_id: 1,
            phase,
            cached_init: None,
        };
        let handle = SessionHandle {
            commands: commands_tx,
            phase: phase_rx,
        };
        (server, handle)
    }

    /// Record that the listening socket is bound.
    pub fn mark_listening(&self) {
        self.set_phase(SessionPhase::Listening);
    }

    /// Number of registered clients.
    pub fn client_count(&self) -> usize {
        self.clients.len()
    }

    /// Process commands and change events until shutdown or a fatal report.
    ///
    /// On return every client queue has been closed.
    pub async fn run<S>(mut self, mut events: mpsc::Receiver<ChangeEvent>, shutdown: S) -> SessionExit
    where
        S: Future<Output = ()>,
    {
        self.set_phase(SessionPhase::Serving);
        tokio::pin!(shutdown);
        let mut events_open = true;

        let exit = loop {
            tokio::select! {
                biased;
                _ = &mut shutdown => break SessionExit::Shutdown,
                command = self.commands.recv() => match command {
                    Some(command) => {
                        if let Some(exit) = self.handle_command(command).await {
                            break exit;
                        }
                    }
                    None => break SessionExit::Shutdown,
                },
                event = events.recv(), if events_open => match event {
                    Some(event) => self.broadcast(event),
                    None => {
                        tracing::warn!("File watcher stopped; no further changes will be sent");
                        events_open = false;
                    }
                },
            }
        };

        let closed = self.clients.len();
        self.clients.clear();
        self.set_phase(SessionPhase::Terminated);
        tracing::debug!(clients = closed, "Session terminated");
        exit
    }

    fn set_phase(&self, phase: SessionPhase) {
        self.phase.send_replace(phase);
    }

    async fn handle_command(&mut self, command: Command) -> Option<SessionExit> {
        match command {
            Command::Connect { reply } => {
                self.connect(reply).await;
                None
            }
            Command::Disconnect { id } => {
                if self.clients.remove(&id).is_some() {
                    tracing::debug!(client = id, remaining = self.clients.len(), "Client disconnected");
                }
                None
            }
            Command::Report { id, message } => self.handle_report(id, message),
        }
    }

    async fn connect(&mut self, reply: oneshot::Sender<Result<Connection>>) {
        let frame = match self.init_frame().await {
            Ok(frame) => frame,
            Err(err) => {
                tracing::error!(error = %err, "Failed to read project snapshot; rejecting client");
                let _ = reply.send(Err(err));
                return;
            }
        };

        let (tx, outbound) = mpsc::channel(self.options.client_buffer.max(1));
        // Fresh queue with capacity of at least one
        let _ = tx.try_send(frame);

        let id = self.next_id;
        self.next_id += 1;

        if reply.send(Ok(Connection { id, outbound })).is_ok() {
            self.clients.insert(id, tx);
            tracing::debug!(client = id, total = self.clients.len(), "Client connected");
        }
    }

    async fn init_frame(&mut self) -> Result<Frame> {
        if self.options.policy == SnapshotPolicy::Cached {
            if let Some(frame) = &self.cached_init {
                return Ok(Arc::clone(frame));
            }
        }

        let files = read_snapshot_async(self.options.root.clone(), Arc::clone(&self.options.rules)).await?;
        let file_count = files.len();
        let message = ServerMessage::Init(InitPayload {
            files,
            registry_scopes: self.options.registry_scopes.clone(),
            verbose: self.options.verbose,
            manifest: self.options.manifest.clone(),
        });
        let frame: Frame = message.to_json()?.into();
        tracing::debug!(files = file_count, bytes = frame.len(), "Prepared INIT");

        if self.options.policy == SnapshotPolicy::Cached {
            self.cached_init = Some(Arc::clone(&frame));
        }
        Ok(frame)
    }

    fn handle_report(&mut self, id: ClientId, message: ClientMessage) -> Option<SessionExit> {
        match message {
            ClientMessage::UnhandledSandpackError(report) => {
                tracing::error!(
                    client = id,
                    title = %report.title,
                    "Unhandled bundler error: {}",
                    report.message
                );
                Some(SessionExit::Fatal(report))
            }
            ClientMessage::Error(report) => {
                tracing::warn!(client = id, title = %report.title, "Client error: {}", report.message);
                None
            }
        }
    }

    fn broadcast(&mut self, event: ChangeEvent) {
        self.cached_init = None;

        let kind = event.kind();
        let frame: Frame = match ServerMessage::Patch(event).to_json() {
            Ok(json) => json.into(),
            Err(err) => {
                tracing::error!(error = %err, "Failed to encode PATCH");
                return;
            }
        };

        self.clients.retain(|id, tx| match tx.try_send(Arc::clone(&frame)) {
            Ok(()) => true,
            Err(TrySendError::Closed(_)) => {
                tracing::debug!(client = id, "Dropping closed client");
                false
            }
            Err(TrySendError::Full(_)) => {
                tracing::warn!(client = id, "Client is not keeping up; disconnecting it");
                false
            }
        });

        tracing::debug!(event = %kind, clients = self.clients.len(), "Broadcast PATCH");
    }
}
