//! Serving side of the remote interface.
//!
//! A [`CommandServer`] decodes request envelopes, evaluates them against any
//! local [`CommandInterface`] (normally a direct one) and encodes the outcome:
//!
//! ```text
//! frame → RequestEnvelope → CommandInterface → Response → frame
//! ```
//!
//! Command-level failures travel back as error payloads. So does a response
//! that cannot be encoded (for instance one larger than `max_frame_bytes`): the
//! caller gets an `Execution` error for its request instead of silence.
//!
//! A request that cannot be decoded is answered with a `Transport` error when
//! its request id can still be read. Otherwise there is nothing to answer: a
//! socket connection is closed and a channel frame is dropped.

use std::io::{ErrorKind as IoErrorKind, Read, Write};
use std::os::unix::net::{UnixListener, UnixStream};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::mpsc;
use std::thread;

use anyhow::Context;
use tracing::{debug, error, info, warn};

use cmdgraph_core::{CommandGraphError, CommandGraphNode, CommandResult, CommandValue};
use cmdgraph_interface::{CommandInterface, Request, RequestEnvelope, Response, ResponseEnvelope};

use super::channel::ChannelEndpoint;
use super::codec;
use super::transport::TransportError;
use crate::config::ServerConfig;

/// Origin of the `Execution` error sent when a response exceeds the frame limit.
pub const FRAME_TOO_LARGE_ORIGIN: &str = "frame_too_large";

/// Origin of the `Execution` error sent when a response cannot be serialized.
pub const ENCODE_ORIGIN: &str = "encode";

/// Answers remote requests from a local command interface.
#[derive(Debug)]
pub struct CommandServer<I> {
    interface: I,
    config: ServerConfig,
}

/// Handle to a running socket listener.
#[derive(Debug)]
pub struct ServerHandle {
    shutdown: mpsc::Sender<()>,
    join: Option<thread::JoinHandle<()>>,
    socket_path: PathBuf,
}

impl ServerHandle {
    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }

    /// Stop accepting connections, wait for the accept loop and remove the
    /// socket file. Connections already being served finish on their own.
    pub fn shutdown(mut self) {
        let _ = self.shutdown.send(());
        if let Some(j) = self.join.take() {
            let _ = j.join();
        }
        let _ = std::fs::remove_file(&self.socket_path);
    }
}

impl<I> CommandServer<I> {
    pub fn new(interface: I, config: ServerConfig) -> Self {
        Self { interface, config }
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }
}

impl<I: CommandInterface> CommandServer<I> {
    /// Evaluate one request.
    pub fn handle(&self, envelope: RequestEnvelope) -> ResponseEnvelope {
        let request_id = envelope.request_id();
        let op = envelope.request().op();
        let result = self.evaluate(envelope.into_request());

        if let Err(err) = &result {
            debug!(server = %self.config.name, %request_id, op, kind = %err.kind(), "request failed: {err}");
        }
        ResponseEnvelope::new(request_id, Response::from(result))
    }

    fn evaluate(&self, request: Request) -> CommandResult<CommandValue> {
        match request {
            Request::Execute {
                path,
                command,
                args,
                kwargs,
            } => {
                let call = CommandGraphNode::from_path(path)?.call(command);
                self.interface.execute(&call, args, kwargs)
            }
            Request::HasCommand { path, command } => {
                let node = CommandGraphNode::from_path(path)?;
                self.interface
                    .has_command(&node, &command)
                    .map(CommandValue::Bool)
            }
            Request::HasItem {
                path,
                object_type,
                item,
            } => {
                let node = CommandGraphNode::from_path(path)?;
                self.interface
                    .has_item(&node, object_type, &item)
                    .map(CommandValue::Bool)
            }
        }
    }

    /// Decode and evaluate one request frame. `None` when the frame is not a
    /// request and carries no readable request id.
    fn answer(&self, frame: &[u8]) -> Option<ResponseEnvelope> {
        match codec::decode::<RequestEnvelope>(frame) {
            Ok(envelope) => Some(self.handle(envelope)),
            Err(err) => {
                let request_id = codec::peek_request_id(frame)?;
                warn!(server = %self.config.name, %request_id, "undecodable request: {err}");
                let rejected: CommandResult<CommandValue> = Err(CommandGraphError::transport(
                    format!("server could not decode request: {err}"),
                ));
                Some(ResponseEnvelope::new(request_id, Response::from(rejected)))
            }
        }
    }

    /// Encode a response. One that cannot be encoded is replaced by an
    /// `Execution` error for the same request.
    fn encode_response(&self, response: &ResponseEnvelope) -> Result<Vec<u8>, TransportError> {
        let max = self.config.max_frame_bytes;
        let err = match codec::encode(response, max) {
            Ok(bytes) => return Ok(bytes),
            Err(err) => err,
        };

        let origin = match err {
            TransportError::FrameTooLarge { .. } => FRAME_TOO_LARGE_ORIGIN,
            _ => ENCODE_ORIGIN,
        };
        error!(server = %self.config.name, request_id = %response.request_id(), "could not encode response: {err}");
        let failure: CommandResult<CommandValue> = Err(CommandGraphError::Execution {
            message: format!("result could not be sent back: {err}"),
            origin: Some(origin.to_string()),
        });
        codec::encode(
            &ResponseEnvelope::new(response.request_id(), Response::from(failure)),
            max,
        )
    }

    /// Serve sequential requests on one stream until the peer hangs up.
    pub fn serve_stream<S: Read + Write>(&self, stream: &mut S) -> Result<(), TransportError> {
        let max = self.config.max_frame_bytes;
        loop {
            let frame = match codec::read_frame(stream, max) {
                Ok(frame) => frame,
                Err(TransportError::Closed) => return Ok(()),
                Err(err) => return Err(err),
            };
            let Some(response) = self.answer(&frame) else {
                return Err(TransportError::Decode("request without a readable id".to_string()));
            };
            let bytes = self.encode_response(&response)?;
            codec::write_frame(stream, &bytes, max)?;
        }
    }

    /// Answer frames arriving on an in-process channel until the client is gone.
    pub fn serve_channel(&self, endpoint: &ChannelEndpoint) {
        while let Some(frame) = endpoint.recv() {
            let Some(response) = self.answer(&frame) else {
                warn!(server = %self.config.name, "dropping request without a readable id");
                continue;
            };

            match self.encode_response(&response) {
                Ok(bytes) => {
                    if !endpoint.send(bytes) {
                        break;
                    }
                }
                Err(err) => {
                    error!(server = %self.config.name, "could not encode error response: {err}");
                }
            }
        }
        debug!(server = %self.config.name, "channel client gone");
    }
}

impl<I> CommandServer<I>
where
    I: CommandInterface + 'static,
{
    /// Serve an in-process channel on a background thread.
    pub fn spawn_channel(self: Arc<Self>, endpoint: ChannelEndpoint) -> thread::JoinHandle<()> {
        thread::spawn(move || self.serve_channel(&endpoint))
    }

    /// Bind the configured Unix socket and accept connections on a background
    /// thread; each connection is served on its own thread.
    ///
    /// A stale socket file at the path is replaced.
    pub fn spawn_unix(self: Arc<Self>) -> anyhow::Result<ServerHandle> {
        let socket_path = self.config.socket_path.clone();
        if let Some(parent) = socket_path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create socket directory {}", parent.display()))?;
        }
        if socket_path.exists() {
            std::fs::remove_file(&socket_path)
                .with_context(|| format!("failed to remove stale socket {}", socket_path.display()))?;
        }

        let listener = UnixListener::bind(&socket_path)
            .with_context(|| format!("failed to bind {}", socket_path.display()))?;
        listener
            .set_nonblocking(true)
            .context("failed to make listener non-blocking")?;

        info!(server = %self.config.name, socket = %socket_path.display(), "listening");

        let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>();
        let join = thread::Builder::new()
            .name(self.config.name.clone())
            .spawn(move || self.accept_loop(listener, shutdown_rx))
            .context("failed to spawn accept thread")?;

        Ok(ServerHandle {
            shutdown: shutdown_tx,
            join: Some(join),
            socket_path,
        })
    }

    fn accept_loop(self: Arc<Self>, listener: UnixListener, shutdown: mpsc::Receiver<()>) {
        loop {
            match shutdown.try_recv() {
                Ok(()) | Err(mpsc::TryRecvError::Disconnected) => break,
                Err(mpsc::TryRecvError::Empty) => {}
            }

            match listener.accept() {
                Ok((stream, _addr)) => {
                    let server = Arc::clone(&self);
                    thread::spawn(move || {
                        if let Err(err) = server.serve_connection(stream) {
                            warn!(server = %server.config.name, "connection error: {err:?}");
                        }
                    });
                }
                Err(err) if err.kind() == IoErrorKind::WouldBlock => {
                    thread::sleep(self.config.poll_interval);
                }
                Err(err) => {
                    error!(server = %self.config.name, "accept failed: {err}");
                    thread::sleep(self.config.poll_interval);
                }
            }
        }
        info!(server = %self.config.name, "stopped");
    }

    fn serve_connection(&self, mut stream: UnixStream) -> anyhow::Result<()> {
        stream
            .set_nonblocking(false)
            .context("failed to make connection blocking")?;
        debug!(server = %self.config.name, "client connected");
        self.serve_stream(&mut stream)
            .context("failed to serve connection")?;
        debug!(server = %self.config.name, "client disconnected");
        Ok(())
    }
}
