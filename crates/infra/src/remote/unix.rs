//! Unix domain socket transport.

use std::os::unix::net::UnixStream;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::debug;

use cmdgraph_interface::{RequestEnvelope, ResponseEnvelope};

use super::codec;
use super::transport::{Transport, TransportError};
use crate::config::RemoteConfig;

/// Client end of a Unix socket connection to a [`CommandServer`](super::CommandServer).
///
/// Connects lazily on the first request. Any failure drops the connection so a
/// late response to a timed-out request can never be paired with the next one;
/// the following request reconnects.
#[derive(Debug)]
pub struct UnixSocketTransport {
    socket_path: PathBuf,
    timeout: Option<Duration>,
    max_frame_bytes: usize,
    stream: Option<UnixStream>,
}

impl UnixSocketTransport {
    pub fn new(config: &RemoteConfig) -> Self {
        Self {
            socket_path: config.socket_path.clone(),
            timeout: config.timeout,
            max_frame_bytes: config.max_frame_bytes,
            stream: None,
        }
    }

    /// Create the transport and connect right away.
    pub fn connect(config: &RemoteConfig) -> Result<Self, TransportError> {
        let mut transport = Self::new(config);
        transport.stream()?;
        Ok(transport)
    }

    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }

    pub fn is_connected(&self) -> bool {
        self.stream.is_some()
    }

    fn stream(&mut self) -> Result<&mut UnixStream, TransportError> {
        if self.stream.is_none() {
            let stream =
                UnixStream::connect(&self.socket_path).map_err(|source| TransportError::Connect {
                    target: self.socket_path.display().to_string(),
                    source,
                })?;
            stream.set_read_timeout(self.timeout)?;
            stream.set_write_timeout(self.timeout)?;
            debug!(socket = %self.socket_path.display(), "connected");
            self.stream = Some(stream);
        }

        self.stream
            .as_mut()
            .ok_or(TransportError::Closed)
    }

    fn exchange(&mut self, request: &RequestEnvelope) -> Result<ResponseEnvelope, TransportError> {
        let max = self.max_frame_bytes;
        let stream = self.stream()?;
        codec::write_message(stream, request, max)?;
        codec::read_message(stream, max)
    }
}

impl Transport for UnixSocketTransport {
    fn round_trip(&mut self, request: &RequestEnvelope) -> Result<ResponseEnvelope, TransportError> {
        let result = self.exchange(request);
        if result.is_err() {
            self.stream = None;
        }
        result
    }
}
