//! In-process transport for tests/dev.
//!
//! Messages still go through the JSON codec, so an interface talking over a
//! channel exercises exactly the encoding a socket would.

use std::sync::mpsc::{self, RecvTimeoutError};
use std::time::{Duration, Instant};

use tracing::debug;

use cmdgraph_interface::{RequestEnvelope, ResponseEnvelope};

use super::codec;
use super::transport::{Transport, TransportError};

/// Client end of an in-process channel.
#[derive(Debug)]
pub struct ChannelTransport {
    tx: mpsc::Sender<Vec<u8>>,
    rx: mpsc::Receiver<Vec<u8>>,
    timeout: Option<Duration>,
    max_frame_bytes: usize,
}

/// Serving end of an in-process channel.
#[derive(Debug)]
pub struct ChannelEndpoint {
    rx: mpsc::Receiver<Vec<u8>>,
    tx: mpsc::Sender<Vec<u8>>,
}

/// Create a connected client/server pair.
pub fn channel_pair(
    timeout: Option<Duration>,
    max_frame_bytes: usize,
) -> (ChannelTransport, ChannelEndpoint) {
    let (request_tx, request_rx) = mpsc::channel();
    let (response_tx, response_rx) = mpsc::channel();
    (
        ChannelTransport {
            tx: request_tx,
            rx: response_rx,
            timeout,
            max_frame_bytes,
        },
        ChannelEndpoint {
            rx: request_rx,
            tx: response_tx,
        },
    )
}

impl ChannelEndpoint {
    /// Block until the next request frame; `None` once the client is gone.
    pub fn recv(&self) -> Option<Vec<u8>> {
        self.rx.recv().ok()
    }

    /// Send a response frame. Returns `false` once the client is gone.
    pub fn send(&self, frame: Vec<u8>) -> bool {
        self.tx.send(frame).is_ok()
    }
}

impl ChannelTransport {
    fn recv_frame(&self, deadline: Option<Instant>) -> Result<Vec<u8>, TransportError> {
        let Some(deadline) = deadline else {
            return self.rx.recv().map_err(|_| TransportError::Closed);
        };
        let remaining = deadline.saturating_duration_since(Instant::now());
        self.rx.recv_timeout(remaining).map_err(|e| match e {
            RecvTimeoutError::Timeout => TransportError::Timeout,
            RecvTimeoutError::Disconnected => TransportError::Closed,
        })
    }
}

impl Transport for ChannelTransport {
    fn round_trip(&mut self, request: &RequestEnvelope) -> Result<ResponseEnvelope, TransportError> {
        let frame = codec::encode(request, self.max_frame_bytes)?;
        self.tx.send(frame).map_err(|_| TransportError::Closed)?;

        let deadline = self.timeout.map(|t| Instant::now() + t);
        loop {
            let reply = self.recv_frame(deadline)?;
            if reply.len() > self.max_frame_bytes {
                return Err(TransportError::FrameTooLarge {
                    size: reply.len(),
                    limit: self.max_frame_bytes,
                });
            }

            let response: ResponseEnvelope = codec::decode(&reply)?;
            if response.request_id() == request.request_id() {
                return Ok(response);
            }
            // Late answer to a request that already timed out.
            debug!(stale = %response.request_id(), "discarding stale response");
        }
    }
}
