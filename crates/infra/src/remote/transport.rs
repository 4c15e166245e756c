use thiserror::Error;
use uuid::Uuid;

use cmdgraph_core::CommandGraphError;
use cmdgraph_interface::{RequestEnvelope, ResponseEnvelope};

/// Failure of the channel itself, as opposed to a failure reported by the
/// process on the other end.
///
/// Every variant converts into [`CommandGraphError::Transport`]; none of them
/// is ever reported to callers as a command-level result.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("could not connect to {target}: {source}")]
    Connect {
        target: String,
        #[source]
        source: std::io::Error,
    },

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("timed out waiting for a response")]
    Timeout,

    #[error("channel closed by peer")]
    Closed,

    #[error("frame of {size} bytes exceeds the {limit} byte limit")]
    FrameTooLarge { size: usize, limit: usize },

    #[error("could not encode message: {0}")]
    Encode(String),

    #[error("undecodable message: {0}")]
    Decode(String),

    #[error("response {got} does not answer request {expected}")]
    Mismatch { expected: Uuid, got: Uuid },
}

impl From<TransportError> for CommandGraphError {
    fn from(value: TransportError) -> Self {
        CommandGraphError::transport(value.to_string())
    }
}

/// Request/response exchange with one outstanding request at a time.
///
/// `&mut self` makes the single-outstanding-request rule a compile-time
/// property: a caller cannot issue the next request before the previous
/// `round_trip` returned.
pub trait Transport: Send {
    fn round_trip(&mut self, request: &RequestEnvelope) -> Result<ResponseEnvelope, TransportError>;
}

impl<T> Transport for Box<T>
where
    T: Transport + ?Sized,
{
    fn round_trip(&mut self, request: &RequestEnvelope) -> Result<ResponseEnvelope, TransportError> {
        (**self).round_trip(request)
    }
}
