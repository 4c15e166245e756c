use std::sync::Mutex;

use tracing::{Span, debug, field, instrument};

use cmdgraph_core::{
    Args, CommandGraphCall, CommandGraphError, CommandGraphNode, CommandResult, CommandValue,
    Kwargs, ObjectType,
};
use cmdgraph_interface::{
    CommandInterface, Request, RequestEnvelope, Response, check_item_category,
};

use super::transport::{Transport, TransportError};
use super::unix::UnixSocketTransport;
use crate::config::RemoteConfig;

/// Command interface that evaluates calls in another process.
///
/// ## Error semantics
///
/// - Failures reported by the serving process (`ObjectResolution`, `Command`,
///   `Execution`, `InvalidPath`) are decoded into the same local kind.
/// - Failures of the channel (connect, timeout, hang-up, undecodable or
///   mismatched response) are always `Transport`. A predicate never turns a
///   transport failure into `false`.
///
/// ## Ordering
///
/// The transport sits behind a mutex: requests issued through one interface
/// are sent and answered strictly one after the other.
#[derive(Debug)]
pub struct RemoteCommandInterface<T> {
    transport: Mutex<T>,
}

impl RemoteCommandInterface<UnixSocketTransport> {
    /// Remote interface over the Unix socket named by `config`. Connects on the
    /// first request.
    pub fn unix(config: &RemoteConfig) -> Self {
        Self::new(UnixSocketTransport::new(config))
    }
}

impl<T> RemoteCommandInterface<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport: Mutex::new(transport),
        }
    }

    pub fn into_transport(self) -> Option<T> {
        self.transport.into_inner().ok()
    }
}

impl<T: Transport> RemoteCommandInterface<T> {
    #[instrument(
        name = "remote.round_trip",
        skip(self, request),
        fields(op = request.op(), request_id = field::Empty),
        err
    )]
    fn round_trip(&self, request: Request) -> CommandResult<Response> {
        let envelope = RequestEnvelope::new(request);
        Span::current().record("request_id", field::display(envelope.request_id()));

        let mut transport = self
            .transport
            .lock()
            .map_err(|_| CommandGraphError::transport("transport lock poisoned"))?;
        let reply = transport.round_trip(&envelope)?;

        if reply.request_id() != envelope.request_id() {
            return Err(TransportError::Mismatch {
                expected: envelope.request_id(),
                got: reply.request_id(),
            }
            .into());
        }

        debug!("response received");
        Ok(reply.into_response())
    }

    fn predicate(&self, request: Request) -> CommandResult<bool> {
        let value = self.round_trip(request)?.into_result()?;
        value.as_bool().ok_or_else(|| {
            TransportError::Decode(format!("expected a boolean answer, got {value:?}")).into()
        })
    }
}

impl<T: Transport> CommandInterface for RemoteCommandInterface<T> {
    fn execute(
        &self,
        call: &CommandGraphCall,
        args: Args,
        kwargs: Kwargs,
    ) -> CommandResult<CommandValue> {
        self.round_trip(Request::execute(call, args, kwargs))?
            .into_result()
    }

    fn has_command(&self, node: &CommandGraphNode, command: &str) -> CommandResult<bool> {
        self.predicate(Request::has_command(node, command))
    }

    fn has_item(
        &self,
        node: &CommandGraphNode,
        object_type: ObjectType,
        item: &str,
    ) -> CommandResult<bool> {
        check_item_category(node, object_type)?;
        self.predicate(Request::has_item(node, object_type, item))
    }
}
