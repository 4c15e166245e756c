use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use cmdgraph_core::{
    Args, CommandGraphCall, CommandGraphError, CommandGraphNode, CommandResult, CommandValue,
    ErrorKind, Kwargs, ObjectType, Selector,
};

/// One operation of the command interface, as it travels between processes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Request {
    Execute {
        path: Vec<Selector>,
        command: String,
        #[serde(default)]
        args: Args,
        #[serde(default)]
        kwargs: Kwargs,
    },
    HasCommand {
        path: Vec<Selector>,
        command: String,
    },
    HasItem {
        path: Vec<Selector>,
        object_type: ObjectType,
        item: String,
    },
}

impl Request {
    pub fn execute(call: &CommandGraphCall, args: Args, kwargs: Kwargs) -> Self {
        Self::Execute {
            path: call.selectors().to_vec(),
            command: call.command().to_string(),
            args,
            kwargs,
        }
    }

    pub fn has_command(node: &CommandGraphNode, command: &str) -> Self {
        Self::HasCommand {
            path: node.selectors().to_vec(),
            command: command.to_string(),
        }
    }

    pub fn has_item(node: &CommandGraphNode, object_type: ObjectType, item: &str) -> Self {
        Self::HasItem {
            path: node.selectors().to_vec(),
            object_type,
            item: item.to_string(),
        }
    }

    /// Short operation name for logs.
    pub fn op(&self) -> &'static str {
        match self {
            Request::Execute { .. } => "execute",
            Request::HasCommand { .. } => "has_command",
            Request::HasItem { .. } => "has_item",
        }
    }

    pub fn path(&self) -> &[Selector] {
        match self {
            Request::Execute { path, .. }
            | Request::HasCommand { path, .. }
            | Request::HasItem { path, .. } => path,
        }
    }
}

/// A failure reported by the serving process: kind + message, never a native
/// error type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorPayload {
    pub kind: ErrorKind,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin: Option<String>,
}

impl ErrorPayload {
    pub fn into_error(self) -> CommandGraphError {
        CommandGraphError::from_parts(self.kind, self.message, self.origin)
    }
}

impl From<&CommandGraphError> for ErrorPayload {
    fn from(value: &CommandGraphError) -> Self {
        Self {
            kind: value.kind(),
            message: value.message().to_string(),
            origin: value.origin().map(str::to_string),
        }
    }
}

/// Tagged success-or-error outcome of a request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Response {
    Ok { value: CommandValue },
    Err { error: ErrorPayload },
}

impl Response {
    pub fn into_result(self) -> CommandResult<CommandValue> {
        match self {
            Response::Ok { value } => Ok(value),
            Response::Err { error } => Err(error.into_error()),
        }
    }
}

impl From<CommandResult<CommandValue>> for Response {
    fn from(value: CommandResult<CommandValue>) -> Self {
        match value {
            Ok(value) => Response::Ok { value },
            Err(err) => Response::Err {
                error: ErrorPayload::from(&err),
            },
        }
    }
}

/// Envelope for an outbound request.
///
/// - `request_id` pairs the response with the request; a response carrying any
///   other id is a protocol violation.
/// - `sent_at` is informational (logging, latency).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestEnvelope {
    request_id: Uuid,
    sent_at: DateTime<Utc>,
    request: Request,
}

impl RequestEnvelope {
    pub fn new(request: Request) -> Self {
        Self {
            request_id: Uuid::now_v7(),
            sent_at: Utc::now(),
            request,
        }
    }

    pub fn request_id(&self) -> Uuid {
        self.request_id
    }

    pub fn sent_at(&self) -> DateTime<Utc> {
        self.sent_at
    }

    pub fn request(&self) -> &Request {
        &self.request
    }

    pub fn into_request(self) -> Request {
        self.request
    }

    /// Build the response envelope answering this request.
    pub fn reply(&self, response: Response) -> ResponseEnvelope {
        ResponseEnvelope::new(self.request_id, response)
    }
}

/// Envelope for an inbound response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseEnvelope {
    request_id: Uuid,
    response: Response,
}

impl ResponseEnvelope {
    pub fn new(request_id: Uuid, response: Response) -> Self {
        Self {
            request_id,
            response,
        }
    }

    pub fn request_id(&self) -> Uuid {
        self.request_id
    }

    pub fn response(&self) -> &Response {
        &self.response
    }

    pub fn into_response(self) -> Response {
        self.response
    }
}
