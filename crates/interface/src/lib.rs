//! `cmdgraph-interface`: the command interface contract and its boundaries.
//!
//! - [`CommandInterface`]: the three-operation contract every strategy implements
//! - [`CommandObject`]: the registry boundary a direct interface resolves against
//! - [`InMemoryObject`]: an in-process object tree for tests/dev
//! - envelopes: what a remote interface puts on the wire

pub mod client;
pub mod envelope;
pub mod in_memory;
pub mod interface;
pub mod object;

pub use client::CommandClient;
pub use envelope::{ErrorPayload, Request, RequestEnvelope, Response, ResponseEnvelope};
pub use in_memory::InMemoryObject;
pub use interface::{CommandInterface, check_item_category};
pub use object::{
    BUILTIN_COMMANDS, CommandHandler, CommandObject, bound_command, command_names, resolve,
};
