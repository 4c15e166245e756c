//! `cmdgraph-core`: command graph building blocks.
//!
//! This crate contains **pure values** (addresses, calls, command values and
//! the error taxonomy). It knows nothing about how a call is executed.

pub mod error;
pub mod graph;
pub mod object_type;
pub mod value;

pub use error::{CommandFailure, CommandGraphError, CommandResult, ErrorKind};
pub use graph::{CommandGraphCall, CommandGraphNode, Selector};
pub use object_type::ObjectType;
pub use value::{Args, CommandValue, Kwargs};
