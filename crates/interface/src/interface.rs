//! The command interface contract (mechanics only).
//!
//! A [`CommandInterface`] evaluates calls on the command graph. Implementations
//! decide *how*: by calling into an object tree in this process, by sending the
//! call to another process, or by recording it for later evaluation.
//!
//! ## Contract
//!
//! - `execute` runs a call and surfaces every failure to the caller. No
//!   implementation retries or swallows errors.
//! - `has_command` and `has_item` never run command code. Absence of the target
//!   is `Ok(false)`; `Err` is reserved for malformed input (a category that
//!   cannot appear below the node) and, for remote interfaces, for a failed
//!   channel.
//! - Nothing is cached: every call resolves the path again, so `execute` may
//!   fail with `ObjectResolution` right after `has_command` returned `true`.
//!
//! ```text
//! node ──has_command/has_item──> bool        (optional, repeatable)
//!   │
//!   └─call(name)──> CommandGraphCall ──execute──> value | error
//! ```

use std::sync::Arc;

use cmdgraph_core::{
    Args, CommandGraphCall, CommandGraphError, CommandGraphNode, CommandResult, CommandValue,
    Kwargs, ObjectType,
};

/// Evaluates calls against a command graph.
///
/// The trait requires `Send + Sync` so one interface can be shared by every
/// caller in a process (key bindings, scripting hooks, a socket server).
pub trait CommandInterface: Send + Sync {
    /// Execute `call` with the given arguments and return its result.
    ///
    /// Errors:
    /// - `ObjectResolution`: the addressed object does not exist right now
    /// - `Command`: the object exists but does not offer the command
    /// - `Execution`: the command body failed
    /// - `Transport`: (remote only) the channel failed
    fn execute(
        &self,
        call: &CommandGraphCall,
        args: Args,
        kwargs: Kwargs,
    ) -> CommandResult<CommandValue>;

    /// Whether `command` is currently offered by the object at `node`.
    fn has_command(&self, node: &CommandGraphNode, command: &str) -> CommandResult<bool>;

    /// Whether `item` is currently a key of an `object_type` child of `node`.
    fn has_item(
        &self,
        node: &CommandGraphNode,
        object_type: ObjectType,
        item: &str,
    ) -> CommandResult<bool>;
}

/// Reject item lookups for categories that can never appear below `node`.
///
/// Shared by every implementation so the malformed-input failure is the same
/// regardless of strategy.
pub fn check_item_category(node: &CommandGraphNode, object_type: ObjectType) -> CommandResult<()> {
    if node.object_type().has_child(object_type) {
        Ok(())
    } else {
        Err(CommandGraphError::invalid_path(format!(
            "{object_type} is not a valid child of {node}"
        )))
    }
}

impl<I> CommandInterface for Arc<I>
where
    I: CommandInterface + ?Sized,
{
    fn execute(
        &self,
        call: &CommandGraphCall,
        args: Args,
        kwargs: Kwargs,
    ) -> CommandResult<CommandValue> {
        (**self).execute(call, args, kwargs)
    }

    fn has_command(&self, node: &CommandGraphNode, command: &str) -> CommandResult<bool> {
        (**self).has_command(node, command)
    }

    fn has_item(
        &self,
        node: &CommandGraphNode,
        object_type: ObjectType,
        item: &str,
    ) -> CommandResult<bool> {
        (**self).has_item(node, object_type, item)
    }
}

impl<I> CommandInterface for Box<I>
where
    I: CommandInterface + ?Sized,
{
    fn execute(
        &self,
        call: &CommandGraphCall,
        args: Args,
        kwargs: Kwargs,
    ) -> CommandResult<CommandValue> {
        (**self).execute(call, args, kwargs)
    }

    fn has_command(&self, node: &CommandGraphNode, command: &str) -> CommandResult<bool> {
        (**self).has_command(node, command)
    }

    fn has_item(
        &self,
        node: &CommandGraphNode,
        object_type: ObjectType,
        item: &str,
    ) -> CommandResult<bool> {
        (**self).has_item(node, object_type, item)
    }
}

impl<I> CommandInterface for &I
where
    I: CommandInterface + ?Sized,
{
    fn execute(
        &self,
        call: &CommandGraphCall,
        args: Args,
        kwargs: Kwargs,
    ) -> CommandResult<CommandValue> {
        (**self).execute(call, args, kwargs)
    }

    fn has_command(&self, node: &CommandGraphNode, command: &str) -> CommandResult<bool> {
        (**self).has_command(node, command)
    }

    fn has_item(
        &self,
        node: &CommandGraphNode,
        object_type: ObjectType,
        item: &str,
    ) -> CommandResult<bool> {
        (**self).has_item(node, object_type, item)
    }
}
