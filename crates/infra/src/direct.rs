//! In-process command execution.
//!
//! [`DirectCommandInterface`] evaluates calls against a live object tree in the
//! same process:
//!
//! ```text
//! CommandGraphCall
//!   ↓
//! 1. Resolve the node path from the root object (fresh walk per call)
//!   ↓
//! 2. Look up the command as a capability bound to the resolved object
//!   ↓
//! 3. Invoke it synchronously; failures and panics become `Execution` errors
//! ```
//!
//! Resolution happens before command lookup, so a call whose command name was
//! confirmed by `has_command` can only fail with `ObjectResolution` (the object
//! went away) or `Execution` (the body failed), never with `Command` because
//! of a vanished object.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use tracing::{debug, warn};

use cmdgraph_core::{
    Args, CommandGraphCall, CommandGraphError, CommandGraphNode, CommandResult, CommandValue,
    Kwargs, ObjectType,
};
use cmdgraph_interface::{
    CommandInterface, CommandObject, bound_command, check_item_category, resolve,
};

/// Classification attached to `Execution` errors raised by a panicking command.
pub const PANIC_ORIGIN: &str = "panic";

/// Command interface over an in-process object tree.
///
/// Holds only the root object. The tree behind it is owned and mutated by the
/// host application; nothing about it is cached here.
#[derive(Clone)]
pub struct DirectCommandInterface {
    root: Arc<dyn CommandObject>,
}

impl core::fmt::Debug for DirectCommandInterface {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("DirectCommandInterface")
            .field("root", &self.root.object_type())
            .finish()
    }
}

impl DirectCommandInterface {
    pub fn new(root: Arc<dyn CommandObject>) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Arc<dyn CommandObject> {
        &self.root
    }

    /// Resolve a node, mapping "does not exist" to `None`.
    fn try_resolve(&self, node: &CommandGraphNode) -> CommandResult<Option<Arc<dyn CommandObject>>> {
        match resolve(&self.root, node.selectors()) {
            Ok(target) => Ok(Some(target)),
            Err(CommandGraphError::ObjectResolution(_)) => Ok(None),
            Err(err) => Err(err),
        }
    }
}

impl CommandInterface for DirectCommandInterface {
    fn execute(
        &self,
        call: &CommandGraphCall,
        args: Args,
        kwargs: Kwargs,
    ) -> CommandResult<CommandValue> {
        let target = resolve(&self.root, call.selectors()).inspect_err(|err| {
            debug!(call = %call, "target did not resolve: {err}");
        })?;

        let handler = bound_command(&target, call.command())
            .ok_or_else(|| CommandGraphError::command(call.to_string()))?;

        match panic::catch_unwind(AssertUnwindSafe(|| handler(args, kwargs))) {
            Ok(Ok(value)) => {
                debug!(call = %call, "command executed");
                Ok(value)
            }
            Ok(Err(failure)) => {
                warn!(call = %call, origin = ?failure.origin, "command failed: {}", failure.message);
                Err(failure.into())
            }
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                warn!(call = %call, "command panicked: {message}");
                Err(CommandGraphError::Execution {
                    message,
                    origin: Some(PANIC_ORIGIN.to_string()),
                })
            }
        }
    }

    fn has_command(&self, node: &CommandGraphNode, command: &str) -> CommandResult<bool> {
        Ok(self
            .try_resolve(node)?
            .is_some_and(|target| bound_command(&target, command).is_some()))
    }

    fn has_item(
        &self,
        node: &CommandGraphNode,
        object_type: ObjectType,
        item: &str,
    ) -> CommandResult<bool> {
        check_item_category(node, object_type)?;

        let Some(target) = self.try_resolve(node)? else {
            return Ok(false);
        };
        Ok(target
            .items(object_type)
            .is_some_and(|keys| keys.iter().any(|k| k == item)))
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "command panicked".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cmdgraph_core::CommandFailure;
    use cmdgraph_interface::InMemoryObject;

    fn setup() -> (Arc<InMemoryObject>, DirectCommandInterface) {
        let root = InMemoryObject::root();
        let group = root.add_child(ObjectType::Group, "1").unwrap();
        group.add_command("toggle", |_args, _kwargs| Ok(CommandValue::Bool(true)));
        group.add_command("fail", |_args, _kwargs| {
            Err(CommandFailure::new("nope").with_origin("ValueError"))
        });
        group.add_command("explode", |_args, _kwargs| panic!("kaboom"));
        group.add_command("echo", |args, kwargs| {
            let mut out = kwargs;
            out.insert("args".into(), CommandValue::List(args));
            Ok(CommandValue::Map(out))
        });
        let interface = DirectCommandInterface::new(root.clone());
        (root, interface)
    }

    fn group_node(key: &str) -> CommandGraphNode {
        CommandGraphNode::root()
            .navigate(ObjectType::Group, Some(key.to_string()))
            .unwrap()
    }

    #[test]
    fn executes_bound_command() {
        let (_root, direct) = setup();
        let value = direct
            .execute(&group_node("1").call("toggle"), Args::new(), Kwargs::new())
            .unwrap();
        assert_eq!(value, CommandValue::Bool(true));
    }

    #[test]
    fn passes_arguments_through() {
        let (_root, direct) = setup();
        let mut kwargs = Kwargs::new();
        kwargs.insert("name".into(), CommandValue::from("x"));

        let value = direct
            .execute(&group_node("1").call("echo"), vec![CommandValue::Int(7)], kwargs)
            .unwrap();
        let map = value.as_map().unwrap();
        assert_eq!(map["name"], CommandValue::from("x"));
        assert_eq!(map["args"], CommandValue::List(vec![CommandValue::Int(7)]));
    }

    #[test]
    fn unknown_command_is_command_error() {
        let (_root, direct) = setup();
        let err = direct
            .execute(&group_node("1").call("nope"), Args::new(), Kwargs::new())
            .unwrap_err();
        assert!(matches!(err, CommandGraphError::Command(_)));
    }

    #[test]
    fn missing_object_is_resolution_error_even_for_unknown_command() {
        let (_root, direct) = setup();
        let err = direct
            .execute(&group_node("9").call("nope"), Args::new(), Kwargs::new())
            .unwrap_err();
        assert!(matches!(err, CommandGraphError::ObjectResolution(_)));
    }

    #[test]
    fn failures_and_panics_become_execution_errors() {
        let (_root, direct) = setup();

        let err = direct
            .execute(&group_node("1").call("fail"), Args::new(), Kwargs::new())
            .unwrap_err();
        assert_eq!(err.origin(), Some("ValueError"));

        let err = direct
            .execute(&group_node("1").call("explode"), Args::new(), Kwargs::new())
            .unwrap_err();
        match err {
            CommandGraphError::Execution { message, origin } => {
                assert_eq!(message, "kaboom");
                assert_eq!(origin.as_deref(), Some(PANIC_ORIGIN));
            }
            other => panic!("expected execution error, got {other:?}"),
        }
    }

    #[test]
    fn has_command_is_false_for_missing_targets() {
        let (_root, direct) = setup();
        assert!(direct.has_command(&group_node("1"), "toggle").unwrap());
        assert!(direct.has_command(&group_node("1"), "commands").unwrap());
        assert!(!direct.has_command(&group_node("1"), "nope").unwrap());
        assert!(!direct.has_command(&group_node("9"), "toggle").unwrap());
    }

    #[test]
    fn has_item_checks_live_children() {
        let (root, direct) = setup();
        let top = CommandGraphNode::root();

        assert!(direct.has_item(&top, ObjectType::Group, "1").unwrap());
        assert!(!direct.has_item(&top, ObjectType::Group, "2").unwrap());

        root.remove_child(ObjectType::Group, "1");
        assert!(!direct.has_item(&top, ObjectType::Group, "1").unwrap());
        assert!(!direct.has_item(&group_node("1"), ObjectType::Window, "w").unwrap());
    }

    #[test]
    fn has_item_rejects_impossible_categories() {
        let (_root, direct) = setup();
        let err = direct
            .has_item(&group_node("1"), ObjectType::Bar, "top")
            .unwrap_err();
        assert!(matches!(err, CommandGraphError::InvalidPath(_)));
    }

    #[test]
    fn builtins_introspect_the_target() {
        let (root, direct) = setup();
        root.add_child(ObjectType::Screen, "0").unwrap();

        let names = direct
            .execute(&group_node("1").call("commands"), Args::new(), Kwargs::new())
            .unwrap()
            .to_string_list()
            .unwrap();
        assert!(names.contains(&"toggle".to_string()));
        assert!(names.contains(&"items".to_string()));

        let screens = direct
            .execute(
                &CommandGraphNode::root().call("items"),
                vec![CommandValue::from("screen")],
                Kwargs::new(),
            )
            .unwrap();
        assert_eq!(screens.to_string_list(), Some(vec!["0".to_string()]));
    }
}
