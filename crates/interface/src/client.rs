//! Navigation-oriented client over any command interface.
//!
//! Scripting shells and completion code usually hold a "current node" and move
//! around the graph from there. `CommandClient` pairs a node with the interface
//! used to evaluate calls on it.

use cmdgraph_core::{
    Args, CommandGraphError, CommandGraphNode, CommandResult, CommandValue, Kwargs, ObjectType,
};

use crate::interface::CommandInterface;

#[derive(Debug, Clone)]
pub struct CommandClient<I> {
    interface: I,
    node: CommandGraphNode,
}

impl<I> CommandClient<I> {
    /// A client positioned at the root.
    pub fn new(interface: I) -> Self {
        Self::at(interface, CommandGraphNode::root())
    }

    pub fn at(interface: I, node: CommandGraphNode) -> Self {
        Self { interface, node }
    }

    pub fn node(&self) -> &CommandGraphNode {
        &self.node
    }

    pub fn interface(&self) -> &I {
        &self.interface
    }

    pub fn into_parts(self) -> (I, CommandGraphNode) {
        (self.interface, self.node)
    }
}

impl<I> CommandClient<I>
where
    I: CommandInterface + Clone,
{
    /// Move to a child without checking that it exists.
    pub fn navigate(&self, object_type: ObjectType, key: Option<&str>) -> CommandResult<Self> {
        let node = self.node.navigate(object_type, key.map(str::to_string))?;
        Ok(Self::at(self.interface.clone(), node))
    }

    /// Move to a child, first checking a keyed step with `has_item`.
    ///
    /// Unkeyed steps select the current instance and are not checked.
    pub fn navigate_checked(&self, object_type: ObjectType, key: Option<&str>) -> CommandResult<Self> {
        if let Some(key) = key {
            if !self.interface.has_item(&self.node, object_type, key)? {
                return Err(CommandGraphError::object_resolution(format!(
                    "{}.{object_type}[{key:?}]",
                    self.node
                )));
            }
        }
        self.navigate(object_type, key)
    }

    /// Client for the parent node; the root stays at the root.
    pub fn parent(&self) -> Self {
        let node = self.node.parent().unwrap_or_default();
        Self::at(self.interface.clone(), node)
    }
}

impl<I> CommandClient<I>
where
    I: CommandInterface,
{
    pub fn call(&self, command: &str, args: Args, kwargs: Kwargs) -> CommandResult<CommandValue> {
        self.interface
            .execute(&self.node.call(command), args, kwargs)
    }

    pub fn has_command(&self, command: &str) -> CommandResult<bool> {
        self.interface.has_command(&self.node, command)
    }

    pub fn has_item(&self, object_type: ObjectType, item: &str) -> CommandResult<bool> {
        self.interface.has_item(&self.node, object_type, item)
    }

    /// Commands offered by the current node, via the `commands` built-in.
    pub fn commands(&self) -> CommandResult<Vec<String>> {
        let value = self.call("commands", Args::new(), Kwargs::new())?;
        string_list(value, "commands")
    }

    /// Keys of the `object_type` children of the current node, via the `items`
    /// built-in.
    pub fn items(&self, object_type: ObjectType) -> CommandResult<Vec<String>> {
        let value = self.call(
            "items",
            vec![CommandValue::from(object_type.as_str())],
            Kwargs::new(),
        )?;
        string_list(value, "items")
    }
}

fn string_list(value: CommandValue, command: &str) -> CommandResult<Vec<String>> {
    value.to_string_list().ok_or_else(|| {
        CommandGraphError::execution(format!("{command} returned {value:?}, expected a list of strings"))
    })
}
