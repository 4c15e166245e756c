//! Command graph addressing: nodes and calls.
//!
//! A [`CommandGraphNode`] is a pure address. It names a location in the tree of
//! controllable objects by the sequence of `(object_type, object_key)` selectors
//! leading to it from the root. Nodes never hold on to the objects they name;
//! whether an address currently resolves is decided by a command interface at
//! the moment it is used.
//!
//! ```text
//! root ── group["1"] ── window ── (call) kill
//! ```

use serde::{Deserialize, Serialize};

use crate::error::{CommandGraphError, CommandResult};
use crate::object_type::ObjectType;

/// One navigation step: a category plus an optional instance key.
///
/// A missing key selects the current (focused or singleton) instance of that
/// category beneath the parent.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Selector {
    pub object_type: ObjectType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
}

impl Selector {
    pub fn new(object_type: ObjectType, key: Option<String>) -> Self {
        Self { object_type, key }
    }
}

impl core::fmt::Display for Selector {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match &self.key {
            Some(key) => write!(f, "{}[{key:?}]", self.object_type),
            None => write!(f, "{}", self.object_type),
        }
    }
}

/// Address of a location in the command graph.
///
/// Equality and hashing are by path, so two nodes built by the same sequence of
/// [`navigate`](Self::navigate) calls are equal.
///
/// The ancestor chain is stored as owned selectors rather than as links to
/// parent nodes: reconstructing the path never requires the parent to still be
/// alive, and a node never extends its parent's lifetime.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CommandGraphNode {
    path: Vec<Selector>,
}

impl CommandGraphNode {
    /// The root of the graph.
    pub fn root() -> Self {
        Self::default()
    }

    /// Rebuild a node from a selector path, validating every step.
    pub fn from_path(path: impl IntoIterator<Item = Selector>) -> CommandResult<Self> {
        let mut node = Self::root();
        for sel in path {
            node = node.navigate(sel.object_type, sel.key)?;
        }
        Ok(node)
    }

    /// Select a child of this node.
    ///
    /// Fails with [`CommandGraphError::InvalidPath`] when `object_type` is not a
    /// child category of this node's type. The key is not checked here.
    pub fn navigate(
        &self,
        object_type: ObjectType,
        object_key: Option<String>,
    ) -> CommandResult<Self> {
        if !self.object_type().has_child(object_type) {
            return Err(CommandGraphError::invalid_path(format!(
                "{object_type} is not a valid child of {self}"
            )));
        }

        let mut path = Vec::with_capacity(self.path.len() + 1);
        path.extend(self.path.iter().cloned());
        path.push(Selector::new(object_type, object_key));
        Ok(Self { path })
    }

    /// Same as [`navigate`](Self::navigate), taking the category as a tag.
    pub fn navigate_str(&self, object_type: &str, object_key: Option<&str>) -> CommandResult<Self> {
        self.navigate(object_type.parse()?, object_key.map(str::to_string))
    }

    /// Wrap this node and a command name into a call. No validation happens.
    pub fn call(&self, command: impl Into<String>) -> CommandGraphCall {
        CommandGraphCall::new(self.clone(), command)
    }

    pub fn is_root(&self) -> bool {
        self.path.is_empty()
    }

    pub fn object_type(&self) -> ObjectType {
        self.path
            .last()
            .map(|s| s.object_type)
            .unwrap_or(ObjectType::Root)
    }

    pub fn object_key(&self) -> Option<&str> {
        self.path.last().and_then(|s| s.key.as_deref())
    }

    /// The node this one was navigated from; `None` for the root.
    pub fn parent(&self) -> Option<Self> {
        let (_, ancestors) = self.path.split_last()?;
        Some(Self {
            path: ancestors.to_vec(),
        })
    }

    /// Selectors from the root down to this node (empty for the root).
    pub fn selectors(&self) -> &[Selector] {
        &self.path
    }

    pub fn into_selectors(self) -> Vec<Selector> {
        self.path
    }

    /// Child categories that can be navigated to from here.
    pub fn children(&self) -> &'static [ObjectType] {
        self.object_type().children()
    }
}

impl core::fmt::Display for CommandGraphNode {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str("root")?;
        for sel in &self.path {
            write!(f, ".{sel}")?;
        }
        Ok(())
    }
}

/// A node plus the name of the command to run on it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CommandGraphCall {
    node: CommandGraphNode,
    command: String,
}

impl CommandGraphCall {
    pub fn new(node: CommandGraphNode, command: impl Into<String>) -> Self {
        Self {
            node,
            command: command.into(),
        }
    }

    pub fn node(&self) -> &CommandGraphNode {
        &self.node
    }

    /// The node the command is resolved on.
    pub fn parent(&self) -> &CommandGraphNode {
        &self.node
    }

    pub fn command(&self) -> &str {
        &self.command
    }

    pub fn selectors(&self) -> &[Selector] {
        self.node.selectors()
    }

    pub fn into_parts(self) -> (CommandGraphNode, String) {
        (self.node, self.command)
    }
}

impl core::fmt::Display for CommandGraphCall {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}.{}", self.node, self.command)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn group(key: &str) -> CommandGraphNode {
        CommandGraphNode::root()
            .navigate(ObjectType::Group, Some(key.to_string()))
            .unwrap()
    }

    #[test]
    fn root_has_no_parent() {
        let root = CommandGraphNode::root();
        assert!(root.is_root());
        assert_eq!(root.object_type(), ObjectType::Root);
        assert!(root.parent().is_none());
        assert_eq!(root.to_string(), "root");
    }

    #[test]
    fn navigate_builds_path() {
        let window = group("1").navigate(ObjectType::Window, None).unwrap();

        assert_eq!(window.object_type(), ObjectType::Window);
        assert_eq!(window.object_key(), None);
        assert_eq!(window.selectors().len(), 2);
        assert_eq!(window.parent().unwrap(), group("1"));
        assert_eq!(window.to_string(), r#"root.group["1"].window"#);
    }

    #[test]
    fn invalid_child_category_is_rejected() {
        let err = group("1").navigate(ObjectType::Bar, None).unwrap_err();
        assert!(matches!(err, CommandGraphError::InvalidPath(_)));

        let err = CommandGraphNode::root()
            .navigate_str("toolbar", None)
            .unwrap_err();
        assert!(matches!(err, CommandGraphError::InvalidPath(_)));
    }

    #[test]
    fn call_wraps_node_without_validation() {
        let call = group("1").call("definitely_not_a_command");
        assert_eq!(call.command(), "definitely_not_a_command");
        assert_eq!(call.parent(), &group("1"));
        assert_eq!(call.to_string(), r#"root.group["1"].definitely_not_a_command"#);
    }

    #[test]
    fn from_path_validates_steps() {
        let ok = CommandGraphNode::from_path(group("2").into_selectors()).unwrap();
        assert_eq!(ok, group("2"));

        let bad = vec![
            Selector::new(ObjectType::Window, None),
            Selector::new(ObjectType::Widget, None),
        ];
        assert!(CommandGraphNode::from_path(bad).is_err());
    }

    fn step() -> impl Strategy<Value = (usize, Option<String>)> {
        (0usize..7, proptest::option::of("[a-z0-9]{1,4}"))
    }

    fn build(steps: &[(usize, Option<String>)]) -> CommandGraphNode {
        let mut node = CommandGraphNode::root();
        for (idx, key) in steps {
            let ty = ObjectType::SELECTABLE[*idx];
            if let Ok(next) = node.navigate(ty, key.clone()) {
                node = next;
            }
        }
        node
    }

    proptest! {
        /// Property: equal navigation sequences give equal nodes.
        #[test]
        fn equal_navigation_gives_equal_nodes(steps in proptest::collection::vec(step(), 0..8)) {
            let a = build(&steps);
            let b = build(&steps);
            prop_assert_eq!(&a, &b);
            prop_assert_eq!(a.to_string(), b.to_string());
        }

        /// Property: the parent of a navigated node is the node it came from.
        #[test]
        fn parent_undoes_navigate(steps in proptest::collection::vec(step(), 0..8), last in step()) {
            let base = build(&steps);
            let ty = ObjectType::SELECTABLE[last.0];
            if let Ok(child) = base.navigate(ty, last.1) {
                prop_assert_eq!(child.parent(), Some(base));
            }
        }
    }
}
