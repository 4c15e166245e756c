//! In-memory object tree for tests/dev and small embedders.

use std::collections::BTreeMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use cmdgraph_core::{
    Args, CommandFailure, CommandGraphError, CommandResult, CommandValue, Kwargs, ObjectType,
};

use crate::object::{CommandHandler, CommandObject};

type Children = BTreeMap<ObjectType, BTreeMap<String, Arc<InMemoryObject>>>;

/// A mutable node of an in-process object tree.
///
/// - Commands are closures registered by name and may be added or removed at
///   any time.
/// - Children are keyed by category and key; one child per category can be
///   marked current, which is what an unkeyed selector resolves to.
/// - The same child may be attached under several parents (a window is
///   reachable from the root and from its group).
///
/// Interior locking lets the host keep mutating the tree while commands are
/// being dispatched against it.
pub struct InMemoryObject {
    object_type: ObjectType,
    commands: RwLock<BTreeMap<String, CommandHandler>>,
    children: RwLock<Children>,
    current: RwLock<BTreeMap<ObjectType, String>>,
}

impl core::fmt::Debug for InMemoryObject {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("InMemoryObject")
            .field("object_type", &self.object_type)
            .field("commands", &self.commands())
            .finish_non_exhaustive()
    }
}

// Every write is a single map operation, so a poisoned lock still guards
// consistent data.
fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}

impl InMemoryObject {
    pub fn new(object_type: ObjectType) -> Arc<Self> {
        Arc::new(Self {
            object_type,
            commands: RwLock::new(BTreeMap::new()),
            children: RwLock::new(BTreeMap::new()),
            current: RwLock::new(BTreeMap::new()),
        })
    }

    pub fn root() -> Arc<Self> {
        Self::new(ObjectType::Root)
    }

    /// Register (or replace) a command.
    pub fn add_command<F>(&self, name: impl Into<String>, handler: F)
    where
        F: Fn(Args, Kwargs) -> Result<CommandValue, CommandFailure> + Send + Sync + 'static,
    {
        write(&self.commands).insert(name.into(), Arc::new(handler));
    }

    /// Remove a command. Returns whether it was present.
    pub fn remove_command(&self, name: &str) -> bool {
        write(&self.commands).remove(name).is_some()
    }

    /// Attach an existing object as a child.
    ///
    /// Fails with `InvalidPath` when `child`'s category cannot appear below this
    /// object.
    pub fn attach(
        &self,
        key: impl Into<String>,
        child: Arc<InMemoryObject>,
    ) -> CommandResult<Arc<InMemoryObject>> {
        let object_type = child.object_type;
        if !self.object_type.has_child(object_type) {
            return Err(CommandGraphError::invalid_path(format!(
                "{object_type} cannot be attached below {}",
                self.object_type
            )));
        }

        write(&self.children)
            .entry(object_type)
            .or_default()
            .insert(key.into(), Arc::clone(&child));
        Ok(child)
    }

    /// Create a fresh child of `object_type` under `key`.
    pub fn add_child(
        &self,
        object_type: ObjectType,
        key: impl Into<String>,
    ) -> CommandResult<Arc<InMemoryObject>> {
        self.attach(key, Self::new(object_type))
    }

    /// Detach a child. If it was the current one, the category has no current
    /// child afterwards.
    pub fn remove_child(&self, object_type: ObjectType, key: &str) -> Option<Arc<InMemoryObject>> {
        let removed = write(&self.children)
            .get_mut(&object_type)
            .and_then(|by_key| by_key.remove(key));

        if removed.is_some() {
            let mut current = write(&self.current);
            if current.get(&object_type).map(String::as_str) == Some(key) {
                current.remove(&object_type);
            }
        }
        removed
    }

    /// Mark the child `key` as the current `object_type` child.
    pub fn set_current(&self, object_type: ObjectType, key: &str) -> CommandResult<()> {
        if self.child(object_type, key).is_none() {
            return Err(CommandGraphError::object_resolution(format!(
                "{object_type}[{key:?}] is not a child of {}",
                self.object_type
            )));
        }
        write(&self.current).insert(object_type, key.to_string());
        Ok(())
    }

    pub fn clear_current(&self, object_type: ObjectType) {
        write(&self.current).remove(&object_type);
    }

    pub fn child(&self, object_type: ObjectType, key: &str) -> Option<Arc<InMemoryObject>> {
        read(&self.children)
            .get(&object_type)
            .and_then(|by_key| by_key.get(key))
            .cloned()
    }

    fn current_child(&self, object_type: ObjectType) -> Option<Arc<InMemoryObject>> {
        let key = read(&self.current).get(&object_type)?.clone();
        self.child(object_type, &key)
    }
}

impl CommandObject for InMemoryObject {
    fn object_type(&self) -> ObjectType {
        self.object_type
    }

    fn commands(&self) -> Vec<String> {
        read(&self.commands).keys().cloned().collect()
    }

    fn command(&self, name: &str) -> Option<CommandHandler> {
        read(&self.commands).get(name).cloned()
    }

    fn items(&self, object_type: ObjectType) -> Option<Vec<String>> {
        if !self.object_type.has_child(object_type) {
            return None;
        }
        Some(
            read(&self.children)
                .get(&object_type)
                .map(|by_key| by_key.keys().cloned().collect())
                .unwrap_or_default(),
        )
    }

    fn select(&self, object_type: ObjectType, key: Option<&str>) -> Option<Arc<dyn CommandObject>> {
        let child: Arc<dyn CommandObject> = match key {
            Some(key) => self.child(object_type, key)?,
            None => self.current_child(object_type)?,
        };
        Some(child)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn children_follow_category_rules() {
        let root = InMemoryObject::root();
        let group = root.add_child(ObjectType::Group, "1").unwrap();

        assert!(group.add_child(ObjectType::Window, "w1").is_ok());
        let err = group.add_child(ObjectType::Bar, "top").unwrap_err();
        assert!(matches!(err, CommandGraphError::InvalidPath(_)));
    }

    #[test]
    fn items_lists_keys_or_none_for_foreign_categories() {
        let root = InMemoryObject::root();
        root.add_child(ObjectType::Group, "a").unwrap();
        root.add_child(ObjectType::Group, "b").unwrap();

        assert_eq!(
            root.items(ObjectType::Group),
            Some(vec!["a".to_string(), "b".to_string()])
        );
        assert_eq!(root.items(ObjectType::Window), Some(vec![]));
        assert_eq!(root.items(ObjectType::Root), None);
    }

    #[test]
    fn unkeyed_select_uses_current_child() {
        let root = InMemoryObject::root();
        root.add_child(ObjectType::Window, "w1").unwrap();
        assert!(root.select(ObjectType::Window, None).is_none());

        root.set_current(ObjectType::Window, "w1").unwrap();
        assert!(root.select(ObjectType::Window, None).is_some());

        root.remove_child(ObjectType::Window, "w1");
        assert!(root.select(ObjectType::Window, None).is_none());
    }

    #[test]
    fn set_current_requires_existing_child() {
        let root = InMemoryObject::root();
        let err = root.set_current(ObjectType::Screen, "0").unwrap_err();
        assert!(matches!(err, CommandGraphError::ObjectResolution(_)));
    }

    #[test]
    fn tree_stays_usable_after_a_writer_panics() {
        let root = InMemoryObject::root();
        let poisoner = Arc::clone(&root);
        let _ = std::thread::spawn(move || {
            let _commands = poisoner.commands.write().unwrap();
            let _children = poisoner.children.write().unwrap();
            panic!("handler blew up");
        })
        .join();
        assert!(root.commands.is_poisoned());

        root.add_command("status", |_args, _kwargs| Ok(CommandValue::Null));
        assert_eq!(root.commands(), vec!["status".to_string()]);
        root.add_child(ObjectType::Group, "1").unwrap();
        assert_eq!(root.items(ObjectType::Group), Some(vec!["1".to_string()]));
    }

    #[test]
    fn commands_can_be_removed() {
        let obj = InMemoryObject::new(ObjectType::Group);
        obj.add_command("toggle", |_args, _kwargs| Ok(CommandValue::Null));
        assert_eq!(obj.commands(), vec!["toggle".to_string()]);

        assert!(obj.remove_command("toggle"));
        assert!(!obj.remove_command("toggle"));
        assert!(obj.command("toggle").is_none());
    }
}
