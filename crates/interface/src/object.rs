//! Registry boundary: the live objects a direct interface resolves calls on.
//!
//! The host application exposes its controllable entities by implementing
//! [`CommandObject`]. Resolution walks the node path one selector at a time via
//! [`CommandObject::select`], starting at the root object.

use std::sync::Arc;

use cmdgraph_core::{
    Args, CommandFailure, CommandGraphError, CommandResult, CommandValue, Kwargs, ObjectType,
    Selector,
};

/// A command bound to a live object.
pub type CommandHandler =
    Arc<dyn Fn(Args, Kwargs) -> Result<CommandValue, CommandFailure> + Send + Sync>;

/// Introspection commands every object answers, independent of what it
/// registers itself.
pub const BUILTIN_COMMANDS: [&str; 2] = ["commands", "items"];

/// A controllable entity in the host application.
pub trait CommandObject: Send + Sync {
    fn object_type(&self) -> ObjectType;

    /// Names of the commands this object offers right now (built-ins excluded).
    fn commands(&self) -> Vec<String>;

    /// Look up a command as a capability bound to this object.
    fn command(&self, name: &str) -> Option<CommandHandler>;

    /// Keys of the `object_type` children of this object.
    ///
    /// `None` when `object_type` is not a child category of this object.
    fn items(&self, object_type: ObjectType) -> Option<Vec<String>>;

    /// Select a child. A `None` key selects the current instance of the
    /// category, if there is one.
    fn select(&self, object_type: ObjectType, key: Option<&str>) -> Option<Arc<dyn CommandObject>>;
}

/// Walk `path` down from `root` to a live object.
///
/// Fails with `ObjectResolution` naming the first selector that did not
/// resolve. Every call is a fresh walk; nothing is memoized.
pub fn resolve(
    root: &Arc<dyn CommandObject>,
    path: &[Selector],
) -> CommandResult<Arc<dyn CommandObject>> {
    let mut current = Arc::clone(root);
    for (depth, sel) in path.iter().enumerate() {
        let next = current
            .select(sel.object_type, sel.key.as_deref())
            .ok_or_else(|| {
                let walked = path[..=depth]
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join(".");
                CommandGraphError::object_resolution(format!("root.{walked}"))
            })?;
        current = next;
    }
    Ok(current)
}

/// Command names an object answers, built-ins included.
pub fn command_names(object: &Arc<dyn CommandObject>) -> Vec<String> {
    let mut names = object.commands();
    for builtin in BUILTIN_COMMANDS {
        if !names.iter().any(|n| n == builtin) {
            names.push(builtin.to_string());
        }
    }
    names.sort();
    names
}

/// Look up `name` on `object`, falling back to the built-in introspection
/// commands. Commands registered by the object shadow built-ins.
pub fn bound_command(object: &Arc<dyn CommandObject>, name: &str) -> Option<CommandHandler> {
    if let Some(handler) = object.command(name) {
        return Some(handler);
    }

    match name {
        "commands" => {
            let target = Arc::clone(object);
            let handler: CommandHandler = Arc::new(move |_args: Args, _kwargs: Kwargs| {
                Ok::<_, CommandFailure>(CommandValue::from(command_names(&target)))
            });
            Some(handler)
        }
        "items" => {
            let target = Arc::clone(object);
            let handler: CommandHandler =
                Arc::new(move |args: Args, _kwargs: Kwargs| builtin_items(&target, &args));
            Some(handler)
        }
        _ => None,
    }
}

fn builtin_items(object: &Arc<dyn CommandObject>, args: &Args) -> Result<CommandValue, CommandFailure> {
    let tag = args
        .first()
        .and_then(CommandValue::as_str)
        .ok_or_else(|| CommandFailure::new("items expects an object type name").with_origin("argument"))?;

    let object_type: ObjectType = tag
        .parse()
        .map_err(|e: CommandGraphError| CommandFailure::new(e.message()).with_origin("invalid_path"))?;

    object
        .items(object_type)
        .map(CommandValue::from)
        .ok_or_else(|| {
            CommandFailure::new(format!(
                "{object_type} is not a child of {}",
                object.object_type()
            ))
            .with_origin("invalid_path")
        })
}
