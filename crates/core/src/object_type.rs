//! Categories of controllable objects and which categories nest under which.

use core::str::FromStr;
use serde::{Deserialize, Serialize};

use crate::error::CommandGraphError;

/// Kind of a node in the command graph.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectType {
    Root,
    Bar,
    Core,
    Group,
    Layout,
    Screen,
    Widget,
    Window,
}

impl ObjectType {
    /// Every category that may appear below the root.
    pub const SELECTABLE: [ObjectType; 7] = [
        ObjectType::Bar,
        ObjectType::Core,
        ObjectType::Group,
        ObjectType::Layout,
        ObjectType::Screen,
        ObjectType::Widget,
        ObjectType::Window,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ObjectType::Root => "root",
            ObjectType::Bar => "bar",
            ObjectType::Core => "core",
            ObjectType::Group => "group",
            ObjectType::Layout => "layout",
            ObjectType::Screen => "screen",
            ObjectType::Widget => "widget",
            ObjectType::Window => "window",
        }
    }

    /// Categories that can be selected from an object of this type.
    pub fn children(self) -> &'static [ObjectType] {
        use ObjectType::*;
        match self {
            Root => &[Bar, Core, Group, Layout, Screen, Widget, Window],
            Bar => &[Screen, Widget],
            Core => &[],
            Group => &[Layout, Screen, Window],
            Layout => &[Group, Screen, Window],
            Screen => &[Bar, Group, Layout, Widget, Window],
            Widget => &[Bar, Group, Screen],
            Window => &[Group, Layout, Screen],
        }
    }

    pub fn has_child(self, child: ObjectType) -> bool {
        self.children().contains(&child)
    }
}

impl core::fmt::Display for ObjectType {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ObjectType {
    type Err = CommandGraphError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "root" => Ok(ObjectType::Root),
            "bar" => Ok(ObjectType::Bar),
            "core" => Ok(ObjectType::Core),
            "group" => Ok(ObjectType::Group),
            "layout" => Ok(ObjectType::Layout),
            "screen" => Ok(ObjectType::Screen),
            "widget" => Ok(ObjectType::Widget),
            "window" => Ok(ObjectType::Window),
            other => Err(CommandGraphError::invalid_path(format!(
                "unknown object type '{other}'"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tags_parse_back() {
        for t in ObjectType::SELECTABLE {
            assert_eq!(t.as_str().parse::<ObjectType>().unwrap(), t);
        }
        assert_eq!("root".parse::<ObjectType>().unwrap(), ObjectType::Root);
    }

    #[test]
    fn unknown_tag_is_invalid_path() {
        let err = "toolbar".parse::<ObjectType>().unwrap_err();
        assert!(matches!(err, CommandGraphError::InvalidPath(_)));
    }

    #[test]
    fn root_is_never_a_child() {
        for t in ObjectType::SELECTABLE {
            assert!(!t.has_child(ObjectType::Root));
        }
        assert!(ObjectType::Core.children().is_empty());
    }
}
