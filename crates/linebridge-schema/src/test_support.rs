//! Bridged fixture types shared by unit tests.

use std::collections::BTreeMap;

use crate::{ClassInfo, Composite, Reflect, TypeInfo, bridged_composite, bridged_enum};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub(crate) enum Mode {
    Live,
    #[default]
    Paper,
}

bridged_enum!(Mode { Live, Paper });

impl Mode {
    fn from_ordinal(ordinal: i32) -> Self {
        if ordinal == 0 { Self::Live } else { Self::Paper }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub(crate) struct Tag {
    pub(crate) name: String,
    pub(crate) value: String,
}

impl Composite for Tag {
    fn class() -> ClassInfo {
        ClassInfo::new("Tag")
            .constructor(Self::default)
            .property("name", |tag: &Self| tag.name.clone(), |tag: &mut Self, name| tag.name = name)
            .property("value", |tag: &Self| tag.value.clone(), |tag: &mut Self, value| {
                tag.value = value;
            })
    }
}

bridged_composite!(Tag);

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Settings {
    pub(crate) fallback: Option<Box<Settings>>,
    pub(crate) limits: BTreeMap<String, f64>,
    pub(crate) mode: Mode,
    pub(crate) port: i32,
    pub(crate) read_only: bool,
    pub(crate) tags: Vec<Tag>,
    pub(crate) timeout_ms: Option<i64>,
    pub(crate) label: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            fallback: None,
            limits: BTreeMap::new(),
            mode: Mode::Paper,
            port: 7496,
            read_only: false,
            tags: Vec::new(),
            timeout_ms: None,
            label: String::new(),
        }
    }
}

impl Composite for Settings {
    fn class() -> ClassInfo {
        ClassInfo::new("Settings")
            .constructor(Self::default)
            .property(
                "fallback",
                |settings: &Self| settings.fallback.clone(),
                |settings: &mut Self, fallback| settings.fallback = fallback,
            )
            .property(
                "limits",
                |settings: &Self| settings.limits.clone(),
                |settings: &mut Self, limits| settings.limits = limits,
            )
            .accessor("mode", |settings: &Self| settings.mode)
            .mutator("mode", |settings: &mut Self, ordinal: i32| {
                settings.mode = Mode::from_ordinal(ordinal);
            })
            .property("port", |settings: &Self| settings.port, |settings: &mut Self, port| {
                settings.port = port;
            })
            .property(
                "readOnly",
                |settings: &Self| settings.read_only,
                |settings: &mut Self, read_only| settings.read_only = read_only,
            )
            .property(
                "tags",
                |settings: &Self| settings.tags.clone(),
                |settings: &mut Self, tags| settings.tags = tags,
            )
            .property(
                "timeoutMs",
                |settings: &Self| settings.timeout_ms,
                |settings: &mut Self, timeout| settings.timeout_ms = timeout,
            )
            .accessor("revision", |_: &Self| 3_i64)
            .accessor("label", |settings: &Self| settings.label.clone())
            .mutator("label", |settings: &mut Self, width: i32| {
                settings.label = width.to_string();
            })
    }
}

bridged_composite!(Settings);

#[derive(Debug, Clone, PartialEq, Default)]
pub(crate) struct Node {
    pub(crate) name: String,
    pub(crate) next: Option<Box<Node>>,
    pub(crate) children: Vec<Node>,
}

impl Composite for Node {
    fn class() -> ClassInfo {
        ClassInfo::new("Node")
            .constructor(Self::default)
            .property("name", |node: &Self| node.name.clone(), |node: &mut Self, name| node.name = name)
            .property("next", |node: &Self| node.next.clone(), |node: &mut Self, next| node.next = next)
            .property(
                "children",
                |node: &Self| node.children.clone(),
                |node: &mut Self, children| node.children = children,
            )
    }
}

bridged_composite!(Node);

/// Composite without a default constructor.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Detached {
    pub(crate) name: String,
}

impl Reflect for Detached {
    fn type_info() -> TypeInfo {
        TypeInfo::Class(ClassInfo::new("Detached").property(
            "name",
            |detached: &Self| detached.name.clone(),
            |detached: &mut Self, name| detached.name = name,
        ))
    }
}

pub(crate) struct Unbridgeable;

impl Reflect for Unbridgeable {
    fn type_info() -> TypeInfo {
        TypeInfo::Unsupported("Unbridgeable")
    }
}
