//! Value types accepted and reported by the bridge's own commands.

use std::collections::BTreeMap;

use bigdecimal::BigDecimal;
use linebridge_schema::{ClassInfo, Composite, bridged_composite, bridged_enum};

/// Whether relayed traffic targets a live or a simulated upstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    /// Real upstream.
    Live,
    /// Simulated upstream.
    #[default]
    Paper,
}

bridged_enum!(Mode { Live, Paper });

impl Mode {
    /// Maps an ordinal back to a mode; unknown ordinals mean [`Mode::Paper`].
    #[must_use]
    pub const fn from_ordinal(ordinal: i32) -> Self {
        match ordinal {
            0 => Self::Live,
            _ => Self::Paper,
        }
    }
}

/// Free-form label attached to a session's settings.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Tag {
    /// Tag name.
    pub name: String,
    /// Tag value.
    pub value: String,
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

/// Per-session settings changed with `configure` and reported by
/// `settings`.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    /// Settings used when these are rejected upstream.
    pub fallback: Option<Box<Settings>>,
    /// Display label.
    pub label: Option<String>,
    /// Named numeric limits.
    pub limits: BTreeMap<String, f64>,
    /// Live or simulated upstream.
    pub mode: Mode,
    /// Requested upstream port.
    pub port: i32,
    /// Suppresses `send` when set.
    pub read_only: bool,
    /// Tags in insertion order.
    pub tags: Vec<Tag>,
    /// Price threshold with exact decimal precision.
    pub threshold: Option<BigDecimal>,
    /// Optional request timeout.
    pub timeout_ms: Option<i64>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            fallback: None,
            label: None,
            limits: BTreeMap::new(),
            mode: Mode::Paper,
            port: 7496,
            read_only: false,
            tags: Vec::new(),
            threshold: None,
            timeout_ms: None,
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
                "label",
                |settings: &Self| settings.label.clone(),
                |settings: &mut Self, label| settings.label = label,
            )
            .property(
                "limits",
                |settings: &Self| settings.limits.clone(),
                |settings: &mut Self, limits| settings.limits = limits,
            )
            // Stored as an ordinal upstream; read back as the literal.
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
                "threshold",
                |settings: &Self| settings.threshold.clone(),
                |settings: &mut Self, threshold| settings.threshold = threshold,
            )
            .property(
                "timeoutMs",
                |settings: &Self| settings.timeout_ms,
                |settings: &mut Self, timeout| settings.timeout_ms = timeout,
            )
    }
}

bridged_composite!(Settings);
