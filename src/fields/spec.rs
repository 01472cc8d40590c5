//! Fieldspec: declarative description of known fields and groups
//!
//! ```toml
//! [state]
//! start = true
//!
//! [groups.power]
//! key = "p"
//! state = true
//! order = 1
//!
//! [fields.volts]
//! key = "auto"
//! groups = ["power"]
//! ch = "v"
//! fg24 = [255, 200, 0]
//! ```
//!
//! The raw TOML is validated once into typed records; nothing downstream
//! looks at key strings again.

use super::FieldColor;
use crate::config::ConfigError;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use unicode_width::UnicodeWidthChar;

/// How a field or group gets its shortcut
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ShortcutSpec {
    /// Picked by the assignment engine
    #[default]
    Auto,
    /// Fixed by the fieldspec
    Fixed(char),
    /// No shortcut at all
    Disabled,
}

impl ShortcutSpec {
    fn parse(owner: &str, raw: Option<&str>) -> Result<Self, ConfigError> {
        let Some(raw) = raw else {
            return Ok(Self::Auto);
        };
        if raw.eq_ignore_ascii_case("auto") {
            return Ok(Self::Auto);
        }
        if raw.is_empty() || raw.eq_ignore_ascii_case("none") {
            return Ok(Self::Disabled);
        }
        let mut chars = raw.chars();
        match (chars.next(), chars.next()) {
            (Some(ch), None) if ch.is_ascii_graphic() => Ok(Self::Fixed(ch)),
            _ => Err(ConfigError::invalid(
                owner,
                format!("key {raw:?} must be \"auto\", \"none\" or one printable character"),
            )),
        }
    }
}

/// Validated group entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupSpec {
    pub name: String,
    pub key: ShortcutSpec,
    /// Enabled state at load
    pub state: bool,
    pub order: Option<i64>,
}

/// Validated field entry
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDef {
    pub name: String,
    pub key: ShortcutSpec,
    pub groups: Vec<String>,
    pub hidden: bool,
    pub glyph: Option<char>,
    pub color: Option<FieldColor>,
    /// Overrides the global start state when set
    pub state: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawSpec {
    #[serde(default)]
    state: RawState,
    #[serde(default)]
    groups: BTreeMap<String, RawGroup>,
    #[serde(default)]
    fields: BTreeMap<String, RawField>,
}

#[derive(Debug, Default, Deserialize)]
struct RawState {
    start: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
struct RawGroup {
    key: Option<String>,
    state: Option<bool>,
    order: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
struct RawField {
    key: Option<String>,
    #[serde(default)]
    groups: Vec<String>,
    #[serde(default)]
    hidden: bool,
    ch: Option<String>,
    fg: Option<u8>,
    fg24: Option<[u8; 3]>,
    state: Option<bool>,
}

/// The loaded fieldspec
#[derive(Debug, Clone, PartialEq)]
pub struct FieldSpec {
    /// File it came from; identifies the spec for persisted state
    pub path: Option<PathBuf>,
    /// Global default enabled state
    pub start: bool,
    /// Groups sorted by name
    pub groups: Vec<GroupSpec>,
    pub fields: BTreeMap<String, FieldDef>,
}

impl Default for FieldSpec {
    fn default() -> Self {
        Self::empty()
    }
}

impl FieldSpec {
    /// No declared fields or groups; everything starts enabled
    pub fn empty() -> Self {
        Self {
            path: None,
            start: true,
            groups: Vec::new(),
            fields: BTreeMap::new(),
        }
    }

    /// Load and validate a fieldspec file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path)?;
        let mut spec = Self::from_toml(&contents)?;
        spec.path = Some(path.to_path_buf());
        Ok(spec)
    }

    /// Parse and validate fieldspec text
    pub fn from_toml(contents: &str) -> Result<Self, ConfigError> {
        let raw: RawSpec = toml::from_str(contents)?;

        let mut groups = Vec::with_capacity(raw.groups.len());
        for (name, group) in &raw.groups {
            groups.push(GroupSpec {
                name: name.clone(),
                key: ShortcutSpec::parse(name, group.key.as_deref())?,
                state: group.state.unwrap_or(true),
                order: group.order,
            });
        }

        let mut fields = BTreeMap::new();
        for (name, field) in raw.fields {
            if let Some(unknown) = field
                .groups
                .iter()
                .find(|g| !raw.groups.contains_key(g.as_str()))
            {
                return Err(ConfigError::invalid(
                    &name,
                    format!("unknown group {unknown:?}"),
                ));
            }

            let glyph = match field.ch.as_deref() {
                None => None,
                Some(ch) => {
                    let mut chars = ch.chars();
                    match (chars.next(), chars.next()) {
                        (Some(c), None) if c.width() == Some(1) => Some(c),
                        _ => {
                            return Err(ConfigError::invalid(
                                &name,
                                format!("ch {ch:?} must be a single character one cell wide"),
                            ))
                        }
                    }
                }
            };

            let color = match (field.fg24, field.fg) {
                (Some([r, g, b]), _) => Some(FieldColor::Rgb(r, g, b)),
                (None, Some(idx)) => Some(FieldColor::Palette(idx)),
                (None, None) => None,
            };

            let def = FieldDef {
                name: name.clone(),
                key: ShortcutSpec::parse(&name, field.key.as_deref())?,
                groups: field.groups,
                hidden: field.hidden,
                glyph,
                color,
                state: field.state,
            };
            fields.insert(name, def);
        }

        Ok(Self {
            path: None,
            start: raw.state.start.unwrap_or(true),
            groups,
            fields,
        })
    }

    pub fn field(&self, name: &str) -> Option<&FieldDef> {
        self.fields.get(name)
    }

    pub fn group(&self, name: &str) -> Option<&GroupSpec> {
        self.groups.iter().find(|g| g.name == name)
    }

    /// Shortcut rule for a field; undeclared fields are auto-assigned
    pub fn field_key(&self, name: &str) -> ShortcutSpec {
        self.field(name).map(|f| f.key).unwrap_or_default()
    }

    /// Enabled state a field starts with before group resolution
    pub fn initial_state(&self, name: &str) -> bool {
        self.field(name).and_then(|f| f.state).unwrap_or(self.start)
    }
}
