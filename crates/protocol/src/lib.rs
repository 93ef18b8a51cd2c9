//! Serializable shapes shared between the compilation-database core and the
//! tools that turn grouped results into packaging manifests.
//!
//! Nothing here performs I/O. A serializer for a concrete manifest format
//! consumes a [`LayerManifest`] and is free to rename or reshape fields.

use anyhow::Result;
use serde::de::{self, Deserializer, MapAccess, Visitor};
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};
use std::fmt;

pub mod path_filters;

pub const MANIFEST_SCHEMA_VERSION: u32 = 1;

/// A preprocessor define as manifests expect it: either a bare name or a
/// single-entry `{"NAME": "VALUE"}` map.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum DefineValue {
    Bare(String),
    Valued { name: String, value: String },
}

impl DefineValue {
    /// Split a `NAME=VALUE` token on the first `=`.
    pub fn parse(raw: &str) -> Self {
        match raw.split_once('=') {
            Some((name, value)) => Self::Valued {
                name: name.to_string(),
                value: value.to_string(),
            },
            None => Self::Bare(raw.to_string()),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Self::Bare(name) => name,
            Self::Valued { name, .. } => name,
        }
    }
}

impl fmt::Display for DefineValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bare(name) => write!(f, "{name}"),
            Self::Valued { name, value } => write!(f, "{name}={value}"),
        }
    }
}

impl Serialize for DefineValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Self::Bare(name) => serializer.serialize_str(name),
            Self::Valued { name, value } => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry(name, value)?;
                map.end()
            }
        }
    }
}

impl<'de> Deserialize<'de> for DefineValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        struct DefineVisitor;

        impl<'de> Visitor<'de> for DefineVisitor {
            type Value = DefineValue;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a define name or a single-entry {name: value} map")
            }

            fn visit_str<E: de::Error>(self, v: &str) -> std::result::Result<DefineValue, E> {
                Ok(DefineValue::Bare(v.to_string()))
            }

            fn visit_map<A: MapAccess<'de>>(
                self,
                mut map: A,
            ) -> std::result::Result<DefineValue, A::Error> {
                let Some((name, value)) = map.next_entry::<String, serde_json::Value>()? else {
                    return Err(de::Error::custom("empty define map"));
                };
                if map.next_key::<String>()?.is_some() {
                    return Err(de::Error::custom("define map must have exactly one entry"));
                }
                let value = match value {
                    serde_json::Value::String(s) => s,
                    other => other.to_string(),
                };
                Ok(DefineValue::Valued { name, value })
            }
        }

        deserializer.deserialize_any(DefineVisitor)
    }
}

/// One source file of a group, relative to the layer root.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct EntryRef {
    pub relative_path: String,
}

/// Includes, defines and flags promoted to one scope.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq, Eq)]
pub struct ScopeFlags {
    #[serde(default)]
    pub includes: Vec<String>,
    #[serde(default)]
    pub defines: Vec<DefineValue>,
    #[serde(default)]
    pub compiler_flags: Vec<String>,
}

impl ScopeFlags {
    pub fn is_empty(&self) -> bool {
        self.includes.is_empty() && self.defines.is_empty() && self.compiler_flags.is_empty()
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct GroupManifest {
    pub name: String,
    pub entries: Vec<EntryRef>,
    #[serde(flatten)]
    pub flags: ScopeFlags,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct LayerManifest {
    pub schema_version: u32,
    pub name: String,
    pub description: String,
    pub root: String,
    pub globals: ScopeFlags,
    pub groups: Vec<GroupManifest>,
}

pub fn serialize_json<T: Serialize>(value: &T) -> Result<String> {
    serde_json::to_string(value).map_err(Into::into)
}

pub fn serialize_json_pretty<T: Serialize>(value: &T) -> Result<String> {
    serde_json::to_string_pretty(value).map_err(Into::into)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn define_parse_splits_on_first_equals() {
        assert_eq!(DefineValue::parse("NDEBUG"), DefineValue::Bare("NDEBUG".into()));
        assert_eq!(
            DefineValue::parse("A=B=C"),
            DefineValue::Valued {
                name: "A".into(),
                value: "B=C".into()
            }
        );
        assert_eq!(DefineValue::parse("EMPTY=").to_string(), "EMPTY=");
    }

    #[test]
    fn define_serializes_as_string_or_single_entry_map() {
        let defines = vec![DefineValue::parse("NDEBUG"), DefineValue::parse("LEVEL=2")];
        let json = serialize_json(&defines).unwrap();
        assert_eq!(json, r#"["NDEBUG",{"LEVEL":"2"}]"#);

        let back: Vec<DefineValue> = serde_json::from_str(&json).unwrap();
        assert_eq!(back, defines);
    }

    #[test]
    fn define_rejects_multi_entry_map() {
        let err = serde_json::from_str::<DefineValue>(r#"{"A":"1","B":"2"}"#);
        assert!(err.is_err());
    }

    #[test]
    fn group_manifest_flattens_scope_flags() {
        let group = GroupManifest {
            name: "Runtime".into(),
            entries: vec![EntryRef {
                relative_path: "runtime/a.c".into(),
            }],
            flags: ScopeFlags {
                includes: vec!["inc".into()],
                defines: vec![DefineValue::parse("X=1")],
                compiler_flags: vec!["-O2".into()],
            },
        };
        let value: serde_json::Value = serde_json::to_value(&group).unwrap();
        assert_eq!(value["name"], "Runtime");
        assert_eq!(value["entries"][0]["relative_path"], "runtime/a.c");
        assert_eq!(value["includes"][0], "inc");
        assert_eq!(value["defines"][0]["X"], "1");
        assert_eq!(value["compiler_flags"][0], "-O2");
    }
}
