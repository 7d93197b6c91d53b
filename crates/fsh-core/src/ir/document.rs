//! Document-level IR: entities and the document that holds them (spec §3).

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::location::TextLocation;

use super::rule::{FixedValueRule, Rule};
use super::valueset::ValueSetComponent;

/// `{file, location}` carried by every produced entity (spec I2).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    pub location: TextLocation,
}

/// The kind of a declared or referenced entity, used both as a preprocessor
/// table partition key and as a resolver lookup-order element (spec §4.2,
/// §4.3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EntityKind {
    Alias,
    Profile,
    Extension,
    ValueSet,
    CodeSystem,
    Instance,
    /// Not a declarable kind; only ever consulted against the external
    /// definition provider (spec §4.3 step 3, `findResource`).
    Resource,
    /// Not a declarable kind; only ever consulted against the external
    /// definition provider (spec §4.3 step 3, `findType`).
    Type,
}

/// Shared shape of `Profile` and `Extension` (spec §3 `StructureDef`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StructureDef {
    pub name: String,
    pub id: String,
    pub parent: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub rules: Vec<Rule>,
    pub source_info: SourceInfo,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Instance {
    pub name: String,
    pub instance_of: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub rules: Vec<FixedValueRule>,
    pub source_info: SourceInfo,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValueSet {
    pub name: String,
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub components: Vec<ValueSetComponent>,
    pub source_info: SourceInfo,
}

/// One document's worth of entities (spec §3 `Document IR`), keyed by kind
/// and then by insertion-ordered name.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DocumentIr {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    /// Local name -> URL, in declaration order.
    #[serde(skip_serializing_if = "IndexMap::is_empty", default)]
    pub aliases: IndexMap<String, String>,
    #[serde(skip_serializing_if = "IndexMap::is_empty", default)]
    pub profiles: IndexMap<String, StructureDef>,
    #[serde(skip_serializing_if = "IndexMap::is_empty", default)]
    pub extensions: IndexMap<String, StructureDef>,
    #[serde(skip_serializing_if = "IndexMap::is_empty", default)]
    pub instances: IndexMap<String, Instance>,
    #[serde(skip_serializing_if = "IndexMap::is_empty", default)]
    pub value_sets: IndexMap<String, ValueSet>,
}

impl DocumentIr {
    #[must_use]
    pub fn new(path: Option<String>) -> Self {
        Self {
            path,
            ..Default::default()
        }
    }
}
