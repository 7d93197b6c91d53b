//! Rule types (spec §3 `Rule`, §4.5).

use serde::{Deserialize, Serialize};

use crate::location::TextLocation;

use super::value::LiteralValue;

/// A single statement attached to an entity, refining one of its paths.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "ruleType", rename_all = "camelCase")]
pub enum Rule {
    Card(CardRule),
    Flag(FlagRule),
    ValueSet(ValueSetRule),
    FixedValue(FixedValueRule),
    Only(OnlyRule),
    Contains(ContainsRule),
    CaretValue(CaretValueRule),
}

impl Rule {
    #[must_use]
    pub fn location(&self) -> TextLocation {
        match self {
            Rule::Card(r) => r.location,
            Rule::Flag(r) => r.location,
            Rule::ValueSet(r) => r.location,
            Rule::FixedValue(r) => r.location,
            Rule::Only(r) => r.location,
            Rule::Contains(r) => r.location,
            Rule::CaretValue(r) => r.location,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CardRule {
    pub path: String,
    pub min: i64,
    /// The upper bound, as the literal string written (`*` is valid).
    pub max: String,
    pub location: TextLocation,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FlagRule {
    pub path: String,
    #[serde(default)]
    pub must_support: bool,
    #[serde(default)]
    pub summary: bool,
    #[serde(default)]
    pub modifier: bool,
    pub location: TextLocation,
}

/// Binding strength (spec §3 `strength`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BindingStrength {
    Example,
    Preferred,
    Extensible,
    Required,
}

impl Default for BindingStrength {
    fn default() -> Self {
        Self::Required
    }
}

impl BindingStrength {
    #[must_use]
    pub fn parse(token: &str) -> Option<Self> {
        match token {
            "example" => Some(Self::Example),
            "preferred" => Some(Self::Preferred),
            "extensible" => Some(Self::Extensible),
            "required" => Some(Self::Required),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValueSetRule {
    pub path: String,
    pub value_set: String,
    pub strength: BindingStrength,
    pub location: TextLocation,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FixedValueRule {
    pub path: String,
    pub value: LiteralValue,
    pub location: TextLocation,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OnlyType {
    #[serde(rename = "type")]
    pub type_url: String,
    pub is_reference: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OnlyRule {
    pub path: String,
    pub types: Vec<OnlyType>,
    pub location: TextLocation,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContainsRule {
    pub path: String,
    pub items: Vec<String>,
    pub location: TextLocation,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaretValueRule {
    /// Defaults to the empty string when no path precedes the caret path.
    pub path: String,
    pub caret_path: String,
    pub value: LiteralValue,
    pub location: TextLocation,
}
