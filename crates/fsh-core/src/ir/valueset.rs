//! Value-set component types (spec §3, §4.5bis).

use serde::{Deserialize, Serialize};

use super::value::Code;

/// The `from` clause shared by both component kinds: an optional code
/// system and/or a list of value sets narrowing where codes are drawn from.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FromSpec {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub value_sets: Vec<String>,
}

impl FromSpec {
    /// Sorted value sets, used as part of the merge key (spec I5).
    #[must_use]
    pub fn sorted_value_sets(&self) -> Vec<String> {
        let mut vs = self.value_sets.clone();
        vs.sort();
        vs
    }
}

/// A value-set component: either an enumerated concept list or a filter
/// expression, included or excluded (spec §3 `ValueSetComponent`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "componentType", rename_all = "camelCase")]
pub enum ValueSetComponent {
    Concept(ConceptComponent),
    Filter(FilterComponent),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConceptComponent {
    pub inclusion: bool,
    #[serde(default)]
    pub from: FromSpec,
    pub concepts: Vec<Code>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterComponent {
    pub inclusion: bool,
    #[serde(default)]
    pub from: FromSpec,
    pub filters: Vec<VsFilter>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VsFilter {
    pub property: String,
    pub operator: VsOperator,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<VsFilterValue>,
}

/// Closed set of filter operators (spec §3 `VsOperator`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum VsOperator {
    #[serde(rename = "=")]
    Equals,
    IsA,
    DescendentOf,
    IsNotA,
    Regex,
    In,
    NotIn,
    Generalizes,
    Exists,
}

impl VsOperator {
    /// Parse an operator token, normalising to lowercase and folding the
    /// British spelling `descendant` to `descendent` (spec §4.5bis).
    #[must_use]
    pub fn parse(token: &str) -> Option<Self> {
        let normalized = token.to_lowercase().replace("descendant", "descendent");
        match normalized.as_str() {
            "=" => Some(Self::Equals),
            "is-a" => Some(Self::IsA),
            "descendent-of" => Some(Self::DescendentOf),
            "is-not-a" => Some(Self::IsNotA),
            "regex" => Some(Self::Regex),
            "in" => Some(Self::In),
            "not-in" => Some(Self::NotIn),
            "generalizes" => Some(Self::Generalizes),
            "exists" => Some(Self::Exists),
            _ => None,
        }
    }

    /// Whether this operator requires a value (only `exists` does not).
    #[must_use]
    pub fn requires_value(&self) -> bool {
        !matches!(self, Self::Exists)
    }
}

/// The typed value carried by a filter expression.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "valueType", rename_all = "camelCase")]
pub enum VsFilterValue {
    String(String),
    Code(Code),
    Regex(String),
    Boolean(bool),
}

impl VsFilterValue {
    /// Whether this value's runtime kind matches what `operator` requires
    /// (spec §4.5bis table).
    #[must_use]
    pub fn matches_operator(&self, operator: VsOperator) -> bool {
        match operator {
            VsOperator::Equals | VsOperator::In | VsOperator::NotIn => matches!(self, Self::String(_)),
            VsOperator::IsA | VsOperator::DescendentOf | VsOperator::IsNotA | VsOperator::Generalizes => {
                matches!(self, Self::Code(_))
            }
            VsOperator::Regex => matches!(self, Self::Regex(_)),
            VsOperator::Exists => matches!(self, Self::Boolean(_)),
        }
    }
}
