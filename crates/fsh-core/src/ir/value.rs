//! Literal value types (spec §3 `LiteralValue`).

use serde::{Deserialize, Serialize};

/// A code, resolved against the preprocessor/provider when it carries a
/// system (spec §4.5 "Code literal").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Code {
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display: Option<String>,
}

/// A quantity: a decimal value plus a UCUM unit (spec §4.5 "Quantity literal").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quantity {
    pub value: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<Code>,
}

pub const UCUM_SYSTEM: &str = "http://unitsofmeasure.org";

/// A ratio of two quantities (spec §4.5 "Ratio literal").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ratio {
    pub numerator: Quantity,
    pub denominator: Quantity,
}

/// A reference to another locally- or externally-defined artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reference {
    pub reference: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display: Option<String>,
}

/// Tagged union of every literal kind the grammar can produce (spec §3).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum LiteralValue {
    String(String),
    MultilineString(String),
    Number(f64),
    DateTime(String),
    Time(String),
    Boolean(bool),
    Code(Code),
    Quantity(Quantity),
    Ratio(Ratio),
    Reference(Reference),
}
