//! Typed intermediate representation produced by the second pass (spec §3).

pub mod document;
pub mod rule;
pub mod value;
pub mod valueset;

pub use document::{DocumentIr, EntityKind, Instance, SourceInfo, StructureDef, ValueSet};
pub use rule::{
    BindingStrength, CardRule, CaretValueRule, ContainsRule, FixedValueRule, FlagRule, OnlyRule, OnlyType, Rule,
    ValueSetRule,
};
pub use value::{Code, LiteralValue, Quantity, Ratio, Reference, UCUM_SYSTEM};
pub use valueset::{ConceptComponent, FilterComponent, FromSpec, VsFilter, VsFilterValue, VsOperator, ValueSetComponent};
