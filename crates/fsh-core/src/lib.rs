//! Importer core for the FHIR Shorthand-style authoring DSL: grammar-driven
//! lexer/parser, symbol preprocessor, name resolver, and the visitor that
//! turns a parse tree into a typed, location-annotated intermediate
//! representation.
//!
//! [`import`] is the single public entry point: hand it raw source text, an
//! [`ImportConfig`], and a [`DefinitionProvider`], and it returns document
//! IRs plus structured diagnostics. Nothing here writes files, reads a
//! package manifest, configures a logging backend, or emits a downstream
//! artifact format — those all live above this crate.

pub mod config;
pub mod defs;
pub mod diagnostic;
pub mod error;
pub mod import;
pub mod ir;
pub mod location;
pub mod parser;
pub mod preprocessor;
pub mod resolver;
pub mod string_lit;
pub mod visitor;

pub use config::ImportConfig;
pub use defs::{DefRecord, DefinitionProvider, EmptyDefinitionProvider};
pub use diagnostic::{Diagnostic, DiagnosticSink, Severity, TracingSink, VecSink};
pub use error::{CoreError, CoreResult};
pub use import::{import, RawInput};
pub use ir::{DocumentIr, EntityKind};
pub use location::TextLocation;
pub use parser::Rule;
