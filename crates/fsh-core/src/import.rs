//! Top-level entry point: raw source text in, typed document IRs and
//! diagnostics out (spec §5, §6).

use crate::config::ImportConfig;
use crate::defs::DefinitionProvider;
use crate::diagnostic::{Diagnostic, DiagnosticSink, VecSink};
use crate::ir::DocumentIr;
use crate::parser::parse_document;
use crate::preprocessor::{self, ParsedDocument};
use crate::resolver::Resolver;
use crate::visitor::visit_document;

/// One source document handed to [`import`]: its originating path (if any)
/// and its raw text.
#[derive(Debug, Clone)]
pub struct RawInput {
    pub path: Option<String>,
    pub content: String,
}

impl RawInput {
    #[must_use]
    pub fn new(path: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            path: Some(path.into()),
            content: content.into(),
        }
    }
}

/// Run the full two-pass import over a batch of raw documents: parse, then
/// preprocess (build the shared symbol table), then visit (build the typed
/// IR). Never panics on malformed input — every failure becomes a
/// [`Diagnostic`] attached to the returned list.
#[tracing::instrument(skip_all, fields(documents = raw_inputs.len(), canonical = %config.canonical))]
pub fn import(raw_inputs: &[RawInput], config: &ImportConfig, defs: &dyn DefinitionProvider) -> (Vec<DocumentIr>, Vec<Diagnostic>) {
    let mut sink = VecSink::default();

    let parsed: Vec<ParsedDocument<'_>> = raw_inputs
        .iter()
        .filter_map(|input| {
            let pairs = parse_document(&input.content, input.path.as_deref(), &mut sink.0)?;
            Some(ParsedDocument { file: input.path.clone(), pairs })
        })
        .collect();

    let table = preprocessor::run(&parsed, config.canonical_trimmed(), &mut sink);
    let resolver = Resolver::new(&table, defs);

    let documents = parsed
        .into_iter()
        .map(|doc| visit_document(doc.pairs, doc.file, &resolver, &mut sink))
        .collect();

    (documents, sink.0)
}
