//! Pass 1: scan every declared entity across all documents and build the
//! shared name/id -> URL symbol table the resolver consults (spec §4.2).

use std::collections::HashMap;

use pest::iterators::{Pair, Pairs};

use crate::diagnostic::{Diagnostic, DiagnosticSink};
use crate::ir::EntityKind;
use crate::location::location_from_pair;
use crate::parser::Rule;

/// Name/id -> URL table, partitioned by kind, plus a global cross-kind table
/// for the unconstrained lookup (spec §4.3 step 1, §9).
#[derive(Debug, Default)]
pub struct SymbolTable {
    per_kind: HashMap<EntityKind, HashMap<String, String>>,
    global: HashMap<String, String>,
}

impl SymbolTable {
    #[must_use]
    pub fn get(&self, kind: EntityKind, symbol: &str) -> Option<&str> {
        self.per_kind.get(&kind).and_then(|m| m.get(symbol)).map(String::as_str)
    }

    #[must_use]
    pub fn get_global(&self, symbol: &str) -> Option<&str> {
        self.global.get(symbol).map(String::as_str)
    }

    /// Register `symbol -> url` under `kind` and in the global table.
    /// Conflicting re-registration (same key, different URL) logs an error
    /// diagnostic and keeps the first registration (spec §4.2, §7, §9).
    fn register(
        &mut self,
        kind: EntityKind,
        symbol: String,
        url: String,
        file: Option<&str>,
        location: crate::location::TextLocation,
        diagnostics: &mut dyn DiagnosticSink,
    ) {
        let kind_map = self.per_kind.entry(kind).or_default();
        match kind_map.get(&symbol) {
            Some(existing) if existing != &url => {
                diagnostics.push(Diagnostic::error(
                    format!(
                        "'{symbol}' is already registered as {kind:?} with URL '{existing}'; ignoring conflicting URL '{url}'"
                    ),
                    file,
                    Some(location),
                ));
            }
            Some(_) => {}
            None => {
                kind_map.insert(symbol.clone(), url.clone());
            }
        }

        match self.global.get(&symbol) {
            Some(existing) if existing != &url => {
                diagnostics.push(Diagnostic::error(
                    format!("'{symbol}' is already registered globally with URL '{existing}'; ignoring conflicting URL '{url}'"),
                    file,
                    Some(location),
                ));
            }
            Some(_) => {}
            None => {
                self.global.insert(symbol, url);
            }
        }
    }
}

/// One parsed document handed to the preprocessor: its originating path and
/// the `doc` pair produced by the parser.
pub struct ParsedDocument<'a> {
    pub file: Option<String>,
    pub pairs: Pairs<'a, Rule>,
}

/// Walk every parse tree and populate a fresh [`SymbolTable`] (spec §4.2).
#[tracing::instrument(skip_all, fields(documents = documents.len()))]
pub fn run(documents: &[ParsedDocument<'_>], canonical: &str, diagnostics: &mut dyn DiagnosticSink) -> SymbolTable {
    let mut table = SymbolTable::default();
    let canonical = canonical.trim_end_matches('/');

    for doc in documents {
        let file = doc.file.as_deref();
        for entity in doc.pairs.clone() {
            if entity.as_rule() != Rule::entity {
                continue;
            }
            let Some(inner) = entity.into_inner().next() else {
                continue;
            };
            match inner.as_rule() {
                Rule::alias => register_alias(inner, file, &mut table, diagnostics),
                Rule::profile => register_structure_def(inner, EntityKind::Profile, "StructureDefinition", canonical, file, &mut table, diagnostics),
                Rule::extension => register_structure_def(inner, EntityKind::Extension, "StructureDefinition", canonical, file, &mut table, diagnostics),
                Rule::value_set => register_value_set(inner, canonical, file, &mut table, diagnostics),
                // Instance is never registered: instances carry no canonical
                // URL and are never resolved externally (spec §4.3).
                Rule::instance => {}
                _ => {}
            }
        }
    }

    table
}

fn register_alias(pair: Pair<'_, Rule>, file: Option<&str>, table: &mut SymbolTable, diagnostics: &mut dyn DiagnosticSink) {
    let location = location_from_pair(&pair);
    let mut seqs = pair.into_inner();
    let Some(name_pair) = seqs.next() else { return };
    let Some(url_pair) = seqs.next() else { return };
    table.register(
        EntityKind::Alias,
        name_pair.as_str().to_owned(),
        url_pair.as_str().to_owned(),
        file,
        location,
        diagnostics,
    );
}

fn register_structure_def(
    pair: Pair<'_, Rule>,
    kind: EntityKind,
    resource_segment: &str,
    canonical: &str,
    file: Option<&str>,
    table: &mut SymbolTable,
    diagnostics: &mut dyn DiagnosticSink,
) {
    let location = location_from_pair(&pair);
    let mut inner = pair.into_inner();
    let Some(name_pair) = inner.next() else { return };
    let name = name_pair.as_str().to_owned();
    let id = first_id_metadata(inner);
    let url_id = id.clone().unwrap_or_else(|| name.clone());
    let url = format!("{canonical}/{resource_segment}/{url_id}");

    table.register(kind, name.clone(), url.clone(), file, location, diagnostics);
    if let Some(id) = id {
        if id != name {
            table.register(kind, id, url, file, location, diagnostics);
        }
    }
}

fn register_value_set(
    pair: Pair<'_, Rule>,
    canonical: &str,
    file: Option<&str>,
    table: &mut SymbolTable,
    diagnostics: &mut dyn DiagnosticSink,
) {
    let location = location_from_pair(&pair);
    let mut inner = pair.into_inner();
    let Some(name_pair) = inner.next() else { return };
    let name = name_pair.as_str().to_owned();
    let id = first_id_from_vs_metadata(inner);
    let url_id = id.clone().unwrap_or_else(|| name.clone());
    let url = format!("{canonical}/ValueSet/{url_id}");

    table.register(EntityKind::ValueSet, name.clone(), url.clone(), file, location, diagnostics);
    if let Some(id) = id {
        if id != name {
            table.register(EntityKind::ValueSet, id, url, file, location, diagnostics);
        }
    }
}

/// Find the first `Id:` line among `sd_metadata*` pairs. Only the first
/// matters here: duplicate-Id handling (with its diagnostic) is the
/// visitor's job (spec §4.4); the preprocessor just needs the value the
/// visitor will ultimately keep.
fn first_id_metadata(rest: Pairs<'_, Rule>) -> Option<String> {
    for meta in rest {
        if meta.as_rule() != Rule::sd_metadata {
            continue;
        }
        if let Some(field) = meta.into_inner().next() {
            if field.as_rule() == Rule::id_metadata {
                if let Some(seq) = field.into_inner().next() {
                    return Some(seq.as_str().to_owned());
                }
            }
        }
    }
    None
}

fn first_id_from_vs_metadata(rest: Pairs<'_, Rule>) -> Option<String> {
    for meta in rest {
        if meta.as_rule() != Rule::vs_metadata {
            continue;
        }
        if let Some(field) = meta.into_inner().next() {
            if field.as_rule() == Rule::id_metadata {
                if let Some(seq) = field.into_inner().next() {
                    return Some(seq.as_str().to_owned());
                }
            }
        }
    }
    None
}
