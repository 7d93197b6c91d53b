//! Grammar-driven lexer/parser: turns raw source text into a pest parse
//! tree (the "concrete syntax tree" of spec §4.1).
//!
//! Parsing never throws: any lex/parse error is captured as a [`Diagnostic`]
//! and the caller gets back the best-effort tree pest was able to produce.
//! `pest` itself stops at the first error, so "best effort" here means the
//! portion of the tree already matched before the error is surfaced as a
//! single error diagnostic — downstream stages simply see an empty document.

use pest::iterators::Pairs;
use pest::Parser as _;

use crate::diagnostic::{Diagnostic, Severity};
use crate::location::TextLocation;

const _GRAMMAR: &str = include_str!("grammar.pest");

#[derive(pest_derive::Parser)]
#[grammar = "grammar.pest"]
pub struct DslParser;

/// Parse one document's source text.
///
/// Returns the parse tree's top-level `doc` pairs, or `None` if the source
/// could not be parsed at all. On failure, a single error [`Diagnostic`] is
/// pushed to `diagnostics` carrying the parser's message and location.
pub fn parse_document<'a>(
    source: &'a str,
    file: Option<&str>,
    diagnostics: &mut Vec<Diagnostic>,
) -> Option<Pairs<'a, Rule>> {
    match DslParser::parse(Rule::doc, source) {
        Ok(pairs) => Some(pairs),
        Err(err) => {
            diagnostics.push(Diagnostic {
                level: Severity::Error,
                message: err.variant.message().to_string(),
                file: file.map(str::to_owned),
                location: Some(location_from_pest_error(&err)),
            });
            None
        }
    }
}

fn location_from_pest_error(err: &pest::error::Error<Rule>) -> TextLocation {
    let (start_line, start_col) = line_col(&err.line_col);
    TextLocation {
        start_line,
        start_col,
        end_line: start_line,
        end_col: start_col,
    }
}

fn line_col(line_col: &pest::error::LineColLocation) -> (usize, usize) {
    match line_col {
        pest::error::LineColLocation::Pos((l, c)) => (*l, *c),
        pest::error::LineColLocation::Span((l, c), _) => (*l, *c),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grammar_is_included() {
        assert!(_GRAMMAR.contains("doc ="));
        assert!(_GRAMMAR.contains("Profile"));
    }

    #[test]
    fn parses_alias() {
        let mut diags = Vec::new();
        let pairs = parse_document("Alias: LNC = http://loinc.org", None, &mut diags);
        assert!(pairs.is_some(), "{diags:?}");
        assert!(diags.is_empty());
    }

    #[test]
    fn parses_empty_extension() {
        let mut diags = Vec::new();
        let pairs = parse_document("Extension: SomeExtension", None, &mut diags);
        assert!(pairs.is_some(), "{diags:?}");
    }

    #[test]
    fn reports_parse_error_without_panicking() {
        let mut diags = Vec::new();
        let pairs = parse_document("Profile: ***not valid***", None, &mut diags);
        assert!(pairs.is_none());
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].level, Severity::Error);
    }

    #[test]
    fn parses_value_set_with_concept_components() {
        let src = "ValueSet: VS\n* codes from system http://s\n* #a\n* #b\n";
        let mut diags = Vec::new();
        let pairs = parse_document(src, None, &mut diags);
        assert!(pairs.is_some(), "{diags:?}");
        assert!(diags.is_empty());
    }
}
