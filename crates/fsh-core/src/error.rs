//! Error type for conditions the importer does not model as recoverable
//! diagnostics — everything spec §7 classifies as lex/parse, preprocess, or
//! visit-time trouble is reported through [`crate::diagnostic::Diagnostic`]
//! instead and never reaches here.

use thiserror::Error;

use crate::parser::Rule;

/// Result type alias using [`CoreError`].
pub type CoreResult<T> = std::result::Result<T, CoreError>;

/// Errors the importer's constructors can raise.
#[derive(Debug, Error)]
pub enum CoreError {
    /// `ImportConfig` could not be deserialized from caller-supplied data.
    #[error("invalid import configuration: {0}")]
    Config(String),

    /// A definition-provider lookup failed in a way the provider chose to
    /// surface as an error rather than an empty result.
    #[error("definition provider error: {0}")]
    DefinitionProvider(String),

    /// A raw `pest` grammar error, for callers that parse source text
    /// themselves rather than going through [`crate::import::import`]'s
    /// diagnostic-collecting path.
    #[error("parse error: {0}")]
    Parse(Box<pest::error::Error<Rule>>),
}

impl CoreError {
    #[must_use]
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    #[must_use]
    pub fn definition_provider(msg: impl Into<String>) -> Self {
        Self::DefinitionProvider(msg.into())
    }
}

impl From<serde_json::Error> for CoreError {
    fn from(e: serde_json::Error) -> Self {
        Self::Config(e.to_string())
    }
}

impl From<pest::error::Error<Rule>> for CoreError {
    fn from(e: pest::error::Error<Rule>) -> Self {
        Self::Parse(Box::new(e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pest::Parser as _;

    use crate::parser::DslParser;

    #[test]
    fn pest_error_converts_into_core_error() {
        let err = DslParser::parse(Rule::doc, "Profile: ***not valid***").unwrap_err();
        let core: CoreError = err.into();
        assert!(matches!(core, CoreError::Parse(_)));
        assert!(core.to_string().starts_with("parse error:"));
    }
}
