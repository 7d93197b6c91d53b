//! Typed project configuration consumed by the importer (spec §6).
//!
//! The core reads no files, environment variables, or CLI arguments itself
//! — that remains the excluded CLI layer's job — but it owns the shape of
//! the one piece of configuration it actually consumes: the project's
//! canonical URL prefix used to synthesise entity URLs (spec §4.2).

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};

/// Project configuration supplied by the embedding application.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportConfig {
    /// URL prefix used when synthesising canonical URLs for locally
    /// declared profiles, extensions, value sets and code systems.
    pub canonical: String,
}

impl ImportConfig {
    #[must_use]
    pub fn new(canonical: impl Into<String>) -> Self {
        Self {
            canonical: canonical.into(),
        }
    }

    /// Load configuration from a JSON document (the shape a host project
    /// manifest would expose this fragment as).
    pub fn from_json(json: &str) -> CoreResult<Self> {
        let config: Self = serde_json::from_str(json)?;
        if config.canonical.trim().is_empty() {
            return Err(CoreError::config("canonical must not be empty"));
        }
        Ok(config)
    }

    /// The canonical URL prefix with any trailing slash stripped.
    #[must_use]
    pub fn canonical_trimmed(&self) -> &str {
        self.canonical.trim_end_matches('/')
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loads_from_json() {
        let cfg = ImportConfig::from_json(r#"{"canonical":"http://ex.org/"}"#).unwrap();
        assert_eq!(cfg.canonical_trimmed(), "http://ex.org");
    }

    #[test]
    fn rejects_empty_canonical() {
        let err = ImportConfig::from_json(r#"{"canonical":"  "}"#);
        assert!(err.is_err());
    }
}
