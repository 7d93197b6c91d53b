//! The external definition-provider interface (spec §6).
//!
//! The core treats this as an opaque, read-only index of externally
//! supplied resources, types, profiles, extensions, value sets, and code
//! systems. It is never implemented here — only the lookup surface the
//! resolver calls through is defined.

/// A single match returned by the provider. Only the URL matters to the
/// resolver; an empty URL is treated the same as no match (spec §4.3 step 3).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DefRecord {
    pub url: String,
}

impl DefRecord {
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.url.is_empty()
    }
}

/// Read-only index of externally defined artifacts.
pub trait DefinitionProvider {
    /// Unconstrained lookup, used when the resolver's caller supplies no
    /// allowed kinds.
    fn find(&self, symbol: &str) -> Option<DefRecord>;

    fn find_resource(&self, symbol: &str) -> Option<DefRecord>;
    fn find_type(&self, symbol: &str) -> Option<DefRecord>;
    fn find_profile(&self, symbol: &str) -> Option<DefRecord>;
    fn find_extension(&self, symbol: &str) -> Option<DefRecord>;
    fn find_value_set(&self, symbol: &str) -> Option<DefRecord>;
    fn find_code_system(&self, symbol: &str) -> Option<DefRecord>;
}

/// A provider that never has anything — useful for tests and for callers
/// with no external definitions to consult.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmptyDefinitionProvider;

impl DefinitionProvider for EmptyDefinitionProvider {
    fn find(&self, _symbol: &str) -> Option<DefRecord> {
        None
    }
    fn find_resource(&self, _symbol: &str) -> Option<DefRecord> {
        None
    }
    fn find_type(&self, _symbol: &str) -> Option<DefRecord> {
        None
    }
    fn find_profile(&self, _symbol: &str) -> Option<DefRecord> {
        None
    }
    fn find_extension(&self, _symbol: &str) -> Option<DefRecord> {
        None
    }
    fn find_value_set(&self, _symbol: &str) -> Option<DefRecord> {
        None
    }
    fn find_code_system(&self, _symbol: &str) -> Option<DefRecord> {
        None
    }
}
