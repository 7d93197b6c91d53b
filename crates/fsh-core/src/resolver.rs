//! Name -> URL resolution against the local symbol table, falling back to
//! the external definition provider (spec §4.3).

use crate::defs::DefinitionProvider;
use crate::ir::EntityKind;
use crate::preprocessor::SymbolTable;

/// Looks up a declared symbol against the local table first, then the
/// external provider, in the order the caller names.
pub struct Resolver<'a> {
    table: &'a SymbolTable,
    defs: &'a dyn DefinitionProvider,
}

impl<'a> Resolver<'a> {
    #[must_use]
    pub fn new(table: &'a SymbolTable, defs: &'a dyn DefinitionProvider) -> Self {
        Self { table, defs }
    }

    /// Resolve `symbol` to a URL.
    ///
    /// - `allowed_kinds` empty: try the global local table, then the
    ///   provider's unconstrained `find`, else pass `symbol` through
    ///   unchanged (spec §4.3 step 1).
    /// - `allowed_kinds` non-empty: try each kind's local table in order,
    ///   then each kind's provider lookup in order, else pass through
    ///   (spec §4.3 steps 2-4).
    #[must_use]
    pub fn resolve(&self, symbol: &str, allowed_kinds: &[EntityKind]) -> String {
        if symbol.is_empty() {
            return symbol.to_owned();
        }

        if allowed_kinds.is_empty() {
            if let Some(url) = self.table.get_global(symbol) {
                return url.to_owned();
            }
            if let Some(record) = self.defs.find(symbol) {
                if !record.is_empty() {
                    return record.url;
                }
            }
            return symbol.to_owned();
        }

        for kind in allowed_kinds {
            if let Some(url) = self.table.get(*kind, symbol) {
                return url.to_owned();
            }
        }

        for kind in allowed_kinds {
            if let Some(record) = lookup_provider(self.defs, *kind, symbol) {
                if !record.is_empty() {
                    return record.url;
                }
            }
        }

        symbol.to_owned()
    }
}

fn lookup_provider(defs: &dyn DefinitionProvider, kind: EntityKind, symbol: &str) -> Option<crate::defs::DefRecord> {
    match kind {
        EntityKind::Resource => defs.find_resource(symbol),
        EntityKind::Type => defs.find_type(symbol),
        EntityKind::Profile => defs.find_profile(symbol),
        EntityKind::Extension => defs.find_extension(symbol),
        EntityKind::ValueSet => defs.find_value_set(symbol),
        EntityKind::CodeSystem => defs.find_code_system(symbol),
        // Aliases and instances are never looked up externally: aliases are
        // purely a local-document shorthand, instances have no canonical URL.
        EntityKind::Alias | EntityKind::Instance => None,
    }
}
