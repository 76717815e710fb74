//! # Import Map Module
//!
//! Per-instance ECMAScript import maps.
//!
//! Every instance inherits the prelude's third-party imports and adds one
//! local entry per library file it ships. Local URLs are built from the
//! instance's own full entry, so two instances may ship a `utils.js` each
//! without clashing.

use crate::locator::ContentLocator;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Where an import map entry came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImportKind {
    /// Declared globally in the prelude.
    ThirdParty,
    /// Shipped next to the instance, resolved against its full entry.
    Local,
}

/// One specifier-to-URL mapping.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ImportMapEntry {
    pub kind: ImportKind,
    pub lib: String,
    pub url: String,
}

impl ImportMapEntry {
    #[must_use]
    pub fn third_party(lib: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            kind: ImportKind::ThirdParty,
            lib: lib.into(),
            url: url.into(),
        }
    }

    #[must_use]
    pub fn local(lib: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            kind: ImportKind::Local,
            lib: lib.into(),
            url: url.into(),
        }
    }
}

/// Turn the prelude's import object into third-party entries, keeping order.
#[must_use]
pub fn third_party_entries(imports: &IndexMap<String, String>) -> Vec<ImportMapEntry> {
    imports
        .iter()
        .map(|(lib, url)| ImportMapEntry::third_party(lib.clone(), url.clone()))
        .collect()
}

/// Build the full import map of one instance.
///
/// Third-party entries come first in prelude order, then one local entry
/// per `libs` item in declaration order. Local URLs that cannot be resolved
/// even against the page origin keep their raw concatenated form.
#[must_use]
pub fn resolve_instance_import_maps(
    third_party: &[ImportMapEntry],
    full_entry: &str,
    libs: &[String],
    locator: &ContentLocator,
) -> Vec<ImportMapEntry> {
    let mut entries = Vec::with_capacity(third_party.len() + libs.len());
    entries.extend_from_slice(third_party);

    for lib in libs {
        let raw = locator.concatenate(&[full_entry, lib]);
        let url = match locator.resolve(&raw) {
            Ok(url) => url.to_string(),
            Err(err) => {
                tracing::warn!(%raw, %err, "unresolvable local import, keeping raw path");
                raw
            }
        };
        entries.push(ImportMapEntry::local(lib.clone(), url));
    }

    entries
}

/// Collapse entries into the `imports` object of an import map script.
///
/// A later entry for the same specifier replaces the URL but keeps the
/// position of the first one.
#[must_use]
pub fn to_imports_object(entries: &[ImportMapEntry]) -> IndexMap<&str, &str> {
    let mut imports = IndexMap::with_capacity(entries.len());
    for entry in entries {
        imports.insert(entry.lib.as_str(), entry.url.as_str());
    }
    imports
}

// =============================================================================
// TESTS
// =============================================================================
