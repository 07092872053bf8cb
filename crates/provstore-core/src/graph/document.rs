//! Top-level PROV documents.

use std::collections::BTreeMap;

use crate::graph::Bundle;

/// A deserialized PROV document: document-level namespace declarations and
/// the bundles asserted inside it.
///
/// The validation pipeline requires exactly one bundle per submitted
/// document; the model itself does not, so cardinality violations can be
/// represented and rejected with their contract messages.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Document {
    namespaces: BTreeMap<String, String>,
    bundles: Vec<Bundle>,
}

impl Document {
    /// Creates an empty document.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares a document-level namespace.
    pub fn add_namespace(&mut self, prefix: impl Into<String>, uri: impl Into<String>) {
        self.namespaces.insert(prefix.into(), uri.into());
    }

    /// Document-level namespaces (prefix -> URI).
    #[must_use]
    pub fn namespaces(&self) -> &BTreeMap<String, String> {
        &self.namespaces
    }

    /// Adds a bundle.
    pub fn add_bundle(&mut self, bundle: Bundle) {
        self.bundles.push(bundle);
    }

    /// The bundles in assertion order.
    #[must_use]
    pub fn bundles(&self) -> &[Bundle] {
        &self.bundles
    }

    /// Whether the document contains any bundle.
    #[must_use]
    pub fn has_bundles(&self) -> bool {
        !self.bundles.is_empty()
    }

    /// The single bundle, when there is exactly one.
    #[must_use]
    pub fn single_bundle(&self) -> Option<&Bundle> {
        match self.bundles.as_slice() {
            [bundle] => Some(bundle),
            _ => None,
        }
    }
}
