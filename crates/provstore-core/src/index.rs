//! Local lookup indexes for stored documents and meta-bundles.
//!
//! The persisted graph database is an external collaborator; the core only
//! needs existence answers keyed the way the storage layer keys them:
//! `{organizationId}_{documentLocalName}` for ordinary documents and the
//! bare local name for meta-bundles. The in-memory backends exist for
//! tests and single-process deployments.

use std::collections::HashSet;
use std::sync::RwLock;

/// Composes the storage key for an ordinary document.
#[must_use]
pub fn document_key(organization_id: &str, document_local: &str) -> String {
    format!("{organization_id}_{document_local}")
}

/// Existence lookups over stored documents.
pub trait DocumentIndex: Send + Sync {
    /// Whether a document with the composite key exists.
    fn contains(&self, key: &str) -> bool;
}

/// Existence lookups over stored meta-bundles.
pub trait MetaBundleIndex: Send + Sync {
    /// Whether a meta-bundle with the local name exists.
    fn contains(&self, meta_local: &str) -> bool;
}

/// Lineage lookups over the meta-provenance graphs: which meta-bundle a
/// stored document entity belongs to. Answered by the meta-provenance
/// store; used by the pipeline to validate update requests.
pub trait MetaLineageIndex: Send + Sync {
    /// The meta-bundle local name containing the concrete entity with the
    /// given composite key, when known.
    fn meta_of(&self, entity_key: &str) -> Option<String>;
}

/// In-memory document index.
#[derive(Debug, Default)]
pub struct MemoryDocumentIndex {
    keys: RwLock<HashSet<String>>,
}

impl MemoryDocumentIndex {
    /// Creates an empty index.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a stored document.
    pub fn insert(&self, key: impl Into<String>) {
        self.keys
            .write()
            .expect("document index lock poisoned")
            .insert(key.into());
    }
}

impl DocumentIndex for MemoryDocumentIndex {
    fn contains(&self, key: &str) -> bool {
        self.keys
            .read()
            .expect("document index lock poisoned")
            .contains(key)
    }
}

/// In-memory meta-bundle index.
#[derive(Debug, Default)]
pub struct MemoryMetaBundleIndex {
    keys: RwLock<HashSet<String>>,
}

impl MemoryMetaBundleIndex {
    /// Creates an empty index.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a stored meta-bundle.
    pub fn insert(&self, meta_local: impl Into<String>) {
        self.keys
            .write()
            .expect("meta index lock poisoned")
            .insert(meta_local.into());
    }
}

impl MetaBundleIndex for MemoryMetaBundleIndex {
    fn contains(&self, meta_local: &str) -> bool {
        self.keys
            .read()
            .expect("meta index lock poisoned")
            .contains(meta_local)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_key_is_org_underscore_name() {
        assert_eq!(document_key("org", "test_bundle"), "org_test_bundle");
    }

    #[test]
    fn memory_indexes_answer_existence() {
        let documents = MemoryDocumentIndex::new();
        documents.insert("org_test_bundle");
        assert!(documents.contains("org_test_bundle"));
        assert!(!documents.contains("org_other_bundle"));

        let metas = MemoryMetaBundleIndex::new();
        metas.insert("test_meta");
        assert!(metas.contains("test_meta"));
        assert!(!metas.contains("other_meta"));
    }
}
