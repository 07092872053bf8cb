//! Meta-provenance storage seam.

use std::collections::BTreeMap;
use std::sync::RwLock;

use crate::graph::{Bundle, QualifiedName};
use crate::index::MetaLineageIndex;
use crate::vocab;

use super::{FoldOutcome, MetaError};

/// Storage for meta-provenance bundles.
///
/// `with_bundle_mut` is the transactional boundary: the closure runs while
/// the store holds the meta-bundle exclusively, so the builder's
/// read-then-write version assignment is serialized per meta-bundle id.
/// Bundles are append-only by contract — the builder only ever adds
/// records.
pub trait MetaStore: Send + Sync {
    /// Runs `mutate` over the meta-bundle named by `meta_id` inside a
    /// critical section. With `create_if_missing`, an absent bundle is
    /// created empty first; otherwise absence is an error.
    ///
    /// # Errors
    ///
    /// Returns [`MetaError::MetaBundleNotFound`] when the bundle is absent
    /// and `create_if_missing` is false, or whatever error `mutate`
    /// returns (in which case the bundle is left unchanged).
    fn with_bundle_mut(
        &self,
        meta_id: &QualifiedName,
        create_if_missing: bool,
        mutate: &mut dyn FnMut(&mut Bundle) -> Result<FoldOutcome, MetaError>,
    ) -> Result<FoldOutcome, MetaError>;

    /// A copy of the meta-bundle with the given local name.
    fn snapshot(&self, meta_local: &str) -> Option<Bundle>;
}

/// In-memory meta-provenance store.
#[derive(Debug, Default)]
pub struct MemoryMetaStore {
    bundles: RwLock<BTreeMap<String, Bundle>>,
}

impl MemoryMetaStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Local names of the stored meta-bundles.
    #[must_use]
    pub fn meta_ids(&self) -> Vec<String> {
        self.bundles
            .read()
            .expect("meta store lock poisoned")
            .keys()
            .cloned()
            .collect()
    }
}

impl MetaStore for MemoryMetaStore {
    fn with_bundle_mut(
        &self,
        meta_id: &QualifiedName,
        create_if_missing: bool,
        mutate: &mut dyn FnMut(&mut Bundle) -> Result<FoldOutcome, MetaError>,
    ) -> Result<FoldOutcome, MetaError> {
        let mut bundles = self.bundles.write().expect("meta store lock poisoned");
        let key = meta_id.local().to_owned();
        if !bundles.contains_key(&key) {
            if !create_if_missing {
                return Err(MetaError::MetaBundleNotFound { meta: key });
            }
            bundles.insert(key.clone(), Bundle::new(meta_id.clone()));
        }
        let bundle = bundles.get_mut(&key).expect("bundle inserted above");

        // Mutate a working copy so a failed fold leaves no partial write.
        let mut working = bundle.clone();
        let outcome = mutate(&mut working)?;
        *bundle = working;
        Ok(outcome)
    }

    fn snapshot(&self, meta_local: &str) -> Option<Bundle> {
        self.bundles
            .read()
            .expect("meta store lock poisoned")
            .get(meta_local)
            .cloned()
    }
}

impl MetaLineageIndex for MemoryMetaStore {
    fn meta_of(&self, entity_key: &str) -> Option<String> {
        let bundles = self.bundles.read().expect("meta store lock poisoned");
        for (meta_local, bundle) in bundles.iter() {
            let tracked = bundle.entities().any(|entity| {
                entity.id().local() == entity_key && entity.has_type(&vocab::prov_bundle())
            });
            if tracked {
                return Some(meta_local.clone());
            }
        }
        None
    }
}
