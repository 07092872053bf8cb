//! Cross-bundle reference resolution.
//!
//! Every connector claims three things about the document it points at:
//! where the bundle lives, where its meta-bundle lives, and what the
//! bundle's content hash is. The resolver checks all three. References
//! whose URI authority is this node's own resolve against the local
//! indexes; everything else gets a lightweight HTTP existence probe. The
//! two existence legs of one connector are independent network reads and
//! run concurrently; hash verification only proceeds once both legs have
//! joined successfully.
//!
//! A connector referencing the bundle (or meta-bundle) currently being
//! validated is rejected outright, before any existence check — relying on
//! existence-check timing would misreport self-references against
//! not-yet-saved identifiers as "not found".

mod http;


use std::thread;

use thiserror::Error;
use tracing::{debug, warn};
use url::Url;

use crate::config::StorageNodeConfig;
use crate::crypto::digests_match;
use crate::graph::{Element, QualifiedName};
use crate::index::{document_key, DocumentIndex, MetaBundleIndex};
use crate::vocab;

pub use http::HttpProbe;

/// Existence probe against a remote storage node (HEAD-equivalent).
pub trait ExistenceProbe: Send + Sync {
    /// Whether the resource at `uri` exists (2xx response). Timeouts and
    /// transport failures count as "not found".
    fn probe(&self, uri: &Url) -> bool;
}

/// Digest information from a referenced bundle's previously issued token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredTokenInfo {
    /// Hex digest of the stored document.
    pub document_digest: String,
    /// Digest algorithm name.
    pub hash_function: String,
}

/// Retrieval of a referenced bundle's stored token (GET-equivalent).
pub trait TokenFetcher: Send + Sync {
    /// The stored token of the bundle at `uri`, or `None` when the
    /// document or its token is not retrievable (e.g. the remote node runs
    /// without a trusted party).
    fn fetch_token(&self, uri: &Url) -> Option<StoredTokenInfo>;
}

/// Identity of the bundle under validation, for self-reference detection.
#[derive(Debug, Clone)]
pub struct BundleContext {
    /// Expanded URI of the bundle being validated.
    pub own_bundle_uri: String,
    /// Meta-bundle id declared by the bundle's own main activity.
    pub own_meta_id: Option<QualifiedName>,
}

/// Outcome of resolving one connector's references.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolutionResult {
    /// Whether the referenced bundle exists.
    pub bundle_found: bool,
    /// Whether the referenced meta-bundle exists.
    pub meta_bundle_found: bool,
    /// Whether the claimed hash matches the stored token. Vacuously true
    /// unless both existence legs succeeded and a token was retrievable.
    pub hash_ok: bool,
}

/// Reference-resolution failures.
///
/// The not-found and hash messages are contract messages keyed by the
/// connector's local name.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum ResolveError {
    /// The referenced bundle does not exist.
    #[error("Referenced bundle URI of connector [{connector}] not found.")]
    ReferencedBundleNotFound {
        /// Local name of the connector.
        connector: String,
    },

    /// The referenced meta-bundle does not exist.
    #[error("Referenced meta bundle URI of connector [{connector}] not found.")]
    ReferencedMetaBundleNotFound {
        /// Local name of the connector.
        connector: String,
    },

    /// The claimed hash does not match the referenced bundle's token.
    #[error("Hash of bundle [{connector}] has wrong value.")]
    HashMismatch {
        /// Local name of the connector.
        connector: String,
    },

    /// The connector references the bundle being validated.
    #[error("Forward or backward connector references this bundle [{reference}].")]
    SelfReference {
        /// The self-reference as asserted on the connector.
        reference: String,
    },

    /// The connector references this bundle's own meta-bundle.
    #[error("Forward or backward connector references this meta bundle [{reference}].")]
    MetaSelfReference {
        /// The self-reference as asserted on the connector.
        reference: String,
    },

    /// The reference cannot be interpreted at all (missing attribute,
    /// unparseable URI, unrecognizable local path). Escalated to a
    /// 500-class error by the pipeline.
    #[error("Reference of connector [{connector}] cannot be resolved: {detail}")]
    Unresolvable {
        /// Local name of the connector.
        connector: String,
        /// Why the reference cannot be interpreted.
        detail: String,
    },
}

enum Location {
    Local,
    Remote(Url),
}

/// Resolves and verifies connector references.
pub struct ReferenceResolver<'a> {
    config: &'a StorageNodeConfig,
    probe: &'a dyn ExistenceProbe,
    token_fetcher: &'a dyn TokenFetcher,
    documents: &'a dyn DocumentIndex,
    meta_bundles: &'a dyn MetaBundleIndex,
}

impl<'a> ReferenceResolver<'a> {
    /// Creates a resolver over the given collaborators.
    #[must_use]
    pub fn new(
        config: &'a StorageNodeConfig,
        probe: &'a dyn ExistenceProbe,
        token_fetcher: &'a dyn TokenFetcher,
        documents: &'a dyn DocumentIndex,
        meta_bundles: &'a dyn MetaBundleIndex,
    ) -> Self {
        Self {
            config,
            probe,
            token_fetcher,
            documents,
            meta_bundles,
        }
    }

    /// Verifies every connector, backward connectors first, short-circuiting
    /// on the first failure.
    ///
    /// # Errors
    ///
    /// Returns the first [`ResolveError`] encountered.
    pub fn verify_connectors(
        &self,
        ctx: &BundleContext,
        backward: &[Element],
        forward: &[Element],
    ) -> Result<(), ResolveError> {
        for connector in backward.iter().chain(forward.iter()) {
            self.verify(ctx, connector)?;
        }
        Ok(())
    }

    /// Verifies one connector: self-reference, existence of both
    /// references, then hash.
    ///
    /// # Errors
    ///
    /// Returns the first [`ResolveError`] encountered, bundle existence
    /// before meta-bundle existence before hash.
    pub fn verify(&self, ctx: &BundleContext, connector: &Element) -> Result<(), ResolveError> {
        let local = connector.id().local().to_owned();
        let result = self.resolve(ctx, connector)?;
        if !result.bundle_found {
            warn!(connector = %local, "referenced bundle not found");
            return Err(ResolveError::ReferencedBundleNotFound { connector: local });
        }
        if !result.meta_bundle_found {
            warn!(connector = %local, "referenced meta bundle not found");
            return Err(ResolveError::ReferencedMetaBundleNotFound { connector: local });
        }
        if !result.hash_ok {
            warn!(connector = %local, "referenced bundle hash mismatch");
            return Err(ResolveError::HashMismatch { connector: local });
        }
        Ok(())
    }

    /// Resolves one connector's references without judging the outcome.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError::SelfReference`] /
    /// [`ResolveError::MetaSelfReference`] for self-references and
    /// [`ResolveError::Unresolvable`] when a reference cannot be
    /// interpreted.
    pub fn resolve(
        &self,
        ctx: &BundleContext,
        connector: &Element,
    ) -> Result<ResolutionResult, ResolveError> {
        let bundle_ref = self.reference_attribute(connector, &vocab::cpm_referenced_bundle_id())?;
        let meta_ref =
            self.reference_attribute(connector, &vocab::cpm_referenced_meta_bundle_id())?;

        // Self-reference is decided before any existence check.
        if bundle_ref.uri() == ctx.own_bundle_uri {
            return Err(ResolveError::SelfReference {
                reference: bundle_ref.to_string(),
            });
        }
        if let Some(own_meta) = &ctx.own_meta_id {
            if &meta_ref == own_meta {
                return Err(ResolveError::MetaSelfReference {
                    reference: meta_ref.to_string(),
                });
            }
        }

        // The two existence legs are independent reads; dispatch both and
        // join before looking at either outcome.
        let (bundle_found, meta_bundle_found) = thread::scope(|scope| {
            let bundle_leg = scope.spawn(|| self.bundle_exists(connector, &bundle_ref));
            let meta_leg = scope.spawn(|| self.meta_bundle_exists(connector, &meta_ref));
            (
                bundle_leg.join().expect("bundle existence probe panicked"),
                meta_leg.join().expect("meta existence probe panicked"),
            )
        });
        let bundle_found = bundle_found?;
        let meta_bundle_found = meta_bundle_found?;

        let hash_ok = if bundle_found && meta_bundle_found {
            self.check_hash(connector, &bundle_ref)?
        } else {
            true
        };

        Ok(ResolutionResult {
            bundle_found,
            meta_bundle_found,
            hash_ok,
        })
    }

    fn reference_attribute(
        &self,
        connector: &Element,
        key: &QualifiedName,
    ) -> Result<QualifiedName, ResolveError> {
        connector
            .attributes()
            .first(key)
            .and_then(|value| value.as_qualified().cloned())
            .ok_or_else(|| ResolveError::Unresolvable {
                connector: connector.id().local().to_owned(),
                detail: format!("attribute [{key}] is missing or not an identifier"),
            })
    }

    fn locate(
        &self,
        connector: &Element,
        reference: &QualifiedName,
    ) -> Result<Location, ResolveError> {
        let url = Url::parse(&reference.uri()).map_err(|err| ResolveError::Unresolvable {
            connector: connector.id().local().to_owned(),
            detail: format!("invalid reference URI [{}]: {err}", reference.uri()),
        })?;
        let host = url
            .host_str()
            .ok_or_else(|| ResolveError::Unresolvable {
                connector: connector.id().local().to_owned(),
                detail: format!("reference URI [{url}] has no host"),
            })?
            .to_owned();
        let authority = match url.port() {
            Some(port) => format!("{host}:{port}"),
            None => host.clone(),
        };
        if authority == self.config.own_authority || host == self.config.own_authority {
            Ok(Location::Local)
        } else {
            Ok(Location::Remote(url))
        }
    }

    fn bundle_exists(
        &self,
        connector: &Element,
        reference: &QualifiedName,
    ) -> Result<bool, ResolveError> {
        match self.locate(connector, reference)? {
            Location::Local => {
                let organization =
                    organization_from_uri(reference.namespace_uri()).ok_or_else(|| {
                        ResolveError::Unresolvable {
                            connector: connector.id().local().to_owned(),
                            detail: format!(
                                "local reference [{}] has no organization segment",
                                reference.uri()
                            ),
                        }
                    })?;
                let key = document_key(&organization, reference.local());
                let found = self.documents.contains(&key);
                debug!(key = %key, found, "local bundle lookup");
                Ok(found)
            }
            Location::Remote(url) => {
                let found = self.probe.probe(&url);
                debug!(uri = %url, found, "remote bundle probe");
                Ok(found)
            }
        }
    }

    fn meta_bundle_exists(
        &self,
        connector: &Element,
        reference: &QualifiedName,
    ) -> Result<bool, ResolveError> {
        match self.locate(connector, reference)? {
            Location::Local => {
                let found = self.meta_bundles.contains(reference.local());
                debug!(key = %reference.local(), found, "local meta bundle lookup");
                Ok(found)
            }
            Location::Remote(url) => {
                let found = self.probe.probe(&url);
                debug!(uri = %url, found, "remote meta bundle probe");
                Ok(found)
            }
        }
    }

    fn check_hash(
        &self,
        connector: &Element,
        bundle_ref: &QualifiedName,
    ) -> Result<bool, ResolveError> {
        let url =
            Url::parse(&bundle_ref.uri()).map_err(|err| ResolveError::Unresolvable {
                connector: connector.id().local().to_owned(),
                detail: format!("invalid reference URI [{}]: {err}", bundle_ref.uri()),
            })?;
        let Some(token) = self.token_fetcher.fetch_token(&url) else {
            // The referenced node may run without a trusted party; with no
            // token to compare against, the claim stands.
            debug!(uri = %url, "no stored token retrievable, skipping hash check");
            return Ok(true);
        };

        let claimed_hash = connector
            .attributes()
            .first(&vocab::cpm_referenced_bundle_hash_value())
            .and_then(|value| value.as_str());
        let claimed_alg = connector
            .attributes()
            .first(&vocab::cpm_hash_alg())
            .and_then(|value| value.as_str());
        let (Some(claimed_hash), Some(claimed_alg)) = (claimed_hash, claimed_alg) else {
            return Err(ResolveError::Unresolvable {
                connector: connector.id().local().to_owned(),
                detail: "connector hash attributes are missing or not strings".to_owned(),
            });
        };

        Ok(digests_match(claimed_hash, &token.document_digest)
            && claimed_alg == token.hash_function)
    }
}

/// Extracts the organization id from a documents-path namespace URI
/// (`.../organizations/{org}/documents/`).
#[must_use]
pub fn organization_from_uri(namespace_uri: &str) -> Option<String> {
    let mut segments = namespace_uri.split('/').filter(|segment| !segment.is_empty());
    while let Some(segment) = segments.next() {
        if segment == "organizations" {
            return segments.next().map(ToOwned::to_owned);
        }
    }
    None
}
