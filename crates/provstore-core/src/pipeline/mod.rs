//! Document validation pipeline.
//!
//! A strict linear state machine over one incoming document:
//!
//! ```text
//! Received -> Parsed -> StructurallyValid -> ReferencesVerified
//!          -> CpmValid -> NamespacesValid -> Accepted
//! ```
//!
//! Every stage either advances or rejects with a [`DocumentError`] that is
//! final for the request — no backward transitions, no retries, no partial
//! validation. The stored document is never persisted unless the whole
//! pipeline reaches `Accepted`.

mod error;


use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use tracing::debug;
use url::Url;

use crate::classifier::{classify, partition, BackbonePartition, BackboneStrategy, ConnectorSets, TypeTagStrategy};
use crate::codec::{CodecError, GraphCodec};
use crate::config::{StorageNodeConfig, META_BUNDLE_PATH_PREFIX};
use crate::constraints::check_cpm_constraints;
use crate::graph::{Bundle, Document, Element, QualifiedName};
use crate::index::{document_key, DocumentIndex, MetaBundleIndex, MetaLineageIndex};
use crate::resolver::{BundleContext, ExistenceProbe, ReferenceResolver, TokenFetcher};
use crate::vocab;

pub use error::{DocumentError, ErrorClass};

/// States of the validation chain, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ValidationState {
    /// Request received, payload not yet parsed.
    Received,
    /// Payload deserialized into a document.
    Parsed,
    /// Bundle/main-activity cardinality and connector attributes hold.
    StructurallyValid,
    /// Every connector reference resolved and hash-checked.
    ReferencesVerified,
    /// The CPM constraint rules hold.
    CpmValid,
    /// Identifiers and namespace declarations are well-formed.
    NamespacesValid,
    /// The document passed the whole chain.
    Accepted,
}

impl std::fmt::Display for ValidationState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Received => "RECEIVED",
            Self::Parsed => "PARSED",
            Self::StructurallyValid => "STRUCTURALLY_VALID",
            Self::ReferencesVerified => "REFERENCES_VERIFIED",
            Self::CpmValid => "CPM_VALID",
            Self::NamespacesValid => "NAMESPACES_VALID",
            Self::Accepted => "ACCEPTED",
        };
        f.write_str(name)
    }
}

/// Optional full-PROV validity check, pluggable per deployment.
pub trait ProvValidator: Send + Sync {
    /// Whether the document is valid according to the PROV standard.
    fn is_valid(&self, document: &Document) -> bool;
}

/// Default strategy: accept everything. Full PROV constraint checking
/// belongs to an external reasoner.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopProvValidator;

impl ProvValidator for NoopProvValidator {
    fn is_valid(&self, _document: &Document) -> bool {
        true
    }
}

/// One document-store request as the core sees it.
#[derive(Debug, Clone)]
pub struct ValidationRequest {
    /// The submitting organization.
    pub organization_id: String,
    /// Document id from the request path.
    pub document_id: String,
    /// Base64-encoded serialized document.
    pub document: String,
    /// Serialization format of the payload.
    pub document_format: String,
    /// Whether this is an update (PUT) of an existing document.
    pub is_update: bool,
}

/// A fully validated document, ready for persistence and meta-provenance
/// folding.
#[derive(Debug, Clone)]
pub struct AcceptedDocument {
    /// The parsed document.
    pub document: Document,
    /// Local name of the single bundle.
    pub bundle_local: String,
    /// The submitting organization.
    pub organization_id: String,
    /// Composite storage key (`{org}_{bundle}`).
    pub document_key: String,
    /// Local name of the declared meta-bundle.
    pub meta_local: String,
    /// Qualified id of the declared meta-bundle.
    pub meta_id: QualifiedName,
    /// The classified connector sets.
    pub connectors: ConnectorSets,
    /// Backbone/domain split of the bundle, for the sub-view endpoints.
    pub partition: BackbonePartition,
}

static DEFAULT_STRATEGY: TypeTagStrategy = TypeTagStrategy;
static DEFAULT_PROV_VALIDATOR: NoopProvValidator = NoopProvValidator;

/// Orchestrates classification, reference resolution, constraint checking
/// and namespace validation over one incoming document.
pub struct ValidationPipeline<'a> {
    config: &'a StorageNodeConfig,
    codec: &'a dyn GraphCodec,
    probe: &'a dyn ExistenceProbe,
    token_fetcher: &'a dyn TokenFetcher,
    documents: &'a dyn DocumentIndex,
    meta_bundles: &'a dyn MetaBundleIndex,
    lineage: Option<&'a dyn MetaLineageIndex>,
    strategy: &'a dyn BackboneStrategy,
    prov_validator: &'a dyn ProvValidator,
}

impl<'a> ValidationPipeline<'a> {
    /// Creates a pipeline over the given collaborators with the default
    /// backbone strategy and a no-op PROV validator.
    #[must_use]
    pub fn new(
        config: &'a StorageNodeConfig,
        codec: &'a dyn GraphCodec,
        probe: &'a dyn ExistenceProbe,
        token_fetcher: &'a dyn TokenFetcher,
        documents: &'a dyn DocumentIndex,
        meta_bundles: &'a dyn MetaBundleIndex,
    ) -> Self {
        Self {
            config,
            codec,
            probe,
            token_fetcher,
            documents,
            meta_bundles,
            lineage: None,
            strategy: &DEFAULT_STRATEGY,
            prov_validator: &DEFAULT_PROV_VALIDATOR,
        }
    }

    /// Wires the meta-provenance lineage index used to validate updates.
    #[must_use]
    pub fn with_lineage(mut self, lineage: &'a dyn MetaLineageIndex) -> Self {
        self.lineage = Some(lineage);
        self
    }

    /// Swaps the backbone-detection strategy.
    #[must_use]
    pub fn with_strategy(mut self, strategy: &'a dyn BackboneStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Swaps the PROV validity strategy.
    #[must_use]
    pub fn with_prov_validator(mut self, prov_validator: &'a dyn ProvValidator) -> Self {
        self.prov_validator = prov_validator;
        self
    }

    /// Runs the full validation chain over `request`.
    ///
    /// # Errors
    ///
    /// Returns the first [`DocumentError`] encountered; the error's
    /// [`class`](DocumentError::class) tells the HTTP layer how to map it.
    pub fn validate(&self, request: &ValidationRequest) -> Result<AcceptedDocument, DocumentError> {
        let mut state = ValidationState::Received;

        // Received -> Parsed
        let payload = BASE64
            .decode(request.document.as_bytes())
            .map_err(|err| CodecError::Malformed {
                detail: format!("payload is not valid base64: {err}"),
            })?;
        let document = self.codec.decode(&payload, &request.document_format)?;
        advance(&mut state, ValidationState::Parsed);

        // Parsed -> StructurallyValid
        if !document.has_bundles() {
            return Err(DocumentError::HasNoBundles);
        }
        let bundle = document
            .single_bundle()
            .ok_or(DocumentError::TooManyBundles)?;
        let bundle_local = bundle.identifier().local().to_owned();

        let main_activity = retrieve_main_activity(bundle)?;
        let meta_id = main_activity
            .attributes()
            .first(&vocab::cpm_referenced_meta_bundle_id())
            .and_then(|value| value.as_qualified().cloned())
            .ok_or(DocumentError::MissingMetaBundleReference)?;
        let meta_local = self.check_meta_resolvability(&meta_id)?;

        let connectors = classify(bundle, self.strategy);
        if !connectors.backward.iter().all(connector_attributes_complete) {
            return Err(DocumentError::BackwardConnectorAttributesMissing);
        }
        if !connectors.forward.iter().all(connector_attributes_complete) {
            return Err(DocumentError::ForwardConnectorAttributesMissing);
        }

        if request.is_update {
            self.check_update_conditions(request, &meta_local)?;
        } else {
            self.check_new_document_conditions(request, &bundle_local)?;
        }
        advance(&mut state, ValidationState::StructurallyValid);

        // StructurallyValid -> ReferencesVerified
        let ctx = BundleContext {
            own_bundle_uri: bundle.uri(),
            own_meta_id: Some(meta_id.clone()),
        };
        let resolver = ReferenceResolver::new(
            self.config,
            self.probe,
            self.token_fetcher,
            self.documents,
            self.meta_bundles,
        );
        resolver.verify_connectors(&ctx, &connectors.backward, &connectors.forward)?;
        advance(&mut state, ValidationState::ReferencesVerified);

        // ReferencesVerified -> CpmValid
        check_cpm_constraints(bundle, &connectors.forward, &connectors.backward, main_activity)?;
        advance(&mut state, ValidationState::CpmValid);

        // CpmValid -> NamespacesValid
        if !namespaces_valid(&document, bundle) {
            return Err(DocumentError::NamespaceViolation {
                bundle: bundle_local,
            });
        }
        advance(&mut state, ValidationState::NamespacesValid);

        // NamespacesValid -> Accepted
        if !self.prov_validator.is_valid(&document) {
            return Err(DocumentError::ProvInvalid {
                bundle: bundle_local,
            });
        }
        advance(&mut state, ValidationState::Accepted);

        let split = partition(bundle, self.strategy);
        Ok(AcceptedDocument {
            bundle_local: bundle_local.clone(),
            organization_id: request.organization_id.clone(),
            document_key: document_key(&request.organization_id, &bundle_local),
            meta_local,
            meta_id,
            connectors,
            partition: split,
            document,
        })
    }

    /// The declared meta-bundle must live on this storage node, under the
    /// meta-bundle path.
    fn check_meta_resolvability(&self, meta_id: &QualifiedName) -> Result<String, DocumentError> {
        let url = Url::parse(&meta_id.uri()).map_err(|err| {
            DocumentError::UnresolvableMainActivityUri {
                detail: format!("invalid URI [{}]: {err}", meta_id.uri()),
            }
        })?;
        let host = url
            .host_str()
            .ok_or_else(|| DocumentError::UnresolvableMainActivityUri {
                detail: format!("URI [{url}] has no host"),
            })?
            .to_owned();
        let authority = match url.port() {
            Some(port) => format!("{host}:{port}"),
            None => host.clone(),
        };
        if authority != self.config.own_authority && host != self.config.own_authority {
            return Err(DocumentError::MetaBundleNotLocal { authority });
        }
        if !url.path().contains(META_BUNDLE_PATH_PREFIX) {
            return Err(DocumentError::InvalidMetaBundleLocation {
                path: url.path().to_owned(),
            });
        }
        Ok(meta_id.local().to_owned())
    }

    /// POST: the bundle must be named as addressed and must not exist yet.
    fn check_new_document_conditions(
        &self,
        request: &ValidationRequest,
        bundle_local: &str,
    ) -> Result<(), DocumentError> {
        if bundle_local != request.document_id {
            return Err(DocumentError::BundleIdMismatch {
                bundle: bundle_local.to_owned(),
                requested: request.document_id.clone(),
            });
        }
        let key = document_key(&request.organization_id, bundle_local);
        if self.documents.contains(&key) {
            return Err(DocumentError::DuplicateDocument {
                document: bundle_local.to_owned(),
                organization: request.organization_id.clone(),
            });
        }
        Ok(())
    }

    /// PUT: the document must exist and belong to the declared meta-bundle.
    fn check_update_conditions(
        &self,
        request: &ValidationRequest,
        meta_local: &str,
    ) -> Result<(), DocumentError> {
        let key = document_key(&request.organization_id, &request.document_id);
        if !self.documents.contains(&key) {
            return Err(DocumentError::DocumentNotFound {
                document: request.document_id.clone(),
            });
        }
        if !self.meta_bundles.contains(meta_local) {
            return Err(DocumentError::MetaBundleNotFound {
                meta: meta_local.to_owned(),
            });
        }
        if let Some(lineage) = self.lineage {
            if let Some(actual) = lineage.meta_of(&key) {
                if actual != meta_local {
                    return Err(DocumentError::MetaBundleMismatch {
                        document: request.document_id.clone(),
                        actual,
                        declared: meta_local.to_owned(),
                    });
                }
            }
        }
        Ok(())
    }
}

fn advance(state: &mut ValidationState, next: ValidationState) {
    debug!(from = %state, to = %next, "validation state transition");
    *state = next;
}

/// Exactly one activity typed `cpm:mainActivity`.
fn retrieve_main_activity(bundle: &Bundle) -> Result<&Element, DocumentError> {
    let mut main = None;
    for activity in bundle.activities() {
        if activity.has_type(&vocab::cpm_main_activity()) {
            if main.is_some() {
                return Err(DocumentError::MultipleMainActivities {
                    bundle: bundle.identifier().local().to_owned(),
                });
            }
            main = Some(activity);
        }
    }
    main.ok_or_else(|| DocumentError::NoMainActivity {
        bundle: bundle.identifier().local().to_owned(),
    })
}

fn connector_attributes_complete(connector: &Element) -> bool {
    vocab::connector_mandatory_attributes()
        .iter()
        .all(|key| connector.attributes().contains_key(key))
}

/// Every element identifier must carry a declared namespace and every
/// namespace URI must end in `/` or `#`.
fn namespaces_valid(document: &Document, bundle: &Bundle) -> bool {
    let known = [
        vocab::PROV_URI,
        vocab::CPM_URI,
        vocab::PAV_URI,
        vocab::DCT_URI,
        vocab::XSD_URI,
    ];
    for uri in bundle.namespaces().values() {
        if !has_terminal_separator(uri) {
            return false;
        }
    }
    for element in bundle.elements() {
        let namespace = element.id().namespace_uri();
        if namespace.is_empty() || !has_terminal_separator(namespace) {
            return false;
        }
        let declared = bundle.declares_namespace_uri(namespace)
            || document.namespaces().values().any(|uri| uri == namespace)
            || known.contains(&namespace);
        if !declared {
            return false;
        }
    }
    true
}

fn has_terminal_separator(uri: &str) -> bool {
    uri.ends_with('/') || uri.ends_with('#')
}
