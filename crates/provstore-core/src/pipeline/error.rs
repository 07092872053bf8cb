//! Document validation errors.

use thiserror::Error;

use crate::codec::CodecError;
use crate::constraints::CpmViolation;
use crate::resolver::ResolveError;

/// How the HTTP layer should classify a rejection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Client-fixable data fault (400).
    Client,
    /// The addressed document or meta-bundle does not exist (404).
    NotFound,
    /// The document already exists (409).
    Conflict,
    /// The request cannot be safely interpreted (500).
    Unresolvable,
}

/// A rejected document.
///
/// Every variant's `Display` text is reused verbatim in the HTTP response
/// body; the validation pipeline short-circuits on the first error and the
/// stored document is never persisted unless the whole pipeline accepts.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum DocumentError {
    /// The payload is not valid base64 or not parseable in its declared
    /// format.
    #[error(transparent)]
    Parse(#[from] CodecError),

    /// The document contains no bundle.
    #[error("There are no bundles inside the document!")]
    HasNoBundles,

    /// The document contains more than one bundle.
    #[error("Only one bundle expected in document!")]
    TooManyBundles,

    /// No activity is typed `cpm:mainActivity`.
    #[error("No 'mainActivity' activity specified inside of bundle [{bundle}]")]
    NoMainActivity {
        /// Local name of the bundle.
        bundle: String,
    },

    /// More than one activity is typed `cpm:mainActivity`.
    #[error("Multiple 'mainActivity' activities specified inside of bundle [{bundle}]")]
    MultipleMainActivities {
        /// Local name of the bundle.
        bundle: String,
    },

    /// The main activity lacks its meta-bundle reference.
    #[error("Main activity missing required attribute 'cpm:referencedMetaBundleId'.")]
    MissingMetaBundleReference,

    /// The declared meta-bundle lives on a different storage node.
    #[error(
        "Main activity URI is expected to be local to this server's IP address, however it resolved to [{authority}]"
    )]
    MetaBundleNotLocal {
        /// Authority the reference resolved to.
        authority: String,
    },

    /// The declared meta-bundle URI does not point into the meta-bundle
    /// location.
    #[error(
        "Main activity URI is not a valid metabundle location: [{path}]. Expected: /api/v1/documents/meta/"
    )]
    InvalidMetaBundleLocation {
        /// Path of the offending URI.
        path: String,
    },

    /// The main activity's meta-bundle reference cannot be interpreted.
    #[error("Main activity URI cannot be resolved: {detail}")]
    UnresolvableMainActivityUri {
        /// Why the URI cannot be interpreted.
        detail: String,
    },

    /// A backward connector lacks one of its four mandatory attributes.
    #[error("Backward connector(s) is/are missing mandatory attributes.")]
    BackwardConnectorAttributesMissing,

    /// A forward connector lacks one of its four mandatory attributes.
    #[error("Forward connector(s) is/are missing mandatory attributes.")]
    ForwardConnectorAttributesMissing,

    /// The bundle is named differently than the request addressed it.
    #[error("The bundle id [{bundle}] does not match the specified id [{requested}] from query.")]
    BundleIdMismatch {
        /// Local name of the submitted bundle.
        bundle: String,
        /// Document id from the request path.
        requested: String,
    },

    /// A document with this id is already stored.
    #[error("Document with id [{document}] already exists under organization [{organization}].")]
    DuplicateDocument {
        /// The duplicated document id.
        document: String,
        /// The owning organization.
        organization: String,
    },

    /// An update addressed a document that is not stored.
    #[error(
        "Document with id [{document}] does not exist. Please check whether the ID you have given is correct."
    )]
    DocumentNotFound {
        /// The missing document id.
        document: String,
    },

    /// An update declared a meta-bundle that does not exist.
    #[error("Meta provenance with id [{meta}] does not exist!")]
    MetaBundleNotFound {
        /// The missing meta-bundle id.
        meta: String,
    },

    /// An update declared a different meta-bundle than the stored lineage.
    #[error(
        "Graph with id [{document}] is part of meta bundle with id [{actual}], however main_activity from given bundle is resolvable to different id [{declared}]"
    )]
    MetaBundleMismatch {
        /// The updated document id.
        document: String,
        /// Meta-bundle the stored lineage places the document in.
        actual: String,
        /// Meta-bundle the submitted main activity declares.
        declared: String,
    },

    /// A connector reference failed to resolve or verify.
    #[error(transparent)]
    ConnectorReference(#[from] ResolveError),

    /// A CPM constraint was violated.
    #[error(transparent)]
    Constraint(#[from] CpmViolation),

    /// An element identifier is outside every declared namespace, or a
    /// namespace URI has no terminal separator.
    #[error(
        "The bundle with id [{bundle}] does not have all namespaces defined or some id is not in namespace."
    )]
    NamespaceViolation {
        /// Local name of the bundle.
        bundle: String,
    },

    /// The pluggable PROV validity check failed.
    #[error("The bundle with id [{bundle}] is not valid according to PROV standard.")]
    ProvInvalid {
        /// Local name of the bundle.
        bundle: String,
    },

    /// Pass-through failure from the organization registry.
    #[error(
        "Organization with id [{organization}] is not registered! Please register your organization first."
    )]
    OrganizationNotRegistered {
        /// The unknown organization.
        organization: String,
    },

    /// Pass-through failure: the organization's trusted party has not been
    /// verified yet.
    #[error(
        "Trusted party for organization with id [{organization}] has not yet been checked for its validity. Please be patient."
    )]
    UncheckedTrustedParty {
        /// The affected organization.
        organization: String,
    },

    /// Pass-through failure: the organization's trusted party failed
    /// verification.
    #[error(
        "Trusted party for organization with id [{organization}] has been checked and is not considered valid. For more information contact administrator."
    )]
    InvalidTrustedParty {
        /// The affected organization.
        organization: String,
    },
}

impl DocumentError {
    /// The HTTP-layer classification of this rejection.
    #[must_use]
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::DocumentNotFound { .. }
            | Self::MetaBundleNotFound { .. }
            | Self::OrganizationNotRegistered { .. }
            | Self::UncheckedTrustedParty { .. }
            | Self::InvalidTrustedParty { .. } => ErrorClass::NotFound,
            Self::DuplicateDocument { .. } => ErrorClass::Conflict,
            Self::UnresolvableMainActivityUri { .. }
            | Self::ConnectorReference(ResolveError::Unresolvable { .. }) => {
                ErrorClass::Unresolvable
            }
            _ => ErrorClass::Client,
        }
    }
}
