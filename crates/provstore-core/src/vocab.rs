//! CPM, PROV, PAV and DCT vocabulary.
//!
//! Namespace URIs and qualified-name constants shared by the classifier,
//! the constraint checker and the meta-provenance builder. The CPM
//! namespace is normative; records are recognized as backbone elements by
//! these exact URIs, never by prefix.

use crate::graph::{Namespace, QualifiedName};

/// CPM namespace URI (normative).
pub const CPM_URI: &str = "https://www.commonprovenancemodel.org/cpm-namespace-v1-0/";
/// W3C PROV namespace URI.
pub const PROV_URI: &str = "http://www.w3.org/ns/prov#";
/// PAV (Provenance, Authoring and Versioning) namespace URI.
pub const PAV_URI: &str = "http://purl.org/pav/";
/// Dublin Core terms namespace URI.
pub const DCT_URI: &str = "http://purl.org/dc/terms/";
/// XML Schema datatypes namespace URI.
pub const XSD_URI: &str = "http://www.w3.org/2001/XMLSchema#";

/// The `cpm` namespace.
#[must_use]
pub fn cpm() -> Namespace {
    Namespace::new("cpm", CPM_URI)
}

/// The `prov` namespace.
#[must_use]
pub fn prov() -> Namespace {
    Namespace::new("prov", PROV_URI)
}

/// The `pav` namespace.
#[must_use]
pub fn pav() -> Namespace {
    Namespace::new("pav", PAV_URI)
}

/// The `dct` namespace.
#[must_use]
pub fn dct() -> Namespace {
    Namespace::new("dct", DCT_URI)
}

/// `prov:type` — the attribute carrying asserted record types.
#[must_use]
pub fn prov_type() -> QualifiedName {
    prov().qualified("type")
}

/// `prov:Bundle` — the type of general and concrete document entities in
/// the meta-provenance graph.
#[must_use]
pub fn prov_bundle() -> QualifiedName {
    prov().qualified("Bundle")
}

/// `prov:revisionOf` — the derivation type linking consecutive concrete
/// versions of the same general document entity.
#[must_use]
pub fn prov_revision_of() -> QualifiedName {
    prov().qualified("revisionOf")
}

/// `cpm:mainActivity`.
#[must_use]
pub fn cpm_main_activity() -> QualifiedName {
    cpm().qualified("mainActivity")
}

/// `cpm:forwardConnector`.
#[must_use]
pub fn cpm_forward_connector() -> QualifiedName {
    cpm().qualified("forwardConnector")
}

/// `cpm:backwardConnector`.
#[must_use]
pub fn cpm_backward_connector() -> QualifiedName {
    cpm().qualified("backwardConnector")
}

/// `cpm:senderAgent`.
#[must_use]
pub fn cpm_sender_agent() -> QualifiedName {
    cpm().qualified("senderAgent")
}

/// `cpm:receiverAgent`.
#[must_use]
pub fn cpm_receiver_agent() -> QualifiedName {
    cpm().qualified("receiverAgent")
}

/// `cpm:id`.
#[must_use]
pub fn cpm_id() -> QualifiedName {
    cpm().qualified("id")
}

/// `cpm:referencedBundleId` — connector reference to the remote bundle.
#[must_use]
pub fn cpm_referenced_bundle_id() -> QualifiedName {
    cpm().qualified("referencedBundleId")
}

/// `cpm:referencedMetaBundleId` — connector / main-activity reference to
/// the meta-bundle.
#[must_use]
pub fn cpm_referenced_meta_bundle_id() -> QualifiedName {
    cpm().qualified("referencedMetaBundleId")
}

/// `cpm:referencedBundleHashValue` — claimed digest of the remote bundle.
#[must_use]
pub fn cpm_referenced_bundle_hash_value() -> QualifiedName {
    cpm().qualified("referencedBundleHashValue")
}

/// `cpm:hashAlg` — algorithm of the claimed digest (e.g. `"SHA256"`).
#[must_use]
pub fn cpm_hash_alg() -> QualifiedName {
    cpm().qualified("hashAlg")
}

/// `cpm:token` — type of the attestation entity in the meta-provenance
/// graph.
#[must_use]
pub fn cpm_token() -> QualifiedName {
    cpm().qualified("token")
}

/// `cpm:tokenGeneration` — type of the synthetic token-issuing activity.
#[must_use]
pub fn cpm_token_generation() -> QualifiedName {
    cpm().qualified("tokenGeneration")
}

/// `cpm:trustedParty` — type of the issuing authority agent.
#[must_use]
pub fn cpm_trusted_party() -> QualifiedName {
    cpm().qualified("trustedParty")
}

/// `cpm:trustedPartyUri`.
#[must_use]
pub fn cpm_trusted_party_uri() -> QualifiedName {
    cpm().qualified("trustedPartyUri")
}

/// `cpm:trustedPartyCertificate`.
#[must_use]
pub fn cpm_trusted_party_certificate() -> QualifiedName {
    cpm().qualified("trustedPartyCertificate")
}

/// `pav:version` — monotonically increasing version number on concrete
/// document entities.
#[must_use]
pub fn pav_version() -> QualifiedName {
    pav().qualified("version")
}

/// `dct:hasPart` — the one non-CPM attribute tolerated on backbone
/// elements.
#[must_use]
pub fn dct_has_part() -> QualifiedName {
    dct().qualified("hasPart")
}

/// The four mandatory reference attributes of a connector. A connector
/// missing any of these is invalid regardless of other checks.
#[must_use]
pub fn connector_mandatory_attributes() -> [QualifiedName; 4] {
    [
        cpm_referenced_bundle_id(),
        cpm_referenced_meta_bundle_id(),
        cpm_referenced_bundle_hash_value(),
        cpm_hash_alg(),
    ]
}

/// The CPM types that mark an element as part of the backbone.
#[must_use]
pub fn backbone_types() -> [QualifiedName; 6] {
    [
        cpm_forward_connector(),
        cpm_backward_connector(),
        cpm_main_activity(),
        cpm_sender_agent(),
        cpm_receiver_agent(),
        cpm_id(),
    ]
}
