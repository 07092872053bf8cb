//! Meta-provenance lineage builder.
//!
//! Every accepted document is folded into a shared, append-only
//! meta-provenance bundle keyed by the meta-bundle id its main activity
//! declared. The fold maintains, per logical document:
//!
//! ```text
//! general entity  (prov:type = prov:Bundle, created once)
//!   ^ specializationOf            ^ specializationOf
//! concrete v1 (pav:version = 1)  concrete v2 (pav:version = 2)
//!   ^------- wasDerivedFrom (prov:revisionOf) -------|
//! ```
//!
//! plus, per concrete version, the attestation subgraph: a token entity
//! generated by a synthetic token-generation activity associated and
//! attributed to the issuing trusted-party agent.
//!
//! The fold's read-then-write (find max version, write version + 1) runs
//! inside the store's critical section for the meta-bundle id; two racing
//! folds into the same lineage can never allocate the same version number.

mod store;

#[cfg(test)]
mod tests;

use chrono::DateTime;
use thiserror::Error;
use tracing::debug;

use crate::graph::{AttrValue, Attributes, Bundle, Namespace, QualifiedName};
use crate::index::document_key;
use crate::token::SignedToken;
use crate::vocab;

pub use store::{MemoryMetaStore, MetaStore};

/// Errors raised while folding a document into its meta-provenance graph.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum MetaError {
    /// An update referenced a meta-bundle this node does not hold.
    #[error("Meta provenance with id [{meta}] does not exist!")]
    MetaBundleNotFound {
        /// The missing meta-bundle id.
        meta: String,
    },

    /// An update referenced a document the meta-bundle does not track.
    #[error("Document entity [{entity}] is not tracked by the meta bundle.")]
    DocumentNotTracked {
        /// The missing concrete entity id.
        entity: String,
    },

    /// The stored lineage is inconsistent (e.g. a concrete version
    /// specializing more than one general entity).
    #[error("Meta provenance lineage is corrupt: {detail}")]
    CorruptLineage {
        /// What is inconsistent.
        detail: String,
    },
}

/// One accepted document to fold into the lineage.
#[derive(Debug, Clone)]
pub struct FoldRequest {
    /// Qualified id of the meta-bundle, as declared by the main activity.
    pub meta_id: QualifiedName,
    /// The submitting organization.
    pub organization_id: String,
    /// Local name of the newly stored bundle (the new concrete version).
    pub bundle_local: String,
    /// Document id the request addressed; for updates this names the
    /// previously stored version.
    pub document_id: String,
    /// Whether this fold is an update of an existing document.
    pub is_update: bool,
    /// The signed attestation issued for the stored document.
    pub token: SignedToken,
}

/// What a fold produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FoldOutcome {
    /// Local id of the general (logical) document entity.
    pub general_entity: String,
    /// Local id of the newly created concrete version entity.
    pub version_entity: String,
    /// The `pav:version` assigned to the new concrete entity.
    pub version: i64,
}

/// Folds accepted documents into their meta-provenance bundles.
pub struct MetaProvenanceBuilder<'a> {
    store: &'a dyn MetaStore,
}

impl<'a> MetaProvenanceBuilder<'a> {
    /// Creates a builder over the given store.
    #[must_use]
    pub fn new(store: &'a dyn MetaStore) -> Self {
        Self { store }
    }

    /// Folds one accepted document into its meta-bundle.
    ///
    /// # Errors
    ///
    /// Returns a [`MetaError`] when an update addresses a meta-bundle or
    /// document entity this node does not track, or when the stored
    /// lineage is inconsistent.
    pub fn fold(&self, request: &FoldRequest) -> Result<FoldOutcome, MetaError> {
        let create_if_missing = !request.is_update;
        self.store
            .with_bundle_mut(&request.meta_id, create_if_missing, &mut |bundle| {
                let outcome = if request.is_update {
                    apply_update(bundle, request)?
                } else {
                    apply_initial(bundle, request)?
                };
                attach_token(bundle, request, &outcome);
                debug!(
                    meta = %request.meta_id.local(),
                    general = %outcome.general_entity,
                    version = outcome.version,
                    "folded document into meta provenance"
                );
                Ok(outcome)
            })
    }
}

/// Local id of the general entity for a concrete entity id: the
/// second-to-last `_`-separated token (the version token under the
/// `name_version_suffix` convention) is dropped and `_gen` appended.
#[must_use]
pub fn general_entity_local(concrete: &str) -> String {
    let mut parts: Vec<&str> = concrete.rsplitn(3, '_').collect();
    parts.reverse();
    let stem = match parts.as_slice() {
        [head, _version, last] => format!("{head}_{last}"),
        [head, _version] => (*head).to_owned(),
        _ => concrete.to_owned(),
    };
    format!("{stem}_gen")
}

fn meta_namespace(meta_id: &QualifiedName) -> Namespace {
    Namespace::new(meta_id.prefix(), meta_id.namespace_uri())
}

fn bundle_type_attributes() -> Attributes {
    Attributes::from_pairs([(
        vocab::prov_type(),
        AttrValue::Qualified(vocab::prov_bundle()),
    )])
}

/// POST: create (or reuse) the general entity and attach version 1.
fn apply_initial(bundle: &mut Bundle, request: &FoldRequest) -> Result<FoldOutcome, MetaError> {
    let ns = meta_namespace(&request.meta_id);
    let concrete_local = document_key(&request.organization_id, &request.bundle_local);
    let general_local = general_entity_local(&concrete_local);

    let general_id = ns.qualified(general_local.clone());
    if bundle.element(&general_id).is_none() {
        bundle.entity(general_id.clone(), bundle_type_attributes());
    }

    let mut attributes = bundle_type_attributes();
    attributes.insert(vocab::pav_version(), AttrValue::Int(1));
    let concrete_id = ns.qualified(concrete_local.clone());
    bundle.entity(concrete_id.clone(), attributes);
    bundle.specialization_of(concrete_id, general_id);

    Ok(FoldOutcome {
        general_entity: general_local,
        version_entity: concrete_local,
        version: 1,
    })
}

/// PUT: attach a new concrete version to the existing lineage and link it
/// to its predecessor with a revision derivation.
fn apply_update(bundle: &mut Bundle, request: &FoldRequest) -> Result<FoldOutcome, MetaError> {
    let ns = meta_namespace(&request.meta_id);
    let updated_local = document_key(&request.organization_id, &request.document_id);
    let updated_id = ns.qualified(updated_local.clone());

    if bundle.element(&updated_id).is_none() {
        return Err(MetaError::DocumentNotTracked {
            entity: updated_local,
        });
    }

    // The entity under update points at exactly one general entity.
    let generals: Vec<QualifiedName> = bundle
        .relations()
        .iter()
        .filter_map(|relation| match relation {
            crate::graph::Relation::Specialization {
                specific, general, ..
            } if *specific == updated_id => Some(general.clone()),
            _ => None,
        })
        .collect();
    let general_id = match generals.as_slice() {
        [general] => general.clone(),
        _ => {
            return Err(MetaError::CorruptLineage {
                detail: format!(
                    "entity [{updated_local}] specializes {} general entities",
                    generals.len()
                ),
            });
        }
    };

    // Latest version among every concrete entity of this general.
    let mut latest: Option<(QualifiedName, i64)> = None;
    for relation in bundle.relations() {
        if let crate::graph::Relation::Specialization {
            specific, general, ..
        } = relation
        {
            if *general != general_id {
                continue;
            }
            let version = bundle
                .element(specific)
                .and_then(|element| element.attributes().first(&vocab::pav_version()))
                .and_then(AttrValue::as_int)
                .ok_or_else(|| MetaError::CorruptLineage {
                    detail: format!("concrete entity [{specific}] has no pav:version"),
                })?;
            if latest.as_ref().map_or(true, |(_, max)| version > *max) {
                latest = Some((specific.clone(), version));
            }
        }
    }
    let Some((latest_id, latest_version)) = latest else {
        return Err(MetaError::CorruptLineage {
            detail: format!("general entity [{general_id}] has no concrete versions"),
        });
    };

    let concrete_local = document_key(&request.organization_id, &request.bundle_local);
    let concrete_id = ns.qualified(concrete_local.clone());
    let latest_attributes = bundle
        .element(&latest_id)
        .map(|element| element.attributes().clone())
        .unwrap_or_default();
    let mut attributes = latest_attributes;
    attributes.remove(&vocab::pav_version());
    attributes.insert(vocab::pav_version(), AttrValue::Int(latest_version + 1));

    bundle.entity(concrete_id.clone(), attributes);
    bundle.specialization_of(concrete_id.clone(), general_id.clone());
    bundle.derivation(
        concrete_id,
        latest_id,
        Attributes::from_pairs([(
            vocab::prov_type(),
            AttrValue::Qualified(vocab::prov_revision_of()),
        )]),
    );

    Ok(FoldOutcome {
        general_entity: general_id.local().to_owned(),
        version_entity: concrete_local,
        version: latest_version + 1,
    })
}

/// Attaches the token subgraph to the new concrete version.
fn attach_token(bundle: &mut Bundle, request: &FoldRequest, outcome: &FoldOutcome) {
    let ns = meta_namespace(&request.meta_id);
    let token = &request.token;
    let version_id = ns.qualified(outcome.version_entity.clone());

    let cpm = vocab::cpm();
    let mut token_attributes = Attributes::from_pairs([
        (vocab::prov_type(), AttrValue::Qualified(vocab::cpm_token())),
        (
            cpm.qualified("originatorId"),
            AttrValue::Str(token.data.originator_id.clone()),
        ),
        (
            cpm.qualified("authorityId"),
            AttrValue::Str(token.data.authority_id.clone()),
        ),
        (
            cpm.qualified("tokenTimestamp"),
            AttrValue::Int(token.data.token_timestamp),
        ),
        (
            cpm.qualified("documentCreationTimestamp"),
            AttrValue::Int(token.data.document_creation_timestamp),
        ),
        (
            cpm.qualified("documentDigest"),
            AttrValue::Str(token.data.document_digest.clone()),
        ),
        (
            cpm.qualified("hashFunction"),
            AttrValue::Str(token.data.additional_data.hash_function.clone()),
        ),
        (
            cpm.qualified("signature"),
            AttrValue::Str(token.signature.clone()),
        ),
    ]);
    if let Some(bundle_uri) = &token.data.additional_data.bundle {
        token_attributes.insert(cpm.qualified("bundle"), AttrValue::Str(bundle_uri.clone()));
    }
    if let Some(tp_uri) = &token.data.additional_data.trusted_party_uri {
        token_attributes.insert(
            vocab::cpm_trusted_party_uri(),
            AttrValue::Str(tp_uri.clone()),
        );
    }
    let token_id = ns.qualified(format!("{}_token", outcome.version_entity));
    bundle.entity(token_id.clone(), token_attributes);

    // The issuing agent is shared across every token the same authority
    // signed into this meta-bundle.
    let agent_id = ns.qualified(token.data.authority_id.clone());
    if bundle.element(&agent_id).is_none() {
        let mut agent_attributes = Attributes::from_pairs([(
            vocab::prov_type(),
            AttrValue::Qualified(vocab::cpm_trusted_party()),
        )]);
        if let Some(tp_uri) = &token.data.additional_data.trusted_party_uri {
            agent_attributes.insert(
                vocab::cpm_trusted_party_uri(),
                AttrValue::Str(tp_uri.clone()),
            );
        }
        if let Some(certificate) = &token.data.additional_data.trusted_party_certificate {
            agent_attributes.insert(
                vocab::cpm_trusted_party_certificate(),
                AttrValue::Str(certificate.clone()),
            );
        }
        bundle.agent(agent_id.clone(), agent_attributes);
    }

    let issued_at = DateTime::from_timestamp(token.data.token_timestamp, 0)
        .unwrap_or(chrono::DateTime::UNIX_EPOCH);
    let activity_id = ns.qualified(format!("{}_tokenGeneration", outcome.version_entity));
    bundle.activity(
        activity_id.clone(),
        Some(issued_at),
        Some(issued_at),
        Attributes::from_pairs([(
            vocab::prov_type(),
            AttrValue::Qualified(vocab::cpm_token_generation()),
        )]),
    );

    bundle.used(activity_id.clone(), version_id, Some(issued_at));
    bundle.was_associated_with(activity_id.clone(), agent_id.clone());
    bundle.was_generated_by(token_id.clone(), activity_id, Some(issued_at));
    bundle.was_attributed_to(token_id, agent_id);
}
