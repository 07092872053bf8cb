//! Tests for the meta-provenance builder.

use std::sync::Arc;

use super::{
    general_entity_local, FoldRequest, MemoryMetaStore, MetaError, MetaProvenanceBuilder,
    MetaStore,
};
use crate::graph::{AttrValue, QualifiedName, Relation};
use crate::index::MetaLineageIndex;
use crate::testutil::meta_ns;
use crate::token::{DisabledTrustedParty, TokenPayloadType, TokenRequest, TrustedParty};
use crate::vocab;

fn meta_id() -> QualifiedName {
    meta_ns("hospital").qualified("test_meta")
}

fn token_for(version_bundle: &str) -> crate::token::SignedToken {
    DisabledTrustedParty::new()
        .issue_token(&TokenRequest {
            organization_id: "org".to_owned(),
            document: format!("payload-of-{version_bundle}"),
            document_format: "json".to_owned(),
            payload_type: TokenPayloadType::Graph,
            graph_id: version_bundle.to_owned(),
            created_on: 1_736_175_000,
        })
        .unwrap()
}

fn initial_request(bundle_local: &str) -> FoldRequest {
    FoldRequest {
        meta_id: meta_id(),
        organization_id: "org".to_owned(),
        bundle_local: bundle_local.to_owned(),
        document_id: bundle_local.to_owned(),
        is_update: false,
        token: token_for(bundle_local),
    }
}

fn update_request(previous_local: &str, new_local: &str) -> FoldRequest {
    FoldRequest {
        meta_id: meta_id(),
        organization_id: "org".to_owned(),
        bundle_local: new_local.to_owned(),
        document_id: previous_local.to_owned(),
        is_update: true,
        token: token_for(new_local),
    }
}

fn revision_edges(bundle: &crate::graph::Bundle) -> Vec<(&QualifiedName, &QualifiedName)> {
    bundle
        .relations()
        .iter()
        .filter_map(|relation| match relation {
            Relation::Derivation {
                generated,
                used,
                attributes,
                ..
            } if attributes.contains(
                &vocab::prov_type(),
                &AttrValue::Qualified(vocab::prov_revision_of()),
            ) =>
            {
                Some((generated, used))
            }
            _ => None,
        })
        .collect()
}

#[test]
fn general_entity_id_drops_version_token() {
    assert_eq!(
        general_entity_local("org_test_1000_bundle"),
        "org_test_bundle_gen"
    );
    assert_eq!(general_entity_local("org_bundle"), "org_gen");
}

#[test]
fn initial_fold_creates_general_and_first_version() {
    let store = MemoryMetaStore::new();
    let builder = MetaProvenanceBuilder::new(&store);

    let outcome = builder.fold(&initial_request("test_1000_bundle")).unwrap();
    assert_eq!(outcome.general_entity, "org_test_bundle_gen");
    assert_eq!(outcome.version_entity, "org_test_1000_bundle");
    assert_eq!(outcome.version, 1);

    let bundle = store.snapshot("test_meta").unwrap();
    let general = bundle.element_by_local("org_test_bundle_gen").unwrap();
    assert!(general.has_type(&vocab::prov_bundle()));

    let first = bundle.element_by_local("org_test_1000_bundle").unwrap();
    assert_eq!(
        first.attributes().first(&vocab::pav_version()),
        Some(&AttrValue::Int(1))
    );

    let specializations = bundle
        .relations()
        .iter()
        .filter(|relation| matches!(relation, Relation::Specialization { .. }))
        .count();
    assert_eq!(specializations, 1);
    assert!(revision_edges(&bundle).is_empty());
}

#[test]
fn update_fold_attaches_next_version_and_revision_edge() {
    let store = MemoryMetaStore::new();
    let builder = MetaProvenanceBuilder::new(&store);

    builder.fold(&initial_request("test_1000_bundle")).unwrap();
    let outcome = builder
        .fold(&update_request("test_1000_bundle", "test_1001_bundle"))
        .unwrap();
    assert_eq!(outcome.version, 2);
    assert_eq!(outcome.general_entity, "org_test_bundle_gen");

    let bundle = store.snapshot("test_meta").unwrap();
    let second = bundle.element_by_local("org_test_1001_bundle").unwrap();
    assert_eq!(
        second.attributes().first(&vocab::pav_version()),
        Some(&AttrValue::Int(2))
    );

    let revisions = revision_edges(&bundle);
    assert_eq!(revisions.len(), 1);
    assert_eq!(revisions[0].0.local(), "org_test_1001_bundle");
    assert_eq!(revisions[0].1.local(), "org_test_1000_bundle");
}

#[test]
fn version_numbers_are_monotonic_across_n_updates() {
    let store = MemoryMetaStore::new();
    let builder = MetaProvenanceBuilder::new(&store);

    builder.fold(&initial_request("test_1000_bundle")).unwrap();
    let mut previous = "test_1000_bundle".to_owned();
    for n in 1..=3 {
        let next = format!("test_100{n}_bundle");
        let outcome = builder.fold(&update_request(&previous, &next)).unwrap();
        assert_eq!(outcome.version, i64::from(n) + 1);
        previous = next;
    }

    let bundle = store.snapshot("test_meta").unwrap();
    let mut versions: Vec<i64> = bundle
        .entities()
        .filter_map(|entity| {
            entity
                .attributes()
                .first(&vocab::pav_version())
                .and_then(AttrValue::as_int)
        })
        .collect();
    versions.sort_unstable();
    assert_eq!(versions, vec![1, 2, 3, 4]);
    // N versions, N-1 revision edges between consecutive versions.
    assert_eq!(revision_edges(&bundle).len(), 3);
}

#[test]
fn one_meta_bundle_tracks_several_logical_documents() {
    let store = MemoryMetaStore::new();
    let builder = MetaProvenanceBuilder::new(&store);

    builder.fold(&initial_request("doc_a_1000_bundle")).unwrap();
    builder.fold(&initial_request("doc_b_1000_bundle")).unwrap();

    let bundle = store.snapshot("test_meta").unwrap();
    assert!(bundle.element_by_local("org_doc_a_bundle_gen").is_some());
    assert!(bundle.element_by_local("org_doc_b_bundle_gen").is_some());

    // No concrete version specializes two generals.
    for entity in bundle.entities() {
        let generals = bundle
            .relations()
            .iter()
            .filter(|relation| {
                matches!(relation, Relation::Specialization { specific, .. }
                    if specific == entity.id())
            })
            .count();
        assert!(generals <= 1, "entity {} specializes {generals}", entity.id());
    }
}

#[test]
fn token_subgraph_is_attached_per_version() {
    let store = MemoryMetaStore::new();
    let builder = MetaProvenanceBuilder::new(&store);
    builder.fold(&initial_request("test_1000_bundle")).unwrap();

    let bundle = store.snapshot("test_meta").unwrap();
    let token_entity = bundle
        .element_by_local("org_test_1000_bundle_token")
        .unwrap();
    assert!(token_entity.has_type(&vocab::cpm_token()));
    let cpm = vocab::cpm();
    assert_eq!(
        token_entity
            .attributes()
            .first(&cpm.qualified("originatorId")),
        Some(&AttrValue::Str("org".to_owned()))
    );
    assert!(token_entity
        .attributes()
        .contains_key(&cpm.qualified("documentDigest")));

    let activity = bundle
        .element_by_local("org_test_1000_bundle_tokenGeneration")
        .unwrap();
    assert!(activity.has_type(&vocab::cpm_token_generation()));
    assert_eq!(activity.start_time(), activity.end_time());

    let agent = bundle
        .element_by_local(DisabledTrustedParty::AUTHORITY_ID)
        .unwrap();
    assert!(agent.has_type(&vocab::cpm_trusted_party()));

    // Generation, usage, association and attribution edges all anchor the
    // token subgraph.
    let has = |predicate: &dyn Fn(&Relation) -> bool| bundle.relations().iter().any(|r| predicate(r));
    assert!(has(&|r| matches!(r, Relation::Generation { entity, .. }
        if entity.local() == "org_test_1000_bundle_token")));
    assert!(has(&|r| matches!(r, Relation::Usage { entity, .. }
        if entity.local() == "org_test_1000_bundle")));
    assert!(has(&|r| matches!(r, Relation::Association { .. })));
    assert!(has(&|r| matches!(r, Relation::Attribution { entity, .. }
        if entity.local() == "org_test_1000_bundle_token")));
}

#[test]
fn trusted_party_agent_is_reused_across_versions() {
    let store = MemoryMetaStore::new();
    let builder = MetaProvenanceBuilder::new(&store);
    builder.fold(&initial_request("test_1000_bundle")).unwrap();
    builder
        .fold(&update_request("test_1000_bundle", "test_1001_bundle"))
        .unwrap();

    let bundle = store.snapshot("test_meta").unwrap();
    let agents = bundle
        .agents()
        .filter(|agent| agent.has_type(&vocab::cpm_trusted_party()))
        .count();
    assert_eq!(agents, 1);
}

#[test]
fn update_of_untracked_meta_bundle_fails() {
    let store = MemoryMetaStore::new();
    let builder = MetaProvenanceBuilder::new(&store);
    let err = builder
        .fold(&update_request("test_1000_bundle", "test_1001_bundle"))
        .unwrap_err();
    assert_eq!(
        err,
        MetaError::MetaBundleNotFound {
            meta: "test_meta".to_owned()
        }
    );
}

#[test]
fn update_of_untracked_document_fails_without_partial_write() {
    let store = MemoryMetaStore::new();
    let builder = MetaProvenanceBuilder::new(&store);
    builder.fold(&initial_request("test_1000_bundle")).unwrap();
    let before = store.snapshot("test_meta").unwrap();

    let err = builder
        .fold(&update_request("never_stored_bundle", "test_1001_bundle"))
        .unwrap_err();
    assert!(matches!(err, MetaError::DocumentNotTracked { .. }));

    let after = store.snapshot("test_meta").unwrap();
    assert!(before.structurally_equals(&after));
}

#[test]
fn lineage_index_answers_meta_membership() {
    let store = MemoryMetaStore::new();
    let builder = MetaProvenanceBuilder::new(&store);
    builder.fold(&initial_request("test_1000_bundle")).unwrap();

    assert_eq!(
        store.meta_of("org_test_1000_bundle"),
        Some("test_meta".to_owned())
    );
    assert_eq!(store.meta_of("org_unknown_bundle"), None);
}

#[test]
fn concurrent_updates_are_serialized_per_meta_bundle() {
    let store = Arc::new(MemoryMetaStore::new());
    MetaProvenanceBuilder::new(store.as_ref())
        .fold(&initial_request("test_1000_bundle"))
        .unwrap();

    let mut handles = Vec::new();
    for n in 0..4 {
        let store = Arc::clone(&store);
        handles.push(std::thread::spawn(move || {
            let builder = MetaProvenanceBuilder::new(store.as_ref());
            builder
                .fold(&update_request(
                    "test_1000_bundle",
                    &format!("test_rev{n}_bundle"),
                ))
                .map(|outcome| outcome.version)
        }));
    }
    let mut versions: Vec<i64> = handles
        .into_iter()
        .map(|handle| handle.join().expect("fold thread panicked").unwrap())
        .collect();
    versions.sort_unstable();
    // Four racing updates must receive four distinct version numbers.
    assert_eq!(versions, vec![2, 3, 4, 5]);
}
