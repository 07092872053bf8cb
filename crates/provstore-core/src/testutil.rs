//! Shared fixture builders for unit tests.
//!
//! Every builder constructs a fresh bundle per call; no fixture state is
//! shared across tests.

use chrono::{TimeZone, Utc};

use crate::graph::{AttrValue, Attributes, Bundle, Element, Namespace, QualifiedName};
use crate::vocab;

/// Namespace a storage node serves organization documents under.
pub fn storage_ns(storage: &str, org: &str) -> Namespace {
    Namespace::new(
        storage,
        format!("http://prov-storage-{storage}:8000/api/v1/organizations/{org}/documents/"),
    )
}

/// Namespace a storage node serves meta-bundles under.
pub fn meta_ns(storage: &str) -> Namespace {
    Namespace::new(
        "meta",
        format!("http://prov-storage-{storage}:8000/api/v1/documents/meta/"),
    )
}

/// The four mandatory connector reference attributes plus the connector
/// type tag.
pub fn connector_attributes(
    connector_type: QualifiedName,
    referenced_bundle: QualifiedName,
    referenced_meta: QualifiedName,
    hash_value: &str,
    hash_alg: &str,
) -> Attributes {
    Attributes::from_pairs([
        (vocab::prov_type(), AttrValue::Qualified(connector_type)),
        (
            vocab::cpm_referenced_bundle_id(),
            AttrValue::Qualified(referenced_bundle),
        ),
        (
            vocab::cpm_referenced_meta_bundle_id(),
            AttrValue::Qualified(referenced_meta),
        ),
        (
            vocab::cpm_referenced_bundle_hash_value(),
            AttrValue::Str(hash_value.to_owned()),
        ),
        (vocab::cpm_hash_alg(), AttrValue::Str(hash_alg.to_owned())),
    ])
}

/// A CPM bundle with a main activity, a general forward connector
/// generated by it, a concrete (receiver-attributed, specialized) forward
/// connector, and some domain content.
pub struct ForwardFixture {
    pub bundle: Bundle,
    pub main_activity: QualifiedName,
    pub general_connector: QualifiedName,
    pub concrete_connector: QualifiedName,
    pub receiver_agent: QualifiedName,
    pub domain_entity: QualifiedName,
    pub domain_activity: QualifiedName,
    pub meta_id: QualifiedName,
}

/// Builds the forward-connector fixture for `hospital`/`org`.
pub fn forward_fixture() -> ForwardFixture {
    let hospital = storage_ns("hospital", "org");
    let meta = meta_ns("hospital");
    let mut bundle = Bundle::new(hospital.qualified("test_1000_bundle"));
    bundle.add_namespace("cpm", vocab::CPM_URI);
    bundle.add_namespace("prov", vocab::PROV_URI);
    bundle.add_namespace("meta", meta.uri());
    let ex = bundle.add_namespace("ex", "http://example.com#");
    let remote = bundle.add_namespace(
        "remote_bundle",
        "http://prov-storage-pathology:8000/api/v1/organizations/remote_org/documents/",
    );
    let remote_meta = bundle.add_namespace(
        "remote_meta",
        "http://prov-storage-pathology:8000/api/v1/documents/meta/",
    );

    let meta_id = meta.qualified("test_meta");
    let time = Utc.with_ymd_and_hms(2025, 1, 6, 15, 8, 24).unwrap();

    let main_activity = hospital.qualified("main_activity");
    bundle.activity(
        main_activity.clone(),
        Some(time),
        Some(time),
        Attributes::from_pairs([
            (
                vocab::prov_type(),
                AttrValue::Qualified(vocab::cpm_main_activity()),
            ),
            (
                vocab::cpm_referenced_meta_bundle_id(),
                AttrValue::Qualified(meta_id.clone()),
            ),
        ]),
    );

    let general_connector = hospital.qualified("e001_connector");
    bundle.entity(
        general_connector.clone(),
        connector_attributes(
            vocab::cpm_forward_connector(),
            remote.qualified("remote_doc_bundle"),
            remote_meta.qualified("remote_meta_bundle"),
            "a7ff1e5a77e95f09cd26de5918db32ca24e4b0a4a1db24bbd2d89e58a38231b9",
            "SHA256",
        ),
    );
    bundle.was_generated_by(general_connector.clone(), main_activity.clone(), Some(time));

    let concrete_connector = hospital.qualified("e001_connector_s1");
    bundle.entity(
        concrete_connector.clone(),
        connector_attributes(
            vocab::cpm_forward_connector(),
            remote.qualified("remote_doc_bundle"),
            remote_meta.qualified("remote_meta_bundle"),
            "a7ff1e5a77e95f09cd26de5918db32ca24e4b0a4a1db24bbd2d89e58a38231b9",
            "SHA256",
        ),
    );
    bundle.specialization_of(concrete_connector.clone(), general_connector.clone());

    let receiver_agent = hospital.qualified("receiver_agent");
    bundle.agent(
        receiver_agent.clone(),
        Attributes::from_pairs([(
            vocab::prov_type(),
            AttrValue::Qualified(vocab::cpm_receiver_agent()),
        )]),
    );
    bundle.was_attributed_to(concrete_connector.clone(), receiver_agent.clone());

    let domain_entity = ex.qualified("e003");
    bundle.entity(domain_entity.clone(), Attributes::new());
    bundle.entity(ex.qualified("e004"), Attributes::new());
    let domain_activity = ex.qualified("act001");
    bundle.activity(domain_activity.clone(), Some(time), None, Attributes::new());
    bundle.was_generated_by(domain_entity.clone(), domain_activity.clone(), Some(time));

    ForwardFixture {
        bundle,
        main_activity,
        general_connector,
        concrete_connector,
        receiver_agent,
        domain_entity,
        domain_activity,
        meta_id,
    }
}

/// A CPM bundle with a backward connector used by the main activity, a
/// sender agent, a forward connector, and domain content.
pub struct BackwardFixture {
    pub bundle: Bundle,
    pub main_activity: QualifiedName,
    pub backward_connector: QualifiedName,
    pub forward_connector: QualifiedName,
    pub sender_agent: QualifiedName,
    pub domain_entity: QualifiedName,
    pub meta_id: QualifiedName,
}

/// Builds the backward-connector fixture for `pathology`/`org`.
pub fn backward_fixture() -> BackwardFixture {
    let pathology = storage_ns("pathology", "org");
    let meta = meta_ns("pathology");
    let mut bundle = Bundle::new(pathology.qualified("test_2000_bundle"));
    bundle.add_namespace("cpm", vocab::CPM_URI);
    bundle.add_namespace("prov", vocab::PROV_URI);
    bundle.add_namespace("meta", meta.uri());
    let ex = bundle.add_namespace("ex", "http://example.com#");
    let remote = bundle.add_namespace(
        "remote_bundle",
        "http://prov-storage-hospital:8000/api/v1/organizations/org/documents/",
    );
    let remote_meta = bundle.add_namespace(
        "remote_meta",
        "http://prov-storage-hospital:8000/api/v1/documents/meta/",
    );

    let meta_id = meta.qualified("test_meta_2");
    let time = Utc.with_ymd_and_hms(2025, 1, 6, 15, 8, 24).unwrap();

    let main_activity = pathology.qualified("main_activity");
    bundle.activity(
        main_activity.clone(),
        Some(time),
        Some(time),
        Attributes::from_pairs([
            (
                vocab::prov_type(),
                AttrValue::Qualified(vocab::cpm_main_activity()),
            ),
            (
                vocab::cpm_referenced_meta_bundle_id(),
                AttrValue::Qualified(meta_id.clone()),
            ),
        ]),
    );

    let backward_connector = pathology.qualified("e001_sample_backwards_connector");
    bundle.entity(
        backward_connector.clone(),
        connector_attributes(
            vocab::cpm_backward_connector(),
            remote.qualified("test_1000_bundle"),
            remote_meta.qualified("test_meta"),
            "a7ff1e5a77e95f09cd26de5918db32ca24e4b0a4a1db24bbd2d89e58a38231b9",
            "SHA256",
        ),
    );
    bundle.used(main_activity.clone(), backward_connector.clone(), Some(time));

    let sender_agent = pathology.qualified("sender_agent");
    bundle.agent(
        sender_agent.clone(),
        Attributes::from_pairs([(
            vocab::prov_type(),
            AttrValue::Qualified(vocab::cpm_sender_agent()),
        )]),
    );
    bundle.was_attributed_to(backward_connector.clone(), sender_agent.clone());

    let forward_connector = pathology.qualified("e003_connector");
    bundle.entity(
        forward_connector.clone(),
        connector_attributes(
            vocab::cpm_forward_connector(),
            remote.qualified("some_downstream_bundle"),
            remote_meta.qualified("test_meta"),
            "b8ff1e5a77e95f09cd26de5918db32ca24e4b0a4a1db24bbd2d89e58a38231c0",
            "SHA256",
        ),
    );
    bundle.was_generated_by(forward_connector.clone(), main_activity.clone(), Some(time));

    let domain_entity = ex.qualified("e001");
    bundle.entity(domain_entity.clone(), Attributes::new());
    bundle.entity(ex.qualified("e004"), Attributes::new());
    let domain_activity = ex.qualified("act001");
    bundle.activity(domain_activity.clone(), Some(time), None, Attributes::new());
    bundle.was_generated_by(ex.qualified("e004"), domain_activity, Some(time));

    BackwardFixture {
        bundle,
        main_activity,
        backward_connector,
        forward_connector,
        sender_agent,
        domain_entity,
        meta_id,
    }
}

/// Re-classifies a fixture bundle and returns `(forward, backward, main)`
/// records for the checker.
pub fn classified(bundle: &Bundle) -> (Vec<Element>, Vec<Element>, Element) {
    let sets = crate::classifier::classify(bundle, &crate::classifier::TypeTagStrategy::new());
    let main = bundle
        .activities()
        .find(|activity| activity.has_type(&vocab::cpm_main_activity()))
        .expect("fixture has a main activity")
        .clone();
    (sets.forward, sets.backward, main)
}
