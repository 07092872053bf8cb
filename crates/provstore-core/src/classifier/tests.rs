//! Tests for backbone detection and connector classification.

use proptest::prelude::*;

use super::{
    classify, contains_non_backbone_attribute, has_any_cpm_type, partition, TypeTagStrategy,
};
use crate::graph::{AttrValue, Attributes, Bundle, Element, ElementKind, Namespace};
use crate::testutil::{backward_fixture, forward_fixture};
use crate::vocab;

fn strategy() -> TypeTagStrategy {
    TypeTagStrategy::new()
}

#[test]
fn forward_fixture_classifies_connectors() {
    let fixture = forward_fixture();
    let sets = classify(&fixture.bundle, &strategy());
    let forward: Vec<_> = sets.forward.iter().map(|c| c.id().local()).collect();
    assert_eq!(forward, vec!["e001_connector", "e001_connector_s1"]);
    assert!(sets.backward.is_empty());
}

#[test]
fn backward_fixture_classifies_both_directions() {
    let fixture = backward_fixture();
    let sets = classify(&fixture.bundle, &strategy());
    assert_eq!(sets.forward.len(), 1);
    assert_eq!(sets.backward.len(), 1);
    assert_eq!(
        sets.backward[0].id().local(),
        "e001_sample_backwards_connector"
    );
}

#[test]
fn untyped_entities_are_never_connectors() {
    let fixture = forward_fixture();
    let sets = classify(&fixture.bundle, &strategy());
    assert!(sets
        .forward
        .iter()
        .chain(sets.backward.iter())
        .all(|c| c.id().local() != "e003"));
}

#[test]
fn connector_with_foreign_attribute_is_not_backbone() {
    let mut fixture = forward_fixture();
    let ex = Namespace::new("ex", "http://example.com#");
    fixture
        .bundle
        .element_mut(&fixture.general_connector)
        .unwrap()
        .attributes_mut()
        .insert(ex.qualified("customAnnotation"), AttrValue::Str("x".into()));
    let sets = classify(&fixture.bundle, &strategy());
    assert!(sets.forward.iter().all(|c| c.id() != &fixture.general_connector));
}

#[test]
fn dct_has_part_is_tolerated_on_backbone_elements() {
    let mut fixture = forward_fixture();
    let ex = Namespace::new("ex", "http://example.com#");
    fixture
        .bundle
        .element_mut(&fixture.general_connector)
        .unwrap()
        .attributes_mut()
        .insert(
            vocab::dct_has_part(),
            AttrValue::Qualified(ex.qualified("e003")),
        );
    let sets = classify(&fixture.bundle, &strategy());
    assert!(sets.forward.iter().any(|c| c.id() == &fixture.general_connector));
}

#[test]
fn backbone_helpers_match_original_semantics() {
    let fixture = backward_fixture();
    let connector = fixture.bundle.element(&fixture.backward_connector).unwrap();
    assert!(has_any_cpm_type(connector));
    assert!(!contains_non_backbone_attribute(connector));

    let domain = fixture.bundle.element(&fixture.domain_entity).unwrap();
    assert!(!has_any_cpm_type(domain));
}

#[test]
fn partition_assigns_every_fixture_record_once() {
    let fixture = backward_fixture();
    let split = partition(&fixture.bundle, &strategy());
    assert_eq!(
        split.backbone_elements.len() + split.domain_elements.len(),
        fixture.bundle.elements().len()
    );
    assert_eq!(
        split.backbone_relations.len() + split.domain_relations.len(),
        fixture.bundle.relations().len()
    );
    // Main activity, backward connector, forward connector, sender agent.
    assert_eq!(split.backbone_elements.len(), 4);
}

#[test]
fn relations_touching_domain_records_fall_out_of_the_backbone() {
    let mut fixture = backward_fixture();
    fixture.bundle.was_derived_from(
        fixture.domain_entity.clone(),
        fixture.backward_connector.clone(),
    );
    let split = partition(&fixture.bundle, &strategy());
    assert!(split.domain_relations.iter().any(|relation| {
        relation
            .significant_endpoints()
            .iter()
            .any(|endpoint| **endpoint == fixture.domain_entity)
    }));
}

// =============================================================================
// Property: classification completeness and disjointness
// =============================================================================

#[derive(Debug, Clone)]
enum GeneratedKind {
    Forward,
    Backward,
    Plain,
}

fn generated_entity(index: usize, kind: &GeneratedKind) -> Element {
    let ns = Namespace::new("gen", "http://generated.example/#");
    let attributes = match kind {
        GeneratedKind::Forward => Attributes::from_pairs([(
            vocab::prov_type(),
            AttrValue::Qualified(vocab::cpm_forward_connector()),
        )]),
        GeneratedKind::Backward => Attributes::from_pairs([(
            vocab::prov_type(),
            AttrValue::Qualified(vocab::cpm_backward_connector()),
        )]),
        GeneratedKind::Plain => Attributes::new(),
    };
    Element::new(
        ns.qualified(format!("e{index}")),
        ElementKind::Entity,
        attributes,
    )
}

proptest! {
    #[test]
    fn classification_is_complete_and_disjoint(
        kinds in proptest::collection::vec(
            prop_oneof![
                Just(GeneratedKind::Forward),
                Just(GeneratedKind::Backward),
                Just(GeneratedKind::Plain),
            ],
            0..24,
        )
    ) {
        let ns = Namespace::new("b", "http://generated.example/bundles/");
        let mut bundle = Bundle::new(ns.qualified("generated_bundle"));
        let mut expected_forward = 0usize;
        let mut expected_backward = 0usize;
        for (index, kind) in kinds.iter().enumerate() {
            let element = generated_entity(index, kind);
            bundle.entity(element.id().clone(), element.attributes().clone());
            match kind {
                GeneratedKind::Forward => expected_forward += 1,
                GeneratedKind::Backward => expected_backward += 1,
                GeneratedKind::Plain => {}
            }
        }

        let sets = classify(&bundle, &TypeTagStrategy::new());

        // Complete: every declared connector is found.
        prop_assert_eq!(sets.forward.len(), expected_forward);
        prop_assert_eq!(sets.backward.len(), expected_backward);

        // Subsets of the bundle's entities.
        for connector in sets.forward.iter().chain(sets.backward.iter()) {
            prop_assert!(bundle.element(connector.id()).is_some());
        }

        // Disjoint.
        for forward in &sets.forward {
            prop_assert!(sets.backward.iter().all(|b| b.id() != forward.id()));
        }
    }
}

// =============================================================================
// Property: connector attribute completeness round-trip
// =============================================================================

proptest! {
    #[test]
    fn removing_any_mandatory_attribute_breaks_completeness(index in 0usize..4) {
        let fixture = forward_fixture();
        let connector = fixture
            .bundle
            .element(&fixture.general_connector)
            .unwrap()
            .clone();
        let complete = vocab::connector_mandatory_attributes()
            .iter()
            .all(|key| connector.attributes().contains_key(key));
        prop_assert!(complete);

        let mut stripped = connector.clone();
        let removed_key = vocab::connector_mandatory_attributes()[index].clone();
        stripped.attributes_mut().remove(&removed_key);
        let still_complete = vocab::connector_mandatory_attributes()
            .iter()
            .all(|key| stripped.attributes().contains_key(key));
        prop_assert!(!still_complete);
    }
}
