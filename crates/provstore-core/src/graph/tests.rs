//! Tests for the graph model.

use chrono::{TimeZone, Utc};

use super::{AttrValue, Attributes, Bundle, Element, ElementKind, Namespace, Relation};
use crate::vocab;

fn example_ns() -> Namespace {
    Namespace::new("ex", "http://example.com#")
}

fn bundle_ns() -> Namespace {
    Namespace::new(
        "hospital",
        "http://prov-storage-hospital:8000/api/v1/organizations/org/documents/",
    )
}

#[test]
fn qualified_name_equality_ignores_prefix() {
    let a = Namespace::new("ex", "http://example.com#").qualified("e1");
    let b = Namespace::new("other", "http://example.com#").qualified("e1");
    assert_eq!(a, b);
    assert_eq!(a.uri(), "http://example.com#e1");
}

#[test]
fn qualified_name_display_uses_prefix_and_local() {
    let q = example_ns().qualified("e001");
    assert_eq!(q.to_string(), "ex:e001");
}

#[test]
fn attributes_are_multi_valued() {
    let mut attrs = Attributes::new();
    attrs.insert(
        vocab::prov_type(),
        AttrValue::Qualified(vocab::cpm_forward_connector()),
    );
    attrs.insert(
        vocab::prov_type(),
        AttrValue::Qualified(vocab::cpm_id()),
    );
    assert_eq!(attrs.get(&vocab::prov_type()).len(), 2);
    assert!(attrs.contains(
        &vocab::prov_type(),
        &AttrValue::Qualified(vocab::cpm_forward_connector())
    ));
}

#[test]
fn element_has_type_matches_asserted_qualified_name() {
    let attrs = Attributes::from_pairs([(
        vocab::prov_type(),
        AttrValue::Qualified(vocab::cpm_backward_connector()),
    )]);
    let element = Element::new(example_ns().qualified("c1"), ElementKind::Entity, attrs);
    assert!(element.has_type(&vocab::cpm_backward_connector()));
    assert!(!element.has_type(&vocab::cpm_forward_connector()));
}

#[test]
fn bundle_declares_its_own_namespace() {
    let bundle = Bundle::new(bundle_ns().qualified("test_bundle"));
    assert!(bundle.declares_namespace_uri(bundle_ns().uri()));
}

#[test]
fn bundle_lookup_by_local_name() {
    let mut bundle = Bundle::new(bundle_ns().qualified("test_bundle"));
    let ex = bundle.add_namespace("ex", "http://example.com#");
    bundle.entity(ex.qualified("e001"), Attributes::new());
    assert!(bundle.element_by_local("e001").is_some());
    assert!(bundle.element_by_local("e999").is_none());
}

#[test]
fn structural_equality_is_order_independent() {
    let ex = example_ns();
    let build = |swap: bool| {
        let mut bundle = Bundle::new(bundle_ns().qualified("test_bundle"));
        bundle.add_namespace("ex", "http://example.com#");
        let (first, second) = if swap { ("e2", "e1") } else { ("e1", "e2") };
        bundle.entity(ex.qualified(first), Attributes::new());
        bundle.entity(ex.qualified(second), Attributes::new());
        bundle.was_derived_from(ex.qualified("e2"), ex.qualified("e1"));
        bundle
    };
    let a = build(false);
    let b = build(true);
    assert!(a.structurally_equals(&b));
}

#[test]
fn structural_equality_detects_attribute_differences() {
    let ex = example_ns();
    let mut a = Bundle::new(bundle_ns().qualified("test_bundle"));
    a.entity(ex.qualified("e1"), Attributes::new());
    let mut b = Bundle::new(bundle_ns().qualified("test_bundle"));
    b.entity(
        ex.qualified("e1"),
        Attributes::from_pairs([(
            vocab::prov_type(),
            AttrValue::Qualified(vocab::cpm_forward_connector()),
        )]),
    );
    assert!(!a.structurally_equals(&b));
}

#[test]
fn remove_relation_matches_structurally() {
    let ex = example_ns();
    let mut bundle = Bundle::new(bundle_ns().qualified("test_bundle"));
    bundle.was_derived_from(ex.qualified("e2"), ex.qualified("e1"));
    let target = Relation::Derivation {
        generated: ex.qualified("e2"),
        used: ex.qualified("e1"),
        id: None,
        attributes: Attributes::new(),
    };
    assert!(bundle.remove_relation(&target));
    assert!(bundle.relations().is_empty());
    assert!(!bundle.remove_relation(&target));
}

#[test]
fn activity_times_are_preserved() {
    let ex = example_ns();
    let start = Utc.with_ymd_and_hms(2025, 1, 6, 15, 8, 24).unwrap();
    let mut bundle = Bundle::new(bundle_ns().qualified("test_bundle"));
    bundle.activity(ex.qualified("act1"), Some(start), Some(start), Attributes::new());
    let activity = bundle.element_by_local("act1").unwrap();
    assert_eq!(activity.start_time(), Some(start));
    assert_eq!(activity.end_time(), Some(start));
}

#[test]
fn significant_endpoints_for_start_are_activity_only() {
    let ex = example_ns();
    let relation = Relation::Start {
        activity: ex.qualified("act1"),
        trigger: Some(ex.qualified("e1")),
        starter: None,
        time: None,
        attributes: Attributes::new(),
    };
    let endpoints = relation.significant_endpoints();
    assert_eq!(endpoints.len(), 1);
    assert_eq!(endpoints[0].local(), "act1");
}
