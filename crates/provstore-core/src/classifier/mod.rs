//! Backbone detection and connector classification.
//!
//! A CPM bundle interleaves two graphs: the backbone (main activity,
//! connectors, sender/receiver agents and the relations linking them) and
//! arbitrary domain-specific content. [`classify`] extracts the
//! forward/backward connector entities; [`partition`] splits the whole
//! record set into backbone and domain subsets.
//!
//! Whether an element belongs to the backbone is a pluggable decision
//! ([`BackboneStrategy`]); the default [`TypeTagStrategy`] matches the
//! declared CPM types and requires the element to carry no foreign
//! attributes. Relations are never classified directly: a relation is
//! backbone exactly when its significant endpoints are all backbone
//! elements.

#[cfg(test)]
mod tests;

use crate::graph::{Bundle, Element, Relation};
use crate::vocab;

/// Decides whether an element is part of the CPM backbone.
pub trait BackboneStrategy: Send + Sync {
    /// Whether `element` belongs to the backbone of `bundle`.
    fn is_backbone_element(&self, element: &Element, bundle: &Bundle) -> bool;
}

/// Default strategy: declared-type matching.
///
/// An element is backbone iff it asserts one of the CPM backbone types and
/// carries no attribute outside the CPM namespace. Activity start/end
/// times are not attributes, and `dct:hasPart` is tolerated as the one
/// foreign attribute backbone elements may carry.
#[derive(Debug, Clone, Copy, Default)]
pub struct TypeTagStrategy;

impl TypeTagStrategy {
    /// Creates the strategy.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

/// Whether the element asserts any CPM backbone type.
#[must_use]
pub fn has_any_cpm_type(element: &Element) -> bool {
    vocab::backbone_types()
        .iter()
        .any(|backbone_type| element.has_type(backbone_type))
}

/// Whether the element carries an attribute that does not belong to the
/// backbone vocabulary.
#[must_use]
pub fn contains_non_backbone_attribute(element: &Element) -> bool {
    let has_part = vocab::dct_has_part();
    let prov_type = vocab::prov_type();
    for (key, value) in element.attributes().iter() {
        if *key == prov_type {
            match value.as_qualified() {
                Some(asserted) if asserted.namespace_uri() == vocab::CPM_URI => continue,
                _ => return true,
            }
        }
        if key.namespace_uri() != vocab::CPM_URI && *key != has_part {
            return true;
        }
    }
    false
}

impl BackboneStrategy for TypeTagStrategy {
    fn is_backbone_element(&self, element: &Element, _bundle: &Bundle) -> bool {
        has_any_cpm_type(element) && !contains_non_backbone_attribute(element)
    }
}

/// The forward/backward connector entities of a bundle.
#[derive(Debug, Clone, Default)]
pub struct ConnectorSets {
    /// Entities typed `cpm:forwardConnector`.
    pub forward: Vec<Element>,
    /// Entities typed `cpm:backwardConnector`.
    pub backward: Vec<Element>,
}

/// Extracts the connector entities of `bundle`.
///
/// Never fails; a bundle without connectors yields empty lists. The two
/// lists are disjoint (a forward type wins when both are asserted) and are
/// subsets of the bundle's entities.
#[must_use]
pub fn classify(bundle: &Bundle, strategy: &dyn BackboneStrategy) -> ConnectorSets {
    let mut sets = ConnectorSets::default();
    for entity in bundle.entities() {
        if entity.asserted_types().next().is_none() {
            continue;
        }
        if !strategy.is_backbone_element(entity, bundle) {
            continue;
        }
        if entity.has_type(&vocab::cpm_forward_connector()) {
            sets.forward.push(entity.clone());
        } else if entity.has_type(&vocab::cpm_backward_connector()) {
            sets.backward.push(entity.clone());
        }
    }
    sets
}

/// Backbone/domain split of a bundle's records.
#[derive(Debug, Clone, Default)]
pub struct BackbonePartition {
    /// Backbone elements.
    pub backbone_elements: Vec<Element>,
    /// Relations whose significant endpoints are all backbone elements.
    pub backbone_relations: Vec<Relation>,
    /// Domain-specific elements.
    pub domain_elements: Vec<Element>,
    /// Relations touching at least one domain-specific element.
    pub domain_relations: Vec<Relation>,
}

/// Splits the records of `bundle` into backbone and domain-specific
/// subsets.
#[must_use]
pub fn partition(bundle: &Bundle, strategy: &dyn BackboneStrategy) -> BackbonePartition {
    let mut split = BackbonePartition::default();
    for element in bundle.elements() {
        if strategy.is_backbone_element(element, bundle) {
            split.backbone_elements.push(element.clone());
        } else {
            split.domain_elements.push(element.clone());
        }
    }
    for relation in bundle.relations() {
        let is_backbone = relation.significant_endpoints().iter().all(|endpoint| {
            split
                .backbone_elements
                .iter()
                .any(|element| element.id() == *endpoint)
        });
        if is_backbone {
            split.backbone_relations.push(relation.clone());
        } else {
            split.domain_relations.push(relation.clone());
        }
    }
    split
}
