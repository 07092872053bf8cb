//! Named bundles of records.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use crate::graph::record::{Attributes, Element, ElementKind};
use crate::graph::relation::Relation;
use crate::graph::{Namespace, QualifiedName};

/// A named graph scoped to one organization + document.
///
/// Owns the records asserted inside it and the namespace declarations in
/// scope. Record constructors mirror the PROV statement forms
/// (`entity`, `activity`, `was_generated_by`, `used`, ...) so fixtures and
/// the meta-provenance builder read like PROV assertions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bundle {
    identifier: QualifiedName,
    namespaces: BTreeMap<String, String>,
    elements: Vec<Element>,
    relations: Vec<Relation>,
}

impl Bundle {
    /// Creates an empty bundle named `identifier`. The identifier's own
    /// namespace is declared automatically.
    #[must_use]
    pub fn new(identifier: QualifiedName) -> Self {
        let mut namespaces = BTreeMap::new();
        namespaces.insert(
            identifier.prefix().to_owned(),
            identifier.namespace_uri().to_owned(),
        );
        Self {
            identifier,
            namespaces,
            elements: Vec::new(),
            relations: Vec::new(),
        }
    }

    /// The bundle identifier.
    #[must_use]
    pub fn identifier(&self) -> &QualifiedName {
        &self.identifier
    }

    /// The fully expanded URI of the bundle identifier.
    #[must_use]
    pub fn uri(&self) -> String {
        self.identifier.uri()
    }

    /// Declares a namespace and returns it for building qualified names.
    pub fn add_namespace(&mut self, prefix: impl Into<String>, uri: impl Into<String>) -> Namespace {
        let prefix = prefix.into();
        let uri = uri.into();
        self.namespaces.insert(prefix.clone(), uri.clone());
        Namespace::new(prefix, uri)
    }

    /// The declared namespaces (prefix -> URI).
    #[must_use]
    pub fn namespaces(&self) -> &BTreeMap<String, String> {
        &self.namespaces
    }

    /// Whether a namespace with this URI is declared.
    #[must_use]
    pub fn declares_namespace_uri(&self, uri: &str) -> bool {
        self.namespaces.values().any(|declared| declared == uri)
    }

    // --- record constructors ---

    /// Asserts an entity.
    pub fn entity(&mut self, id: QualifiedName, attributes: Attributes) -> &Element {
        self.elements
            .push(Element::new(id, ElementKind::Entity, attributes));
        self.elements.last().expect("just pushed")
    }

    /// Asserts an activity.
    pub fn activity(
        &mut self,
        id: QualifiedName,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
        attributes: Attributes,
    ) -> &Element {
        let mut element = Element::new(id, ElementKind::Activity, attributes);
        if let Some(start) = start {
            element = element.with_start_time(start);
        }
        if let Some(end) = end {
            element = element.with_end_time(end);
        }
        self.elements.push(element);
        self.elements.last().expect("just pushed")
    }

    /// Asserts an agent.
    pub fn agent(&mut self, id: QualifiedName, attributes: Attributes) -> &Element {
        self.elements
            .push(Element::new(id, ElementKind::Agent, attributes));
        self.elements.last().expect("just pushed")
    }

    /// Asserts `wasGeneratedBy(entity, activity)`.
    pub fn was_generated_by(
        &mut self,
        entity: QualifiedName,
        activity: QualifiedName,
        time: Option<DateTime<Utc>>,
    ) {
        self.relations.push(Relation::Generation {
            entity,
            activity,
            id: None,
            time,
            attributes: Attributes::new(),
        });
    }

    /// Asserts `used(activity, entity)`.
    pub fn used(
        &mut self,
        activity: QualifiedName,
        entity: QualifiedName,
        time: Option<DateTime<Utc>>,
    ) {
        self.relations.push(Relation::Usage {
            activity,
            entity,
            id: None,
            time,
            attributes: Attributes::new(),
        });
    }

    /// Asserts `wasDerivedFrom(generated, used)`.
    pub fn was_derived_from(&mut self, generated: QualifiedName, used: QualifiedName) {
        self.derivation(generated, used, Attributes::new());
    }

    /// Asserts `wasDerivedFrom(generated, used)` with relation attributes
    /// (e.g. a `prov:type = prov:revisionOf` qualification).
    pub fn derivation(
        &mut self,
        generated: QualifiedName,
        used: QualifiedName,
        attributes: Attributes,
    ) {
        self.relations.push(Relation::Derivation {
            generated,
            used,
            id: None,
            attributes,
        });
    }

    /// Asserts `specializationOf(specific, general)`.
    pub fn specialization_of(&mut self, specific: QualifiedName, general: QualifiedName) {
        self.relations.push(Relation::Specialization {
            specific,
            general,
            attributes: Attributes::new(),
        });
    }

    /// Asserts `wasAttributedTo(entity, agent)`.
    pub fn was_attributed_to(&mut self, entity: QualifiedName, agent: QualifiedName) {
        self.relations.push(Relation::Attribution {
            entity,
            agent,
            id: None,
            attributes: Attributes::new(),
        });
    }

    /// Asserts `wasAssociatedWith(activity, agent)`.
    pub fn was_associated_with(&mut self, activity: QualifiedName, agent: QualifiedName) {
        self.relations.push(Relation::Association {
            activity,
            agent,
            id: None,
            attributes: Attributes::new(),
        });
    }

    /// Adds an arbitrary relation record.
    pub fn add_relation(&mut self, relation: Relation) {
        self.relations.push(relation);
    }

    /// Removes the first relation structurally equal to `relation`.
    /// Returns whether one was removed.
    pub fn remove_relation(&mut self, relation: &Relation) -> bool {
        if let Some(pos) = self
            .relations
            .iter()
            .position(|r| r.structurally_equals(relation))
        {
            self.relations.remove(pos);
            true
        } else {
            false
        }
    }

    /// Removes the element with the given identifier. Returns whether one
    /// was removed.
    pub fn remove_element(&mut self, id: &QualifiedName) -> bool {
        if let Some(pos) = self.elements.iter().position(|e| e.id() == id) {
            self.elements.remove(pos);
            true
        } else {
            false
        }
    }

    // --- accessors ---

    /// All elements.
    #[must_use]
    pub fn elements(&self) -> &[Element] {
        &self.elements
    }

    /// All relations.
    #[must_use]
    pub fn relations(&self) -> &[Relation] {
        &self.relations
    }

    /// Elements of a given kind.
    pub fn elements_of_kind(&self, kind: ElementKind) -> impl Iterator<Item = &Element> {
        self.elements.iter().filter(move |e| e.kind() == kind)
    }

    /// All entities.
    pub fn entities(&self) -> impl Iterator<Item = &Element> {
        self.elements_of_kind(ElementKind::Entity)
    }

    /// All activities.
    pub fn activities(&self) -> impl Iterator<Item = &Element> {
        self.elements_of_kind(ElementKind::Activity)
    }

    /// All agents.
    pub fn agents(&self) -> impl Iterator<Item = &Element> {
        self.elements_of_kind(ElementKind::Agent)
    }

    /// Looks up an element by qualified identifier.
    #[must_use]
    pub fn element(&self, id: &QualifiedName) -> Option<&Element> {
        self.elements.iter().find(|e| e.id() == id)
    }

    /// Looks up an element by local name, as fixtures and error paths do
    /// when the namespace is unambiguous. Returns the first match.
    #[must_use]
    pub fn element_by_local(&self, local: &str) -> Option<&Element> {
        self.elements.iter().find(|e| e.id().local() == local)
    }

    /// Mutable lookup by qualified identifier.
    pub fn element_mut(&mut self, id: &QualifiedName) -> Option<&mut Element> {
        self.elements.iter_mut().find(|e| e.id() == id)
    }

    /// Structural equality: same identifier, namespace set and record
    /// multisets, independent of assertion order.
    #[must_use]
    pub fn structurally_equals(&self, other: &Self) -> bool {
        if self.identifier != other.identifier
            || self.namespaces != other.namespaces
            || self.elements.len() != other.elements.len()
            || self.relations.len() != other.relations.len()
        {
            return false;
        }
        let mut matched = vec![false; other.elements.len()];
        for element in &self.elements {
            let Some(pos) = other.elements.iter().enumerate().position(|(i, candidate)| {
                !matched[i] && element.structurally_equals(candidate)
            }) else {
                return false;
            };
            matched[pos] = true;
        }
        let mut matched = vec![false; other.relations.len()];
        for relation in &self.relations {
            let Some(pos) = other.relations.iter().enumerate().position(|(i, candidate)| {
                !matched[i] && relation.structurally_equals(candidate)
            }) else {
                return false;
            };
            matched[pos] = true;
        }
        true
    }
}
