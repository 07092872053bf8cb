//! Elements (entities, activities, agents) and their attribute maps.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use crate::graph::QualifiedName;

/// A single attribute value.
///
/// PROV attributes are typed; the validator only ever needs these four
/// shapes. `Qualified` values are compared by expanded URI, so a
/// `prov:type` asserted under one prefix matches the same type asserted
/// under another.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum AttrValue {
    /// A qualified name (e.g. `prov:type = cpm:forwardConnector`).
    Qualified(QualifiedName),
    /// A plain string (e.g. a hex digest or `"SHA256"`).
    Str(String),
    /// An integer (e.g. `pav:version`).
    Int(i64),
    /// A timestamp.
    Time(DateTime<Utc>),
}

impl AttrValue {
    /// The value as a qualified name, if it is one.
    #[must_use]
    pub fn as_qualified(&self) -> Option<&QualifiedName> {
        match self {
            Self::Qualified(q) => Some(q),
            _ => None,
        }
    }

    /// The value as a string slice, if it is a plain string.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    /// The value as an integer, if it is one.
    #[must_use]
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            _ => None,
        }
    }
}

/// A multi-valued attribute map with deterministic iteration order.
///
/// `prov:type` in particular routinely carries several values on one
/// record; inserting never overwrites, it appends.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Attributes {
    entries: BTreeMap<QualifiedName, Vec<AttrValue>>,
}

impl Attributes {
    /// An empty attribute map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds an attribute map from key/value pairs, preserving
    /// multi-valued keys.
    #[must_use]
    pub fn from_pairs(pairs: impl IntoIterator<Item = (QualifiedName, AttrValue)>) -> Self {
        let mut attrs = Self::new();
        for (key, value) in pairs {
            attrs.insert(key, value);
        }
        attrs
    }

    /// Appends `value` under `key`.
    pub fn insert(&mut self, key: QualifiedName, value: AttrValue) {
        self.entries.entry(key).or_default().push(value);
    }

    /// Removes every value asserted under `key`.
    pub fn remove(&mut self, key: &QualifiedName) -> Option<Vec<AttrValue>> {
        self.entries.remove(key)
    }

    /// All values asserted under `key` (empty slice when absent).
    #[must_use]
    pub fn get(&self, key: &QualifiedName) -> &[AttrValue] {
        self.entries.get(key).map_or(&[], Vec::as_slice)
    }

    /// The first value asserted under `key`.
    #[must_use]
    pub fn first(&self, key: &QualifiedName) -> Option<&AttrValue> {
        self.get(key).first()
    }

    /// Whether any value is asserted under `key`.
    #[must_use]
    pub fn contains_key(&self, key: &QualifiedName) -> bool {
        self.entries.contains_key(key)
    }

    /// Whether `value` is asserted under `key`.
    #[must_use]
    pub fn contains(&self, key: &QualifiedName, value: &AttrValue) -> bool {
        self.get(key).contains(value)
    }

    /// Iterates over `(key, value)` pairs, flattening multi-valued keys.
    pub fn iter(&self) -> impl Iterator<Item = (&QualifiedName, &AttrValue)> {
        self.entries
            .iter()
            .flat_map(|(key, values)| values.iter().map(move |value| (key, value)))
    }

    /// Iterates over the distinct keys.
    pub fn keys(&self) -> impl Iterator<Item = &QualifiedName> {
        self.entries.keys()
    }

    /// Number of asserted `(key, value)` pairs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.values().map(Vec::len).sum()
    }

    /// Whether no attribute is asserted.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Multiset equality over `(key, value)` pairs, ignoring assertion
    /// order within a key.
    #[must_use]
    pub fn same_multiset(&self, other: &Self) -> bool {
        if self.entries.len() != other.entries.len() {
            return false;
        }
        self.entries.iter().all(|(key, values)| {
            let mut mine = values.clone();
            let Some(theirs) = other.entries.get(key) else {
                return false;
            };
            let mut theirs = theirs.clone();
            mine.sort();
            theirs.sort();
            mine == theirs
        })
    }
}

impl FromIterator<(QualifiedName, AttrValue)> for Attributes {
    fn from_iter<T: IntoIterator<Item = (QualifiedName, AttrValue)>>(iter: T) -> Self {
        Self::from_pairs(iter)
    }
}

/// The three PROV element kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementKind {
    /// A `prov:Entity`.
    Entity,
    /// A `prov:Activity`.
    Activity,
    /// A `prov:Agent`.
    Agent,
}

/// An entity, activity or agent record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    id: QualifiedName,
    kind: ElementKind,
    attributes: Attributes,
    start_time: Option<DateTime<Utc>>,
    end_time: Option<DateTime<Utc>>,
}

impl Element {
    /// Creates an element. Start/end times are meaningful for activities
    /// only and are `None` for entities and agents.
    #[must_use]
    pub fn new(id: QualifiedName, kind: ElementKind, attributes: Attributes) -> Self {
        Self {
            id,
            kind,
            attributes,
            start_time: None,
            end_time: None,
        }
    }

    /// Sets the activity start time.
    #[must_use]
    pub fn with_start_time(mut self, start: DateTime<Utc>) -> Self {
        self.start_time = Some(start);
        self
    }

    /// Sets the activity end time.
    #[must_use]
    pub fn with_end_time(mut self, end: DateTime<Utc>) -> Self {
        self.end_time = Some(end);
        self
    }

    /// The qualified identifier.
    #[must_use]
    pub fn id(&self) -> &QualifiedName {
        &self.id
    }

    /// The element kind.
    #[must_use]
    pub fn kind(&self) -> ElementKind {
        self.kind
    }

    /// The attribute map.
    #[must_use]
    pub fn attributes(&self) -> &Attributes {
        &self.attributes
    }

    /// Mutable access to the attribute map.
    pub fn attributes_mut(&mut self) -> &mut Attributes {
        &mut self.attributes
    }

    /// The activity start time, if any.
    #[must_use]
    pub fn start_time(&self) -> Option<DateTime<Utc>> {
        self.start_time
    }

    /// The activity end time, if any.
    #[must_use]
    pub fn end_time(&self) -> Option<DateTime<Utc>> {
        self.end_time
    }

    /// The asserted `prov:type` values.
    pub fn asserted_types(&self) -> impl Iterator<Item = &AttrValue> {
        self.attributes.get(&crate::vocab::prov_type()).iter()
    }

    /// Whether `prov:type` asserts the given qualified name.
    #[must_use]
    pub fn has_type(&self, r#type: &QualifiedName) -> bool {
        self.attributes.contains(
            &crate::vocab::prov_type(),
            &AttrValue::Qualified(r#type.clone()),
        )
    }

    /// Structural equality: same identifier, kind and attribute multiset.
    #[must_use]
    pub fn structurally_equals(&self, other: &Self) -> bool {
        self.id == other.id
            && self.kind == other.kind
            && self.attributes.same_multiset(&other.attributes)
    }
}
