//! In-memory representation of a PROV bundle.
//!
//! The model is deliberately closed: elements are one of
//! {Entity, Activity, Agent} and relations are a fixed sum type over the
//! fourteen PROV relation kinds the validator understands. The classifier
//! and the constraint checker match exhaustively over these variants, so an
//! unrecognized relation kind is a compile error rather than a silently
//! mis-handled record.
//!
//! Identity of a record is its qualified identifier (namespace URI +
//! local part). Equality used by the engine and by tests is the dedicated
//! structural equality ([`Element::structurally_equals`],
//! [`Bundle::structurally_equals`]): identifier plus attribute multiset for
//! records, namespace set plus record multisets for bundles — never
//! incidental object identity.

mod bundle;
mod document;
mod qualified;
mod record;
mod relation;

#[cfg(test)]
mod tests;

pub use bundle::Bundle;
pub use document::Document;
pub use qualified::{Namespace, QualifiedName};
pub use record::{AttrValue, Attributes, Element, ElementKind};
pub use relation::{Relation, RelationKind};
