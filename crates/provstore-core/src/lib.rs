//! Core validation and lineage engine for the provstore distributed
//! provenance node.
//!
//! This crate implements the storage-node side of the Common Provenance
//! Model (CPM): it separates the CPM backbone from domain-specific content
//! inside an incoming W3C PROV bundle, verifies the fixed set of CPM
//! structural constraints, resolves and hash-checks cross-organization
//! connector references, and folds every accepted document into an
//! append-only meta-provenance graph tracking the lineage of each logical
//! document across versions.
//!
//! # Architecture
//!
//! ```text
//! submitted document (base64 + format)
//!       |
//!       v
//! codec::GraphCodec ---------> graph::Document
//!       |
//!       v
//! pipeline::ValidationPipeline
//!       |-- classifier::classify / partition
//!       |-- resolver::ReferenceResolver (existence probes + hash check)
//!       |-- constraints::check_cpm_constraints (rules 1-12)
//!       |-- namespace validity
//!       v
//! pipeline::AcceptedDocument
//!       |
//!       v
//! meta::MetaProvenanceBuilder (version chain + token attachment)
//! ```
//!
//! HTTP routing, organization registration, trust-chain verification,
//! token signing, and graph persistence are external collaborators; this
//! crate exposes the trait seams they plug into ([`resolver::ExistenceProbe`],
//! [`resolver::TokenFetcher`], [`index::DocumentIndex`],
//! [`index::MetaBundleIndex`], [`token::TrustedParty`], [`meta::MetaStore`]).

pub mod classifier;
pub mod codec;
pub mod config;
pub mod constraints;
pub mod crypto;
pub mod graph;
pub mod index;
pub mod meta;
pub mod pipeline;
pub mod resolver;
pub mod token;
pub mod vocab;

#[cfg(test)]
pub(crate) mod testutil;
