//! Graph (de)serialization seam.
//!
//! The pipeline receives documents as base64 text in a declared format and
//! needs them back as [`Document`] values. The [`GraphCodec`] trait is the
//! seam a serializer library plugs into; [`ProvJsonCodec`] is the built-in
//! PROV-JSON implementation covering the record kinds the validator
//! understands. XML and RDF stay with external libraries.

mod prov_json;


use thiserror::Error;

use crate::graph::Document;

pub use prov_json::ProvJsonCodec;

/// Errors produced while decoding or encoding a PROV document.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CodecError {
    /// The declared format is not handled by this codec.
    #[error("unsupported document format: {format}")]
    UnsupportedFormat {
        /// The format as declared in the request.
        format: String,
    },

    /// The payload is not syntactically valid in the declared format.
    #[error("malformed document: {detail}")]
    Malformed {
        /// What failed to parse.
        detail: String,
    },

    /// An identifier uses a prefix with no namespace declaration in scope.
    #[error("undeclared namespace prefix: {prefix}")]
    UndeclaredPrefix {
        /// The offending prefix.
        prefix: String,
    },
}

/// A PROV document serializer/deserializer.
pub trait GraphCodec: Send + Sync {
    /// Decodes `content` in the given format into a document.
    ///
    /// # Errors
    ///
    /// Returns a [`CodecError`] when the format is unsupported or the
    /// payload is malformed.
    fn decode(&self, content: &[u8], format: &str) -> Result<Document, CodecError>;

    /// Encodes `document` in the given format.
    ///
    /// # Errors
    ///
    /// Returns a [`CodecError`] when the format is unsupported.
    fn encode(&self, document: &Document, format: &str) -> Result<Vec<u8>, CodecError>;
}
