//! Signed attestation tokens.
//!
//! A token binds a stored document's content digest, origin and timestamps
//! under a trusted third party's signature. Signing and signature
//! verification live in the trusted-party service; the core consumes it
//! through the [`TrustedParty`] trait and only handles the wire shapes.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::crypto::{sha256_hex, SHA256_ALGORITHM};

/// Payload type of a token request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenPayloadType {
    /// A full stored document.
    Graph,
    /// A meta-provenance bundle.
    Meta,
    /// The backbone subgraph of a stored document.
    Backbone,
    /// The domain-specific subgraph of a stored document.
    DomainSpecific,
}

/// Request sent to the trusted party when a token is issued.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenRequest {
    /// The submitting organization.
    pub organization_id: String,
    /// Base64-encoded serialized document.
    pub document: String,
    /// Serialization format of `document`.
    pub document_format: String,
    /// What kind of payload is being attested.
    #[serde(rename = "type")]
    pub payload_type: TokenPayloadType,
    /// Identifier of the graph being attested.
    pub graph_id: String,
    /// Client-asserted creation timestamp (seconds since the epoch).
    pub created_on: i64,
}

/// Additional data carried inside the signed token body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenAdditionalData {
    /// URI of the attested bundle.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bundle: Option<String>,
    /// Digest algorithm name (e.g. `"SHA256"`).
    pub hash_function: String,
    /// URI of the issuing trusted party.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trusted_party_uri: Option<String>,
    /// Certificate of the issuing trusted party.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trusted_party_certificate: Option<String>,
}

/// The signed body of a token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenData {
    /// Organization the document originates from.
    pub originator_id: String,
    /// Identity of the issuing authority.
    pub authority_id: String,
    /// When the token was issued (seconds since the epoch).
    pub token_timestamp: i64,
    /// Client-asserted document creation time (seconds since the epoch).
    pub document_creation_timestamp: i64,
    /// Hex digest of the attested document.
    pub document_digest: String,
    /// Issuer metadata.
    pub additional_data: TokenAdditionalData,
}

/// A signed attestation returned by the trusted party.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedToken {
    /// The signed body.
    pub data: TokenData,
    /// Base64 signature over the body.
    pub signature: String,
}

/// Errors from the trusted-party collaborator.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum TokenError {
    /// The trusted party rejected or failed the issuance request.
    #[error("token issuance failed: {detail}")]
    IssuanceFailed {
        /// Collaborator-reported failure detail.
        detail: String,
    },
}

/// The trusted-party service, consumed as a black box: given a payload it
/// returns a signed attestation.
pub trait TrustedParty: Send + Sync {
    /// Issues a signed token for `request`.
    ///
    /// # Errors
    ///
    /// Returns [`TokenError::IssuanceFailed`] when the trusted party cannot
    /// attest the payload.
    fn issue_token(&self, request: &TokenRequest) -> Result<SignedToken, TokenError>;
}

/// Issuer used when the trusted party is disabled: produces an unsigned
/// placeholder token so documents can still be stored and versioned.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledTrustedParty;

impl DisabledTrustedParty {
    /// The authority id stamped on placeholder tokens.
    pub const AUTHORITY_ID: &'static str = "TrustedParty";

    /// Creates the issuer.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl TrustedParty for DisabledTrustedParty {
    fn issue_token(&self, request: &TokenRequest) -> Result<SignedToken, TokenError> {
        Ok(SignedToken {
            data: TokenData {
                originator_id: request.organization_id.clone(),
                authority_id: Self::AUTHORITY_ID.to_owned(),
                token_timestamp: request.created_on,
                document_creation_timestamp: request.created_on,
                document_digest: sha256_hex(request.document.as_bytes()),
                additional_data: TokenAdditionalData {
                    bundle: Some(request.graph_id.clone()),
                    hash_function: SHA256_ALGORITHM.to_owned(),
                    trusted_party_uri: None,
                    trusted_party_certificate: None,
                },
            },
            signature: String::new(),
        })
    }
}
