//! Blocking HTTP implementation of the probe collaborators.

use std::time::Duration;

use serde_json::Value;
use tracing::debug;
use url::Url;

use super::{ExistenceProbe, StoredTokenInfo, TokenFetcher};

/// HTTP-backed existence probe and token fetcher.
///
/// Probes are HEAD requests treating any 2xx as "exists"; token retrieval
/// is a GET against the referenced bundle's own storage endpoint. Every
/// request carries the configured timeout so an unresponsive peer never
/// blocks the pipeline indefinitely — a timeout counts as "not found".
pub struct HttpProbe {
    agent: ureq::Agent,
}

impl HttpProbe {
    /// Creates a probe whose requests time out after `timeout`.
    #[must_use]
    pub fn new(timeout: Duration) -> Self {
        Self {
            agent: ureq::AgentBuilder::new().timeout(timeout).build(),
        }
    }
}

impl ExistenceProbe for HttpProbe {
    fn probe(&self, uri: &Url) -> bool {
        match self.agent.head(uri.as_str()).call() {
            Ok(response) => (200..300).contains(&response.status()),
            Err(err) => {
                debug!(uri = %uri, error = %err, "existence probe failed");
                false
            }
        }
    }
}

impl TokenFetcher for HttpProbe {
    fn fetch_token(&self, uri: &Url) -> Option<StoredTokenInfo> {
        let response = match self.agent.get(uri.as_str()).call() {
            Ok(response) => response,
            Err(err) => {
                debug!(uri = %uri, error = %err, "token fetch failed");
                return None;
            }
        };
        let body: Value = match response.into_json() {
            Ok(body) => body,
            Err(err) => {
                debug!(uri = %uri, error = %err, "token response is not JSON");
                return None;
            }
        };
        let token = body.get("token")?;
        let document_digest = token
            .pointer("/data/documentDigest")?
            .as_str()?
            .to_owned();
        let hash_function = token
            .pointer("/data/additionalData/hashFunction")?
            .as_str()?
            .to_owned();
        Some(StoredTokenInfo {
            document_digest,
            hash_function,
        })
    }
}
