//! Namespaces and qualified names.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

/// A declared namespace: a short prefix bound to a URI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Namespace {
    prefix: String,
    uri: String,
}

impl Namespace {
    /// Creates a namespace binding `prefix` to `uri`.
    pub fn new(prefix: impl Into<String>, uri: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            uri: uri.into(),
        }
    }

    /// The namespace prefix.
    #[must_use]
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// The namespace URI.
    #[must_use]
    pub fn uri(&self) -> &str {
        &self.uri
    }

    /// Builds a qualified name in this namespace.
    #[must_use]
    pub fn qualified(&self, local: impl Into<String>) -> QualifiedName {
        QualifiedName {
            prefix: self.prefix.clone(),
            namespace_uri: self.uri.clone(),
            local: local.into(),
        }
    }
}

/// A namespaced identifier.
///
/// Two qualified names are equal when they expand to the same URI — the
/// prefix is presentation only. Ordering follows the same key so that
/// attribute maps iterate deterministically.
#[derive(Debug, Clone)]
pub struct QualifiedName {
    prefix: String,
    namespace_uri: String,
    local: String,
}

impl QualifiedName {
    /// Creates a qualified name directly from its parts.
    pub fn new(
        prefix: impl Into<String>,
        namespace_uri: impl Into<String>,
        local: impl Into<String>,
    ) -> Self {
        Self {
            prefix: prefix.into(),
            namespace_uri: namespace_uri.into(),
            local: local.into(),
        }
    }

    /// The presentation prefix.
    #[must_use]
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// The namespace URI this name lives in.
    #[must_use]
    pub fn namespace_uri(&self) -> &str {
        &self.namespace_uri
    }

    /// The local part.
    #[must_use]
    pub fn local(&self) -> &str {
        &self.local
    }

    /// The fully expanded URI (`namespace_uri + local`).
    #[must_use]
    pub fn uri(&self) -> String {
        format!("{}{}", self.namespace_uri, self.local)
    }
}

impl PartialEq for QualifiedName {
    fn eq(&self, other: &Self) -> bool {
        self.namespace_uri == other.namespace_uri && self.local == other.local
    }
}

impl Eq for QualifiedName {}

impl Hash for QualifiedName {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.namespace_uri.hash(state);
        self.local.hash(state);
    }
}

impl PartialOrd for QualifiedName {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for QualifiedName {
    fn cmp(&self, other: &Self) -> Ordering {
        (&self.namespace_uri, &self.local).cmp(&(&other.namespace_uri, &other.local))
    }
}

impl fmt::Display for QualifiedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.prefix, self.local)
    }
}
