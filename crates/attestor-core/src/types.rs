use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::CoreError;

/// Fully qualified decentralized identifier.
/// Format: `did:<method>:<namespace>:<identifier>`, where the namespace may
/// itself contain colons (e.g. `did:indy:bcovrin:test:PaAQsUg4JwvaVuvkk9VQok`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Did(String);

impl Did {
    /// Parse a DID from its full URI string.
    pub fn new(uri: impl Into<String>) -> Result<Self, CoreError> {
        let uri = uri.into();
        if !uri.starts_with("did:") {
            return Err(CoreError::InvalidDid(format!(
                "DID must start with 'did:', got: {}",
                uri
            )));
        }
        let parts: Vec<&str> = uri.split(':').collect();
        if parts.len() < 4 || parts.iter().any(|p| p.is_empty()) {
            return Err(CoreError::InvalidDid(format!(
                "DID must have format 'did:<method>:<namespace>:<identifier>', got: {}",
                uri
            )));
        }
        Ok(Self(uri))
    }

    /// Qualify an unqualified identifier under a method and namespace.
    pub fn from_parts(method: &str, namespace: &str, identifier: &str) -> Result<Self, CoreError> {
        if identifier.is_empty() || identifier.contains(':') {
            return Err(CoreError::InvalidDid(format!(
                "unqualified identifier must be non-empty and colon-free, got: {:?}",
                identifier
            )));
        }
        Self::new(format!("did:{}:{}:{}", method, namespace, identifier))
    }

    /// Get the full DID URI.
    pub fn uri(&self) -> &str {
        &self.0
    }

    /// Extract the method (e.g. `indy`).
    pub fn method(&self) -> Option<&str> {
        self.0.split(':').nth(1)
    }

    /// Extract the namespace between the method and the identifier.
    pub fn namespace(&self) -> Option<&str> {
        let rest = self.0.strip_prefix("did:")?;
        let (_, after_method) = rest.split_once(':')?;
        let (namespace, _) = after_method.rsplit_once(':')?;
        Some(namespace)
    }

    /// Extract the unqualified identifier (last segment).
    pub fn identifier(&self) -> Option<&str> {
        self.0.rsplit(':').next()
    }
}

impl TryFrom<String> for Did {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Did> for String {
    fn from(value: Did) -> Self {
        value.0
    }
}

impl fmt::Display for Did {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier returned by a successful schema registration.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SchemaId(String);

impl SchemaId {
    /// Create a schema identifier; empty strings are rejected.
    pub fn new(id: impl Into<String>) -> Result<Self, CoreError> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(CoreError::InvalidIdentifier("schema id is empty".into()));
        }
        Ok(Self(id))
    }

    /// Get the schema ID string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for SchemaId {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<SchemaId> for String {
    fn from(value: SchemaId) -> Self {
        value.0
    }
}

impl fmt::Display for SchemaId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier returned by a successful credential definition registration.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CredentialDefinitionId(String);

impl CredentialDefinitionId {
    /// Create a credential definition identifier; empty strings are rejected.
    pub fn new(id: impl Into<String>) -> Result<Self, CoreError> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(CoreError::InvalidIdentifier(
                "credential definition id is empty".into(),
            ));
        }
        Ok(Self(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for CredentialDefinitionId {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<CredentialDefinitionId> for String {
    fn from(value: CredentialDefinitionId) -> Self {
        value.0
    }
}

impl fmt::Display for CredentialDefinitionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
