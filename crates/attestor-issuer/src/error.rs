use std::time::Duration;

use attestor_agent::AgentError;
use attestor_core::CoreError;

/// Issuer errors.
#[derive(Debug, thiserror::Error)]
pub enum IssuerError {
    #[error("DID import rejected: {0}")]
    ImportError(String),

    #[error("schema registration failed: {reason}")]
    SchemaRegistrationError { reason: String },

    #[error("credential definition registration failed: {reason}")]
    CredentialDefinitionRegistrationError { reason: String },

    #[error("invariant violation: {0}")]
    InvariantViolation(String),

    #[error("no issuer DID has been imported")]
    MissingDid,

    #[error("no schema has been registered")]
    MissingSchema,

    #[error("no credential definition has been registered")]
    MissingCredentialDefinition,

    #[error("{identifier} {supplied} does not match the registered {registered}")]
    StaleIdentifier {
        identifier: &'static str,
        supplied: String,
        registered: String,
    },

    #[error("invalid predicate: {0}")]
    InvalidPredicate(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("{operation} timed out after {after:?}")]
    Timeout {
        operation: &'static str,
        after: Duration,
    },

    #[error("offer acceptance failed: {0}")]
    AcceptError(String),

    #[error("storage error: {0}")]
    Storage(String),

    #[error("agent error: {0}")]
    Agent(#[from] AgentError),

    #[error("core error: {0}")]
    Core(#[from] CoreError),
}

impl IssuerError {
    /// Stable category name for responses and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ImportError(_) => "import_error",
            Self::SchemaRegistrationError { .. } => "schema_registration_error",
            Self::CredentialDefinitionRegistrationError { .. } => {
                "credential_definition_registration_error"
            }
            Self::InvariantViolation(_) => "invariant_violation",
            Self::MissingDid => "missing_did",
            Self::MissingSchema => "missing_schema",
            Self::MissingCredentialDefinition => "missing_credential_definition",
            Self::StaleIdentifier { .. } => "stale_identifier",
            Self::InvalidPredicate(_) => "invalid_predicate",
            Self::InvalidRequest(_) => "invalid_request",
            Self::Timeout { .. } => "timeout",
            Self::AcceptError(_) => "accept_error",
            Self::Storage(_) => "storage_error",
            Self::Agent(AgentError::NotFound(_)) => "not_found",
            Self::Agent(AgentError::InvalidRequest(_)) => "invalid_request",
            Self::Agent(_) => "agent_error",
            Self::Core(_) => "invalid_identifier",
        }
    }
}

impl From<std::io::Error> for IssuerError {
    fn from(e: std::io::Error) -> Self {
        Self::Storage(e.to_string())
    }
}

impl From<serde_json::Error> for IssuerError {
    fn from(e: serde_json::Error) -> Self {
        Self::Storage(format!("identity record encoding: {}", e))
    }
}
