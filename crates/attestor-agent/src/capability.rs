use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use zeroize::Zeroizing;

use attestor_core::{CredentialExchangeState, Did, ProofExchangeState};

use crate::document::DidDocument;
use crate::error::AgentError;
use crate::events::CredentialStateChanged;
use crate::proof::ProofRequestSpec;

/// Key algorithm of imported key material.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyType {
    Ed25519,
}

/// Issue-credential / present-proof protocol version.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProtocolVersion {
    V1,
    #[default]
    V2,
}

/// Request to bind key material derived from a seed to a DID.
pub struct DidImport {
    pub did: Did,
    pub seed: Zeroizing<Vec<u8>>,
    pub key_type: KeyType,
    /// Replace key material already bound to this DID.
    pub overwrite: bool,
}

impl std::fmt::Debug for DidImport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DidImport")
            .field("did", &self.did)
            .field("seed", &"<redacted>")
            .field("key_type", &self.key_type)
            .field("overwrite", &self.overwrite)
            .finish()
    }
}

/// Schema registration request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaRegistration {
    pub issuer_did: String,
    pub attr_names: Vec<String>,
    pub name: String,
    pub version: String,
}

/// Outcome of a schema registration as reported upstream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum SchemaRegistrationResult {
    Finished {
        #[serde(rename = "schemaId")]
        schema_id: Option<String>,
    },
    Failed {
        reason: String,
    },
}

/// Credential definition registration request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialDefinitionRegistration {
    pub issuer_did: String,
    pub schema_id: String,
    pub tag: String,
}

/// Outcome of a credential definition registration as reported upstream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum CredentialDefinitionRegistrationResult {
    Finished {
        #[serde(rename = "credentialDefinitionId")]
        credential_definition_id: Option<String>,
    },
    Failed {
        reason: String,
    },
}

/// A single attribute value of a credential preview.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialAttribute {
    pub name: String,
    pub value: String,
}

impl CredentialAttribute {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Credential offer request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialOffer {
    pub protocol_version: ProtocolVersion,
    pub connection_id: String,
    pub credential_definition_id: String,
    pub attributes: Vec<CredentialAttribute>,
}

/// Which side of an exchange a record belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExchangeRole {
    Issuer,
    Holder,
}

/// Agent-owned credential exchange record; the issuer only observes it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialExchangeRecord {
    pub id: String,
    pub connection_id: String,
    pub thread_id: String,
    pub role: ExchangeRole,
    pub state: CredentialExchangeState,
    pub protocol_version: ProtocolVersion,
    pub credential_definition_id: String,
    pub attributes: Vec<CredentialAttribute>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Agent-owned proof exchange record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProofExchangeRecord {
    pub id: String,
    pub connection_id: String,
    pub state: ProofExchangeState,
    pub protocol_version: ProtocolVersion,
    pub request: ProofRequestSpec,
    pub created_at: DateTime<Utc>,
}

/// Capabilities the issuer requires from the agent runtime.
///
/// Every method may involve a network or ledger round-trip; callers bound
/// them with their own timeouts.
#[async_trait]
pub trait AgentCapabilities: Send + Sync {
    /// Resolve a DID to its document.
    async fn resolve_did(&self, did: &str) -> Result<DidDocument, AgentError>;

    /// Import key material for a DID. Fails with `ImportRejected`.
    async fn import_did(&self, request: DidImport) -> Result<(), AgentError>;

    /// DIDs created or imported into this agent's wallet.
    async fn created_dids(&self) -> Result<Vec<String>, AgentError>;

    async fn register_schema(
        &self,
        request: SchemaRegistration,
    ) -> Result<SchemaRegistrationResult, AgentError>;

    async fn register_credential_definition(
        &self,
        request: CredentialDefinitionRegistration,
    ) -> Result<CredentialDefinitionRegistrationResult, AgentError>;

    /// Start an issuance by offering a credential over a connection.
    async fn offer_credential(
        &self,
        offer: CredentialOffer,
    ) -> Result<CredentialExchangeRecord, AgentError>;

    /// Accept a received offer. Fails with `AcceptRejected`.
    async fn accept_offer(&self, exchange_id: &str) -> Result<(), AgentError>;

    async fn credential_exchanges(&self) -> Result<Vec<CredentialExchangeRecord>, AgentError>;

    /// Send a proof request over a connection.
    async fn request_proof(
        &self,
        protocol_version: ProtocolVersion,
        connection_id: &str,
        spec: ProofRequestSpec,
    ) -> Result<ProofExchangeRecord, AgentError>;

    async fn proof_exchanges(&self) -> Result<Vec<ProofExchangeRecord>, AgentError>;

    /// Subscribe to credential state changes from this point on.
    fn subscribe_credential_state_changes(&self) -> broadcast::Receiver<CredentialStateChanged>;
}
