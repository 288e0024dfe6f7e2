//! Attestor Agent Boundary
//!
//! The issuer reaches wallet, ledger and DIDComm functionality only through
//! the [`AgentCapabilities`] trait defined here:
//! - DID import and resolution
//! - schema and credential definition registration
//! - credential offers and offer acceptance
//! - proof requests
//! - the credential state-change event stream
//!
//! [`LocalAgent`] implements the trait in-process (simulated ledger and a
//! loopback holder) so the service runs without external infrastructure.

pub mod capability;
pub mod document;
pub mod error;
pub mod events;
pub mod local;
pub mod proof;

pub use capability::{
    AgentCapabilities, CredentialAttribute, CredentialDefinitionRegistration,
    CredentialDefinitionRegistrationResult, CredentialExchangeRecord, CredentialOffer, DidImport,
    ExchangeRole, KeyType, ProofExchangeRecord, ProtocolVersion, SchemaRegistration,
    SchemaRegistrationResult,
};
pub use document::{DidDocument, VerificationMethod};
pub use error::AgentError;
pub use events::CredentialStateChanged;
pub use local::{LocalAgent, LocalAgentConfig};
pub use proof::{AttributeFilter, PredicateType, ProofAttributeInfo, ProofPredicateInfo, ProofRequestSpec};
