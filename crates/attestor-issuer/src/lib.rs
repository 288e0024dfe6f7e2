//! Attestor Issuer: the credential-exchange orchestrator.
//!
//! - [`IdentityRegistry`]: crash-safe persistence of the issuer DID, schema id
//!   and credential definition id
//! - [`RegistrationWorkflow`]: DID import → schema → credential definition
//! - [`CredentialExchangeReactor`]: auto-accepts received credential offers
//! - [`ProofRequestBuilder`]: proof requests bound to the current credential definition
//! - [`IssuanceService`]: credential offers for the current credential definition

mod call;
pub mod error;
pub mod issuance;
pub mod proof_request;
pub mod reactor;
pub mod registry;
pub mod store;
pub mod workflow;

#[cfg(test)]
mod testing;

pub use error::IssuerError;
pub use issuance::IssuanceService;
pub use proof_request::{
    validate_predicate_value, AttributeQuery, PredicateQuery, ProofQuery, ProofRequestBuilder,
    ProofRequester,
};
pub use reactor::{CredentialExchangeReactor, ExchangeProgress, Reaction};
pub use registry::IdentityRegistry;
pub use store::{FileIdentityStore, IdentityStore, MemoryIdentityStore, IDENTITY_RECORD_KEY};
pub use workflow::{RegistrationWorkflow, WorkflowConfig};
