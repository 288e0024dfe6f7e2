//! Attestor Core: identifiers, the persisted identity record, and the
//! state enumerations shared by the agent boundary and the issuer.

pub mod error;
pub mod exchange_state;
pub mod identity;
pub mod registration;
pub mod types;

pub use error::CoreError;
pub use exchange_state::{CredentialExchangeState, ProofExchangeState};
pub use identity::IdentityRecord;
pub use registration::{RegistrationStage, RegistrationStep};
pub use types::{CredentialDefinitionId, Did, SchemaId};
