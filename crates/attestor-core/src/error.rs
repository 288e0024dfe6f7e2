use crate::registration::RegistrationStage;

/// Core errors: identifier parsing and state bookkeeping.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("invalid DID format: {0}")]
    InvalidDid(String),

    #[error("invalid identifier: {0}")]
    InvalidIdentifier(String),

    #[error("invalid registration step from {from}: {reason}")]
    InvalidRegistrationStep {
        from: RegistrationStage,
        reason: String,
    },

    #[error("unknown state: {0}")]
    UnknownState(String),
}
