use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::CoreError;

/// Progress of the issuer's setup sequence, derived from which identifiers
/// the identity record currently holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegistrationStage {
    NotStarted,
    DidImported,
    SchemaRegistered,
    CredentialDefinitionRegistered,
}

/// Steps of the setup sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistrationStep {
    ImportDid,
    RegisterSchema,
    RegisterCredentialDefinition,
}

impl RegistrationStage {
    /// Apply a step to the current stage.
    ///
    /// Valid transitions:
    /// - any stage → DidImported (ImportDid; a different DID starts a new epoch)
    /// - DidImported or later → SchemaRegistered (RegisterSchema)
    /// - SchemaRegistered or later → CredentialDefinitionRegistered (RegisterCredentialDefinition)
    pub fn next(self, step: RegistrationStep) -> Result<RegistrationStage, CoreError> {
        let next = match (self, step) {
            (_, RegistrationStep::ImportDid) => RegistrationStage::DidImported,

            (RegistrationStage::NotStarted, RegistrationStep::RegisterSchema) => {
                return Err(CoreError::InvalidRegistrationStep {
                    from: self,
                    reason: "no DID has been imported".into(),
                });
            }
            (_, RegistrationStep::RegisterSchema) => RegistrationStage::SchemaRegistered,

            (
                RegistrationStage::NotStarted | RegistrationStage::DidImported,
                RegistrationStep::RegisterCredentialDefinition,
            ) => {
                return Err(CoreError::InvalidRegistrationStep {
                    from: self,
                    reason: "no schema has been registered".into(),
                });
            }
            (_, RegistrationStep::RegisterCredentialDefinition) => {
                RegistrationStage::CredentialDefinitionRegistered
            }
        };

        tracing::debug!(from = %self, to = %next, step = ?step, "registration stage transition");
        Ok(next)
    }

    /// Check if a step is permitted without applying it.
    pub fn can_apply(self, step: RegistrationStep) -> bool {
        self.next(step).is_ok()
    }
}

impl fmt::Display for RegistrationStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotStarted => write!(f, "NotStarted"),
            Self::DidImported => write!(f, "DidImported"),
            Self::SchemaRegistered => write!(f, "SchemaRegistered"),
            Self::CredentialDefinitionRegistered => write!(f, "CredentialDefinitionRegistered"),
        }
    }
}
