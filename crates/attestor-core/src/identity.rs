use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::registration::{RegistrationStage, RegistrationStep};
use crate::types::{CredentialDefinitionId, Did, SchemaId};

/// The issuer's persisted identity state.
///
/// Invariant: `credential_definition_id` set ⇒ `schema_id` set ⇒ `did` set.
/// The `with_*` constructors are the only way to advance a record and each
/// one preserves the invariant.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentityRecord {
    #[serde(default)]
    pub did: Option<Did>,
    #[serde(default)]
    pub schema_id: Option<SchemaId>,
    #[serde(default)]
    pub credential_definition_id: Option<CredentialDefinitionId>,
}

impl IdentityRecord {
    /// Stage derived from which identifiers are present.
    pub fn stage(&self) -> RegistrationStage {
        match (&self.did, &self.schema_id, &self.credential_definition_id) {
            (Some(_), Some(_), Some(_)) => RegistrationStage::CredentialDefinitionRegistered,
            (Some(_), Some(_), None) => RegistrationStage::SchemaRegistered,
            (Some(_), None, _) => RegistrationStage::DidImported,
            (None, _, _) => RegistrationStage::NotStarted,
        }
    }

    /// Whether the dependency chain holds.
    pub fn is_consistent(&self) -> bool {
        let schema_ok = self.schema_id.is_none() || self.did.is_some();
        let cred_def_ok = self.credential_definition_id.is_none() || self.schema_id.is_some();
        schema_ok && cred_def_ok
    }

    /// Record a DID. Re-binding the same DID keeps the downstream identifiers;
    /// a different DID starts a new registration epoch and clears them.
    pub fn with_did(&self, did: Did) -> Self {
        if self.did.as_ref() == Some(&did) {
            return self.clone();
        }
        Self {
            did: Some(did),
            schema_id: None,
            credential_definition_id: None,
        }
    }

    /// Record a schema id. Requires a DID. A different schema id clears the
    /// credential definition registered against the previous one.
    pub fn with_schema_id(&self, schema_id: SchemaId) -> Result<Self, CoreError> {
        self.stage().next(RegistrationStep::RegisterSchema)?;
        if self.schema_id.as_ref() == Some(&schema_id) {
            return Ok(self.clone());
        }
        Ok(Self {
            did: self.did.clone(),
            schema_id: Some(schema_id),
            credential_definition_id: None,
        })
    }

    /// Record a credential definition id. Requires a schema id.
    pub fn with_credential_definition_id(
        &self,
        credential_definition_id: CredentialDefinitionId,
    ) -> Result<Self, CoreError> {
        self.stage()
            .next(RegistrationStep::RegisterCredentialDefinition)?;
        Ok(Self {
            did: self.did.clone(),
            schema_id: self.schema_id.clone(),
            credential_definition_id: Some(credential_definition_id),
        })
    }
}
