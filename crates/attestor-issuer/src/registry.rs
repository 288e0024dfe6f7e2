use std::sync::{Mutex, PoisonError, RwLock};

use attestor_core::{
    CoreError, CredentialDefinitionId, Did, IdentityRecord, RegistrationStage, SchemaId,
};

use crate::error::IssuerError;
use crate::store::{IdentityStore, MemoryIdentityStore};

/// The issuer's identity registry: DID, schema id and credential definition id.
///
/// Writers are serialized by a single-writer lock and every write commits a
/// complete snapshot to the backing store before it becomes visible. Readers
/// clone the last committed snapshot under a short read lock.
pub struct IdentityRegistry {
    store: Box<dyn IdentityStore>,
    snapshot: RwLock<IdentityRecord>,
    writer: Mutex<()>,
}

impl IdentityRegistry {
    /// Open the registry on a backing store, loading its committed snapshot.
    pub fn open(store: Box<dyn IdentityStore>) -> Result<Self, IssuerError> {
        let record = store.load()?.unwrap_or_default();
        if !record.is_consistent() {
            return Err(IssuerError::InvariantViolation(format!(
                "persisted identity record breaks the DID → schema → credential definition chain: {:?}",
                record
            )));
        }
        tracing::info!(stage = %record.stage(), "identity registry opened");
        Ok(Self {
            store,
            snapshot: RwLock::new(record),
            writer: Mutex::new(()),
        })
    }

    /// Registry backed by a fresh in-memory store.
    pub fn in_memory() -> Self {
        Self {
            store: Box::new(MemoryIdentityStore::new()),
            snapshot: RwLock::new(IdentityRecord::default()),
            writer: Mutex::new(()),
        }
    }

    /// Last committed record; empty before the first write.
    pub fn get(&self) -> IdentityRecord {
        self.snapshot
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn did(&self) -> Option<Did> {
        self.get().did
    }

    pub fn schema_id(&self) -> Option<SchemaId> {
        self.get().schema_id
    }

    pub fn credential_definition_id(&self) -> Option<CredentialDefinitionId> {
        self.get().credential_definition_id
    }

    pub fn stage(&self) -> RegistrationStage {
        self.get().stage()
    }

    /// Bind the issuer DID. A different DID than the current one starts a new
    /// registration epoch and clears the schema and credential definition.
    pub fn set_did(&self, did: Did) -> Result<IdentityRecord, IssuerError> {
        self.update(|current| Ok(current.with_did(did)))
    }

    /// Record the schema id. Requires a DID.
    pub fn set_schema_id(&self, schema_id: SchemaId) -> Result<IdentityRecord, IssuerError> {
        self.update(|current| with_schema(current, None, schema_id))
    }

    /// Record the schema id only if `issuer` is still the registered DID.
    pub fn set_schema_id_for(
        &self,
        issuer: &Did,
        schema_id: SchemaId,
    ) -> Result<IdentityRecord, IssuerError> {
        self.update(|current| with_schema(current, Some(issuer), schema_id))
    }

    /// Record the credential definition id. Requires a schema id.
    pub fn set_credential_definition_id(
        &self,
        credential_definition_id: CredentialDefinitionId,
    ) -> Result<IdentityRecord, IssuerError> {
        self.update(|current| with_credential_definition(current, None, credential_definition_id))
    }

    /// Record the credential definition id only if `schema_id` is still the
    /// registered schema.
    pub fn set_credential_definition_id_for(
        &self,
        schema_id: &SchemaId,
        credential_definition_id: CredentialDefinitionId,
    ) -> Result<IdentityRecord, IssuerError> {
        self.update(|current| {
            with_credential_definition(current, Some(schema_id), credential_definition_id)
        })
    }

    /// Read-modify-write under the writer lock. The in-memory snapshot only
    /// changes after the store has committed.
    fn update<F>(&self, change: F) -> Result<IdentityRecord, IssuerError>
    where
        F: FnOnce(&IdentityRecord) -> Result<IdentityRecord, IssuerError>,
    {
        let _writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        let current = self.get();
        let next = change(&current)?;
        if next == current {
            return Ok(next);
        }
        self.store.commit(&next)?;
        *self.snapshot.write().unwrap_or_else(PoisonError::into_inner) = next.clone();
        tracing::debug!(from = %current.stage(), to = %next.stage(), "identity record updated");
        Ok(next)
    }
}

fn with_schema(
    current: &IdentityRecord,
    issuer: Option<&Did>,
    schema_id: SchemaId,
) -> Result<IdentityRecord, IssuerError> {
    let registered = current.did.as_ref().ok_or(IssuerError::MissingDid)?;
    if let Some(issuer) = issuer {
        if issuer != registered {
            return Err(IssuerError::StaleIdentifier {
                identifier: "issuer DID",
                supplied: issuer.to_string(),
                registered: registered.to_string(),
            });
        }
    }
    current
        .with_schema_id(schema_id)
        .map_err(|e| precondition_error(e, IssuerError::MissingDid))
}

fn with_credential_definition(
    current: &IdentityRecord,
    schema: Option<&SchemaId>,
    credential_definition_id: CredentialDefinitionId,
) -> Result<IdentityRecord, IssuerError> {
    let registered = current.schema_id.as_ref().ok_or(IssuerError::MissingSchema)?;
    if let Some(schema) = schema {
        if schema != registered {
            return Err(IssuerError::StaleIdentifier {
                identifier: "schema id",
                supplied: schema.to_string(),
                registered: registered.to_string(),
            });
        }
    }
    current
        .with_credential_definition_id(credential_definition_id)
        .map_err(|e| precondition_error(e, IssuerError::MissingSchema))
}

fn precondition_error(error: CoreError, missing: IssuerError) -> IssuerError {
    match error {
        CoreError::InvalidRegistrationStep { .. } => missing,
        other => IssuerError::Core(other),
    }
}
