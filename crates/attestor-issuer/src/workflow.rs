//! Registration workflow: DID import → schema → credential definition.
//!
//! Each step re-validates its precondition against the registry, so steps
//! called out of order fail fast instead of reaching the agent.

use std::sync::Arc;
use std::time::Duration;

use zeroize::Zeroizing;

use attestor_agent::{
    AgentCapabilities, AgentError, CredentialDefinitionRegistration,
    CredentialDefinitionRegistrationResult, DidDocument, DidImport, KeyType, SchemaRegistration,
    SchemaRegistrationResult,
};
use attestor_core::{
    CredentialDefinitionId, Did, IdentityRecord, RegistrationStage, RegistrationStep, SchemaId,
};

use crate::call::bounded;
use crate::error::IssuerError;
use crate::registry::IdentityRegistry;

/// Settings for qualifying DIDs and bounding agent calls.
#[derive(Debug, Clone)]
pub struct WorkflowConfig {
    pub did_method: String,
    pub did_namespace: String,
    pub call_timeout: Duration,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            did_method: "indy".into(),
            did_namespace: "bcovrin:test".into(),
            call_timeout: Duration::from_secs(30),
        }
    }
}

pub struct RegistrationWorkflow {
    agent: Arc<dyn AgentCapabilities>,
    registry: Arc<IdentityRegistry>,
    config: WorkflowConfig,
}

impl RegistrationWorkflow {
    pub fn new(
        agent: Arc<dyn AgentCapabilities>,
        registry: Arc<IdentityRegistry>,
        config: WorkflowConfig,
    ) -> Self {
        Self {
            agent,
            registry,
            config,
        }
    }

    pub fn config(&self) -> &WorkflowConfig {
        &self.config
    }

    pub fn registry(&self) -> &Arc<IdentityRegistry> {
        &self.registry
    }

    /// Current stage, derived from the registry.
    pub fn stage(&self) -> RegistrationStage {
        self.registry.stage()
    }

    /// Qualify a bare identifier as `did:<method>:<namespace>:<id>`.
    /// Already-qualified DIDs are accepted as given.
    pub fn qualify_did(&self, unqualified: &str) -> Result<Did, IssuerError> {
        let unqualified = unqualified.trim();
        if unqualified.starts_with("did:") {
            return Ok(Did::new(unqualified)?);
        }
        Ok(Did::from_parts(
            &self.config.did_method,
            &self.config.did_namespace,
            unqualified,
        )?)
    }

    /// Import key material for a DID and bind it as the issuer DID.
    pub async fn import_did(
        &self,
        seed: &str,
        unqualified_did: &str,
        overwrite: bool,
    ) -> Result<Did, IssuerError> {
        if seed.is_empty() {
            return Err(IssuerError::ImportError("seed must not be empty".into()));
        }
        let did = self
            .qualify_did(unqualified_did)
            .map_err(|e| IssuerError::ImportError(e.to_string()))?;
        self.stage().next(RegistrationStep::ImportDid)?;

        let request = DidImport {
            did: did.clone(),
            seed: Zeroizing::new(seed.as_bytes().to_vec()),
            key_type: KeyType::Ed25519,
            overwrite,
        };
        bounded("import_did", self.config.call_timeout, async {
            self.agent.import_did(request).await.map_err(|e| match e {
                AgentError::ImportRejected(reason) | AgentError::InvalidRequest(reason) => {
                    IssuerError::ImportError(reason)
                }
                other => IssuerError::Agent(other),
            })
        })
        .await?;

        let imported = did.clone();
        self.persist(move |registry| registry.set_did(imported)).await?;
        tracing::info!(did = %did, overwrite, "issuer DID imported");
        Ok(did)
    }

    /// Register a schema for the issuer DID and persist its id.
    pub async fn register_schema(
        &self,
        issuer_did: &str,
        attribute_names: Vec<String>,
        name: &str,
        version: &str,
    ) -> Result<SchemaId, IssuerError> {
        if issuer_did.trim().is_empty() {
            return Err(IssuerError::MissingDid);
        }
        let issuer = Did::new(issuer_did.trim())?;
        let registered = self.registry.did().ok_or(IssuerError::MissingDid)?;
        if issuer != registered {
            return Err(IssuerError::StaleIdentifier {
                identifier: "issuer DID",
                supplied: issuer.to_string(),
                registered: registered.to_string(),
            });
        }
        self.stage().next(RegistrationStep::RegisterSchema)?;

        let request = SchemaRegistration {
            issuer_did: issuer.to_string(),
            attr_names: attribute_names,
            name: name.to_string(),
            version: version.to_string(),
        };
        let result = bounded("register_schema", self.config.call_timeout, async {
            self.agent.register_schema(request).await.map_err(IssuerError::from)
        })
        .await?;

        let schema_id = match result {
            SchemaRegistrationResult::Failed { reason } => {
                tracing::warn!(did = %issuer, reason = %reason, "schema registration failed");
                return Err(IssuerError::SchemaRegistrationError { reason });
            }
            SchemaRegistrationResult::Finished { schema_id } => {
                finished_id(schema_id, "schema id", SchemaId::new)?
            }
        };

        let (owner, registered_id) = (issuer.clone(), schema_id.clone());
        self.persist(move |registry| registry.set_schema_id_for(&owner, registered_id))
            .await?;
        tracing::info!(did = %issuer, schema_id = %schema_id, name, version, "schema registered");
        Ok(schema_id)
    }

    /// Register a credential definition for a schema and persist its id.
    pub async fn register_credential_definition(
        &self,
        issuer_did: &str,
        schema_id: &str,
        tag: &str,
    ) -> Result<CredentialDefinitionId, IssuerError> {
        if issuer_did.trim().is_empty() {
            return Err(IssuerError::MissingDid);
        }
        if schema_id.trim().is_empty() {
            return Err(IssuerError::MissingSchema);
        }
        let issuer = Did::new(issuer_did.trim())?;
        let schema = SchemaId::new(schema_id.trim())?;

        let current = self.registry.get();
        let registered_did = current.did.as_ref().ok_or(IssuerError::MissingDid)?;
        if &issuer != registered_did {
            return Err(IssuerError::StaleIdentifier {
                identifier: "issuer DID",
                supplied: issuer.to_string(),
                registered: registered_did.to_string(),
            });
        }
        let registered_schema = current.schema_id.as_ref().ok_or(IssuerError::MissingSchema)?;
        if &schema != registered_schema {
            return Err(IssuerError::StaleIdentifier {
                identifier: "schema id",
                supplied: schema.to_string(),
                registered: registered_schema.to_string(),
            });
        }
        current
            .stage()
            .next(RegistrationStep::RegisterCredentialDefinition)?;

        let request = CredentialDefinitionRegistration {
            issuer_did: issuer.to_string(),
            schema_id: schema.to_string(),
            tag: tag.to_string(),
        };
        let result = bounded(
            "register_credential_definition",
            self.config.call_timeout,
            async {
                self.agent
                    .register_credential_definition(request)
                    .await
                    .map_err(IssuerError::from)
            },
        )
        .await?;

        let credential_definition_id = match result {
            CredentialDefinitionRegistrationResult::Failed { reason } => {
                tracing::warn!(
                    schema_id = %schema,
                    reason = %reason,
                    "credential definition registration failed"
                );
                return Err(IssuerError::CredentialDefinitionRegistrationError { reason });
            }
            CredentialDefinitionRegistrationResult::Finished {
                credential_definition_id,
            } => finished_id(
                credential_definition_id,
                "credential definition id",
                CredentialDefinitionId::new,
            )?,
        };

        let (owner, registered_id) = (schema.clone(), credential_definition_id.clone());
        self.persist(move |registry| {
            registry.set_credential_definition_id_for(&owner, registered_id)
        })
        .await?;
        tracing::info!(
            schema_id = %schema,
            credential_definition_id = %credential_definition_id,
            tag,
            "credential definition registered"
        );
        Ok(credential_definition_id)
    }

    /// Run a registry write on the blocking pool. Commits fsync, so they
    /// stay off the async workers.
    async fn persist<F>(&self, write: F) -> Result<(), IssuerError>
    where
        F: FnOnce(&IdentityRegistry) -> Result<IdentityRecord, IssuerError> + Send + 'static,
    {
        let registry = self.registry.clone();
        tokio::task::spawn_blocking(move || write(&registry))
            .await
            .map_err(|e| IssuerError::Storage(format!("registry write task failed: {}", e)))??;
        Ok(())
    }

    /// DIDs the agent holds key material for.
    pub async fn created_dids(&self) -> Result<Vec<String>, IssuerError> {
        bounded("created_dids", self.config.call_timeout, async {
            self.agent.created_dids().await.map_err(IssuerError::from)
        })
        .await
    }

    pub async fn resolve_did(&self, did: &str) -> Result<DidDocument, IssuerError> {
        bounded("resolve_did", self.config.call_timeout, async {
            self.agent.resolve_did(did).await.map_err(IssuerError::from)
        })
        .await
    }
}

/// A `finished` result must carry a usable identifier.
fn finished_id<T, E>(
    id: Option<String>,
    what: &str,
    parse: impl FnOnce(String) -> Result<T, E>,
) -> Result<T, IssuerError> {
    let violation = |detail: &str| {
        tracing::error!(what, detail, "agent reported success without an identifier");
        IssuerError::InvariantViolation(format!("registration finished {}", detail))
    };
    match id {
        None => Err(violation(&format!("without a {}", what))),
        Some(id) => parse(id).map_err(|_| violation(&format!("with an empty {}", what))),
    }
}
