//! In-process agent: a simulated ledger plus a loopback holder.
//!
//! Every offer is mirrored into a holder-side record in `OfferReceived`;
//! accepting it drives both records through the issue-credential flow and
//! emits a state-change event for each step.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use ed25519_dalek::SigningKey;
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::broadcast;

use attestor_core::{CredentialExchangeState, ProofExchangeState};

use crate::capability::{
    AgentCapabilities, CredentialDefinitionRegistration, CredentialDefinitionRegistrationResult,
    CredentialExchangeRecord, CredentialOffer, DidImport, ExchangeRole, KeyType,
    ProofExchangeRecord, ProtocolVersion, SchemaRegistration, SchemaRegistrationResult,
};
use crate::document::DidDocument;
use crate::error::AgentError;
use crate::events::CredentialStateChanged;
use crate::proof::ProofRequestSpec;

/// Seed length accepted for Ed25519 key derivation.
const SEED_LEN: usize = 32;

/// Configuration for the local agent.
#[derive(Debug, Clone)]
pub struct LocalAgentConfig {
    /// Agent label.
    pub label: String,
    /// Capacity of the state-change broadcast channel.
    pub event_channel_capacity: usize,
}

impl Default for LocalAgentConfig {
    fn default() -> Self {
        Self {
            label: "attestor-local-agent".into(),
            event_channel_capacity: 256,
        }
    }
}

#[derive(Debug, Clone)]
struct WalletDid {
    verkey: String,
    #[allow(dead_code)]
    key_type: KeyType,
    #[allow(dead_code)]
    imported_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
struct LedgerSchema {
    issuer_did: String,
    attr_names: BTreeSet<String>,
}

#[derive(Debug, Clone)]
struct LedgerCredentialDefinition {
    schema_id: String,
}

/// In-process implementation of [`AgentCapabilities`].
pub struct LocalAgent {
    config: LocalAgentConfig,
    /// DID → wallet key binding.
    dids: DashMap<String, WalletDid>,
    /// Schema id → ledger schema.
    schemas: DashMap<String, LedgerSchema>,
    /// Credential definition id → ledger credential definition.
    credential_definitions: DashMap<String, LedgerCredentialDefinition>,
    /// Ledger sequence number for credential definitions.
    sequence: AtomicU64,
    /// Exchange id → credential exchange record.
    exchanges: DashMap<String, CredentialExchangeRecord>,
    /// Proof exchange id → record.
    proofs: DashMap<String, ProofExchangeRecord>,
    event_tx: broadcast::Sender<CredentialStateChanged>,
}

impl LocalAgent {
    pub fn new(config: LocalAgentConfig) -> Self {
        let (event_tx, _) = broadcast::channel(config.event_channel_capacity.max(1));
        tracing::info!(label = %config.label, "local agent created");
        Self {
            config,
            dids: DashMap::new(),
            schemas: DashMap::new(),
            credential_definitions: DashMap::new(),
            sequence: AtomicU64::new(1),
            exchanges: DashMap::new(),
            proofs: DashMap::new(),
            event_tx,
        }
    }

    pub fn label(&self) -> &str {
        &self.config.label
    }

    /// Look up a single exchange record.
    pub fn exchange(&self, id: &str) -> Option<CredentialExchangeRecord> {
        self.exchanges.get(id).map(|e| e.clone())
    }

    /// Id of the other side's record in the same exchange thread.
    fn counterpart(&self, record: &CredentialExchangeRecord) -> Option<String> {
        self.exchanges
            .iter()
            .find(|e| e.thread_id == record.thread_id && e.role != record.role)
            .map(|e| e.key().clone())
    }

    fn insert_exchange(&self, record: CredentialExchangeRecord) {
        let event = CredentialStateChanged::new(
            record.id.clone(),
            record.connection_id.clone(),
            record.state,
            None,
        );
        self.exchanges.insert(record.id.clone(), record);
        self.emit(event);
    }

    /// Move a record to `to` and emit the change.
    fn advance(&self, id: &str, to: CredentialExchangeState) -> Result<(), AgentError> {
        let event = {
            let mut entry = self
                .exchanges
                .get_mut(id)
                .ok_or_else(|| AgentError::NotFound(format!("credential exchange {}", id)))?;
            let from = entry.state;
            entry.state = to;
            entry.updated_at = Utc::now();
            CredentialStateChanged::new(id, entry.connection_id.clone(), to, Some(from))
        };
        self.emit(event);
        Ok(())
    }

    fn emit(&self, event: CredentialStateChanged) {
        tracing::debug!(
            exchange_id = %event.exchange_id,
            state = %event.state,
            "credential state changed"
        );
        // No subscribers is not an error.
        let _ = self.event_tx.send(event);
    }
}

impl Default for LocalAgent {
    fn default() -> Self {
        Self::new(LocalAgentConfig::default())
    }
}

#[async_trait]
impl AgentCapabilities for LocalAgent {
    async fn resolve_did(&self, did: &str) -> Result<DidDocument, AgentError> {
        let entry = self
            .dids
            .get(did)
            .ok_or_else(|| AgentError::NotFound(format!("DID {}", did)))?;
        Ok(DidDocument::with_ed25519_key(did, entry.verkey.clone()))
    }

    async fn import_did(&self, request: DidImport) -> Result<(), AgentError> {
        let seed: [u8; SEED_LEN] = request.seed.as_slice().try_into().map_err(|_| {
            AgentError::ImportRejected(format!(
                "seed must be exactly {} bytes, got {}",
                SEED_LEN,
                request.seed.len()
            ))
        })?;

        let did = request.did.uri().to_string();
        if !request.overwrite && self.dids.contains_key(&did) {
            return Err(AgentError::ImportRejected(format!(
                "DID {} already has key material bound and overwrite is false",
                did
            )));
        }

        let signing_key = match request.key_type {
            KeyType::Ed25519 => SigningKey::from_bytes(&seed),
        };
        let verkey = bs58::encode(signing_key.verifying_key().as_bytes()).into_string();

        self.dids.insert(
            did.clone(),
            WalletDid {
                verkey,
                key_type: request.key_type,
                imported_at: Utc::now(),
            },
        );
        tracing::info!(did = %did, overwrite = request.overwrite, "DID imported");
        Ok(())
    }

    async fn created_dids(&self) -> Result<Vec<String>, AgentError> {
        let mut dids: Vec<String> = self.dids.iter().map(|e| e.key().clone()).collect();
        dids.sort();
        Ok(dids)
    }

    async fn register_schema(
        &self,
        request: SchemaRegistration,
    ) -> Result<SchemaRegistrationResult, AgentError> {
        if !self.dids.contains_key(&request.issuer_did) {
            return Ok(SchemaRegistrationResult::Failed {
                reason: format!("issuer DID {} is not in the wallet", request.issuer_did),
            });
        }
        if request.attr_names.is_empty() {
            return Ok(SchemaRegistrationResult::Failed {
                reason: "schema must declare at least one attribute".into(),
            });
        }
        let attr_names: BTreeSet<String> = request.attr_names.iter().cloned().collect();
        if attr_names.len() != request.attr_names.len() {
            return Ok(SchemaRegistrationResult::Failed {
                reason: "schema attribute names must be unique".into(),
            });
        }

        let schema_id = format!(
            "{}/anoncreds/v0/SCHEMA/{}/{}",
            request.issuer_did, request.name, request.version
        );
        match self.schemas.entry(schema_id.clone()) {
            dashmap::mapref::entry::Entry::Occupied(_) => Ok(SchemaRegistrationResult::Failed {
                reason: format!("duplicate: schema {} already exists on the ledger", schema_id),
            }),
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                slot.insert(LedgerSchema {
                    issuer_did: request.issuer_did,
                    attr_names,
                });
                tracing::info!(schema_id = %schema_id, "schema written to ledger");
                Ok(SchemaRegistrationResult::Finished {
                    schema_id: Some(schema_id),
                })
            }
        }
    }

    async fn register_credential_definition(
        &self,
        request: CredentialDefinitionRegistration,
    ) -> Result<CredentialDefinitionRegistrationResult, AgentError> {
        if !self.dids.contains_key(&request.issuer_did) {
            return Ok(CredentialDefinitionRegistrationResult::Failed {
                reason: format!("issuer DID {} is not in the wallet", request.issuer_did),
            });
        }
        if !self.schemas.contains_key(&request.schema_id) {
            return Ok(CredentialDefinitionRegistrationResult::Failed {
                reason: format!("schema {} not found on the ledger", request.schema_id),
            });
        }
        let duplicate = self.credential_definitions.iter().any(|e| {
            e.schema_id == request.schema_id && e.key().ends_with(&format!("/{}", request.tag))
        });
        if duplicate {
            return Ok(CredentialDefinitionRegistrationResult::Failed {
                reason: format!(
                    "duplicate: credential definition with tag {} already exists for schema {}",
                    request.tag, request.schema_id
                ),
            });
        }

        let seq_no = self.sequence.fetch_add(1, Ordering::SeqCst);
        let credential_definition_id = format!(
            "{}/anoncreds/v0/CLAIM_DEF/{}/{}",
            request.issuer_did, seq_no, request.tag
        );
        self.credential_definitions.insert(
            credential_definition_id.clone(),
            LedgerCredentialDefinition {
                schema_id: request.schema_id,
            },
        );
        tracing::info!(
            credential_definition_id = %credential_definition_id,
            "credential definition written to ledger"
        );
        Ok(CredentialDefinitionRegistrationResult::Finished {
            credential_definition_id: Some(credential_definition_id),
        })
    }

    async fn offer_credential(
        &self,
        offer: CredentialOffer,
    ) -> Result<CredentialExchangeRecord, AgentError> {
        if offer.connection_id.trim().is_empty() {
            return Err(AgentError::InvalidRequest("connection id is empty".into()));
        }
        let schema_id = self
            .credential_definitions
            .get(&offer.credential_definition_id)
            .map(|c| c.schema_id.clone())
            .ok_or_else(|| {
                AgentError::InvalidRequest(format!(
                    "credential definition {} not found",
                    offer.credential_definition_id
                ))
            })?;
        let schema = self
            .schemas
            .get(&schema_id)
            .map(|s| s.clone())
            .ok_or_else(|| AgentError::NotFound(format!("schema {}", schema_id)))?;

        let offered: BTreeSet<String> = offer.attributes.iter().map(|a| a.name.clone()).collect();
        if offered != schema.attr_names || offered.len() != offer.attributes.len() {
            return Err(AgentError::InvalidRequest(format!(
                "offered attributes {:?} do not match schema attributes {:?}",
                offered, schema.attr_names
            )));
        }

        let now = Utc::now();
        let thread_id = uuid::Uuid::now_v7().to_string();
        let issuer_record = CredentialExchangeRecord {
            id: uuid::Uuid::now_v7().to_string(),
            connection_id: offer.connection_id.clone(),
            thread_id: thread_id.clone(),
            role: ExchangeRole::Issuer,
            state: CredentialExchangeState::OfferSent,
            protocol_version: offer.protocol_version,
            credential_definition_id: offer.credential_definition_id.clone(),
            attributes: offer.attributes.clone(),
            created_at: now,
            updated_at: now,
        };
        let holder_record = CredentialExchangeRecord {
            id: uuid::Uuid::now_v7().to_string(),
            role: ExchangeRole::Holder,
            state: CredentialExchangeState::OfferReceived,
            ..issuer_record.clone()
        };

        tracing::info!(
            exchange_id = %issuer_record.id,
            connection_id = %offer.connection_id,
            issuer = %schema.issuer_did,
            "credential offered"
        );
        self.insert_exchange(issuer_record.clone());
        self.insert_exchange(holder_record);
        Ok(issuer_record)
    }

    async fn accept_offer(&self, exchange_id: &str) -> Result<(), AgentError> {
        let record = {
            let mut entry = self.exchanges.get_mut(exchange_id).ok_or_else(|| {
                AgentError::AcceptRejected(format!("credential exchange {} not found", exchange_id))
            })?;
            if entry.role != ExchangeRole::Holder
                || entry.state != CredentialExchangeState::OfferReceived
            {
                return Err(AgentError::AcceptRejected(format!(
                    "exchange {} is in state {} as {:?}, expected a received offer",
                    exchange_id, entry.state, entry.role
                )));
            }
            // Claim the offer while holding the entry lock.
            entry.state = CredentialExchangeState::RequestSent;
            entry.updated_at = Utc::now();
            entry.clone()
        };
        self.emit(CredentialStateChanged::new(
            exchange_id,
            record.connection_id.clone(),
            CredentialExchangeState::RequestSent,
            Some(CredentialExchangeState::OfferReceived),
        ));

        let issuer_id = self.counterpart(&record).ok_or_else(|| {
            AgentError::AcceptRejected(format!("no issuer record for thread {}", record.thread_id))
        })?;

        self.advance(&issuer_id, CredentialExchangeState::RequestReceived)?;
        self.advance(&issuer_id, CredentialExchangeState::CredentialIssued)?;
        self.advance(exchange_id, CredentialExchangeState::CredentialReceived)?;
        self.advance(exchange_id, CredentialExchangeState::Done)?;
        self.advance(&issuer_id, CredentialExchangeState::Done)?;

        tracing::info!(exchange_id = %exchange_id, "credential offer accepted");
        Ok(())
    }

    async fn credential_exchanges(&self) -> Result<Vec<CredentialExchangeRecord>, AgentError> {
        let mut records: Vec<CredentialExchangeRecord> =
            self.exchanges.iter().map(|e| e.value().clone()).collect();
        records.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(records)
    }

    async fn request_proof(
        &self,
        protocol_version: ProtocolVersion,
        connection_id: &str,
        spec: ProofRequestSpec,
    ) -> Result<ProofExchangeRecord, AgentError> {
        if connection_id.trim().is_empty() {
            return Err(AgentError::InvalidRequest("connection id is empty".into()));
        }
        if spec.is_empty() {
            return Err(AgentError::InvalidRequest(
                "proof request has no attributes or predicates".into(),
            ));
        }
        let record = ProofExchangeRecord {
            id: uuid::Uuid::now_v7().to_string(),
            connection_id: connection_id.to_string(),
            state: ProofExchangeState::RequestSent,
            protocol_version,
            request: spec,
            created_at: Utc::now(),
        };
        self.proofs.insert(record.id.clone(), record.clone());
        tracing::info!(
            proof_id = %record.id,
            connection_id = %connection_id,
            "proof request sent"
        );
        Ok(record)
    }

    async fn proof_exchanges(&self) -> Result<Vec<ProofExchangeRecord>, AgentError> {
        let mut records: Vec<ProofExchangeRecord> =
            self.proofs.iter().map(|e| e.value().clone()).collect();
        records.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(records)
    }

    fn subscribe_credential_state_changes(&self) -> broadcast::Receiver<CredentialStateChanged> {
        self.event_tx.subscribe()
    }
}
