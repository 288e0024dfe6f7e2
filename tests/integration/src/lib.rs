//! Shared helpers for the cross-crate tests: a scripted agent that records
//! every call and emits credential events on demand.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::broadcast;

use attestor_agent::{
    AgentCapabilities, AgentError, CredentialDefinitionRegistration,
    CredentialDefinitionRegistrationResult, CredentialExchangeRecord, CredentialOffer,
    CredentialStateChanged, DidDocument, DidImport, ExchangeRole, ProofExchangeRecord,
    ProofRequestSpec, ProtocolVersion, SchemaRegistration, SchemaRegistrationResult,
};
use attestor_core::{CredentialExchangeState, ProofExchangeState};

/// Agent returning scripted registration results.
pub struct ScriptedAgent {
    schema_result: Mutex<SchemaRegistrationResult>,
    cred_def_result: Mutex<CredentialDefinitionRegistrationResult>,
    accept_delay: Mutex<Duration>,
    fail_accepts: AtomicBool,
    imported: Mutex<Vec<(String, usize, bool)>>,
    schema_requests: Mutex<Vec<SchemaRegistration>>,
    cred_def_requests: Mutex<Vec<CredentialDefinitionRegistration>>,
    proof_requests: Mutex<Vec<ProofRequestSpec>>,
    accepts: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    events: broadcast::Sender<CredentialStateChanged>,
}

impl Default for ScriptedAgent {
    fn default() -> Self {
        Self::new("SCH1", "CD1")
    }
}

impl ScriptedAgent {
    /// Agent whose registrations finish with the given ids.
    pub fn new(schema_id: &str, credential_definition_id: &str) -> Self {
        let (events, _) = broadcast::channel(64);
        Self {
            schema_result: Mutex::new(SchemaRegistrationResult::Finished {
                schema_id: Some(schema_id.to_string()),
            }),
            cred_def_result: Mutex::new(CredentialDefinitionRegistrationResult::Finished {
                credential_definition_id: Some(credential_definition_id.to_string()),
            }),
            accept_delay: Mutex::new(Duration::ZERO),
            fail_accepts: AtomicBool::new(false),
            imported: Mutex::new(Vec::new()),
            schema_requests: Mutex::new(Vec::new()),
            cred_def_requests: Mutex::new(Vec::new()),
            proof_requests: Mutex::new(Vec::new()),
            accepts: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            events,
        }
    }

    pub fn set_schema_result(&self, result: SchemaRegistrationResult) {
        *lock(&self.schema_result) = result;
    }

    pub fn set_cred_def_result(&self, result: CredentialDefinitionRegistrationResult) {
        *lock(&self.cred_def_result) = result;
    }

    pub fn set_accept_delay(&self, delay: Duration) {
        *lock(&self.accept_delay) = delay;
    }

    pub fn fail_accepts(&self, fail: bool) {
        self.fail_accepts.store(fail, Ordering::SeqCst);
    }

    /// `(did, seed length, overwrite)` per import call.
    pub fn imports(&self) -> Vec<(String, usize, bool)> {
        lock(&self.imported).clone()
    }

    pub fn schema_requests(&self) -> Vec<SchemaRegistration> {
        lock(&self.schema_requests).clone()
    }

    pub fn cred_def_requests(&self) -> Vec<CredentialDefinitionRegistration> {
        lock(&self.cred_def_requests).clone()
    }

    pub fn proof_requests(&self) -> Vec<ProofRequestSpec> {
        lock(&self.proof_requests).clone()
    }

    pub fn accepts(&self) -> usize {
        self.accepts.load(Ordering::SeqCst)
    }

    /// Highest number of accepts observed running at the same time.
    pub fn max_concurrent_accepts(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    pub fn emit(&self, exchange_id: &str, state: CredentialExchangeState) {
        let _ = self
            .events
            .send(CredentialStateChanged::new(exchange_id, "conn-1", state, None));
    }
}

fn lock<T>(m: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

#[async_trait]
impl AgentCapabilities for ScriptedAgent {
    async fn resolve_did(&self, did: &str) -> Result<DidDocument, AgentError> {
        let known = lock(&self.imported).iter().any(|(d, _, _)| d == did);
        if !known {
            return Err(AgentError::NotFound(format!("DID {}", did)));
        }
        Ok(DidDocument::with_ed25519_key(did, "scripted".to_string()))
    }

    async fn import_did(&self, request: DidImport) -> Result<(), AgentError> {
        lock(&self.imported).push((request.did.to_string(), request.seed.len(), request.overwrite));
        Ok(())
    }

    async fn created_dids(&self) -> Result<Vec<String>, AgentError> {
        Ok(lock(&self.imported).iter().map(|(d, _, _)| d.clone()).collect())
    }

    async fn register_schema(
        &self,
        request: SchemaRegistration,
    ) -> Result<SchemaRegistrationResult, AgentError> {
        lock(&self.schema_requests).push(request);
        Ok(lock(&self.schema_result).clone())
    }

    async fn register_credential_definition(
        &self,
        request: CredentialDefinitionRegistration,
    ) -> Result<CredentialDefinitionRegistrationResult, AgentError> {
        lock(&self.cred_def_requests).push(request);
        Ok(lock(&self.cred_def_result).clone())
    }

    async fn offer_credential(
        &self,
        offer: CredentialOffer,
    ) -> Result<CredentialExchangeRecord, AgentError> {
        let now = chrono::Utc::now();
        Ok(CredentialExchangeRecord {
            id: "scripted-exchange".into(),
            connection_id: offer.connection_id,
            thread_id: "scripted-thread".into(),
            role: ExchangeRole::Issuer,
            state: CredentialExchangeState::OfferSent,
            protocol_version: offer.protocol_version,
            credential_definition_id: offer.credential_definition_id,
            attributes: offer.attributes,
            created_at: now,
            updated_at: now,
        })
    }

    async fn accept_offer(&self, _exchange_id: &str) -> Result<(), AgentError> {
        self.accepts.fetch_add(1, Ordering::SeqCst);
        let running = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(running, Ordering::SeqCst);
        let delay = *lock(&self.accept_delay);
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        if self.fail_accepts.load(Ordering::SeqCst) {
            return Err(AgentError::AcceptRejected("scripted failure".into()));
        }
        Ok(())
    }

    async fn credential_exchanges(&self) -> Result<Vec<CredentialExchangeRecord>, AgentError> {
        Ok(Vec::new())
    }

    async fn request_proof(
        &self,
        protocol_version: ProtocolVersion,
        connection_id: &str,
        spec: ProofRequestSpec,
    ) -> Result<ProofExchangeRecord, AgentError> {
        lock(&self.proof_requests).push(spec.clone());
        Ok(ProofExchangeRecord {
            id: format!("proof-{}", lock(&self.proof_requests).len()),
            connection_id: connection_id.to_string(),
            state: ProofExchangeState::RequestSent,
            protocol_version,
            request: spec,
            created_at: chrono::Utc::now(),
        })
    }

    async fn proof_exchanges(&self) -> Result<Vec<ProofExchangeRecord>, AgentError> {
        Ok(Vec::new())
    }

    fn subscribe_credential_state_changes(&self) -> broadcast::Receiver<CredentialStateChanged> {
        self.events.subscribe()
    }
}

/// Poll `check` until it holds or two seconds pass.
pub async fn eventually(mut check: impl FnMut() -> bool) -> bool {
    for _ in 0..200 {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    check()
}
