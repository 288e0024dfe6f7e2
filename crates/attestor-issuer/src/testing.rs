//! Scripted agent used by the unit tests in this crate.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::broadcast;

use attestor_agent::{
    AgentCapabilities, AgentError, CredentialDefinitionRegistration,
    CredentialDefinitionRegistrationResult, CredentialExchangeRecord, CredentialOffer,
    CredentialStateChanged, DidDocument, DidImport, ExchangeRole, ProofExchangeRecord,
    ProofRequestSpec,
    ProtocolVersion, SchemaRegistration, SchemaRegistrationResult,
};
use attestor_core::{CredentialExchangeState, ProofExchangeState};

pub(crate) struct StubAgent {
    pub schema_result: Mutex<SchemaRegistrationResult>,
    pub cred_def_result: Mutex<CredentialDefinitionRegistrationResult>,
    pub reject_import: AtomicBool,
    pub fail_accept: AtomicBool,
    pub delay: Mutex<Duration>,
    pub imports: AtomicUsize,
    pub schema_calls: AtomicUsize,
    pub cred_def_calls: AtomicUsize,
    pub offers: AtomicUsize,
    pub accepts: AtomicUsize,
    pub in_flight_accepts: AtomicUsize,
    pub max_in_flight_accepts: AtomicUsize,
    pub proof_requests: Mutex<Vec<ProofRequestSpec>>,
    pub exchanges: Mutex<Vec<CredentialExchangeRecord>>,
    events: broadcast::Sender<CredentialStateChanged>,
}

impl StubAgent {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(64);
        Self {
            schema_result: Mutex::new(SchemaRegistrationResult::Finished {
                schema_id: Some("SCH1".into()),
            }),
            cred_def_result: Mutex::new(CredentialDefinitionRegistrationResult::Finished {
                credential_definition_id: Some("CD1".into()),
            }),
            reject_import: AtomicBool::new(false),
            fail_accept: AtomicBool::new(false),
            delay: Mutex::new(Duration::ZERO),
            imports: AtomicUsize::new(0),
            schema_calls: AtomicUsize::new(0),
            cred_def_calls: AtomicUsize::new(0),
            offers: AtomicUsize::new(0),
            accepts: AtomicUsize::new(0),
            in_flight_accepts: AtomicUsize::new(0),
            max_in_flight_accepts: AtomicUsize::new(0),
            proof_requests: Mutex::new(Vec::new()),
            exchanges: Mutex::new(Vec::new()),
            events,
        }
    }

    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock().unwrap() = delay;
    }

    pub fn emit(&self, exchange_id: &str, state: CredentialExchangeState) {
        let _ = self
            .events
            .send(CredentialStateChanged::new(exchange_id, "conn-1", state, None));
    }

    /// Record an exchange that `credential_exchanges` will report.
    pub fn add_exchange(&self, id: &str, role: ExchangeRole, state: CredentialExchangeState) {
        let now = chrono::Utc::now();
        self.exchanges.lock().unwrap().push(CredentialExchangeRecord {
            id: id.into(),
            connection_id: "conn-1".into(),
            thread_id: format!("th-{}", id),
            role,
            state,
            protocol_version: ProtocolVersion::V2,
            credential_definition_id: "CD1".into(),
            attributes: Vec::new(),
            created_at: now,
            updated_at: now,
        });
    }

    async fn pause(&self) {
        let delay = *self.delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }
}

#[async_trait]
impl AgentCapabilities for StubAgent {
    async fn resolve_did(&self, did: &str) -> Result<DidDocument, AgentError> {
        Ok(DidDocument::with_ed25519_key(did, "stub-verkey".to_string()))
    }

    async fn import_did(&self, _request: DidImport) -> Result<(), AgentError> {
        self.imports.fetch_add(1, Ordering::SeqCst);
        self.pause().await;
        if self.reject_import.load(Ordering::SeqCst) {
            return Err(AgentError::ImportRejected("seed rejected".into()));
        }
        Ok(())
    }

    async fn created_dids(&self) -> Result<Vec<String>, AgentError> {
        Ok(Vec::new())
    }

    async fn register_schema(
        &self,
        _request: SchemaRegistration,
    ) -> Result<SchemaRegistrationResult, AgentError> {
        self.schema_calls.fetch_add(1, Ordering::SeqCst);
        self.pause().await;
        Ok(self.schema_result.lock().unwrap().clone())
    }

    async fn register_credential_definition(
        &self,
        _request: CredentialDefinitionRegistration,
    ) -> Result<CredentialDefinitionRegistrationResult, AgentError> {
        self.cred_def_calls.fetch_add(1, Ordering::SeqCst);
        self.pause().await;
        Ok(self.cred_def_result.lock().unwrap().clone())
    }

    async fn offer_credential(
        &self,
        offer: CredentialOffer,
    ) -> Result<CredentialExchangeRecord, AgentError> {
        self.offers.fetch_add(1, Ordering::SeqCst);
        let now = chrono::Utc::now();
        Ok(CredentialExchangeRecord {
            id: "ex-1".into(),
            connection_id: offer.connection_id,
            thread_id: "th-1".into(),
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
        let now = self.in_flight_accepts.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight_accepts.fetch_max(now, Ordering::SeqCst);
        self.pause().await;
        self.in_flight_accepts.fetch_sub(1, Ordering::SeqCst);
        if self.fail_accept.load(Ordering::SeqCst) {
            return Err(AgentError::AcceptRejected("holder refused".into()));
        }
        Ok(())
    }

    async fn credential_exchanges(&self) -> Result<Vec<CredentialExchangeRecord>, AgentError> {
        Ok(self.exchanges.lock().unwrap().clone())
    }

    async fn request_proof(
        &self,
        protocol_version: ProtocolVersion,
        connection_id: &str,
        spec: ProofRequestSpec,
    ) -> Result<ProofExchangeRecord, AgentError> {
        self.proof_requests.lock().unwrap().push(spec.clone());
        Ok(ProofExchangeRecord {
            id: "proof-1".into(),
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
