//! Integration test: the credential exchange reactor against the local
//! agent's loopback holder and against a scripted agent.

use std::sync::Arc;
use std::time::Duration;

use attestor_agent::{AgentCapabilities, ExchangeRole, LocalAgent, LocalAgentConfig};
use attestor_core::CredentialExchangeState;
use attestor_integration_tests::{eventually, ScriptedAgent};
use attestor_issuer::{
    CredentialExchangeReactor, ExchangeProgress, IdentityRegistry, IssuanceService,
    RegistrationWorkflow, WorkflowConfig,
};

async fn registered_local_agent() -> (Arc<LocalAgent>, Arc<IdentityRegistry>) {
    register(Arc::new(LocalAgent::default())).await
}

async fn register(agent: Arc<LocalAgent>) -> (Arc<LocalAgent>, Arc<IdentityRegistry>) {
    let registry = Arc::new(IdentityRegistry::in_memory());
    let workflow = RegistrationWorkflow::new(agent.clone(), registry.clone(), WorkflowConfig::default());
    let did = workflow
        .import_did("000000000000000000000000Steward1", "LocalIssuer01", true)
        .await
        .unwrap();
    let attributes = IssuanceService::default_preview()
        .into_iter()
        .map(|a| a.name)
        .collect();
    let schema = workflow
        .register_schema(did.uri(), attributes, "Conference Ticket", "1.0.1")
        .await
        .unwrap();
    workflow
        .register_credential_definition(did.uri(), schema.as_str(), "default")
        .await
        .unwrap();
    (agent, registry)
}

// =========================================================================
// Local agent: offer → auto-accept → done
// =========================================================================

#[tokio::test]
async fn test_offer_is_auto_accepted_and_completes() {
    let (agent, registry) = registered_local_agent().await;
    let reactor = Arc::new(CredentialExchangeReactor::new(agent.clone()));
    let _task = reactor.clone().spawn();

    let issuance = IssuanceService::new(agent.clone(), registry, Duration::from_secs(2));
    let issuer_record = issuance.offer_credential("conn-1", vec![]).await.unwrap();
    assert_eq!(issuer_record.state, CredentialExchangeState::OfferSent);

    let done = eventually(|| {
        agent
            .exchange(&issuer_record.id)
            .map(|r| r.state == CredentialExchangeState::Done)
            .unwrap_or(false)
    })
    .await;
    assert!(done, "issuer side never reached done");

    let exchanges = agent.credential_exchanges().await.unwrap();
    let holder = exchanges
        .iter()
        .find(|r| r.role == ExchangeRole::Holder && r.thread_id == issuer_record.thread_id)
        .expect("holder record");
    assert!(eventually(|| reactor.progress(&holder.id) == Some(ExchangeProgress::Done)).await);
    assert!(eventually(|| reactor.completed() >= 2).await);
}

#[tokio::test]
async fn test_multiple_offers_complete_independently() {
    let (agent, registry) = registered_local_agent().await;
    let reactor = Arc::new(CredentialExchangeReactor::new(agent.clone()));
    let _task = reactor.clone().spawn();
    let issuance = IssuanceService::new(agent.clone(), registry, Duration::from_secs(2));

    let mut ids = Vec::new();
    for conn in ["conn-1", "conn-2", "conn-3"] {
        ids.push(issuance.offer_credential(conn, vec![]).await.unwrap().id);
    }

    for id in &ids {
        let done = eventually(|| {
            agent
                .exchange(id)
                .map(|r| r.state == CredentialExchangeState::Done)
                .unwrap_or(false)
        })
        .await;
        assert!(done, "exchange {} never reached done", id);
    }
}

#[tokio::test]
async fn test_offer_burst_overflowing_event_channel_completes() {
    let agent = Arc::new(LocalAgent::new(LocalAgentConfig {
        event_channel_capacity: 16,
        ..LocalAgentConfig::default()
    }));
    let (agent, registry) = register(agent).await;
    let reactor = Arc::new(CredentialExchangeReactor::new(agent.clone()));
    let _task = reactor.clone().spawn();
    let issuance = IssuanceService::new(agent.clone(), registry, Duration::from_secs(2));

    let mut ids = Vec::new();
    for i in 0..200 {
        let record = issuance
            .offer_credential(&format!("conn-{}", i), vec![])
            .await
            .unwrap();
        ids.push(record.id);
    }

    let mut all_done = false;
    for _ in 0..500 {
        all_done = ids.iter().all(|id| {
            agent
                .exchange(id)
                .map(|r| r.state == CredentialExchangeState::Done)
                .unwrap_or(false)
        });
        if all_done {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert!(all_done, "offers left waiting after the event channel overflowed");

    let stuck = agent
        .credential_exchanges()
        .await
        .unwrap()
        .into_iter()
        .filter(|r| r.state == CredentialExchangeState::OfferReceived)
        .count();
    assert_eq!(stuck, 0);
    assert!(reactor.resyncs() >= 1);
    assert_eq!(reactor.failed_accepts(), 0);
}

#[tokio::test]
async fn test_completed_exchanges_leave_no_in_flight_entries() {
    let (agent, registry) = registered_local_agent().await;
    let reactor = Arc::new(CredentialExchangeReactor::new(agent.clone()));
    let _task = reactor.clone().spawn();
    let issuance = IssuanceService::new(agent.clone(), registry, Duration::from_secs(2));

    for i in 0..50 {
        issuance
            .offer_credential(&format!("conn-{}", i), vec![])
            .await
            .unwrap();
        tokio::task::yield_now().await;
    }

    // Issuer and holder sides both reach done.
    assert!(eventually(|| reactor.completed() == 100).await);
    assert!(eventually(|| reactor.in_flight() == 0).await);
}

// =========================================================================
// Scripted agent: duplicate deliveries and failures
// =========================================================================

#[tokio::test]
async fn test_duplicate_offer_events_accept_once() {
    let agent = Arc::new(ScriptedAgent::default());
    agent.set_accept_delay(Duration::from_millis(100));
    let reactor = Arc::new(CredentialExchangeReactor::new(agent.clone()));
    let _task = reactor.clone().spawn();

    for _ in 0..5 {
        agent.emit("ex-dup", CredentialExchangeState::OfferReceived);
    }

    assert!(eventually(|| reactor.progress("ex-dup") == Some(ExchangeProgress::Accepted)).await);
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(agent.accepts(), 1);
    assert_eq!(agent.max_concurrent_accepts(), 1);
}

#[tokio::test]
async fn test_done_and_passthrough_states_send_nothing() {
    let agent = Arc::new(ScriptedAgent::default());
    let reactor = Arc::new(CredentialExchangeReactor::new(agent.clone()));
    let _task = reactor.clone().spawn();

    agent.emit("ex-1", CredentialExchangeState::RequestReceived);
    agent.emit("ex-1", CredentialExchangeState::CredentialIssued);
    agent.emit("ex-1", CredentialExchangeState::Done);

    assert!(eventually(|| reactor.completed() == 1).await);
    assert_eq!(agent.accepts(), 0);
}

#[tokio::test]
async fn test_failed_accept_does_not_stop_reactor() {
    let agent = Arc::new(ScriptedAgent::default());
    agent.fail_accepts(true);
    let reactor = Arc::new(CredentialExchangeReactor::new(agent.clone()));
    let _task = reactor.clone().spawn();

    agent.emit("ex-bad", CredentialExchangeState::OfferReceived);
    assert!(eventually(|| agent.accepts() == 1 && reactor.progress("ex-bad").is_none()).await);

    agent.fail_accepts(false);
    agent.emit("ex-good", CredentialExchangeState::OfferReceived);
    assert!(eventually(|| reactor.progress("ex-good") == Some(ExchangeProgress::Accepted)).await);

    // Redelivery of the failed offer gets another attempt.
    agent.emit("ex-bad", CredentialExchangeState::OfferReceived);
    assert!(eventually(|| reactor.progress("ex-bad") == Some(ExchangeProgress::Accepted)).await);
    assert_eq!(agent.accepts(), 3);
}
