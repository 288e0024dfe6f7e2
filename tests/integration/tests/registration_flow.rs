//! Integration test: DID import → schema → credential definition → proof
//! request, across the issuer, agent and core crates.

use std::sync::Arc;
use std::time::Duration;

use attestor_agent::{
    CredentialDefinitionRegistrationResult, LocalAgent, SchemaRegistrationResult,
};
use attestor_core::RegistrationStage;
use attestor_integration_tests::ScriptedAgent;
use attestor_issuer::{
    FileIdentityStore, IdentityRegistry, IssuerError, ProofQuery, ProofRequestBuilder,
    ProofRequester, RegistrationWorkflow, WorkflowConfig,
};

fn example_config() -> WorkflowConfig {
    WorkflowConfig {
        did_method: "example".into(),
        did_namespace: "test".into(),
        call_timeout: Duration::from_secs(2),
    }
}

fn temp_dir() -> std::path::PathBuf {
    std::env::temp_dir().join(format!("attestor-it-{}", rand::random::<u64>()))
}

// =========================================================================
// End-to-end with a scripted agent
// =========================================================================

#[tokio::test]
async fn test_end_to_end_registration_and_proof_request() {
    let agent = Arc::new(ScriptedAgent::new("SCH1", "CD1"));
    let registry = Arc::new(IdentityRegistry::in_memory());
    let workflow = RegistrationWorkflow::new(agent.clone(), registry.clone(), example_config());

    let did = workflow
        .import_did("s3cr3t-seed-000000000000000000000", "did:example:test:ABC123", true)
        .await
        .unwrap();
    assert_eq!(did.to_string(), "did:example:test:ABC123");
    assert_eq!(registry.did(), Some(did.clone()));
    let imports = agent.imports();
    assert_eq!(imports.len(), 1);
    assert!(imports[0].2, "overwrite must be forwarded");

    let schema_id = workflow
        .register_schema(
            did.uri(),
            vec!["Name".into(), "Surname".into()],
            "Ticket",
            "1.0.0",
        )
        .await
        .unwrap();
    assert_eq!(schema_id.as_str(), "SCH1");
    let sent = agent.schema_requests();
    assert_eq!(sent[0].issuer_did, "did:example:test:ABC123");
    assert_eq!(sent[0].attr_names, vec!["Name".to_string(), "Surname".to_string()]);

    let cred_def = workflow
        .register_credential_definition(did.uri(), schema_id.as_str(), "default")
        .await
        .unwrap();
    assert_eq!(cred_def.as_str(), "CD1");
    assert_eq!(agent.cred_def_requests()[0].tag, "default");
    assert_eq!(registry.stage(), RegistrationStage::CredentialDefinitionRegistered);

    let requester = ProofRequester::new(agent.clone(), registry.clone(), Duration::from_secs(2));
    requester
        .submit("conn-1", &ProofQuery::entrance_check())
        .await
        .unwrap();
    let spec = &agent.proof_requests()[0];
    assert!(spec.restrictions().count() >= 2);
    assert!(spec
        .restrictions()
        .all(|r| r.credential_definition_id == "CD1"));
}

#[tokio::test]
async fn test_failed_schema_keeps_registry() {
    let agent = Arc::new(ScriptedAgent::default());
    agent.set_schema_result(SchemaRegistrationResult::Failed {
        reason: "duplicate".into(),
    });
    let registry = Arc::new(IdentityRegistry::in_memory());
    let workflow = RegistrationWorkflow::new(agent.clone(), registry.clone(), example_config());

    let did = workflow.import_did("seed", "ABC123", true).await.unwrap();
    let err = workflow
        .register_schema(did.uri(), vec!["Name".into()], "Ticket", "1.0.0")
        .await
        .unwrap_err();
    match err {
        IssuerError::SchemaRegistrationError { reason } => assert_eq!(reason, "duplicate"),
        other => panic!("expected SchemaRegistrationError, got {:?}", other),
    }
    assert_eq!(registry.schema_id(), None);
    assert_eq!(registry.stage(), RegistrationStage::DidImported);
}

#[tokio::test]
async fn test_finished_without_credential_definition_id() {
    let agent = Arc::new(ScriptedAgent::default());
    agent.set_cred_def_result(CredentialDefinitionRegistrationResult::Finished {
        credential_definition_id: None,
    });
    let registry = Arc::new(IdentityRegistry::in_memory());
    let workflow = RegistrationWorkflow::new(agent.clone(), registry.clone(), example_config());

    let did = workflow.import_did("seed", "ABC123", true).await.unwrap();
    let schema = workflow
        .register_schema(did.uri(), vec!["Name".into()], "Ticket", "1.0.0")
        .await
        .unwrap();
    let result = workflow
        .register_credential_definition(did.uri(), schema.as_str(), "default")
        .await;
    assert!(matches!(result, Err(IssuerError::InvariantViolation(_))));
    assert!(matches!(
        ProofRequestBuilder::build(&registry, &ProofQuery::entrance_check()),
        Err(IssuerError::MissingCredentialDefinition)
    ));
}

#[tokio::test]
async fn test_reimporting_new_did_resets_downstream() {
    let agent = Arc::new(ScriptedAgent::default());
    let registry = Arc::new(IdentityRegistry::in_memory());
    let workflow = RegistrationWorkflow::new(agent.clone(), registry.clone(), example_config());

    let did = workflow.import_did("seed", "ABC123", true).await.unwrap();
    let schema = workflow
        .register_schema(did.uri(), vec!["Name".into()], "Ticket", "1.0.0")
        .await
        .unwrap();
    workflow
        .register_credential_definition(did.uri(), schema.as_str(), "default")
        .await
        .unwrap();

    // Same DID again keeps everything registered under it.
    workflow.import_did("seed", "ABC123", true).await.unwrap();
    assert_eq!(registry.stage(), RegistrationStage::CredentialDefinitionRegistered);

    // A different DID starts over.
    workflow.import_did("seed", "XYZ789", true).await.unwrap();
    let record = registry.get();
    assert_eq!(record.stage(), RegistrationStage::DidImported);
    assert!(record.schema_id.is_none());
    assert!(record.credential_definition_id.is_none());
}

// =========================================================================
// Persistence across restarts
// =========================================================================

#[tokio::test]
async fn test_restart_between_steps_resumes_from_committed_state() {
    let dir = temp_dir();
    let agent = Arc::new(ScriptedAgent::default());

    {
        let registry =
            Arc::new(IdentityRegistry::open(Box::new(FileIdentityStore::in_dir(&dir))).unwrap());
        let workflow = RegistrationWorkflow::new(agent.clone(), registry, example_config());
        let did = workflow.import_did("seed", "ABC123", true).await.unwrap();
        workflow
            .register_schema(did.uri(), vec!["Name".into()], "Ticket", "1.0.0")
            .await
            .unwrap();
    }

    let registry =
        Arc::new(IdentityRegistry::open(Box::new(FileIdentityStore::in_dir(&dir))).unwrap());
    assert_eq!(registry.stage(), RegistrationStage::SchemaRegistered);

    let workflow = RegistrationWorkflow::new(agent.clone(), registry.clone(), example_config());
    let record = registry.get();
    let did = record.did.unwrap();
    let schema = record.schema_id.unwrap();
    let cred_def = workflow
        .register_credential_definition(did.uri(), schema.as_str(), "default")
        .await
        .unwrap();
    assert_eq!(cred_def.as_str(), "CD1");

    std::fs::remove_dir_all(&dir).ok();
}

// =========================================================================
// End-to-end with the local agent
// =========================================================================

#[tokio::test]
async fn test_local_agent_registration() {
    let agent = Arc::new(LocalAgent::default());
    let registry = Arc::new(IdentityRegistry::in_memory());
    let workflow = RegistrationWorkflow::new(agent.clone(), registry.clone(), WorkflowConfig::default());

    let did = workflow
        .import_did("000000000000000000000000Steward1", "LocalIssuer01", true)
        .await
        .unwrap();
    assert_eq!(did.to_string(), "did:indy:bcovrin:test:LocalIssuer01");
    let document = workflow.resolve_did(did.uri()).await.unwrap();
    assert_eq!(document.id, did.to_string());
    assert_eq!(workflow.created_dids().await.unwrap(), vec![did.to_string()]);

    let schema = workflow
        .register_schema(
            did.uri(),
            vec!["Name".into(), "Surname".into()],
            "Ticket",
            "1.0.0",
        )
        .await
        .unwrap();
    assert_eq!(
        schema.as_str(),
        "did:indy:bcovrin:test:LocalIssuer01/anoncreds/v0/SCHEMA/Ticket/1.0.0"
    );

    // The ledger refuses the same schema twice.
    let duplicate = workflow
        .register_schema(did.uri(), vec!["Name".into()], "Ticket", "1.0.0")
        .await;
    assert!(matches!(
        duplicate,
        Err(IssuerError::SchemaRegistrationError { .. })
    ));
    assert_eq!(registry.schema_id(), Some(schema.clone()));

    let cred_def = workflow
        .register_credential_definition(did.uri(), schema.as_str(), "default")
        .await
        .unwrap();
    assert!(cred_def.as_str().ends_with("/default"));
    assert!(cred_def.as_str().contains("/anoncreds/v0/CLAIM_DEF/"));
}

#[tokio::test]
async fn test_local_agent_rejects_short_seed() {
    let agent = Arc::new(LocalAgent::default());
    let registry = Arc::new(IdentityRegistry::in_memory());
    let workflow = RegistrationWorkflow::new(agent, registry.clone(), WorkflowConfig::default());

    let result = workflow.import_did("too-short", "LocalIssuer01", true).await;
    assert!(matches!(result, Err(IssuerError::ImportError(_))));
    assert_eq!(registry.did(), None);
}
