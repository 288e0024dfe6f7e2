//! Integration test: proof requests bound to the registered credential
//! definition.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use attestor_agent::PredicateType;
use attestor_core::{CredentialDefinitionId, Did, SchemaId};
use attestor_integration_tests::ScriptedAgent;
use attestor_issuer::{
    AttributeQuery, IdentityRegistry, IssuerError, PredicateQuery, ProofQuery,
    ProofRequestBuilder, ProofRequester,
};

fn registry_with(cred_def: Option<&str>) -> IdentityRegistry {
    let registry = IdentityRegistry::in_memory();
    registry
        .set_did(Did::new("did:example:test:ABC123").unwrap())
        .unwrap();
    registry.set_schema_id(SchemaId::new("SCH1").unwrap()).unwrap();
    if let Some(id) = cred_def {
        registry
            .set_credential_definition_id(CredentialDefinitionId::new(id).unwrap())
            .unwrap();
    }
    registry
}

#[test]
fn test_null_credential_definition_is_rejected() {
    let registry = registry_with(None);
    let result = ProofRequestBuilder::build(&registry, &ProofQuery::entrance_check());
    assert!(matches!(result, Err(IssuerError::MissingCredentialDefinition)));
}

#[test]
fn test_surname_and_birth_date_bound_to_cd1() {
    let registry = registry_with(Some("CD1"));
    let query = ProofQuery {
        name: "Entrance".into(),
        version: "1.0.0".into(),
        attributes: vec![AttributeQuery::new("Surname")],
        predicates: vec![PredicateQuery::new("Date of Birth", "<=", 20000101.0)],
    };
    let spec = ProofRequestBuilder::build(&registry, &query).unwrap();

    assert_eq!(spec.requested_attributes["Surname"].name, "Surname");
    let predicate = &spec.requested_predicates["Date of Birth"];
    assert_eq!(predicate.p_type, PredicateType::LessThanOrEqualTo);
    assert_eq!(predicate.p_value, 20000101);

    for info in spec.requested_attributes.values() {
        let ids: BTreeSet<_> = info.restrictions.iter().map(|r| r.credential_definition_id.clone()).collect();
        assert_eq!(ids, BTreeSet::from(["CD1".to_string()]));
    }
    for info in spec.requested_predicates.values() {
        let ids: BTreeSet<_> = info.restrictions.iter().map(|r| r.credential_definition_id.clone()).collect();
        assert_eq!(ids, BTreeSet::from(["CD1".to_string()]));
    }
}

#[test]
fn test_explicit_groups_and_all_comparators() {
    let registry = registry_with(Some("CD1"));
    let predicates = ["<", "<=", ">", ">="]
        .iter()
        .enumerate()
        .map(|(i, op)| PredicateQuery {
            group: Some(format!("year-{}", i)),
            attribute: "Event Year".into(),
            comparator: op.to_string(),
            value: 2022.0,
        })
        .collect();
    let query = ProofQuery {
        attributes: vec![AttributeQuery {
            group: Some("who".into()),
            attribute: "Name".into(),
        }],
        predicates,
        ..ProofQuery::entrance_check()
    };
    let spec = ProofRequestBuilder::build(&registry, &query).unwrap();
    assert_eq!(spec.requested_attributes["who"].name, "Name");
    assert_eq!(spec.requested_predicates.len(), 4);
    assert_eq!(spec.requested_predicates["year-3"].p_type, PredicateType::GreaterThanOrEqualTo);
}

#[test]
fn test_invalid_predicates() {
    let registry = registry_with(Some("CD1"));
    for (op, value) in [("!=", 1.0), ("<=", 0.5), ("<=", f64::NAN), (">", 1e12)] {
        let query = ProofQuery {
            attributes: vec![],
            predicates: vec![PredicateQuery::new("Event Year", op, value)],
            ..ProofQuery::entrance_check()
        };
        assert!(
            matches!(
                ProofRequestBuilder::build(&registry, &query),
                Err(IssuerError::InvalidPredicate(_))
            ),
            "{} {} should be rejected",
            op,
            value
        );
    }
}

#[tokio::test]
async fn test_requester_tracks_registry_changes() {
    let agent = Arc::new(ScriptedAgent::default());
    let registry = Arc::new(registry_with(Some("CD1")));
    let requester = ProofRequester::new(agent.clone(), registry.clone(), Duration::from_secs(2));

    requester
        .submit("conn-1", &ProofQuery::entrance_check())
        .await
        .unwrap();

    registry
        .set_credential_definition_id(CredentialDefinitionId::new("CD2").unwrap())
        .unwrap();
    requester
        .submit("conn-1", &ProofQuery::entrance_check())
        .await
        .unwrap();

    let sent = agent.proof_requests();
    assert_eq!(sent.len(), 2);
    assert!(sent[0].restrictions().all(|r| r.credential_definition_id == "CD1"));
    assert!(sent[1].restrictions().all(|r| r.credential_definition_id == "CD2"));
}
