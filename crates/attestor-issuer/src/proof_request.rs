//! Proof requests bound to the registered credential definition.

use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use attestor_agent::{
    AgentCapabilities, AttributeFilter, PredicateType, ProofAttributeInfo, ProofExchangeRecord,
    ProofPredicateInfo, ProofRequestSpec, ProtocolVersion,
};
use attestor_core::CredentialDefinitionId;

use crate::call::bounded;
use crate::error::IssuerError;
use crate::registry::IdentityRegistry;

/// A requested attribute. The group name defaults to the attribute name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributeQuery {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
    pub attribute: String,
}

impl AttributeQuery {
    pub fn new(attribute: impl Into<String>) -> Self {
        Self {
            group: None,
            attribute: attribute.into(),
        }
    }
}

/// A requested numeric predicate, e.g. `Date of Birth <= 20000101`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredicateQuery {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
    pub attribute: String,
    pub comparator: String,
    pub value: f64,
}

impl PredicateQuery {
    pub fn new(attribute: impl Into<String>, comparator: impl Into<String>, value: f64) -> Self {
        Self {
            group: None,
            attribute: attribute.into(),
            comparator: comparator.into(),
            value,
        }
    }
}

/// What a verifier wants proven, independent of the credential definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProofQuery {
    #[serde(default = "default_proof_name")]
    pub name: String,
    #[serde(default = "default_proof_version")]
    pub version: String,
    #[serde(default)]
    pub attributes: Vec<AttributeQuery>,
    #[serde(default)]
    pub predicates: Vec<PredicateQuery>,
}

fn default_proof_name() -> String {
    "Hyperledger Entrance Check".to_string()
}

fn default_proof_version() -> String {
    "1.0.0".to_string()
}

impl ProofQuery {
    /// Surname, plus a birth date on or before 2000-01-01.
    pub fn entrance_check() -> Self {
        Self {
            name: default_proof_name(),
            version: default_proof_version(),
            attributes: vec![AttributeQuery::new("Surname")],
            predicates: vec![PredicateQuery::new("Date of Birth", "<=", 20000101.0)],
        }
    }

    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty() && self.predicates.is_empty()
    }
}

impl Default for ProofQuery {
    fn default() -> Self {
        Self::entrance_check()
    }
}

/// Predicate values must be finite integers representable on the ledger.
pub fn validate_predicate_value(value: f64) -> Result<i32, IssuerError> {
    if !value.is_finite() {
        return Err(IssuerError::InvalidPredicate(format!(
            "value {} is not a finite number",
            value
        )));
    }
    if value.fract() != 0.0 {
        return Err(IssuerError::InvalidPredicate(format!(
            "value {} is not an integer",
            value
        )));
    }
    if value < f64::from(i32::MIN) || value > f64::from(i32::MAX) {
        return Err(IssuerError::InvalidPredicate(format!(
            "value {} is outside the 32-bit ledger range",
            value
        )));
    }
    Ok(value as i32)
}

pub struct ProofRequestBuilder;

impl ProofRequestBuilder {
    /// Build a request restricted to the registry's credential definition.
    pub fn build(
        registry: &IdentityRegistry,
        query: &ProofQuery,
    ) -> Result<ProofRequestSpec, IssuerError> {
        let credential_definition_id = registry
            .credential_definition_id()
            .ok_or(IssuerError::MissingCredentialDefinition)?;
        Self::build_for(&credential_definition_id, query)
    }

    /// Build a request restricted to `credential_definition_id`.
    pub fn build_for(
        credential_definition_id: &CredentialDefinitionId,
        query: &ProofQuery,
    ) -> Result<ProofRequestSpec, IssuerError> {
        if query.is_empty() {
            return Err(IssuerError::InvalidRequest(
                "proof request names no attributes or predicates".into(),
            ));
        }
        let restriction = || {
            vec![AttributeFilter {
                credential_definition_id: credential_definition_id.to_string(),
            }]
        };

        let mut requested_attributes = BTreeMap::new();
        for attr in &query.attributes {
            let group = group_name(attr.group.as_deref(), &attr.attribute)?;
            let info = ProofAttributeInfo {
                name: attr.attribute.trim().to_string(),
                restrictions: restriction(),
            };
            insert_group(&mut requested_attributes, group, info)?;
        }

        let mut requested_predicates = BTreeMap::new();
        for pred in &query.predicates {
            let group = group_name(pred.group.as_deref(), &pred.attribute)?;
            let p_type: PredicateType = pred
                .comparator
                .parse()
                .map_err(IssuerError::InvalidPredicate)?;
            let info = ProofPredicateInfo {
                name: pred.attribute.trim().to_string(),
                p_type,
                p_value: validate_predicate_value(pred.value)?,
                restrictions: restriction(),
            };
            insert_group(&mut requested_predicates, group, info)?;
        }

        // Attribute and predicate referents share one namespace in a presentation.
        if let Some(clash) = requested_attributes
            .keys()
            .find(|k| requested_predicates.contains_key(*k))
        {
            return Err(IssuerError::InvalidRequest(format!(
                "group {:?} is used for both an attribute and a predicate",
                clash
            )));
        }

        let spec = ProofRequestSpec {
            name: query.name.clone(),
            version: query.version.clone(),
            requested_attributes,
            requested_predicates,
        };
        tracing::debug!(
            credential_definition_id = %credential_definition_id,
            attributes = spec.requested_attributes.len(),
            predicates = spec.requested_predicates.len(),
            "proof request built"
        );
        Ok(spec)
    }
}

fn group_name(group: Option<&str>, attribute: &str) -> Result<String, IssuerError> {
    if attribute.trim().is_empty() {
        return Err(IssuerError::InvalidRequest("attribute name must not be empty".into()));
    }
    let group = group.unwrap_or(attribute).trim();
    if group.is_empty() {
        return Err(IssuerError::InvalidRequest("group name must not be empty".into()));
    }
    Ok(group.to_string())
}

fn insert_group<V>(
    groups: &mut BTreeMap<String, V>,
    group: String,
    info: V,
) -> Result<(), IssuerError> {
    match groups.entry(group) {
        Entry::Occupied(e) => Err(IssuerError::InvalidRequest(format!(
            "duplicate group {:?}",
            e.key()
        ))),
        Entry::Vacant(e) => {
            e.insert(info);
            Ok(())
        }
    }
}

/// Builds proof requests and submits them over a connection.
pub struct ProofRequester {
    agent: Arc<dyn AgentCapabilities>,
    registry: Arc<IdentityRegistry>,
    timeout: Duration,
}

impl ProofRequester {
    pub fn new(
        agent: Arc<dyn AgentCapabilities>,
        registry: Arc<IdentityRegistry>,
        timeout: Duration,
    ) -> Self {
        Self {
            agent,
            registry,
            timeout,
        }
    }

    pub async fn submit(
        &self,
        connection_id: &str,
        query: &ProofQuery,
    ) -> Result<ProofExchangeRecord, IssuerError> {
        if connection_id.trim().is_empty() {
            return Err(IssuerError::InvalidRequest("connection id must not be empty".into()));
        }
        let spec = ProofRequestBuilder::build(&self.registry, query)?;
        let record = bounded("request_proof", self.timeout, async {
            self.agent
                .request_proof(ProtocolVersion::V2, connection_id, spec)
                .await
                .map_err(IssuerError::from)
        })
        .await?;
        tracing::info!(
            proof_id = %record.id,
            connection_id,
            name = %record.request.name,
            "proof request sent"
        );
        Ok(record)
    }

    pub async fn exchanges(&self) -> Result<Vec<ProofExchangeRecord>, IssuerError> {
        bounded("proof_exchanges", self.timeout, async {
            self.agent.proof_exchanges().await.map_err(IssuerError::from)
        })
        .await
    }
}
