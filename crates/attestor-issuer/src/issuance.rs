use std::sync::Arc;
use std::time::Duration;

use attestor_agent::{
    AgentCapabilities, CredentialAttribute, CredentialExchangeRecord, CredentialOffer,
    ProtocolVersion,
};

use crate::call::bounded;
use crate::error::IssuerError;
use crate::registry::IdentityRegistry;

/// Offers credentials for the registered credential definition.
pub struct IssuanceService {
    agent: Arc<dyn AgentCapabilities>,
    registry: Arc<IdentityRegistry>,
    timeout: Duration,
}

impl IssuanceService {
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

    /// Attribute values used when an offer names none.
    pub fn default_preview() -> Vec<CredentialAttribute> {
        vec![
            CredentialAttribute::new("Name", "John"),
            CredentialAttribute::new("Surname", "Doe"),
            CredentialAttribute::new("Date of Birth", "19911911"),
            CredentialAttribute::new("Event Name", "Hyperledger Global Forum"),
            CredentialAttribute::new("Event Year", "2022"),
        ]
    }

    pub async fn offer_credential(
        &self,
        connection_id: &str,
        attributes: Vec<CredentialAttribute>,
    ) -> Result<CredentialExchangeRecord, IssuerError> {
        if connection_id.trim().is_empty() {
            return Err(IssuerError::InvalidRequest("connection id must not be empty".into()));
        }
        let credential_definition_id = self
            .registry
            .credential_definition_id()
            .ok_or(IssuerError::MissingCredentialDefinition)?;
        let attributes = if attributes.is_empty() {
            Self::default_preview()
        } else {
            attributes
        };

        let offer = CredentialOffer {
            protocol_version: ProtocolVersion::V2,
            connection_id: connection_id.to_string(),
            credential_definition_id: credential_definition_id.to_string(),
            attributes,
        };
        let record = bounded("offer_credential", self.timeout, async {
            self.agent
                .offer_credential(offer)
                .await
                .map_err(IssuerError::from)
        })
        .await?;
        tracing::info!(
            exchange_id = %record.id,
            connection_id,
            credential_definition_id = %credential_definition_id,
            "credential offered"
        );
        Ok(record)
    }

    pub async fn exchanges(&self) -> Result<Vec<CredentialExchangeRecord>, IssuerError> {
        bounded("credential_exchanges", self.timeout, async {
            self.agent
                .credential_exchanges()
                .await
                .map_err(IssuerError::from)
        })
        .await
    }
}
