//! Shared node state for HTTP handlers.

use std::sync::Arc;
use std::time::Instant;

use attestor_agent::AgentCapabilities;
use attestor_issuer::{
    CredentialExchangeReactor, IdentityRegistry, IssuanceService, ProofRequester,
    RegistrationWorkflow, WorkflowConfig,
};

use crate::config::{AttestorConfig, RegistrationConfig};

/// Everything a request handler needs. Handlers call straight into these
/// services; the registry is the only point of mutual exclusion.
pub struct NodeState {
    /// When the node started.
    pub start_time: Instant,
    pub label: String,
    pub registry: Arc<IdentityRegistry>,
    pub workflow: RegistrationWorkflow,
    pub reactor: Arc<CredentialExchangeReactor>,
    pub issuance: IssuanceService,
    pub proofs: ProofRequester,
    /// Defaults for registration requests that omit fields.
    pub registration: RegistrationConfig,
}

impl NodeState {
    pub fn new(
        agent: Arc<dyn AgentCapabilities>,
        registry: Arc<IdentityRegistry>,
        reactor: Arc<CredentialExchangeReactor>,
        config: &AttestorConfig,
    ) -> Self {
        let timeout = config.agent.call_timeout();
        let workflow = RegistrationWorkflow::new(
            agent.clone(),
            registry.clone(),
            WorkflowConfig {
                did_method: config.agent.did_method.clone(),
                did_namespace: config.agent.did_namespace.clone(),
                call_timeout: timeout,
            },
        );
        Self {
            start_time: Instant::now(),
            label: config.agent.label.clone(),
            issuance: IssuanceService::new(agent.clone(), registry.clone(), timeout),
            proofs: ProofRequester::new(agent, registry.clone(), timeout),
            registry,
            workflow,
            reactor,
            registration: config.registration.clone(),
        }
    }
}
