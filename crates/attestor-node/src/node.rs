//! The Attestor node orchestrator.
//!
//! Opens the identity registry on the configured backend, starts the
//! credential exchange reactor for the process lifetime and serves the
//! HTTP API.

use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::task::JoinHandle;

use attestor_agent::{AgentCapabilities, LocalAgent, LocalAgentConfig};
use attestor_issuer::{
    CredentialExchangeReactor, FileIdentityStore, IdentityRegistry, IdentityStore,
};

use crate::config::{AttestorConfig, StorageBackend};
use crate::state::NodeState;
use crate::storage::RocksDbIdentityStore;

pub struct AttestorNode {
    config: AttestorConfig,
    agent: Arc<dyn AgentCapabilities>,
    registry: Arc<IdentityRegistry>,
    /// Shared state accessible from HTTP handlers.
    node_state: Option<Arc<NodeState>>,
    reactor_task: Option<JoinHandle<()>>,
    api_task: Option<JoinHandle<Result<()>>>,
}

impl AttestorNode {
    /// Create a node backed by an in-process agent.
    pub fn new(config: AttestorConfig) -> Result<Self> {
        let agent = Arc::new(LocalAgent::new(LocalAgentConfig {
            label: config.agent.label.clone(),
            event_channel_capacity: config.agent.event_channel_capacity,
        }));
        Self::with_agent(config, agent)
    }

    /// Create a node around an existing agent.
    pub fn with_agent(config: AttestorConfig, agent: Arc<dyn AgentCapabilities>) -> Result<Self> {
        let store = Self::open_store(&config)?;
        let registry = Arc::new(IdentityRegistry::open(store)?);
        let record = registry.get();
        tracing::info!(
            label = %config.agent.label,
            stage = %record.stage(),
            did = ?record.did.as_ref().map(|d| d.to_string()),
            "Attestor node created"
        );
        Ok(Self {
            config,
            agent,
            registry,
            node_state: None,
            reactor_task: None,
            api_task: None,
        })
    }

    fn open_store(config: &AttestorConfig) -> Result<Box<dyn IdentityStore>> {
        let data_dir = &config.storage.data_dir;
        let store: Box<dyn IdentityStore> = match config.storage.backend {
            StorageBackend::File => Box::new(FileIdentityStore::in_dir(data_dir)),
            StorageBackend::Rocksdb => {
                Box::new(RocksDbIdentityStore::open(&data_dir.join("identity-db"))?)
            }
        };
        tracing::info!(
            path = %data_dir.display(),
            backend = ?config.storage.backend,
            "storage initialized"
        );
        Ok(store)
    }

    /// Start the reactor and the HTTP API.
    pub async fn start(&mut self) -> Result<()> {
        tracing::info!("starting Attestor node");

        let reactor = Arc::new(CredentialExchangeReactor::new(self.agent.clone()));
        self.reactor_task = Some(reactor.clone().spawn());

        let node_state = Arc::new(NodeState::new(
            self.agent.clone(),
            self.registry.clone(),
            reactor,
            &self.config,
        ));

        let api_addr: SocketAddr = self.config.api_addr().parse()?;
        let listener = tokio::net::TcpListener::bind(api_addr).await?;
        let api_state = node_state.clone();
        self.api_task = Some(tokio::spawn(async move {
            crate::api::serve(listener, api_state).await
        }));

        self.node_state = Some(node_state);
        Ok(())
    }

    /// Wait until the API server or the reactor stops.
    pub async fn run(&mut self) -> Result<()> {
        let api_task = self
            .api_task
            .as_mut()
            .ok_or_else(|| anyhow::anyhow!("node not started"))?;
        let reactor_task = self
            .reactor_task
            .as_mut()
            .ok_or_else(|| anyhow::anyhow!("node not started"))?;

        tokio::select! {
            result = api_task => {
                self.api_task = None;
                result??;
                tracing::info!("HTTP API server exited");
            }
            result = reactor_task => {
                self.reactor_task = None;
                result?;
                tracing::warn!("credential exchange reactor exited");
            }
        }
        Ok(())
    }

    /// Stop background tasks. In-flight accepts are abandoned.
    pub async fn shutdown(&mut self) -> Result<()> {
        tracing::info!("shutting down Attestor node");

        if let Some(task) = self.api_task.take() {
            task.abort();
        }
        if let Some(task) = self.reactor_task.take() {
            task.abort();
        }
        self.node_state = None;

        tracing::info!("Attestor node shut down");
        Ok(())
    }

    pub fn registry(&self) -> &Arc<IdentityRegistry> {
        &self.registry
    }

    pub fn state(&self) -> Option<&Arc<NodeState>> {
        self.node_state.as_ref()
    }
}
