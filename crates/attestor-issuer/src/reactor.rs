//! Credential exchange reactor.
//!
//! Subscribes once to the agent's credential state changes and reacts per
//! state: received offers are accepted, completions are recorded, everything
//! else passes through. Accepts are fire-and-forget tasks; a failure is
//! logged and never stops the event loop. When the event stream lags, the
//! reactor re-reads the agent's exchanges so no waiting offer is lost.

use std::collections::{HashSet, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use attestor_agent::{AgentCapabilities, CredentialStateChanged, ExchangeRole};
use attestor_core::CredentialExchangeState;

use crate::error::IssuerError;

/// Completed exchange ids kept for duplicate suppression and reporting.
pub const RECENT_COMPLETIONS: usize = 1024;

/// Reactor bookkeeping for a single exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExchangeProgress {
    /// An accept has been issued and has not returned yet.
    Accepting,
    Accepted,
    Done,
}

/// What the reactor did with one event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reaction {
    AcceptOffer,
    /// Offer already being accepted or past acceptance.
    AlreadyHandled,
    Completed,
    Ignored,
}

/// Bounded FIFO of completed exchange ids.
#[derive(Default)]
struct RecentCompletions {
    order: VecDeque<String>,
    ids: HashSet<String>,
}

impl RecentCompletions {
    fn contains(&self, exchange_id: &str) -> bool {
        self.ids.contains(exchange_id)
    }

    /// Returns `false` when the id was already remembered.
    fn insert(&mut self, exchange_id: &str) -> bool {
        if self.ids.contains(exchange_id) {
            return false;
        }
        if self.order.len() >= RECENT_COMPLETIONS {
            if let Some(oldest) = self.order.pop_front() {
                self.ids.remove(&oldest);
            }
        }
        self.order.push_back(exchange_id.to_string());
        self.ids.insert(exchange_id.to_string());
        true
    }
}

pub struct CredentialExchangeReactor {
    agent: Arc<dyn AgentCapabilities>,
    /// Exchanges with an accept in flight or accepted and not yet done.
    tracker: Arc<DashMap<String, ExchangeProgress>>,
    recent: Mutex<RecentCompletions>,
    completed: AtomicUsize,
    failed_accepts: Arc<AtomicUsize>,
    resyncs: AtomicUsize,
}

impl CredentialExchangeReactor {
    pub fn new(agent: Arc<dyn AgentCapabilities>) -> Self {
        Self {
            agent,
            tracker: Arc::new(DashMap::new()),
            recent: Mutex::new(RecentCompletions::default()),
            completed: AtomicUsize::new(0),
            failed_accepts: Arc::new(AtomicUsize::new(0)),
            resyncs: AtomicUsize::new(0),
        }
    }

    /// Subscribe and run the event loop on its own task until the agent's
    /// event stream closes.
    pub fn spawn(self: Arc<Self>) -> JoinHandle<()> {
        let events = self.agent.subscribe_credential_state_changes();
        tokio::spawn(async move { self.run(events).await })
    }

    async fn run(&self, mut events: broadcast::Receiver<CredentialStateChanged>) {
        tracing::info!("credential exchange reactor started");
        loop {
            match events.recv().await {
                Ok(event) => {
                    self.handle_event(&event);
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!(missed = n, "credential event receiver lagged, resynchronizing");
                    if let Err(e) = self.resync().await {
                        tracing::error!(kind = e.kind(), error = %e, "credential exchange resync failed");
                    }
                }
                Err(broadcast::error::RecvError::Closed) => {
                    tracing::info!("credential event stream closed");
                    break;
                }
            }
        }
    }

    /// React to one state change. Must be called within a Tokio runtime.
    pub fn handle_event(&self, event: &CredentialStateChanged) -> Reaction {
        let exchange_id = event.exchange_id.as_str();
        match event.state {
            CredentialExchangeState::OfferReceived => self.accept(exchange_id),
            CredentialExchangeState::Done => self.complete(exchange_id),
            CredentialExchangeState::ProposalSent
            | CredentialExchangeState::ProposalReceived
            | CredentialExchangeState::OfferSent
            | CredentialExchangeState::Declined
            | CredentialExchangeState::RequestSent
            | CredentialExchangeState::RequestReceived
            | CredentialExchangeState::CredentialIssued
            | CredentialExchangeState::CredentialReceived
            | CredentialExchangeState::Abandoned => {
                tracing::debug!(exchange_id, state = %event.state, "credential exchange state changed");
                Reaction::Ignored
            }
        }
    }

    /// Re-read the agent's exchanges after missed events. Holder offers still
    /// waiting are accepted and tracked exchanges already done are completed.
    /// Returns how many accepts were issued.
    pub async fn resync(&self) -> Result<usize, IssuerError> {
        let records = self.agent.credential_exchanges().await?;
        let mut accepted = 0;
        for record in &records {
            match (record.role, record.state) {
                (ExchangeRole::Holder, CredentialExchangeState::OfferReceived) => {
                    if self.accept(&record.id) == Reaction::AcceptOffer {
                        accepted += 1;
                    }
                }
                (_, CredentialExchangeState::Done) if self.tracker.contains_key(&record.id) => {
                    self.complete(&record.id);
                }
                _ => {}
            }
        }
        self.resyncs.fetch_add(1, Ordering::SeqCst);
        tracing::info!(records = records.len(), accepted, "credential exchanges resynchronized");
        Ok(accepted)
    }

    fn recent(&self) -> MutexGuard<'_, RecentCompletions> {
        self.recent.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn accept(&self, exchange_id: &str) -> Reaction {
        match self.tracker.entry(exchange_id.to_string()) {
            Entry::Occupied(entry) => {
                tracing::warn!(
                    exchange_id,
                    progress = ?entry.get(),
                    "duplicate offer delivery ignored"
                );
                return Reaction::AlreadyHandled;
            }
            Entry::Vacant(entry) => {
                if self.recent().contains(exchange_id) {
                    tracing::warn!(exchange_id, "offer delivery for a completed exchange ignored");
                    return Reaction::AlreadyHandled;
                }
                entry.insert(ExchangeProgress::Accepting);
            }
        }

        tracing::info!(exchange_id, "accepting credential offer");
        let agent = self.agent.clone();
        let tracker = self.tracker.clone();
        let failed_accepts = self.failed_accepts.clone();
        let exchange_id = exchange_id.to_string();
        tokio::spawn(async move {
            match accept_offer(agent.as_ref(), &exchange_id).await {
                Ok(()) => {
                    if let Some(mut progress) = tracker.get_mut(&exchange_id) {
                        if *progress == ExchangeProgress::Accepting {
                            *progress = ExchangeProgress::Accepted;
                        }
                    }
                    tracing::debug!(exchange_id = %exchange_id, "credential offer accepted");
                }
                Err(e) => {
                    tracker.remove_if(&exchange_id, |_, p| *p == ExchangeProgress::Accepting);
                    failed_accepts.fetch_add(1, Ordering::SeqCst);
                    tracing::error!(
                        exchange_id = %exchange_id,
                        kind = e.kind(),
                        error = %e,
                        "failed to accept credential offer"
                    );
                }
            }
        });
        Reaction::AcceptOffer
    }

    fn complete(&self, exchange_id: &str) -> Reaction {
        // Remember first, so a concurrent redelivery never finds neither entry.
        let first = self.recent().insert(exchange_id);
        self.tracker.remove(exchange_id);
        if first {
            self.completed.fetch_add(1, Ordering::SeqCst);
            tracing::info!(exchange_id, "credential exchange completed");
        }
        Reaction::Completed
    }

    pub fn progress(&self, exchange_id: &str) -> Option<ExchangeProgress> {
        if let Some(progress) = self.tracker.get(exchange_id) {
            return Some(*progress);
        }
        self.recent()
            .contains(exchange_id)
            .then_some(ExchangeProgress::Done)
    }

    /// In-flight exchanges plus recent completions, ordered by id.
    pub fn tracked(&self) -> Vec<(String, ExchangeProgress)> {
        let mut entries: Vec<_> = self
            .tracker
            .iter()
            .map(|e| (e.key().clone(), *e.value()))
            .collect();
        entries.extend(
            self.recent()
                .order
                .iter()
                .map(|id| (id.clone(), ExchangeProgress::Done)),
        );
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        entries
    }

    /// Exchanges with an accept issued that have not reached `Done`.
    pub fn in_flight(&self) -> usize {
        self.tracker.len()
    }

    /// Number of exchanges seen reaching `Done`.
    pub fn completed(&self) -> usize {
        self.completed.load(Ordering::SeqCst)
    }

    pub fn failed_accepts(&self) -> usize {
        self.failed_accepts.load(Ordering::SeqCst)
    }

    /// Number of resynchronizations after a lagged event stream.
    pub fn resyncs(&self) -> usize {
        self.resyncs.load(Ordering::SeqCst)
    }
}

/// One accept attempt; agent failures surface as `AcceptError`.
async fn accept_offer(agent: &dyn AgentCapabilities, exchange_id: &str) -> Result<(), IssuerError> {
    agent
        .accept_offer(exchange_id)
        .await
        .map_err(|e| IssuerError::AcceptError(e.to_string()))
}
