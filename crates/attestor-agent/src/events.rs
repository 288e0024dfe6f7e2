//! Credential state-change notifications emitted by the agent.

use serde::{Deserialize, Serialize};

use attestor_core::CredentialExchangeState;

/// Emitted whenever a credential exchange record changes state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialStateChanged {
    /// Id of the exchange record that changed.
    pub exchange_id: String,
    /// Connection the exchange runs over.
    pub connection_id: String,
    /// State the record moved into.
    pub state: CredentialExchangeState,
    /// State before the change, absent for newly created records.
    pub previous_state: Option<CredentialExchangeState>,
}

impl CredentialStateChanged {
    pub fn new(
        exchange_id: impl Into<String>,
        connection_id: impl Into<String>,
        state: CredentialExchangeState,
        previous_state: Option<CredentialExchangeState>,
    ) -> Self {
        Self {
            exchange_id: exchange_id.into(),
            connection_id: connection_id.into(),
            state,
            previous_state,
        }
    }
}
