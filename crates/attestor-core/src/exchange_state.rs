use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::CoreError;

/// States of a credential exchange as reported by the agent.
///
/// The agent owns the exchange record; the issuer only observes these
/// values through state-change notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CredentialExchangeState {
    ProposalSent,
    ProposalReceived,
    /// Issuer side: an offer went out to the holder.
    OfferSent,
    /// Holder side: an offer arrived and awaits acceptance.
    OfferReceived,
    Declined,
    RequestSent,
    RequestReceived,
    CredentialIssued,
    CredentialReceived,
    /// Exchange completed. Final state.
    Done,
    /// Exchange aborted by either party. Final state.
    Abandoned,
}

impl CredentialExchangeState {
    /// Whether this is a final (terminal) state.
    pub fn is_final(&self) -> bool {
        matches!(self, Self::Done | Self::Abandoned | Self::Declined)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ProposalSent => "proposal-sent",
            Self::ProposalReceived => "proposal-received",
            Self::OfferSent => "offer-sent",
            Self::OfferReceived => "offer-received",
            Self::Declined => "declined",
            Self::RequestSent => "request-sent",
            Self::RequestReceived => "request-received",
            Self::CredentialIssued => "credential-issued",
            Self::CredentialReceived => "credential-received",
            Self::Done => "done",
            Self::Abandoned => "abandoned",
        }
    }
}

impl fmt::Display for CredentialExchangeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CredentialExchangeState {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let state = match s {
            "proposal-sent" => Self::ProposalSent,
            "proposal-received" => Self::ProposalReceived,
            "offer-sent" => Self::OfferSent,
            "offer-received" => Self::OfferReceived,
            "declined" => Self::Declined,
            "request-sent" => Self::RequestSent,
            "request-received" => Self::RequestReceived,
            "credential-issued" => Self::CredentialIssued,
            "credential-received" => Self::CredentialReceived,
            "done" => Self::Done,
            "abandoned" => Self::Abandoned,
            other => return Err(CoreError::UnknownState(other.to_string())),
        };
        Ok(state)
    }
}

/// States of a proof exchange as reported by the agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProofExchangeState {
    RequestSent,
    RequestReceived,
    PresentationSent,
    PresentationReceived,
    Declined,
    Done,
    Abandoned,
}

impl ProofExchangeState {
    pub fn is_final(&self) -> bool {
        matches!(self, Self::Done | Self::Abandoned | Self::Declined)
    }
}

impl fmt::Display for ProofExchangeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::RequestSent => "request-sent",
            Self::RequestReceived => "request-received",
            Self::PresentationSent => "presentation-sent",
            Self::PresentationReceived => "presentation-received",
            Self::Declined => "declined",
            Self::Done => "done",
            Self::Abandoned => "abandoned",
        };
        f.write_str(s)
    }
}
