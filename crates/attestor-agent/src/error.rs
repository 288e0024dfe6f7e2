/// Errors reported by the agent boundary.
#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("DID import rejected: {0}")]
    ImportRejected(String),

    #[error("offer acceptance rejected: {0}")]
    AcceptRejected(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("agent unavailable: {0}")]
    Unavailable(String),

    #[error("core error: {0}")]
    Core(#[from] attestor_core::CoreError),
}
