use std::future::Future;
use std::time::Duration;

use crate::error::IssuerError;

/// Await an agent call, failing with `Timeout` once `limit` elapses.
pub(crate) async fn bounded<T, F>(
    operation: &'static str,
    limit: Duration,
    call: F,
) -> Result<T, IssuerError>
where
    F: Future<Output = Result<T, IssuerError>>,
{
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result,
        Err(_) => {
            tracing::warn!(operation, timeout_ms = limit.as_millis() as u64, "agent call timed out");
            Err(IssuerError::Timeout {
                operation,
                after: limit,
            })
        }
    }
}
