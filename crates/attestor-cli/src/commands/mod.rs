//! Subcommand implementations. Each talks to the node's HTTP API.

pub mod exchanges;
pub mod identity;
pub mod import_did;
pub mod offer;
pub mod register_cred_def;
pub mod register_schema;
pub mod request_proof;
pub mod resolve;
pub mod status;

use serde::Deserialize;

/// Default API endpoint of a locally running node.
pub const DEFAULT_ENDPOINT: &str = "http://127.0.0.1:3000";

#[derive(Deserialize)]
struct ErrorResponse {
    error: String,
    kind: String,
}

/// Turn a non-success response into an error carrying the node's reason.
pub async fn fail(what: &str, resp: reqwest::Response) -> anyhow::Error {
    let status = resp.status();
    match resp.json::<ErrorResponse>().await {
        Ok(err) => anyhow::anyhow!("{} failed (HTTP {}, {}): {}", what, status, err.kind, err.error),
        Err(_) => anyhow::anyhow!("{} failed (HTTP {})", what, status),
    }
}

pub fn unreachable(endpoint: &str, e: &reqwest::Error) {
    println!("Could not reach node at {}", endpoint);
    println!("  Error: {}", e);
    println!();
    println!("Is the node running? Start it with: attestor-node");
}
