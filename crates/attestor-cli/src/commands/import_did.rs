//! `attestor import-did`: Import a DID from a seed.

use clap::Args;
use serde::{Deserialize, Serialize};

use super::DEFAULT_ENDPOINT;

#[derive(Args, Debug)]
pub struct ImportDidArgs {
    /// Unqualified identifier (or a fully qualified DID).
    pub did: String,

    /// Seed the key material is derived from.
    #[arg(short, long)]
    pub seed: String,

    /// Replace key material already bound to the DID.
    #[arg(long)]
    pub overwrite: bool,

    /// API endpoint of the node.
    #[arg(short, long, default_value = DEFAULT_ENDPOINT)]
    pub endpoint: String,
}

#[derive(Serialize)]
struct ImportDidRequest<'a> {
    seed: &'a str,
    did: &'a str,
    overwrite: bool,
}

#[derive(Deserialize)]
struct ImportDidResponse {
    did: String,
}

pub async fn run(args: &ImportDidArgs) -> anyhow::Result<()> {
    let url = format!("{}/api/v1/dids/import", args.endpoint);
    let body = ImportDidRequest {
        seed: &args.seed,
        did: &args.did,
        overwrite: args.overwrite,
    };

    let client = reqwest::Client::new();
    let resp = client.post(&url).json(&body).send().await;

    match resp {
        Ok(r) if r.status().is_success() => {
            let data: ImportDidResponse = r.json().await?;
            println!("DID imported: {}", data.did);
        }
        Ok(r) => return Err(super::fail("DID import", r).await),
        Err(e) => super::unreachable(&args.endpoint, &e),
    }

    Ok(())
}
