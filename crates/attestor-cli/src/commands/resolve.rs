//! `attestor resolve`: Resolve a DID to its document.

use clap::Args;

use super::DEFAULT_ENDPOINT;

#[derive(Args, Debug)]
pub struct ResolveArgs {
    /// The DID to resolve.
    pub did: String,

    /// API endpoint of the node.
    #[arg(short, long, default_value = DEFAULT_ENDPOINT)]
    pub endpoint: String,
}

pub async fn run(args: &ResolveArgs) -> anyhow::Result<()> {
    let url = format!("{}/api/v1/dids/{}", args.endpoint, args.did);
    let resp = reqwest::get(&url).await;

    match resp {
        Ok(r) if r.status().is_success() => {
            let document: serde_json::Value = r.json().await?;
            println!("DID: {}", args.did);
            println!("Document:\n{}", serde_json::to_string_pretty(&document)?);
        }
        Ok(r) => return Err(super::fail("resolve", r).await),
        Err(e) => super::unreachable(&args.endpoint, &e),
    }

    Ok(())
}
