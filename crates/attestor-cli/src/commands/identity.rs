//! `attestor identity`: Show the issuer's registered identifiers.

use clap::Args;
use serde::Deserialize;

use super::DEFAULT_ENDPOINT;

#[derive(Args, Debug)]
pub struct IdentityArgs {
    /// API endpoint of the node.
    #[arg(short, long, default_value = DEFAULT_ENDPOINT)]
    pub endpoint: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct IdentityResponse {
    did: Option<String>,
    schema_id: Option<String>,
    credential_definition_id: Option<String>,
    stage: String,
}

fn or_none(value: &Option<String>) -> &str {
    value.as_deref().unwrap_or("(none)")
}

pub async fn run(args: &IdentityArgs) -> anyhow::Result<()> {
    let url = format!("{}/api/v1/identity", args.endpoint);
    let resp = reqwest::get(&url).await;

    match resp {
        Ok(r) if r.status().is_success() => {
            let identity: IdentityResponse = r.json().await?;
            println!("Issuer Identity:");
            println!("  Stage:                  {}", identity.stage);
            println!("  DID:                    {}", or_none(&identity.did));
            println!("  Schema:                 {}", or_none(&identity.schema_id));
            println!(
                "  Credential definition:  {}",
                or_none(&identity.credential_definition_id)
            );
        }
        Ok(r) => return Err(super::fail("identity", r).await),
        Err(e) => super::unreachable(&args.endpoint, &e),
    }

    Ok(())
}
