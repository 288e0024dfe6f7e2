//! `attestor register-cred-def`: Register a credential definition.

use clap::Args;
use serde::{Deserialize, Serialize};

use super::DEFAULT_ENDPOINT;

#[derive(Args, Debug)]
pub struct RegisterCredDefArgs {
    /// Credential definition tag.
    #[arg(short, long)]
    pub tag: Option<String>,

    /// Schema id. Defaults to the registered schema.
    #[arg(long)]
    pub schema: Option<String>,

    /// Issuer DID. Defaults to the registered DID.
    #[arg(long)]
    pub issuer: Option<String>,

    /// API endpoint of the node.
    #[arg(short, long, default_value = DEFAULT_ENDPOINT)]
    pub endpoint: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RegisterCredDefRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    issuer_did: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    schema_id: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tag: Option<&'a str>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RegisterCredDefResponse {
    credential_definition_id: String,
}

pub async fn run(args: &RegisterCredDefArgs) -> anyhow::Result<()> {
    let url = format!("{}/api/v1/credential-definitions", args.endpoint);
    let body = RegisterCredDefRequest {
        issuer_did: args.issuer.as_deref(),
        schema_id: args.schema.as_deref(),
        tag: args.tag.as_deref(),
    };

    let client = reqwest::Client::new();
    let resp = client.post(&url).json(&body).send().await;

    match resp {
        Ok(r) if r.status().is_success() => {
            let data: RegisterCredDefResponse = r.json().await?;
            println!("Credential definition registered: {}", data.credential_definition_id);
        }
        Ok(r) => return Err(super::fail("credential definition registration", r).await),
        Err(e) => super::unreachable(&args.endpoint, &e),
    }

    Ok(())
}
