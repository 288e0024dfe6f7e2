//! `attestor register-schema`: Register a schema for the issuer DID.

use clap::Args;
use serde::{Deserialize, Serialize};

use super::DEFAULT_ENDPOINT;

#[derive(Args, Debug)]
pub struct RegisterSchemaArgs {
    /// Attribute names, comma-separated. Node defaults when omitted.
    #[arg(short, long, value_delimiter = ',')]
    pub attributes: Vec<String>,

    /// Schema name.
    #[arg(short, long)]
    pub name: Option<String>,

    /// Schema version.
    #[arg(short, long)]
    pub version: Option<String>,

    /// Issuer DID. Defaults to the registered DID.
    #[arg(long)]
    pub issuer: Option<String>,

    /// API endpoint of the node.
    #[arg(short, long, default_value = DEFAULT_ENDPOINT)]
    pub endpoint: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RegisterSchemaRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    issuer_did: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    attribute_names: Option<&'a [String]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    version: Option<&'a str>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RegisterSchemaResponse {
    schema_id: String,
}

pub async fn run(args: &RegisterSchemaArgs) -> anyhow::Result<()> {
    let url = format!("{}/api/v1/schemas", args.endpoint);
    let body = RegisterSchemaRequest {
        issuer_did: args.issuer.as_deref(),
        attribute_names: (!args.attributes.is_empty()).then_some(args.attributes.as_slice()),
        name: args.name.as_deref(),
        version: args.version.as_deref(),
    };

    let client = reqwest::Client::new();
    let resp = client.post(&url).json(&body).send().await;

    match resp {
        Ok(r) if r.status().is_success() => {
            let data: RegisterSchemaResponse = r.json().await?;
            println!("Schema registered: {}", data.schema_id);
        }
        Ok(r) => return Err(super::fail("schema registration", r).await),
        Err(e) => super::unreachable(&args.endpoint, &e),
    }

    Ok(())
}
