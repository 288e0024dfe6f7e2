//! `attestor offer`: Offer a credential over a connection.

use clap::Args;
use serde::{Deserialize, Serialize};

use super::DEFAULT_ENDPOINT;

#[derive(Args, Debug)]
pub struct OfferArgs {
    /// Connection to offer the credential over.
    pub connection_id: String,

    /// Attribute value as `name=value`; repeat per attribute.
    /// The node's default preview is used when none are given.
    #[arg(short, long = "attr", value_parser = parse_attribute)]
    pub attributes: Vec<Attribute>,

    /// API endpoint of the node.
    #[arg(short, long, default_value = DEFAULT_ENDPOINT)]
    pub endpoint: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Attribute {
    name: String,
    value: String,
}

fn parse_attribute(s: &str) -> Result<Attribute, String> {
    let (name, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected name=value, got {:?}", s))?;
    if name.trim().is_empty() {
        return Err("attribute name must not be empty".into());
    }
    Ok(Attribute {
        name: name.trim().to_string(),
        value: value.to_string(),
    })
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct OfferRequest<'a> {
    connection_id: &'a str,
    attributes: &'a [Attribute],
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ExchangeResponse {
    id: String,
    state: String,
    credential_definition_id: String,
}

pub async fn run(args: &OfferArgs) -> anyhow::Result<()> {
    let url = format!("{}/api/v1/credentials/offer", args.endpoint);
    let body = OfferRequest {
        connection_id: &args.connection_id,
        attributes: &args.attributes,
    };

    let client = reqwest::Client::new();
    let resp = client.post(&url).json(&body).send().await;

    match resp {
        Ok(r) if r.status().is_success() => {
            let data: ExchangeResponse = r.json().await?;
            println!("Credential offered!");
            println!("  Exchange:               {}", data.id);
            println!("  State:                  {}", data.state);
            println!("  Credential definition:  {}", data.credential_definition_id);
        }
        Ok(r) => return Err(super::fail("credential offer", r).await),
        Err(e) => super::unreachable(&args.endpoint, &e),
    }

    Ok(())
}
