//! `attestor request-proof`: Send a proof request over a connection.

use clap::Args;
use serde::{Deserialize, Serialize};

use super::DEFAULT_ENDPOINT;

/// Comparators in match order; two-character forms first.
const COMPARATORS: [&str; 4] = ["<=", ">=", "<", ">"];

#[derive(Args, Debug)]
pub struct RequestProofArgs {
    /// Connection to send the request over.
    pub connection_id: String,

    /// Requested attribute; repeat per attribute.
    #[arg(short, long = "attribute")]
    pub attributes: Vec<String>,

    /// Predicate as `<attribute><op><value>`, e.g. `Date of Birth<=20000101`.
    #[arg(short, long = "predicate", value_parser = parse_predicate)]
    pub predicates: Vec<Predicate>,

    /// Proof request name.
    #[arg(short, long)]
    pub name: Option<String>,

    /// API endpoint of the node.
    #[arg(short, long, default_value = DEFAULT_ENDPOINT)]
    pub endpoint: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Predicate {
    attribute: String,
    comparator: String,
    value: f64,
}

fn parse_predicate(s: &str) -> Result<Predicate, String> {
    let (idx, op) = COMPARATORS
        .iter()
        .filter_map(|op| s.find(op).map(|i| (i, *op)))
        .min_by_key(|(i, op)| (*i, std::cmp::Reverse(op.len())))
        .ok_or_else(|| format!("no comparator (<, <=, >, >=) in {:?}", s))?;
    let attribute = s[..idx].trim();
    if attribute.is_empty() {
        return Err("predicate attribute must not be empty".into());
    }
    let value = s[idx + op.len()..]
        .trim()
        .parse::<f64>()
        .map_err(|e| format!("invalid predicate value: {}", e))?;
    Ok(Predicate {
        attribute: attribute.to_string(),
        comparator: op.to_string(),
        value,
    })
}

#[derive(Serialize)]
struct AttributeQuery<'a> {
    attribute: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ProofRequest<'a> {
    connection_id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<&'a str>,
    attributes: Vec<AttributeQuery<'a>>,
    predicates: &'a [Predicate],
}

#[derive(Deserialize)]
struct ProofResponse {
    id: String,
    state: String,
    request: serde_json::Value,
}

pub async fn run(args: &RequestProofArgs) -> anyhow::Result<()> {
    let url = format!("{}/api/v1/proofs/request", args.endpoint);
    let body = ProofRequest {
        connection_id: &args.connection_id,
        name: args.name.as_deref(),
        attributes: args
            .attributes
            .iter()
            .map(|a| AttributeQuery { attribute: a })
            .collect(),
        predicates: &args.predicates,
    };

    let client = reqwest::Client::new();
    let resp = client.post(&url).json(&body).send().await;

    match resp {
        Ok(r) if r.status().is_success() => {
            let data: ProofResponse = r.json().await?;
            println!("Proof requested!");
            println!("  Proof exchange:  {}", data.id);
            println!("  State:           {}", data.state);
            println!("Request:\n{}", serde_json::to_string_pretty(&data.request)?);
        }
        Ok(r) => return Err(super::fail("proof request", r).await),
        Err(e) => super::unreachable(&args.endpoint, &e),
    }

    Ok(())
}
