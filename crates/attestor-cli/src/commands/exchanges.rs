//! `attestor exchanges`: List credential exchanges and reactor progress.

use clap::Args;
use serde::Deserialize;

use super::DEFAULT_ENDPOINT;

#[derive(Args, Debug)]
pub struct ExchangesArgs {
    /// Also list proof exchanges.
    #[arg(long)]
    pub proofs: bool,

    /// API endpoint of the node.
    #[arg(short, long, default_value = DEFAULT_ENDPOINT)]
    pub endpoint: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Exchange {
    id: String,
    connection_id: String,
    role: String,
    state: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProofExchange {
    id: String,
    connection_id: String,
    state: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TrackedExchange {
    exchange_id: String,
    progress: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReactorResponse {
    exchanges: Vec<TrackedExchange>,
    in_flight: usize,
    completed: usize,
    failed_accepts: usize,
    resyncs: usize,
}

async fn get<T: serde::de::DeserializeOwned>(
    endpoint: &str,
    path: &str,
    what: &str,
) -> anyhow::Result<Option<T>> {
    match reqwest::get(format!("{}{}", endpoint, path)).await {
        Ok(r) if r.status().is_success() => Ok(Some(r.json().await?)),
        Ok(r) => Err(super::fail(what, r).await),
        Err(e) => {
            super::unreachable(endpoint, &e);
            Ok(None)
        }
    }
}

pub async fn run(args: &ExchangesArgs) -> anyhow::Result<()> {
    let Some(exchanges) =
        get::<Vec<Exchange>>(&args.endpoint, "/api/v1/credentials", "credential exchanges").await?
    else {
        return Ok(());
    };
    println!("Credential exchanges ({}):", exchanges.len());
    for ex in &exchanges {
        println!(
            "  {}  {:<7} {:<20} connection={}",
            ex.id, ex.role, ex.state, ex.connection_id
        );
    }

    if let Some(reactor) = get::<ReactorResponse>(&args.endpoint, "/api/v1/reactor", "reactor").await? {
        println!();
        println!(
            "Reactor ({} in flight, {} completed, {} failed accepts, {} resyncs):",
            reactor.in_flight, reactor.completed, reactor.failed_accepts, reactor.resyncs
        );
        for tracked in &reactor.exchanges {
            println!("  {}  {}", tracked.exchange_id, tracked.progress);
        }
    }

    if args.proofs {
        if let Some(proofs) =
            get::<Vec<ProofExchange>>(&args.endpoint, "/api/v1/proofs", "proof exchanges").await?
        {
            println!();
            println!("Proof exchanges ({}):", proofs.len());
            for p in &proofs {
                println!("  {}  {:<20} connection={}", p.id, p.state, p.connection_id);
            }
        }
    }

    Ok(())
}
