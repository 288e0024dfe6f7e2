//! `attestor status`: Query the status of a running Attestor node.

use clap::Args;
use serde::Deserialize;

use super::DEFAULT_ENDPOINT;

#[derive(Args, Debug)]
pub struct StatusArgs {
    /// API endpoint of the node.
    #[arg(short, long, default_value = DEFAULT_ENDPOINT)]
    pub endpoint: String,
}

#[derive(Deserialize)]
struct StatusResponse {
    version: String,
    label: String,
    stage: String,
    uptime_secs: u64,
    in_flight_exchanges: usize,
    completed_exchanges: usize,
}

pub async fn run(args: &StatusArgs) -> anyhow::Result<()> {
    let url = format!("{}/api/v1/status", args.endpoint);
    let resp = reqwest::get(&url).await;

    match resp {
        Ok(r) if r.status().is_success() => {
            let status: StatusResponse = r.json().await?;
            println!("Node Status:");
            println!("  Version:    {}", status.version);
            println!("  Label:      {}", status.label);
            println!("  Stage:      {}", status.stage);
            println!("  Uptime:     {}s", status.uptime_secs);
            println!(
                "  Exchanges:  {} in flight, {} completed",
                status.in_flight_exchanges, status.completed_exchanges
            );
        }
        Ok(r) => return Err(super::fail("status", r).await),
        Err(e) => super::unreachable(&args.endpoint, &e),
    }

    Ok(())
}
