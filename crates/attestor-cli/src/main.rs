//! Attestor CLI: client for a running Attestor node.
//!
//! Subcommands: status, identity, import-did, register-schema,
//! register-cred-def, resolve, offer, request-proof, exchanges.

mod commands;

use clap::{Parser, Subcommand};

/// Attestor: credential issuer orchestrator.
#[derive(Parser, Debug)]
#[command(name = "attestor", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Query the status of a running node.
    Status(commands::status::StatusArgs),
    /// Show the registered DID, schema and credential definition.
    Identity(commands::identity::IdentityArgs),
    /// Import a DID from a seed and make it the issuer DID.
    ImportDid(commands::import_did::ImportDidArgs),
    /// Register a schema for the issuer DID.
    RegisterSchema(commands::register_schema::RegisterSchemaArgs),
    /// Register a credential definition for the registered schema.
    RegisterCredDef(commands::register_cred_def::RegisterCredDefArgs),
    /// Resolve a DID to its document.
    Resolve(commands::resolve::ResolveArgs),
    /// Offer a credential over a connection.
    Offer(commands::offer::OfferArgs),
    /// Send a proof request over a connection.
    RequestProof(commands::request_proof::RequestProofArgs),
    /// List credential exchanges and reactor progress.
    Exchanges(commands::exchanges::ExchangesArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match &cli.command {
        Commands::Status(args) => commands::status::run(args).await,
        Commands::Identity(args) => commands::identity::run(args).await,
        Commands::ImportDid(args) => commands::import_did::run(args).await,
        Commands::RegisterSchema(args) => commands::register_schema::run(args).await,
        Commands::RegisterCredDef(args) => commands::register_cred_def::run(args).await,
        Commands::Resolve(args) => commands::resolve::run(args).await,
        Commands::Offer(args) => commands::offer::run(args).await,
        Commands::RequestProof(args) => commands::request_proof::run(args).await,
        Commands::Exchanges(args) => commands::exchanges::run(args).await,
    }
}
