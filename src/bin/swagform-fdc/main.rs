//! swagform-fdc CLI entry point.

mod cli;

use clap::Parser;
use cli::{Cli, Command, PrepareTarget};
use std::time::{SystemTime, UNIX_EPOCH};
use swagform_fdc::{
    abi, AttestationConfig, AttestationRequest, CancellationToken, DaLayerClient,
    EncodedAttestationRequest, ProofRetriever, VerifierClient,
};
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();
    let config = cli.to_config()?;

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();

    info!("swagform-fdc v{}", env!("CARGO_PKG_VERSION"));

    let schemas = abi::validate_embedded()?;
    info!("Loaded {} embedded ABI schemas", schemas);

    match cli.command {
        Command::Prepare { target } => prepare(&config, target).await?,
        Command::Retrieve { request, round_id } => retrieve(&config, &request, round_id).await?,
        Command::Round { timestamp } => {
            let schedule = config.round_schedule();
            let timestamp = match timestamp {
                Some(ts) => ts,
                None => SystemTime::now().duration_since(UNIX_EPOCH)?.as_secs(),
            };
            let round_id = schedule.round_for_timestamp(timestamp)?;
            println!(
                "{}",
                serde_json::json!({
                    "timestamp": timestamp,
                    "votingRoundId": round_id,
                    "roundStart": schedule.round_start(round_id),
                    "roundEnd": schedule.round_end(round_id),
                })
            );
        }
        Command::Schemas => {
            for (name, schema) in abi::registry()?.iter() {
                println!("{name} (v{}): {}", schema.version, schema.signature.to_json()?);
            }
        }
    }

    Ok(())
}

async fn prepare(config: &AttestationConfig, target: PrepareTarget) -> color_eyre::Result<()> {
    config.validate()?;

    let request = match target {
        PrepareTarget::Health { api_base } => AttestationRequest::health_check(&api_base)?,
        PrepareTarget::Tweet { api_base, tweet_id } => {
            AttestationRequest::tweet_verification(&api_base, &tweet_id)?
        }
    };

    let verifier = VerifierClient::new(config.verifier())?;
    let prepared = verifier.prepare(&request).await?;
    println!("{}", serde_json::to_string_pretty(&prepared.response)?);
    Ok(())
}

async fn retrieve(
    config: &AttestationConfig,
    request: &str,
    round_id: u64,
) -> color_eyre::Result<()> {
    config.validate()?;

    let encoded = EncodedAttestationRequest::new(request)?;
    let retriever = ProofRetriever::new(
        DaLayerClient::new(config.da_layer())?,
        config.retry_policy()?,
    );

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, cancelling proof retrieval");
            on_signal.cancel();
        }
    });

    info!(
        "Polling for round {} proof (up to {} attempts, {}s apart)",
        round_id,
        retriever.policy().max_attempts,
        retriever.policy().poll_interval.as_secs()
    );
    let proof = retriever.retrieve(&encoded, round_id, &cancel).await?;
    println!(
        "{}",
        serde_json::to_string_pretty(&proof.into_contract_proof())?
    );
    Ok(())
}
