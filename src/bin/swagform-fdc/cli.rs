//! Command-line interface definition.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use swagform_fdc::config::AttestationConfig;

/// Acquire Flare Data Connector proofs for SwagForm attestations.
#[derive(Parser, Debug)]
#[command(name = "swagform-fdc")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file.
    #[arg(long, short, env = "SWAGFORM_CONFIG")]
    pub config: Option<PathBuf>,

    /// Start from the Coston2 testnet endpoints instead of an empty config.
    #[arg(long)]
    pub coston2: bool,

    /// Verifier base URL.
    #[arg(long, env = "SWAGFORM_VERIFIER_URL")]
    pub verifier_url: Option<String>,

    /// Verifier API key.
    #[arg(long, env = "SWAGFORM_VERIFIER_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Data-availability layer base URL.
    #[arg(long, env = "SWAGFORM_DA_LAYER_URL")]
    pub da_layer_url: Option<String>,

    /// Data-availability layer API key.
    #[arg(long, env = "SWAGFORM_DA_LAYER_API_KEY", hide_env_values = true)]
    pub da_layer_api_key: Option<String>,

    /// Source network name.
    #[arg(long, env = "SWAGFORM_SOURCE_ID")]
    pub source_id: Option<String>,

    /// Maximum proof polling attempts.
    #[arg(long, env = "SWAGFORM_MAX_ATTEMPTS")]
    pub max_attempts: Option<u32>,

    /// Seconds between proof polling attempts.
    #[arg(long, env = "SWAGFORM_POLL_INTERVAL_SECS")]
    pub poll_interval_secs: Option<u64>,

    /// Log level (RUST_LOG takes precedence; defaults to the config file, then info).
    #[arg(long, value_enum)]
    pub log_level: Option<CliLogLevel>,

    /// Command to run.
    #[command(subcommand)]
    pub command: Command,
}

/// Top-level commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Ask the verifier to encode an attestation request.
    Prepare {
        /// What to attest.
        #[command(subcommand)]
        target: PrepareTarget,
    },
    /// Poll the DA layer for a finalized proof.
    Retrieve {
        /// ABI-encoded request returned by `prepare`.
        #[arg(long)]
        request: String,
        /// Voting round the request was submitted in.
        #[arg(long)]
        round_id: u64,
    },
    /// Print the voting round containing a timestamp.
    Round {
        /// Unix timestamp (defaults to now).
        #[arg(long)]
        timestamp: Option<u64>,
    },
    /// Print the embedded ABI schemas.
    Schemas,
}

/// Attestation templates.
#[derive(Subcommand, Debug)]
pub enum PrepareTarget {
    /// Attest the `/health` endpoint.
    Health {
        /// Base URL of the SwagForm API.
        #[arg(long, default_value = "http://localhost:8000")]
        api_base: String,
    },
    /// Attest that a tweet exists.
    Tweet {
        /// Base URL of the SwagForm API.
        #[arg(long, default_value = "http://localhost:8000")]
        api_base: String,
        /// Tweet id or URL.
        #[arg(long)]
        tweet_id: String,
    },
}

/// Log level CLI enum.
#[derive(Debug, Clone, Copy, ValueEnum, Default)]
pub enum CliLogLevel {
    /// Error messages only.
    Error,
    /// Warnings and errors.
    Warn,
    /// Informational messages (default).
    #[default]
    Info,
    /// Debug messages.
    Debug,
    /// Trace messages (verbose).
    Trace,
}

impl Cli {
    /// Build the attestation config from the file, preset and flags.
    ///
    /// # Errors
    ///
    /// Returns an error if a config file is specified but cannot be loaded.
    pub fn to_config(&self) -> color_eyre::Result<AttestationConfig> {
        let mut config = if let Some(ref path) = self.config {
            AttestationConfig::from_file(path)?
        } else if self.coston2 {
            AttestationConfig::coston2("")
        } else {
            AttestationConfig::default()
        };

        if let Some(ref url) = self.verifier_url {
            config.verifier_url.clone_from(url);
        }
        if let Some(ref key) = self.api_key {
            config.api_key.clone_from(key);
        }
        if let Some(ref url) = self.da_layer_url {
            config.da_layer_url.clone_from(url);
        }
        if let Some(ref key) = self.da_layer_api_key {
            config.da_layer_api_key = Some(key.clone());
        }
        if let Some(ref source) = self.source_id {
            config.source_id.clone_from(source);
        }
        if let Some(attempts) = self.max_attempts {
            config.max_attempts = attempts;
        }
        if let Some(interval) = self.poll_interval_secs {
            config.poll_interval_secs = interval;
        }
        if let Some(level) = self.log_level {
            config.log_level = level.into();
        }

        Ok(config)
    }
}

impl From<CliLogLevel> for String {
    fn from(level: CliLogLevel) -> Self {
        match level {
            CliLogLevel::Error => "error".to_string(),
            CliLogLevel::Warn => "warn".to_string(),
            CliLogLevel::Info => "info".to_string(),
            CliLogLevel::Debug => "debug".to_string(),
            CliLogLevel::Trace => "trace".to_string(),
        }
    }
}
