//! Configuration for swagform-fdc.

use crate::error::{Error, Result};
use crate::request::{AttestationTypeDescriptor, WEB2JSON};
use crate::retrieve::{DaLayerConfig, RetryPolicy};
use crate::submit::RoundSchedule;
use crate::verifier::VerifierConfig;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Public Coston2 verifier.
pub const COSTON2_VERIFIER_URL: &str = "https://verifier-testnet.flare.network/";

/// Public Coston2 data-availability layer.
pub const COSTON2_DA_LAYER_URL: &str = "https://coston2-data-layer.flare.network/";

/// Voting round timing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundScheduleConfig {
    /// Unix timestamp of the first voting round.
    #[serde(default = "default_first_round_start_ts")]
    pub first_round_start_ts: u64,
    /// Voting epoch length in seconds.
    #[serde(default = "default_epoch_duration")]
    pub epoch_duration_secs: u64,
    /// Offset added to the submission timestamp.
    #[serde(default)]
    pub submission_buffer_secs: u64,
}

impl Default for RoundScheduleConfig {
    fn default() -> Self {
        Self {
            first_round_start_ts: default_first_round_start_ts(),
            epoch_duration_secs: default_epoch_duration(),
            submission_buffer_secs: 0,
        }
    }
}

impl From<RoundScheduleConfig> for RoundSchedule {
    fn from(config: RoundScheduleConfig) -> Self {
        Self {
            first_round_start_ts: config.first_round_start_ts,
            epoch_duration_secs: config.epoch_duration_secs,
            submission_buffer_secs: config.submission_buffer_secs,
        }
    }
}

/// Attestation pipeline configuration.
#[derive(Clone, Serialize, Deserialize)]
pub struct AttestationConfig {
    /// Verifier base URL (the attestation type and `/prepareRequest` are appended).
    #[serde(default)]
    pub verifier_url: String,

    /// Verifier API key.
    #[serde(default)]
    pub api_key: String,

    /// Data-availability layer base URL.
    #[serde(default)]
    pub da_layer_url: String,

    /// Optional DA layer API key, sent as `X-API-KEY` when set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub da_layer_api_key: Option<String>,

    /// Attestation type name.
    #[serde(default = "default_attestation_type")]
    pub attestation_type: String,

    /// Source network name.
    #[serde(default = "default_source_id")]
    pub source_id: String,

    /// Maximum proof polling attempts.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Seconds between polling attempts.
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,

    /// HTTP timeout for verifier and DA layer calls.
    #[serde(default = "default_http_timeout")]
    pub http_timeout_secs: u64,

    /// Timeout for each voting-contract interaction.
    #[serde(default = "default_submission_timeout")]
    pub submission_timeout_secs: u64,

    /// Voting round timing.
    #[serde(default)]
    pub round: RoundScheduleConfig,

    /// Log level.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl std::fmt::Debug for AttestationConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AttestationConfig")
            .field("verifier_url", &self.verifier_url)
            .field("api_key", &"<redacted>")
            .field("da_layer_url", &self.da_layer_url)
            .field(
                "da_layer_api_key",
                &self.da_layer_api_key.as_ref().map(|_| "<redacted>"),
            )
            .field("attestation_type", &self.attestation_type)
            .field("source_id", &self.source_id)
            .field("max_attempts", &self.max_attempts)
            .field("poll_interval_secs", &self.poll_interval_secs)
            .field("http_timeout_secs", &self.http_timeout_secs)
            .field("submission_timeout_secs", &self.submission_timeout_secs)
            .field("round", &self.round)
            .field("log_level", &self.log_level)
            .finish()
    }
}

impl Default for AttestationConfig {
    fn default() -> Self {
        Self {
            verifier_url: String::new(),
            api_key: String::new(),
            da_layer_url: String::new(),
            da_layer_api_key: None,
            attestation_type: default_attestation_type(),
            source_id: default_source_id(),
            max_attempts: default_max_attempts(),
            poll_interval_secs: default_poll_interval(),
            http_timeout_secs: default_http_timeout(),
            submission_timeout_secs: default_submission_timeout(),
            round: RoundScheduleConfig::default(),
            log_level: default_log_level(),
        }
    }
}

impl AttestationConfig {
    /// Coston2 testnet preset with the public verifier and DA layer.
    #[must_use]
    pub fn coston2(api_key: &str) -> Self {
        Self {
            verifier_url: COSTON2_VERIFIER_URL.to_string(),
            api_key: api_key.to_string(),
            da_layer_url: COSTON2_DA_LAYER_URL.to_string(),
            ..Self::default()
        }
    }

    /// Check that every required option is present and usable.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] describing the first invalid option.
    pub fn validate(&self) -> Result<()> {
        require_url("verifier_url", &self.verifier_url)?;
        require_url("da_layer_url", &self.da_layer_url)?;
        if self.api_key.trim().is_empty() {
            return Err(Error::Config("api_key is required".to_string()));
        }
        if self.attestation_type.trim().is_empty() {
            return Err(Error::Config("attestation_type is required".to_string()));
        }
        for (field, value) in [
            ("attestation_type", &self.attestation_type),
            ("source_id", &self.source_id),
        ] {
            if value.len() > crate::encoding::BYTES32_LEN {
                return Err(Error::Config(format!(
                    "{field} '{value}' does not fit in 32 bytes"
                )));
            }
        }
        if self.max_attempts == 0 {
            return Err(Error::Config("max_attempts must be at least 1".to_string()));
        }
        if self.http_timeout_secs == 0 {
            return Err(Error::Config("http_timeout_secs must be at least 1".to_string()));
        }
        if self.submission_timeout_secs == 0 {
            return Err(Error::Config(
                "submission_timeout_secs must be at least 1".to_string(),
            ));
        }
        if self
            .da_layer_api_key
            .as_ref()
            .is_some_and(|key| key.trim().is_empty())
        {
            return Err(Error::Config(
                "da_layer_api_key must not be empty when set".to_string(),
            ));
        }
        RoundSchedule::from(self.round).validate()
    }

    /// Verifier client settings.
    #[must_use]
    pub fn verifier(&self) -> VerifierConfig {
        VerifierConfig {
            base_url: normalize_base_url(&self.verifier_url),
            api_key: self.api_key.clone(),
            descriptor: AttestationTypeDescriptor::new(&self.attestation_type, &self.source_id),
            timeout: Duration::from_secs(self.http_timeout_secs),
        }
    }

    /// DA layer client settings.
    #[must_use]
    pub fn da_layer(&self) -> DaLayerConfig {
        DaLayerConfig {
            base_url: normalize_base_url(&self.da_layer_url),
            api_key: self.da_layer_api_key.clone(),
            timeout: Duration::from_secs(self.http_timeout_secs),
        }
    }

    /// Proof polling policy.
    ///
    /// # Errors
    ///
    /// Returns an error if `max_attempts` is zero.
    pub fn retry_policy(&self) -> Result<RetryPolicy> {
        RetryPolicy::new(
            self.max_attempts,
            Duration::from_secs(self.poll_interval_secs),
        )
    }

    /// Voting round schedule.
    #[must_use]
    pub fn round_schedule(&self) -> RoundSchedule {
        self.round.into()
    }

    /// Timeout applied to voting-contract calls.
    #[must_use]
    pub fn submission_timeout(&self) -> Duration {
        Duration::from_secs(self.submission_timeout_secs)
    }

    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &std::path::Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| Error::Config(e.to_string()))
    }

    /// Save configuration to a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn to_file(&self, path: &std::path::Path) -> Result<()> {
        let content = toml::to_string_pretty(self).map_err(|e| Error::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

fn require_url(field: &str, value: &str) -> Result<()> {
    let value = value.trim();
    if value.is_empty() {
        return Err(Error::Config(format!("{field} is required")));
    }
    if !(value.starts_with("http://") || value.starts_with("https://")) {
        return Err(Error::Config(format!(
            "{field} must be an http(s) URL, got '{value}'"
        )));
    }
    Ok(())
}

/// Ensure a base URL ends with `/`; endpoint paths are appended to it directly.
#[must_use]
pub fn normalize_base_url(url: &str) -> String {
    let url = url.trim();
    if url.ends_with('/') {
        url.to_string()
    } else {
        format!("{url}/")
    }
}

fn default_attestation_type() -> String {
    WEB2JSON.to_string()
}

fn default_source_id() -> String {
    "testnet".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

const fn default_max_attempts() -> u32 {
    crate::retrieve::DEFAULT_MAX_ATTEMPTS
}

const fn default_poll_interval() -> u64 {
    crate::retrieve::DEFAULT_POLL_INTERVAL_SECS
}

const fn default_http_timeout() -> u64 {
    30
}

const fn default_submission_timeout() -> u64 {
    120
}

const fn default_first_round_start_ts() -> u64 {
    1_658_430_000
}

const fn default_epoch_duration() -> u64 {
    90
}
