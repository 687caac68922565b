//! Proof retrieval from the data-availability layer.
//!
//! The DA layer has no push notification for finalized rounds, so the
//! retriever polls it with a fixed interval between attempts:
//!
//! ```text
//! attempt 1 ──► ready? ──yes──► Proof
//!                 │
//!                 no (pending, non-200, transport error)
//!                 │
//!              sleep(interval) ──► attempt 2 ──► ... ──► attempt N
//!                                                          │
//!                                                          no
//!                                                          ▼
//!                                                  ProofNotAvailable
//! ```
//!
//! A 200 response whose body can be read as neither ready nor pending aborts
//! the loop immediately. Both the transport and the sleep are injectable so
//! the loop can be driven deterministically.

use crate::encoding::join_url;
use crate::error::{excerpt, Error, Result};
use crate::proof::Proof;
use crate::request::EncodedAttestationRequest;
use serde::Serialize;
use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Path of the raw proof lookup on the DA layer.
pub const PROOF_BY_REQUEST_ROUND_PATH: &str = "api/v1/fdc/proof-by-request-round-raw";

/// Default number of polling attempts.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 20;

/// Default interval between attempts in seconds.
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 10;

/// Bounded fixed-interval polling policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total number of attempts, including the first.
    pub max_attempts: u32,
    /// Delay between consecutive attempts.
    pub poll_interval: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            poll_interval: Duration::from_secs(DEFAULT_POLL_INTERVAL_SECS),
        }
    }
}

impl RetryPolicy {
    /// Create a policy.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if `max_attempts` is zero.
    pub fn new(max_attempts: u32, poll_interval: Duration) -> Result<Self> {
        if max_attempts == 0 {
            return Err(Error::Config("max_attempts must be at least 1".to_string()));
        }
        Ok(Self {
            max_attempts,
            poll_interval,
        })
    }

    /// Upper bound on the time spent sleeping between attempts.
    #[must_use]
    pub fn time_budget(&self) -> Duration {
        self.poll_interval
            .saturating_mul(self.max_attempts.saturating_sub(1))
    }
}

/// Status and body of one DA-layer response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollResponse {
    /// HTTP status code.
    pub status: u16,
    /// Response body text.
    pub body: String,
}

impl PollResponse {
    /// Create a response.
    #[must_use]
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }
}

/// How a single poll response was interpreted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    /// The round is finalized and the proof is present.
    Ready(Proof),
    /// Not available yet; try again later.
    Pending,
    /// A 200 body that is neither ready nor pending.
    Malformed(String),
}

/// Transport used to ask the DA layer for a proof.
pub trait ProofSource: Send + Sync {
    /// Fetch the proof for (`request`, `round_id`).
    ///
    /// Returns any HTTP response, including error statuses. Only failures
    /// to get a response at all are reported as `Err`, using
    /// [`Error::Transport`].
    fn fetch(
        &self,
        request: &EncodedAttestationRequest,
        round_id: u64,
    ) -> impl Future<Output = Result<PollResponse>> + Send;
}

/// Delay between polling attempts.
pub trait Sleeper: Send + Sync {
    /// Wait for `duration`.
    fn sleep(&self, duration: Duration) -> impl Future<Output = ()> + Send;
}

/// [`Sleeper`] backed by the tokio timer.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

impl Sleeper for TokioSleeper {
    fn sleep(&self, duration: Duration) -> impl Future<Output = ()> + Send {
        tokio::time::sleep(duration)
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ProofQuery<'a> {
    voting_round_id: u64,
    request_bytes: &'a str,
}

/// Configuration for [`DaLayerClient`].
#[derive(Debug, Clone)]
pub struct DaLayerConfig {
    /// DA layer base URL, e.g. `https://coston2-data-layer.flare.network/`.
    pub base_url: String,
    /// Optional API key sent as `X-API-KEY`.
    pub api_key: Option<String>,
    /// HTTP timeout per request.
    pub timeout: Duration,
}

/// HTTP [`ProofSource`] for the Flare DA layer.
pub struct DaLayerClient {
    endpoint: String,
    api_key: Option<String>,
    client: reqwest::Client,
}

impl DaLayerClient {
    /// Create a DA layer client.
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL is empty or the HTTP client cannot be built.
    pub fn new(config: DaLayerConfig) -> Result<Self> {
        if config.base_url.trim().is_empty() {
            return Err(Error::Config("DA layer URL must not be empty".to_string()));
        }

        let client = reqwest::Client::builder()
            .user_agent(concat!("swagform-fdc/", env!("CARGO_PKG_VERSION")))
            .timeout(config.timeout)
            .build()
            .map_err(|e| Error::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            endpoint: join_url(&config.base_url, PROOF_BY_REQUEST_ROUND_PATH),
            api_key: config.api_key,
            client,
        })
    }

    /// Proof lookup endpoint.
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl ProofSource for DaLayerClient {
    async fn fetch(
        &self,
        request: &EncodedAttestationRequest,
        round_id: u64,
    ) -> Result<PollResponse> {
        let query = ProofQuery {
            voting_round_id: round_id,
            request_bytes: request.as_str(),
        };

        let mut builder = self.client.post(&self.endpoint).json(&query);
        if let Some(ref key) = self.api_key {
            builder = builder.header(crate::verifier::API_KEY_HEADER, key);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| Error::transport("DA layer proof request", &e))?;
        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| Error::transport("reading DA layer response", &e))?;

        Ok(PollResponse { status, body })
    }
}

/// Interpret one DA-layer response.
///
/// Non-200 statuses, empty bodies, `null`, and objects without a populated
/// `proof` array and `response_hex` are pending. A field of the wrong JSON
/// type, a non-object body, or a body that is not JSON is malformed.
///
/// An empty `proof` array is pending even when `response_hex` is set. A round
/// whose Merkle tree has a single leaf has no siblings, so its proof is never
/// reported ready and polling ends in [`Error::ProofNotAvailable`].
#[must_use]
pub fn classify(response: &PollResponse) -> PollOutcome {
    if response.status != 200 || response.body.trim().is_empty() {
        return PollOutcome::Pending;
    }

    let value: serde_json::Value = match serde_json::from_str(&response.body) {
        Ok(value) => value,
        Err(e) => {
            return PollOutcome::Malformed(format!(
                "body is not JSON ({e}): {}",
                excerpt(&response.body)
            ))
        }
    };

    let object = match value {
        serde_json::Value::Null => return PollOutcome::Pending,
        serde_json::Value::Object(object) => object,
        other => {
            return PollOutcome::Malformed(format!(
                "expected a JSON object, got {}",
                excerpt(&other.to_string())
            ))
        }
    };

    let proof = match object.get("proof") {
        None | Some(serde_json::Value::Null) => None,
        Some(serde_json::Value::Array(items)) => {
            let mut hashes = Vec::with_capacity(items.len());
            for item in items {
                match item.as_str() {
                    Some(hash) => hashes.push(hash.to_string()),
                    None => {
                        return PollOutcome::Malformed(format!(
                            "proof entry is not a string: {item}"
                        ))
                    }
                }
            }
            Some(hashes)
        }
        Some(other) => {
            return PollOutcome::Malformed(format!("proof is not an array: {other}"));
        }
    };

    let response_hex = match object.get("response_hex") {
        None | Some(serde_json::Value::Null) => None,
        Some(serde_json::Value::String(hex)) => Some(hex.clone()),
        Some(other) => {
            return PollOutcome::Malformed(format!("response_hex is not a string: {other}"));
        }
    };

    match (proof, response_hex) {
        (Some(proof), Some(response_hex)) if !proof.is_empty() && !response_hex.is_empty() => {
            PollOutcome::Ready(Proof {
                proof,
                response_hex,
            })
        }
        _ => PollOutcome::Pending,
    }
}

/// Polls a [`ProofSource`] until a proof is ready or the budget runs out.
pub struct ProofRetriever<S, Z = TokioSleeper> {
    source: S,
    sleeper: Z,
    policy: RetryPolicy,
}

impl<S: ProofSource> ProofRetriever<S, TokioSleeper> {
    /// Create a retriever using the tokio timer.
    #[must_use]
    pub fn new(source: S, policy: RetryPolicy) -> Self {
        Self::with_sleeper(source, TokioSleeper, policy)
    }
}

impl<S: ProofSource, Z: Sleeper> ProofRetriever<S, Z> {
    /// Create a retriever with a custom sleeper.
    #[must_use]
    pub fn with_sleeper(source: S, sleeper: Z, policy: RetryPolicy) -> Self {
        Self {
            source,
            sleeper,
            policy,
        }
    }

    /// Get the retry policy.
    #[must_use]
    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// Get the proof source.
    #[must_use]
    pub fn source(&self) -> &S {
        &self.source
    }

    /// Get the sleeper.
    #[must_use]
    pub fn sleeper(&self) -> &Z {
        &self.sleeper
    }

    /// Poll for the proof of (`request`, `round_id`).
    ///
    /// Performs at most `max_attempts` fetches with `max_attempts - 1`
    /// sleeps between them, returning as soon as a proof is ready.
    ///
    /// # Errors
    ///
    /// - [`Error::ProofNotAvailable`] when the budget is exhausted; the
    ///   round id stays valid and the call may be repeated
    /// - [`Error::Transport`] when the final attempt failed at the transport level
    /// - [`Error::MalformedProofResponse`] on an uninterpretable 200 body
    /// - [`Error::Cancelled`] if `cancel` fires before a proof arrives
    pub async fn retrieve(
        &self,
        request: &EncodedAttestationRequest,
        round_id: u64,
        cancel: &CancellationToken,
    ) -> Result<Proof> {
        let max_attempts = self.policy.max_attempts.max(1);
        let mut last_status = None;
        let mut last_transport_error = None;

        for attempt in 1..=max_attempts {
            let fetched = tokio::select! {
                biased;
                () = cancel.cancelled() => {
                    return Err(Error::Cancelled { round_id, attempts: attempt - 1 });
                }
                fetched = self.source.fetch(request, round_id) => fetched,
            };

            match fetched {
                Ok(response) => {
                    last_status = Some(response.status);
                    last_transport_error = None;
                    match classify(&response) {
                        PollOutcome::Ready(proof) => {
                            info!(
                                "Proof for round {} retrieved on attempt {}/{} ({} siblings)",
                                round_id,
                                attempt,
                                max_attempts,
                                proof.proof.len()
                            );
                            return Ok(proof);
                        }
                        PollOutcome::Pending => {
                            debug!(
                                "Proof for round {} not ready (attempt {}/{}, HTTP {})",
                                round_id, attempt, max_attempts, response.status
                            );
                        }
                        PollOutcome::Malformed(reason) => {
                            warn!(
                                "Malformed DA layer response for round {} on attempt {}: {}",
                                round_id, attempt, reason
                            );
                            return Err(Error::MalformedProofResponse { attempt, reason });
                        }
                    }
                }
                Err(Error::Transport(msg)) => {
                    warn!(
                        "DA layer unreachable for round {} (attempt {}/{}): {}",
                        round_id, attempt, max_attempts, msg
                    );
                    last_transport_error = Some(msg);
                }
                Err(e) => return Err(e),
            }

            if attempt < max_attempts {
                tokio::select! {
                    biased;
                    () = cancel.cancelled() => {
                        return Err(Error::Cancelled { round_id, attempts: attempt });
                    }
                    () = self.sleeper.sleep(self.policy.poll_interval) => {}
                }
            }
        }

        if let Some(msg) = last_transport_error {
            return Err(Error::Transport(format!(
                "{msg} (round {round_id}, {max_attempts} attempts)"
            )));
        }

        warn!(
            "Gave up on proof for round {} after {} attempts",
            round_id, max_attempts
        );
        Err(Error::ProofNotAvailable {
            round_id,
            attempts: max_attempts,
            last_status,
        })
    }
}
