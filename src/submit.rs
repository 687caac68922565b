//! Submission of encoded requests to the attestation voting network.
//!
//! The voting contract itself is an external collaborator reached through
//! [`VotingContract`]. This module owns the round arithmetic: a request
//! lands in the voting epoch that contains its block timestamp plus the
//! network's submission buffer.

use crate::error::{Error, Result};
use crate::request::EncodedAttestationRequest;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Timing parameters of the voting protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundSchedule {
    /// Unix timestamp at which round 0 starts.
    pub first_round_start_ts: u64,
    /// Length of one voting epoch in seconds.
    pub epoch_duration_secs: u64,
    /// Offset added to the submission timestamp before picking the round.
    #[serde(default)]
    pub submission_buffer_secs: u64,
}

impl RoundSchedule {
    /// Create a schedule.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if `epoch_duration_secs` is zero.
    pub fn new(
        first_round_start_ts: u64,
        epoch_duration_secs: u64,
        submission_buffer_secs: u64,
    ) -> Result<Self> {
        let schedule = Self {
            first_round_start_ts,
            epoch_duration_secs,
            submission_buffer_secs,
        };
        schedule.validate()?;
        Ok(schedule)
    }

    /// Check the schedule is usable.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if `epoch_duration_secs` is zero.
    pub fn validate(&self) -> Result<()> {
        if self.epoch_duration_secs == 0 {
            return Err(Error::Config(
                "voting epoch duration must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Round whose epoch contains `timestamp + submission_buffer_secs`.
    ///
    /// # Errors
    ///
    /// Returns an error if the shifted timestamp precedes round 0 or the
    /// schedule is invalid.
    pub fn round_for_timestamp(&self, timestamp: u64) -> Result<u64> {
        self.validate()?;
        let shifted = timestamp.saturating_add(self.submission_buffer_secs);
        let since_start = shifted.checked_sub(self.first_round_start_ts).ok_or_else(|| {
            Error::SubmissionFailed(format!(
                "timestamp {timestamp} precedes the first voting round ({})",
                self.first_round_start_ts
            ))
        })?;
        Ok(since_start / self.epoch_duration_secs)
    }

    /// Unix timestamp at which `round_id` starts.
    #[must_use]
    pub fn round_start(&self, round_id: u64) -> u64 {
        self.first_round_start_ts
            .saturating_add(round_id.saturating_mul(self.epoch_duration_secs))
    }

    /// Unix timestamp at which `round_id` ends (start of the next round).
    #[must_use]
    pub fn round_end(&self, round_id: u64) -> u64 {
        self.round_start(round_id.saturating_add(1))
    }

    /// Seconds from `now` until `round_id` ends, zero if already over.
    #[must_use]
    pub fn time_until_round_end(&self, round_id: u64, now: u64) -> Duration {
        Duration::from_secs(self.round_end(round_id).saturating_sub(now))
    }
}

/// Evidence that the voting contract accepted a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionReceipt {
    /// Transaction hash of the submission.
    pub tx_hash: String,
    /// Timestamp of the block that included the transaction.
    pub block_timestamp: u64,
}

/// On-chain attestation hub the encoded request is submitted to.
///
/// Implementations wrap whatever EVM client the caller uses.
pub trait VotingContract: Send + Sync {
    /// Fee, in wei, required to submit `request`.
    fn request_fee(
        &self,
        request: &EncodedAttestationRequest,
    ) -> impl Future<Output = Result<u128>> + Send;

    /// Submit `request`, paying `fee`, and wait for inclusion.
    fn request_attestation(
        &self,
        request: &EncodedAttestationRequest,
        fee: u128,
    ) -> impl Future<Output = Result<SubmissionReceipt>> + Send;

    /// Current voting round schedule.
    fn round_schedule(&self) -> impl Future<Output = Result<RoundSchedule>> + Send;
}

/// Result of a successful submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    /// Round the request will be decided in.
    pub round_id: u64,
    /// Fee paid, in wei.
    pub fee: u128,
    /// Receipt returned by the contract.
    pub receipt: SubmissionReceipt,
}

/// Submits encoded requests and works out their voting round.
pub struct AttestationSubmitter<V> {
    contract: V,
    timeout: Duration,
}

impl<V: VotingContract> AttestationSubmitter<V> {
    /// Create a submitter bounding each contract interaction by `timeout`.
    #[must_use]
    pub fn new(contract: V, timeout: Duration) -> Self {
        Self { contract, timeout }
    }

    /// Get the underlying contract.
    #[must_use]
    pub fn contract(&self) -> &V {
        &self.contract
    }

    /// Submit `request` and return the round it lands in.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SubmissionFailed`] if any contract call fails or the
    /// submission does not complete within the timeout. Not retried.
    pub async fn submit(&self, request: &EncodedAttestationRequest) -> Result<Submission> {
        let fee = self
            .bounded("reading request fee", self.contract.request_fee(request))
            .await?;
        debug!("Attestation request fee: {} wei", fee);

        let receipt = self
            .bounded(
                "submitting attestation request",
                self.contract.request_attestation(request, fee),
            )
            .await?;

        let schedule = self
            .bounded("reading round schedule", self.contract.round_schedule())
            .await?;
        let round_id = schedule.round_for_timestamp(receipt.block_timestamp)?;

        info!(
            "Attestation request submitted in tx {} (block ts {}), voting round {}",
            receipt.tx_hash, receipt.block_timestamp, round_id
        );

        Ok(Submission {
            round_id,
            fee,
            receipt,
        })
    }

    async fn bounded<T>(
        &self,
        step: &str,
        call: impl Future<Output = Result<T>> + Send,
    ) -> Result<T> {
        match tokio::time::timeout(self.timeout, call).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(Error::SubmissionFailed(msg))) => Err(Error::SubmissionFailed(msg)),
            Ok(Err(e)) => {
                warn!("Voting contract error while {}: {}", step, e);
                Err(Error::SubmissionFailed(format!("{step}: {e}")))
            }
            Err(_) => {
                warn!("Voting contract timed out while {}", step);
                Err(Error::SubmissionFailed(format!(
                    "{step}: timed out after {}s",
                    self.timeout.as_secs()
                )))
            }
        }
    }
}
