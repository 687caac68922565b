//! E2E tests for swagform-fdc against stubbed verifier and DA layer endpoints.
//!
//! ## Architecture
//!
//! ```text
//! VerifierClient ──► MockServer (/Web2Json/prepareRequest)
//! StubVotingContract (in memory)
//! DaLayerClient  ──► MockServer (/api/v1/fdc/proof-by-request-round-raw)
//! ```

#![allow(clippy::unwrap_used, clippy::expect_used)]

mod flow;
mod retrieve;

use std::sync::atomic::{AtomicUsize, Ordering};
use swagform_fdc::{
    AttestationConfig, EncodedAttestationRequest, Result, RoundSchedule, SubmissionReceipt,
    VotingContract,
};
use wiremock::MockServer;

/// Known-good encoded request returned by the stub verifier.
pub const ENCODED_REQUEST: &str =
    "0x576562324a736f6e00000000000000000000000000000000000000000000000074657374";

/// First round start used by the stub schedule.
pub const FIRST_ROUND_START: u64 = 1_658_430_000;

/// Epoch duration used by the stub schedule.
pub const EPOCH_SECS: u64 = 90;

/// A DA layer body for a finalized proof.
pub fn ready_proof_body() -> serde_json::Value {
    serde_json::json!({
        "attestation_type": "0x576562324a736f6e000000000000000000000000000000000000000000000000",
        "proof": [
            format!("0x{}", "aa".repeat(32)),
            format!("0x{}", "bb".repeat(32)),
        ],
        "response_hex": format!("0x{}", "00".repeat(31) + "20"),
    })
}

/// Config pointing both endpoints at stub servers, with instant polling.
pub fn stub_config(
    verifier: &MockServer,
    da_layer: &MockServer,
    max_attempts: u32,
) -> AttestationConfig {
    AttestationConfig {
        verifier_url: verifier.uri(),
        api_key: "test-api-key".to_string(),
        da_layer_url: da_layer.uri(),
        max_attempts,
        poll_interval_secs: 0,
        http_timeout_secs: 5,
        submission_timeout_secs: 5,
        ..AttestationConfig::default()
    }
}

/// In-memory voting contract that includes every request at a fixed timestamp.
pub struct StubVotingContract {
    pub block_timestamp: u64,
    pub revert: bool,
    pub hang: bool,
    pub submissions: AtomicUsize,
}

impl StubVotingContract {
    pub fn at_round(round_id: u64) -> Self {
        Self {
            block_timestamp: FIRST_ROUND_START + round_id * EPOCH_SECS + 1,
            revert: false,
            hang: false,
            submissions: AtomicUsize::new(0),
        }
    }

    pub fn reverting() -> Self {
        Self {
            revert: true,
            ..Self::at_round(0)
        }
    }

    /// A contract that never confirms the submission transaction.
    pub fn hanging() -> Self {
        Self {
            hang: true,
            ..Self::at_round(0)
        }
    }

    pub fn submissions(&self) -> usize {
        self.submissions.load(Ordering::SeqCst)
    }
}

impl VotingContract for StubVotingContract {
    async fn request_fee(&self, _request: &EncodedAttestationRequest) -> Result<u128> {
        Ok(500_000_000_000_000_000)
    }

    async fn request_attestation(
        &self,
        request: &EncodedAttestationRequest,
        _fee: u128,
    ) -> Result<SubmissionReceipt> {
        self.submissions.fetch_add(1, Ordering::SeqCst);
        if self.hang {
            std::future::pending::<()>().await;
        }
        if self.revert {
            return Err(swagform_fdc::Error::Transport(
                "execution reverted: fee too low".to_string(),
            ));
        }
        Ok(SubmissionReceipt {
            tx_hash: format!("0xtx{}", &request.as_str()[2..10]),
            block_timestamp: self.block_timestamp,
        })
    }

    async fn round_schedule(&self) -> Result<RoundSchedule> {
        RoundSchedule::new(FIRST_ROUND_START, EPOCH_SECS, 0)
    }
}
