//! The end-to-end attestation pipeline.
//!
//! Each stage consumes the record of the previous one, so a request cannot be
//! submitted before it is encoded and no poll starts without a round id:
//!
//! ```text
//! AttestationRequest ─prepare─► Prepared ─submit─► Submitted ─retrieve─► Retrieved
//! ```
//!
//! Build and submit errors end the flow. A `Submitted` record survives a
//! [`Error::ProofNotAvailable`](crate::Error::ProofNotAvailable) and can be
//! retrieved again with a fresh budget.

use crate::error::Result;
use crate::proof::{ContractProof, Proof};
use crate::request::{AttestationRequest, EncodedAttestationRequest};
use crate::retrieve::{ProofRetriever, ProofSource, Sleeper, TokioSleeper};
use crate::submit::{AttestationSubmitter, Submission, VotingContract};
use crate::verifier::{PreparedRequest, VerifierClient};
use tokio_util::sync::CancellationToken;
use tracing::info;

/// A request the verifier has encoded.
#[derive(Debug, Clone)]
pub struct Prepared {
    /// URL of the attested resource.
    pub target_url: String,
    /// Verifier output.
    pub verifier: PreparedRequest,
}

impl Prepared {
    /// The encoded request.
    #[must_use]
    pub fn encoded(&self) -> &EncodedAttestationRequest {
        &self.verifier.abi_encoded_request
    }
}

/// A request accepted by the voting contract.
#[derive(Debug, Clone)]
pub struct Submitted {
    /// URL of the attested resource.
    pub target_url: String,
    /// Encoded request that was submitted.
    pub encoded: EncodedAttestationRequest,
    /// Round and receipt.
    pub submission: Submission,
}

impl Submitted {
    /// Voting round the request is decided in.
    #[must_use]
    pub fn round_id(&self) -> u64 {
        self.submission.round_id
    }
}

/// A finalized proof for a submitted request.
#[derive(Debug, Clone)]
pub struct Retrieved {
    /// The submission the proof belongs to.
    pub submitted: Submitted,
    /// The proof.
    pub proof: Proof,
}

impl Retrieved {
    /// Argument for the on-chain verification call.
    #[must_use]
    pub fn contract_proof(&self) -> ContractProof {
        self.proof.clone().into_contract_proof()
    }
}

/// Runs build → submit → retrieve for one attestation at a time.
///
/// Flows share no mutable state, so independent attestations can run as
/// separate tasks against separate or shared (`&self`) flows.
pub struct AttestationFlow<V, S, Z = TokioSleeper> {
    verifier: VerifierClient,
    submitter: AttestationSubmitter<V>,
    retriever: ProofRetriever<S, Z>,
}

impl<V, S, Z> AttestationFlow<V, S, Z>
where
    V: VotingContract,
    S: ProofSource,
    Z: Sleeper,
{
    /// Assemble a flow from its three stages.
    #[must_use]
    pub fn new(
        verifier: VerifierClient,
        submitter: AttestationSubmitter<V>,
        retriever: ProofRetriever<S, Z>,
    ) -> Self {
        Self {
            verifier,
            submitter,
            retriever,
        }
    }

    /// Get the proof retriever.
    #[must_use]
    pub fn retriever(&self) -> &ProofRetriever<S, Z> {
        &self.retriever
    }

    /// Get the submitter.
    #[must_use]
    pub fn submitter(&self) -> &AttestationSubmitter<V> {
        &self.submitter
    }

    /// Encode `request` with the verifier.
    ///
    /// # Errors
    ///
    /// Propagates verifier and transport errors.
    pub async fn prepare(&self, request: &AttestationRequest) -> Result<Prepared> {
        let verifier = self.verifier.prepare(request).await?;
        Ok(Prepared {
            target_url: request.url.clone(),
            verifier,
        })
    }

    /// Submit a prepared request on-chain.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SubmissionFailed`](crate::Error::SubmissionFailed) on failure.
    pub async fn submit(&self, prepared: Prepared) -> Result<Submitted> {
        let encoded = prepared.verifier.abi_encoded_request;
        let submission = self.submitter.submit(&encoded).await?;
        Ok(Submitted {
            target_url: prepared.target_url,
            encoded,
            submission,
        })
    }

    /// Poll for the proof of a submitted request.
    ///
    /// # Errors
    ///
    /// See [`ProofRetriever::retrieve`].
    pub async fn retrieve(
        &self,
        submitted: &Submitted,
        cancel: &CancellationToken,
    ) -> Result<Retrieved> {
        let proof = self
            .retriever
            .retrieve(&submitted.encoded, submitted.round_id(), cancel)
            .await?;
        Ok(Retrieved {
            submitted: submitted.clone(),
            proof,
        })
    }

    /// Run the whole pipeline for `request`.
    ///
    /// # Errors
    ///
    /// Returns the first error of any stage.
    pub async fn run(
        &self,
        request: &AttestationRequest,
        cancel: &CancellationToken,
    ) -> Result<Retrieved> {
        let prepared = self.prepare(request).await?;
        let submitted = self.submit(prepared).await?;
        info!(
            "Waiting for round {} to finalize for {}",
            submitted.round_id(),
            submitted.target_url
        );
        self.retrieve(&submitted, cancel).await
    }
}
