//! # swagform-fdc
//!
//! Acquires Flare Data Connector attestation proofs for SwagForm answers
//! (tweet existence, API health checks) so they can be verified on-chain.
//!
//! ## Pipeline
//!
//! ```text
//! AttestationRequest
//!        │  VerifierClient::prepare      POST {verifier}{type}/prepareRequest
//!        ▼
//! EncodedAttestationRequest
//!        │  AttestationSubmitter::submit  voting contract (external)
//!        ▼
//! voting round id
//!        │  ProofRetriever::retrieve      POST {da}api/v1/fdc/proof-by-request-round-raw
//!        ▼                                (bounded fixed-interval polling)
//! Proof ──► ContractProof for verifyHealthData / verifyTweetData
//! ```
//!
//! The voting contract is reached through the [`VotingContract`] trait, and
//! the DA layer through [`ProofSource`], so both can be replaced in tests.
//!
//! ## Example
//!
//! ```rust,no_run
//! use swagform_fdc::{AttestationConfig, AttestationRequest, VerifierClient};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = AttestationConfig::coston2("my-api-key");
//!     let verifier = VerifierClient::new(config.verifier())?;
//!     let request = AttestationRequest::health_check("http://localhost:8000")?;
//!     let prepared = verifier.prepare(&request).await?;
//!     println!("{}", prepared.abi_encoded_request);
//!     Ok(())
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod abi;
pub mod config;
pub mod encoding;
pub mod error;
pub mod flow;
pub mod proof;
pub mod request;
pub mod retrieve;
pub mod submit;
pub mod verifier;

pub use abi::{AbiComponent, AbiSignature, SchemaRegistry};
pub use config::{AttestationConfig, RoundScheduleConfig};
pub use error::{Error, Result, VerifierErrorBody};
pub use flow::{AttestationFlow, Prepared, Retrieved, Submitted};
pub use proof::{ContractProof, Proof};
pub use request::{
    AttestationRequest, AttestationTypeDescriptor, EncodedAttestationRequest, HttpMethod,
    PrepareRequestPayload, RequestBody,
};
pub use retrieve::{
    DaLayerClient, DaLayerConfig, PollOutcome, PollResponse, ProofRetriever, ProofSource,
    RetryPolicy, Sleeper, TokioSleeper,
};
pub use submit::{
    AttestationSubmitter, RoundSchedule, Submission, SubmissionReceipt, VotingContract,
};
pub use verifier::{PreparedRequest, VerifierClient, VerifierConfig};

/// Re-exported so callers can cancel polls without a direct `tokio-util` dependency.
pub use tokio_util::sync::CancellationToken;
