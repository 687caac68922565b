//! Error types for swagform-fdc.

use std::fmt;
use thiserror::Error;

/// Result type alias using the crate's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Maximum number of characters of a response body kept in error messages.
const BODY_EXCERPT_CHARS: usize = 512;

/// Body attached to a verifier rejection.
#[derive(Debug, Clone, PartialEq)]
pub enum VerifierErrorBody {
    /// The verifier answered with a JSON document.
    Json(serde_json::Value),
    /// The body was not valid JSON; kept verbatim.
    Raw(String),
}

impl VerifierErrorBody {
    /// Parse a response body, falling back to the raw text.
    #[must_use]
    pub fn parse(text: &str) -> Self {
        serde_json::from_str(text).map_or_else(|_| Self::Raw(text.to_string()), Self::Json)
    }

    /// Returns true if the body could not be parsed as JSON.
    #[must_use]
    pub fn is_raw(&self) -> bool {
        matches!(self, Self::Raw(_))
    }
}

impl fmt::Display for VerifierErrorBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Json(value) => write!(f, "{}", excerpt(&value.to_string())),
            Self::Raw(text) => write!(f, "{}", excerpt(text)),
        }
    }
}

/// Errors that can occur while acquiring an attestation proof.
#[derive(Error, Debug)]
pub enum Error {
    /// The verifier returned a non-200 status.
    #[error("verifier rejected request with HTTP {status}: {body}")]
    VerifierRejected {
        /// HTTP status code.
        status: u16,
        /// Parsed JSON body, or raw text if it was not JSON.
        body: VerifierErrorBody,
    },

    /// The verifier accepted the request but its answer could not be interpreted.
    #[error("malformed verifier response: {0}")]
    MalformedVerifierResponse(String),

    /// The on-chain submission reverted, failed or timed out.
    #[error("attestation submission failed: {0}")]
    SubmissionFailed(String),

    /// The polling budget ran out before the round produced a proof.
    #[error(
        "proof not available for round {round_id} after {attempts} attempts (last status: {})",
        status_label(.last_status)
    )]
    ProofNotAvailable {
        /// Voting round that was polled.
        round_id: u64,
        /// Number of attempts performed.
        attempts: u32,
        /// HTTP status of the last response, if one was received.
        last_status: Option<u16>,
    },

    /// The DA layer answered 200 with a body that is neither ready nor pending.
    #[error("malformed proof response on attempt {attempt}: {reason}")]
    MalformedProofResponse {
        /// Attempt number (1-based) that produced the response.
        attempt: u32,
        /// What was wrong with the body.
        reason: String,
    },

    /// Network or HTTP client failure.
    #[error("transport error: {0}")]
    Transport(String),

    /// A proof poll was cancelled by the caller.
    #[error("proof retrieval for round {round_id} cancelled after {attempts} attempts")]
    Cancelled {
        /// Voting round that was polled.
        round_id: u64,
        /// Attempts performed before cancellation.
        attempts: u32,
    },

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// Hex or fixed-width encoding error.
    #[error("encoding error: {0}")]
    Encoding(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl Error {
    /// Returns true if repeating the operation later might succeed.
    ///
    /// Verifier 5xx and 429 responses count as retryable; other 4xx do not.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::ProofNotAvailable { .. } | Self::Transport(_) => true,
            Self::VerifierRejected { status, .. } => *status >= 500 || *status == 429,
            _ => false,
        }
    }

    /// Returns true if the same input will never succeed.
    #[must_use]
    pub fn is_permanent(&self) -> bool {
        match self {
            Self::VerifierRejected { status, .. } => (400..500).contains(status) && *status != 429,
            Self::MalformedVerifierResponse(_)
            | Self::MalformedProofResponse { .. }
            | Self::Config(_)
            | Self::Encoding(_) => true,
            _ => false,
        }
    }

    /// Wrap a reqwest failure with the operation that caused it.
    pub(crate) fn transport(context: &str, err: &reqwest::Error) -> Self {
        let kind = if err.is_timeout() {
            "timeout"
        } else if err.is_connect() {
            "connect"
        } else {
            "request"
        };
        Self::Transport(format!("{context} ({kind}): {err}"))
    }
}

fn status_label(status: &Option<u16>) -> String {
    status.map_or_else(|| "none".to_string(), |s| s.to_string())
}

/// Truncate a body for inclusion in an error message.
pub(crate) fn excerpt(text: &str) -> String {
    if text.chars().count() <= BODY_EXCERPT_CHARS {
        return text.to_string();
    }
    let head: String = text.chars().take(BODY_EXCERPT_CHARS).collect();
    format!("{head}...")
}
