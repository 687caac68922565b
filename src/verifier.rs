//! Client for the attestation verifier's `prepareRequest` endpoint.
//!
//! The verifier checks that a request is well formed and returns the
//! ABI-encoded form that is submitted on-chain. It is called exactly once per
//! request; retrying is left to the caller.

use crate::encoding::join_url;
use crate::error::{excerpt, Error, Result, VerifierErrorBody};
use crate::request::{
    AttestationRequest, AttestationTypeDescriptor, EncodedAttestationRequest,
    PrepareRequestPayload,
};
use reqwest::StatusCode;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Header carrying the verifier API key.
pub const API_KEY_HEADER: &str = "X-API-KEY";

/// Default HTTP timeout for verifier calls in seconds.
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Configuration for [`VerifierClient`].
#[derive(Clone)]
pub struct VerifierConfig {
    /// Verifier base URL, e.g. `https://verifier-testnet.flare.network/`.
    pub base_url: String,
    /// API key sent as `X-API-KEY`.
    pub api_key: String,
    /// Attestation type and source network.
    pub descriptor: AttestationTypeDescriptor,
    /// HTTP timeout.
    pub timeout: Duration,
}

impl std::fmt::Debug for VerifierConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VerifierConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &"<redacted>")
            .field("descriptor", &self.descriptor)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl VerifierConfig {
    /// Create a config for the `Web2Json` type on `source_id`.
    #[must_use]
    pub fn new(base_url: &str, api_key: &str, source_id: &str) -> Self {
        Self {
            base_url: base_url.to_string(),
            api_key: api_key.to_string(),
            descriptor: AttestationTypeDescriptor::web2json(source_id),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

/// Successful answer from `prepareRequest`.
#[derive(Debug, Clone)]
pub struct PreparedRequest {
    /// Encoded request to submit on-chain.
    pub abi_encoded_request: EncodedAttestationRequest,
    /// Verifier's `status` field, if present (e.g. `VALID`).
    pub status: Option<String>,
    /// Full response body for diagnostics.
    pub response: serde_json::Value,
}

/// Calls the verifier to turn an [`AttestationRequest`] into an encoded request.
pub struct VerifierClient {
    config: VerifierConfig,
    client: reqwest::Client,
}

impl VerifierClient {
    /// Create a verifier client.
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL or API key is empty, or the HTTP
    /// client cannot be built.
    pub fn new(config: VerifierConfig) -> Result<Self> {
        if config.base_url.trim().is_empty() {
            return Err(Error::Config("verifier URL must not be empty".to_string()));
        }
        if config.api_key.trim().is_empty() {
            return Err(Error::Config("verifier API key must not be empty".to_string()));
        }

        let client = reqwest::Client::builder()
            .user_agent(concat!("swagform-fdc/", env!("CARGO_PKG_VERSION")))
            .timeout(config.timeout)
            .build()
            .map_err(|e| Error::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { config, client })
    }

    /// Endpoint the payload is POSTed to.
    #[must_use]
    pub fn endpoint(&self) -> String {
        join_url(
            &self.config.base_url,
            &format!("{}/prepareRequest", self.config.descriptor.attestation_type),
        )
    }

    /// Get the attestation type descriptor.
    #[must_use]
    pub fn descriptor(&self) -> &AttestationTypeDescriptor {
        &self.config.descriptor
    }

    /// Prepare `request` with the verifier.
    ///
    /// # Errors
    ///
    /// - [`Error::VerifierRejected`] on any non-200 status, with the parsed
    ///   JSON body or the raw text if it was not JSON
    /// - [`Error::MalformedVerifierResponse`] if a 200 body is not JSON or
    ///   lacks `abiEncodedRequest`
    /// - [`Error::Transport`] if the HTTP call itself fails
    pub async fn prepare(&self, request: &AttestationRequest) -> Result<PreparedRequest> {
        let payload = PrepareRequestPayload::new(&self.config.descriptor, request)?;
        let url = self.endpoint();

        debug!("Preparing attestation request for {} via {}", request.url, url);

        let response = self
            .client
            .post(&url)
            .header(API_KEY_HEADER, &self.config.api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|e| Error::transport("verifier prepareRequest", &e))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| Error::transport("reading verifier response", &e))?;

        interpret_response(status, &text).inspect(|prepared| {
            info!(
                "Verifier prepared request for {} (status: {})",
                request.url,
                prepared.status.as_deref().unwrap_or("unknown")
            );
        })
    }
}

fn interpret_response(status: StatusCode, text: &str) -> Result<PreparedRequest> {
    if status != StatusCode::OK {
        let body = VerifierErrorBody::parse(text);
        if body.is_raw() {
            warn!(
                "Verifier returned HTTP {} with a non-JSON body: {}",
                status.as_u16(),
                excerpt(text)
            );
        }
        return Err(Error::VerifierRejected {
            status: status.as_u16(),
            body,
        });
    }

    let response: serde_json::Value = serde_json::from_str(text).map_err(|e| {
        Error::MalformedVerifierResponse(format!("body is not JSON ({e}): {}", excerpt(text)))
    })?;

    let encoded = response
        .get("abiEncodedRequest")
        .and_then(serde_json::Value::as_str)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| {
            Error::MalformedVerifierResponse(format!(
                "missing abiEncodedRequest: {}",
                excerpt(text)
            ))
        })?;

    let abi_encoded_request = EncodedAttestationRequest::new(encoded).map_err(|e| {
        Error::MalformedVerifierResponse(format!("abiEncodedRequest is not hex: {e}"))
    })?;
    let verifier_status = response
        .get("status")
        .and_then(serde_json::Value::as_str)
        .map(str::to_string);

    Ok(PreparedRequest {
        abi_encoded_request,
        status: verifier_status,
        response,
    })
}
