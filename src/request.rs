//! Attestation request descriptions and the verifier's wire payload.

use crate::abi::{self, AbiSignature};
use crate::encoding::{compact_json, compact_json_map, encode_bytes32};
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Default attestation family for JSON-over-HTTP facts.
pub const WEB2JSON: &str = "Web2Json";

/// Post-processing transform for the health-check endpoint.
pub const HEALTH_TRANSFORM: &str = "{status: .status, timestamp: .timestamp}";

/// Post-processing transform for the tweet-verification endpoint.
pub const TWEET_TRANSFORM: &str = "{tweetId: .data.tweetId, authorUsername: .data.authorUsername, \
tweetText: .data.tweetText, createdAt: .data.createdAt, exists: .data.exists, \
timestamp: .data.timestamp}";

/// HTTP method the attestation providers use to fetch the target URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    /// GET.
    #[default]
    Get,
    /// POST.
    Post,
    /// PUT.
    Put,
    /// PATCH.
    Patch,
    /// DELETE.
    Delete,
}

impl HttpMethod {
    /// Upper-case method name as sent on the wire.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which attestation family and source network a request targets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttestationTypeDescriptor {
    /// Attestation type name, e.g. `Web2Json`.
    pub attestation_type: String,
    /// Source network name, e.g. `testnet`.
    pub source_id: String,
}

impl AttestationTypeDescriptor {
    /// Create a descriptor.
    #[must_use]
    pub fn new(attestation_type: &str, source_id: &str) -> Self {
        Self {
            attestation_type: attestation_type.to_string(),
            source_id: source_id.to_string(),
        }
    }

    /// `Web2Json` on the given source network.
    #[must_use]
    pub fn web2json(source_id: &str) -> Self {
        Self::new(WEB2JSON, source_id)
    }

    /// Attestation type as a 32-byte padded hex string.
    ///
    /// # Errors
    ///
    /// Returns an error if the name does not fit in 32 bytes.
    pub fn encoded_type(&self) -> Result<String> {
        encode_bytes32(&self.attestation_type)
    }

    /// Source id as a 32-byte padded hex string.
    ///
    /// # Errors
    ///
    /// Returns an error if the name does not fit in 32 bytes.
    pub fn encoded_source(&self) -> Result<String> {
        encode_bytes32(&self.source_id)
    }
}

/// What external fact to fetch and how to shape it for the contract.
#[derive(Debug, Clone, PartialEq)]
pub struct AttestationRequest {
    /// Target URL the attestation providers fetch.
    pub url: String,
    /// HTTP method used for the fetch.
    pub method: HttpMethod,
    /// Request headers.
    pub headers: BTreeMap<String, String>,
    /// Query parameters.
    pub query_params: BTreeMap<String, String>,
    /// JSON body fields.
    pub body: serde_json::Map<String, serde_json::Value>,
    /// jq expression applied to the raw response.
    pub post_process_jq: String,
    /// Shape of the tuple the transformed response is encoded into.
    pub abi_signature: AbiSignature,
}

impl AttestationRequest {
    /// Start a request for `url` with an identity transform and no schema fields.
    #[must_use]
    pub fn new(url: impl Into<String>, method: HttpMethod) -> Self {
        Self {
            url: url.into(),
            method,
            headers: BTreeMap::new(),
            query_params: BTreeMap::new(),
            body: serde_json::Map::new(),
            post_process_jq: ".".to_string(),
            abi_signature: AbiSignature::tuple("Response", "response", Vec::new()),
        }
    }

    /// Add a request header.
    #[must_use]
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.insert(name.to_string(), value.to_string());
        self
    }

    /// Add a query parameter.
    #[must_use]
    pub fn with_query_param(mut self, name: &str, value: &str) -> Self {
        self.query_params.insert(name.to_string(), value.to_string());
        self
    }

    /// Add a JSON body field.
    #[must_use]
    pub fn with_body_field(mut self, name: &str, value: serde_json::Value) -> Self {
        self.body.insert(name.to_string(), value);
        self
    }

    /// Set the post-processing jq transform.
    #[must_use]
    pub fn with_transform(mut self, jq: &str) -> Self {
        self.post_process_jq = jq.to_string();
        self
    }

    /// Set the ABI signature of the response tuple.
    #[must_use]
    pub fn with_abi_signature(mut self, signature: AbiSignature) -> Self {
        self.abi_signature = signature;
        self
    }

    /// Attest the `/health` endpoint of the SwagForm API.
    ///
    /// # Errors
    ///
    /// Returns an error if the embedded `HealthData` schema is invalid.
    pub fn health_check(api_base: &str) -> Result<Self> {
        let signature = abi::registry()?.get(abi::HEALTH_DATA)?.clone();
        Ok(
            Self::new(crate::encoding::join_url(api_base, "health"), HttpMethod::Get)
                .with_transform(HEALTH_TRANSFORM)
                .with_abi_signature(signature),
        )
    }

    /// Attest that a tweet exists, via the SwagForm tweet-verification API.
    ///
    /// # Errors
    ///
    /// Returns an error if `tweet_id` is empty or the embedded `TweetData`
    /// schema is invalid.
    pub fn tweet_verification(api_base: &str, tweet_id: &str) -> Result<Self> {
        if tweet_id.trim().is_empty() {
            return Err(Error::Config("tweet id must not be empty".to_string()));
        }
        let signature = abi::registry()?.get(abi::TWEET_DATA)?.clone();
        let url = format!(
            "{}?url={tweet_id}",
            crate::encoding::join_url(api_base, "api/v1/verify-tweet")
        );
        Ok(Self::new(url, HttpMethod::Get)
            .with_transform(TWEET_TRANSFORM)
            .with_abi_signature(signature))
    }

    /// Build the inner request body with every map field as compact JSON text.
    ///
    /// # Errors
    ///
    /// Returns an error if the ABI signature is invalid or serialization fails.
    pub fn to_request_body(&self) -> Result<RequestBody> {
        self.abi_signature.validate()?;
        Ok(RequestBody {
            url: self.url.clone(),
            http_method: self.method.as_str().to_string(),
            headers: compact_json_map(&self.headers)?,
            query_params: compact_json_map(&self.query_params)?,
            body: compact_json(&self.body)?,
            post_process_jq: self.post_process_jq.clone(),
            abi_signature: self.abi_signature.to_json()?,
        })
    }
}

/// The `requestBody` object as the verifier expects it, all fields strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestBody {
    /// Target URL.
    pub url: String,
    /// HTTP method name.
    pub http_method: String,
    /// Headers as JSON text.
    pub headers: String,
    /// Query parameters as JSON text.
    pub query_params: String,
    /// Body as JSON text.
    pub body: String,
    /// jq transform.
    pub post_process_jq: String,
    /// ABI signature as JSON text.
    pub abi_signature: String,
}

/// Outer body POSTed to `{verifier}{type}/prepareRequest`.
///
/// `request_body` holds the [`RequestBody`] serialized to a JSON string,
/// not a nested object; the verifier only accepts that form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrepareRequestPayload {
    /// 32-byte padded hex attestation type.
    pub attestation_type: String,
    /// 32-byte padded hex source id.
    pub source_id: String,
    /// JSON-stringified [`RequestBody`].
    pub request_body: String,
}

impl PrepareRequestPayload {
    /// Assemble the payload for `request` under `descriptor`.
    ///
    /// # Errors
    ///
    /// Returns an error if a name does not fit in 32 bytes or serialization fails.
    pub fn new(
        descriptor: &AttestationTypeDescriptor,
        request: &AttestationRequest,
    ) -> Result<Self> {
        let body = request.to_request_body()?;
        Ok(Self {
            attestation_type: descriptor.encoded_type()?,
            source_id: descriptor.encoded_source()?,
            request_body: compact_json(&body)?,
        })
    }

    /// Parse the stringified `request_body` back into its fields.
    ///
    /// # Errors
    ///
    /// Returns an error if `request_body` is not a valid [`RequestBody`].
    pub fn decode_request_body(&self) -> Result<RequestBody> {
        serde_json::from_str(&self.request_body).map_err(|e| Error::Serialization(e.to_string()))
    }
}

/// ABI-encoded attestation request returned by the verifier.
///
/// Opaque: passed unchanged to the voting contract and the DA layer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EncodedAttestationRequest(String);

impl EncodedAttestationRequest {
    /// Wrap an encoded request.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Encoding`] if the value is empty or not hex.
    pub fn new(encoded: impl Into<String>) -> Result<Self> {
        let encoded = encoded.into();
        if encoded.trim().is_empty() {
            return Err(Error::Encoding("encoded request is empty".to_string()));
        }
        crate::encoding::decode_hex(&encoded)?;
        Ok(Self(encoded))
    }

    /// The encoded request as sent on the wire.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Raw bytes of the encoded request.
    ///
    /// # Errors
    ///
    /// Returns an error if the stored value is not valid hex.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        crate::encoding::decode_hex(&self.0)
    }
}

impl fmt::Display for EncodedAttestationRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
