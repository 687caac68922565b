//! Finalized attestation proofs and the struct handed to the contract.

use crate::encoding::{decode_hash, decode_hex};
use crate::error::Result;
use serde::{Deserialize, Serialize};

/// Merkle inclusion proof and response data for one (request, round).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proof {
    /// Sibling hashes from leaf to root, hex encoded.
    pub proof: Vec<String>,
    /// ABI-encoded attestation response, hex encoded.
    pub response_hex: String,
}

impl Proof {
    /// Decode the Merkle siblings into 32-byte hashes.
    ///
    /// # Errors
    ///
    /// Returns an error if a sibling is not 32 bytes of hex.
    pub fn merkle_siblings(&self) -> Result<Vec<[u8; 32]>> {
        self.proof.iter().map(|h| decode_hash(h)).collect()
    }

    /// Decode the ABI-encoded response bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if `response_hex` is not valid hex.
    pub fn response_bytes(&self) -> Result<Vec<u8>> {
        decode_hex(&self.response_hex)
    }

    /// Convert into the argument of the on-chain verification call.
    #[must_use]
    pub fn into_contract_proof(self) -> ContractProof {
        ContractProof {
            merkle_proof: self.proof,
            data: ProofData {
                response_body: ResponseBody {
                    abi_encoded_data: self.response_hex,
                },
            },
        }
    }
}

/// `{merkleProof, data: {responseBody: {abiEncodedData}}}` as the
/// verification contract takes it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractProof {
    /// Sibling hashes.
    pub merkle_proof: Vec<String>,
    /// Attested data.
    pub data: ProofData,
}

/// Attested data wrapper.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProofData {
    /// Response body.
    pub response_body: ResponseBody,
}

/// Response body wrapper.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseBody {
    /// ABI-encoded response data.
    pub abi_encoded_data: String,
}
