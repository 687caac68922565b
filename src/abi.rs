//! ABI type descriptors for attestation responses.
//!
//! The verifier needs to know the tuple shape the post-processed JSON is
//! encoded into. Component order defines tuple position order, so the
//! descriptors keep their components in a `Vec` and serialize them as-is.
//!
//! Known response structs ship as versioned JSON resources under
//! `resources/abi/` and are parsed into a process-wide [`SchemaRegistry`]
//! the first time [`registry`] is called.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::sync::OnceLock;

/// Embedded schema resources, keyed by file name.
const EMBEDDED_SCHEMAS: &[(&str, &str)] = &[
    (
        "health_data.json",
        include_str!("../resources/abi/health_data.json"),
    ),
    (
        "tweet_data.json",
        include_str!("../resources/abi/tweet_data.json"),
    ),
];

/// Registry name of the health-check response struct.
pub const HEALTH_DATA: &str = "HealthData";

/// Registry name of the tweet-verification response struct.
pub const TWEET_DATA: &str = "TweetData";

/// A single field of an ABI tuple.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbiComponent {
    /// Nested components when `type` is `tuple` or `tuple[]`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub components: Vec<AbiComponent>,
    /// Solidity-level type name (e.g. `string`, `struct Foo`).
    #[serde(rename = "internalType")]
    pub internal_type: String,
    /// Field name.
    pub name: String,
    /// ABI type (e.g. `string`, `bool`, `uint256`).
    #[serde(rename = "type")]
    pub type_: String,
}

impl AbiComponent {
    /// Create a primitive component whose internal type equals its ABI type.
    #[must_use]
    pub fn primitive(name: &str, type_: &str) -> Self {
        Self {
            components: Vec::new(),
            internal_type: type_.to_string(),
            name: name.to_string(),
            type_: type_.to_string(),
        }
    }
}

/// ABI descriptor of the tuple an attestation response is encoded into.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbiSignature {
    /// Tuple fields in position order.
    pub components: Vec<AbiComponent>,
    /// Solidity struct name, e.g. `struct HealthData`.
    #[serde(rename = "internalType")]
    pub internal_type: String,
    /// Parameter name.
    pub name: String,
    /// Always `tuple` for attestation responses.
    #[serde(rename = "type")]
    pub type_: String,
}

impl AbiSignature {
    /// Build a tuple signature for `struct_name` with the given fields.
    #[must_use]
    pub fn tuple(struct_name: &str, name: &str, components: Vec<AbiComponent>) -> Self {
        Self {
            components,
            internal_type: format!("struct {struct_name}"),
            name: name.to_string(),
            type_: "tuple".to_string(),
        }
    }

    /// Struct name without the `struct ` prefix.
    #[must_use]
    pub fn struct_name(&self) -> &str {
        self.internal_type
            .strip_prefix("struct ")
            .unwrap_or(&self.internal_type)
    }

    /// Field names in tuple position order.
    #[must_use]
    pub fn field_names(&self) -> Vec<&str> {
        self.components.iter().map(|c| c.name.as_str()).collect()
    }

    /// Compact JSON text sent as `abiSignature` to the verifier.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> Result<String> {
        crate::encoding::compact_json(self)
    }

    /// Check that the signature describes a well-formed tuple.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] naming the first problem found.
    pub fn validate(&self) -> Result<()> {
        if self.type_ != "tuple" {
            return Err(Error::Config(format!(
                "ABI signature '{}' must be a tuple, got '{}'",
                self.name, self.type_
            )));
        }
        validate_components(&self.name, &self.components)
    }
}

fn validate_components(parent: &str, components: &[AbiComponent]) -> Result<()> {
    if components.is_empty() {
        return Err(Error::Config(format!(
            "ABI tuple '{parent}' has no components"
        )));
    }

    let mut seen = HashSet::new();
    for component in components {
        if component.name.is_empty() {
            return Err(Error::Config(format!(
                "ABI tuple '{parent}' has an unnamed component"
            )));
        }
        if !seen.insert(component.name.as_str()) {
            return Err(Error::Config(format!(
                "ABI tuple '{parent}' repeats component '{}'",
                component.name
            )));
        }

        let base = component.type_.strip_suffix("[]").unwrap_or(&component.type_);
        if base == "tuple" {
            validate_components(&component.name, &component.components)?;
        } else if !is_supported_type(base) {
            return Err(Error::Config(format!(
                "ABI component '{}.{}' has unsupported type '{}'",
                parent, component.name, component.type_
            )));
        }
    }
    Ok(())
}

/// Returns true for the primitive ABI types the verifier can encode.
#[must_use]
pub fn is_supported_type(type_: &str) -> bool {
    match type_ {
        "string" | "bool" | "address" | "bytes" => true,
        _ => {
            if let Some(width) = type_.strip_prefix("bytes") {
                return width
                    .parse::<u32>()
                    .is_ok_and(|w| (1..=32).contains(&w));
            }
            let bits = type_
                .strip_prefix("uint")
                .or_else(|| type_.strip_prefix("int"));
            bits.and_then(|b| b.parse::<u32>().ok())
                .is_some_and(|b| b % 8 == 0 && (8..=256).contains(&b))
        }
    }
}

/// A schema resource with its format version.
#[derive(Debug, Clone, Deserialize)]
pub struct VersionedSchema {
    /// Resource format version.
    pub version: u32,
    /// The ABI descriptor.
    pub signature: AbiSignature,
}

/// Immutable set of known response schemas, keyed by struct name.
#[derive(Debug)]
pub struct SchemaRegistry {
    schemas: BTreeMap<String, VersionedSchema>,
}

impl SchemaRegistry {
    /// Parse and validate a set of `(file name, JSON text)` resources.
    ///
    /// # Errors
    ///
    /// Returns an error if a resource fails to parse or validate, or two
    /// resources describe the same struct.
    pub fn from_sources(sources: &[(&str, &str)]) -> Result<Self> {
        let mut schemas = BTreeMap::new();
        for (file, text) in sources {
            let schema: VersionedSchema = serde_json::from_str(text)
                .map_err(|e| Error::Config(format!("ABI schema {file}: {e}")))?;
            schema
                .signature
                .validate()
                .map_err(|e| Error::Config(format!("ABI schema {file}: {e}")))?;

            let key = schema.signature.struct_name().to_string();
            if schemas.insert(key.clone(), schema).is_some() {
                return Err(Error::Config(format!(
                    "ABI schema {file}: struct {key} defined twice"
                )));
            }
        }
        Ok(Self { schemas })
    }

    /// Look up a schema by struct name.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the struct is unknown.
    pub fn get(&self, struct_name: &str) -> Result<&AbiSignature> {
        self.schemas
            .get(struct_name)
            .map(|s| &s.signature)
            .ok_or_else(|| Error::Config(format!("unknown ABI schema '{struct_name}'")))
    }

    /// Iterate over schemas in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &VersionedSchema)> {
        self.schemas.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of schemas.
    #[must_use]
    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    /// Returns true if the registry is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }
}

static REGISTRY: OnceLock<std::result::Result<SchemaRegistry, String>> = OnceLock::new();

/// The embedded schema registry, parsed on first use.
///
/// # Errors
///
/// Returns [`Error::Config`] if an embedded resource is invalid.
pub fn registry() -> Result<&'static SchemaRegistry> {
    REGISTRY
        .get_or_init(|| SchemaRegistry::from_sources(EMBEDDED_SCHEMAS).map_err(|e| e.to_string()))
        .as_ref()
        .map_err(|e| Error::Config(e.clone()))
}

/// Parse and validate every embedded schema. Call once at process start.
///
/// # Errors
///
/// Returns [`Error::Config`] if an embedded resource is invalid.
pub fn validate_embedded() -> Result<usize> {
    registry().map(SchemaRegistry::len)
}
