use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ProfileError;

const PUBLIC_KEY_LEN: usize = 32;

/// Base-58 encoded wallet public key
///
/// Two keys are equal iff their string encodings are equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct IdentityKey(String);

impl IdentityKey {
    /// Parse a base-58 string that decodes to a 32-byte public key
    pub fn parse(s: &str) -> crate::Result<Self> {
        let bytes = bs58::decode(s)
            .into_vec()
            .map_err(|e| ProfileError::InvalidKey(format!("{s}: {e}")))?;

        if bytes.len() != PUBLIC_KEY_LEN {
            return Err(ProfileError::InvalidKey(format!(
                "{s}: expected {PUBLIC_KEY_LEN} bytes, got {}",
                bytes.len()
            )));
        }

        Ok(Self(s.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for IdentityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for IdentityKey {
    type Err = ProfileError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for IdentityKey {
    type Error = ProfileError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(&s)
    }
}

impl From<IdentityKey> for String {
    fn from(key: IdentityKey) -> Self {
        key.0
    }
}

/// RPC connection context handed to the profile service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionHandle {
    pub endpoint: String,
    pub commitment: Option<String>,
}

impl ConnectionHandle {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            commitment: None,
        }
    }

    pub fn with_commitment(mut self, commitment: impl Into<String>) -> Self {
        self.commitment = Some(commitment.into());
        self
    }
}

/// Profile as returned by the profile service
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawProfile {
    pub name: Option<String>,
    pub image: Option<String>,
    pub headline: Option<String>,
}

/// Profile ready for display
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub name: Option<String>,
    pub image: Option<String>,
    pub headline: Option<String>,
    /// True when at least one of name, image or headline is set
    pub exists: bool,
}

/// Copy a raw profile and compute its `exists` flag
pub fn derive_display_record(raw: &RawProfile) -> Profile {
    let is_set = |field: &Option<String>| field.as_deref().is_some_and(|s| !s.is_empty());

    Profile {
        name: raw.name.clone(),
        image: raw.image.clone(),
        headline: raw.headline.clone(),
        exists: is_set(&raw.name) || is_set(&raw.image) || is_set(&raw.headline),
    }
}
