//! Error types for wallet profile resolution

use std::fmt;
use std::sync::Arc;

/// Errors from resolving a wallet profile
///
/// Settled resolutions are shared between every caller of a key, so the
/// error is `Clone`; non-clonable sources are held behind an `Arc`.
#[derive(Debug, Clone)]
pub enum ProfileError {
    InvalidKey(String),
    Http(Arc<reqwest::Error>),
    Api(String),
    Json(String),
    Resolution(String),
    Config(String),
    Io(Arc<std::io::Error>),
}

impl ProfileError {
    /// Whether this error came from the external resolution itself
    pub fn is_resolution_failure(&self) -> bool {
        !matches!(self, Self::InvalidKey(_) | Self::Config(_) | Self::Io(_))
    }
}

impl fmt::Display for ProfileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidKey(msg) => write!(f, "Invalid public key: {msg}"),
            Self::Http(e) => write!(f, "HTTP error: {e}"),
            Self::Api(msg) => write!(f, "API error: {msg}"),
            Self::Json(msg) => write!(f, "JSON error: {msg}"),
            Self::Resolution(msg) => write!(f, "Resolution failed: {msg}"),
            Self::Config(msg) => write!(f, "Configuration error: {msg}"),
            Self::Io(e) => write!(f, "IO error: {e}"),
        }
    }
}

impl std::error::Error for ProfileError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Http(e) => Some(e.as_ref()),
            Self::Io(e) => Some(e.as_ref()),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for ProfileError {
    fn from(err: reqwest::Error) -> Self {
        Self::Http(Arc::new(err))
    }
}

impl From<serde_json::Error> for ProfileError {
    fn from(err: serde_json::Error) -> Self {
        Self::Json(err.to_string())
    }
}

impl From<tracing_subscriber::filter::ParseError> for ProfileError {
    fn from(err: tracing_subscriber::filter::ParseError) -> Self {
        Self::Config(err.to_string())
    }
}

impl From<std::io::Error> for ProfileError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(Arc::new(err))
    }
}

pub type Result<T> = std::result::Result<T, ProfileError>;
