use std::env;
use std::time::Duration;

use crate::types::ConnectionHandle;

const DEFAULT_SERVICE_URL: &str = "https://profile.civic.me";
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Optional bounds on the resolution cache
///
/// With neither set, entries live for the lifetime of the process.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheConfig {
    pub ttl: Option<Duration>,
    pub max_capacity: Option<u64>,
}

/// Resolver configuration parsed from environment variables
#[derive(Debug, Clone)]
pub struct ResolverConfig {
    pub service_url: String,
    pub request_timeout: Duration,
    pub cache: CacheConfig,
    pub surface_failures: bool,
    pub rpc_url: Option<String>,
    pub commitment: Option<String>,
}

impl ResolverConfig {
    /// Parse configuration from environment variables
    pub fn from_env() -> Self {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Parse configuration from an arbitrary variable lookup
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let service_url = lookup("PROFILE_SERVICE_URL")
            .map(|u| u.trim_end_matches('/').to_string())
            .unwrap_or_else(|| DEFAULT_SERVICE_URL.to_string());

        let request_timeout = lookup("PROFILE_REQUEST_TIMEOUT_SECS")
            .and_then(|s| s.parse().ok())
            .map(Duration::from_secs)
            .unwrap_or(Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS));

        let ttl = lookup("PROFILE_CACHE_TTL_SECS")
            .and_then(|s| s.parse().ok())
            .map(Duration::from_secs);

        let max_capacity = lookup("PROFILE_CACHE_MAX_CAPACITY").and_then(|s| s.parse().ok());

        let surface_failures = lookup("PROFILE_SURFACE_FAILURES")
            .map(|v| v == "true" || v == "1")
            .unwrap_or(false);

        let rpc_url = lookup("SOLANA_RPC_URL").filter(|u| !u.is_empty());
        let commitment = lookup("SOLANA_COMMITMENT").filter(|c| !c.is_empty());

        Self {
            service_url,
            request_timeout,
            cache: CacheConfig { ttl, max_capacity },
            surface_failures,
            rpc_url,
            commitment,
        }
    }

    /// Connection handle for the configured RPC endpoint, if any
    pub fn connection(&self) -> Option<ConnectionHandle> {
        let handle = ConnectionHandle::new(self.rpc_url.as_deref()?);
        Some(match &self.commitment {
            Some(c) => handle.with_commitment(c.as_str()),
            None => handle,
        })
    }
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self::from_lookup(|_| None)
    }
}
