use std::time::Duration;

use futures::future::{BoxFuture, FutureExt};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tracing::debug;

use crate::config::ResolverConfig;
use crate::error::ProfileError;
use crate::source::ProfileSource;
use crate::types::{ConnectionHandle, IdentityKey, RawProfile};

/// HTTP client for the Civic profile service
pub struct CivicProfileClient {
    client: Client,
    service_url: String,
}

#[derive(Debug, Deserialize)]
struct ProfileResponse {
    name: Option<String>,
    image: Option<ProfileImage>,
    headline: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ProfileImage {
    Url(String),
    Object { url: String },
}

impl From<ProfileResponse> for RawProfile {
    fn from(data: ProfileResponse) -> Self {
        RawProfile {
            name: data.name,
            image: data.image.map(|image| match image {
                ProfileImage::Url(url) | ProfileImage::Object { url } => url,
            }),
            headline: data.headline,
        }
    }
}

impl CivicProfileClient {
    /// Create a client for the given service URL
    pub fn new(service_url: &str, timeout: Duration) -> crate::Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ProfileError::Config(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            service_url: service_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn from_config(config: &ResolverConfig) -> crate::Result<Self> {
        Self::new(&config.service_url, config.request_timeout)
    }

    fn profile_url(&self, key: &IdentityKey, connection: Option<&ConnectionHandle>) -> String {
        let mut url = format!("{}/v1/profiles/{}", self.service_url, key);

        if let Some(connection) = connection {
            url.push_str(&format!("?rpc={}", urlencoding::encode(&connection.endpoint)));
            if let Some(ref commitment) = connection.commitment {
                url.push_str(&format!("&commitment={}", urlencoding::encode(commitment)));
            }
        }

        url
    }
}

impl ProfileSource for CivicProfileClient {
    fn fetch(
        &self,
        key: &IdentityKey,
        connection: Option<&ConnectionHandle>,
    ) -> BoxFuture<'static, crate::Result<RawProfile>> {
        let client = self.client.clone();
        let url = self.profile_url(key, connection);
        let key = key.clone();

        async move {
            debug!(key = %key, "Fetching profile");

            let response = client
                .get(&url)
                .header("Accept", "application/json")
                .send()
                .await?;

            if response.status() == StatusCode::NOT_FOUND {
                debug!(key = %key, "No profile set");
                return Ok(RawProfile::default());
            }

            if !response.status().is_success() {
                return Err(ProfileError::Api(format!(
                    "Profile service returned status {}",
                    response.status()
                )));
            }

            let data: ProfileResponse = response.json().await?;
            Ok(data.into())
        }
        .boxed()
    }
}
