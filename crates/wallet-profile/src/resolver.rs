use std::sync::Arc;

use futures::future::{BoxFuture, FutureExt, Shared};
use moka::future::Cache;
use tracing::{debug, warn};

use crate::config::CacheConfig;
use crate::error::ProfileError;
use crate::source::ProfileSource;
use crate::types::{ConnectionHandle, IdentityKey, RawProfile};

/// In-flight or settled resolution of one key, shared by all its callers
pub type PendingResolution = Shared<BoxFuture<'static, crate::Result<Arc<RawProfile>>>>;

/// Coalescing, memoized profile lookup
///
/// The first lookup of a key starts the external resolution and stores it;
/// every later lookup of that key gets the same resolution, whatever
/// connection it passes. Failures are stored like successes and never
/// retried.
pub struct ProfileResolver<S> {
    source: Arc<S>,
    pending: Cache<IdentityKey, PendingResolution>,
}

impl<S: ProfileSource + 'static> ProfileResolver<S> {
    /// Create a resolver whose entries live as long as the resolver
    pub fn new(source: S) -> Self {
        Self::with_config(source, &CacheConfig::default())
    }

    pub fn with_config(source: S, config: &CacheConfig) -> Self {
        let mut builder = Cache::<IdentityKey, PendingResolution>::builder();
        if let Some(max_capacity) = config.max_capacity {
            builder = builder.max_capacity(max_capacity);
        }
        if let Some(ttl) = config.ttl {
            builder = builder.time_to_live(ttl);
        }

        Self {
            source: Arc::new(source),
            pending: builder.build(),
        }
    }

    /// Resolve the profile for `key`
    pub async fn resolve(
        &self,
        key: &IdentityKey,
        connection: Option<&ConnectionHandle>,
    ) -> crate::Result<Arc<RawProfile>> {
        self.pending_resolution(key, connection).await.await
    }

    /// Get the shared resolution for `key`, starting it if this is the
    /// first request for the key
    pub async fn pending_resolution(
        &self,
        key: &IdentityKey,
        connection: Option<&ConnectionHandle>,
    ) -> PendingResolution {
        let init = {
            let source = self.source.clone();
            let key = key.clone();
            let connection = connection.cloned();
            async move {
                debug!(key = %key, "Starting profile resolution");
                start_resolution(&*source, key, connection.as_ref())
            }
        };

        self.pending.get_with(key.clone(), init).await
    }

    /// Whether a resolution for `key` has been started
    pub fn contains(&self, key: &IdentityKey) -> bool {
        self.pending.contains_key(key)
    }
}

/// Spawn the external fetch so it runs to completion even if every caller
/// is dropped
fn start_resolution<S: ProfileSource>(
    source: &S,
    key: IdentityKey,
    connection: Option<&ConnectionHandle>,
) -> PendingResolution {
    let task = tokio::spawn(source.fetch(&key, connection));

    async move {
        match task.await {
            Ok(Ok(profile)) => {
                debug!(key = %key, "Profile resolved");
                Ok(Arc::new(profile))
            }
            Ok(Err(e)) => {
                warn!(key = %key, error = %e, "Profile resolution failed");
                Err(e)
            }
            Err(e) => {
                warn!(key = %key, error = %e, "Profile resolution task failed");
                Err(ProfileError::Resolution(e.to_string()))
            }
        }
    }
    .boxed()
    .shared()
}
