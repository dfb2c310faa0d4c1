//! Test doubles for the profile service

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures::future::{BoxFuture, FutureExt};

use crate::error::ProfileError;
use crate::source::ProfileSource;
use crate::types::{ConnectionHandle, IdentityKey, RawProfile};

pub(crate) const ALICE: &str = "TokenkegQfeZyiNwAJbNbGKPFXCWuBvf9Ss623VQ5DA";
pub(crate) const BOB: &str = "So11111111111111111111111111111111111111112";
pub(crate) const CAROL: &str = "Vote111111111111111111111111111111111111111";

pub(crate) fn key(s: &str) -> IdentityKey {
    IdentityKey::parse(s).unwrap()
}

pub(crate) fn named(name: &str) -> RawProfile {
    RawProfile {
        name: Some(name.to_string()),
        ..RawProfile::default()
    }
}

/// Profile source that records every call
///
/// Unknown keys resolve to an empty profile.
#[derive(Clone, Default)]
pub(crate) struct MockSource {
    inner: Arc<MockInner>,
}

#[derive(Default)]
struct MockInner {
    calls: AtomicUsize,
    requests: Mutex<Vec<(IdentityKey, Option<ConnectionHandle>)>>,
    responses: Mutex<HashMap<IdentityKey, Result<RawProfile, String>>>,
    delays: Mutex<HashMap<IdentityKey, Duration>>,
}

impl MockSource {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_profile(self, key: &IdentityKey, profile: RawProfile) -> Self {
        self.inner
            .responses
            .lock()
            .unwrap()
            .insert(key.clone(), Ok(profile));
        self
    }

    pub(crate) fn with_failure(self, key: &IdentityKey, message: &str) -> Self {
        self.inner
            .responses
            .lock()
            .unwrap()
            .insert(key.clone(), Err(message.to_string()));
        self
    }

    pub(crate) fn with_delay(self, key: &IdentityKey, delay: Duration) -> Self {
        self.inner
            .delays
            .lock()
            .unwrap()
            .insert(key.clone(), delay);
        self
    }

    pub(crate) fn calls(&self) -> usize {
        self.inner.calls.load(Ordering::SeqCst)
    }

    pub(crate) fn requests(&self) -> Vec<(IdentityKey, Option<ConnectionHandle>)> {
        self.inner.requests.lock().unwrap().clone()
    }
}

impl ProfileSource for MockSource {
    fn fetch(
        &self,
        key: &IdentityKey,
        connection: Option<&ConnectionHandle>,
    ) -> BoxFuture<'static, crate::Result<RawProfile>> {
        self.inner.calls.fetch_add(1, Ordering::SeqCst);
        self.inner
            .requests
            .lock()
            .unwrap()
            .push((key.clone(), connection.cloned()));

        let response = self
            .inner
            .responses
            .lock()
            .unwrap()
            .get(key)
            .cloned()
            .unwrap_or_else(|| Ok(RawProfile::default()));
        let delay = self.inner.delays.lock().unwrap().get(key).copied();

        async move {
            match delay {
                Some(delay) => tokio::time::sleep(delay).await,
                None => tokio::task::yield_now().await,
            }
            response.map_err(ProfileError::Resolution)
        }
        .boxed()
    }
}
