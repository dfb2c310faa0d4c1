//! Reactive profile binding
//!
//! Watches an explicit key, the connected wallet and the RPC connection, and
//! publishes the profile of the effective key (explicit key, else wallet)
//! whenever they change.

use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

use crate::error::ProfileError;
use crate::resolver::ProfileResolver;
use crate::source::ProfileSource;
use crate::types::{derive_display_record, ConnectionHandle, IdentityKey, Profile, RawProfile};

/// Published state of a binding
#[derive(Debug, Clone)]
pub enum ProfileState {
    Loading,
    Ready(Arc<Profile>),
    Failed(ProfileError),
}

impl ProfileState {
    pub fn is_loading(&self) -> bool {
        matches!(self, Self::Loading)
    }

    pub fn profile(&self) -> Option<&Profile> {
        match self {
            Self::Ready(profile) => Some(profile),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&ProfileError> {
        match self {
            Self::Failed(err) => Some(err),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct BindingOptions {
    /// Publish `Failed` instead of staying `Loading` when resolution fails
    pub surface_failures: bool,
}

/// Reactive providers a binding tracks
pub struct BindingInputs {
    pub key: watch::Receiver<Option<IdentityKey>>,
    pub wallet: watch::Receiver<Option<IdentityKey>>,
    pub connection: watch::Receiver<Option<ConnectionHandle>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Dependencies {
    key: Option<IdentityKey>,
    wallet: Option<IdentityKey>,
    connection: Option<ConnectionHandle>,
}

impl Dependencies {
    fn effective_key(&self) -> Option<&IdentityKey> {
        self.key.as_ref().or(self.wallet.as_ref())
    }
}

struct Tracker {
    inputs: BindingInputs,
    closed: [bool; 3],
}

impl Tracker {
    fn new(inputs: BindingInputs) -> Self {
        Self {
            inputs,
            closed: [false; 3],
        }
    }

    fn snapshot(&mut self) -> Dependencies {
        Dependencies {
            key: self.inputs.key.borrow_and_update().clone(),
            wallet: self.inputs.wallet.borrow_and_update().clone(),
            connection: self.inputs.connection.borrow_and_update().clone(),
        }
    }

    /// Wait until the dependency tuple differs from `current`
    ///
    /// Returns `None` once every provider has gone away.
    async fn next(&mut self, current: &Dependencies) -> Option<Dependencies> {
        loop {
            let (slot, result) = tokio::select! {
                r = self.inputs.key.changed(), if !self.closed[0] => (0, r),
                r = self.inputs.wallet.changed(), if !self.closed[1] => (1, r),
                r = self.inputs.connection.changed(), if !self.closed[2] => (2, r),
                else => return None,
            };

            if result.is_err() {
                self.closed[slot] = true;
                continue;
            }

            let deps = self.snapshot();
            if &deps != current {
                return Some(deps);
            }
        }
    }
}

/// Live profile for whichever key the inputs currently select
///
/// Dropping the binding stops re-evaluation; resolutions already started
/// keep running in the resolver.
pub struct ProfileBinding {
    state: watch::Receiver<ProfileState>,
    task: JoinHandle<()>,
}

impl ProfileBinding {
    pub fn spawn<S: ProfileSource + 'static>(
        resolver: Arc<ProfileResolver<S>>,
        inputs: BindingInputs,
        options: BindingOptions,
    ) -> Self {
        let (state_tx, state) = watch::channel(ProfileState::Loading);
        let task = tokio::spawn(run(resolver, Tracker::new(inputs), state_tx, options));
        Self { state, task }
    }

    /// Current published state
    pub fn state(&self) -> ProfileState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<ProfileState> {
        self.state.clone()
    }

    /// Wait for the binding to stop on its own
    ///
    /// The binding stops once every input provider is gone, after publishing
    /// any resolution still in flight.
    pub async fn join(mut self) {
        if let Err(e) = (&mut self.task).await {
            warn!(error = %e, "Profile binding task failed");
        }
    }
}

impl Drop for ProfileBinding {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn run<S: ProfileSource + 'static>(
    resolver: Arc<ProfileResolver<S>>,
    mut tracker: Tracker,
    state: watch::Sender<ProfileState>,
    options: BindingOptions,
) {
    let mut deps = tracker.snapshot();
    let mut current: Option<IdentityKey> = None;

    loop {
        if let Some(key) = deps.effective_key().cloned() {
            if current.as_ref().is_some_and(|c| c != &key) {
                state.send_replace(ProfileState::Loading);
            }
            current = Some(key.clone());

            let connection = deps.connection.clone();
            let resolution = resolver.resolve(&key, connection.as_ref());
            tokio::pin!(resolution);

            tokio::select! {
                result = &mut resolution => {
                    publish(&state, &key, result, options);
                }
                next = tracker.next(&deps) => match next {
                    Some(next) => {
                        debug!(key = %key, "Dependencies changed before resolution settled");
                        deps = next;
                        continue;
                    }
                    None => {
                        publish(&state, &key, resolution.await, options);
                        return;
                    }
                },
            }
        }

        match tracker.next(&deps).await {
            Some(next) => deps = next,
            None => return,
        }
    }
}

fn publish(
    state: &watch::Sender<ProfileState>,
    key: &IdentityKey,
    result: crate::Result<Arc<RawProfile>>,
    options: BindingOptions,
) {
    match result {
        Ok(raw) => {
            let profile = derive_display_record(&raw);
            debug!(key = %key, exists = profile.exists, "Publishing profile");
            state.send_replace(ProfileState::Ready(Arc::new(profile)));
        }
        Err(e) if options.surface_failures => {
            state.send_replace(ProfileState::Failed(e));
        }
        Err(e) if e.is_resolution_failure() => {
            warn!(key = %key, error = %e, "Profile unavailable, binding stays loading");
        }
        Err(e) => {
            error!(key = %key, error = %e, "Profile lookup rejected, binding stays loading");
        }
    }
}
