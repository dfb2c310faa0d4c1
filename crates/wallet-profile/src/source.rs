use futures::future::BoxFuture;

use crate::types::{ConnectionHandle, IdentityKey, RawProfile};

/// External profile-resolution service
///
/// The returned future must not borrow from `self`: the resolver spawns it
/// so that it keeps running after every caller has gone away.
pub trait ProfileSource: Send + Sync {
    fn fetch(
        &self,
        key: &IdentityKey,
        connection: Option<&ConnectionHandle>,
    ) -> BoxFuture<'static, crate::Result<RawProfile>>;
}
