//! Wallet Profile Resolver
//!
//! Resolves the public profile (name, image, headline) attached to a wallet
//! public key. Lookups are coalesced per key: at most one external
//! resolution is ever outstanding for a key, and its outcome is reused by
//! every later lookup of that key.
//!
//! [`ProfileBinding`] tracks an explicit key, the connected wallet and the
//! RPC connection, and publishes a [`ProfileState`] whenever they change.

pub mod binding;
pub mod client;
pub mod config;
pub mod error;
pub mod resolver;
pub mod source;
pub mod types;

#[cfg(test)]
pub(crate) mod testing;

pub use binding::{BindingInputs, BindingOptions, ProfileBinding, ProfileState};
pub use client::CivicProfileClient;
pub use config::{CacheConfig, ResolverConfig};
pub use error::{ProfileError, Result};
pub use resolver::{PendingResolution, ProfileResolver};
pub use source::ProfileSource;
pub use types::{derive_display_record, ConnectionHandle, IdentityKey, Profile, RawProfile};
