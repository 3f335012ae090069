//! Remote repository secret store.
//!
//! Two calls are made against the store: read the repository's current
//! public key, and write a sealed secret under a name.

pub mod client;

pub use client::{RemoteApiError, SecretStore, SecretStoreClient};
