//! Cached, self-refreshing platform key sets used to verify inbound signed messages.
//!
//! Each trusted platform publishes a JWKS document at a URL. [`JwksStore`] tracks those URLs,
//! keeps the last successfully fetched key set per URL, persists it through a
//! [`JwksBackend`](crate::store::JwksBackend), and answers key lookups from memory only.

mod entry;
mod store;

pub use entry::JwksCacheEntry;
pub use store::{JwksStore, RefreshOutcome, SweepReport};
