//! TLS context construction from assembled stores.
//!
//! - Key managers: unlock key entries and resolve the certificate to present
//! - Trust managers: the root store used to verify peers
//! - Context: rustls server and client configs built from both

pub mod context;
pub mod managers;

pub use context::{
    build_context, build_context_with, context_from_bundle, ContextOptions, TlsContext,
};
pub use managers::{key_managers, trust_managers, KeyManagers, TrustManagers};
