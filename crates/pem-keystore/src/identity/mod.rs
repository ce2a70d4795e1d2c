//! Canonical cryptographic values: certificates, private keys and key pairs.
//!
//! Everything the codec produces is normalized into one of these types
//! before it reaches a store.

pub mod certificate;
pub mod key;

pub use certificate::Certificate;
pub use key::{KeyFormat, KeyPair, PrivateKey, PublicHalf};
