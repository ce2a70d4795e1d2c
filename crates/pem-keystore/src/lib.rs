//! PEM material to key stores, trust stores and rustls contexts.
//!
//! Pipeline, one module per stage:
//!
//! - [`codec`]: decode PEM text into raw objects and encode them back
//! - [`classify`]: pick certificates and private keys out of raw objects
//! - [`store`]: alias-keyed stores of certificates and password-protected keys
//! - [`assembler`]: build a key store, password and trust store from three sources
//! - [`tls`]: key managers, trust managers and the server/client configs
//!
//! ```no_run
//! use pem_keystore::{build_context, PemMaterial};
//!
//! let context = build_context(PemMaterial::from_paths("tls.crt", "tls.key", "ca.crt"))?;
//! let server = context.new_server_connection()?;
//! # drop(server);
//! # Ok::<(), pem_keystore::KeystoreError>(())
//! ```

pub mod assembler;
pub mod classify;
pub mod codec;
pub mod error;
pub mod identity;
pub mod store;
pub mod tls;

pub use assembler::{build_stores, KeyStorePassword, MaterialAssembler, PemMaterial, StoreBundle};
pub use codec::{PemCodec, PemObjectKind, PemSource, RawPemObject};
pub use error::{KeystoreError, Result};
pub use identity::{Certificate, KeyFormat, KeyPair, PrivateKey};
pub use store::KeyStore;
pub use tls::{build_context, build_context_with, ContextOptions, TlsContext};
