//! Assemble a key store, its password and a trust store from three PEM
//! sources.
//!
//! The key-store password only exists because key entries must be password
//! protected. It is drawn from an injected random source on every call,
//! never derived from input, and consumed by the TLS context factory.

use rand::rngs::OsRng;
use rand::{CryptoRng, RngCore};
use tracing::{debug, info};
use zeroize::Zeroizing;

use crate::codec::{PemCodec, PemSource};
use crate::error::{KeystoreError, Result};
use crate::store::KeyStore;

/// Alias prefix for CA certificates in the trust store.
pub const CA_ALIAS_PREFIX: &str = "CA Certificate";

/// Alias of the single key entry in the key store.
pub const KEY_ALIAS: &str = "Private Key";

/// The three PEM inputs. All are required by [`MaterialAssembler::build_stores`].
#[derive(Debug, Default)]
pub struct PemMaterial {
    certificate: Option<PemSource>,
    private_key: Option<PemSource>,
    ca_certificate: Option<PemSource>,
}

impl PemMaterial {
    /// Empty material; set each source with the builder methods.
    pub fn new() -> Self {
        Self::default()
    }

    /// Material read from three files.
    pub fn from_paths(
        certificate: impl Into<std::path::PathBuf>,
        private_key: impl Into<std::path::PathBuf>,
        ca_certificate: impl Into<std::path::PathBuf>,
    ) -> Self {
        Self::new()
            .certificate(PemSource::path(certificate))
            .private_key(PemSource::path(private_key))
            .ca_certificate(PemSource::path(ca_certificate))
    }

    /// The leaf certificate matching the private key.
    pub fn certificate(mut self, source: PemSource) -> Self {
        self.certificate = Some(source);
        self
    }

    /// The private key.
    pub fn private_key(mut self, source: PemSource) -> Self {
        self.private_key = Some(source);
        self
    }

    /// CA certificates to trust.
    pub fn ca_certificate(mut self, source: PemSource) -> Self {
        self.ca_certificate = Some(source);
        self
    }

    /// Split into (certificate, private key, CA certificate), failing before
    /// any I/O if one is missing.
    fn require(self) -> Result<(PemSource, PemSource, PemSource)> {
        let certificate = self
            .certificate
            .ok_or(KeystoreError::MissingInput("certificate"))?;
        let private_key = self
            .private_key
            .ok_or(KeystoreError::MissingInput("private key"))?;
        let ca_certificate = self
            .ca_certificate
            .ok_or(KeystoreError::MissingInput("CA certificate"))?;
        Ok((certificate, private_key, ca_certificate))
    }
}

/// Random password protecting the key entry. Zeroized on drop.
#[derive(Clone, PartialEq, Eq)]
pub struct KeyStorePassword(Zeroizing<String>);

impl KeyStorePassword {
    /// The password text.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for KeyStorePassword {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("KeyStorePassword(<redacted>)")
    }
}

/// Output of [`MaterialAssembler::build_stores`].
#[derive(Debug)]
pub struct StoreBundle {
    /// One key entry under [`KEY_ALIAS`].
    pub key_store: KeyStore,
    /// Unlocks the key entry.
    pub key_store_password: KeyStorePassword,
    /// CA certificates under `"{CA_ALIAS_PREFIX}-{index}"`.
    pub trust_store: KeyStore,
}

/// Builds [`StoreBundle`]s with an explicit random source.
///
/// Tests substitute a seeded RNG; production code uses [`MaterialAssembler::new`],
/// which draws from the OS.
pub struct MaterialAssembler<R = OsRng> {
    rng: R,
    codec: PemCodec,
}

impl MaterialAssembler<OsRng> {
    /// An assembler backed by the OS CSPRNG.
    pub fn new() -> Self {
        Self::with_rng(OsRng)
    }
}

impl Default for MaterialAssembler<OsRng> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: RngCore + CryptoRng> MaterialAssembler<R> {
    /// An assembler drawing passwords from `rng`.
    pub fn with_rng(rng: R) -> Self {
        Self {
            rng,
            codec: PemCodec::default(),
        }
    }

    /// Use `codec` (e.g. one with an observer) for every PEM source.
    pub fn with_codec(mut self, codec: PemCodec) -> Self {
        self.codec = codec;
        self
    }

    /// A fresh UUID-format password.
    pub fn generate_password(&mut self) -> KeyStorePassword {
        let mut bytes = [0u8; 16];
        self.rng.fill_bytes(&mut bytes);
        let token = uuid::Builder::from_random_bytes(bytes).into_uuid().to_string();
        KeyStorePassword(Zeroizing::new(token))
    }

    /// Build the trust store, a fresh password and the key store.
    ///
    /// All three sources must be present. Any failure aborts the call; no
    /// partially built store escapes.
    pub fn build_stores(&mut self, material: PemMaterial) -> Result<StoreBundle> {
        let (certificate, private_key, ca_certificate) = material.require()?;

        let trust_store = KeyStore::new().put_certificates_from_pem_with(
            &self.codec,
            CA_ALIAS_PREFIX,
            ca_certificate,
        )?;
        debug!(entries = trust_store.len(), "trust store built");

        let key_store_password = self.generate_password();

        let key_store = KeyStore::new().put_private_key_from_pem_with(
            &self.codec,
            KEY_ALIAS,
            private_key,
            key_store_password.as_str(),
            certificate,
        )?;

        info!(
            trusted = trust_store.len(),
            keys = key_store.len(),
            "assembled key and trust stores"
        );

        Ok(StoreBundle {
            key_store,
            key_store_password,
            trust_store,
        })
    }
}

/// [`MaterialAssembler::build_stores`] with the OS random source.
pub fn build_stores(material: PemMaterial) -> Result<StoreBundle> {
    MaterialAssembler::new().build_stores(material)
}
