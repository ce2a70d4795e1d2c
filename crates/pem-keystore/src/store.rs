//! In-memory key and trust stores.
//!
//! A [`KeyStore`] maps unique string aliases to either a certificate entry
//! or a password-protected private key with its certificate chain. The same
//! type serves as a trust store when it only holds certificate entries.
//!
//! Builder methods consume the store and hand it back, so a chain of
//! insertions reads fluently and a failed insertion drops the half-built
//! store instead of leaving it reachable:
//!
//! ```no_run
//! # use pem_keystore::store::KeyStore;
//! # use pem_keystore::codec::PemSource;
//! let trust_store = KeyStore::new()
//!     .put_certificates_from_pem("CA", PemSource::path("ca.pem"))?;
//! # Ok::<(), pem_keystore::error::KeystoreError>(())
//! ```
//!
//! Insertion order is kept for iteration. Overwriting an alias keeps its
//! original position.

use sha2::{Digest, Sha256};
use tracing::debug;

use crate::classify::{certificates_of, private_keys_of};
use crate::codec::{PemCodec, PemSource};
use crate::error::{KeystoreError, Result};
use crate::identity::{Certificate, PrivateKey};

/// A single store entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreEntry {
    /// A trusted certificate.
    Certificate(Certificate),
    /// A private key with its certificate chain.
    PrivateKey(KeyEntry),
}

/// A password-gated private key and its certificate chain.
///
/// The password is an access check, not encryption: the key DER is held in
/// cleartext memory (zeroized on drop) next to an unsalted SHA-256 digest of
/// the password, and [`KeyEntry::unlock`] returns the key when the presented
/// password hashes to the same digest. Cloning the entry or its store copies
/// the key bytes.
#[derive(Clone, PartialEq, Eq)]
pub struct KeyEntry {
    key: PrivateKey,
    password_digest: [u8; 32],
    chain: Vec<Certificate>,
}

impl KeyEntry {
    fn new(key: PrivateKey, password: &str, chain: Vec<Certificate>) -> Self {
        Self {
            key,
            password_digest: digest_password(password),
            chain,
        }
    }

    /// Returns the key if `password` matches the one it was stored with.
    pub fn unlock(&self, password: &str) -> Option<&PrivateKey> {
        (digest_password(password) == self.password_digest).then_some(&self.key)
    }

    /// The certificate chain, leaf first. Empty if the key was stored
    /// without a certificate.
    pub fn chain(&self) -> &[Certificate] {
        &self.chain
    }
}

impl std::fmt::Debug for KeyEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyEntry")
            .field("format", &self.key.format())
            .field("chain", &self.chain)
            .finish_non_exhaustive()
    }
}

fn digest_password(password: &str) -> [u8; 32] {
    Sha256::digest(password.as_bytes()).into()
}

/// Ordered alias → entry map.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyStore {
    entries: Vec<(String, StoreEntry)>,
}

impl KeyStore {
    /// Create an empty store. Nothing is loaded from disk.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite a certificate entry.
    pub fn put_certificate(mut self, alias: impl Into<String>, cert: Certificate) -> Self {
        let alias = alias.into();
        debug!(alias = %alias, subject = %cert.subject(), "storing certificate entry");
        self.insert(alias, StoreEntry::Certificate(cert));
        self
    }

    /// Insert every certificate in `source` as `"{alias_prefix}-{index}"`,
    /// index counting from 0 in source order. Non-certificate blocks are
    /// skipped. Existing entries are kept.
    pub fn put_certificates_from_pem(self, alias_prefix: &str, source: PemSource) -> Result<Self> {
        self.put_certificates_from_pem_with(&PemCodec::default(), alias_prefix, source)
    }

    /// [`KeyStore::put_certificates_from_pem`] with an explicit codec.
    pub fn put_certificates_from_pem_with(
        self,
        codec: &PemCodec,
        alias_prefix: &str,
        source: PemSource,
    ) -> Result<Self> {
        let certs = certificates_of(codec.parse_all(source)?);
        Ok(certs
            .into_iter()
            .enumerate()
            .fold(self, |store, (index, cert)| {
                store.put_certificate(format!("{alias_prefix}-{index}"), cert)
            }))
    }

    /// Insert or overwrite a key entry protected by `password`.
    ///
    /// `cert` becomes the one-element chain; without it the entry has an
    /// empty chain, which the store accepts but a TLS stack cannot use. An
    /// absent key is rejected with [`KeystoreError::MissingPrivateKey`].
    pub fn put_private_key(
        mut self,
        alias: impl Into<String>,
        key: Option<PrivateKey>,
        password: &str,
        cert: Option<Certificate>,
    ) -> Result<Self> {
        let alias = alias.into();
        let key = key.ok_or_else(|| KeystoreError::MissingPrivateKey(alias.clone()))?;
        let chain: Vec<Certificate> = cert.into_iter().collect();

        debug!(alias = %alias, format = ?key.format(), chain = chain.len(), "storing key entry");
        self.insert(alias, StoreEntry::PrivateKey(KeyEntry::new(key, password, chain)));
        Ok(self)
    }

    /// Insert the single key from `key_source` with the single certificate
    /// from `cert_source`.
    ///
    /// More than one key fails with [`KeystoreError::MultipleKeys`] before
    /// the certificate source is read; more than one certificate fails with
    /// [`KeystoreError::MultipleCertificates`]. Zero of either is passed on
    /// to [`KeyStore::put_private_key`] as absent.
    pub fn put_private_key_from_pem(
        self,
        alias: impl Into<String>,
        key_source: PemSource,
        password: &str,
        cert_source: PemSource,
    ) -> Result<Self> {
        self.put_private_key_from_pem_with(
            &PemCodec::default(),
            alias,
            key_source,
            password,
            cert_source,
        )
    }

    /// [`KeyStore::put_private_key_from_pem`] with an explicit codec.
    pub fn put_private_key_from_pem_with(
        self,
        codec: &PemCodec,
        alias: impl Into<String>,
        key_source: PemSource,
        password: &str,
        cert_source: PemSource,
    ) -> Result<Self> {
        let keys = private_keys_of(codec.parse_all(key_source)?)?;
        if keys.len() > 1 {
            return Err(KeystoreError::MultipleKeys(keys.len()));
        }

        let certs = certificates_of(codec.parse_all(cert_source)?);
        if certs.len() > 1 {
            return Err(KeystoreError::MultipleCertificates(certs.len()));
        }

        self.put_private_key(
            alias,
            keys.into_iter().next(),
            password,
            certs.into_iter().next(),
        )
    }

    /// Look up an entry.
    pub fn get(&self, alias: &str) -> Option<&StoreEntry> {
        self.entries
            .iter()
            .find(|(existing, _)| existing == alias)
            .map(|(_, entry)| entry)
    }

    /// Look up a certificate entry.
    pub fn certificate(&self, alias: &str) -> Option<&Certificate> {
        match self.get(alias)? {
            StoreEntry::Certificate(cert) => Some(cert),
            StoreEntry::PrivateKey(_) => None,
        }
    }

    /// Look up a key entry.
    pub fn key_entry(&self, alias: &str) -> Option<&KeyEntry> {
        match self.get(alias)? {
            StoreEntry::PrivateKey(entry) => Some(entry),
            StoreEntry::Certificate(_) => None,
        }
    }

    /// Unlock the key stored under `alias`.
    pub fn private_key(&self, alias: &str, password: &str) -> Result<&PrivateKey> {
        let entry = self
            .key_entry(alias)
            .ok_or_else(|| KeystoreError::MissingPrivateKey(alias.to_string()))?;
        entry
            .unlock(password)
            .ok_or_else(|| KeystoreError::WrongPassword(alias.to_string()))
    }

    /// Returns `true` if an entry exists under `alias`.
    pub fn contains_alias(&self, alias: &str) -> bool {
        self.get(alias).is_some()
    }

    /// Aliases in insertion order.
    pub fn aliases(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(alias, _)| alias.as_str())
    }

    /// Certificate entries in insertion order.
    pub fn certificates(&self) -> impl Iterator<Item = (&str, &Certificate)> {
        self.entries.iter().filter_map(|(alias, entry)| match entry {
            StoreEntry::Certificate(cert) => Some((alias.as_str(), cert)),
            StoreEntry::PrivateKey(_) => None,
        })
    }

    /// Key entries in insertion order.
    pub fn key_entries(&self) -> impl Iterator<Item = (&str, &KeyEntry)> {
        self.entries.iter().filter_map(|(alias, entry)| match entry {
            StoreEntry::PrivateKey(key) => Some((alias.as_str(), key)),
            StoreEntry::Certificate(_) => None,
        })
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the store has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn insert(&mut self, alias: String, entry: StoreEntry) {
        match self.entries.iter_mut().find(|(existing, _)| *existing == alias) {
            Some((_, slot)) => *slot = entry,
            None => self.entries.push((alias, entry)),
        }
    }
}
