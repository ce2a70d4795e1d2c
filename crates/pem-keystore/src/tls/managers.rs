//! Key-manager and trust-manager sources.
//!
//! [`KeyManagers`] holds every key entry of a key store, unlocked with the
//! bundle password and loaded into the crypto provider. It answers rustls'
//! "which certificate do I present?" on both sides of a handshake by picking
//! the first identity whose key can sign with one of the offered schemes.
//!
//! [`TrustManagers`] is the trust store's certificates as a rustls
//! `RootCertStore`. Chain building, expiry and revocation are left to the
//! webpki verifiers rustls builds on top of it.

use std::sync::Arc;

use rustls::client::ResolvesClientCert;
use rustls::crypto::CryptoProvider;
use rustls::server::{ClientHello, ResolvesServerCert};
use rustls::sign::CertifiedKey;
use rustls::{RootCertStore, SignatureScheme};
use tracing::debug;

use crate::assembler::StoreBundle;
use crate::error::{KeystoreError, Result};
use crate::identity::Certificate;

/// Get the ring crypto provider used for key loading and verification.
pub(crate) fn ring_provider() -> Arc<CryptoProvider> {
    Arc::new(rustls::crypto::ring::default_provider())
}

// ---------------------------------------------------------------------------
// Key managers
// ---------------------------------------------------------------------------

/// One unlocked key entry ready to sign handshakes.
#[derive(Debug)]
struct Identity {
    alias: String,
    certified: Arc<CertifiedKey>,
}

/// Certificate resolver over the key entries of a key store.
#[derive(Debug)]
pub struct KeyManagers {
    identities: Vec<Identity>,
}

impl KeyManagers {
    /// Aliases of the loaded identities, in store order.
    pub fn aliases(&self) -> impl Iterator<Item = &str> {
        self.identities.iter().map(|identity| identity.alias.as_str())
    }

    fn select(&self, offered: &[SignatureScheme]) -> Option<Arc<CertifiedKey>> {
        let identity = self
            .identities
            .iter()
            .find(|identity| identity.certified.key.choose_scheme(offered).is_some())?;
        debug!(alias = %identity.alias, "selected identity for handshake");
        Some(identity.certified.clone())
    }
}

/// Unlock every key entry in `bundle.key_store` with the bundle password.
///
/// Fails with [`KeystoreError::TlsConfiguration`] if the store has no key
/// entries, an entry has no certificate chain, or the provider cannot load
/// a key.
pub fn key_managers(bundle: &StoreBundle) -> Result<KeyManagers> {
    let provider = ring_provider();
    let password = bundle.key_store_password.as_str();

    let mut identities = Vec::new();
    for (alias, entry) in bundle.key_store.key_entries() {
        let key = entry
            .unlock(password)
            .ok_or_else(|| KeystoreError::WrongPassword(alias.to_string()))?;

        if entry.chain().is_empty() {
            return Err(KeystoreError::TlsConfiguration(format!(
                "key entry {alias:?} has no certificate chain"
            )));
        }

        let signing_key = provider
            .key_provider
            .load_private_key(key.to_private_key_der())
            .map_err(|e| KeystoreError::TlsConfiguration(format!("key entry {alias:?}: {e}")))?;

        let chain = entry
            .chain()
            .iter()
            .map(Certificate::to_certificate_der)
            .collect();

        identities.push(Identity {
            alias: alias.to_string(),
            certified: Arc::new(CertifiedKey::new(chain, signing_key)),
        });
    }

    if identities.is_empty() {
        return Err(KeystoreError::TlsConfiguration(
            "key store holds no key entries".into(),
        ));
    }

    Ok(KeyManagers { identities })
}

impl ResolvesServerCert for KeyManagers {
    fn resolve(&self, client_hello: ClientHello<'_>) -> Option<Arc<CertifiedKey>> {
        self.select(client_hello.signature_schemes())
    }
}

impl ResolvesClientCert for KeyManagers {
    fn resolve(
        &self,
        _root_hint_subjects: &[&[u8]],
        sigschemes: &[SignatureScheme],
    ) -> Option<Arc<CertifiedKey>> {
        self.select(sigschemes)
    }

    fn has_certs(&self) -> bool {
        !self.identities.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Trust managers
// ---------------------------------------------------------------------------

/// Trust anchors taken from a trust store.
#[derive(Debug, Clone)]
pub struct TrustManagers {
    roots: Arc<RootCertStore>,
}

impl TrustManagers {
    /// The root store.
    pub fn roots(&self) -> Arc<RootCertStore> {
        self.roots.clone()
    }

    /// Number of trust anchors.
    pub fn len(&self) -> usize {
        self.roots.len()
    }

    /// Returns `true` if no certificate is trusted.
    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }
}

/// Build trust anchors from every certificate entry in `bundle.trust_store`.
/// Trust stores carry no secrets, so no password is involved.
pub fn trust_managers(bundle: &StoreBundle) -> Result<TrustManagers> {
    let mut roots = RootCertStore::empty();
    for (alias, cert) in bundle.trust_store.certificates() {
        roots.add(cert.to_certificate_der()).map_err(|e| {
            KeystoreError::TlsConfiguration(format!("trust entry {alias:?}: {e}"))
        })?;
    }
    Ok(TrustManagers {
        roots: Arc::new(roots),
    })
}
