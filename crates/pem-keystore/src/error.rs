//! Error types for PEM decoding, store assembly and TLS context construction.
//!
//! Every failure is surfaced to the immediate caller as a distinct variant.
//! Nothing in this crate retries: PEM content is static input, so a second
//! attempt would fail the same way.

use thiserror::Error;

/// Errors that can occur within the `pem-keystore` crate.
#[derive(Debug, Error)]
pub enum KeystoreError {
    // --- Codec ---
    #[error("failed to decode PEM from {source_label}: {reason}")]
    Decode {
        source_label: String,
        reason: String,
    },

    #[error("failed to encode PEM: {0}")]
    Encode(String),

    // --- Classification ---
    #[error("unsupported object type: expected {expected}, found {found}")]
    UnsupportedObjectType {
        expected: &'static str,
        found: String,
    },

    // --- Cardinality ---
    #[error("expected at most one private key, found {0}")]
    MultipleKeys(usize),

    #[error("expected at most one certificate, found {0}")]
    MultipleCertificates(usize),

    #[error("missing required PEM input: {0}")]
    MissingInput(&'static str),

    // --- Store ---
    #[error("key entry {0:?} has no private key")]
    MissingPrivateKey(String),

    #[error("wrong password for key entry {0:?}")]
    WrongPassword(String),

    // --- TLS ---
    #[error("TLS configuration error: {0}")]
    TlsConfiguration(String),
}

impl KeystoreError {
    pub(crate) fn decode(source_label: &str, reason: impl std::fmt::Display) -> Self {
        Self::Decode {
            source_label: source_label.to_string(),
            reason: reason.to_string(),
        }
    }
}

/// Result type alias using [`KeystoreError`].
pub type Result<T> = std::result::Result<T, KeystoreError>;
