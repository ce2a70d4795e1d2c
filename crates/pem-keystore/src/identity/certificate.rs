//! X.509 certificate values.
//!
//! A [`Certificate`] is an immutable DER blob that is known to parse as an
//! X.509 certificate. This crate never validates expiry, chains or
//! revocation; that is left to the TLS stack. Parsing happens once when the
//! value is constructed so a malformed `CERTIFICATE` block is rejected at the
//! codec boundary instead of deep inside rustls.
//!
//! Reference: `x509-parser` crate (rusticata, MIT/Apache-2.0)

use rustls_pki_types::CertificateDer;
use x509_parser::prelude::*;

/// A parsed X.509 certificate, used either as a trust anchor or as the leaf
/// of a key entry's chain.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Certificate {
    /// DER-encoded certificate bytes.
    cert_der: Vec<u8>,
}

impl Certificate {
    /// Wrap DER bytes, checking that they parse as an X.509 certificate.
    ///
    /// Returns the parser's message on failure; the codec attaches the
    /// source label.
    pub fn from_der(der: impl Into<Vec<u8>>) -> std::result::Result<Self, String> {
        let cert_der = der.into();
        X509Certificate::from_der(&cert_der).map_err(|e| format!("X.509 parse error: {e}"))?;
        Ok(Self { cert_der })
    }

    /// Returns the DER-encoded certificate bytes.
    pub fn der(&self) -> &[u8] {
        &self.cert_der
    }

    /// Returns the certificate as a rustls `CertificateDer`.
    pub fn to_certificate_der(&self) -> CertificateDer<'static> {
        CertificateDer::from(self.cert_der.clone())
    }

    /// Returns the subject distinguished name, e.g. `CN=localhost`.
    pub fn subject(&self) -> String {
        self.with_parsed(|cert| cert.subject().to_string())
            .unwrap_or_default()
    }

    /// Returns the serial number as colon-separated hex.
    pub fn serial_hex(&self) -> String {
        self.with_parsed(|cert| cert.tbs_certificate.raw_serial_as_string())
            .unwrap_or_default()
    }

    /// Returns the expiration time as seconds since Unix epoch.
    pub fn not_after_epoch(&self) -> Option<i64> {
        self.with_parsed(|cert| cert.validity().not_after.timestamp())
    }

    /// The bytes were checked in [`Certificate::from_der`], so this only
    /// returns `None` if that invariant was broken.
    fn with_parsed<T>(&self, f: impl FnOnce(&X509Certificate<'_>) -> T) -> Option<T> {
        X509Certificate::from_der(&self.cert_der)
            .ok()
            .map(|(_, cert)| f(&cert))
    }
}

impl std::fmt::Debug for Certificate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Certificate")
            .field("subject", &self.subject())
            .field("serial", &self.serial_hex())
            .finish()
    }
}
