//! PEM block decoding and encoding.
//!
//! Both directions go through the `pem` crate. Decoding splits a byte
//! stream into labelled blocks and lifts each one into a [`RawPemObject`],
//! the closed set of object kinds the rest of the crate understands. Every
//! block is kept: labels the crate has no use for (`ENCRYPTED PRIVATE KEY`,
//! CRLs, CSRs, bare public keys) and traditional keys carrying RFC 1421
//! encryption headers become [`RawPemObject::Other`] with their label and
//! bytes, so a classifier asked for a key fails on them instead of treating
//! the source as empty.
//!
//! A `-----BEGIN` marker without a matching end is a decode error.
//!
//! Reference: `pem` (MIT)

pub mod source;

pub use source::PemSource;

use std::io::{Read, Write};
use std::sync::Arc;

use pem::{EncodeConfig, LineEnding, Pem};
use tracing::debug;

use crate::error::{KeystoreError, Result};
use crate::identity::{Certificate, KeyFormat, KeyPair, PrivateKey};

/// PEM label for X.509 certificates.
pub const CERTIFICATE_LABEL: &str = "CERTIFICATE";

/// A decoded PEM block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawPemObject {
    /// PKCS#8 private-key-info.
    PrivateKeyInfo(PrivateKey),
    /// Traditional PKCS#1 or SEC1 key pair; the public half may be absent.
    KeyPair(KeyPair),
    /// X.509 certificate.
    Certificate(Certificate),
    /// A block this crate does not classify.
    Other { label: String, der: Vec<u8> },
}

/// Discriminant of a [`RawPemObject`], safe to log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PemObjectKind {
    PrivateKeyInfo,
    KeyPair,
    Certificate,
    Other,
}

impl std::fmt::Display for PemObjectKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            PemObjectKind::PrivateKeyInfo => "private key info",
            PemObjectKind::KeyPair => "key pair",
            PemObjectKind::Certificate => "certificate",
            PemObjectKind::Other => "other",
        })
    }
}

impl RawPemObject {
    /// The kind of this object.
    pub fn kind(&self) -> PemObjectKind {
        match self {
            RawPemObject::PrivateKeyInfo(_) => PemObjectKind::PrivateKeyInfo,
            RawPemObject::KeyPair(_) => PemObjectKind::KeyPair,
            RawPemObject::Certificate(_) => PemObjectKind::Certificate,
            RawPemObject::Other { .. } => PemObjectKind::Other,
        }
    }

    /// Human-readable description used in classification errors.
    pub(crate) fn describe(&self) -> String {
        match self {
            RawPemObject::Other { label, .. } => format!("{} ({label})", self.kind()),
            _ => self.kind().to_string(),
        }
    }
}

/// Callback invoked once per decoded block with the source label and kind.
pub type ParseObserver = Arc<dyn Fn(&str, PemObjectKind) + Send + Sync>;

/// PEM decoder/encoder with an optional per-object observer.
///
/// The default codec has no observer and no side effects.
#[derive(Clone, Default)]
pub struct PemCodec {
    observer: Option<ParseObserver>,
}

impl PemCodec {
    /// A codec without an observer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a callback that sees every decoded object's kind.
    pub fn observe(
        mut self,
        observer: impl Fn(&str, PemObjectKind) + Send + Sync + 'static,
    ) -> Self {
        self.observer = Some(Arc::new(observer));
        self
    }

    /// Decode every PEM block in `source`.
    ///
    /// A source without PEM blocks yields an empty vector. A malformed block
    /// or unreadable source fails with [`KeystoreError::Decode`].
    pub fn parse_all(&self, source: PemSource) -> Result<Vec<RawPemObject>> {
        let (label, mut reader) = source.open()?;
        let mut input = Vec::new();
        reader
            .read_to_end(&mut input)
            .map_err(|e| KeystoreError::decode(&label, e))?;
        drop(reader);

        let blocks = pem::parse_many(&input).map_err(|e| KeystoreError::decode(&label, e))?;
        let begun = count_begin_markers(&input);
        if begun > blocks.len() {
            return Err(KeystoreError::decode(
                &label,
                format!("{} of {begun} PEM blocks have no end marker", begun - blocks.len()),
            ));
        }

        let mut objects = Vec::with_capacity(blocks.len());
        for block in blocks {
            let object = lift_block(&label, block)?;
            if let Some(observer) = &self.observer {
                observer(&label, object.kind());
            }
            objects.push(object);
        }

        debug!(source = %label, objects = objects.len(), "decoded PEM source");
        Ok(objects)
    }

    /// Write `object` to `sink` as a single PEM block.
    pub fn serialize(&self, object: &RawPemObject, sink: &mut dyn Write) -> Result<()> {
        let block = to_pem_block(object)?;
        sink
            .write_all(encode_block(&block).as_bytes())
            .map_err(|e| KeystoreError::Encode(format!("write failed: {e}")))
    }
}

/// Decode every PEM block in `source` with a default codec.
pub fn parse_all(source: PemSource) -> Result<Vec<RawPemObject>> {
    PemCodec::default().parse_all(source)
}

/// Write `object` to `sink` as PEM.
pub fn serialize(object: &RawPemObject, sink: &mut dyn Write) -> Result<()> {
    PemCodec::default().serialize(object, sink)
}

/// Encode `object` as a PEM string.
pub fn to_pem_string(object: &RawPemObject) -> Result<String> {
    to_pem_block(object).map(|block| encode_block(&block))
}

fn encode_block(block: &Pem) -> String {
    pem::encode_config(block, EncodeConfig::new().set_line_ending(LineEnding::LF))
}

fn to_pem_block(object: &RawPemObject) -> Result<Pem> {
    let (label, der) = match object {
        RawPemObject::PrivateKeyInfo(key) => (key.format().pem_label(), key.secret_der()),
        RawPemObject::KeyPair(pair) => {
            (pair.private().format().pem_label(), pair.private().secret_der())
        }
        RawPemObject::Certificate(cert) => (CERTIFICATE_LABEL, cert.der()),
        RawPemObject::Other { label, .. } => {
            return Err(KeystoreError::Encode(format!(
                "{label} blocks are not encodable"
            )));
        }
    };
    Ok(Pem::new(label, der.to_vec()))
}

/// Lift a decoded PEM block into a [`RawPemObject`].
fn lift_block(source_label: &str, block: Pem) -> Result<RawPemObject> {
    let tag = block.tag().to_string();
    if block.headers().get("Proc-Type").is_some() {
        return Ok(RawPemObject::Other {
            label: tag,
            der: block.into_contents(),
        });
    }

    if tag == CERTIFICATE_LABEL {
        let cert = Certificate::from_der(block.into_contents())
            .map_err(|e| KeystoreError::decode(source_label, e))?;
        return Ok(RawPemObject::Certificate(cert));
    }

    let object = match KeyFormat::from_pem_label(&tag) {
        Some(KeyFormat::Pkcs8) => {
            RawPemObject::PrivateKeyInfo(PrivateKey::new(KeyFormat::Pkcs8, block.into_contents()))
        }
        Some(KeyFormat::Pkcs1) => {
            let pair = KeyPair::from_pkcs1_der(block.into_contents())
                .map_err(|e| KeystoreError::decode(source_label, format!("PKCS#1 key: {e}")))?;
            RawPemObject::KeyPair(pair)
        }
        Some(KeyFormat::Sec1) => {
            let pair = KeyPair::from_sec1_der(block.into_contents())
                .map_err(|e| KeystoreError::decode(source_label, format!("SEC1 key: {e}")))?;
            RawPemObject::KeyPair(pair)
        }
        None => RawPemObject::Other {
            label: tag,
            der: block.into_contents(),
        },
    };
    Ok(object)
}

/// `pem::parse_many` stops silently at a block without an end marker.
fn count_begin_markers(input: &[u8]) -> usize {
    const BEGIN: &[u8] = b"-----BEGIN ";
    input.windows(BEGIN.len()).filter(|window| *window == BEGIN).count()
}
