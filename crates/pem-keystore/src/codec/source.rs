//! Readable PEM sources.
//!
//! A [`PemSource`] names where PEM text comes from without opening it. The
//! codec opens the source, drains it and drops the handle inside a single
//! call, so no file descriptor outlives the parse, including on error paths.

use std::fs::File;
use std::io::{BufRead, BufReader, Cursor, Read};
use std::path::PathBuf;

use crate::error::{KeystoreError, Result};

/// Where PEM text is read from.
pub enum PemSource {
    /// A file on disk, opened lazily by the codec.
    Path(PathBuf),
    /// An in-memory buffer.
    Bytes { label: String, bytes: Vec<u8> },
    /// Any byte stream. Consumed by the first parse.
    Reader {
        label: String,
        reader: Box<dyn Read + Send>,
    },
}

impl PemSource {
    /// A file path.
    pub fn path(path: impl Into<PathBuf>) -> Self {
        Self::Path(path.into())
    }

    /// An in-memory buffer with a label used in error messages.
    pub fn bytes(label: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self::Bytes {
            label: label.into(),
            bytes: bytes.into(),
        }
    }

    /// PEM text held in memory.
    pub fn text(label: impl Into<String>, text: impl Into<String>) -> Self {
        Self::bytes(label, text.into().into_bytes())
    }

    /// An arbitrary reader.
    pub fn reader(label: impl Into<String>, reader: impl Read + Send + 'static) -> Self {
        Self::Reader {
            label: label.into(),
            reader: Box::new(reader),
        }
    }

    /// Human-readable name for logs and errors.
    pub fn label(&self) -> String {
        match self {
            PemSource::Path(path) => path.display().to_string(),
            PemSource::Bytes { label, .. } | PemSource::Reader { label, .. } => label.clone(),
        }
    }

    /// Open the source for buffered reading.
    pub(crate) fn open(self) -> Result<(String, Box<dyn BufRead>)> {
        let label = self.label();
        let reader: Box<dyn BufRead> = match self {
            PemSource::Path(path) => {
                let file = File::open(&path).map_err(|e| KeystoreError::decode(&label, e))?;
                Box::new(BufReader::new(file))
            }
            PemSource::Bytes { bytes, .. } => Box::new(Cursor::new(bytes)),
            PemSource::Reader { reader, .. } => Box::new(BufReader::new(reader)),
        };
        Ok((label, reader))
    }
}

impl std::fmt::Debug for PemSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PemSource::Path(path) => f.debug_tuple("Path").field(path).finish(),
            PemSource::Bytes { label, bytes } => f
                .debug_struct("Bytes")
                .field("label", label)
                .field("len", &bytes.len())
                .finish(),
            PemSource::Reader { label, .. } => {
                f.debug_struct("Reader").field("label", label).finish()
            }
        }
    }
}
