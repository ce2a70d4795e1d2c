//! Private keys and traditional key pairs.
//!
//! PEM private keys arrive in three encodings:
//!
//! - PKCS#8 `PRIVATE KEY` (private-key-info, algorithm-tagged)
//! - PKCS#1 `RSA PRIVATE KEY` (RSA key pair)
//! - SEC1 `EC PRIVATE KEY` (EC key pair, public point optional)
//!
//! [`PrivateKey`] holds any of them as zeroizing DER. [`KeyPair`] is the
//! codec's view of the two traditional encodings, which also carry a public
//! half. SEC1 makes the public point optional, so `KeyPair::public` may be
//! `None` and nothing downstream depends on it.
//!
//! References: `pkcs1` and `sec1` crates (RustCrypto, MIT/Apache-2.0)

use rustls_pki_types::{
    PrivateKeyDer, PrivatePkcs1KeyDer, PrivatePkcs8KeyDer, PrivateSec1KeyDer,
};
use zeroize::Zeroizing;

/// DER encoding of a [`PrivateKey`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyFormat {
    /// PKCS#8 private-key-info (`PRIVATE KEY`).
    Pkcs8,
    /// PKCS#1 RSA private key (`RSA PRIVATE KEY`).
    Pkcs1,
    /// SEC1 elliptic-curve private key (`EC PRIVATE KEY`).
    Sec1,
}

impl KeyFormat {
    /// The PEM label used for this encoding.
    pub fn pem_label(self) -> &'static str {
        match self {
            KeyFormat::Pkcs8 => "PRIVATE KEY",
            KeyFormat::Pkcs1 => "RSA PRIVATE KEY",
            KeyFormat::Sec1 => "EC PRIVATE KEY",
        }
    }

    /// The encoding a PEM label announces, if it is an unencrypted private key.
    pub fn from_pem_label(label: &str) -> Option<Self> {
        [KeyFormat::Pkcs8, KeyFormat::Pkcs1, KeyFormat::Sec1]
            .into_iter()
            .find(|format| format.pem_label() == label)
    }
}

/// A private key. The DER bytes are zeroized on drop and never printed.
#[derive(Clone, PartialEq, Eq)]
pub struct PrivateKey {
    format: KeyFormat,
    der: Zeroizing<Vec<u8>>,
}

impl PrivateKey {
    /// Wrap DER bytes of the given encoding.
    pub fn new(format: KeyFormat, der: Vec<u8>) -> Self {
        Self {
            format,
            der: Zeroizing::new(der),
        }
    }

    /// The DER encoding of this key.
    pub fn format(&self) -> KeyFormat {
        self.format
    }

    /// Returns the raw DER bytes.
    ///
    /// **Security:** The caller is responsible for not leaking these.
    pub fn secret_der(&self) -> &[u8] {
        &self.der
    }

    /// Convert to a rustls `PrivateKeyDer` for loading into a crypto provider.
    pub fn to_private_key_der(&self) -> PrivateKeyDer<'static> {
        let der = self.der.to_vec();
        match self.format {
            KeyFormat::Pkcs8 => PrivateKeyDer::Pkcs8(PrivatePkcs8KeyDer::from(der)),
            KeyFormat::Pkcs1 => PrivateKeyDer::Pkcs1(PrivatePkcs1KeyDer::from(der)),
            KeyFormat::Sec1 => PrivateKeyDer::Sec1(PrivateSec1KeyDer::from(der)),
        }
    }
}

impl std::fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrivateKey")
            .field("format", &self.format)
            .field("der", &"<redacted>")
            .finish()
    }
}

/// Public half of a traditional key pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublicHalf {
    /// RSA public key as big-endian unsigned integers.
    Rsa {
        modulus: Vec<u8>,
        public_exponent: Vec<u8>,
    },
    /// Uncompressed or compressed SEC1 elliptic-curve point.
    Ec { point: Vec<u8> },
}

/// A key pair decoded from a traditional (non-PKCS#8) encoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyPair {
    private: PrivateKey,
    public: Option<PublicHalf>,
}

impl KeyPair {
    /// Assemble a key pair from its halves. `public` may be absent.
    pub fn new(private: PrivateKey, public: Option<PublicHalf>) -> Self {
        Self { private, public }
    }

    /// Decode a PKCS#1 `RSAPrivateKey`, extracting modulus and exponent.
    pub fn from_pkcs1_der(der: Vec<u8>) -> Result<Self, pkcs1::Error> {
        let public = {
            let rsa = pkcs1::RsaPrivateKey::try_from(der.as_slice())?;
            PublicHalf::Rsa {
                modulus: rsa.modulus.as_bytes().to_vec(),
                public_exponent: rsa.public_exponent.as_bytes().to_vec(),
            }
        };
        Ok(Self::new(PrivateKey::new(KeyFormat::Pkcs1, der), Some(public)))
    }

    /// Decode a SEC1 `ECPrivateKey`. The public point is optional in SEC1.
    pub fn from_sec1_der(der: Vec<u8>) -> Result<Self, sec1::Error> {
        let public = {
            let ec = sec1::EcPrivateKey::try_from(der.as_slice())?;
            ec.public_key.map(|point| PublicHalf::Ec {
                point: point.to_vec(),
            })
        };
        Ok(Self::new(PrivateKey::new(KeyFormat::Sec1, der), public))
    }

    /// The private half.
    pub fn private(&self) -> &PrivateKey {
        &self.private
    }

    /// The public half, if the encoding carried one.
    pub fn public(&self) -> Option<&PublicHalf> {
        self.public.as_ref()
    }

    /// Consume the pair, keeping only the private half.
    pub fn into_private(self) -> PrivateKey {
        self.private
    }
}
