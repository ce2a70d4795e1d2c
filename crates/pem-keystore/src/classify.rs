//! Normalize decoded PEM objects into certificates and private keys.

use crate::codec::RawPemObject;
use crate::error::{KeystoreError, Result};
use crate::identity::{Certificate, PrivateKey};

/// Keep only the certificates, in source order. Other kinds are skipped.
pub fn certificates_of(objects: Vec<RawPemObject>) -> Vec<Certificate> {
    objects
        .into_iter()
        .filter_map(|object| match object {
            RawPemObject::Certificate(cert) => Some(cert),
            RawPemObject::PrivateKeyInfo(_)
            | RawPemObject::KeyPair(_)
            | RawPemObject::Other { .. } => None,
        })
        .collect()
}

/// Classify one object as a private key.
///
/// PKCS#8 keys convert directly; key pairs yield their private half whether
/// or not the public half was present. Anything else is
/// [`KeystoreError::UnsupportedObjectType`].
pub fn private_key_of(object: RawPemObject) -> Result<PrivateKey> {
    match object {
        RawPemObject::PrivateKeyInfo(key) => Ok(key),
        RawPemObject::KeyPair(pair) => Ok(pair.into_private()),
        other @ (RawPemObject::Certificate(_) | RawPemObject::Other { .. }) => {
            Err(KeystoreError::UnsupportedObjectType {
                expected: "private key",
                found: other.describe(),
            })
        }
    }
}

/// Classify every object as a private key. Fails if any single object is
/// not a key, even when the caller only wants the first.
pub fn private_keys_of(objects: Vec<RawPemObject>) -> Result<Vec<PrivateKey>> {
    objects.into_iter().map(private_key_of).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::{KeyFormat, KeyPair, PublicHalf};

    fn cert() -> Certificate {
        let generated = rcgen::generate_simple_self_signed(vec!["localhost".to_string()])
            .expect("cert generation should succeed");
        Certificate::from_der(generated.cert.der().to_vec()).unwrap()
    }

    fn pkcs8(byte: u8) -> PrivateKey {
        PrivateKey::new(KeyFormat::Pkcs8, vec![byte; 8])
    }

    fn other() -> RawPemObject {
        RawPemObject::Other {
            label: "X509 CRL".into(),
            der: vec![0x30, 0x00],
        }
    }

    #[test]
    fn certificates_of_skips_non_certificates() {
        let a = cert();
        let b = cert();
        let objects = vec![
            RawPemObject::PrivateKeyInfo(pkcs8(1)),
            RawPemObject::Certificate(a.clone()),
            other(),
            RawPemObject::Certificate(b.clone()),
        ];
        assert_eq!(certificates_of(objects), vec![a, b]);
    }

    #[test]
    fn certificates_of_empty() {
        assert!(certificates_of(Vec::new()).is_empty());
    }

    #[test]
    fn private_key_info_converts_directly() {
        let key = pkcs8(7);
        let classified = private_key_of(RawPemObject::PrivateKeyInfo(key.clone())).unwrap();
        assert_eq!(classified, key);
    }

    #[test]
    fn key_pair_yields_private_half() {
        let private = PrivateKey::new(KeyFormat::Pkcs1, vec![9; 16]);
        let pair = KeyPair::new(
            private.clone(),
            Some(PublicHalf::Rsa {
                modulus: vec![0xc5; 8],
                public_exponent: vec![0x01, 0x00, 0x01],
            }),
        );
        assert_eq!(private_key_of(RawPemObject::KeyPair(pair)).unwrap(), private);
    }

    #[test]
    fn key_pair_without_public_half_still_classifies() {
        let private = PrivateKey::new(KeyFormat::Sec1, vec![3; 32]);
        let pair = KeyPair::new(private.clone(), None);
        assert_eq!(private_key_of(RawPemObject::KeyPair(pair)).unwrap(), private);
    }

    #[test]
    fn certificate_is_not_a_private_key() {
        let err = private_key_of(RawPemObject::Certificate(cert())).unwrap_err();
        match err {
            KeystoreError::UnsupportedObjectType { expected, found } => {
                assert_eq!(expected, "private key");
                assert_eq!(found, "certificate");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn other_is_not_a_private_key() {
        let err = private_key_of(other()).unwrap_err();
        assert!(matches!(err, KeystoreError::UnsupportedObjectType { .. }));
    }

    #[test]
    fn private_keys_of_fails_eagerly() {
        let objects = vec![
            RawPemObject::PrivateKeyInfo(pkcs8(1)),
            RawPemObject::Certificate(cert()),
        ];
        assert!(matches!(
            private_keys_of(objects),
            Err(KeystoreError::UnsupportedObjectType { .. })
        ));
    }

    #[test]
    fn private_keys_of_keeps_order() {
        let objects = vec![
            RawPemObject::PrivateKeyInfo(pkcs8(1)),
            RawPemObject::PrivateKeyInfo(pkcs8(2)),
        ];
        assert_eq!(private_keys_of(objects).unwrap(), vec![pkcs8(1), pkcs8(2)]);
    }
}
