//! Digest and signature algorithms.

use ring::digest;
use ring::signature::{self, UnparsedPublicKey, VerificationAlgorithm};
use x509_parser::x509::SubjectPublicKeyInfo;

use crate::error::{Result, SignatureError};
use crate::ns::{alg, oid};

/// Uncompressed P-256 point length.
const P256_POINT_LEN: usize = 65;

/// Uncompressed P-384 point length.
const P384_POINT_LEN: usize = 97;

/// Reference digest algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DigestAlgorithm {
    Sha1,
    Sha256,
    Sha384,
    Sha512,
}

impl DigestAlgorithm {
    /// Parse a `DigestMethod/@Algorithm` URI.
    pub fn from_uri(uri: &str) -> Result<Self> {
        match uri {
            alg::SHA1 => Ok(Self::Sha1),
            alg::SHA256 => Ok(Self::Sha256),
            alg::SHA384 => Ok(Self::Sha384),
            alg::SHA512 => Ok(Self::Sha512),
            other => Err(SignatureError::UnsupportedAlgorithm(other.to_string())),
        }
    }

    /// The algorithm URI.
    pub fn uri(&self) -> &'static str {
        match self {
            Self::Sha1 => alg::SHA1,
            Self::Sha256 => alg::SHA256,
            Self::Sha384 => alg::SHA384,
            Self::Sha512 => alg::SHA512,
        }
    }

    /// Digest `data`.
    pub fn digest(&self, data: &[u8]) -> Vec<u8> {
        let algorithm = match self {
            Self::Sha1 => &digest::SHA1_FOR_LEGACY_USE_ONLY,
            Self::Sha256 => &digest::SHA256,
            Self::Sha384 => &digest::SHA384,
            Self::Sha512 => &digest::SHA512,
        };
        digest::digest(algorithm, data).as_ref().to_vec()
    }
}

/// Public key family of a certificate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyAlgorithm {
    Rsa,
    Ec,
    Dsa,
}

impl KeyAlgorithm {
    /// Key family of a SubjectPublicKeyInfo, if recognised.
    pub fn of(spki: &SubjectPublicKeyInfo<'_>) -> Option<Self> {
        match spki.algorithm.algorithm.to_id_string().as_str() {
            oid::RSA_ENCRYPTION => Some(Self::Rsa),
            oid::EC_PUBLIC_KEY => Some(Self::Ec),
            oid::DSA => Some(Self::Dsa),
            _ => None,
        }
    }
}

/// `SignatureMethod` algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SignatureAlgorithm {
    RsaSha1,
    RsaSha256,
    RsaSha384,
    RsaSha512,
    EcdsaSha256,
    EcdsaSha384,
    DsaSha1,
    DsaSha256,
}

impl SignatureAlgorithm {
    /// Parse a `SignatureMethod/@Algorithm` URI.
    pub fn from_uri(uri: &str) -> Result<Self> {
        match uri {
            alg::RSA_SHA1 => Ok(Self::RsaSha1),
            alg::RSA_SHA256 => Ok(Self::RsaSha256),
            alg::RSA_SHA384 => Ok(Self::RsaSha384),
            alg::RSA_SHA512 => Ok(Self::RsaSha512),
            alg::ECDSA_SHA256 => Ok(Self::EcdsaSha256),
            alg::ECDSA_SHA384 => Ok(Self::EcdsaSha384),
            alg::DSA_SHA1 => Ok(Self::DsaSha1),
            alg::DSA_SHA256 => Ok(Self::DsaSha256),
            other => Err(SignatureError::UnsupportedAlgorithm(other.to_string())),
        }
    }

    /// The algorithm URI.
    pub fn uri(&self) -> &'static str {
        match self {
            Self::RsaSha1 => alg::RSA_SHA1,
            Self::RsaSha256 => alg::RSA_SHA256,
            Self::RsaSha384 => alg::RSA_SHA384,
            Self::RsaSha512 => alg::RSA_SHA512,
            Self::EcdsaSha256 => alg::ECDSA_SHA256,
            Self::EcdsaSha384 => alg::ECDSA_SHA384,
            Self::DsaSha1 => alg::DSA_SHA1,
            Self::DsaSha256 => alg::DSA_SHA256,
        }
    }

    /// The key family this method needs.
    pub fn key_algorithm(&self) -> KeyAlgorithm {
        match self {
            Self::RsaSha1 | Self::RsaSha256 | Self::RsaSha384 | Self::RsaSha512 => KeyAlgorithm::Rsa,
            Self::EcdsaSha256 | Self::EcdsaSha384 => KeyAlgorithm::Ec,
            Self::DsaSha1 | Self::DsaSha256 => KeyAlgorithm::Dsa,
        }
    }

    /// Whether a key of the given family can verify this method.
    pub fn is_compatible_with(&self, key: KeyAlgorithm) -> bool {
        self.key_algorithm() == key
    }

    /// Verify `signature` over `message` with the key in `spki`.
    ///
    /// ECDSA signatures are the raw `r || s` concatenation XML-DSig uses.
    pub fn verify(&self, spki: &SubjectPublicKeyInfo<'_>, message: &[u8], signature_value: &[u8]) -> Result<()> {
        let key = spki.subject_public_key.data.as_ref();

        let algorithm: &'static dyn VerificationAlgorithm = match self {
            Self::RsaSha1 => &signature::RSA_PKCS1_2048_8192_SHA1_FOR_LEGACY_USE_ONLY,
            Self::RsaSha256 => &signature::RSA_PKCS1_2048_8192_SHA256,
            Self::RsaSha384 => &signature::RSA_PKCS1_2048_8192_SHA384,
            Self::RsaSha512 => &signature::RSA_PKCS1_2048_8192_SHA512,
            Self::EcdsaSha256 if key.len() == P256_POINT_LEN => &signature::ECDSA_P256_SHA256_FIXED,
            Self::EcdsaSha384 if key.len() == P384_POINT_LEN => &signature::ECDSA_P384_SHA384_FIXED,
            Self::EcdsaSha256 | Self::EcdsaSha384 => {
                return Err(SignatureError::UnsupportedAlgorithm(format!(
                    "{} with a {}-byte EC point",
                    self.uri(),
                    key.len()
                )))
            }
            Self::DsaSha1 | Self::DsaSha256 => {
                return Err(SignatureError::UnsupportedAlgorithm(self.uri().to_string()))
            }
        };

        UnparsedPublicKey::new(algorithm, key)
            .verify(message, signature_value)
            .map_err(|_| SignatureError::InvalidSignature)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_digest_known_values() {
        assert_eq!(
            hex::encode(DigestAlgorithm::Sha1.digest(b"abc")),
            "a9993e364706816aba3e25717850c26c9cd0d89d"
        );
        assert_eq!(
            hex::encode(DigestAlgorithm::Sha256.digest(b"abc")),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
        assert_eq!(DigestAlgorithm::Sha384.digest(b"abc").len(), 48);
        assert_eq!(DigestAlgorithm::Sha512.digest(b"abc").len(), 64);
    }

    #[test]
    fn test_uri_roundtrip() {
        for d in [
            DigestAlgorithm::Sha1,
            DigestAlgorithm::Sha256,
            DigestAlgorithm::Sha384,
            DigestAlgorithm::Sha512,
        ] {
            assert_eq!(DigestAlgorithm::from_uri(d.uri()).unwrap(), d);
        }
        for s in [
            SignatureAlgorithm::RsaSha1,
            SignatureAlgorithm::RsaSha256,
            SignatureAlgorithm::RsaSha384,
            SignatureAlgorithm::RsaSha512,
            SignatureAlgorithm::EcdsaSha256,
            SignatureAlgorithm::EcdsaSha384,
            SignatureAlgorithm::DsaSha1,
            SignatureAlgorithm::DsaSha256,
        ] {
            assert_eq!(SignatureAlgorithm::from_uri(s.uri()).unwrap(), s);
        }
    }

    #[test]
    fn test_unknown_uris_rejected() {
        assert!(matches!(
            DigestAlgorithm::from_uri("http://www.w3.org/2001/04/xmldsig-more#md5"),
            Err(SignatureError::UnsupportedAlgorithm(_))
        ));
        assert!(matches!(
            SignatureAlgorithm::from_uri("http://www.w3.org/2000/09/xmldsig#hmac-sha1"),
            Err(SignatureError::UnsupportedAlgorithm(_))
        ));
    }

    #[test]
    fn test_key_compatibility() {
        assert!(SignatureAlgorithm::RsaSha256.is_compatible_with(KeyAlgorithm::Rsa));
        assert!(!SignatureAlgorithm::RsaSha256.is_compatible_with(KeyAlgorithm::Ec));
        assert!(SignatureAlgorithm::EcdsaSha384.is_compatible_with(KeyAlgorithm::Ec));
        assert!(SignatureAlgorithm::DsaSha1.is_compatible_with(KeyAlgorithm::Dsa));
        assert!(!SignatureAlgorithm::DsaSha256.is_compatible_with(KeyAlgorithm::Rsa));
    }
}
