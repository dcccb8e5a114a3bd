//! Cryptographic values that cross the backend boundary.
//!
//! Only public keys and signature outputs ever leave a backend. This module
//! defines their representation and a verification helper for the schemes
//! this crate knows how to verify.
//!
//! Main types:
//! * [`PublicKey`]
//! * [`Signature`]

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::SignatureScheme;

/// A public key together with the [`SignatureScheme`] it belongs to.
///
/// Key bytes use the canonical encoding of the scheme:
/// * `EDDSA_ED25519_SHA512`: the 32-byte compressed Edwards point.
/// * `ECDSA_SECP256K1_SHA256`: the 33-byte SEC1-compressed point.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PublicKey {
    scheme: SignatureScheme,
    bytes: Vec<u8>,
}

/// Raw signature bytes in the canonical format of the producing scheme.
///
/// Ed25519 and ECDSA signatures are both 64 bytes (`R || s` respectively `r || s`).
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Signature(Vec<u8>);

/// Errors returned by [`PublicKey::verify`].
#[derive(Debug, thiserror::Error)]
pub enum VerifyError {
    /// This crate has no verifier for the scheme.
    #[error("no verifier for scheme {0}")]
    UnsupportedScheme(SignatureScheme),
    /// The public key bytes are not a valid key for the scheme.
    #[error("malformed public key for scheme {0}")]
    MalformedKey(SignatureScheme),
    /// The signature bytes are not a valid signature encoding for the scheme.
    #[error("malformed signature for scheme {0}")]
    MalformedSignature(SignatureScheme),
    /// The signature does not match the data under this key.
    #[error("signature verification failed")]
    Mismatch,
}

impl PublicKey {
    /// Creates a new `PublicKey` by wrapping encoded key bytes.
    ///
    /// Does not check that the bytes are a valid key. That happens on [`Self::verify`].
    pub fn new(scheme: SignatureScheme, bytes: Vec<u8>) -> Self {
        Self { scheme, bytes }
    }

    /// Returns the [`SignatureScheme`] of this key.
    pub fn scheme(&self) -> SignatureScheme {
        self.scheme
    }

    /// Returns the encoded key bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Verifies `signature` over `data` under this key and its scheme.
    pub fn verify(&self, data: &[u8], signature: &Signature) -> Result<(), VerifyError> {
        match self.scheme {
            SignatureScheme::EddsaEd25519Sha512 => self.verify_ed25519(data, signature),
            SignatureScheme::EcdsaSecp256k1Sha256 => self.verify_secp256k1(data, signature),
            scheme => Err(VerifyError::UnsupportedScheme(scheme)),
        }
    }

    fn verify_ed25519(&self, data: &[u8], signature: &Signature) -> Result<(), VerifyError> {
        use ed25519_dalek::Verifier as _;
        let scheme = self.scheme;
        let key_bytes: &[u8; ed25519_dalek::PUBLIC_KEY_LENGTH] = self
            .bytes
            .as_slice()
            .try_into()
            .map_err(|_| VerifyError::MalformedKey(scheme))?;
        let key = ed25519_dalek::VerifyingKey::from_bytes(key_bytes)
            .map_err(|_| VerifyError::MalformedKey(scheme))?;
        let signature = ed25519_dalek::Signature::from_slice(signature.as_bytes())
            .map_err(|_| VerifyError::MalformedSignature(scheme))?;
        key.verify(data, &signature)
            .map_err(|_| VerifyError::Mismatch)
    }

    fn verify_secp256k1(&self, data: &[u8], signature: &Signature) -> Result<(), VerifyError> {
        use k256::ecdsa::signature::Verifier as _;
        let scheme = self.scheme;
        let key = k256::ecdsa::VerifyingKey::from_sec1_bytes(&self.bytes)
            .map_err(|_| VerifyError::MalformedKey(scheme))?;
        let signature = k256::ecdsa::Signature::from_slice(signature.as_bytes())
            .map_err(|_| VerifyError::MalformedSignature(scheme))?;
        key.verify(data, &signature)
            .map_err(|_| VerifyError::Mismatch)
    }
}

impl From<ed25519_dalek::VerifyingKey> for PublicKey {
    fn from(value: ed25519_dalek::VerifyingKey) -> Self {
        Self::new(
            SignatureScheme::EddsaEd25519Sha512,
            value.to_bytes().to_vec(),
        )
    }
}

impl From<k256::ecdsa::VerifyingKey> for PublicKey {
    fn from(value: k256::ecdsa::VerifyingKey) -> Self {
        Self::new(
            SignatureScheme::EcdsaSecp256k1Sha256,
            value.to_encoded_point(true).as_bytes().to_vec(),
        )
    }
}

impl fmt::Display for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PublicKey({}, {} bytes)", self.scheme, self.bytes.len())
    }
}

impl Signature {
    /// Creates a new `Signature` by wrapping raw bytes.
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    /// Returns the raw signature bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Consumes the signature and returns the raw bytes.
    pub fn into_inner(self) -> Vec<u8> {
        self.0
    }

    /// The length of the signature in bytes.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` iff the signature has no bytes.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<u8>> for Signature {
    fn from(value: Vec<u8>) -> Self {
        Self(value)
    }
}

impl From<ed25519_dalek::Signature> for Signature {
    fn from(value: ed25519_dalek::Signature) -> Self {
        Self(value.to_bytes().to_vec())
    }
}

impl From<k256::ecdsa::Signature> for Signature {
    fn from(value: k256::ecdsa::Signature) -> Self {
        Self(value.to_bytes().to_vec())
    }
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Signature({} bytes)", self.0.len())
    }
}

#[cfg(test)]
mod tests {
    use rand::rngs::OsRng;

    use super::*;

    #[test]
    fn ed25519_signature_verifies() {
        use ed25519_dalek::Signer as _;
        let signing_key = ed25519_dalek::SigningKey::generate(&mut OsRng);
        let public_key = PublicKey::from(signing_key.verifying_key());
        let signature = Signature::from(signing_key.sign(b"some data"));

        assert_eq!(public_key.scheme(), SignatureScheme::EddsaEd25519Sha512);
        assert_eq!(public_key.as_bytes().len(), 32);
        assert_eq!(signature.len(), 64);
        public_key
            .verify(b"some data", &signature)
            .expect("signature is valid");
        assert!(matches!(
            public_key.verify(b"other data", &signature),
            Err(VerifyError::Mismatch)
        ));
    }

    #[test]
    fn secp256k1_signature_verifies() {
        use k256::ecdsa::signature::Signer as _;
        let signing_key = k256::ecdsa::SigningKey::random(&mut OsRng);
        let public_key = PublicKey::from(*signing_key.verifying_key());
        let signature: k256::ecdsa::Signature = signing_key.sign(b"some data");
        let signature = Signature::from(signature);

        assert_eq!(public_key.scheme(), SignatureScheme::EcdsaSecp256k1Sha256);
        assert_eq!(public_key.as_bytes().len(), 33);
        assert_eq!(signature.len(), 64);
        public_key
            .verify(b"some data", &signature)
            .expect("signature is valid");
        assert!(matches!(
            public_key.verify(b"other data", &signature),
            Err(VerifyError::Mismatch)
        ));
    }

    #[test]
    fn malformed_inputs_are_reported() {
        let public_key = PublicKey::new(SignatureScheme::EddsaEd25519Sha512, vec![1, 2, 3]);
        assert!(matches!(
            public_key.verify(b"data", &Signature::new(vec![0; 64])),
            Err(VerifyError::MalformedKey(SignatureScheme::EddsaEd25519Sha512))
        ));

        let signing_key = ed25519_dalek::SigningKey::generate(&mut OsRng);
        let public_key = PublicKey::from(signing_key.verifying_key());
        assert!(matches!(
            public_key.verify(b"data", &Signature::new(vec![0; 10])),
            Err(VerifyError::MalformedSignature(
                SignatureScheme::EddsaEd25519Sha512
            ))
        ));
    }

    #[test]
    fn unsupported_scheme_has_no_verifier() {
        let public_key = PublicKey::new(SignatureScheme::RsaSha256, vec![0; 256]);
        assert!(matches!(
            public_key.verify(b"data", &Signature::new(vec![0; 256])),
            Err(VerifyError::UnsupportedScheme(SignatureScheme::RsaSha256))
        ));
    }

    #[test]
    fn signature_debug_does_not_dump_bytes() {
        let signature = Signature::new(vec![0x2a; 64]);
        let debug_str = format!("{signature:?}");
        assert_eq!(debug_str, "Signature(64 bytes)");
    }
}
