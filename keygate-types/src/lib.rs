#![deny(missing_docs)]
//! Core type definitions for the keygate key operation gateway.
//!
//! This crate groups together the strongly-typed values shared between
//! key-custody backends and the gateway that dispatches to them. It provides:
//!
//! * [`KeyAlias`], the caller-chosen name of a key slot inside a backend.
//! * [`SignatureScheme`], the descriptor of an asymmetric algorithm family.
//! * Public keys and signatures that cross the backend boundary (see [`crypto`] module).
//! * The capability contract of key-custody backends (see [`backend`] module).
//!
//! Private key material never appears in this crate. Backends own it.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

pub mod backend;
pub mod crypto;

/// Identifies one key slot inside a backend.
///
/// Aliases are opaque and caller-chosen. They are unique within a single
/// backend instance, there is no uniqueness guarantee across backends.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct KeyAlias(String);

/// Error when constructing a [`KeyAlias`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum KeyAliasError {
    /// The alias was the empty string.
    #[error("key alias must not be empty")]
    Empty,
}

impl KeyAlias {
    /// Creates a new `KeyAlias`.
    ///
    /// Returns an error if the alias is empty.
    pub fn new(alias: impl Into<String>) -> Result<Self, KeyAliasError> {
        let alias = alias.into();
        if alias.is_empty() {
            return Err(KeyAliasError::Empty);
        }
        Ok(Self(alias))
    }

    /// Returns the alias as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the alias and returns the inner `String`.
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl AsRef<str> for KeyAlias {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl FromStr for KeyAlias {
    type Err = KeyAliasError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for KeyAlias {
    type Error = KeyAliasError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<KeyAlias> for String {
    fn from(value: KeyAlias) -> Self {
        value.0
    }
}

impl fmt::Display for KeyAlias {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Descriptor of an asymmetric algorithm family and its parameters.
///
/// Every scheme has a stable numeric id and a stable code name. Not every
/// backend supports every scheme, backends reject unsupported schemes when
/// asked to generate a key.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum SignatureScheme {
    /// RSA PKCS#1 v1.5 signatures over SHA-256.
    RsaSha256,
    /// ECDSA over secp256k1 with SHA-256.
    EcdsaSecp256k1Sha256,
    /// ECDSA over secp256r1 (NIST P-256) with SHA-256.
    EcdsaSecp256r1Sha256,
    /// Ed25519 (EdDSA over Curve25519, SHA-512 internally).
    EddsaEd25519Sha512,
    /// SPHINCS-256 hash-based signatures with SHA-512.
    Sphincs256Sha512,
}

/// Error when parsing a [`SignatureScheme`] from an identifier.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SignatureSchemeError {
    /// Neither a known code name nor a known numeric id.
    #[error("unknown signature scheme: {0}")]
    Unknown(String),
}

impl SignatureScheme {
    const ALL: [SignatureScheme; 5] = [
        SignatureScheme::RsaSha256,
        SignatureScheme::EcdsaSecp256k1Sha256,
        SignatureScheme::EcdsaSecp256r1Sha256,
        SignatureScheme::EddsaEd25519Sha512,
        SignatureScheme::Sphincs256Sha512,
    ];

    /// Returns all known schemes ordered by their numeric id.
    pub fn all() -> &'static [SignatureScheme] {
        &Self::ALL
    }

    /// The stable numeric id of this scheme.
    pub fn id(self) -> u8 {
        match self {
            SignatureScheme::RsaSha256 => 1,
            SignatureScheme::EcdsaSecp256k1Sha256 => 2,
            SignatureScheme::EcdsaSecp256r1Sha256 => 3,
            SignatureScheme::EddsaEd25519Sha512 => 4,
            SignatureScheme::Sphincs256Sha512 => 5,
        }
    }

    /// The stable code name of this scheme.
    pub fn code_name(self) -> &'static str {
        match self {
            SignatureScheme::RsaSha256 => "RSA_SHA256",
            SignatureScheme::EcdsaSecp256k1Sha256 => "ECDSA_SECP256K1_SHA256",
            SignatureScheme::EcdsaSecp256r1Sha256 => "ECDSA_SECP256R1_SHA256",
            SignatureScheme::EddsaEd25519Sha512 => "EDDSA_ED25519_SHA512",
            SignatureScheme::Sphincs256Sha512 => "SPHINCS-256_SHA512",
        }
    }

    /// Looks up a scheme by its numeric id.
    pub fn from_id(id: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|scheme| scheme.id() == id)
    }
}

impl FromStr for SignatureScheme {
    type Err = SignatureSchemeError;

    /// Parses either a code name (case-insensitive) or a numeric id.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if let Ok(id) = trimmed.parse::<u8>() {
            return Self::from_id(id).ok_or_else(|| SignatureSchemeError::Unknown(s.to_owned()));
        }
        Self::ALL
            .into_iter()
            .find(|scheme| scheme.code_name().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| SignatureSchemeError::Unknown(s.to_owned()))
    }
}

impl TryFrom<String> for SignatureScheme {
    type Error = SignatureSchemeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<SignatureScheme> for String {
    fn from(value: SignatureScheme) -> Self {
        value.code_name().to_owned()
    }
}

impl fmt::Display for SignatureScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code_name())
    }
}
