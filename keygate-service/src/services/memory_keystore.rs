//! This module provides [`InMemoryKeyStore`], a software key-custody backend that holds private keys in process memory.
//! Access is synchronized via a `RwLock` and wrapped in an `Arc` for thread-safe shared ownership.
//!
//! Intended for development and tests. Keys are lost when the process exits.
//!
//! Supported schemes:
//! * `EDDSA_ED25519_SHA512` (default identity scheme)
//! * `ECDSA_SECP256K1_SHA256` (default TLS scheme)

use std::{
    collections::{HashMap, hash_map::Entry},
    fmt,
    sync::Arc,
};

use async_trait::async_trait;
use keygate_types::{
    KeyAlias, SignatureScheme,
    backend::{BackendError, ContentSigner, KeyCustodyBackend, SigningHandle},
    crypto::{PublicKey, Signature},
};
use parking_lot::RwLock;
use rand::rngs::OsRng;
use tracing::instrument;

use crate::errors::GatewayInitError;

/// Private key material of one alias. Both key types zeroize on drop.
enum KeyEntry {
    Ed25519(ed25519_dalek::SigningKey),
    Secp256k1(k256::ecdsa::SigningKey),
}

impl KeyEntry {
    fn generate(scheme: SignatureScheme) -> Result<Self, BackendError> {
        match scheme {
            SignatureScheme::EddsaEd25519Sha512 => Ok(KeyEntry::Ed25519(
                ed25519_dalek::SigningKey::generate(&mut OsRng),
            )),
            SignatureScheme::EcdsaSecp256k1Sha256 => Ok(KeyEntry::Secp256k1(
                k256::ecdsa::SigningKey::random(&mut OsRng),
            )),
            scheme => Err(BackendError::UnsupportedScheme(scheme)),
        }
    }

    fn public_key(&self) -> PublicKey {
        match self {
            KeyEntry::Ed25519(signing_key) => PublicKey::from(signing_key.verifying_key()),
            KeyEntry::Secp256k1(signing_key) => PublicKey::from(*signing_key.verifying_key()),
        }
    }

    fn sign(&self, data: &[u8]) -> Signature {
        match self {
            KeyEntry::Ed25519(signing_key) => {
                use ed25519_dalek::Signer as _;
                Signature::from(signing_key.sign(data))
            }
            KeyEntry::Secp256k1(signing_key) => {
                use k256::ecdsa::signature::Signer as _;
                let signature: k256::ecdsa::Signature = signing_key.sign(data);
                Signature::from(signature)
            }
        }
    }
}

/// Returns `true` iff the in-memory keystore can generate and use keys of `scheme`.
pub fn is_supported(scheme: SignatureScheme) -> bool {
    matches!(
        scheme,
        SignatureScheme::EddsaEd25519Sha512 | SignatureScheme::EcdsaSecp256k1Sha256
    )
}

/// A software keystore holding private keys in memory.
#[derive(Clone)]
pub struct InMemoryKeyStore {
    keys: Arc<RwLock<HashMap<KeyAlias, Arc<KeyEntry>>>>,
    identity_scheme: SignatureScheme,
    tls_scheme: SignatureScheme,
}

impl Default for InMemoryKeyStore {
    fn default() -> Self {
        Self {
            keys: Arc::default(),
            identity_scheme: SignatureScheme::EddsaEd25519Sha512,
            tls_scheme: SignatureScheme::EcdsaSecp256k1Sha256,
        }
    }
}

impl InMemoryKeyStore {
    /// Creates an empty keystore with Ed25519 identity keys and secp256k1 TLS keys.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty keystore with the provided default schemes.
    ///
    /// Returns an error if the keystore does not support one of the schemes.
    pub fn with_default_schemes(
        identity_scheme: SignatureScheme,
        tls_scheme: SignatureScheme,
    ) -> Result<Self, GatewayInitError> {
        if !is_supported(identity_scheme) {
            return Err(GatewayInitError::UnsupportedDefaultScheme {
                purpose: "identity",
                scheme: identity_scheme,
            });
        }
        if !is_supported(tls_scheme) {
            return Err(GatewayInitError::UnsupportedDefaultScheme {
                purpose: "tls",
                scheme: tls_scheme,
            });
        }
        Ok(Self {
            identity_scheme,
            tls_scheme,
            ..Self::default()
        })
    }

    /// Returns the amount of stored keys.
    ///
    /// _Note_ that this acquires a lock internally and returns the length at that point in time.
    pub fn len(&self) -> usize {
        self.keys.read().len()
    }

    /// Returns `true` iff the store holds no keys.
    ///
    /// _Note_ that this acquires a lock internally and returns the result from that point in time.
    pub fn is_empty(&self) -> bool {
        self.keys.read().is_empty()
    }

    fn get(&self, alias: &KeyAlias) -> Result<Arc<KeyEntry>, BackendError> {
        self.keys
            .read()
            .get(alias)
            .cloned()
            .ok_or_else(|| BackendError::KeyNotFound(alias.clone()))
    }
}

#[async_trait]
impl KeyCustodyBackend for InMemoryKeyStore {
    #[instrument(level = "debug", skip(self))]
    async fn generate_key_pair(
        &self,
        alias: &KeyAlias,
        scheme: SignatureScheme,
    ) -> Result<PublicKey, BackendError> {
        let entry = KeyEntry::generate(scheme)?;
        let public_key = entry.public_key();
        match self.keys.write().entry(alias.clone()) {
            Entry::Occupied(_) => return Err(BackendError::AliasExists(alias.clone())),
            Entry::Vacant(vacant) => {
                vacant.insert(Arc::new(entry));
            }
        }
        tracing::debug!("generated {scheme} key for {alias}");
        Ok(public_key)
    }

    async fn contains_key(&self, alias: &KeyAlias) -> Result<bool, BackendError> {
        Ok(self.keys.read().contains_key(alias))
    }

    async fn get_public_key(&self, alias: &KeyAlias) -> Result<PublicKey, BackendError> {
        Ok(self.get(alias)?.public_key())
    }

    #[instrument(level = "debug", skip(self, data))]
    async fn sign(&self, alias: &KeyAlias, data: &[u8]) -> Result<Signature, BackendError> {
        Ok(self.get(alias)?.sign(data))
    }

    async fn get_signer(&self, alias: &KeyAlias) -> Result<SigningHandle, BackendError> {
        let entry = self.get(alias)?;
        Ok(Arc::new(InMemorySigner {
            alias: alias.clone(),
            public_key: entry.public_key(),
            entry,
        }))
    }

    async fn default_identity_signature_scheme(&self) -> Result<SignatureScheme, BackendError> {
        Ok(self.identity_scheme)
    }

    async fn default_tls_signature_scheme(&self) -> Result<SignatureScheme, BackendError> {
        Ok(self.tls_scheme)
    }
}

/// Signing handle of the [`InMemoryKeyStore`]. Doesn't implement `Clone` to not accidentally spread key material.
struct InMemorySigner {
    alias: KeyAlias,
    public_key: PublicKey,
    entry: Arc<KeyEntry>,
}

#[async_trait]
impl ContentSigner for InMemorySigner {
    fn alias(&self) -> &KeyAlias {
        &self.alias
    }

    fn public_key(&self) -> &PublicKey {
        &self.public_key
    }

    async fn sign(&self, data: &[u8]) -> Result<Signature, BackendError> {
        Ok(self.entry.sign(data))
    }
}

impl fmt::Debug for InMemoryKeyStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InMemoryKeyStore")
            .field("keys", &self.len())
            .field("identity_scheme", &self.identity_scheme)
            .field("tls_scheme", &self.tls_scheme)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alias(name: &str) -> KeyAlias {
        KeyAlias::new(name).expect("valid alias")
    }

    #[tokio::test]
    async fn generate_then_sign_and_verify() {
        let store = InMemoryKeyStore::new();
        for (name, scheme) in [
            ("ed", SignatureScheme::EddsaEd25519Sha512),
            ("k1", SignatureScheme::EcdsaSecp256k1Sha256),
        ] {
            let alias = alias(name);
            assert!(!store.contains_key(&alias).await.expect("works"));
            let public_key = store
                .generate_key_pair(&alias, scheme)
                .await
                .expect("can generate");
            assert_eq!(public_key.scheme(), scheme);
            assert!(store.contains_key(&alias).await.expect("works"));
            assert_eq!(
                store.get_public_key(&alias).await.expect("exists"),
                public_key
            );
            let signature = store.sign(&alias, b"payload").await.expect("can sign");
            public_key
                .verify(b"payload", &signature)
                .expect("valid signature");
        }
        assert_eq!(store.len(), 2);
    }

    #[tokio::test]
    async fn duplicate_alias_is_rejected() {
        let store = InMemoryKeyStore::new();
        let alias = alias("dup");
        let first = store
            .generate_key_pair(&alias, SignatureScheme::EddsaEd25519Sha512)
            .await
            .expect("can generate");
        let err = store
            .generate_key_pair(&alias, SignatureScheme::EcdsaSecp256k1Sha256)
            .await
            .expect_err("alias taken");
        assert!(matches!(err, BackendError::AliasExists(a) if a == alias));
        // the original key is untouched
        assert_eq!(store.get_public_key(&alias).await.expect("exists"), first);
    }

    #[tokio::test]
    async fn unsupported_scheme_is_rejected() {
        let store = InMemoryKeyStore::new();
        let alias = alias("rsa");
        let err = store
            .generate_key_pair(&alias, SignatureScheme::RsaSha256)
            .await
            .expect_err("unsupported");
        assert!(matches!(
            err,
            BackendError::UnsupportedScheme(SignatureScheme::RsaSha256)
        ));
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn unknown_alias_is_not_found() {
        let store = InMemoryKeyStore::new();
        let alias = alias("missing");
        assert!(matches!(
            store.get_public_key(&alias).await,
            Err(BackendError::KeyNotFound(_))
        ));
        assert!(matches!(
            store.sign(&alias, b"data").await,
            Err(BackendError::KeyNotFound(_))
        ));
        assert!(matches!(
            store.get_signer(&alias).await,
            Err(BackendError::KeyNotFound(_))
        ));
    }

    #[tokio::test]
    async fn signer_handle_signs_for_alias() {
        let store = InMemoryKeyStore::new();
        let alias = alias("handle");
        let public_key = store
            .generate_key_pair(&alias, SignatureScheme::EcdsaSecp256k1Sha256)
            .await
            .expect("can generate");
        let signer = store.get_signer(&alias).await.expect("exists");
        assert_eq!(signer.alias(), &alias);
        assert_eq!(signer.public_key(), &public_key);
        for data in [b"first".as_slice(), b"second".as_slice()] {
            let signature = signer.sign(data).await.expect("can sign");
            public_key.verify(data, &signature).expect("valid");
        }
    }

    #[test]
    fn rejects_unsupported_default_scheme() {
        let err = InMemoryKeyStore::with_default_schemes(
            SignatureScheme::Sphincs256Sha512,
            SignatureScheme::EcdsaSecp256k1Sha256,
        )
        .expect_err("unsupported");
        assert!(matches!(
            err,
            GatewayInitError::UnsupportedDefaultScheme {
                purpose: "identity",
                scheme: SignatureScheme::Sphincs256Sha512
            }
        ));
    }

    #[tokio::test]
    async fn reports_configured_default_schemes() {
        let store = InMemoryKeyStore::with_default_schemes(
            SignatureScheme::EcdsaSecp256k1Sha256,
            SignatureScheme::EddsaEd25519Sha512,
        )
        .expect("supported");
        assert_eq!(
            store.default_identity_signature_scheme().await.expect("works"),
            SignatureScheme::EcdsaSecp256k1Sha256
        );
        assert_eq!(
            store.default_tls_signature_scheme().await.expect("works"),
            SignatureScheme::EddsaEd25519Sha512
        );
    }

    #[test]
    fn debug_does_not_leak_keys() {
        let store = InMemoryKeyStore::new();
        let debug_str = format!("{store:?}");
        assert!(debug_str.contains("InMemoryKeyStore"));
        assert!(debug_str.contains("keys: 0"));
    }
}
