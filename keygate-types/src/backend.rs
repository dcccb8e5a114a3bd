//! The capability contract every key-custody backend must implement.
//!
//! A backend is a concrete key-custody provider (software keystore, HSM,
//! remote signing service). It owns all private key material. Callers never
//! talk to a backend directly, they go through the key operation gateway,
//! which runs each primitive defined here with a bounded wait.
//!
//! Implementations must be `Send + Sync` because the gateway shares a single
//! backend instance between concurrently running operations. The gateway adds
//! no per-alias locking, so concurrent operations on the same alias are the
//! backend's responsibility to serialize or allow.

use std::sync::Arc;

use async_trait::async_trait;

use crate::{
    KeyAlias, SignatureScheme,
    crypto::{PublicKey, Signature},
};

/// Dynamic trait object for a key-custody backend.
///
/// Must be `Send + Sync` so the gateway can move it onto its worker pool.
pub type KeyCustodyService = Arc<dyn KeyCustodyBackend + Send + Sync>;

/// Dynamic trait object for a signing handle returned by [`KeyCustodyBackend::get_signer`].
pub type SigningHandle = Arc<dyn ContentSigner + Send + Sync>;

/// Errors a backend primitive may return.
///
/// The gateway passes these through to callers unchanged.
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    /// No key is stored under the requested alias.
    #[error("cannot find key with alias {0}")]
    KeyNotFound(KeyAlias),
    /// A key is already stored under the requested alias.
    #[error("key with alias {0} already exists")]
    AliasExists(KeyAlias),
    /// The backend cannot generate or use keys of this scheme.
    #[error("unsupported signature scheme {0}")]
    UnsupportedScheme(SignatureScheme),
    /// The backend (or the device/service behind it) could not be reached.
    #[error("backend unreachable: {0}")]
    Unreachable(String),
    /// Any other backend-specific failure.
    #[error(transparent)]
    Internal(#[from] eyre::Report),
}

/// Trait that implementations of key-custody backends must provide.
///
/// Every method is one primitive. The gateway wraps each primitive without
/// adding cryptographic logic of its own, so adding a backend means
/// implementing exactly these methods.
///
/// Primitives may block for a long time (e.g. network I/O to an HSM). Backends
/// that perform blocking calls should move them off the async executor with
/// `tokio::task::spawn_blocking`.
#[async_trait]
pub trait KeyCustodyBackend {
    /// Creates a new key pair of `scheme` under `alias` and returns its public key.
    ///
    /// Shall return [`BackendError::AliasExists`] if the alias is taken and
    /// [`BackendError::UnsupportedScheme`] if the backend cannot generate keys of `scheme`.
    async fn generate_key_pair(
        &self,
        alias: &KeyAlias,
        scheme: SignatureScheme,
    ) -> Result<PublicKey, BackendError>;

    /// Returns `true` iff a key is stored under `alias`.
    async fn contains_key(&self, alias: &KeyAlias) -> Result<bool, BackendError>;

    /// Returns the public key stored under `alias`.
    ///
    /// Shall return [`BackendError::KeyNotFound`] if the alias is absent.
    async fn get_public_key(&self, alias: &KeyAlias) -> Result<PublicKey, BackendError>;

    /// Signs `data` with the private key stored under `alias`.
    ///
    /// The signature uses the canonical format of the key's scheme.
    async fn sign(&self, alias: &KeyAlias, data: &[u8]) -> Result<Signature, BackendError>;

    /// Returns a reusable [`SigningHandle`] bound to the key stored under `alias`.
    ///
    /// Same failure conditions as [`Self::sign`].
    async fn get_signer(&self, alias: &KeyAlias) -> Result<SigningHandle, BackendError>;

    /// The scheme the backend uses for node identity keys.
    async fn default_identity_signature_scheme(&self) -> Result<SignatureScheme, BackendError>;

    /// The scheme the backend uses for TLS keys.
    async fn default_tls_signature_scheme(&self) -> Result<SignatureScheme, BackendError>;
}

/// A capability to sign arbitrary future data with one alias's key.
///
/// Handles never expose the private key. They are created per request and
/// held by the caller until used.
#[async_trait]
pub trait ContentSigner {
    /// The alias this handle is bound to.
    fn alias(&self) -> &KeyAlias;

    /// The public key matching the signatures this handle produces.
    fn public_key(&self) -> &PublicKey;

    /// Signs `data`.
    async fn sign(&self, data: &[u8]) -> Result<Signature, BackendError>;
}
