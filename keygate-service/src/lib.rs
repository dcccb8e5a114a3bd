#![deny(missing_docs)]
//! This crate provides the key operation gateway of keygate.
//!
//! The gateway is a uniform dispatch layer in front of interchangeable key-custody backends (software keystores, HSMs,
//! remote signing services). Backends implement the [`KeyCustodyBackend`] trait. The main entry point for callers is the
//! [`KeyOperationGateway`], which composes any backend and runs each of its primitives on a dedicated worker pool with a
//! caller-configurable timeout.
//!
//! The gateway itself performs no cryptographic logic. Every public operation is a thin wrapper around exactly one
//! backend primitive:
//! 1) The primitive is submitted to the worker pool.
//! 2) The caller waits at most the configured timeout.
//!    - If the primitive completes in time, its result or error is returned unchanged.
//!    - If the timeout elapses first, the caller gets [`GatewayError::TimedOut`]. The primitive is **not** cancelled, it
//!      keeps running in the background and its result is discarded. Some backend calls (e.g. blocking network I/O to an
//!      HSM) cannot be safely interrupted.
//!    - Without a timeout, the caller waits until the primitive returns.
//!
//! The pool caps the number of primitives running at the same time (see [`GatewayOptions::max_in_flight`]). Abandoned
//! primitives keep their slot until they return.
//!
//! Callers should call [`KeyOperationGateway::close`] when shutting down. Afterwards, all operations fail with
//! [`GatewayError::Closed`].

use std::{num::NonZeroUsize, sync::Arc, time::Duration};

use keygate_types::{
    KeyAlias, SignatureScheme,
    crypto::{PublicKey, Signature},
};
use tracing::instrument;

use crate::{
    config::KeyGatewayConfig,
    errors::Operation,
    services::{memory_keystore::InMemoryKeyStore, worker_pool::WorkerPool},
};

pub mod config;
pub mod errors;
pub mod metrics;
pub(crate) mod services;

pub use errors::{GatewayError, GatewayInitError};
pub use keygate_types::backend::{
    BackendError, ContentSigner, KeyCustodyBackend, KeyCustodyService, SigningHandle,
};
pub use services::memory_keystore;

const DEFAULT_WORKER_THREADS: NonZeroUsize = NonZeroUsize::new(4).expect("4 is not zero");
const DEFAULT_MAX_IN_FLIGHT: NonZeroUsize = NonZeroUsize::new(64).expect("64 is not zero");

/// Options for the worker pool of a [`KeyOperationGateway`].
#[derive(Debug, Clone)]
pub struct GatewayOptions {
    /// Max time a caller waits for a backend primitive. `None` waits until the primitive returns.
    pub timeout: Option<Duration>,
    /// Number of threads running backend primitives.
    pub worker_threads: NonZeroUsize,
    /// Max number of backend primitives running at the same time, including abandoned ones.
    pub max_in_flight: NonZeroUsize,
}

impl Default for GatewayOptions {
    fn default() -> Self {
        Self {
            timeout: None,
            worker_threads: DEFAULT_WORKER_THREADS,
            max_in_flight: DEFAULT_MAX_IN_FLIGHT,
        }
    }
}

impl From<&KeyGatewayConfig> for GatewayOptions {
    fn from(config: &KeyGatewayConfig) -> Self {
        Self {
            timeout: config.operation_timeout,
            worker_threads: config.worker_threads,
            max_in_flight: config.max_in_flight,
        }
    }
}

/// Dispatches key operations to a [`KeyCustodyBackend`] with a bounded wait.
///
/// Owns no key state, only the worker pool and the timeout configuration.
/// Multiple operations may run concurrently against the same backend. The gateway adds no per-alias locking.
pub struct KeyOperationGateway {
    backend: KeyCustodyService,
    pool: WorkerPool,
}

impl KeyOperationGateway {
    /// Creates a gateway in front of `backend` and starts its worker pool.
    ///
    /// # Errors
    ///
    /// Returns an error if the options are invalid or the worker threads cannot be started.
    pub fn new(
        backend: KeyCustodyService,
        options: GatewayOptions,
    ) -> Result<Self, GatewayInitError> {
        tracing::info!("init key operation gateway..");
        crate::metrics::describe_metrics();
        let pool = WorkerPool::new(&options)?;
        Ok(Self { backend, pool })
    }

    /// Creates a gateway in front of `backend` with the pool options from the [`KeyGatewayConfig`].
    pub fn from_config(
        config: &KeyGatewayConfig,
        backend: KeyCustodyService,
    ) -> Result<Self, GatewayInitError> {
        Self::new(backend, GatewayOptions::from(config))
    }

    /// Creates a gateway in front of a fresh [`InMemoryKeyStore`].
    ///
    /// # Panics
    ///
    /// - If the config's environment is not `dev`.
    pub fn in_memory(config: &KeyGatewayConfig) -> Result<Self, GatewayInitError> {
        config.environment.assert_is_dev();
        tracing::info!("using in-memory keystore");
        Self::from_config(config, Arc::new(InMemoryKeyStore::new()))
    }

    /// Creates a new key pair of `scheme` under `alias` and returns its public key.
    ///
    /// Fails with [`BackendError::AliasExists`] or [`BackendError::UnsupportedScheme`] (backend-defined).
    #[instrument(level = "debug", skip(self))]
    pub async fn generate_key_pair(
        &self,
        alias: &KeyAlias,
        scheme: SignatureScheme,
    ) -> Result<PublicKey, GatewayError> {
        let backend = Arc::clone(&self.backend);
        let alias = alias.clone();
        self.pool
            .submit(Operation::GenerateKeyPair, async move {
                backend.generate_key_pair(&alias, scheme).await
            })
            .await
    }

    /// Returns `true` iff the backend stores a key under `alias`.
    #[instrument(level = "debug", skip(self))]
    pub async fn contains_key(&self, alias: &KeyAlias) -> Result<bool, GatewayError> {
        let backend = Arc::clone(&self.backend);
        let alias = alias.clone();
        self.pool
            .submit(Operation::ContainsKey, async move {
                backend.contains_key(&alias).await
            })
            .await
    }

    /// Returns the public key stored under `alias`.
    ///
    /// Fails with [`BackendError::KeyNotFound`] (backend-defined) if the alias is absent.
    #[instrument(level = "debug", skip(self))]
    pub async fn get_public_key(&self, alias: &KeyAlias) -> Result<PublicKey, GatewayError> {
        let backend = Arc::clone(&self.backend);
        let alias = alias.clone();
        self.pool
            .submit(Operation::GetPublicKey, async move {
                backend.get_public_key(&alias).await
            })
            .await
    }

    /// Signs `data` with the private key stored under `alias`.
    #[instrument(level = "debug", skip(self, data), fields(data_len = data.len()))]
    pub async fn sign(&self, alias: &KeyAlias, data: &[u8]) -> Result<Signature, GatewayError> {
        let backend = Arc::clone(&self.backend);
        let alias = alias.clone();
        let data = data.to_vec();
        self.pool
            .submit(Operation::Sign, async move {
                backend.sign(&alias, &data).await
            })
            .await
    }

    /// Returns a reusable signer bound to the key stored under `alias`.
    ///
    /// Signing with the returned [`GatewaySigner`] runs on the same worker pool with the same timeout.
    #[instrument(level = "debug", skip(self))]
    pub async fn get_signer(&self, alias: &KeyAlias) -> Result<GatewaySigner, GatewayError> {
        let backend = Arc::clone(&self.backend);
        let alias = alias.clone();
        let handle = self
            .pool
            .submit(Operation::GetSigner, async move {
                backend.get_signer(&alias).await
            })
            .await?;
        Ok(GatewaySigner {
            handle,
            pool: self.pool.clone(),
        })
    }

    /// The scheme the backend uses for node identity keys.
    #[instrument(level = "debug", skip(self))]
    pub async fn default_identity_signature_scheme(&self) -> Result<SignatureScheme, GatewayError> {
        let backend = Arc::clone(&self.backend);
        self.pool
            .submit(Operation::DefaultIdentitySignatureScheme, async move {
                backend.default_identity_signature_scheme().await
            })
            .await
    }

    /// The scheme the backend uses for TLS keys.
    #[instrument(level = "debug", skip(self))]
    pub async fn default_tls_signature_scheme(&self) -> Result<SignatureScheme, GatewayError> {
        let backend = Arc::clone(&self.backend);
        self.pool
            .submit(Operation::DefaultTlsSignatureScheme, async move {
                backend.default_tls_signature_scheme().await
            })
            .await
    }

    /// The configured timeout, `None` if callers wait until the backend returns.
    pub fn timeout(&self) -> Option<Duration> {
        self.pool.timeout()
    }

    /// Number of backend primitives currently running, including primitives whose caller timed out.
    pub fn in_flight(&self) -> usize {
        self.pool.in_flight()
    }

    /// Number of backend primitives still running after their caller stopped waiting.
    pub fn abandoned(&self) -> usize {
        self.pool.abandoned()
    }

    /// Returns `true` iff [`Self::close`] was called.
    pub fn is_closed(&self) -> bool {
        self.pool.is_closed()
    }

    /// Closes the gateway.
    ///
    /// No new operations are accepted, they fail with [`GatewayError::Closed`]. Running primitives are abandoned.
    /// This also applies to all [`GatewaySigner`]s obtained from this gateway. Calling this more than once is a no-op.
    pub fn close(&self) {
        self.pool.close();
    }
}

/// A reusable signer bound to one alias, obtained from [`KeyOperationGateway::get_signer`].
///
/// Wraps the backend's [`SigningHandle`] and routes every signature through the gateway's worker pool.
pub struct GatewaySigner {
    handle: SigningHandle,
    pool: WorkerPool,
}

impl GatewaySigner {
    /// The alias this signer is bound to.
    pub fn alias(&self) -> &KeyAlias {
        self.handle.alias()
    }

    /// The public key matching the signatures of this signer.
    pub fn public_key(&self) -> &PublicKey {
        self.handle.public_key()
    }

    /// The [`SignatureScheme`] of the bound key.
    pub fn scheme(&self) -> SignatureScheme {
        self.handle.public_key().scheme()
    }

    /// Signs `data` with the bound key.
    #[instrument(level = "debug", skip_all, fields(alias = %self.alias(), data_len = data.len()))]
    pub async fn sign(&self, data: &[u8]) -> Result<Signature, GatewayError> {
        let handle = Arc::clone(&self.handle);
        let data = data.to_vec();
        self.pool
            .submit(Operation::SignerSign, async move { handle.sign(&data).await })
            .await
    }
}

impl std::fmt::Debug for GatewaySigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewaySigner")
            .field("alias", self.alias())
            .field("public_key", self.public_key())
            .finish_non_exhaustive()
    }
}

impl std::fmt::Debug for KeyOperationGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyOperationGateway")
            .field("timeout", &self.timeout())
            .field("in_flight", &self.in_flight())
            .field("abandoned", &self.abandoned())
            .field("closed", &self.is_closed())
            .finish_non_exhaustive()
    }
}
