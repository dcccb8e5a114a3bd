//! This module defines the errors a caller of the [`KeyOperationGateway`](crate::KeyOperationGateway) may encounter.
//!
//! Per-call errors ([`GatewayError`]) are kept apart from construction errors ([`GatewayInitError`]).
//! The gateway only normalizes the timeout case. Backend errors are passed through verbatim.

use std::{fmt, time::Duration};

use keygate_types::{SignatureScheme, backend::BackendError};

/// The gateway operations, used for error reporting, logging and metrics labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    /// [`KeyOperationGateway::generate_key_pair`](crate::KeyOperationGateway::generate_key_pair)
    GenerateKeyPair,
    /// [`KeyOperationGateway::contains_key`](crate::KeyOperationGateway::contains_key)
    ContainsKey,
    /// [`KeyOperationGateway::get_public_key`](crate::KeyOperationGateway::get_public_key)
    GetPublicKey,
    /// [`KeyOperationGateway::sign`](crate::KeyOperationGateway::sign)
    Sign,
    /// [`KeyOperationGateway::get_signer`](crate::KeyOperationGateway::get_signer)
    GetSigner,
    /// [`GatewaySigner::sign`](crate::GatewaySigner::sign)
    SignerSign,
    /// [`KeyOperationGateway::default_identity_signature_scheme`](crate::KeyOperationGateway::default_identity_signature_scheme)
    DefaultIdentitySignatureScheme,
    /// [`KeyOperationGateway::default_tls_signature_scheme`](crate::KeyOperationGateway::default_tls_signature_scheme)
    DefaultTlsSignatureScheme,
}

impl Operation {
    /// The name of the operation as used in logs and metrics.
    pub fn as_str(self) -> &'static str {
        match self {
            Operation::GenerateKeyPair => "generate_key_pair",
            Operation::ContainsKey => "contains_key",
            Operation::GetPublicKey => "get_public_key",
            Operation::Sign => "sign",
            Operation::GetSigner => "get_signer",
            Operation::SignerSign => "signer_sign",
            Operation::DefaultIdentitySignatureScheme => "default_identity_signature_scheme",
            Operation::DefaultTlsSignatureScheme => "default_tls_signature_scheme",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// All errors a gateway operation may return.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// The timeout elapsed before the backend primitive completed.
    ///
    /// The primitive may still be running. Callers may retry or escalate.
    #[error("{operation} timed out after {timeout:?}")]
    TimedOut {
        /// The operation that timed out.
        operation: Operation,
        /// The configured timeout.
        timeout: Duration,
    },
    /// The backend primitive failed. The error is the backend's own.
    #[error(transparent)]
    Backend(#[from] BackendError),
    /// The gateway was closed and accepts no more operations.
    #[error("gateway is closed")]
    Closed,
    /// The backend primitive panicked on the worker pool.
    #[error("{operation} panicked in the worker pool")]
    WorkerPanicked {
        /// The operation that panicked.
        operation: Operation,
    },
}

impl GatewayError {
    /// Returns `true` iff this is a [`GatewayError::TimedOut`].
    pub fn is_timeout(&self) -> bool {
        matches!(self, GatewayError::TimedOut { .. })
    }

    /// Returns the backend error, if the backend primitive failed.
    pub fn as_backend(&self) -> Option<&BackendError> {
        match self {
            GatewayError::Backend(err) => Some(err),
            _ => None,
        }
    }
}

/// Errors when constructing a gateway or a backend.
///
/// These fail fast at construction and never surface through the timeout path.
#[derive(Debug, thiserror::Error)]
pub enum GatewayInitError {
    /// A timeout of zero would reject every operation.
    #[error("operation timeout must be greater than zero")]
    ZeroTimeout,
    /// The requested in-flight cap exceeds what the pool can track.
    #[error("max in-flight operations {0} exceeds the supported maximum of {1}")]
    TooManyInFlight(usize, usize),
    /// The worker pool could not be started.
    #[error("cannot start worker pool: {0}")]
    WorkerPool(#[from] std::io::Error),
    /// A backend was configured with a default scheme it cannot use.
    #[error("unsupported default {purpose} scheme {scheme}")]
    UnsupportedDefaultScheme {
        /// What the default is used for (`identity` or `tls`).
        purpose: &'static str,
        /// The rejected scheme.
        scheme: SignatureScheme,
    },
}
