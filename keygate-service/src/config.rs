//! Configuration types and CLI/environment parsing for a keygate gateway.
//!
//! Hosting applications may have a more detailed config and can use the exposed [`KeyGatewayConfig`] and flatten it with `#[clap(flatten)]`.
//!
//! Additionally this module defines the [`Environment`] to assert dev-only code.

use std::{num::NonZeroUsize, time::Duration};

use clap::{Parser, ValueEnum};

/// The environment the gateway is running in.
///
/// Main usage for the `Environment` is to call
/// [`Environment::assert_is_dev`]. Backends that are intended
/// for `dev` only (like the in-memory keystore,...)
/// shall assert that they are called from the `dev` environment.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum Environment {
    /// Production environment.
    Prod,
    /// Development environment.
    Dev,
}

impl Environment {
    /// Asserts that `Environment` is `dev`. Panics if not the case.
    pub fn assert_is_dev(&self) {
        assert!(matches!(self, Environment::Dev), "Is not dev environment")
    }
}

/// The configuration for the key operation gateway.
///
/// It can be configured via environment variables or command line arguments using `clap`.
#[derive(Parser, Debug, Clone)]
pub struct KeyGatewayConfig {
    /// The environment of the gateway (either `prod` or `dev`).
    #[clap(long, env = "KEY_GATEWAY_ENVIRONMENT", default_value = "prod")]
    pub environment: Environment,

    /// Max time a caller waits for a backend operation.
    ///
    /// If not set, calls wait until the backend returns.
    #[clap(
        long,
        env = "KEY_GATEWAY_OPERATION_TIMEOUT",
        value_parser = humantime::parse_duration
    )]
    pub operation_timeout: Option<Duration>,

    /// Number of threads of the worker pool that runs backend operations.
    #[clap(long, env = "KEY_GATEWAY_WORKER_THREADS", default_value = "4")]
    pub worker_threads: NonZeroUsize,

    /// Max number of backend operations that may run at the same time.
    ///
    /// Operations abandoned after a timeout keep their slot until the backend returns.
    #[clap(long, env = "KEY_GATEWAY_MAX_IN_FLIGHT", default_value = "64")]
    pub max_in_flight: NonZeroUsize,
}
