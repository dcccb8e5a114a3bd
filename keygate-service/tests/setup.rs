use std::{num::NonZeroUsize, sync::Arc, time::Duration};

use clap::Parser as _;
use keygate_service::{
    GatewayOptions, KeyCustodyService, KeyOperationGateway,
    config::KeyGatewayConfig,
};
use keygate_test_utils::{
    install_tracing,
    keygate_types::KeyAlias,
    stub_backend::{StubBehavior, StubKeyCustody, StubPrimitive},
};

pub const SHORT_TIMEOUT: Duration = Duration::from_millis(50);
pub const SLOW_BACKEND: Duration = Duration::from_millis(500);
/// Generous bound for "returned near the timeout", CI machines are slow.
pub const TIMEOUT_SLACK: Duration = Duration::from_millis(350);

pub fn alias(name: &str) -> KeyAlias {
    KeyAlias::new(name).expect("valid alias")
}

pub fn gateway(backend: KeyCustodyService, timeout: Option<Duration>) -> KeyOperationGateway {
    install_tracing();
    KeyOperationGateway::new(
        backend,
        GatewayOptions {
            timeout,
            worker_threads: NonZeroUsize::new(2).expect("non zero"),
            max_in_flight: NonZeroUsize::new(16).expect("non zero"),
        },
    )
    .expect("can build gateway")
}

pub fn in_memory_gateway(timeout: &str) -> KeyOperationGateway {
    install_tracing();
    let config = KeyGatewayConfig::parse_from([
        "keygate",
        "--environment",
        "dev",
        "--operation-timeout",
        timeout,
    ]);
    KeyOperationGateway::in_memory(&config).expect("can build gateway")
}

/// A stub with a single key under `alias` whose `primitive` shows `behavior`.
pub fn stub_gateway(
    alias: &KeyAlias,
    primitive: StubPrimitive,
    behavior: StubBehavior,
    timeout: Option<Duration>,
) -> (Arc<StubKeyCustody>, KeyOperationGateway) {
    let stub = Arc::new(StubKeyCustody::new().with(primitive, behavior));
    stub.insert_key(alias);
    let gateway = gateway(stub.clone(), timeout);
    (stub, gateway)
}
