//! This module provides the [`WorkerPool`], the bounded-wait execution path every gateway operation runs on.
//!
//! The pool is a dedicated multi-threaded tokio runtime plus a semaphore that caps the number of
//! backend primitives running at the same time. Callers wait for a submitted primitive at most the
//! configured timeout. When the timeout elapses first, the caller gets [`GatewayError::TimedOut`] and the
//! primitive keeps running on the pool until it returns. Its result is discarded.
//!
//! An abandoned primitive keeps its semaphore slot until it returns. A backend that hangs forever
//! therefore eventually exhausts the pool, and further calls time out while waiting for a slot instead
//! of piling up more abandoned work.

use std::{
    future::Future,
    sync::{
        Arc,
        atomic::{AtomicU8, AtomicUsize, Ordering},
    },
    time::{Duration, Instant},
};

use keygate_types::backend::BackendError;
use parking_lot::Mutex;
use tokio::{
    runtime::{Handle, Runtime},
    sync::{OwnedSemaphorePermit, Semaphore},
};
use tokio_util::sync::CancellationToken;

use crate::{
    GatewayOptions,
    errors::{GatewayError, GatewayInitError, Operation},
    metrics::{
        METRICS_ATTRID_OPERATION, METRICS_ID_GATEWAY_ABANDONED, METRICS_ID_GATEWAY_IN_FLIGHT,
        METRICS_ID_GATEWAY_OP_DURATION, METRICS_ID_GATEWAY_OP_FAILED, METRICS_ID_GATEWAY_OP_START,
        METRICS_ID_GATEWAY_OP_SUCCESS, METRICS_ID_GATEWAY_OP_TIMEOUT,
    },
};

const TASK_PENDING: u8 = 0;
const TASK_RUNNING: u8 = 1;
const TASK_ABANDONED: u8 = 2;
const TASK_FINISHED: u8 = 3;

/// Runs backend primitives with a bounded wait. Cheap to clone, all clones share the same pool.
#[derive(Clone)]
pub(crate) struct WorkerPool(Arc<WorkerPoolInner>);

struct WorkerPoolInner {
    runtime: Mutex<Option<Runtime>>,
    handle: Handle,
    permits: Arc<Semaphore>,
    max_in_flight: usize,
    timeout: Option<Duration>,
    abandoned: Arc<AtomicUsize>,
    cancellation_token: CancellationToken,
}

/// Lifecycle of one submitted primitive: pending -> running -> {finished, abandoned -> finished}.
///
/// Keeps the pool-wide count of abandoned primitives in sync with the transitions.
struct TaskState {
    phase: AtomicU8,
    abandoned: Arc<AtomicUsize>,
}

impl TaskState {
    fn new(abandoned: Arc<AtomicUsize>) -> Self {
        Self {
            phase: AtomicU8::new(TASK_PENDING),
            abandoned,
        }
    }

    fn mark_running(&self) {
        self.phase.store(TASK_RUNNING, Ordering::Release);
    }

    /// Returns `true` if the task was running and is now marked as abandoned.
    fn abandon(&self) -> bool {
        let abandoned = self
            .phase
            .compare_exchange(
                TASK_RUNNING,
                TASK_ABANDONED,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok();
        if abandoned {
            self.abandoned.fetch_add(1, Ordering::AcqRel);
            ::metrics::gauge!(METRICS_ID_GATEWAY_ABANDONED).increment(1);
        }
        abandoned
    }

    /// Returns `true` if the caller abandoned the task before it finished.
    fn finish(&self) -> bool {
        let was_abandoned = self.phase.swap(TASK_FINISHED, Ordering::AcqRel) == TASK_ABANDONED;
        if was_abandoned {
            self.abandoned.fetch_sub(1, Ordering::AcqRel);
            ::metrics::gauge!(METRICS_ID_GATEWAY_ABANDONED).decrement(1);
        }
        was_abandoned
    }
}

/// Held by the waiting caller. If the caller stops waiting while the primitive still runs (own timeout, or the
/// caller's future was dropped from outside), the primitive is marked as abandoned.
struct WaitGuard {
    operation: Operation,
    state: Arc<TaskState>,
}

impl Drop for WaitGuard {
    fn drop(&mut self) {
        if self.state.abandon() {
            tracing::debug!("caller stopped waiting for {}, backend call keeps running", self.operation);
        }
    }
}

/// A guard for a running primitive.
///
/// Lives inside the spawned task. On drop (task returned, panicked, or was dropped during shutdown) frees the pool slot.
struct InFlightGuard {
    operation: Operation,
    state: Arc<TaskState>,
    _permit: OwnedSemaphorePermit,
}

impl InFlightGuard {
    fn new(operation: Operation, state: Arc<TaskState>, permit: OwnedSemaphorePermit) -> Self {
        state.mark_running();
        ::metrics::gauge!(METRICS_ID_GATEWAY_IN_FLIGHT).increment(1);
        Self {
            operation,
            state,
            _permit: permit,
        }
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        ::metrics::gauge!(METRICS_ID_GATEWAY_IN_FLIGHT).decrement(1);
        if self.state.finish() {
            tracing::debug!("abandoned {} finished in background", self.operation);
        }
    }
}

impl WorkerPool {
    /// Starts the worker threads of the pool.
    pub(crate) fn new(options: &GatewayOptions) -> Result<Self, GatewayInitError> {
        if options.timeout.is_some_and(|timeout| timeout.is_zero()) {
            return Err(GatewayInitError::ZeroTimeout);
        }
        let max_in_flight = options.max_in_flight.get();
        if max_in_flight > Semaphore::MAX_PERMITS {
            return Err(GatewayInitError::TooManyInFlight(
                max_in_flight,
                Semaphore::MAX_PERMITS,
            ));
        }
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(options.worker_threads.get())
            .thread_name("keygate-worker")
            .enable_all()
            .build()?;
        tracing::info!(
            "started worker pool with {} threads, max in-flight {max_in_flight}, timeout {:?}",
            options.worker_threads,
            options.timeout
        );
        Ok(Self(Arc::new(WorkerPoolInner {
            handle: runtime.handle().clone(),
            runtime: Mutex::new(Some(runtime)),
            permits: Arc::new(Semaphore::new(max_in_flight)),
            max_in_flight,
            timeout: options.timeout,
            abandoned: Arc::new(AtomicUsize::new(0)),
            cancellation_token: CancellationToken::new(),
        })))
    }

    /// The configured timeout, `None` if callers wait until the backend returns.
    pub(crate) fn timeout(&self) -> Option<Duration> {
        self.0.timeout
    }

    /// Number of primitives currently running, including abandoned ones.
    pub(crate) fn in_flight(&self) -> usize {
        self.0.max_in_flight - self.0.permits.available_permits()
    }

    /// Number of primitives still running after their caller stopped waiting.
    pub(crate) fn abandoned(&self) -> usize {
        self.0.abandoned.load(Ordering::Acquire)
    }

    /// Returns `true` iff [`Self::close`] was called.
    pub(crate) fn is_closed(&self) -> bool {
        self.0.cancellation_token.is_cancelled()
    }

    /// Stops accepting submissions and shuts the worker threads down in the background.
    ///
    /// Running primitives are abandoned. Calling this more than once is a no-op.
    pub(crate) fn close(&self) {
        self.0.cancellation_token.cancel();
        self.0.permits.close();
        let runtime = self.0.runtime.lock().take();
        if let Some(runtime) = runtime {
            tracing::info!("shutting down worker pool, {} in flight", self.in_flight());
            runtime.shutdown_background();
        }
    }

    /// Runs `task` on the pool and waits for it at most the configured timeout.
    ///
    /// The result or error of `task` is returned unchanged. If the timeout elapses first, returns
    /// [`GatewayError::TimedOut`] and leaves `task` running to completion in the background.
    pub(crate) async fn submit<T, F>(&self, operation: Operation, task: F) -> Result<T, GatewayError>
    where
        T: Send + 'static,
        F: Future<Output = Result<T, BackendError>> + Send + 'static,
    {
        if self.is_closed() {
            return Err(GatewayError::Closed);
        }
        ::metrics::counter!(METRICS_ID_GATEWAY_OP_START, METRICS_ATTRID_OPERATION => operation.as_str())
            .increment(1);
        let start = Instant::now();
        let state = Arc::new(TaskState::new(Arc::clone(&self.0.abandoned)));
        let _waiting = WaitGuard {
            operation,
            state: Arc::clone(&state),
        };
        let dispatch = self.dispatch(operation, state, task);
        let result = match self.0.timeout {
            Some(timeout) => match tokio::time::timeout(timeout, dispatch).await {
                Ok(result) => result,
                Err(_) => {
                    tracing::warn!("{operation} timed out after {timeout:?}, abandoning backend call");
                    Err(GatewayError::TimedOut { operation, timeout })
                }
            },
            None => dispatch.await,
        };
        ::metrics::histogram!(METRICS_ID_GATEWAY_OP_DURATION, METRICS_ATTRID_OPERATION => operation.as_str())
            .record(start.elapsed().as_millis() as f64);
        match &result {
            Ok(_) => {
                ::metrics::counter!(METRICS_ID_GATEWAY_OP_SUCCESS, METRICS_ATTRID_OPERATION => operation.as_str())
                    .increment(1);
            }
            Err(GatewayError::TimedOut { .. }) => {
                ::metrics::counter!(METRICS_ID_GATEWAY_OP_TIMEOUT, METRICS_ATTRID_OPERATION => operation.as_str())
                    .increment(1);
            }
            Err(err) => {
                tracing::debug!("{operation} failed: {err}");
                ::metrics::counter!(METRICS_ID_GATEWAY_OP_FAILED, METRICS_ATTRID_OPERATION => operation.as_str())
                    .increment(1);
            }
        }
        result
    }

    async fn dispatch<T, F>(
        &self,
        operation: Operation,
        state: Arc<TaskState>,
        task: F,
    ) -> Result<T, GatewayError>
    where
        T: Send + 'static,
        F: Future<Output = Result<T, BackendError>> + Send + 'static,
    {
        // fails only if the semaphore was closed
        let permit = Arc::clone(&self.0.permits)
            .acquire_owned()
            .await
            .map_err(|_| GatewayError::Closed)?;
        let guard = InFlightGuard::new(operation, state, permit);
        let join_handle = self.0.handle.spawn(async move {
            let result = task.await;
            drop(guard);
            result
        });
        // dropping the join handle (on timeout) detaches the task, it keeps running
        match join_handle.await {
            Ok(result) => Ok(result?),
            Err(err) if err.is_panic() => {
                tracing::error!("{operation} panicked in worker pool");
                Err(GatewayError::WorkerPanicked { operation })
            }
            Err(_) => Err(GatewayError::Closed),
        }
    }
}

impl Drop for WorkerPoolInner {
    fn drop(&mut self) {
        // dropping a runtime from within an async context panics
        if let Some(runtime) = self.runtime.get_mut().take() {
            runtime.shutdown_background();
        }
    }
}
