//! Bounded-concurrency executor for validated, admitted calls.
//!
//! The pool bounds total system concurrency below the per-caller rate
//! controller. A worker slot is a semaphore permit; the permit travels
//! into the spawned handler task so an abandoned (timed-out) handler
//! keeps occupying its slot until it actually finishes.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::core::content::{ContentItem, InvocationOutcome};
use crate::core::error::{ErrorKind, ToolError};
use crate::core::tool::{CallContext, JsonMap, ToolHandler};

#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// Fixed number of worker slots.
    pub workers: usize,
    /// Longest a call waits for a free worker before failing fast.
    pub acquire_wait: Duration,
    /// Window granted to a cancelled handler to observe the signal
    /// before the pool reports `Timeout` and abandons it.
    pub cancel_grace: Duration,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            workers: 16,
            acquire_wait: Duration::from_millis(250),
            cancel_grace: Duration::from_millis(100),
        }
    }
}

pub struct WorkerPool {
    slots: Arc<Semaphore>,
    config: PoolConfig,
}

impl WorkerPool {
    pub fn new(config: PoolConfig) -> Self {
        Self {
            slots: Arc::new(Semaphore::new(config.workers)),
            config,
        }
    }

    pub fn free_workers(&self) -> usize {
        self.slots.available_permits()
    }

    /// Runs one handler under the pool's bounds, enforcing `deadline`.
    ///
    /// Exactly one outcome is reported per call: whichever of handler
    /// completion and deadline expiry comes first wins, and the loser is
    /// discarded. Cancellation is cooperative; a handler that ignores
    /// the token may keep running in the background after `Timeout` has
    /// been reported.
    pub async fn run(
        &self,
        handler: Arc<dyn ToolHandler>,
        arguments: JsonMap,
        deadline: Duration,
        cancel: CancellationToken,
    ) -> InvocationOutcome {
        let permit = match tokio::time::timeout(
            self.config.acquire_wait,
            Arc::clone(&self.slots).acquire_owned(),
        )
        .await
        {
            Ok(Ok(permit)) => permit,
            Ok(Err(_)) => {
                return InvocationOutcome::failure(
                    ErrorKind::InternalError,
                    "worker pool is shut down",
                )
            }
            Err(_) => {
                return InvocationOutcome::failure(
                    ErrorKind::Throttled,
                    "worker pool saturated, try later",
                )
            }
        };

        let child = cancel.child_token();
        let ctx = CallContext::new(child.clone(), Instant::now() + deadline);
        let mut task = tokio::spawn(async move {
            let _slot = permit;
            handler.call(&arguments, &ctx).await
        });

        let expiry = tokio::time::sleep(deadline);
        tokio::pin!(expiry);
        tokio::select! {
            biased;
            joined = &mut task => return outcome_from_join(joined),
            () = &mut expiry => {}
        }

        // Deadline fired first: ask the handler to stop, give it the
        // grace window, then report Timeout either way.
        child.cancel();
        let _ = tokio::time::timeout(self.config.cancel_grace, &mut task).await;
        InvocationOutcome::failure(
            ErrorKind::Timeout,
            format!("handler exceeded deadline of {deadline:?}"),
        )
    }
}

fn outcome_from_join(
    joined: Result<Result<Vec<ContentItem>, ToolError>, tokio::task::JoinError>,
) -> InvocationOutcome {
    match joined {
        Ok(Ok(content)) => InvocationOutcome::success(content),
        Ok(Err(e)) => InvocationOutcome::failure(ErrorKind::InternalError, e.to_string()),
        Err(join_err) if join_err.is_panic() => {
            tracing::error!(error = %join_err, "handler panicked");
            InvocationOutcome::failure(ErrorKind::InternalError, "handler panicked")
        }
        Err(join_err) => {
            InvocationOutcome::failure(ErrorKind::InternalError, join_err.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Sleepy(Duration);

    #[async_trait]
    impl ToolHandler for Sleepy {
        async fn call(
            &self,
            _arguments: &JsonMap,
            _ctx: &CallContext,
        ) -> Result<Vec<ContentItem>, ToolError> {
            tokio::time::sleep(self.0).await;
            Ok(vec![ContentItem::text("slept")])
        }
    }

    struct Panicky;

    #[async_trait]
    impl ToolHandler for Panicky {
        async fn call(
            &self,
            _arguments: &JsonMap,
            _ctx: &CallContext,
        ) -> Result<Vec<ContentItem>, ToolError> {
            panic!("boom");
        }
    }

    struct Cooperative(Arc<AtomicUsize>);

    #[async_trait]
    impl ToolHandler for Cooperative {
        async fn call(
            &self,
            _arguments: &JsonMap,
            ctx: &CallContext,
        ) -> Result<Vec<ContentItem>, ToolError> {
            ctx.cancelled().await;
            self.0.fetch_add(1, Ordering::SeqCst);
            Err(ToolError::Message("cancelled".into()))
        }
    }

    fn pool(workers: usize) -> WorkerPool {
        WorkerPool::new(PoolConfig {
            workers,
            acquire_wait: Duration::from_millis(50),
            cancel_grace: Duration::from_millis(50),
        })
    }

    #[tokio::test]
    async fn fast_handler_completes_before_deadline() {
        let out = pool(2)
            .run(
                Arc::new(Sleepy(Duration::from_millis(5))),
                JsonMap::new(),
                Duration::from_secs(1),
                CancellationToken::new(),
            )
            .await;
        assert!(out.is_success());
    }

    #[tokio::test]
    async fn slow_handler_times_out_near_the_deadline() {
        let started = std::time::Instant::now();
        let out = pool(2)
            .run(
                Arc::new(Sleepy(Duration::from_secs(5))),
                JsonMap::new(),
                Duration::from_millis(50),
                CancellationToken::new(),
            )
            .await;
        assert_eq!(out.error_kind(), Some(ErrorKind::Timeout));
        // Reported near the deadline, not after the handler finishes.
        assert!(started.elapsed() < Duration::from_millis(500));
    }

    #[tokio::test]
    async fn cooperative_handler_observes_cancellation() {
        let observed = Arc::new(AtomicUsize::new(0));
        let out = pool(2)
            .run(
                Arc::new(Cooperative(Arc::clone(&observed))),
                JsonMap::new(),
                Duration::from_millis(20),
                CancellationToken::new(),
            )
            .await;
        assert_eq!(out.error_kind(), Some(ErrorKind::Timeout));
        assert_eq!(observed.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn panicking_handler_becomes_internal_error_and_pool_survives() {
        let p = pool(1);
        let out = p
            .run(
                Arc::new(Panicky),
                JsonMap::new(),
                Duration::from_secs(1),
                CancellationToken::new(),
            )
            .await;
        assert_eq!(out.error_kind(), Some(ErrorKind::InternalError));

        // The slot came back and the pool still serves calls.
        assert_eq!(p.free_workers(), 1);
        let out = p
            .run(
                Arc::new(Sleepy(Duration::from_millis(1))),
                JsonMap::new(),
                Duration::from_secs(1),
                CancellationToken::new(),
            )
            .await;
        assert!(out.is_success());
    }

    #[tokio::test]
    async fn saturated_pool_fails_fast() {
        let p = Arc::new(pool(1));
        let busy = {
            let p = Arc::clone(&p);
            tokio::spawn(async move {
                p.run(
                    Arc::new(Sleepy(Duration::from_millis(300))),
                    JsonMap::new(),
                    Duration::from_secs(1),
                    CancellationToken::new(),
                )
                .await
            })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;

        let out = p
            .run(
                Arc::new(Sleepy(Duration::from_millis(1))),
                JsonMap::new(),
                Duration::from_secs(1),
                CancellationToken::new(),
            )
            .await;
        assert_eq!(out.error_kind(), Some(ErrorKind::Throttled));
        assert!(busy.await.unwrap().is_success());
    }
}
