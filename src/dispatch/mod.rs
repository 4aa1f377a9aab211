//! The single dispatch entry point: look up, validate, admit, execute,
//! report.
//!
//! Concurrency is controlled only at the two designed choke points
//! (rate-controller admission and worker-pool capacity); there is no
//! lock around dispatch itself. Every exit path of [`Dispatcher::invoke`]
//! produces a structured [`InvocationOutcome`]; no raw error escapes to
//! the caller.

pub mod audit;
pub mod idempotency;

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::core::content::InvocationOutcome;
use crate::core::error::ErrorKind;
use crate::core::schema;
use crate::core::tool::JsonMap;
use crate::infra::config::CoreConfig;
use crate::runtime::limits::RateController;
use crate::runtime::pool::WorkerPool;
use crate::tools::registry::ToolRegistry;

use audit::{AuditEvent, AuditSink, TracingAuditSink};
use idempotency::{IdempotencyStore, InMemoryIdempotencyStore};

/// One call, as handed over by the transport layer. Short-lived; owned
/// by the dispatcher for the duration of the invocation.
#[derive(Debug, Clone)]
pub struct InvocationRequest {
    pub tool_name: String,
    pub arguments: JsonMap,
    pub caller_id: String,
    pub idempotency_key: Option<String>,
    pub deadline: Duration,
    /// Transport-level cancellation; handlers receive a child of this
    /// token.
    pub cancel: CancellationToken,
}

impl InvocationRequest {
    pub const DEFAULT_DEADLINE: Duration = Duration::from_secs(30);

    pub fn new(
        tool_name: impl Into<String>,
        arguments: JsonMap,
        caller_id: impl Into<String>,
    ) -> Self {
        Self {
            tool_name: tool_name.into(),
            arguments,
            caller_id: caller_id.into(),
            idempotency_key: None,
            deadline: Self::DEFAULT_DEADLINE,
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = deadline;
        self
    }

    pub fn with_idempotency_key(mut self, key: impl Into<String>) -> Self {
        self.idempotency_key = Some(key.into());
        self
    }

    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }
}

pub struct Dispatcher {
    registry: Arc<ToolRegistry>,
    controller: RateController,
    pool: WorkerPool,
    idempotency: Arc<dyn IdempotencyStore>,
    audit: Arc<dyn AuditSink>,
}

impl Dispatcher {
    pub fn new(registry: Arc<ToolRegistry>, config: CoreConfig) -> Self {
        Self {
            registry,
            controller: RateController::new(config.limits),
            pool: WorkerPool::new(config.pool),
            idempotency: Arc::new(InMemoryIdempotencyStore::new()),
            audit: Arc::new(TracingAuditSink),
        }
    }

    pub fn with_idempotency_store(mut self, store: Arc<dyn IdempotencyStore>) -> Self {
        self.idempotency = store;
        self
    }

    pub fn with_audit_sink(mut self, sink: Arc<dyn AuditSink>) -> Self {
        self.audit = sink;
        self
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    /// Executes one invocation end to end and reports exactly one
    /// outcome. Emits one audit event and one metrics sample per call,
    /// failures included.
    pub async fn invoke(&self, request: InvocationRequest) -> InvocationOutcome {
        let started = std::time::Instant::now();
        let tool_name = request.tool_name.clone();
        let caller_id = request.caller_id.clone();

        let outcome = self.invoke_inner(request).await;

        let duration_ms = started.elapsed().as_millis() as u64;
        let label = if outcome.is_success() { "success" } else { "failure" };
        self.audit.record(&AuditEvent {
            tool_name: tool_name.clone(),
            caller_id,
            duration_ms,
            outcome: label,
            error_kind: outcome.error_kind(),
            at: chrono::Utc::now(),
        });
        metrics::counter!(
            "tool_invocations_total",
            "tool" => tool_name,
            "outcome" => label
        )
        .increment(1);
        metrics::histogram!("tool_invocation_duration_ms").record(duration_ms as f64);

        outcome
    }

    async fn invoke_inner(&self, request: InvocationRequest) -> InvocationOutcome {
        let InvocationRequest {
            tool_name,
            arguments,
            caller_id,
            idempotency_key,
            deadline,
            cancel,
        } = request;

        let Some(entry) = self.registry.lookup(&tool_name) else {
            return InvocationOutcome::failure(
                ErrorKind::UnknownTool,
                format!("unknown tool: {tool_name}"),
            );
        };

        if let Err(violation) = schema::validate(&entry.contract.parameter_schema, &arguments) {
            return InvocationOutcome::failure(ErrorKind::InvalidArguments, violation.to_string());
        }

        // Cached replays never consume capacity, so the store is
        // consulted before admission.
        if let Some(key) = &idempotency_key {
            if let Some(prior) = self.idempotency.get(&tool_name, key).await {
                tracing::debug!(tool = %tool_name, "replaying idempotent result");
                return prior;
            }
        }

        let ticket = match self.controller.admit(&caller_id) {
            Ok(ticket) => ticket,
            Err(rejected) => {
                return InvocationOutcome::failure(
                    ErrorKind::Throttled,
                    format!("{rejected} ({})", rejected.reason()),
                );
            }
        };

        let mut outcome = self
            .pool
            .run(Arc::clone(&entry.handler), arguments, deadline, cancel)
            .await;
        // Ticket held across the run; dropping it here releases the
        // slot on this and every unwinding path.
        drop(ticket);

        if let InvocationOutcome::Failure(f) = &mut outcome {
            if f.kind == ErrorKind::Timeout && entry.contract.declares_side_effects {
                f.message
                    .push_str("; side effects may have partially occurred");
            }
        }

        if outcome.is_success() {
            if let Some(key) = &idempotency_key {
                self.idempotency
                    .put(&tool_name, key, outcome.clone())
                    .await;
            }
        }

        outcome
    }
}
