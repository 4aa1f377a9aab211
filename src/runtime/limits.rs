//! Admission control: per-caller concurrency caps and a token-bucket
//! rate window. Admission never blocks or queues; callers get an
//! immediate grant or an immediate rejection with try-later semantics.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;

use thiserror::Error;

#[derive(Debug, Clone)]
pub struct RateLimits {
    /// Maximum simultaneously admitted tickets per caller.
    pub per_caller_concurrency: usize,
    /// Optional ceiling across all callers.
    pub global_concurrency: Option<usize>,
    /// Steady token refill per caller per second.
    pub rate_per_sec: f64,
    /// Bucket capacity; bounds short admission bursts.
    pub rate_burst: f64,
}

impl Default for RateLimits {
    fn default() -> Self {
        Self {
            per_caller_concurrency: 8,
            global_concurrency: None,
            rate_per_sec: 50.0,
            rate_burst: 100.0,
        }
    }
}

/// Expected, frequently-occurring outcome under load; the dispatcher
/// surfaces it to callers as a retryable `Throttled` failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Rejected {
    #[error("caller has too many invocations in flight")]
    OverConcurrencyLimit,
    #[error("caller exceeded its admission rate")]
    OverRateLimit,
}

impl Rejected {
    pub fn reason(self) -> &'static str {
        match self {
            Rejected::OverConcurrencyLimit => "over_concurrency_limit",
            Rejected::OverRateLimit => "over_rate_limit",
        }
    }
}

struct CallerState {
    in_flight: usize,
    tokens: f64,
    last_refill: Instant,
}

#[derive(Default)]
struct ControllerState {
    callers: HashMap<String, CallerState>,
    total_in_flight: usize,
}

struct Inner {
    limits: RateLimits,
    state: Mutex<ControllerState>,
}

/// Cheap to clone; clones share the same counters.
#[derive(Clone)]
pub struct RateController {
    inner: Arc<Inner>,
}

impl RateController {
    pub fn new(limits: RateLimits) -> Self {
        Self {
            inner: Arc::new(Inner {
                limits,
                state: Mutex::new(ControllerState::default()),
            }),
        }
    }

    /// Grants a single-use ticket or rejects immediately. The ticket
    /// releases its slot on drop, so every exit path of an admitted
    /// invocation releases exactly once.
    pub fn admit(&self, caller_id: &str) -> Result<AdmissionTicket, Rejected> {
        let limits = &self.inner.limits;
        let mut st = self
            .inner
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        if let Some(ceiling) = limits.global_concurrency {
            if st.total_in_flight >= ceiling {
                return Err(Rejected::OverConcurrencyLimit);
            }
        }

        let now = Instant::now();
        // Drop idle entries whose bucket has refilled to capacity; they
        // are indistinguishable from a fresh caller. Keeps the map from
        // accumulating one-shot callers, including ones whose only
        // admission was rejected and therefore never releases.
        st.callers.retain(|_, c| {
            c.in_flight > 0
                || c.tokens + now.duration_since(c.last_refill).as_secs_f64() * limits.rate_per_sec
                    < limits.rate_burst
        });

        let entry = st
            .callers
            .entry(caller_id.to_owned())
            .or_insert_with(|| CallerState {
                in_flight: 0,
                tokens: limits.rate_burst,
                last_refill: now,
            });

        let elapsed = now.duration_since(entry.last_refill).as_secs_f64();
        entry.tokens = (entry.tokens + elapsed * limits.rate_per_sec).min(limits.rate_burst);
        entry.last_refill = now;

        if entry.in_flight >= limits.per_caller_concurrency {
            return Err(Rejected::OverConcurrencyLimit);
        }
        if entry.tokens < 1.0 {
            return Err(Rejected::OverRateLimit);
        }

        entry.tokens -= 1.0;
        entry.in_flight += 1;
        st.total_in_flight += 1;
        Ok(AdmissionTicket {
            inner: Arc::clone(&self.inner),
            caller_id: caller_id.to_owned(),
        })
    }

    /// Explicit form of ticket release; dropping the ticket is
    /// equivalent.
    pub fn release(ticket: AdmissionTicket) {
        drop(ticket);
    }

    pub fn in_flight(&self, caller_id: &str) -> usize {
        self.inner
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .callers
            .get(caller_id)
            .map_or(0, |c| c.in_flight)
    }

    pub fn total_in_flight(&self) -> usize {
        self.inner
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .total_in_flight
    }

    /// Number of caller entries currently tracked; bounded by pruning.
    pub fn tracked_callers(&self) -> usize {
        self.inner
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .callers
            .len()
    }
}

impl Inner {
    fn release_slot(&self, caller_id: &str) {
        let mut st = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        // Tickets are single-use; an underflow here means the counters
        // are corrupt and the core itself is broken.
        let entry = st
            .callers
            .get_mut(caller_id)
            .unwrap_or_else(|| panic!("admission ticket released for unknown caller {caller_id}"));
        assert!(
            entry.in_flight > 0,
            "admission ticket released twice for caller {caller_id}"
        );
        entry.in_flight -= 1;
        // Refill before the prune check so a caller is only dropped once
        // its bucket is back at capacity; an idle caller cannot reset
        // its rate budget any earlier than the refill allows.
        let now = Instant::now();
        let elapsed = now.duration_since(entry.last_refill).as_secs_f64();
        entry.tokens =
            (entry.tokens + elapsed * self.limits.rate_per_sec).min(self.limits.rate_burst);
        entry.last_refill = now;
        let prune = entry.in_flight == 0 && entry.tokens >= self.limits.rate_burst;
        if prune {
            st.callers.remove(caller_id);
        }
        assert!(st.total_in_flight > 0, "global in-flight count underflow");
        st.total_in_flight -= 1;
    }
}

/// Opaque handle for one granted concurrency/rate slot. Not clonable;
/// released exactly once, when dropped.
pub struct AdmissionTicket {
    inner: Arc<Inner>,
    caller_id: String,
}

impl AdmissionTicket {
    pub fn caller_id(&self) -> &str {
        &self.caller_id
    }
}

// Manual impl: `Inner` holds live counters, not meaningful to print.
impl std::fmt::Debug for AdmissionTicket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdmissionTicket")
            .field("caller_id", &self.caller_id)
            .finish_non_exhaustive()
    }
}

impl Drop for AdmissionTicket {
    fn drop(&mut self) {
        self.inner.release_slot(&self.caller_id);
    }
}
