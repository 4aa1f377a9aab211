//! Idempotency-key store collaborator. The dispatcher consults it to
//! replay a prior success for the same `(tool, key)` pair instead of
//! re-invoking the handler. Durable stores live outside the core; the
//! in-memory implementation here is the in-process default and the
//! test fake.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;

use crate::core::content::InvocationOutcome;

#[async_trait]
pub trait IdempotencyStore: Send + Sync {
    async fn get(&self, tool: &str, key: &str) -> Option<InvocationOutcome>;
    async fn put(&self, tool: &str, key: &str, outcome: InvocationOutcome);
}

#[derive(Default)]
pub struct InMemoryIdempotencyStore {
    entries: Mutex<HashMap<(String, String), InvocationOutcome>>,
}

impl InMemoryIdempotencyStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl IdempotencyStore for InMemoryIdempotencyStore {
    async fn get(&self, tool: &str, key: &str) -> Option<InvocationOutcome> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&(tool.to_owned(), key.to_owned()))
            .cloned()
    }

    async fn put(&self, tool: &str, key: &str, outcome: InvocationOutcome) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert((tool.to_owned(), key.to_owned()), outcome);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::content::ContentItem;

    #[tokio::test]
    async fn it_stores_and_replays_by_tool_and_key() {
        let store = InMemoryIdempotencyStore::new();
        assert!(store.get("echo", "k1").await.is_none());

        let outcome = InvocationOutcome::success(vec![ContentItem::text("hi")]);
        store.put("echo", "k1", outcome.clone()).await;
        assert_eq!(store.get("echo", "k1").await, Some(outcome));

        // Keys are scoped per tool.
        assert!(store.get("other", "k1").await.is_none());
    }
}
