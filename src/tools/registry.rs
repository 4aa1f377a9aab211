//! Concurrent name-to-handler registry.
//!
//! Read-mostly: lookups take the read lock and clone `Arc`s out;
//! registration and deregistration take the write lock. `list` returns
//! a snapshot taken at call time, sorted by name; a registration that
//! races the call is not reflected in an already-taken snapshot.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use crate::core::error::RegistryError;
use crate::core::tool::{ToolContract, ToolHandler};

/// A contract paired with its handler, as stored in the registry.
#[derive(Clone)]
pub struct RegisteredTool {
    pub contract: Arc<ToolContract>,
    pub handler: Arc<dyn ToolHandler>,
}

#[derive(Default)]
pub struct ToolRegistry {
    by_name: RwLock<HashMap<String, RegisteredTool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores the pair atomically; visible to concurrent lookups as soon
    /// as this returns.
    pub fn register(
        &self,
        contract: ToolContract,
        handler: Arc<dyn ToolHandler>,
    ) -> Result<(), RegistryError> {
        let mut map = self
            .by_name
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        if map.contains_key(&contract.name) {
            return Err(RegistryError::DuplicateName(contract.name));
        }
        let name = contract.name.clone();
        map.insert(
            name,
            RegisteredTool {
                contract: Arc::new(contract),
                handler,
            },
        );
        Ok(())
    }

    pub fn lookup(&self, name: &str) -> Option<RegisteredTool> {
        self.by_name
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
    }

    /// Snapshot of all contracts, sorted by tool name.
    pub fn list(&self) -> Vec<ToolContract> {
        let mut contracts: Vec<ToolContract> = self
            .by_name
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .map(|t| (*t.contract).clone())
            .collect();
        contracts.sort_by(|a, b| a.name.cmp(&b.name));
        contracts
    }

    /// Idempotent; removing an unknown name is a no-op. Returns whether
    /// an entry was actually removed.
    pub fn deregister(&self, name: &str) -> bool {
        self.by_name
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(name)
            .is_some()
    }
}
