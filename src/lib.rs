//! Tool-execution core for MCP servers.
//!
//! A registry of named, schema-described operations invoked through a
//! single dispatch entry point, executed under bounded concurrency with
//! validation, timeouts, cooperative cancellation, and structured error
//! reporting. Transport framing, auth, and persistence are the
//! embedder's concern; this crate is the piece every transport calls
//! into.
//!
//! ```
//! use std::sync::Arc;
//! use mcp_dispatch::dispatch::{Dispatcher, InvocationRequest};
//! use mcp_dispatch::infra::config::CoreConfig;
//! use mcp_dispatch::tools::echo::EchoTool;
//! use mcp_dispatch::tools::registry::ToolRegistry;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let registry = Arc::new(ToolRegistry::new());
//! registry.register(EchoTool::contract(), Arc::new(EchoTool)).unwrap();
//! let dispatcher = Dispatcher::new(registry, CoreConfig::default());
//!
//! let mut args = serde_json::Map::new();
//! args.insert("text".into(), serde_json::json!("hi"));
//! let outcome = dispatcher
//!     .invoke(InvocationRequest::new("echo", args, "docs"))
//!     .await;
//! assert!(outcome.is_success());
//! # }
//! ```

pub mod core;
pub mod dispatch;
pub mod infra;
pub mod runtime;
pub mod tools;

pub use crate::core::content::{ContentItem, InvocationOutcome};
pub use crate::core::error::{ErrorKind, InvokeFailure, RegistryError, ToolError, ValidationError};
pub use crate::core::schema::{FieldSpec, FieldType, ParameterSchema};
pub use crate::core::tool::{CallContext, JsonMap, ToolContract, ToolHandler};
pub use crate::dispatch::{Dispatcher, InvocationRequest};
pub use crate::infra::config::CoreConfig;
pub use crate::runtime::limits::{AdmissionTicket, RateController, RateLimits, Rejected};
pub use crate::runtime::pool::{PoolConfig, WorkerPool};
pub use crate::tools::registry::{RegisteredTool, ToolRegistry};
