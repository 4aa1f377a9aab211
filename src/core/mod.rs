//! Core types & traits: domain-agnostic contracts for tools, schemas,
//! and invocation outcomes.

pub mod content;
pub mod error;
pub mod schema;
pub mod tool;
