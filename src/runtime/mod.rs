//! Execution machinery: admission control and the bounded worker pool.

pub mod limits;
pub mod pool;
