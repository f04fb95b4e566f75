//! Checkpoint store adapters
//!
//! - [`traits`] - The [`CheckpointStore`] abstraction
//! - [`redis_store`] - Redis / Valkey backend
//! - [`memory`] - In-process backend for dry runs and tests

pub mod memory;
pub mod redis_store;
pub mod traits;

pub use memory::InMemoryCheckpointStore;
pub use redis_store::RedisCheckpointStore;
pub use traits::CheckpointStore;
