//! Network Map Directory
//!
//! Participants publish signed descriptors of themselves; the directory admits
//! them against the network rules in force and serves one signed network map,
//! cached for a fixed lifetime, to everyone.

#![cfg_attr(
    test,
    allow(clippy::unwrap_used, clippy::expect_used, clippy::unwrap_in_result)
)]

pub mod cache;
pub mod config;
pub mod handlers;
pub mod registration;
pub mod server;
pub mod storage;

pub use cache::{CacheError, CachedState, SnapshotCache};
pub use config::{ConfigError, DirectoryConfig};
pub use registration::{RegistrationError, RegistrationValidator};
pub use server::{build_state, create_router, run};
pub use storage::{DirectoryStorage, MemoryStorage, RedisStorage, StorageError};
