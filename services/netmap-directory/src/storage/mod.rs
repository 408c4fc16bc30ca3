//! Directory storage - where descriptors, rules and network maps live
//!
//! The directory core only reads the current network map and rules, reads
//! content-addressed records by hash, and upserts descriptors. Producing new
//! network maps and rules belongs to whatever governs the network.

pub mod memory;
pub mod redis_store;

pub use memory::MemoryStorage;
pub use redis_store::RedisStorage;

use async_trait::async_trait;
use netmap::{SecureHash, SignedDescriptor, SignedNetworkMap, SignedNetworkRules};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("Corrupt record at {key}: {reason}")]
    Corrupt { key: String, reason: String },
    #[error("Storage unavailable: {0}")]
    Unavailable(String),
}

#[async_trait]
pub trait DirectoryStorage: Send + Sync {
    /// The network map currently being advertised, if one has been produced.
    async fn current_network_map(&self) -> Result<Option<SignedNetworkMap>, StorageError>;

    /// The most recently promoted rules. These may be ahead of the current
    /// network map until a new map is produced. Not verified.
    async fn current_rules(&self) -> Result<Option<SignedNetworkRules>, StorageError>;

    /// Any rules version ever advertised, by content hash.
    async fn rules(&self, hash: &SecureHash) -> Result<Option<SignedNetworkRules>, StorageError>;

    async fn descriptor(&self, hash: &SecureHash)
    -> Result<Option<SignedDescriptor>, StorageError>;

    /// Idempotent upsert keyed by the descriptor's content hash.
    async fn put_descriptor(
        &self,
        hash: SecureHash,
        descriptor: SignedDescriptor,
    ) -> Result<(), StorageError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_error_corrupt_display() {
        let err = StorageError::Corrupt {
            key: "netmap:network-parameters:current".to_string(),
            reason: "bad hash".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Corrupt record at netmap:network-parameters:current: bad hash"
        );
    }

    #[test]
    fn test_storage_error_from_json_error() {
        let json_err = serde_json::from_str::<serde_json::Value>("{invalid}").unwrap_err();
        let err: StorageError = json_err.into();
        assert!(matches!(err, StorageError::Serialization(_)));
        assert!(err.to_string().starts_with("Serialization error:"));
    }

    #[test]
    fn test_storage_error_from_redis_error() {
        let redis_err = redis::RedisError::from((redis::ErrorKind::IoError, "connection refused"));
        let err: StorageError = redis_err.into();
        assert!(matches!(err, StorageError::Redis(_)));
        assert!(err.to_string().starts_with("Redis error:"));
    }
}
