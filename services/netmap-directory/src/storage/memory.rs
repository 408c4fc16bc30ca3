//! In-memory directory storage

use async_trait::async_trait;
use netmap::{SecureHash, SignedDescriptor, SignedNetworkMap, SignedNetworkRules};
use std::collections::HashMap;
use tokio::sync::RwLock;

use super::{DirectoryStorage, StorageError};

/// Process-local storage for tests and single-node development.
///
/// The setters stand in for the external process that signs and publishes
/// new network maps and rules.
#[derive(Default)]
pub struct MemoryStorage {
    network_map: RwLock<Option<SignedNetworkMap>>,
    current_rules: RwLock<Option<SecureHash>>,
    rules: RwLock<HashMap<SecureHash, SignedNetworkRules>>,
    descriptors: RwLock<HashMap<SecureHash, SignedDescriptor>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn set_network_map(&self, network_map: SignedNetworkMap) {
        *self.network_map.write().await = Some(network_map);
    }

    /// Record a rules version and make it the current one. Returns its hash.
    pub async fn set_current_rules(&self, rules: SignedNetworkRules) -> SecureHash {
        let hash = rules.content_hash();
        self.rules.write().await.insert(hash, rules);
        *self.current_rules.write().await = Some(hash);
        hash
    }

    pub async fn descriptor_count(&self) -> usize {
        self.descriptors.read().await.len()
    }
}

#[async_trait]
impl DirectoryStorage for MemoryStorage {
    async fn current_network_map(&self) -> Result<Option<SignedNetworkMap>, StorageError> {
        Ok(self.network_map.read().await.clone())
    }

    async fn current_rules(&self) -> Result<Option<SignedNetworkRules>, StorageError> {
        let current = *self.current_rules.read().await;
        match current {
            Some(hash) => self.rules(&hash).await,
            None => Ok(None),
        }
    }

    async fn rules(&self, hash: &SecureHash) -> Result<Option<SignedNetworkRules>, StorageError> {
        Ok(self.rules.read().await.get(hash).cloned())
    }

    async fn descriptor(
        &self,
        hash: &SecureHash,
    ) -> Result<Option<SignedDescriptor>, StorageError> {
        Ok(self.descriptors.read().await.get(hash).cloned())
    }

    async fn put_descriptor(
        &self,
        hash: SecureHash,
        descriptor: SignedDescriptor,
    ) -> Result<(), StorageError> {
        self.descriptors.write().await.insert(hash, descriptor);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use netmap::{NetworkRules, SignedEnvelope};
    use p256::ecdsa::SigningKey;

    fn signed_rules(minimum_platform_version: u32) -> SignedNetworkRules {
        let operator = SigningKey::from_slice(&[9u8; 32]).unwrap();
        let rules = NetworkRules {
            minimum_platform_version,
            max_message_size: 1024,
            epoch: 1,
            modified_time: Utc::now(),
        };
        SignedEnvelope::sign(&rules, &operator).unwrap()
    }

    #[tokio::test]
    async fn test_empty_storage_has_nothing_current() {
        let storage = MemoryStorage::new();
        assert!(storage.current_network_map().await.unwrap().is_none());
        assert!(storage.current_rules().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_old_rules_stay_addressable() {
        let storage = MemoryStorage::new();
        let first = signed_rules(1);
        let second = signed_rules(2);

        let first_hash = storage.set_current_rules(first.clone()).await;
        storage.set_current_rules(second.clone()).await;

        assert_eq!(storage.current_rules().await.unwrap(), Some(second));
        assert_eq!(storage.rules(&first_hash).await.unwrap(), Some(first));
    }

    #[tokio::test]
    async fn test_unknown_hash_is_none() {
        let storage = MemoryStorage::new();
        let hash = SecureHash::sha256(b"missing");
        assert!(storage.rules(&hash).await.unwrap().is_none());
        assert!(storage.descriptor(&hash).await.unwrap().is_none());
    }
}
