//! Redis-backed directory storage
//!
//! Every record is the JSON form of its signed envelope. Content-addressed
//! records live under their hash; the current network map is stored inline and
//! the current rules are a pointer to a rules hash.

use async_trait::async_trait;
use netmap::{SecureHash, SignedDescriptor, SignedNetworkMap, SignedNetworkRules};
use redis::AsyncCommands;
use redis::aio::ConnectionManager;
use serde::de::DeserializeOwned;

use super::{DirectoryStorage, StorageError};

const NETWORK_MAP: &str = "network-map";
const NETWORK_PARAMETERS: &str = "network-parameters";
const NODE_INFO: &str = "node-info";
const NODE_INFOS_SET: &str = "node-infos";
const CURRENT: &str = "current";

fn record_key(prefix: &str, kind: &str, id: &str) -> String {
    format!("{}:{}:{}", prefix, kind, id)
}

fn set_key(prefix: &str, name: &str) -> String {
    format!("{}:{}", prefix, name)
}

#[derive(Clone)]
pub struct RedisStorage {
    conn: ConnectionManager,
    key_prefix: String,
}

impl RedisStorage {
    pub fn new(conn: ConnectionManager, key_prefix: &str) -> Self {
        Self {
            conn,
            key_prefix: key_prefix.to_string(),
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, StorageError> {
        let mut conn = self.conn.clone();
        let json: Option<String> = conn.get(key).await?;
        match json {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }
}

#[async_trait]
impl DirectoryStorage for RedisStorage {
    async fn current_network_map(&self) -> Result<Option<SignedNetworkMap>, StorageError> {
        self.get_json(&record_key(&self.key_prefix, NETWORK_MAP, CURRENT))
            .await
    }

    async fn current_rules(&self) -> Result<Option<SignedNetworkRules>, StorageError> {
        let mut conn = self.conn.clone();
        let pointer_key = record_key(&self.key_prefix, NETWORK_PARAMETERS, CURRENT);
        let pointer: Option<String> = conn.get(&pointer_key).await?;
        let Some(pointer) = pointer else {
            return Ok(None);
        };

        let hash: SecureHash = pointer.parse().map_err(|e| StorageError::Corrupt {
            key: pointer_key.clone(),
            reason: format!("{}", e),
        })?;

        // A dangling pointer means the rules record itself was never written.
        match self.rules(&hash).await? {
            Some(rules) => Ok(Some(rules)),
            None => Err(StorageError::Corrupt {
                key: pointer_key,
                reason: format!("points at unknown rules {}", hash),
            }),
        }
    }

    async fn rules(&self, hash: &SecureHash) -> Result<Option<SignedNetworkRules>, StorageError> {
        self.get_json(&record_key(
            &self.key_prefix,
            NETWORK_PARAMETERS,
            &hash.to_string(),
        ))
        .await
    }

    async fn descriptor(
        &self,
        hash: &SecureHash,
    ) -> Result<Option<SignedDescriptor>, StorageError> {
        self.get_json(&record_key(&self.key_prefix, NODE_INFO, &hash.to_string()))
            .await
    }

    async fn put_descriptor(
        &self,
        hash: SecureHash,
        descriptor: SignedDescriptor,
    ) -> Result<(), StorageError> {
        let mut conn = self.conn.clone();
        let hash = hash.to_string();
        let json = serde_json::to_string(&descriptor)?;

        // Record and index entry land together; repeating either is a no-op.
        let _: () = redis::pipe()
            .atomic()
            .set(record_key(&self.key_prefix, NODE_INFO, &hash), &json)
            .sadd(set_key(&self.key_prefix, NODE_INFOS_SET), &hash)
            .query_async(&mut conn)
            .await?;

        tracing::debug!("Stored node info {}", hash);

        Ok(())
    }
}
