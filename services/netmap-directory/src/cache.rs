//! Network map cache with single-flight refresh.
//!
//! # Contract
//!
//! - One slot holds the current network map together with the rules it was
//!   published under. Both come from the same refresh and are replaced together.
//! - A value older than the TTL is served to no one. The first caller to find it
//!   expired starts a refresh; everyone arriving while that refresh runs awaits
//!   the same future and receives the same result, success or failure.
//! - When a map exists, the rules come from the hash the map itself names, never
//!   from the separately promoted "current" rules, which may already be ahead of
//!   it. A map naming rules that storage does not hold fails the refresh.
//! - A failed refresh installs nothing. The previous pair stays in the slot and
//!   the next call retries.
//!
//! The refresh future installs its own result, so it completes even if the
//! caller that started it is cancelled: the slot keeps a handle to it and the
//! next caller resumes polling.

use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use netmap::{NetworkRules, SecureHash, SignedNetworkMap, VerificationError};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::storage::{DirectoryStorage, StorageError};

#[derive(Error, Debug, Clone)]
pub enum CacheError {
    #[error("Storage error: {0}")]
    Storage(Arc<StorageError>),
    #[error("Network parameters failed verification: {0}")]
    InvalidRules(Arc<VerificationError>),
    #[error("Network map failed verification: {0}")]
    InvalidNetworkMap(Arc<VerificationError>),
    #[error("Network map references unknown network parameters {0}")]
    UnknownRules(SecureHash),
}

impl From<StorageError> for CacheError {
    fn from(e: StorageError) -> Self {
        CacheError::Storage(Arc::new(e))
    }
}

impl From<VerificationError> for CacheError {
    fn from(e: VerificationError) -> Self {
        CacheError::InvalidRules(Arc::new(e))
    }
}

/// One refresh cycle's view of the network: the map and its rules, either of
/// which may be absent before the network has been bootstrapped.
#[derive(Debug, Clone)]
pub struct CachedState {
    pub network_map: Option<Arc<SignedNetworkMap>>,
    pub rules: Option<Arc<NetworkRules>>,
    expires_at: Instant,
}

impl CachedState {
    /// Remaining lifetime of this value; zero once expired.
    pub fn time_to_live(&self) -> Duration {
        self.expires_at.saturating_duration_since(Instant::now())
    }

    pub fn expires_at(&self) -> Instant {
        self.expires_at
    }

    fn is_fresh(&self, now: Instant) -> bool {
        now < self.expires_at
    }
}

type Refresh = Shared<BoxFuture<'static, Result<CachedState, CacheError>>>;

#[derive(Default)]
struct Slot {
    installed: Option<CachedState>,
    in_flight: Option<Refresh>,
}

pub struct SnapshotCache {
    storage: Arc<dyn DirectoryStorage>,
    ttl: Duration,
    slot: Arc<Mutex<Slot>>,
}

impl SnapshotCache {
    pub fn new(storage: Arc<dyn DirectoryStorage>, ttl: Duration) -> Self {
        Self {
            storage,
            ttl,
            slot: Arc::new(Mutex::new(Slot::default())),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Current network map and rules, refreshing from storage if expired.
    pub async fn current(&self) -> Result<CachedState, CacheError> {
        let refresh = {
            let mut slot = self.slot.lock().await;

            if let Some(state) = slot.installed.as_ref().filter(|s| s.is_fresh(Instant::now())) {
                return Ok(state.clone());
            }

            slot.in_flight
                .get_or_insert_with(|| self.start_refresh())
                .clone()
        };

        refresh.await
    }

    fn start_refresh(&self) -> Refresh {
        let storage = Arc::clone(&self.storage);
        let slot = Arc::clone(&self.slot);
        let ttl = self.ttl;

        async move {
            debug!("Refreshing network map cache");
            let fetched = fetch(storage.as_ref()).await;

            let mut slot = slot.lock().await;
            slot.in_flight = None;

            match fetched {
                Ok((network_map, rules)) => {
                    let state = CachedState {
                        network_map,
                        rules,
                        expires_at: Instant::now() + ttl,
                    };
                    info!(
                        network_map = ?state.network_map.as_ref().map(|m| m.content_hash()),
                        minimum_platform_version = ?state.rules.as_ref().map(|r| r.minimum_platform_version),
                        "Network map cache refreshed"
                    );
                    slot.installed = Some(state.clone());
                    Ok(state)
                }
                Err(e) => {
                    warn!(
                        error = %e,
                        has_previous = slot.installed.is_some(),
                        "Network map cache refresh failed"
                    );
                    Err(e)
                }
            }
        }
        .boxed()
        .shared()
    }
}

async fn fetch(
    storage: &dyn DirectoryStorage,
) -> Result<(Option<Arc<SignedNetworkMap>>, Option<Arc<NetworkRules>>), CacheError> {
    let Some(network_map) = storage.current_network_map().await? else {
        let rules = match storage.current_rules().await? {
            Some(signed) => Some(Arc::new(signed.verify()?)),
            None => None,
        };
        return Ok((None, rules));
    };

    let parameters_hash = network_map
        .verify()
        .map_err(|e| CacheError::InvalidNetworkMap(Arc::new(e)))?
        .network_parameter_hash;
    let rules = storage
        .rules(&parameters_hash)
        .await?
        .ok_or(CacheError::UnknownRules(parameters_hash))?
        .verify()?;

    Ok((Some(Arc::new(network_map)), Some(Arc::new(rules))))
}
