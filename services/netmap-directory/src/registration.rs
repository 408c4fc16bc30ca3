//! Descriptor registration
//!
//! Admission runs a fixed pipeline: verify the envelope, read the rules from
//! the network map cache, check the declared platform version against them,
//! then upsert under the descriptor's content hash. Only the last step writes.

use netmap::{SecureHash, SignedDescriptor, SignedNetworkRules, VerificationError};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error, trace, warn};

use crate::cache::{CacheError, SnapshotCache};
use crate::storage::{DirectoryStorage, StorageError};

#[derive(Error, Debug)]
pub enum RegistrationError {
    #[error("Invalid descriptor: {0}")]
    Unauthorized(#[from] VerificationError),
    #[error("Network parameters have not been initialised")]
    NotInitialised,
    #[error("Minimum platform version is {required}")]
    VersionTooLow { required: u32, declared: u32 },
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
    #[error("Network map unavailable: {0}")]
    Cache(#[from] CacheError),
}

pub struct RegistrationValidator {
    cache: Arc<SnapshotCache>,
    storage: Arc<dyn DirectoryStorage>,
}

impl RegistrationValidator {
    pub fn new(cache: Arc<SnapshotCache>, storage: Arc<dyn DirectoryStorage>) -> Self {
        Self { cache, storage }
    }

    /// Admit a signed descriptor. Returns the content hash it is stored under.
    pub async fn register(
        &self,
        envelope: SignedDescriptor,
    ) -> Result<SecureHash, RegistrationError> {
        let descriptor = match envelope.verify() {
            Ok(descriptor) => descriptor,
            Err(e) => {
                warn!(
                    "Rejected descriptor {} : {}",
                    envelope.content_hash(),
                    e
                );
                return Err(e.into());
            }
        };
        trace!(
            "Processing 'publish' request from '{}'",
            descriptor.legal_name
        );

        let state = self.cache.current().await?;
        let Some(rules) = state.rules else {
            error!(
                "Error processing request from node '{}' : Network parameters have not been initialised",
                descriptor.legal_name
            );
            return Err(RegistrationError::NotInitialised);
        };

        if descriptor.platform_version < rules.minimum_platform_version {
            warn!(
                "Error processing request from node '{}' : Minimum platform version is {}",
                descriptor.legal_name, rules.minimum_platform_version
            );
            return Err(RegistrationError::VersionTooLow {
                required: rules.minimum_platform_version,
                declared: descriptor.platform_version,
            });
        }

        let hash = envelope.content_hash();
        self.storage.put_descriptor(hash, envelope).await?;
        debug!(
            "Stored 'publish' request from '{}' as {}",
            descriptor.legal_name, hash
        );

        Ok(hash)
    }

    pub async fn get_descriptor(
        &self,
        hash: &SecureHash,
    ) -> Result<Option<SignedDescriptor>, StorageError> {
        self.storage.descriptor(hash).await
    }

    pub async fn get_rules(
        &self,
        hash: &SecureHash,
    ) -> Result<Option<SignedNetworkRules>, StorageError> {
        self.storage.rules(hash).await
    }
}
